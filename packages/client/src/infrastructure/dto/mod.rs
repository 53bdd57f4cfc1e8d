//! Data Transfer Objects (DTOs) for the room channel.
//!
//! - `websocket`: frame DTOs as they appear on the wire
//! - `conversion`: DTO ⇔ domain entity conversion

pub mod conversion;
pub mod websocket;
