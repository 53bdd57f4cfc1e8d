//! Infrastructure layer: wire DTOs and the realtime transport.

pub mod dto;
pub mod transport;
