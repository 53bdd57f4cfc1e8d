//! UI utilities for the client.

use std::io::Write;

use crate::domain::RoomCode;

pub fn prompt(room_code: &RoomCode) -> String {
    format!("{}> ", room_code)
}

/// Redisplay the prompt after printing a notification
pub fn redisplay_prompt(room_code: &RoomCode) {
    print!("{}", prompt(room_code));
    std::io::stdout().flush().ok();
}
