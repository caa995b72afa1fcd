use crate::combo::Direction;
use crossterm::event::KeyCode;

/// Decode a raw key into a combo direction, or None for unmapped keys.
///
/// Two synonym sets: the wasd cluster (case-insensitive) and the arrow keys.
pub fn decode(code: KeyCode) -> Option<Direction> {
    match code {
        KeyCode::Up => Some(Direction::Up),
        KeyCode::Down => Some(Direction::Down),
        KeyCode::Left => Some(Direction::Left),
        KeyCode::Right => Some(Direction::Right),
        KeyCode::Char(c) => decode_char(c),
        _ => None,
    }
}

pub fn decode_char(c: char) -> Option<Direction> {
    match c.to_ascii_lowercase() {
        'w' => Some(Direction::Up),
        's' => Some(Direction::Down),
        'a' => Some(Direction::Left),
        'd' => Some(Direction::Right),
        _ => None,
    }
}
