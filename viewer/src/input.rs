//! Keyboard steering with press-edge detection

use macroquad::prelude::*;
use shared::Direction;

const DIRECTIONS: [Direction; 4] = [
    Direction::Up,
    Direction::Down,
    Direction::Left,
    Direction::Right,
];

/// Turns key presses into heading changes, one per press.
#[derive(Debug, Default)]
pub struct InputManager {
    // Previous frame key states, in `DIRECTIONS` order
    prev_down: [bool; 4],
}

impl InputManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Samples the keyboard (arrows and WASD).
    pub fn update(&mut self) -> Option<Direction> {
        let down = [
            is_key_down(KeyCode::W) || is_key_down(KeyCode::Up),
            is_key_down(KeyCode::S) || is_key_down(KeyCode::Down),
            is_key_down(KeyCode::A) || is_key_down(KeyCode::Left),
            is_key_down(KeyCode::D) || is_key_down(KeyCode::Right),
        ];
        self.on_keys(down)
    }

    /// The first direction whose key went down this frame.
    fn on_keys(&mut self, down: [bool; 4]) -> Option<Direction> {
        let pressed = DIRECTIONS
            .iter()
            .zip(down.iter().zip(self.prev_down.iter()))
            .find(|(_, (now, before))| **now && !**before)
            .map(|(direction, _)| *direction);

        self.prev_down = down;
        pressed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_press_fires_once() {
        let mut input = InputManager::new();
        assert_eq!(input.on_keys([true, false, false, false]), Some(Direction::Up));
        assert_eq!(input.on_keys([true, false, false, false]), None);
        assert_eq!(input.on_keys([false, false, false, false]), None);
        assert_eq!(input.on_keys([true, false, false, false]), Some(Direction::Up));
    }

    #[test]
    fn test_new_press_while_holding_another() {
        let mut input = InputManager::new();
        input.on_keys([false, false, true, false]);
        assert_eq!(input.on_keys([true, false, true, false]), Some(Direction::Up));
    }
}
