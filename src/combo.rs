use crate::difficulty::Policy;
use rand::seq::SliceRandom;

/// One of the four combo directions. Equality-comparable, no ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

pub const DIRECTIONS: [Direction; 4] = [
    Direction::Up,
    Direction::Down,
    Direction::Left,
    Direction::Right,
];

impl Direction {
    /// Glyph used by the arrow row in the TUI.
    pub fn glyph(&self) -> char {
        match self {
            Direction::Up => '▲',
            Direction::Down => '▼',
            Direction::Left => '◀',
            Direction::Right => '▶',
        }
    }
}

/// Draw `policy.length` directions uniformly, with replacement.
/// Adjacent repeats are allowed and not suppressed.
pub fn generate(policy: &Policy) -> Vec<Direction> {
    let mut rng = rand::thread_rng();
    (0..policy.length)
        .map(|_| *DIRECTIONS.choose(&mut rng).unwrap_or(&Direction::Up))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::difficulty::{DIFFICULTIES, EASY};

    #[test]
    fn test_generate_length_matches_policy() {
        for policy in DIFFICULTIES {
            assert_eq!(generate(&policy).len(), policy.length);
        }
    }

    #[test]
    fn test_generate_only_valid_directions() {
        for _ in 0..20 {
            for dir in generate(&EASY) {
                assert!(DIRECTIONS.contains(&dir));
            }
        }
    }

    #[test]
    fn test_generate_draws_are_independent() {
        // With replacement, 40 draws of length 10 hit every direction
        // with overwhelming probability.
        let mut seen = Vec::new();
        for _ in 0..40 {
            for dir in generate(&crate::difficulty::HARD) {
                if !seen.contains(&dir) {
                    seen.push(dir);
                }
            }
        }
        assert_eq!(seen.len(), DIRECTIONS.len());
    }

    #[test]
    fn test_glyphs_are_distinct() {
        let glyphs: Vec<char> = DIRECTIONS.iter().map(|d| d.glyph()).collect();
        for (i, a) in glyphs.iter().enumerate() {
            for b in glyphs.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }
}
