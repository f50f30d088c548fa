use rand::rngs::StdRng;
use rand::Rng;

use crate::keyboard::{KeyAdjacency, TYPO_ALPHABET};

pub const DEFAULT_MISTAKE_PROBABILITY: f64 = 0.15;
pub const DEFAULT_BACKSPACE_PROBABILITY: f64 = 0.08;
pub const DEFAULT_ADJACENT_SHARE: f64 = 0.7;

/// Decisions the sequencer delegates when it types a character.
pub trait TypoPolicy {
    // Never true while `in_mistake` is set.
    fn should_mistake(&mut self, in_mistake: bool, rng: &mut StdRng) -> bool;
    fn should_backspace_correct(&mut self, rng: &mut StdRng) -> bool;
    fn pick_wrong_char(&mut self, correct: char, rng: &mut StdRng) -> char;
}

pub fn should_mistake(probability: f64, in_mistake: bool, rng: &mut impl Rng) -> bool {
    let draw: f64 = rng.gen();
    draw < probability && !in_mistake
}

pub fn should_backspace_correct(probability: f64, rng: &mut impl Rng) -> bool {
    let draw: f64 = rng.gen();
    draw < probability
}

/// Pick a plausible typo for `correct`: usually a neighboring key, otherwise
/// any letter. Case is not preserved.
pub fn pick_wrong_char(
    correct: char,
    adjacency: &KeyAdjacency,
    adjacent_share: f64,
    rng: &mut impl Rng,
) -> char {
    let neighbors = adjacency.neighbors(correct);
    if !neighbors.is_empty() && rng.gen::<f64>() < adjacent_share {
        return neighbors[rng.gen_range(0..neighbors.len())];
    }
    TYPO_ALPHABET[rng.gen_range(0..TYPO_ALPHABET.len())]
}

#[derive(Debug, Clone)]
pub struct MistakeModel {
    pub mistake_probability: f64,
    pub backspace_probability: f64,
    pub adjacent_share: f64,
    adjacency: &'static KeyAdjacency,
}

impl Default for MistakeModel {
    fn default() -> Self {
        Self::new(
            DEFAULT_MISTAKE_PROBABILITY,
            DEFAULT_BACKSPACE_PROBABILITY,
            DEFAULT_ADJACENT_SHARE,
        )
    }
}

impl MistakeModel {
    pub fn new(mistake_probability: f64, backspace_probability: f64, adjacent_share: f64) -> Self {
        Self {
            mistake_probability,
            backspace_probability,
            adjacent_share,
            adjacency: KeyAdjacency::qwerty(),
        }
    }
}

impl TypoPolicy for MistakeModel {
    fn should_mistake(&mut self, in_mistake: bool, rng: &mut StdRng) -> bool {
        should_mistake(self.mistake_probability, in_mistake, rng)
    }

    fn should_backspace_correct(&mut self, rng: &mut StdRng) -> bool {
        should_backspace_correct(self.backspace_probability, rng)
    }

    fn pick_wrong_char(&mut self, correct: char, rng: &mut StdRng) -> char {
        pick_wrong_char(correct, self.adjacency, self.adjacent_share, rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn never_mistakes_while_already_in_a_mistake() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..1000 {
            assert!(!should_mistake(1.0, true, &mut rng));
        }
    }

    #[test]
    fn probability_bounds_are_absolute() {
        let mut rng = StdRng::seed_from_u64(4);
        for _ in 0..1000 {
            assert!(should_mistake(1.0, false, &mut rng));
            assert!(!should_mistake(0.0, false, &mut rng));
            assert!(should_backspace_correct(1.0, &mut rng));
            assert!(!should_backspace_correct(0.0, &mut rng));
        }
    }

    #[test]
    fn characters_without_neighbors_fall_back_to_alphabet() {
        let mut rng = StdRng::seed_from_u64(5);
        let adjacency = KeyAdjacency::qwerty();
        for _ in 0..500 {
            let c = pick_wrong_char('!', adjacency, 1.0, &mut rng);
            assert!(TYPO_ALPHABET.contains(&c));
        }
    }

    #[test]
    fn full_adjacent_share_only_yields_neighbors() {
        let mut rng = StdRng::seed_from_u64(6);
        let adjacency = KeyAdjacency::qwerty();
        for _ in 0..500 {
            let c = pick_wrong_char('Z', adjacency, 1.0, &mut rng);
            assert!(['a', 's', 'x'].contains(&c), "unexpected {c}");
        }
    }
}
