// Identity Generator Module
// Produces unique, human-plausible usernames for synthetic users.

use rand::{Rng, RngCore};
use std::collections::HashSet;

/// Default number of draws before giving up on finding an unused name
pub const DEFAULT_MAX_ATTEMPTS: usize = 64;

/// Errors raised while generating identities
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    #[error("No unused username found after {attempts} attempts")]
    GenerationExhausted { attempts: usize },
}

/// Generates `AdjectiveNoun42` style names, never issuing the same name twice
#[derive(Debug, Clone)]
pub struct IdentityGenerator {
    adjectives: &'static [&'static str],
    nouns: &'static [&'static str],
    /// Names get a numeric suffix in `0..suffix_range`; 0 disables the suffix
    suffix_range: u32,
    max_attempts: usize,
    issued: HashSet<String>,
}

impl IdentityGenerator {
    const ADJECTIVES: &'static [&'static str] = &[
        "Agile", "Brave", "Calm", "Clever", "Cosmic", "Curious", "Daring", "Eager", "Fancy",
        "Fierce", "Gentle", "Giddy", "Grumpy", "Happy", "Humble", "Jolly", "Keen", "Lively",
        "Lucky", "Mellow", "Mighty", "Nimble", "Noble", "Odd", "Plucky", "Proud", "Quiet",
        "Quirky", "Rapid", "Rowdy", "Shy", "Silly", "Sleepy", "Sneaky", "Spicy", "Steady",
        "Sunny", "Swift", "Tidy", "Witty", "Zany", "Zealous",
    ];

    const NOUNS: &'static [&'static str] = &[
        "Badger", "Beaver", "Bison", "Cactus", "Comet", "Cougar", "Coyote", "Dingo", "Falcon",
        "Ferret", "Gecko", "Goose", "Heron", "Hippo", "Ibis", "Jackal", "Koala", "Lemur",
        "Llama", "Lobster", "Mantis", "Marmot", "Moose", "Narwhal", "Otter", "Panda",
        "Pelican", "Penguin", "Pigeon", "Potato", "Quail", "Raccoon", "Salmon", "Sloth",
        "Squid", "Squirrel", "Toucan", "Turnip", "Walrus", "Wombat", "Yak", "Zebra",
    ];

    pub fn new() -> Self {
        Self::with_words(Self::ADJECTIVES, Self::NOUNS, 1000)
    }

    /// Build a generator over custom word lists
    pub fn with_words(
        adjectives: &'static [&'static str],
        nouns: &'static [&'static str],
        suffix_range: u32,
    ) -> Self {
        Self {
            adjectives,
            nouns,
            suffix_range,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            issued: HashSet::new(),
        }
    }

    pub fn with_max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Issue a name that has not been issued before by this generator
    pub fn next_identity(&mut self, rng: &mut dyn RngCore) -> Result<String, IdentityError> {
        for _ in 0..self.max_attempts {
            let candidate = self.draw(rng);
            if self.issued.insert(candidate.clone()) {
                return Ok(candidate);
            }
            tracing::debug!(name = %candidate, "Username collision, drawing again");
        }
        Err(IdentityError::GenerationExhausted {
            attempts: self.max_attempts,
        })
    }

    /// Number of names issued so far
    pub fn issued_count(&self) -> usize {
        self.issued.len()
    }

    fn draw(&self, rng: &mut dyn RngCore) -> String {
        let mut name = String::new();
        if !self.adjectives.is_empty() {
            name.push_str(self.adjectives[rng.random_range(0..self.adjectives.len())]);
        }
        if !self.nouns.is_empty() {
            name.push_str(self.nouns[rng.random_range(0..self.nouns.len())]);
        }
        if self.suffix_range > 0 {
            name.push_str(&rng.random_range(0..self.suffix_range).to_string());
        }
        name
    }
}

impl Default for IdentityGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_names_are_unique() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut gen = IdentityGenerator::new();
        let names: HashSet<String> = (0..500)
            .map(|_| gen.next_identity(&mut rng).unwrap())
            .collect();
        assert_eq!(names.len(), 500);
        assert_eq!(gen.issued_count(), 500);
    }

    #[test]
    fn test_name_shape() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let name = IdentityGenerator::new().next_identity(&mut rng).unwrap();
        assert!(name.chars().next().unwrap().is_ascii_uppercase());
        assert!(name.chars().last().unwrap().is_ascii_digit());
    }

    #[test]
    fn test_same_seed_same_names() {
        let mut a = ChaCha8Rng::seed_from_u64(99);
        let mut b = ChaCha8Rng::seed_from_u64(99);
        let mut gen_a = IdentityGenerator::new();
        let mut gen_b = IdentityGenerator::new();
        for _ in 0..10 {
            assert_eq!(
                gen_a.next_identity(&mut a).unwrap(),
                gen_b.next_identity(&mut b).unwrap()
            );
        }
    }

    #[test]
    fn test_exhausted_name_space() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut gen = IdentityGenerator::with_words(&["Lone"], &["Wolf"], 0).with_max_attempts(5);

        assert_eq!(gen.next_identity(&mut rng).unwrap(), "LoneWolf");
        assert_eq!(
            gen.next_identity(&mut rng),
            Err(IdentityError::GenerationExhausted { attempts: 5 })
        );
    }

    #[test]
    fn test_small_name_space_fills_up() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let mut gen = IdentityGenerator::with_words(&["Red", "Blue"], &["Fox"], 0)
            .with_max_attempts(DEFAULT_MAX_ATTEMPTS);

        let first = gen.next_identity(&mut rng).unwrap();
        let second = gen.next_identity(&mut rng).unwrap();
        assert_ne!(first, second);
        assert!(gen.next_identity(&mut rng).is_err());
    }
}
