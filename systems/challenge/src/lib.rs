#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Challenge generation system that builds multiple-choice rounds.

use rand::{seq::SliceRandom, Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tank_catch_core::{Catalog, CatalogError, Challenge, ItemKind, CHALLENGE_OPTIONS};

/// Produces randomized challenges from a catalog.
///
/// A seeded generator yields the same sequence of challenges for the same
/// catalog, which keeps replays and tests reproducible.
#[derive(Debug)]
pub struct ChallengeGenerator {
    rng: ChaCha8Rng,
}

impl ChallengeGenerator {
    /// Creates a generator whose sequence is fully determined by `seed`.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Creates a generator seeded from operating system entropy.
    #[must_use]
    pub fn from_entropy() -> Self {
        Self {
            rng: ChaCha8Rng::from_entropy(),
        }
    }

    /// Builds a challenge with one correct kind and two distinct distractors.
    ///
    /// The correct kind is drawn uniformly from the catalog, the distractors
    /// uniformly from the remaining kinds, and the three options are shuffled
    /// with a uniform permutation. Catalogs with fewer than three kinds are
    /// rejected instead of producing degenerate options.
    pub fn generate(&mut self, catalog: &Catalog) -> Result<Challenge, CatalogError> {
        catalog.ensure_playable()?;

        let kinds: Vec<&ItemKind> = catalog.kinds().collect();
        let correct = kinds[self.rng.gen_range(0..kinds.len())].clone();

        let distractors: Vec<&ItemKind> = kinds
            .iter()
            .copied()
            .filter(|kind| **kind != correct)
            .collect();

        let mut options = Vec::with_capacity(CHALLENGE_OPTIONS);
        options.push(correct.clone());
        options.extend(
            distractors
                .choose_multiple(&mut self.rng, CHALLENGE_OPTIONS - 1)
                .map(|kind| (*kind).clone()),
        );
        options.shuffle(&mut self.rng);

        Ok(Challenge::new(correct, options)?)
    }
}
