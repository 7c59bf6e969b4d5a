#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Spawn round lifecycle and race resolution.
//!
//! A [`SpawnRound`] is a single timed challenge. The [`RoundEngine`] opens
//! rounds, keeps them in the [`RoundRegistry`] while they accept attempts and
//! settles each one exactly once: either the first correct attempt wins it or
//! its deadline timer expires it. Winning commits the catch to the inventory
//! and applies evolutions before the round leaves the registry.

mod engine;
mod registry;
mod round;

use tank_catch_core::{CatalogError, PresentError};
use tank_catch_inventory::InventoryError;
use thiserror::Error;

pub use engine::{RoundEngine, SharedInventory};
pub use registry::{Lookup, RoundRegistry};
pub use round::{RoundPhase, SpawnRound};

/// Failures raised while opening or settling rounds.
#[derive(Debug, Error)]
pub enum RoundError {
    /// The winner's catch could not be persisted.
    #[error("failed to persist catch: {0}")]
    Persistence(#[from] InventoryError),
    /// The catalog cannot produce or accept the challenge.
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    /// The presenter could not publish the round.
    #[error(transparent)]
    Presentation(#[from] PresentError),
    /// A thread panicked while holding the inventory lock.
    #[error("inventory lock poisoned")]
    InventoryPoisoned,
    /// Rounds were opened outside a tokio runtime.
    #[error("rounds require a running tokio runtime")]
    NoRuntime,
}
