#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Spawn scheduling and the game control surface.
//!
//! The [`SpawnScheduler`] opens a new round in its target channel every spawn
//! interval. [`Game`] bundles the scheduler with the round engine and exposes
//! the administrative commands, answer attempts and inventory queries that an
//! adapter needs.

mod scheduler;

use tank_catch_core::{
    AttemptOutcome, ChannelId, ConfigError, GameConfig, PlayerId, Presenter, RoundId,
};
use tank_catch_inventory::query::{self, Holdings, Standing};
use tank_catch_system_rounds::{RoundEngine, RoundError};
use thiserror::Error;
use tracing::info;

pub use scheduler::{SharedConfig, SpawnScheduler};

/// Number of players listed by the default leaderboard.
pub const LEADERBOARD_SIZE: usize = 10;

/// Failures surfaced by the control surface.
#[derive(Debug, Error)]
pub enum GameError {
    /// A configuration change was rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// A round could not be opened or settled.
    #[error(transparent)]
    Round(#[from] RoundError),
}

/// Running game: round engine, spawn loop and live configuration.
pub struct Game<P> {
    engine: RoundEngine<P>,
    scheduler: SpawnScheduler<P>,
    config: SharedConfig,
}

impl<P: Presenter + 'static> Game<P> {
    /// Creates an idle game using `config` until an administrator changes it.
    #[must_use]
    pub fn new(engine: RoundEngine<P>, config: GameConfig) -> Self {
        Self {
            scheduler: SpawnScheduler::new(engine.clone()),
            engine,
            config: SharedConfig::new(config),
        }
    }

    /// Round engine driving the game.
    #[must_use]
    pub fn engine(&self) -> &RoundEngine<P> {
        &self.engine
    }

    /// Current configuration.
    #[must_use]
    pub fn config(&self) -> GameConfig {
        self.config.snapshot()
    }

    /// Reports whether rounds are being spawned.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.scheduler.is_running()
    }

    /// Channel rounds are being spawned into.
    #[must_use]
    pub fn channel(&self) -> Option<ChannelId> {
        self.scheduler.channel()
    }

    /// Starts spawning into `channel`, replacing any running loop.
    pub fn start_game(&self, channel: ChannelId) -> Result<(), GameError> {
        self.scheduler.start(channel, &self.config)?;
        Ok(())
    }

    /// Stops spawning; returns `false` when the game was not running.
    pub fn stop_game(&self) -> bool {
        self.scheduler.stop()
    }

    /// Sets the catch window used by rounds spawned from now on.
    pub fn set_catch_window(&self, seconds: u64) -> Result<GameConfig, GameError> {
        let config = self.config.set_catch_window(seconds)?;
        info!(catch_window_secs = seconds, "catch window updated");
        Ok(config)
    }

    /// Sets the spawn interval, re-arming the spawn loop if it is running.
    pub fn set_spawn_interval(&self, seconds: u64) -> Result<GameConfig, GameError> {
        let config = self.config.set_spawn_interval(seconds)?;
        info!(spawn_interval_secs = seconds, "spawn interval updated");
        let _ = self.scheduler.reschedule(&self.config)?;
        Ok(config)
    }

    /// Resolves an answer attempt.
    pub fn attempt(
        &self,
        round: RoundId,
        actor: &PlayerId,
        choice: usize,
    ) -> Result<AttemptOutcome, GameError> {
        Ok(self.engine.attempt(round, actor, choice)?)
    }

    /// Grouped holdings of `player`; `None` when they hold nothing.
    pub fn holdings(&self, player: &PlayerId) -> Result<Option<Holdings>, GameError> {
        Ok(self
            .engine
            .with_inventory(|inventory| query::holdings(inventory, player))?)
    }

    /// The `top_n` players with the most units.
    pub fn leaderboard(&self, top_n: usize) -> Result<Vec<Standing>, GameError> {
        Ok(self
            .engine
            .with_inventory(|inventory| query::leaderboard(inventory, top_n))?)
    }

    /// Standing of `player`; `None` when they hold nothing.
    pub fn rank(&self, player: &PlayerId) -> Result<Option<Standing>, GameError> {
        Ok(self
            .engine
            .with_inventory(|inventory| query::rank(inventory, player))?)
    }
}
