use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock},
    time::Duration,
};

use tank_catch_core::{ChannelId, ConfigError, GameConfig, Presenter};
use tank_catch_system_rounds::{RoundEngine, RoundError};
use tokio::{
    runtime::Handle,
    task::JoinHandle,
    time::{interval_at, Instant, MissedTickBehavior},
};
use tracing::{debug, error, info, warn};

/// Game configuration shared between administrators and the spawn loop.
///
/// Every spawn reads a fresh snapshot, so updates apply from the next round on.
#[derive(Clone, Debug, Default)]
pub struct SharedConfig {
    inner: Arc<RwLock<GameConfig>>,
}

impl SharedConfig {
    /// Wraps an initial configuration.
    #[must_use]
    pub fn new(config: GameConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(config)),
        }
    }

    /// Current configuration.
    #[must_use]
    pub fn snapshot(&self) -> GameConfig {
        *self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Changes the catch window, rejecting values below the minimum.
    pub fn set_catch_window(&self, seconds: u64) -> Result<GameConfig, ConfigError> {
        self.update(|config| config.with_catch_window(seconds))
    }

    /// Changes the spawn interval, rejecting values below the minimum.
    pub fn set_spawn_interval(&self, seconds: u64) -> Result<GameConfig, ConfigError> {
        self.update(|config| config.with_spawn_interval(seconds))
    }

    fn update(
        &self,
        change: impl FnOnce(GameConfig) -> Result<GameConfig, ConfigError>,
    ) -> Result<GameConfig, ConfigError> {
        let mut current = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let next = change(*current)?;
        *current = next;
        Ok(next)
    }
}

struct Running {
    channel: ChannelId,
    task: JoinHandle<()>,
}

/// Cancellable repeating timer that spawns rounds into one channel.
pub struct SpawnScheduler<P> {
    engine: RoundEngine<P>,
    running: Mutex<Option<Running>>,
}

impl<P: Presenter + 'static> SpawnScheduler<P> {
    /// Creates an idle scheduler.
    #[must_use]
    pub fn new(engine: RoundEngine<P>) -> Self {
        Self {
            engine,
            running: Mutex::new(None),
        }
    }

    /// Starts spawning into `channel`, replacing any loop already running.
    ///
    /// The first round spawns one interval after the call. The interval is
    /// read from `config` now; the catch window is read at every spawn.
    pub fn start(&self, channel: ChannelId, config: &SharedConfig) -> Result<(), RoundError> {
        let mut running = self.lock();
        self.launch(&mut running, channel, config)
    }

    /// Stops spawning. Rounds already open run to their natural end.
    ///
    /// Returns `false` when no loop was running.
    pub fn stop(&self) -> bool {
        match self.lock().take() {
            Some(running) => {
                running.task.abort();
                info!(channel = %running.channel, "spawn loop stopped");
                true
            }
            None => false,
        }
    }

    /// Restarts a running loop so it picks up the current interval.
    ///
    /// Returns `false` when no loop was running. A concurrent [`stop`] either
    /// lands before the check or stops the restarted loop.
    ///
    /// [`stop`]: Self::stop
    pub fn reschedule(&self, config: &SharedConfig) -> Result<bool, RoundError> {
        let mut running = self.lock();
        let Some(channel) = running.as_ref().map(|current| current.channel.clone()) else {
            return Ok(false);
        };
        self.launch(&mut running, channel, config)?;
        Ok(true)
    }

    fn launch(
        &self,
        running: &mut Option<Running>,
        channel: ChannelId,
        config: &SharedConfig,
    ) -> Result<(), RoundError> {
        let runtime = Handle::try_current().map_err(|_| RoundError::NoRuntime)?;
        let period = config.snapshot().spawn_interval();
        let task = runtime.spawn(spawn_loop(
            self.engine.clone(),
            channel.clone(),
            config.clone(),
            period,
        ));

        let previous = running.replace(Running {
            channel: channel.clone(),
            task,
        });
        if let Some(previous) = previous {
            previous.task.abort();
            debug!(channel = %previous.channel, "previous spawn loop cancelled");
        }
        info!(channel = %channel, interval_secs = period.as_secs(), "spawn loop started");
        Ok(())
    }

    /// Reports whether a spawn loop is armed.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.lock().is_some()
    }

    /// Channel the running loop spawns into.
    #[must_use]
    pub fn channel(&self) -> Option<ChannelId> {
        self.lock().as_ref().map(|running| running.channel.clone())
    }

    fn lock(&self) -> MutexGuard<'_, Option<Running>> {
        self.running.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<P> Drop for SpawnScheduler<P> {
    fn drop(&mut self) {
        let running = self
            .running
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(running) = running {
            running.task.abort();
        }
    }
}

async fn spawn_loop<P: Presenter + 'static>(
    engine: RoundEngine<P>,
    channel: ChannelId,
    config: SharedConfig,
    period: Duration,
) {
    let mut ticks = interval_at(Instant::now() + period, period);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        let _ = ticks.tick().await;
        let snapshot = config.snapshot();
        let spawner = engine.clone();
        let target = channel.clone();

        // A panicking presenter only loses this tick.
        let spawned = tokio::spawn(async move { spawner.spawn_round(&target, &snapshot) }).await;
        match spawned {
            Ok(Ok(round)) => debug!(round = %round, channel = %channel, "scheduled spawn"),
            Ok(Err(failure)) => {
                warn!(channel = %channel, error = %failure, "scheduled spawn failed");
            }
            Err(failure) => {
                error!(channel = %channel, error = %failure, "scheduled spawn panicked");
            }
        }
    }
}
