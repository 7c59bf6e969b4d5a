use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tank_catch_core::{
    AttemptOutcome, Catalog, CatalogError, ChannelId, Challenge, GameConfig, ItemKind, PlayerId,
    Presenter, RoundId, RoundNotice, RoundOutcome,
};
use tank_catch_inventory::{Inventory, InventoryError};
use tank_catch_system_challenge::ChallengeGenerator;
use tank_catch_system_evolution::Evolution;
use tokio::{runtime::Handle, time::Instant};
use tracing::{debug, error, info, warn};

use crate::{Lookup, RoundError, RoundRegistry, SpawnRound};

/// Inventory shared between the round engine and the query surface.
pub type SharedInventory = Arc<Mutex<Inventory>>;

/// Opens rounds, resolves answer attempts and settles outcomes.
///
/// Cloning is cheap; clones share the same registry, inventory and presenter.
pub struct RoundEngine<P> {
    inner: Arc<EngineInner<P>>,
}

struct EngineInner<P> {
    catalog: Catalog,
    evolution: Evolution,
    generator: Mutex<ChallengeGenerator>,
    inventory: SharedInventory,
    registry: RoundRegistry,
    presenter: P,
}

impl<P> Clone for RoundEngine<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<P: Presenter + 'static> RoundEngine<P> {
    /// Creates an engine over a playable catalog.
    ///
    /// Fails when the catalog cannot build challenges or when the evolution
    /// table references kinds outside the catalog.
    pub fn new(
        catalog: Catalog,
        evolution: Evolution,
        generator: ChallengeGenerator,
        inventory: SharedInventory,
        presenter: P,
    ) -> Result<Self, CatalogError> {
        catalog.ensure_playable()?;
        evolution.table().validate(&catalog)?;
        Ok(Self {
            inner: Arc::new(EngineInner {
                catalog,
                evolution,
                generator: Mutex::new(generator),
                inventory,
                registry: RoundRegistry::new(),
                presenter,
            }),
        })
    }

    /// Catalog the engine draws challenges from.
    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.inner.catalog
    }

    /// Registry of live rounds.
    #[must_use]
    pub fn registry(&self) -> &RoundRegistry {
        &self.inner.registry
    }

    /// Inventory updated by won rounds.
    #[must_use]
    pub fn inventory(&self) -> &SharedInventory {
        &self.inner.inventory
    }

    /// Runs `read` against the inventory.
    pub fn with_inventory<R>(&self, read: impl FnOnce(&Inventory) -> R) -> Result<R, RoundError> {
        let inventory = self
            .inner
            .inventory
            .lock()
            .map_err(|_| RoundError::InventoryPoisoned)?;
        Ok(read(&inventory))
    }

    /// Generates a challenge and opens a round for it in `channel`.
    pub fn spawn_round(
        &self,
        channel: &ChannelId,
        config: &GameConfig,
    ) -> Result<RoundId, RoundError> {
        let challenge = self.lock_generator().generate(&self.inner.catalog)?;
        self.open_round(channel, challenge, config)
    }

    /// Opens a round for a prepared challenge.
    ///
    /// The round is presented, registered and given a deadline timer of the
    /// catch window captured from `config`. Must be called from within a tokio
    /// runtime, which drives the timer.
    pub fn open_round(
        &self,
        channel: &ChannelId,
        challenge: Challenge,
        config: &GameConfig,
    ) -> Result<RoundId, RoundError> {
        let runtime = Handle::try_current().map_err(|_| RoundError::NoRuntime)?;
        if let Some(stranger) = challenge
            .options()
            .iter()
            .find(|option| !self.inner.catalog.contains(option))
        {
            return Err(CatalogError::UnknownKind(stranger.clone()).into());
        }

        let registry = &self.inner.registry;
        let id = registry.reserve();
        let catch_window = config.catch_window();
        let deadline = Instant::now() + catch_window;
        let notice = RoundNotice {
            round: id,
            channel,
            challenge: &challenge,
            catch_window,
            deadline: deadline.into_std(),
        };
        let message = match self.inner.presenter.present_challenge(&notice) {
            Ok(message) => message,
            Err(error) => {
                registry.release(id);
                return Err(error.into());
            }
        };

        let round = Arc::new(SpawnRound::new(
            id,
            channel.clone(),
            challenge,
            deadline,
            message,
        ));
        registry.register(Arc::clone(&round));

        let engine = self.clone();
        let timed = Arc::clone(&round);
        let timer = runtime.spawn(async move {
            tokio::time::sleep_until(timed.deadline()).await;
            engine.expire(&timed);
        });
        round.arm_timer(timer.abort_handle());

        info!(
            round = %id,
            channel = %channel,
            kind = %round.challenge().correct_kind(),
            catch_window_secs = config.catch_window_secs(),
            "round spawned"
        );
        Ok(id)
    }

    /// Resolves an answer attempt against `round`.
    ///
    /// Only the first correct attempt wins; it is awarded the round's kind and
    /// may trigger an evolution. Every later attempt observes
    /// [`AttemptOutcome::TooLate`].
    ///
    /// A winning attempt whose catch cannot be stored closes the round as
    /// [`RoundOutcome::Abandoned`] and returns [`RoundError::Persistence`].
    /// When only the evolution cannot be stored, the win is announced and the
    /// error is still returned.
    pub fn attempt(
        &self,
        round: RoundId,
        actor: &PlayerId,
        choice: usize,
    ) -> Result<AttemptOutcome, RoundError> {
        let spawned = match self.inner.registry.lookup(round) {
            Lookup::Active(spawned) => spawned,
            Lookup::Concluded => return Ok(AttemptOutcome::TooLate),
            Lookup::Opening | Lookup::Unknown => {
                debug!(round = %round, player = %actor, "attempt on unknown round");
                return Ok(AttemptOutcome::Unknown);
            }
        };

        if !spawned.is_active() {
            return Ok(AttemptOutcome::TooLate);
        }
        if !spawned.challenge().is_correct(choice) {
            debug!(round = %round, player = %actor, choice, "incorrect attempt");
            return Ok(AttemptOutcome::Incorrect);
        }
        if !spawned.claim(actor) {
            debug!(round = %round, player = %actor, "correct attempt lost the race");
            return Ok(AttemptOutcome::TooLate);
        }

        spawned.cancel_timer();
        self.award(&spawned, actor)
    }

    fn award(&self, round: &SpawnRound, winner: &PlayerId) -> Result<AttemptOutcome, RoundError> {
        let kind = round.challenge().correct_kind().clone();
        let _ = self.inner.registry.unregister(round.id());

        let evolution = match self.record_catch(winner, &kind) {
            Ok(evolution) => evolution,
            Err(failure) => {
                error!(
                    round = %round.id(),
                    player = %winner,
                    kind = %kind,
                    error = %failure,
                    "failed to record catch"
                );
                self.publish(
                    round,
                    &RoundOutcome::Abandoned {
                        winner: winner.clone(),
                        kind,
                    },
                );
                return Err(failure);
            }
        };

        // The caught unit is stored from here on.
        let (evolved, failure) = match evolution {
            Ok(evolved) => (evolved, None),
            Err(failure) => {
                error!(
                    round = %round.id(),
                    player = %winner,
                    kind = %kind,
                    error = %failure,
                    "failed to apply evolution"
                );
                (None, Some(failure))
            }
        };

        info!(round = %round.id(), player = %winner, kind = %kind, "round won");
        self.publish(
            round,
            &RoundOutcome::Won {
                winner: winner.clone(),
                kind: kind.clone(),
                evolved: evolved.clone(),
            },
        );
        match failure {
            Some(failure) => Err(failure.into()),
            None => Ok(AttemptOutcome::Won { kind, evolved }),
        }
    }

    /// Adds the caught unit, then attempts the evolution it may trigger.
    ///
    /// The outer error means nothing was stored; the inner one means only the
    /// evolution was not applied.
    fn record_catch(
        &self,
        winner: &PlayerId,
        kind: &ItemKind,
    ) -> Result<Result<Option<ItemKind>, InventoryError>, RoundError> {
        let mut inventory = self
            .inner
            .inventory
            .lock()
            .map_err(|_| RoundError::InventoryPoisoned)?;
        inventory.add_item(winner, kind.clone())?;
        Ok(self.inner.evolution.try_evolve(&mut inventory, winner, kind))
    }

    fn expire(&self, round: &SpawnRound) {
        if !round.expire() {
            debug!(round = %round.id(), "deadline reached after conclusion");
            return;
        }
        let _ = self.inner.registry.unregister(round.id());

        let kind = round.challenge().correct_kind().clone();
        info!(round = %round.id(), kind = %kind, "round expired");
        self.publish(round, &RoundOutcome::Expired { kind });
    }

    fn publish(&self, round: &SpawnRound, outcome: &RoundOutcome) {
        if let Err(failure) = self
            .inner
            .presenter
            .present_outcome(round.message(), outcome)
        {
            warn!(round = %round.id(), error = %failure, "failed to present outcome");
        }
    }

    fn lock_generator(&self) -> MutexGuard<'_, ChallengeGenerator> {
        self.inner
            .generator
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
