use std::sync::{Mutex, MutexGuard, PoisonError};

use tank_catch_core::{ChannelId, Challenge, MessageHandle, PlayerId, RoundId};
use tokio::{task::AbortHandle, time::Instant};

/// Lifecycle state of a spawn round.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RoundPhase {
    /// The round accepts answer attempts.
    Active,
    /// A participant answered correctly first.
    Won {
        /// Participant that claimed the round.
        winner: PlayerId,
    },
    /// The catch window elapsed without a correct answer.
    Expired,
}

impl RoundPhase {
    /// Reports whether the phase is terminal.
    #[must_use]
    pub const fn is_concluded(&self) -> bool {
        !matches!(self, Self::Active)
    }
}

/// A single timed challenge published to a channel.
///
/// The phase only ever moves out of [`RoundPhase::Active`] once; [`SpawnRound::claim`]
/// and [`SpawnRound::expire`] are the two competing transitions and both are
/// resolved under the round's own lock.
#[derive(Debug)]
pub struct SpawnRound {
    id: RoundId,
    channel: ChannelId,
    challenge: Challenge,
    deadline: Instant,
    message: MessageHandle,
    phase: Mutex<RoundPhase>,
    timer: Mutex<Option<AbortHandle>>,
}

impl SpawnRound {
    pub(crate) fn new(
        id: RoundId,
        channel: ChannelId,
        challenge: Challenge,
        deadline: Instant,
        message: MessageHandle,
    ) -> Self {
        Self {
            id,
            channel,
            challenge,
            deadline,
            message,
            phase: Mutex::new(RoundPhase::Active),
            timer: Mutex::new(None),
        }
    }

    /// Identity of the round.
    #[must_use]
    pub const fn id(&self) -> RoundId {
        self.id
    }

    /// Channel the round was spawned into.
    #[must_use]
    pub fn channel(&self) -> &ChannelId {
        &self.channel
    }

    /// Challenge being asked.
    #[must_use]
    pub fn challenge(&self) -> &Challenge {
        &self.challenge
    }

    /// Instant at which the round expires.
    #[must_use]
    pub const fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Message the presenter published for the round.
    #[must_use]
    pub const fn message(&self) -> MessageHandle {
        self.message
    }

    /// Snapshot of the current phase.
    #[must_use]
    pub fn phase(&self) -> RoundPhase {
        self.lock_phase().clone()
    }

    /// Reports whether the round still accepts attempts.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.lock_phase().is_concluded()
    }

    /// Participant that won the round, if any.
    #[must_use]
    pub fn winner(&self) -> Option<PlayerId> {
        match &*self.lock_phase() {
            RoundPhase::Won { winner } => Some(winner.clone()),
            RoundPhase::Active | RoundPhase::Expired => None,
        }
    }

    /// Moves an active round to [`RoundPhase::Won`].
    ///
    /// Returns `true` only for the caller that performed the transition.
    pub fn claim(&self, actor: &PlayerId) -> bool {
        let mut phase = self.lock_phase();
        if phase.is_concluded() {
            return false;
        }
        *phase = RoundPhase::Won {
            winner: actor.clone(),
        };
        true
    }

    /// Moves an active round to [`RoundPhase::Expired`].
    ///
    /// Returns `false` when the round already concluded; a won round is never
    /// overridden.
    pub fn expire(&self) -> bool {
        let mut phase = self.lock_phase();
        if phase.is_concluded() {
            return false;
        }
        *phase = RoundPhase::Expired;
        true
    }

    pub(crate) fn arm_timer(&self, timer: AbortHandle) {
        let mut slot = lock(&self.timer);
        if self.is_active() {
            *slot = Some(timer);
        } else {
            timer.abort();
        }
    }

    pub(crate) fn cancel_timer(&self) {
        if let Some(timer) = lock(&self.timer).take() {
            timer.abort();
        }
    }

    fn lock_phase(&self) -> MutexGuard<'_, RoundPhase> {
        lock(&self.phase)
    }
}

// Every critical section leaves the guarded value consistent, so a poisoned
// lock still holds a usable value.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::{RoundPhase, SpawnRound};
    use tank_catch_core::{ChannelId, Challenge, ItemKind, MessageHandle, PlayerId, RoundId};
    use tokio::time::Instant;

    fn round() -> SpawnRound {
        let kind = |name: &str| ItemKind::new(name);
        let challenge =
            Challenge::new(kind("A"), vec![kind("C"), kind("A"), kind("B")]).expect("challenge");
        SpawnRound::new(
            RoundId::new(1),
            ChannelId::new("general"),
            challenge,
            Instant::now(),
            MessageHandle::new(1),
        )
    }

    #[test]
    fn first_claim_wins() {
        let round = round();
        assert!(round.claim(&PlayerId::new("first")));
        assert!(!round.claim(&PlayerId::new("second")));
        assert_eq!(round.winner(), Some(PlayerId::new("first")));
    }

    #[test]
    fn expiry_never_overrides_a_win() {
        let round = round();
        assert!(round.claim(&PlayerId::new("first")));
        assert!(!round.expire());
        assert_eq!(
            round.phase(),
            RoundPhase::Won {
                winner: PlayerId::new("first")
            }
        );
    }

    #[test]
    fn expired_round_cannot_be_claimed() {
        let round = round();
        assert!(round.expire());
        assert!(!round.expire());
        assert!(!round.claim(&PlayerId::new("late")));
        assert_eq!(round.phase(), RoundPhase::Expired);
        assert!(!round.is_active());
        assert_eq!(round.winner(), None);
    }
}
