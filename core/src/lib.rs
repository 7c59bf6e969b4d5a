#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Tank Catch engine.
//!
//! This crate defines the vocabulary that connects adapters, the
//! authoritative inventory, and the game systems. The challenge generator
//! produces [`Challenge`] values from a [`Catalog`], rounds report their
//! conclusion as a [`RoundOutcome`], and answer attempts resolve into an
//! [`AttemptOutcome`]. Adapters render rounds by implementing [`Presenter`].

use std::{
    collections::HashSet,
    fmt,
    sync::Arc,
    time::{Duration, Instant},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Canonical banner emitted when the experience boots.
pub const WELCOME_BANNER: &str = "Welcome to Tank Catch.";

/// Number of options presented by every challenge.
pub const CHALLENGE_OPTIONS: usize = 3;

/// Smallest spawn interval accepted by [`GameConfig`], in seconds.
pub const MIN_SPAWN_INTERVAL_SECS: u64 = 10;

/// Smallest catch window accepted by [`GameConfig`], in seconds.
pub const MIN_CATCH_WINDOW_SECS: u64 = 5;

/// Spawn interval used until an administrator changes it, in seconds.
pub const DEFAULT_SPAWN_INTERVAL_SECS: u64 = 60;

/// Catch window used until an administrator changes it, in seconds.
pub const DEFAULT_CATCH_WINDOW_SECS: u64 = 15;

/// Glyph shown for kinds that have no catalog entry.
pub const UNKNOWN_GLYPH: &str = "❓";

/// Identity of a chat participant that can own items.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(String);

impl PlayerId {
    /// Creates a player identifier from its textual chat identity.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Textual representation of the identity.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of the chat channel a round is spawned into.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ChannelId(String);

impl ChannelId {
    /// Creates a channel identifier.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Textual representation of the channel.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unique identifier assigned to a spawn round.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoundId(u64);

impl RoundId {
    /// Creates a new round identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RoundId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque handle to the message a presenter published for a round.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageHandle(u64);

impl MessageHandle {
    /// Wraps a presenter-specific message identifier.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Retrieves the presenter-specific message identifier.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

/// Identifier of a collectible item kind, such as a tank model name.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemKind(String);

impl ItemKind {
    /// Creates a kind identifier from its catalog name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Catalog name of the kind.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Static description of a single catalog kind.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CatalogEntry {
    kind: ItemKind,
    glyph: String,
    image: Option<String>,
}

impl CatalogEntry {
    /// Creates a catalog entry with the provided display glyph and illustration.
    #[must_use]
    pub fn new(kind: ItemKind, glyph: impl Into<String>, image: Option<String>) -> Self {
        Self {
            kind,
            glyph: glyph.into(),
            image,
        }
    }

    /// Kind described by the entry.
    #[must_use]
    pub fn kind(&self) -> &ItemKind {
        &self.kind
    }

    /// Short glyph rendered next to the kind's name.
    #[must_use]
    pub fn glyph(&self) -> &str {
        &self.glyph
    }

    /// Reference to the illustration shown while the kind is being guessed.
    #[must_use]
    pub fn image(&self) -> Option<&str> {
        self.image.as_deref()
    }
}

/// Fixed set of kinds that rounds can spawn.
///
/// Entries keep their declaration order so that random selection stays
/// reproducible for a given seed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
}

impl Catalog {
    /// Builds a catalog, rejecting duplicate kinds.
    pub fn new(entries: Vec<CatalogEntry>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::with_capacity(entries.len());
        for entry in &entries {
            if !seen.insert(entry.kind.clone()) {
                return Err(CatalogError::DuplicateKind(entry.kind.clone()));
            }
        }
        Ok(Self { entries })
    }

    /// The standard tank catalog.
    #[must_use]
    pub fn standard() -> Self {
        const TANKS: [(&str, &str, &str); 8] = [
            (
                "T-34-85",
                "🚩",
                "https://upload.wikimedia.org/wikipedia/commons/6/6d/File:T-34_85_D-5T.png",
            ),
            (
                "M4 Sherman",
                "⭐",
                "https://upload.wikimedia.org/wikipedia/commons/0/07/Sherman_tank.png",
            ),
            (
                "Tiger I",
                "🐯",
                "https://upload.wikimedia.org/wikipedia/commons/a/a2/Tiger_I_Bovington.jpg",
            ),
            (
                "Panzer IV",
                "⚙️",
                "https://upload.wikimedia.org/wikipedia/commons/4/47/AAF_Tank_Museum_Panzer_IV.jpg",
            ),
            (
                "Panzer V Panther",
                "🐆",
                "https://upload.wikimedia.org/wikipedia/commons/6/6f/Bundesarchiv_Bild_101I-299-1805-16%2C_Russland%2C_Panzer_V_%28Panther%29.jpg",
            ),
            (
                "KV-1",
                "🛡️",
                "https://upload.wikimedia.org/wikipedia/commons/6/68/Soviet_tank_KV-1_model_1939.jpg",
            ),
            (
                "IS-2",
                "💥",
                "https://upload.wikimedia.org/wikipedia/commons/2/20/IS-2_Cubinka_1.jpg",
            ),
            (
                "Leopard 1",
                "🐆",
                "https://upload.wikimedia.org/wikipedia/commons/8/81/Leopard1_cfb_borden_2.JPG",
            ),
        ];

        Self {
            entries: TANKS
                .iter()
                .map(|(name, glyph, image)| {
                    CatalogEntry::new(ItemKind::new(*name), *glyph, Some((*image).to_owned()))
                })
                .collect(),
        }
    }

    /// Iterator over the catalog entries in declaration order.
    pub fn entries(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.entries.iter()
    }

    /// Iterator over the catalog kinds in declaration order.
    pub fn kinds(&self) -> impl Iterator<Item = &ItemKind> {
        self.entries.iter().map(CatalogEntry::kind)
    }

    /// Number of kinds in the catalog.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Reports whether the catalog has no kinds at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Looks up the entry describing `kind`.
    #[must_use]
    pub fn entry(&self, kind: &ItemKind) -> Option<&CatalogEntry> {
        self.entries.iter().find(|entry| &entry.kind == kind)
    }

    /// Reports whether `kind` belongs to the catalog.
    #[must_use]
    pub fn contains(&self, kind: &ItemKind) -> bool {
        self.entry(kind).is_some()
    }

    /// Glyph for `kind`, falling back to [`UNKNOWN_GLYPH`].
    #[must_use]
    pub fn glyph(&self, kind: &ItemKind) -> &str {
        self.entry(kind).map_or(UNKNOWN_GLYPH, CatalogEntry::glyph)
    }

    /// Fails when the catalog cannot supply a full set of distinct options.
    pub fn ensure_playable(&self) -> Result<(), CatalogError> {
        if self.entries.len() < CHALLENGE_OPTIONS {
            return Err(CatalogError::TooFewKinds {
                found: self.entries.len(),
                required: CHALLENGE_OPTIONS,
            });
        }
        Ok(())
    }
}

/// A multiple-choice identification challenge.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Challenge {
    correct: ItemKind,
    options: Vec<ItemKind>,
    correct_index: usize,
}

impl Challenge {
    /// Builds a challenge from its correct kind and ordered options.
    ///
    /// The options must contain exactly [`CHALLENGE_OPTIONS`] distinct kinds,
    /// one of which is `correct`.
    pub fn new(correct: ItemKind, options: Vec<ItemKind>) -> Result<Self, ChallengeError> {
        if options.len() != CHALLENGE_OPTIONS {
            return Err(ChallengeError::OptionCount {
                found: options.len(),
                expected: CHALLENGE_OPTIONS,
            });
        }

        let mut seen = HashSet::with_capacity(options.len());
        for option in &options {
            if !seen.insert(option) {
                return Err(ChallengeError::DuplicateOption(option.clone()));
            }
        }

        let correct_index = options
            .iter()
            .position(|option| option == &correct)
            .ok_or_else(|| ChallengeError::MissingCorrect(correct.clone()))?;

        Ok(Self {
            correct,
            options,
            correct_index,
        })
    }

    /// Kind that wins the round.
    #[must_use]
    pub fn correct_kind(&self) -> &ItemKind {
        &self.correct
    }

    /// Options in presentation order.
    #[must_use]
    pub fn options(&self) -> &[ItemKind] {
        &self.options
    }

    /// Position of the correct kind within [`Challenge::options`].
    #[must_use]
    pub const fn correct_index(&self) -> usize {
        self.correct_index
    }

    /// Reports whether choosing `option` answers the challenge.
    #[must_use]
    pub const fn is_correct(&self, option: usize) -> bool {
        option == self.correct_index
    }
}

/// Tunable timing of the game, captured whenever a round is created.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GameConfig {
    spawn_interval_secs: u64,
    catch_window_secs: u64,
}

impl GameConfig {
    /// Creates a validated configuration.
    pub fn new(spawn_interval_secs: u64, catch_window_secs: u64) -> Result<Self, ConfigError> {
        Self::default()
            .with_spawn_interval(spawn_interval_secs)?
            .with_catch_window(catch_window_secs)
    }

    /// Returns a copy using the provided spawn interval.
    pub fn with_spawn_interval(self, seconds: u64) -> Result<Self, ConfigError> {
        if seconds < MIN_SPAWN_INTERVAL_SECS {
            return Err(ConfigError::SpawnIntervalTooShort {
                seconds,
                minimum: MIN_SPAWN_INTERVAL_SECS,
            });
        }
        Ok(Self {
            spawn_interval_secs: seconds,
            ..self
        })
    }

    /// Returns a copy using the provided catch window.
    pub fn with_catch_window(self, seconds: u64) -> Result<Self, ConfigError> {
        if seconds < MIN_CATCH_WINDOW_SECS {
            return Err(ConfigError::CatchWindowTooShort {
                seconds,
                minimum: MIN_CATCH_WINDOW_SECS,
            });
        }
        Ok(Self {
            catch_window_secs: seconds,
            ..self
        })
    }

    /// Seconds between scheduled spawns.
    #[must_use]
    pub const fn spawn_interval_secs(&self) -> u64 {
        self.spawn_interval_secs
    }

    /// Seconds a round stays open.
    #[must_use]
    pub const fn catch_window_secs(&self) -> u64 {
        self.catch_window_secs
    }

    /// Time between scheduled spawns.
    #[must_use]
    pub const fn spawn_interval(&self) -> Duration {
        Duration::from_secs(self.spawn_interval_secs)
    }

    /// Time a round stays open before it expires.
    #[must_use]
    pub const fn catch_window(&self) -> Duration {
        Duration::from_secs(self.catch_window_secs)
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            spawn_interval_secs: DEFAULT_SPAWN_INTERVAL_SECS,
            catch_window_secs: DEFAULT_CATCH_WINDOW_SECS,
        }
    }
}

/// Result of a single answer attempt, rendered as private feedback.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// The attempt won the round.
    Won {
        /// Kind added to the winner's inventory.
        kind: ItemKind,
        /// Kind the winner's duplicates evolved into, if any.
        evolved: Option<ItemKind>,
    },
    /// The chosen option was wrong; the round stays open.
    Incorrect,
    /// The round concluded before this attempt could claim it.
    TooLate,
    /// No round with the provided identity was ever opened.
    Unknown,
}

impl AttemptOutcome {
    /// Reports whether the attempt won the round.
    #[must_use]
    pub const fn is_won(&self) -> bool {
        matches!(self, Self::Won { .. })
    }
}

/// Terminal result of a round, reported to the presenter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RoundOutcome {
    /// A participant answered correctly first.
    Won {
        /// Participant that won the round.
        winner: PlayerId,
        /// Kind that was caught.
        kind: ItemKind,
        /// Kind the winner's duplicates evolved into, if any.
        evolved: Option<ItemKind>,
    },
    /// Nobody answered correctly before the deadline.
    Expired {
        /// Kind that was being guessed.
        kind: ItemKind,
    },
    /// A participant answered correctly first but the catch could not be
    /// stored, so nothing was awarded.
    Abandoned {
        /// Participant whose correct answer closed the round.
        winner: PlayerId,
        /// Kind that was being guessed.
        kind: ItemKind,
    },
}

/// Everything a presenter needs to display a freshly opened round.
#[derive(Clone, Copy, Debug)]
pub struct RoundNotice<'a> {
    /// Identity that answer attempts must reference.
    pub round: RoundId,
    /// Channel the round was spawned into.
    pub channel: &'a ChannelId,
    /// Challenge being asked.
    pub challenge: &'a Challenge,
    /// Length of the catch window.
    pub catch_window: Duration,
    /// Instant at which the round expires.
    pub deadline: Instant,
}

/// Boundary to the chat rendering layer.
pub trait Presenter: Send + Sync {
    /// Publishes a new round and returns the handle of the published message.
    fn present_challenge(&self, notice: &RoundNotice<'_>) -> Result<MessageHandle, PresentError>;

    /// Updates the round's message with its terminal outcome.
    fn present_outcome(
        &self,
        message: MessageHandle,
        outcome: &RoundOutcome,
    ) -> Result<(), PresentError>;
}

impl<T: Presenter + ?Sized> Presenter for Arc<T> {
    fn present_challenge(&self, notice: &RoundNotice<'_>) -> Result<MessageHandle, PresentError> {
        (**self).present_challenge(notice)
    }

    fn present_outcome(
        &self,
        message: MessageHandle,
        outcome: &RoundOutcome,
    ) -> Result<(), PresentError> {
        (**self).present_outcome(message, outcome)
    }
}

/// Reasons a catalog cannot be used.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum CatalogError {
    /// The catalog lists the same kind more than once.
    #[error("catalog lists kind `{0}` more than once")]
    DuplicateKind(ItemKind),
    /// The catalog cannot supply enough distinct options.
    #[error("catalog has {found} kinds but challenges need at least {required}")]
    TooFewKinds {
        /// Kinds present in the catalog.
        found: usize,
        /// Kinds required to build a challenge.
        required: usize,
    },
    /// A referenced kind is not part of the catalog.
    #[error("kind `{0}` is not part of the catalog")]
    UnknownKind(ItemKind),
    /// A generated challenge violated its invariants.
    #[error(transparent)]
    Challenge(#[from] ChallengeError),
}

/// Reasons a challenge cannot be constructed.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ChallengeError {
    /// The number of options differs from [`CHALLENGE_OPTIONS`].
    #[error("challenge needs {expected} options, got {found}")]
    OptionCount {
        /// Options provided.
        found: usize,
        /// Options required.
        expected: usize,
    },
    /// The same kind appears twice among the options.
    #[error("challenge option `{0}` appears more than once")]
    DuplicateOption(ItemKind),
    /// The correct kind is not among the options.
    #[error("correct kind `{0}` is missing from the options")]
    MissingCorrect(ItemKind),
}

/// Reasons a configuration value is rejected.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The spawn interval is below the accepted minimum.
    #[error("spawn interval must be at least {minimum} seconds, got {seconds}")]
    SpawnIntervalTooShort {
        /// Requested interval.
        seconds: u64,
        /// Smallest accepted interval.
        minimum: u64,
    },
    /// The catch window is below the accepted minimum.
    #[error("catch window must be at least {minimum} seconds, got {seconds}")]
    CatchWindowTooShort {
        /// Requested window.
        seconds: u64,
        /// Smallest accepted window.
        minimum: u64,
    },
}

/// Failure reported by the rendering layer.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("presentation failed: {message}")]
pub struct PresentError {
    message: String,
}

impl PresentError {
    /// Creates an error carrying a human readable description.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Human readable description of the failure.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

#[cfg(test)]
mod tests {
    use super::{
        Catalog, CatalogEntry, CatalogError, Challenge, ChallengeError, ConfigError, GameConfig,
        ItemKind, PlayerId, UNKNOWN_GLYPH,
    };

    fn kind(name: &str) -> ItemKind {
        ItemKind::new(name)
    }

    #[test]
    fn challenge_records_correct_index() {
        let challenge = Challenge::new(kind("A"), vec![kind("C"), kind("A"), kind("B")])
            .expect("valid challenge");
        assert_eq!(challenge.correct_index(), 1);
        assert!(challenge.is_correct(1));
        assert!(!challenge.is_correct(0));
        assert!(!challenge.is_correct(7));
    }

    #[test]
    fn challenge_rejects_duplicate_options() {
        let error = Challenge::new(kind("A"), vec![kind("A"), kind("B"), kind("B")])
            .expect_err("duplicates rejected");
        assert_eq!(error, ChallengeError::DuplicateOption(kind("B")));
    }

    #[test]
    fn challenge_rejects_missing_correct_kind() {
        let error = Challenge::new(kind("D"), vec![kind("A"), kind("B"), kind("C")])
            .expect_err("missing correct rejected");
        assert_eq!(error, ChallengeError::MissingCorrect(kind("D")));
    }

    #[test]
    fn challenge_rejects_wrong_option_count() {
        let error =
            Challenge::new(kind("A"), vec![kind("A"), kind("B")]).expect_err("two options");
        assert_eq!(
            error,
            ChallengeError::OptionCount {
                found: 2,
                expected: 3
            }
        );
    }

    #[test]
    fn config_rejects_values_below_minimum() {
        assert_eq!(
            GameConfig::new(9, 15),
            Err(ConfigError::SpawnIntervalTooShort {
                seconds: 9,
                minimum: 10
            })
        );
        assert_eq!(
            GameConfig::new(60, 4),
            Err(ConfigError::CatchWindowTooShort {
                seconds: 4,
                minimum: 5
            })
        );
    }

    #[test]
    fn config_accepts_boundary_values() {
        let config = GameConfig::new(10, 5).expect("minimums accepted");
        assert_eq!(config.spawn_interval_secs(), 10);
        assert_eq!(config.catch_window_secs(), 5);
    }

    #[test]
    fn config_defaults_to_one_minute_spawns() {
        let config = GameConfig::default();
        assert_eq!(config.spawn_interval_secs(), 60);
        assert_eq!(config.catch_window_secs(), 15);
    }

    #[test]
    fn catalog_rejects_duplicates() {
        let entries = vec![
            CatalogEntry::new(kind("A"), "a", None),
            CatalogEntry::new(kind("A"), "b", None),
        ];
        assert_eq!(
            Catalog::new(entries),
            Err(CatalogError::DuplicateKind(kind("A")))
        );
    }

    #[test]
    fn small_catalog_is_not_playable() {
        let catalog = Catalog::new(vec![
            CatalogEntry::new(kind("A"), "a", None),
            CatalogEntry::new(kind("B"), "b", None),
        ])
        .expect("catalog");
        assert_eq!(
            catalog.ensure_playable(),
            Err(CatalogError::TooFewKinds {
                found: 2,
                required: 3
            })
        );
    }

    #[test]
    fn standard_catalog_resolves_glyphs() {
        let catalog = Catalog::standard();
        assert_eq!(catalog.len(), 8);
        assert!(catalog.ensure_playable().is_ok());
        assert_eq!(catalog.glyph(&kind("Tiger I")), "🐯");
        assert_eq!(catalog.glyph(&kind("Maus")), UNKNOWN_GLYPH);
    }

    #[test]
    fn identifiers_serialize_as_plain_strings() {
        let player = serde_json::to_string(&PlayerId::new("1234")).expect("serialize");
        assert_eq!(player, "\"1234\"");
        let restored: ItemKind = serde_json::from_str("\"IS-2\"").expect("deserialize");
        assert_eq!(restored, kind("IS-2"));
    }
}
