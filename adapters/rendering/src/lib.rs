#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Text presentation for Tank Catch adapters.
//!
//! Everything here is pure formatting: rounds, outcomes, garages and
//! leaderboards are turned into [`Card`]s or plain [`Reply`] text. The
//! [`ConsolePresenter`] writes them to any [`Write`] sink and implements the
//! engine's [`Presenter`] seam.

use std::{
    collections::HashMap,
    fmt,
    io::{self, Write},
    sync::{
        atomic::{AtomicU64, Ordering},
        Mutex, PoisonError,
    },
};

use tank_catch_core::{
    AttemptOutcome, Catalog, ItemKind, MessageHandle, PlayerId, PresentError, Presenter, RoundId,
    RoundNotice, RoundOutcome,
};
use tank_catch_inventory::query::{Holdings, Standing};
use tracing::debug;

/// Clickable option attached to a card.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Button {
    /// Identifier routed back when the button is pressed.
    pub id: String,
    /// Text shown on the button.
    pub label: String,
    /// Whether the button no longer accepts presses.
    pub disabled: bool,
}

/// Rich message with an optional illustration and buttons.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Card {
    /// Headline of the card.
    pub title: String,
    /// Main text.
    pub body: String,
    /// Trailing note.
    pub footer: Option<String>,
    /// Illustration reference.
    pub image: Option<String>,
    /// Options attached below the card.
    pub buttons: Vec<Button>,
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "== {} ==", self.title)?;
        if !self.body.is_empty() {
            writeln!(f, "{}", self.body)?;
        }
        if let Some(image) = &self.image {
            writeln!(f, "image: {image}")?;
        }
        if !self.buttons.is_empty() {
            let labels: Vec<String> = self
                .buttons
                .iter()
                .enumerate()
                .map(|(index, button)| format!("[{}] {}", index + 1, button.label))
                .collect();
            let closed = if self.buttons.iter().all(|button| button.disabled) {
                " (closed)"
            } else {
                ""
            };
            writeln!(f, "options{closed}: {}", labels.join("  "))?;
        }
        if let Some(footer) = &self.footer {
            writeln!(f, "-- {footer}")?;
        }
        Ok(())
    }
}

/// Response to a chat command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Reply {
    /// Single line of text.
    Text(String),
    /// Rich message.
    Card(Card),
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => writeln!(f, "{text}"),
            Self::Card(card) => write!(f, "{card}"),
        }
    }
}

/// `glyph name` label of a kind.
#[must_use]
pub fn label(catalog: &Catalog, kind: &ItemKind) -> String {
    format!("{} {}", catalog.glyph(kind), kind)
}

/// Identifier of the button selecting option `index` of `round`.
#[must_use]
pub fn button_id(round: RoundId, index: usize) -> String {
    format!("spawn_{round}_{index}")
}

fn buttons(catalog: &Catalog, round: RoundId, options: &[ItemKind], disabled: bool) -> Vec<Button> {
    options
        .iter()
        .enumerate()
        .map(|(index, kind)| Button {
            id: button_id(round, index),
            label: label(catalog, kind),
            disabled,
        })
        .collect()
}

/// Card announcing a freshly spawned round.
#[must_use]
pub fn challenge_card(catalog: &Catalog, notice: &RoundNotice<'_>) -> Card {
    let correct = notice.challenge.correct_kind();
    Card {
        title: format!("🚩 A tank appeared! (round {})", notice.round),
        body: "Pick the right name to identify this tank. The fastest correct guess wins!"
            .to_owned(),
        footer: Some(format!(
            "You have {} seconds to guess!",
            notice.catch_window.as_secs()
        )),
        image: catalog
            .entry(correct)
            .and_then(|entry| entry.image())
            .map(str::to_owned),
        buttons: buttons(catalog, notice.round, notice.challenge.options(), false),
    }
}

/// Card replacing a round's message once it concluded; its buttons are disabled.
#[must_use]
pub fn concluded_card(
    catalog: &Catalog,
    round: RoundId,
    options: &[ItemKind],
    outcome: &RoundOutcome,
) -> Card {
    Card {
        title: format!("Round {round} is over"),
        body: outcome_text(catalog, outcome),
        footer: None,
        image: None,
        buttons: buttons(catalog, round, options, true),
    }
}

fn evolution_line(catalog: &Catalog, from: &ItemKind, to: Option<&ItemKind>) -> String {
    to.map_or_else(String::new, |to| {
        format!(
            "\n🌟 **Evolution!** {} → **{}**!",
            label(catalog, from),
            label(catalog, to)
        )
    })
}

/// Public announcement of a round's outcome.
#[must_use]
pub fn outcome_text(catalog: &Catalog, outcome: &RoundOutcome) -> String {
    match outcome {
        RoundOutcome::Won {
            winner,
            kind,
            evolved,
        } => format!(
            "🏆 {winner} guessed it! It was **{}**!{}",
            label(catalog, kind),
            evolution_line(catalog, kind, evolved.as_ref())
        ),
        RoundOutcome::Expired { kind } => {
            format!("⌛ Time's up! It was **{}**.", label(catalog, kind))
        }
        RoundOutcome::Abandoned { winner, kind } => format!(
            "⚠️ {winner} guessed it, but the catch could not be saved. It was **{}**.",
            label(catalog, kind)
        ),
    }
}

/// Private feedback for the participant who made an attempt.
#[must_use]
pub fn attempt_feedback(catalog: &Catalog, outcome: &AttemptOutcome) -> String {
    match outcome {
        AttemptOutcome::Won { kind, evolved } => format!(
            "🎉 You added **{}** to your garage.{}",
            label(catalog, kind),
            evolution_line(catalog, kind, evolved.as_ref())
        ),
        AttemptOutcome::Incorrect => "😅 Wrong guess!".to_owned(),
        AttemptOutcome::TooLate => "❌ That round is already over.".to_owned(),
        AttemptOutcome::Unknown => "❓ There is no such round.".to_owned(),
    }
}

fn tanks(count: usize) -> String {
    if count == 1 {
        "1 tank".to_owned()
    } else {
        format!("{count} tanks")
    }
}

/// Garage of `owner`, grouped by kind.
#[must_use]
pub fn garage(catalog: &Catalog, owner: &PlayerId, holdings: Option<&Holdings>) -> Reply {
    let Some(holdings) = holdings else {
        return Reply::Text("🪖 Your garage is empty.".to_owned());
    };
    let lines: Vec<String> = holdings
        .iter()
        .map(|line| format!("{} x{}", label(catalog, &line.kind), line.count))
        .collect();
    Reply::Card(Card {
        title: format!("🚗 {owner}'s garage"),
        body: lines.join("\n"),
        footer: Some(format!("{} in total", tanks(holdings.total()))),
        ..Card::default()
    })
}

/// Leaderboard listing the provided standings.
#[must_use]
pub fn leaderboard(standings: &[Standing]) -> Reply {
    if standings.is_empty() {
        return Reply::Text("📉 Nobody has caught a tank yet.".to_owned());
    }
    let lines: Vec<String> = standings
        .iter()
        .map(|standing| {
            format!(
                "#{} {} — **{}**",
                standing.rank,
                standing.player,
                tanks(standing.total)
            )
        })
        .collect();
    Reply::Card(Card {
        title: "🏆 Leaderboard".to_owned(),
        body: lines.join("\n"),
        ..Card::default()
    })
}

/// The caller's own standing.
#[must_use]
pub fn rank(standing: Option<&Standing>) -> Reply {
    Reply::Text(match standing {
        Some(standing) => format!(
            "🏅 You are **rank #{}** with **{}** in your garage.",
            standing.rank,
            tanks(standing.total)
        ),
        None => "📉 You have no tanks in your garage yet.".to_owned(),
    })
}

/// List of chat commands using `prefix`.
#[must_use]
pub fn help(prefix: &str) -> Reply {
    const COMMANDS: [(&str, &str); 9] = [
        ("garage", "Show your tank garage."),
        ("leaderboard", "Show the top 10 players."),
        ("myrank", "Show your own rank."),
        ("catch <round> <option>", "Guess the tank of a round."),
        ("startgame", "Start the game (admin)."),
        ("stopgame", "Stop the game (admin)."),
        ("settime <seconds>", "Set the catch window (admin)."),
        ("setspawn <seconds>", "Set the spawn interval (admin)."),
        ("help", "Show this list."),
    ];
    let body = COMMANDS
        .iter()
        .map(|(usage, summary)| format!("**{prefix}{usage}** — {summary}"))
        .collect::<Vec<_>>()
        .join("\n");
    Reply::Card(Card {
        title: "📖 Commands".to_owned(),
        body,
        ..Card::default()
    })
}

/// Confirmation that the game started.
#[must_use]
pub fn game_started() -> Reply {
    Reply::Text("▶️ The game has started!".to_owned())
}

/// Confirmation that the game stopped.
#[must_use]
pub fn game_stopped() -> Reply {
    Reply::Text("⏹️ The game has stopped.".to_owned())
}

/// Refusal for administrative commands.
#[must_use]
pub fn not_permitted() -> Reply {
    Reply::Text("❌ You do not have permission.".to_owned())
}

/// Confirmation of a new catch window.
#[must_use]
pub fn catch_window_set(seconds: u64) -> Reply {
    Reply::Text(format!("⏲️ Catch time set to {seconds} seconds."))
}

/// Confirmation of a new spawn interval.
#[must_use]
pub fn spawn_interval_set(seconds: u64) -> Reply {
    Reply::Text(format!("🚀 Spawn time set to {seconds} seconds."))
}

/// Hint for a missing, malformed or too small number of seconds.
#[must_use]
pub fn seconds_hint(minimum: u64) -> Reply {
    Reply::Text(format!("⚠️ Enter a number of seconds >= {minimum}."))
}

/// Hint for a malformed catch command.
#[must_use]
pub fn catch_hint(prefix: &str) -> Reply {
    Reply::Text(format!("⚠️ Usage: {prefix}catch <round> <option>"))
}

/// Apology for an internal failure.
#[must_use]
pub fn failure() -> Reply {
    Reply::Text("💥 Something went wrong, please try again.".to_owned())
}

/// Writes rounds and replies as text to a shared sink.
#[derive(Debug)]
pub struct ConsolePresenter<W> {
    catalog: Catalog,
    out: Mutex<W>,
    next: AtomicU64,
    published: Mutex<HashMap<MessageHandle, (RoundId, Vec<ItemKind>)>>,
}

impl<W: Write + Send> ConsolePresenter<W> {
    /// Creates a presenter writing to `out`.
    #[must_use]
    pub fn new(catalog: Catalog, out: W) -> Self {
        Self {
            catalog,
            out: Mutex::new(out),
            next: AtomicU64::new(1),
            published: Mutex::new(HashMap::new()),
        }
    }

    /// Catalog used to label kinds.
    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Writes a command reply.
    pub fn reply(&self, reply: &Reply) -> io::Result<()> {
        self.emit(&reply.to_string())
    }

    /// Writes private feedback addressed to `player`.
    pub fn whisper(&self, player: &PlayerId, text: &str) -> io::Result<()> {
        self.emit(&format!("(to {player}) {text}\n"))
    }

    /// Consumes the presenter, returning the sink.
    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, text: &str) -> io::Result<()> {
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        out.write_all(text.as_bytes())?;
        out.flush()
    }
}

impl<W: Write + Send> Presenter for ConsolePresenter<W> {
    fn present_challenge(&self, notice: &RoundNotice<'_>) -> Result<MessageHandle, PresentError> {
        let card = challenge_card(&self.catalog, notice);
        self.emit(&card.to_string())
            .map_err(|error| PresentError::new(error.to_string()))?;

        let handle = MessageHandle::new(self.next.fetch_add(1, Ordering::Relaxed));
        let _ = self
            .published
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(handle, (notice.round, notice.challenge.options().to_vec()));
        debug!(round = %notice.round, channel = %notice.channel, "challenge presented");
        Ok(handle)
    }

    fn present_outcome(
        &self,
        message: MessageHandle,
        outcome: &RoundOutcome,
    ) -> Result<(), PresentError> {
        let published = self
            .published
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&message);
        let text = match published {
            Some((round, options)) => {
                concluded_card(&self.catalog, round, &options, outcome).to_string()
            }
            None => format!("{}\n", outcome_text(&self.catalog, outcome)),
        };
        self.emit(&text)
            .map_err(|error| PresentError::new(error.to_string()))
    }
}
