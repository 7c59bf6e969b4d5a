use std::{
    collections::HashSet,
    io::{self, Write},
    sync::Arc,
};

use tank_catch_core::{
    ChannelId, ConfigError, GameConfig, PlayerId, RoundId, MIN_CATCH_WINDOW_SECS,
    MIN_SPAWN_INTERVAL_SECS, WELCOME_BANNER,
};
use tank_catch_rendering::{self as rendering, ConsolePresenter, Reply};
use tank_catch_system_spawning::{Game, GameError, LEADERBOARD_SIZE};
use tracing::{debug, error, warn};

use crate::commands::{parse_chat_command, ChatCommand};

/// Presenter shared by the engine and the session.
pub(crate) type SharedPresenter<W> = Arc<ConsolePresenter<W>>;

enum Response {
    Public(Reply),
    Private(Reply),
    Silent,
}

/// Console chat room: turns `<author>: <message>` lines into game actions.
pub(crate) struct Session<W: Write + Send + 'static> {
    game: Game<SharedPresenter<W>>,
    presenter: SharedPresenter<W>,
    prefix: String,
    admins: HashSet<PlayerId>,
    channel: ChannelId,
}

impl<W: Write + Send + 'static> Session<W> {
    pub(crate) fn new(
        game: Game<SharedPresenter<W>>,
        presenter: SharedPresenter<W>,
        prefix: String,
        admins: impl IntoIterator<Item = PlayerId>,
        channel: ChannelId,
    ) -> Self {
        Self {
            game,
            presenter,
            prefix,
            admins: admins.into_iter().collect(),
            channel,
        }
    }

    pub(crate) fn greet(&self) -> io::Result<()> {
        self.presenter.reply(&Reply::Text(WELCOME_BANNER.to_owned()))?;
        self.presenter.reply(&Reply::Text(format!(
            "Type `<name>: {}help` to list the commands.",
            self.prefix
        )))
    }

    /// Starts spawning into the session channel.
    pub(crate) fn start(&self) -> Result<(), GameError> {
        self.game.start_game(self.channel.clone())
    }

    /// Stops spawning; returns `false` when nothing was running.
    pub(crate) fn stop(&self) -> bool {
        self.game.stop_game()
    }

    /// Handles one line of console input.
    pub(crate) fn handle_line(&self, line: &str) -> io::Result<()> {
        let Some((author, message)) = line.split_once(':') else {
            if !line.trim().is_empty() {
                warn!("ignoring line without `<name>:` prefix");
            }
            return Ok(());
        };
        let author = author.trim();
        if author.is_empty() {
            return Ok(());
        }
        let author = PlayerId::new(author);

        let Some(command) = parse_chat_command(&self.prefix, message) else {
            return Ok(());
        };
        match self.dispatch(&author, command) {
            Response::Public(reply) => self.presenter.reply(&reply),
            Response::Private(reply) => self
                .presenter
                .whisper(&author, reply.to_string().trim_end()),
            Response::Silent => Ok(()),
        }
    }

    fn dispatch(&self, author: &PlayerId, command: ChatCommand) -> Response {
        match command {
            ChatCommand::Garage => self.query(|game| {
                let holdings = game.holdings(author)?;
                Ok(rendering::garage(
                    self.presenter.catalog(),
                    author,
                    holdings.as_ref(),
                ))
            }),
            ChatCommand::Leaderboard => self.query(|game| {
                Ok(rendering::leaderboard(&game.leaderboard(LEADERBOARD_SIZE)?))
            }),
            ChatCommand::MyRank => {
                self.query(|game| Ok(rendering::rank(game.rank(author)?.as_ref())))
            }
            ChatCommand::Help => Response::Public(rendering::help(&self.prefix)),
            ChatCommand::Catch(Some((round, choice))) => self.catch(author, round, choice),
            ChatCommand::Catch(None) => Response::Private(rendering::catch_hint(&self.prefix)),
            ChatCommand::Unknown(name) => {
                debug!(command = %name, "unknown command ignored");
                Response::Silent
            }
            admin if !self.admins.contains(author) => {
                debug!(player = %author, command = ?admin, "admin command refused");
                Response::Public(rendering::not_permitted())
            }
            ChatCommand::StartGame => match self.start() {
                Ok(()) => Response::Public(rendering::game_started()),
                Err(failure) => {
                    error!(error = %failure, "failed to start the game");
                    Response::Public(rendering::failure())
                }
            },
            ChatCommand::StopGame => {
                let _ = self.stop();
                Response::Public(rendering::game_stopped())
            }
            ChatCommand::SetTime(seconds) => self.configure(
                seconds,
                MIN_CATCH_WINDOW_SECS,
                |game, seconds| game.set_catch_window(seconds),
                rendering::catch_window_set,
            ),
            ChatCommand::SetSpawn(seconds) => self.configure(
                seconds,
                MIN_SPAWN_INTERVAL_SECS,
                |game, seconds| game.set_spawn_interval(seconds),
                rendering::spawn_interval_set,
            ),
        }
    }

    fn catch(&self, author: &PlayerId, round: RoundId, choice: usize) -> Response {
        match self.game.attempt(round, author, choice) {
            Ok(outcome) => Response::Private(Reply::Text(rendering::attempt_feedback(
                self.presenter.catalog(),
                &outcome,
            ))),
            Err(failure) => {
                error!(round = %round, player = %author, error = %failure, "attempt failed");
                Response::Private(rendering::failure())
            }
        }
    }

    fn configure(
        &self,
        seconds: Option<u64>,
        minimum: u64,
        apply: impl FnOnce(&Game<SharedPresenter<W>>, u64) -> Result<GameConfig, GameError>,
        confirm: fn(u64) -> Reply,
    ) -> Response {
        let Some(seconds) = seconds else {
            return Response::Public(rendering::seconds_hint(minimum));
        };
        match apply(&self.game, seconds) {
            Ok(_) => Response::Public(confirm(seconds)),
            Err(GameError::Config(
                ConfigError::CatchWindowTooShort { minimum, .. }
                | ConfigError::SpawnIntervalTooShort { minimum, .. },
            )) => Response::Public(rendering::seconds_hint(minimum)),
            Err(failure) => {
                error!(error = %failure, "failed to apply setting");
                Response::Public(rendering::failure())
            }
        }
    }

    fn query(
        &self,
        read: impl FnOnce(&Game<SharedPresenter<W>>) -> Result<Reply, GameError>,
    ) -> Response {
        match read(&self.game) {
            Ok(reply) => Response::Public(reply),
            Err(failure) => {
                error!(error = %failure, "query failed");
                Response::Public(rendering::failure())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        io::{self, Write},
        sync::{Arc, Mutex},
        time::Duration,
    };

    use super::Session;
    use tank_catch_core::{Catalog, ChannelId, GameConfig, PlayerId};
    use tank_catch_inventory::Inventory;
    use tank_catch_rendering::ConsolePresenter;
    use tank_catch_system_challenge::ChallengeGenerator;
    use tank_catch_system_evolution::{Evolution, EvolutionTable};
    use tank_catch_system_rounds::{Lookup, RoundEngine};
    use tank_catch_system_spawning::Game;

    #[derive(Clone, Default)]
    struct Sink(Arc<Mutex<Vec<u8>>>);

    impl Sink {
        fn drain(&self) -> String {
            let bytes = std::mem::take(&mut *self.0.lock().expect("sink"));
            String::from_utf8(bytes).expect("utf-8 output")
        }
    }

    impl Write for Sink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().expect("sink").extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn session(admins: &[&str]) -> (Session<Sink>, Sink) {
        let sink = Sink::default();
        let catalog = Catalog::standard();
        let presenter = Arc::new(ConsolePresenter::new(catalog.clone(), sink.clone()));
        let engine = RoundEngine::new(
            catalog,
            Evolution::new(EvolutionTable::standard()),
            ChallengeGenerator::seeded(3),
            Arc::new(Mutex::new(Inventory::in_memory())),
            Arc::clone(&presenter),
        )
        .expect("engine");
        let session = Session::new(
            Game::new(engine, GameConfig::default()),
            presenter,
            "!".to_owned(),
            admins.iter().map(|admin| PlayerId::new(*admin)),
            ChannelId::new("general"),
        );
        (session, sink)
    }

    fn say(session: &Session<Sink>, line: &str) {
        session.handle_line(line).expect("write output");
    }

    #[tokio::test(start_paused = true)]
    async fn admin_commands_require_permission() {
        let (session, sink) = session(&["boss"]);

        say(&session, "guest: !startgame");
        assert_eq!(sink.drain(), "❌ You do not have permission.\n");
        assert!(!session.game.is_running());

        say(&session, "boss: !startgame");
        assert_eq!(sink.drain(), "▶️ The game has started!\n");
        assert!(session.game.is_running());

        say(&session, "boss: !stopgame");
        assert_eq!(sink.drain(), "⏹️ The game has stopped.\n");
        assert!(!session.game.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn settings_are_validated() {
        let (session, sink) = session(&["boss"]);

        say(&session, "boss: !settime soon");
        assert_eq!(sink.drain(), "⚠️ Enter a number of seconds >= 5.\n");
        say(&session, "boss: !settime 4");
        assert_eq!(sink.drain(), "⚠️ Enter a number of seconds >= 5.\n");
        say(&session, "boss: !setspawn 9");
        assert_eq!(sink.drain(), "⚠️ Enter a number of seconds >= 10.\n");
        assert_eq!(session.game.config(), GameConfig::default());

        say(&session, "boss: !settime 20");
        assert_eq!(sink.drain(), "⏲️ Catch time set to 20 seconds.\n");
        say(&session, "boss: !setspawn 30");
        assert_eq!(sink.drain(), "🚀 Spawn time set to 30 seconds.\n");
        assert_eq!(session.game.config().catch_window_secs(), 20);
        assert_eq!(session.game.config().spawn_interval_secs(), 30);
    }

    #[tokio::test(start_paused = true)]
    async fn catching_fills_the_garage() {
        let (session, sink) = session(&["boss"]);
        say(&session, "ace: !garage");
        assert_eq!(sink.drain(), "🪖 Your garage is empty.\n");

        say(&session, "boss: !startgame");
        tokio::time::sleep(Duration::from_secs(61)).await;
        let announcement = sink.drain();
        assert!(announcement.contains("A tank appeared!"), "{announcement}");

        let round = session.game.engine().registry().active_ids()[0];
        let correct = match session.game.engine().registry().lookup(round) {
            Lookup::Active(spawned) => spawned.challenge().correct_index(),
            other => panic!("round should be active: {other:?}"),
        };

        say(&session, &format!("ace: !catch {round} {}", correct + 1));
        let output = sink.drain();
        assert!(output.contains("guessed it!"), "{output}");
        assert!(output.contains("(to ace) 🎉 You added"), "{output}");

        say(&session, &format!("bob: !catch {round} {}", correct + 1));
        assert_eq!(sink.drain(), "(to bob) ❌ That round is already over.\n");

        say(&session, "ace: !myrank");
        assert_eq!(
            sink.drain(),
            "🏅 You are **rank #1** with **1 tank** in your garage.\n"
        );
        say(&session, "bob: !myrank");
        assert_eq!(sink.drain(), "📉 You have no tanks in your garage yet.\n");
    }

    #[tokio::test(start_paused = true)]
    async fn chatter_and_malformed_lines_are_ignored() {
        let (session, sink) = session(&[]);
        say(&session, "no prefix here");
        say(&session, "ace: just chatting");
        say(&session, ": !garage");
        say(&session, "ace: !dance");
        assert_eq!(sink.drain(), "");

        say(&session, "ace: !catch 1");
        assert_eq!(sink.drain(), "(to ace) ⚠️ Usage: !catch <round> <option>\n");
        say(&session, "ace: !catch 99 1");
        assert_eq!(sink.drain(), "(to ace) ❓ There is no such round.\n");
    }
}
