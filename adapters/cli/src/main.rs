#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs Tank Catch in a console chat room.
//!
//! Each line read from standard input is a chat message of the form
//! `<name>: <text>`. Rounds, outcomes and command replies are written to
//! standard output.

mod commands;
mod session;
mod settings;

use std::{
    io,
    path::PathBuf,
    sync::{Arc, Mutex},
};

use anyhow::{Context, Result};
use clap::Parser;
use tank_catch_core::{ChannelId, PlayerId};
use tank_catch_rendering::ConsolePresenter;
use tank_catch_system_challenge::ChallengeGenerator;
use tank_catch_system_evolution::Evolution;
use tank_catch_system_rounds::RoundEngine;
use tank_catch_system_spawning::Game;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::session::Session;

#[derive(Debug, Parser)]
#[command(name = "tank-catch", about = "Guess the tank before anyone else does.")]
struct CliArgs {
    /// Inventory file holding every player's tanks.
    #[arg(long, value_name = "PATH", default_value = "data.json")]
    data: PathBuf,
    /// TOML file with `spawn_interval_secs` and `catch_window_secs`.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// TOML catalog manifest replacing the standard tanks.
    #[arg(long, value_name = "PATH")]
    catalog: Option<PathBuf>,
    /// Channel rounds are spawned into.
    #[arg(long, default_value = "general")]
    channel: String,
    /// Prefix introducing chat commands.
    #[arg(long, env = "TANK_CATCH_PREFIX", default_value = "!")]
    prefix: String,
    /// Player allowed to run administrative commands; repeatable.
    #[arg(long = "admin", value_name = "NAME")]
    admins: Vec<String>,
    /// Seed making the sequence of challenges reproducible.
    #[arg(long)]
    seed: Option<u64>,
    /// Seconds between spawns, overriding the config file.
    #[arg(long, value_name = "SECONDS")]
    spawn_interval: Option<u64>,
    /// Seconds a round stays open, overriding the config file.
    #[arg(long, value_name = "SECONDS")]
    catch_window: Option<u64>,
    /// Start spawning immediately.
    #[arg(long)]
    autostart: bool,
}

/// Entry point for the Tank Catch command-line interface.
#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let args = CliArgs::parse();
    let config = settings::resolve_config(
        args.config.as_deref(),
        args.spawn_interval,
        args.catch_window,
    )?;
    let (catalog, evolutions) = settings::load_catalog(args.catalog.as_deref())?;
    let inventory = settings::open_inventory(&args.data);
    let generator = args
        .seed
        .map_or_else(ChallengeGenerator::from_entropy, ChallengeGenerator::seeded);

    let presenter = Arc::new(ConsolePresenter::new(catalog.clone(), io::stdout()));
    let engine = RoundEngine::new(
        catalog,
        Evolution::new(evolutions),
        generator,
        Arc::new(Mutex::new(inventory)),
        Arc::clone(&presenter),
    )
    .context("catalog cannot run the game")?;
    let session = Session::new(
        Game::new(engine, config),
        presenter,
        args.prefix,
        args.admins.into_iter().map(PlayerId::new),
        ChannelId::new(args.channel),
    );

    session.greet().context("failed to write to stdout")?;
    if args.autostart {
        session.start().context("failed to start the game")?;
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        session
            .handle_line(&line)
            .context("failed to write to stdout")?;
    }

    let _ = session.stop();
    info!("input closed, shutting down");
    Ok(())
}
