use tank_catch_core::RoundId;

/// Chat command recognised by the console adapter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum ChatCommand {
    Garage,
    Leaderboard,
    MyRank,
    Help,
    StartGame,
    StopGame,
    /// `None` when the argument is missing or not a number.
    SetTime(Option<u64>),
    /// `None` when the argument is missing or not a number.
    SetSpawn(Option<u64>),
    /// Zero-based option index; `None` when the arguments are malformed.
    Catch(Option<(RoundId, usize)>),
    Unknown(String),
}

/// Parses `message` as a command introduced by `prefix`.
///
/// Returns `None` for ordinary chat.
pub(crate) fn parse_chat_command(prefix: &str, message: &str) -> Option<ChatCommand> {
    let body = message.trim().strip_prefix(prefix)?;
    let mut parts = body.split_whitespace();
    let name = parts.next()?.to_ascii_lowercase();

    let command = match name.as_str() {
        "garage" => ChatCommand::Garage,
        "leaderboard" => ChatCommand::Leaderboard,
        "myrank" => ChatCommand::MyRank,
        "help" => ChatCommand::Help,
        "startgame" => ChatCommand::StartGame,
        "stopgame" => ChatCommand::StopGame,
        "settime" => ChatCommand::SetTime(parse_seconds(parts.next())),
        "setspawn" => ChatCommand::SetSpawn(parse_seconds(parts.next())),
        "catch" => ChatCommand::Catch(parse_catch(parts.next(), parts.next())),
        _ => ChatCommand::Unknown(name),
    };
    Some(command)
}

fn parse_seconds(value: Option<&str>) -> Option<u64> {
    value?.parse().ok()
}

fn parse_catch(round: Option<&str>, option: Option<&str>) -> Option<(RoundId, usize)> {
    let round = round?.parse::<u64>().ok()?;
    let option = option?.parse::<usize>().ok()?.checked_sub(1)?;
    Some((RoundId::new(round), option))
}
