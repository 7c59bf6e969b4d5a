use std::time::{Duration, Instant};

use tank_catch_core::{
    Catalog, ChannelId, Challenge, ItemKind, MessageHandle, PlayerId, Presenter, RoundId,
    RoundNotice, RoundOutcome,
};
use tank_catch_rendering::{game_started, ConsolePresenter};

fn kind(name: &str) -> ItemKind {
    ItemKind::new(name)
}

fn output(presenter: ConsolePresenter<Vec<u8>>) -> String {
    String::from_utf8(presenter.into_inner()).expect("utf-8 output")
}

#[test]
fn round_lifecycle_is_written_in_order() {
    let presenter = ConsolePresenter::new(Catalog::standard(), Vec::new());
    let challenge = Challenge::new(
        kind("Panzer IV"),
        vec![kind("Panzer IV"), kind("M4 Sherman"), kind("KV-1")],
    )
    .expect("challenge");
    let channel = ChannelId::new("general");
    let notice = RoundNotice {
        round: RoundId::new(9),
        channel: &channel,
        challenge: &challenge,
        catch_window: Duration::from_secs(15),
        deadline: Instant::now(),
    };

    let handle = presenter.present_challenge(&notice).expect("present");
    presenter
        .present_outcome(
            handle,
            &RoundOutcome::Won {
                winner: PlayerId::new("ace"),
                kind: kind("Panzer IV"),
                evolved: None,
            },
        )
        .expect("outcome");

    let text = output(presenter);
    let announced = text.find("A tank appeared! (round 9)").expect("announcement");
    let concluded = text.find("Round 9 is over").expect("conclusion");
    assert!(announced < concluded);
    assert!(text.contains("options: [1] ⚙️ Panzer IV  [2] ⭐ M4 Sherman  [3] 🛡️ KV-1"));
    assert!(text.contains("options (closed): [1] ⚙️ Panzer IV"));
    assert!(text.contains("🏆 ace guessed it! It was **⚙️ Panzer IV**!"));
}

#[test]
fn handles_are_unique() {
    let presenter = ConsolePresenter::new(Catalog::standard(), Vec::new());
    let challenge = Challenge::new(
        kind("KV-1"),
        vec![kind("IS-2"), kind("KV-1"), kind("Tiger I")],
    )
    .expect("challenge");
    let channel = ChannelId::new("general");
    let notice = |round| RoundNotice {
        round: RoundId::new(round),
        channel: &channel,
        challenge: &challenge,
        catch_window: Duration::from_secs(5),
        deadline: Instant::now(),
    };

    let first = presenter.present_challenge(&notice(1)).expect("first");
    let second = presenter.present_challenge(&notice(2)).expect("second");
    assert_ne!(first, second);
}

#[test]
fn outcome_for_unknown_message_still_prints() {
    let presenter = ConsolePresenter::new(Catalog::standard(), Vec::new());
    presenter
        .present_outcome(
            MessageHandle::new(77),
            &RoundOutcome::Expired { kind: kind("IS-2") },
        )
        .expect("outcome");
    presenter
        .whisper(&PlayerId::new("ace"), "hello")
        .expect("whisper");
    presenter.reply(&game_started()).expect("reply");

    let text = output(presenter);
    assert_eq!(
        text,
        "⌛ Time's up! It was **💥 IS-2**.\n(to ace) hello\n▶️ The game has started!\n"
    );
}
