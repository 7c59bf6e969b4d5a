use std::collections::HashSet;

use tank_catch_core::{Catalog, CatalogEntry, Challenge, ItemKind};
use tank_catch_system_challenge::ChallengeGenerator;

fn catalog_of(size: usize) -> Catalog {
    let entries = (0..size)
        .map(|index| CatalogEntry::new(ItemKind::new(format!("kind-{index}")), "*", None))
        .collect();
    Catalog::new(entries).expect("distinct kinds")
}

fn assert_well_formed(challenge: &Challenge, catalog: &Catalog) {
    let options = challenge.options();
    assert_eq!(options.len(), 3, "exactly three options");

    let distinct: HashSet<&ItemKind> = options.iter().collect();
    assert_eq!(distinct.len(), 3, "options must be distinct: {options:?}");

    let correct = challenge.correct_kind();
    assert_eq!(
        options.iter().filter(|option| *option == correct).count(),
        1,
        "correct kind appears exactly once"
    );
    assert_eq!(&options[challenge.correct_index()], correct);
    assert!(options.iter().all(|option| catalog.contains(option)));
}

#[test]
fn every_generated_challenge_is_well_formed() {
    for size in 3..=8 {
        let catalog = catalog_of(size);
        for seed in 0..200 {
            let mut generator = ChallengeGenerator::seeded(seed);
            let challenge = generator.generate(&catalog).expect("playable catalog");
            assert_well_formed(&challenge, &catalog);
        }
    }
}

#[test]
fn standard_catalog_challenges_are_well_formed() {
    let catalog = Catalog::standard();
    let mut generator = ChallengeGenerator::seeded(0x7a4b_2c91);
    for _ in 0..500 {
        let challenge = generator.generate(&catalog).expect("standard catalog");
        assert_well_formed(&challenge, &catalog);
    }
}

#[test]
fn identical_seeds_replay_identical_sequences() {
    let catalog = Catalog::standard();
    let mut first = ChallengeGenerator::seeded(99);
    let mut second = ChallengeGenerator::seeded(99);

    for _ in 0..50 {
        assert_eq!(
            first.generate(&catalog).expect("first"),
            second.generate(&catalog).expect("second")
        );
    }
}

#[test]
fn correct_kind_and_position_cover_every_possibility() {
    let catalog = catalog_of(4);
    let mut generator = ChallengeGenerator::seeded(2024);
    let mut correct_kinds = HashSet::new();
    let mut correct_positions = HashSet::new();

    for _ in 0..2_000 {
        let challenge = generator.generate(&catalog).expect("playable");
        let _ = correct_kinds.insert(challenge.correct_kind().clone());
        let _ = correct_positions.insert(challenge.correct_index());
    }

    assert_eq!(correct_kinds.len(), 4, "every kind eventually wins");
    assert_eq!(correct_positions.len(), 3, "correct answer lands in every slot");
}

#[test]
fn minimal_catalog_uses_every_kind() {
    let catalog = catalog_of(3);
    let mut generator = ChallengeGenerator::seeded(5);
    let challenge = generator.generate(&catalog).expect("three kinds suffice");
    let options: HashSet<&ItemKind> = challenge.options().iter().collect();
    let kinds: HashSet<&ItemKind> = catalog.kinds().collect();
    assert_eq!(options, kinds);
}
