use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
    time::{SystemTime, UNIX_EPOCH},
};

use tank_catch_core::{ItemKind, PlayerId};
use tank_catch_inventory::{query, Inventory, InventoryError, Storage};

fn temp_root(label: &str) -> PathBuf {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time")
        .as_nanos();
    std::env::temp_dir().join(format!("tank-catch-{label}-{suffix}"))
}

fn kind(name: &str) -> ItemKind {
    ItemKind::new(name)
}

#[test]
fn reload_reproduces_holdings_and_order() {
    let root = temp_root("reload");
    let path = root.join("data.json");
    let alice = PlayerId::new("200");
    let bob = PlayerId::new("100");

    {
        let mut inventory = Inventory::open(&path).expect("open empty");
        for name in ["T-34-85", "Tiger I", "T-34-85"] {
            inventory.add_item(&alice, kind(name)).expect("add");
        }
        inventory.add_item(&bob, kind("KV-1")).expect("add");
        inventory.add_item(&bob, kind("KV-1")).expect("add");
        inventory.add_item(&bob, kind("IS-2")).expect("add");
    }

    let restored = Inventory::open(&path).expect("reload");
    assert_eq!(
        query::units(&restored, &alice),
        &[kind("T-34-85"), kind("Tiger I"), kind("T-34-85")]
    );
    let bob_holdings = query::holdings(&restored, &bob).expect("bob holdings");
    assert_eq!(bob_holdings.count(&kind("KV-1")), 2);
    assert_eq!(bob_holdings.count(&kind("IS-2")), 1);

    let players: Vec<&PlayerId> = query::players(&restored).collect();
    assert_eq!(players, vec![&alice, &bob], "insertion order survives reload");

    let _ = fs::remove_dir_all(root);
}

#[test]
fn file_uses_player_to_kind_list_format() {
    let root = temp_root("format");
    let path = root.join("data.json");
    let player = PlayerId::new("42");

    let mut inventory = Inventory::open(&path).expect("open");
    inventory.add_item(&player, kind("Tiger I")).expect("add");
    inventory.add_item(&player, kind("Tiger I")).expect("add");

    let raw = fs::read_to_string(&path).expect("read back");
    let parsed: serde_json::Value = serde_json::from_str(&raw).expect("valid json");
    assert_eq!(parsed, serde_json::json!({ "42": ["Tiger I", "Tiger I"] }));

    let _ = fs::remove_dir_all(root);
}

#[test]
fn failed_flush_keeps_previous_state() {
    let root = temp_root("flush-failure");
    let path = root.join("data.json");
    let player = PlayerId::new("7");

    let mut inventory = Inventory::open(&path).expect("open");
    inventory.add_item(&player, kind("A")).expect("first add");
    let durable = fs::read_to_string(&path).expect("durable copy");

    // Occupying the staging path with a directory makes the next flush fail.
    fs::create_dir_all(root.join("data.json.tmp")).expect("block staging file");

    let error = inventory
        .add_item(&player, kind("B"))
        .expect_err("flush must fail");
    assert!(matches!(error, InventoryError::Write { .. }), "{error}");
    assert_eq!(query::units(&inventory, &player), &[kind("A")]);
    assert_eq!(fs::read_to_string(&path).expect("reread"), durable);

    let newcomer = PlayerId::new("8");
    assert!(inventory.add_item(&newcomer, kind("C")).is_err());
    assert_eq!(query::count_total(&inventory, &newcomer), 0);
    assert_eq!(query::players(&inventory).count(), 1);

    let _ = fs::remove_dir_all(root);
}

#[test]
fn corrupt_file_is_reported() {
    let root = temp_root("corrupt");
    fs::create_dir_all(&root).expect("root");
    let path = root.join("data.json");
    fs::write(&path, "{ not json").expect("write garbage");

    let error = Inventory::open(&path).expect_err("corrupt file rejected");
    assert!(matches!(error, InventoryError::Parse { .. }), "{error}");

    let _ = fs::remove_dir_all(root);
}

#[test]
fn empty_lists_do_not_create_visible_players() {
    let root = temp_root("empty-lists");
    fs::create_dir_all(&root).expect("root");
    let path = root.join("data.json");
    fs::write(&path, r#"{ "1": [], "2": ["A"] }"#).expect("seed file");

    let inventory = Inventory::open(&path).expect("open");
    assert!(query::holdings(&inventory, &PlayerId::new("1")).is_none());
    assert_eq!(query::ranked_totals(&inventory).len(), 1);

    let _ = fs::remove_dir_all(root);
}

#[derive(Debug, Default)]
struct Snapshots(Arc<Mutex<Vec<String>>>);

impl Storage for Snapshots {
    fn location(&self) -> &Path {
        Path::new("snapshots")
    }

    fn save(&self, contents: &[u8]) -> io::Result<()> {
        let text = String::from_utf8(contents.to_vec())
            .map_err(|error| io::Error::new(io::ErrorKind::InvalidData, error))?;
        self.0.lock().expect("snapshots").push(text);
        Ok(())
    }
}

#[test]
fn custom_storage_receives_every_snapshot() {
    let saved = Arc::new(Mutex::new(Vec::new()));
    let mut inventory = Inventory::with_storage(Snapshots(Arc::clone(&saved)));
    let player = PlayerId::new("9");

    inventory.add_item(&player, kind("A")).expect("add");
    inventory.add_item(&player, kind("A")).expect("add");
    let removed = inventory
        .exchange_all(&player, &kind("A"), kind("D"))
        .expect("exchange");

    assert_eq!(removed, 2);
    assert_eq!(inventory.path(), Some(Path::new("snapshots")));
    let saved = saved.lock().expect("snapshots");
    assert_eq!(saved.len(), 3);
    let last: serde_json::Value = serde_json::from_str(&saved[2]).expect("json");
    assert_eq!(last, serde_json::json!({ "9": ["D"] }));
}
