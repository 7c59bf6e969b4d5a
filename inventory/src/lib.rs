#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative per-player inventory for Tank Catch.
//!
//! The [`Inventory`] owns every player's holdings as a multiset of
//! [`ItemKind`] units. Each mutation is flushed to disk before it returns; the
//! file is replaced atomically so a failed flush leaves both the previous file
//! and the in-memory state untouched. Read-only views live in [`query`].
//!
//! Snapshots go through a [`Storage`]; [`FileStorage`] is the JSON file
//! used by the game.

use std::{
    collections::HashMap,
    fmt,
    fs::{self, File},
    io::{self, Write},
    path::{Path, PathBuf},
};

use serde::{
    de::{MapAccess, Visitor},
    ser::SerializeMap,
    Deserialize, Deserializer, Serialize, Serializer,
};
use tank_catch_core::{ItemKind, PlayerId};
use thiserror::Error;
use tracing::{debug, info};

/// Durable destination for inventory snapshots.
pub trait Storage: fmt::Debug + Send {
    /// Location reported in logs and errors.
    fn location(&self) -> &Path;

    /// Replaces the stored snapshot with `contents`.
    fn save(&self, contents: &[u8]) -> io::Result<()>;
}

/// JSON file replaced atomically through a `.tmp` sibling.
#[derive(Clone, Debug)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    /// Storage writing to `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Storage for FileStorage {
    fn location(&self) -> &Path {
        &self.path
    }

    fn save(&self, contents: &[u8]) -> io::Result<()> {
        write_atomically(&self.path, contents)
    }
}

/// Player holdings with durable persistence.
#[derive(Debug)]
pub struct Inventory {
    storage: Option<Box<dyn Storage>>,
    bags: Vec<Bag>,
    index: HashMap<PlayerId, usize>,
}

impl Inventory {
    /// Creates an inventory that is never written to disk.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            storage: None,
            bags: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Creates an empty inventory that persists to `path` on the next mutation.
    #[must_use]
    pub fn empty_at(path: impl Into<PathBuf>) -> Self {
        Self::with_storage(FileStorage::new(path))
    }

    /// Creates an empty inventory that persists through `storage`.
    #[must_use]
    pub fn with_storage(storage: impl Storage + 'static) -> Self {
        Self {
            storage: Some(Box::new(storage)),
            ..Self::in_memory()
        }
    }

    /// Loads the inventory stored at `path`.
    ///
    /// A missing file yields an empty inventory bound to `path`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, InventoryError> {
        let path = path.into();
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                info!(path = %path.display(), "no inventory file yet, starting empty");
                return Ok(Self::empty_at(path));
            }
            Err(source) => return Err(InventoryError::Read { path, source }),
        };

        let file: BagsFile = match serde_json::from_str(&contents) {
            Ok(file) => file,
            Err(source) => return Err(InventoryError::Parse { path, source }),
        };

        let mut inventory = Self::empty_at(path);
        for (player, units) in file.0 {
            inventory.extend_loaded(player, units);
        }
        info!(
            path = %inventory.path_display(),
            players = inventory.bags.len(),
            "inventory loaded"
        );
        Ok(inventory)
    }

    /// Location the inventory persists to, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.storage.as_deref().map(Storage::location)
    }

    /// Adds a single unit of `kind` to the player's holdings.
    pub fn add_item(&mut self, player: &PlayerId, kind: ItemKind) -> Result<(), InventoryError> {
        let mut units = self.units(player).to_vec();
        units.push(kind);
        self.commit(player, units)
    }

    /// Number of units of `kind` the player holds.
    #[must_use]
    pub fn count_of(&self, player: &PlayerId, kind: &ItemKind) -> usize {
        self.units(player)
            .iter()
            .filter(|unit| *unit == kind)
            .count()
    }

    /// Removes every unit of `kind` and adds a single unit of `replacement`.
    ///
    /// Both changes are flushed together. Returns the number of units removed;
    /// nothing changes when the player holds no unit of `kind`.
    pub fn exchange_all(
        &mut self,
        player: &PlayerId,
        kind: &ItemKind,
        replacement: ItemKind,
    ) -> Result<usize, InventoryError> {
        let held = self.units(player);
        let removed = held.iter().filter(|unit| *unit == kind).count();
        if removed == 0 {
            return Ok(0);
        }

        let mut units: Vec<ItemKind> = held.iter().filter(|unit| *unit != kind).cloned().collect();
        units.push(replacement);
        self.commit(player, units)?;
        Ok(removed)
    }

    /// Writes the current holdings to storage.
    pub fn flush(&self) -> Result<(), InventoryError> {
        let Some(storage) = self.storage.as_deref() else {
            return Ok(());
        };

        let contents = serde_json::to_string_pretty(&BagsView(&self.bags))
            .map_err(InventoryError::Serialize)?;
        let path = storage.location();
        storage
            .save(contents.as_bytes())
            .map_err(|source| InventoryError::Write {
                path: path.to_path_buf(),
                source,
            })?;
        debug!(path = %path.display(), players = self.bags.len(), "inventory flushed");
        Ok(())
    }

    fn units(&self, player: &PlayerId) -> &[ItemKind] {
        self.index
            .get(player)
            .and_then(|index| self.bags.get(*index))
            .map_or(&[], |bag| bag.units.as_slice())
    }

    fn commit(&mut self, player: &PlayerId, units: Vec<ItemKind>) -> Result<(), InventoryError> {
        let previous = self.replace(player, units);
        if let Err(error) = self.flush() {
            self.restore(player, previous);
            return Err(error);
        }
        Ok(())
    }

    fn replace(&mut self, player: &PlayerId, units: Vec<ItemKind>) -> Option<Vec<ItemKind>> {
        if let Some(index) = self.index.get(player).copied() {
            return Some(std::mem::replace(&mut self.bags[index].units, units));
        }

        let _ = self.index.insert(player.clone(), self.bags.len());
        self.bags.push(Bag {
            player: player.clone(),
            units,
        });
        None
    }

    fn restore(&mut self, player: &PlayerId, previous: Option<Vec<ItemKind>>) {
        match previous {
            Some(units) => {
                if let Some(index) = self.index.get(player).copied() {
                    self.bags[index].units = units;
                }
            }
            None => {
                if self.index.remove(player).is_some() {
                    let _ = self.bags.pop();
                }
            }
        }
    }

    fn extend_loaded(&mut self, player: PlayerId, units: Vec<ItemKind>) {
        if units.is_empty() {
            return;
        }
        match self.index.get(&player).copied() {
            Some(index) => self.bags[index].units.extend(units),
            None => {
                let _ = self.index.insert(player.clone(), self.bags.len());
                self.bags.push(Bag { player, units });
            }
        }
    }

    fn path_display(&self) -> String {
        self.path()
            .map_or_else(|| "<memory>".to_owned(), |path| path.display().to_string())
    }
}

/// Failures raised while loading or persisting the inventory.
#[derive(Debug, Error)]
pub enum InventoryError {
    /// The inventory file exists but could not be read.
    #[error("failed to read inventory file {}: {source}", .path.display())]
    Read {
        /// File that was being read.
        path: PathBuf,
        /// Underlying I/O failure.
        source: io::Error,
    },
    /// The inventory file does not hold valid holdings.
    #[error("failed to parse inventory file {}: {source}", .path.display())]
    Parse {
        /// File that was being parsed.
        path: PathBuf,
        /// Underlying decoding failure.
        source: serde_json::Error,
    },
    /// Holdings could not be encoded.
    #[error("failed to encode inventory: {0}")]
    Serialize(#[source] serde_json::Error),
    /// The inventory file could not be replaced.
    #[error("failed to write inventory file {}: {source}", .path.display())]
    Write {
        /// File that was being written.
        path: PathBuf,
        /// Underlying I/O failure.
        source: io::Error,
    },
}

#[derive(Clone, Debug)]
struct Bag {
    player: PlayerId,
    units: Vec<ItemKind>,
}

/// Serializes bags as a JSON object in insertion order.
struct BagsView<'a>(&'a [Bag]);

impl Serialize for BagsView<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for bag in self.0 {
            map.serialize_entry(&bag.player, &bag.units)?;
        }
        map.end()
    }
}

/// Player entries in the order they appear in the file.
struct BagsFile(Vec<(PlayerId, Vec<ItemKind>)>);

impl<'de> Deserialize<'de> for BagsFile {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct BagsVisitor;

        impl<'de> Visitor<'de> for BagsVisitor {
            type Value = BagsFile;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str("a map from player id to a list of item kinds")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some(entry) = access.next_entry::<PlayerId, Vec<ItemKind>>()? {
                    entries.push(entry);
                }
                Ok(BagsFile(entries))
            }
        }

        deserializer.deserialize_map(BagsVisitor)
    }
}

fn write_atomically(path: &Path, contents: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let staging = staging_path(path);
    let result = File::create(&staging)
        .and_then(|mut file| {
            file.write_all(contents)?;
            file.sync_all()
        })
        .and_then(|()| fs::rename(&staging, path));
    if result.is_err() {
        let _ = fs::remove_file(&staging);
    }
    result
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(ToOwned::to_owned).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Query functions that provide read-only access to the inventory.
pub mod query {
    use super::Inventory;
    use tank_catch_core::{ItemKind, PlayerId};

    /// Every unit the player holds, in acquisition order.
    #[must_use]
    pub fn units<'a>(inventory: &'a Inventory, player: &PlayerId) -> &'a [ItemKind] {
        inventory.units(player)
    }

    /// Total number of units the player holds; zero for unknown players.
    #[must_use]
    pub fn count_total(inventory: &Inventory, player: &PlayerId) -> usize {
        inventory.units(player).len()
    }

    /// Players known to the inventory in the order they first acquired a unit.
    pub fn players(inventory: &Inventory) -> impl Iterator<Item = &PlayerId> {
        inventory.bags.iter().map(|bag| &bag.player)
    }

    /// Groups the player's units by kind; `None` when the player holds nothing.
    #[must_use]
    pub fn holdings(inventory: &Inventory, player: &PlayerId) -> Option<Holdings> {
        let units = inventory.units(player);
        if units.is_empty() {
            return None;
        }

        let mut lines: Vec<HoldingLine> = Vec::new();
        for unit in units {
            match lines.iter_mut().find(|line| &line.kind == unit) {
                Some(line) => line.count += 1,
                None => lines.push(HoldingLine {
                    kind: unit.clone(),
                    count: 1,
                }),
            }
        }
        Some(Holdings { lines })
    }

    /// All players sorted by total units, largest first.
    ///
    /// Ties keep the order in which players first acquired a unit.
    #[must_use]
    pub fn ranked_totals(inventory: &Inventory) -> Vec<Standing> {
        let mut totals: Vec<(PlayerId, usize)> = inventory
            .bags
            .iter()
            .filter(|bag| !bag.units.is_empty())
            .map(|bag| (bag.player.clone(), bag.units.len()))
            .collect();
        totals.sort_by(|left, right| right.1.cmp(&left.1));
        totals
            .into_iter()
            .enumerate()
            .map(|(position, (player, total))| Standing {
                rank: position + 1,
                player,
                total,
            })
            .collect()
    }

    /// The first `top_n` standings.
    #[must_use]
    pub fn leaderboard(inventory: &Inventory, top_n: usize) -> Vec<Standing> {
        let mut standings = ranked_totals(inventory);
        standings.truncate(top_n);
        standings
    }

    /// The player's standing, if they hold anything.
    #[must_use]
    pub fn rank(inventory: &Inventory, player: &PlayerId) -> Option<Standing> {
        ranked_totals(inventory)
            .into_iter()
            .find(|standing| &standing.player == player)
    }

    /// Grouped view of a player's units.
    #[derive(Clone, Debug, PartialEq, Eq)]
    pub struct Holdings {
        lines: Vec<HoldingLine>,
    }

    impl Holdings {
        /// Iterator over the grouped lines in first-acquired order.
        pub fn iter(&self) -> impl Iterator<Item = &HoldingLine> {
            self.lines.iter()
        }

        /// Units held of `kind`.
        #[must_use]
        pub fn count(&self, kind: &ItemKind) -> usize {
            self.lines
                .iter()
                .find(|line| &line.kind == kind)
                .map_or(0, |line| line.count)
        }

        /// Total units across all kinds.
        #[must_use]
        pub fn total(&self) -> usize {
            self.lines.iter().map(|line| line.count).sum()
        }

        /// Consumes the view, yielding the grouped lines.
        #[must_use]
        pub fn into_vec(self) -> Vec<HoldingLine> {
            self.lines
        }
    }

    /// Number of units held of a single kind.
    #[derive(Clone, Debug, PartialEq, Eq)]
    pub struct HoldingLine {
        /// Kind being counted.
        pub kind: ItemKind,
        /// Units held; never zero.
        pub count: usize,
    }

    /// Position of a player on the leaderboard.
    #[derive(Clone, Debug, PartialEq, Eq)]
    pub struct Standing {
        /// One-based position.
        pub rank: usize,
        /// Player at this position.
        pub player: PlayerId,
        /// Units the player holds.
        pub total: usize,
    }
}
