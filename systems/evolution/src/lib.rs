#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Evolution system that upgrades duplicate catches into stronger kinds.
//!
//! Once a player holds [`EVOLUTION_THRESHOLD`] or more units of a kind with a
//! mapping in the [`EvolutionTable`], every unit of that kind is consumed and
//! replaced by a single unit of the target kind.

use std::collections::BTreeMap;

use tank_catch_core::{Catalog, CatalogError, ItemKind, PlayerId};
use tank_catch_inventory::{Inventory, InventoryError};
use tracing::info;

/// Number of units of a kind required before it evolves.
pub const EVOLUTION_THRESHOLD: usize = 2;

/// Static mapping from a kind to the kind it evolves into.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EvolutionTable {
    targets: BTreeMap<ItemKind, ItemKind>,
}

impl EvolutionTable {
    /// Builds a table from `(source, target)` pairs; later pairs override earlier ones.
    #[must_use]
    pub fn from_pairs(pairs: impl IntoIterator<Item = (ItemKind, ItemKind)>) -> Self {
        Self {
            targets: pairs.into_iter().collect(),
        }
    }

    /// The standard tank evolution table.
    #[must_use]
    pub fn standard() -> Self {
        const PAIRS: [(&str, &str); 4] = [
            ("T-34-85", "IS-2"),
            ("M4 Sherman", "Leopard 1"),
            ("Panzer IV", "Panzer V Panther"),
            ("KV-1", "IS-2"),
        ];
        Self::from_pairs(
            PAIRS
                .iter()
                .map(|(source, target)| (ItemKind::new(*source), ItemKind::new(*target))),
        )
    }

    /// Kind that `kind` evolves into, if any.
    #[must_use]
    pub fn target(&self, kind: &ItemKind) -> Option<&ItemKind> {
        self.targets.get(kind)
    }

    /// Iterator over `(source, target)` pairs ordered by source.
    pub fn pairs(&self) -> impl Iterator<Item = (&ItemKind, &ItemKind)> {
        self.targets.iter()
    }

    /// Number of mapped kinds.
    #[must_use]
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// Reports whether the table maps nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Fails when a source or target kind is missing from `catalog`.
    pub fn validate(&self, catalog: &Catalog) -> Result<(), CatalogError> {
        for (source, target) in &self.targets {
            for kind in [source, target] {
                if !catalog.contains(kind) {
                    return Err(CatalogError::UnknownKind(kind.clone()));
                }
            }
        }
        Ok(())
    }
}

/// Resolves evolutions against the authoritative inventory.
#[derive(Clone, Debug, Default)]
pub struct Evolution {
    table: EvolutionTable,
}

impl Evolution {
    /// Creates a resolver backed by `table`.
    #[must_use]
    pub fn new(table: EvolutionTable) -> Self {
        Self { table }
    }

    /// Table consulted by the resolver.
    #[must_use]
    pub fn table(&self) -> &EvolutionTable {
        &self.table
    }

    /// Evolves the player's units of `kind` when enough duplicates are held.
    ///
    /// Returns the kind that was added, or `None` when the kind has no mapping
    /// or fewer than [`EVOLUTION_THRESHOLD`] units are held; in that case the
    /// inventory is not touched. All units of `kind` are consumed together.
    pub fn try_evolve(
        &self,
        inventory: &mut Inventory,
        player: &PlayerId,
        kind: &ItemKind,
    ) -> Result<Option<ItemKind>, InventoryError> {
        let Some(target) = self.table.target(kind) else {
            return Ok(None);
        };
        if inventory.count_of(player, kind) < EVOLUTION_THRESHOLD {
            return Ok(None);
        }

        let consumed = inventory.exchange_all(player, kind, target.clone())?;
        info!(
            player = %player,
            from = %kind,
            to = %target,
            consumed,
            "evolution applied"
        );
        Ok(Some(target.clone()))
    }
}
