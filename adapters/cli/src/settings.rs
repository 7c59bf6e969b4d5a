use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tank_catch_core::{Catalog, CatalogEntry, GameConfig, ItemKind};
use tank_catch_inventory::{Inventory, InventoryError};
use tank_catch_system_evolution::EvolutionTable;
use tracing::{error, info, warn};

const SUPPORTED_CATALOG_VERSION: u32 = 1;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    spawn_interval_secs: Option<u64>,
    catch_window_secs: Option<u64>,
}

/// Builds the starting configuration from defaults, an optional TOML file and
/// command-line overrides, in that order of precedence.
pub(crate) fn resolve_config(
    path: Option<&Path>,
    spawn_interval_secs: Option<u64>,
    catch_window_secs: Option<u64>,
) -> Result<GameConfig> {
    let file = match path {
        Some(path) => {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("failed to read config file at {}", path.display()))?;
            parse_config(&contents)
                .with_context(|| format!("invalid config file at {}", path.display()))?
        }
        None => ConfigFile::default(),
    };

    let mut config = GameConfig::default();
    if let Some(seconds) = spawn_interval_secs.or(file.spawn_interval_secs) {
        config = config
            .with_spawn_interval(seconds)
            .context("invalid spawn interval")?;
    }
    if let Some(seconds) = catch_window_secs.or(file.catch_window_secs) {
        config = config
            .with_catch_window(seconds)
            .context("invalid catch window")?;
    }
    Ok(config)
}

fn parse_config(contents: &str) -> Result<ConfigFile> {
    toml::from_str(contents).context("failed to parse config toml contents")
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CatalogManifest {
    version: u32,
    tanks: Vec<TankEntry>,
    #[serde(default)]
    evolutions: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TankEntry {
    name: String,
    glyph: String,
    image: Option<String>,
}

/// Loads the catalog and evolution table, falling back to the standard set.
pub(crate) fn load_catalog(path: Option<&Path>) -> Result<(Catalog, EvolutionTable)> {
    let Some(path) = path else {
        return Ok((Catalog::standard(), EvolutionTable::standard()));
    };
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read catalog manifest at {}", path.display()))?;
    let loaded = parse_catalog(&contents)
        .with_context(|| format!("invalid catalog manifest at {}", path.display()))?;
    info!(path = %path.display(), kinds = loaded.0.len(), "catalog loaded");
    Ok(loaded)
}

fn parse_catalog(contents: &str) -> Result<(Catalog, EvolutionTable)> {
    let manifest: CatalogManifest =
        toml::from_str(contents).context("failed to parse catalog manifest toml contents")?;
    if manifest.version != SUPPORTED_CATALOG_VERSION {
        bail!(
            "unsupported catalog manifest version {}; expected {}",
            manifest.version,
            SUPPORTED_CATALOG_VERSION
        );
    }

    let entries = manifest
        .tanks
        .into_iter()
        .map(|tank| CatalogEntry::new(ItemKind::new(tank.name), tank.glyph, tank.image))
        .collect();
    let catalog = Catalog::new(entries)?;
    catalog.ensure_playable()?;

    let evolutions = EvolutionTable::from_pairs(
        manifest
            .evolutions
            .into_iter()
            .map(|(source, target)| (ItemKind::new(source), ItemKind::new(target))),
    );
    evolutions.validate(&catalog)?;
    Ok((catalog, evolutions))
}

/// Opens the inventory at `path`.
///
/// A missing file starts empty. A file that cannot be read or parsed is
/// reported and moved aside before the game starts empty, so the next flush
/// cannot overwrite it. When it cannot be moved, catches are kept in memory
/// only.
pub(crate) fn open_inventory(path: &Path) -> Inventory {
    let suffix = match Inventory::open(path) {
        Ok(inventory) => return inventory,
        Err(InventoryError::Parse { path, source }) => {
            error!(
                path = %path.display(),
                error = %source,
                "inventory file is corrupt, starting empty"
            );
            "corrupt"
        }
        Err(failure) => {
            error!(error = %failure, "inventory could not be loaded, starting empty");
            "unreadable"
        }
    };

    let backup = backup_path(path, suffix);
    match fs::rename(path, &backup) {
        Ok(()) => {
            warn!(backup = %backup.display(), "inventory file moved aside");
            Inventory::empty_at(path)
        }
        Err(failure) => {
            error!(
                path = %path.display(),
                error = %failure,
                "failed to move inventory file aside, catches will not be saved"
            );
            Inventory::in_memory()
        }
    }
}

fn backup_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().map(ToOwned::to_owned).unwrap_or_default();
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}
