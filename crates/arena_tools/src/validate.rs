//! Data validation and dump utilities.
//!
//! A data directory holds two kinds of RON files: balance overrides
//! (`config.ron` or `*_config.ron`, parsed as [`SimConfig`]) and everything
//! else, parsed as [`Catalogs`].

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use arena_core::behaviors::BehaviorRegistry;
use arena_core::config::SimConfig;
use arena_core::defs::{Catalogs, MapDef};
use arena_core::error::GameError;
use ron::ser::PrettyConfig;

use crate::{Result, ToolError};

/// What a data file holds, decided from its file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataKind {
    /// Weapon, enemy and map catalogs.
    Catalogs,
    /// Balance overrides.
    Config,
}

impl DataKind {
    /// Kind for a file path.
    #[must_use]
    pub fn for_path(path: &Path) -> Self {
        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
        if stem == "config" || stem.ends_with("_config") {
            Self::Config
        } else {
            Self::Catalogs
        }
    }
}

/// Outcome of validating a directory.
#[derive(Debug, Default)]
pub struct ValidationReport {
    /// Files checked, in name order.
    pub checked: Vec<PathBuf>,
    /// Files that failed, with the reason.
    pub failures: Vec<(PathBuf, String)>,
}

impl ValidationReport {
    /// True when every file passed.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Parse and validate catalogs, including behavior keys and spawn placement.
///
/// # Errors
///
/// Returns an error if the text does not parse or the catalogs are unusable.
pub fn validate_catalogs_str(text: &str, path: &str) -> Result<Catalogs> {
    let catalogs = Catalogs::from_ron_str(text, path)?;
    BehaviorRegistry::builtin().resolve_all(&catalogs.enemies)?;

    let problems: Vec<String> = catalogs.maps.iter().flat_map(spawn_problems).collect();
    if !problems.is_empty() {
        return Err(GameError::InvalidCatalog(problems.join("; ")).into());
    }
    Ok(catalogs)
}

/// Parse and validate balance overrides.
///
/// # Errors
///
/// Returns an error if the text does not parse or a value is out of range.
pub fn validate_config_str(text: &str, path: &str) -> Result<SimConfig> {
    Ok(SimConfig::from_ron_str(text, path)?)
}

/// Validate one data file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or fails validation.
pub fn validate_file(path: &Path) -> Result<DataKind> {
    let text = std::fs::read_to_string(path).map_err(|source| ToolError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let name = path.display().to_string();
    let kind = DataKind::for_path(path);
    match kind {
        DataKind::Catalogs => {
            validate_catalogs_str(&text, &name)?;
        }
        DataKind::Config => {
            validate_config_str(&text, &name)?;
        }
    }
    Ok(kind)
}

/// Validate all RON data files in a directory.
///
/// # Errors
///
/// Returns an error only if the directory cannot be listed; per-file
/// problems are collected in the report.
pub fn validate_data_directory(path: &Path) -> Result<ValidationReport> {
    let io_err = |source| ToolError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut files = Vec::new();
    for entry in std::fs::read_dir(path).map_err(io_err)? {
        let file = entry.map_err(io_err)?.path();
        if file.extension().is_some_and(|ext| ext == "ron") {
            files.push(file);
        }
    }
    files.sort();

    let mut report = ValidationReport::default();
    for file in files {
        match validate_file(&file) {
            Ok(kind) => tracing::debug!(file = %file.display(), ?kind, "Valid"),
            Err(e) => {
                tracing::warn!(file = %file.display(), error = %e, "Invalid");
                report.failures.push((file.clone(), e.to_string()));
            }
        }
        report.checked.push(file);
    }
    Ok(report)
}

/// Spawn points that fall outside the map or inside a wall.
fn spawn_problems(map: &MapDef) -> Vec<String> {
    let Ok(grid) = map.build_grid(1) else {
        // Structural errors are already reported by the catalog check.
        return Vec::new();
    };
    map.spawn_positions()
        .into_iter()
        .filter(|&pos| {
            let (col, row) = grid.world_to_cell(pos);
            !grid.get(col, row).is_some_and(|tile| tile.is_empty())
        })
        .map(|pos| {
            format!(
                "Map '{}' spawn point ({}, {}) is not on an empty cell",
                map.id, pos.x, pos.y
            )
        })
        .collect()
}

fn pretty() -> PrettyConfig {
    PrettyConfig::new().depth_limit(4).struct_names(true)
}

/// The built-in catalogs as RON.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn dump_catalogs() -> Result<String> {
    Ok(ron::ser::to_string_pretty(&Catalogs::builtin(), pretty())?)
}

/// The default balance config as RON.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn dump_config() -> Result<String> {
    Ok(ron::ser::to_string_pretty(&SimConfig::default(), pretty())?)
}

/// ASCII preview of a built-in map with spawn points marked `S`.
///
/// # Errors
///
/// Returns an error if the map id is unknown.
pub fn render_map(id: &str) -> Result<String> {
    let catalogs = Catalogs::builtin();
    let map = catalogs.map(id)?;
    let grid = map.build_grid(1)?;

    let mut rows: Vec<Vec<char>> = map
        .layout
        .iter()
        .map(|row| row.chars().collect())
        .collect();
    for pos in map.spawn_positions() {
        let (col, row) = grid.world_to_cell(pos);
        let cell = usize::try_from(row)
            .ok()
            .zip(usize::try_from(col).ok())
            .and_then(|(r, c)| rows.get_mut(r).and_then(|line| line.get_mut(c)));
        if let Some(cell) = cell {
            *cell = 'S';
        }
    }

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} ({}) {}x{} cells of {} px",
        map.name, map.id, map.cols, map.rows, map.cell_size
    );
    for row in rows {
        out.extend(row);
        out.push('\n');
    }
    Ok(out)
}
