use std::{fs, path::Path};

use anyhow::{Context, Result};
use outbreak_core::SimulationConfig;
use outbreak_world::{TileMap, DEMO_TOWN};

/// Reads a TOML configuration file, or falls back to the defaults.
pub(crate) fn load_config(path: Option<&Path>) -> Result<SimulationConfig> {
    let Some(path) = path else {
        return Ok(SimulationConfig::default());
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read configuration {}", path.display()))?;
    parse_config(&text).with_context(|| format!("invalid configuration {}", path.display()))
}

/// Parses and validates a TOML configuration document.
pub(crate) fn parse_config(text: &str) -> Result<SimulationConfig> {
    let config: SimulationConfig = toml::from_str(text).context("malformed TOML")?;
    config.validate()?;
    Ok(config)
}

/// Reads an ASCII map layout, or falls back to the built-in demo town.
pub(crate) fn load_map(path: Option<&Path>) -> Result<TileMap> {
    let Some(path) = path else {
        return TileMap::parse(DEMO_TOWN).context("built-in demo town is malformed");
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read map {}", path.display()))?;
    TileMap::parse(&text).with_context(|| format!("invalid map {}", path.display()))
}
