//! Inspector configuration.
//!
//! A TOML file with two optional tables:
//!
//! ```toml
//! [render]
//! include_values = false   # keys-only namespaces
//! style = "tagged"         # El|INT, 1| instead of 1
//! max_depth = 32
//!
//! [layout]
//! preset = "ilp32"         # i386 build; implied by pointer_size = 4
//!
//! [layout.pair]
//! next = 28
//! ```
//!
//! Render fields default individually. Layout fields are laid over a preset:
//! `preset` when given, otherwise `ilp32` for `pointer_size = 4`, otherwise
//! the caller's fallback (64-bit unless the memory source says otherwise).

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tracing::debug;

use crate::error::{Error, Result};
use crate::process::{Layout, LayoutPreset};

/// Traversal and output limits.
pub mod limits {
    /// Default maximum nesting of elements, lists and return wrappers.
    pub const MAX_DEPTH: usize = 64;

    /// Strings longer than this are treated as unreadable (a corrupt length
    /// would otherwise allocate without bound).
    pub const MAX_STRING_LEN: usize = 16 * 1024 * 1024;
}

/// How `Element` values are written.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ElementStyle {
    /// Plain literals: `1`, `'abc'`, `[1 2 3]`.
    #[default]
    Bare,
    /// Debugger-style markers: `El|INT, 1|`.
    Tagged,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// Decode and print namespace values, not just keys.
    pub include_values: bool,
    pub style: ElementStyle,
    pub max_depth: usize,
    pub max_string_len: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            include_values: true,
            style: ElementStyle::Bare,
            max_depth: limits::MAX_DEPTH,
            max_string_len: limits::MAX_STRING_LEN,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InspectorConfig {
    pub render: RenderOptions,
    pub layout: Layout,
}

/// The file as written; `layout` stays raw until its preset is known.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    render: RenderOptions,
    layout: toml::Table,
}

impl InspectorConfig {
    /// Defaults with the layout of `preset`.
    pub fn with_preset(preset: LayoutPreset) -> Self {
        Self {
            render: RenderOptions::default(),
            layout: preset.layout(),
        }
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::load_with_preset(path, LayoutPreset::default())
    }

    /// Load a config file whose layout falls back to `fallback` when the
    /// file names neither `preset` nor `pointer_size`.
    pub fn load_with_preset<P: AsRef<Path>>(path: P, fallback: LayoutPreset) -> Result<Self> {
        let content = fs::read_to_string(&path)?;
        let config = Self::parse_with_preset(&content, fallback)?;
        debug!("Loaded inspector config from {:?}", path.as_ref());
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        Self::parse_with_preset(content, LayoutPreset::default())
    }

    pub fn parse_with_preset(content: &str, fallback: LayoutPreset) -> Result<Self> {
        let file: ConfigFile =
            toml::from_str(content).map_err(|e| Error::ConfigParseError(e.to_string()))?;
        let layout = resolve_layout(file.layout, fallback)?;
        layout.validate()?;
        Ok(Self {
            render: file.render,
            layout,
        })
    }
}

fn resolve_layout(mut overrides: toml::Table, fallback: LayoutPreset) -> Result<Layout> {
    let preset = match overrides.remove("preset") {
        Some(value) => value
            .as_str()
            .and_then(|name| name.parse::<LayoutPreset>().ok())
            .ok_or_else(|| Error::ConfigParseError(format!("Unknown layout preset {}", value)))?,
        None => match overrides.get("pointer_size").and_then(toml::Value::as_integer) {
            Some(4) => LayoutPreset::Ilp32,
            Some(_) => LayoutPreset::Lp64,
            None => fallback,
        },
    };
    debug!("Layout preset: {}", preset);

    let base = toml::Value::try_from(preset.layout())
        .map_err(|e| Error::ConfigParseError(e.to_string()))?;
    let mut base = match base {
        toml::Value::Table(table) => table,
        other => {
            return Err(Error::ConfigParseError(format!(
                "Layout preset {} is not a table: {}",
                preset, other
            )));
        }
    };
    merge_tables(&mut base, overrides);
    toml::Value::Table(base)
        .try_into()
        .map_err(|e| Error::ConfigParseError(e.to_string()))
}

/// Lay `overrides` over `base`, descending into tables present in both.
fn merge_tables(base: &mut toml::Table, overrides: toml::Table) {
    for (key, value) in overrides {
        match value {
            toml::Value::Table(patch) => match base.get_mut(&key) {
                Some(toml::Value::Table(inner)) => merge_tables(inner, patch),
                _ => {
                    base.insert(key, toml::Value::Table(patch));
                }
            },
            value => {
                base.insert(key, value);
            }
        }
    }
}
