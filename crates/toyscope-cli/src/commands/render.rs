//! Render command implementation.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use toyscope_core::{
    Cell, ElementStyle, Inspector, InspectorConfig, LayoutPreset, ReadMemory, TypeRef,
};
use tracing::debug;

use super::source::with_reader;
use crate::cli::SourceArgs;

/// Flags that override the config file.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub keys_only: bool,
    pub style: Option<ElementStyle>,
    pub max_depth: Option<usize>,
}

pub struct RenderRequest {
    pub ty: String,
    pub address: u64,
    pub source: SourceArgs,
    pub config: Option<PathBuf>,
    pub overrides: Overrides,
    pub json: bool,
}

/// Load the config file, if any, and apply command-line overrides.
///
/// `fallback` is the layout used when the file does not pick one.
pub fn resolve_config(
    path: Option<&Path>,
    overrides: &Overrides,
    fallback: LayoutPreset,
) -> Result<InspectorConfig> {
    let mut config = match path {
        Some(path) => InspectorConfig::load_with_preset(path, fallback)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => InspectorConfig::with_preset(fallback),
    };

    if overrides.keys_only {
        config.render.include_values = false;
    }
    if let Some(style) = overrides.style {
        config.render.style = style;
    }
    if let Some(max_depth) = overrides.max_depth {
        config.render.max_depth = max_depth;
    }
    debug!("Render options: {:?}", config.render);
    Ok(config)
}

/// Render the requested cell from `reader`; `None` when the type has no decoder.
pub fn render_from(reader: &dyn ReadMemory, request: &RenderRequest) -> Result<Option<String>> {
    let fallback = match reader.pointer_size() {
        Some(width) => {
            debug!("Source reports {}-byte pointers", width);
            LayoutPreset::for_pointer_size(width)
        }
        None => LayoutPreset::default(),
    };
    let config = resolve_config(request.config.as_deref(), &request.overrides, fallback)?;
    let cell = Cell::new(request.address, TypeRef::parse(&request.ty));

    let inspector = Inspector::from_config(reader, config);
    let context = || format!("Failed to render {} at {:#x}", cell.ty, cell.address);

    if request.json {
        let node = inspector.decode(&cell).with_context(context)?;
        node.map(|node| serde_json::to_string_pretty(&node))
            .transpose()
            .context("Failed to serialize decoded cell")
    } else {
        inspector.render(&cell).with_context(context)
    }
}

/// Run the render command
pub fn run(request: RenderRequest) -> Result<()> {
    let output = with_reader(&request.source, |reader| render_from(reader, &request))?;

    match output {
        Some(text) => println!("{}", text),
        None => println!(
            "No decoder for type {}; nothing to render",
            TypeRef::parse(&request.ty)
        ),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use toyscope_core::process::{MockElement, MockHeap};
    use toyscope_core::{Layout, SnapshotReader};

    use super::*;
    use crate::commands::capture::capture_to;
    use crate::commands::hex_utils::Region;

    #[test]
    fn test_overrides_apply_over_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("toyscope.toml");
        fs::write(
            &path,
            "[render]\nstyle = \"tagged\"\nmax_depth = 10\n\n[layout]\npointer_size = 4\n",
        )
        .unwrap();

        let overrides = Overrides {
            keys_only: true,
            style: None,
            max_depth: Some(3),
        };
        let config = resolve_config(Some(path.as_path()), &overrides, LayoutPreset::Lp64).unwrap();
        assert!(!config.render.include_values);
        assert_eq!(config.render.style, ElementStyle::Tagged);
        assert_eq!(config.render.max_depth, 3);
        assert_eq!(config.layout, Layout::ilp32());
    }

    #[test]
    fn test_defaults_without_file() {
        let config = resolve_config(None, &Overrides::default(), LayoutPreset::Lp64).unwrap();
        assert_eq!(config, InspectorConfig::default());

        let config = resolve_config(None, &Overrides::default(), LayoutPreset::Ilp32).unwrap();
        assert_eq!(config.layout, Layout::ilp32());
    }

    #[test]
    fn test_config_layout_beats_source_pointer_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("toyscope.toml");
        fs::write(&path, "[layout]\npointer_size = 8\n").unwrap();

        let config =
            resolve_config(Some(path.as_path()), &Overrides::default(), LayoutPreset::Ilp32).unwrap();
        assert_eq!(config.layout, Layout::default());
    }

    #[test]
    fn test_missing_config_file_fails() {
        let path = PathBuf::from("/nonexistent/toyscope.toml");
        assert!(resolve_config(Some(path.as_path()), &Overrides::default(), LayoutPreset::Lp64).is_err());
    }

    fn request(ty: &str, address: u64) -> RenderRequest {
        RenderRequest {
            ty: ty.to_string(),
            address,
            source: SourceArgs {
                pid: None,
                process: None,
                snapshot: None,
            },
            config: None,
            overrides: Overrides::default(),
            json: false,
        }
    }

    #[test]
    fn test_render_32bit_snapshot_without_config() {
        let mut heap = MockHeap::new(Layout::ilp32());
        let local = heap.namespace(2, &[(0, "i", MockElement::Int(9))], None);
        let env = heap.environment(local);
        let env_ptr = heap.pointer_to(env);
        let reader = heap.build();
        let regions = [Region {
            address: reader.base_address(),
            len: reader.len(),
        }];

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("heap32.json");
        capture_to(&reader, &regions, &path).unwrap();
        let snapshot = SnapshotReader::load(&path).unwrap();

        assert_eq!(snapshot.pointer_size(), Some(4));
        for (ty, address) in [("Environment", env), ("struct Environment *", env_ptr)] {
            let out = render_from(&snapshot, &request(ty, address)).unwrap();
            assert_eq!(out.as_deref(), Some("NS{'i': 9}"));
        }
    }
}
