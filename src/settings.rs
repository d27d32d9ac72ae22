use crate::stencil::mask::MaskResolution;
use crate::stencil::smooth::SmoothingPolicy;
use crate::stencil::texture::Rgba;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const SETTINGS_FILE_NAME: &str = "stencil_settings.json";
const MAX_UNDO_LIMIT: usize = 256;

/// User preferences for stencil editing. Loaded once at startup and passed
/// explicitly to the [`crate::stencil::Stencil`] that uses them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StencilSettings {
    /// Resolution given to newly created layers.
    #[serde(default)]
    pub default_resolution: MaskResolution,
    /// Minimum value a cell needs to count as painted when tracing outlines.
    #[serde(default = "default_outline_threshold")]
    pub outline_threshold: u16,
    #[serde(default)]
    pub smoothing: SmoothingPolicy,
    /// Undo entries kept per layer. Zero disables history.
    #[serde(default = "default_undo_limit")]
    pub undo_limit: usize,
    /// Deflate the snapshot a hidden layer is parked in.
    #[serde(default = "default_compress_released_layers")]
    pub compress_released_layers: bool,
    /// When enabled the host initialises the logger at debug level.
    #[serde(default)]
    pub debug_logging: bool,
    /// Folder for PNG exports. `None` means next to the executable.
    #[serde(default)]
    pub export_folder: Option<String>,
    #[serde(default = "default_preview_background")]
    pub preview_background: Rgba,
}

fn default_outline_threshold() -> u16 {
    32_768
}

fn default_undo_limit() -> usize {
    16
}

fn default_compress_released_layers() -> bool {
    true
}

fn default_preview_background() -> Rgba {
    Rgba::BLACK
}

impl Default for StencilSettings {
    fn default() -> Self {
        Self {
            default_resolution: MaskResolution::default(),
            outline_threshold: default_outline_threshold(),
            smoothing: SmoothingPolicy::default(),
            undo_limit: default_undo_limit(),
            compress_released_layers: default_compress_released_layers(),
            debug_logging: false,
            export_folder: None,
            preview_background: default_preview_background(),
        }
    }
}

impl StencilSettings {
    /// Pull hand-edited values back into range.
    pub fn sanitize(&mut self) {
        self.smoothing.sanitize();
        if self.undo_limit > MAX_UNDO_LIMIT {
            tracing::warn!(
                undo_limit = self.undo_limit,
                "undo limit too large; clamping to {MAX_UNDO_LIMIT}"
            );
            self.undo_limit = MAX_UNDO_LIMIT;
        }
        if let Some(folder) = &self.export_folder {
            if folder.trim().is_empty() {
                self.export_folder = None;
            }
        }
    }

    pub fn export_folder_path(&self) -> Option<PathBuf> {
        self.export_folder.as_ref().map(PathBuf::from)
    }
}

pub fn settings_path_from_exe_path(exe_path: &Path) -> Result<PathBuf> {
    let parent = exe_path
        .parent()
        .ok_or_else(|| anyhow!("executable path has no parent: {}", exe_path.display()))?;
    Ok(parent.join(SETTINGS_FILE_NAME))
}

pub fn resolve_settings_path() -> Result<PathBuf> {
    let exe_path = std::env::current_exe().context("resolve current executable")?;
    settings_path_from_exe_path(&exe_path)
}

/// Load from the file next to the executable, falling back to defaults.
pub fn load() -> Result<StencilSettings> {
    let path = resolve_settings_path()?;
    Ok(load_from_path(&path)?.unwrap_or_default())
}

pub fn save(settings: &StencilSettings) -> Result<PathBuf> {
    let path = resolve_settings_path()?;
    save_to_path(&path, settings)?;
    Ok(path)
}

/// `None` when the file does not exist; defaults when it is empty.
pub fn load_from_path(path: &Path) -> Result<Option<StencilSettings>> {
    if !path.exists() {
        return Ok(None);
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("read stencil settings file {}", path.display()))?;

    if content.trim().is_empty() {
        return Ok(Some(StencilSettings::default()));
    }

    let mut loaded: StencilSettings = serde_json::from_str(&content)
        .with_context(|| format!("deserialize stencil settings file {}", path.display()))?;
    loaded.sanitize();
    Ok(Some(loaded))
}

pub fn save_to_path(path: &Path, settings: &StencilSettings) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create stencil settings folder {}", parent.display()))?;
    }

    let mut sanitized = settings.clone();
    sanitized.sanitize();
    let json = serde_json::to_string_pretty(&sanitized).context("serialize stencil settings")?;
    std::fs::write(path, json)
        .with_context(|| format!("write stencil settings file {}", path.display()))
}
