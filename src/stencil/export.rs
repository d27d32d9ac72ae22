use crate::stencil::error::StencilError;
use crate::stencil::layer::StencilLayer;
use crate::stencil::mask::{Mask, MaskResolution};
use crate::stencil::resample::crop_tile;
use crate::stencil::texture::{encode_png, mask_to_rgba, RgbaBuffer};
use anyhow::{anyhow, Context, Result};
use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};

pub const STENCIL_EXPORT_SUBDIR: &str = "stencil_exports";

/// One slice of a mask for a terrain tile in a square tile grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskTile {
    pub column: usize,
    pub row: usize,
    pub mask: Mask,
}

/// Slice `mask` into `tiles_per_side²` tiles, row-major, each
/// nearest-resampled to `tile_resolution`.
pub fn export_tiles(
    mask: &Mask,
    tiles_per_side: usize,
    tile_resolution: MaskResolution,
) -> Result<Vec<MaskTile>, StencilError> {
    if tiles_per_side == 0 || tiles_per_side > mask.side() {
        return Err(StencilError::invalid(format!(
            "{tiles_per_side} tiles per side does not fit a {} mask",
            mask.resolution()
        )));
    }

    let mut tiles = Vec::with_capacity(tiles_per_side * tiles_per_side);
    for row in 0..tiles_per_side {
        for column in 0..tiles_per_side {
            tiles.push(MaskTile {
                column,
                row,
                mask: crop_tile(mask, (column, row), tiles_per_side, tile_resolution)?,
            });
        }
    }
    Ok(tiles)
}

pub fn exe_relative_output_folder_from_path(exe_path: &Path) -> Result<PathBuf> {
    let parent = exe_path
        .parent()
        .ok_or_else(|| anyhow!("executable path has no parent: {}", exe_path.display()))?;
    Ok(parent.join(STENCIL_EXPORT_SUBDIR))
}

/// Create `folder`, or the default folder next to the executable.
pub fn ensure_output_folder(folder: Option<&Path>) -> Result<PathBuf> {
    let output = match folder {
        Some(folder) => folder.to_path_buf(),
        None => {
            let exe_path = std::env::current_exe().context("resolve current executable")?;
            exe_relative_output_folder_from_path(&exe_path)?
        }
    };
    fs::create_dir_all(&output)
        .with_context(|| format!("create stencil output folder {}", output.display()))?;
    Ok(output)
}

pub fn timestamped_stem(now: chrono::DateTime<Local>) -> String {
    now.format("%Y%m%d_%H%M%S").to_string()
}

/// Filesystem-safe form of a layer name.
pub fn layer_slug(name: &str) -> String {
    let slug = slug::slugify(name);
    if slug.is_empty() {
        "layer".to_string()
    } else {
        slug
    }
}

pub fn build_filename(stem: &str, layer: &str) -> String {
    format!("{}_{}.png", stem, layer_slug(layer))
}

pub fn build_tile_filename(stem: &str, layer: &str, column: usize, row: usize) -> String {
    format!("{}_{}_x{}_y{}.png", stem, layer_slug(layer), column, row)
}

pub fn save_png(buffer: &RgbaBuffer, path: &Path) -> Result<()> {
    let png = encode_png(buffer).with_context(|| format!("encode stencil png {}", path.display()))?;
    fs::write(path, png).with_context(|| format!("write stencil png {}", path.display()))
}

fn write_mask_png(mask: &Mask, path: &Path) -> Result<()> {
    save_png(&mask_to_rgba(mask), path)
}

/// Write the packed texture of a layer into `dir`.
pub fn export_layer_png(
    layer: &StencilLayer,
    dir: &Path,
    now: chrono::DateTime<Local>,
) -> Result<PathBuf> {
    let mask = layer.view()?;
    let path = dir.join(build_filename(&timestamped_stem(now), &layer.name));
    write_mask_png(&mask, &path)?;
    tracing::debug!(layer = %layer.id(), path = %path.display(), "stencil layer exported");
    Ok(path)
}

/// Write one packed texture per terrain tile into `dir`.
pub fn export_layer_tiles_png(
    layer: &StencilLayer,
    dir: &Path,
    tiles_per_side: usize,
    tile_resolution: MaskResolution,
    now: chrono::DateTime<Local>,
) -> Result<Vec<PathBuf>> {
    let mask = layer.view()?;
    let stem = timestamped_stem(now);
    let tiles = export_tiles(&mask, tiles_per_side, tile_resolution)?;
    let mut paths = Vec::with_capacity(tiles.len());
    for tile in &tiles {
        let path = dir.join(build_tile_filename(&stem, &layer.name, tile.column, tile.row));
        write_mask_png(&tile.mask, &path)?;
        paths.push(path);
    }
    tracing::debug!(layer = %layer.id(), tiles = paths.len(), "stencil layer exported as tiles");
    Ok(paths)
}
