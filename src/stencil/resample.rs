use crate::stencil::cancel::CancelToken;
use crate::stencil::error::StencilError;
use crate::stencil::mask::{Mask, MaskResolution};

/// Nearest-neighbour resize. Coverage is membership data, so no filtering
/// is applied: a uniform field stays exactly uniform.
pub fn resize(mask: &Mask, new_side: usize) -> Result<Mask, StencilError> {
    resize_with_cancel(mask, new_side, &CancelToken::new())
}

pub fn resize_with_cancel(
    mask: &Mask,
    new_side: usize,
    cancel: &CancelToken,
) -> Result<Mask, StencilError> {
    let target = MaskResolution::try_from_side(new_side)?;
    if target == mask.resolution() {
        return Ok(mask.clone());
    }

    let old_side = mask.side();
    let src = mask.cells();
    let columns = source_indices(old_side, new_side);
    let mut cells = Vec::with_capacity(target.cells());
    for y in 0..new_side {
        cancel.check()?;
        let row = y * old_side / new_side * old_side;
        cells.extend(columns.iter().map(|&sx| src[row + sx]));
    }

    tracing::debug!(from = %mask.resolution(), to = %target, "mask resized");
    Mask::from_cells(target, cells)
}

/// Source column for every destination column: `floor(x * old / new)`.
fn source_indices(old: usize, new: usize) -> Vec<usize> {
    (0..new).map(|x| x * old / new).collect()
}

/// Nearest-neighbour resample of an arbitrary `width x height` byte plane to
/// a square `side x side` plane. Used to bring imported images to a
/// supported mask size.
pub fn resample_plane(
    plane: &[u8],
    width: usize,
    height: usize,
    side: usize,
) -> Result<Vec<u8>, StencilError> {
    if width == 0 || height == 0 {
        return Err(StencilError::invalid("cannot resample an empty image"));
    }
    if plane.len() != width * height {
        return Err(StencilError::DimensionMismatch(format!(
            "{} bytes supplied for a {width}x{height} plane",
            plane.len()
        )));
    }
    if width == side && height == side {
        return Ok(plane.to_vec());
    }

    let columns = source_indices(width, side);
    let mut out = Vec::with_capacity(side * side);
    for y in 0..side {
        let row = y * height / side * width;
        out.extend(columns.iter().map(|&sx| plane[row + sx]));
    }
    Ok(out)
}

/// Nearest-neighbour crop of tile `(column, row)` out of a
/// `tiles_per_side x tiles_per_side` grid laid over the mask, resampled to
/// `target`. Destination `(x, y)` reads source
/// `floor((column * t + x) * side / (tiles_per_side * t))`.
pub(crate) fn crop_tile(
    mask: &Mask,
    tile: (usize, usize),
    tiles_per_side: usize,
    target: MaskResolution,
) -> Result<Mask, StencilError> {
    let t = target.side();
    let src_side = mask.side();
    let src = mask.cells();
    let denom = tiles_per_side * t;
    let columns: Vec<usize> = (0..t)
        .map(|x| (tile.0 * t + x) * src_side / denom)
        .collect();
    let mut cells = Vec::with_capacity(target.cells());
    for y in 0..t {
        let row = (tile.1 * t + y) * src_side / denom * src_side;
        cells.extend(columns.iter().map(|&sx| src[row + sx]));
    }
    Mask::from_cells(target, cells)
}
