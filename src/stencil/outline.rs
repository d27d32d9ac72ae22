use crate::stencil::mask::{Mask, MaskResolution};
use crate::stencil::rect::{NormalizedRect, PixelRect};

/// Binary outline of the painted regions of a mask.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineMask {
    resolution: MaskResolution,
    painted: Vec<bool>,
    outline: Vec<bool>,
}

impl OutlineMask {
    pub fn resolution(&self) -> MaskResolution {
        self.resolution
    }

    pub fn is_painted(&self, x: usize, y: usize) -> bool {
        self.painted[y * self.resolution.side() + x]
    }

    pub fn is_outline(&self, x: usize, y: usize) -> bool {
        self.outline[y * self.resolution.side() + x]
    }

    pub fn outline_cells(&self) -> &[bool] {
        &self.outline
    }

    pub fn painted_cells(&self) -> &[bool] {
        &self.painted
    }

    pub fn outline_len(&self) -> usize {
        self.outline.iter().filter(|&&c| c).count()
    }

    pub fn is_empty(&self) -> bool {
        !self.outline.iter().any(|&c| c)
    }

    /// Outline pixel coordinates in row-major order.
    pub fn outline_points(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let side = self.resolution.side();
        self.outline
            .iter()
            .enumerate()
            .filter(|&(_, &c)| c)
            .map(move |(i, _)| (i % side, i / side))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineTrace {
    pub outline: OutlineMask,
    /// Tight bounds of every painted cell; `None` when nothing is painted.
    pub bounds: Option<PixelRect>,
}

impl OutlineTrace {
    /// Bounds in `[0, 1]` mask coordinates.
    pub fn normalized_bounds(&self) -> Option<NormalizedRect> {
        let side = self.outline.resolution.side() as u32;
        self.bounds.map(|b| b.to_normalized(side))
    }
}

/// A cell is painted when `value >= threshold`, and on the outline when it is
/// painted and a 4-neighbour is unpainted or off the grid.
pub fn trace_outline(mask: &Mask, threshold: u16) -> OutlineTrace {
    let side = mask.side();
    let painted: Vec<bool> = mask.cells().iter().map(|&v| v >= threshold).collect();
    let mut outline = vec![false; painted.len()];
    let mut bounds: Option<PixelRect> = None;

    for y in 0..side {
        for x in 0..side {
            let idx = y * side + x;
            if !painted[idx] {
                continue;
            }
            let cell = PixelRect::from_points((x as i32, y as i32), (x as i32, y as i32), 0);
            bounds = Some(bounds.map_or(cell, |b| b.union(cell)));

            let edge = x == 0
                || y == 0
                || x == side - 1
                || y == side - 1
                || !painted[idx - 1]
                || !painted[idx + 1]
                || !painted[idx - side]
                || !painted[idx + side];
            outline[idx] = edge;
        }
    }

    OutlineTrace {
        outline: OutlineMask {
            resolution: mask.resolution(),
            painted,
            outline,
        },
        bounds,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stencil::mask::MASK_MAX;

    #[test]
    fn empty_mask_has_no_outline_and_no_bounds() {
        let mask = Mask::new(MaskResolution::R128);
        let trace = trace_outline(&mask, 1);
        assert!(trace.outline.is_empty());
        assert_eq!(trace.bounds, None);
    }

    #[test]
    fn square_outline_is_its_border() {
        let mut mask = Mask::new(MaskResolution::R128);
        for y in 10..20 {
            for x in 30..40 {
                mask.set(x, y, MASK_MAX).unwrap();
            }
        }
        let trace = trace_outline(&mask, 32_768);
        assert_eq!(
            trace.bounds,
            Some(PixelRect {
                x: 30,
                y: 10,
                width: 10,
                height: 10
            })
        );
        assert_eq!(trace.outline.outline_len(), 36);
        assert!(trace.outline.is_outline(30, 15));
        assert!(!trace.outline.is_outline(35, 15));
        assert!(trace.outline.is_painted(35, 15));

        let n = trace.normalized_bounds().unwrap();
        assert!((n.x - 30.0 / 128.0).abs() < 1e-6);
        assert!((n.width - 10.0 / 128.0).abs() < 1e-6);
    }

    #[test]
    fn cells_on_grid_border_are_outline() {
        let mask = Mask::filled(MaskResolution::R128, MASK_MAX);
        let trace = trace_outline(&mask, MASK_MAX);
        assert_eq!(trace.outline.outline_len(), 4 * 128 - 4);
        assert!(trace.outline.is_outline(0, 64));
        assert!(!trace.outline.is_outline(1, 64));
    }

    #[test]
    fn threshold_excludes_faint_cells() {
        let mut mask = Mask::new(MaskResolution::R128);
        mask.set(5, 5, 100).unwrap();
        mask.set(6, 5, 50_000).unwrap();
        let trace = trace_outline(&mask, 1_000);
        assert!(!trace.outline.is_painted(5, 5));
        assert_eq!(trace.outline.outline_points().collect::<Vec<_>>(), vec![(6, 5)]);
    }
}
