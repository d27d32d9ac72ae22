use crate::stencil::error::StencilError;
use crate::stencil::mask::{Mask, MASK_MAX};
use crate::stencil::rect::PixelRect;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BrushKernel {
    CircleSolid,
    CircleGradient,
    CircleSmooth,
    CircleSubtract,
    EraserCircleSolid,
}

impl BrushKernel {
    /// Intensity at normalized distance `d` from the stroke centre
    /// (0 at the centre, 1 at the rim). Zero beyond the rim.
    pub fn falloff(self, d: f32) -> f32 {
        if !(0.0..=1.0).contains(&d) {
            return 0.0;
        }
        match self {
            BrushKernel::CircleSolid | BrushKernel::EraserCircleSolid => 1.0,
            BrushKernel::CircleGradient | BrushKernel::CircleSubtract => 1.0 - d,
            BrushKernel::CircleSmooth => 1.0 - (3.0 * d * d - 2.0 * d * d * d),
        }
    }

    fn blend(self, old: u16, strength: f32, falloff: f32) -> u16 {
        let full = MASK_MAX as f32;
        match self {
            BrushKernel::CircleSolid | BrushKernel::CircleGradient | BrushKernel::CircleSmooth => {
                let target = (full * strength * falloff).round().clamp(0.0, full) as u16;
                old.max(target)
            }
            BrushKernel::CircleSubtract => {
                let scale = 1.0 - strength * falloff;
                (old as f32 * scale).round().clamp(0.0, full) as u16
            }
            BrushKernel::EraserCircleSolid => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum BrushRadius {
    Pixels(f32),
    /// Fraction of the mask side length.
    Fraction(f32),
}

impl BrushRadius {
    pub fn in_pixels(self, side: usize) -> f32 {
        match self {
            BrushRadius::Pixels(px) => px,
            BrushRadius::Fraction(fraction) => fraction * side as f32,
        }
    }
}

/// One pointer-down or pointer-move dab. `center` is normalized `(u, v)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BrushStroke {
    pub center: (f32, f32),
    pub radius: BrushRadius,
    pub kernel: BrushKernel,
    pub strength: f32,
}

impl BrushStroke {
    pub fn new(center: (f32, f32), radius: BrushRadius, kernel: BrushKernel, strength: f32) -> Self {
        Self {
            center,
            radius,
            kernel,
            strength,
        }
    }

    pub fn validate(&self) -> Result<(), StencilError> {
        if !(self.strength > 0.0 && self.strength <= 1.0) {
            return Err(StencilError::invalid(format!(
                "brush strength {} outside (0, 1]",
                self.strength
            )));
        }
        if !self.center.0.is_finite() || !self.center.1.is_finite() {
            return Err(StencilError::invalid("brush centre is not finite"));
        }
        let radius = match self.radius {
            BrushRadius::Pixels(r) | BrushRadius::Fraction(r) => r,
        };
        if !(radius.is_finite() && radius > 0.0) {
            return Err(StencilError::invalid(format!(
                "brush radius {radius} must be positive"
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StrokeReport {
    /// Grid region the stroke covered, `None` when it missed the mask.
    pub dirty: Option<PixelRect>,
    pub changed: usize,
}

impl StrokeReport {
    fn merge(self, other: StrokeReport) -> StrokeReport {
        let dirty = match (self.dirty, other.dirty) {
            (Some(a), Some(b)) => Some(a.union(b)),
            (a, b) => a.or(b),
        };
        StrokeReport {
            dirty,
            changed: self.changed + other.changed,
        }
    }
}

/// Apply one stroke to the mask in place. Pixels whose centre lies farther
/// than the radius from the stroke centre are never touched.
pub fn apply_stroke(mask: &mut Mask, stroke: &BrushStroke) -> Result<StrokeReport, StencilError> {
    stroke.validate()?;

    let side = mask.side();
    let radius = stroke.radius.in_pixels(side);
    let cx = stroke.center.0 * side as f32;
    let cy = stroke.center.1 * side as f32;

    if !(cx.is_finite() && cy.is_finite() && radius.is_finite()) {
        return Err(StencilError::invalid(format!(
            "brush stroke at ({}, {}) with radius {radius}px does not fit a {} mask",
            stroke.center.0,
            stroke.center.1,
            mask.resolution()
        )));
    }

    let limit = side as f32;
    let misses = |c: f32| c + radius < 0.0 || c - radius > limit;
    let reach = if misses(cx) || misses(cy) {
        None
    } else {
        // Bounded to one cell past the grid before the integer cast.
        let low = |c: f32| (c - radius - 0.5).floor().clamp(-1.0, limit + 1.0) as i32;
        let high = |c: f32| (c + radius).ceil().clamp(-1.0, limit + 1.0) as i32;
        PixelRect::from_points((low(cx), low(cy)), (high(cx), high(cy)), 0).clamp(side as u32)
    };
    let Some(area) = reach else {
        tracing::warn!(
            u = stroke.center.0,
            v = stroke.center.1,
            radius,
            "brush stroke lies entirely outside the mask; ignored"
        );
        return Ok(StrokeReport::default());
    };

    let cells = mask.cells_mut();
    let mut changed = 0;
    for y in area.y..area.y + area.height {
        let dy = y as f32 + 0.5 - cy;
        let row = y as usize * side;
        for x in area.x..area.x + area.width {
            let dx = x as f32 + 0.5 - cx;
            let d = (dx * dx + dy * dy).sqrt() / radius;
            if d > 1.0 {
                continue;
            }
            let idx = row + x as usize;
            let old = cells[idx];
            let new = stroke
                .kernel
                .blend(old, stroke.strength, stroke.kernel.falloff(d));
            if new != old {
                cells[idx] = new;
                changed += 1;
            }
        }
    }

    Ok(StrokeReport {
        dirty: Some(area),
        changed,
    })
}

/// Apply strokes in the order given. Stops at the first invalid stroke; the
/// strokes before it stay applied.
pub fn apply_strokes(mask: &mut Mask, strokes: &[BrushStroke]) -> Result<StrokeReport, StencilError> {
    let mut report = StrokeReport::default();
    for stroke in strokes {
        report = report.merge(apply_stroke(mask, stroke)?);
    }
    Ok(report)
}
