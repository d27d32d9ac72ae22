use crate::stencil::cancel::CancelToken;
use crate::stencil::error::StencilError;
use crate::stencil::mask::{Mask, MASK_MAX};
use serde::{Deserialize, Serialize};

/// Two-pass smoothing recipe: a wide pass at the caller's strength, then a
/// narrow pass at a fixed low strength.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SmoothingPolicy {
    #[serde(default = "default_primary_radius")]
    pub primary_radius: u32,
    #[serde(default = "default_secondary_radius")]
    pub secondary_radius: u32,
    #[serde(default = "default_secondary_strength")]
    pub secondary_strength: f32,
}

fn default_primary_radius() -> u32 {
    7
}

fn default_secondary_radius() -> u32 {
    3
}

fn default_secondary_strength() -> f32 {
    0.25
}

impl Default for SmoothingPolicy {
    fn default() -> Self {
        Self {
            primary_radius: default_primary_radius(),
            secondary_radius: default_secondary_radius(),
            secondary_strength: default_secondary_strength(),
        }
    }
}

impl SmoothingPolicy {
    pub fn sanitize(&mut self) {
        let defaults = Self::default();
        if self.primary_radius == 0 {
            self.primary_radius = defaults.primary_radius;
        }
        if self.secondary_radius == 0 {
            self.secondary_radius = defaults.secondary_radius;
        }
        if !(0.0..=1.0).contains(&self.secondary_strength) {
            self.secondary_strength = defaults.secondary_strength;
        }
    }
}

/// Normalized Gaussian weights for `2 * radius + 1` taps, sigma = radius / 2.
pub fn gaussian_weights(radius: usize) -> Vec<f32> {
    let sigma = (radius as f32 * 0.5).max(0.5);
    let denom = 2.0 * sigma * sigma;
    let r = radius as i64;
    let mut weights: Vec<f32> = (-r..=r)
        .map(|k| (-((k * k) as f32) / denom).exp())
        .collect();
    let sum: f32 = weights.iter().sum();
    for w in &mut weights {
        *w /= sum;
    }
    weights
}

pub fn smooth(mask: &Mask, kernel_radius: i32, strength: f32) -> Result<Mask, StencilError> {
    smooth_with_cancel(mask, kernel_radius, strength, &CancelToken::new())
}

/// Separable blur over the whole mask: rows then columns with replicated
/// edges, blended with the input as `lerp(original, blurred, strength)`.
/// `kernel_radius` must lie in `1..=side`.
pub fn smooth_with_cancel(
    mask: &Mask,
    kernel_radius: i32,
    strength: f32,
    cancel: &CancelToken,
) -> Result<Mask, StencilError> {
    if kernel_radius <= 0 || kernel_radius as usize > mask.side() {
        return Err(StencilError::invalid(format!(
            "smoothing radius {kernel_radius} outside 1..={} for a {} mask",
            mask.side(),
            mask.resolution()
        )));
    }
    if !(0.0..=1.0).contains(&strength) {
        return Err(StencilError::invalid(format!(
            "smoothing strength {strength} outside [0, 1]"
        )));
    }
    if strength == 0.0 {
        return Ok(mask.clone());
    }

    let side = mask.side();
    let last = side as i64 - 1;
    let radius = kernel_radius as i64;
    let weights = gaussian_weights(kernel_radius as usize);
    let src = mask.cells();

    let mut horizontal = vec![0f32; src.len()];
    for y in 0..side {
        cancel.check()?;
        let row = &src[y * side..(y + 1) * side];
        let out = &mut horizontal[y * side..(y + 1) * side];
        for (x, slot) in out.iter_mut().enumerate() {
            let mut acc = 0f32;
            for (k, w) in weights.iter().enumerate() {
                let sx = (x as i64 + k as i64 - radius).clamp(0, last) as usize;
                acc += row[sx] as f32 * w;
            }
            *slot = acc;
        }
    }

    let mut cells = Vec::with_capacity(src.len());
    for y in 0..side {
        cancel.check()?;
        for x in 0..side {
            let mut blurred = 0f32;
            for (k, w) in weights.iter().enumerate() {
                let sy = (y as i64 + k as i64 - radius).clamp(0, last) as usize;
                blurred += horizontal[sy * side + x] * w;
            }
            let original = src[y * side + x] as f32;
            let value = original + (blurred - original) * strength;
            cells.push(value.round().clamp(0.0, MASK_MAX as f32) as u16);
        }
    }

    tracing::debug!(resolution = %mask.resolution(), kernel_radius, strength, "mask smoothed");
    Mask::from_cells(mask.resolution(), cells)
}

/// Run `policy`: the primary pass at `strength`, then the secondary pass at
/// the policy's fixed strength.
pub fn smooth_with_policy(
    mask: &Mask,
    policy: &SmoothingPolicy,
    strength: f32,
    cancel: &CancelToken,
) -> Result<Mask, StencilError> {
    let first = smooth_with_cancel(mask, policy.primary_radius as i32, strength, cancel)?;
    smooth_with_cancel(
        &first,
        policy.secondary_radius as i32,
        policy.secondary_strength,
        cancel,
    )
}
