use crate::stencil::error::StencilError;
use serde::{Deserialize, Serialize};

pub const MASK_MAX: u16 = u16::MAX;

/// Supported side lengths for a stencil mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum MaskResolution {
    R128,
    R256,
    R512,
    R1024,
    R2048,
    R4096,
    R8192,
}

impl MaskResolution {
    pub const ALL: [MaskResolution; 7] = [
        MaskResolution::R128,
        MaskResolution::R256,
        MaskResolution::R512,
        MaskResolution::R1024,
        MaskResolution::R2048,
        MaskResolution::R4096,
        MaskResolution::R8192,
    ];

    pub const fn side(self) -> usize {
        match self {
            MaskResolution::R128 => 128,
            MaskResolution::R256 => 256,
            MaskResolution::R512 => 512,
            MaskResolution::R1024 => 1024,
            MaskResolution::R2048 => 2048,
            MaskResolution::R4096 => 4096,
            MaskResolution::R8192 => 8192,
        }
    }

    pub const fn cells(self) -> usize {
        self.side() * self.side()
    }

    pub fn try_from_side(side: usize) -> Result<Self, StencilError> {
        Self::ALL
            .into_iter()
            .find(|res| res.side() == side)
            .ok_or_else(|| {
                StencilError::invalid(format!(
                    "mask resolution {side} is not one of 128, 256, 512, 1024, 2048, 4096, 8192"
                ))
            })
    }

    /// Smallest supported resolution that is at least `side`, capped at 8192.
    pub fn next_at_least(side: usize) -> Self {
        Self::ALL
            .into_iter()
            .find(|res| res.side() >= side)
            .unwrap_or(MaskResolution::R8192)
    }
}

impl Default for MaskResolution {
    fn default() -> Self {
        MaskResolution::R1024
    }
}

impl TryFrom<u32> for MaskResolution {
    type Error = StencilError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::try_from_side(value as usize)
    }
}

impl From<MaskResolution> for u32 {
    fn from(value: MaskResolution) -> Self {
        value.side() as u32
    }
}

impl std::fmt::Display for MaskResolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{0}x{0}", self.side())
    }
}

/// Square grid of 16-bit coverage values, row-major (`y * side + x`).
/// 0 is fully absent and 65535 fully present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    resolution: MaskResolution,
    cells: Vec<u16>,
}

impl Mask {
    pub fn new(resolution: MaskResolution) -> Self {
        Self {
            resolution,
            cells: vec![0; resolution.cells()],
        }
    }

    pub fn filled(resolution: MaskResolution, value: u16) -> Self {
        Self {
            resolution,
            cells: vec![value; resolution.cells()],
        }
    }

    /// Allocate an empty mask for a raw side length.
    pub fn create(side: usize) -> Result<Self, StencilError> {
        Ok(Self::new(MaskResolution::try_from_side(side)?))
    }

    pub fn from_cells(resolution: MaskResolution, cells: Vec<u16>) -> Result<Self, StencilError> {
        if cells.len() != resolution.cells() {
            return Err(StencilError::DimensionMismatch(format!(
                "{} cells supplied for a {resolution} mask",
                cells.len()
            )));
        }
        Ok(Self { resolution, cells })
    }

    pub fn resolution(&self) -> MaskResolution {
        self.resolution
    }

    pub fn side(&self) -> usize {
        self.resolution.side()
    }

    pub fn cells(&self) -> &[u16] {
        &self.cells
    }

    pub(crate) fn cells_mut(&mut self) -> &mut [u16] {
        &mut self.cells
    }

    pub fn into_cells(self) -> Vec<u16> {
        self.cells
    }

    pub fn get(&self, x: usize, y: usize) -> Result<u16, StencilError> {
        let side = self.side();
        if x >= side || y >= side {
            return Err(StencilError::OutOfRange(format!(
                "cell ({x}, {y}) outside {} mask",
                self.resolution
            )));
        }
        Ok(self.cells[y * side + x])
    }

    pub fn set(&mut self, x: usize, y: usize, value: u16) -> Result<(), StencilError> {
        let side = self.side();
        if x >= side || y >= side {
            return Err(StencilError::OutOfRange(format!(
                "cell ({x}, {y}) outside {} mask",
                self.resolution
            )));
        }
        self.cells[y * side + x] = value;
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(|&c| c == 0)
    }

    /// Heap bytes held by the grid.
    pub fn byte_size(&self) -> usize {
        self.cells.len() * std::mem::size_of::<u16>()
    }

    /// Explicitly free the grid.
    pub fn release(self) {
        tracing::debug!(resolution = %self.resolution, bytes = self.byte_size(), "mask released");
        drop(self);
    }

    pub fn pack(&self) -> PackedChannels {
        pack_to_bytes(self)
    }
}

/// Two 8-bit planes holding the high and low byte of every cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedChannels {
    pub side: usize,
    pub high: Vec<u8>,
    pub low: Vec<u8>,
}

pub fn pack_to_bytes(mask: &Mask) -> PackedChannels {
    let mut high = Vec::with_capacity(mask.cells.len());
    let mut low = Vec::with_capacity(mask.cells.len());
    for &value in &mask.cells {
        high.push((value >> 8) as u8);
        low.push((value & 0xFF) as u8);
    }
    PackedChannels {
        side: mask.side(),
        high,
        low,
    }
}

/// Rebuild a mask from square byte planes. `high` and `low` are row-major
/// planes of the same supported side length.
pub fn unpack_from_bytes(high: &[u8], low: &[u8]) -> Result<Mask, StencilError> {
    if high.len() != low.len() {
        return Err(StencilError::DimensionMismatch(format!(
            "high channel has {} bytes, low channel has {}",
            high.len(),
            low.len()
        )));
    }
    let side = (high.len() as f64).sqrt() as usize;
    if side * side != high.len() {
        return Err(StencilError::DimensionMismatch(format!(
            "{} bytes is not a square channel",
            high.len()
        )));
    }
    let resolution = MaskResolution::try_from_side(side).map_err(|_| {
        StencilError::DimensionMismatch(format!("channel side {side} is not a supported size"))
    })?;
    let cells = high
        .iter()
        .zip(low)
        .map(|(&h, &l)| (u16::from(h) << 8) | u16::from(l))
        .collect();
    Ok(Mask { resolution, cells })
}

impl PackedChannels {
    pub fn unpack(&self) -> Result<Mask, StencilError> {
        unpack_from_bytes(&self.high, &self.low)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_rejects_unsupported_sides() {
        assert!(Mask::create(256).is_ok());
        for side in [0, 64, 100, 300, 16384] {
            assert!(matches!(
                Mask::create(side),
                Err(StencilError::InvalidArgument(_))
            ));
        }
    }

    #[test]
    fn new_mask_is_zeroed() {
        let mask = Mask::new(MaskResolution::R128);
        assert_eq!(mask.cells().len(), 128 * 128);
        assert!(mask.is_empty());
    }

    #[test]
    fn pack_splits_high_and_low_bytes() {
        let mut mask = Mask::new(MaskResolution::R128);
        mask.set(3, 1, 0xABCD).unwrap();
        let packed = mask.pack();
        let idx = 128 + 3;
        assert_eq!(packed.high[idx], 0xAB);
        assert_eq!(packed.low[idx], 0xCD);
    }

    #[test]
    fn every_value_survives_pack_unpack() {
        // 65536 values fill exactly one 256x256 mask.
        let cells: Vec<u16> = (0..=u16::MAX).collect();
        let mask = Mask::from_cells(MaskResolution::R256, cells).unwrap();
        let back = mask.pack().unpack().unwrap();
        assert_eq!(back, mask);
    }

    #[test]
    fn unpack_rejects_mismatched_planes() {
        let high = vec![0u8; 128 * 128];
        let low = vec![0u8; 128 * 127];
        assert!(matches!(
            unpack_from_bytes(&high, &low),
            Err(StencilError::DimensionMismatch(_))
        ));

        let odd = vec![0u8; 100 * 100];
        assert!(matches!(
            unpack_from_bytes(&odd, &odd),
            Err(StencilError::DimensionMismatch(_))
        ));
    }

    #[test]
    fn get_out_of_bounds_is_out_of_range() {
        let mask = Mask::new(MaskResolution::R128);
        assert!(matches!(mask.get(128, 0), Err(StencilError::OutOfRange(_))));
    }

    #[test]
    fn next_at_least_rounds_up_and_caps() {
        assert_eq!(MaskResolution::next_at_least(1), MaskResolution::R128);
        assert_eq!(MaskResolution::next_at_least(256), MaskResolution::R256);
        assert_eq!(MaskResolution::next_at_least(257), MaskResolution::R512);
        assert_eq!(MaskResolution::next_at_least(20_000), MaskResolution::R8192);
    }

    #[test]
    fn resolution_serializes_as_side_length() {
        let json = serde_json::to_string(&MaskResolution::R2048).unwrap();
        assert_eq!(json, "2048");
        let back: MaskResolution = serde_json::from_str("512").unwrap();
        assert_eq!(back, MaskResolution::R512);
        assert!(serde_json::from_str::<MaskResolution>("500").is_err());
    }
}
