use crate::settings::StencilSettings;
use crate::stencil::brush::{apply_stroke, apply_strokes, BrushStroke, StrokeReport};
use crate::stencil::cancel::CancelToken;
use crate::stencil::error::StencilError;
use crate::stencil::history::MaskHistory;
use crate::stencil::mask::{Mask, MaskResolution};
use crate::stencil::outline::{trace_outline, OutlineTrace};
use crate::stencil::resample::resize_with_cancel;
use crate::stencil::smooth::{smooth_with_cancel, smooth_with_policy, SmoothingPolicy};
use crate::stencil::snapshot::{MaskSnapshot, SnapshotEncoding};
use crate::stencil::texture::Rgba;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use uuid::Uuid;

/// Stable identity of a layer. Hosts key their visuals on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LayerId(Uuid);

impl LayerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for LayerId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for LayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Storage {
    Loaded(Mask),
    Released(MaskSnapshot),
}

impl Storage {
    fn loaded_mut(&mut self) -> Result<&mut Mask, StencilError> {
        match self {
            Storage::Loaded(mask) => Ok(mask),
            Storage::Released(snapshot) => Err(StencilError::Snapshot(format!(
                "{} layer grid is parked and was not reloaded",
                snapshot.resolution()
            ))),
        }
    }
}

pub const DEFAULT_LAYER_COLOUR: Rgba = Rgba::rgba(255, 255, 255, 160);

#[derive(Debug, Clone, PartialEq)]
pub struct StencilLayer {
    id: LayerId,
    pub name: String,
    pub colour: Rgba,
    pub visible: bool,
    storage: Storage,
    /// Higher-resolution grid kept after a downward resize, until the next edit.
    hi_res: Option<Mask>,
    history: MaskHistory,
    park_encoding: SnapshotEncoding,
}

impl StencilLayer {
    pub fn new(name: impl Into<String>, mask: Mask, settings: &StencilSettings) -> Self {
        Self {
            id: LayerId::new(),
            name: name.into(),
            colour: DEFAULT_LAYER_COLOUR,
            visible: true,
            storage: Storage::Loaded(mask),
            hi_res: None,
            history: MaskHistory::with_limit(settings.undo_limit),
            park_encoding: if settings.compress_released_layers {
                SnapshotEncoding::Zlib
            } else {
                SnapshotEncoding::Raw
            },
        }
    }

    pub fn empty(name: impl Into<String>, settings: &StencilSettings) -> Self {
        Self::new(name, Mask::new(settings.default_resolution), settings)
    }

    pub fn id(&self) -> LayerId {
        self.id
    }

    pub fn resolution(&self) -> MaskResolution {
        match &self.storage {
            Storage::Loaded(mask) => mask.resolution(),
            Storage::Released(snapshot) => snapshot.resolution(),
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self.storage, Storage::Loaded(_))
    }

    /// The raw grid when loaded.
    pub fn mask(&self) -> Option<&Mask> {
        match &self.storage {
            Storage::Loaded(mask) => Some(mask),
            Storage::Released(_) => None,
        }
    }

    /// Borrow the grid, decoding a temporary copy when the layer is released.
    pub fn view(&self) -> Result<Cow<'_, Mask>, StencilError> {
        match &self.storage {
            Storage::Loaded(mask) => Ok(Cow::Borrowed(mask)),
            Storage::Released(snapshot) => snapshot.restore().map(Cow::Owned),
        }
    }

    pub fn history(&self) -> &MaskHistory {
        &self.history
    }

    /// Bytes held by the grid, any retained hi-res copy, parked snapshot and history.
    pub fn memory_bytes(&self) -> usize {
        let storage = match &self.storage {
            Storage::Loaded(mask) => mask.byte_size(),
            Storage::Released(snapshot) => snapshot.byte_size(),
        };
        storage + self.hi_res.as_ref().map_or(0, Mask::byte_size) + self.history.byte_size()
    }

    pub fn ensure_loaded(&mut self) -> Result<&mut Mask, StencilError> {
        if let Storage::Released(snapshot) = &self.storage {
            let mask = snapshot.restore()?;
            tracing::debug!(layer = %self.id, resolution = %mask.resolution(), "stencil layer reloaded");
            self.storage = Storage::Loaded(mask);
        }
        self.storage.loaded_mut()
    }

    /// Free the raw grid, keeping an encoded snapshot to reload from.
    pub fn release(&mut self) -> Result<(), StencilError> {
        let Storage::Loaded(mask) = &self.storage else {
            return Ok(());
        };
        let snapshot = MaskSnapshot::capture(mask, self.park_encoding)?;
        let freed = mask.byte_size() + self.hi_res.as_ref().map_or(0, Mask::byte_size);
        tracing::debug!(layer = %self.id, freed, parked = snapshot.byte_size(), "stencil layer released");
        if let Storage::Loaded(mask) = std::mem::replace(&mut self.storage, Storage::Released(snapshot)) {
            mask.release();
        }
        self.hi_res = None;
        Ok(())
    }

    /// Record the current grid for undo. Call once per user edit (pointer down).
    pub fn begin_edit(&mut self) -> Result<(), StencilError> {
        let encoding = SnapshotEncoding::Zlib;
        let before = MaskSnapshot::capture(self.ensure_loaded()?, encoding)?;
        self.history.commit(before);
        Ok(())
    }

    /// Apply one stroke against the current grid. No history entry is made.
    pub fn paint(&mut self, stroke: &BrushStroke) -> Result<StrokeReport, StencilError> {
        stroke.validate()?;
        self.hi_res = None;
        apply_stroke(self.ensure_loaded()?, stroke)
    }

    /// Apply strokes in order as one undoable edit.
    pub fn paint_batch(&mut self, strokes: &[BrushStroke]) -> Result<StrokeReport, StencilError> {
        if let Some(first) = strokes.first() {
            first.validate()?;
        } else {
            return Ok(StrokeReport::default());
        }
        self.begin_edit()?;
        self.hi_res = None;
        apply_strokes(self.ensure_loaded()?, strokes)
    }

    fn replace(&mut self, mask: Mask) -> Result<(), StencilError> {
        self.begin_edit()?;
        self.storage = Storage::Loaded(mask);
        Ok(())
    }

    pub fn smooth(
        &mut self,
        kernel_radius: i32,
        strength: f32,
        cancel: &CancelToken,
    ) -> Result<(), StencilError> {
        let smoothed = smooth_with_cancel(self.ensure_loaded()?, kernel_radius, strength, cancel)?;
        self.hi_res = None;
        self.replace(smoothed)
    }

    pub fn smooth_with_policy(
        &mut self,
        policy: &SmoothingPolicy,
        strength: f32,
        cancel: &CancelToken,
    ) -> Result<(), StencilError> {
        let smoothed = smooth_with_policy(self.ensure_loaded()?, policy, strength, cancel)?;
        self.hi_res = None;
        self.replace(smoothed)
    }

    /// Change resolution, resampling from the highest-resolution copy held.
    pub fn resize(&mut self, new_side: usize, cancel: &CancelToken) -> Result<(), StencilError> {
        let target = MaskResolution::try_from_side(new_side)?;
        let current = self.ensure_loaded()?.clone();
        if target == current.resolution() {
            return Ok(());
        }

        let source = match &self.hi_res {
            Some(hi) if hi.resolution() > current.resolution() => hi,
            _ => &current,
        };
        let resized = resize_with_cancel(source, new_side, cancel)?;
        let source_res = source.resolution();

        let hi_res = if source_res > target {
            Some(if source_res == current.resolution() {
                current
            } else {
                self.hi_res.take().unwrap_or(current)
            })
        } else {
            None
        };
        self.replace(resized)?;
        self.hi_res = hi_res;
        Ok(())
    }

    pub fn retains_hi_res(&self) -> bool {
        self.hi_res.is_some()
    }

    pub fn undo(&mut self) -> Result<bool, StencilError> {
        let current = MaskSnapshot::capture(self.ensure_loaded()?, SnapshotEncoding::Zlib)?;
        let Some(previous) = self.history.undo(current) else {
            return Ok(false);
        };
        self.storage = Storage::Loaded(previous.restore()?);
        self.hi_res = None;
        Ok(true)
    }

    pub fn redo(&mut self) -> Result<bool, StencilError> {
        let current = MaskSnapshot::capture(self.ensure_loaded()?, SnapshotEncoding::Zlib)?;
        let Some(next) = self.history.redo(current) else {
            return Ok(false);
        };
        self.storage = Storage::Loaded(next.restore()?);
        self.hi_res = None;
        Ok(true)
    }

    pub fn trace_outline(&self, threshold: u16) -> Result<OutlineTrace, StencilError> {
        let view = self.view()?;
        Ok(trace_outline(&view, threshold))
    }
}
