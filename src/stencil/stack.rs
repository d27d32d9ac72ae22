use crate::settings::StencilSettings;
use crate::stencil::brush::{BrushStroke, StrokeReport};
use crate::stencil::cancel::CancelToken;
use crate::stencil::error::{BatchImportError, ImportStage, StencilError};
use crate::stencil::export::{ensure_output_folder, export_layer_png, export_layer_tiles_png};
use crate::stencil::layer::{LayerId, StencilLayer};
use crate::stencil::mask::{Mask, MaskResolution};
use crate::stencil::outline::OutlineTrace;
use crate::stencil::resample::resize;
use crate::stencil::texture::{
    composite_over_blank, coverage_overlay, decode_image, import_rgba_staged, RgbaBuffer,
    SourceChannel,
};
use chrono::Local;
use std::path::PathBuf;

/// One entry of a batched image import.
#[derive(Debug, Clone)]
pub struct LayerImport {
    pub name: String,
    pub bytes: Vec<u8>,
    pub channel: SourceChannel,
}

/// Ordered set of stencil layers with at most one active (editable) layer.
#[derive(Debug, Clone, Default)]
pub struct Stencil {
    settings: StencilSettings,
    layers: Vec<StencilLayer>,
    active: Option<LayerId>,
}

impl Stencil {
    pub fn new(settings: StencilSettings) -> Self {
        Self {
            settings,
            layers: Vec::new(),
            active: None,
        }
    }

    pub fn settings(&self) -> &StencilSettings {
        &self.settings
    }

    pub fn layers(&self) -> &[StencilLayer] {
        &self.layers
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Add an empty layer at the default resolution. The first layer added
    /// becomes active.
    pub fn add_layer(&mut self, name: impl Into<String>) -> LayerId {
        let layer = StencilLayer::empty(name, &self.settings);
        self.push(layer)
    }

    pub fn add_layer_from_mask(&mut self, name: impl Into<String>, mask: Mask) -> LayerId {
        let layer = StencilLayer::new(name, mask, &self.settings);
        self.push(layer)
    }

    fn push(&mut self, layer: StencilLayer) -> LayerId {
        let id = layer.id();
        tracing::debug!(layer = %id, name = %layer.name, resolution = %layer.resolution(), "stencil layer added");
        self.layers.push(layer);
        if self.active.is_none() {
            self.active = Some(id);
        }
        id
    }

    /// Remove a layer, handing it back so the caller decides when it drops.
    pub fn remove_layer(&mut self, id: LayerId) -> Result<StencilLayer, StencilError> {
        let index = self.index_of(id)?;
        if self.active == Some(id) {
            self.active = None;
        }
        Ok(self.layers.remove(index))
    }

    fn index_of(&self, id: LayerId) -> Result<usize, StencilError> {
        self.layers
            .iter()
            .position(|layer| layer.id() == id)
            .ok_or(StencilError::UnknownLayer(id))
    }

    pub fn layer(&self, id: LayerId) -> Result<&StencilLayer, StencilError> {
        Ok(&self.layers[self.index_of(id)?])
    }

    pub fn layer_mut(&mut self, id: LayerId) -> Result<&mut StencilLayer, StencilError> {
        let index = self.index_of(id)?;
        Ok(&mut self.layers[index])
    }

    pub fn active_layer_id(&self) -> Option<LayerId> {
        self.active
    }

    pub fn set_active_layer(&mut self, id: Option<LayerId>) -> Result<(), StencilError> {
        if let Some(id) = id {
            self.index_of(id)?;
        }
        self.active = id;
        Ok(())
    }

    pub fn active_layer_mut(&mut self) -> Result<&mut StencilLayer, StencilError> {
        let id = self
            .active
            .ok_or_else(|| StencilError::invalid("no active stencil layer"))?;
        self.layer_mut(id)
    }

    /// Paint one stroke on the active layer.
    pub fn paint(&mut self, stroke: &BrushStroke) -> Result<StrokeReport, StencilError> {
        self.active_layer_mut()?.paint(stroke)
    }

    /// Paint strokes on the active layer in the order received, as one edit.
    pub fn paint_batch(&mut self, strokes: &[BrushStroke]) -> Result<StrokeReport, StencilError> {
        self.active_layer_mut()?.paint_batch(strokes)
    }

    pub fn smooth_layer(
        &mut self,
        id: LayerId,
        kernel_radius: i32,
        strength: f32,
        cancel: &CancelToken,
    ) -> Result<(), StencilError> {
        self.layer_mut(id)?.smooth(kernel_radius, strength, cancel)
    }

    /// Smooth with the configured two-pass policy.
    pub fn smooth_layer_default(
        &mut self,
        id: LayerId,
        strength: f32,
        cancel: &CancelToken,
    ) -> Result<(), StencilError> {
        let policy = self.settings.smoothing;
        self.layer_mut(id)?.smooth_with_policy(&policy, strength, cancel)
    }

    pub fn resize_layer(
        &mut self,
        id: LayerId,
        new_side: usize,
        cancel: &CancelToken,
    ) -> Result<(), StencilError> {
        self.layer_mut(id)?.resize(new_side, cancel)
    }

    /// Outline at the configured threshold.
    pub fn trace_layer_outline(&self, id: LayerId) -> Result<OutlineTrace, StencilError> {
        self.layer(id)?.trace_outline(self.settings.outline_threshold)
    }

    /// Release the grid of every hidden layer other than the active one.
    /// Returns how many layers were released.
    pub fn free_unused_resources(&mut self) -> Result<usize, StencilError> {
        let mut released = 0;
        for layer in &mut self.layers {
            if layer.visible || Some(layer.id()) == self.active || !layer.is_loaded() {
                continue;
            }
            layer.release()?;
            released += 1;
        }
        if released > 0 {
            tracing::debug!(released, "freed unused stencil layer grids");
        }
        Ok(released)
    }

    pub fn memory_bytes(&self) -> usize {
        self.layers.iter().map(StencilLayer::memory_bytes).sum()
    }

    /// Decode and add each entry in order. Stops at the first failure; layers
    /// added before it stay, the failing entry and the rest are skipped.
    pub fn import_layers(
        &mut self,
        entries: &[LayerImport],
    ) -> Result<Vec<LayerId>, BatchImportError> {
        let mut ids = Vec::with_capacity(entries.len());
        for (index, entry) in entries.iter().enumerate() {
            let fail = |stage: ImportStage, source: StencilError| {
                tracing::error!(index, name = %entry.name, %stage, error = %source, "stencil import failed");
                BatchImportError {
                    index,
                    name: entry.name.clone(),
                    stage,
                    source,
                }
            };
            let image = decode_image(&entry.bytes).map_err(|e| fail(ImportStage::Decode, e))?;
            let mask = import_rgba_staged(&image, entry.channel)
                .map_err(|(stage, e)| fail(stage, e))?;
            ids.push(self.add_layer_from_mask(entry.name.clone(), mask));
        }
        Ok(ids)
    }

    /// Folder exports go to: the configured one, or next to the executable.
    /// Created when missing.
    pub fn export_folder(&self) -> anyhow::Result<PathBuf> {
        ensure_output_folder(self.settings.export_folder_path().as_deref())
    }

    /// Write a layer's packed texture into the export folder.
    pub fn export_layer(&self, id: LayerId, now: chrono::DateTime<Local>) -> anyhow::Result<PathBuf> {
        let layer = self.layer(id)?;
        export_layer_png(layer, &self.export_folder()?, now)
    }

    /// Write one packed texture per terrain tile into the export folder.
    pub fn export_layer_tiles(
        &self,
        id: LayerId,
        tiles_per_side: usize,
        tile_resolution: MaskResolution,
        now: chrono::DateTime<Local>,
    ) -> anyhow::Result<Vec<PathBuf>> {
        let layer = self.layer(id)?;
        export_layer_tiles_png(layer, &self.export_folder()?, tiles_per_side, tile_resolution, now)
    }

    /// Blend every visible layer's colour, weighted by coverage, over the
    /// configured background at `resolution`.
    pub fn composite_preview(&self, resolution: MaskResolution) -> Result<RgbaBuffer, StencilError> {
        let mut overlays = Vec::new();
        for layer in self.layers.iter().filter(|layer| layer.visible) {
            let view = layer.view()?;
            let mask = if view.resolution() == resolution {
                view.into_owned()
            } else {
                resize(&view, resolution.side())?
            };
            overlays.push(coverage_overlay(&mask, layer.colour));
        }
        let side = resolution.side() as u32;
        composite_over_blank(&overlays, side, side, self.settings.preview_background)
    }
}
