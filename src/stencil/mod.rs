pub mod brush;
pub mod cancel;
pub mod error;
pub mod export;
pub mod history;
pub mod layer;
pub mod mask;
pub mod outline;
pub mod rect;
pub mod resample;
pub mod smooth;
pub mod snapshot;
pub mod stack;
pub mod texture;

pub use brush::{apply_stroke, apply_strokes, BrushKernel, BrushRadius, BrushStroke, StrokeReport};
pub use cancel::CancelToken;
pub use error::{BatchImportError, ImportStage, StencilError};
pub use export::{export_layer_png, export_layer_tiles_png, export_tiles, MaskTile};
pub use layer::{LayerId, StencilLayer};
pub use mask::{pack_to_bytes, unpack_from_bytes, Mask, MaskResolution, PackedChannels, MASK_MAX};
pub use outline::{trace_outline, OutlineMask, OutlineTrace};
pub use rect::{NormalizedRect, PixelRect};
pub use resample::resize;
pub use smooth::{smooth, SmoothingPolicy};
pub use stack::{LayerImport, Stencil};
pub use texture::{import_image_bytes, import_rgba, mask_to_rgba, Rgba, RgbaBuffer, SourceChannel};
