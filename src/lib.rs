pub mod logging;
pub mod settings;
pub mod stencil;

pub use settings::StencilSettings;
pub use stencil::{Mask, MaskResolution, Stencil, StencilError};
