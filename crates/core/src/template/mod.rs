//! Instruction-template rendering.
//!
//! Pure expansion of typed content fields into the instruction document
//! workers see on the marketplace. No I/O; rendering happens before any
//! remote call so a missing required field never costs a network round
//! trip.

mod renderer;
mod types;

pub use renderer::render;
pub use types::{RenderedTemplate, TemplateError};
