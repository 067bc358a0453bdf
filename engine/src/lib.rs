pub mod config;
pub mod data_uri;
pub mod eval;
pub mod image_model;
pub mod inference;
pub mod orchestrator;
pub mod queue;

pub use config::Config;
pub use image_model::Model;

/// The instruction sent along with every whiteboard photo.
pub const SYSTEM_PROMPT: &str = indoc::indoc! {"
    Transform this whiteboard photograph into a clean, professional diagram.

    Create a NEW image with:
    - Clean, solid MATTE WHITE background (not the original whiteboard)
    - Clear, legible text preserving the original wording exactly
    - Professional lines, arrows, and shapes with a hand-drawn sketch aesthetic
    - Subtle colors to distinguish elements and improve clarity

    Preserve the layout and spatial relationships. Use standard icons where appropriate (cylinders for databases, rectangles for systems). Fix incomplete elements. Omit board edges, reflections, erasers, and other incidental items from the photo.

    The result should look like a polished whiteboard diagram ready for a professional presentation."};
