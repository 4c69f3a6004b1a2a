//! Rendering collaborator adapters

pub mod tracing_renderer;

pub use tracing_renderer::TracingRenderer;
