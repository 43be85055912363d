mod viewer_extractor;
mod tracing_layer;
mod metrics_layer;

pub use viewer_extractor::*;
pub use tracing_layer::*;
pub use metrics_layer::*;
