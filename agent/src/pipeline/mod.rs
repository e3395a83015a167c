pub mod deepscan;
pub mod detection;
pub mod jobs;
pub mod liveness;

pub use jobs::{run_batch, PipelineConfig};
