mod events;
mod orchestrator;

pub use events::{EventSink, PipelineEvent};
pub use orchestrator::PipelineOrchestrator;
