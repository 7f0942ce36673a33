//! Pipeline orchestration and document state

pub mod orchestrator;
pub mod registry;
pub mod retry;

pub use orchestrator::Pipeline;
pub use registry::{DocumentLock, DocumentRecord, DocumentRegistry};
pub use retry::RetryPolicy;
