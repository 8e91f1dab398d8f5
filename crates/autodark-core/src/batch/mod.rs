mod completion;
mod dispatcher;
mod partition;
mod types;

pub use completion::CompletionLatch;
pub use dispatcher::{worker_count, BatchDispatcher, BatchHandle, StopHandle};
pub use partition::partition;
pub use types::{BatchSummary, FileReport};
