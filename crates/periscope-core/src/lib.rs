pub mod config;
pub mod error;
pub mod job;
pub mod models;
pub mod protocol;
pub mod router;
pub mod traits;
pub mod worker;

#[cfg(test)]
pub(crate) mod testutil;

pub use config::{PoolConfig, SearchConfig};
pub use error::AppError;
pub use job::{Job, JobResult, WorkerState};
pub use models::{
    Block, Completion, ExtractionResult, Image, MAX_IMAGES, MAX_LIST_ITEMS, MAX_REFERENCES,
    MAX_TEXT_BLOCKS, Reference, SearchOutcome, compute_hash,
};
pub use protocol::{ProtocolState, SearchProtocol};
pub use router::{JobRouter, RoundRobin};
pub use traits::{MarkupParser, SearchSession};
pub use worker::{TracingWorkerReporter, Worker, WorkerEvent, WorkerHandle, WorkerReporter};
