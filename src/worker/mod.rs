//! Background grading workers
//!
//! Intake pushes submission ids onto a [`JobQueue`]; a [`WorkerPool`] drains
//! it and hands each id to the grading service. The [`RecoverySweeper`]
//! repairs submissions whose worker vanished mid-job.

pub mod pool;
pub mod queue;
pub mod recovery;

pub use pool::WorkerPool;
pub use queue::{JobQueue, MemoryJobQueue, RedisJobQueue};
pub use recovery::{RecoverySweeper, SweepReport};
