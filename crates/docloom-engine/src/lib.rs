#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

pub mod document;
pub mod hugo;
pub mod link;
pub mod orchestrator;
pub mod queue;
pub mod resolve;
pub mod scheduler;
pub mod worker;

pub use document::{DocumentError, NodeContentProcessor};
pub use hugo::HugoConfig;
pub use link::{LinkError, LinkOutcome, LinkResolver, SourceIndex};
pub use orchestrator::{BuildError, BuildOptions, BuildOrchestrator, BuildSummary, WorkerCounts};
pub use queue::{JobHandler, JobQueue, QueueError, WaitGroup};
pub use resolve::{ManifestResolver, ResolveError, ResolvedManifest};
pub use scheduler::{DownloadScheduler, GitInfo, Validator};
