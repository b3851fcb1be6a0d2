//! Task handlers plugged into the job queues.
//!
//! One handler type per queue: documents are rendered, resources
//! downloaded, external links probed, provenance collected. Each
//! implements [`JobHandler`](crate::queue::JobHandler) for its task type.

mod document;
mod download;
mod git_info;
mod validate;

pub use document::DocumentWorker;
pub use download::DownloadWorker;
pub use git_info::GitInfoWorker;
pub use validate::ValidationWorker;
