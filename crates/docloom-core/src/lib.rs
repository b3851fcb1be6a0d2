#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

pub mod error;
pub mod frontmatter;
pub mod handler;
pub mod io;
pub mod manifest;
pub mod node;
pub mod task;
pub mod urls;

pub use error::{BoxedError, CoreError, Result};
pub use handler::{HandlerError, HandlerRegistry, HandlerResult, ResourceHandler};
pub use io::{Reader, RegistryReader, Writer, WriterError};
pub use manifest::{DownloadRules, LinkRules, Manifest, RewriteRule};
pub use node::{FrontmatterFilter, Node, NodeSelector};
pub use task::{DocumentRef, DocumentTask, DownloadTask, GitInfoTask, ValidationTask};
