#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod handler;
mod writer;

pub use handler::FsHandler;
pub use writer::FsWriter;
