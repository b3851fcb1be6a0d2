#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod handler;
mod http;
mod writer;

pub use handler::MemoryHandler;
pub use http::{ScriptedResponse, TestServer};
pub use writer::MemoryWriter;
