//! In-memory writer.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use docloom_core::io::{Writer, WriterError};

/// A [`Writer`] collecting outputs into a map keyed by `path/name`.
#[derive(Debug, Default)]
pub struct MemoryWriter {
    files: Mutex<BTreeMap<String, Bytes>>,
}

impl MemoryWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Content written under `path/name`, if any.
    pub fn get(&self, key: &str) -> Option<Bytes> {
        self.files.lock().unwrap().get(key).cloned()
    }

    /// Content written under `path/name`, decoded as UTF-8.
    pub fn get_text(&self, key: &str) -> Option<String> {
        self.get(key)
            .map(|data| String::from_utf8(data.to_vec()).expect("output is not UTF-8"))
    }

    /// All written keys, in sorted order.
    pub fn keys(&self) -> Vec<String> {
        self.files.lock().unwrap().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.files.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.lock().unwrap().is_empty()
    }
}

#[async_trait]
impl Writer for MemoryWriter {
    async fn write(&self, name: &str, path: &str, data: Bytes) -> Result<(), WriterError> {
        let path = path.trim_matches('/');
        let key = if path.is_empty() {
            name.to_string()
        } else {
            format!("{path}/{name}")
        };
        self.files.lock().unwrap().insert(key, data);
        Ok(())
    }
}
