//! Per-document content processing.
//!
//! Drives the Markdown pass for one document: read every source, merge
//! frontmatter (later sources override earlier, manifest frontmatter
//! overrides both in Hugo mode), resolve every link destination, and
//! assemble the output buffer. A missing source degrades to a partial
//! render with a warning; it never fails the document.

use std::sync::Arc;

use bytes::Bytes;
use docloom_core::handler::HandlerError;
use docloom_core::io::{Reader, WriterError};
use docloom_core::task::DocumentRef;

use crate::link::{LinkError, LinkResolver, apply_outcomes, scan_links};

/// Tracing target for document processing.
const TRACING_TARGET: &str = "docloom_engine::document";

/// Errors failing a single document.
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("failed to read source: {0}")]
    Source(HandlerError),

    #[error("source '{uri}' is not valid UTF-8")]
    Utf8 { uri: String },

    #[error("invalid frontmatter in '{uri}': {source}")]
    Frontmatter {
        uri: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error(transparent)]
    Link(#[from] LinkError),

    #[error(transparent)]
    Write(#[from] WriterError),
}

/// Renders one document from its sources.
pub struct NodeContentProcessor {
    reader: Arc<dyn Reader>,
    resolver: Arc<LinkResolver>,
    hugo: bool,
}

impl NodeContentProcessor {
    pub fn new(reader: Arc<dyn Reader>, resolver: Arc<LinkResolver>, hugo: bool) -> Self {
        Self {
            reader,
            resolver,
            hugo,
        }
    }

    /// Produces the rendered document content.
    pub async fn process(&self, document: &DocumentRef) -> Result<Bytes, DocumentError> {
        let mut frontmatter = serde_yaml::Mapping::new();
        let mut body = String::new();

        for source in &document.sources {
            let data = match self.reader.read(source).await {
                Ok(data) => data,
                Err(error) if error.is_not_found() => {
                    tracing::warn!(
                        target: TRACING_TARGET,
                        source = %source,
                        document = %document.position(),
                        "source missing, rendering partially"
                    );
                    continue;
                }
                Err(error) => return Err(DocumentError::Source(error)),
            };

            let text = String::from_utf8(data.to_vec()).map_err(|_| DocumentError::Utf8 {
                uri: source.clone(),
            })?;

            let (raw_frontmatter, content) = docloom_core::frontmatter::split(&text);
            if let Some(raw) = raw_frontmatter {
                let value: serde_yaml::Value =
                    serde_yaml::from_str(raw).map_err(|source_error| DocumentError::Frontmatter {
                        uri: source.clone(),
                        source: source_error,
                    })?;
                merge_frontmatter(&mut frontmatter, &value);
            }

            let occurrences = scan_links(content);
            let mut outcomes = Vec::with_capacity(occurrences.len());
            for occurrence in &occurrences {
                outcomes.push(
                    self.resolver
                        .resolve_link(
                            document,
                            source,
                            &occurrence.destination,
                            occurrence.is_embeddable,
                        )
                        .await?,
                );
            }

            if !body.is_empty() && !body.ends_with('\n') {
                body.push('\n');
            }
            body.push_str(&apply_outcomes(content, &occurrences, &outcomes));
        }

        if self.hugo {
            if let Some(manifest_frontmatter) = &document.frontmatter {
                merge_frontmatter(&mut frontmatter, manifest_frontmatter);
            }
            let title_key = serde_yaml::Value::from("title");
            if !frontmatter.contains_key(&title_key) {
                frontmatter.insert(title_key, serde_yaml::Value::from(derive_title(document)));
            }
        }

        let mut output = String::new();
        if !frontmatter.is_empty() {
            let serialized = serde_yaml::to_string(&frontmatter).map_err(|source_error| {
                DocumentError::Frontmatter {
                    uri: document.position(),
                    source: source_error,
                }
            })?;
            output.push_str("---\n");
            output.push_str(&serialized);
            output.push_str("---\n");
            if !body.is_empty() {
                output.push('\n');
            }
        }
        output.push_str(&body);

        Ok(Bytes::from(output))
    }
}

/// Deep-merges `overlay` into `base`; overlay entries win.
pub(crate) fn merge_frontmatter(base: &mut serde_yaml::Mapping, overlay: &serde_yaml::Value) {
    let serde_yaml::Value::Mapping(overlay) = overlay else {
        return;
    };
    for (key, value) in overlay {
        match (base.get_mut(key), value) {
            (Some(serde_yaml::Value::Mapping(existing)), serde_yaml::Value::Mapping(_)) => {
                merge_frontmatter(existing, value);
            }
            _ => {
                base.insert(key.clone(), value.clone());
            }
        }
    }
}

/// Derives a human-readable title from the document's file name.
fn derive_title(document: &DocumentRef) -> String {
    let stem = if document.name == "_index.md" {
        document
            .path
            .rsplit('/')
            .next()
            .filter(|segment| !segment.is_empty())
            .unwrap_or("Home")
    } else {
        document.name.strip_suffix(".md").unwrap_or(&document.name)
    };

    let spaced = stem.replace(['-', '_'], " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => spaced,
    }
}
