//! Task types moved through the build queues.
//!
//! A task is an immutable value from the moment it enters a queue. Document
//! and provenance tasks carry a [`DocumentRef`] — a frozen snapshot of a
//! resolved document node, detached from the tree so that workers never
//! touch shared structure.

/// Frozen snapshot of a resolved document node.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentRef {
    /// `/`-separated container path; empty for root-level documents.
    pub path: String,

    /// File name of the produced document, e.g. `overview.md`.
    pub name: String,

    /// Sources in reading order: primary, then multi-source.
    pub sources: Vec<String>,

    /// Manifest-authored frontmatter, parent-folded when Hugo mode is on.
    pub frontmatter: Option<serde_yaml::Value>,
}

impl DocumentRef {
    /// Position of the document inside the tree, e.g. `guides/setup.md`.
    pub fn position(&self) -> String {
        if self.path.is_empty() {
            self.name.clone()
        } else {
            format!("{}/{}", self.path, self.name)
        }
    }

    /// The primary source, when the document has one.
    pub fn primary_source(&self) -> Option<&str> {
        self.sources.first().map(String::as_str)
    }
}

/// Render one document: read its sources, rewrite links, write the output.
#[derive(Debug, Clone)]
pub struct DocumentTask {
    pub document: DocumentRef,
}

/// Fetch one embedded resource and write it under a stable name.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadTask {
    /// Absolute source URL of the resource.
    pub source: String,
    /// Stable output file name, e.g. `diagram_3fa9c1.png`.
    pub target: String,
    /// Source of the document that referenced the resource.
    pub referer: String,
    /// The original link destination as authored.
    pub reference: String,
}

/// Reachability-check one external link.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationTask {
    /// Absolute URL to probe.
    pub url: String,
    /// Destination as it appears in the rendered output.
    pub destination: String,
    /// Position of the document containing the link.
    pub source_path: String,
}

/// Collect provenance metadata for one document's sources.
#[derive(Debug, Clone)]
pub struct GitInfoTask {
    pub document: DocumentRef,
}
