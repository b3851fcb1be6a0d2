//! Link classification and rewriting.
//!
//! [`LinkResolver::resolve_link`] is the single entry point invoked for
//! every destination found in a document: it computes the absolute form,
//! applies manifest rewrite rules, matches the manifest's node set,
//! decides download scope and schedules validation, returning a
//! [`LinkOutcome`] the Markdown rewriter splices back into the buffer.

mod naming;
mod position;
mod rewrite;
mod rules;

use docloom_core::handler::{HandlerError, HandlerRegistry};
use docloom_core::task::{DocumentRef, DownloadTask};
use docloom_core::urls;

pub use naming::{evaluate_name_expression, resource_name};
pub use position::{LinkTarget, SourceIndex, relative_path};
pub use rewrite::{LinkOccurrence, apply_outcomes, scan_links};
pub use rules::CompiledLinkRules;

use crate::hugo::HugoConfig;
use crate::scheduler::{DownloadScheduler, Validator};

/// Tracing target for link resolution.
const TRACING_TARGET: &str = "docloom_engine::link";

/// Errors surfaced while resolving a link.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// The containing document's source has no handler, so relative links
    /// cannot be absolutized.
    #[error("no resource handler accepts '{0}'")]
    NoHandler(String),

    /// The handler failed to build the absolute form.
    #[error(transparent)]
    Handler(#[from] HandlerError),

    /// A download-scope or rename pattern in the manifest is malformed.
    #[error("invalid link pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// What should happen to one link destination.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkOutcome {
    /// Leave the destination untouched.
    Keep,
    /// Replace the destination.
    Rewrite(String),
    /// Erase the link from the output (text survives, images vanish).
    Delete,
}

/// Per-build link resolver shared by all document workers.
///
/// `index` is frozen before any worker starts; the schedulers own their
/// queues' synchronization, so resolution itself takes no locks.
pub struct LinkResolver {
    registry: HandlerRegistry,
    index: SourceIndex,
    rules: CompiledLinkRules,
    downloads: DownloadScheduler,
    validator: Validator,
    hugo: Option<HugoConfig>,
    resources_root: String,
}

impl LinkResolver {
    pub fn new(
        registry: HandlerRegistry,
        index: SourceIndex,
        rules: CompiledLinkRules,
        downloads: DownloadScheduler,
        validator: Validator,
        hugo: Option<HugoConfig>,
        resources_root: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            index,
            rules,
            downloads,
            validator,
            hugo,
            resources_root: resources_root.into(),
        }
    }

    /// Resolves one link destination of `document`.
    ///
    /// `containing_source` is the source URI of the content being
    /// processed; relative destinations are absolutized against it.
    pub async fn resolve_link(
        &self,
        document: &DocumentRef,
        containing_source: &str,
        destination: &str,
        is_embeddable: bool,
    ) -> Result<LinkOutcome, LinkError> {
        if destination.starts_with('#') || destination.starts_with("mailto:") {
            return Ok(LinkOutcome::Keep);
        }

        let (base, suffix) = urls::split_suffix(destination);
        let doc_position = document.position();

        // Absolute form. Links into territory no handler claims are
        // external by definition: validate and pass through.
        let absolute = if urls::is_absolute(base) {
            if self.registry.get(base).is_none() {
                self.validator
                    .validate_link(base, destination, &doc_position)
                    .await;
                return Ok(LinkOutcome::Keep);
            }
            base.to_string()
        } else {
            let handler = self
                .registry
                .get(containing_source)
                .ok_or_else(|| LinkError::NoHandler(containing_source.to_string()))?;
            handler.build_abs_link(containing_source, base)?
        };

        // Manifest rewrite rules win over everything else.
        if let Some(rule) = self.rules.rewrite_for(&absolute) {
            if rule.is_delete() {
                tracing::debug!(
                    target: TRACING_TARGET,
                    link = %absolute,
                    document = %doc_position,
                    "link deleted by manifest rule"
                );
                return Ok(LinkOutcome::Delete);
            }
            if let Some(rewritten) = &rule.destination {
                return Ok(LinkOutcome::Rewrite(rewritten.clone()));
            }
        }

        // Intra-tree match: the destination is itself a built document.
        let canonical = urls::canonical(&absolute);
        if let Some((target, relative)) = self.index.choose(&canonical, &doc_position) {
            let rewritten = match &self.hugo {
                Some(hugo) => hugo.site_path(&target.position, target.url_override.as_deref()),
                None => relative,
            };
            return Ok(LinkOutcome::Rewrite(format!("{rewritten}{suffix}")));
        }

        // Download scope: embedded resources that are authored relative,
        // or that live in a configured in-scope location, are fetched and
        // re-hosted next to the corpus.
        if is_embeddable && (!urls::is_absolute(base) || self.rules.in_download_scope(&absolute)) {
            let target_name = self.resource_target_name(&absolute, &canonical);
            let rewritten = self.resource_destination(&doc_position, &target_name);
            self.downloads
                .schedule(DownloadTask {
                    source: absolute,
                    target: target_name,
                    referer: containing_source.to_string(),
                    reference: destination.to_string(),
                })
                .await;
            return Ok(LinkOutcome::Rewrite(rewritten));
        }

        // External fall-through.
        self.validator
            .validate_link(&absolute, &absolute, &doc_position)
            .await;

        if is_embeddable
            && let Some(handler) = self.registry.get(&absolute)
            && let Some(raw) = handler.raw_format_link(&absolute)
        {
            return Ok(LinkOutcome::Rewrite(format!("{raw}{suffix}")));
        }

        if absolute == base {
            Ok(LinkOutcome::Keep)
        } else {
            Ok(LinkOutcome::Rewrite(format!("{absolute}{suffix}")))
        }
    }

    /// Stable output name for a downloaded resource.
    fn resource_target_name(&self, absolute: &str, canonical: &str) -> String {
        let (stem, ext) = match self.registry.get(absolute) {
            Some(handler) => handler.resource_name(absolute),
            None => urls::stem_and_extension(absolute),
        };
        match self.rules.rename_for(absolute) {
            Some(expression) => evaluate_name_expression(expression, &stem, &ext),
            None => resource_name(&stem, &ext, canonical),
        }
    }

    /// Destination of a downloaded resource as seen from a document.
    fn resource_destination(&self, doc_position: &str, name: &str) -> String {
        let root = &self.resources_root;
        let path = if root.starts_with('/') {
            format!("{root}/{name}")
        } else {
            let ups = doc_position.matches('/').count();
            format!("{}{root}/{name}", "../".repeat(ups))
        };
        match &self.hugo {
            Some(hugo) => hugo.resource_path(&path),
            None => path,
        }
    }
}
