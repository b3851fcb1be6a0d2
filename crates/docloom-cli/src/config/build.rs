//! Output and build-policy configuration.

use std::path::PathBuf;

use clap::Args;

/// Where outputs land and how strictly the build reacts to errors.
#[derive(Debug, Clone, Args)]
pub struct BuildConfig {
    /// Output root directory for the rendered corpus.
    #[arg(long, env = "DOCLOOM_OUTPUT", default_value = "./out")]
    pub output: PathBuf,

    /// Directory name (or site-absolute path) for downloaded resources.
    #[arg(long, env = "DOCLOOM_RESOURCES_ROOT", default_value = "__resources")]
    pub resources_root: String,

    /// Stop the build on the first document error.
    #[arg(long, env = "DOCLOOM_FAIL_FAST")]
    pub fail_fast: bool,

    /// Collect per-document provenance records.
    #[arg(long, env = "DOCLOOM_GIT_INFO")]
    pub git_info: bool,

    /// Directory for provenance records; defaults to `<output>/git-info`.
    #[arg(long, env = "DOCLOOM_GIT_INFO_DIR")]
    pub git_info_dir: Option<PathBuf>,
}

impl BuildConfig {
    /// Effective provenance output directory.
    pub fn git_info_dir(&self) -> PathBuf {
        self.git_info_dir
            .clone()
            .unwrap_or_else(|| self.output.join("git-info"))
    }
}
