//! Hugo output configuration.

use clap::Args;
use docloom_engine::HugoConfig;

/// Hugo mode switches.
#[derive(Debug, Clone, Args)]
pub struct HugoOptions {
    /// Render links for a Hugo site instead of plain relative paths.
    #[arg(long, env = "DOCLOOM_HUGO")]
    pub hugo: bool,

    /// Use `.html` file URLs instead of directory-style URLs.
    #[arg(long, env = "DOCLOOM_HUGO_UGLY_URLS")]
    pub hugo_ugly_urls: bool,

    /// Site base URL prepended to resource paths.
    #[arg(long, env = "DOCLOOM_HUGO_BASE_URL", default_value = "")]
    pub hugo_base_url: String,

    /// File stems promoted to `_index.md` in containers without one.
    #[arg(
        long,
        env = "DOCLOOM_HUGO_INDEX_NAMES",
        value_delimiter = ',',
        default_value = "readme,read.me,index"
    )]
    pub hugo_index_names: Vec<String>,
}

impl HugoOptions {
    /// The engine's Hugo configuration, when Hugo mode is on.
    pub fn to_config(&self) -> Option<HugoConfig> {
        self.hugo.then(|| HugoConfig {
            pretty_urls: !self.hugo_ugly_urls,
            base_url: self.hugo_base_url.clone(),
            index_file_names: self.hugo_index_names.clone(),
        })
    }
}
