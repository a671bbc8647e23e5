use crate::identifier::ComponentIdentifier;
use crate::sandbox::sanitize_segment;
use crate::style::ConflictPolicy;
use directories::ProjectDirs;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub mod rc;
pub use self::rc::*;

pub const DEFAULT_REGISTRY: &str = "https://21st.dev";
pub const DEFAULT_MAX_DEPTH: usize = 10;
pub const DEFAULT_CONCURRENCY: usize = 16;

#[derive(Debug, Clone)]
pub struct RegraphConfig {
    pub data_dir: PathBuf,
    pub registry_url: String,
    pub api_key: Option<String>,
    pub max_depth: usize,
    pub concurrency: usize,
    pub timeout: Option<Duration>,
    pub style_conflict: ConflictPolicy,
    pub base_tailwind_path: Option<PathBuf>,
    pub base_css_path: Option<PathBuf>,
    pub verbose: bool,
    pub log_file: Option<PathBuf>,
}

impl Default for RegraphConfig {
    fn default() -> Self {
        RegraphConfig {
            data_dir: PathBuf::from(".regraph").join("data"),
            registry_url: DEFAULT_REGISTRY.to_string(),
            api_key: None,
            max_depth: DEFAULT_MAX_DEPTH,
            concurrency: DEFAULT_CONCURRENCY,
            timeout: None,
            style_conflict: ConflictPolicy::FirstWins,
            base_tailwind_path: None,
            base_css_path: None,
            verbose: false,
            log_file: None,
        }
    }
}

impl RegraphConfig {
    pub fn from_env() -> Self {
        let mut config = RegraphConfig::default();

        config.data_dir = if let Ok(home) = env::var("REGRAPH_HOME") {
            PathBuf::from(home).join("data")
        } else {
            match ProjectDirs::from("dev", "regraph", "regraph") {
                Some(dirs) => dirs.data_local_dir().to_path_buf(),
                None => config.data_dir.clone(),
            }
        };

        config.apply_rc(read_rc_settings());
        config.apply_env();
        config
    }

    pub fn apply_rc(&mut self, settings: RcSettings) {
        if let Some(registry) = settings.registry {
            self.registry_url = registry;
        }
        if settings.api_key.is_some() {
            self.api_key = settings.api_key;
        }
        if let Some(depth) = settings.max_depth {
            self.max_depth = depth;
        }
        if let Some(concurrency) = settings.concurrency {
            self.concurrency = concurrency;
        }
        if let Some(secs) = settings.timeout_secs {
            self.timeout = Some(Duration::from_secs(secs));
        }
        if let Some(policy) = settings.style_conflict {
            self.style_conflict = policy;
        }
        if settings.base_tailwind.is_some() {
            self.base_tailwind_path = settings.base_tailwind;
        }
        if settings.base_css.is_some() {
            self.base_css_path = settings.base_css;
        }
    }

    fn apply_env(&mut self) {
        if let Some(value) = non_empty_env("REGRAPH_REGISTRY") {
            self.registry_url = normalize_registry_url(&value);
        }

        if let Some(value) = non_empty_env("REGRAPH_API_KEY") {
            self.api_key = Some(value);
        }

        if let Some(value) = non_empty_env("REGRAPH_MAX_DEPTH")
            && let Ok(parsed) = value.parse::<usize>()
        {
            self.max_depth = parsed;
        }

        if let Some(value) = non_empty_env("REGRAPH_CONCURRENCY")
            && let Ok(parsed) = value.parse::<usize>()
            && parsed > 0
        {
            self.concurrency = parsed;
        }

        if let Some(value) = non_empty_env("REGRAPH_TIMEOUT_SECS")
            && let Ok(parsed) = value.parse::<u64>()
            && parsed > 0
        {
            self.timeout = Some(Duration::from_secs(parsed));
        }

        if let Some(value) = non_empty_env("REGRAPH_STYLE_CONFLICT")
            && let Some(policy) = ConflictPolicy::parse(&value)
        {
            self.style_conflict = policy;
        }

        if let Some(value) = non_empty_env("REGRAPH_BASE_TAILWIND") {
            self.base_tailwind_path = Some(PathBuf::from(value));
        }

        if let Some(value) = non_empty_env("REGRAPH_BASE_CSS") {
            self.base_css_path = Some(PathBuf::from(value));
        }

        if let Some(value) = non_empty_env("REGRAPH_VERBOSE") {
            self.verbose = parse_flag(&value);
        }

        self.log_file = non_empty_env("REGRAPH_LOG_FILE").map(PathBuf::from);
    }

    pub fn previews_dir(&self) -> PathBuf {
        self.data_dir.join("previews")
    }

    /// Where a saved sandbox for `identifier` is written.
    pub fn preview_dir(&self, identifier: &ComponentIdentifier) -> PathBuf {
        self.previews_dir()
            .join(sanitize_segment(identifier.author()))
            .join(sanitize_segment(identifier.slug()))
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "y" | "on"
    )
}
