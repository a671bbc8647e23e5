use crate::config::RegraphConfig;
use crate::{RegraphError, Result};
use std::fs;
use std::path::Path;

pub mod css;
pub mod literal;
pub mod tailwind;

pub const DEFAULT_TAILWIND_CONFIG: &str = include_str!("../assets/tailwind.config.js");
pub const DEFAULT_GLOBAL_CSS: &str = include_str!("../assets/globals.css");

/// What happens when two fragments define the same key with different values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConflictPolicy {
    #[default]
    FirstWins,
    LastWins,
    Error,
}

impl ConflictPolicy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "first-wins" | "first" => Some(ConflictPolicy::FirstWins),
            "last-wins" | "last" => Some(ConflictPolicy::LastWins),
            "error" => Some(ConflictPolicy::Error),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictPolicy::FirstWins => "first-wins",
            ConflictPolicy::LastWins => "last-wins",
            ConflictPolicy::Error => "error",
        }
    }
}

/// A duplicate key that was resolved by the active policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictNote {
    pub category: String,
    pub key: String,
    pub origin: String,
    pub policy: ConflictPolicy,
}

/// Styling one component contributes to the shared bundle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyleFragment {
    pub origin: String,
    pub tailwind_config: Option<String>,
    pub global_css: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedStyleBundle {
    pub tailwind_config: String,
    pub global_css: String,
    /// Set when a fragment could not be merged and the base styles were used instead.
    pub fell_back: bool,
    pub notes: Vec<ConflictNote>,
}

#[derive(Debug, Clone)]
pub struct StyleMerger {
    base_tailwind: String,
    base_css: String,
    policy: ConflictPolicy,
}

impl Default for StyleMerger {
    fn default() -> Self {
        StyleMerger::with_defaults(ConflictPolicy::FirstWins)
    }
}

impl StyleMerger {
    pub fn new(base_tailwind: String, base_css: String, policy: ConflictPolicy) -> Self {
        StyleMerger {
            base_tailwind,
            base_css,
            policy,
        }
    }

    pub fn with_defaults(policy: ConflictPolicy) -> Self {
        StyleMerger::new(
            DEFAULT_TAILWIND_CONFIG.to_string(),
            DEFAULT_GLOBAL_CSS.to_string(),
            policy,
        )
    }

    pub fn from_config(config: &RegraphConfig) -> Result<Self> {
        let base_tailwind = match &config.base_tailwind_path {
            Some(path) => read_base(path)?,
            None => DEFAULT_TAILWIND_CONFIG.to_string(),
        };

        let base_css = match &config.base_css_path {
            Some(path) => read_base(path)?,
            None => DEFAULT_GLOBAL_CSS.to_string(),
        };

        Ok(StyleMerger::new(base_tailwind, base_css, config.style_conflict))
    }

    pub fn policy(&self) -> ConflictPolicy {
        self.policy
    }

    pub fn base_tailwind(&self) -> &str {
        &self.base_tailwind
    }

    pub fn base_css(&self) -> &str {
        &self.base_css
    }

    fn base_bundle(&self) -> MergedStyleBundle {
        MergedStyleBundle {
            tailwind_config: self.base_tailwind.clone(),
            global_css: self.base_css.clone(),
            fell_back: false,
            notes: Vec::new(),
        }
    }

    /// Merges fragments in the given order. Never fails: a fragment that cannot
    /// be merged makes the whole bundle fall back to the base styles.
    pub fn merge(&self, fragments: &[StyleFragment]) -> MergedStyleBundle {
        match self.try_merge(fragments) {
            Ok(bundle) => bundle,
            Err(err) => {
                tracing::error!(error = %err, "style merge failed, using base styles");
                MergedStyleBundle {
                    fell_back: true,
                    ..self.base_bundle()
                }
            }
        }
    }

    pub fn try_merge(&self, fragments: &[StyleFragment]) -> Result<MergedStyleBundle> {
        let tailwind_fragments: Vec<(&str, &str)> = fragments
            .iter()
            .filter_map(|f| Some((f.origin.as_str(), f.tailwind_config.as_deref()?)))
            .collect();

        let css_fragments: Vec<(&str, &str)> = fragments
            .iter()
            .filter_map(|f| Some((f.origin.as_str(), f.global_css.as_deref()?)))
            .collect();

        let mut bundle = self.base_bundle();

        if !tailwind_fragments.is_empty() {
            bundle.tailwind_config = tailwind::merge_tailwind(
                &self.base_tailwind,
                &tailwind_fragments,
                self.policy,
                &mut bundle.notes,
            )?;
        }

        if !css_fragments.is_empty() {
            bundle.global_css = css::merge_css(
                &self.base_css,
                &css_fragments,
                self.policy,
                &mut bundle.notes,
            )?;
        }

        tracing::debug!(
            tailwind_fragments = tailwind_fragments.len(),
            css_fragments = css_fragments.len(),
            conflicts = bundle.notes.len(),
            "styles merged"
        );

        Ok(bundle)
    }
}

/// Merges against the built-in base styles with first-wins conflicts.
pub fn merge_styles(fragments: &[StyleFragment]) -> MergedStyleBundle {
    StyleMerger::default().merge(fragments)
}

fn read_base(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|source| RegraphError::ReadFile {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fragment(origin: &str, tailwind: Option<&str>, css: Option<&str>) -> StyleFragment {
        StyleFragment {
            origin: origin.to_string(),
            tailwind_config: tailwind.map(str::to_string),
            global_css: css.map(str::to_string),
        }
    }

    const BRAND: &str = "module.exports = { theme: { extend: { colors: { brand: '#123456' } } } }";

    #[test]
    fn no_fragments_returns_base_unchanged() {
        let bundle = merge_styles(&[]);
        assert_eq!(bundle.tailwind_config, DEFAULT_TAILWIND_CONFIG);
        assert_eq!(bundle.global_css, DEFAULT_GLOBAL_CSS);
        assert!(!bundle.fell_back);

        let empty = merge_styles(&[fragment("a/plain", None, None)]);
        assert_eq!(empty, bundle);
    }

    #[test]
    fn each_half_short_circuits_independently() {
        let bundle = merge_styles(&[fragment("c/brand", Some(BRAND), None)]);
        assert_eq!(bundle.global_css, DEFAULT_GLOBAL_CSS);
        assert_ne!(bundle.tailwind_config, DEFAULT_TAILWIND_CONFIG);
        assert_eq!(bundle.tailwind_config.matches("brand: \"#123456\"").count(), 1);
    }

    #[test]
    fn merge_is_order_stable() {
        let fragments = vec![
            fragment("c/brand", Some(BRAND), Some(":root { --brand: 1 2% 3%; }")),
            fragment(
                "c/other",
                Some("module.exports = { theme: { extend: { spacing: { gutter: '2rem' } } } }"),
                Some("@keyframes spin { to { transform: rotate(360deg); } }"),
            ),
        ];

        let first = merge_styles(&fragments);
        let second = merge_styles(&fragments);
        assert_eq!(first.tailwind_config, second.tailwind_config);
        assert_eq!(first.global_css, second.global_css);
    }

    #[test]
    fn malformed_fragment_falls_back_to_base() {
        let bundle = merge_styles(&[
            fragment("c/brand", Some(BRAND), None),
            fragment("c/broken", None, Some(".a { color: red;")),
        ]);

        assert!(bundle.fell_back);
        assert_eq!(bundle.tailwind_config, DEFAULT_TAILWIND_CONFIG);
        assert_eq!(bundle.global_css, DEFAULT_GLOBAL_CSS);
    }

    #[test]
    fn error_policy_falls_back_on_conflict() {
        let merger = StyleMerger::with_defaults(ConflictPolicy::Error);
        let other = "module.exports = { theme: { extend: { colors: { brand: '#654321' } } } }";
        let bundle = merger.merge(&[
            fragment("c/brand", Some(BRAND), None),
            fragment("d/brand", Some(other), None),
        ]);
        assert!(bundle.fell_back);

        assert!(matches!(
            merger.try_merge(&[
                fragment("c/brand", Some(BRAND), None),
                fragment("d/brand", Some(other), None),
            ]),
            Err(RegraphError::StyleConflict { .. })
        ));
    }

    #[test]
    fn parses_policy_names() {
        assert_eq!(ConflictPolicy::parse("Last-Wins"), Some(ConflictPolicy::LastWins));
        assert_eq!(ConflictPolicy::parse("first"), Some(ConflictPolicy::FirstWins));
        assert_eq!(ConflictPolicy::parse("error"), Some(ConflictPolicy::Error));
        assert_eq!(ConflictPolicy::parse("random"), None);
        assert_eq!(ConflictPolicy::Error.as_str(), "error");
    }

    #[test]
    fn reads_base_files_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let css = dir.path().join("base.css");
        fs::write(&css, ":root { --x: 1; }\n").unwrap();

        let config = RegraphConfig {
            base_css_path: Some(css),
            style_conflict: ConflictPolicy::LastWins,
            ..RegraphConfig::default()
        };

        let merger = StyleMerger::from_config(&config).unwrap();
        assert_eq!(merger.base_css(), ":root { --x: 1; }\n");
        assert_eq!(merger.base_tailwind(), DEFAULT_TAILWIND_CONFIG);
        assert_eq!(merger.policy(), ConflictPolicy::LastWins);

        let missing = RegraphConfig {
            base_tailwind_path: Some(dir.path().join("missing.js")),
            ..RegraphConfig::default()
        };
        assert!(StyleMerger::from_config(&missing).is_err());
    }
}
