//! Site metadata (site.yml)

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Placeholder replaced by the `BASE_PATH` environment variable at load time
pub const BASE_PATH_VAR: &str = "${BASE_PATH}";

/// Errors raised while validating site metadata
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("site title must not be empty")]
    MissingTitle,

    #[error("site_url must start with http:// or https://, got {0:?}")]
    InvalidSiteUrl(String),

    #[error("root must start and end with '/', got {0:?}")]
    InvalidRoot(String),

    #[error("max_display must be greater than zero")]
    ZeroMaxDisplay,

    #[error("invalid site.yml: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Color scheme the layout starts with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    #[default]
    System,
    Dark,
    Light,
}

impl ThemeMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThemeMode::System => "system",
            ThemeMode::Dark => "dark",
            ThemeMode::Light => "light",
        }
    }
}

/// Search backend wired into the layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SearchProvider {
    #[default]
    Kbar,
    #[serde(rename = "none")]
    Disabled,
}

/// kbar command palette settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KbarConfig {
    /// Path the palette fetches its documents from
    pub search_documents_path: String,
}

impl Default for KbarConfig {
    fn default() -> Self {
        Self {
            search_documents_path: format!("{}/search.json", BASE_PATH_VAR),
        }
    }
}

/// Search configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct SearchConfig {
    pub provider: SearchProvider,
    pub kbar_config: KbarConfig,
}

/// Site-wide metadata, loaded once and never mutated afterwards
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteMetadata {
    // Site
    pub title: String,
    pub author: String,
    pub header_title: String,
    pub description: String,
    pub language: String,
    pub locale: String,
    pub theme: ThemeMode,

    // URLs
    pub site_url: String,
    pub site_repo: String,
    pub site_logo: String,
    pub social_banner: String,
    pub root: String,

    // Social
    pub email: String,
    pub github: String,
    pub bilibili: String,

    // Layout
    pub sticky_nav: bool,
    pub search: SearchConfig,

    // Build
    pub content_dir: String,
    pub public_dir: String,
    pub tag_dir: String,
    /// Number of recent posts shown on the home page
    pub max_display: usize,
}

impl Default for SiteMetadata {
    fn default() -> Self {
        Self {
            title: "White-Meta".to_string(),
            author: String::new(),
            header_title: "White-Meta".to_string(),
            description: "记录生活 · 技术 · 学习 · 思考".to_string(),
            language: "zh-CN".to_string(),
            locale: "zh-CN".to_string(),
            theme: ThemeMode::System,

            site_url: "https://whitemeta.cn".to_string(),
            site_repo: String::new(),
            site_logo: format!("{}/static/images/logo.png", BASE_PATH_VAR),
            social_banner: format!("{}/static/images/twitter-card.png", BASE_PATH_VAR),
            root: "/".to_string(),

            email: String::new(),
            github: String::new(),
            bilibili: String::new(),

            sticky_nav: false,
            search: SearchConfig::default(),

            content_dir: "data".to_string(),
            public_dir: "public".to_string(),
            tag_dir: "tags".to_string(),
            max_display: 5,
        }
    }
}

impl SiteMetadata {
    /// Load metadata from a file, expanding `${BASE_PATH}` from the environment
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| anyhow!("Failed to read {:?}: {}", path, e))?;
        let metadata = Self::parse(&content, &env_base_path())?;
        tracing::debug!("Loaded site metadata from {:?}", path);
        Ok(metadata)
    }

    /// Defaults for a site without a metadata file, expanded like a loaded one
    pub fn from_env_defaults() -> Result<Self, ConfigError> {
        Self::parse("", &env_base_path())
    }

    /// Parse and validate metadata from YAML text
    pub fn parse(yaml: &str, base_path: &str) -> Result<Self, ConfigError> {
        let mut metadata: SiteMetadata = if yaml.trim().is_empty() {
            SiteMetadata::default()
        } else {
            serde_yaml::from_str(yaml)?
        };
        metadata.expand_base_path(base_path);
        metadata.validate()?;
        Ok(metadata)
    }

    /// Check the fields downstream code relies on
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.title.trim().is_empty() {
            return Err(ConfigError::MissingTitle);
        }
        if !(self.site_url.starts_with("http://") || self.site_url.starts_with("https://")) {
            return Err(ConfigError::InvalidSiteUrl(self.site_url.clone()));
        }
        if !self.root.starts_with('/') || !self.root.ends_with('/') {
            return Err(ConfigError::InvalidRoot(self.root.clone()));
        }
        if self.max_display == 0 {
            return Err(ConfigError::ZeroMaxDisplay);
        }
        Ok(())
    }

    fn expand_base_path(&mut self, base_path: &str) {
        let base_path = base_path.trim_end_matches('/');
        for field in [
            &mut self.site_logo,
            &mut self.social_banner,
            &mut self.search.kbar_config.search_documents_path,
        ] {
            *field = field.replace(BASE_PATH_VAR, base_path);
        }
    }

    /// Whether the kbar search index should be emitted
    pub fn search_enabled(&self) -> bool {
        self.search.provider == SearchProvider::Kbar
    }
}

fn env_base_path() -> String {
    std::env::var("BASE_PATH").unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_metadata() {
        let metadata = SiteMetadata::default();
        assert_eq!(metadata.title, "White-Meta");
        assert_eq!(metadata.max_display, 5);
        assert_eq!(metadata.tag_dir, "tags");
        assert!(metadata.validate().is_ok());
    }

    #[test]
    fn test_parse_metadata() {
        let yaml = r#"
title: My Blog
author: Test User
theme: dark
site_url: https://blog.example.com
search:
  provider: kbar
  kbar_config:
    search_documents_path: ${BASE_PATH}/search.json
"#;
        let metadata = SiteMetadata::parse(yaml, "/sub").unwrap();
        assert_eq!(metadata.title, "My Blog");
        assert_eq!(metadata.author, "Test User");
        assert_eq!(metadata.theme, ThemeMode::Dark);
        assert_eq!(
            metadata.search.kbar_config.search_documents_path,
            "/sub/search.json"
        );
        assert_eq!(metadata.site_logo, "/sub/static/images/logo.png");
    }

    #[test]
    fn test_empty_base_path() {
        let metadata = SiteMetadata::parse("", "").unwrap();
        assert_eq!(metadata.social_banner, "/static/images/twitter-card.png");
    }

    #[test]
    fn test_env_defaults_expanded() {
        let metadata = SiteMetadata::from_env_defaults().unwrap();
        assert!(!metadata.site_logo.contains(BASE_PATH_VAR));
        assert!(!metadata.social_banner.contains(BASE_PATH_VAR));
        assert!(metadata
            .search
            .kbar_config
            .search_documents_path
            .ends_with("/search.json"));
        assert!(!metadata
            .search
            .kbar_config
            .search_documents_path
            .contains(BASE_PATH_VAR));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = SiteMetadata::parse("titel: typo\n", "").unwrap_err();
        assert!(matches!(err, ConfigError::Yaml(_)));
    }

    #[test]
    fn test_validation_errors() {
        assert!(matches!(
            SiteMetadata::parse("title: ''\n", ""),
            Err(ConfigError::MissingTitle)
        ));
        assert!(matches!(
            SiteMetadata::parse("site_url: whitemeta.cn\n", ""),
            Err(ConfigError::InvalidSiteUrl(_))
        ));
        assert!(matches!(
            SiteMetadata::parse("root: blog\n", ""),
            Err(ConfigError::InvalidRoot(_))
        ));
        assert!(matches!(
            SiteMetadata::parse("max_display: 0\n", ""),
            Err(ConfigError::ZeroMaxDisplay)
        ));
    }

    #[test]
    fn test_search_disabled() {
        let metadata = SiteMetadata::parse("search:\n  provider: none\n", "").unwrap();
        assert!(!metadata.search_enabled());
    }
}
