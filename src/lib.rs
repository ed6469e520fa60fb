//! white-meta: static site generator for the White-Meta blog
//!
//! Posts and pages are Markdown files under the content directory. The
//! generated homepage lists every tag ranked by how many posts carry it, and
//! each tag links to its own `/tags/<slug>` page.

pub mod commands;
pub mod config;
pub mod content;
pub mod generator;
pub mod helpers;
pub mod server;
pub mod tags;
pub mod templates;
pub mod video;

use anyhow::Result;
use std::path::{Path, PathBuf};

/// Name of the site metadata file at the site root
pub const CONFIG_FILE: &str = "site.yml";

/// A site on disk plus its metadata
#[derive(Clone)]
pub struct Site {
    /// Site metadata, read once at startup
    pub config: config::SiteMetadata,
    /// Base directory
    pub base_dir: PathBuf,
    /// Content (Markdown and assets) directory
    pub content_dir: PathBuf,
    /// Public (output) directory
    pub public_dir: PathBuf,
}

impl Site {
    /// Open a site rooted at a directory
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        let config_path = base_dir.join(CONFIG_FILE);

        let config = if config_path.exists() {
            config::SiteMetadata::load(&config_path)?
        } else {
            tracing::debug!("No {} found, using defaults", CONFIG_FILE);
            config::SiteMetadata::from_env_defaults()?
        };

        Ok(Self::with_config(base_dir, config))
    }

    /// Build a site from already-loaded metadata
    pub fn with_config(base_dir: PathBuf, config: config::SiteMetadata) -> Self {
        let content_dir = base_dir.join(&config.content_dir);
        let public_dir = base_dir.join(&config.public_dir);

        Self {
            config,
            base_dir,
            content_dir,
            public_dir,
        }
    }

    /// Generate the static site
    pub fn generate(&self) -> Result<()> {
        commands::generate::run(self)
    }

    /// Clean the public directory
    pub fn clean(&self) -> Result<()> {
        commands::clean::run(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BASE_PATH_VAR;

    #[test]
    fn test_site_without_metadata_file() {
        let dir = tempfile::tempdir().unwrap();
        let site = Site::new(dir.path()).unwrap();
        assert_eq!(site.public_dir, dir.path().join("public"));
        assert!(!site.config.site_logo.contains(BASE_PATH_VAR));

        site.generate().unwrap();
        let home = std::fs::read_to_string(site.public_dir.join("index.html")).unwrap();
        assert!(!home.contains(BASE_PATH_VAR));
    }
}
