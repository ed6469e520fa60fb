//! Create a new post or page

use anyhow::{bail, Result};
use std::fs;
use std::path::PathBuf;

use crate::content::loader::{PAGES_DIR, POSTS_DIR};
use crate::Site;

/// Post front-matter used when `scaffolds/post.md` is missing
pub(crate) const POST_SCAFFOLD: &str = "---
title: {{ title }}
date: {{ date }}
tags: []
draft: false
summary:
---
";

/// Page front-matter used when `scaffolds/page.md` is missing
pub(crate) const PAGE_SCAFFOLD: &str = "---
title: {{ title }}
date: {{ date }}
---
";

/// Create a new post or page, returning the file written
///
/// `path` overrides the file name (without extension); otherwise it is the
/// slugified title.
pub fn create_post(site: &Site, title: &str, layout: &str, path: Option<&str>) -> Result<PathBuf> {
    let now = chrono::Local::now();

    let target_dir = match layout {
        "post" => site.content_dir.join(POSTS_DIR),
        "page" => site.content_dir.join(PAGES_DIR),
        other => bail!("Unknown layout: {}. Available: post, page", other),
    };

    let name = match path {
        Some(p) => p.trim_end_matches(".md").to_string(),
        None => slug::slugify(title),
    };
    if name.is_empty() {
        bail!("Cannot derive a file name from title {:?}; pass --path", title);
    }
    let file_path = target_dir.join(format!("{}.md", name));

    if file_path.exists() {
        bail!("File already exists: {:?}", file_path);
    }

    let scaffold_path = site.base_dir.join("scaffolds").join(format!("{}.md", layout));
    let scaffold = if scaffold_path.exists() {
        fs::read_to_string(&scaffold_path)?
    } else if layout == "page" {
        PAGE_SCAFFOLD.to_string()
    } else {
        POST_SCAFFOLD.to_string()
    };

    let content = scaffold
        .replace("{{ title }}", &yaml_quote(title))
        .replace("{{ date }}", &now.format("%Y-%m-%d %H:%M:%S").to_string());

    if let Some(parent) = file_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&file_path, content)?;
    tracing::info!("Created: {:?}", file_path);

    Ok(file_path)
}

/// Quote a title when YAML would otherwise misread it
fn yaml_quote(s: &str) -> String {
    let needs_quotes = s.is_empty()
        || s.contains(": ")
        || s.contains(" #")
        || s.starts_with(|c: char| "[]{}>|*&!%@`'\"#,?-".contains(c));
    if needs_quotes {
        format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::FrontMatter;

    #[test]
    fn test_create_post() {
        let dir = tempfile::tempdir().unwrap();
        let site = Site::new(dir.path()).unwrap();

        let path = create_post(&site, "Hello: World", "post", None).unwrap();
        assert_eq!(path, site.content_dir.join("blog/hello-world.md"));

        let content = fs::read_to_string(&path).unwrap();
        let (fm, _) = FrontMatter::parse(&content).unwrap();
        assert_eq!(fm.title.as_deref(), Some("Hello: World"));
        assert!(fm.parse_date().is_some());
        assert!(!fm.draft);

        assert!(create_post(&site, "Hello: World", "post", None).is_err());
    }

    #[test]
    fn test_create_page_with_path() {
        let dir = tempfile::tempdir().unwrap();
        let site = Site::new(dir.path()).unwrap();

        let path = create_post(&site, "关于", "page", Some("about")).unwrap();
        assert_eq!(path, site.content_dir.join("pages/about.md"));
    }

    #[test]
    fn test_scaffold_override() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("scaffolds")).unwrap();
        fs::write(
            dir.path().join("scaffolds/post.md"),
            "---\ntitle: {{ title }}\ntags: [随笔]\n---\n",
        )
        .unwrap();
        let site = Site::new(dir.path()).unwrap();

        let path = create_post(&site, "Notes", "post", None).unwrap();
        let (fm, _) = FrontMatter::parse(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(fm.tags, vec!["随笔"]);
    }

    #[test]
    fn test_unknown_layout() {
        let dir = tempfile::tempdir().unwrap();
        let site = Site::new(dir.path()).unwrap();
        assert!(create_post(&site, "x", "draft", None).is_err());
    }
}
