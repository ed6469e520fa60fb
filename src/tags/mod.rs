//! Tag aggregation and ranking
//!
//! The content layer counts how many posts carry each tag ([`count_tags`]).
//! The home page and the tag index then display those tags ordered by
//! frequency ([`rank`]). Each tag links to `/<tag_dir>/<slug>`, where the slug
//! comes from [`slugify`].

use anyhow::{anyhow, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

use crate::config::SiteMetadata;
use crate::content::Post;
use crate::helpers::{html_escape, url_for};

/// Mapping from tag name to the number of posts carrying it
///
/// Serialized as a plain JSON object (`tag-data.json`). Keys keep the case and
/// punctuation they were written with; insertion order carries no meaning.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagCounts(IndexMap<String, usize>);

impl TagCounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, tag: &str) -> Option<usize> {
        self.0.get(tag).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Add one post to a tag's count
    pub fn increment(&mut self, tag: &str) {
        *self.0.entry(tag.to_string()).or_insert(0) += 1;
    }

    /// Read counts from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| anyhow!("Failed to read {:?}: {}", path, e))?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Write counts to a JSON file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path.as_ref(), json)?;
        Ok(())
    }
}

impl<S: Into<String>> FromIterator<(S, usize)> for TagCounts {
    fn from_iter<I: IntoIterator<Item = (S, usize)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// Count tags across published posts
///
/// Drafts are skipped, tags are trimmed, and empty tags are ignored. A tag
/// repeated on the same post is counted once.
pub fn count_tags(posts: &[Post]) -> TagCounts {
    let mut counts = TagCounts::new();

    for post in posts.iter().filter(|p| !p.draft) {
        let mut seen = HashSet::new();
        for tag in &post.tags {
            let tag = tag.trim();
            if tag.is_empty() || !seen.insert(tag) {
                continue;
            }
            counts.increment(tag);
        }
    }

    counts
}

/// Order tag names by descending post count
///
/// Tags with the same count are ordered by name, so the result never depends
/// on the iteration order of the input.
pub fn rank(counts: &TagCounts) -> Vec<String> {
    let mut entries: Vec<(&str, usize)> = counts.iter().collect();
    entries.sort_by(|a, b| by_count_then_name(*a, *b));
    entries.into_iter().map(|(name, _)| name.to_string()).collect()
}

fn by_count_then_name(a: (&str, usize), b: (&str, usize)) -> Ordering {
    b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0))
}

/// URL-safe identifier for a tag
///
/// Lowercases, transliterates non-ASCII text, and collapses each run of
/// separators into one `-` with none at the ends. Distinct tags may share a slug.
pub fn slugify(tag: &str) -> String {
    slug::slugify(tag)
}

/// Text shown on a tag badge: spaces become hyphens, case is kept
pub fn badge_label(tag: &str) -> String {
    tag.split(' ').collect::<Vec<_>>().join("-")
}

/// Path of a tag's listing page, relative to the site root
///
/// `None` when the tag slugifies to nothing, since no page is written for it.
pub fn tag_path(config: &SiteMetadata, tag: &str) -> Option<String> {
    let slug = slugify(tag);
    if slug.is_empty() {
        return None;
    }
    Some(format!("{}/{}", config.tag_dir.trim_matches('/'), slug))
}

/// Badge text size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TagSize {
    Sm,
    #[default]
    Md,
    Lg,
}

impl TagSize {
    /// Parse a size name, falling back to `md`
    pub fn parse(s: &str) -> Self {
        match s {
            "sm" => TagSize::Sm,
            "lg" => TagSize::Lg,
            _ => TagSize::Md,
        }
    }

    pub fn class_name(&self) -> &'static str {
        match self {
            TagSize::Sm => "text-sm",
            TagSize::Md => "text-md",
            TagSize::Lg => "text-lg",
        }
    }
}

/// Render a tag badge linking to the tag's page, or a plain badge if it has none
pub fn badge_html(config: &SiteMetadata, tag: &str, size: TagSize) -> String {
    let label = html_escape(&badge_label(tag));
    match tag_path(config, tag) {
        Some(path) => format!(
            r#"<a href="{}" class="tag tag-badge {}">{}</a>"#,
            html_escape(&url_for(config, &path)),
            size.class_name(),
            label
        ),
        None => format!(
            r#"<span class="tag tag-badge {}">{}</span>"#,
            size.class_name(),
            label
        ),
    }
}

/// A tag ready to be displayed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedTag {
    /// Tag as written in front-matter
    pub name: String,
    /// Number of posts carrying the tag
    pub count: usize,
    pub slug: String,
    /// Badge text
    pub label: String,
    /// Link to the tag page, including the site root; `None` if it has no page
    pub href: Option<String>,
}

/// Rank tags and attach everything templates need to render them
pub fn ranked_tags(config: &SiteMetadata, counts: &TagCounts) -> Vec<RankedTag> {
    rank(counts)
        .into_iter()
        .map(|name| {
            let count = counts.get(&name).unwrap_or_default();
            RankedTag {
                count,
                slug: slugify(&name),
                label: badge_label(&name),
                href: tag_path(config, &name).map(|path| url_for(config, &path)),
                name,
            }
        })
        .collect()
}

/// Posts sharing one tag slug
#[derive(Debug, Clone)]
pub struct TagGroup<'a> {
    /// Every tag spelling that produced this slug, in first-seen order
    pub names: Vec<String>,
    pub posts: Vec<&'a Post>,
}

/// Group published posts by tag slug
///
/// Colliding tags (e.g. `Rust` and `rust`) end up on the same page. Tags whose
/// slug is empty have no page and are left out.
pub fn group_by_slug(posts: &[Post]) -> BTreeMap<String, TagGroup<'_>> {
    let mut groups: BTreeMap<String, TagGroup<'_>> = BTreeMap::new();

    for post in posts.iter().filter(|p| !p.draft) {
        let mut seen = HashSet::new();
        for tag in &post.tags {
            let tag = tag.trim();
            let slug = slugify(tag);
            if slug.is_empty() || !seen.insert(slug.clone()) {
                continue;
            }
            let group = groups.entry(slug).or_insert_with(|| TagGroup {
                names: Vec::new(),
                posts: Vec::new(),
            });
            if !group.names.iter().any(|n| n == tag) {
                group.names.push(tag.to_string());
            }
            group.posts.push(post);
        }
    }

    groups
}
