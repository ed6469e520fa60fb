//! Built-in site templates using the Tera template engine
//!
//! Templates are embedded in the binary and autoescaped. Rendered Markdown and
//! helper-built head tags are passed through `| safe`. Two template functions
//! return ready-made markup:
//!
//! - `tag_badge(name, size="md")` renders a tag badge linking to its page
//! - `bilibili(bvid, width="100%", height=400, class="")` renders a video player

use anyhow::Result;
use serde::Serialize;
use std::collections::HashMap;
use tera::{Context, Tera};

use crate::config::SiteMetadata;
use crate::helpers::{html_escape, truncate};
use crate::tags::{self, TagSize};
use crate::video::{BilibiliVideo, Dimension};

/// Template renderer with the embedded site templates
pub struct TemplateRenderer {
    tera: Tera,
}

impl TemplateRenderer {
    /// Create a new renderer with all templates loaded
    pub fn new(config: &SiteMetadata) -> Result<Self> {
        let mut tera = Tera::default();
        tera.autoescape_on(vec![".html"]);
        // Leaves `/` alone so URLs stay readable
        tera.set_escape_fn(html_escape);

        tera.add_raw_templates(vec![
            ("layout.html", include_str!("site/layout.html")),
            ("home.html", include_str!("site/home.html")),
            ("post.html", include_str!("site/post.html")),
            ("page.html", include_str!("site/page.html")),
            ("tags.html", include_str!("site/tags.html")),
            ("tag.html", include_str!("site/tag.html")),
            (
                "partials/header.html",
                include_str!("site/partials/header.html"),
            ),
            (
                "partials/footer.html",
                include_str!("site/partials/footer.html"),
            ),
            (
                "partials/ranked_tag.html",
                include_str!("site/partials/ranked_tag.html"),
            ),
            (
                "partials/post_item.html",
                include_str!("site/partials/post_item.html"),
            ),
        ])?;

        tera.register_filter("truncate_chars", truncate_chars_filter);

        tera.register_function(
            "tag_badge",
            TagBadge {
                config: config.clone(),
            },
        );
        tera.register_function("bilibili", BilibiliEmbed);

        Ok(Self { tera })
    }

    /// Render a template with given context
    pub fn render(&self, template_name: &str, context: &Context) -> Result<String> {
        Ok(self.tera.render(template_name, context)?)
    }
}

/// Tera filter: truncate by character count
fn truncate_chars_filter(
    value: &tera::Value,
    args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let s = tera::try_get_value!("truncate_chars", "value", String, value);
    let length = match args.get("length") {
        Some(val) => tera::try_get_value!("truncate_chars", "length", usize, val),
        None => 150,
    };
    let omission = match args.get("omission") {
        Some(val) => tera::try_get_value!("truncate_chars", "omission", String, val),
        None => "...".to_string(),
    };
    Ok(tera::Value::String(truncate(&s, length, Some(&omission))))
}

/// Tera function: tag badge, escaped by `badge_html`
struct TagBadge {
    config: SiteMetadata,
}

impl tera::Function for TagBadge {
    fn call(&self, args: &HashMap<String, tera::Value>) -> tera::Result<tera::Value> {
        let name = match args.get("name") {
            Some(val) => tera::try_get_value!("tag_badge", "name", String, val),
            None => return Err("tag_badge requires a `name` argument".into()),
        };
        let size = match args.get("size") {
            Some(val) => tera::try_get_value!("tag_badge", "size", String, val),
            None => "md".to_string(),
        };
        Ok(tera::Value::String(tags::badge_html(
            &self.config,
            &name,
            TagSize::parse(&size),
        )))
    }

    fn is_safe(&self) -> bool {
        true
    }
}

/// Tera function: Bilibili player markup, escaped by `to_html`
struct BilibiliEmbed;

impl tera::Function for BilibiliEmbed {
    fn call(&self, args: &HashMap<String, tera::Value>) -> tera::Result<tera::Value> {
        let bvid = match args.get("bvid") {
            Some(val) => tera::try_get_value!("bilibili", "bvid", String, val),
            None => return Err("bilibili requires a `bvid` argument".into()),
        };
        let mut video = BilibiliVideo::new(bvid);
        if let Some(width) = args.get("width").map(dimension_arg) {
            video = video.width(width);
        }
        if let Some(height) = args.get("height").map(dimension_arg) {
            video = video.height(height);
        }
        if let Some(class) = args.get("class").and_then(|v| v.as_str()) {
            video = video.class_name(class);
        }
        Ok(tera::Value::String(video.to_html()))
    }

    fn is_safe(&self) -> bool {
        true
    }
}

fn dimension_arg(value: &tera::Value) -> Dimension {
    match value {
        tera::Value::Number(n) => Dimension::parse(&n.to_string()),
        tera::Value::String(s) => Dimension::parse(s),
        other => Dimension::parse(&other.to_string()),
    }
}

// Data structures for template context

#[derive(Debug, Clone, Serialize)]
pub struct PostData {
    pub title: String,
    pub date: String,
    /// Link including the site root
    pub url: String,
    pub permalink: String,
    pub tags: Vec<String>,
    pub summary: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NavPost {
    pub title: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MenuItem {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TagPageData {
    /// Tag spellings sharing this page's slug
    pub names: Vec<String>,
    pub slug: String,
    pub posts: Vec<PostData>,
}

/// Site metadata as templates see it
#[derive(Debug, Clone, Serialize)]
pub struct ConfigData {
    pub title: String,
    pub header_title: String,
    pub description: String,
    pub author: String,
    pub language: String,
    pub locale: String,
    pub theme: String,
    pub site_url: String,
    pub site_repo: String,
    pub site_logo: String,
    pub email: String,
    pub github: String,
    pub bilibili: String,
    pub sticky_nav: bool,
    pub search_enabled: bool,
    pub search_documents_path: String,
}

impl From<&SiteMetadata> for ConfigData {
    fn from(config: &SiteMetadata) -> Self {
        Self {
            title: config.title.clone(),
            header_title: config.header_title.clone(),
            description: config.description.clone(),
            author: config.author.clone(),
            language: config.language.clone(),
            locale: config.locale.clone(),
            theme: config.theme.as_str().to_string(),
            site_url: config.site_url.clone(),
            site_repo: config.site_repo.clone(),
            site_logo: config.site_logo.clone(),
            email: config.email.clone(),
            github: config.github.clone(),
            bilibili: config.bilibili.clone(),
            sticky_nav: config.sticky_nav,
            search_enabled: config.search_enabled(),
            search_documents_path: config.search.kbar_config.search_documents_path.clone(),
        }
    }
}
