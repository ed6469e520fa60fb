//! Generator module - writes the static site using the built-in Tera templates

use anyhow::{anyhow, Result};
use std::fs;
use std::path::Path;

use lazy_static::lazy_static;
use regex::Regex;
use tera::Context;
use walkdir::WalkDir;

use crate::content::loader::is_markdown_file;
use crate::content::{Page, Post};
use crate::helpers::{
    escape_xml, full_url_for, is_external, meta_generator, open_graph, strip_html, truncate,
    unescape_html, url_for,
};
use crate::tags::{self, RankedTag};
use crate::templates::{ConfigData, MenuItem, NavPost, PostData, TagPageData, TemplateRenderer};
use crate::Site;

/// Tag counts consumed by the homepage, relative to the public dir
pub const TAG_DATA_FILE: &str = "tag-data.json";
/// Directory at the site root copied verbatim into the output
pub const STATIC_DIR: &str = "static";
/// Number of posts in the Atom feed
const FEED_LIMIT: usize = 20;
/// Summary length when a post has no `summary` front-matter
const SUMMARY_CHARS: usize = 150;

lazy_static! {
    static ref ROOT_RELATIVE_RE: Regex = Regex::new(r#"\b(href|src)=(["'])/([^/])"#).unwrap();
}

/// What a generation pass produced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerateReport {
    pub posts: usize,
    pub pages: usize,
    pub tags: usize,
}

/// Static site generator
pub struct Generator {
    site: Site,
    renderer: TemplateRenderer,
}

impl Generator {
    /// Create a new generator
    pub fn new(site: &Site) -> Result<Self> {
        Ok(Self {
            site: site.clone(),
            renderer: TemplateRenderer::new(&site.config)?,
        })
    }

    /// Generate the entire site
    pub fn generate(&self, posts: &[Post], pages: &[Page]) -> Result<GenerateReport> {
        fs::create_dir_all(&self.site.public_dir)?;

        self.copy_static_dir()?;
        self.copy_content_assets()?;

        let mut published: Vec<Post> = posts.iter().filter(|p| !p.draft).cloned().collect();
        published.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.slug.cmp(&b.slug)));

        let counts = tags::count_tags(&published);
        counts.save(self.site.public_dir.join(TAG_DATA_FILE))?;
        let ranked = tags::ranked_tags(&self.site.config, &counts);

        let menu = self.build_menu(pages);

        self.generate_home(&published, pages, &ranked, &menu)?;
        self.generate_post_pages(&published, &menu)?;
        self.generate_page_pages(pages, &menu)?;
        self.generate_tags_index(&ranked, &menu)?;
        let tag_pages = self.generate_tag_pages(&published, &menu)?;
        self.generate_atom_feed(&published)?;
        if self.site.config.search_enabled() {
            self.generate_search_index(&published)?;
        }

        Ok(GenerateReport {
            posts: published.len(),
            pages: pages.len(),
            tags: tag_pages,
        })
    }

    fn build_menu(&self, pages: &[Page]) -> Vec<MenuItem> {
        let config = &self.site.config;
        let mut menu = vec![MenuItem {
            name: "Tags".to_string(),
            url: url_for(config, &format!("{}/", config.tag_dir.trim_matches('/'))),
        }];

        let mut pages: Vec<&Page> = pages.iter().filter(|p| !p.path.is_empty()).collect();
        pages.sort_by(|a, b| a.path.cmp(&b.path));
        menu.extend(pages.into_iter().map(|p| MenuItem {
            name: p.title.clone(),
            url: url_for(config, &p.path),
        }));

        menu
    }

    fn post_data(&self, post: &Post) -> PostData {
        let summary = post
            .summary
            .clone()
            .unwrap_or_else(|| {
                let text = unescape_html(&strip_html(&post.content));
                truncate(text.trim(), SUMMARY_CHARS, None)
            });

        PostData {
            title: post.title.clone(),
            date: post.date.format("%Y-%m-%d").to_string(),
            url: url_for(&self.site.config, &post.path),
            permalink: post.permalink.clone(),
            tags: post.tags.clone(),
            summary,
            content: post.content.clone(),
        }
    }

    /// Create a base context with common variables
    fn create_base_context(&self, menu: &[MenuItem], current_path: &str, title: &str) -> Context {
        let config = &self.site.config;
        let mut context = Context::new();
        context.insert("config", &ConfigData::from(config));
        context.insert("menu", menu);
        context.insert("root", &url_for(config, ""));
        context.insert("current_url", &url_for(config, current_path));
        context.insert("current_year", &chrono::Local::now().format("%Y").to_string());

        let social_banner = match config.social_banner.as_str() {
            "" => None,
            banner if is_external(banner) => Some(banner.to_string()),
            banner => Some(full_url_for(config, banner)),
        };
        let head_meta = format!(
            "{}\n{}",
            meta_generator(),
            open_graph(
                title,
                &config.description,
                &full_url_for(config, current_path),
                social_banner.as_deref(),
                &config.title,
            )
        );
        context.insert("head_meta", &head_meta);
        context
    }

    /// Generate the home page: intro, ranked tags and the most recent posts
    fn generate_home(
        &self,
        posts: &[Post],
        pages: &[Page],
        ranked: &[RankedTag],
        menu: &[MenuItem],
    ) -> Result<()> {
        let config = &self.site.config;
        let recent: Vec<PostData> = posts
            .iter()
            .take(config.max_display)
            .map(|p| self.post_data(p))
            .collect();
        let about_url = pages
            .iter()
            .find(|p| p.path == "about/")
            .map(|p| url_for(config, &p.path));

        let mut context = self.create_base_context(menu, "", &config.title);
        context.insert("ranked_tags", ranked);
        context.insert("tag_size", "lg");
        context.insert("recent_posts", &recent);
        context.insert("about_url", &about_url);

        let html = self.renderer.render("home.html", &context)?;
        self.write_output("", &html)
    }

    /// Generate individual post pages
    fn generate_post_pages(&self, posts: &[Post], menu: &[MenuItem]) -> Result<()> {
        let nav = |post: Option<&Post>| {
            post.map(|p| NavPost {
                title: p.title.clone(),
                url: url_for(&self.site.config, &p.path),
            })
        };

        for post in posts {
            let mut context = self.create_base_context(menu, &post.path, &post.title);
            context.insert("post", &self.post_data(post));
            context.insert("newer_post", &nav(post.newer(posts)));
            context.insert("older_post", &nav(post.older(posts)));

            let html = self.renderer.render("post.html", &context)?;
            self.write_output(&post.path, &html)?;
            tracing::debug!("Generated post: {}", post.path);
        }

        Ok(())
    }

    /// Generate standalone pages
    fn generate_page_pages(&self, pages: &[Page], menu: &[MenuItem]) -> Result<()> {
        for page in pages {
            if page.path.is_empty() {
                tracing::warn!("Skipping page {} that would replace the home page", page.source);
                continue;
            }

            let mut context = self.create_base_context(menu, &page.path, &page.title);
            context.insert("page_title", &page.title);
            context.insert("page_content", &page.content);
            context.insert("page_layout", &page.layout);

            let html = self.renderer.render("page.html", &context)?;
            self.write_output(&page.path, &html)?;
            tracing::debug!("Generated page: {}", page.path);
        }

        Ok(())
    }

    /// Generate the tag index listing every ranked tag
    fn generate_tags_index(&self, ranked: &[RankedTag], menu: &[MenuItem]) -> Result<()> {
        let tag_dir = format!("{}/", self.site.config.tag_dir.trim_matches('/'));

        let mut context = self.create_base_context(menu, &tag_dir, "Tags");
        context.insert("ranked_tags", ranked);
        context.insert("tag_size", "md");

        let html = self.renderer.render("tags.html", &context)?;
        self.write_output(&tag_dir, &html)
    }

    /// Generate one page per tag slug; returns how many were written
    fn generate_tag_pages(&self, posts: &[Post], menu: &[MenuItem]) -> Result<usize> {
        let tag_dir = self.site.config.tag_dir.trim_matches('/');
        let groups = tags::group_by_slug(posts);

        for (slug, group) in &groups {
            if group.names.len() > 1 {
                tracing::debug!("Tags {:?} share the slug {:?}", group.names, slug);
            }

            let path = format!("{}/{}/", tag_dir, slug);
            let tag_page = TagPageData {
                names: group.names.clone(),
                slug: slug.clone(),
                posts: group.posts.iter().map(|p| self.post_data(p)).collect(),
            };

            let mut context = self.create_base_context(menu, &path, &group.names.join(" / "));
            context.insert("tag_page", &tag_page);

            let html = self.renderer.render("tag.html", &context)?;
            self.write_output(&path, &html)?;
        }

        tracing::info!("Generated {} tag pages", groups.len());
        Ok(groups.len())
    }

    /// Generate Atom feed
    fn generate_atom_feed(&self, posts: &[Post]) -> Result<()> {
        let config = &self.site.config;
        let home = full_url_for(config, "");

        let mut feed = String::new();
        feed.push_str("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n");
        feed.push_str("<feed xmlns=\"http://www.w3.org/2005/Atom\">\n");
        feed.push_str(&format!("  <title>{}</title>\n", escape_xml(&config.title)));
        feed.push_str(&format!(
            "  <subtitle>{}</subtitle>\n",
            escape_xml(&config.description)
        ));
        feed.push_str(&format!(
            "  <link href=\"{}\" rel=\"self\"/>\n",
            full_url_for(config, "atom.xml")
        ));
        feed.push_str(&format!("  <link href=\"{}\"/>\n", home));
        let updated = posts
            .first()
            .map(|p| p.lastmod.unwrap_or(p.date).to_rfc3339())
            .unwrap_or_else(|| chrono::Local::now().to_rfc3339());
        feed.push_str(&format!("  <updated>{}</updated>\n", updated));
        feed.push_str(&format!("  <id>{}</id>\n", home));
        if !config.author.is_empty() {
            feed.push_str(&format!(
                "  <author><name>{}</name></author>\n",
                escape_xml(&config.author)
            ));
        }

        let site_base = config.site_url.trim_end_matches('/');
        for post in posts.iter().take(FEED_LIMIT) {
            let link = full_url_for(config, &post.path);
            feed.push_str("  <entry>\n");
            feed.push_str(&format!("    <title>{}</title>\n", escape_xml(&post.title)));
            feed.push_str(&format!("    <link href=\"{}\"/>\n", link));
            feed.push_str(&format!("    <id>{}</id>\n", link));
            feed.push_str(&format!(
                "    <published>{}</published>\n",
                post.date.to_rfc3339()
            ));
            feed.push_str(&format!(
                "    <updated>{}</updated>\n",
                post.lastmod.unwrap_or(post.date).to_rfc3339()
            ));
            for tag in &post.tags {
                feed.push_str(&format!("    <category term=\"{}\"/>\n", escape_xml(tag)));
            }
            let content = absolutize_links(&post.content, site_base);
            feed.push_str(&format!(
                "    <content type=\"html\"><![CDATA[{}]]></content>\n",
                strip_invalid_xml_chars(&content).replace("]]>", "]]]]><![CDATA[>")
            ));
            feed.push_str("  </entry>\n");
        }

        feed.push_str("</feed>\n");

        fs::write(self.site.public_dir.join("atom.xml"), feed)?;
        tracing::info!("Generated atom.xml");

        Ok(())
    }

    /// Generate the kbar search documents (JSON)
    fn generate_search_index(&self, posts: &[Post]) -> Result<()> {
        let documents: Vec<serde_json::Value> = posts
            .iter()
            .map(|p| {
                let data = self.post_data(p);
                serde_json::json!({
                    "title": data.title,
                    "date": data.date,
                    "tags": data.tags,
                    "summary": data.summary,
                    "path": data.url,
                    "slug": p.slug,
                })
            })
            .collect();

        // The document path is a URL; only its file name decides where it lands
        let file_name = Path::new(&self.site.config.search.kbar_config.search_documents_path)
            .file_name()
            .and_then(|n| n.to_str())
            .filter(|n| !n.is_empty())
            .unwrap_or("search.json")
            .to_string();

        let json = serde_json::to_string_pretty(&documents)?;
        fs::write(self.site.public_dir.join(&file_name), json)?;
        tracing::info!("Generated {}", file_name);

        Ok(())
    }

    /// Write `<public>/<path>/index.html`
    fn write_output(&self, path: &str, html: &str) -> Result<()> {
        let output_path = self
            .site
            .public_dir
            .join(path.trim_start_matches('/'))
            .join("index.html");
        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| anyhow!("Failed to create dir {:?}: {}", parent, e))?;
        }
        fs::write(&output_path, html)
            .map_err(|e| anyhow!("Failed to write {:?}: {}", output_path, e))?;
        Ok(())
    }

    /// Copy `<base>/static` into the public directory
    fn copy_static_dir(&self) -> Result<()> {
        let static_dir = self.site.base_dir.join(STATIC_DIR);
        copy_tree(&static_dir, &self.site.public_dir.join(STATIC_DIR), |_| true)
    }

    /// Copy non-markdown files (images, etc.) from the content directory
    fn copy_content_assets(&self) -> Result<()> {
        copy_tree(&self.site.content_dir, &self.site.public_dir, |path| {
            !is_markdown_file(path)
        })
    }
}

/// Copy every file under `from` accepted by `filter` to the same place under `to`
fn copy_tree(from: &Path, to: &Path, filter: impl Fn(&Path) -> bool) -> Result<()> {
    if !from.exists() {
        return Ok(());
    }

    for entry in WalkDir::new(from)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        let path = entry.path();
        let relative = path.strip_prefix(from)?;

        let hidden = relative
            .components()
            .any(|c| c.as_os_str().to_string_lossy().starts_with('.'));
        if hidden || !filter(path) {
            continue;
        }

        let dest = to.join(relative);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(path, &dest)?;
        tracing::debug!("Copied: {:?} -> {:?}", path, dest);
    }

    Ok(())
}

/// Point root-relative `href`/`src` attributes at the site URL
///
/// Protocol-relative URLs (`//host/...`) are left alone.
fn absolutize_links(content: &str, base_url: &str) -> String {
    ROOT_RELATIVE_RE
        .replace_all(content, |caps: &regex::Captures| {
            format!("{}={}{}/{}", &caps[1], &caps[2], base_url, &caps[3])
        })
        .into_owned()
}

/// Strip characters XML 1.0 does not allow
fn strip_invalid_xml_chars(s: &str) -> String {
    s.chars()
        .filter(|&c| {
            matches!(c, '\t' | '\n' | '\r')
                || ('\u{20}'..='\u{D7FF}').contains(&c)
                || ('\u{E000}'..='\u{FFFD}').contains(&c)
                || ('\u{10000}'..='\u{10FFFF}').contains(&c)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::loader::ContentLoader;
    use tempfile::TempDir;

    fn write(dir: &Path, path: &str, content: &str) {
        let full = dir.join(path);
        fs::create_dir_all(full.parent().unwrap()).unwrap();
        fs::write(full, content).unwrap();
    }

    fn build_site() -> (TempDir, Site, GenerateReport) {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path();
        write(
            base,
            "site.yml",
            "title: White-Meta\nbilibili: https://space.bilibili.com/107889531\nmax_display: 2\n",
        );
        write(
            base,
            "data/blog/first.md",
            concat!(
                "---\ntitle: First\ndate: 2024-01-01\ntags: [rust, go]\n---\n",
                "Hello <BVideo bvid=\"BV1ab\" />",
            ),
        );
        write(
            base,
            "data/blog/second.md",
            "---\ntitle: Second\ndate: 2024-02-01\ntags: [rust, python]\n---\nSecond body",
        );
        write(
            base,
            "data/blog/third.md",
            concat!(
                "---\ntitle: Third\ndate: 2024-03-01\ntags: [python, rust, Web Dev]\n---\n",
                "![img](/static/a.png)",
            ),
        );
        write(
            base,
            "data/blog/secret.md",
            "---\ntitle: Secret\ndate: 2024-04-01\ntags: [hidden]\ndraft: true\n---\ndraft",
        );
        write(base, "data/pages/about.md", "---\ntitle: 关于\n---\n我是谁");
        write(base, "data/blog/images/cover.png", "png");
        write(base, "static/css/site.css", "body {}");

        let site = Site::new(base).unwrap();
        let loader = ContentLoader::new(&site);
        let posts = loader.load_posts().unwrap();
        let pages = loader.load_pages().unwrap();
        let report = Generator::new(&site).unwrap().generate(&posts, &pages).unwrap();
        (dir, site, report)
    }

    fn read(site: &Site, path: &str) -> String {
        fs::read_to_string(site.public_dir.join(path)).unwrap()
    }

    #[test]
    fn test_generate_site() {
        let (_dir, site, report) = build_site();
        assert_eq!(
            report,
            GenerateReport {
                posts: 3,
                pages: 1,
                tags: 4
            }
        );

        for path in [
            "index.html",
            "blog/first/index.html",
            "blog/third/index.html",
            "about/index.html",
            "tags/index.html",
            "tags/rust/index.html",
            "tags/web-dev/index.html",
            "atom.xml",
            "search.json",
            "blog/images/cover.png",
            "static/css/site.css",
        ] {
            assert!(site.public_dir.join(path).exists(), "missing {}", path);
        }
        assert!(!site.public_dir.join("blog/secret").exists());
        assert!(!site.public_dir.join("tags/hidden").exists());
    }

    #[test]
    fn test_tag_data_written() {
        let (_dir, site, _) = build_site();
        let counts = tags::TagCounts::load(site.public_dir.join(TAG_DATA_FILE)).unwrap();
        assert_eq!(counts.get("rust"), Some(3));
        assert_eq!(counts.get("hidden"), None);
        assert_eq!(tags::rank(&counts), vec!["rust", "python", "Web Dev", "go"]);
    }

    #[test]
    fn test_home_lists_ranked_tags() {
        let (_dir, site, _) = build_site();
        let home = read(&site, "index.html");

        let rust = home.find(r#"aria-label="View posts tagged rust""#).unwrap();
        let python = home.find(r#"aria-label="View posts tagged python""#).unwrap();
        let web_dev = home.find(r#"aria-label="View posts tagged Web Dev""#).unwrap();
        let go = home.find(r#"aria-label="View posts tagged go""#).unwrap();
        assert!(rust < python && python < web_dev && web_dev < go);

        assert!(home.contains(" (3)"));
        assert!(home.contains(r#"href="/tags/web-dev""#));
        assert!(home.contains(">Web-Dev</a>"));
        assert!(home.contains("text-lg"));
        assert!(home.contains("「关于」"));
        assert!(home.contains("space.bilibili.com/107889531"));

        // max_display caps recent posts
        assert!(home.contains(">Third</a>"));
        assert!(home.contains(">Second</a>"));
        assert!(!home.contains(">First</a>"));
    }

    #[test]
    fn test_post_page() {
        let (_dir, site, _) = build_site();
        let first = read(&site, "blog/first/index.html");
        assert!(first.contains("player.bilibili.com/player.html?bvid=BV1ab"));
        assert!(first.contains(r#"href="/tags/go""#));
        assert!(first.contains("Next post: Second"));
        assert!(!first.contains("Previous post"));
    }

    #[test]
    fn test_tag_page_lists_posts() {
        let (_dir, site, _) = build_site();
        let python = read(&site, "tags/python/index.html");
        assert!(python.contains(">Second</a>"));
        assert!(python.contains(">Third</a>"));
        assert!(!python.contains(">First</a>"));
    }

    #[test]
    fn test_feed_and_search() {
        let (_dir, site, _) = build_site();
        let feed = read(&site, "atom.xml");
        assert!(feed.contains("<title>White-Meta</title>"));
        assert!(feed.contains("https://whitemeta.cn/blog/third/"));
        assert!(feed.contains(r#"src="https://whitemeta.cn/static/a.png""#));
        assert!(!feed.contains("Secret"));

        let search: Vec<serde_json::Value> =
            serde_json::from_str(&read(&site, "search.json")).unwrap();
        assert_eq!(search.len(), 3);
        assert_eq!(search[0]["title"], "Third");
        assert_eq!(search[0]["path"], "/blog/third/");
    }

    #[test]
    fn test_markup_in_titles_and_tags_is_escaped() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "data/blog/a.md",
            concat!(
                "---\ntitle: Vec<T> 入门\ndate: 2024-01-01\n",
                "tags: [say \"hi\", R&D, \"!!!\"]\n---\n",
                "Use `Vec<T>` & friends.",
            ),
        );
        let site = Site::new(dir.path()).unwrap();
        let posts = ContentLoader::new(&site).load_posts().unwrap();
        Generator::new(&site).unwrap().generate(&posts, &[]).unwrap();

        let home = read(&site, "index.html");
        assert!(home.contains(r#"aria-label="View posts tagged say &quot;hi&quot;""#));
        assert!(home.contains(r#"aria-label="View posts tagged R&amp;D""#));
        assert!(home.contains(r#"<a href="/blog/a/">Vec&lt;T&gt; 入门</a>"#));
        assert!(home.contains("Use Vec&lt;T&gt; &amp; friends."));
        assert!(!home.contains("Vec<T>"));

        // A tag without a slug is listed but not linked
        assert!(home.contains(r#"<span class="tag tag-badge text-lg">!!!</span>"#));
        assert!(!home.contains(r#"href="/tags/""#));
        assert!(!home.contains("/tags//"));

        let post = read(&site, "blog/a/index.html");
        assert!(post.contains("<title>Vec&lt;T&gt; 入门 - White-Meta</title>"));
        assert!(post.contains("<code>Vec&lt;T&gt;</code>"));
    }

    #[test]
    fn test_absolutize_links() {
        let html = r#"<a href="/about/">a</a><img src='/x.png'><a href="//cdn.example/x">c</a>"#;
        let out = absolutize_links(html, "https://whitemeta.cn");
        assert!(out.contains(r#"href="https://whitemeta.cn/about/""#));
        assert!(out.contains("src='https://whitemeta.cn/x.png'"));
        assert!(out.contains(r#"href="//cdn.example/x""#));
    }

    #[test]
    fn test_strip_invalid_xml_chars() {
        assert_eq!(strip_invalid_xml_chars("a\u{0}b\u{8}c\n"), "abc\n");
    }
}
