//! Content loader - loads posts and pages from the content directory

use anyhow::Result;
use chrono::Local;
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

use super::{FrontMatter, MarkdownRenderer, Page, Post};
use crate::helpers::full_url_for;
use crate::Site;

/// Directory under the content dir holding posts
pub const POSTS_DIR: &str = "blog";
/// Directory under the content dir holding standalone pages
pub const PAGES_DIR: &str = "pages";

/// Loads content from the content directory
pub struct ContentLoader<'a> {
    site: &'a Site,
    renderer: MarkdownRenderer,
}

impl<'a> ContentLoader<'a> {
    /// Create a new content loader
    pub fn new(site: &'a Site) -> Self {
        Self {
            site,
            renderer: MarkdownRenderer::new(),
        }
    }

    /// Load all posts (drafts included), newest first
    pub fn load_posts(&self) -> Result<Vec<Post>> {
        let posts_dir = self.site.content_dir.join(POSTS_DIR);
        let mut posts: Vec<Post> = markdown_files(&posts_dir)
            .filter_map(|path| match self.load_post(&path) {
                Ok(post) => Some(post),
                Err(e) => {
                    tracing::warn!("Failed to load post {:?}: {}", path, e);
                    None
                }
            })
            .collect();

        posts.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.slug.cmp(&b.slug)));

        Ok(posts)
    }

    /// Load a single post from a file
    fn load_post(&self, path: &Path) -> Result<Post> {
        let content = fs::read_to_string(path)?;
        let (fm, body) = FrontMatter::parse(&content)?;

        let file_modified = fs::metadata(path)?
            .modified()
            .ok()
            .map(chrono::DateTime::<Local>::from);

        let date = fm
            .parse_date()
            .unwrap_or_else(|| file_modified.unwrap_or_else(Local::now));

        let stem = file_stem(path);
        let title = fm.title.clone().unwrap_or_else(|| stem.clone());

        // The file name, not the title, decides the URL unless front-matter overrides it
        let slug = fm
            .slug
            .as_deref()
            .map(slug::slugify)
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| slug::slugify(&stem));

        let mut post = Post::new(title, date, self.relative_source(path));
        post.lastmod = fm.parse_lastmod();
        post.raw = body.to_string();
        post.content = self.renderer.render(body)?;
        post.summary = fm.summary;
        post.tags = fm.tags;
        post.draft = fm.draft;
        post.layout = fm.layout.unwrap_or_else(|| "post".to_string());
        post.full_source = path.to_path_buf();
        post.path = format!("{}/{}/", POSTS_DIR, slug);
        post.permalink = full_url_for(&self.site.config, &post.path);
        post.slug = slug;
        post.extra = fm.extra;

        Ok(post)
    }

    /// Load all standalone pages
    pub fn load_pages(&self) -> Result<Vec<Page>> {
        let pages_dir = self.site.content_dir.join(PAGES_DIR);
        let pages = markdown_files(&pages_dir)
            .filter_map(|path| match self.load_page(&pages_dir, &path) {
                Ok(page) => Some(page),
                Err(e) => {
                    tracing::warn!("Failed to load page {:?}: {}", path, e);
                    None
                }
            })
            .collect();

        Ok(pages)
    }

    /// Load a single page from a file
    fn load_page(&self, pages_dir: &Path, path: &Path) -> Result<Page> {
        let content = fs::read_to_string(path)?;
        let (fm, body) = FrontMatter::parse(&content)?;

        let date = fm.parse_date().unwrap_or_else(Local::now);
        let title = fm.title.clone().unwrap_or_else(|| file_stem(path));

        // pages/about.md -> about/, pages/projects/index.md -> projects/
        let relative = path.strip_prefix(pages_dir).unwrap_or(path).with_extension("");
        let mut segments: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().to_string())
            .collect();
        if segments.last().map(String::as_str) == Some("index") {
            segments.pop();
        }
        let page_path = if segments.is_empty() {
            String::new()
        } else {
            format!("{}/", segments.join("/"))
        };

        let mut page = Page::new(title, date, self.relative_source(path));
        page.raw = body.to_string();
        page.content = self.renderer.render(body)?;
        page.layout = fm.layout.unwrap_or_else(|| "page".to_string());
        page.full_source = path.to_path_buf();
        page.permalink = full_url_for(&self.site.config, &page_path);
        page.path = page_path;
        page.extra = fm.extra;

        Ok(page)
    }

    fn relative_source(&self, path: &Path) -> String {
        path.strip_prefix(&self.site.content_dir)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/")
    }
}

/// Markdown files under a directory, in a stable order
fn markdown_files(dir: &Path) -> impl Iterator<Item = std::path::PathBuf> {
    WalkDir::new(dir)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && is_markdown_file(e.path()))
        .map(|e| e.into_path())
}

/// Check if a file is a markdown file
pub fn is_markdown_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| matches!(e, "md" | "markdown" | "mdx"))
        .unwrap_or(false)
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("untitled")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn site_with(files: &[(&str, &str)]) -> (TempDir, Site) {
        let dir = tempfile::tempdir().unwrap();
        for (path, content) in files {
            let full = dir.path().join("data").join(path);
            fs::create_dir_all(full.parent().unwrap()).unwrap();
            fs::write(full, content).unwrap();
        }
        let site = Site::new(dir.path()).unwrap();
        (dir, site)
    }

    #[test]
    fn test_load_posts_sorted_and_slugged() {
        let (_dir, site) = site_with(&[
            (
                "blog/old-post.md",
                "---\ntitle: 旧文章\ndate: 2023-01-01\ntags: [生活]\n---\nold",
            ),
            (
                "blog/new-post.md",
                "---\ntitle: New\ndate: 2024-06-01\ntags: [Rust, Web Dev]\ndraft: true\n---\nnew",
            ),
            ("blog/notes.txt", "not markdown"),
        ]);
        let posts = ContentLoader::new(&site).load_posts().unwrap();

        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].title, "New");
        assert!(posts[0].draft);
        assert_eq!(posts[0].path, "blog/new-post/");
        assert_eq!(posts[0].permalink, "https://whitemeta.cn/blog/new-post/");
        assert_eq!(posts[1].slug, "old-post");
        assert_eq!(posts[1].source, "blog/old-post.md");
        assert_eq!(posts[1].tags, vec!["生活"]);
    }

    #[test]
    fn test_frontmatter_slug_overrides_filename() {
        let (_dir, site) = site_with(&[(
            "blog/2024-01-01.md",
            "---\ntitle: x\nslug: Hello There\n---\nbody",
        )]);
        let posts = ContentLoader::new(&site).load_posts().unwrap();
        assert_eq!(posts[0].path, "blog/hello-there/");
    }

    #[test]
    fn test_broken_post_is_skipped() {
        let (_dir, site) = site_with(&[
            ("blog/good.md", "---\ntitle: good\n---\nbody"),
            ("blog/bad.md", "---\ntitle: [oops\n---\nbody"),
        ]);
        let posts = ContentLoader::new(&site).load_posts().unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].title, "good");
    }

    #[test]
    fn test_numeric_tags_do_not_drop_post() {
        let (_dir, site) = site_with(&[(
            "blog/year.md",
            "---\ntitle: 2024\ntags: [2024, rust]\n---\n年终总结",
        )]);
        let posts = ContentLoader::new(&site).load_posts().unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].title, "2024");
        assert_eq!(posts[0].tags, vec!["2024", "rust"]);
    }

    #[test]
    fn test_load_pages_paths() {
        let (_dir, site) = site_with(&[
            ("pages/about.md", "---\ntitle: 关于\nlayout: about\n---\nme"),
            ("pages/projects/index.md", "---\ntitle: Projects\n---\nlist"),
        ]);
        let mut pages = ContentLoader::new(&site).load_pages().unwrap();
        pages.sort_by(|a, b| a.path.cmp(&b.path));

        assert_eq!(pages[0].path, "about/");
        assert_eq!(pages[0].layout, "about");
        assert_eq!(pages[1].path, "projects/");
    }

    #[test]
    fn test_missing_dirs_yield_nothing() {
        let (_dir, site) = site_with(&[]);
        let loader = ContentLoader::new(&site);
        assert!(loader.load_posts().unwrap().is_empty());
        assert!(loader.load_pages().unwrap().is_empty());
    }
}
