//! Generate static files

use anyhow::Result;
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use notify_debouncer_mini::{new_debouncer, DebounceEventResult, Debouncer};
use std::path::Path;
use std::sync::mpsc::{channel, Receiver};
use std::time::{Duration, Instant};

use crate::content::loader::ContentLoader;
use crate::generator::{GenerateReport, Generator, STATIC_DIR};
use crate::{Site, CONFIG_FILE};

/// Quiet period that closes a batch of file changes
const DEBOUNCE: Duration = Duration::from_millis(500);

/// Load all content and generate the site
pub fn run(site: &Site) -> Result<()> {
    build(site).map(|_| ())
}

/// Load all content, generate the site, and report what was written
pub fn build(site: &Site) -> Result<GenerateReport> {
    let start = Instant::now();

    let loader = ContentLoader::new(site);
    let posts = loader.load_posts()?;
    let pages = loader.load_pages()?;
    tracing::info!("Loaded {} posts and {} pages", posts.len(), pages.len());

    let generator = Generator::new(site)?;
    let report = generator.generate(&posts, &pages)?;

    tracing::info!(
        "Generated {} posts, {} pages and {} tag pages in {:.2}s",
        report.posts,
        report.pages,
        report.tags,
        start.elapsed().as_secs_f64()
    );

    Ok(report)
}

/// Watches a site's sources and regenerates after each burst of changes
///
/// Metadata is read once at startup; edits to it require a restart.
pub struct SiteWatcher {
    site: Site,
    // Dropping the debouncer stops the watch
    _debouncer: Debouncer<RecommendedWatcher>,
    rx: Receiver<DebounceEventResult>,
}

impl SiteWatcher {
    /// Start watching the content dir, `static/` and the metadata file
    pub fn new(site: &Site) -> Result<Self> {
        let (tx, rx) = channel();
        let mut debouncer = new_debouncer(DEBOUNCE, tx)?;

        let static_dir = site.base_dir.join(STATIC_DIR);
        for dir in [&site.content_dir, &static_dir] {
            if dir.exists() {
                debouncer.watcher().watch(dir, RecursiveMode::Recursive)?;
                tracing::debug!("Watching: {:?}", dir);
            }
        }
        let config_path = site.base_dir.join(CONFIG_FILE);
        if config_path.exists() {
            debouncer
                .watcher()
                .watch(&config_path, RecursiveMode::NonRecursive)?;
        }

        Ok(Self {
            site: site.clone(),
            _debouncer: debouncer,
            rx,
        })
    }

    /// Block, regenerating once per debounced batch of changes
    ///
    /// `on_rebuild` sees each generation result and returns `false` to stop.
    pub fn run(self, mut on_rebuild: impl FnMut(&Result<()>) -> bool) -> Result<()> {
        for result in &self.rx {
            let events = match result {
                Ok(events) => events,
                Err(e) => {
                    tracing::error!("Watch error: {:?}", e);
                    continue;
                }
            };

            let changed: Vec<&Path> = events
                .iter()
                .map(|e| e.path.as_path())
                .filter(|p| is_relevant(p))
                .collect();
            if changed.is_empty() {
                continue;
            }
            for path in &changed {
                tracing::info!("Changed: {}", path.display());
                if path.ends_with(CONFIG_FILE) {
                    tracing::warn!("{} changed; restart to pick up new metadata", CONFIG_FILE);
                }
            }

            let result = run(&self.site);
            if let Err(e) = &result {
                tracing::error!("Generation failed: {}", e);
            }
            if !on_rebuild(&result) {
                break;
            }
        }

        Ok(())
    }
}

/// Editor and VCS noise that should not trigger a rebuild
pub fn is_relevant(path: &Path) -> bool {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy())
        .unwrap_or_default();
    !(path.components().any(|c| c.as_os_str() == ".git")
        || name == ".DS_Store"
        || name.ends_with('~')
        || name.ends_with(".swp"))
}

/// Regenerate on every change until interrupted
pub async fn watch(site: &Site) -> Result<()> {
    let watcher = SiteWatcher::new(site)?;
    tracing::info!("Watching for changes. Press Ctrl+C to stop.");
    tokio::task::spawn_blocking(move || watcher.run(|_| true)).await?
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_build_empty_site() {
        let dir = tempfile::tempdir().unwrap();
        let site = Site::new(dir.path()).unwrap();

        let report = build(&site).unwrap();
        assert_eq!(report, GenerateReport::default());
        assert!(site.public_dir.join("index.html").exists());
        assert_eq!(
            fs::read_to_string(site.public_dir.join("tag-data.json")).unwrap(),
            "{}"
        );
    }

    #[test]
    fn test_is_relevant() {
        assert!(is_relevant(Path::new("data/blog/post.md")));
        assert!(!is_relevant(Path::new("data/.git/HEAD")));
        assert!(!is_relevant(Path::new("data/blog/post.md~")));
        assert!(!is_relevant(Path::new("data/blog/.post.md.swp")));
    }

    #[test]
    fn test_watcher_rebuilds_after_trailing_write() {
        let dir = tempfile::tempdir().unwrap();
        let post = dir.path().join("data/blog/live.md");
        fs::create_dir_all(post.parent().unwrap()).unwrap();
        fs::write(&post, "---\ntitle: Draft One\n---\nbody").unwrap();
        let site = Site::new(dir.path()).unwrap();

        let watcher = SiteWatcher::new(&site).unwrap();
        let (done_tx, done_rx) = channel();
        let index = site.public_dir.join("blog/live/index.html");
        std::thread::spawn(move || {
            watcher
                .run(|_| {
                    let html = fs::read_to_string(&index).unwrap_or_default();
                    if html.contains("Final Title") {
                        let _ = done_tx.send(());
                        return false;
                    }
                    true
                })
                .unwrap();
        });

        // Truncate-then-write, the way many editors save
        fs::write(&post, "").unwrap();
        fs::write(&post, "---\ntitle: Final Title\n---\nbody").unwrap();

        assert!(done_rx.recv_timeout(Duration::from_secs(10)).is_ok());
    }
}
