//! List site content

use anyhow::{bail, Result};

use crate::content::loader::ContentLoader;
use crate::generator::TAG_DATA_FILE;
use crate::tags::{self, TagCounts};
use crate::Site;

/// List site content by type
pub fn run(site: &Site, content_type: &str) -> Result<()> {
    let loader = ContentLoader::new(site);

    match content_type {
        "post" | "posts" => {
            let posts = loader.load_posts()?;
            println!("Posts ({}):", posts.len());
            for post in posts {
                println!(
                    "  {} - {}{} [{}]",
                    post.date.format("%Y-%m-%d"),
                    post.title,
                    if post.draft { " (draft)" } else { "" },
                    post.source
                );
            }
        }
        "page" | "pages" => {
            let pages = loader.load_pages()?;
            println!("Pages ({}):", pages.len());
            for page in pages {
                println!("  {} [{}]", page.title, page.source);
            }
        }
        "tag" | "tags" => {
            let counts = tag_counts(site, &loader)?;
            let ranked = tags::ranked_tags(&site.config, &counts);
            println!("Tags ({}):", ranked.len());
            for tag in ranked {
                match tag.href {
                    Some(href) => println!("  {} ({}) -> {}", tag.name, tag.count, href),
                    None => println!("  {} ({})", tag.name, tag.count),
                }
            }
        }
        _ => {
            bail!("Unknown type: {}. Available: post, page, tag", content_type);
        }
    }

    Ok(())
}

/// Counts from the last build's `tag-data.json`, or fresh from the posts
fn tag_counts(site: &Site, loader: &ContentLoader) -> Result<TagCounts> {
    let data_file = site.public_dir.join(TAG_DATA_FILE);
    if data_file.exists() {
        tracing::debug!("Reading tag counts from {:?}", data_file);
        return TagCounts::load(data_file);
    }
    Ok(tags::count_tags(&loader.load_posts()?))
}
