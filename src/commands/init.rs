//! Initialize a new site

use anyhow::{bail, Result};
use std::fs;
use std::path::Path;

use super::new::{PAGE_SCAFFOLD, POST_SCAFFOLD};
use crate::content::loader::{PAGES_DIR, POSTS_DIR};
use crate::{Site, CONFIG_FILE};

const SITE_CONFIG: &str = r#"# Site
title: White-Meta
header_title: White-Meta
author: ''
description: 记录生活 · 技术 · 学习 · 思考
language: zh-CN
locale: zh-CN
theme: system

# URL
site_url: https://whitemeta.cn
site_repo: ''
site_logo: ${BASE_PATH}/static/images/logo.png
social_banner: ${BASE_PATH}/static/images/twitter-card.png
root: /

# Social
email: ''
github: ''
bilibili: https://space.bilibili.com/

# Layout
sticky_nav: false
search:
  provider: kbar
  kbar_config:
    search_documents_path: ${BASE_PATH}/search.json

# Build
content_dir: data
public_dir: public
tag_dir: tags
max_display: 5
"#;

const ABOUT_PAGE: &str = r#"---
title: 关于
layout: about
---

记录生活 · 技术 · 学习 · 思考
"#;

/// Initialize a new site in the given directory
pub fn init_site(target_dir: &Path) -> Result<()> {
    if target_dir.join(CONFIG_FILE).exists() {
        bail!("{:?} already contains a {}", target_dir, CONFIG_FILE);
    }

    let content_dir = target_dir.join("data");
    fs::create_dir_all(content_dir.join(POSTS_DIR))?;
    fs::create_dir_all(content_dir.join(PAGES_DIR))?;
    fs::create_dir_all(target_dir.join("static/images"))?;
    fs::create_dir_all(target_dir.join("scaffolds"))?;

    fs::write(target_dir.join(CONFIG_FILE), SITE_CONFIG)?;
    fs::write(target_dir.join("scaffolds/post.md"), POST_SCAFFOLD)?;
    fs::write(target_dir.join("scaffolds/page.md"), PAGE_SCAFFOLD)?;

    let now = chrono::Local::now();
    let sample_post = format!(
        r#"---
title: Hello World
date: {}
tags: [随笔, Web Dev]
summary: 第一篇文章
---

Welcome! Edit `data/blog/hello-world.md` or run `white-meta new "My New Post"`.

Videos embed with a shortcode:

<BVideo bvid="BV1xx411c7mD" />

Run `white-meta server` to preview the site.
"#,
        now.format("%Y-%m-%d %H:%M:%S")
    );

    fs::write(content_dir.join(POSTS_DIR).join("hello-world.md"), sample_post)?;
    fs::write(content_dir.join(PAGES_DIR).join("about.md"), ABOUT_PAGE)?;

    tracing::info!("Initialized site in {:?}", target_dir);
    Ok(())
}

/// Run the init command for a site's base directory
pub fn run(site: &Site) -> Result<()> {
    init_site(&site.base_dir)
}
