//! Bilibili video embeds
//!
//! Posts embed a video with a component-style shortcode:
//!
//! ```text
//! <BVideo bvid="BV1xx411c7mD" width="100%" height="400" className="my-4" />
//! ```
//!
//! which [`expand_shortcodes`] turns into the player iframe when the Markdown
//! renderer meets it as raw HTML. Templates can call the `bilibili` function
//! instead.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;
use std::fmt;

use crate::helpers::html_escape;

/// Player endpoint, parameterized by the video's BV id
const PLAYER_URL: &str = "//player.bilibili.com/player.html";

lazy_static! {
    static ref SHORTCODE_RE: Regex = Regex::new(r"<BVideo\b([^>]*?)/?>(?:\s*</BVideo>)?").unwrap();
    static ref ATTR_RE: Regex =
        Regex::new(r#"([A-Za-z][A-Za-z0-9_-]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|\{\s*([^}]*?)\s*\})"#)
            .unwrap();
}

/// Width or height of the player
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dimension {
    /// Plain pixel count, e.g. `400`
    Pixels(u32),
    /// Any CSS-ish length, e.g. `100%`
    Css(String),
}

impl Dimension {
    /// Numbers become pixels; everything else is kept verbatim
    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        match s.parse::<u32>() {
            Ok(px) => Dimension::Pixels(px),
            Err(_) => Dimension::Css(s.to_string()),
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dimension::Pixels(px) => write!(f, "{}", px),
            Dimension::Css(s) => f.write_str(s),
        }
    }
}

impl From<u32> for Dimension {
    fn from(px: u32) -> Self {
        Dimension::Pixels(px)
    }
}

impl From<&str> for Dimension {
    fn from(s: &str) -> Self {
        Dimension::parse(s)
    }
}

/// An embeddable Bilibili player
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BilibiliVideo {
    /// BV id of the video. Not validated.
    pub bvid: String,
    pub width: Dimension,
    pub height: Dimension,
    /// Extra classes for the wrapping container
    pub class_name: String,
}

impl BilibiliVideo {
    pub fn new(bvid: impl Into<String>) -> Self {
        Self {
            bvid: bvid.into(),
            width: Dimension::Css("100%".to_string()),
            height: Dimension::Pixels(400),
            class_name: String::new(),
        }
    }

    pub fn width(mut self, width: impl Into<Dimension>) -> Self {
        self.width = width.into();
        self
    }

    pub fn height(mut self, height: impl Into<Dimension>) -> Self {
        self.height = height.into();
        self
    }

    pub fn class_name(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = class_name.into();
        self
    }

    /// Protocol-relative player URL
    pub fn player_url(&self) -> String {
        format!("{}?bvid={}&autoplay=0&page=1", PLAYER_URL, self.bvid)
    }

    /// Player markup: a container div wrapping the iframe
    pub fn to_html(&self) -> String {
        format!(
            concat!(
                r#"<div class="bilibili-video-container {class}">"#,
                r#"<iframe src="{src}" scrolling="no" width="{width}" height="{height}" "#,
                r#"frameborder="no" allowfullscreen="true" title="B站视频 {title}"></iframe>"#,
                "</div>"
            ),
            class = html_escape(&self.class_name),
            src = html_escape(&self.player_url()),
            width = html_escape(&self.width.to_string()),
            height = html_escape(&self.height.to_string()),
            title = html_escape(&self.bvid),
        )
    }

    /// Build from shortcode attributes; `None` without a `bvid`
    pub fn from_attributes(attrs: &HashMap<String, String>) -> Option<Self> {
        let bvid = attrs.get("bvid")?;
        let mut video = BilibiliVideo::new(bvid.as_str());
        if let Some(width) = attrs.get("width") {
            video = video.width(width.as_str());
        }
        if let Some(height) = attrs.get("height") {
            video = video.height(height.as_str());
        }
        if let Some(class) = attrs.get("className").or_else(|| attrs.get("class")) {
            video = video.class_name(class.as_str());
        }
        Some(video)
    }
}

fn parse_attributes(s: &str) -> HashMap<String, String> {
    ATTR_RE
        .captures_iter(s)
        .filter_map(|caps| {
            let value = caps.get(2).or(caps.get(3)).or(caps.get(4))?;
            let value = value.as_str().trim_matches(|c| c == '"' || c == '\'');
            Some((caps[1].to_string(), value.to_string()))
        })
        .collect()
}

/// Replace every `<BVideo .../>` shortcode in an HTML fragment with player markup
///
/// A shortcode without `bvid` is left untouched.
pub fn expand_shortcodes(markdown: &str) -> String {
    SHORTCODE_RE
        .replace_all(markdown, |caps: &regex::Captures| {
            let attrs = parse_attributes(&caps[1]);
            match BilibiliVideo::from_attributes(&attrs) {
                Some(video) => video.to_html(),
                None => {
                    tracing::warn!("BVideo shortcode without bvid: {}", &caps[0]);
                    caps[0].to_string()
                }
            }
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_url() {
        let video = BilibiliVideo::new("BV1xx411c7mD");
        assert_eq!(
            video.player_url(),
            "//player.bilibili.com/player.html?bvid=BV1xx411c7mD&autoplay=0&page=1"
        );
    }

    #[test]
    fn test_default_markup() {
        let html = BilibiliVideo::new("BV1xx411c7mD").to_html();
        assert!(html.starts_with(r#"<div class="bilibili-video-container ">"#));
        assert!(html.contains(r#"width="100%""#));
        assert!(html.contains(r#"height="400""#));
        assert!(html.contains(r#"scrolling="no""#));
        assert!(html.contains(r#"frameborder="no""#));
        assert!(html.contains("allowfullscreen"));
        assert!(html.contains(r#"title="B站视频 BV1xx411c7mD""#));
        assert!(html.contains("bvid=BV1xx411c7mD&amp;autoplay=0&amp;page=1"));
    }

    #[test]
    fn test_custom_dimensions() {
        let html = BilibiliVideo::new("BV1")
            .width(640)
            .height("50vh")
            .class_name("my-4")
            .to_html();
        assert!(html.contains(r#"width="640""#));
        assert!(html.contains(r#"height="50vh""#));
        assert!(html.contains("bilibili-video-container my-4"));
    }

    #[test]
    fn test_bvid_is_escaped_not_validated() {
        let html = BilibiliVideo::new(r#"x"><script>"#).to_html();
        assert!(!html.contains("<script>"));
        assert!(html.contains("&quot;&gt;&lt;script&gt;"));
    }

    #[test]
    fn test_dimension_parse() {
        assert_eq!(Dimension::parse("400"), Dimension::Pixels(400));
        assert_eq!(Dimension::parse("100%"), Dimension::Css("100%".to_string()));
    }

    #[test]
    fn test_expand_shortcodes() {
        let md = r#"看这个视频：

<BVideo bvid="BV1ab" width={640} height='360' className="rounded" />

完。"#;
        let out = expand_shortcodes(md);
        assert!(!out.contains("<BVideo"));
        assert!(out.contains(r#"width="640""#));
        assert!(out.contains(r#"height="360""#));
        assert!(out.contains("bilibili-video-container rounded"));
        assert!(out.contains("完。"));
    }

    #[test]
    fn test_expand_shortcode_with_closing_tag() {
        let out = expand_shortcodes(r#"<BVideo bvid="BV2"></BVideo>"#);
        assert!(out.contains("bvid=BV2"));
        assert!(!out.contains("</BVideo>"));
    }

    #[test]
    fn test_shortcode_without_bvid_is_kept() {
        let md = r#"<BVideo width="10" />"#;
        assert_eq!(expand_shortcodes(md), md);
    }
}
