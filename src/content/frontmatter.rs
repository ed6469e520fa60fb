//! Front-matter parsing

use anyhow::Result;
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone};
use serde::{de, Deserialize, Deserializer, Serialize};
use serde_yaml::Value;
use std::collections::HashMap;

/// Text of a YAML scalar; numbers and booleans keep their written form
fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Tagged(tagged) => scalar_to_string(&tagged.value),
        Value::Null | Value::Sequence(_) | Value::Mapping(_) => None,
    }
}

/// Accept `tags: rust`, `tags: 2024` and `tags: [rust, 2024]`
fn scalar_or_seq<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Sequence(items)) => items
            .iter()
            .filter(|item| !item.is_null())
            .map(|item| {
                scalar_to_string(item)
                    .ok_or_else(|| de::Error::custom("tags must be plain values"))
            })
            .collect(),
        Some(value) => scalar_to_string(&value)
            .map(|tag| vec![tag])
            .ok_or_else(|| de::Error::custom("tags must be a value or a list")),
    }
}

/// Accept `title: 2024` as the string "2024"
fn opt_scalar<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(value) => scalar_to_string(&value)
            .map(Some)
            .ok_or_else(|| de::Error::custom("expected a plain value")),
    }
}

/// Front-matter data from a post or page
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct FrontMatter {
    #[serde(deserialize_with = "opt_scalar")]
    pub title: Option<String>,
    pub date: Option<String>,
    #[serde(alias = "updated")]
    pub lastmod: Option<String>,
    #[serde(deserialize_with = "scalar_or_seq")]
    pub tags: Vec<String>,
    pub draft: bool,
    #[serde(deserialize_with = "opt_scalar")]
    pub summary: Option<String>,
    pub layout: Option<String>,
    #[serde(deserialize_with = "opt_scalar")]
    pub slug: Option<String>,

    /// Additional custom fields
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

impl FrontMatter {
    /// Split a document into its front-matter and body
    ///
    /// A document without a `---` fenced header has default front-matter and
    /// is returned whole. A header that is not valid YAML is an error.
    pub fn parse(content: &str) -> Result<(Self, &str)> {
        let trimmed = content.trim_start_matches('\u{feff}').trim_start();

        let Some(rest) = trimmed.strip_prefix("---") else {
            return Ok((FrontMatter::default(), content));
        };
        let rest = rest.trim_start_matches([' ', '\t']);
        let Some(rest) = rest
            .strip_prefix("\r\n")
            .or_else(|| rest.strip_prefix('\n'))
        else {
            return Ok((FrontMatter::default(), content));
        };

        let Some((yaml, body)) = split_closing_fence(rest) else {
            return Ok((FrontMatter::default(), content));
        };

        let fm = if yaml.trim().is_empty() {
            FrontMatter::default()
        } else {
            serde_yaml::from_str(yaml)?
        };

        Ok((fm, body.trim_start_matches(['\n', '\r'])))
    }

    /// Parse the date string into a DateTime
    pub fn parse_date(&self) -> Option<DateTime<Local>> {
        self.date.as_deref().and_then(parse_date_string)
    }

    /// Parse the last modified date string into a DateTime
    pub fn parse_lastmod(&self) -> Option<DateTime<Local>> {
        self.lastmod.as_deref().and_then(parse_date_string)
    }
}

/// Find a line consisting of `---` and split around it
fn split_closing_fence(s: &str) -> Option<(&str, &str)> {
    let mut offset = 0;
    for line in s.split_inclusive('\n') {
        if line.trim_end() == "---" {
            return Some((&s[..offset], &s[offset + line.len()..]));
        }
        offset += line.len();
    }
    None
}

/// Parse a date string in the formats front-matter commonly uses
fn parse_date_string(s: &str) -> Option<DateTime<Local>> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Local));
    }

    const DATETIME_FORMATS: [&str; 5] = [
        "%Y-%m-%d %H:%M:%S",
        "%Y/%m/%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
    ];
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Local.from_local_datetime(&dt).earliest();
        }
    }

    for fmt in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Local.from_local_datetime(&d.and_hms_opt(0, 0, 0)?).earliest();
        }
    }

    None
}
