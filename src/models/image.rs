use std::collections::HashMap;

use chrono::{DateTime, Utc};
use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};

/// A stored image as the media backend returns it, before normalization.
/// `context` holds the free-form metadata attached at upload time; its
/// values are percent-encoded by our upload path.
#[derive(Debug, Clone, Deserialize)]
pub struct RawResource {
    pub public_id: String,
    #[serde(default)]
    pub secure_url: String,
    pub created_at: Option<DateTime<Utc>>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub format: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_context")]
    pub context: HashMap<String, String>,
}

/// The search API returns context as a flat string map, while the upload
/// API nests the same pairs under a `custom` key. Accept both shapes,
/// keeping string values only.
fn deserialize_context<'de, D>(deserializer: D) -> Result<HashMap<String, String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(flatten_context(value))
}

fn flatten_context(value: serde_json::Value) -> HashMap<String, String> {
    let serde_json::Value::Object(mut map) = value else {
        return HashMap::new();
    };

    if let Some(serde_json::Value::Object(custom)) = map.remove("custom") {
        map = custom;
    }

    map.into_iter()
        .filter_map(|(k, v)| match v {
            serde_json::Value::String(s) => Some((k, s)),
            _ => None,
        })
        .collect()
}

/// The normalized record served to the gallery UI.
#[derive(Debug, Clone, Serialize)]
pub struct ImageRecord {
    pub public_id: String,
    pub secure_url: String,
    pub title: String,
    pub tags: Vec<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub format: Option<String>,
}

impl RawResource {
    pub fn into_record(self) -> ImageRecord {
        let title = extract_title(&self.context);
        let tags = extract_tags(self.tags, &self.context);

        ImageRecord {
            public_id: self.public_id,
            secure_url: self.secure_url,
            title,
            tags,
            created_at: self.created_at,
            width: self.width,
            height: self.height,
            format: self.format,
        }
    }
}

fn decode(value: &str) -> String {
    percent_decode_str(value).decode_utf8_lossy().into_owned()
}

/// Title fallback priority: explicit title, then alt, then caption; first
/// non-empty wins. Title and alt are stored percent-encoded by the upload
/// path; caption may be written raw by other clients and is taken verbatim.
pub fn extract_title(context: &HashMap<String, String>) -> String {
    if let Some(title) = context.get("title").filter(|s| !s.is_empty()) {
        return decode(title);
    }
    if let Some(alt) = context.get("alt").filter(|s| !s.is_empty()) {
        return decode(alt);
    }
    context.get("caption").cloned().unwrap_or_default()
}

/// The native tag list wins when it has any usable entries; otherwise the
/// percent-encoded `tags` context value is decoded and comma-split. Either
/// way the result contains only trimmed, non-empty tags.
pub fn extract_tags(native: Vec<String>, context: &HashMap<String, String>) -> Vec<String> {
    let cleaned: Vec<String> = native
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect();

    if !cleaned.is_empty() {
        return cleaned;
    }

    context
        .get("tags")
        .map(|raw| parse_tags_csv(&decode(raw)))
        .unwrap_or_default()
}

/// Split a comma-separated tag string into trimmed, non-empty tags, keeping
/// the original order.
pub fn parse_tags_csv(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}
