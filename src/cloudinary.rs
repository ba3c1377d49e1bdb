use std::collections::BTreeMap;

use chrono::Utc;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde::Deserialize;
use serde_json::json;
use sha1::{Digest, Sha1};

use crate::config::Config;
use crate::error::AppError;
use crate::models::image::RawResource;

const DEFAULT_API_BASE: &str = "https://api.cloudinary.com/v1_1";

/// Characters that must not appear raw in a URL path segment.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'\\')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

fn encode_path_segment(segment: &str) -> String {
    utf8_percent_encode(segment, PATH_SEGMENT).to_string()
}

/// Client for the hosted media API. Constructed once at startup and shared
/// through application state; all credentials live here.
#[derive(Clone)]
pub struct MediaClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    api_secret: String,
}

#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub resources: Vec<RawResource>,
    pub next_cursor: Option<String>,
    #[serde(default)]
    pub total_count: u64,
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: String,
}

pub struct UploadRequest {
    pub data_uri: String,
    pub folder: String,
    pub public_id: String,
    pub tags: Vec<String>,
    pub context: String,
}

impl MediaClient {
    pub fn new(config: &Config) -> Self {
        let base = config
            .api_base
            .as_deref()
            .unwrap_or(DEFAULT_API_BASE)
            .trim_end_matches('/');

        Self {
            http: reqwest::Client::new(),
            base_url: format!("{base}/{}", config.cloud_name),
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
        }
    }

    /// Expression search over stored images, newest first, with context and
    /// tag fields included. `next_cursor` fetches the page after a previous
    /// response.
    pub async fn search(
        &self,
        expression: &str,
        max_results: u32,
        next_cursor: Option<&str>,
    ) -> Result<SearchResponse, AppError> {
        let mut body = json!({
            "expression": expression,
            "max_results": max_results,
            "sort_by": [{ "created_at": "desc" }],
            "with_field": ["context", "tags"],
        });
        if let Some(cursor) = next_cursor {
            body["next_cursor"] = json!(cursor);
        }

        let response = self
            .http
            .post(format!("{}/resources/search", self.base_url))
            .basic_auth(&self.api_key, Some(&self.api_secret))
            .json(&body)
            .send()
            .await?;

        Self::parse(response).await
    }

    /// Upload an inline-encoded image with its metadata. The request is
    /// signed over the alphabetically ordered parameters.
    pub async fn upload(&self, request: UploadRequest) -> Result<RawResource, AppError> {
        let tags = request.tags.join(",");

        let mut params = BTreeMap::new();
        params.insert("context", request.context);
        params.insert("folder", request.folder);
        params.insert("public_id", request.public_id);
        if !tags.is_empty() {
            params.insert("tags", tags);
        }
        params.insert("timestamp", Utc::now().timestamp().to_string());

        let signature = self.sign(&params);

        let mut form: Vec<(&str, String)> = params.into_iter().collect();
        form.push(("file", request.data_uri));
        form.push(("api_key", self.api_key.clone()));
        form.push(("signature", signature));

        let response = self
            .http
            .post(format!("{}/image/upload", self.base_url))
            .form(&form)
            .send()
            .await?;

        Self::parse(response).await
    }

    /// Destroy a stored image. Returns the backend's result discriminator
    /// ("ok", "not found", ...); the caller decides what counts as success.
    pub async fn destroy(&self, public_id: &str) -> Result<String, AppError> {
        let mut params = BTreeMap::new();
        params.insert("public_id", public_id.to_string());
        params.insert("timestamp", Utc::now().timestamp().to_string());

        let signature = self.sign(&params);

        let mut form: Vec<(&str, String)> = params.into_iter().collect();
        form.push(("api_key", self.api_key.clone()));
        form.push(("signature", signature));

        let response = self
            .http
            .post(format!("{}/image/destroy", self.base_url))
            .form(&form)
            .send()
            .await?;

        let parsed: DestroyResponse = Self::parse(response).await?;
        Ok(parsed.result)
    }

    /// Health check against the admin API. Diagnostic only.
    pub async fn ping(&self) -> Result<(), AppError> {
        let response = self
            .http
            .get(format!("{}/ping", self.base_url))
            .basic_auth(&self.api_key, Some(&self.api_secret))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(AppError::Backend(format!("ping returned {status}")))
        }
    }

    /// Whether the hosting folder exists. Callers treat this as best-effort.
    pub async fn folder_exists(&self, folder: &str) -> Result<bool, AppError> {
        let folder = encode_path_segment(folder);
        let response = self
            .http
            .get(format!("{}/folders/{folder}", self.base_url))
            .basic_auth(&self.api_key, Some(&self.api_secret))
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(false);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Backend(backend_message(status, &body)));
        }
        Ok(true)
    }

    fn sign(&self, params: &BTreeMap<&str, String>) -> String {
        sha1_hex(&signing_payload(params, &self.api_secret))
    }

    async fn parse<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, AppError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Backend(backend_message(status, &body)));
        }
        Ok(response.json().await?)
    }
}

/// Alphabetically ordered `key=value` pairs joined with `&`, with the API
/// secret appended. The BTreeMap provides the ordering.
fn signing_payload(params: &BTreeMap<&str, String>, secret: &str) -> String {
    let joined = params
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");
    format!("{joined}{secret}")
}

fn sha1_hex(payload: &str) -> String {
    Sha1::digest(payload.as_bytes())
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

/// Pull the human-readable message out of an API error body, which looks
/// like `{"error": {"message": "..."}}`.
fn backend_message(status: reqwest::StatusCode, body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.pointer("/error/message").and_then(|m| m.as_str().map(String::from)))
        .unwrap_or_else(|| format!("request failed with status {status}"))
}
