use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::routing::post;
use axum::{Json, Router};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::Utc;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};

use crate::cloudinary::UploadRequest;
use crate::error::AppError;
use crate::models::image::{parse_tags_csv, ImageRecord};
use crate::AppState;

const ALLOWED_MIME_TYPES: &[&str] = &["image/jpeg", "image/png", "image/gif", "image/webp"];

const MAX_UPLOAD_SIZE: usize = 10 * 1024 * 1024; // 10 MB

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/upload", post(upload))
        .route_layer(DefaultBodyLimit::max(MAX_UPLOAD_SIZE))
}

/// Inline data-URI form of the file, safe to carry in a form field.
fn to_data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", BASE64.encode(bytes))
}

fn encode_component(value: &str) -> String {
    utf8_percent_encode(value, NON_ALPHANUMERIC).to_string()
}

/// Metadata string attached alongside the native fields, so title and tags
/// survive even if the native fields are stripped downstream. Values are
/// percent-encoded; the query side decodes them on extraction.
fn build_context(title: &str, tags_csv: &str) -> String {
    let title = encode_component(title);
    let tags = encode_component(tags_csv);
    format!("alt={title}|title={title}|tags={tags}")
}

async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ImageRecord>, AppError> {
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut title = String::new();
    let mut tags_csv = String::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart data: {e}")))?
    {
        let field_name = field.name().unwrap_or_default().to_string();

        match field_name.as_str() {
            "image" => {
                let mime = field
                    .content_type()
                    .ok_or_else(|| AppError::BadRequest("Image missing content type".into()))?
                    .to_string();

                if !ALLOWED_MIME_TYPES.contains(&mime.as_str()) {
                    return Err(AppError::BadRequest(format!(
                        "Unsupported image type: {mime}"
                    )));
                }

                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Failed to read image: {e}")))?;

                file = Some((mime, bytes.to_vec()));
            }
            "title" => {
                title = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Failed to read title: {e}")))?;
            }
            "tags" => {
                tags_csv = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Failed to read tags: {e}")))?;
            }
            _ => {}
        }
    }

    // Validated before any backend call is made.
    let (mime, bytes) = file.ok_or_else(|| AppError::BadRequest("No image provided".into()))?;

    let title = title.trim().to_string();
    let tags = parse_tags_csv(&tags_csv);

    let request = UploadRequest {
        data_uri: to_data_uri(&mime, &bytes),
        folder: state.folder.clone(),
        public_id: Utc::now().timestamp_millis().to_string(),
        tags: tags.clone(),
        context: build_context(&title, tags_csv.trim()),
    };

    let uploaded = state.media.upload(request).await?;
    tracing::info!(public_id = %uploaded.public_id, "image uploaded");

    // The backend response merged with the submitted metadata.
    let mut record = uploaded.into_record();
    record.title = title;
    record.tags = tags;
    record.created_at = Some(Utc::now());

    Ok(Json(record))
}
