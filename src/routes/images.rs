use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::image::{ImageRecord, RawResource};
use crate::AppState;

const DEFAULT_PAGE_SIZE: i64 = 12;
const MAX_PAGE_SIZE: i64 = 100;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/images", get(list_images).delete(delete_image))
}

#[derive(Debug, Deserialize)]
struct ListImagesParams {
    page: Option<i64>,
    limit: Option<i64>,
    search: Option<String>,
    next_cursor: Option<String>,
}

#[derive(Debug, Serialize)]
struct ImageListResponse {
    images: Vec<ImageRecord>,
    next_cursor: Option<String>,
    total_count: u64,
}

fn normalize_page(page: Option<i64>) -> i64 {
    page.filter(|p| *p >= 1).unwrap_or(1)
}

fn normalize_limit(limit: Option<i64>) -> u32 {
    limit
        .filter(|l| *l > 0)
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .min(MAX_PAGE_SIZE) as u32
}

/// Build the backend search expression: always scoped to the gallery
/// folder, optionally matching the term against title metadata or tags.
/// The term is quoted, and quotes and backslashes inside it are stripped so
/// it cannot alter the expression structure.
fn search_expression(folder: &str, search: Option<&str>) -> String {
    let term = search.map(str::trim).unwrap_or_default();
    if term.is_empty() {
        return format!("folder:{folder}");
    }

    let term: String = term.chars().filter(|&c| !matches!(c, '"' | '\\')).collect();
    format!("folder:{folder} AND (context.title:\"{term}\" OR tags:\"{term}\")")
}

async fn list_images(
    State(state): State<AppState>,
    Query(params): Query<ListImagesParams>,
) -> Result<Json<ImageListResponse>, AppError> {
    let page = normalize_page(params.page);
    let limit = normalize_limit(params.limit);
    let expression = search_expression(&state.folder, params.search.as_deref());

    // Best-effort probe; never blocks the search.
    match state.media.folder_exists(&state.folder).await {
        Ok(true) => {}
        Ok(false) => tracing::debug!(folder = %state.folder, "gallery folder does not exist yet"),
        Err(e) => tracing::warn!("folder existence check failed: {e}"),
    }

    // Pagination is cursor-driven; page 1 always restarts from the top.
    let cursor = if page > 1 {
        params.next_cursor.as_deref().filter(|c| !c.is_empty())
    } else {
        None
    };

    let result = match state.media.search(&expression, limit, cursor).await {
        Ok(result) => result,
        Err(e) => {
            // Diagnostic only; the search error is what the caller sees.
            match state.media.ping().await {
                Ok(()) => tracing::info!("media API is reachable despite the search failure"),
                Err(ping_err) => tracing::error!("media API ping failed: {ping_err}"),
            }
            return Err(e);
        }
    };

    Ok(Json(ImageListResponse {
        images: result
            .resources
            .into_iter()
            .map(RawResource::into_record)
            .collect(),
        next_cursor: result.next_cursor,
        total_count: result.total_count,
    }))
}

#[derive(Debug, Deserialize)]
struct DeleteImageRequest {
    public_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct DeleteImageResponse {
    success: bool,
    message: String,
}

/// Map the backend's destroy discriminator to a response. Anything other
/// than "ok" (including "not found") is a reported failure.
fn destroy_outcome(result: String) -> Result<DeleteImageResponse, AppError> {
    if result != "ok" {
        return Err(AppError::Backend(format!("failed to delete image: {result}")));
    }

    Ok(DeleteImageResponse {
        success: true,
        message: "Image deleted successfully".into(),
    })
}

async fn delete_image(
    State(state): State<AppState>,
    Json(body): Json<DeleteImageRequest>,
) -> Result<Json<DeleteImageResponse>, AppError> {
    let public_id = body.public_id.as_deref().map(str::trim).unwrap_or_default();
    if public_id.is_empty() {
        return Err(AppError::BadRequest("Public ID is required".into()));
    }

    let result = state.media.destroy(public_id).await?;
    Ok(Json(destroy_outcome(result)?))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use super::*;
    use crate::cloudinary::MediaClient;
    use crate::config::Config;

    /// State whose media client points at an unroutable address, so any
    /// handler that reaches for the network fails with a 502 instead of the
    /// expected validation response.
    fn test_state() -> AppState {
        let config = Config {
            cloud_name: "demo".into(),
            api_key: "key".into(),
            api_secret: "secret".into(),
            api_base: Some("http://127.0.0.1:1".into()),
            folder: "image_gallery".into(),
            host: "127.0.0.1".into(),
            port: 0,
            static_dir: None,
        };

        AppState {
            media: MediaClient::new(&config),
            folder: config.folder,
        }
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn page_defaults_to_one_on_missing_or_invalid() {
        assert_eq!(normalize_page(None), 1);
        assert_eq!(normalize_page(Some(0)), 1);
        assert_eq!(normalize_page(Some(-3)), 1);
        assert_eq!(normalize_page(Some(4)), 4);
    }

    #[test]
    fn limit_defaults_and_caps() {
        assert_eq!(normalize_limit(None), 12);
        assert_eq!(normalize_limit(Some(0)), 12);
        assert_eq!(normalize_limit(Some(-1)), 12);
        assert_eq!(normalize_limit(Some(30)), 30);
        assert_eq!(normalize_limit(Some(5000)), 100);
    }

    #[test]
    fn expression_without_a_term_is_folder_scoped_only() {
        assert_eq!(search_expression("image_gallery", None), "folder:image_gallery");
        assert_eq!(search_expression("image_gallery", Some("")), "folder:image_gallery");
        assert_eq!(search_expression("image_gallery", Some("   ")), "folder:image_gallery");
    }

    #[test]
    fn expression_with_a_term_matches_title_or_tags() {
        assert_eq!(
            search_expression("image_gallery", Some("sunset")),
            "folder:image_gallery AND (context.title:\"sunset\" OR tags:\"sunset\")"
        );
    }

    #[test]
    fn expression_strips_quotes_and_backslashes_from_the_term() {
        assert_eq!(
            search_expression("image_gallery", Some("a\"b\\c")),
            "folder:image_gallery AND (context.title:\"abc\" OR tags:\"abc\")"
        );
    }

    #[test]
    fn destroying_a_nonexistent_image_is_a_reported_failure() {
        let err = destroy_outcome("not found".to_string()).unwrap_err();
        assert!(matches!(err, AppError::Backend(ref msg) if msg.contains("not found")));
    }

    #[test]
    fn destroy_ok_reports_success() {
        let response = destroy_outcome("ok".to_string()).unwrap();
        assert!(response.success);
        assert_eq!(response.message, "Image deleted successfully");
    }

    #[tokio::test]
    async fn delete_without_a_public_id_is_rejected() {
        let app = router().with_state(test_state());

        let request = Request::builder()
            .method("DELETE")
            .uri("/api/images")
            .header("content-type", "application/json")
            .body(Body::from("{}"))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "Public ID is required");
    }

    #[tokio::test]
    async fn delete_with_a_blank_public_id_is_rejected() {
        let app = router().with_state(test_state());

        let request = Request::builder()
            .method("DELETE")
            .uri("/api/images")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"public_id": "   "}"#))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "Public ID is required");
    }
}
