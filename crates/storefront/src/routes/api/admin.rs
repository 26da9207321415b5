//! Admin JSON API.
//!
//! Every handler takes [`RequireAdminApi`], so a request that slipped past
//! the edge middleware is still gated here.

use axum::{
    Json,
    extract::{
        Multipart, Query, State,
        multipart::MultipartError,
        rejection::QueryRejection,
    },
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

use seamline_core::{IdentityId, OrderStatus};

use crate::db::{NewsletterRepository, OrderRepository};
use crate::error::{AppError, Result};
use crate::middleware::RequireAdminApi;
use crate::models::{Order, Subscriber};
use crate::routes::paging;
use crate::state::AppState;

/// Largest accepted image, in bytes.
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// Request body limit for the upload route (image plus multipart framing).
pub const UPLOAD_BODY_LIMIT: usize = 6 * 1024 * 1024;

const ADMIN_DEFAULT_PER_PAGE: u32 = 50;

/// Accepted image types and the extension stored with each.
const ALLOWED_IMAGE_TYPES: &[(&str, &str)] = &[
    ("image/jpeg", "jpg"),
    ("image/png", "png"),
    ("image/webp", "webp"),
    ("image/gif", "gif"),
];

// =============================================================================
// Session probe
// =============================================================================

/// Session probe response for client route guards.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub authenticated: bool,
    pub identity_id: IdentityId,
    pub email: Option<String>,
    pub expires_at: DateTime<Utc>,
}

/// Report the current admin session.
///
/// GET /api/admin/session
///
/// Denied callers get the gate's `401` before this runs.
#[instrument(skip_all)]
pub async fn session(RequireAdminApi(session): RequireAdminApi) -> Json<SessionResponse> {
    Json(SessionResponse {
        authenticated: true,
        identity_id: session.identity_id(),
        email: session.email().map(String::from),
        expires_at: session.expires_at(),
    })
}

// =============================================================================
// Listings
// =============================================================================

/// Query parameters for the order listing.
#[derive(Debug, Deserialize)]
pub struct OrdersQuery {
    pub status: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// Query parameters for paginated listings.
#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// One page of orders.
#[derive(Debug, Serialize)]
pub struct OrdersResponse {
    pub orders: Vec<Order>,
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
    pub has_more: bool,
}

/// One page of subscribers.
#[derive(Debug, Serialize)]
pub struct SubscribersResponse {
    pub subscribers: Vec<Subscriber>,
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
    pub has_more: bool,
}

/// List orders, newest first.
///
/// GET /api/admin/orders?status=&page=&per_page=
#[instrument(skip_all)]
pub async fn orders(
    State(state): State<AppState>,
    RequireAdminApi(_session): RequireAdminApi,
    query: std::result::Result<Query<OrdersQuery>, QueryRejection>,
) -> Result<Json<OrdersResponse>> {
    let Query(query) = query.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let (page, per_page) = paging(query.page, query.per_page, ADMIN_DEFAULT_PER_PAGE)?;
    let status = match query.status.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(s) => Some(s.parse::<OrderStatus>().map_err(AppError::BadRequest)?),
    };

    let result = OrderRepository::new(state.store())
        .list(status, page, per_page)
        .await?;
    let has_more = result.has_more(page, per_page);

    Ok(Json(OrdersResponse {
        orders: result.items,
        page,
        per_page,
        total: result.total,
        has_more,
    }))
}

/// List newsletter subscribers, newest first.
///
/// GET /api/admin/subscribers?page=&per_page=
#[instrument(skip_all)]
pub async fn subscribers(
    State(state): State<AppState>,
    RequireAdminApi(_session): RequireAdminApi,
    query: std::result::Result<Query<PageQuery>, QueryRejection>,
) -> Result<Json<SubscribersResponse>> {
    let Query(query) = query.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let (page, per_page) = paging(query.page, query.per_page, ADMIN_DEFAULT_PER_PAGE)?;

    let result = NewsletterRepository::new(state.store())
        .list(page, per_page)
        .await?;
    let has_more = result.has_more(page, per_page);

    Ok(Json(SubscribersResponse {
        subscribers: result.items,
        page,
        per_page,
        total: result.total,
        has_more,
    }))
}

// =============================================================================
// Uploads
// =============================================================================

/// Stored image location.
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub url: String,
    pub key: String,
}

fn image_extension(content_type: &str) -> Option<&'static str> {
    ALLOWED_IMAGE_TYPES
        .iter()
        .find(|(mime, _)| *mime == content_type)
        .map(|(_, ext)| *ext)
}

/// Whether `bytes` starts with the file signature of `content_type`.
fn matches_signature(content_type: &str, bytes: &[u8]) -> bool {
    match content_type {
        "image/jpeg" => bytes.starts_with(&[0xFF, 0xD8, 0xFF]),
        "image/png" => bytes.starts_with(b"\x89PNG\r\n\x1a\n"),
        "image/gif" => bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a"),
        "image/webp" => {
            bytes.starts_with(b"RIFF") && bytes.get(8..12) == Some(b"WEBP".as_slice())
        }
        _ => false,
    }
}

/// Object key for a new upload: `{yyyy}/{mm}/{uuid}.{ext}`.
fn object_key(now: DateTime<Utc>, id: Uuid, extension: &str) -> String {
    format!("{}/{id}.{extension}", now.format("%Y/%m"))
}

fn multipart_error(e: &MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(e.body_text())
    } else {
        AppError::BadRequest(e.body_text())
    }
}

/// Upload a product image.
///
/// POST /api/admin/uploads (multipart, field `file`)
#[instrument(skip_all)]
pub async fn upload(
    State(state): State<AppState>,
    RequireAdminApi(session): RequireAdminApi,
    mut multipart: Multipart,
) -> Result<impl IntoResponse> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(&e))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let content_type = field.content_type().unwrap_or_default().to_string();
        let Some(extension) = image_extension(&content_type) else {
            return Err(AppError::UnsupportedMediaType(format!(
                "Unsupported image type: {content_type}"
            )));
        };

        let bytes = field.bytes().await.map_err(|e| multipart_error(&e))?;
        if bytes.len() > MAX_UPLOAD_BYTES {
            return Err(AppError::PayloadTooLarge(
                "Image must be at most 5 MiB".to_string(),
            ));
        }
        if bytes.is_empty() {
            return Err(AppError::BadRequest("Image is empty".to_string()));
        }
        if !matches_signature(&content_type, &bytes) {
            return Err(AppError::UnsupportedMediaType(format!(
                "File content is not {content_type}"
            )));
        }

        let key = object_key(Utc::now(), Uuid::new_v4(), extension);
        let url = state
            .storage()
            .upload(
                &state.config().storage_bucket,
                &key,
                bytes.to_vec(),
                &content_type,
            )
            .await?;

        tracing::info!(
            identity_id = %session.identity_id(),
            key = %key,
            size = bytes.len(),
            "Product image uploaded"
        );
        return Ok((StatusCode::CREATED, Json(UploadResponse { url, key })));
    }

    Err(AppError::BadRequest("file is required".to_string()))
}
