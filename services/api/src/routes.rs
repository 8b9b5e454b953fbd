//! API service routes

use std::time::Instant;

use axum::{
    Extension, Json, Router,
    body::Body,
    extract::{Path, State},
    http::{HeaderValue, Method, Request, StatusCode, Uri, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use chrono::Utc;
use serde_json::json;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{debug, error, info, warn};

use auth::{AuthUser, auth_middleware, optional_auth_middleware};
use common::models::Page;

use crate::{
    config::ServerConfig,
    error::{ApiJson, ApiResult},
    html::{HtmlPage, content_security_policy, message_document, render_page},
    lifecycle::{LifecycleError, PageDraft, PageEdit},
    models::{CreatePageRequest, Envelope, PublishPageRequest, UpdatePageRequest},
    state::AppState,
};

/// Create the router for the API service
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.server);

    Router::new()
        .route("/api/health", get(health_check))
        .nest("/api/auth", auth::create_router(state.auth.clone()))
        .nest("/api/launch-pages", launch_page_routes(state))
        .fallback(route_not_found)
        .layer(middleware::from_fn(log_requests))
        .layer(cors)
}

/// Credentialed CORS for the configured browser origins
///
/// Preflight requests are answered here, before any auth layer sees them.
fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins()
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
}

fn launch_page_routes(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/", post(create_page))
        .route("/user", get(list_user_pages))
        .route("/:id", put(update_page).delete(delete_page))
        .route("/:id/regenerate", post(regenerate_page))
        .route("/:id/publish", post(publish_page))
        .route_layer(middleware::from_fn_with_state(
            state.auth.clone(),
            auth_middleware,
        ));

    let viewer_routes = Router::new()
        .route("/:id", get(get_page))
        .route_layer(middleware::from_fn_with_state(
            state.auth.clone(),
            optional_auth_middleware,
        ));

    Router::new()
        .route("/published", get(list_published))
        .route("/published/:slug", get(published_page))
        .route("/:id/preview", get(preview_page))
        .merge(protected_routes)
        .merge(viewer_routes)
        .with_state(state)
}

/// Log every request with its status and latency
async fn log_requests(req: Request<Body>, next: Next) -> Response {
    let method = req.method().clone();
    let uri = req.uri().clone();
    let started = Instant::now();

    let response = next.run(req).await;

    info!(
        "{} {} -> {} ({:?})",
        method,
        uri,
        response.status().as_u16(),
        started.elapsed()
    );
    response
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "api",
        "timestamp": Utc::now(),
    }))
}

async fn route_not_found(uri: Uri) -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "success": false,
            "message": format!("Route {} not found", uri.path()),
        })),
    )
}

/// Create a page and start generating it
pub async fn create_page(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    ApiJson(payload): ApiJson<CreatePageRequest>,
) -> ApiResult<impl IntoResponse> {
    let draft = PageDraft {
        name: payload.name,
        description: payload.description,
        tagline: payload.tagline,
        color_palette: payload.color_palette,
        theme: payload.theme,
    };

    let page = state.pages.create(&user, draft).await?;

    Ok((StatusCode::CREATED, Json(Envelope::data(page))))
}

/// Pages owned by the caller
pub async fn list_user_pages(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
) -> ApiResult<impl IntoResponse> {
    let pages = state.pages.list_for_owner(&user).await?;

    Ok(Json(Envelope::data(pages)))
}

/// Any page by id; reading is not restricted to the owner
pub async fn get_page(
    State(state): State<AppState>,
    viewer: Option<Extension<AuthUser>>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let page = state.pages.get(&id).await?;

    let viewer = viewer.map(|Extension(AuthUser(user))| user);
    if let Some(viewer) = viewer.filter(|v| v.id != page.user_id) {
        debug!(
            "User {} reading launch page {} owned by {}",
            viewer.id, page.id, page.user_id
        );
    }

    Ok(Json(Envelope::data(page)))
}

pub async fn update_page(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<UpdatePageRequest>,
) -> ApiResult<impl IntoResponse> {
    let edit = PageEdit {
        name: payload.name,
        description: payload.description,
        tagline: payload.tagline,
    };

    let page = state.pages.update(&user, &id, edit).await?;

    Ok(Json(Envelope::data(page)))
}

pub async fn delete_page(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    state.pages.delete(&user, &id).await?;

    Ok(Json(Envelope::message("Launch page deleted successfully")))
}

pub async fn regenerate_page(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let page = state.pages.regenerate(&user, &id).await?;

    Ok(Json(Envelope::data(page)))
}

pub async fn publish_page(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<PublishPageRequest>,
) -> ApiResult<impl IntoResponse> {
    let page = state
        .pages
        .publish(&user, &id, payload.slug.as_deref())
        .await?;

    Ok(Json(
        Envelope::data(page).with_message("Launch page published successfully"),
    ))
}

/// Every published page with its creator's name
pub async fn list_published(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let pages = state.pages.list_published().await?;

    Ok(Json(Envelope::data(pages)))
}

/// Rendered document of any page, for the editor iframe
pub async fn preview_page(State(state): State<AppState>, Path(id): Path<String>) -> HtmlPage {
    let page = state.pages.get(&id).await;
    html_response(&state, page, "Page not found")
}

/// Rendered document of a published page
pub async fn published_page(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> HtmlPage {
    let page = state.pages.get_published_by_slug(&slug).await;
    html_response(&state, page, "Published page not found")
}

fn html_response(
    state: &AppState,
    page: Result<Page, LifecycleError>,
    not_found: &str,
) -> HtmlPage {
    let (status, body) = match page {
        Ok(page) => render_page(&page),
        Err(LifecycleError::NotFound) => (StatusCode::NOT_FOUND, message_document(not_found)),
        Err(err) => {
            error!("Failed to render page: {}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                message_document("Server Error"),
            )
        }
    };

    HtmlPage {
        status,
        body,
        csp: content_security_policy(&state.server.frame_ancestors),
    }
}
