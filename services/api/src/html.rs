//! HTML responses for page previews and published pages
//!
//! These endpoints are rendered inside iframes, so failures degrade to a
//! small standalone document instead of a JSON body.

use axum::{
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use html_escape::encode_text;

use common::models::{Page, PageStatus};

/// Placeholder stored while a page is being generated
pub const GENERATING_PLACEHOLDER: &str = "<div>Generating...</div>";

/// Placeholder stored when generation fails
pub const ERROR_PLACEHOLDER: &str = "<div>Error generating page. Please try again.</div>";

/// Permissive policy allowing generated pages to load any asset and be framed
/// by `frame_ancestors`
pub fn content_security_policy(frame_ancestors: &str) -> String {
    [
        "default-src 'self' 'unsafe-inline' 'unsafe-eval' data: blob: *".to_string(),
        format!("frame-ancestors {}", frame_ancestors),
        "script-src 'self' 'unsafe-inline' 'unsafe-eval' *".to_string(),
        "style-src 'self' 'unsafe-inline' *".to_string(),
        "img-src 'self' data: blob: *".to_string(),
        "font-src 'self' data: *".to_string(),
        "connect-src 'self' *".to_string(),
    ]
    .join("; ")
}

/// Render a page according to its status
pub fn render_page(page: &Page) -> (StatusCode, String) {
    match page.status {
        PageStatus::Generated => (StatusCode::OK, page.html_content.clone()),
        PageStatus::Generating => (StatusCode::ACCEPTED, generating_document(&page.name)),
        PageStatus::Error => (StatusCode::INTERNAL_SERVER_ERROR, error_document(&page.name)),
    }
}

/// Auto-refreshing spinner shown while generation runs
pub fn generating_document(name: &str) -> String {
    let name = encode_text(name);

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
  <title>Generating {name}...</title>
  <meta http-equiv="refresh" content="3">
  <style>
    body {{ font-family: Arial, sans-serif; display: flex; justify-content: center; align-items: center; height: 100vh; margin: 0; background: #f5f5f5; }}
    .loader {{ text-align: center; }}
    .spinner {{ border: 4px solid #f3f3f3; border-top: 4px solid #3498db; border-radius: 50%; width: 50px; height: 50px; animation: spin 1s linear infinite; margin: 0 auto 20px; }}
    @keyframes spin {{ 0% {{ transform: rotate(0deg); }} 100% {{ transform: rotate(360deg); }} }}
  </style>
</head>
<body>
  <div class="loader">
    <div class="spinner"></div>
    <h2>Generating your launch page...</h2>
    <p>Please wait while we create something amazing for "{name}"</p>
  </div>
</body>
</html>
"#
    )
}

/// Shown when the last generation failed
pub fn error_document(name: &str) -> String {
    let name = encode_text(name);

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
  <title>Error - {name}</title>
  <style>
    body {{ font-family: Arial, sans-serif; display: flex; justify-content: center; align-items: center; height: 100vh; margin: 0; background: #f5f5f5; }}
    .error {{ text-align: center; color: #e74c3c; }}
  </style>
</head>
<body>
  <div class="error">
    <h1>Generation Failed</h1>
    <p>Sorry, we couldn't generate your launch page. Please try again later.</p>
  </div>
</body>
</html>
"#
    )
}

/// Minimal document carrying a single heading
pub fn message_document(message: &str) -> String {
    format!(
        "<html><body><h1>{}</h1></body></html>",
        encode_text(message)
    )
}

/// HTML response with the framing policy attached
pub struct HtmlPage {
    pub status: StatusCode,
    pub body: String,
    pub csp: String,
}

impl IntoResponse for HtmlPage {
    fn into_response(self) -> Response {
        let mut response = (self.status, self.body).into_response();
        let headers = response.headers_mut();

        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/html; charset=utf-8"),
        );
        if let Ok(csp) = HeaderValue::from_str(&self.csp) {
            headers.insert(header::CONTENT_SECURITY_POLICY, csp);
        }
        headers.remove(header::X_FRAME_OPTIONS);

        response
    }
}
