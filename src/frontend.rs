use std::path::Path;

use axum::Router;
use tower_http::services::{ServeDir, ServeFile};

use crate::state::AppState;

/// Static pages and assets of the web frontend, rooted at `static_dir`.
///
/// Assets are reachable both under the short prefixes (`/css`, `/js`) and
/// under the `/app/views/...` paths the HTML pages link to.
pub fn router(static_dir: &Path) -> Router<AppState> {
    let views = static_dir.join("app").join("views");
    let auth_page = ServeFile::new(views.join("auth.html"));
    let css = views.join("css");
    let js = views.join("js");

    Router::new()
        .route_service("/", ServeFile::new(static_dir.join("index.html")))
        .route_service("/auth", auth_page.clone())
        .route_service("/app/views/auth.html", auth_page)
        .nest_service("/css", ServeDir::new(&css))
        .nest_service("/app/views/css", ServeDir::new(&css))
        .nest_service("/js", ServeDir::new(&js))
        .nest_service("/app/views/js", ServeDir::new(&js))
        .nest_service("/app/img", ServeDir::new(static_dir.join("app").join("img")))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use tower::ServiceExt;

    use crate::{app::build_app, state::AppState};

    async fn get(uri: &str) -> (StatusCode, Option<String>, String) {
        let (state, _) = AppState::fake();
        let res = build_app(state)
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = res.status();
        let content_type = res
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, content_type, String::from_utf8_lossy(&bytes).into_owned())
    }

    #[tokio::test]
    async fn index_is_served_at_root() {
        let (status, ct, body) = get("/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(ct.unwrap_or_default().starts_with("text/html"));
        assert!(body.contains("<html"));
    }

    #[tokio::test]
    async fn auth_page_has_two_paths() {
        let (a, _, body_a) = get("/auth").await;
        let (b, _, body_b) = get("/app/views/auth.html").await;
        assert_eq!(a, StatusCode::OK);
        assert_eq!(b, StatusCode::OK);
        assert_eq!(body_a, body_b);
    }

    #[tokio::test]
    async fn assets_are_served_under_both_prefixes() {
        for uri in ["/js/auth.js", "/app/views/js/auth.js", "/css/auth.css", "/app/views/css/auth.css"] {
            let (status, _, _) = get(uri).await;
            assert_eq!(status, StatusCode::OK, "{uri}");
        }
        let (_, ct, _) = get("/js/auth.js").await;
        assert!(ct.unwrap_or_default().contains("javascript"));
    }

    #[tokio::test]
    async fn missing_asset_is_404() {
        let (status, _, _) = get("/css/missing.css").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _, _) = get("/app/img/missing.png").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
