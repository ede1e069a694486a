mod assets;
mod config;
mod handlers;
mod resolver;
mod state;
mod templates;

use axum::{
    Router,
    extract::{Path, State},
    http::Uri,
    routing::get,
};
use std::net::SocketAddr;
use tower_http::trace::TraceLayer;
use tracing::{Level, info};

use crate::config::Settings;
use crate::handlers::index::{directory_index, not_found};
use crate::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let settings = Settings::new().expect("Failed to load configuration");

    tracing_subscriber::fmt()
        .with_env_filter(&settings.log_level)
        .init();

    info!("Starting dirindex...");

    let state = AppState::from_settings(settings).expect("Failed to initialize");
    if state.mounts.is_empty() {
        info!("No mounts configured; every request will be answered with Not found");
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], state.settings.server_port));
    let app = create_app(state);

    info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listener");
    axum::serve(listener, app).await.expect("Server error");
}

pub fn create_app(state: AppState) -> Router {
    let mut app = Router::new();

    for mount in state.mounts.iter() {
        let root = {
            let id = mount.mount_id.clone();
            move |State(state): State<AppState>, uri: Uri| {
                directory_index(state, id.clone(), String::new(), uri)
            }
        };
        let nested = {
            let id = mount.mount_id.clone();
            move |State(state): State<AppState>, Path(url): Path<String>, uri: Uri| {
                directory_index(state, id.clone(), url, uri)
            }
        };

        app = app
            .route(
                &format!("/{}", mount.mount_id),
                get(root.clone()).post(root),
            )
            .route(
                &format!("/{}/{{*url}}", mount.mount_id),
                get(nested.clone()).post(nested),
            );
    }

    app.layer(
        TraceLayer::new_for_http()
            .make_span_with(tower_http::trace::DefaultMakeSpan::new().level(Level::INFO))
            .on_response(tower_http::trace::DefaultOnResponse::new().level(Level::INFO)),
    )
    .fallback(|| async { not_found() })
    .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MountSettings, TemplateNames};
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use std::collections::HashMap;
    use std::path::Path as StdPath;
    use tempfile::tempdir;

    fn settings_for(root: &StdPath, font_awesome: bool) -> Settings {
        let mut mounts = HashMap::new();
        mounts.insert(
            "/assets/".to_string(),
            MountSettings {
                source_dir: Some(root.join("assets")),
                templates: None,
            },
        );
        mounts.insert("broken".to_string(), MountSettings::default());

        Settings {
            server_port: 0,
            log_level: "info".to_string(),
            font_awesome,
            templates_dir: None,
            templates: TemplateNames::default(),
            mounts,
        }
    }

    fn setup_test_app(font_awesome: bool) -> (TestServer, tempfile::TempDir) {
        let tmp_dir = tempdir().unwrap();
        let assets = tmp_dir.path().join("assets");
        std::fs::create_dir_all(assets.join("css")).unwrap();
        std::fs::create_dir_all(assets.join("img")).unwrap();
        std::fs::write(assets.join("readme.txt"), "read me").unwrap();
        std::fs::write(assets.join("my file.txt"), "spaced").unwrap();
        std::fs::write(assets.join("img").join("logo.png"), [0x89, b'P', b'N', b'G']).unwrap();
        std::fs::write(tmp_dir.path().join("secret.txt"), "top secret").unwrap();

        let state = AppState::from_settings(settings_for(tmp_dir.path(), font_awesome)).unwrap();
        (TestServer::new(create_app(state)).unwrap(), tmp_dir)
    }

    #[tokio::test]
    async fn test_mount_root_listing() {
        let (server, _tmp) = setup_test_app(false);
        let response = server.get("/assets").await;
        response.assert_status_ok();
        let body = response.text();
        assert!(body.contains("css/"));
        assert!(body.contains("img/"));
        assert!(body.contains("readme.txt"));
        assert!(body.contains("my%20file.txt"));
        assert!(!body.contains("class=\"parent\""));
        assert!(!body.contains("font-awesome.min.css"));
    }

    #[tokio::test]
    async fn test_subdirectory_listing_has_parent_link() {
        let (server, _tmp) = setup_test_app(false);
        let response = server.get("/assets/img").await;
        response.assert_status_ok();
        let body = response.text();
        assert!(body.contains("logo.png"));
        assert!(body.contains("class=\"parent\""));
        assert!(body.contains("..&#x2F;assets"));
    }

    #[tokio::test]
    async fn test_file_is_served() {
        let (server, _tmp) = setup_test_app(false);
        let response = server.get("/assets/img/logo.png").await;
        response.assert_status_ok();
        response.assert_header("content-type", "image/png");
        assert_eq!(&response.as_bytes()[..], &[0x89, b'P', b'N', b'G']);

        let response = server.get("/assets/my%20file.txt").await;
        response.assert_status_ok();
        response.assert_text("spaced");
    }

    #[tokio::test]
    async fn test_post_is_routed() {
        let (server, _tmp) = setup_test_app(false);
        server.post("/assets/readme.txt").await.assert_text("read me");
    }

    #[tokio::test]
    async fn test_missing_path_is_not_found() {
        let (server, _tmp) = setup_test_app(false);
        let response = server.get("/assets/missing/").await;
        response.assert_status(StatusCode::NOT_FOUND);
        response.assert_text("Not found");
    }

    #[tokio::test]
    async fn test_traversal_is_not_found() {
        let (server, _tmp) = setup_test_app(false);
        let response = server.get("/assets/img/%2E%2E%2F%2E%2E%2Fsecret.txt").await;
        response.assert_status(StatusCode::NOT_FOUND);
        response.assert_text("Not found");
    }

    #[tokio::test]
    async fn test_mount_without_source_dir_fails() {
        let (server, _tmp) = setup_test_app(false);
        server
            .get("/broken")
            .await
            .assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        server
            .get("/broken/anything")
            .await
            .assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_unmounted_path_is_not_found() {
        let (server, _tmp) = setup_test_app(false);
        server.get("/elsewhere").await.assert_text("Not found");
    }

    #[tokio::test]
    async fn test_font_awesome_snippet() {
        let (server, _tmp) = setup_test_app(true);
        let body = server.get("/assets").await.text();
        let link = body.find("font-awesome.min.css").unwrap();
        assert!(link < body.find("</head>").unwrap());

        // Files are sent untouched.
        server
            .get("/assets/readme.txt")
            .await
            .assert_text("read me");
    }

    #[test]
    fn test_unknown_template_fails_startup() {
        let tmp_dir = tempdir().unwrap();
        let mut settings = settings_for(tmp_dir.path(), false);
        settings.templates.index = "missing.html".to_string();
        assert!(AppState::from_settings(settings).is_err());
    }
}
