use crate::assets;
use crate::handlers::files::{encode_path, send_file};
use crate::resolver::{self, Entry, ResolveError, ResolvedTarget};
use crate::state::AppState;
use crate::templates::{EntryView, Page};
use axum::{
    http::{StatusCode, Uri},
    response::{Html, IntoResponse, Response},
};
use tracing::{debug, error};

pub fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "Not found").into_response()
}

fn server_error() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
}

/// Serves the file, or lists the directory, that `sub_path` names under
/// the mount's source directory.
pub async fn directory_index(
    state: AppState,
    mount_id: String,
    sub_path: String,
    uri: Uri,
) -> Response {
    let Some(mount) = state.mounts.get(&mount_id).cloned() else {
        error!("Route registered for unknown mount {}", mount_id);
        return server_error();
    };

    let templates = mount.templates.clone();
    let resolved = {
        let sub_path = sub_path.clone();
        tokio::task::spawn_blocking(move || resolver::resolve(&mount, &sub_path)).await
    };

    let target = match resolved {
        Ok(Ok(target)) => target,
        Ok(Err(e @ ResolveError::MissingSourceDir { .. })) => {
            error!("{}", e);
            return server_error();
        }
        Ok(Err(e @ ResolveError::Io { .. })) => {
            error!("Listing failed on mount {}: {}", mount_id, e);
            return server_error();
        }
        Err(e) => {
            error!("Resolver task failed: {}", e);
            return server_error();
        }
    };

    match target {
        ResolvedTarget::File { path } => send_file(&path).await,
        ResolvedTarget::NotFound => not_found(),
        ResolvedTarget::Listing { directories, files } => {
            let link_base = uri.path().trim_end_matches('/');
            let page = Page {
                directories: views(&directories, link_base),
                files: views(&files, link_base),
                base: uri
                    .path_and_query()
                    .map(|pq| pq.as_str().to_string())
                    .unwrap_or_else(|| uri.path().to_string()),
                parent_dir: resolver::parent_directory_name(&mount_id, &sub_path),
            };

            match state.renderer.render_listing(&templates, &page) {
                Ok(html) => {
                    debug!(
                        "Rendered listing for {} ({} dirs, {} files)",
                        page.base,
                        page.directories.len(),
                        page.files.len()
                    );
                    Html(assets::inject(&html, &state.snippets)).into_response()
                }
                Err(e) => {
                    error!("Rendering listing for {} failed: {}", page.base, e);
                    server_error()
                }
            }
        }
    }
}

fn views(entries: &[Entry], link_base: &str) -> Vec<EntryView> {
    entries
        .iter()
        .map(|entry| EntryView {
            name: entry.name.clone(),
            path: entry.path.to_string_lossy().to_string(),
            href: format!("{}/{}", link_base, encode_path(&entry.name)),
        })
        .collect()
}
