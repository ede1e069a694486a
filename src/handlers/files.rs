use axum::{
    body::Body,
    http::{
        HeaderValue, StatusCode,
        header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE, HeaderMap},
    },
    response::{IntoResponse, Response},
};
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use std::path::Path;
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use tracing::{error, info};

/// Characters escaped in a single path segment of a link.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Streams a regular file back to the client.
pub async fn send_file(file_path: &Path) -> Response {
    let file = match File::open(file_path).await {
        Ok(f) => f,
        Err(e) => {
            error!("File open failed: {} (Path: {:?})", e, file_path);
            return (StatusCode::NOT_FOUND, "Not found").into_response();
        }
    };

    let total_size = match file.metadata().await {
        Ok(m) => m.len(),
        Err(e) => {
            error!("File metadata failed: {} (Path: {:?})", e, file_path);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response();
        }
    };
    let filename = file_path
        .file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    info!("Sending file: {} ({} bytes)", filename, total_size);

    let body = Body::from_stream(ReaderStream::new(file));

    let mut headers = HeaderMap::new();
    let mime = mime_guess::from_path(file_path).first_or_octet_stream();
    if let Ok(val) = HeaderValue::from_str(mime.as_ref()) {
        headers.insert(CONTENT_TYPE, val);
    }

    if mime == mime_guess::mime::APPLICATION_OCTET_STREAM
        && let Ok(val) = HeaderValue::from_str(&format!(
            "attachment; filename=\"{}\"",
            filename.replace('"', "")
        ))
    {
        headers.insert(CONTENT_DISPOSITION, val);
    }

    if let Ok(val) = HeaderValue::from_str(&total_size.to_string()) {
        headers.insert(CONTENT_LENGTH, val);
    }

    (headers, body).into_response()
}

/// Percent-encodes each `/`-separated segment of `path`.
pub fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| utf8_percent_encode(segment, SEGMENT).to_string())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_encode_path() {
        assert_eq!(encode_path("plain.txt"), "plain.txt");
        assert_eq!(encode_path("my file#1.txt"), "my%20file%231.txt");
        assert_eq!(encode_path("a b/c?d"), "a%20b/c%3Fd");
        assert_eq!(encode_path("100%"), "100%25");
        assert_eq!(encode_path("café"), "caf%C3%A9");
    }

    #[tokio::test]
    async fn test_send_file_headers() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("style.css");
        std::fs::write(&path, "body {}").unwrap();

        let response = send_file(&path).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], "text/css");
        assert_eq!(response.headers()[CONTENT_LENGTH], "7");
        assert!(response.headers().get(CONTENT_DISPOSITION).is_none());
    }

    #[tokio::test]
    async fn test_unknown_type_is_an_attachment() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("blob.zzunknown");
        std::fs::write(&path, [0u8, 1, 2]).unwrap();

        let response = send_file(&path).await;
        assert_eq!(response.headers()[CONTENT_TYPE], "application/octet-stream");
        assert_eq!(
            response.headers()[CONTENT_DISPOSITION],
            "attachment; filename=\"blob.zzunknown\""
        );
    }

    #[tokio::test]
    async fn test_vanished_file_is_not_found() {
        let tmp = tempdir().unwrap();
        let response = send_file(&tmp.path().join("gone.txt")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
