//! File storage: raw-body uploads and master-key deletes.
//!
//! Uploads return `{name, url}`; the stored name may differ from the
//! requested one. Reference the result from a record with `FileRef`.

use std::path::Path;

use tracing::debug;

use crate::client::{segment, ParseClient};
use crate::error::ApiError;
use crate::outcome::ResponseOutcome;
use crate::request::RequestSpec;

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Debug, Clone, Copy)]
pub struct Files<'a> {
    client: &'a ParseClient,
}

impl<'a> Files<'a> {
    pub(crate) fn new(client: &'a ParseClient) -> Self {
        Self { client }
    }

    /// Upload a local file. The content type is guessed from the extension;
    /// `name` defaults to the file's own name.
    pub async fn upload_path(&self, path: impl AsRef<Path>, name: Option<&str>) -> ResponseOutcome {
        let path = path.as_ref();
        let name = match name.map(str::to_string).or_else(|| file_name(path)) {
            Some(name) => name,
            None => {
                return ApiError::Config(format!("cannot derive a file name from {}", path.display()))
                    .into()
            }
        };
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(err) => return ApiError::from(err).into(),
        };
        let content_type = content_type_for(path);
        debug!(path = %path.display(), %name, content_type, bytes = bytes.len(), "uploading file");
        self.upload_bytes(bytes, content_type, &name).await
    }

    pub async fn upload_bytes(
        &self,
        bytes: impl Into<Vec<u8>>,
        content_type: &str,
        name: &str,
    ) -> ResponseOutcome {
        let spec = RequestSpec::post(file_path(name))
            .raw_body(bytes)
            .header("Content-Type", content_type);
        self.client.execute(spec).await
    }

    /// Delete a stored file by the name the upload returned. The service
    /// only honours this with the master key.
    pub async fn delete(&self, name: &str) -> ResponseOutcome {
        self.client.execute(RequestSpec::delete(file_path(name))).await
    }
}

fn file_path(name: &str) -> String {
    format!("/1/files/{}", segment(name))
}

fn file_name(path: &Path) -> Option<String> {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
}

/// Content type by file extension; unknown extensions fall back to
/// `application/octet-stream`.
pub fn content_type_for(path: &Path) -> &'static str {
    let Some(extension) = path.extension().and_then(|ext| ext.to_str()) else {
        return DEFAULT_CONTENT_TYPE;
    };
    match extension.to_ascii_lowercase().as_str() {
        "txt" => "text/plain",
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "csv" => "text/csv",
        "js" => "application/javascript",
        "json" => "application/json",
        "xml" => "application/xml",
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        "ico" => "image/x-icon",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        _ => DEFAULT_CONTENT_TYPE,
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use serde_json::json;

    use super::*;
    use crate::client::testing::*;
    use crate::config::MASTER_KEY_HEADER;
    use crate::http::HttpMethod;

    #[test]
    fn content_type_guessing() {
        assert_eq!(content_type_for(Path::new("apple.JPG")), "image/jpeg");
        assert_eq!(content_type_for(Path::new("notes.txt")), "text/plain");
        assert_eq!(content_type_for(Path::new("archive.tar.zst")), DEFAULT_CONTENT_TYPE);
        assert_eq!(content_type_for(Path::new("Makefile")), DEFAULT_CONTENT_TYPE);
    }

    #[tokio::test]
    async fn upload_bytes_sends_raw_body() {
        let (client, transport) = client_with(
            ScriptedTransport::default()
                .respond_json(201, json!({"name": "abc-hello.txt", "url": "http://files/abc-hello.txt"})),
        );
        let outcome = client
            .files()
            .upload_bytes(b"Hello, World!".to_vec(), "text/plain", "hello.txt")
            .await;

        assert!(outcome.success);
        assert_eq!(outcome.field("name").unwrap(), "abc-hello.txt");
        let sent = transport.last_request();
        assert_eq!(sent.method, HttpMethod::Post);
        assert_eq!(sent.url, "http://parse.test/1/files/hello.txt");
        assert_eq!(sent.header("content-type"), Some("text/plain"));
        assert_eq!(sent.body.as_deref(), Some(&b"Hello, World!"[..]));
    }

    #[tokio::test]
    async fn upload_path_reads_file_and_guesses_type() {
        let mut file = tempfile::Builder::new().suffix(".png").tempfile().unwrap();
        file.write_all(&[0x89, b'P', b'N', b'G']).unwrap();
        let expected_name = file.path().file_name().unwrap().to_str().unwrap().to_string();

        let (client, transport) =
            client_with(ScriptedTransport::default().respond_json(201, json!({"name": "x", "url": "u"})));
        let outcome = client.files().upload_path(file.path(), None).await;

        assert!(outcome.success);
        let sent = transport.last_request();
        assert_eq!(sent.url, format!("http://parse.test/1/files/{}", segment(&expected_name)));
        assert_eq!(sent.header("Content-Type"), Some("image/png"));
        assert_eq!(sent.body.as_deref(), Some(&[0x89, b'P', b'N', b'G'][..]));
    }

    #[tokio::test]
    async fn upload_path_uses_explicit_name() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let (client, transport) =
            client_with(ScriptedTransport::default().respond_json(201, json!({"name": "x", "url": "u"})));
        client.files().upload_path(file.path(), Some("renamed.txt")).await;
        assert_eq!(transport.last_request().url, "http://parse.test/1/files/renamed.txt");
    }

    #[tokio::test]
    async fn upload_path_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let (client, transport) = client_with(ScriptedTransport::default());
        let outcome = client.files().upload_path(dir.path().join("missing.txt"), None).await;

        assert!(!outcome.success);
        assert!(matches!(outcome.error, Some(ApiError::Io(_))));
        assert!(transport.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_carries_master_key() {
        let (client, transport) = client_with(ScriptedTransport::default().respond_json(200, json!({})));
        let admin = client.with_master_key("mk");
        let outcome = admin.files().delete("abc-hello.txt").await;

        assert!(outcome.success);
        let sent = transport.last_request();
        assert_eq!(sent.method, HttpMethod::Delete);
        assert_eq!(sent.url, "http://parse.test/1/files/abc-hello.txt");
        assert_eq!(sent.header(MASTER_KEY_HEADER), Some("mk"));
    }
}
