//! The JSON upload handler: validate the body as JSON, persist it under a
//! timestamped filename, and report where it landed.

use crate::errors::ErrorKind;
use crate::http::response::Response;
use crate::http::types::StatusCode;
use crate::logger::Logger;
use std::path::Path;

const MAX_FILENAME_ATTEMPTS: usize = 8;

/// Validates `body` as a JSON value and writes it verbatim to
/// `<uploads_dir>/upload_<YYYYMMDD>_<HHMMSS>_<4-hex>.json`, retrying the
/// filename on collision.
pub(crate) async fn persist(
    body: &[u8],
    uploads_dir: &Path,
    logger: &Logger,
    tag: &str,
) -> Result<Response, ErrorKind> {
    if serde_json::from_slice::<serde_json::Value>(body).is_err() {
        return Err(ErrorKind::MalformedRequest);
    }

    tokio::fs::create_dir_all(uploads_dir).await.map_err(|e| {
        logger.log(tag, &format!("error creating uploads dir: {e}"));
        ErrorKind::Internal
    })?;

    let filename = write_with_retry(body, uploads_dir, logger, tag).await?;

    let response_body = format!(
        r#"{{"status":"success","message":"File created successfully","filepath":"/uploads/{filename}"}}"#
    );

    Ok(Response::new(StatusCode::Created)
        .content_type("application/json")
        .body(response_body.into_bytes()))
}

async fn write_with_retry(
    body: &[u8],
    uploads_dir: &Path,
    logger: &Logger,
    tag: &str,
) -> Result<String, ErrorKind> {
    for _ in 0..MAX_FILENAME_ATTEMPTS {
        let filename = generate_filename();
        let path = uploads_dir.join(&filename);

        match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(mut file) => {
                use tokio::io::AsyncWriteExt;
                if let Err(e) = file.write_all(body).await {
                    logger.log(tag, &format!("error writing upload: {e}"));
                    return Err(ErrorKind::Internal);
                }
                return Ok(filename);
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
            Err(e) => {
                logger.log(tag, &format!("error creating upload file: {e}"));
                return Err(ErrorKind::Internal);
            }
        }
    }

    logger.log(tag, "exhausted filename collision retries");
    Err(ErrorKind::Internal)
}

fn generate_filename() -> String {
    let now = chrono::Utc::now();
    let suffix: u16 = rand::random();
    format!(
        "upload_{}_{:04x}.json",
        now.format("%Y%m%d_%H%M%S"),
        suffix
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn logger() -> Logger {
        Logger::new()
    }

    #[tokio::test]
    async fn rejects_non_json_body() {
        let dir = tempfile::tempdir().unwrap();
        let err = persist(b"not json", dir.path(), &logger(), "Thread-1")
            .await
            .unwrap_err();
        assert_eq!(err, ErrorKind::MalformedRequest);
    }

    #[tokio::test]
    async fn persists_json_object_and_reports_filepath() {
        let dir = tempfile::tempdir().unwrap();
        let body = br#"{"test":"data","timestamp":"t"}"#;
        let resp = persist(body, dir.path(), &logger(), "Thread-1")
            .await
            .unwrap();
        assert_eq!(resp.status, StatusCode::Created);

        let text = String::from_utf8(resp.body).unwrap();
        assert!(text.starts_with(r#"{"status":"success","message":"File created successfully","filepath":"/uploads/upload_"#));
        assert!(text.ends_with(".json\"}"));

        let filepath = text
            .split("\"filepath\":\"/uploads/")
            .nth(1)
            .unwrap()
            .trim_end_matches("\"}");
        let on_disk = tokio::fs::read(dir.path().join(filepath)).await.unwrap();
        assert_eq!(on_disk, body);
    }

    #[tokio::test]
    async fn accepts_any_json_value_not_just_objects() {
        let dir = tempfile::tempdir().unwrap();
        for body in [&b"[1,2,3]"[..], b"\"a string\"", b"42", b"null", b"true"] {
            assert!(persist(body, dir.path(), &logger(), "Thread-1")
                .await
                .is_ok());
        }
    }

    #[tokio::test]
    async fn creates_uploads_dir_if_absent() {
        let dir = tempfile::tempdir().unwrap();
        let uploads = dir.path().join("uploads");
        assert!(!uploads.exists());
        persist(b"{}", &uploads, &logger(), "Thread-1").await.unwrap();
        assert!(uploads.is_dir());
    }

    #[tokio::test]
    async fn concurrent_uploads_each_land_in_a_distinct_file() {
        let dir = tempfile::tempdir().unwrap();
        let logger = std::sync::Arc::new(Logger::new());
        let mut handles = Vec::new();
        for i in 0..16 {
            let root = dir.path().to_path_buf();
            let logger = logger.clone();
            handles.push(tokio::spawn(async move {
                persist(
                    format!("{{\"i\":{i}}}").as_bytes(),
                    &root,
                    &logger,
                    "Thread-1",
                )
                .await
                .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        let count = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(count, 16);
    }
}
