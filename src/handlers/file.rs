//! The static file handler: GET a canonical path under the content root and
//! serve it as HTML or a binary attachment.

use crate::errors::ErrorKind;
use crate::http::response::Response;
use crate::http::types::StatusCode;
use crate::logger::Logger;
use std::path::Path;

enum Kind {
    Html,
    Binary,
}

/// Serves `path`, already produced by the security gate and verified to lie
/// within the content root. Files are read fully into memory before the
/// response is framed: no streaming, no ranges.
pub(crate) async fn serve(path: &Path, logger: &Logger, tag: &str) -> Result<Response, ErrorKind> {
    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|_| ErrorKind::NotFound)?;
    if !metadata.is_file() {
        return Err(ErrorKind::NotFound);
    }

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    let kind = match extension.as_str() {
        "html" => Kind::Html,
        "txt" | "png" | "jpg" | "jpeg" => Kind::Binary,
        _ => return Err(ErrorKind::UnsupportedMediaType),
    };

    let bytes = tokio::fs::read(path).await.map_err(|e| {
        logger.log(tag, &format!("error reading file: {e}"));
        ErrorKind::Internal
    })?;

    Ok(match kind {
        Kind::Html => Response::new(StatusCode::Ok)
            .content_type("text/html; charset=utf-8")
            .body(bytes),
        Kind::Binary => {
            let filename = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("file");
            Response::new(StatusCode::Ok)
                .content_type("application/octet-stream")
                .header(
                    "Content-Disposition",
                    format!("attachment; filename=\"{filename}\""),
                )
                .body(bytes)
        }
    })
}
