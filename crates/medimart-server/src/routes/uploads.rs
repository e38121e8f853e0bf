//! File uploads, stored on local disk and served under `/uploads`.

use std::path::{Path as FsPath, PathBuf};

use axum::{
    Router,
    extract::{DefaultBodyLimit, Multipart, State, multipart::MultipartError},
    http::StatusCode,
    routing::post,
};
use medimart_api::{ApiError, ApiJson, ApiResult};
use medimart_core::generate_id;
use serde::Serialize;
use tokio::io::AsyncWriteExt;

use crate::config::UploadsConfig;
use crate::server::AppState;

/// Room for multipart boundaries and headers on top of the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn router(cfg: &UploadsConfig) -> Router<AppState> {
    Router::new()
        .route("/", post(upload_file))
        .layer(DefaultBodyLimit::max(cfg.max_bytes + MULTIPART_OVERHEAD))
}

#[derive(Debug, Serialize)]
pub struct UploadedFile {
    pub url: String,
    pub filename: String,
    pub size: u64,
}

fn multipart_error(e: MultipartError) -> ApiError {
    match e.status() {
        StatusCode::PAYLOAD_TOO_LARGE => ApiError::payload_too_large(e.body_text()),
        s if s.is_server_error() => ApiError::internal(e.body_text()),
        _ => ApiError::bad_request(e.body_text()),
    }
}

/// Lowercased extension of a client file name, if allowed.
fn checked_extension(cfg: &UploadsConfig, file_name: &str) -> ApiResult<String> {
    let ext = FsPath::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    if ext.is_empty() || !cfg.allows(&ext) {
        return Err(ApiError::unsupported_media_type(format!(
            "file type '{ext}' is not allowed (allowed: {})",
            cfg.allowed_extensions.join(", ")
        )));
    }
    Ok(ext)
}

async fn remove_partial(path: &FsPath) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        tracing::warn!(path = %path.display(), error = %e, "failed to remove partial upload");
    }
}

async fn upload_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, ApiJson<UploadedFile>)> {
    let cfg = &state.config.uploads;

    while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some("file") {
            continue;
        }
        let original = field.file_name().unwrap_or_default().to_string();
        let ext = checked_extension(cfg, &original)?;

        tokio::fs::create_dir_all(&cfg.dir)
            .await
            .map_err(|e| ApiError::internal(format!("cannot create upload directory: {e}")))?;
        let filename = format!("{}.{ext}", generate_id());
        let path: PathBuf = cfg.dir.join(&filename);
        let mut file = tokio::fs::File::create(&path)
            .await
            .map_err(|e| ApiError::internal(format!("cannot store upload: {e}")))?;

        let mut size: u64 = 0;
        loop {
            let chunk = match field.chunk().await {
                Ok(Some(chunk)) => chunk,
                Ok(None) => break,
                Err(e) => {
                    drop(file);
                    remove_partial(&path).await;
                    return Err(multipart_error(e));
                }
            };
            size += chunk.len() as u64;
            if size > cfg.max_bytes as u64 {
                drop(file);
                remove_partial(&path).await;
                return Err(ApiError::payload_too_large(format!(
                    "file exceeds the {} byte limit",
                    cfg.max_bytes
                )));
            }
            if let Err(e) = file.write_all(&chunk).await {
                drop(file);
                remove_partial(&path).await;
                return Err(ApiError::internal(format!("cannot store upload: {e}")));
            }
        }
        if let Err(e) = file.flush().await {
            remove_partial(&path).await;
            return Err(ApiError::internal(format!("cannot store upload: {e}")));
        }
        drop(file);

        if size == 0 {
            remove_partial(&path).await;
            return Err(ApiError::bad_request("uploaded file is empty"));
        }

        tracing::info!(filename = %filename, original = %original, size, "file uploaded");
        return Ok((
            StatusCode::CREATED,
            ApiJson(UploadedFile {
                url: format!("/uploads/{filename}"),
                filename,
                size,
            }),
        ));
    }

    Err(ApiError::bad_request("multipart field 'file' is required"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extensions_are_checked_case_insensitively() {
        let cfg = UploadsConfig::default();
        assert_eq!(checked_extension(&cfg, "scan.PNG").unwrap(), "png");
        assert_eq!(checked_extension(&cfg, "report.pdf").unwrap(), "pdf");
        assert!(matches!(
            checked_extension(&cfg, "run.exe"),
            Err(ApiError::UnsupportedMediaType(_))
        ));
        assert!(checked_extension(&cfg, "noext").is_err());
    }
}
