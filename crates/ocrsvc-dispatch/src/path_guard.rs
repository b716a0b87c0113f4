//! Pre-flight validation shared by every submit path (spec.md §7): existence,
//! extension, and size checks happen before a file's bytes ever reach the
//! cache or the recognizer, so a missing or oversized upload never occupies a
//! worker-pool permit.

use ocrsvc_core::ServiceError;
use std::path::Path;

pub async fn validate(path: &Path, allowed_exts: &[&str], max_bytes: u64) -> Result<(), ServiceError> {
    let metadata = tokio::fs::metadata(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ServiceError::NotFound(format!("file not found: {}", path.display()))
        } else {
            ServiceError::TransientIO(e.to_string())
        }
    })?;

    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| format!(".{}", s.to_lowercase()));
    let supported = matches!(&ext, Some(e) if allowed_exts.iter().any(|a| a.eq_ignore_ascii_case(e)));
    if !supported {
        return Err(ServiceError::UnsupportedFormat(format!(
            "unsupported extension: {}",
            ext.unwrap_or_else(|| "<none>".to_string())
        )));
    }

    if metadata.len() > max_bytes {
        return Err(ServiceError::TooLarge(format!(
            "{} ({} bytes) exceeds max size of {} bytes",
            path.display(),
            metadata.len(),
            max_bytes
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let err = validate(Path::new("/nonexistent/x.png"), &[".png"], 1024)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn wrong_extension_is_rejected() {
        let tmp = tempfile::Builder::new().suffix(".gif").tempfile().unwrap();
        let err = validate(tmp.path(), &[".png", ".jpg"], 1024).await.unwrap_err();
        assert!(matches!(err, ServiceError::UnsupportedFormat(_)));
    }

    #[tokio::test]
    async fn oversized_file_is_rejected() {
        use std::io::Write;
        let mut tmp = tempfile::Builder::new().suffix(".png").tempfile().unwrap();
        tmp.write_all(&vec![0u8; 64]).unwrap();
        let err = validate(tmp.path(), &[".png"], 8).await.unwrap_err();
        assert!(matches!(err, ServiceError::TooLarge(_)));
    }

    #[tokio::test]
    async fn valid_file_passes() {
        let tmp = tempfile::Builder::new().suffix(".png").tempfile().unwrap();
        validate(tmp.path(), &[".png"], 1024).await.unwrap();
    }
}
