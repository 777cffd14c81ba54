//! Export-file plumbing for surface save dialogs.

use std::path::{Path, PathBuf};

use base64::Engine as _;

use drawbridge_core::error::{BridgeError, Result};

/// Append the canonical extension when the chosen path lacks it.
pub fn resolve_export_path(chosen: PathBuf, extension: Option<&str>) -> PathBuf {
    let Some(ext) = extension else {
        return chosen;
    };
    let suffix = format!(".{ext}");
    let raw = chosen.to_string_lossy();
    if raw.ends_with(&suffix) {
        chosen
    } else {
        PathBuf::from(format!("{raw}{suffix}"))
    }
}

/// Decode a `data:image/...;base64,` payload into raw bytes. The data-URL
/// prefix is optional; bare base64 is accepted.
pub fn decode_data_url(payload: &str) -> Result<Vec<u8>> {
    let encoded = payload
        .split_once(";base64,")
        .map(|(_, rest)| rest)
        .unwrap_or(payload);
    base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|e| BridgeError::Dialog(format!("invalid base64 payload: {e}")))
}

/// Atomic write: temp file then rename.
pub async fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    let tmp = path.with_extension("tmp");
    tokio::fs::write(&tmp, content).await?;
    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_export_path_appends_missing_extension() {
        let path = resolve_export_path(PathBuf::from("/tmp/out"), Some("svg"));
        assert_eq!(path, PathBuf::from("/tmp/out.svg"));
    }

    #[test]
    fn test_resolve_export_path_keeps_existing_extension() {
        let path = resolve_export_path(PathBuf::from("/tmp/out.svg"), Some("svg"));
        assert_eq!(path, PathBuf::from("/tmp/out.svg"));
    }

    #[test]
    fn test_resolve_export_path_without_extension_hint() {
        let path = resolve_export_path(PathBuf::from("/tmp/out"), None);
        assert_eq!(path, PathBuf::from("/tmp/out"));
    }

    #[test]
    fn test_decode_data_url() {
        let bytes = decode_data_url("data:image/png;base64,aGVsbG8=").unwrap();
        assert_eq!(bytes, b"hello");
    }

    #[test]
    fn test_decode_bare_base64() {
        let bytes = decode_data_url("aGVsbG8=").unwrap();
        assert_eq!(bytes, b"hello");
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode_data_url("data:image/png;base64,???").is_err());
    }

    #[tokio::test]
    async fn test_write_atomic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scene.svg");
        write_atomic(&path, b"<svg/>").await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"<svg/>");
        assert!(!dir.path().join("scene.tmp").exists());
    }
}
