//! Shared key generation for storage backends.
//!
//! Key format: `images/{owner_id}/{filename}`.

use crate::traits::{StorageError, StorageResult};
use uuid::Uuid;

/// Generate the storage key for an owner's file.
///
/// The filename must be a single path segment.
pub fn generate_storage_key(owner_id: Uuid, filename: &str) -> StorageResult<String> {
    if filename.is_empty()
        || filename.contains('/')
        || filename.contains('\\')
        || filename.contains("..")
    {
        return Err(StorageError::InvalidKey(format!(
            "Invalid file name: {}",
            filename
        )));
    }
    Ok(format!("images/{}/{}", owner_id, filename))
}

/// Base URL objects of `bucket` are served from.
///
/// Custom endpoints (MinIO and other S3-compatible stores) use path-style
/// addressing; AWS uses the virtual-hosted bucket domain.
#[cfg_attr(not(feature = "storage-s3"), allow(dead_code))]
pub fn object_url_base(endpoint: Option<&str>, bucket: &str, region: &str) -> String {
    match endpoint.map(|e| e.trim_end_matches('/')).filter(|e| !e.is_empty()) {
        Some(endpoint) => format!("{}/{}", endpoint, bucket),
        None => format!("https://{}.s3.{}.amazonaws.com", bucket, region),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_layout() {
        let owner = Uuid::nil();
        assert_eq!(
            generate_storage_key(owner, "cat_1.png").unwrap(),
            "images/00000000-0000-0000-0000-000000000000/cat_1.png"
        );
        assert!(generate_storage_key(owner, "../cat.png").is_err());
        assert!(generate_storage_key(owner, "a/b.png").is_err());
        assert!(generate_storage_key(owner, "").is_err());
    }

    #[test]
    fn test_object_url_base() {
        assert_eq!(
            object_url_base(None, "pictures", "eu-west-1"),
            "https://pictures.s3.eu-west-1.amazonaws.com"
        );
        assert_eq!(
            object_url_base(Some("http://localhost:9000/"), "pictures", "us-east-1"),
            "http://localhost:9000/pictures"
        );
        assert_eq!(
            object_url_base(Some(""), "pictures", "us-east-1"),
            "https://pictures.s3.us-east-1.amazonaws.com"
        );
    }
}
