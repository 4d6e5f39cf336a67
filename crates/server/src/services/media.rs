//! Product image files under the uploads directory.
//!
//! Layout:
//!
//! ```text
//! {UPLOADS_DIR}/products/{product_id}/{uuid}.{ext}   uploaded gallery images
//! {UPLOADS_DIR}/{slug}/...                          legacy per-product folders
//! ```
//!
//! Everything under the root is served at `/uploads/`.

use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};
use unicode_normalization::UnicodeNormalization;
use uuid::Uuid;

use dronshop_core::ProductId;

/// URL prefix the uploads directory is mounted at.
pub const URL_PREFIX: &str = "/uploads/";

const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "webp", "gif"];

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("File must be an image")]
    NotAnImage,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Filesystem store rooted at the uploads directory.
#[derive(Debug, Clone)]
pub struct MediaStore {
    root: PathBuf,
}

impl MediaStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write an uploaded image and return its public URL.
    ///
    /// # Errors
    ///
    /// Returns `MediaError::NotAnImage` unless the content type starts with
    /// `image/`, or `MediaError::Io` if the file cannot be written.
    pub async fn save_product_image(
        &self,
        product_id: ProductId,
        content_type: Option<&str>,
        file_name: Option<&str>,
        bytes: &[u8],
    ) -> Result<String, MediaError> {
        if !content_type.is_some_and(|ct| ct.starts_with("image/")) {
            return Err(MediaError::NotAnImage);
        }

        let relative_dir = format!("products/{product_id}");
        let dir = self.root.join(&relative_dir);
        tokio::fs::create_dir_all(&dir).await?;

        let file = format!("{}.{}", Uuid::new_v4().simple(), image_extension(file_name));
        tokio::fs::write(dir.join(&file), bytes).await?;

        debug!(product_id = %product_id, file = %file, size = bytes.len(), "Stored product image");
        Ok(format!("{URL_PREFIX}{relative_dir}/{file}"))
    }

    /// Save an upload, then hand its URL to `record`. When `record` fails the
    /// file is removed again so no orphan is left under `products/{id}/`.
    ///
    /// # Errors
    ///
    /// Returns the save error converted into `E`, or the error from `record`.
    pub async fn store_product_image<T, E, F, Fut>(
        &self,
        product_id: ProductId,
        content_type: Option<&str>,
        file_name: Option<&str>,
        bytes: &[u8],
        record: F,
    ) -> Result<T, E>
    where
        E: From<MediaError>,
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let url = self
            .save_product_image(product_id, content_type, file_name, bytes)
            .await?;
        match record(url.clone()).await {
            Ok(value) => Ok(value),
            Err(err) => {
                warn!(url = %url, "Image not recorded, removing stored file");
                self.remove_by_url(&url).await;
                Err(err)
            }
        }
    }

    /// Delete the file behind an `/uploads/...` URL. Failures are logged only.
    pub async fn remove_by_url(&self, url: &str) {
        let Some(path) = self.resolve(url) else {
            warn!(url, "Refusing to delete file outside uploads directory");
            return;
        };
        match tokio::fs::remove_file(&path).await {
            Ok(()) => debug!(path = %path.display(), "Removed image file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove image file"),
        }
    }

    /// Delete `products/{id}/` if it exists. Failures are logged only.
    pub async fn remove_product_dir(&self, product_id: ProductId) {
        let dir = self.root.join(format!("products/{product_id}"));
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => debug!(dir = %dir.display(), "Removed product image directory"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(dir = %dir.display(), error = %e, "Failed to remove product directory"),
        }
    }

    /// Image URLs from the legacy `{slug(name)}/` folder, sorted by file name.
    pub async fn legacy_images(&self, product_name: &str) -> Vec<String> {
        let slug = slugify(product_name);
        let Ok(mut entries) = tokio::fs::read_dir(self.root.join(&slug)).await else {
            return Vec::new();
        };

        let mut names = Vec::new();
        while let Ok(Some(entry)) = entries.next_entry().await {
            let name = entry.file_name().to_string_lossy().into_owned();
            let is_image = Path::new(&name)
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()));
            if is_image {
                names.push(name);
            }
        }
        names.sort();
        names
            .into_iter()
            .map(|name| format!("{URL_PREFIX}{slug}/{name}"))
            .collect()
    }

    /// Map a public URL to a path inside the root, rejecting traversal.
    fn resolve(&self, url: &str) -> Option<PathBuf> {
        let relative = Path::new(url.strip_prefix(URL_PREFIX)?);
        if relative.as_os_str().is_empty()
            || !relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)))
        {
            return None;
        }
        Some(self.root.join(relative))
    }
}

/// Lowercased extension of an uploaded file if it is a known image type, else `jpg`.
fn image_extension(file_name: Option<&str>) -> String {
    file_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .filter(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or_else(|| "jpg".to_string())
}

/// ASCII slug: alphanumeric runs joined by `-`, lowercased; `item` if empty.
///
/// Input is NFKD-decomposed and non-ASCII characters are dropped, so
/// accented letters keep their base letter.
#[must_use]
pub fn slugify(value: &str) -> String {
    let ascii: String = value.nfkd().filter(char::is_ascii).collect();
    let slug = ascii
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(str::to_ascii_lowercase)
        .collect::<Vec<_>>()
        .join("-");
    if slug.is_empty() {
        "item".to_string()
    } else {
        slug
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Falcon 5 Pro (FPV)"), "falcon-5-pro-fpv");
        assert_eq!(slugify("  --  "), "item");
        assert_eq!(slugify("Дрон"), "item");
    }

    #[test]
    fn test_slugify_keeps_base_letters_of_accents() {
        assert_eq!(slugify("Café Drone"), "cafe-drone");
        assert_eq!(slugify("Škoda Ñandú X1"), "skoda-nandu-x1");
        assert_eq!(slugify("ﬁve ²"), "five-2");
        assert_eq!(slugify("Дрон Café"), "cafe");
    }

    #[test]
    fn test_image_extension() {
        assert_eq!(image_extension(Some("photo.PNG")), "png");
        assert_eq!(image_extension(Some("archive.tar.gz")), "jpg");
        assert_eq!(image_extension(Some("noext")), "jpg");
        assert_eq!(image_extension(None), "jpg");
    }

    #[test]
    fn test_resolve_rejects_traversal() {
        let store = MediaStore::new("/srv/uploads");
        assert_eq!(
            store.resolve("/uploads/products/1/a.jpg"),
            Some(PathBuf::from("/srv/uploads/products/1/a.jpg"))
        );
        assert!(store.resolve("/uploads/../etc/passwd").is_none());
        assert!(store.resolve("/static/a.jpg").is_none());
        assert!(store.resolve("/uploads/").is_none());
    }

    #[tokio::test]
    async fn test_save_and_remove_image() {
        let dir = tempfile::tempdir().unwrap();
        let store = MediaStore::new(dir.path());

        let url = store
            .save_product_image(ProductId::new(7), Some("image/webp"), Some("x.webp"), b"RIFF")
            .await
            .unwrap();
        assert!(url.starts_with("/uploads/products/7/"));
        assert!(url.ends_with(".webp"));

        let path = store.resolve(&url).unwrap();
        assert!(path.exists());

        store.remove_by_url(&url).await;
        assert!(!path.exists());
        // Second removal is a silent no-op.
        store.remove_by_url(&url).await;
    }

    #[tokio::test]
    async fn test_failed_record_removes_stored_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = MediaStore::new(dir.path());

        let result: Result<(), MediaError> = store
            .store_product_image(
                ProductId::new(3),
                Some("image/png"),
                Some("a.png"),
                b"PNG",
                |_| async { Err(MediaError::Io(std::io::Error::other("insert failed"))) },
            )
            .await;
        assert!(result.is_err());

        let product_dir = dir.path().join("products/3");
        assert_eq!(std::fs::read_dir(product_dir).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_recorded_image_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let store = MediaStore::new(dir.path());

        let url: String = store
            .store_product_image(ProductId::new(4), Some("image/jpeg"), None, b"JPG", |url| {
                async move { Ok::<_, MediaError>(url) }
            })
            .await
            .unwrap();
        assert!(store.resolve(&url).unwrap().exists());
    }

    #[tokio::test]
    async fn test_non_image_upload_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = MediaStore::new(dir.path());
        let result = store
            .save_product_image(ProductId::new(1), Some("text/plain"), Some("a.txt"), b"hi")
            .await;
        assert!(matches!(result, Err(MediaError::NotAnImage)));

        let result = store
            .save_product_image(ProductId::new(1), None, Some("a.jpg"), b"hi")
            .await;
        assert!(matches!(result, Err(MediaError::NotAnImage)));
    }

    #[tokio::test]
    async fn test_legacy_images_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        let folder = dir.path().join("falcon-5");
        std::fs::create_dir_all(&folder).unwrap();
        std::fs::write(folder.join("b.JPG"), b"").unwrap();
        std::fs::write(folder.join("a.png"), b"").unwrap();
        std::fs::write(folder.join("notes.txt"), b"").unwrap();

        let store = MediaStore::new(dir.path());
        assert_eq!(
            store.legacy_images("Falcon 5").await,
            vec!["/uploads/falcon-5/a.png", "/uploads/falcon-5/b.JPG"]
        );
        assert!(store.legacy_images("Unknown").await.is_empty());
    }

    #[tokio::test]
    async fn test_legacy_images_for_accented_name() {
        let dir = tempfile::tempdir().unwrap();
        let folder = dir.path().join("cafe-drone");
        std::fs::create_dir_all(&folder).unwrap();
        std::fs::write(folder.join("1.webp"), b"").unwrap();

        let store = MediaStore::new(dir.path());
        assert_eq!(
            store.legacy_images("Café Drone").await,
            vec!["/uploads/cafe-drone/1.webp"]
        );
    }
}
