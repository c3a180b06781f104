//! Member photo storage, for uploading pictures and cleaning them up.

use std::path::{Path, PathBuf};

use async_graphql::InputObject;
use uuid::Uuid;

use crate::error::{BarbellError, BarbellResult};

const ALLOWED_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "webp"];
const MAX_PHOTO_BYTES: usize = 5 * 1024 * 1024;

/// A photo sent by the front desk camera or file picker.
#[derive(InputObject, Clone)]
pub struct PhotoUpload {
    /// The original file name, used only for its extension
    pub file_name: String,
    /// The file contents, base64-encoded
    pub content: String,
}

#[derive(Clone, Debug)]
pub struct PhotoStorage {
    base_path: PathBuf,
}

impl PhotoStorage {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Decodes and writes the photo, returning the stored file name.
    pub async fn save(&self, upload: &PhotoUpload) -> BarbellResult<String> {
        let extension = Self::extension(&upload.file_name)?;
        let content = base64::decode(upload.content.trim())
            .map_err(|err| BarbellError::Photo(format!("couldn't decode file as base64: {}", err)))?;
        if content.is_empty() {
            return Err(BarbellError::Photo("the file is empty".to_owned()));
        }
        if content.len() > MAX_PHOTO_BYTES {
            return Err(BarbellError::Photo(format!(
                "the file is larger than {} MiB",
                MAX_PHOTO_BYTES / 1024 / 1024
            )));
        }

        tokio::fs::create_dir_all(&self.base_path)
            .await
            .map_err(|err| BarbellError::Photo(format!("error creating photo directory: {}", err)))?;

        let file_name = format!("{}.{}", Uuid::new_v4().to_simple(), extension);
        tokio::fs::write(self.base_path.join(&file_name), content)
            .await
            .map_err(|err| BarbellError::Photo(format!("error writing to file: {}", err)))?;

        Ok(file_name)
    }

    pub async fn remove(&self, file_name: &str) -> std::io::Result<()> {
        // only ever touch names we generated
        let name = Path::new(file_name)
            .file_name()
            .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::InvalidInput, "invalid photo name"))?;

        tokio::fs::remove_file(self.base_path.join(name)).await
    }

    fn extension(file_name: &str) -> BarbellResult<String> {
        let extension = Path::new(file_name)
            .extension()
            .and_then(|extension| extension.to_str())
            .map(str::to_lowercase)
            .ok_or_else(|| BarbellError::Photo("file must have an extension".to_owned()))?;

        if ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
            Ok(extension)
        } else {
            Err(BarbellError::Photo(format!(
                "{} files are not accepted, use one of {}",
                extension,
                ALLOWED_EXTENSIONS.join(", ")
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(file_name: &str, content: &[u8]) -> PhotoUpload {
        PhotoUpload {
            file_name: file_name.to_owned(),
            content: base64::encode(content),
        }
    }

    #[tokio::test]
    async fn saves_and_removes_photo() {
        let dir = tempfile::tempdir().unwrap();
        let photos = PhotoStorage::new(dir.path().join("photos"));

        let name = photos.save(&upload("me.PNG", b"not really a png")).await.unwrap();
        assert!(name.ends_with(".png"));
        let stored = tokio::fs::read(dir.path().join("photos").join(&name)).await.unwrap();
        assert_eq!(stored, b"not really a png");

        photos.remove(&name).await.unwrap();
        assert!(!dir.path().join("photos").join(&name).exists());
    }

    #[tokio::test]
    async fn rejects_unknown_extensions_and_bad_base64() {
        let dir = tempfile::tempdir().unwrap();
        let photos = PhotoStorage::new(dir.path());

        assert!(matches!(
            photos.save(&upload("me.exe", b"abc")).await,
            Err(BarbellError::Photo(_))
        ));
        assert!(matches!(
            photos.save(&upload("me", b"abc")).await,
            Err(BarbellError::Photo(_))
        ));

        let garbage = PhotoUpload {
            file_name: "me.jpg".to_owned(),
            content: "!!!not base64!!!".to_owned(),
        };
        assert!(matches!(photos.save(&garbage).await, Err(BarbellError::Photo(_))));
    }

    #[tokio::test]
    async fn enforces_size_limit() {
        let dir = tempfile::tempdir().unwrap();
        let photos = PhotoStorage::new(dir.path().join("photos"));

        let too_big = vec![0u8; MAX_PHOTO_BYTES + 1];
        assert!(matches!(
            photos.save(&upload("big.jpg", &too_big)).await,
            Err(BarbellError::Photo(_))
        ));
        assert!(matches!(
            photos.save(&upload("empty.jpg", b"")).await,
            Err(BarbellError::Photo(_))
        ));
        assert!(!dir.path().join("photos").exists());

        let largest = vec![0u8; MAX_PHOTO_BYTES];
        let name = photos.save(&upload("big.jpg", &largest)).await.unwrap();
        assert_eq!(
            std::fs::metadata(dir.path().join("photos").join(name)).unwrap().len(),
            MAX_PHOTO_BYTES as u64
        );
    }
}
