//! File uploads and downloads
//!
//! An upload records the file row and writes its bytes inside the same
//! transaction. A storage failure rolls the row back; a failed commit deletes
//! the bytes again on a best-effort basis.

use anyhow::Context;
use bytes::Bytes;
use image::ImageFormat;
use quire_core::models::{File, FileInfo, FileType, Session};
use quire_core::{AppError, AppResult};
use quire_db::{finish, Database, LockMode, Stores};
use quire_storage::{file_key, Storage, StorageError};
use std::sync::Arc;
use uuid::Uuid;

use crate::roster::UserResolver;

/// How far into an upload to look for an `<svg` tag
const SVG_SNIFF_LEN: usize = 1024;

/// A file together with its bytes
#[derive(Debug, Clone)]
pub struct FileDownload {
    pub file: File,
    pub data: Bytes,
}

/// Detects the content type from the leading bytes of an upload.
pub fn sniff_file_type(data: &[u8]) -> FileType {
    match image::guess_format(data) {
        Ok(ImageFormat::Jpeg) => return FileType::Jpeg,
        Ok(ImageFormat::Png) => return FileType::Png,
        Ok(ImageFormat::WebP) => return FileType::Webp,
        Ok(ImageFormat::Gif) => return FileType::Gif,
        _ => {}
    }

    let head = &data[..data.len().min(SVG_SNIFF_LEN)];
    let text = String::from_utf8_lossy(head);
    let text = text.trim_start_matches('\u{feff}').trim_start();
    if text.starts_with("<svg") || (text.starts_with("<?xml") && text.contains("<svg")) {
        return FileType::Svg;
    }

    FileType::Other
}

pub(crate) fn storage_error(file_id: Uuid, err: StorageError) -> AppError {
    match err {
        StorageError::NotFound(_) => {
            AppError::NoFile(format!("Content of file {} is missing", file_id))
        }
        other => AppError::Storage(format!("File {}: {}", file_id, other)),
    }
}

pub struct FileService<D: Database> {
    db: Arc<D>,
    stores: Stores<D::Tx>,
    users: UserResolver,
    storage: Arc<dyn Storage>,
    max_file_size: usize,
}

impl<D: Database> Clone for FileService<D> {
    fn clone(&self) -> Self {
        Self {
            db: Arc::clone(&self.db),
            stores: self.stores.clone(),
            users: self.users.clone(),
            storage: Arc::clone(&self.storage),
            max_file_size: self.max_file_size,
        }
    }
}

impl<D: Database> FileService<D> {
    pub fn new(
        db: Arc<D>,
        stores: Stores<D::Tx>,
        users: UserResolver,
        storage: Arc<dyn Storage>,
        max_file_size: usize,
    ) -> Self {
        Self {
            db,
            stores,
            users,
            storage,
            max_file_size,
        }
    }

    #[tracing::instrument(skip(self, session, data), fields(file.size = data.len()))]
    pub async fn upload(&self, session: &Session, data: Bytes) -> AppResult<FileInfo> {
        if data.is_empty() {
            return Err(AppError::InvalidInput("File is empty".to_string()));
        }
        if data.len() > self.max_file_size {
            return Err(AppError::PayloadTooLarge(format!(
                "File is {} bytes, the limit is {}",
                data.len(),
                self.max_file_size
            )));
        }

        let user = self.users.me(session).await?;
        let file = File::new(sniff_file_type(&data));
        let key = file_key(file.id);

        let mut tx = self.db.begin().await?;
        if let Err(err) = self.upload_tx(&mut tx, user.id, &file, &key, data).await {
            if let Err(rollback_err) = self.db.rollback(tx).await {
                tracing::warn!(error = %rollback_err, "Failed to roll back transaction");
            }
            return Err(err);
        }

        if let Err(err) = self.db.commit(tx).await {
            if let Err(cleanup_err) = self.storage.delete(&key).await {
                tracing::warn!(
                    file.id = %file.id,
                    error = %cleanup_err,
                    "Failed to delete content of uncommitted file"
                );
            }
            return Err(err.into());
        }

        tracing::info!(
            file.id = %file.id,
            user.id = %user.id,
            file.file_type = %file.file_type,
            "File uploaded"
        );

        Ok(FileInfo {
            file,
            creator: user,
        })
    }

    async fn upload_tx(
        &self,
        tx: &mut D::Tx,
        creator_id: Uuid,
        file: &File,
        key: &str,
        data: Bytes,
    ) -> AppResult<()> {
        self.stores
            .files
            .save_file(tx, creator_id, file)
            .await
            .context("Failed to save file")?;

        self.storage
            .upload(key, data, file.file_type.mime_type())
            .await
            .map_err(|e| storage_error(file.id, e))
    }

    #[tracing::instrument(skip(self), fields(file.id = %file_id))]
    pub async fn download(&self, file_id: Uuid) -> AppResult<FileDownload> {
        let mut tx = self.db.begin().await?;
        let outcome = self
            .stores
            .files
            .get_file(&mut tx, file_id, LockMode::None)
            .await
            .context("Failed to get file")
            .map_err(AppError::from)
            .and_then(|record| {
                record.ok_or_else(|| AppError::NoFile(format!("File {} not found", file_id)))
            });
        let record = finish(&*self.db, tx, outcome).await?;

        let data = self
            .storage
            .download(&file_key(file_id))
            .await
            .map_err(|e| storage_error(file_id, e))?;

        Ok(FileDownload {
            file: record.file,
            data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sniff_images() {
        assert_eq!(
            sniff_file_type(b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR"),
            FileType::Png
        );
        assert_eq!(sniff_file_type(b"\xff\xd8\xff\xe0\0\x10JFIF"), FileType::Jpeg);
        assert_eq!(sniff_file_type(b"GIF89a\x01\0\x01\0"), FileType::Gif);
        assert_eq!(sniff_file_type(b"RIFF\0\0\0\0WEBPVP8 "), FileType::Webp);
    }

    #[test]
    fn test_sniff_svg() {
        assert_eq!(
            sniff_file_type(br#"<svg xmlns="http://www.w3.org/2000/svg"></svg>"#),
            FileType::Svg
        );
        assert_eq!(
            sniff_file_type(b"<?xml version=\"1.0\"?>\n<svg></svg>"),
            FileType::Svg
        );
        assert_eq!(sniff_file_type(b"  \n<svg/>"), FileType::Svg);
    }

    #[test]
    fn test_sniff_other() {
        assert_eq!(sniff_file_type(b"plain text"), FileType::Other);
        assert_eq!(sniff_file_type(b"<?xml version=\"1.0\"?><doc/>"), FileType::Other);
        assert_eq!(sniff_file_type(b"%PDF-1.7"), FileType::Other);
    }

    #[test]
    fn test_missing_content_is_no_file() {
        let id = Uuid::new_v4();

        assert!(matches!(
            storage_error(id, StorageError::NotFound("files/x".into())),
            AppError::NoFile(_)
        ));
        assert!(matches!(
            storage_error(id, StorageError::UploadFailed("disk full".into())),
            AppError::Storage(_)
        ));
    }
}
