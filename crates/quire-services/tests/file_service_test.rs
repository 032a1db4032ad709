use bytes::Bytes;
use quire_core::models::FileType;
use quire_core::AppError;
use quire_services::test_helpers::{TestContext, TEST_MAX_FILE_SIZE};
use quire_storage::file_key;
use uuid::Uuid;

const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

#[tokio::test]
async fn test_upload_records_file_and_stores_bytes() {
    let ctx = TestContext::new();
    let (alice, session) = ctx.user("alice");

    let info = ctx
        .files
        .upload(&session, Bytes::from_static(PNG))
        .await
        .unwrap();

    assert_eq!(info.file.file_type, FileType::Png);
    assert_eq!(info.creator, alice);
    assert!(ctx.storage.has_file(&file_key(info.file.id)));

    let snapshot = ctx.db.snapshot();
    assert_eq!(snapshot.files[&info.file.id].creator_id, alice.id);

    let download = ctx.files.download(info.file.id).await.unwrap();
    assert_eq!(download.file, info.file);
    assert_eq!(download.data, Bytes::from_static(PNG));
}

#[tokio::test]
async fn test_upload_rejects_empty_and_oversized_input() {
    let ctx = TestContext::new();
    let (_, session) = ctx.user("alice");

    let result = ctx.files.upload(&session, Bytes::new()).await;
    assert!(matches!(result, Err(AppError::InvalidInput(_))));

    let oversized = Bytes::from(vec![0u8; TEST_MAX_FILE_SIZE + 1]);
    let result = ctx.files.upload(&session, oversized).await;
    assert!(matches!(result, Err(AppError::PayloadTooLarge(_))));

    assert!(ctx.db.snapshot().files.is_empty());
    assert!(ctx.storage.is_empty());
}

#[tokio::test]
async fn test_storage_failure_rolls_back_file_row() {
    let ctx = TestContext::new();
    let (_, session) = ctx.user("alice");
    ctx.storage.set_fail_uploads(true);

    let result = ctx.files.upload(&session, Bytes::from_static(PNG)).await;

    assert!(matches!(result, Err(AppError::Storage(_))));
    assert!(ctx.db.snapshot().files.is_empty());
    assert_eq!(ctx.db.rollbacks(), 1);
}

#[tokio::test]
async fn test_commit_failure_removes_stored_bytes() {
    let ctx = TestContext::new();
    let (_, session) = ctx.user("alice");
    ctx.db.fail_next_commit();

    let result = ctx.files.upload(&session, Bytes::from_static(PNG)).await;

    assert!(result.is_err());
    assert!(ctx.db.snapshot().files.is_empty());
    assert!(ctx.storage.is_empty());
}

#[tokio::test]
async fn test_download_unknown_file_is_no_file() {
    let ctx = TestContext::new();

    let result = ctx.files.download(Uuid::new_v4()).await;

    assert!(matches!(result, Err(AppError::NoFile(_))));
}
