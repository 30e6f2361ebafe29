//! Integration tests for the request lifecycle core
//!
//! Covers the submission fan-out, duplicate admission, reconciliation
//! status transitions, and orphan healing against a real SQLite database
//! and a filesystem-backed object store.

use labelconv_common::db::init_database;
use labelconv_common::Error;
use labelconv_srv::db::requests;
use labelconv_srv::reconcile;
use labelconv_srv::storage::{layout, FsObjectStore, ObjectStore, RetryPolicy};
use labelconv_srv::submission::{self, SubmissionForm, UploadedFile};
use sqlx::SqlitePool;

async fn setup() -> (tempfile::TempDir, SqlitePool, FsObjectStore) {
    let dir = tempfile::tempdir().unwrap();
    let pool = init_database(&dir.path().join("labelconv.db")).await.unwrap();
    let store = FsObjectStore::new(dir.path().join("storage"));
    (dir, pool, store)
}

fn form(mail: &str) -> SubmissionForm {
    serde_json::from_value(serde_json::json!({
        "contactName": "Alice Example",
        "contactMail": mail,
        "numLabels": 3,
        "labelSoftware": "bartender",
        "conversionFonts": true,
    }))
    .unwrap()
}

fn files(names: &[&str]) -> Vec<UploadedFile> {
    names
        .iter()
        .map(|name| UploadedFile {
            name: name.to_string(),
            content_type: "image/png".to_string(),
            data: vec![0xAA; 16],
        })
        .collect()
}

async fn submit(
    pool: &SqlitePool,
    store: &FsObjectStore,
    mail: &str,
    file_names: &[&str],
) -> labelconv_common::Result<submission::SubmissionReceipt> {
    submission::submit(
        pool,
        store,
        RetryPolicy::default(),
        form(mail),
        files(file_names),
    )
    .await
}

#[tokio::test]
async fn submit_creates_one_record_and_n_plus_two_objects() {
    let (_dir, pool, store) = setup().await;

    let receipt = submit(&pool, &store, "a@b.com", &["f1.png", "f2.png"])
        .await
        .unwrap();
    assert_eq!(receipt.request_id, "REQ-1");
    assert_eq!(receipt.folder_name, "a@b.com");

    // Exactly N+2 objects: manifest, N inputs, placeholder
    let keys: Vec<String> = store
        .list("a@b.com")
        .await
        .unwrap()
        .into_iter()
        .map(|o| o.key)
        .collect();
    assert_eq!(
        keys,
        vec![
            "a@b.com/REQ-1_request.txt",
            "a@b.com/converted_files/.placeholder",
            "a@b.com/uploaded_files/f1.png",
            "a@b.com/uploaded_files/f2.png",
        ]
    );

    // Exactly one record, already in Processing
    let record = requests::find_by_email(&pool, "a@b.com").await.unwrap().unwrap();
    assert_eq!(record.id, "REQ-1");
    assert_eq!(record.status, 50);
    assert_eq!(record.folder_name, "a@b.com");
    assert_eq!(record.manifest_object, "a@b.com/REQ-1_request.txt");

    // Manifest content is the submitted metadata plus the identifier
    let manifest: serde_json::Value =
        serde_json::from_slice(&store.get("a@b.com/REQ-1_request.txt").await.unwrap()).unwrap();
    assert_eq!(manifest["ID"], "REQ-1");
    assert_eq!(manifest["contactMail"], "a@b.com");
    assert_eq!(manifest["numLabels"], 3);
}

#[tokio::test]
async fn object_count_matches_for_every_allowed_file_count() {
    let (_dir, pool, store) = setup().await;

    for n in 1..=5usize {
        let mail = format!("user{n}@example.com");
        let names: Vec<String> = (0..n).map(|i| format!("sample{i}.png")).collect();
        let name_refs: Vec<&str> = names.iter().map(String::as_str).collect();

        submit(&pool, &store, &mail, &name_refs).await.unwrap();

        let listing = store.list(&layout::folder_of(&mail)).await.unwrap();
        assert_eq!(listing.len(), n + 2, "wrong object count for {n} files");
    }
}

#[tokio::test]
async fn second_submission_for_same_email_conflicts() {
    let (_dir, pool, store) = setup().await;

    let first = submit(&pool, &store, "a@b.com", &["f1.png"]).await.unwrap();

    let err = submit(&pool, &store, "a@b.com", &["other.png"]).await.unwrap_err();
    match err {
        Error::Conflict { existing_id } => assert_eq!(existing_id, first.request_id),
        other => panic!("expected conflict, got {other:?}"),
    }

    // No second record...
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM conversion_requests")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1);

    // ...and no second object set: the folder still holds 1+2 objects
    assert_eq!(store.list("a@b.com").await.unwrap().len(), 3);
}

#[tokio::test]
async fn identifiers_advance_across_submitters() {
    let (_dir, pool, store) = setup().await;

    let r1 = submit(&pool, &store, "first@example.com", &["a.png"]).await.unwrap();
    let r2 = submit(&pool, &store, "second@example.com", &["b.png"]).await.unwrap();

    assert_eq!(r1.request_id, "REQ-1");
    assert_eq!(r2.request_id, "REQ-2");
}

#[tokio::test]
async fn resolve_is_idempotent_without_storage_changes() {
    let (_dir, pool, store) = setup().await;
    submit(&pool, &store, "a@b.com", &["f1.png"]).await.unwrap();

    let first = reconcile::resolve(&pool, &store, "a@b.com").await.unwrap().unwrap();
    let second = reconcile::resolve(&pool, &store, "a@b.com").await.unwrap().unwrap();

    assert_eq!(
        serde_json::to_value(&first).unwrap(),
        serde_json::to_value(&second).unwrap()
    );
    assert_eq!(first.record.status, 50);
    assert_eq!(first.uploaded_files.len(), 1);
    assert!(first.converted_files.is_empty());
}

#[tokio::test]
async fn converted_output_flips_status_both_ways() {
    let (_dir, pool, store) = setup().await;
    submit(&pool, &store, "a@b.com", &["f1.png"]).await.unwrap();

    // External actor deposits converted output
    store
        .put("a@b.com/converted_files/out.pdf", b"%PDF-1.4", "application/pdf")
        .await
        .unwrap();

    let resolved = reconcile::resolve(&pool, &store, "a@b.com").await.unwrap().unwrap();
    assert_eq!(resolved.record.status, 100);
    assert_eq!(resolved.converted_files.len(), 1);
    assert_eq!(resolved.converted_files[0].name, "out.pdf");

    let record = requests::find_by_email(&pool, "a@b.com").await.unwrap().unwrap();
    assert_eq!(record.status, 100, "status update must be persisted");

    // Output removed again: status falls back to Processing
    store.delete("a@b.com/converted_files/out.pdf").await.unwrap();

    let resolved = reconcile::resolve(&pool, &store, "a@b.com").await.unwrap().unwrap();
    assert_eq!(resolved.record.status, 50);
    assert!(resolved.converted_files.is_empty());
}

#[tokio::test]
async fn placeholder_alone_never_completes_a_request() {
    let (_dir, pool, store) = setup().await;
    submit(&pool, &store, "a@b.com", &["f1.png"]).await.unwrap();

    let resolved = reconcile::resolve(&pool, &store, "a@b.com").await.unwrap().unwrap();
    assert_eq!(resolved.record.status, 50);
    assert!(resolved.converted_files.is_empty());
}

#[tokio::test]
async fn deleted_folder_heals_the_orphaned_record() {
    let (_dir, pool, store) = setup().await;
    submit(&pool, &store, "a@b.com", &["f1.png"]).await.unwrap();

    // Simulate an operator deleting every object under the folder
    for object in store.list("a@b.com").await.unwrap() {
        store.delete(&object.key).await.unwrap();
    }

    let resolved = reconcile::resolve(&pool, &store, "a@b.com").await.unwrap();
    assert!(resolved.is_none(), "vanished folder must resolve to not-found");

    // The relational record is gone as well
    assert!(requests::find_by_email(&pool, "a@b.com").await.unwrap().is_none());

    // A second resolve is still a clean not-found
    assert!(reconcile::resolve(&pool, &store, "a@b.com").await.unwrap().is_none());
}

#[tokio::test]
async fn resubmission_after_folder_deletion_reuses_the_namespace() {
    let (_dir, pool, store) = setup().await;
    submit(&pool, &store, "a@b.com", &["f1.png"]).await.unwrap();

    for object in store.list("a@b.com").await.unwrap() {
        store.delete(&object.key).await.unwrap();
    }
    assert!(reconcile::resolve(&pool, &store, "a@b.com").await.unwrap().is_none());

    // Same email submits again: fresh id, same folder
    let receipt = submit(&pool, &store, "a@b.com", &["g1.png"]).await.unwrap();
    assert_eq!(receipt.request_id, "REQ-2");
    assert_eq!(receipt.folder_name, "a@b.com");

    let resolved = reconcile::resolve(&pool, &store, "a@b.com").await.unwrap().unwrap();
    assert_eq!(resolved.record.id, "REQ-2");
    assert_eq!(resolved.uploaded_files.len(), 1);
    assert_eq!(resolved.uploaded_files[0].name, "g1.png");
}

#[tokio::test]
async fn resolve_unknown_email_is_not_found() {
    let (_dir, pool, store) = setup().await;
    assert!(reconcile::resolve(&pool, &store, "nobody@nowhere.test")
        .await
        .unwrap()
        .is_none());
}
