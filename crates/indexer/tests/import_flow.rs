use layout_indexer::{IndexerError, ResourceImporter};
use layout_protocol::{HostCall, MemoryHost, SettlePolicy};
use pretty_assertions::assert_eq;
use std::fs;
use std::sync::Arc;

#[tokio::test]
async fn import_copies_then_refreshes_destination() {
    let source = tempfile::tempdir().unwrap();
    let project = tempfile::tempdir().unwrap();
    fs::write(source.path().join("hero.png"), b"png").unwrap();
    fs::create_dir_all(source.path().join("hud")).unwrap();
    fs::write(source.path().join("hud/coin.jpg"), b"jpg").unwrap();

    let target = project.path().join("assets/layout");
    let host = Arc::new(MemoryHost::empty());
    let importer = ResourceImporter::new(host.clone(), SettlePolicy::immediate());

    let imported = importer
        .import(source.path(), &target, project.path(), true)
        .await
        .unwrap();

    assert_eq!(imported.db_path, "db://assets/layout");
    assert_eq!(imported.images.len(), 2);
    assert_eq!(imported.images["coin"].relative_path, "hud/coin.jpg");
    assert!(target.join("hud/coin.jpg").exists());
    assert_eq!(
        host.calls(),
        vec![HostCall::Refresh("db://assets/layout".to_string())]
    );
}

#[tokio::test]
async fn target_outside_assets_copies_nothing() {
    let source = tempfile::tempdir().unwrap();
    let project = tempfile::tempdir().unwrap();
    fs::write(source.path().join("hero.png"), b"png").unwrap();

    let target = project.path().join("sprites");
    let host = Arc::new(MemoryHost::empty());
    let importer = ResourceImporter::new(host.clone(), SettlePolicy::immediate());

    let result = importer
        .import(source.path(), &target, project.path(), true)
        .await;

    assert!(matches!(result, Err(IndexerError::OutsideAssets { .. })));
    assert!(!target.exists());
    assert!(host.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn import_waits_out_both_settle_pauses() {
    let source = tempfile::tempdir().unwrap();
    let project = tempfile::tempdir().unwrap();
    let host = Arc::new(MemoryHost::empty());
    let settle = SettlePolicy {
        after_refresh_ms: 3_000,
        after_import_ms: 2_000,
        ..SettlePolicy::immediate()
    };
    let importer = ResourceImporter::new(host, settle);

    let started = tokio::time::Instant::now();
    let imported = importer
        .import(
            &source.path().join("none"),
            &project.path().join("assets"),
            project.path(),
            false,
        )
        .await
        .unwrap();

    assert!(imported.images.is_empty());
    assert!(started.elapsed() >= std::time::Duration::from_millis(5_000));
}
