mod common;

use std::collections::HashMap;
use std::sync::Arc;

use bento::application::purge::PurgeService;
use bento::application::registry::RegistryService;
use bento::domain::components::ComponentIdentifier;
use bento::infra::storage::FilesystemBlobStore;
use metrics_util::debugging::{DebugValue, DebuggingRecorder};

use common::{MemoryComponentsRepo, component};

#[tokio::test]
async fn purge_and_registry_emit_expected_counters() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");

    let dir = tempfile::tempdir().expect("tempdir");
    let store = Arc::new(FilesystemBlobStore::new(dir.path().to_path_buf()).expect("store"));
    store.put("button-code.tsx", b"<Button />").await.expect("seed");

    let mut record = component(1, "user-1", "button");
    record.code_ref = Some("button-code.tsx".to_string());
    record.demo_code_ref = Some("../outside.tsx".to_string());
    let repo = Arc::new(MemoryComponentsRepo::with(vec![record]));

    let registry = RegistryService::new(repo.clone(), store.clone());
    registry.build_manifest("button").await.expect("manifest");

    let purge = PurgeService::new(repo, store);
    let result = purge
        .purge(&ComponentIdentifier::ById(1))
        .await
        .expect("purge");
    assert_eq!(result.failed_deletes, vec!["../outside.tsx".to_string()]);
    purge
        .purge(&ComponentIdentifier::ById(2))
        .await
        .expect_err("unknown component");

    let counters: HashMap<String, u64> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .filter_map(|(composite_key, _, _, value)| {
            let key = composite_key.key();
            let labels: Vec<String> = key
                .labels()
                .map(|label| format!("{}={}", label.key(), label.value()))
                .collect();
            let name = if labels.is_empty() {
                key.name().to_string()
            } else {
                format!("{}{{{}}}", key.name(), labels.join(","))
            };
            match value {
                DebugValue::Counter(count) => Some((name, count)),
                _ => None,
            }
        })
        .collect();

    assert_eq!(counters.get("bento_registry_manifest_total"), Some(&1));
    assert_eq!(counters.get("bento_purge_blob_delete_failed_total"), Some(&1));
    assert_eq!(counters.get("bento_purge_total{outcome=partial}"), Some(&1));
    assert_eq!(counters.get("bento_purge_total{outcome=not_found}"), Some(&1));
}
