//! Registry behaviour against the on-disk JSON document.

use chrono::{DateTime, Duration, TimeZone, Utc};
use mlops_registry::*;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

fn clock_from(start: DateTime<Utc>) -> impl Fn() -> DateTime<Utc> + Send + Sync + 'static {
    let ticks = AtomicI64::new(0);
    move || start + Duration::milliseconds(ticks.fetch_add(1, Ordering::SeqCst))
}

fn open(dir: &tempfile::TempDir) -> ModelRegistry<JsonFileStore> {
    let start = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
    ModelRegistry::open(dir.path().join("models/registry.json")).with_clock(clock_from(start))
}

#[test]
fn reregistering_a_key_overwrites_the_record() {
    let dir = tempfile::tempdir().unwrap();
    let reg = open(&dir);
    let first = reg.register(ModelRegistration::new("m", "v1", "a.pth", "classification").metric("accuracy", 0.80)).unwrap();
    reg.set_status("m", "v1", ModelStatus::Archived).unwrap();
    let second = reg.register(ModelRegistration::new("m", "v1", "b.pth", "classification").metric("f1", 0.70)).unwrap();

    let info = reg.get_info("m", "v1").unwrap();
    assert_eq!(info, second);
    assert!(info.registered_at > first.registered_at);
    assert_eq!(info.metrics.get("accuracy"), None);
    assert_eq!(info.metrics.get("f1"), Some(&0.70));
    assert_eq!(info.status, ModelStatus::Active);
    assert_eq!(reg.list_all().unwrap().len(), 1);
}

#[test]
fn latest_resolves_to_most_recent_registration() {
    let dir = tempfile::tempdir().unwrap();
    let reg = open(&dir);
    reg.register(ModelRegistration::new("m", "v1", "v1.pth", "classification")).unwrap();
    reg.register(ModelRegistration::new("m", "v2", "v2.pth", "classification")).unwrap();
    assert_eq!(reg.get_info("m", "latest").unwrap().version, "v2");
    assert_eq!(reg.resolve_artifact("m", "latest").unwrap().to_str(), Some("v2.pth"));
}

#[test]
fn saving_a_loaded_document_is_a_no_op() {
    let dir = tempfile::tempdir().unwrap();
    let reg = open(&dir);
    reg.register(
        ModelRegistration::new("efficientnet_classification", "v1.0.0", "models/artifacts/efficientnet_b0.pth", "classification")
            .metric("accuracy", 0.85)
            .metric("inference_time_ms", 45.2)
            .metadata("architecture", "EfficientNet-B0")
            .metadata("input_shape", serde_json::json!([3, 224, 224]))
            .metadata("pretrained", true),
    )
    .unwrap();
    let store = reg.store();
    let before = std::fs::read_to_string(store.path()).unwrap();
    let loaded = store.load().unwrap();
    store.save(&loaded).unwrap();
    let after = std::fs::read_to_string(store.path()).unwrap();
    assert_eq!(before, after);
    assert_eq!(store.load().unwrap(), loaded);
}

#[test]
fn metrics_survive_reload_and_status_changes_bit_for_bit() {
    use rand::Rng;

    let dir = tempfile::tempdir().unwrap();
    let reg = open(&dir);
    let mut rng = rand::thread_rng();
    let mut registration = ModelRegistration::new("m", "v1", "m.pth", "classification");
    for i in 0..5_000 {
        registration = registration.metric(format!("unit{i:05}"), rng.gen::<f64>());
    }
    let mut extremes = 0;
    while extremes < 1_000 {
        let value = f64::from_bits(rng.gen::<u64>());
        if value.is_finite() {
            registration = registration.metric(format!("bits{extremes:05}"), value);
            extremes += 1;
        }
    }
    let registered = reg.register(registration).unwrap();

    let reloaded = reg.get_info("m", "v1").unwrap();
    assert_eq!(reloaded.metrics.len(), registered.metrics.len());
    for (key, value) in &registered.metrics {
        assert_eq!(reloaded.metrics[key].to_bits(), value.to_bits(), "metric {key} drifted");
    }

    let before = std::fs::read(reg.store().path()).unwrap();
    reg.set_status("m", "v1", ModelStatus::Deprecated).unwrap();
    reg.set_status("m", "v1", ModelStatus::Active).unwrap();
    let after = std::fs::read(reg.store().path()).unwrap();
    assert!(before == after, "status round trip rewrote other fields");
    for (key, value) in &reg.get_info("m", "v1").unwrap().metrics {
        assert_eq!(value.to_bits(), registered.metrics[key].to_bits());
    }
}

#[test]
fn unknown_keys_are_not_found_and_not_created() {
    let dir = tempfile::tempdir().unwrap();
    let reg = open(&dir);
    assert!(reg.get_info("missing", "v1").unwrap_err().is_not_found());
    assert!(reg.update_status("missing", "v1", "archived").unwrap_err().is_not_found());
    assert!(reg.list_all().unwrap().is_empty());
    assert!(!reg.store().path().exists());
}

#[test]
fn bogus_status_is_rejected_and_leaves_record_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let reg = open(&dir);
    reg.register(ModelRegistration::new("m", "v1", "a.pth", "classification")).unwrap();
    let err = reg.update_status("m", "v1", "bogus").unwrap_err();
    assert!(matches!(err, RegistryError::InvalidArgument(_)));
    assert_eq!(reg.get_info("m", "v1").unwrap().status, ModelStatus::Active);

    let updated = reg.update_status("m", "v1", "deprecated").unwrap();
    assert_eq!(updated.status, ModelStatus::Deprecated);
    assert_eq!(reg.get_info("m", "v1").unwrap().status, ModelStatus::Deprecated);
}

#[test]
fn reads_documents_with_naive_timestamps() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("registry.json");
    std::fs::write(
        &path,
        r#"{
  "resnet:v1": {"name": "resnet", "version": "v1", "model_path": "models/artifacts/resnet.pth",
                "model_type": "classification", "metrics": {"accuracy": 0.9}, "metadata": {},
                "registered_at": "2024-01-10T08:00:00.000001", "status": "active"},
  "resnet:v2": {"name": "resnet", "version": "v2", "model_path": "models/artifacts/resnet2.pkl",
                "model_type": "classification", "metrics": {}, "metadata": {"optimizer": "AdamW"},
                "registered_at": "2024-02-10T08:00:00", "status": "deprecated"}
}"#,
    )
    .unwrap();
    let reg = ModelRegistry::open(&path);
    let latest = reg.get_info("resnet", "latest").unwrap();
    assert_eq!(latest.version, "v2");
    assert_eq!(latest.status, ModelStatus::Deprecated);
    assert_eq!(latest.metadata["optimizer"], "AdamW");
}

#[test]
fn concurrent_registrations_are_not_lost() {
    let dir = tempfile::tempdir().unwrap();
    let reg = Arc::new(ModelRegistry::open(dir.path().join("registry.json")));
    const WRITERS: usize = 16;

    std::thread::scope(|s| {
        for i in 0..WRITERS {
            let reg = Arc::clone(&reg);
            s.spawn(move || {
                reg.register(ModelRegistration::new(format!("model{i}"), "v1", format!("m{i}.pth"), "classification"))
                    .unwrap();
            });
        }
        // readers must never observe a half-written document
        for _ in 0..4 {
            let reg = Arc::clone(&reg);
            s.spawn(move || {
                for _ in 0..50 {
                    reg.list_all().unwrap();
                }
            });
        }
    });

    let all = reg.list_all().unwrap();
    assert_eq!(all.len(), WRITERS);
    for i in 0..WRITERS {
        assert!(all.contains_key(&format!("model{i}:v1")));
    }
}
