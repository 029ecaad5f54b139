#![forbid(unsafe_code)]

use dh_core::device::ComponentKind;
use dh_core::identity::hash_hex;
use dh_hub::{AlgorithmEntry, AlgorithmTable, Hub, HubConfig, HubError, StoreError};
use dh_normalizer::NormalizeError;
use serde_json::{Value, json};
use std::path::{Path, PathBuf};

const OWNER: &str = "circular-lab";
const AUDITOR: &str = "auditor@circular-lab.eu";

fn temp_dir(test_name: &str) -> PathBuf {
    let base = std::env::temp_dir();
    let pid = std::process::id();
    let nonce = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    let dir = base.join(format!("dh_hub_{test_name}_{pid}_{nonce}"));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn open_hub(dir: &Path) -> Hub {
    let mut config = HubConfig::new(dir.join("store"));
    config.archive_dir = Some(dir.join("archive"));
    Hub::open(config).expect("open hub")
}

fn uuid(tail: u8) -> String {
    format!("7c1de6a4-33f0-48d1-9b2e-aa40b1c7e9{tail:02x}")
}

fn machine_rows(serial: &str) -> Value {
    json!([
        {"004#1#0#Machine": [
            {
                "006#1#2#System": "Dell",
                "007#1#2#product": "X1",
                "008#1#2#v": "01",
                "009#1#2#serial": serial,
                "010#1#2#Type": "Laptop",
            },
            {
                "015#1#2#Mobo": "Dell",
                "016#1#2#model": "0B2RP3",
                "017#1#2#v": "A00",
                "018#1#2#serial": "/5Q3/",
                "019#1#2#date": "05/07/2019",
            },
        ]},
    ])
}

fn workbench_payload(uuid: &str, serial: &str) -> Value {
    json!({
        "uuid": uuid,
        "software": "workbench-script",
        "version": "2022.03",
        "data": {"inxi": machine_rows(serial).to_string()},
    })
}

// ereuse24 concatenates manufacturer, model, chassis, serial and sku; the
// fixtures leave the sku empty.
fn device_value(serial: &str) -> String {
    hash_hex(&format!("DellX1Laptop{serial}"))
}

#[test]
fn modern_submission_computes_the_pinned_identity() {
    let dir = temp_dir("modern");
    let mut hub = open_hub(&dir);
    let id = uuid(0x01);

    let receipt = hub
        .submit_evidence(&workbench_payload(&id, "SN1"), OWNER, Some(AUDITOR))
        .expect("submit");

    let expected = hash_hex("DellX1LaptopSN1");
    assert_eq!(receipt.value, expected);
    assert_eq!(receipt.algorithm, "ereuse24");
    assert_eq!(receipt.short_id, expected[..6].to_uppercase());
    assert_eq!(receipt.uuid, id);
    assert!(receipt.inserted);
    assert!(receipt.recorded_at_ms > 0);
    assert!(
        receipt.warnings.is_empty(),
        "unexpected warnings: {:?}",
        receipt.warnings
    );

    let page = hub.list_devices(OWNER, 0, 10).expect("list");
    assert_eq!(page.total, 1);
    assert_eq!(page.values, vec![expected]);
}

#[test]
fn credential_wrapper_routes_to_the_general_algorithm() {
    let dir = temp_dir("signed");
    let mut hub = open_hub(&dir);
    let id = uuid(0x02);

    // The envelope's category tag must lose to the wrapper: the subject's
    // evidence list carries a full live-enumeration dataset.
    let payload = json!({
        "type": "Display",
        "credentialSubject": {
            "uuid": id,
            "software": "workbench-script",
            "evidence": [
                {"operation": "inxi", "output": machine_rows("SN2")},
            ],
        },
    });

    let receipt = hub.submit_evidence(&payload, OWNER, None).expect("submit");
    assert_eq!(receipt.algorithm, "ereuse24");
    assert_eq!(receipt.value, device_value("SN2"));
    assert_eq!(receipt.uuid, id);
    assert!(receipt.inserted);
}

#[test]
fn resubmission_returns_the_stored_value_without_inserting() {
    let dir = temp_dir("replay");
    let mut hub = open_hub(&dir);
    let id = uuid(0x03);

    let first = hub
        .submit_evidence(&workbench_payload(&id, "SN3"), OWNER, Some(AUDITOR))
        .expect("first");
    let second = hub
        .submit_evidence(&workbench_payload(&id, "SN3"), OWNER, Some(AUDITOR))
        .expect("second");

    assert!(first.inserted);
    assert!(!second.inserted);
    assert_eq!(second.value, first.value);
    assert_eq!(hub.list_devices(OWNER, 0, 10).expect("list").total, 1);
}

#[test]
fn archive_stages_then_promotes_accepted_payloads() {
    let dir = temp_dir("archive");
    let mut hub = open_hub(&dir);
    let id = uuid(0x04);

    hub.submit_evidence(&workbench_payload(&id, "SN4"), OWNER, Some(AUDITOR))
        .expect("submit");

    let accepted = dir.join("archive").join(OWNER).join("accepted");
    let incoming = dir.join("archive").join(OWNER).join("incoming");
    let names = file_names(&accepted);
    assert_eq!(names.len(), 1);
    assert!(
        names[0].ends_with(&format!("_{id}.json")),
        "unexpected archive name {}",
        names[0]
    );
    assert_eq!(file_names(&incoming).len(), 0);

    let stored: Value = serde_json::from_str(
        &std::fs::read_to_string(accepted.join(&names[0])).expect("read archived payload"),
    )
    .expect("archived payload parses");
    assert_eq!(stored["uuid"], json!(id));

    // A payload that fails normalization stays behind in incoming/.
    let bad = uuid(0x05);
    let rejected = hub.submit_evidence(
        &json!({"uuid": bad, "software": "workbench-script", "data": {}}),
        OWNER,
        None,
    );
    assert!(matches!(
        rejected,
        Err(HubError::Normalize(NormalizeError::MissingRequiredData(_)))
    ));
    let leftover = file_names(&incoming);
    assert_eq!(leftover.len(), 1);
    assert!(leftover[0].ends_with(&format!("_{bad}.json")));
}

#[test]
fn aliases_collapse_listings_and_merge_history() {
    let dir = temp_dir("aliases");
    let mut hub = open_hub(&dir);
    let old_evidence = uuid(0x06);
    let new_evidence = uuid(0x07);

    hub.submit_evidence(
        &workbench_payload(&old_evidence, "SN-OLD"),
        OWNER,
        Some(AUDITOR),
    )
    .expect("old");
    hub.submit_evidence(
        &workbench_payload(&new_evidence, "SN-NEW"),
        OWNER,
        Some(AUDITOR),
    )
    .expect("new");
    let old_value = device_value("SN-OLD");
    let new_value = device_value("SN-NEW");
    assert_eq!(hub.list_devices(OWNER, 0, 10).expect("before").total, 2);

    hub.create_alias(OWNER, &old_value, &new_value)
        .expect("alias");
    let after = hub.list_devices(OWNER, 0, 10).expect("after");
    assert_eq!(after.total, 1);
    assert_eq!(after.values, vec![new_value.clone()]);

    let history = hub.evidence_history(OWNER, &old_value).expect("history");
    assert_eq!(history.len(), 2);
    let uuids: Vec<&str> = history.iter().map(|row| row.uuid.as_str()).collect();
    assert!(uuids.contains(&old_evidence.as_str()));
    assert!(uuids.contains(&new_evidence.as_str()));

    let conflict = hub.create_alias(OWNER, &old_value, &device_value("SN-ELSE"));
    assert!(matches!(
        conflict,
        Err(HubError::Store(StoreError::AliasConflict { .. }))
    ));
    let own = hub.create_alias(OWNER, &new_value, &new_value);
    assert!(matches!(own, Err(HubError::Store(StoreError::SelfAlias))));
}

#[test]
fn lot_membership_filters_the_unassigned_view() {
    let dir = temp_dir("lots");
    let mut hub = open_hub(&dir);

    hub.submit_evidence(&workbench_payload(&uuid(0x08), "SN-A"), OWNER, Some(AUDITOR))
        .expect("a");
    hub.submit_evidence(&workbench_payload(&uuid(0x09), "SN-B"), OWNER, Some(AUDITOR))
        .expect("b");
    let value_a = device_value("SN-A");

    assert!(hub.lot_member_add(OWNER, "inbound", &value_a).expect("add"));
    let unassigned = hub.list_unassigned_devices(OWNER, 0, 10).expect("unassigned");
    assert_eq!(unassigned.total, 1);
    assert_eq!(unassigned.values, vec![device_value("SN-B")]);
    assert_eq!(hub.list_devices(OWNER, 0, 10).expect("all").total, 2);

    assert!(
        hub.lot_member_remove(OWNER, "inbound", &value_a)
            .expect("remove")
    );
    assert_eq!(
        hub.list_unassigned_devices(OWNER, 0, 10)
            .expect("restored")
            .total,
        2
    );
}

#[test]
fn device_detail_renders_attributes_from_stored_evidence() {
    let dir = temp_dir("detail");
    let mut hub = open_hub(&dir);
    let id = uuid(0x0a);

    hub.submit_evidence(&workbench_payload(&id, "SN7"), OWNER, Some(AUDITOR))
        .expect("submit");
    let value = device_value("SN7");

    let detail = hub
        .device_detail(OWNER, &value)
        .expect("detail")
        .expect("known device");
    assert_eq!(detail.value, value);
    assert_eq!(detail.short_id, value[..6].to_uppercase());
    assert_eq!(detail.attributes.manufacturer, "Dell");
    assert_eq!(detail.attributes.serial_number, "SN7");
    assert_eq!(detail.components.len(), 1);
    assert_eq!(detail.components[0].kind, ComponentKind::Motherboard);
    assert_eq!(detail.components[0].get("model"), Some("0B2RP3"));
    assert!(detail.warnings.is_empty());
    assert_eq!(detail.history.len(), 1);
    assert_eq!(detail.history[0].uuid, id);
    assert_eq!(detail.history[0].submitted_by.as_deref(), Some(AUDITOR));

    let missing = hub
        .device_detail(OWNER, &device_value("SN-UNKNOWN"))
        .expect("query");
    assert!(missing.is_none());
}

#[test]
fn rejected_inputs_never_touch_the_store() {
    let dir = temp_dir("rejects");
    let mut hub = open_hub(&dir);

    let bad_owner = hub.submit_evidence(&workbench_payload(&uuid(0x0b), "SN8"), "", None);
    assert!(matches!(bad_owner, Err(HubError::InvalidInput(_))));

    let bad_uuid = hub.submit_evidence(&workbench_payload("not-a-uuid", "SN8"), OWNER, None);
    assert!(matches!(bad_uuid, Err(HubError::InvalidInput(_))));

    let unrecognized = hub.submit_evidence(&json!(["not", "an", "object"]), OWNER, None);
    assert!(matches!(
        unrecognized,
        Err(HubError::Normalize(NormalizeError::UnrecognizedVariant))
    ));

    assert_eq!(hub.list_devices(OWNER, 0, 10).expect("list").total, 0);
}

#[test]
fn algorithm_overrides_rename_the_key_and_field_list() {
    let dir = temp_dir("override");
    let mut config = HubConfig::new(dir.join("store"));
    config.algorithms = Some(AlgorithmTable {
        general: Some(AlgorithmEntry {
            key: "lab-v2".to_string(),
            fields: vec!["manufacturer".to_string(), "serialNumber".to_string()],
        }),
        ..AlgorithmTable::default()
    });
    let mut hub = Hub::open(config).expect("open hub");

    let receipt = hub
        .submit_evidence(&workbench_payload(&uuid(0x0d), "SN9"), OWNER, None)
        .expect("submit");
    assert_eq!(receipt.algorithm, "lab-v2");
    assert_eq!(receipt.value, hash_hex("DellSN9"));
    assert!(receipt.warnings.is_empty());
}

fn file_names(dir: &Path) -> Vec<String> {
    std::fs::read_dir(dir)
        .expect("read dir")
        .map(|entry| {
            entry
                .expect("dir entry")
                .file_name()
                .to_string_lossy()
                .into_owned()
        })
        .collect()
}
