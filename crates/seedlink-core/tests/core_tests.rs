use seedlink_core::{
    ConflictReason, Disposition, EntryOutcome, Manifest, ManifestEntry, ManifestError,
    RunSummary,
};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

#[test]
fn test_manifest_from_path() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("ubuntu-iso.json");
    fs::write(
        &path,
        r#"{"files":[{"path":"disc/ubuntu.iso","length":4096},{"path":"SHA256SUMS","length":128}]}"#,
    )
    .unwrap();

    let manifest = Manifest::from_path(&path).unwrap();

    assert_eq!(manifest.name, "ubuntu-iso");
    assert_eq!(
        manifest.entries,
        vec![
            ManifestEntry::new("disc/ubuntu.iso", 4096),
            ManifestEntry::new("SHA256SUMS", 128),
        ]
    );
}

#[test]
fn test_manifest_missing_file() {
    let temp = TempDir::new().unwrap();
    let err = Manifest::from_path(&temp.path().join("nope.json")).unwrap_err();

    assert!(matches!(err, ManifestError::Io { .. }));
    assert!(err.to_string().contains("nope.json"));
}

#[test]
fn test_manifest_preserves_declaration_order() {
    let manifest = Manifest::from_json(
        "ordered",
        r#"{"files":[
            {"path":"z","length":1},
            {"path":"a","length":2},
            {"path":"m","length":3}
        ]}"#,
    )
    .unwrap();

    let names: Vec<_> = manifest
        .entries
        .iter()
        .map(|e| e.relative_path.clone())
        .collect();
    assert_eq!(
        names,
        vec![PathBuf::from("z"), PathBuf::from("a"), PathBuf::from("m")]
    );
}

#[test]
fn test_summary_json_shape() {
    let summary = RunSummary::new(
        "set",
        vec![EntryOutcome::new(
            ManifestEntry::new("b/z.bin", 100),
            PathBuf::from("/dest/b/z.bin"),
            Disposition::Conflicted {
                reason: ConflictReason::ClaimedBy {
                    source: "/src/p1".into(),
                    claimed_by: "a/x.bin".into(),
                },
            },
        )],
    );

    let value = serde_json::to_value(&summary).unwrap();
    let disposition = &value["outcomes"][0]["disposition"];

    assert_eq!(disposition["status"], "conflicted");
    assert_eq!(disposition["reason"]["kind"], "claimed_by");
    assert_eq!(value["counts"]["conflicted"], 1);
}
