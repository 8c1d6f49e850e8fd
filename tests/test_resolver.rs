// Key resolution against a realistic manifest
use s3_tagger::manifest::{parse_manifest, ClassificationEntry, ClassificationTable};
use s3_tagger::resolver::{resolve, ResolutionStatus};

fn manifest() -> ClassificationTable {
    parse_manifest(
        "db,table,pii\n\
         db1,tab1,false\n\
         db2,tab2,true\n\
         db3,tab3,\n\
         db5,tab5,1\n"
            .as_bytes(),
    )
    .unwrap()
}

#[test]
fn test_partition_depth_independence() {
    let table = manifest();
    for key in [
        "data/db1/tab1/00000_0",
        "data/db1/tab1/partition1/00000_0",
        "data/db1.db/tab1/0000_0",
    ] {
        let resolution = resolve(key, &table);
        assert_eq!(resolution.database, "db1", "key {}", key);
        assert_eq!(resolution.table, "tab1", "key {}", key);
        assert_eq!(resolution.pii, "false", "key {}", key);
        assert!(resolution.matched(), "key {}", key);
    }
}

#[test]
fn test_deeper_partitions_are_not_searched() {
    // Database five segments from the end is out of reach
    let resolution = resolve("data/db1/tab1/p1/p2/00000_0", &manifest());
    assert_eq!(resolution.status, ResolutionStatus::DatabaseMissing);
}

#[test]
fn test_resolution_is_deterministic() {
    let table = manifest();
    let keys = [
        "data/db2/tab2/00000_0",
        "data/db1/tab9/00000_0",
        "data/db9/tab9/00000_0",
        "db1/tab1",
        "data/db4/tab4_$folder$",
    ];
    for key in keys {
        assert_eq!(resolve(key, &table), resolve(key, &table));
    }
}

#[test]
fn test_edge_case_policy() {
    let table = manifest();

    let cases = [
        ("db1/tab1", ResolutionStatus::PatternMismatch, false, false),
        ("data/db9/tab9/00000_0", ResolutionStatus::DatabaseMissing, false, true),
        ("data/db1/tab9/00000_0", ResolutionStatus::TableMissing, false, true),
        ("data/db3/tab3/00000_0", ResolutionStatus::Unclassified, true, true),
        ("data/db2/tab2/00000_0", ResolutionStatus::Classified, true, true),
    ];

    for (key, status, matched, writable) in cases {
        let resolution = resolve(key, &table);
        assert_eq!(resolution.status, status, "key {}", key);
        assert_eq!(resolution.matched(), matched, "key {}", key);
        assert_eq!(resolution.status.is_writable(), writable, "key {}", key);
    }
}

#[test]
fn test_digit_manifest_pii_is_written_verbatim() {
    let resolution = resolve("data/db5/tab5/00000_0", &manifest());
    assert_eq!(resolution.pii, "1");
    assert_eq!(resolution.status, ResolutionStatus::Classified);
}

#[test]
fn test_non_string_pii_entry_is_coerced() {
    let table = ClassificationTable::from_rows([("db5", ClassificationEntry::new("tab5", 1))]);
    let resolution = resolve("data/db5/tab5/00000_0", &table);
    assert_eq!(resolution.pii, "");
    assert_eq!(resolution.status, ResolutionStatus::Unclassified);
}

#[test]
fn test_missing_database_and_missing_table_are_distinguishable() {
    let table = manifest();
    let unknown_db = resolve("data/db9/tab1/00000_0", &table);
    let unknown_table = resolve("data/db1/tab9/00000_0", &table);

    assert!(!unknown_db.matched());
    assert!(!unknown_table.matched());
    assert_ne!(
        unknown_db.status.diagnostic().map(|(_, msg)| msg),
        unknown_table.status.diagnostic().map(|(_, msg)| msg)
    );
}

#[test]
fn test_temp_marker_goes_through_candidate_search() {
    let table = ClassificationTable::from_rows([("db4", ClassificationEntry::new("tab4", "true"))]);
    let resolution = resolve("data/db4/tab4_$folder$", &table);
    assert_eq!(resolution.table, "tab4");
    assert_eq!(resolution.status, ResolutionStatus::Classified);

    // Same marker, database not listed
    let resolution = resolve("data/db4/tab4_$folder$", &manifest());
    assert_eq!(resolution.status, ResolutionStatus::DatabaseMissing);
}
