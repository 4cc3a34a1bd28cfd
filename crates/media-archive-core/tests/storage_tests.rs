use std::collections::BTreeMap;

use media_archive_core::storage::models::{Ordering, RecordFilter, RecordStatus};
use media_archive_core::storage::Database;

fn make_test_db() -> Database {
    Database::open_in_memory().unwrap()
}

fn meta(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn test_upsert_creates_new_record() {
    let db = make_test_db();
    let created = db
        .upsert("pixiv", "100", "2024-01-01", "pixiv_100.jpg", &meta(&[("pid", "100")]), false)
        .unwrap();
    assert!(created);

    let record = db.query_by_key("pixiv", "100").unwrap().unwrap();
    assert_eq!(record.folder, "2024-01-01");
    assert_eq!(record.filename, "pixiv_100.jpg");
    assert_eq!(record.status, RecordStatus::NotAnalysed);
    assert!(!record.deleted);
    assert_eq!(record.metadata.get("pid").map(String::as_str), Some("100"));
}

#[test]
fn test_upsert_existing_without_replace_is_noop() {
    let db = make_test_db();
    db.upsert("pixiv", "100", "2024-01-01", "a.jpg", &BTreeMap::new(), false)
        .unwrap();
    let created = db
        .upsert("pixiv", "100", "2024-02-02", "b.jpg", &BTreeMap::new(), false)
        .unwrap();
    assert!(!created);

    let record = db.query_by_key("pixiv", "100").unwrap().unwrap();
    assert_eq!(record.folder, "2024-01-01");
    assert_eq!(record.filename, "a.jpg");
}

#[test]
fn test_upsert_replace_relocates_and_keeps_metadata() {
    let db = make_test_db();
    db.upsert("pixiv", "100", "2024-01-01", "a.jpg", &meta(&[("pid", "100")]), false)
        .unwrap();
    let created = db
        .upsert("pixiv", "100", "2024-02-02", "b.jpg", &BTreeMap::new(), true)
        .unwrap();
    assert!(!created);

    let record = db.query_by_key("pixiv", "100").unwrap().unwrap();
    assert_eq!(record.folder, "2024-02-02");
    assert_eq!(record.filename, "b.jpg");
    assert_eq!(record.metadata.get("pid").map(String::as_str), Some("100"));
}

#[test]
fn test_upsert_revives_soft_deleted_record() {
    let db = make_test_db();
    db.upsert("pixiv", "100", "2024-01-01", "a.jpg", &BTreeMap::new(), false)
        .unwrap();
    assert_eq!(db.mark_deleted("2024-01-01", "a.jpg").unwrap(), 1);
    assert!(db.query_by_key("pixiv", "100").unwrap().unwrap().deleted);

    db.upsert("pixiv", "100", "2024-03-03", "a.jpg", &BTreeMap::new(), false)
        .unwrap();
    let record = db.query_by_key("pixiv", "100").unwrap().unwrap();
    assert!(!record.deleted);
    assert_eq!(record.folder, "2024-03-03");
}

#[test]
fn test_mark_deleted_is_idempotent() {
    let db = make_test_db();
    db.upsert("pixiv", "1", "f", "a.jpg", &BTreeMap::new(), false).unwrap();
    assert_eq!(db.mark_deleted("f", "a.jpg").unwrap(), 1);
    assert_eq!(db.mark_deleted("f", "a.jpg").unwrap(), 0);
    assert_eq!(db.mark_deleted("f", "missing.jpg").unwrap(), 0);
}

#[test]
fn test_folder_views_skip_deleted_records() {
    let db = make_test_db();
    db.upsert("pixiv", "1", "2024-01-01", "a.jpg", &BTreeMap::new(), false).unwrap();
    db.upsert("pixiv", "2", "2024-01-01", "b.jpg", &BTreeMap::new(), false).unwrap();
    db.upsert("pixiv", "3", "2024-01-02", "c.jpg", &BTreeMap::new(), false).unwrap();
    db.mark_deleted("2024-01-02", "c.jpg").unwrap();

    let folders = db.list_folders().unwrap();
    assert_eq!(folders.into_iter().collect::<Vec<_>>(), vec!["2024-01-01"]);

    let names = db.list_folder_filenames("2024-01-01").unwrap();
    assert_eq!(names.into_iter().collect::<Vec<_>>(), vec!["a.jpg", "b.jpg"]);
    assert!(db.list_folder_filenames("2024-01-02").unwrap().is_empty());
}

#[test]
fn test_update_analysis_sets_status_and_tags() {
    let db = make_test_db();
    db.upsert("pixiv", "1", "f", "a.jpg", &BTreeMap::new(), false).unwrap();
    let tags = serde_json::json!(["landscape", "sky"]);
    let count = db
        .update_analysis("pixiv", "1", RecordStatus::Analysed, Some(&tags), None)
        .unwrap();
    assert_eq!(count, 1);

    let record = db.query_by_key("pixiv", "1").unwrap().unwrap();
    assert_eq!(record.status, RecordStatus::Analysed);
    assert_eq!(record.tags, Some(tags));
    assert!(record.relations.is_none());
    assert!(record.analyse_time.is_some());
}

#[test]
fn test_query_records_filters() {
    let db = make_test_db();
    db.upsert("pixiv", "1", "2024-01-01", "pixiv_1.jpg", &BTreeMap::new(), false).unwrap();
    db.upsert("pixiv", "2", "2024-01-02", "pixiv_2.jpg", &BTreeMap::new(), false).unwrap();
    db.upsert("yandere", "3", "2024-01-02", "yandere_3.png", &BTreeMap::new(), false).unwrap();
    db.upsert("yandere", "4", "2024-01-02", "yandere_4.png", &BTreeMap::new(), false).unwrap();
    db.mark_deleted("2024-01-02", "yandere_4.png").unwrap();
    db.update_analysis("pixiv", "2", RecordStatus::Analysed, None, None).unwrap();

    let by_folder = db
        .query_records(&RecordFilter {
            folder: Some("2024-01-0%".to_string()),
            filename: Some("%.png".to_string()),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(by_folder.len(), 1);
    assert_eq!(by_folder[0].id, "3");

    let by_source = db
        .query_records(&RecordFilter {
            sources: vec!["yandere".to_string()],
            include_deleted: true,
            ..Default::default()
        })
        .unwrap();
    assert_eq!(by_source.len(), 2);

    let analysed = db
        .query_records(&RecordFilter {
            statuses: vec![RecordStatus::Analysed],
            ..Default::default()
        })
        .unwrap();
    assert_eq!(analysed.len(), 1);
    assert_eq!(analysed[0].key().to_string(), "pixiv:2");
}

#[test]
fn test_query_records_ordering_and_limit() {
    let db = make_test_db();
    db.upsert("pixiv", "1", "2024-01-01", "a.jpg", &BTreeMap::new(), false).unwrap();
    db.upsert("pixiv", "2", "2024-01-03", "b.jpg", &BTreeMap::new(), false).unwrap();
    db.upsert("pixiv", "3", "2024-01-02", "c.jpg", &BTreeMap::new(), false).unwrap();

    let order: Ordering = "-folder".parse().unwrap();
    let records = db
        .query_records(&RecordFilter {
            order: vec![order],
            limit: Some(2),
            ..Default::default()
        })
        .unwrap();
    let folders: Vec<&str> = records.iter().map(|r| r.folder.as_str()).collect();
    assert_eq!(folders, vec!["2024-01-03", "2024-01-02"]);

    let default_order = db.query_records(&RecordFilter::default()).unwrap();
    let ids: Vec<&str> = default_order.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["1", "2", "3"]);
}

#[test]
fn test_ordering_rejects_unknown_field() {
    assert!("-size".parse::<Ordering>().is_err());
    let parsed: Ordering = "pid".parse().unwrap();
    assert!(!parsed.descending);
}
