use std::collections::BTreeMap;
use std::path::Path;
use tempfile::tempdir;

use media_archive_core::platform::LocalFs;
use media_archive_core::rules::{ExtensionFilter, RuleOutcome, RuleSpec, RuleTable};
use media_archive_core::scanner::{Classifier, StagedFile};
use media_archive_core::Error;

fn spec(pattern: &str, source: &str, group: Option<usize>, metadata: &[(&str, &str)]) -> RuleSpec {
    RuleSpec {
        pattern: pattern.to_string(),
        source: source.to_string(),
        group,
        metadata: metadata
            .iter()
            .map(|(g, f)| (g.to_string(), f.to_string()))
            .collect::<BTreeMap<_, _>>(),
    }
}

fn make_test_table() -> RuleTable {
    RuleTable::compile(
        &[
            spec(r"pixiv_(\d+)(?:_p(\d+))?", "pixiv", None, &[("1", "pid"), ("2", "page")]),
            spec(r"(?P<site>yandere|konachan)_(?P<post>\d+)", "booru", Some(2), &[("site", "site")]),
            spec(r"pixiv_(\w+)", "pixiv-fallback", None, &[]),
        ],
        &[r"^tmp_".to_string()],
    )
    .unwrap()
}

#[test]
fn test_identify_extracts_id_and_metadata() {
    let table = make_test_table();
    match table.identify("pixiv_123_p4") {
        RuleOutcome::Identified(identity) => {
            assert_eq!(identity.source, "pixiv");
            assert_eq!(identity.id, "123");
            assert_eq!(identity.metadata.get("pid").map(String::as_str), Some("123"));
            assert_eq!(identity.metadata.get("page").map(String::as_str), Some("4"));
        }
        other => panic!("unexpected outcome {:?}", other),
    }
}

#[test]
fn test_unmatched_optional_group_is_left_out_of_metadata() {
    let table = make_test_table();
    match table.identify("pixiv_123") {
        RuleOutcome::Identified(identity) => {
            assert_eq!(identity.metadata.len(), 1);
            assert!(!identity.metadata.contains_key("page"));
        }
        other => panic!("unexpected outcome {:?}", other),
    }
}

#[test]
fn test_named_metadata_group() {
    let table = make_test_table();
    match table.identify("konachan_99 extra words") {
        RuleOutcome::Identified(identity) => {
            assert_eq!(identity.source, "booru");
            assert_eq!(identity.id, "99");
            assert_eq!(identity.metadata.get("site").map(String::as_str), Some("konachan"));
        }
        other => panic!("unexpected outcome {:?}", other),
    }
}

#[test]
fn test_patterns_only_match_at_start() {
    let table = make_test_table();
    assert_eq!(table.identify("copy of pixiv_1"), RuleOutcome::NoMatch);
}

#[test]
fn test_first_matching_rule_wins() {
    let table = make_test_table();
    match table.identify("pixiv_abc") {
        RuleOutcome::Identified(identity) => assert_eq!(identity.source, "pixiv-fallback"),
        other => panic!("unexpected outcome {:?}", other),
    }
}

#[test]
fn test_missing_id_group_is_not_identified() {
    let table = RuleTable::compile(&[spec(r"(?:a(\d+)|b)", "s", None, &[])], &[]).unwrap();
    assert_eq!(table.identify("b"), RuleOutcome::MissingId);
}

#[test]
fn test_compile_rejects_bad_rules() {
    let bad = [
        spec(r"pixiv_(\d+", "pixiv", None, &[]),
        spec(r"pixiv_(\d+)", "pixiv", Some(2), &[]),
        spec(r"pixiv_(\d+)", "pixiv", None, &[("3", "x")]),
        spec(r"pixiv_(\d+)", "pixiv", None, &[("nope", "x")]),
    ];
    for rule in bad {
        let result = RuleTable::compile(&[rule], &[]);
        assert!(matches!(result, Err(Error::Rule { .. })));
    }
}

#[test]
fn test_classification_partitions_files() {
    let table = make_test_table();
    let files: Vec<StagedFile> = ["pixiv_1.jpg", "tmp_pixiv_2.jpg", "holiday.jpg", "yandere_5.png"]
        .iter()
        .map(|n| StagedFile::from_relative(Path::new(n)).unwrap())
        .collect();

    let filter = ExtensionFilter::default();
    let classifier = Classifier::new(&LocalFs, &table, &filter);
    let result = classifier.classify_files(files);

    assert_eq!(result.total(), 4);
    assert_eq!(result.matched.len(), 2);
    assert_eq!(result.excluded[0].display_path(), "tmp_pixiv_2.jpg");
    assert_eq!(result.unmatched[0].display_path(), "holiday.jpg");
}

#[test]
fn test_classify_directory_honours_extension_filter() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("pixiv_1.jpg"), "a").unwrap();
    std::fs::write(dir.path().join("pixiv_2.txt"), "b").unwrap();
    std::fs::create_dir_all(dir.path().join("nested")).unwrap();
    std::fs::write(dir.path().join("nested").join("pixiv_3.jpg"), "c").unwrap();

    let table = make_test_table();
    let allowed = vec!["jpg".to_string()];
    let filter = ExtensionFilter::new(Some(&allowed));
    let classifier = Classifier::new(&LocalFs, &table, &filter);
    let result = classifier.classify(dir.path()).unwrap();

    let matched: Vec<String> = result.matched.iter().map(|m| m.file.display_path()).collect();
    assert_eq!(matched, vec!["nested/pixiv_3.jpg", "pixiv_1.jpg"]);
    assert!(result.unmatched.is_empty());
}
