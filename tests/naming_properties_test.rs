//! Naming invariants that every tool relies on to find each other's reports.

use chrono::{NaiveDate, NaiveDateTime};
use proptest::prelude::*;
use test_analyzer::paths::{get_qualified_module_name, parse_qualified_name, PathResolver};
use test_analyzer::pipeline::validate_module_name;
use test_analyzer::reports::filename::base_name;
use test_analyzer::reports::{ReportContext, ReportName, ReportType};

fn segment() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,12}".prop_filter("no trailing _test", |s| !s.ends_with("_test"))
}

fn timestamp() -> impl Strategy<Value = NaiveDateTime> {
    (2000i32..2100, 1u32..=12, 1u32..=28, 0u32..24, 0u32..60).prop_map(|(y, mo, d, h, mi)| {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, 0)
            .unwrap()
    })
}

proptest! {
    #[test]
    fn test_side_round_trip_keeps_module_name(dirs in prop::collection::vec(segment(), 1..4), file in proptest::option::of(segment())) {
        let resolver = PathResolver::new("/nonexistent-project");
        let mut test_path = format!("test/{}", dirs.join("/"));
        if let Some(file) = &file {
            test_path.push_str(&format!("/{file}_test.dart"));
        }

        let source = resolver.infer_source_path(&test_path).unwrap();
        let back = resolver.infer_test_path(&source).unwrap();
        prop_assert_eq!(get_qualified_module_name(&back), get_qualified_module_name(&test_path));
        prop_assert_eq!(get_qualified_module_name(&source), get_qualified_module_name(&test_path));
    }

    #[test]
    fn qualified_names_parse_back(dirs in prop::collection::vec(segment(), 1..4)) {
        let qualified = get_qualified_module_name(&format!("lib/{}", dirs.join("/")));
        prop_assert!(!qualified.contains('_'));
        let parsed = parse_qualified_name(&qualified).unwrap();
        prop_assert_eq!(format!("{}-{}", parsed.base_name, parsed.kind.suffix()), qualified);
    }

    #[test]
    fn any_folder_name_is_a_valid_module_name(folder in "[^/\\\\]{1,16}") {
        let qualified = get_qualified_module_name(&format!("test/{folder}/"));
        prop_assert!(validate_module_name(&qualified).is_ok(), "{}", qualified);
        prop_assert!(!qualified.contains('@'));
    }

    #[test]
    fn report_filenames_parse_back(
        dirs in prop::collection::vec(segment(), 1..3),
        tool in "[a-z]{1,8}(_[a-z]{1,8}){0,2}",
        type_index in 0usize..4,
        at in timestamp(),
    ) {
        let module = get_qualified_module_name(&format!("test/{}", dirs.join("/")));
        let report_type = ReportType::ALL[type_index];
        let context = ReportContext::at(&module, report_type, &tool, at);

        let parsed = ReportName::parse(&base_name(&context)).unwrap();
        prop_assert_eq!(parsed.module_name, module);
        prop_assert_eq!(parsed.tool_name, tool);
        prop_assert_eq!(parsed.report_type, report_type);
        prop_assert_eq!(parsed.timestamp, at);
    }
}
