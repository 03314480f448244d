mod common;

use common::TestWorkspace;
use hospital_import::{
    checks::{check_column_value_types, check_expected_columns, unique_values},
    columns,
    config::PipelineConfig,
    data::{RawTable, RawValue},
    normalize, pipeline,
    pipeline::AnalysisError,
    source,
};

fn expected() -> Vec<String> {
    columns::expected_column_names()
}

#[test]
fn conforming_fixture_has_no_missing_or_extra_columns() {
    let table = common::normalized_fixture(common::SAMPLE_FIXTURE);
    let diff = check_expected_columns(&table, &expected());
    assert!(diff.is_conforming());
}

#[test]
fn schema_check_reports_exactly_the_removed_column() {
    let raw = common::load_fixture(common::SAMPLE_FIXTURE);
    let keep = raw
        .headers
        .iter()
        .enumerate()
        .filter(|(_, name)| name.as_str() != columns::BLOOD_TYPE)
        .map(|(idx, _)| idx)
        .collect::<Vec<_>>();
    let headers = keep.iter().map(|&i| raw.headers[i].clone()).collect();
    let rows = raw
        .rows
        .iter()
        .map(|row| keep.iter().map(|&i| row[i].clone()).collect())
        .collect();
    let table = normalize::normalize_table(&RawTable::new(headers, rows));

    let diff = check_expected_columns(&table, &expected());
    assert_eq!(
        diff.missing.into_iter().collect::<Vec<_>>(),
        vec![columns::BLOOD_TYPE.to_string()]
    );
    assert!(diff.extra.is_empty());
}

#[test]
fn extra_columns_are_reported_but_tolerated() {
    let workspace = TestWorkspace::new();
    let mut contents = format!("{},Ward\n", common::HEADER);
    contents.push_str(&format!("{},North\n", common::patient_line("Ann Lee", 1)));
    let path = workspace.write("extra.csv", &contents);
    let raw = source::load_raw_table(
        &path,
        b',',
        hospital_import::io_utils::resolve_encoding(None).unwrap(),
    )
    .unwrap();

    let analysis = pipeline::analyze(&raw, &PipelineConfig::default()).unwrap();
    assert_eq!(analysis.summary.extra_columns, vec!["Ward".to_string()]);
    assert_eq!(analysis.table.len(), 1);
}

#[test]
fn uncatalogued_column_mixing_types_is_fatal() {
    let mut headers = expected();
    headers.push("Ward".to_string());
    let line = |ward: RawValue| {
        let mut row = common::patient_line("Ann Lee", 1)
            .split(',')
            .map(RawValue::from)
            .collect::<Vec<_>>();
        row.push(ward);
        row
    };
    let raw = RawTable::new(
        headers,
        vec![
            line(RawValue::Text("12".to_string())),
            line(RawValue::Text("north".to_string())),
        ],
    );
    assert!(check_column_value_types(&normalize::normalize_table(&raw)));

    let err = pipeline::analyze(&raw, &PipelineConfig::default()).unwrap_err();
    match err {
        AnalysisError::HeterogeneousColumns { columns } => {
            assert_eq!(columns, vec!["Ward".to_string()])
        }
        other => panic!("unexpected error {other}"),
    }
}

#[test]
fn missing_values_only_fail_in_strict_mode() {
    let workspace = TestWorkspace::new();
    let line = common::patient_line("Ann Lee", 3).replace(",Aspirin,", ",,");
    let path = workspace.write_dataset("holes.csv", &[line]);
    let raw = source::load_raw_table(
        &path,
        b',',
        hospital_import::io_utils::resolve_encoding(None).unwrap(),
    )
    .unwrap();

    let lenient = pipeline::analyze(&raw, &PipelineConfig::default()).unwrap();
    assert_eq!(lenient.summary.missing_values, 1);

    let strict = PipelineConfig {
        strict_missing_values: true,
        ..PipelineConfig::default()
    };
    let err = pipeline::analyze(&raw, &strict).unwrap_err();
    assert!(matches!(err, AnalysisError::MissingValues { total: 1 }));
}

#[test]
fn null_markers_count_as_missing_values() {
    let workspace = TestWorkspace::new();
    let line = common::patient_line("Ann Lee", 3)
        .replace(",Aspirin,", ",N/A,")
        .replace(",Female,", ",NULL,");
    let path = workspace.write_dataset("markers.csv", &[line]);
    let raw = source::load_raw_table(
        &path,
        b',',
        hospital_import::io_utils::resolve_encoding(None).unwrap(),
    )
    .unwrap();

    let analysis = pipeline::analyze(&raw, &PipelineConfig::default()).unwrap();
    assert_eq!(analysis.summary.missing_values, 2);
    let medication = analysis.table.column_index(columns::MEDICATION).unwrap();
    let gender = analysis.table.column_index(columns::GENDER).unwrap();
    assert_eq!(analysis.table.rows()[0][medication], None);
    assert_eq!(analysis.table.rows()[0][gender], None);
}

#[test]
fn unique_values_survey_trims_values() {
    let table = common::normalized_fixture(common::SAMPLE_FIXTURE);
    assert_eq!(
        unique_values(&table, columns::GENDER).unwrap(),
        vec!["Female".to_string(), "Male".to_string()]
    );
}
