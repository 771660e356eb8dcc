//! End-to-end runs of the transform stages on in-memory tables.

use std::path::PathBuf;

use polars::prelude::*;

use cohort_model::{
    ColumnRegistry, DeclaredType, EncodingOptions, JoinKey, KeyColumns, KeyedTable,
    NormalizeOptions, RegistryEntry, SelectionPolicy, SourceSpec, WarningKind,
};
use cohort_transform::{
    PrepInputs, PrepSettings, SourceInput, Stage, TransformError, run, run_with,
};

fn entry(name: &str, numeric: bool, categorical: bool, data_type: DeclaredType) -> RegistryEntry {
    RegistryEntry {
        column_name: name.to_string(),
        keep: true,
        numeric,
        categorical,
        data_type,
    }
}

fn source(name: &str, selection: SelectionPolicy) -> SourceSpec {
    SourceSpec {
        name: name.to_string(),
        path: PathBuf::from(format!("{name}.csv")),
        join: JoinKey::Subject,
        selection,
        columns: None,
        column_range: None,
        prefix: None,
    }
}

fn keys() -> Vec<String> {
    KeyColumns::default().primary()
}

fn scenario() -> PrepInputs {
    let primary = df! {
        "RID" => [1i64, 2, 3],
        "VISCODE" => ["bl", "bl", "bl"],
        "color" => ["Red", "red", "Blue"],
        "ABETA" => ["<200", "1020.5", " "],
        "PTRTYR" => ["Retired 2005", "", "1999"],
    }
    .unwrap();

    let demographics = df! {
        "RID" => [1i64, 1, 2],
        "USERDATE" => ["2010-05-01", "2012-09-30", "2011-01-15"],
        "PTEDUCAT" => [12i64, 16, 14],
    }
    .unwrap();

    let registry = ColumnRegistry::new(vec![
        entry("color", false, true, DeclaredType::Text),
        entry("ABETA", true, false, DeclaredType::Text),
        entry("PTEDUCAT", true, false, DeclaredType::Numeric),
        entry("PTRTYR", false, false, DeclaredType::Text),
    ]);

    PrepInputs {
        primary: KeyedTable::new("primary", keys(), primary),
        registry,
        sources: vec![SourceInput {
            spec: source(
                "demographics",
                SelectionPolicy::LatestBy {
                    timestamp: "USERDATE".to_string(),
                },
            ),
            table: KeyedTable::new("demographics", Vec::new(), demographics),
        }],
    }
}

fn settings(max_levels: usize) -> PrepSettings {
    PrepSettings {
        keys: KeyColumns::default(),
        normalize: NormalizeOptions {
            censored: vec!["ABETA".to_string()],
            trailing_year: Some("PTRTYR".to_string()),
        },
        encoding: EncodingOptions::default().with_max_levels(max_levels),
    }
}

fn f64_column(df: &DataFrame, name: &str) -> Vec<Option<f64>> {
    df.column(name)
        .unwrap()
        .cast(&DataType::Float64)
        .unwrap()
        .f64()
        .unwrap()
        .into_iter()
        .collect()
}

#[test]
fn end_to_end_scenario() {
    let output = run(&scenario(), &settings(1)).unwrap();

    assert_eq!(output.snapshot.height(), 3);
    assert_eq!(output.encoded.height(), 3);

    // Latest demographics row wins for subject 1; subject 3 has none.
    assert_eq!(
        f64_column(&output.snapshot, "PTEDUCAT"),
        vec![Some(16.0), Some(14.0), None]
    );

    // With one level kept, blue is bucketed to "other", which sorts first and
    // becomes the reference level.
    assert_eq!(
        output.encoded.get_column_names_str(),
        vec!["RID", "VISCODE", "ABETA", "PTEDUCAT", "PTRTYR", "color_red"]
    );
    assert_eq!(
        f64_column(&output.encoded, "color_red"),
        vec![Some(1.0), Some(1.0), Some(0.0)]
    );

    assert_eq!(
        f64_column(&output.snapshot, "ABETA"),
        vec![Some(200.0), Some(1020.5), None]
    );
    let snapshot_year = f64_column(&output.snapshot, "PTRTYR");
    assert_eq!(snapshot_year, vec![Some(2005.0), None, Some(1999.0)]);
    assert_eq!(f64_column(&output.encoded, "PTRTYR"), snapshot_year);

    let report = &output.report;
    assert_eq!(report.sources.len(), 1);
    assert_eq!(report.sources[0].selected_rows, 2);
    assert_eq!(report.sources[0].unmatched_rows, 1);
    assert_eq!(report.column("ABETA").unwrap().censor_marks_stripped, 1);
    assert_eq!(report.column("ABETA").unwrap().blanks_to_missing, 1);
    assert_eq!(report.column("color").unwrap().indicators, 1);
}

#[test]
fn snapshot_keeps_categoricals_unencoded() {
    let output = run(&scenario(), &settings(30)).unwrap();
    let colors: Vec<Option<&str>> = output
        .snapshot
        .column("color")
        .unwrap()
        .str()
        .unwrap()
        .into_iter()
        .collect();
    assert_eq!(colors, vec![Some("Red"), Some("red"), Some("Blue")]);
}

#[test]
fn sentinel_and_bucketing_through_the_pipeline() {
    let primary = df! {
        "RID" => [1i64, 2, 3, 4, 5],
        "VISCODE" => ["bl"; 5],
        "PTMARRY" => ["-4", "Married", "Married", "Widowed", "Never married"],
    }
    .unwrap();
    let inputs = PrepInputs {
        primary: KeyedTable::new("primary", keys(), primary),
        registry: ColumnRegistry::new(vec![entry("PTMARRY", false, true, DeclaredType::Text)]),
        sources: Vec::new(),
    };
    let output = run(&inputs, &settings(2)).unwrap();

    // married (2) and unknown (1, first seen) are kept; the rest become other.
    assert_eq!(
        output.encoded.get_column_names_str(),
        vec!["RID", "VISCODE", "PTMARRY_other", "PTMARRY_unknown"]
    );
    assert_eq!(output.report.column("PTMARRY").unwrap().bucketed, 2);
}

#[test]
fn coded_categoricals_expand_after_text_ones() {
    let primary = df! {
        "RID" => [1i64, 2, 3],
        "VISCODE" => ["bl", "bl", "bl"],
        "APOE4" => [0i64, 1, 2],
        "PTGENDER" => ["Male", "Female", "Male"],
    }
    .unwrap();
    let inputs = PrepInputs {
        primary: KeyedTable::new("primary", keys(), primary),
        registry: ColumnRegistry::new(vec![
            entry("APOE4", false, true, DeclaredType::Numeric),
            entry("PTGENDER", false, true, DeclaredType::Text),
        ]),
        sources: Vec::new(),
    };
    let output = run(&inputs, &settings(30)).unwrap();
    assert_eq!(
        output.encoded.get_column_names_str(),
        vec!["RID", "VISCODE", "PTGENDER_male", "APOE4_1", "APOE4_2"]
    );
}

#[test]
fn empty_categorical_is_a_warning_not_an_error() {
    let primary = df! {
        "RID" => [1i64],
        "VISCODE" => ["bl"],
        "PTHOME" => [None::<&str>],
    }
    .unwrap();
    let inputs = PrepInputs {
        primary: KeyedTable::new("primary", keys(), primary),
        registry: ColumnRegistry::new(vec![entry("PTHOME", false, true, DeclaredType::Text)]),
        sources: Vec::new(),
    };
    let output = run(&inputs, &settings(30)).unwrap();
    assert_eq!(output.encoded.get_column_names_str(), vec!["RID", "VISCODE"]);
    assert_eq!(
        output.report.warning_count(WarningKind::EmptyCategorical),
        1
    );
}

#[test]
fn unknown_registry_column_aborts() {
    let mut inputs = scenario();
    inputs.registry = ColumnRegistry::new(vec![entry("CDRSB", true, false, DeclaredType::Numeric)]);
    let err = run(&inputs, &settings(30)).unwrap_err();
    assert!(matches!(err, TransformError::UnknownColumn { .. }));
}

fn visits_with_flagged_key(visit_entry: RegistryEntry) -> PrepInputs {
    let primary = df! {
        "RID" => [1i64, 1, 2],
        "VISCODE" => ["bl", "m06", "bl"],
        "X" => ["a", "b", "a"],
    }
    .unwrap();
    PrepInputs {
        primary: KeyedTable::new("primary", keys(), primary),
        registry: ColumnRegistry::new(vec![
            visit_entry,
            entry("X", false, true, DeclaredType::Text),
        ]),
        sources: Vec::new(),
    }
}

fn visit_codes(df: &DataFrame) -> Vec<Option<String>> {
    df.column("VISCODE")
        .unwrap()
        .str()
        .unwrap()
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect()
}

#[test]
fn key_flagged_categorical_is_not_encoded() {
    let inputs = visits_with_flagged_key(entry("VISCODE", false, true, DeclaredType::Text));
    let output = run(&inputs, &settings(30)).unwrap();
    assert_eq!(
        output.encoded.get_column_names_str(),
        vec!["RID", "VISCODE", "X_b"]
    );
    assert_eq!(
        visit_codes(&output.encoded),
        vec![Some("bl".into()), Some("m06".into()), Some("bl".into())]
    );
    assert!(output.report.column("VISCODE").is_none());
}

#[test]
fn key_flagged_numeric_is_not_coerced() {
    let inputs = visits_with_flagged_key(entry("VISCODE", true, false, DeclaredType::Text));
    let output = run(&inputs, &settings(30)).unwrap();
    assert_eq!(
        visit_codes(&output.snapshot),
        vec![Some("bl".into()), Some("m06".into()), Some("bl".into())]
    );
    assert_eq!(output.report.total_coerced_to_missing(), 0);
}

#[test]
fn stage_observer_sees_every_stage_in_order() {
    let mut seen = Vec::new();
    let observed = run_with(&scenario(), &settings(1), |event| {
        seen.push((event.stage, event.frame.width()));
    })
    .unwrap();
    let stages: Vec<Stage> = seen.iter().map(|(stage, _)| *stage).collect();
    assert_eq!(
        stages,
        vec![Stage::Assemble, Stage::Prepare, Stage::Snapshot, Stage::Encode]
    );
    assert_eq!(seen[3].1, observed.encoded.width());

    let plain = run(&scenario(), &settings(1)).unwrap();
    assert!(plain.encoded.equals_missing(&observed.encoded));
    assert_eq!(plain.report.warnings.len(), observed.report.warnings.len());
}
