//! End-to-end tests for the staged pipeline on files in a temporary directory.

use std::fs;
use std::path::Path;

use cohort_cli::pipeline::{ingest, output, redirect_outputs, transform};
use cohort_ingest::load_pipeline_config;
use cohort_transform::PrepSettings;

const PRIMARY: &str = "\
RID,VISCODE,AGE,PTGENDER,ABETA,PTRTYR
1,bl,70.5,Male,<200,Retired 2005
2,bl,65.0,Female,1020.5,
3,bl,80.2,Male, ,1999
";

const DEMOGRAPHICS: &str = "\
RID,USERDATE,PTEDUCAT
1,2010-05-01,12
1,2012-09-30,16
2,2011-01-15,14
";

const FAMILY_HISTORY: &str = "\
RID,VISCODE,FHQMOM
1,sc,1
1,m12,0
2,sc,0
3,sc,1
";

const REGISTRY: &str = "\
column_name,keep,numeric,categorical,data_type
RID,1,1,0,int64
VISCODE,1,0,0,object
AGE,1,1,0,float64
PTGENDER,1,0,1,object
ABETA,1,1,0,object
PTRTYR,1,0,0,object
PTEDUCAT,1,1,0,float64
USERDATE,0,0,0,object
FHQMOM,1,0,1,float64
";

const CONFIG: &str = r#"
[primary]
path = "primary.csv"

[registry]
path = "registry.csv"

[[sources]]
name = "demographics"
path = "PTDEMOG.csv"
selection = { policy = "latest_by", timestamp = "USERDATE" }

[[sources]]
name = "family_history"
path = "FHQ.csv"
selection = { policy = "matching", field = "VISCODE", value = "sc" }
columns = ["FHQMOM"]

[normalize]
censored = ["ABETA"]
trailing_year = "PTRTYR"

[output]
snapshot = "out/snapshot.csv"
encoded = "out/encoded.csv"
report = "out/report.json"
"#;

fn write_inputs(dir: &Path, primary: &str) {
    fs::write(dir.join("primary.csv"), primary).unwrap();
    fs::write(dir.join("PTDEMOG.csv"), DEMOGRAPHICS).unwrap();
    fs::write(dir.join("FHQ.csv"), FAMILY_HISTORY).unwrap();
    fs::write(dir.join("registry.csv"), REGISTRY).unwrap();
    fs::write(dir.join("pipeline.toml"), CONFIG).unwrap();
}

fn header(path: &Path) -> String {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .next()
        .unwrap()
        .to_string()
}

#[test]
fn full_run_writes_both_tables_and_report() {
    let dir = tempfile::tempdir().unwrap();
    write_inputs(dir.path(), PRIMARY);

    let config = load_pipeline_config(&dir.path().join("pipeline.toml")).unwrap();
    let settings = PrepSettings::from_config(&config);
    let inputs = ingest(&config).unwrap();
    let prepared = transform(&inputs, &settings).unwrap();
    let files = output(&prepared, &config, true).unwrap();

    let snapshot = files.snapshot.unwrap();
    let encoded = files.encoded.unwrap();
    assert_eq!(
        header(&snapshot),
        "RID,VISCODE,AGE,PTGENDER,ABETA,PTRTYR,PTEDUCAT,FHQMOM"
    );
    assert_eq!(
        header(&encoded),
        "RID,VISCODE,AGE,ABETA,PTRTYR,PTEDUCAT,PTGENDER_male,FHQMOM_1"
    );
    let encoded_text = fs::read_to_string(&encoded).unwrap();
    assert_eq!(encoded_text.lines().count(), 4);
    assert!(encoded_text.lines().nth(1).unwrap().starts_with("1,bl,70.5,"));
    assert!(encoded_text.lines().nth(1).unwrap().ends_with(",1,1"));

    let report: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(files.report.unwrap()).unwrap()).unwrap();
    assert_eq!(report["sources"].as_array().unwrap().len(), 2);
    assert_eq!(report["sources"][0]["selected_rows"], 2);
    assert_eq!(report["columns"]["ABETA"]["censor_marks_stripped"], 1);
}

#[test]
fn outputs_can_be_redirected() {
    let dir = tempfile::tempdir().unwrap();
    write_inputs(dir.path(), PRIMARY);
    let elsewhere = dir.path().join("elsewhere");

    let mut config = load_pipeline_config(&dir.path().join("pipeline.toml")).unwrap();
    redirect_outputs(&mut config, &elsewhere);
    let inputs = ingest(&config).unwrap();
    let prepared = transform(&inputs, &PrepSettings::from_config(&config)).unwrap();
    let files = output(&prepared, &config, false).unwrap();

    assert_eq!(files.encoded.unwrap(), elsewhere.join("encoded.csv"));
    assert!(elsewhere.join("snapshot.csv").exists());
    assert!(files.report.is_none());
    assert!(!elsewhere.join("report.json").exists());
}

#[test]
fn duplicate_primary_key_aborts_ingest() {
    let dir = tempfile::tempdir().unwrap();
    let duplicated = format!("{PRIMARY}1,bl,71.0,Male,300,\n");
    write_inputs(dir.path(), &duplicated);

    let config = load_pipeline_config(&dir.path().join("pipeline.toml")).unwrap();
    let error = ingest(&config).unwrap_err();
    let message = format!("{error:#}");
    assert!(message.contains("load primary table"));
    assert!(message.contains("duplicate key"));
}
