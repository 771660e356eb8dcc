//! Tests for the configuration file layout.

use std::path::{Path, PathBuf};

use cohort_model::{JoinKey, PipelineConfig, SelectionPolicy};

const CONFIG: &str = r#"
[primary]
path = "TADPOLE_D1_D2.csv"

[registry]
path = "metadata_raw.csv"

[[sources]]
name = "adas"
path = "ADASSCORES.csv"
join = "subject_visit"
prefix = "ADAS_"
column_range = { start = 5, end = 20 }

[[sources]]
name = "demographics"
path = "PTDEMOG.csv"
selection = { policy = "latest_by", timestamp = "USERDATE" }
columns = ["PTHAND", "PTRTYR"]

[[sources]]
name = "family_history"
path = "FHQ.csv"
selection = { policy = "matching", field = "VISCODE", value = "sc" }

[normalize]
censored = ["ABETA_UPENNBIOMK9_04_19_17"]
trailing_year = "PTRTYR"

[output]
snapshot = "data_all_no_encode.csv"
encoded = "data_all.csv"
"#;

#[test]
fn parses_sources_with_defaults() {
    let config: PipelineConfig = toml::from_str(CONFIG).expect("parse config");

    assert_eq!(config.keys.subject, "RID");
    assert_eq!(config.keys.visit, "VISCODE");
    assert_eq!(config.encoding.max_levels, 30);
    assert_eq!(config.encoding.bucket_token, "other");
    assert_eq!(config.sources.len(), 3);

    let adas = config.source("adas").expect("adas");
    assert_eq!(adas.join, JoinKey::SubjectVisit);
    assert_eq!(adas.selection, SelectionPolicy::Unique);
    assert_eq!(adas.prefix.as_deref(), Some("ADAS_"));

    let demo = config.source("demographics").expect("demographics");
    assert_eq!(
        demo.selection,
        SelectionPolicy::LatestBy {
            timestamp: "USERDATE".to_string()
        }
    );
    assert_eq!(demo.join, JoinKey::Subject);

    let fam = config.source("family_history").expect("family history");
    assert_eq!(
        fam.selection,
        SelectionPolicy::Matching {
            field: "VISCODE".to_string(),
            value: "sc".to_string()
        }
    );
    assert!(config.output.report.is_none());
}

#[test]
fn resolves_relative_paths_against_base() {
    let mut config: PipelineConfig = toml::from_str(CONFIG).expect("parse config");
    config.resolve_paths(Path::new("/data/tadpole"));

    assert_eq!(
        config.primary.path,
        PathBuf::from("/data/tadpole/TADPOLE_D1_D2.csv")
    );
    assert_eq!(
        config.sources[0].path,
        PathBuf::from("/data/tadpole/ADASSCORES.csv")
    );
    assert_eq!(
        config.output.encoded,
        PathBuf::from("/data/tadpole/data_all.csv")
    );
}
