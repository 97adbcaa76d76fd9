//! End-to-end tests running the pipeline over small report corpora.

use covid_pipeline::{
    EnrichedRecord, EntityKind, Pipeline, PipelineConfig, PipelineError, PipelineResult, WORLD,
};
use pretty_assertions::assert_eq;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const LEGACY_HEADER: &str = "Province/State,Country/Region,Last Update,Confirmed,Deaths,Recovered";
const CURRENT_HEADER: &str = "FIPS,Admin2,Province_State,Country_Region,Last_Update,Lat,Long_,Confirmed,Deaths,Recovered,Active,Combined_Key";

struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new() -> Self {
        let fixture = Self {
            dir: tempfile::tempdir().unwrap(),
        };
        fs::create_dir_all(fixture.raw()).unwrap();
        fs::write(
            fixture.path("populations.csv"),
            "country,population\n\
             China,1439323776\n\
             Italy,60461826\n\
             United States,331002651\n\
             South Korea,51269185\n",
        )
        .unwrap();
        fs::write(
            fixture.path("continents.csv"),
            "country_name,continent\n\
             China,Asia\n\
             Italy,Europe\n\
             \"United States, The\",North America\n\
             South Korea,Asia\n",
        )
        .unwrap();
        fixture
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn raw(&self) -> PathBuf {
        self.path("raw")
    }

    fn output(&self) -> PathBuf {
        self.path("out/processed_data.csv")
    }

    fn report(&self, name: &str, content: &str) -> &Self {
        fs::write(self.raw().join(name), content).unwrap();
        self
    }

    fn legacy(&self, date: &str, rows: &[&str]) -> &Self {
        self.report(&format!("{date}.csv"), &format!("{LEGACY_HEADER}\n{}\n", rows.join("\n")))
    }

    fn current(&self, date: &str, rows: &[&str]) -> &Self {
        self.report(
            &format!("{date}.csv"),
            &format!("\u{feff}{CURRENT_HEADER}\n{}\n", rows.join("\n")),
        )
    }

    fn config(&self) -> PipelineConfig {
        PipelineConfig::builder()
            .input_dir(self.raw())
            .populations_path(self.path("populations.csv"))
            .continents_path(self.path("continents.csv"))
            .output_path(self.output())
            .build()
            .unwrap()
    }

    fn run(&self) -> PipelineResult {
        run_with(self.config()).unwrap()
    }
}

fn run_with(config: PipelineConfig) -> covid_pipeline::error::Result<PipelineResult> {
    Pipeline::builder().config(config).build().unwrap().run()
}

fn standard_corpus(fixture: &Fixture) {
    fixture
        .legacy(
            "03-01-2020",
            &[
                "Hubei,Mainland China,2020-03-01T10:13:19,66907,2761,31536",
                "Guangdong,Mainland China,2020-03-01T14:53:03,1349,7,1016",
                ",Italy,2020-03-01T23:23:02,1694,34,83",
                ",\"Korea, South\",2020-03-01T23:43:03,3736,17,30",
            ],
        )
        .legacy(
            "03-02-2020",
            &[
                "Hubei,Mainland China,2020-03-02T15:03:23,67103,2803,33934",
                "Guangdong,Mainland China,2020-03-02T15:03:23,1350,7,1059",
                ",Italy,2020-03-02T20:23:16,2036,52,149",
                ",\"Korea, South\",2020-03-02T20:23:16,4335,28,30",
                "\"King County, WA\",US,2020-03-02T20:23:16,14,5,1",
            ],
        )
        .current(
            "03-23-2020",
            &[
                ",,Hubei,China,2020-03-23 23:19:34,30.97,112.27,67800,3160,59433,1207,\"Hubei, China\"",
                ",,,Italy,2020-03-23 23:19:34,41.87,12.56,63927,6077,7432,50418,Italy",
                "53033,King,Washington,US,2020-03-23 23:19:34,47.49,-121.83,1170,87,0,1083,\"King, Washington, US\"",
                "36061,New York City,New York,US,2020-03-23 23:19:34,40.76,-73.97,12305,99,0,12206,\"New York City, New York, US\"",
            ],
        );
}

fn rows_of<'a>(result: &'a PipelineResult, kind: EntityKind, entity: &str) -> Vec<&'a EnrichedRecord> {
    result
        .records
        .iter()
        .filter(|r| r.base.kind == kind && r.base.entity == entity)
        .collect()
}

fn confirmed_at(result: &PipelineResult, kind: EntityKind, entity: &str, date: &str) -> u64 {
    rows_of(result, kind, entity)
        .into_iter()
        .find(|r| r.base.date.to_string() == date)
        .map(|r| r.base.confirmed)
        .unwrap_or_else(|| panic!("no {entity} row on {date}"))
}

#[test]
fn test_mixed_layouts_merge_into_one_series() {
    let fixture = Fixture::new();
    standard_corpus(&fixture);

    let result = fixture.run();

    assert_eq!(result.summary.normalize.legacy_reports, 2);
    assert_eq!(result.summary.normalize.current_reports, 1);

    let china: Vec<(String, u64)> = rows_of(&result, EntityKind::Country, "China")
        .iter()
        .map(|r| (r.base.date.to_string(), r.base.confirmed))
        .collect();
    assert_eq!(
        china,
        vec![
            ("2020-03-01".to_string(), 66907 + 1349),
            ("2020-03-02".to_string(), 67103 + 1350),
            ("2020-03-23".to_string(), 67800),
        ]
    );

    assert_eq!(confirmed_at(&result, EntityKind::Country, "South Korea", "2020-03-02"), 4335);
    assert_eq!(confirmed_at(&result, EntityKind::Country, "United States", "2020-03-23"), 1170 + 12305);
    assert!(rows_of(&result, EntityKind::Country, "Mainland China").is_empty());
}

#[test]
fn test_world_row_on_every_date_sums_countries() {
    let fixture = Fixture::new();
    standard_corpus(&fixture);

    let result = fixture.run();

    let mut per_date: BTreeMap<String, u64> = BTreeMap::new();
    for row in result.records.iter().filter(|r| r.base.kind == EntityKind::Country) {
        *per_date.entry(row.base.date.to_string()).or_default() += row.base.confirmed;
    }

    let world: BTreeMap<String, u64> = rows_of(&result, EntityKind::World, WORLD)
        .iter()
        .map(|r| (r.base.date.to_string(), r.base.confirmed))
        .collect();

    assert_eq!(world, per_date);
    assert_eq!(world.len(), 3);
}

#[test]
fn test_continent_sums_member_countries() {
    let fixture = Fixture::new();
    standard_corpus(&fixture);

    let result = fixture.run();

    assert_eq!(
        confirmed_at(&result, EntityKind::Continent, "Asia", "2020-03-02"),
        67103 + 1350 + 4335
    );
    assert_eq!(
        confirmed_at(&result, EntityKind::Continent, "North America", "2020-03-02"),
        14
    );

    let asia = rows_of(&result, EntityKind::Continent, "Asia");
    assert_eq!(asia[0].base.population, Some(1_439_323_776 + 51_269_185));
    assert_eq!(asia[0].base.continent.as_deref(), Some("Asia"));
}

#[test]
fn test_unique_entity_dates_in_monotonic_order() {
    let fixture = Fixture::new();
    standard_corpus(&fixture);

    let result = fixture.run();

    for pair in result.records.windows(2) {
        let a = (pair[0].base.kind, &pair[0].base.entity, pair[0].base.date);
        let b = (pair[1].base.kind, &pair[1].base.entity, pair[1].base.date);
        assert!(a < b, "{:?} should precede {:?}", a, b);
    }
}

#[test]
fn test_runs_are_byte_identical() {
    let fixture = Fixture::new();
    standard_corpus(&fixture);

    fixture.run();
    let first = fs::read(fixture.output()).unwrap();
    fixture.run();
    let second = fs::read(fixture.output()).unwrap();

    assert_eq!(first, second);
}

#[test]
fn test_output_columns() {
    let fixture = Fixture::new();
    standard_corpus(&fixture);

    let result = fixture.run();

    let content = fs::read_to_string(fixture.output()).unwrap();
    let header = content.lines().next().unwrap();
    assert_eq!(
        header,
        "date,country,confirmed,deaths,population,daily_confirmed,daily_deaths,flat_ma,death_rate,continent,kind"
    );
    assert_eq!(content.lines().count(), result.records.len() + 1);
    assert!(content.contains("2020-03-23,World,"));
}

#[test]
fn test_country_without_reference_counts_towards_world() {
    let fixture = Fixture::new();
    fixture.legacy(
        "03-01-2020",
        &[
            ",Italy,2020-03-01T23:23:02,1694,34,83",
            "Diamond Princess,Others,2020-03-01T23:23:02,705,6,10",
        ],
    );

    let result = fixture.run();

    let others = rows_of(&result, EntityKind::Country, "Others");
    assert_eq!(others[0].base.population, None);
    assert_eq!(others[0].death_rate, None);
    assert_eq!(confirmed_at(&result, EntityKind::World, WORLD, "2020-03-01"), 1694 + 705);
    assert_eq!(result.summary.aggregate.missing_population, vec!["Others".to_string()]);
    assert_eq!(result.summary.aggregate.missing_continent, vec!["Others".to_string()]);
}

#[test]
fn test_corrupt_and_undated_files_are_skipped() {
    let fixture = Fixture::new();
    fixture
        .legacy("03-01-2020", &[",Italy,2020-03-01T23:23:02,1694,34,83"])
        .report("03-02-2020.csv", "")
        .report("README.csv", "not,a\nreport,file\n");

    let result = fixture.run();

    assert_eq!(result.summary.ingest.files_read, 1);
    assert_eq!(
        result.summary.ingest.skipped_files,
        vec!["03-02-2020.csv".to_string(), "README.csv".to_string()]
    );
    assert_eq!(result.summary.last_date.as_deref(), Some("2020-03-01"));
}

#[test]
fn test_missing_reference_aborts_without_output() {
    let fixture = Fixture::new();
    standard_corpus(&fixture);
    let mut config = fixture.config();
    config.populations_path = fixture.path("nope.csv");

    let err = run_with(config).unwrap_err();

    assert!(err.is_reference_failure());
    assert!(!fixture.output().exists());
}

#[test]
fn test_empty_corpus_aborts_without_output() {
    let fixture = Fixture::new();

    let err = run_with(fixture.config()).unwrap_err();

    assert!(matches!(err, PipelineError::EmptyCorpus(_)));
    assert!(!fixture.output().exists());
}

#[test]
fn test_rules_file_replaces_builtin_rules() {
    let fixture = Fixture::new();
    standard_corpus(&fixture);
    let rules = fixture.path("rules.json");
    fs::write(
        &rules,
        r#"[
            {"pattern": "^.*China.*$", "canonical": "China"},
            {"pattern": "^Korea, South$", "canonical": "South Korea"}
        ]"#,
    )
    .unwrap();

    let mut config = fixture.config();
    config.rules_path = Some(rules);
    let result = run_with(config).unwrap();

    assert!(!rows_of(&result, EntityKind::Country, "US").is_empty());
    assert!(rows_of(&result, EntityKind::Country, "United States").is_empty());
    assert_eq!(result.summary.normalize.unmapped, vec!["Italy".to_string(), "US".to_string()]);
}

#[test]
fn test_invalid_rules_file_is_fatal() {
    let fixture = Fixture::new();
    standard_corpus(&fixture);
    let rules = fixture.path("rules.json");
    fs::write(&rules, r#"[{"pattern": "(", "canonical": "X"}]"#).unwrap();

    let mut config = fixture.config();
    config.rules_path = Some(rules);
    let err = run_with(config).unwrap_err();

    assert_eq!(err.error_code(), "INVALID_RULE");
    assert!(!Path::new(&fixture.output()).exists());
}

#[test]
fn test_moving_average_appears_after_full_window() {
    let fixture = Fixture::new();
    for day in 1..=8u64 {
        let row = format!(",Italy,2020-03-{day:02}T12:00:00,{},{},0", day * 100, day * 10);
        fixture.legacy(&format!("03-{day:02}-2020"), &[row.as_str()]);
    }

    let result = fixture.run();
    let italy = rows_of(&result, EntityKind::Country, "Italy");

    assert_eq!(italy.len(), 8);
    assert!(italy[..6].iter().all(|r| r.flat_ma.is_none()));
    // daily deaths: 0, then 10 each day
    assert_eq!(italy[6].flat_ma, Some(60.0 / 7.0));
    assert_eq!(italy[7].flat_ma, Some(10.0));

    let total: i64 = italy.iter().map(|r| r.daily_confirmed).sum();
    assert_eq!(total, 800 - 100);
}
