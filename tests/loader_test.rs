use qtm_spec::adapters::BUNDLED_DATA_DIR;
use qtm_spec::{load_path, LocalStorage, Selector, SpecError, SpecLoader};
use serde_json::Value;
use std::fs;
use tempfile::TempDir;

fn bundled_loader() -> SpecLoader<LocalStorage> {
    SpecLoader::new(LocalStorage::new(BUNDLED_DATA_DIR))
}

#[test]
fn test_every_bundled_selector_loads() {
    let loader = bundled_loader();
    let selectors: Vec<Selector> = loader.selectors().collect::<Result<_, _>>().unwrap();
    assert!(selectors.len() >= 12);

    for selector in &selectors {
        let table = loader.load(selector).unwrap();
        assert!(!table.is_empty(), "{} loaded no records", selector);
        assert_eq!(table.selector(), selector);
        assert!(table
            .iter()
            .all(|r| r.metadata.machine == selector.machine && r.metadata.date.is_some()));
    }
}

#[test]
fn test_bundled_machines_and_dates() {
    let loader = bundled_loader();
    assert_eq!(loader.machines().unwrap(), vec!["H1-1", "H1-2", "H2-1"]);
    assert_eq!(loader.dates("H1-2").unwrap(), vec!["2022_09_28"]);
    assert!(loader.dates("H9-9").unwrap().is_empty());
}

#[test]
fn test_unknown_selector_is_not_found() {
    let loader = bundled_loader();
    for selector in [
        "H1-1/2024_01_15/NoSuchTest",
        "H1-1/1999_01_01/SPAM",
        "H7-1/2024_01_15/SPAM",
    ] {
        let err = loader.load_str(selector).unwrap_err();
        assert!(matches!(err, SpecError::NotFound { .. }), "{}: {:?}", selector, err);
    }
}

#[test]
fn test_malformed_selector_is_rejected() {
    let loader = bundled_loader();
    for selector in ["H1-1/SPAM", "H1-1/../SPAM/x", "a/b/c/d", ""] {
        let err = loader.load_str(selector).unwrap_err();
        assert!(matches!(err, SpecError::InvalidSelector { .. }), "{}: {:?}", selector, err);
    }
}

#[test]
fn test_loading_twice_gives_equal_tables() {
    let loader = bundled_loader();
    let first = loader.load_str("H1-1/2024_01_15/TQ_RB").unwrap();
    let second = loader.load_str("H1-1/2024_01_15/TQ_RB").unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_json_values_match_source_file() {
    let loader = bundled_loader();
    let table = loader.load_str("H1-1/2024_01_15/SPAM").unwrap();

    let path = format!("{}/H1-1/2024_01_15/SPAM.json", BUNDLED_DATA_DIR);
    let raw: Value = serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();

    let shots = table.get("shots").unwrap();
    assert_eq!(shots.value, raw["shots"].as_f64().unwrap());
    assert_eq!(shots.units, "shots");

    let count = table.get("survival/3/1").unwrap();
    assert_eq!(count.value, raw["survival"]["3"]["1"].as_f64().unwrap());
    assert_eq!(count.units, "counts");
    assert_eq!(count.metadata.qubits.as_deref(), Some("3"));

    let survival_records = table
        .iter()
        .filter(|r| r.name.starts_with("survival/"))
        .count();
    let expected: usize = raw["survival"]
        .as_object()
        .unwrap()
        .values()
        .map(|v| v.as_object().unwrap().len())
        .sum();
    assert_eq!(survival_records, expected);
}

#[test]
fn test_records_grouped_by_qubits() {
    let loader = bundled_loader();
    let table = loader.load_str("H1-1/2024_01_15/TQ_RB").unwrap();
    let groups = table.by_qubits();

    let keys: Vec<Option<&str>> = groups.keys().copied().collect();
    assert_eq!(
        keys,
        vec![None, Some("0, 1"), Some("2, 3"), Some("4, 5"), Some("6, 7"), Some("8, 9")]
    );

    let shots = &groups[&None];
    assert!(shots.iter().any(|r| r.name == "shots"));
    assert!(shots.iter().all(|r| r.units != "counts"));

    let zone = &groups[&Some("0, 1")];
    assert!(zone.iter().all(|r| r.units == "counts" && r.name.contains("/0, 1/")));
    assert!(zone.iter().any(|r| r.name.starts_with("survival/")));
    assert!(zone.iter().any(|r| r.name.starts_with("leakage_postselect/")));

    let grouped: usize = groups.values().map(Vec::len).sum();
    assert_eq!(grouped, table.len());
}

#[test]
fn test_csv_sheet_loads_with_units_and_extra_columns() {
    let loader = bundled_loader();
    let table = loader.load_str("H1-1/2024_01_15/device_specs").unwrap();

    let qubits = table.get("qubits").unwrap();
    assert_eq!(qubits.value, 20.0);

    let gate_time = table.get("two_qubit_gate_time").unwrap();
    assert_eq!(gate_time.units, "us");
    assert!(gate_time.metadata.extra.contains_key("notes"));
}

#[test]
fn test_experiment_data_shape() {
    let loader = bundled_loader();
    let rb = loader
        .load_experiment(&"H1-1/2024_01_15/TQ_RB".parse().unwrap())
        .unwrap();
    assert_eq!(rb.shots, 100);
    assert_eq!(
        rb.survival.qubit_groups(),
        vec!["0, 1", "2, 3", "4, 5", "6, 7", "8, 9"]
    );
    assert!(rb.leakage_postselect.is_some());

    let sheet: Selector = "H1-1/2024_01_15/device_specs".parse().unwrap();
    assert!(matches!(
        loader.load_experiment(&sheet).unwrap_err(),
        SpecError::NotFound { .. }
    ));
}

#[test]
fn test_custom_data_dir() {
    let temp_dir = TempDir::new().unwrap();
    let day = temp_dir.path().join("H2-2").join("2025_06_30");
    fs::create_dir_all(&day).unwrap();
    fs::write(
        day.join("cycle_times.csv"),
        "parameter,value,units,qubits\nshuttle,55.5,us,\ngate,12,us,\"0, 1\"\n",
    )
    .unwrap();
    fs::write(day.join("README.txt"), "ignored").unwrap();

    let loader = SpecLoader::new(LocalStorage::new(temp_dir.path()));
    let selectors: Vec<String> = loader
        .selectors()
        .map(|s| s.unwrap().to_string())
        .collect();
    assert_eq!(selectors, vec!["H2-2/2025_06_30/cycle_times"]);

    let table = loader.load_str("H2-2/2025_06_30/cycle_times").unwrap();
    assert_eq!(table.len(), 2);
    assert_eq!(table.get("shuttle").unwrap().value, 55.5);
    assert_eq!(table.get("gate").unwrap().metadata.qubits.as_deref(), Some("0, 1"));

    let direct = load_path(day.join("cycle_times.csv")).unwrap();
    assert_eq!(direct, table);
}

#[test]
fn test_broken_file_is_parse_error() {
    let temp_dir = TempDir::new().unwrap();
    let day = temp_dir.path().join("H1-1").join("2024_02_02");
    fs::create_dir_all(&day).unwrap();
    fs::write(day.join("SPAM.json"), "{\"shots\": 10, \"survival\": ").unwrap();
    fs::write(day.join("empty.json"), "{\"note\": \"text only\"}").unwrap();

    let loader = SpecLoader::new(LocalStorage::new(temp_dir.path()));
    assert!(matches!(
        loader.load_str("H1-1/2024_02_02/SPAM").unwrap_err(),
        SpecError::Parse { .. }
    ));
    assert!(matches!(
        loader.load_str("H1-1/2024_02_02/empty").unwrap_err(),
        SpecError::Parse { .. }
    ));
}

#[test]
fn test_missing_data_dir() {
    let temp_dir = TempDir::new().unwrap();
    let loader = SpecLoader::new(LocalStorage::new(temp_dir.path().join("missing")));
    assert!(loader.selectors().next().unwrap().is_err());
    assert!(matches!(
        loader.load_str("H1-1/2024_01_15/SPAM").unwrap_err(),
        SpecError::NotFound { .. }
    ));
}
