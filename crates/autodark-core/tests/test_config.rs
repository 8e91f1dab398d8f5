#[allow(dead_code)]
mod common;

use autodark_core::config::{BatchConfig, MatchTolerances};
use autodark_core::error::{AutodarkError, ErrorKind};

use common::dirs;

// ---------------------------------------------------------------------------
// MatchTolerances
// ---------------------------------------------------------------------------

#[test]
fn test_default_tolerances() {
    let t = MatchTolerances::default();
    assert_eq!(t.max_time_diff_secs, 86_400);
    assert_eq!(t.min_exposure_equality_pct, 65.0);
    assert_eq!(t.min_calfiles, 2);
    assert_eq!(t.max_calfiles, 17);
    assert!(t.validate().is_ok());
}

#[test]
fn test_min_above_max_is_rejected() {
    let t = MatchTolerances {
        min_calfiles: 5,
        max_calfiles: 3,
        ..Default::default()
    };
    assert!(matches!(t.validate(), Err(AutodarkError::Config(_))));
}

#[test]
fn test_equality_out_of_range_is_rejected() {
    let t = MatchTolerances {
        min_exposure_equality_pct: 120.0,
        ..Default::default()
    };
    assert!(t.validate().is_err());
}

#[test]
fn test_negative_time_window_is_rejected() {
    let t = MatchTolerances {
        max_time_diff_secs: -1,
        ..Default::default()
    };
    assert!(t.validate().is_err());
}

// ---------------------------------------------------------------------------
// BatchConfig
// ---------------------------------------------------------------------------

#[test]
fn test_valid_config() {
    let d = dirs();
    let mut config = BatchConfig::new(&d.input, &d.output);
    config.dark = Some(d.dark.clone());
    config.bias = Some(d.bias.clone());
    assert!(config.validate().is_ok());
}

#[test]
fn test_requires_some_calibration_directory() {
    let d = dirs();
    let config = BatchConfig::new(&d.input, &d.output);
    let err = config.validate().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
}

#[test]
fn test_flat_alone_is_accepted() {
    let d = dirs();
    let flat = d.root.path().join("flat");
    std::fs::create_dir(&flat).unwrap();
    let mut config = BatchConfig::new(&d.input, &d.output);
    config.flat = Some(flat);
    assert!(config.validate().is_ok());
}

#[test]
fn test_missing_directory_is_rejected() {
    let d = dirs();
    let mut config = BatchConfig::new(&d.input, &d.output);
    config.dark = Some(d.root.path().join("no_such_dir"));
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("dark"));
}

#[test]
fn test_file_instead_of_directory_is_rejected() {
    let d = dirs();
    let file = d.root.path().join("plain.txt");
    std::fs::write(&file, b"x").unwrap();
    let mut config = BatchConfig::new(&file, &d.output);
    config.dark = Some(d.dark.clone());
    assert!(config.validate().is_err());
}

#[test]
fn test_zero_jobs_per_core_is_rejected() {
    let d = dirs();
    let mut config = BatchConfig::new(&d.input, &d.output);
    config.dark = Some(d.dark.clone());
    config.jobs_per_core = 0;
    assert!(config.validate().is_err());
}

// ---------------------------------------------------------------------------
// TOML
// ---------------------------------------------------------------------------

#[test]
fn test_minimal_toml_uses_defaults() {
    let config: BatchConfig = toml::from_str(
        r#"
        input = "/data/lights"
        output = "/data/calibrated"
        dark = "/data/darks"
        "#,
    )
    .unwrap();

    assert_eq!(config.jobs_per_core, 1);
    assert_eq!(config.tolerances, MatchTolerances::default());
    assert!(config.bias.is_none());
    assert!(config.flat.is_none());
}

#[test]
fn test_partial_tolerances_in_toml() {
    let config: BatchConfig = toml::from_str(
        r#"
        input = "in"
        output = "out"
        bias = "bias"
        jobs_per_core = 3

        [tolerances]
        max_time_diff_secs = 3600
        min_calfiles = 4
        "#,
    )
    .unwrap();

    assert_eq!(config.jobs_per_core, 3);
    assert_eq!(config.tolerances.max_time_diff_secs, 3600);
    assert_eq!(config.tolerances.min_calfiles, 4);
    assert_eq!(config.tolerances.max_calfiles, 17);
}

#[test]
fn test_toml_round_trip() {
    let mut config = BatchConfig::new("in", "out");
    config.dark = Some("darks".into());
    config.tolerances.min_exposure_equality_pct = 80.5;

    let text = toml::to_string_pretty(&config).unwrap();
    let back: BatchConfig = toml::from_str(&text).unwrap();
    assert_eq!(back.dark, config.dark);
    assert_eq!(back.tolerances, config.tolerances);
}
