//! 설정 파일, 입력 폼, 견적기 전체 흐름 테스트.
use std::collections::HashMap;
use std::fs;

use tempfile::tempdir;
use workshop_price_estimator::{
    app::{AppError, Estimator},
    config::{self, Config, ConfigError},
    form::{self, FormError},
    pricing::PricingError,
};

fn assert_close(label: &str, actual: f64, expected: f64, rel_tol: f64) {
    let denom = expected.abs().max(1.0);
    let diff = (actual - expected).abs();
    assert!(
        diff <= rel_tol * denom,
        "{label} expected {expected:.6} got {actual:.6} (diff {diff:.6}, tol {rel_tol})"
    );
}

fn entries(pairs: &[(&str, f64)]) -> HashMap<String, f64> {
    pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

const CUSTOM: &str = r#"
language = "en-us"
currency = "$"

[pricing]
round_to_nearest = 10.0

[machines.Press]
Intercept = 100
"Time Spent" = 2.5

[machines.Saw]
"Time Spent" = 1
"Blade Wear" = 4.0

[fields."Time Spent"]
min = 10
max = 100
default = 20
"#;

#[test]
fn default_config_is_written_and_reloaded() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    let first = config::load_or_default(&path).expect("create default");
    assert!(path.exists());
    let second = config::load_or_default(&path).expect("reload");
    assert_eq!(first, second);
    assert_eq!(first, Config::default());

    let model = second.pricing_model().unwrap();
    assert_eq!(
        model.machine_types().collect::<Vec<_>>(),
        vec![
            "Small Lathe Machine",
            "Big Lathe Machine",
            "Milling Machine",
            "Drilling Machine",
        ]
    );
    assert_eq!(model.coefficient("Milling Machine", "Machine fee"), Some(2006.527801));
}

#[test]
fn custom_table_with_intercept_and_rounding() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, CUSTOM).unwrap();
    let cfg = config::load_or_default(&path).unwrap();
    assert_eq!(cfg.currency, "$");
    let model = cfg.pricing_model().unwrap();
    assert_eq!(model.machine_types().collect::<Vec<_>>(), vec!["Press", "Saw"]);

    let inputs = form::build_inputs(&cfg, &model, "Press", &entries(&[("Time Spent", 33.0)])).unwrap();
    // 100 + 2.5 * 33 = 182.5 → 10 단위 반올림
    assert_eq!(model.evaluate("Press", &inputs).unwrap(), 180.0);

    let inputs = form::build_inputs(&cfg, &model, "Press", &HashMap::new()).unwrap();
    assert_eq!(inputs.get("Time Spent"), Some(&20.0));
    assert_eq!(model.evaluate("Press", &inputs).unwrap(), 150.0);
}

#[test]
fn non_numeric_coefficient_is_invalid() {
    let cfg: Config = toml::from_str(
        r#"
[machines.Press]
"Time Spent" = "fast"
"#,
    )
    .unwrap();
    assert!(matches!(cfg.pricing_model(), Err(ConfigError::Invalid(_))));
}

#[test]
fn fixed_fields_come_from_config() {
    let cfg = Config::default();
    let model = cfg.pricing_model().unwrap();
    let inputs = form::build_inputs(
        &cfg,
        &model,
        "Big Lathe Machine",
        &entries(&[("Space Occupied", 100.0), ("Power Rating", 5000.0), ("Time Spent", 120.0)]),
    )
    .unwrap();
    assert_eq!(inputs.get("Machine fee"), Some(&3307.525969));
    assert_eq!(inputs.get("Cost of Repairs"), Some(&1.0));
    assert_eq!(inputs.get("Initial Cost"), Some(&1_000_000.0));
    assert_close(
        "big lathe",
        model.evaluate("Big Lathe Machine", &inputs).unwrap(),
        11_132_262.851_838_386,
        1e-12,
    );
}

#[test]
fn form_rejects_bad_entries() {
    let cfg = Config::default();
    let model = cfg.pricing_model().unwrap();
    let machine = "Small Lathe Machine";

    let err = form::build_inputs(&cfg, &model, machine, &entries(&[("Time Spent", 800.0)])).unwrap_err();
    assert!(matches!(err, FormError::OutOfRange { value, .. } if value == 800.0));

    let err = form::build_inputs(&cfg, &model, machine, &entries(&[("Machine fee", 1.0)])).unwrap_err();
    assert!(matches!(err, FormError::UnknownField { .. }));

    let err = form::build_inputs(&cfg, &model, machine, &entries(&[("Colour", 1.0)])).unwrap_err();
    assert!(matches!(err, FormError::UnknownField { .. }));

    let err = form::build_inputs(&cfg, &model, "Unknown Machine", &HashMap::new()).unwrap_err();
    assert_eq!(
        err,
        FormError::Pricing(PricingError::UnknownMachineType("Unknown Machine".into()))
    );
}

#[test]
fn estimate_logs_one_row() {
    let dir = tempdir().unwrap();
    let cfg = Config {
        ledger_path: dir.path().join("pricing_history.csv").to_string_lossy().into_owned(),
        ..Config::default()
    };
    let est = Estimator::from_config(cfg).unwrap();
    let event = est
        .estimate(
            "  Ada Obi ",
            "Small Lathe Machine",
            &entries(&[("Space Occupied", 100.0), ("Power Rating", 5000.0), ("Time Spent", 120.0)]),
        )
        .expect("estimate");
    assert_eq!(event.customer_name, "Ada Obi");
    assert_eq!(event.machine_type, "Small Lathe Machine");
    assert_close("price", event.estimated_price, 645_920.930_809_546_5, 1e-12);
    assert_eq!(est.format_price(event.estimated_price), "₦645,920.93");
    assert_eq!(est.ledger.read_all().unwrap(), vec![event]);
}

#[test]
fn missing_input_without_default_logs_nothing() {
    let dir = tempdir().unwrap();
    let mut cfg: Config = toml::from_str(CUSTOM).unwrap();
    cfg.ledger_path = dir.path().join("pricing_history.csv").to_string_lossy().into_owned();
    let est = Estimator::from_config(cfg).unwrap();
    let err = est
        .estimate("Ada", "Saw", &entries(&[("Time Spent", 30.0)]))
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::Pricing(PricingError::MissingVariable { ref variable, .. }) if variable == "Blade Wear"
    ));
    assert!(est.ledger.read_all().unwrap().is_empty());

    let event = est
        .estimate("Ada", "Saw", &entries(&[("Time Spent", 30.0), ("Blade Wear", 5.0)]))
        .unwrap();
    // 30 + 20 = 50
    assert_eq!(event.estimated_price, 50.0);
}

#[test]
fn failed_write_discards_estimate() {
    let dir = tempdir().unwrap();
    let cfg = Config {
        ledger_path: dir.path().to_string_lossy().into_owned(),
        ..Config::default()
    };
    let est = Estimator::from_config(cfg).unwrap();
    let err = est
        .estimate("Ada", "Milling Machine", &HashMap::new())
        .unwrap_err();
    assert!(matches!(err, AppError::Ledger(_)));
}

#[test]
fn disabled_intercept_survives_save_and_reload() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    let mut cfg: Config = toml::from_str(
        r#"
[machines.Press]
Intercept = 250.0
"Time Spent" = 2.0
"#,
    )
    .unwrap();
    assert_eq!(cfg.pricing.intercept_variable, "Intercept");
    assert_eq!(
        cfg.pricing_model().unwrap().evaluate("Press", &entries(&[("Time Spent", 10.0)])).unwrap(),
        270.0
    );

    cfg.pricing.intercept_variable = String::new();
    cfg.save_to(&path).unwrap();
    assert!(fs::read_to_string(&path).unwrap().contains("intercept_variable = \"\""));

    let reloaded = config::load_or_default(&path).unwrap();
    assert_eq!(reloaded, cfg);
    let model = reloaded.pricing_model().unwrap();
    assert_eq!(
        model.variables("Press").unwrap().collect::<Vec<_>>(),
        vec!["Intercept", "Time Spent"]
    );
    assert!(matches!(
        model.evaluate("Press", &entries(&[("Time Spent", 10.0)])),
        Err(PricingError::MissingVariable { ref variable, .. }) if variable == "Intercept"
    ));
    let price = model
        .evaluate("Press", &entries(&[("Intercept", 3.0), ("Time Spent", 10.0)]))
        .unwrap();
    assert_eq!(price, 770.0);
}

#[test]
fn contradictory_field_ranges_are_rejected_on_load() {
    let cases = [
        "[fields.\"Time Spent\"]\nmin = 100\nmax = 10\n",
        "[fields.\"Time Spent\"]\nmin = 10\nmax = 100\ndefault = 500\n",
        "[fields.\"Time Spent\"]\nstep = 0\n",
        "[fields.\"Cost of Repairs\"]\nsource = \"constant\"\n",
    ];
    let dir = tempdir().unwrap();
    for (i, case) in cases.iter().enumerate() {
        let path = dir.path().join(format!("config{i}.toml"));
        fs::write(&path, case).unwrap();
        assert!(
            matches!(config::load_or_default(&path), Err(ConfigError::Invalid(_))),
            "case {i} should be rejected"
        );
        let cfg: Config = toml::from_str(case).unwrap();
        assert!(matches!(cfg.pricing_model(), Err(ConfigError::Invalid(_))));
    }
    assert!(Config::default().check_fields().is_ok());
}
