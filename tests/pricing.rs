//! 가격 모델 회귀 테스트. 기본 계수 테이블의 기준 견적값을 고정한다.
use std::collections::HashMap;

use workshop_price_estimator::{
    config::Config,
    pricing::{InputVector, PricingError, PricingModel, PricingOptions},
};

fn assert_close(label: &str, actual: f64, expected: f64, rel_tol: f64) {
    let denom = expected.abs().max(1.0);
    let diff = (actual - expected).abs();
    assert!(
        diff <= rel_tol * denom,
        "{label} expected {expected:.6} got {actual:.6} (diff {diff:.6}, tol {rel_tol})"
    );
}

fn inputs(pairs: &[(&str, f64)]) -> InputVector {
    pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

fn baseline_inputs(machine_fee: f64) -> InputVector {
    inputs(&[
        ("Initial Cost", 1_000_000.0),
        ("Space Occupied", 100.0),
        ("Power Rating", 5000.0),
        ("Time Spent", 120.0),
        ("Machine fee", machine_fee),
        ("Cost of Repairs", 1.0),
    ])
}

fn default_model() -> PricingModel {
    Config::default().pricing_model().expect("default table")
}

#[test]
fn small_lathe_baseline() {
    let price = default_model()
        .evaluate("Small Lathe Machine", &baseline_inputs(673.339524))
        .expect("evaluate");
    assert_close("small lathe", price, 645_920.930_809_546_5, 1e-12);
    assert_eq!(format!("{price:.2}"), "645920.93");
}

#[test]
fn big_lathe_uses_its_own_fee() {
    let price = default_model()
        .evaluate("Big Lathe Machine", &baseline_inputs(3307.525969))
        .expect("evaluate");
    assert_close("big lathe", price, 11_132_262.851_838_386, 1e-12);
}

#[test]
fn price_is_dot_product_in_any_input_order() {
    let model = PricingModel::new(
        vec![("Press", vec![("a", 2.0), ("b", -3.0), ("c", 0.5)])],
        PricingOptions::default(),
    )
    .unwrap();
    let forward = inputs(&[("a", 10.0), ("b", 4.0), ("c", 8.0)]);
    let reversed = inputs(&[("c", 8.0), ("b", 4.0), ("a", 10.0)]);
    assert_eq!(model.evaluate("Press", &forward).unwrap(), 12.0);
    assert_eq!(
        model.evaluate("Press", &forward).unwrap(),
        model.evaluate("Press", &reversed).unwrap()
    );
}

#[test]
fn extra_inputs_are_ignored() {
    let model = default_model();
    let mut with_extra = baseline_inputs(673.339524);
    with_extra.insert("Colour".into(), 42.0);
    assert_eq!(
        model.evaluate("Small Lathe Machine", &with_extra).unwrap(),
        model
            .evaluate("Small Lathe Machine", &baseline_inputs(673.339524))
            .unwrap()
    );
}

#[test]
fn unknown_machine_is_reported() {
    let err = default_model()
        .evaluate("Unknown Machine", &baseline_inputs(1.0))
        .unwrap_err();
    assert_eq!(err, PricingError::UnknownMachineType("Unknown Machine".into()));
}

#[test]
fn missing_variable_names_the_variable() {
    let mut partial = baseline_inputs(673.339524);
    partial.remove("Power Rating");
    let err = default_model()
        .evaluate("Small Lathe Machine", &partial)
        .unwrap_err();
    assert_eq!(
        err,
        PricingError::MissingVariable {
            machine: "Small Lathe Machine".into(),
            variable: "Power Rating".into(),
        }
    );
}

#[test]
fn rounding_is_opt_in() {
    let mut cfg = Config::default();
    let raw = cfg
        .pricing_model()
        .unwrap()
        .evaluate("Small Lathe Machine", &baseline_inputs(673.339524))
        .unwrap();
    assert_ne!(raw, 645_900.0);

    cfg.pricing.round_to_nearest = Some(100.0);
    let model = cfg.pricing_model().unwrap();
    assert_eq!(model.round_to_nearest(), Some(100.0));
    let rounded = model
        .evaluate("Small Lathe Machine", &baseline_inputs(673.339524))
        .unwrap();
    assert_eq!(rounded, 645_900.0);
}

#[test]
fn intercept_needs_no_input() {
    let model = PricingModel::new(
        vec![("Press", vec![("Intercept", 250.0), ("Time Spent", 2.0)])],
        PricingOptions::default(),
    )
    .unwrap();
    assert_eq!(
        model.variables("Press").unwrap().collect::<Vec<_>>(),
        vec!["Time Spent"]
    );
    let price = model
        .evaluate("Press", &inputs(&[("Time Spent", 30.0)]))
        .unwrap();
    assert_eq!(price, 310.0);
    // 호출자가 값을 넣어도 절편 입력은 항상 1이다.
    let price = model
        .evaluate("Press", &inputs(&[("Time Spent", 30.0), ("Intercept", 9.0)]))
        .unwrap();
    assert_eq!(price, 310.0);
}

#[test]
fn intercept_can_be_disabled() {
    let model = PricingModel::new(
        vec![("Press", vec![("Intercept", 250.0)])],
        PricingOptions {
            intercept_variable: None,
            round_to_nearest: None,
        },
    )
    .unwrap();
    assert!(matches!(
        model.evaluate("Press", &HashMap::new()),
        Err(PricingError::MissingVariable { .. })
    ));
}

#[test]
fn invalid_tables_are_rejected() {
    let opts = PricingOptions::default;
    let empty: Vec<(&str, Vec<(&str, f64)>)> = Vec::new();
    assert!(matches!(
        PricingModel::new(empty, opts()),
        Err(PricingError::InvalidTable(_))
    ));
    assert!(matches!(
        PricingModel::new(vec![("Press", vec![("a", f64::NAN)])], opts()),
        Err(PricingError::InvalidTable(_))
    ));
    assert!(matches!(
        PricingModel::new(
            vec![("Press", vec![("a", 1.0)]), ("Press", vec![("b", 1.0)])],
            opts()
        ),
        Err(PricingError::InvalidTable(_))
    ));
    assert!(matches!(
        PricingModel::new(vec![("Press", vec![("a", 1.0), ("a", 2.0)])], opts()),
        Err(PricingError::InvalidTable(_))
    ));
    assert!(matches!(
        PricingModel::new(vec![("Press", Vec::<(&str, f64)>::new())], opts()),
        Err(PricingError::InvalidTable(_))
    ));
    assert!(matches!(
        PricingModel::new(
            vec![("Press", vec![("a", 1.0)])],
            PricingOptions {
                round_to_nearest: Some(0.0),
                ..PricingOptions::default()
            }
        ),
        Err(PricingError::InvalidTable(_))
    ));
}

#[test]
fn machine_types_keep_table_order() {
    let model = default_model();
    assert_eq!(
        model.machine_types().collect::<Vec<_>>(),
        vec![
            "Small Lathe Machine",
            "Big Lathe Machine",
            "Milling Machine",
            "Drilling Machine",
        ]
    );
    assert_eq!(
        model.variables("Drilling Machine").unwrap().collect::<Vec<_>>(),
        vec![
            "Initial Cost",
            "Space Occupied",
            "Power Rating",
            "Time Spent",
            "Machine fee",
            "Cost of Repairs",
        ]
    );
}
