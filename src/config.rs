use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::ledger::DEFAULT_LEDGER_FILE;
use crate::pricing::{PricingModel, PricingOptions, DEFAULT_INTERCEPT_VARIABLE};

/// 기본 설정 파일 이름.
pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

/// 폼 입력 값을 어디서 가져올지 정한다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldSource {
    /// 사용자에게 묻는다.
    #[default]
    Input,
    /// 고정값(`value`)을 쓴다.
    Constant,
    /// 선택한 기계의 해당 변수 계수를 그대로 입력값으로 쓴다.
    Coefficient,
}

/// 변수 하나에 대한 입력 폼 설명.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<f64>,
    pub source: FieldSource,
    /// `source = "constant"`일 때의 값
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
}

impl FieldSpec {
    fn input(label: &str, unit: &str, min: f64, max: Option<f64>, step: f64) -> Self {
        Self {
            label: Some(label.into()),
            unit: Some(unit.into()),
            min: Some(min),
            max,
            step: Some(step),
            default: Some(min),
            ..Self::default()
        }
    }
}

/// 가격식 옵션(절편 이름, 반올림).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingSettings {
    /// 절편으로 취급할 변수 이름. 빈 문자열이면 절편 없음.
    pub intercept_variable: String,
    /// 예: 100.0 이면 100 단위 반올림. 없으면 반올림하지 않는다.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub round_to_nearest: Option<f64>,
}

impl Default for PricingSettings {
    fn default() -> Self {
        Self {
            intercept_variable: DEFAULT_INTERCEPT_VARIABLE.to_string(),
            round_to_nearest: None,
        }
    }
}

impl PricingSettings {
    fn options(&self) -> PricingOptions {
        let name = self.intercept_variable.trim();
        PricingOptions {
            intercept_variable: (!name.is_empty()).then(|| name.to_string()),
            round_to_nearest: self.round_to_nearest,
        }
    }
}

/// 애플리케이션 설정을 표현한다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// auto/en-us/ko-kr 등
    pub language: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language_pack_dir: Option<String>,
    pub ledger_path: String,
    /// 가격 표시용 통화 기호
    pub currency: String,
    pub pricing: PricingSettings,
    /// 기계 종류 → (변수 → 계수). 파일에 적힌 순서를 유지한다.
    pub machines: toml::Table,
    pub fields: BTreeMap<String, FieldSpec>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            language: "auto".into(),
            language_pack_dir: None,
            ledger_path: DEFAULT_LEDGER_FILE.into(),
            currency: "₦".into(),
            pricing: PricingSettings::default(),
            machines: default_machines(),
            fields: default_fields(),
        }
    }
}

/// 설정 로드/저장 시 발생 가능한 오류를 표현한다.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("config serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

// 원래 회귀 분석에서 나온 계수. Machine fee만 기계별로 다르다.
const SHARED_COEFFICIENTS: [(&str, f64); 4] = [
    ("Initial Cost", -0.000012),
    ("Space Occupied", 232.917649),
    ("Power Rating", 33.378031),
    ("Time Spent", 19.707472),
];
const COST_OF_REPAIRS: f64 = -0.000311;
const MACHINE_FEES: [(&str, f64); 4] = [
    ("Small Lathe Machine", 673.339524),
    ("Big Lathe Machine", 3307.525969),
    ("Milling Machine", 2006.527801),
    ("Drilling Machine", -1015.412413),
];

fn default_machines() -> toml::Table {
    let mut machines = toml::Table::new();
    for (machine, fee) in MACHINE_FEES {
        let mut row = toml::Table::new();
        for (name, coef) in SHARED_COEFFICIENTS {
            row.insert(name.into(), toml::Value::Float(coef));
        }
        row.insert("Machine fee".into(), toml::Value::Float(fee));
        row.insert("Cost of Repairs".into(), toml::Value::Float(COST_OF_REPAIRS));
        machines.insert(machine.into(), toml::Value::Table(row));
    }
    machines
}

fn default_fields() -> BTreeMap<String, FieldSpec> {
    let mut fields = BTreeMap::new();
    fields.insert(
        "Initial Cost".into(),
        FieldSpec::input("Initial Cost", "₦", 1_000_000.0, None, 100_000.0),
    );
    fields.insert(
        "Space Occupied".into(),
        FieldSpec::input("Area Occupied", "m²", 1.0, Some(500.0), 1.0),
    );
    fields.insert(
        "Power Rating".into(),
        FieldSpec::input("Power Rating", "W", 2000.0, Some(30_000.0), 100.0),
    );
    fields.insert(
        "Time Spent".into(),
        FieldSpec::input("Time Spent", "min", 60.0, Some(720.0), 60.0),
    );
    fields.insert(
        "Machine fee".into(),
        FieldSpec {
            label: Some("Machine fee".into()),
            unit: Some("₦".into()),
            source: FieldSource::Coefficient,
            ..FieldSpec::default()
        },
    );
    fields.insert(
        "Cost of Repairs".into(),
        FieldSpec {
            label: Some("Cost of Repairs".into()),
            unit: Some("₦".into()),
            source: FieldSource::Constant,
            value: Some(1.0),
            ..FieldSpec::default()
        },
    );
    fields
}

/// 설정 파일을 로드하거나 없으면 기본 설정을 생성한다.
pub fn load_or_default(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    if path.exists() {
        let content = fs::read_to_string(path)?;
        let cfg: Config = toml::from_str(&content)?;
        cfg.check_fields()?;
        Ok(cfg)
    } else {
        let cfg = Config::default();
        cfg.save_to(path)?;
        tracing::info!(path = %path.display(), "wrote default config");
        Ok(cfg)
    }
}

impl Config {
    /// 설정을 path에 저장한다.
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// 계수 테이블을 검증해 불변 가격 모델을 만든다.
    pub fn pricing_model(&self) -> Result<PricingModel, ConfigError> {
        let mut table: Vec<(String, Vec<(String, f64)>)> = Vec::with_capacity(self.machines.len());
        for (machine, row) in &self.machines {
            let row = row.as_table().ok_or_else(|| {
                ConfigError::Invalid(format!("machines.\"{machine}\" must be a table"))
            })?;
            let mut entries = Vec::with_capacity(row.len());
            for (name, value) in row {
                let coef = match value {
                    toml::Value::Float(f) => *f,
                    toml::Value::Integer(i) => *i as f64,
                    _ => {
                        return Err(ConfigError::Invalid(format!(
                            "machines.\"{machine}\".\"{name}\" must be a number"
                        )))
                    }
                };
                entries.push((name.clone(), coef));
            }
            table.push((machine.clone(), entries));
        }
        self.check_fields()?;
        PricingModel::new(table, self.pricing.options())
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    /// 폼 설명끼리 모순이 없는지 확인한다.
    pub fn check_fields(&self) -> Result<(), ConfigError> {
        let invalid = |name: &str, what: String| {
            ConfigError::Invalid(format!("fields.\"{name}\": {what}"))
        };
        for (name, spec) in &self.fields {
            let numbers = [
                ("min", spec.min),
                ("max", spec.max),
                ("step", spec.step),
                ("default", spec.default),
                ("value", spec.value),
            ];
            if let Some((key, _)) = numbers
                .iter()
                .find(|(_, v)| v.is_some_and(|v| !v.is_finite()))
            {
                return Err(invalid(name, format!("{key} must be a finite number")));
            }
            if let (Some(min), Some(max)) = (spec.min, spec.max) {
                if min > max {
                    return Err(invalid(name, format!("min {min} is greater than max {max}")));
                }
            }
            if let Some(step) = spec.step.filter(|s| *s <= 0.0) {
                return Err(invalid(name, format!("step must be positive, got {step}")));
            }
            if let Some(default) = spec.default {
                let below = spec.min.is_some_and(|min| default < min);
                let above = spec.max.is_some_and(|max| default > max);
                if below || above {
                    return Err(invalid(name, format!("default {default} is outside min/max")));
                }
            }
            if spec.source == FieldSource::Constant && spec.value.is_none() {
                return Err(invalid(name, "source \"constant\" needs a value".into()));
            }
        }
        Ok(())
    }

    /// 폼 설명을 조회한다. 없으면 기본 입력 필드.
    pub fn field(&self, variable: &str) -> FieldSpec {
        self.fields.get(variable).cloned().unwrap_or_default()
    }
}
