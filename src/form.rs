//! 입력 폼과 가격 모델 사이의 연결부. 화면 기술(CLI/GUI)과 무관하다.

use std::collections::HashMap;

use thiserror::Error;

use crate::config::{Config, FieldSource, FieldSpec};
use crate::pricing::{InputVector, PricingError, PricingModel};

/// 폼 입력 처리 오류.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormError {
    #[error("{label} must be between {min} and {max}, got {value}")]
    OutOfRange {
        label: String,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("field '{0}' is marked constant but has no value")]
    MissingConstant(String),
    #[error("'{variable}' is not an input of {machine}")]
    UnknownField { machine: String, variable: String },
    #[error("invalid assignment '{0}', expected Name=value")]
    BadAssignment(String),
    #[error(transparent)]
    Pricing(#[from] PricingError),
}

/// 기계 하나의 변수 한 칸.
#[derive(Debug, Clone, PartialEq)]
pub struct FormField {
    pub variable: String,
    pub spec: FieldSpec,
}

impl FormField {
    pub fn label(&self) -> &str {
        self.spec.label.as_deref().unwrap_or(&self.variable)
    }

    /// "Initial Cost (₦)" 처럼 단위를 붙인 라벨.
    pub fn label_with_unit(&self) -> String {
        match self.spec.unit.as_deref() {
            Some(unit) if !unit.is_empty() => format!("{} ({unit})", self.label()),
            _ => self.label().to_string(),
        }
    }

    pub fn is_prompted(&self) -> bool {
        self.spec.source == FieldSource::Input
    }

    /// 설정된 범위 안으로 자른다. GUI 드래그 입력에 쓴다.
    pub fn clamp(&self, value: f64) -> f64 {
        let lo = self.spec.min.unwrap_or(f64::NEG_INFINITY);
        let hi = self.spec.max.unwrap_or(f64::INFINITY);
        value.max(lo).min(hi)
    }

    pub fn validate(&self, value: f64) -> Result<f64, FormError> {
        let min = self.spec.min.unwrap_or(f64::NEG_INFINITY);
        let max = self.spec.max.unwrap_or(f64::INFINITY);
        if value < min || value > max {
            return Err(FormError::OutOfRange {
                label: self.label().to_string(),
                value,
                min,
                max,
            });
        }
        Ok(value)
    }
}

/// 선택한 기계의 모든 변수(절편 제외)를 설정 순서대로 나열한다.
pub fn fields_for(
    config: &Config,
    model: &PricingModel,
    machine: &str,
) -> Result<Vec<FormField>, PricingError> {
    Ok(model
        .variables(machine)?
        .map(|variable| FormField {
            variable: variable.to_string(),
            spec: config.field(variable),
        })
        .collect())
}

/// 사용자가 입력한 값과 폼 설정으로 입력 벡터를 만든다.
///
/// 입력이 없고 기본값도 없는 변수는 비워 두고, 가격 평가에서 MissingVariable로 보고된다.
pub fn build_inputs(
    config: &Config,
    model: &PricingModel,
    machine: &str,
    entries: &HashMap<String, f64>,
) -> Result<InputVector, FormError> {
    let fields = fields_for(config, model, machine)?;
    for name in entries.keys() {
        if !fields.iter().any(|f| f.variable == *name && f.is_prompted()) {
            return Err(FormError::UnknownField {
                machine: machine.to_string(),
                variable: name.clone(),
            });
        }
    }

    let mut inputs = InputVector::with_capacity(fields.len());
    for field in &fields {
        let value = match field.spec.source {
            FieldSource::Input => match entries.get(&field.variable).or(field.spec.default.as_ref()) {
                Some(v) => Some(field.validate(*v)?),
                None => None,
            },
            FieldSource::Constant => Some(
                field
                    .spec
                    .value
                    .ok_or_else(|| FormError::MissingConstant(field.variable.clone()))?,
            ),
            FieldSource::Coefficient => model.coefficient(machine, &field.variable),
        };
        if let Some(value) = value {
            inputs.insert(field.variable.clone(), value);
        }
    }
    Ok(inputs)
}

/// "Initial Cost=1500000" 형식을 (이름, 값)으로 나눈다.
pub fn parse_assignment(raw: &str) -> Result<(String, f64), FormError> {
    let bad = || FormError::BadAssignment(raw.to_string());
    let (name, value) = raw.split_once('=').ok_or_else(bad)?;
    let name = name.trim();
    if name.is_empty() {
        return Err(bad());
    }
    let value: f64 = value.trim().replace(',', "").parse().map_err(|_| bad())?;
    if !value.is_finite() {
        return Err(bad());
    }
    Ok((name.to_string(), value))
}

/// 천 단위 구분 기호와 소수 둘째 자리로 표시한다. 예: ₦645,920.93
pub fn format_price(price: f64, currency: &str) -> String {
    let fixed = format!("{:.2}", price.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if price < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{sign}{currency}{grouped}.{frac_part}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_price_groups_thousands() {
        assert_eq!(format_price(645_920.930_809, "₦"), "₦645,920.93");
        assert_eq!(format_price(999.999, "₦"), "₦1,000.00");
        assert_eq!(format_price(12.5, ""), "12.50");
        assert_eq!(format_price(-1_234_567.0, "$"), "-$1,234,567.00");
        assert_eq!(format_price(-0.001, "$"), "$0.00");
    }

    #[test]
    fn parse_assignment_accepts_spaces_and_commas() {
        assert_eq!(
            parse_assignment(" Initial Cost = 1,500,000 ").unwrap(),
            ("Initial Cost".to_string(), 1_500_000.0)
        );
        assert!(matches!(
            parse_assignment("Initial Cost"),
            Err(FormError::BadAssignment(_))
        ));
        assert!(matches!(
            parse_assignment("=5"),
            Err(FormError::BadAssignment(_))
        ));
        assert!(matches!(
            parse_assignment("Time Spent=abc"),
            Err(FormError::BadAssignment(_))
        ));
    }

    #[test]
    fn clamp_respects_open_bounds() {
        let field = FormField {
            variable: "Initial Cost".into(),
            spec: FieldSpec {
                min: Some(10.0),
                ..FieldSpec::default()
            },
        };
        assert_eq!(field.clamp(3.0), 10.0);
        assert_eq!(field.clamp(1e12), 1e12);
        assert_eq!(field.label_with_unit(), "Initial Cost");
    }
}
