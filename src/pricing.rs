//! 기계 종류별 선형 가격식(계수 테이블)과 평가 로직.
//!
//! 가격 = Σ 계수[기계][변수] · 입력[변수]. 절편 변수는 입력값 1로 자동 대입한다.

use std::collections::HashMap;

use thiserror::Error;
use tracing::debug;

/// 절편 항으로 취급하는 기본 변수 이름.
pub const DEFAULT_INTERCEPT_VARIABLE: &str = "Intercept";

/// 변수 이름 → 입력값.
pub type InputVector = HashMap<String, f64>;

/// 가격 평가/계수 테이블 구성 시 발생 가능한 오류.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PricingError {
    /// 설정에 없는 기계 종류
    #[error("unknown machine type: {0}")]
    UnknownMachineType(String),
    /// 입력 벡터에 필요한 변수가 없음
    #[error("missing value for '{variable}' (required by {machine})")]
    MissingVariable { machine: String, variable: String },
    /// 계수 테이블 자체가 잘못됨
    #[error("invalid coefficient table: {0}")]
    InvalidTable(String),
}

/// 가격식 한 항의 종류.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermKind {
    /// 호출자가 값을 넣어야 하는 변수
    Variable,
    /// 입력값이 항상 1인 절편
    Intercept,
}

/// 계수 한 개.
#[derive(Debug, Clone, PartialEq)]
pub struct Term {
    pub name: String,
    pub coefficient: f64,
    pub kind: TermKind,
}

/// 한 기계 종류의 계수 행. 항 순서는 설정 순서를 그대로 따른다.
#[derive(Debug, Clone, PartialEq)]
pub struct CoefficientRow {
    pub machine: String,
    pub terms: Vec<Term>,
}

impl CoefficientRow {
    /// 호출자가 공급해야 하는 변수 이름(절편 제외).
    pub fn variables(&self) -> impl Iterator<Item = &str> + Clone + '_ {
        self.terms
            .iter()
            .filter(|t| t.kind == TermKind::Variable)
            .map(|t| t.name.as_str())
    }

    pub fn coefficient(&self, name: &str) -> Option<f64> {
        self.terms
            .iter()
            .find(|t| t.name == name)
            .map(|t| t.coefficient)
    }

    pub fn intercept(&self) -> Option<f64> {
        self.terms
            .iter()
            .find(|t| t.kind == TermKind::Intercept)
            .map(|t| t.coefficient)
    }
}

/// 가격식 옵션.
#[derive(Debug, Clone, PartialEq)]
pub struct PricingOptions {
    /// 절편으로 취급할 변수 이름. None이면 절편 없음.
    pub intercept_variable: Option<String>,
    /// 설정 시 결과를 이 단위로 반올림한다(예: 100.0). None이면 반올림하지 않는다.
    pub round_to_nearest: Option<f64>,
}

impl Default for PricingOptions {
    fn default() -> Self {
        Self {
            intercept_variable: Some(DEFAULT_INTERCEPT_VARIABLE.to_string()),
            round_to_nearest: None,
        }
    }
}

/// 기계 종류별 계수 테이블을 보관하고 가격을 계산한다.
///
/// 생성 후에는 불변이다. 전역 상태 없이 참조로 넘겨서 사용한다.
#[derive(Debug, Clone, PartialEq)]
pub struct PricingModel {
    rows: Vec<CoefficientRow>,
    round_to_nearest: Option<f64>,
}

impl PricingModel {
    /// (기계, [(변수, 계수)]) 목록으로 모델을 만든다. 순서는 입력 순서를 유지한다.
    pub fn new<I, M, R, V>(table: I, options: PricingOptions) -> Result<Self, PricingError>
    where
        I: IntoIterator<Item = (M, R)>,
        M: Into<String>,
        R: IntoIterator<Item = (V, f64)>,
        V: Into<String>,
    {
        if let Some(step) = options.round_to_nearest {
            if !step.is_finite() || step <= 0.0 {
                return Err(PricingError::InvalidTable(format!(
                    "round_to_nearest must be a positive number, got {step}"
                )));
            }
        }

        let mut rows: Vec<CoefficientRow> = Vec::new();
        for (machine, entries) in table {
            let machine = machine.into();
            if machine.trim().is_empty() {
                return Err(PricingError::InvalidTable("empty machine type name".into()));
            }
            if rows.iter().any(|r| r.machine == machine) {
                return Err(PricingError::InvalidTable(format!(
                    "machine type '{machine}' is defined twice"
                )));
            }
            let mut terms: Vec<Term> = Vec::new();
            for (name, coefficient) in entries {
                let name = name.into();
                if name.trim().is_empty() {
                    return Err(PricingError::InvalidTable(format!(
                        "{machine}: empty variable name"
                    )));
                }
                if !coefficient.is_finite() {
                    return Err(PricingError::InvalidTable(format!(
                        "{machine}: coefficient for '{name}' is not finite"
                    )));
                }
                if terms.iter().any(|t| t.name == name) {
                    return Err(PricingError::InvalidTable(format!(
                        "{machine}: variable '{name}' is defined twice"
                    )));
                }
                let kind = if options.intercept_variable.as_deref() == Some(name.as_str()) {
                    TermKind::Intercept
                } else {
                    TermKind::Variable
                };
                terms.push(Term {
                    name,
                    coefficient,
                    kind,
                });
            }
            if terms.is_empty() {
                return Err(PricingError::InvalidTable(format!(
                    "{machine}: no coefficients"
                )));
            }
            rows.push(CoefficientRow { machine, terms });
        }
        if rows.is_empty() {
            return Err(PricingError::InvalidTable("no machine types configured".into()));
        }

        Ok(Self {
            rows,
            round_to_nearest: options.round_to_nearest,
        })
    }

    /// 설정 순서대로 기계 종류 이름을 돌려준다.
    pub fn machine_types(&self) -> impl Iterator<Item = &str> + Clone + '_ {
        self.rows.iter().map(|r| r.machine.as_str())
    }

    pub fn row(&self, machine: &str) -> Result<&CoefficientRow, PricingError> {
        self.rows
            .iter()
            .find(|r| r.machine == machine)
            .ok_or_else(|| PricingError::UnknownMachineType(machine.to_string()))
    }

    /// 해당 기계에서 호출자가 넣어야 하는 변수 이름(설정 순서).
    pub fn variables(
        &self,
        machine: &str,
    ) -> Result<impl Iterator<Item = &str> + Clone + '_, PricingError> {
        Ok(self.row(machine)?.variables())
    }

    pub fn coefficient(&self, machine: &str, variable: &str) -> Option<f64> {
        self.row(machine).ok()?.coefficient(variable)
    }

    pub fn round_to_nearest(&self) -> Option<f64> {
        self.round_to_nearest
    }

    /// 선택한 기계의 가격을 계산한다.
    ///
    /// 설정 순서대로 더하므로 같은 입력이면 항상 같은 값이 나온다.
    /// 여분의 입력 키는 무시한다.
    pub fn evaluate(&self, machine: &str, inputs: &InputVector) -> Result<f64, PricingError> {
        let row = self.row(machine)?;
        let mut price = 0.0;
        for term in &row.terms {
            let value = match term.kind {
                TermKind::Intercept => 1.0,
                TermKind::Variable => {
                    *inputs
                        .get(&term.name)
                        .ok_or_else(|| PricingError::MissingVariable {
                            machine: row.machine.clone(),
                            variable: term.name.clone(),
                        })?
                }
            };
            price += term.coefficient * value;
        }
        let price = match self.round_to_nearest {
            Some(step) => round_to_step(price, step),
            None => price,
        };
        debug!(machine, price, "price evaluated");
        Ok(price)
    }
}

/// step 단위로 반올림한다(0.5는 0에서 먼 쪽).
fn round_to_step(value: f64, step: f64) -> f64 {
    (value / step).round() * step
}
