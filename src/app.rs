use std::collections::HashMap;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::warn;

use crate::config::{Config, ConfigError};
use crate::form::{self, FormError};
use crate::i18n::{self, Translator};
use crate::ledger::{EstimationEvent, HistoryLedger, LedgerError};
use crate::pricing::{PricingError, PricingModel};
use crate::ui_cli::{self, MenuChoice};

/// 애플리케이션 실행 중 발생 가능한 오류를 표현한다.
#[derive(Debug, Error)]
pub enum AppError {
    /// 파일 입출력 오류
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// 설정 저장/로드 오류
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    /// 가격 계산 오류
    #[error(transparent)]
    Pricing(#[from] PricingError),
    /// 폼 입력 오류
    #[error(transparent)]
    Form(#[from] FormError),
    /// 견적 이력 저장 오류
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// 설정, 가격 모델, 이력 원장을 한데 묶은 견적기.
#[derive(Debug, Clone)]
pub struct Estimator {
    pub config: Config,
    pub model: PricingModel,
    pub ledger: HistoryLedger,
}

impl Estimator {
    pub fn from_config(config: Config) -> Result<Self, AppError> {
        let model = config.pricing_model()?;
        let ledger = HistoryLedger::open(&config.ledger_path);
        Ok(Self {
            config,
            model,
            ledger,
        })
    }

    /// 입력을 모아 가격을 계산하고 이력에 기록한다.
    ///
    /// 기록에 실패하면 견적은 폐기되고 오류가 그대로 반환된다.
    pub fn estimate(
        &self,
        customer_name: &str,
        machine: &str,
        entries: &HashMap<String, f64>,
    ) -> Result<EstimationEvent, AppError> {
        let inputs = form::build_inputs(&self.config, &self.model, machine, entries)?;
        let price = self.model.evaluate(machine, &inputs)?;
        let event = EstimationEvent::now(customer_name.trim(), machine, price);
        if let Err(e) = self.ledger.append(&event) {
            warn!(machine, price, "estimate discarded: {e}");
            return Err(e.into());
        }
        Ok(event)
    }

    pub fn format_price(&self, price: f64) -> String {
        form::format_price(price, &self.config.currency)
    }
}

/// 설정에서 번역기를 만든다. cli_lang이 있으면 우선한다.
pub fn translator_for(config: &Config, cli_lang: Option<&str>) -> Translator {
    let resolved = i18n::resolve_language(cli_lang.unwrap_or("auto"), Some(&config.language));
    Translator::new_with_pack(&resolved, config.language_pack_dir.as_deref())
}

/// CLI 애플리케이션의 메인 루프를 실행한다.
pub fn run(estimator: &mut Estimator, config_path: &Path, tr: &mut Translator) -> Result<(), AppError> {
    loop {
        match ui_cli::main_menu(tr)? {
            MenuChoice::Estimate => report(tr, ui_cli::handle_estimate(tr, estimator)),
            MenuChoice::History => report(tr, ui_cli::handle_history(tr, estimator)),
            MenuChoice::Export => report(tr, ui_cli::handle_export(tr, estimator)),
            MenuChoice::Machines => ui_cli::handle_machines(tr, estimator),
            MenuChoice::Settings => {
                if ui_cli::handle_settings(tr, &mut estimator.config)? {
                    estimator.config.save_to(config_path)?;
                    *tr = translator_for(&estimator.config, None);
                    println!("{}", tr.t(i18n::keys::SETTINGS_SAVED));
                }
            }
            MenuChoice::Exit => {
                println!("{}", tr.t(i18n::keys::APP_EXIT));
                break;
            }
        }
    }
    Ok(())
}

/// 메뉴 하나의 실패는 출력만 하고 루프를 계속한다.
fn report(tr: &Translator, result: Result<(), AppError>) {
    if let Err(err) = result {
        println!("{}: {err}", tr.t(i18n::keys::ERROR_PREFIX));
    }
}

/// 기본 설정 파일 경로.
pub fn default_config_path() -> PathBuf {
    PathBuf::from(crate::config::DEFAULT_CONFIG_FILE)
}
