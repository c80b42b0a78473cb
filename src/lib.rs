//! 가격 계산과 이력 저장을 라이브러리로 분리하여 CLI와 GUI가 같은 로직을 쓴다.

pub mod app;
pub mod config;
pub mod form;
pub mod i18n;
pub mod ledger;
pub mod logging;
pub mod pricing;
pub mod ui_cli;
