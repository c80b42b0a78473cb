use std::collections::HashMap;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use workshop_price_estimator::{app, config, form, i18n, logging, ui_cli};

/// 작업장 기계 사용 가격 견적기 (CLI)
#[derive(Debug, Parser)]
#[command(name = "workshop_price_estimator_cli", version, about)]
struct Cli {
    /// 설정 파일 경로
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// 표시 언어 (auto/en-us/ko-kr)
    #[arg(long, short = 'L', global = true)]
    lang: Option<String>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// 설정된 기계 종류를 나열한다
    Machines,
    /// 가격을 계산하고 이력에 기록한다
    Estimate {
        #[arg(long, short)]
        machine: String,
        #[arg(long, short, default_value = "")]
        customer: String,
        /// "변수=값" 형식, 여러 번 지정 가능
        #[arg(long = "set", short = 's', value_name = "NAME=VALUE")]
        values: Vec<String>,
    },
    /// 저장된 견적 이력을 출력한다
    History,
    /// 견적 이력 파일을 복사한다
    Export {
        #[arg(long, short)]
        out: PathBuf,
    },
}

/// 프로그램의 엔트리 포인트. 설정을 로드한 뒤 CLI 애플리케이션을 실행한다.
fn main() -> ExitCode {
    logging::init();
    let cli = Cli::parse();
    let config_path = cli.config.clone().unwrap_or_else(app::default_config_path);
    let cfg = match config::load_or_default(&config_path) {
        Ok(cfg) => cfg,
        Err(err) => {
            eprintln!("Error: {err}");
            return ExitCode::FAILURE;
        }
    };
    let mut tr = app::translator_for(&cfg, cli.lang.as_deref());
    match try_run(cli, cfg, &config_path, &mut tr) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}: {err}", tr.t(i18n::keys::ERROR_PREFIX));
            ExitCode::FAILURE
        }
    }
}

fn try_run(
    cli: Cli,
    cfg: config::Config,
    config_path: &std::path::Path,
    tr: &mut i18n::Translator,
) -> Result<(), app::AppError> {
    let mut estimator = app::Estimator::from_config(cfg)?;
    match cli.command {
        None => app::run(&mut estimator, config_path, tr)?,
        Some(Command::Machines) => ui_cli::print_machines(&estimator),
        Some(Command::Estimate {
            machine,
            customer,
            values,
        }) => {
            let mut entries = HashMap::new();
            for raw in &values {
                let (name, value) = form::parse_assignment(raw)?;
                entries.insert(name, value);
            }
            let event = estimator.estimate(&customer, &machine, &entries)?;
            ui_cli::print_event(tr, &estimator, &event);
        }
        Some(Command::History) => {
            let events = estimator.ledger.read_all()?;
            ui_cli::print_history(tr, &estimator, &events);
        }
        Some(Command::Export { out }) => {
            let bytes = estimator.ledger.export_to(&out)?;
            println!(
                "{}",
                tr.tf(
                    i18n::keys::EXPORT_DONE,
                    &[("bytes", bytes.to_string()), ("path", out.display().to_string())]
                )
            );
        }
    }
    Ok(())
}
