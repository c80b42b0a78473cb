use std::collections::HashMap;
use std::io::{self, Write};

use crate::app::{AppError, Estimator};
use crate::config::Config;
use crate::form::{self, FormField};
use crate::i18n::{keys, Translator};
use crate::ledger::{EstimationEvent, HEADER};

/// 메인 메뉴 선택지를 표현한다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    Estimate,
    History,
    Export,
    Machines,
    Settings,
    Exit,
}

/// 메인 메뉴를 표시하고 선택값을 반환한다.
pub fn main_menu(tr: &Translator) -> Result<MenuChoice, AppError> {
    println!("{}", tr.t(keys::MAIN_MENU_TITLE));
    for key in [
        keys::MAIN_MENU_ESTIMATE,
        keys::MAIN_MENU_HISTORY,
        keys::MAIN_MENU_EXPORT,
        keys::MAIN_MENU_MACHINES,
        keys::MAIN_MENU_SETTINGS,
        keys::MAIN_MENU_EXIT,
    ] {
        println!("{}", tr.t(key));
    }
    loop {
        let sel = read_line(tr.t(keys::PROMPT_MENU_SELECT))?;
        match sel.trim() {
            "1" => return Ok(MenuChoice::Estimate),
            "2" => return Ok(MenuChoice::History),
            "3" => return Ok(MenuChoice::Export),
            "4" => return Ok(MenuChoice::Machines),
            "5" => return Ok(MenuChoice::Settings),
            "0" => return Ok(MenuChoice::Exit),
            _ => println!("{}", tr.t(keys::INVALID_SELECTION_RETRY)),
        }
    }
}

/// 견적 메뉴: 고객, 기계, 입력값을 받아 가격을 계산하고 기록한다.
pub fn handle_estimate(tr: &Translator, est: &Estimator) -> Result<(), AppError> {
    println!("{}", tr.t(keys::ESTIMATE_HEADING));
    let customer = read_line(tr.t(keys::PROMPT_CUSTOMER_NAME))?;
    let machine = select_machine(tr, est)?;

    let mut entries = HashMap::new();
    for field in form::fields_for(&est.config, &est.model, &machine)?
        .iter()
        .filter(|f| f.is_prompted())
    {
        let value = read_field(tr, field)?;
        entries.insert(field.variable.clone(), value);
    }

    match est.estimate(&customer, &machine, &entries) {
        Ok(event) => print_event(tr, est, &event),
        Err(AppError::Ledger(e)) => println!("{}: {} ({e})", tr.t(keys::ERROR_PREFIX), tr.t(keys::RESULT_NOT_SAVED)),
        Err(e) => return Err(e),
    }
    Ok(())
}

/// 이력 메뉴: 저장된 견적을 표로 출력한다.
pub fn handle_history(tr: &Translator, est: &Estimator) -> Result<(), AppError> {
    println!("{}", tr.t(keys::HISTORY_HEADING));
    let events = est.ledger.read_all()?;
    print_history(tr, est, &events);
    Ok(())
}

/// 내보내기 메뉴: 저장 파일을 원하는 경로로 복사한다.
pub fn handle_export(tr: &Translator, est: &Estimator) -> Result<(), AppError> {
    println!("{}", tr.t(keys::EXPORT_HEADING));
    let default = crate::ledger::DEFAULT_LEDGER_FILE;
    let raw = read_line(&tr.tf(keys::PROMPT_EXPORT_PATH, &[("default", default.to_string())]))?;
    let dest = if raw.trim().is_empty() {
        default.to_string()
    } else {
        raw.trim().to_string()
    };
    let bytes = est.ledger.export_to(&dest)?;
    println!(
        "{}",
        tr.tf(
            keys::EXPORT_DONE,
            &[("bytes", bytes.to_string()), ("path", dest)]
        )
    );
    Ok(())
}

/// 기계 종류와 각 계수를 나열한다.
pub fn handle_machines(tr: &Translator, est: &Estimator) {
    println!("{}", tr.t(keys::MACHINES_HEADING));
    print_machines(est);
}

/// 설정 메뉴를 처리한다. 변경되면 true.
pub fn handle_settings(tr: &Translator, cfg: &mut Config) -> Result<bool, AppError> {
    println!("{}", tr.t(keys::SETTINGS_HEADING));
    println!(
        "{}",
        tr.tf(
            keys::SETTINGS_CURRENT_LANGUAGE,
            &[("lang", cfg.language.clone())]
        )
    );
    println!("{}", tr.t(keys::SETTINGS_OPTIONS));
    let sel = read_line(tr.t(keys::SETTINGS_PROMPT_CHANGE))?;
    if sel.trim().is_empty() {
        return Ok(false);
    }
    let lang = match sel.trim() {
        "1" => "auto",
        "2" => "en-us",
        "3" => "ko-kr",
        _ => {
            println!("{}", tr.t(keys::SETTINGS_INVALID));
            return Ok(false);
        }
    };
    cfg.language = lang.to_string();
    Ok(true)
}

pub fn print_machines(est: &Estimator) {
    for (i, machine) in est.model.machine_types().enumerate() {
        println!("{}) {machine}", i + 1);
    }
}

pub fn print_event(tr: &Translator, est: &Estimator, event: &EstimationEvent) {
    println!("{}: {}", tr.t(keys::RESULT_CUSTOMER), event.customer_name);
    println!("{}: {}", tr.t(keys::RESULT_TIME), event.timestamp_string());
    println!(
        "{}",
        tr.tf(
            keys::RESULT_PRICE,
            &[
                ("machine", event.machine_type.clone()),
                ("price", est.format_price(event.estimated_price)),
            ]
        )
    );
}

pub fn print_history(tr: &Translator, est: &Estimator, events: &[EstimationEvent]) {
    if events.is_empty() {
        println!("{}", tr.t(keys::HISTORY_EMPTY));
        return;
    }
    let name_w = events
        .iter()
        .map(|e| e.customer_name.chars().count())
        .chain([HEADER[0].len()])
        .max()
        .unwrap_or(0);
    let machine_w = events
        .iter()
        .map(|e| e.machine_type.chars().count())
        .chain([HEADER[1].len()])
        .max()
        .unwrap_or(0);
    println!(
        "{:<name_w$}  {:<machine_w$}  {:>18}  {}",
        HEADER[0], HEADER[1], HEADER[2], HEADER[3]
    );
    for e in events {
        println!(
            "{:<name_w$}  {:<machine_w$}  {:>18}  {}",
            e.customer_name,
            e.machine_type,
            est.format_price(e.estimated_price),
            e.timestamp_string()
        );
    }
}

fn select_machine(tr: &Translator, est: &Estimator) -> Result<String, AppError> {
    let machines: Vec<&str> = est.model.machine_types().collect();
    print_machines(est);
    loop {
        let sel = read_line(tr.t(keys::PROMPT_MACHINE))?;
        let picked = sel
            .trim()
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|i| machines.get(i))
            .or_else(|| machines.iter().find(|m| m.eq_ignore_ascii_case(sel.trim())));
        match picked {
            Some(m) => return Ok(m.to_string()),
            None => println!("{}", tr.t(keys::INVALID_SELECTION_RETRY)),
        }
    }
}

fn read_field(tr: &Translator, field: &FormField) -> Result<f64, AppError> {
    let mut prompt = field.label_with_unit();
    if field.spec.min.is_some() || field.spec.max.is_some() {
        let show = |v: Option<f64>| v.map(|v| v.to_string()).unwrap_or_else(|| "∞".into());
        prompt.push(' ');
        prompt.push_str(&tr.tf(
            keys::PROMPT_RANGE_HINT,
            &[("min", show(field.spec.min)), ("max", show(field.spec.max))],
        ));
    }
    if let Some(default) = field.spec.default {
        prompt.push(' ');
        prompt.push_str(&tr.tf(keys::PROMPT_DEFAULT_HINT, &[("default", default.to_string())]));
    }
    prompt.push_str(": ");

    loop {
        let s = read_line(&prompt)?;
        let s = s.trim();
        let value = match (s.is_empty(), field.spec.default) {
            (true, Some(default)) => default,
            _ => match s.replace(',', "").parse::<f64>() {
                Ok(v) if v.is_finite() => v,
                _ => {
                    println!("{}", tr.t(keys::ERROR_INVALID_NUMBER));
                    continue;
                }
            },
        };
        match field.validate(value) {
            Ok(v) => return Ok(v),
            Err(e) => println!("{}: {e}", tr.t(keys::ERROR_PREFIX)),
        }
    }
}

fn read_line(prompt: &str) -> Result<String, AppError> {
    print!("{prompt}");
    io::stdout().flush()?;
    let mut buf = String::new();
    if io::stdin().read_line(&mut buf)? == 0 {
        return Err(AppError::Io(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "standard input closed",
        )));
    }
    Ok(buf)
}
