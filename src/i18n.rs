use std::collections::HashMap;
use std::fs;
use std::path::Path;
use sys_locale::get_locale;

/// 문자열 키를 모아두는 네임스페이스.
pub mod keys {
    pub const ERROR_PREFIX: &str = "general.error_prefix";
    pub const APP_EXIT: &str = "general.app_exit";
    pub const APP_TITLE: &str = "general.app_title";
    pub const APP_SUBTITLE: &str = "general.app_subtitle";

    pub const MAIN_MENU_TITLE: &str = "main_menu.title";
    pub const MAIN_MENU_ESTIMATE: &str = "main_menu.estimate";
    pub const MAIN_MENU_HISTORY: &str = "main_menu.history";
    pub const MAIN_MENU_EXPORT: &str = "main_menu.export";
    pub const MAIN_MENU_MACHINES: &str = "main_menu.machines";
    pub const MAIN_MENU_SETTINGS: &str = "main_menu.settings";
    pub const MAIN_MENU_EXIT: &str = "main_menu.exit";
    pub const PROMPT_MENU_SELECT: &str = "prompt.menu_select";
    pub const INVALID_SELECTION_RETRY: &str = "error.invalid_selection_retry";

    pub const ESTIMATE_HEADING: &str = "estimate.heading";
    pub const ESTIMATE_BUTTON: &str = "estimate.button";
    pub const PROMPT_CUSTOMER_NAME: &str = "prompt.customer_name";
    pub const CUSTOMER_PLACEHOLDER: &str = "prompt.customer_placeholder";
    pub const PROMPT_MACHINE: &str = "prompt.machine";
    pub const PROMPT_DEFAULT_HINT: &str = "prompt.default_hint";
    pub const PROMPT_RANGE_HINT: &str = "prompt.range_hint";
    pub const RESULT_CUSTOMER: &str = "result.customer";
    pub const RESULT_TIME: &str = "result.time_logged_in";
    pub const RESULT_PRICE: &str = "result.price";
    pub const RESULT_NOT_SAVED: &str = "result.not_saved";

    pub const HISTORY_HEADING: &str = "history.heading";
    pub const HISTORY_EMPTY: &str = "history.empty";

    pub const EXPORT_HEADING: &str = "export.heading";
    pub const EXPORT_BUTTON: &str = "export.button";
    pub const PROMPT_EXPORT_PATH: &str = "prompt.export_path";
    pub const EXPORT_DONE: &str = "export.done";

    pub const MACHINES_HEADING: &str = "machines.heading";

    pub const SETTINGS_HEADING: &str = "settings.heading";
    pub const SETTINGS_CURRENT_LANGUAGE: &str = "settings.current_language";
    pub const SETTINGS_OPTIONS: &str = "settings.options";
    pub const SETTINGS_PROMPT_CHANGE: &str = "settings.prompt_change";
    pub const SETTINGS_INVALID: &str = "settings.invalid";
    pub const SETTINGS_SAVED: &str = "settings.saved";

    pub const ERROR_INVALID_NUMBER: &str = "error.invalid_number";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Ko,
    En,
}

impl Language {
    fn from_code(code: &str) -> Self {
        let c = code.to_lowercase();
        if c.starts_with("ko") {
            Language::Ko
        } else {
            Language::En
        }
    }
}

/// 런타임 언어 번들을 제공한다.
#[derive(Debug, Clone)]
pub struct Translator {
    lang: Language,
    overrides: Option<HashMap<String, String>>,
}

impl Translator {
    /// 언어 코드(ko/en)에 따라 번역기를 생성한다. 알 수 없는 코드는 en으로 폴백한다.
    pub fn new(lang_code: &str) -> Self {
        Self {
            lang: Language::from_code(lang_code),
            overrides: None,
        }
    }

    /// 언어 코드 + 언어팩 디렉터리를 받아서 번역기를 생성한다.
    /// 디렉터리가 없거나 파일이 없으면 내장 문자열만 사용한다.
    pub fn new_with_pack(lang_code: &str, pack_dir: Option<&str>) -> Self {
        let overrides = pack_dir.and_then(|dir| load_overrides(dir, lang_code));
        Self {
            lang: Language::from_code(lang_code),
            overrides,
        }
    }

    pub fn language(&self) -> Language {
        self.lang
    }

    /// 번역을 가져온다. 언어팩 > 내장 문자열 순. 한국어에 없는 키는 영어로 폴백한다.
    pub fn t<'a>(&'a self, key: &str) -> &'a str {
        if let Some(v) = self.overrides.as_ref().and_then(|m| m.get(key)) {
            return v;
        }
        match self.lang {
            Language::Ko => ko(key).unwrap_or_else(|| en(key)),
            Language::En => en(key),
        }
    }

    /// `{name}` 자리표시자를 채운 번역.
    pub fn tf(&self, key: &str, vars: &[(&str, String)]) -> String {
        fill_template(self.t(key), vars)
    }
}

pub fn fill_template(template: &str, vars: &[(&str, String)]) -> String {
    let mut out = template.to_string();
    for (k, v) in vars {
        out = out.replace(&format!("{{{k}}}"), v);
    }
    out
}

/// CLI 플래그/설정/시스템 순으로 언어 코드를 결정한다.
pub fn resolve_language(cli_arg: &str, config_lang: Option<&str>) -> String {
    normalize_lang(cli_arg)
        .or_else(|| config_lang.and_then(normalize_lang))
        .or_else(detect_system_language)
        .unwrap_or_else(|| "en-us".to_string())
}

fn normalize_lang(code: &str) -> Option<String> {
    let c = code.trim().to_lowercase();
    match c.as_str() {
        "auto" | "" => None,
        "ko" | "ko-kr" => Some("ko-kr".into()),
        "en" | "en-us" | "en-uk" | "en-gb" | "en-ng" => Some("en-us".into()),
        other if other.starts_with("ko") => Some("ko-kr".into()),
        other if other.starts_with("en") => Some("en-us".into()),
        _ => None,
    }
}

fn normalize_locale_string(loc: &str) -> Option<String> {
    let lang = loc
        .split(['.', '_', '-'])
        .next()
        .unwrap_or_default()
        .to_lowercase();
    match lang.as_str() {
        "ko" => Some("ko-kr".into()),
        "en" => Some("en-us".into()),
        _ => None,
    }
}

/// 시스템 로케일에서 언어를 추정한다.
pub fn detect_system_language() -> Option<String> {
    if let Some(code) = get_locale().as_deref().and_then(normalize_locale_string) {
        return Some(code);
    }
    ["LC_ALL", "LANG"]
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find_map(|v| normalize_locale_string(&v))
}

/// TOML 기반 언어팩을 로드한다. 형식: key = "value" 로 구성된 플랫 맵(테이블은 점 경로로 펼친다).
fn load_overrides(dir: &str, lang: &str) -> Option<HashMap<String, String>> {
    let try_load = |code: &str| -> Option<HashMap<String, String>> {
        let path = Path::new(dir).join(format!("{code}.toml"));
        let content = fs::read_to_string(path).ok()?;
        parse_toml_to_map(&content)
    };

    try_load(lang).or_else(|| {
        let (base, _) = lang.split_once(['-', '_'])?;
        try_load(base)
    })
}

fn parse_toml_to_map(src: &str) -> Option<HashMap<String, String>> {
    let table: toml::Table = toml::from_str(src).ok()?;
    let mut map = HashMap::new();

    fn walk(prefix: &str, val: &toml::Value, out: &mut HashMap<String, String>) {
        match val {
            toml::Value::String(s) => {
                out.insert(prefix.to_string(), s.to_string());
            }
            toml::Value::Table(t) => {
                for (k, v) in t {
                    walk(&format!("{prefix}.{k}"), v, out);
                }
            }
            _ => {}
        }
    }

    for (k, v) in &table {
        walk(k, v, &mut map);
    }

    if map.is_empty() {
        None
    } else {
        Some(map)
    }
}

fn ko(key: &str) -> Option<&'static str> {
    use keys::*;
    let s = match key {
        ERROR_PREFIX => "오류",
        APP_EXIT => "프로그램을 종료합니다.",
        APP_TITLE => "작업장 기계 가격 견적기",
        APP_SUBTITLE => "다중 선형 회귀 계수로 기계 사용 가격을 추정합니다.",
        MAIN_MENU_TITLE => "\n=== 작업장 기계 가격 견적기 ===",
        MAIN_MENU_ESTIMATE => "1) 가격 견적",
        MAIN_MENU_HISTORY => "2) 견적 이력 보기",
        MAIN_MENU_EXPORT => "3) 견적 이력 내보내기",
        MAIN_MENU_MACHINES => "4) 기계 종류 목록",
        MAIN_MENU_SETTINGS => "5) 설정",
        MAIN_MENU_EXIT => "0) 종료",
        PROMPT_MENU_SELECT => "메뉴 선택: ",
        INVALID_SELECTION_RETRY => "잘못된 입력입니다. 다시 선택하세요.",
        ESTIMATE_HEADING => "\n-- 가격 견적 --",
        ESTIMATE_BUTTON => "가격 견적",
        PROMPT_CUSTOMER_NAME => "고객 이름: ",
        CUSTOMER_PLACEHOLDER => "홍길동",
        PROMPT_MACHINE => "기계 번호 선택: ",
        PROMPT_DEFAULT_HINT => "(엔터 = {default})",
        PROMPT_RANGE_HINT => "[{min} ~ {max}]",
        RESULT_CUSTOMER => "고객 이름",
        RESULT_TIME => "기록 시각",
        RESULT_PRICE => "{machine} 사용 예상 가격: {price}",
        RESULT_NOT_SAVED => "견적을 이력에 저장하지 못해 폐기했습니다",
        HISTORY_HEADING => "\n-- 견적 이력 --",
        HISTORY_EMPTY => "아직 기록된 견적이 없습니다.",
        EXPORT_HEADING => "\n-- 견적 이력 내보내기 --",
        EXPORT_BUTTON => "견적 이력 내려받기",
        PROMPT_EXPORT_PATH => "저장할 경로 (엔터 = {default}): ",
        EXPORT_DONE => "{bytes} 바이트를 {path} 에 저장했습니다.",
        MACHINES_HEADING => "\n-- 기계 종류 --",
        SETTINGS_HEADING => "\n-- 설정 --",
        SETTINGS_CURRENT_LANGUAGE => "현재 언어: {lang}",
        SETTINGS_OPTIONS => "1) 자동  2) English  3) 한국어",
        SETTINGS_PROMPT_CHANGE => "변경할 번호(취소하려면 엔터): ",
        SETTINGS_INVALID => "잘못된 입력이므로 변경하지 않습니다.",
        SETTINGS_SAVED => "설정을 저장했습니다.",
        ERROR_INVALID_NUMBER => "숫자를 입력하세요.",
        _ => return None,
    };
    Some(s)
}

fn en(key: &str) -> &'static str {
    use keys::*;
    match key {
        ERROR_PREFIX => "Error",
        APP_EXIT => "Exiting.",
        APP_TITLE => "Workshop Machine Price Estimator",
        APP_SUBTITLE => {
            "A simple estimator to determine the price based on machine usage using Multiple Linear Regression."
        }
        MAIN_MENU_TITLE => "\n=== Workshop Machine Price Estimator ===",
        MAIN_MENU_ESTIMATE => "1) Estimate price",
        MAIN_MENU_HISTORY => "2) Show pricing history",
        MAIN_MENU_EXPORT => "3) Export pricing history",
        MAIN_MENU_MACHINES => "4) List machine types",
        MAIN_MENU_SETTINGS => "5) Settings",
        MAIN_MENU_EXIT => "0) Exit",
        PROMPT_MENU_SELECT => "Select menu: ",
        INVALID_SELECTION_RETRY => "Invalid selection. Try again.",
        ESTIMATE_HEADING => "\n-- Estimate Price --",
        ESTIMATE_BUTTON => "Estimate Price",
        PROMPT_CUSTOMER_NAME => "Enter Customer Name: ",
        CUSTOMER_PLACEHOLDER => "John Doe",
        PROMPT_MACHINE => "Select Machine Type: ",
        PROMPT_DEFAULT_HINT => "(Enter = {default})",
        PROMPT_RANGE_HINT => "[{min} - {max}]",
        RESULT_CUSTOMER => "Customer Name",
        RESULT_TIME => "Time Logged In",
        RESULT_PRICE => "The estimated price for {machine} usage is: {price}",
        RESULT_NOT_SAVED => "the estimate could not be saved and was discarded",
        HISTORY_HEADING => "\n-- Pricing History --",
        HISTORY_EMPTY => "No estimates logged yet.",
        EXPORT_HEADING => "\n-- Export Pricing History --",
        EXPORT_BUTTON => "Download Pricing History",
        PROMPT_EXPORT_PATH => "Destination path (Enter = {default}): ",
        EXPORT_DONE => "Wrote {bytes} bytes to {path}.",
        MACHINES_HEADING => "\n-- Machine Types --",
        SETTINGS_HEADING => "\n-- Settings --",
        SETTINGS_CURRENT_LANGUAGE => "Current language: {lang}",
        SETTINGS_OPTIONS => "1) Auto  2) English  3) 한국어",
        SETTINGS_PROMPT_CHANGE => "Number to change (Enter to cancel): ",
        SETTINGS_INVALID => "Invalid input, nothing changed.",
        SETTINGS_SAVED => "Settings saved.",
        ERROR_INVALID_NUMBER => "Please enter a number.",
        _ => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn built_in_strings_per_language() {
        let tr = Translator::new("ko-kr");
        assert_eq!(tr.language(), Language::Ko);
        assert_eq!(tr.t(keys::ERROR_PREFIX), "오류");
        assert_eq!(Translator::new("en-us").t(keys::ERROR_PREFIX), "Error");
    }

    #[test]
    fn explicit_language_wins_over_config() {
        assert_eq!(resolve_language("ko", Some("en-us")), "ko-kr");
        assert_eq!(resolve_language("auto", Some("en")), "en-us");
    }

    #[test]
    fn pack_tables_flatten_to_dotted_keys() {
        let map = parse_toml_to_map("[result]\nprice = \"Quote: {price}\"\n").unwrap();
        assert_eq!(map.get("result.price").map(String::as_str), Some("Quote: {price}"));
    }

    #[test]
    fn template_fills_named_slots() {
        let tr = Translator::new("en");
        let line = tr.tf(
            keys::RESULT_PRICE,
            &[("machine", "Milling Machine".into()), ("price", "₦1.00".into())],
        );
        assert_eq!(line, "The estimated price for Milling Machine usage is: ₦1.00");
    }
}
