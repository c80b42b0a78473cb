#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

//! eframe/egui 기반 데스크톱 견적 폼 진입점.

use eframe::{egui, App, Frame};
use image::GenericImageView;
use rfd::FileDialog;
use std::collections::HashMap;
use std::{env, fs, path::Path, path::PathBuf};
use workshop_price_estimator::{
    app::{self, Estimator},
    config, form,
    i18n::{self, keys},
    ledger::{EstimationEvent, DEFAULT_LEDGER_FILE, HEADER},
    logging,
};

fn main() -> Result<(), eframe::Error> {
    logging::init();
    // CLI 옵션: --lang xx / --lang=xx, --config path / --config=path
    let mut cli_lang: Option<String> = None;
    let mut config_path = app::default_config_path();
    let args: Vec<String> = env::args().collect();
    let mut i = 1;
    while i < args.len() {
        let a = &args[i];
        if let Some(val) = a.strip_prefix("--lang=") {
            cli_lang = Some(val.to_string());
        } else if let Some(val) = a.strip_prefix("--config=") {
            config_path = PathBuf::from(val);
        } else if (a == "--lang" || a == "-L") && i + 1 < args.len() {
            cli_lang = Some(args[i + 1].clone());
            i += 1;
        } else if a == "--config" && i + 1 < args.len() {
            config_path = PathBuf::from(&args[i + 1]);
            i += 1;
        }
        i += 1;
    }

    let mut viewport = egui::ViewportBuilder::default().with_inner_size(egui::vec2(760.0, 720.0));
    if let Some(icon) = load_app_icon() {
        viewport = viewport.with_icon(icon);
    }
    let options = eframe::NativeOptions {
        viewport,
        ..Default::default()
    };

    let startup = config::load_or_default(&config_path)
        .map_err(app::AppError::from)
        .and_then(Estimator::from_config);
    let tr = match &startup {
        Ok(est) => app::translator_for(&est.config, cli_lang.as_deref()),
        Err(_) => {
            let lang = i18n::resolve_language(cli_lang.as_deref().unwrap_or("auto"), None);
            i18n::Translator::new(&lang)
        }
    };
    let title = tr.t(keys::APP_TITLE).to_string();
    eframe::run_native(
        &title,
        options,
        Box::new(move |cc| {
            if let Err(e) = setup_fonts(&cc.egui_ctx) {
                tracing::warn!("font setup: {e}");
            }
            Box::new(GuiApp::new(startup, tr))
        }),
    )
}

fn load_app_icon() -> Option<egui::IconData> {
    let search = ["icon.png", "assets/icon.png", "../assets/icon.png"];
    let path = search.iter().find(|p| Path::new(*p).exists())?;
    let bytes = fs::read(path).ok()?;
    let img = image::load_from_memory(&bytes).ok()?;
    let (w, h) = img.dimensions();
    Some(egui::IconData {
        rgba: img.to_rgba8().into_raw(),
        width: w,
        height: h,
    })
}

fn apply_font_bytes(ctx: &egui::Context, bytes: Vec<u8>, name: &str) {
    let mut fonts = egui::FontDefinitions::default();
    fonts
        .font_data
        .insert(name.to_string(), egui::FontData::from_owned(bytes));
    for family in [egui::FontFamily::Proportional, egui::FontFamily::Monospace] {
        // 기본 라틴 글꼴 뒤에 붙여 한글/₦ 등 누락 글리프만 대체한다.
        fonts.families.entry(family).or_default().push(name.to_string());
    }
    ctx.set_fonts(fonts);
}

/// 한글을 표시할 수 있는 글꼴을 찾아 등록한다.
fn setup_fonts(ctx: &egui::Context) -> Result<(), String> {
    let mut candidates: Vec<PathBuf> = vec![PathBuf::from("assets/fonts/malgun.ttf")];
    if let Some(windir) = env::var_os("WINDIR") {
        let fonts = Path::new(&windir).join("Fonts");
        candidates.extend(["malgun.ttf", "gulim.ttc"].iter().map(|f| fonts.join(f)));
    }
    candidates.extend(
        [
            "/usr/share/fonts/opentype/noto/NotoSansCJK-Regular.ttc",
            "/usr/share/fonts/noto-cjk/NotoSansCJK-Regular.ttc",
            "/System/Library/Fonts/AppleSDGothicNeo.ttc",
        ]
        .iter()
        .map(PathBuf::from),
    );
    let p = candidates
        .iter()
        .find(|p| p.exists())
        .ok_or_else(|| "no Hangul-capable font found, keeping egui defaults".to_string())?;
    let bytes = fs::read(p).map_err(|e| format!("failed to read font {}: {e}", p.display()))?;
    apply_font_bytes(ctx, bytes, "fallback_font");
    Ok(())
}

enum Status {
    Saved(EstimationEvent),
    Failed(String),
}

struct GuiApp {
    estimator: Option<Estimator>,
    startup_error: Option<String>,
    tr: i18n::Translator,
    customer: String,
    machine: String,
    values: HashMap<String, f64>,
    status: Option<Status>,
    history: Vec<EstimationEvent>,
    history_error: Option<String>,
    export_status: Option<String>,
}

impl GuiApp {
    fn new(startup: Result<Estimator, app::AppError>, tr: i18n::Translator) -> Self {
        let (estimator, startup_error) = match startup {
            Ok(est) => (Some(est), None),
            Err(e) => (None, Some(e.to_string())),
        };
        let machine = estimator
            .as_ref()
            .and_then(|e| e.model.machine_types().next().map(str::to_string))
            .unwrap_or_default();
        let mut s = Self {
            estimator,
            startup_error,
            tr,
            customer: String::new(),
            machine,
            values: HashMap::new(),
            status: None,
            history: Vec::new(),
            history_error: None,
            export_status: None,
        };
        s.reset_values();
        s.reload_history();
        s
    }

    /// 선택한 기계의 입력칸을 기본값으로 채운다. 이미 입력한 값은 유지한다.
    fn reset_values(&mut self) {
        let Some(est) = &self.estimator else {
            return;
        };
        let Ok(fields) = form::fields_for(&est.config, &est.model, &self.machine) else {
            return;
        };
        for field in fields.iter().filter(|f| f.is_prompted()) {
            let initial = field.spec.default.or(field.spec.min).unwrap_or(0.0);
            self.values.entry(field.variable.clone()).or_insert(initial);
        }
    }

    fn reload_history(&mut self) {
        let Some(est) = &self.estimator else {
            return;
        };
        match est.ledger.read_all() {
            Ok(events) => {
                self.history = events;
                self.history_error = None;
            }
            Err(e) => self.history_error = Some(e.to_string()),
        }
    }

    fn ui_form(&mut self, ui: &mut egui::Ui) {
        let Some(est) = &self.estimator else {
            return;
        };
        let machines: Vec<String> = est.model.machine_types().map(str::to_string).collect();
        let fields = form::fields_for(&est.config, &est.model, &self.machine).unwrap_or_default();
        let coefficient_of = |variable: &str| est.model.coefficient(&self.machine, variable);
        let fixed: Vec<(String, Option<f64>)> = fields
            .iter()
            .filter(|f| !f.is_prompted())
            .map(|f| {
                let v = match f.spec.source {
                    config::FieldSource::Coefficient => coefficient_of(&f.variable),
                    _ => f.spec.value,
                };
                (f.label_with_unit(), v)
            })
            .collect();
        let tr = self.tr.clone();
        let before = self.machine.clone();

        egui::Frame::group(ui.style()).show(ui, |ui| {
            egui::Grid::new("estimate_form")
                .num_columns(2)
                .spacing([12.0, 8.0])
                .show(ui, |ui| {
                    ui.label(tr.t(keys::RESULT_CUSTOMER));
                    ui.add(
                        egui::TextEdit::singleline(&mut self.customer)
                            .hint_text(tr.t(keys::CUSTOMER_PLACEHOLDER)),
                    );
                    ui.end_row();

                    ui.label(tr.t(keys::PROMPT_MACHINE).trim_end_matches([':', ' ']));
                    egui::ComboBox::from_id_source("machine_type")
                        .selected_text(self.machine.as_str())
                        .show_ui(ui, |ui| {
                            for m in &machines {
                                ui.selectable_value(&mut self.machine, m.clone(), m.as_str());
                            }
                        });
                    ui.end_row();

                    for field in fields.iter().filter(|f| f.is_prompted()) {
                        ui.label(field.label_with_unit());
                        let value = self.values.entry(field.variable.clone()).or_insert(0.0);
                        let mut drag = egui::DragValue::new(value)
                            .speed(field.spec.step.unwrap_or(1.0))
                            .max_decimals(4);
                        if field.spec.min.is_some() || field.spec.max.is_some() {
                            drag = drag.clamp_range(
                                field.spec.min.unwrap_or(f64::MIN)..=field.spec.max.unwrap_or(f64::MAX),
                            );
                        }
                        ui.add(drag);
                        ui.end_row();
                    }

                    for (label, value) in &fixed {
                        ui.label(label.as_str());
                        ui.weak(value.map(|v| v.to_string()).unwrap_or_else(|| "-".into()));
                        ui.end_row();
                    }
                });
        });

        if before != self.machine {
            self.status = None;
            self.reset_values();
        }
    }

    fn estimate(&mut self) {
        let Some(est) = &self.estimator else {
            return;
        };
        let fields = form::fields_for(&est.config, &est.model, &self.machine).unwrap_or_default();
        let entries: HashMap<String, f64> = fields
            .iter()
            .filter(|f| f.is_prompted())
            .filter_map(|f| {
                self.values
                    .get(&f.variable)
                    .map(|v| (f.variable.clone(), f.clamp(*v)))
            })
            .collect();
        self.status = Some(match est.estimate(&self.customer, &self.machine, &entries) {
            Ok(event) => Status::Saved(event),
            Err(e @ app::AppError::Ledger(_)) => {
                Status::Failed(format!("{} ({e})", self.tr.t(keys::RESULT_NOT_SAVED)))
            }
            Err(e) => Status::Failed(e.to_string()),
        });
        self.reload_history();
    }

    fn ui_status(&self, ui: &mut egui::Ui) {
        let (Some(status), Some(est)) = (&self.status, &self.estimator) else {
            return;
        };
        let tr = &self.tr;
        let ok = egui::Color32::from_rgb(40, 140, 70);
        match status {
            Status::Saved(event) => {
                ui.colored_label(
                    ok,
                    format!("{}: {}", tr.t(keys::RESULT_CUSTOMER), event.customer_name),
                );
                ui.colored_label(
                    ok,
                    format!("{}: {}", tr.t(keys::RESULT_TIME), event.timestamp_string()),
                );
                ui.colored_label(
                    ok,
                    egui::RichText::new(tr.tf(
                        keys::RESULT_PRICE,
                        &[
                            ("machine", event.machine_type.clone()),
                            ("price", est.format_price(event.estimated_price)),
                        ],
                    ))
                    .strong(),
                );
            }
            Status::Failed(msg) => {
                ui.colored_label(
                    ui.visuals().error_fg_color,
                    format!("{}: {msg}", tr.t(keys::ERROR_PREFIX)),
                );
            }
        }
    }

    fn ui_history(&mut self, ui: &mut egui::Ui) {
        let Some(est) = &self.estimator else {
            return;
        };
        ui.heading(self.tr.t(keys::HISTORY_HEADING).trim().trim_matches('-').trim());
        if let Some(err) = &self.history_error {
            ui.colored_label(ui.visuals().error_fg_color, err.as_str());
        }
        // 원장 파일이 있으면 내용과 무관하게 내려받기를 제공한다.
        if est.ledger.has_file() && ui.button(self.tr.t(keys::EXPORT_BUTTON)).clicked() {
            if let Some(dest) = FileDialog::new()
                .set_file_name(DEFAULT_LEDGER_FILE)
                .add_filter("CSV", &["csv"])
                .save_file()
            {
                self.export_status = Some(match est.ledger.export_to(&dest) {
                    Ok(bytes) => self.tr.tf(
                        keys::EXPORT_DONE,
                        &[("bytes", bytes.to_string()), ("path", dest.display().to_string())],
                    ),
                    Err(e) => format!("{}: {e}", self.tr.t(keys::ERROR_PREFIX)),
                });
            }
        }
        if let Some(msg) = &self.export_status {
            ui.label(msg.as_str());
        }
        if self.history.is_empty() {
            ui.weak(self.tr.t(keys::HISTORY_EMPTY));
            return;
        }
        egui::ScrollArea::vertical()
            .max_height(260.0)
            .show(ui, |ui| {
                egui::Grid::new("history_grid")
                    .num_columns(HEADER.len())
                    .striped(true)
                    .show(ui, |ui| {
                        for h in HEADER {
                            ui.strong(h);
                        }
                        ui.end_row();
                        // 최신 견적이 위로 오게 표시한다.
                        for e in self.history.iter().rev() {
                            ui.label(e.customer_name.as_str());
                            ui.label(e.machine_type.as_str());
                            ui.label(est.format_price(e.estimated_price));
                            ui.label(e.timestamp_string());
                            ui.end_row();
                        }
                    });
            });
    }
}

impl App for GuiApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut Frame) {
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading(self.tr.t(keys::APP_TITLE));
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| {
                ui.label(self.tr.t(keys::APP_SUBTITLE));
                ui.add_space(8.0);
                if let Some(err) = &self.startup_error {
                    ui.colored_label(
                        ui.visuals().error_fg_color,
                        format!("{}: {err}", self.tr.t(keys::ERROR_PREFIX)),
                    );
                    return;
                }
                self.ui_form(ui);
                ui.add_space(8.0);
                if ui.button(self.tr.t(keys::ESTIMATE_BUTTON)).clicked() {
                    self.estimate();
                }
                self.ui_status(ui);
                ui.separator();
                self.ui_history(ui);
            });
        });
    }
}
