use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Duration;

use eframe::egui;

use crate::backend::directory::{self, Selection};
use crate::backend::loader::{self, Source};
use crate::backend::merge::MergeResult;
use crate::backend::parser::{Record, Table};
use crate::backend::settings::{Settings, Theme};
use crate::gui::windows::data::DataWindow;
use crate::gui::windows::settings::SettingsWindow;

const COMBO_WIDTH: f32 = 320.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TableKind {
    Contacts,
    Templates,
}

impl TableKind {
    pub fn label(self) -> &'static str {
        match self {
            TableKind::Contacts => "contacts",
            TableKind::Templates => "templates",
        }
    }
}

pub enum TableState {
    Unconfigured,
    Loading(String),
    Ready(Table),
    Error(String),
}

impl TableState {
    pub fn table(&self) -> Option<&Table> {
        match self {
            TableState::Ready(table) => Some(table),
            _ => None,
        }
    }
}

struct TableSlot {
    state: TableState,
    /// Bumped on every load so late results from a superseded load are ignored.
    generation: u64,
}

impl TableSlot {
    fn new() -> Self {
        Self {
            state: TableState::Unconfigured,
            generation: 0,
        }
    }
}

struct LoadResult {
    kind: TableKind,
    generation: u64,
    result: Result<Table, String>,
}

#[derive(Clone, Copy, PartialEq)]
enum CopyTarget {
    Subject,
    Body,
}

pub struct GuiApp {
    settings: Settings,
    contacts: TableSlot,
    templates: TableSlot,
    selection: Selection,
    draft: MergeResult,
    /// Which copy button shows "Copied!" and until what time.
    copied: Option<(CopyTarget, f64)>,
    load_tx: Sender<LoadResult>,
    load_rx: Receiver<LoadResult>,
    settings_window: SettingsWindow,
    show_settings: bool,
    data_window: DataWindow,
    show_data: bool,
}

impl GuiApp {
    pub fn new(cc: &eframe::CreationContext<'_>, settings: Settings) -> Self {
        let (load_tx, load_rx) = mpsc::channel();
        let mut app = Self {
            settings,
            contacts: TableSlot::new(),
            templates: TableSlot::new(),
            selection: Selection::default(),
            draft: MergeResult::default(),
            copied: None,
            load_tx,
            load_rx,
            settings_window: SettingsWindow::new(),
            show_settings: false,
            data_window: DataWindow::new(),
            show_data: false,
        };
        app.reload_all(&cc.egui_ctx);
        app
    }

    fn slot_mut(&mut self, kind: TableKind) -> &mut TableSlot {
        match kind {
            TableKind::Contacts => &mut self.contacts,
            TableKind::Templates => &mut self.templates,
        }
    }

    fn source_for(&self, kind: TableKind) -> &str {
        match kind {
            TableKind::Contacts => &self.settings.contacts_source,
            TableKind::Templates => &self.settings.templates_source,
        }
    }

    fn reload_all(&mut self, ctx: &egui::Context) {
        self.start_load(TableKind::Contacts, ctx);
        self.start_load(TableKind::Templates, ctx);
    }

    /// Loads on a worker thread; the result arrives through `poll_loads`.
    fn start_load(&mut self, kind: TableKind, ctx: &egui::Context) {
        let source = Source::parse(self.source_for(kind));
        let timeout = self.settings.fetch_timeout();
        let tx = self.load_tx.clone();
        let ctx = ctx.clone();

        let slot = self.slot_mut(kind);
        slot.generation += 1;
        let generation = slot.generation;

        let Some(source) = source else {
            slot.state = TableState::Unconfigured;
            self.table_replaced(kind);
            return;
        };

        slot.state = TableState::Loading(source.to_string());
        tracing::info!("Loading {} from {}", kind.label(), source);

        std::thread::spawn(move || {
            let result = loader::load_table(&source, timeout).map_err(|e| format!("{:#}", e));
            let _ = tx.send(LoadResult {
                kind,
                generation,
                result,
            });
            ctx.request_repaint();
        });
    }

    fn poll_loads(&mut self) {
        while let Ok(loaded) = self.load_rx.try_recv() {
            let slot = self.slot_mut(loaded.kind);
            if loaded.generation != slot.generation {
                continue;
            }
            slot.state = match loaded.result {
                Ok(table) => TableState::Ready(table),
                Err(e) => {
                    tracing::error!("Error loading {}: {}", loaded.kind.label(), e);
                    TableState::Error(e)
                }
            };
            self.table_replaced(loaded.kind);
        }
    }

    fn table_replaced(&mut self, kind: TableKind) {
        match kind {
            TableKind::Contacts => self.selection.set_company(None),
            TableKind::Templates => self.selection.set_template(None),
        }
        self.refresh_draft();
    }

    fn refresh_draft(&mut self) {
        self.draft = match (self.contacts.state.table(), self.templates.state.table()) {
            (Some(contacts), Some(templates)) => {
                self.selection.draft(contacts, templates).unwrap_or_default()
            }
            _ => MergeResult::default(),
        };
    }

    fn open_source_dialog(&mut self, kind: TableKind, ctx: &egui::Context) {
        if let Some(path) = rfd::FileDialog::new().add_filter("CSV", &["csv"]).pick_file() {
            let path_str = path.to_string_lossy().to_string();
            match kind {
                TableKind::Contacts => self.settings.contacts_source = path_str,
                TableKind::Templates => self.settings.templates_source = path_str,
            }
            self.start_load(kind, ctx);
        }
    }

    fn render_selectors(&mut self, ui: &mut egui::Ui) {
        let columns = &self.settings.columns;
        let mut changed = false;

        egui::Grid::new("selectors")
            .num_columns(2)
            .spacing([12.0, 8.0])
            .show(ui, |ui| {
                ui.label("Company");
                match &self.contacts.state {
                    TableState::Ready(table) => {
                        let missing = directory::missing_columns(
                            table,
                            &[columns.company.as_str(), columns.contact.as_str()],
                        );
                        if !missing.is_empty() || table.is_empty() {
                            placeholder_combo(ui, "company_select", &check_headers_text(&missing));
                        } else {
                            let companies = directory::companies(table, &columns.company);
                            let mut picked = None;
                            egui::ComboBox::from_id_salt("company_select")
                                .width(COMBO_WIDTH)
                                .selected_text(self.selection.company().unwrap_or("Select a company..."))
                                .show_ui(ui, |ui| {
                                    if ui
                                        .selectable_label(self.selection.company().is_none(), "Select a company...")
                                        .clicked()
                                    {
                                        picked = Some(None);
                                    }
                                    for company in &companies {
                                        let selected = self.selection.company() == Some(company.as_str());
                                        if ui.selectable_label(selected, company.as_str()).clicked() {
                                            picked = Some(Some(company.clone()));
                                        }
                                    }
                                });
                            if let Some(company) = picked {
                                self.selection.set_company(company);
                                changed = true;
                            }
                        }
                    }
                    state => placeholder_combo(ui, "company_select", &status_text(state, TableKind::Contacts)),
                }
                ui.end_row();

                ui.label("Contact");
                let ready = self.contacts.state.table().zip(self.selection.company());
                match ready {
                    Some((table, company)) => {
                        let candidates = directory::contacts_for(table, &columns.company, company);
                        let current = self
                            .selection
                            .contact()
                            .and_then(|id| table.get(id))
                            .and_then(|record| record.get(&columns.contact))
                            .unwrap_or("Select a contact...");
                        let mut picked = None;
                        egui::ComboBox::from_id_salt("contact_select")
                            .width(COMBO_WIDTH)
                            .selected_text(current)
                            .show_ui(ui, |ui| {
                                if ui
                                    .selectable_label(self.selection.contact().is_none(), "Select a contact...")
                                    .clicked()
                                {
                                    picked = Some(None);
                                }
                                for record in candidates {
                                    let selected = self.selection.contact() == Some(record.id());
                                    let name = record.get(&columns.contact).unwrap_or_default();
                                    if ui.selectable_label(selected, name).clicked() {
                                        picked = Some(Some(record.id()));
                                    }
                                }
                            });
                        if let Some(contact) = picked {
                            self.selection.set_contact(contact);
                            changed = true;
                        }
                    }
                    None => placeholder_combo(ui, "contact_select", "Select a contact..."),
                }
                ui.end_row();

                ui.label("Template");
                match &self.templates.state {
                    TableState::Ready(table) => {
                        let missing = directory::missing_columns(table, &["Subject", "Body"]);
                        if !missing.is_empty() || table.is_empty() {
                            placeholder_combo(ui, "template_select", &check_headers_text(&missing));
                        } else {
                            let label_of = |record: &Record| {
                                record
                                    .get(&columns.template_name)
                                    .filter(|name| !name.is_empty())
                                    .map(str::to_string)
                                    .unwrap_or_else(|| format!("Template {}", record.id().index() + 1))
                            };
                            let current = self
                                .selection
                                .template()
                                .and_then(|id| table.get(id))
                                .map(label_of)
                                .unwrap_or_else(|| "Select a template...".to_string());
                            let mut picked = None;
                            egui::ComboBox::from_id_salt("template_select")
                                .width(COMBO_WIDTH)
                                .selected_text(current)
                                .show_ui(ui, |ui| {
                                    if ui
                                        .selectable_label(self.selection.template().is_none(), "Select a template...")
                                        .clicked()
                                    {
                                        picked = Some(None);
                                    }
                                    for record in table.records() {
                                        let selected = self.selection.template() == Some(record.id());
                                        if ui.selectable_label(selected, label_of(record)).clicked() {
                                            picked = Some(Some(record.id()));
                                        }
                                    }
                                });
                            if let Some(template) = picked {
                                self.selection.set_template(template);
                                changed = true;
                            }
                        }
                    }
                    state => placeholder_combo(ui, "template_select", &status_text(state, TableKind::Templates)),
                }
                ui.end_row();
            });

        if changed {
            self.refresh_draft();
        }
    }

    fn render_output(&mut self, ui: &mut egui::Ui) {
        let feedback_secs = self.settings.copy_feedback_secs;

        ui.horizontal(|ui| {
            ui.strong("Subject");
            copy_button(ui, &self.draft.subject, CopyTarget::Subject, &mut self.copied, feedback_secs);
        });
        ui.add(egui::TextEdit::singleline(&mut self.draft.subject.as_str()).desired_width(f32::INFINITY));

        ui.add_space(8.0);
        ui.horizontal(|ui| {
            ui.strong("Body");
            copy_button(ui, &self.draft.body, CopyTarget::Body, &mut self.copied, feedback_secs);
        });
        egui::ScrollArea::vertical().show(ui, |ui| {
            ui.add(
                egui::TextEdit::multiline(&mut self.draft.body.as_str())
                    .desired_rows(16)
                    .desired_width(f32::INFINITY),
            );
        });
    }
}

impl eframe::App for GuiApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_loads();
        apply_style(ctx, &self.settings);

        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.menu_button("File", |ui| {
                    if ui.button("Open Contacts...").clicked() {
                        self.open_source_dialog(TableKind::Contacts, ctx);
                        ui.close();
                    }
                    if ui.button("Open Templates...").clicked() {
                        self.open_source_dialog(TableKind::Templates, ctx);
                        ui.close();
                    }
                    ui.separator();
                    if ui.button("Reload").clicked() {
                        self.reload_all(ctx);
                        ui.close();
                    }
                });
                if ui.button("Data").clicked() {
                    self.show_data = true;
                }
                if ui.button("Settings").clicked() {
                    self.show_settings = true;
                }
            });
        });

        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                status_label(ui, &self.contacts.state, TableKind::Contacts);
                ui.separator();
                status_label(ui, &self.templates.state, TableKind::Templates);
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.render_selectors(ui);
            ui.separator();
            self.render_output(ui);
        });

        if self.show_settings {
            let mut open = true;
            let reload = self.settings_window.show(ctx, &mut open, &mut self.settings);
            if reload {
                self.reload_all(ctx);
            }
            if !open {
                self.show_settings = false;
            }
        }

        if self.show_data {
            let mut open = true;
            self.data_window.show(
                ctx,
                &mut open,
                self.contacts.state.table(),
                self.templates.state.table(),
            );
            if !open {
                self.show_data = false;
            }
        }
    }
}

fn placeholder_combo(ui: &mut egui::Ui, id: &str, text: &str) {
    ui.add_enabled_ui(false, |ui| {
        egui::ComboBox::from_id_salt(id)
            .width(COMBO_WIDTH)
            .selected_text(text)
            .show_ui(ui, |_ui| {});
    });
}

fn check_headers_text(missing: &[String]) -> String {
    if missing.is_empty() {
        "No rows found. Check headers...".to_string()
    } else {
        format!("Check headers: {}", missing.join(", "))
    }
}

fn status_text(state: &TableState, kind: TableKind) -> String {
    match state {
        TableState::Unconfigured => format!("No {} source set", kind.label()),
        TableState::Loading(_) => "Loading...".to_string(),
        TableState::Error(_) => format!("Error loading {}", kind.label()),
        TableState::Ready(table) => format!("{} {}", table.len(), kind.label()),
    }
}

fn status_label(ui: &mut egui::Ui, state: &TableState, kind: TableKind) {
    match state {
        TableState::Ready(table) if table.dropped_rows() > 0 => {
            ui.label(format!(
                "{} ({} malformed rows skipped)",
                status_text(state, kind),
                table.dropped_rows()
            ));
        }
        TableState::Loading(source) => {
            ui.spinner();
            ui.label(format!("Loading {}...", source));
        }
        TableState::Error(e) => {
            ui.colored_label(egui::Color32::from_rgb(220, 80, 80), status_text(state, kind))
                .on_hover_text(e.as_str());
        }
        _ => {
            ui.label(status_text(state, kind));
        }
    }
}

fn copy_button(
    ui: &mut egui::Ui,
    text: &str,
    target: CopyTarget,
    copied: &mut Option<(CopyTarget, f64)>,
    feedback_secs: f32,
) {
    let now = ui.input(|i| i.time);
    let remaining = match *copied {
        Some((t, until)) if t == target && now < until => Some(until - now),
        _ => None,
    };
    let label = if remaining.is_some() { "Copied!" } else { "Copy" };

    if ui.add_enabled(!text.is_empty(), egui::Button::new(label)).clicked() {
        ui.ctx().copy_text(text.to_string());
        *copied = Some((target, now + f64::from(feedback_secs)));
        ui.ctx().request_repaint_after(Duration::from_secs_f32(feedback_secs.max(0.0)));
    } else if let Some(remaining) = remaining {
        ui.ctx().request_repaint_after(Duration::from_secs_f64(remaining));
    }
}

fn apply_style(ctx: &egui::Context, settings: &Settings) {
    let preference = match settings.theme {
        Theme::System => egui::ThemePreference::System,
        Theme::Dark => egui::ThemePreference::Dark,
        Theme::Light => egui::ThemePreference::Light,
    };
    ctx.set_theme(preference);

    let size = settings.font_size;
    ctx.style_mut(|style| {
        for (text_style, font_id) in style.text_styles.iter_mut() {
            font_id.size = match text_style {
                egui::TextStyle::Heading => size * 1.4,
                egui::TextStyle::Small => size * 0.75,
                _ => size,
            };
        }
    });
}
