use eframe::egui;
use crate::backend::settings::{Settings, Theme};

pub struct SettingsWindow {
    selected_tab: SettingsTab,
    last_error: Option<String>,
}

#[derive(PartialEq, Clone, Copy, Debug)]
enum SettingsTab {
    Sources,
    Columns,
    Theme,
}

impl SettingsWindow {
    pub fn new() -> Self {
        Self {
            selected_tab: SettingsTab::Sources,
            last_error: None,
        }
    }

    /// Returns true when the user asked to reload both tables.
    pub fn show(&mut self, ctx: &egui::Context, open: &mut bool, settings: &mut Settings) -> bool {
        let mut reload = false;
        egui::Window::new("Settings")
            .open(open)
            .min_width(420.0)
            .resizable(true)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.selectable_value(&mut self.selected_tab, SettingsTab::Sources, "Sources");
                    ui.selectable_value(&mut self.selected_tab, SettingsTab::Columns, "Columns");
                    ui.selectable_value(&mut self.selected_tab, SettingsTab::Theme, "Theme");
                });
                ui.separator();

                match self.selected_tab {
                    SettingsTab::Sources => Self::show_sources(ui, settings),
                    SettingsTab::Columns => Self::show_columns(ui, settings),
                    SettingsTab::Theme => Self::show_theme(ui, settings),
                }

                ui.separator();
                ui.horizontal(|ui| {
                    if ui.button("Save Settings").clicked() {
                        self.last_error = match settings.save() {
                            Ok(()) => None,
                            Err(e) => {
                                tracing::error!("Failed to save settings: {:#}", e);
                                Some(format!("{:#}", e))
                            }
                        };
                    }
                    if ui.button("Reset to Defaults").clicked() {
                        Settings::reset();
                        *settings = Settings::default();
                    }
                    if ui.button("Apply & Reload").clicked() {
                        reload = true;
                    }
                });
                if let Some(e) = &self.last_error {
                    ui.colored_label(egui::Color32::from_rgb(220, 80, 80), e.as_str());
                }
            });
        reload
    }

    fn show_sources(ui: &mut egui::Ui, settings: &mut Settings) {
        ui.label("A file path or a published CSV link (http/https).");
        egui::Grid::new("sources_grid").num_columns(2).show(ui, |ui| {
            ui.label("Contacts");
            ui.add(egui::TextEdit::singleline(&mut settings.contacts_source).desired_width(300.0));
            ui.end_row();
            ui.label("Templates");
            ui.add(egui::TextEdit::singleline(&mut settings.templates_source).desired_width(300.0));
            ui.end_row();
        });
        ui.add(egui::Slider::new(&mut settings.fetch_timeout_secs, 1..=120).text("Fetch timeout (s)"));
    }

    fn show_columns(ui: &mut egui::Ui, settings: &mut Settings) {
        let columns = &mut settings.columns;
        egui::Grid::new("columns_grid").num_columns(2).show(ui, |ui| {
            ui.label("Company column");
            ui.text_edit_singleline(&mut columns.company);
            ui.end_row();
            ui.label("Contact column");
            ui.text_edit_singleline(&mut columns.contact);
            ui.end_row();
            ui.label("Template name column");
            ui.text_edit_singleline(&mut columns.template_name);
            ui.end_row();
        });
        ui.label(egui::RichText::new("Templates always need Subject and Body columns.").weak().small());
    }

    fn show_theme(ui: &mut egui::Ui, settings: &mut Settings) {
        egui::ComboBox::from_id_salt("theme_selector")
            .selected_text(settings.theme.name())
            .show_ui(ui, |ui| {
                for theme in Theme::all() {
                    ui.selectable_value(&mut settings.theme, *theme, theme.name());
                }
            });
        ui.add(egui::Slider::new(&mut settings.font_size, 10.0..=24.0).text("Font Size"));
        ui.add(egui::Slider::new(&mut settings.copy_feedback_secs, 0.5..=5.0).text("\"Copied!\" duration (s)"));
    }
}
