use eframe::egui;
use egui_extras::{Column, TableBuilder};

use crate::backend::export::record_to_json;
use crate::backend::parser::Table;
use crate::gui::app::TableKind;

/// Read-only view of the parsed tables.
pub struct DataWindow {
    tab: TableKind,
    json_modal: Option<(String, String)>,
}

impl DataWindow {
    pub fn new() -> Self {
        Self {
            tab: TableKind::Contacts,
            json_modal: None,
        }
    }

    pub fn show(
        &mut self,
        ctx: &egui::Context,
        open: &mut bool,
        contacts: Option<&Table>,
        templates: Option<&Table>,
    ) {
        egui::Window::new("Data")
            .open(open)
            .default_size([720.0, 420.0])
            .resizable(true)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.selectable_value(&mut self.tab, TableKind::Contacts, "Contacts");
                    ui.selectable_value(&mut self.tab, TableKind::Templates, "Templates");
                });
                ui.separator();

                let table = match self.tab {
                    TableKind::Contacts => contacts,
                    TableKind::Templates => templates,
                };
                match table {
                    Some(table) => {
                        ui.label(format!(
                            "{} records, {} malformed rows skipped",
                            table.len(),
                            table.dropped_rows()
                        ));
                        render_table(ui, table, self.tab, &mut self.json_modal);
                    }
                    None => {
                        ui.label(format!("No {} loaded.", self.tab.label()));
                    }
                }
            });

        if let Some((title, json)) = &self.json_modal {
            let mut open = true;
            egui::Window::new(title.as_str())
                .open(&mut open)
                .collapsible(false)
                .resizable(true)
                .show(ctx, |ui| {
                    egui::ScrollArea::vertical().show(ui, |ui| {
                        ui.add(egui::TextEdit::multiline(&mut json.as_str()).code_editor());
                    });
                });
            if !open {
                self.json_modal = None;
            }
        }
    }
}

fn render_table(
    ui: &mut egui::Ui,
    table: &Table,
    kind: TableKind,
    json_modal: &mut Option<(String, String)>,
) {
    let row_height = egui::TextStyle::Body.resolve(ui.style()).size + 10.0;

    egui::ScrollArea::horizontal().show(ui, |ui| {
        TableBuilder::new(ui)
            .id_salt(kind.label())
            .striped(true)
            .resizable(true)
            .cell_layout(egui::Layout::left_to_right(egui::Align::Center))
            .column(Column::auto())
            .columns(Column::initial(140.0).resizable(true), table.headers().len())
            .header(24.0, |mut header| {
                header.col(|ui| {
                    ui.strong("#");
                });
                for name in table.headers() {
                    header.col(|ui| {
                        ui.strong(name.as_str());
                    });
                }
            })
            .body(|body| {
                body.rows(row_height, table.len(), |mut row| {
                    let record = &table.records()[row.index()];
                    row.col(|ui| {
                        ui.label(
                            egui::RichText::new((record.id().index() + 1).to_string())
                                .color(egui::Color32::from_gray(120)),
                        );
                    });
                    for (_, value) in record.fields() {
                        row.col(|ui| {
                            let response = ui.add(egui::Label::new(value).truncate().sense(egui::Sense::click()));
                            response.context_menu(|ui| {
                                if ui.button("View Row as JSON").clicked() {
                                    match record_to_json(record) {
                                        Ok(json) => {
                                            let title = format!("Row {} JSON", record.id().index() + 1);
                                            *json_modal = Some((title, json));
                                        }
                                        Err(e) => tracing::warn!("{:#}", e),
                                    }
                                    ui.close();
                                }
                            });
                        });
                    }
                });
            });
    });
}
