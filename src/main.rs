pub mod backend;
pub mod cli;
pub mod gui;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::backend::settings::Settings;
use crate::cli::Command;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Contacts CSV: a file path or an http(s) URL
    #[arg(short, long)]
    contacts: Option<String>,

    /// Templates CSV: a file path or an http(s) URL
    #[arg(short, long)]
    templates: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("draftmerge=info,eframe=warn,egui=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    init_logging();
    let args = Args::parse();

    let mut settings = Settings::load();
    if let Some(contacts) = args.contacts {
        settings.contacts_source = contacts;
    }
    if let Some(templates) = args.templates {
        settings.templates_source = templates;
    }

    if let Some(command) = args.command {
        return cli::run(command, &settings);
    }

    let native_options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default()
            .with_inner_size([960.0, 720.0])
            .with_min_inner_size([640.0, 480.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Draft Merge",
        native_options,
        Box::new(move |cc| Ok(Box::new(crate::gui::app::GuiApp::new(cc, settings)))),
    )
    .map_err(|e| anyhow::anyhow!("Eframe error: {}", e))?;

    Ok(())
}
