use std::fs::File;
use std::io::stdout;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use log::{info, warn};
use ratatui::{Terminal, backend::CrosstermBackend};
use ratatui_image::picker::Picker;
use simplelog::{Config, LevelFilter, WriteLogger};

use pagelight::app::{App, run_app_with_event_source};
use pagelight::document::default_renderers;
use pagelight::event_source::TerminalEventSource;
use pagelight::illustration::StabilityClient;
use pagelight::panic_handler::initialize_panic_handler;
use pagelight::session::ViewerSession;
use pagelight::settings::load_settings;

/// Terminal document viewer with generated illustrations for highlighted passages
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Document to open once the renderer is ready
    document: Option<PathBuf>,

    /// Settings file (defaults to the user config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, default_value = "pagelight.log")]
    log_file: PathBuf,

    #[arg(long, default_value_t = LevelFilter::Info)]
    log_level: LevelFilter,
}

fn main() -> Result<()> {
    let args = Args::parse();

    WriteLogger::init(
        args.log_level,
        Config::default(),
        File::create(&args.log_file)
            .with_context(|| format!("Cannot create log file {}", args.log_file.display()))?,
    )?;
    initialize_panic_handler();
    info!("Starting pagelight");

    let settings = load_settings(args.config.as_deref());
    let client = StabilityClient::from_settings(&settings.illustration);
    if !client.has_credential() {
        warn!(
            "{} is not set; illustration requests will fail",
            settings.illustration.api_key_env
        );
    }

    let session = ViewerSession::new(
        &settings,
        default_renderers(settings.document.lines_per_page),
        Arc::new(client),
    );
    let mut app = App::new(session);

    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Must run after raw mode is on; the query reads the terminal's reply
    match Picker::from_query_stdio() {
        Ok(picker) => {
            info!("Image protocol: {:?}", picker.protocol_type());
            app.set_image_picker(picker);
        }
        Err(e) => warn!("Terminal image query failed, using halfblocks: {e}"),
    }

    if let Some(document) = args.document {
        // Opening is refused until the renderer probe lands
        let deadline = Instant::now() + Duration::from_secs(5);
        while !app.session.host().is_ready()
            && app.session.host().error.is_none()
            && Instant::now() < deadline
        {
            app.tick(Instant::now());
            std::thread::sleep(Duration::from_millis(10));
        }
        app.open_document(&document);
    }

    let result = run_app_with_event_source(&mut terminal, &mut app, &mut TerminalEventSource);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    info!("Shutting down");
    result
}
