use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use egui::Vec2;
use log::{error, info};

use overcut::errors::OvercutError;
use overcut::provider::TelemetryProvider;
use overcut::provider::openf1::OpenF1Provider;
use overcut::ui::LapComparisonApp;
use overcut::ui::config::AppConfig;

const DEFAULT_SEASON: u16 = 2023;
const DEFAULT_REFERENCE_RACE: &str = "Bahrain";

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Championship season to browse
    #[arg(short, long, default_value_t = DEFAULT_SEASON)]
    season: u16,

    /// Race used to load the driver roster at startup
    #[arg(short, long, default_value = DEFAULT_REFERENCE_RACE)]
    reference_race: String,

    /// Directory for cached API responses, defaults to the platform cache dir
    #[arg(short, long)]
    cache_dir: Option<PathBuf>,
}

fn run(args: Args) -> Result<(), OvercutError> {
    let cache_dir = match args.cache_dir {
        Some(dir) => dir,
        None => dirs::cache_dir()
            .ok_or(OvercutError::NoCacheDir)?
            .join("overcut"),
    };

    let provider: Arc<dyn TelemetryProvider> = Arc::new(OpenF1Provider::new(cache_dir)?);
    let schedule = provider.event_schedule(args.season)?;
    let drivers = provider.race_drivers(args.season, &args.reference_race)?;
    info!(
        "Loaded {} circuits and {} drivers for the {} season",
        schedule.len(),
        drivers.len(),
        args.season
    );

    let app_config = AppConfig::from_local_file().unwrap_or_default();

    let mut native_options = eframe::NativeOptions::default();
    native_options.viewport = native_options.viewport.with_inner_size(Vec2::new(1000., 800.));

    let season = args.season;
    eframe::run_native(
        "Overcut",
        native_options,
        Box::new(move |cc| {
            Ok(Box::new(LapComparisonApp::new(
                provider, season, schedule, drivers, app_config, cc,
            )))
        }),
    )
    .expect("could not start app");
    Ok(())
}

fn main() {
    colog::init();

    let args = Args::parse();
    ctrlc::set_handler(move || {
        println!("Exiting...");
        std::process::exit(0);
    })
    .expect("Could not set Ctrl-C handler");

    if let Err(e) = run(args) {
        error!("Could not start overcut: {}", e);
        std::process::exit(1);
    }
}
