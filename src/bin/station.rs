use std::error::Error;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use roi_inspect::config::load_cycle_config;
use roi_inspect::log_sink::{CsvLogSink, LogSink, NullLogSink};
use roi_inspect::source::load_rgb;
use roi_inspect::{InspectionSetup, Mode, Station, synthetic};

#[derive(Parser, Debug)]
#[command(name = "station", about = "Run-mode inspection station driven by a periodic trigger", version)]
struct Cli {
    /// Cycle configuration; the built-in demo setup is used when omitted
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Frame to inspect; a generated scene is used when omitted
    #[arg(short = 'i', long = "image")]
    image: Option<PathBuf>,

    /// CSV inspection log
    #[arg(short = 'l', long = "log")]
    log: Option<PathBuf>,

    /// Frame refresh period in milliseconds
    #[arg(long = "refresh-ms", default_value_t = 30)]
    refresh_ms: u64,

    /// Trigger line to simulate; overrides the configured `gpio_trigger_pin`
    #[arg(long = "trigger-pin")]
    trigger_pin: Option<i32>,

    /// Simulated trigger period in milliseconds
    #[arg(long = "trigger-ms", default_value_t = 1000)]
    trigger_ms: u64,

    /// Stop after this many seconds
    #[arg(long = "seconds", default_value_t = 10)]
    seconds: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let mut setup = match &cli.config {
        Some(path) => load_cycle_config(path)?,
        None => {
            let mut setup = InspectionSetup::new();
            setup.rois.create_roi(
                imageproc::point::Point::new(20, 20),
                imageproc::point::Point::new(300, 220),
                roi_inspect::RoiShape::Rectangle,
                false,
            );
            setup
        }
    };
    let frame = match &cli.image {
        Some(path) => load_rgb(path)?,
        None => synthetic::demo_scene(),
    };
    let log: Box<dyn LogSink + Send> = match &cli.log {
        Some(path) => Box::new(CsvLogSink::open(path)?),
        None => Box::new(NullLogSink),
    };

    if let Some(pin) = cli.trigger_pin {
        setup.params.set("gpio_trigger_pin", f64::from(pin))?;
    }
    let mut station = Station::new(setup, log).with_static_image(frame);
    station.set_mode(Mode::Run);

    if let Some(trigger_pin) = station.trigger_pin() {
        let trigger = station.trigger_handle();
        let trigger_period = Duration::from_millis(cli.trigger_ms);
        let seconds = cli.seconds;
        info!(pin = trigger_pin, period_ms = cli.trigger_ms, "simulating trigger line");
        thread::spawn(move || {
            let ticks = seconds * 1000 / trigger_period.as_millis().max(1) as u64;
            for _ in 0..ticks {
                thread::sleep(trigger_period);
                if !trigger.request_cycle_start() {
                    info!("trigger rejected");
                }
            }
        });
    } else {
        info!("gpio_trigger_pin is unset; no triggers will fire");
    }

    station
        .run(
            Duration::from_millis(cli.refresh_ms.max(1)),
            tokio::time::sleep(Duration::from_secs(cli.seconds)),
        )
        .await;

    if let Some(report) = station.last_report() {
        println!("last cycle: {} ({} invocations)", report.overall, report.invocations);
    }
    Ok(())
}
