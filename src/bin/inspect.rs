use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use imageproc::point::Point;
use tracing_subscriber::EnvFilter;

use roi_inspect::config::{load_cycle_config, load_settings, save_cycle_config};
use roi_inspect::cycle::CycleOrchestrator;
use roi_inspect::inspect::{Metric, Operator};
use roi_inspect::log_sink::{CsvLogSink, LogSink, NullLogSink};
use roi_inspect::source::{StaticImageSource, load_rgb};
use roi_inspect::{Feature, InspectionSetup, RoiShape, synthetic};

#[derive(Parser, Debug)]
#[command(name = "inspect", about = "Run ROI inspections on still images", version)]
struct Cli {
    /// Parameter settings applied on top of the configuration
    #[arg(short = 's', long = "settings", global = true)]
    settings: Option<PathBuf>,

    /// Append results to this CSV inspection log
    #[arg(short = 'l', long = "log", global = true)]
    log: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the configured cycle once per image
    Run {
        /// Cycle configuration (ROIs, features, parameters)
        #[arg(short = 'c', long = "config")]
        config: PathBuf,
        /// Images to inspect
        #[arg(required = true)]
        images: Vec<PathBuf>,
    },
    /// Run one operator on one ROI and write an annotated preview PNG
    Preview {
        #[arg(short = 'c', long = "config")]
        config: PathBuf,
        #[arg(short = 'i', long = "image")]
        image: PathBuf,
        #[arg(long = "roi")]
        roi: u32,
        /// Operator name, e.g. density, edge, blob, color, measurement, focus
        #[arg(long = "operator")]
        operator: String,
        /// Directory the preview is written to
        #[arg(short = 'o', long = "out", default_value = "previews")]
        out: PathBuf,
    },
    /// Write a default configuration with one full-frame ROI
    InitConfig {
        path: PathBuf,
        #[arg(long = "width", default_value_t = 640)]
        width: i32,
        #[arg(long = "height", default_value_t = 480)]
        height: i32,
    },
    /// Inspect a generated scene with a few preset ROIs
    Demo {
        /// Also save the scene here
        #[arg(long = "save-scene")]
        save_scene: Option<PathBuf>,
    },
}

fn open_log(path: Option<&Path>) -> Result<Box<dyn LogSink>, Box<dyn Error>> {
    Ok(match path {
        Some(path) => Box::new(CsvLogSink::open(path)?),
        None => Box::new(NullLogSink),
    })
}

fn load_setup(config: &Path, settings: Option<&Path>) -> Result<InspectionSetup, Box<dyn Error>> {
    let mut setup = load_cycle_config(config)?;
    if let Some(settings) = settings {
        let skipped = load_settings(&mut setup.params, settings)?;
        for name in skipped {
            eprintln!("Warning: ignored setting `{name}`");
        }
    }
    Ok(setup)
}

fn print_cycle(setup: &InspectionSetup, orchestrator: &CycleOrchestrator) {
    for (roi, results) in orchestrator.results() {
        for result in results.values() {
            println!("  ROI {roi} {:<20} {}  {}", result.operator.label(), result.verdict, result.detail);
            if let Metric::Blobs(report) = &result.metric {
                for line in setup.blob_outputs.summarize(report) {
                    println!("      {line}");
                }
            }
        }
    }
}

fn run(setup: &InspectionSetup, images: &[PathBuf], log: &mut dyn LogSink) -> Result<bool, Box<dyn Error>> {
    let mut orchestrator = CycleOrchestrator::new();
    let mut all_ok = true;
    for path in images {
        let mut source = StaticImageSource::open(path)?;
        println!("{}", path.display());
        match orchestrator.run(setup, &mut source, log, &mut ()) {
            Ok(report) => {
                print_cycle(setup, &orchestrator);
                for feature in &report.skipped {
                    println!("  {feature}: not implemented, skipped");
                }
                println!("  overall: {} ({})", report.overall, report.state);
                all_ok &= report.overall.is_ok();
            }
            Err(err) => {
                eprintln!("  cycle error: {err}");
                all_ok = false;
            }
        }
    }
    Ok(all_ok)
}

fn demo_setup() -> InspectionSetup {
    let mut setup = InspectionSetup::new();
    setup.rois.create_roi(Point::new(20, 20), Point::new(300, 220), RoiShape::Rectangle, false);
    setup.rois.create_roi(Point::new(340, 40), Point::new(500, 200), RoiShape::Rectangle, false);
    setup.rois.create_roi(Point::new(60, 280), Point::new(260, 430), RoiShape::Rectangle, false);
    setup.features = setup
        .features
        .clone()
        .with(Feature::Contrast, true)
        .with(Feature::Measurement, true);
    setup
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let mut log = open_log(cli.log.as_deref())?;

    match cli.command {
        Command::Run { config, images } => {
            let setup = load_setup(&config, cli.settings.as_deref())?;
            if !run(&setup, &images, log.as_mut())? {
                std::process::exit(1);
            }
        }
        Command::Preview {
            config,
            image,
            roi,
            operator,
            out,
        } => {
            let setup = load_setup(&config, cli.settings.as_deref())?;
            let op = Operator::parse(&operator).ok_or_else(|| format!("unknown operator `{operator}`"))?;
            let target = setup.rois.get(roi).ok_or_else(|| format!("ROI {roi} not in configuration"))?;
            let frame = load_rgb(&image)?;
            let evaluation = setup.inspector().evaluate(op, &frame, target)?;

            let preview = evaluation.preview();
            fs::create_dir_all(&out)?;
            let file = out.join(format!("{}.png", preview.title.replace(' ', "_").to_lowercase()));
            preview.image.save(&file)?;
            println!("{}", preview.caption);
            println!("Preview written to {}", file.display());
        }
        Command::InitConfig { path, width, height } => {
            let mut setup = InspectionSetup::new();
            setup.rois.create_roi(Point::new(0, 0), Point::new(width, height), RoiShape::Rectangle, false);
            save_cycle_config(&setup, &path)?;
            println!("Wrote {}", path.display());
        }
        Command::Demo { save_scene } => {
            let scene = synthetic::demo_scene();
            if let Some(path) = save_scene {
                scene.save(&path)?;
            }
            let setup = demo_setup();
            let mut source = StaticImageSource::new(scene);
            let mut orchestrator = CycleOrchestrator::new();
            let report = orchestrator.run(&setup, &mut source, log.as_mut(), &mut ())?;
            print_cycle(&setup, &orchestrator);
            println!("overall: {} ({})", report.overall, report.state);
        }
    }
    Ok(())
}
