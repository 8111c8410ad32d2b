//! companiond - tour companion loop
//!
//! Each cycle:
//! 1. Takes the next position fix from the locator
//! 2. Updates the scenic-spot tracker and greets on entry
//! 3. Runs object detection on the current frame
//! 4. Logs labelled detections, or prints one JSON line per cycle with `--json`

use anyhow::{anyhow, Result};
use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::mpsc;
use std::time::Duration;

use tour_companion::config::CompanionConfig;
use tour_companion::detect::backends;
use tour_companion::locate::DEFAULT_STEP_PERIOD;
use tour_companion::{
    BackendKind, BackendRegistry, BoundingBox, ClassLabels, Companion, Detection, Frame, Locator,
    ReverseGeocoder, SampleRouteLocator, StaticGeocoder, Transition,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Location-aware tour companion")]
struct Args {
    /// Number of cycles to run (0 = until Ctrl-C).
    #[arg(long, default_value_t = 0)]
    cycles: u64,

    /// Delay between cycles.
    #[arg(long, default_value_t = 100)]
    interval_ms: u64,

    /// JSON or TOML config file.
    #[arg(long, env = "COMPANION_CONFIG")]
    config: Option<PathBuf>,

    /// Override the configured inference backend (stub, embedded, desktop).
    #[arg(long)]
    backend: Option<BackendKind>,

    /// Image to run detection on instead of a blank frame.
    #[arg(long)]
    image: Option<PathBuf>,

    /// Cycles between sample route steps.
    #[arg(long, default_value_t = DEFAULT_STEP_PERIOD)]
    route_period: u64,

    /// Print one JSON report per cycle on stdout.
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct CycleReport<'a> {
    cycle: u64,
    region: &'a str,
    entered: bool,
    left: bool,
    address: Option<String>,
    detections: Vec<LabelledDetection<'a>>,
}

#[derive(Serialize)]
struct LabelledDetection<'a> {
    label: &'a str,
    class_id: usize,
    confidence: f32,
    bbox: BoundingBox,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut cfg = CompanionConfig::load_from(args.config.as_deref())?;
    if let Some(backend) = args.backend {
        cfg.detection.backend = backend;
        cfg.validate()?;
    }

    let mut companion = Companion::new(&cfg)?;
    let labels = ClassLabels::load_or_coco(&cfg.detection.labels_path)?;
    let geocoder = StaticGeocoder::builtin();
    let mut locator = SampleRouteLocator::through_regions(&cfg.regions, args.route_period);

    let mut registry = BackendRegistry::new();
    registry.register_boxed(backends::build(&cfg.detection)?);
    registry.warm_up_all()?;

    let frame = load_frame(&args, &cfg)?;

    log::info!(
        "companiond running: {} regions, backend={}, locator={}",
        companion.regions().len(),
        cfg.detection.backend.as_str(),
        locator.name()
    );
    log::info!(
        "confidence={}, nms={}, score_floor={}",
        cfg.detection.confidence_threshold,
        cfg.detection.nms_threshold,
        cfg.detection.score_floor
    );

    let (tx, rx) = mpsc::channel();
    ctrlc::set_handler(move || {
        let _ = tx.send(());
    })
    .map_err(|e| anyhow!("error setting Ctrl-C handler: {}", e))?;

    let interval = Duration::from_millis(args.interval_ms);
    let mut cycle = 0u64;
    loop {
        if args.cycles != 0 && cycle >= args.cycles {
            break;
        }
        cycle += 1;

        let fix = locator.next_fix();
        let transition = companion.update_location(fix).clone();
        let address = match &transition {
            Transition::Entered { .. } | Transition::Moved { .. } => {
                geocoder.address_for_fix(&fix)
            }
            _ => None,
        };
        if !args.json {
            log_transition(&transition, address.as_deref());
        }

        let detections = match companion.detect(&registry, &frame) {
            Ok(detections) => detections,
            Err(e) => {
                log::warn!("cycle {}: detection failed: {}", cycle, e);
                Vec::new()
            }
        };

        if args.json {
            let report = CycleReport {
                cycle,
                region: companion.current_region(),
                entered: companion.has_just_entered(),
                left: companion.has_just_left(),
                address,
                detections: label_detections(&detections, &labels),
            };
            println!("{}", serde_json::to_string(&report)?);
        } else {
            for d in &detections {
                log::info!(
                    "detected {} ({:.2}) at [{:.0}, {:.0}, {:.0}x{:.0}]",
                    labels.label(d.class_id),
                    d.confidence,
                    d.bbox.left,
                    d.bbox.top,
                    d.bbox.width,
                    d.bbox.height
                );
            }
        }

        match rx.recv_timeout(interval) {
            Ok(()) => {
                log::info!("shutdown signal received, stopping after {} cycles", cycle);
                break;
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }

    Ok(())
}

fn log_transition(transition: &Transition, address: Option<&str>) {
    let address = address.unwrap_or("unknown address");
    match transition {
        Transition::Entered { region } => {
            log::info!("welcome to {} ({})", region, address)
        }
        Transition::Moved { from, to } => {
            log::info!("leaving {}", from);
            log::info!("welcome to {} ({})", to, address);
        }
        Transition::Left { region } => log::info!("leaving {}", region),
        Transition::None => {}
    }
}

fn label_detections<'a>(
    detections: &[Detection],
    labels: &'a ClassLabels,
) -> Vec<LabelledDetection<'a>> {
    detections
        .iter()
        .map(|d| LabelledDetection {
            label: labels.label(d.class_id),
            class_id: d.class_id,
            confidence: d.confidence,
            bbox: d.bbox,
        })
        .collect()
}

fn load_frame(args: &Args, cfg: &CompanionConfig) -> Result<Frame> {
    match &args.image {
        #[cfg(feature = "image-input")]
        Some(path) => Frame::from_image_file(path),
        #[cfg(not(feature = "image-input"))]
        Some(_) => Err(anyhow!("--image requires the image-input feature")),
        None => Frame::blank(cfg.frame.width, cfg.frame.height),
    }
}
