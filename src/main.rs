use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use ccbc::math::Point2d;
use ccbc::{ClosedCurve, EditMode, FitConfig, FitSession, FitStats, FitStatus, ReplayLog};
use clap::Parser;
use serde::Serialize;

/// Anchors of the demo reference shape, as fractions of the canvas size.
const INITIAL_X: [f64; 10] = [0.605, 0.317, 0.933, 0.365, 0.645, 0.573, 0.133, 0.633, 0.069, 0.453];
const INITIAL_Y: [f64; 10] = [0.955, 0.435, 0.531, 0.647, 0.035, 0.651, 0.167, 0.423, 0.743, 0.307];
const CANVAS: f64 = 400.0;

#[derive(Parser)]
#[command(name = "ccbc", about = "Fit a closed continuous bezier curve to a contour")]
struct Cli {
    /// Replay log to play instead of the built-in demo
    #[arg(long)]
    replay: Option<PathBuf>,

    /// Maximum number of frames to run
    #[arg(long, default_value = "100")]
    frames: usize,

    /// Number of anchors to fit with
    #[arg(long)]
    anchors: Option<usize>,

    /// Insert and remove anchors where they add the most stress
    #[arg(long)]
    visual: bool,

    /// Maximum length ratio of adjacent segments
    #[arg(long)]
    max_ratio: Option<f64>,

    /// Factor used to push anchors away from their centroid
    #[arg(long)]
    rescale: Option<f64>,
}

#[derive(Serialize)]
struct Frame<'a> {
    frame: usize,
    status: FitStatus,
    anchors: &'a [Point2d],
    total_error: f64,
    stats: FitStats,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init_from_env(
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, "info"),
    );
    let cli = Cli::parse();

    let mut config = FitConfig::default();
    if let Some(max_ratio) = cli.max_ratio {
        config.max_ratio = max_ratio;
    }
    if let Some(rescale) = cli.rescale {
        config.rescale = rescale;
    }

    if let Some(path) = cli.replay {
        let log = ReplayLog::from_reader(BufReader::new(File::open(path)?))?;
        let mut result: Result<(), serde_json::Error> = Ok(());
        log.run(&config, |frame| {
            if result.is_ok() {
                result = serde_json::to_string(&frame).map(|line| println!("{}", line));
            }
        })?;
        result?;
        return Ok(());
    }

    let reference = INITIAL_X
        .iter()
        .zip(INITIAL_Y)
        .map(|(x, y)| Point2d::new((x * CANVAS).round(), (y * CANVAS).round()))
        .collect::<Vec<_>>();
    let mut anchors = reference.clone();
    anchors.remove(4);

    let mut session = FitSession::setup(config, anchors, &ClosedCurve::new(reference))?;
    let mode = if cli.visual { EditMode::Visual } else { EditMode::Precise };
    match cli.anchors {
        Some(n) if n > session.anchors().len() => session.increase_controls(n, mode)?,
        Some(n) if n < session.anchors().len() => session.decrease_controls(n, mode)?,
        _ => {}
    }
    log::info!(
        "fitting {} anchors to {} contour samples",
        session.anchors().len(),
        session.contour().len()
    );

    for frame in 0..cli.frames {
        let status = loop {
            match session.step()? {
                FitStatus::Continue => continue,
                status => break status,
            }
        };
        let line = Frame {
            frame,
            status,
            anchors: session.anchors(),
            total_error: session.total_error(),
            stats: session.stats(),
        };
        println!("{}", serde_json::to_string(&line)?);
        if status == FitStatus::Converged {
            break;
        }
    }
    Ok(())
}
