//! Microtween CLI
//!
//! Run tweens from the command line, inspect easing curves and list presets.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use microtween::{presets, start_tween, CubicBezier, Easing, Preset, ThreadScheduler};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod config;

use config::{parse_assignment, EasingConfig, Overrides, TweenFile};

#[derive(Parser)]
#[command(name = "microtween")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Cubic bezier easing and value tweens", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a tween, printing each frame as a JSON line
    Run(RunArgs),

    /// Print an easing curve as `t eased` pairs
    Curve {
        /// Preset name or control points `x1,y1,x2,y2`
        easing: String,

        /// Number of intervals to sample
        #[arg(short, long, default_value_t = 20, value_parser = clap::value_parser!(u32).range(1..))]
        samples: u32,
    },

    /// List the easing presets
    Presets,
}

#[derive(Args)]
struct RunArgs {
    /// Tween file (TOML)
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Starting value, `key=value` (repeatable)
    #[arg(long = "from", value_parser = parse_assignment)]
    from: Vec<(String, f64)>,

    /// Ending value, `key=value` (repeatable)
    #[arg(long = "to", value_parser = parse_assignment)]
    to: Vec<(String, f64)>,

    /// Duration in milliseconds
    #[arg(short, long)]
    duration: Option<f64>,

    /// Preset name or control points `x1,y1,x2,y2`
    #[arg(short, long, value_parser = EasingConfig::parse)]
    easing: Option<EasingConfig>,

    /// Frames per second of the frame thread
    #[arg(long)]
    fps: Option<u32>,

    /// Print the resolved tween as TOML instead of running it
    #[arg(long)]
    dump: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging; stdout is reserved for frame output
    let filter = if cli.verbose {
        EnvFilter::new("microtween=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("microtween=info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match cli.command {
        Commands::Run(args) => cmd_run(args).await,
        Commands::Curve { easing, samples } => cmd_curve(&easing, samples),
        Commands::Presets => cmd_presets(),
    }
}

async fn cmd_run(args: RunArgs) -> Result<()> {
    let mut tween = match &args.file {
        Some(path) => TweenFile::load(path)?,
        None => TweenFile::default(),
    };
    tween.apply(Overrides {
        from: args.from,
        to: args.to,
        duration_ms: args.duration,
        easing: args.easing,
        fps: args.fps,
    });

    if args.dump {
        print!("{}", tween.to_toml()?);
        return Ok(());
    }

    let mut scheduler = match tween.fps {
        Some(fps) => ThreadScheduler::with_fps(fps),
        None => ThreadScheduler::new(),
    };
    scheduler.start_background();
    let scheduler = Arc::new(scheduler);

    let spec = tween.to_spec().on_frame(|values| match serde_json::to_string(values) {
        Ok(line) => println!("{}", line),
        Err(err) => warn!("Failed to encode frame: {}", err),
    });
    let mut handle = start_tween(spec, &scheduler).context("Failed to start tween")?;
    info!(
        "Running tween at {} fps (Ctrl-C jumps to the end)",
        scheduler.target_fps()
    );

    let canceller = handle.canceller();
    let result = tokio::select! {
        result = &mut handle => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted, jumping to end values");
            canceller.cancel();
            (&mut handle).await
        }
    }
    .context("Tween did not complete")?;

    println!("{}", serde_json::json!({ "done": result }));
    Ok(())
}

fn cmd_curve(easing: &str, samples: u32) -> Result<()> {
    let easing = match EasingConfig::parse(easing).map_err(anyhow::Error::msg)? {
        EasingConfig::Name(name) => name.parse::<Preset>()?.easing(),
        EasingConfig::Points(points) => Easing::from(CubicBezier::from_points(points)?),
    };

    for i in 0..=samples {
        let t = f64::from(i) / f64::from(samples);
        println!("{:.4}\t{:.6}", t, easing.apply(t));
    }
    Ok(())
}

fn cmd_presets() -> Result<()> {
    for (name, easing) in presets() {
        if let Some(curve) = easing.as_bezier() {
            let [x1, y1, x2, y2] = curve.control_points();
            println!("{:<14} {}, {}, {}, {}", name, x1, y1, x2, y2);
        }
    }
    Ok(())
}
