//! taco_live - live detection overlay on a camera (or synthetic) feed
//!
//! This binary:
//! 1. Loads configuration and every configured model
//! 2. Starts the capture and inference threads
//! 3. Redraws the overlay for each result and reports FPS
//! 4. Switches models from stdin (`1`, `2`, or a model id)

use anyhow::{anyhow, Result};
use clap::Parser;
use std::io::{BufRead, IsTerminal};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use taco_lens::config::AppConfig;
use taco_lens::{
    open_source, FrameDetector, LogSink, ModelOption, ModelRegistry, ModelSelection,
    OverlayRenderer, Pipeline, PreviewLayer,
};

#[path = "../ui.rs"]
mod ui;

const FPS_REPORT_INTERVAL: Duration = Duration::from_secs(2);
const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Config file (JSON, or TOML with a .toml extension).
    #[arg(long, env = "TACO_CONFIG")]
    config: Option<PathBuf>,
    /// Initial model (taco or yolov3).
    #[arg(long)]
    model: Option<ModelOption>,
    /// Frame source: stub://<name> or a V4L2 device path.
    #[arg(long)]
    source: Option<String>,
    /// Stop after this many rendered frames.
    #[arg(long)]
    frames: Option<u64>,
    /// UI mode: auto|plain|pretty
    #[arg(long, default_value = "auto")]
    ui: String,
    /// Print the model options and exit.
    #[arg(long)]
    list_models: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    if args.list_models {
        for (idx, model) in ModelOption::ALL.iter().enumerate() {
            println!("{}. {} ({})", idx + 1, model.name(), model.id());
        }
        return Ok(());
    }

    let is_tty = std::io::stderr().is_terminal();
    let stdout_is_tty = std::io::stdout().is_terminal();
    let ui = ui::Ui::from_args(Some(&args.ui), is_tty, !stdout_is_tty);

    let mut config = {
        let _stage = ui.stage("Load config");
        AppConfig::load_from(args.config.as_deref())?
    };
    if let Some(model) = args.model {
        config.models.selected = model;
    }
    if let Some(source) = &args.source {
        config.source.url = source.clone();
    }

    let registry = {
        let _stage = ui.stage("Load models");
        ModelRegistry::load(&config.models)
    };
    let available = registry.available();
    if available.is_empty() {
        return Err(anyhow!("no detection model could be loaded"));
    }
    if !registry.contains(config.models.selected) {
        log::warn!(
            "selected model {} is unavailable; its frames will show no detections",
            config.models.selected.name()
        );
    }

    let selection = ModelSelection::new(config.models.selected);
    let handle = {
        let _stage = ui.stage("Open source");
        let source = open_source(&config.source)?;
        Pipeline::spawn(source, FrameDetector::new(registry), selection.clone())?
    };

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = running.clone();
        ctrlc::set_handler(move || {
            running.store(false, Ordering::SeqCst);
        })
        .map_err(|e| anyhow!("error setting Ctrl-C handler: {}", e))?;
    }
    spawn_model_picker(selection.clone())?;

    let preview = PreviewLayer::new(config.preview.width, config.preview.height, config.reference)
        .with_gravity(config.preview.gravity);
    let mut renderer = OverlayRenderer::new(LogSink::new(), preview, config.reference);

    let status = ui.status();
    status.println(&format!(
        "running {} on {}; type 1/2 or a model id to switch, Ctrl-C to stop",
        selection.current().name(),
        config.source.url
    ));

    let mut rendered = 0u64;
    let mut last_report = Instant::now();
    while running.load(Ordering::SeqCst) {
        let result = match handle.next_result(POLL_INTERVAL) {
            Ok(Some(result)) => result,
            Ok(None) => continue,
            Err(_) => {
                log::info!("pipeline finished");
                break;
            }
        };
        renderer.apply(&result);
        rendered += 1;

        if last_report.elapsed() >= FPS_REPORT_INTERVAL {
            status.update(&format!(
                "{} | {} | {} boxes",
                result.model.name(),
                renderer.fps_text(),
                renderer.sink().drawn()
            ));
            last_report = Instant::now();
        }
        if args.frames.is_some_and(|limit| rendered >= limit) {
            break;
        }
    }
    drop(status);

    let stats = handle.stop()?;
    println!("frames rendered: {}", rendered);
    println!("frames captured: {}", stats.frames_captured);
    println!("frames dropped: {}", stats.frames_dropped);
    println!("frames inferred: {}", stats.frames_inferred);
    println!("source errors: {}", stats.source_errors);
    println!("last {}", renderer.fps_text());
    Ok(())
}

/// Read model choices from stdin on a detached thread.
fn spawn_model_picker(selection: ModelSelection) -> Result<()> {
    thread::Builder::new()
        .name("model-picker".to_string())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else {
                    break;
                };
                let choice = line.trim();
                if choice.is_empty() {
                    continue;
                }
                match parse_choice(choice) {
                    Ok(model) => {
                        selection.select(model);
                    }
                    Err(err) => log::warn!("{}", err),
                }
            }
        })?;
    Ok(())
}

fn parse_choice(choice: &str) -> Result<ModelOption> {
    if let Ok(index) = choice.parse::<usize>() {
        return index
            .checked_sub(1)
            .and_then(|i| ModelOption::ALL.get(i).copied())
            .ok_or_else(|| anyhow!("no model #{}", index));
    }
    choice.parse()
}
