//! taco_eval - score saved prediction runs against TACO annotations
//!
//! This binary:
//! 1. Loads COCO-style annotations (labels are supercategories)
//! 2. Loads one or more prediction runs
//! 3. Prints matching-label counts and a ground truth → predicted confusion
//!    matrix per run, optionally writing them as JSON

use anyhow::{anyhow, Result};
use clap::Parser;
use std::collections::BTreeMap;
use std::io::IsTerminal;
use std::path::PathBuf;

use taco_lens::eval::{evaluate, Evaluation, PredictionRun, TacoDataset, MATCH_IOU};

#[path = "../ui.rs"]
mod ui;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// COCO-style annotations file.
    #[arg(long, env = "TACO_ANNOTATIONS")]
    annotations: PathBuf,
    /// Prediction run files; each file is scored separately.
    #[arg(long, required = true, num_args = 1..)]
    predictions: Vec<PathBuf>,
    /// Only use the first N annotations.
    #[arg(long)]
    limit: Option<usize>,
    /// IoU at which a prediction covers a ground-truth box.
    #[arg(long, default_value_t = MATCH_IOU)]
    iou: f64,
    /// Write all evaluations to this JSON file.
    #[arg(long)]
    json: Option<PathBuf>,
    /// UI mode: auto|plain|pretty
    #[arg(long, default_value = "auto")]
    ui: String,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    if !(0.0..=1.0).contains(&args.iou) {
        return Err(anyhow!("--iou must be within 0..1"));
    }

    let is_tty = std::io::stderr().is_terminal();
    let stdout_is_tty = std::io::stdout().is_terminal();
    let ui = ui::Ui::from_args(Some(&args.ui), is_tty, !stdout_is_tty);

    let dataset = {
        let _stage = ui.stage("Load annotations");
        TacoDataset::load(&args.annotations, args.limit)?
    };
    println!(
        "{} annotated images, {} categories in {} supercategories",
        dataset.len(),
        dataset.categories().len(),
        dataset.supercategories().len()
    );

    let mut evaluations: BTreeMap<String, Evaluation> = BTreeMap::new();
    for path in &args.predictions {
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let evaluation = {
            let _stage = ui.stage(&format!("Evaluate {}", name));
            let run = PredictionRun::load(path)?;
            evaluate(&dataset, &run, args.iou)?
        };
        print_evaluation(&name, &evaluation);
        evaluations.insert(name, evaluation);
    }

    if let Some(path) = &args.json {
        let json = serde_json::to_string_pretty(&evaluations)?;
        std::fs::write(path, json)
            .map_err(|e| anyhow!("failed to write {}: {}", path.display(), e))?;
        println!("wrote {}", path.display());
    }
    Ok(())
}

fn print_evaluation(name: &str, evaluation: &Evaluation) {
    println!();
    println!("== {} ({} images)", name, evaluation.images);
    println!("prediction labels matching ground truth: {}", evaluation.matching_labels);
    println!(
        "overlapping pairs: {} ({} with agreeing labels)",
        evaluation.confusion.total(),
        evaluation.confusion.agreeing()
    );
    for (ground_truth, row) in evaluation.confusion.rows() {
        let cells: Vec<String> = row
            .iter()
            .map(|(predicted, count)| format!("{}={}", predicted, count))
            .collect();
        println!("  {:<24} {}", ground_truth, cells.join(", "));
    }
}
