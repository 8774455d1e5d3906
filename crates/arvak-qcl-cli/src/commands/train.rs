//! Train command implementation.

use std::sync::Arc;

use anyhow::{Context, Result};
use console::style;
use tracing::info;

use arvak_qcl::{SamplingSchedule, Trainer, TrainingOptions, random_initial_parameters};

use super::common::{load_circuit, load_dataset, save_model, spinner};

/// Execute the train command.
pub fn execute(
    data: &str,
    circuit: &str,
    config: Option<&str>,
    starts: usize,
    seed: Option<u64>,
    batch_size: usize,
    output: Option<&str>,
) -> Result<()> {
    println!(
        "{} Training {} on {}",
        style("→").cyan().bold(),
        style(circuit).green(),
        style(data).green()
    );

    let samples = load_dataset(data)?;
    let spec = Arc::new(load_circuit(circuit)?);

    let mut options = match config {
        Some(path) => TrainingOptions::from_file(path)
            .with_context(|| format!("Failed to load training options: {path}"))?,
        None => TrainingOptions::default(),
    }
    .merge_env();
    if let Some(seed) = seed {
        options.seed = seed;
    }
    options.validate()?;

    println!(
        "  Loaded: {} samples, {} units, {} parameters",
        samples.len(),
        spec.num_units(),
        spec.num_parameters()
    );

    let initial = random_initial_parameters(spec.num_parameters(), starts, options.seed);
    let training = SamplingSchedule::shuffled(samples.len(), batch_size, options.seed);
    let validation = SamplingSchedule::whole(samples.len());
    info!(starts, batch_size, seed = options.seed, "starting training");

    let progress = spinner(&format!("Training {starts} candidates..."));
    let outcome = Trainer::new(options).train(&spec, &samples, &initial, &training, &validation);
    progress.finish_and_clear();
    let result = outcome?;

    println!("{} Training complete", style("✓").green().bold());
    println!();
    println!(
        "  {:<10} {:>8} {:>10} {:>12}",
        style("Candidate").bold(),
        style("Epochs").bold(),
        style("Training").bold(),
        style("Validation").bold()
    );
    for report in &result.candidates {
        let marker = if report.index == result.candidate { "*" } else { " " };
        match &report.excluded {
            Some(reason) => println!(
                "  {:<10} {}",
                format!("{}{}", marker, report.index),
                style(format!("excluded: {reason}")).red()
            ),
            None => println!(
                "  {:<10} {:>8} {:>10} {:>12}",
                format!("{}{}", marker, report.index),
                report.epochs,
                report.training_misses.map_or_else(|| "-".into(), |m| m.to_string()),
                report.validation_misses.map_or_else(|| "-".into(), |m| m.to_string())
            ),
        }
    }
    println!();
    println!(
        "  Miss rate: {} ({}/{})",
        style(format!("{:.4}", result.miss_rate())).yellow(),
        result.misses,
        result.evaluated
    );
    println!("  Bias:      {:.6}", result.model.bias());

    if let Some(path) = output {
        save_model(&result.model, path)?;
        println!("  Output: {}", style(path).green());
    }

    Ok(())
}
