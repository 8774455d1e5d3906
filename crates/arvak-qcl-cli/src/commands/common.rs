//! Shared helpers for CLI commands.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};

use arvak_qcl::{CircuitSpec, Model, Sample};

/// On-disk dataset layout: `{"samples": [{"features": [..], "label": 0}, ..]}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct Dataset {
    pub samples: Vec<Sample>,
}

fn read_source(path: &str) -> Result<String> {
    if !Path::new(path).exists() {
        anyhow::bail!("File not found: {path}");
    }
    fs::read_to_string(path).with_context(|| format!("Failed to read file: {path}"))
}

fn is_yaml(path: &str) -> bool {
    let ext = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("");
    matches!(ext.to_lowercase().as_str(), "yaml" | "yml")
}

/// Load samples from a JSON or YAML dataset file.
pub fn load_dataset(path: &str) -> Result<Vec<Sample>> {
    let source = read_source(path)?;
    let dataset: Dataset = if is_yaml(path) {
        serde_yaml_ng::from_str(&source).with_context(|| format!("Invalid dataset: {path}"))?
    } else {
        serde_json::from_str(&source).with_context(|| format!("Invalid dataset: {path}"))?
    };
    if dataset.samples.is_empty() {
        anyhow::bail!("Dataset {path} has no samples");
    }
    Ok(dataset.samples)
}

/// Load a circuit geometry; JSON parses as YAML too.
pub fn load_circuit(path: &str) -> Result<CircuitSpec> {
    let source = read_source(path)?;
    CircuitSpec::from_yaml_str(&source).with_context(|| format!("Invalid circuit: {path}"))
}

/// Load a trained model.
pub fn load_model(path: &str) -> Result<Model> {
    let source = read_source(path)?;
    Model::from_json(&source).with_context(|| format!("Invalid model: {path}"))
}

/// Write a model as pretty JSON.
pub fn save_model(model: &Model, path: &str) -> Result<()> {
    let json = model.to_json()?;
    fs::write(path, json).with_context(|| format!("Failed to write model: {path}"))
}

/// Steady-ticking spinner for long-running work.
pub fn spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}
