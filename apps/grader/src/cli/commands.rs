//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use crate::api::{self, AppState, InferResponse, StageJson, StagesResponse};
use crate::config::AppConfig;
use grader_core::{
    FeatureKind, GraderError, ImagePayload, InferenceOrchestrator, Prediction, Stage, catalog,
};
use serde::Serialize;
use std::path::{Path, PathBuf};

// =============================================================================
// FILE INPUT
// =============================================================================

/// Resolve the path and make sure it names a regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, GraderError> {
    let canonical = path.canonicalize().map_err(|e| {
        GraderError::Io(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(GraderError::Io(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

/// Read an image file, refusing anything over `max_bytes`.
pub fn read_image(path: &Path, max_bytes: usize) -> Result<ImagePayload, GraderError> {
    let path = validate_file_path(path)?;

    let metadata = std::fs::metadata(&path)
        .map_err(|e| GraderError::Io(format!("Cannot read file metadata: {}", e)))?;
    if metadata.len() > max_bytes as u64 {
        return Err(GraderError::InvalidImage(format!(
            "file size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_bytes
        )));
    }

    std::fs::read(&path)
        .map(ImagePayload::from)
        .map_err(|e| GraderError::Io(format!("Cannot read '{}': {}", path.display(), e)))
}

fn print_json<T: Serialize>(value: &T) -> Result<(), GraderError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| GraderError::Io(format!("JSON encoding failed: {}", e)))?;
    println!("{}", json);
    Ok(())
}

// =============================================================================
// SERVER COMMAND
// =============================================================================

/// Start the HTTP server.
pub async fn cmd_server(config: &AppConfig) -> Result<(), GraderError> {
    let state = AppState::from_config(config)?;
    let model = state.orchestrator.model_info();

    println!("Grader Server Starting...");
    println!();
    println!("Configuration:");
    println!("  Address:      {}", config.server.addr());
    println!("  Scorer:       {}", model.scorer);
    println!("  Confidence:   {}", model.confidence);
    println!("  Settle delay: {} ms", config.pipeline.settle_delay_ms);
    println!();
    println!("Endpoints:");
    println!("  POST /infer                - Grade a base64 image");
    println!("  POST /session/image        - Upload into the grading slot");
    println!("  POST /session/reset        - Analyze another image");
    println!("  POST /session/explanation  - Toggle the explanation");
    println!("  GET  /session              - Slot state");
    println!("  GET  /stages               - Stage catalog");
    println!("  GET  /health               - Health check");
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    api::run_server(state).await
}

// =============================================================================
// GRADE COMMAND
// =============================================================================

/// Grade an image file.
pub async fn cmd_grade(
    config: &AppConfig,
    file: &Path,
    explain: bool,
    json_mode: bool,
) -> Result<(), GraderError> {
    let image = read_image(file, config.server.max_upload_bytes)?;
    let orchestrator = InferenceOrchestrator::from_config(&config.pipeline)?;

    if !json_mode {
        println!("Analyzing {} ...", file.display());
    }
    let prediction = orchestrator.infer(&image).await?;

    if json_mode {
        return print_json(&InferResponse::from_prediction(prediction));
    }

    print_prediction(&prediction);
    if explain {
        print_explanation(&prediction);
    }
    Ok(())
}

fn print_prediction(prediction: &Prediction) {
    let info = catalog::lookup(prediction.stage);

    println!();
    println!("{}", info.name);
    println!("  Confidence:     {:.1}%", prediction.confidence_percent);
    println!("  Description:    {}", info.description);
    println!("  Time to ripe:   {}", info.time_to_ripe);
    println!("  Recommendation: {}", info.recommendation);
    println!("  Characteristics:");
    for characteristic in info.characteristics {
        println!("    - {}", characteristic);
    }
}

fn print_explanation(prediction: &Prediction) {
    println!();
    println!("Feature importance:");
    for kind in FeatureKind::ALL {
        let percent = prediction.features.get(kind);
        println!("  {:<8} {:>5.1}%  {}", kind.as_str(), percent, bar(percent, 30));
    }

    println!();
    println!("Heatmap:");
    for region in &prediction.heatmap {
        println!(
            "  {:<10} {:>5.1}  {}",
            region.region,
            region.importance,
            bar(region.importance, 30)
        );
    }

    println!();
    println!("Rationale:");
    for line in grader_core::rationale(prediction) {
        println!("  {}", line);
    }
}

/// Text bar for a value in `[0, 100]`.
fn bar(percent: f64, width: usize) -> String {
    let filled = ((percent.clamp(0.0, 100.0) / 100.0) * width as f64).round() as usize;
    format!("{}{}", "#".repeat(filled), ".".repeat(width.saturating_sub(filled)))
}

// =============================================================================
// CATALOG COMMANDS
// =============================================================================

/// List every stage.
pub fn cmd_stages(json_mode: bool) -> Result<(), GraderError> {
    if json_mode {
        return print_json(&StagesResponse::from_catalog(catalog::entries()));
    }

    println!("Maturity stages:");
    for info in catalog::entries() {
        println!(
            "  {}. {:<13} {:<22} {}",
            info.number,
            info.stage.as_str(),
            info.name,
            info.time_to_ripe
        );
    }
    Ok(())
}

/// Show one stage.
pub fn cmd_stage(name: &str, json_mode: bool) -> Result<(), GraderError> {
    let stage: Stage = name.parse()?;
    let info = catalog::lookup(stage);

    if json_mode {
        return print_json(&StageJson::from(info));
    }

    println!("{}", info.name);
    println!("  {}", info.description);
    println!();
    println!("Characteristics:");
    for characteristic in info.characteristics {
        println!("  - {}", characteristic);
    }
    println!();
    println!("Recommendation: {}", info.recommendation);
    println!("Time to ripe:   {}", info.time_to_ripe);
    Ok(())
}
