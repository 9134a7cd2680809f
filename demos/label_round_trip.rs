//! Example: run the label round trip on a synthetic RGB image
//!
//! Run with: cargo run --example label_round_trip [-- pipeline.json]

use anyhow::{bail, Context};
use labelmap_roundtrip::{
    ClampingCaster, Dimensions, FileSystemStore, MemoryScene, PipelineConfig, PipelineOrchestrator,
    ScalarType, Scene, VolumeClass, VolumeImage,
};
use tracing_subscriber::EnvFilter;

/// A 256 x 256 RGB image with a radial pattern, standing in for a loaded PNG
fn synthetic_rgb() -> anyhow::Result<VolumeImage> {
    let (nx, ny) = (256usize, 256usize);
    let mut samples = Vec::with_capacity(nx * ny * 3);
    for j in 0..ny {
        for i in 0..nx {
            let dx = i as f64 - 128.0;
            let dy = j as f64 - 128.0;
            let r = (dx * dx + dy * dy).sqrt();
            samples.push(i as f64 * 256.0);
            samples.push(j as f64 * 256.0);
            samples.push((r * 300.0).min(65535.0));
        }
    }
    VolumeImage::from_samples(
        "image01",
        Dimensions::planar(nx, ny),
        3,
        ScalarType::U16,
        VolumeClass::Vector,
        &samples,
    )
    .context("building synthetic input")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = match std::env::args().nth(1) {
        Some(path) => PipelineConfig::from_json_file(&path)
            .with_context(|| format!("loading configuration from {}", path))?,
        None => {
            let dir = std::env::temp_dir().join("labelmap-roundtrip");
            PipelineConfig::new().with_output_dir(dir)
        }
    };

    let scene = MemoryScene::new();
    let store = FileSystemStore::from_config(&config);
    let input = synthetic_rgb()?;
    println!("Input: {}", input.summary());
    scene.add(input.clone());

    let orchestrator = PipelineOrchestrator::new(config, &scene, &store, &ClampingCaster);
    let report = orchestrator.run(&input).await;

    println!("{}", report.summary());
    for timing in &report.strokes {
        println!(
            "  label {} at ({}, {}): {} samples, {:?} ({:+.6}s vs previous)",
            timing.stroke.label,
            timing.stroke.x,
            timing.stroke.y,
            timing.covered,
            timing.elapsed,
            timing.delta_secs
        );
    }
    if let Some(path) = &report.saved_path {
        println!("  written to {}", path.display());
    }

    if !report.passed() {
        bail!("test failed");
    }
    println!("Test passed!");
    Ok(())
}
