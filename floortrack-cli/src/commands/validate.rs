//! Validate command - check a scene document without starting anything.

use std::path::PathBuf;

use clap::Args;

use floortrack::config::SceneConfig;
use floortrack::fence::FenceRegion;

use crate::error::CliError;

/// Arguments for the validate command.
#[derive(Debug, Args)]
pub struct ValidateArgs {
    /// Scene document to check
    #[arg(short, long, value_name = "FILE")]
    pub scene: PathBuf,
}

/// Validate a scene document and print what it contains.
pub fn run(args: ValidateArgs) -> Result<(), CliError> {
    let scene = SceneConfig::from_file(&args.scene)?;

    println!("Scene OK: {}", args.scene.display());
    println!();
    println!(
        "  Control points: {}",
        scene.georeference.ground_control_points().len()
    );
    if let Some(zone) = scene.georeference.zone() {
        println!("  Zone:           {}", zone);
    }

    println!("  Fences:         {}", scene.fences.len());
    for fence in &scene.fences {
        let shape = match (&fence.region, fence.radius) {
            (FenceRegion::Point { .. }, Some(radius)) => format!("circle r={}", radius),
            (FenceRegion::Point { .. }, None) => "point".to_string(),
            (FenceRegion::Polygon { .. }, _) => {
                let vertices = fence
                    .region
                    .exterior_ring()
                    .map(|ring| ring.len())
                    .unwrap_or(0);
                format!("polygon ({} vertices)", vertices)
            }
        };
        match &fence.name {
            Some(name) => println!("    {} - {} ({})", fence.id, name, shape),
            None => println!("    {} ({})", fence.id, shape),
        }
    }

    println!("  Providers:      {}", scene.providers.len());
    println!("  Trackables:     {}", scene.trackables.len());

    Ok(())
}
