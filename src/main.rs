use std::path::Path;

use anyhow::Result;

use atomweave::config::PipelineConfig;
use atomweave::pipeline;

fn main() -> Result<()> {
    env_logger::init();

    // Usage: atomweave [config.toml]
    let config = match std::env::args().nth(1) {
        Some(path) => PipelineConfig::load(Path::new(&path))?,
        None => PipelineConfig::default(),
    };

    let artifact = pipeline::run_with_defaults(&config)?;
    log::info!("combined atomic dataset at {}", artifact.display());
    Ok(())
}
