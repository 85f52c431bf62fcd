use std::path::PathBuf;

use anyhow::Context;
use batikwalk::ViewerConfig;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info,wgpu_core=warn,wgpu_hal=warn,naga=warn"),
    )
    .init();

    // Optional first argument: path to a config file
    let explicit = std::env::args_os().nth(1).map(PathBuf::from);
    let config = ViewerConfig::load(explicit.as_deref()).context("failed to load configuration")?;

    batikwalk::run(config)
}
