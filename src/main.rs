use anyhow::Result;

use revmap_rs::config::{RunConfig, USAGE};
use revmap_rs::manager::TreemapManager;
use revmap_rs::output::RectFileSink;
use revmap_rs::scanner;

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("revmap_rs=info".parse()?),
        )
        .init();

    let config = RunConfig::from_args(std::env::args().skip(1))?;
    if config.help {
        print!("{}", USAGE);
        return Ok(());
    }

    tracing::info!(
        "revmap-rs starting: inputs={:?} ({:?}), base={}x{}, out={}",
        config.inputs,
        config.input_kind,
        config.width,
        config.height,
        config.out_dir.display()
    );

    let tree = scanner::load(&config.inputs, config.input_kind)?;
    let mut manager = TreemapManager::new(&tree, config.base_rect(), &config.layout);
    let mut sink = RectFileSink::new(&config.out_dir);

    let summary = if config.parallel {
        manager.run_parallel(&mut sink, config.sink_policy)?
    } else {
        manager.run(&mut sink, config.sink_policy)?
    };

    if !summary.failed.is_empty() {
        tracing::warn!(
            "{} revisions could not be written: {:?}",
            summary.failed.len(),
            summary.failed
        );
    }
    tracing::info!(
        "Wrote {} revisions to {}",
        summary.emitted,
        sink.dir().display()
    );

    Ok(())
}
