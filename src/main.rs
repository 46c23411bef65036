use clap::Parser;
use tracing_subscriber::EnvFilter;

use amplicon_realigner::cli::Cli;
use amplicon_realigner::pipeline;

fn main() -> anyhow::Result<()> {
    let invocation = std::env::args().collect::<Vec<_>>().join(" ");
    let cli = Cli::parse();

    // Initialize logging based on verbosity flag
    let filter = if cli.verbose {
        EnvFilter::new("amplicon_realigner=debug,info")
    } else {
        EnvFilter::new("amplicon_realigner=info,warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();

    let config = cli.into_config();
    tracing::info!(
        "running with settings: min_score={} primer_similarity={} gap_open={} gap_extend={}",
        config.min_score,
        config.primer_similarity,
        config.gap_open,
        config.gap_extend
    );

    pipeline::run(&config, &invocation)?;

    Ok(())
}
