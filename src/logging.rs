use anyhow::Context as _;

/// `RUST_LOG` wins over `verbose`; without either only `info` and above is shown.
pub fn init(verbose: bool) -> anyhow::Result<()> {
    let fallback = if verbose { "shelfscout=debug,info" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(fallback))
        .context("build log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow::anyhow!("initialize tracing subscriber: {err}"))?;

    Ok(())
}
