use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser as _;

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(err) = try_main().await {
        eprintln!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

async fn try_main() -> anyhow::Result<()> {
    let cli = shelfscout::cli::Cli::parse();
    shelfscout::logging::init(cli.verbose).context("init logging")?;
    tracing::debug!(?cli, "parsed cli");

    match cli.command {
        shelfscout::cli::Command::Reviews(args) => {
            shelfscout::commands::reviews(args).await.context("reviews")?;
        }
        shelfscout::cli::Command::Shelf(args) => {
            shelfscout::commands::shelf(args).await.context("shelf")?;
        }
        shelfscout::cli::Command::Recommend(args) => {
            shelfscout::commands::recommend(args)
                .await
                .context("recommend")?;
        }
        shelfscout::cli::Command::Condense(args) => {
            shelfscout::commands::condense(args).context("condense")?;
        }
    }

    Ok(())
}
