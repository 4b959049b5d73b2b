use anyhow::Context;
use clap::Parser;
use sift_cli::{CliArgs, SiftCli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();
    let cli = SiftCli::from_args(&args).context("failed to load configuration")?;
    cli.run(args).await?;
    Ok(())
}
