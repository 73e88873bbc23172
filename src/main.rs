use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

mod dataset;
mod error;
mod github;
mod metrics;

#[derive(Parser)]
#[command(name = "revival-metrics")]
#[command(about = "Compute before/after engagement metrics for revived GitHub repositories")]
struct Cli {
    /// GitHub token (can also be set via GITHUB_TOKEN env var)
    #[arg(long, env = "GITHUB_TOKEN")]
    token: String,

    /// Input dataset: CSV with URL, "Data de morte" and
    /// "Data de ressurreição" columns
    #[arg(short, long)]
    input: PathBuf,

    /// Output CSV path
    #[arg(short, long, default_value = "validacao_pilar1.csv")]
    output: PathBuf,

    /// Analyze only the first N dataset rows
    #[arg(long)]
    limit: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let github_client = github::GitHubClient::new(cli.token.clone()).await?;

    let mut inputs = dataset::load_dataset(&cli.input)?;
    if let Some(limit) = cli.limit {
        inputs.truncate(limit);
    }
    println!("Loaded {} repositories from {}", inputs.len(), cli.input.display());

    let runner = metrics::BatchRunner::new(github_client);
    let rows = runner.run(&inputs).await;

    metrics::write_report(&cli.output, &rows)?;
    println!(
        "Wrote {} of {} repositories to {}",
        rows.len(),
        inputs.len(),
        cli.output.display()
    );

    Ok(())
}
