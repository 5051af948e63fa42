use anyhow::Result;
use clap::Parser;
use mrstream::cmd::mrstream::Args;
use mrstream::dispatch::dispatch;
use mrstream::workload;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Standard output carries data, so logs go to standard error.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(args.log_filter())),
        )
        .with_writer(std::io::stderr)
        .init();
    debug!(?args, "parsed arguments");

    let config = args.config();
    let job = workload::named(&args.workload, &args.args)?;

    if let Some(summary) = dispatch(job, &config).await? {
        println!("{}", summary);
    }
    Ok(())
}
