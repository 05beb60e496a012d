// src/main.rs

use hotrun::{cli, logging, run};

#[tokio::main]
async fn main() {
    if let Err(err) = run_main().await {
        eprintln!("hotrun error: {err:?}");
        std::process::exit(1);
    }
}

async fn run_main() -> anyhow::Result<()> {
    let args = cli::parse();
    logging::init_logging(args.log_level)?;

    // A panic anywhere in the engine ends up here as a JoinError.
    match tokio::spawn(run(args)).await {
        Ok(result) => result,
        Err(join_err) if join_err.is_panic() => {
            Err(anyhow::anyhow!("fatal: engine panicked: {join_err}"))
        }
        Err(join_err) => Err(anyhow::anyhow!("engine task failed: {join_err}")),
    }
}
