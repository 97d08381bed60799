use std::io::Write;
use std::process::ExitCode;

use anyhow::Result;
use chrono::Local;
use env_logger::Env;
use rates_etl::{Config, Pipeline, RunOutcome};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok();
    init_logging();

    let config = Config::from_env()?;
    let pipeline = Pipeline::new(config)?;

    match pipeline.run().await {
        RunOutcome::Done(_) => Ok(ExitCode::SUCCESS),
        RunOutcome::Failed { .. } => Ok(ExitCode::FAILURE),
    }
}

fn init_logging() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            writeln!(
                buf,
                "{} - {} - {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .init();
}
