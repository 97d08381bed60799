//! Run orchestration: fetch, transform, then the CSV and SQLite sinks.
//!
//! Each stage returns `Result<_, EtlError>`; the first failure stops the run and
//! is reported as [`RunOutcome::Failed`] with the stage it happened in. `run`
//! itself never returns an error.

use std::fmt;
use std::path::PathBuf;

use log::{debug, error, info};
use uuid::Uuid;

use crate::config::Config;
use crate::database::Database;
use crate::error::EtlError;
use crate::export::save_to_csv;
use crate::fetch::RateFetcher;
use crate::model::RateRecord;
use crate::transform::{preview, transform};

const PREVIEW_ROWS: usize = 5;

/// Pipeline steps in run order. `Transform` cannot fail and only appears in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetch,
    Transform,
    WriteCsv,
    WriteStore,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Fetch => "fetch",
            Stage::Transform => "transform",
            Stage::WriteCsv => "write_csv",
            Stage::WriteStore => "write_store",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub rows: usize,
    pub upserted: u64,
    pub csv_path: PathBuf,
    pub db_path: PathBuf,
}

#[derive(Debug)]
pub enum RunOutcome {
    Done(RunSummary),
    Failed {
        run_id: Uuid,
        stage: Stage,
        error: anyhow::Error,
    },
}

impl RunOutcome {
    pub fn is_done(&self) -> bool {
        matches!(self, RunOutcome::Done(_))
    }
}

pub struct Pipeline {
    config: Config,
    fetcher: RateFetcher,
}

impl Pipeline {
    pub fn new(config: Config) -> Result<Self, EtlError> {
        let fetcher = RateFetcher::new(&config)?;
        Ok(Self { config, fetcher })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub async fn run(&self) -> RunOutcome {
        let run_id = Uuid::new_v4();
        info!("[{run_id}] Running ETL pipeline.");

        match self.execute(run_id).await {
            Ok(summary) => {
                info!(
                    "[{run_id}] ETL pipeline completed successfully: {} rows, {} upserted.",
                    summary.rows, summary.upserted
                );
                RunOutcome::Done(summary)
            }
            Err((stage, err)) => {
                let error = anyhow::Error::new(err).context(format!("{stage} stage failed"));
                error!("[{run_id}] ETL pipeline failed: {error:?}");
                RunOutcome::Failed {
                    run_id,
                    stage,
                    error,
                }
            }
        }
    }

    async fn execute(&self, run_id: Uuid) -> Result<RunSummary, (Stage, EtlError)> {
        debug!("[{run_id}] stage {}", Stage::Fetch);
        let raw = self.fetcher.fetch().await.map_err(|e| (Stage::Fetch, e))?;

        debug!("[{run_id}] stage {}", Stage::Transform);
        let rows = transform(raw);
        info!("Sample of transformed data:\n{}", preview(&rows, PREVIEW_ROWS));

        debug!("[{run_id}] stage {}", Stage::WriteCsv);
        save_to_csv(&rows, &self.config.csv_path).map_err(|e| (Stage::WriteCsv, e))?;

        debug!("[{run_id}] stage {}", Stage::WriteStore);
        let upserted = self
            .write_store(&rows)
            .await
            .map_err(|e| (Stage::WriteStore, e))?;

        Ok(RunSummary {
            run_id,
            rows: rows.len(),
            upserted,
            csv_path: self.config.csv_path.clone(),
            db_path: self.config.db_path.clone(),
        })
    }

    async fn write_store(&self, rows: &[RateRecord]) -> Result<u64, EtlError> {
        info!(
            "Loading data to SQLite database at {} (upsert).",
            self.config.db_path.display()
        );
        let db = Database::connect(&self.config.db_path).await?;
        let result = match db.ensure_schema().await {
            Ok(()) => db.upsert(rows).await,
            Err(e) => Err(e),
        };
        db.close().await;
        result
    }
}
