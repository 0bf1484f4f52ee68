//! Appends one CSV row per training batch.
//!
//! Format: timestamp,batch,games,average_moves,average_invalid,average_score,
//! median_score,min_score,best_score,average_reward,biggest_tile,epsilon,loss,checkpoint

use crate::training::stats::TrainingStats;
use crate::Result;
use chrono::Utc;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

const HEADER: [&str; 14] = [
    "timestamp",
    "batch",
    "games",
    "average_moves",
    "average_invalid",
    "average_score",
    "median_score",
    "min_score",
    "best_score",
    "average_reward",
    "biggest_tile",
    "epsilon",
    "loss",
    "checkpoint",
];

pub struct StatsWriter {
    path: PathBuf,
    writer: csv::Writer<fs::File>,
}

impl StatsWriter {
    /// Open `path` for appending, writing the header when the file is new.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let is_new = !path.exists() || fs::metadata(&path)?.len() == 0;

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);
        if is_new {
            writer.write_record(HEADER)?;
            writer.flush()?;
        }
        Ok(Self { path, writer })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write_batch(
        &mut self,
        batch: usize,
        stats: &TrainingStats,
        checkpoint: Option<&str>,
    ) -> Result<()> {
        let row = [
            Utc::now().to_rfc3339(),
            batch.to_string(),
            stats.games.to_string(),
            format!("{:.3}", stats.average_moves),
            format!("{:.3}", stats.average_invalid),
            format!("{:.3}", stats.average_score),
            stats.median_score.to_string(),
            stats.min_score.to_string(),
            stats.best_score.to_string(),
            format!("{:.5}", stats.average_reward),
            stats.biggest_tile.to_string(),
            format!("{:.6}", stats.epsilon),
            stats.loss.map(|l| format!("{l:.6}")).unwrap_or_default(),
            checkpoint.unwrap_or_default().to_string(),
        ];
        self.writer.write_record(&row)?;
        self.writer.flush()?;
        Ok(())
    }
}
