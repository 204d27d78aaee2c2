//! Append-safe CSV episode logs.
//!
//! Both the training log and the evaluation log share one shape:
//! `episode,reward,QID,summary`, one row per completed episode, the
//! summary cell a quoted space-joined list of selected candidate
//! indices. Every append flushes before returning so an interrupted
//! run loses at most the row being written.

use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

const HEADER: &str = "episode,reward,QID,summary";

/// A CSV log of per-episode rewards.
pub struct EpisodeLog {
    writer: BufWriter<File>,
    path: PathBuf,
}

impl EpisodeLog {
    /// Create (truncate) the log and write the header.
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("failed to create log directory {}", parent.display())
                })?;
            }
        }
        let file = File::create(path)
            .with_context(|| format!("failed to create log {}", path.display()))?;
        let mut log = Self {
            writer: BufWriter::new(file),
            path: path.to_path_buf(),
        };
        writeln!(log.writer, "{HEADER}")
            .with_context(|| format!("failed to write header to {}", path.display()))?;
        log.flush()?;
        Ok(log)
    }

    /// Append one episode row and flush.
    pub fn append(
        &mut self,
        episode: usize,
        reward: f64,
        qid: usize,
        summary: &[usize],
    ) -> Result<()> {
        let joined = summary
            .iter()
            .map(|i| i.to_string())
            .collect::<Vec<_>>()
            .join(" ");
        writeln!(self.writer, "{episode},{reward:.6},{qid},\"{joined}\"")
            .with_context(|| format!("failed to append to {}", self.path.display()))?;
        self.flush()
    }

    fn flush(&mut self) -> Result<()> {
        self.writer
            .flush()
            .with_context(|| format!("failed to flush {}", self.path.display()))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("train.csv");

        let mut log = EpisodeLog::create(&path).unwrap();
        log.append(0, 0.5, 12, &[0, 2, 5]).unwrap();
        log.append(1, 0.0, 3, &[]).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "episode,reward,QID,summary");
        assert_eq!(lines[1], "0,0.500000,12,\"0 2 5\"");
        assert_eq!(lines[2], "1,0.000000,3,\"\"");
    }

    #[test]
    fn test_create_truncates_existing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("eval.csv");

        let mut log = EpisodeLog::create(&path).unwrap();
        log.append(0, 1.0, 0, &[0]).unwrap();
        drop(log);

        let log = EpisodeLog::create(&path).unwrap();
        drop(log);
        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 1);
    }
}
