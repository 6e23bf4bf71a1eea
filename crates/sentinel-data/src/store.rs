//! JSON-lines persistence.

use async_trait::async_trait;
use sentinel_core::error::StoreError;
use sentinel_core::traits::StateStore;
use sentinel_core::types::{EngineState, ExternalPrediction, TradeRecord};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::debug;

const TRADES_FILE: &str = "trades.jsonl";
const PREDICTIONS_FILE: &str = "predictions.jsonl";
const STATE_FILE: &str = "state.json";

/// Appends trades and predictions as JSON lines and keeps the engine
/// snapshot in `state.json`, all under one directory.
#[derive(Debug, Clone)]
pub struct JsonlStore {
    dir: PathBuf,
}

impl JsonlStore {
    /// Open (creating if needed) a store directory.
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub async fn trades(&self) -> Result<Vec<TradeRecord>, StoreError> {
        self.read_lines(TRADES_FILE).await
    }

    pub async fn predictions(&self) -> Result<Vec<ExternalPrediction>, StoreError> {
        self.read_lines(PREDICTIONS_FILE).await
    }

    async fn append<T: Serialize + Sync>(&self, file: &str, value: &T) -> Result<(), StoreError> {
        let mut line = serde_json::to_vec(value)?;
        line.push(b'\n');

        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.dir.join(file))
            .await?;
        f.write_all(&line).await?;
        f.flush().await?;
        Ok(())
    }

    async fn read_lines<T: DeserializeOwned>(&self, file: &str) -> Result<Vec<T>, StoreError> {
        let path = self.dir.join(file);
        if !fs::try_exists(&path).await? {
            return Ok(Vec::new());
        }
        let contents = fs::read_to_string(&path).await?;
        contents
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| serde_json::from_str(l).map_err(StoreError::from))
            .collect()
    }
}

#[async_trait]
impl StateStore for JsonlStore {
    async fn record_trade(&self, trade: &TradeRecord) -> Result<(), StoreError> {
        self.append(TRADES_FILE, trade).await
    }

    async fn record_prediction(&self, prediction: &ExternalPrediction) -> Result<(), StoreError> {
        self.append(PREDICTIONS_FILE, prediction).await
    }

    /// Written to a temporary file and renamed into place.
    async fn save_snapshot(&self, state: &EngineState) -> Result<(), StoreError> {
        let json = serde_json::to_vec_pretty(state)?;
        let tmp = self.dir.join(format!("{}.tmp", STATE_FILE));
        fs::write(&tmp, json).await?;
        fs::rename(&tmp, self.dir.join(STATE_FILE)).await?;
        debug!(version = state.version, "Engine snapshot saved");
        Ok(())
    }

    async fn load_snapshot(&self) -> Result<Option<EngineState>, StoreError> {
        let path = self.dir.join(STATE_FILE);
        if !fs::try_exists(&path).await? {
            return Ok(None);
        }
        let contents = fs::read(&path).await?;
        Ok(Some(serde_json::from_slice(&contents)?))
    }
}
