use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use anyhow::{Context, Error};
use tracing::{debug, warn};

/// Last known price per instrument code.
pub type Observations = BTreeMap<String, f64>;

/// Whole-file JSON persistence of the last observed prices.
#[derive(Debug, Clone)]
pub struct ObservationStore {
    path: PathBuf,
}

impl ObservationStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Expects PRICES_PATH, defaults to `prices.json` in the working directory.
    pub fn from_env() -> Self {
        Self::new(std::env::var("PRICES_PATH").unwrap_or_else(|_| "prices.json".to_string()))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing or unreadable files yield an empty set.
    pub async fn load(&self) -> Observations {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "no stored prices");
                return Observations::new();
            }
        };

        match serde_json::from_str(&raw) {
            Ok(obs) => obs,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "stored prices unreadable, starting fresh");
                Observations::new()
            }
        }
    }

    /// Overwrite the file with the full observation set.
    pub async fn save(&self, observations: &Observations) -> Result<(), Error> {
        let body = serde_json::to_string_pretty(observations)?;
        tokio::fs::write(&self.path, body)
            .await
            .with_context(|| format!("writing {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[tokio::test]
    async fn missing_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let store = ObservationStore::new(dir.path().join("prices.json"));
        assert!(store.load().await.is_empty());
    }

    #[tokio::test]
    async fn corrupt_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("prices.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = ObservationStore::new(path);
        assert!(store.load().await.is_empty());
    }

    #[tokio::test]
    async fn save_overwrites_previous_contents() {
        let dir = TempDir::new().unwrap();
        let store = ObservationStore::new(dir.path().join("prices.json"));

        let mut first = Observations::new();
        first.insert("BTC".into(), 100.0);
        first.insert("DOGE".into(), 0.1);
        store.save(&first).await.unwrap();

        let mut second = Observations::new();
        second.insert("BTC".into(), 105.0);
        store.save(&second).await.unwrap();

        assert_eq!(store.load().await, second);
    }

    #[tokio::test]
    async fn save_into_missing_directory_fails() {
        let dir = TempDir::new().unwrap();
        let store = ObservationStore::new(dir.path().join("nope").join("prices.json"));
        assert!(store.save(&Observations::new()).await.is_err());
    }
}
