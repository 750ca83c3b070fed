use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::Mutex;
use tracing::debug;

use crate::errors::StoreError;
use crate::model::Scenario;

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence backend holding the full scenario list.
#[async_trait]
pub trait ScenarioStore: Send + Sync {
    async fn load_all(&self) -> StoreResult<Vec<Scenario>>;
    async fn append(&self, scenario: Scenario) -> StoreResult<()>;
    async fn replace_all(&self, scenarios: Vec<Scenario>) -> StoreResult<()>;
}

#[derive(Default)]
pub struct InMemoryScenarioStore {
    inner: RwLock<Vec<Scenario>>,
}

impl InMemoryScenarioStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ScenarioStore for InMemoryScenarioStore {
    async fn load_all(&self) -> StoreResult<Vec<Scenario>> {
        Ok(self.inner.read().clone())
    }

    async fn append(&self, scenario: Scenario) -> StoreResult<()> {
        self.inner.write().push(scenario);
        Ok(())
    }

    async fn replace_all(&self, scenarios: Vec<Scenario>) -> StoreResult<()> {
        *self.inner.write() = scenarios;
        Ok(())
    }
}

/// Stores the list as one pretty-printed JSON array.
///
/// Writes go to a sibling temp file which is then renamed over the target.
pub struct JsonFileScenarioStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileScenarioStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read(&self) -> StoreResult<Vec<Scenario>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(Vec::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(err) => Err(err.into()),
        }
    }

    async fn write(&self, scenarios: &[Scenario]) -> StoreResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let body = serde_json::to_vec_pretty(scenarios)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, body).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        debug!(path = %self.path.display(), count = scenarios.len(), "scenarios written");
        Ok(())
    }
}

#[async_trait]
impl ScenarioStore for JsonFileScenarioStore {
    async fn load_all(&self) -> StoreResult<Vec<Scenario>> {
        let _guard = self.write_lock.lock().await;
        self.read().await
    }

    async fn append(&self, scenario: Scenario) -> StoreResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut all = self.read().await?;
        all.push(scenario);
        self.write(&all).await
    }

    async fn replace_all(&self, scenarios: Vec<Scenario>) -> StoreResult<()> {
        let _guard = self.write_lock.lock().await;
        self.write(&scenarios).await
    }
}
