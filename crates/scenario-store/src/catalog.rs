//! User-facing scenario operations over a [`ScenarioStore`] backend

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::Utc;
use domreplay_core_types::ScenarioId;
use serde::Deserialize;
use tracing::info;

use crate::api::{ScenarioStore, StoreResult};
use crate::errors::{StoreError, StoreErrorKind};
use crate::model::{Action, Scenario};

pub const COPY_SUFFIX: &str = " (copy)";

/// Edit applied by [`ScenarioCatalog::edit`].
///
/// Delay and removal indices refer to positions before the edit.
#[derive(Debug, Clone, Default)]
pub struct ScenarioEdit {
    pub name: Option<String>,
    pub delays: BTreeMap<usize, u64>,
    pub removed: BTreeSet<usize>,
}

impl ScenarioEdit {
    pub fn rename(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn set_delay(mut self, index: usize, delay_millis: u64) -> Self {
        self.delays.insert(index, delay_millis);
        self
    }

    pub fn remove(mut self, index: usize) -> Self {
        self.removed.insert(index);
        self
    }
}

/// Import entries keep only their content; identity is reassigned.
#[derive(Deserialize)]
struct ImportedScenario {
    name: String,
    actions: Vec<Action>,
    #[serde(default)]
    url: Option<String>,
}

pub struct ScenarioCatalog {
    store: Arc<dyn ScenarioStore>,
}

impl ScenarioCatalog {
    pub fn new(store: Arc<dyn ScenarioStore>) -> Self {
        Self { store }
    }

    fn validate_name(name: &str) -> StoreResult<String> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(StoreErrorKind::InvalidName.into());
        }
        Ok(trimmed.to_string())
    }

    pub async fn save(
        &self,
        name: &str,
        actions: Vec<Action>,
        url: Option<String>,
    ) -> StoreResult<Scenario> {
        let name = Self::validate_name(name)?;
        if actions.is_empty() {
            return Err(StoreErrorKind::EmptyScenario.into());
        }
        let scenario = Scenario::new(name, actions, url);
        self.store.append(scenario.clone()).await?;
        info!(id = %scenario.id, name = %scenario.name, actions = scenario.actions.len(), "scenario saved");
        Ok(scenario)
    }

    pub async fn list(&self) -> StoreResult<Vec<Scenario>> {
        self.store.load_all().await
    }

    pub async fn get(&self, id: &ScenarioId) -> StoreResult<Scenario> {
        self.store
            .load_all()
            .await?
            .into_iter()
            .find(|s| &s.id == id)
            .ok_or_else(|| not_found(id))
    }

    pub async fn edit(&self, id: &ScenarioId, edit: ScenarioEdit) -> StoreResult<Scenario> {
        let mut all = self.store.load_all().await?;
        let scenario = all
            .iter_mut()
            .find(|s| &s.id == id)
            .ok_or_else(|| not_found(id))?;

        let len = scenario.actions.len();
        if let Some(index) = edit
            .delays
            .keys()
            .chain(edit.removed.iter())
            .find(|i| **i >= len)
        {
            return Err(StoreErrorKind::InvalidEdit(format!(
                "action index {} out of range (scenario has {})",
                index, len
            ))
            .into());
        }
        if edit.removed.len() >= len {
            return Err(StoreErrorKind::EmptyScenario.into());
        }
        let name = edit.name.as_deref().map(Self::validate_name).transpose()?;

        for (index, delay) in &edit.delays {
            scenario.actions[*index].delay_millis = *delay;
        }
        let mut position = 0;
        scenario.actions.retain(|_| {
            let keep = !edit.removed.contains(&position);
            position += 1;
            keep
        });
        if let Some(name) = name {
            scenario.name = name;
        }
        scenario.updated_at = Some(Utc::now());

        let updated = scenario.clone();
        self.store.replace_all(all).await?;
        info!(id = %updated.id, actions = updated.actions.len(), "scenario edited");
        Ok(updated)
    }

    pub async fn duplicate(&self, id: &ScenarioId) -> StoreResult<Scenario> {
        let source = self.get(id).await?;
        let copy = Scenario::new(
            format!("{}{}", source.name, COPY_SUFFIX),
            source.actions,
            source.url,
        );
        self.store.append(copy.clone()).await?;
        info!(source = %id, id = %copy.id, "scenario duplicated");
        Ok(copy)
    }

    pub async fn delete(&self, id: &ScenarioId) -> StoreResult<()> {
        let mut all = self.store.load_all().await?;
        let before = all.len();
        all.retain(|s| &s.id != id);
        if all.len() == before {
            return Err(not_found(id));
        }
        self.store.replace_all(all).await?;
        info!(id = %id, "scenario deleted");
        Ok(())
    }

    /// All scenarios as a pretty-printed JSON array
    pub async fn export_json(&self) -> StoreResult<String> {
        let all = self.store.load_all().await?;
        Ok(serde_json::to_string_pretty(&all)?)
    }

    /// Append every scenario of a JSON array under fresh ids.
    ///
    /// Nothing is stored unless the whole document parses.
    pub async fn import_json(&self, raw: &str) -> StoreResult<Vec<Scenario>> {
        let value: serde_json::Value = serde_json::from_str(raw)
            .map_err(|e| StoreError::new(StoreErrorKind::InvalidImport(e.to_string())))?;
        if !value.is_array() {
            return Err(StoreErrorKind::InvalidImport("expected a JSON array".to_string()).into());
        }
        let entries: Vec<ImportedScenario> = serde_json::from_value(value)
            .map_err(|e| StoreError::new(StoreErrorKind::InvalidImport(e.to_string())))?;

        let imported: Vec<Scenario> = entries
            .into_iter()
            .map(|entry| Scenario::new(entry.name, entry.actions, entry.url))
            .collect();
        let mut all = self.store.load_all().await?;
        all.extend(imported.iter().cloned());
        self.store.replace_all(all).await?;
        info!(count = imported.len(), "scenarios imported");
        Ok(imported)
    }
}

fn not_found(id: &ScenarioId) -> StoreError {
    StoreError::new(StoreErrorKind::ScenarioNotFound(id.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::InMemoryScenarioStore;
    use crate::model::ActionPayload;

    fn catalog() -> ScenarioCatalog {
        ScenarioCatalog::new(Arc::new(InMemoryScenarioStore::new()))
    }

    fn clicks(n: usize) -> Vec<Action> {
        (0..n)
            .map(|i| Action::new(ActionPayload::Click, format!("#b{}", i)).with_timing(0, 100))
            .collect()
    }

    #[tokio::test]
    async fn test_save_rejects_empty_input() {
        let catalog = catalog();
        let err = catalog.save("   ", clicks(1), None).await.unwrap_err();
        assert_eq!(err.kind(), &StoreErrorKind::InvalidName);
        let err = catalog.save("flow", Vec::new(), None).await.unwrap_err();
        assert_eq!(err.kind(), &StoreErrorKind::EmptyScenario);
        assert!(catalog.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_trims_name_and_lists() {
        let catalog = catalog();
        let saved = catalog.save("  login ", clicks(2), None).await.unwrap();
        assert_eq!(saved.name, "login");
        assert_eq!(catalog.get(&saved.id).await.unwrap(), saved);
        assert_eq!(catalog.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_edit_delays_removal_and_name() {
        let catalog = catalog();
        let saved = catalog.save("flow", clicks(3), None).await.unwrap();

        let edit = ScenarioEdit::rename("renamed").set_delay(2, 750).remove(0);
        let updated = catalog.edit(&saved.id, edit).await.unwrap();
        assert_eq!(updated.name, "renamed");
        assert_eq!(updated.actions.len(), 2);
        assert_eq!(updated.actions[0].locator, "#b1");
        assert_eq!(updated.actions[1].delay_millis, 750);
        assert!(updated.updated_at.is_some());
        assert_eq!(catalog.get(&saved.id).await.unwrap(), updated);
    }

    #[tokio::test]
    async fn test_edit_rejects_bad_indices_and_emptying() {
        let catalog = catalog();
        let saved = catalog.save("flow", clicks(2), None).await.unwrap();
        let err = catalog
            .edit(&saved.id, ScenarioEdit::default().set_delay(5, 1))
            .await
            .unwrap_err();
        assert!(matches!(err.kind(), StoreErrorKind::InvalidEdit(_)));

        let err = catalog
            .edit(&saved.id, ScenarioEdit::default().remove(0).remove(1))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), &StoreErrorKind::EmptyScenario);
        assert_eq!(catalog.get(&saved.id).await.unwrap().actions.len(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_and_delete() {
        let catalog = catalog();
        let saved = catalog.save("flow", clicks(1), None).await.unwrap();
        let copy = catalog.duplicate(&saved.id).await.unwrap();
        assert_ne!(copy.id, saved.id);
        assert_eq!(copy.name, "flow (copy)");
        assert_eq!(copy.actions, saved.actions);

        catalog.delete(&saved.id).await.unwrap();
        let remaining = catalog.list().await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, copy.id);

        let err = catalog.delete(&saved.id).await.unwrap_err();
        assert!(matches!(err.kind(), StoreErrorKind::ScenarioNotFound(_)));
    }

    #[tokio::test]
    async fn test_import_assigns_new_identity() {
        let source = catalog();
        let original = source.save("flow", clicks(2), Some("https://a.test/".into())).await.unwrap();
        let exported = source.export_json().await.unwrap();

        let target = catalog();
        let imported = target.import_json(&exported).await.unwrap();
        assert_eq!(imported.len(), 1);
        assert_ne!(imported[0].id, original.id);
        assert_eq!(imported[0].name, "flow");
        assert_eq!(imported[0].actions, original.actions);
        assert_eq!(imported[0].url.as_deref(), Some("https://a.test/"));
    }

    #[tokio::test]
    async fn test_import_requires_array() {
        let catalog = catalog();
        let err = catalog.import_json(r#"{"name": "x"}"#).await.unwrap_err();
        assert!(matches!(err.kind(), StoreErrorKind::InvalidImport(_)));
        let err = catalog.import_json("nope").await.unwrap_err();
        assert!(matches!(err.kind(), StoreErrorKind::InvalidImport(_)));
        let imported = catalog.import_json("[]").await.unwrap();
        assert!(imported.is_empty());
    }
}
