use std::sync::Arc;

use domreplay_scenario_store::{
    Action, ActionPayload, JsonFileScenarioStore, ScenarioCatalog, ScenarioEdit,
};

fn typing() -> Vec<Action> {
    vec![
        Action::new(ActionPayload::Click, "#email").with_timing(1_000, 0),
        Action::new(
            ActionPayload::Input {
                value: "bob@example.com".to_string(),
                input_type: "email".to_string(),
            },
            "#email",
        )
        .with_timing(1_400, 400),
        Action::new(
            ActionPayload::KeyPress {
                key: "Enter".to_string(),
            },
            "#email",
        )
        .with_timing(1_600, 200),
    ]
}

#[tokio::test]
async fn test_catalog_over_json_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scenarios.json");
    let catalog = ScenarioCatalog::new(Arc::new(JsonFileScenarioStore::new(&path)));

    let saved = catalog
        .save("sign in", typing(), Some("https://app.test/login".to_string()))
        .await
        .unwrap();
    catalog
        .edit(&saved.id, ScenarioEdit::default().set_delay(1, 50))
        .await
        .unwrap();

    let raw = std::fs::read_to_string(&path).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&raw).unwrap();
    let stored = &parsed[0];
    assert_eq!(stored["name"], "sign in");
    assert_eq!(stored["actions"][1]["type"], "input");
    assert_eq!(stored["actions"][1]["delay"], 50);
    assert_eq!(stored["actions"][2]["key"], "Enter");
    assert!(stored["updatedAt"].is_string());

    let reopened = ScenarioCatalog::new(Arc::new(JsonFileScenarioStore::new(&path)));
    let loaded = reopened.get(&saved.id).await.unwrap();
    assert_eq!(loaded.actions.len(), 3);
    assert_eq!(loaded.total_delay_millis(), 250);
}

#[tokio::test]
async fn test_import_of_legacy_export() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = ScenarioCatalog::new(Arc::new(JsonFileScenarioStore::new(
        dir.path().join("scenarios.json"),
    )));
    let legacy = r##"[
        {
            "id": "1700000000000",
            "name": "Checkout",
            "url": "https://shop.test/cart",
            "createdAt": "2024-01-02T03:04:05.000Z",
            "actions": [
                {"type": "checkbox", "selector": "#terms", "checked": true, "delay": -5, "timestamp": 1},
                {"type": "radio", "selector": "input[name=\"ship\"][value=\"fast\"]", "value": "fast", "delay": 300}
            ]
        }
    ]"##;
    let imported = catalog.import_json(legacy).await.unwrap();
    assert_eq!(imported.len(), 1);
    assert_ne!(imported[0].id.as_str(), "1700000000000");
    assert_eq!(imported[0].actions[0].delay_millis, 0);
    assert_eq!(
        imported[0].actions[1].payload,
        ActionPayload::Radio {
            checked: true,
            value: Some("fast".to_string())
        }
    );
    assert_eq!(catalog.list().await.unwrap().len(), 1);
}
