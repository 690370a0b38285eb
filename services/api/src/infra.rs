use metrics_exporter_prometheus::PrometheusHandle;
use mindhelp::assessment::{InMemoryStore, JsonFileStore, StoreError, StoreKey, UserId, UserStore};
use mindhelp::config::AssessmentConfig;
use serde_json::Value;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Storage backend chosen from configuration at startup.
pub(crate) enum ConfiguredStore {
    Memory(InMemoryStore),
    File(JsonFileStore),
}

impl ConfiguredStore {
    pub(crate) fn from_config(config: &AssessmentConfig) -> Self {
        match &config.store_path {
            Some(path) => Self::File(JsonFileStore::new(path.clone())),
            None => Self::Memory(InMemoryStore::default()),
        }
    }

    pub(crate) fn describe(&self) -> String {
        match self {
            Self::Memory(_) => "in-memory".to_string(),
            Self::File(store) => format!("json file {}", store.path().display()),
        }
    }
}

impl UserStore for ConfiguredStore {
    fn get(&self, user: &UserId, key: StoreKey) -> Result<Option<Value>, StoreError> {
        match self {
            Self::Memory(store) => store.get(user, key),
            Self::File(store) => store.get(user, key),
        }
    }

    fn set(&self, user: &UserId, key: StoreKey, value: Value) -> Result<(), StoreError> {
        match self {
            Self::Memory(store) => store.set(user, key, value),
            Self::File(store) => store.set(user, key, value),
        }
    }

    fn append(&self, user: &UserId, key: StoreKey, values: Vec<Value>) -> Result<(), StoreError> {
        match self {
            Self::Memory(store) => store.append(user, key, values),
            Self::File(store) => store.append(user, key, values),
        }
    }
}
