use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::dispatch::SessionRecord;
use super::domain::UserId;
use super::scoring::WellnessScore;

/// Slots of per-user state the engine reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreKey {
    WellnessScore,
    Sessions,
    HelperCertification,
}

impl StoreKey {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::WellnessScore => "wellness_score",
            Self::Sessions => "sessions",
            Self::HelperCertification => "helper_certification",
        }
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Durable key-value storage scoped by user identity.
///
/// `append` extends a list value and never rewrites existing elements.
pub trait UserStore: Send + Sync {
    fn get(&self, user: &UserId, key: StoreKey) -> Result<Option<Value>, StoreError>;
    fn set(&self, user: &UserId, key: StoreKey, value: Value) -> Result<(), StoreError>;
    fn append(&self, user: &UserId, key: StoreKey, values: Vec<Value>) -> Result<(), StoreError>;
}

/// Last wellness result for a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WellnessScoreRecord {
    pub score: WellnessScore,
    pub completed_at: DateTime<Utc>,
}

/// Written when a peer-helper applicant passes certification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelperCertificationRecord {
    pub correct: usize,
    pub total: usize,
    pub percentage: u8,
    pub certified_at: DateTime<Utc>,
}

/// Typed accessors over any [`UserStore`].
pub trait UserStoreExt: UserStore {
    fn wellness_score(&self, user: &UserId) -> Result<Option<WellnessScoreRecord>, StoreError> {
        decode_optional(self.get(user, StoreKey::WellnessScore)?)
    }

    fn record_wellness_score(
        &self,
        user: &UserId,
        record: &WellnessScoreRecord,
    ) -> Result<(), StoreError> {
        self.set(user, StoreKey::WellnessScore, serde_json::to_value(record)?)
    }

    fn sessions(&self, user: &UserId) -> Result<Vec<SessionRecord>, StoreError> {
        Ok(decode_optional(self.get(user, StoreKey::Sessions)?)?.unwrap_or_default())
    }

    fn append_sessions(&self, user: &UserId, sessions: &[SessionRecord]) -> Result<(), StoreError> {
        let values = sessions
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()?;
        self.append(user, StoreKey::Sessions, values)
    }

    fn helper_certification(
        &self,
        user: &UserId,
    ) -> Result<Option<HelperCertificationRecord>, StoreError> {
        decode_optional(self.get(user, StoreKey::HelperCertification)?)
    }

    fn record_helper_certification(
        &self,
        user: &UserId,
        record: &HelperCertificationRecord,
    ) -> Result<(), StoreError> {
        self.set(
            user,
            StoreKey::HelperCertification,
            serde_json::to_value(record)?,
        )
    }
}

impl<S: UserStore + ?Sized> UserStoreExt for S {}

fn decode_optional<T: DeserializeOwned>(value: Option<Value>) -> Result<Option<T>, StoreError> {
    value
        .map(serde_json::from_value)
        .transpose()
        .map_err(StoreError::from)
}

type UserEntries = BTreeMap<String, Value>;

fn append_into(
    entries: &mut UserEntries,
    user: &UserId,
    key: StoreKey,
    values: Vec<Value>,
) -> Result<(), StoreError> {
    let slot = entries
        .entry(key.as_str().to_string())
        .or_insert_with(|| Value::Array(Vec::new()));
    match slot {
        Value::Array(items) => {
            items.extend(values);
            Ok(())
        }
        _ => Err(StoreError::NotAList {
            user: user.clone(),
            key,
        }),
    }
}

/// Process-local store. State is lost on restart.
#[derive(Debug, Default, Clone)]
pub struct InMemoryStore {
    entries: Arc<Mutex<HashMap<UserId, UserEntries>>>,
}

impl UserStore for InMemoryStore {
    fn get(&self, user: &UserId, key: StoreKey) -> Result<Option<Value>, StoreError> {
        let guard = self.entries.lock().expect("store mutex poisoned");
        Ok(guard
            .get(user)
            .and_then(|entries| entries.get(key.as_str()))
            .cloned())
    }

    fn set(&self, user: &UserId, key: StoreKey, value: Value) -> Result<(), StoreError> {
        let mut guard = self.entries.lock().expect("store mutex poisoned");
        guard
            .entry(user.clone())
            .or_default()
            .insert(key.as_str().to_string(), value);
        Ok(())
    }

    fn append(&self, user: &UserId, key: StoreKey, values: Vec<Value>) -> Result<(), StoreError> {
        let mut guard = self.entries.lock().expect("store mutex poisoned");
        append_into(guard.entry(user.clone()).or_default(), user, key, values)
    }
}

/// Store persisted as a single JSON document, rewritten on every change.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

type Document = BTreeMap<String, UserEntries>;

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<Document, StoreError> {
        match fs::read(&self.path) {
            Ok(bytes) if bytes.is_empty() => Ok(Document::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Document::new()),
            Err(err) => Err(err.into()),
        }
    }

    fn write(&self, document: &Document) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, serde_json::to_vec_pretty(document)?)?;
        fs::rename(&staging, &self.path)?;
        Ok(())
    }

    fn update<F>(&self, user: &UserId, apply: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut UserEntries) -> Result<(), StoreError>,
    {
        let _guard = self.lock.lock().expect("store file mutex poisoned");
        let mut document = self.read()?;
        apply(document.entry(user.0.clone()).or_default())?;
        self.write(&document)
    }
}

impl UserStore for JsonFileStore {
    fn get(&self, user: &UserId, key: StoreKey) -> Result<Option<Value>, StoreError> {
        let _guard = self.lock.lock().expect("store file mutex poisoned");
        let mut document = self.read()?;
        Ok(document
            .get_mut(&user.0)
            .and_then(|entries| entries.remove(key.as_str())))
    }

    fn set(&self, user: &UserId, key: StoreKey, value: Value) -> Result<(), StoreError> {
        self.update(user, |entries| {
            entries.insert(key.as_str().to_string(), value);
            Ok(())
        })
    }

    fn append(&self, user: &UserId, key: StoreKey, values: Vec<Value>) -> Result<(), StoreError> {
        self.update(user, |entries| append_into(entries, user, key, values))
    }
}

/// Storage failures surfaced to the service.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("stored {key} for user {user} is not a list")]
    NotAList { user: UserId, key: StoreKey },
    #[error("failed to encode or decode stored value: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("store file error: {0}")]
    Io(#[from] std::io::Error),
}
