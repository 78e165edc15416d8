//! In-process registry backend.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::document::SchemaDocument;
use crate::error::{RegistryError, SpecOrigin};
use crate::schema::SchemaId;

use super::{RegisteredSchema, RegistryBackend};

/// Registry error code for a document the registry refuses to parse
const INVALID_SCHEMA: u32 = 42201;
/// Registry error code for a lookup that matches no version
const SCHEMA_NOT_FOUND: u32 = 40403;

#[derive(Debug, Default)]
struct MemoryState {
    subjects: HashMap<String, Vec<(RegisteredSchema, SchemaDocument)>>,
    next_id: u32,
}

/// Registry held entirely in memory.
///
/// Ids are global across subjects and allocated from 1; versions start at 1
/// per subject. Registering a document that is structurally equal to one the
/// subject already holds returns the existing entry.
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    state: Mutex<MemoryState>,
    fetch_calls: AtomicUsize,
    create_calls: AtomicUsize,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of `fetch_latest` calls served
    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    /// Number of `create` calls served
    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    /// All versions registered under a subject, oldest first
    pub fn versions(&self, subject: &str) -> Vec<RegisteredSchema> {
        self.state()
            .subjects
            .get(subject)
            .map(|versions| versions.iter().map(|(s, _)| s.clone()).collect())
            .unwrap_or_default()
    }

    /// Find a schema by id across all subjects
    pub fn get_by_id(&self, id: SchemaId) -> Option<RegisteredSchema> {
        self.state()
            .subjects
            .values()
            .flatten()
            .find(|(s, _)| s.id == id)
            .map(|(s, _)| s.clone())
    }

    /// Latest version of a subject
    pub fn latest(&self, subject: &str) -> Result<RegisteredSchema, RegistryError> {
        self.state()
            .subjects
            .get(subject)
            .and_then(|versions| versions.last())
            .map(|(s, _)| s.clone())
            .ok_or_else(|| RegistryError::NotFound {
                subject: subject.to_owned(),
            })
    }

    /// Register a document without counting it as a client call
    pub fn register(&self, subject: &str, spec: &str) -> Result<RegisteredSchema, RegistryError> {
        let document = Self::parse(subject, spec, "create schema")?;
        let mut state = self.state();

        if let Some((existing, _)) = state
            .subjects
            .get(subject)
            .and_then(|versions| versions.iter().find(|(_, doc)| doc == &document))
        {
            return Ok(existing.clone());
        }

        state.next_id += 1;
        let id = SchemaId(state.next_id);
        let versions = state.subjects.entry(subject.to_owned()).or_default();
        let registered = RegisteredSchema {
            subject: subject.to_owned(),
            id,
            version: versions.last().map_or(1, |(s, _)| s.version + 1),
            schema: spec.to_owned(),
        };
        versions.push((registered.clone(), document));
        tracing::debug!(subject, %id, version = registered.version, "registered schema in memory");
        Ok(registered)
    }

    /// Find the version of `subject` that holds a structurally equal document
    pub fn lookup(&self, subject: &str, spec: &str) -> Result<RegisteredSchema, RegistryError> {
        let document = Self::parse(subject, spec, "look up schema version")?;
        let state = self.state();
        let versions = state.subjects.get(subject).ok_or_else(|| RegistryError::NotFound {
            subject: subject.to_owned(),
        })?;
        versions
            .iter()
            .find(|(_, doc)| doc == &document)
            .map(|(s, _)| s.clone())
            .ok_or_else(|| RegistryError::Status {
                operation: "look up schema version",
                subject: subject.to_owned(),
                status: 404,
                error_code: Some(SCHEMA_NOT_FOUND),
                message: "Schema not found".to_owned(),
            })
    }

    fn parse(
        subject: &str,
        spec: &str,
        operation: &'static str,
    ) -> Result<SchemaDocument, RegistryError> {
        SchemaDocument::parse(spec, subject, SpecOrigin::Local).map_err(|e| RegistryError::Status {
            operation,
            subject: subject.to_owned(),
            status: 422,
            error_code: Some(INVALID_SCHEMA),
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl RegistryBackend for MemoryRegistry {
    async fn fetch_latest(&self, subject: &str) -> Result<RegisteredSchema, RegistryError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.latest(subject)
    }

    async fn create(&self, subject: &str, spec: &str) -> Result<RegisteredSchema, RegistryError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.register(subject, spec)
    }
}
