//! Registry clients
//!
//! [`RegistryBackend`] is the seam between schema negotiation and the
//! authoritative registry store. [`HttpRegistryClient`] talks to a
//! Confluent-compatible REST API; [`MemoryRegistry`] keeps everything in
//! process for tests and local runs.

mod http;
mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::document::SchemaDocument;
use crate::error::{RegistryError, Result, SpecOrigin};
use crate::schema::{Schema, SchemaId};

pub use http::HttpRegistryClient;
pub use memory::MemoryRegistry;

/// A schema version as the registry reports it, document still unparsed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredSchema {
    pub subject: String,
    pub id: SchemaId,
    pub version: u32,
    /// Schema definition text
    pub schema: String,
}

impl RegisteredSchema {
    /// Parse the document and produce a usable [`Schema`]
    pub fn into_schema(self) -> Result<Schema> {
        let document = SchemaDocument::parse(&self.schema, &self.subject, SpecOrigin::Registry)?;
        Ok(Schema::new(self.subject, self.id, self.version, document))
    }
}

/// Network operations against the authoritative registry.
///
/// Implementations hold no per-call mutable state and are shared across
/// concurrent negotiations.
#[async_trait]
pub trait RegistryBackend: Send + Sync {
    /// Fetch the latest schema version for a subject.
    ///
    /// Must return [`RegistryError::NotFound`] when the subject has no
    /// registered schema, and only then.
    async fn fetch_latest(
        &self,
        subject: &str,
    ) -> std::result::Result<RegisteredSchema, RegistryError>;

    /// Register `spec` under `subject`.
    ///
    /// The registry allocates the id and version; registering a document the
    /// subject already holds returns the existing entry.
    async fn create(
        &self,
        subject: &str,
        spec: &str,
    ) -> std::result::Result<RegisteredSchema, RegistryError>;
}

#[async_trait]
impl<B: RegistryBackend + ?Sized> RegistryBackend for Arc<B> {
    async fn fetch_latest(
        &self,
        subject: &str,
    ) -> std::result::Result<RegisteredSchema, RegistryError> {
        (**self).fetch_latest(subject).await
    }

    async fn create(
        &self,
        subject: &str,
        spec: &str,
    ) -> std::result::Result<RegisteredSchema, RegistryError> {
        (**self).create(subject, spec).await
    }
}
