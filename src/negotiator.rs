//! Schema negotiation
//!
//! [`SchemaNegotiator::ensure_schema`] makes sure a subject's latest registered
//! schema matches a local definition:
//!
//! 1. when the subject has no schema, it creates one;
//! 2. when the latest schema differs structurally, it registers the local
//!    definition as a new version;
//! 3. when the latest schema is structurally equal, it reuses it without any
//!    write.
//!
//! Concurrent calls for the same subject are not serialised; the registry
//! decides the final id and version for racing registrations.

use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::document::SchemaDocument;
use crate::error::{RegistryError, Result, SchemaError, SpecOrigin};
use crate::registry::{RegisteredSchema, RegistryBackend};
use crate::schema::Schema;

/// Subject name for a topic's record values
pub fn value_subject(topic: &str) -> String {
    format!("{topic}-value")
}

/// Resolves local schema definitions against a registry
#[derive(Debug)]
pub struct SchemaNegotiator<B> {
    backend: B,
    cancel: CancellationToken,
}

impl<B: RegistryBackend> SchemaNegotiator<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            cancel: CancellationToken::new(),
        }
    }

    /// Abort in-flight registry calls when `cancel` fires
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Resolve `spec` under `subject`, registering it if needed.
    ///
    /// A registry not-found outcome leads to creation; every other failure
    /// reading the latest schema is returned without attempting to create.
    pub async fn ensure_schema(&self, subject: &str, spec: &str) -> Result<Schema> {
        if subject.trim().is_empty() {
            return Err(SchemaError::InvalidSubject(subject.to_string()));
        }
        let local = SchemaDocument::parse(spec, subject, SpecOrigin::Local)?;

        let latest = match self
            .guarded("fetch latest schema", subject, self.backend.fetch_latest(subject))
            .await
        {
            Ok(latest) => latest,
            Err(RegistryError::NotFound { .. }) => {
                tracing::info!(
                    subject,
                    fingerprint = local.fingerprint().short(),
                    "creating new schema"
                );
                return self.create(subject, spec, local).await;
            }
            Err(e) => return Err(e.into()),
        };

        let registered = SchemaDocument::parse(&latest.schema, subject, SpecOrigin::Registry)?;
        if registered.is_structurally_equal(&local) {
            tracing::info!(
                subject,
                id = %latest.id,
                version = latest.version,
                "using existing schema"
            );
            return Ok(Schema::new(latest.subject, latest.id, latest.version, registered));
        }

        tracing::info!(
            subject,
            current_id = %latest.id,
            current_version = latest.version,
            fingerprint = local.fingerprint().short(),
            "updating schema"
        );
        self.create(subject, spec, local).await
    }

    async fn create(&self, subject: &str, spec: &str, local: SchemaDocument) -> Result<Schema> {
        let created: RegisteredSchema = self
            .guarded("create schema", subject, self.backend.create(subject, spec))
            .await?;
        tracing::info!(subject, id = %created.id, version = created.version, "schema registered");
        Ok(Schema::new(created.subject, created.id, created.version, local))
    }

    /// Race a registry call against cancellation
    async fn guarded<T>(
        &self,
        operation: &'static str,
        subject: &str,
        call: impl Future<Output = std::result::Result<T, RegistryError>>,
    ) -> std::result::Result<T, RegistryError> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(RegistryError::Cancelled {
                operation,
                subject: subject.to_string(),
            }),
            result = call => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::MemoryRegistry;

    const SPEC: &str = r#"{"type":"record","name":"T","fields":[{"name":"a","type":"int"}]}"#;

    #[test]
    fn test_value_subject() {
        assert_eq!(value_subject("config_set"), "config_set-value");
    }

    #[tokio::test]
    async fn test_empty_subject_is_rejected_before_network() {
        let negotiator = SchemaNegotiator::new(MemoryRegistry::new());
        let err = negotiator.ensure_schema("  ", SPEC).await.unwrap_err();
        assert!(matches!(err, SchemaError::InvalidSubject(_)));
        assert_eq!(negotiator.backend().fetch_calls(), 0);
    }

    #[tokio::test]
    async fn test_invalid_spec_is_rejected_before_network() {
        let negotiator = SchemaNegotiator::new(MemoryRegistry::new());
        let err = negotiator.ensure_schema("t-value", "{\"type\":").await.unwrap_err();
        assert!(matches!(err, SchemaError::SpecParse { origin: SpecOrigin::Local, .. }));
        assert_eq!(negotiator.backend().fetch_calls(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_negotiation_issues_no_create() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let negotiator = SchemaNegotiator::new(MemoryRegistry::new()).with_cancellation(cancel);

        let err = negotiator.ensure_schema("t-value", SPEC).await.unwrap_err();
        assert!(matches!(err, SchemaError::Registry(RegistryError::Cancelled { .. })));
        assert_eq!(negotiator.backend().create_calls(), 0);
    }
}
