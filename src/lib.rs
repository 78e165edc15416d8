//! Monitoring Schemas
//!
//! Schema negotiation against a remote registry and schema-tagged Avro wire
//! envelopes for the records a monitor publishes.
//!
//! ## Features
//!
//! - **Idempotent negotiation**: a subject only gets a new version when its
//!   schema changed structurally
//! - **Structural comparison**: key order and whitespace never trigger a new version
//! - **Tagged envelopes**: every payload carries the id of the schema that wrote it
//! - **Pluggable registry**: HTTP client for Confluent-compatible registries, or
//!   an in-memory backend for tests
//!
//! ## Flow
//!
//! ```text
//! caller ──ensure_schema(subject, spec)──▶ SchemaNegotiator
//!                                            │ fetch_latest
//!                                            │ [compare documents]
//!                                            │ create (only on change)
//!                                            ▼
//!                                         Schema ──encode / decode──▶ envelope
//! ```
//!
//! ## Envelope
//!
//! ```text
//! [0x00][schema id: u32 big-endian][avro binary payload]
//! ```

pub mod codec;
pub mod config;
pub mod document;
pub mod envelope;
pub mod error;
pub mod fingerprint;
pub mod negotiator;
pub mod registry;
pub mod schema;

pub use codec::{SchemaCache, SchemaResolver};
pub use config::{RegistryConfig, SchemasConfig};
pub use document::SchemaDocument;
pub use error::{RegistryError, Result, SchemaError, SpecOrigin};
pub use fingerprint::Fingerprint;
pub use negotiator::{value_subject, SchemaNegotiator};
pub use registry::{HttpRegistryClient, MemoryRegistry, RegisteredSchema, RegistryBackend};
pub use schema::{Schema, SchemaId, TypedCodec};
