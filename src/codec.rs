//! Avro encoding into schema-tagged wire envelopes
//!
//! Encoding is bound to a single [`Schema`]. Decoding first reads the schema id
//! from the envelope header and resolves it through a [`SchemaResolver`], so a
//! consumer holding several schema versions always decodes with the writer's
//! schema.

use std::collections::HashMap;

use apache_avro::types::Value;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::envelope;
use crate::error::{Result, SchemaError};
use crate::schema::{Schema, SchemaId};

/// Looks up the schema that produced an envelope
pub trait SchemaResolver {
    fn resolve(&self, id: SchemaId) -> Option<&Schema>;
}

/// A single schema only resolves its own id
impl SchemaResolver for Schema {
    fn resolve(&self, id: SchemaId) -> Option<&Schema> {
        (self.id == id).then_some(self)
    }
}

impl SchemaResolver for HashMap<SchemaId, Schema> {
    fn resolve(&self, id: SchemaId) -> Option<&Schema> {
        self.get(&id)
    }
}

/// Encode `value` with `schema` and prepend the envelope header.
///
/// The value is resolved against the schema before any bytes are produced, so
/// a value of the wrong shape fails with [`SchemaError::Encoding`].
pub fn encode<T: Serialize + ?Sized>(schema: &Schema, value: &T) -> Result<Vec<u8>> {
    let avro = schema.document().avro();
    let encoding_err = |reason: String| SchemaError::Encoding {
        subject: schema.subject.clone(),
        id: schema.id,
        reason,
    };

    let value = apache_avro::to_value(value).map_err(|e| encoding_err(e.to_string()))?;
    let value = value.resolve(avro).map_err(|e| encoding_err(e.to_string()))?;
    if !value.validate(avro) {
        return Err(encoding_err("value does not conform to the schema".to_string()));
    }
    let payload = apache_avro::to_avro_datum(avro, value).map_err(|e| encoding_err(e.to_string()))?;

    let mut buf = envelope::with_header(schema.id, payload.len());
    buf.extend_from_slice(&payload);
    Ok(buf)
}

/// Decode an envelope into `T` using the schema its header names
pub fn decode<T, R>(resolver: &R, envelope: &[u8]) -> Result<T>
where
    T: DeserializeOwned,
    R: SchemaResolver + ?Sized,
{
    let (schema, value) = decode_value(resolver, envelope)?;
    apache_avro::from_value::<T>(&value).map_err(|e| SchemaError::Decoding {
        id: schema.id,
        length: envelope.len(),
        reason: e.to_string(),
    })
}

/// Decode an envelope into a generic Avro value, returning the schema used
pub fn decode_value<'r, R>(resolver: &'r R, envelope: &[u8]) -> Result<(&'r Schema, Value)>
where
    R: SchemaResolver + ?Sized,
{
    let (id, payload) = envelope::split(envelope)?;
    let schema = resolver.resolve(id).ok_or(SchemaError::UnknownSchema { id })?;
    let decoding_err = |reason: String| SchemaError::Decoding {
        id,
        length: envelope.len(),
        reason,
    };

    let mut reader = payload;
    let value = apache_avro::from_avro_datum(schema.document().avro(), &mut reader, None)
        .map_err(|e| decoding_err(e.to_string()))?;
    if !reader.is_empty() {
        return Err(decoding_err(format!("{} trailing bytes after payload", reader.len())));
    }
    Ok((schema, value))
}

/// Schemas known to a consumer, keyed by id
#[derive(Debug, Clone, Default)]
pub struct SchemaCache {
    schemas: HashMap<SchemaId, Schema>,
}

impl SchemaCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a schema, returning any schema previously cached under its id
    pub fn insert(&mut self, schema: Schema) -> Option<Schema> {
        self.schemas.insert(schema.id, schema)
    }

    pub fn get(&self, id: SchemaId) -> Option<&Schema> {
        self.schemas.get(&id)
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// Decode an envelope produced with any cached schema
    pub fn decode<T: DeserializeOwned>(&self, envelope: &[u8]) -> Result<T> {
        decode(self, envelope)
    }
}

impl SchemaResolver for SchemaCache {
    fn resolve(&self, id: SchemaId) -> Option<&Schema> {
        self.get(id)
    }
}

impl FromIterator<Schema> for SchemaCache {
    fn from_iter<I: IntoIterator<Item = Schema>>(iter: I) -> Self {
        let mut cache = Self::new();
        for schema in iter {
            cache.insert(schema);
        }
        cache
    }
}
