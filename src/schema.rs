//! Registered schema types

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::codec;
use crate::document::SchemaDocument;
use crate::error::Result;

/// Registry-assigned schema identifier, unique across all subjects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemaId(pub u32);

impl SchemaId {
    /// Big-endian bytes as written into the wire envelope
    pub fn to_be_bytes(self) -> [u8; 4] {
        self.0.to_be_bytes()
    }

    pub fn from_be_bytes(bytes: [u8; 4]) -> Self {
        Self(u32::from_be_bytes(bytes))
    }
}

impl fmt::Display for SchemaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for SchemaId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

/// A schema version resolved against the registry.
///
/// Immutable once obtained; clones share the parsed document.
#[derive(Debug, Clone)]
pub struct Schema {
    /// Subject the schema is registered under (e.g. "transmission-value")
    pub subject: String,
    /// Registry-assigned id
    pub id: SchemaId,
    /// Version within the subject, starting at 1
    pub version: u32,
    document: Arc<SchemaDocument>,
}

impl Schema {
    pub fn new(
        subject: impl Into<String>,
        id: SchemaId,
        version: u32,
        document: SchemaDocument,
    ) -> Self {
        Self {
            subject: subject.into(),
            id,
            version,
            document: Arc::new(document),
        }
    }

    /// The parsed schema definition
    pub fn document(&self) -> &SchemaDocument {
        &self.document
    }

    /// Encode a value into a wire envelope tagged with this schema's id
    pub fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>> {
        codec::encode(self, value)
    }

    /// Decode an envelope that must have been produced with this schema
    pub fn decode<T: DeserializeOwned>(&self, envelope: &[u8]) -> Result<T> {
        codec::decode(self, envelope)
    }

    /// Bind this schema to a record type
    pub fn typed<T>(&self) -> TypedCodec<T>
    where
        T: Serialize + DeserializeOwned,
    {
        TypedCodec {
            schema: self.clone(),
            _record: PhantomData,
        }
    }
}

/// A schema bound to the record type it encodes
pub struct TypedCodec<T> {
    schema: Schema,
    _record: PhantomData<fn() -> T>,
}

impl<T> TypedCodec<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn encode(&self, value: &T) -> Result<Vec<u8>> {
        self.schema.encode(value)
    }

    pub fn decode(&self, envelope: &[u8]) -> Result<T> {
        self.schema.decode(envelope)
    }
}

impl<T> Clone for TypedCodec<T> {
    fn clone(&self) -> Self {
        Self {
            schema: self.schema.clone(),
            _record: PhantomData,
        }
    }
}

impl<T> fmt::Debug for TypedCodec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedCodec")
            .field("subject", &self.schema.subject)
            .field("id", &self.schema.id)
            .field("record", &std::any::type_name::<T>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SpecOrigin;

    #[test]
    fn test_schema_id_byte_order() {
        assert_eq!(SchemaId(7).to_be_bytes(), [0, 0, 0, 7]);
        assert_eq!(SchemaId::from_be_bytes([0, 0, 1, 2]), SchemaId(258));
    }

    #[test]
    fn test_clones_share_document() {
        let doc = SchemaDocument::parse(r#""string""#, "s-value", SpecOrigin::Local).unwrap();
        let schema = Schema::new("s-value", SchemaId(1), 1, doc);
        let copy = schema.clone();
        assert!(std::ptr::eq(schema.document(), copy.document()));
        assert_eq!(copy.subject, "s-value");
    }
}
