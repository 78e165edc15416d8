//! Wire envelope tests
//!
//! The envelope layout is the contract with downstream consumers and must
//! stay byte-exact.

use monitoring_schemas::envelope::{self, HEADER_LEN, MAGIC_BYTE};
use monitoring_schemas::{
    MemoryRegistry, Schema, SchemaCache, SchemaDocument, SchemaError, SchemaId, SchemaNegotiator,
    SpecOrigin,
};
use serde::{Deserialize, Serialize};

const TRANSMISSION: &str = include_str!("fixtures/transmission.avsc");
const TRANSMISSION_V2: &str = include_str!("fixtures/transmission_v2.avsc");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Transmission {
    feed_id: String,
    round_id: i32,
    answer: i64,
    observed_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct TransmissionV2 {
    feed_id: String,
    round_id: i32,
    answer: i64,
    observed_at: i64,
    transmitter: Option<String>,
}

fn schema(spec: &str, id: u32, version: u32) -> Schema {
    let doc = SchemaDocument::parse(spec, "transmission-value", SpecOrigin::Local).unwrap();
    Schema::new("transmission-value", SchemaId(id), version, doc)
}

fn sample() -> Transmission {
    Transmission {
        feed_id: "SOL/USD".to_string(),
        round_id: 1,
        answer: 2_150_000_000,
        observed_at: 1_700_000_123,
    }
}

// =============================================================================
// Layout
// =============================================================================

#[test]
fn test_header_for_schema_id_seven() {
    let bytes = schema(TRANSMISSION, 7, 1).encode(&sample()).unwrap();
    assert_eq!(&bytes[..HEADER_LEN], &[0x00, 0x00, 0x00, 0x00, 0x07]);
}

#[test]
fn test_large_schema_id_is_big_endian() {
    let bytes = schema(TRANSMISSION, 0x0102_0304, 1).encode(&sample()).unwrap();
    assert_eq!(bytes[0], MAGIC_BYTE);
    assert_eq!(&bytes[1..HEADER_LEN], &[0x01, 0x02, 0x03, 0x04]);
    assert_eq!(envelope::peek_id(&bytes).unwrap(), SchemaId(0x0102_0304));
}

#[test]
fn test_payload_is_plain_avro_datum() {
    let schema = schema(TRANSMISSION, 1, 1);
    let bytes = schema.encode(&sample()).unwrap();

    let value = apache_avro::to_value(sample()).unwrap();
    let expected = apache_avro::to_avro_datum(schema.document().avro(), value).unwrap();
    assert_eq!(&bytes[HEADER_LEN..], expected.as_slice());
}

// =============================================================================
// Validation
// =============================================================================

#[test]
fn test_three_byte_input_is_format_error() {
    let err = schema(TRANSMISSION, 7, 1).decode::<Transmission>(&[0x00, 0x00, 0x00]).unwrap_err();
    assert!(matches!(err, SchemaError::Format { length: 3, .. }));
}

#[test]
fn test_wrong_marker_is_format_error() {
    let schema = schema(TRANSMISSION, 7, 1);
    let mut bytes = schema.encode(&sample()).unwrap();
    bytes[0] = 0x01;
    let err = schema.decode::<Transmission>(&bytes).unwrap_err();
    assert!(matches!(err, SchemaError::Format { .. }));
}

#[test]
fn test_empty_input_is_format_error() {
    let cache = SchemaCache::new();
    let err = cache.decode::<Transmission>(&[]).unwrap_err();
    assert!(matches!(err, SchemaError::Format { length: 0, .. }));
}

#[test]
fn test_unresolvable_id_is_unknown_schema() {
    let cache: SchemaCache = std::iter::once(schema(TRANSMISSION, 1, 1)).collect();
    let bytes = schema(TRANSMISSION, 2, 2).encode(&sample()).unwrap();
    let err = cache.decode::<Transmission>(&bytes).unwrap_err();
    assert!(matches!(err, SchemaError::UnknownSchema { id: SchemaId(2) }));
}

// =============================================================================
// Evolution
// =============================================================================

#[tokio::test]
async fn test_consumer_decodes_every_negotiated_version() {
    let negotiator = SchemaNegotiator::new(MemoryRegistry::new());
    let v1 = negotiator.ensure_schema("transmission-value", TRANSMISSION).await.unwrap();
    let v2 = negotiator.ensure_schema("transmission-value", TRANSMISSION_V2).await.unwrap();

    let old = v1.encode(&sample()).unwrap();
    let new = v2
        .encode(&TransmissionV2 {
            feed_id: "SOL/USD".to_string(),
            round_id: 2,
            answer: 2_160_000_000,
            observed_at: 1_700_000_456,
            transmitter: Some("9xQe".to_string()),
        })
        .unwrap();

    let cache: SchemaCache = vec![v1, v2].into_iter().collect();

    assert_eq!(cache.decode::<Transmission>(&old).unwrap(), sample());
    let decoded: TransmissionV2 = cache.decode(&new).unwrap();
    assert_eq!(decoded.round_id, 2);
    assert_eq!(decoded.transmitter.as_deref(), Some("9xQe"));
}

#[test]
fn test_optional_field_round_trips_as_none() {
    let schema = schema(TRANSMISSION_V2, 3, 2);
    let value = TransmissionV2 {
        feed_id: "BTC/USD".to_string(),
        round_id: 9,
        answer: 4_200_000_000_000,
        observed_at: 1_700_000_999,
        transmitter: None,
    };
    let bytes = schema.encode(&value).unwrap();
    assert_eq!(schema.decode::<TransmissionV2>(&bytes).unwrap(), value);
}
