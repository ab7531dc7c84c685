//! Type-tagged envelope for heterogeneous records.
//!
//! The payload is kept as a structural JSON object rather than opaque bytes
//! so rows stay inspectable in the backing store.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::StoreError;
use crate::model::Record;

/// A record packed together with the name of its type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "@type")]
    pub type_tag: String,
    pub payload: Value,
}

impl Envelope {
    /// Whether this envelope holds a `T`.
    pub fn is<T: Record>(&self) -> bool {
        self.type_tag == T::type_tag()
    }
}

/// Pack a record into an envelope.
///
/// Records must encode to a JSON object; anything else is not record-like
/// and is rejected.
pub fn pack<T: Record>(record: &T) -> Result<Envelope, StoreError> {
    let payload = serde_json::to_value(record).map_err(|e| {
        StoreError::Validation(format!("cannot encode {}: {e}", T::type_tag()))
    })?;
    if !payload.is_object() {
        return Err(StoreError::Validation(format!(
            "{} does not encode to a structured object",
            T::type_tag()
        )));
    }
    Ok(Envelope {
        type_tag: T::type_tag(),
        payload,
    })
}

/// Unpack an envelope as a `T`.
///
/// The stored type tag is checked before any field is decoded, so a
/// payload of another type never yields a partially populated value.
pub fn unpack<T: Record>(envelope: &Envelope) -> Result<T, StoreError> {
    if !envelope.is::<T>() {
        return Err(StoreError::TypeMismatch {
            expected: T::type_tag(),
            found: envelope.type_tag.clone(),
        });
    }
    T::deserialize(&envelope.payload).map_err(|e| StoreError::TypeMismatch {
        expected: T::type_tag(),
        found: format!("{} with incompatible fields ({e})", envelope.type_tag),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::Endpoint;
    use serde_json::json;

    #[derive(Debug, Serialize, Deserialize)]
    struct Tunnel {
        port: u16,
        owner: String,
        #[serde(default)]
        tags: Vec<String>,
    }

    impl Record for Tunnel {
        const NAME: &'static str = "Tunnel";
        const PACKAGE: &'static str = "bifrost.v1";

        fn owner(&self) -> &str {
            &self.owner
        }

        fn tags_mut(&mut self) -> &mut Vec<String> {
            &mut self.tags
        }
    }

    #[derive(Debug, Serialize, Deserialize)]
    struct Bare(String);

    impl Record for Bare {
        const NAME: &'static str = "Bare";
        const PACKAGE: &'static str = "test";

        fn owner(&self) -> &str {
            &self.0
        }

        fn tags_mut(&mut self) -> &mut Vec<String> {
            unreachable!()
        }
    }

    fn endpoint() -> Endpoint {
        Endpoint {
            name: "a".into(),
            owner: "u1".into(),
            tags: vec!["t1".into()],
        }
    }

    #[test]
    fn pack_records_type_and_fields() {
        let envelope = pack(&endpoint()).unwrap();
        assert_eq!(envelope.type_tag, "bifrost.v1.Endpoint");
        assert_eq!(
            envelope.payload,
            json!({"name": "a", "owner": "u1", "tags": ["t1"]})
        );
    }

    #[test]
    fn unpack_restores_record() {
        let original = endpoint();
        let restored: Endpoint = unpack(&pack(&original).unwrap()).unwrap();
        assert_eq!(restored, original);
    }

    #[test]
    fn wrong_type_tag_is_mismatch() {
        let envelope = pack(&endpoint()).unwrap();
        let err = unpack::<Tunnel>(&envelope).unwrap_err();
        assert!(matches!(
            err,
            StoreError::TypeMismatch { ref expected, ref found }
                if expected == "bifrost.v1.Tunnel" && found == "bifrost.v1.Endpoint"
        ));
    }

    #[test]
    fn incompatible_payload_is_mismatch() {
        let envelope = Envelope {
            type_tag: Tunnel::type_tag(),
            payload: json!({"port": "not a number", "owner": "u1"}),
        };
        assert!(matches!(
            unpack::<Tunnel>(&envelope),
            Err(StoreError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn non_object_payload_is_rejected() {
        assert!(matches!(
            pack(&Bare("u1".into())),
            Err(StoreError::Validation(_))
        ));
    }

    #[test]
    fn envelope_json_shape() {
        let envelope = pack(&endpoint()).unwrap();
        let text = serde_json::to_string(&envelope).unwrap();
        assert!(text.starts_with(r#"{"@type":"bifrost.v1.Endpoint""#));
        assert_eq!(serde_json::from_str::<Envelope>(&text).unwrap(), envelope);
    }
}
