use serde::Serialize;
use serde_json::Value;

/// Occupancy record accepted by the registro endpoint.
///
/// Values are carried as raw JSON so whatever the kit published reaches the
/// API unchanged. Fields missing from the inbound payload are left out of
/// the outbound body instead of being sent as `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RegistroPersonas {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fecha: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hora: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub numero_personas: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lugar: Option<Value>,
    #[serde(rename = "idKit", skip_serializing_if = "Option::is_none")]
    pub id_kit: Option<Value>,
}

impl RegistroPersonas {
    /// Parses a raw message body; any key beyond the five is dropped.
    ///
    /// Invalid JSON and `null` are rejected. Any other non-object value
    /// (number, string, array, boolean) carries none of the fields and
    /// yields an empty record.
    pub fn from_payload(payload: &[u8]) -> Result<Self, PayloadError> {
        let mut object = match serde_json::from_slice::<Value>(payload)? {
            Value::Object(object) => object,
            Value::Null => return Err(PayloadError::Null),
            _ => return Ok(Self::default()),
        };

        Ok(Self {
            fecha: object.remove("fecha"),
            hora: object.remove("hora"),
            numero_personas: object.remove("numero_personas"),
            lugar: object.remove("lugar"),
            id_kit: object.remove("idKit"),
        })
    }

    pub fn id_kit(&self) -> Option<&Value> {
        self.id_kit.as_ref()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("payload is JSON null")]
    Null,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_maps_exactly_five_fields() {
        let payload = br#"{"fecha":"2024-01-01","hora":"08:00","numero_personas":3,"lugar":"Lab","idKit":"K1","bateria":87}"#;
        let record = RegistroPersonas::from_payload(payload).unwrap();

        let body = serde_json::to_value(&record).unwrap();
        assert_eq!(
            body,
            json!({
                "fecha": "2024-01-01",
                "hora": "08:00",
                "numero_personas": 3,
                "lugar": "Lab",
                "idKit": "K1"
            })
        );
    }

    #[test]
    fn test_values_copied_verbatim() {
        let payload = br#"{"fecha":20240101,"hora":null,"numero_personas":"tres","lugar":{"piso":2},"idKit":[1,2]}"#;
        let record = RegistroPersonas::from_payload(payload).unwrap();

        assert_eq!(record.fecha, Some(json!(20240101)));
        assert_eq!(record.numero_personas, Some(json!("tres")));
        assert_eq!(record.lugar, Some(json!({"piso": 2})));
        assert_eq!(record.id_kit(), Some(&json!([1, 2])));
    }

    #[test]
    fn test_missing_fields_omitted() {
        let record = RegistroPersonas::from_payload(br#"{"idKit":"K9"}"#).unwrap();
        let body = serde_json::to_value(&record).unwrap();
        assert_eq!(body, json!({"idKit": "K9"}));
    }

    #[test]
    fn test_rejects_invalid_json() {
        assert!(RegistroPersonas::from_payload(b"{fecha: 2024").is_err());
        assert!(RegistroPersonas::from_payload(b"").is_err());
    }

    #[test]
    fn test_rejects_null() {
        let err = RegistroPersonas::from_payload(b"null").unwrap_err();
        assert!(matches!(err, PayloadError::Null));
    }

    #[test]
    fn test_non_object_json_yields_empty_record() {
        let payloads: [&[u8]; 4] = [b"42", b"\"hola\"", b"[1,2]", b"true"];
        for payload in payloads {
            let record = RegistroPersonas::from_payload(payload).unwrap();
            assert_eq!(record, RegistroPersonas::default());
            assert_eq!(serde_json::to_value(&record).unwrap(), json!({}));
        }
    }
}
