//! EIP-712 typed-data normalization
//!
//! dApps send `eth_signTypedData_v4` with the payload as a JSON string (some
//! send an object). Normalization produces a canonical
//! `{domain, types, message, primaryType}` envelope whose `types` map no
//! longer contains `EIP712Domain`. The domain separator is still computed
//! from `domain`, so dropping the key changes nothing about the hash.

use crate::error::ParseError;
use alloy::dyn_abi::TypedData;
use alloy::primitives::B256;
use serde_json::{json, Map, Value};
use std::collections::HashSet;

pub const EIP712_DOMAIN_TYPE: &str = "EIP712Domain";

#[derive(Debug, Clone, PartialEq)]
pub struct TypedDataEnvelope {
    pub domain: Value,
    /// Struct definitions without `EIP712Domain`
    pub types: Map<String, Value>,
    pub message: Value,
    pub primary_type: String,
}

/// Normalize the typed-data parameter of a request
pub fn normalize_param(param: &Value) -> Result<TypedDataEnvelope, ParseError> {
    let value = match param {
        Value::String(raw) => serde_json::from_str::<Value>(raw)
            .map_err(|e| ParseError::TypedData(format!("not valid JSON: {e}")))?,
        Value::Object(_) => param.clone(),
        other => {
            return Err(ParseError::TypedData(format!(
                "expected JSON string or object, got {other}"
            )))
        }
    };
    normalize(value)
}

pub fn normalize(value: Value) -> Result<TypedDataEnvelope, ParseError> {
    let Value::Object(mut object) = value else {
        return Err(ParseError::TypedData("typed data must be an object".to_string()));
    };

    let domain = object
        .remove("domain")
        .ok_or_else(|| ParseError::TypedData("missing domain".to_string()))?;
    let message = object
        .remove("message")
        .ok_or_else(|| ParseError::TypedData("missing message".to_string()))?;

    let mut types = match object.remove("types") {
        Some(Value::Object(types)) => types,
        Some(_) => return Err(ParseError::TypedData("types must be an object".to_string())),
        None => return Err(ParseError::TypedData("missing types".to_string())),
    };
    types.remove(EIP712_DOMAIN_TYPE);

    let primary_type = match object.remove("primaryType") {
        Some(Value::String(primary)) => primary,
        Some(_) => {
            return Err(ParseError::TypedData(
                "primaryType must be a string".to_string(),
            ))
        }
        None => infer_primary_type(&types)?,
    };

    if !types.contains_key(&primary_type) {
        return Err(ParseError::TypedData(format!(
            "primaryType {primary_type} has no type definition"
        )));
    }

    Ok(TypedDataEnvelope {
        domain,
        types,
        message,
        primary_type,
    })
}

/// The primary type is the one struct no other struct refers to
fn infer_primary_type(types: &Map<String, Value>) -> Result<String, ParseError> {
    let mut referenced = HashSet::new();
    for fields in types.values() {
        let Some(fields) = fields.as_array() else {
            continue;
        };
        for field in fields {
            if let Some(ty) = field.get("type").and_then(Value::as_str) {
                let base = ty.split('[').next().unwrap_or(ty);
                referenced.insert(base.to_string());
            }
        }
    }

    let mut candidates = types.keys().filter(|name| !referenced.contains(*name));
    match (candidates.next(), candidates.next()) {
        (Some(primary), None) => Ok(primary.clone()),
        (None, _) => Err(ParseError::TypedData(
            "cannot infer primaryType: every type is referenced".to_string(),
        )),
        (Some(_), Some(_)) => Err(ParseError::TypedData(
            "cannot infer primaryType: more than one root type".to_string(),
        )),
    }
}

impl TypedDataEnvelope {
    /// Canonical JSON form, as sent to a signer
    pub fn to_value(&self) -> Value {
        json!({
            "domain": self.domain,
            "types": self.types,
            "message": self.message,
            "primaryType": self.primary_type,
        })
    }

    pub fn to_typed_data(&self) -> Result<TypedData, ParseError> {
        serde_json::from_value(self.to_value()).map_err(|e| ParseError::TypedData(e.to_string()))
    }

    /// `keccak256("\x19\x01" ‖ domainSeparator ‖ hashStruct(message))`
    pub fn signing_hash(&self) -> Result<B256, ParseError> {
        self.to_typed_data()?
            .eip712_signing_hash()
            .map_err(|e| ParseError::TypedData(e.to_string()))
    }

    pub fn domain_separator(&self) -> Result<B256, ParseError> {
        Ok(self.to_typed_data()?.domain.separator())
    }

    pub fn struct_hash(&self) -> Result<B256, ParseError> {
        self.to_typed_data()?
            .hash_struct()
            .map_err(|e| ParseError::TypedData(e.to_string()))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use alloy::primitives::b256;

    /// The `Mail` example from EIP-712
    pub(crate) fn mail_typed_data() -> Value {
        json!({
            "types": {
                "EIP712Domain": [
                    { "name": "name", "type": "string" },
                    { "name": "version", "type": "string" },
                    { "name": "chainId", "type": "uint256" },
                    { "name": "verifyingContract", "type": "address" }
                ],
                "Person": [
                    { "name": "name", "type": "string" },
                    { "name": "wallet", "type": "address" }
                ],
                "Mail": [
                    { "name": "from", "type": "Person" },
                    { "name": "to", "type": "Person" },
                    { "name": "contents", "type": "string" }
                ]
            },
            "primaryType": "Mail",
            "domain": {
                "name": "Ether Mail",
                "version": "1",
                "chainId": 1,
                "verifyingContract": "0xCcCCccccCCCCcCCCCCCcCcCccCcCCCcCcccccccC"
            },
            "message": {
                "from": { "name": "Cow", "wallet": "0xCD2a3d9F938E13CD947Ec05AbC7FE734Df8DD826" },
                "to": { "name": "Bob", "wallet": "0xbBbBBBBbbBBBbbbBbbBbbbbBBbBbbbbBbBbbBBbB" },
                "contents": "Hello, Bob!"
            }
        })
    }

    #[test]
    fn normalization_drops_domain_type() {
        let envelope = normalize(mail_typed_data()).unwrap();
        assert!(!envelope.types.contains_key(EIP712_DOMAIN_TYPE));
        assert!(envelope.types.contains_key("Mail"));
        assert_eq!(envelope.primary_type, "Mail");
    }

    #[test]
    fn signing_hash_matches_eip712_example() {
        let envelope = normalize(mail_typed_data()).unwrap();
        assert_eq!(
            envelope.domain_separator().unwrap(),
            b256!("f2cee375fa42b42143804025fc449deafd50cc031ca257e0b194a650a912090f")
        );
        assert_eq!(
            envelope.struct_hash().unwrap(),
            b256!("c52c0ee5d84264471806290a3f2c4cecfc5490626bf912d01f240d7a274b371e")
        );
        assert_eq!(
            envelope.signing_hash().unwrap(),
            b256!("be609aee343fb3c4b28e1df9e632fca64fcfaede20f02e86244efddf30957bd2")
        );
    }

    #[test]
    fn string_param_is_parsed() {
        let param = Value::String(mail_typed_data().to_string());
        let envelope = normalize_param(&param).unwrap();
        assert_eq!(envelope.primary_type, "Mail");
    }

    #[test]
    fn primary_type_is_inferred_when_missing() {
        let mut value = mail_typed_data();
        value.as_object_mut().unwrap().remove("primaryType");
        let envelope = normalize(value).unwrap();
        assert_eq!(envelope.primary_type, "Mail");
    }

    #[test]
    fn ambiguous_root_is_rejected() {
        let value = json!({
            "types": {
                "A": [{ "name": "x", "type": "uint256" }],
                "B": [{ "name": "y", "type": "uint256" }]
            },
            "domain": {},
            "message": {}
        });
        assert!(matches!(normalize(value), Err(ParseError::TypedData(_))));
    }

    #[test]
    fn garbage_param_is_rejected() {
        let err = normalize_param(&Value::String("{not json".to_string())).unwrap_err();
        assert!(matches!(err, ParseError::TypedData(_)));
        assert!(normalize_param(&json!(42)).is_err());
    }
}
