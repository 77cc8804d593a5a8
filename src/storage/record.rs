use crate::adapter::{DomainObject, Oid, StoreKey, Version};
use crate::core::Result;
use serde::{Deserialize, Serialize};

/// One persisted object as a backing store sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub spec_id: String,
    pub key: String,
    pub version: Version,
    pub state: DomainObject,
}

impl StoredRecord {
    pub fn new(
        spec_id: impl Into<String>,
        key: impl Into<String>,
        version: Version,
        state: DomainObject,
    ) -> Self {
        Self {
            spec_id: spec_id.into(),
            key: key.into(),
            version,
            state,
        }
    }

    pub fn store_key(&self) -> StoreKey {
        StoreKey::new(&self.spec_id, &self.key)
    }

    pub fn oid(&self) -> Result<Oid> {
        Oid::persistent(self.spec_id.clone(), self.key.clone())
    }

    /// Binary form used by key/value stores.
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(rmp_serde::to_vec_named(self)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Ok(rmp_serde::from_slice(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_encode_keeps_state_and_version() {
        let state = DomainObject::from_value(json!({"name": "Ann", "tags": ["a", "b"], "age": 41}))
            .unwrap();
        let record = StoredRecord::new("Customer", "42", Version::initial("alice"), state);

        let decoded = StoredRecord::decode(&record.encode().unwrap()).unwrap();
        assert_eq!(decoded, record);
        assert_eq!(decoded.store_key().to_string(), "Customer|42");
        assert_eq!(decoded.oid().unwrap().to_string(), "Customer@42");
    }
}
