// Typed access to the document collections. Every function takes a
// `&dyn DocumentStore` so the same code runs against Postgres and the
// in-memory store.

pub mod objective;
pub mod recovery;
pub mod streak;

use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::store::{StoreError, StoreResult};

fn decode<T: DeserializeOwned>(collection: &str, id: &str, value: Value) -> StoreResult<T> {
    serde_json::from_value(value).map_err(|source| StoreError::Decode {
        collection: collection.to_string(),
        id: id.to_string(),
        source,
    })
}

fn encode<T: Serialize>(collection: &str, doc: &T) -> StoreResult<Value> {
    serde_json::to_value(doc).map_err(|source| StoreError::Encode {
        collection: collection.to_string(),
        source,
    })
}
