use mongodb::{
    bson::doc,
    error::Error as DbError,
    options::{FindOneAndUpdateOptions, ReturnDocument},
};
use serde::{Deserialize, Serialize};

use super::Coll;

/// A counter object used to implement auto-increment fields.
///
/// There is one counter per entity collection, keyed by the collection name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Counter {
    #[serde(rename = "_id")]
    pub id: String,
    pub next: u32,
}

impl Counter {
    /// Atomically retrieve the next value of the named counter, creating it
    /// if needed. Values start at 1.
    ///
    /// Returns `None` only if the server failed to honour the upsert.
    pub async fn next(counters: &Coll<Counter>, name: &str) -> Result<Option<u32>, DbError> {
        let update = doc! {
            "$inc": { "next": 1 }
        };
        let options = FindOneAndUpdateOptions::builder()
            .upsert(true)
            .return_document(ReturnDocument::After)
            .build();
        let counter = counters
            .find_one_and_update(doc! {"_id": name}, update, options)
            .await?;
        Ok(counter.map(|counter| counter.next))
    }
}
