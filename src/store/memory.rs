//! In-process document store on `DashMap`.
//!
//! Per-document atomicity comes from holding the shard guard for the whole
//! read-check-write of [`DocumentStore::patch_if`].

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde_json::{Map, Value};

use crate::error::StoreError;
use crate::model::{DocId, Kind};

use super::{DocumentStore, ID_FIELD, KIND_FIELD, SEQ_FIELD};

/// `DashMap`-backed store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    docs: DashMap<DocId, Map<String, Value>>,
    next_seq: AtomicU64,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }
}

fn reject_reserved(fields: &Map<String, Value>) -> Result<(), StoreError> {
    for key in [ID_FIELD, KIND_FIELD, SEQ_FIELD] {
        if fields.contains_key(key) {
            return Err(StoreError::Backend(format!("cannot patch reserved field '{key}'")));
        }
    }
    Ok(())
}

fn matches(doc: &Map<String, Value>, field: &str, expected: &Value) -> bool {
    doc.get(field).unwrap_or(&Value::Null) == expected
}

fn seq_of(doc: &Map<String, Value>) -> u64 {
    doc.get(SEQ_FIELD).and_then(Value::as_u64).unwrap_or(0)
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, id: &DocId) -> Result<Option<Value>, StoreError> {
        Ok(self.docs.get(id).map(|doc| Value::Object(doc.value().clone())))
    }

    async fn insert(
        &self,
        kind: Kind,
        id: &DocId,
        mut fields: Map<String, Value>,
    ) -> Result<u64, StoreError> {
        match self.docs.entry(id.clone()) {
            Entry::Occupied(_) => Err(StoreError::Duplicate(id.to_string())),
            Entry::Vacant(slot) => {
                let seq = self.next_seq.fetch_add(1, Ordering::SeqCst) + 1;
                fields.insert(ID_FIELD.into(), Value::String(id.to_string()));
                fields.insert(KIND_FIELD.into(), Value::String(kind.as_str().into()));
                fields.insert(SEQ_FIELD.into(), Value::from(seq));
                slot.insert(fields);
                Ok(seq)
            }
        }
    }

    async fn patch(&self, id: &DocId, fields: Map<String, Value>) -> Result<(), StoreError> {
        reject_reserved(&fields)?;
        let mut doc = self
            .docs
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        doc.extend(fields);
        Ok(())
    }

    async fn patch_if(
        &self,
        id: &DocId,
        conditions: &Map<String, Value>,
        fields: Map<String, Value>,
    ) -> Result<bool, StoreError> {
        reject_reserved(&fields)?;
        let mut doc = self
            .docs
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        if !conditions.iter().all(|(k, v)| matches(&doc, k, v)) {
            return Ok(false);
        }
        doc.extend(fields);
        Ok(true)
    }

    async fn delete(&self, id: &DocId) -> Result<bool, StoreError> {
        Ok(self.docs.remove(id).is_some())
    }

    async fn query_by_index(
        &self,
        kind: Kind,
        field: &str,
        value: &Value,
    ) -> Result<Vec<Value>, StoreError> {
        let kind_value = Value::String(kind.as_str().into());
        let mut found: Vec<Map<String, Value>> = self
            .docs
            .iter()
            .filter(|doc| matches(doc, KIND_FIELD, &kind_value) && matches(doc, field, value))
            .map(|doc| doc.value().clone())
            .collect();
        found.sort_by_key(seq_of);
        Ok(found.into_iter().map(Value::Object).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    fn obj(v: Value) -> Map<String, Value> {
        match v {
            Value::Object(m) => m,
            _ => panic!("not an object"),
        }
    }

    #[tokio::test]
    async fn duplicate_insert_is_rejected() {
        let store = MemoryStore::new();
        let id = DocId::from("vote_p_v");
        store.insert(Kind::Vote, &id, obj(json!({"a": 1}))).await.unwrap();
        let err = store
            .insert(Kind::Vote, &id, obj(json!({"a": 2})))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn patch_if_checks_conditions() {
        let store = MemoryStore::new();
        let id = DocId::from("m");
        store
            .insert(Kind::Match, &id, obj(json!({"transitioning": false})))
            .await
            .unwrap();

        let cond = obj(json!({"transitioning": false}));
        assert!(
            store
                .patch_if(&id, &cond, obj(json!({"transitioning": true})))
                .await
                .unwrap()
        );
        assert!(
            !store
                .patch_if(&id, &cond, obj(json!({"transitioning": true})))
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn absent_field_compares_as_null() {
        let store = MemoryStore::new();
        let id = DocId::from("m");
        store.insert(Kind::Match, &id, Map::new()).await.unwrap();
        let cond = obj(json!({"current_prompt_id": null}));
        assert!(store.patch_if(&id, &cond, obj(json!({"x": 1}))).await.unwrap());
    }

    #[tokio::test]
    async fn reserved_fields_cannot_be_patched() {
        let store = MemoryStore::new();
        let id = DocId::from("m");
        store.insert(Kind::Match, &id, Map::new()).await.unwrap();
        let err = store.patch(&id, obj(json!({"_seq": 0}))).await.unwrap_err();
        assert!(matches!(err, StoreError::Backend(_)));
    }

    #[tokio::test]
    async fn patch_unknown_is_not_found() {
        let store = MemoryStore::new();
        let err = store
            .patch(&DocId::from("nope"), obj(json!({"a": 1})))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_guard_has_one_winner() {
        let store = Arc::new(MemoryStore::new());
        let id = DocId::from("m");
        store
            .insert(Kind::Match, &id, obj(json!({"transitioning": false})))
            .await
            .unwrap();

        let mut handles = vec![];
        for _ in 0..16 {
            let s = Arc::clone(&store);
            let id = id.clone();
            handles.push(tokio::spawn(async move {
                let cond = obj(json!({"transitioning": false}));
                s.patch_if(&id, &cond, obj(json!({"transitioning": true})))
                    .await
                    .unwrap()
            }));
        }

        let mut wins = 0;
        for h in handles {
            if h.await.unwrap() {
                wins += 1;
            }
        }
        assert_eq!(wins, 1);
    }

    #[tokio::test]
    async fn delete_reports_existence() {
        let store = MemoryStore::new();
        let id = DocId::from("x");
        store.insert(Kind::Prompt, &id, Map::new()).await.unwrap();
        assert!(store.delete(&id).await.unwrap());
        assert!(!store.delete(&id).await.unwrap());
        assert!(store.is_empty());
    }
}
