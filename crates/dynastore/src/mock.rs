//! In-memory test double for [`Storage`].
//!
//! [`MockClient`] replays canned rows for registered query access patterns
//! and records every write, so handler tests never need a live table. Rows
//! pass through the same dispatch path as production responses, keeping the
//! three-tier precedence behavior under test too.

use std::any::type_name;
use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::Serialize;
use serde_dynamo::aws_sdk_dynamodb_1::to_item;

use crate::dispatch::dispatch;
use crate::error::{Error, Result};
use crate::keys::Keyer;
use crate::marshal::{primary_key, Storable};
use crate::query::{QueryBuilder, QueryOptions, QueryResult};
use crate::storage::Storage;
use crate::wire::{Item, QueryResponse};

/// Canned storage for handler tests.
#[derive(Default)]
pub struct MockClient {
    queries: Mutex<HashMap<String, Vec<Item>>>,
    errors: Mutex<HashMap<&'static str, Error>>,
    /// Items recorded by `put` and `put_batch`, in call order.
    pub puts: Mutex<Vec<Item>>,
    /// Primary keys recorded by `delete` and `delete_batch`, in call order.
    pub deletes: Mutex<Vec<Item>>,
}

impl MockClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers canned rows for the access pattern `Q`.
    ///
    /// Rows are keyed by the builder's type, so each access pattern gets
    /// its own response regardless of query parameters.
    pub fn on_query<Q, T>(&self, rows: &[T]) -> Result<()>
    where
        Q: QueryBuilder,
        T: Serialize,
    {
        let items = rows
            .iter()
            .map(|row| to_item(row).map_err(|e| Error::Serialization(e.to_string())))
            .collect::<Result<Vec<Item>>>()?;

        self.queries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(type_name::<Q>().to_string(), items);
        Ok(())
    }

    /// Makes `query` fail with the given error.
    pub fn fail_query(&self, err: Error) {
        self.set_error("query", err);
    }

    /// Makes `put` fail with the given error.
    pub fn fail_put(&self, err: Error) {
        self.set_error("put", err);
    }

    /// Makes `put_batch` fail with the given error.
    pub fn fail_put_batch(&self, err: Error) {
        self.set_error("put_batch", err);
    }

    /// Makes `delete` fail with the given error.
    pub fn fail_delete(&self, err: Error) {
        self.set_error("delete", err);
    }

    /// Makes `delete_batch` fail with the given error.
    pub fn fail_delete_batch(&self, err: Error) {
        self.set_error("delete_batch", err);
    }

    fn set_error(&self, op: &'static str, err: Error) {
        self.errors
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(op, err);
    }

    fn injected_error(&self, op: &str) -> Option<Error> {
        self.errors
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(op)
            .cloned()
    }
}

#[async_trait]
impl Storage for MockClient {
    async fn query<Q>(&self, qb: &mut Q, _opts: QueryOptions) -> Result<QueryResult>
    where
        Q: QueryBuilder + Send,
    {
        if let Some(err) = self.injected_error("query") {
            return Err(err);
        }

        let name = type_name::<Q>();
        let items = self
            .queries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(name)
            .cloned()
            .ok_or_else(|| {
                Error::Store(format!(
                    "no mock results registered for {name}; register them with MockClient::on_query"
                ))
            })?;

        let response = QueryResponse {
            count: items.len() as i32,
            items,
            last_evaluated_key: None,
        };

        dispatch(qb, &response)?;

        Ok(QueryResult {
            response,
            next_page: String::new(),
        })
    }

    async fn put<T>(&self, item: &T) -> Result<()>
    where
        T: Storable + Sync + ?Sized,
    {
        if let Some(err) = self.injected_error("put") {
            return Err(err);
        }
        let attrs = item.marshal()?;
        self.puts.lock().unwrap_or_else(|e| e.into_inner()).push(attrs);
        Ok(())
    }

    async fn put_batch<T>(&self, items: &[T]) -> Result<()>
    where
        T: Storable + Sync,
    {
        if let Some(err) = self.injected_error("put_batch") {
            return Err(err);
        }
        let mut puts = self.puts.lock().unwrap_or_else(|e| e.into_inner());
        for item in items {
            puts.push(item.marshal()?);
        }
        Ok(())
    }

    async fn delete<T>(&self, item: &T) -> Result<()>
    where
        T: Keyer + Sync + ?Sized,
    {
        if let Some(err) = self.injected_error("delete") {
            return Err(err);
        }
        let keys = item.keys()?;
        self.deletes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(primary_key(&keys));
        Ok(())
    }

    async fn delete_batch<T>(&self, items: &[T]) -> Result<()>
    where
        T: Keyer + Sync,
    {
        if let Some(err) = self.injected_error("delete_batch") {
            return Err(err);
        }
        let mut deletes = self.deletes.lock().unwrap_or_else(|e| e.into_inner());
        for item in items {
            deletes.push(primary_key(&item.keys()?));
        }
        Ok(())
    }
}
