//! The storage abstraction.
//!
//! Application code depends on [`Storage`] rather than [`Client`] directly,
//! so handlers can run against [`MockClient`](crate::mock::MockClient) in
//! unit tests and against the real table everywhere else.

use async_trait::async_trait;

use crate::client::Client;
use crate::error::{Error, Result};
use crate::keys::Keyer;
use crate::marshal::Storable;
use crate::query::{QueryBuilder, QueryOptions, QueryResult};

/// The operations handlers use against the store.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Runs a query access pattern, dispatching one page of rows onto it.
    async fn query<Q>(&self, qb: &mut Q, opts: QueryOptions) -> Result<QueryResult>
    where
        Q: QueryBuilder + Send;

    /// Stores a single item.
    async fn put<T>(&self, item: &T) -> Result<()>
    where
        T: Storable + Sync + ?Sized;

    /// Stores many items in batch windows.
    async fn put_batch<T>(&self, items: &[T]) -> Result<()>
    where
        T: Storable + Sync;

    /// Deletes a single item by its declared primary key.
    async fn delete<T>(&self, item: &T) -> Result<()>
    where
        T: Keyer + Sync + ?Sized;

    /// Deletes many items in batch windows.
    async fn delete_batch<T>(&self, items: &[T]) -> Result<()>
    where
        T: Keyer + Sync;
}

#[async_trait]
impl Storage for Client {
    async fn query<Q>(&self, qb: &mut Q, opts: QueryOptions) -> Result<QueryResult>
    where
        Q: QueryBuilder + Send,
    {
        Client::query(self, qb, opts).await
    }

    async fn put<T>(&self, item: &T) -> Result<()>
    where
        T: Storable + Sync + ?Sized,
    {
        Client::put(self, item).await
    }

    async fn put_batch<T>(&self, items: &[T]) -> Result<()>
    where
        T: Storable + Sync,
    {
        Client::put_batch(self, items).await
    }

    async fn delete<T>(&self, item: &T) -> Result<()>
    where
        T: Keyer + Sync + ?Sized,
    {
        Client::delete(self, item).await
    }

    async fn delete_batch<T>(&self, items: &[T]) -> Result<()>
    where
        T: Keyer + Sync,
    {
        Client::delete_batch(self, items).await
    }
}

/// Runs a query to exhaustion, following continuation tokens until the
/// table has no more pages, and leaves the aggregate rows in the builder's
/// results field.
///
/// Only builders exposing a results field can aggregate; anything else
/// fails with [`Error::Unaddressable`].
pub async fn query_all<S, Q>(storage: &S, qb: &mut Q, opts: QueryOptions) -> Result<()>
where
    S: Storage + ?Sized,
    Q: QueryBuilder + Send,
{
    let mut all = Vec::new();
    let mut opts = opts;

    loop {
        let result = storage.query(qb, opts.clone()).await?;

        match qb.results() {
            Some(rows) => all.append(rows),
            None => return Err(Error::Unaddressable),
        }

        if result.next_page.is_empty() {
            break;
        }
        opts.page = Some(result.next_page);
    }

    match qb.results() {
        Some(rows) => {
            *rows = all;
            Ok(())
        }
        None => Err(Error::Unaddressable),
    }
}
