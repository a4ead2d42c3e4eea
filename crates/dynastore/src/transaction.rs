//! Transactional writes.
//!
//! A [`Transaction`] accumulates puts and deletes from any number of tasks
//! and submits them in one atomic `TransactWriteItems` call. Appends take a
//! mutex, so a transaction can be shared behind an `Arc` across concurrent
//! handlers; the wire call itself happens outside the lock.

use std::sync::{Arc, Mutex};

use crate::client::Client;
use crate::error::{Error, Result};
use crate::keys::Keyer;
use crate::marshal::{primary_key, Storable};
use crate::wire::WriteOp;

/// Hard cap on items per transactional write.
pub const MAX_TRANSACT_ITEMS: usize = 100;

/// One element of a transactional write: exactly one of `put` or `delete`.
#[derive(Clone)]
pub struct TransactWriteItem {
    pub put: Option<Arc<dyn Storable>>,
    pub delete: Option<Arc<dyn Keyer>>,
}

impl TransactWriteItem {
    pub fn put(item: Arc<dyn Storable>) -> Self {
        Self {
            put: Some(item),
            delete: None,
        }
    }

    pub fn delete(item: Arc<dyn Keyer>) -> Self {
        Self {
            put: None,
            delete: Some(item),
        }
    }

    fn compile(&self) -> Result<WriteOp> {
        match (&self.put, &self.delete) {
            (Some(item), None) => Ok(WriteOp::Put(item.marshal()?)),
            (None, Some(item)) => Ok(WriteOp::Delete(primary_key(&item.keys()?))),
            (Some(_), Some(_)) => Err(Error::Build(
                "transaction item sets both put and delete".to_string(),
            )),
            (None, None) => Err(Error::Build(
                "transaction item sets neither put nor delete".to_string(),
            )),
        }
    }
}

#[derive(Default)]
struct Pending {
    puts: Vec<Arc<dyn Storable>>,
    deletes: Vec<Arc<dyn Keyer>>,
}

/// An atomic write being assembled.
pub struct Transaction {
    client: Client,
    pending: Mutex<Pending>,
}

impl Transaction {
    pub(crate) fn new(client: Client) -> Self {
        Self {
            client,
            pending: Mutex::new(Pending::default()),
        }
    }

    /// Adds an item to store when the transaction executes.
    pub fn put(&self, item: Arc<dyn Storable>) {
        self.lock_pending().puts.push(item);
    }

    /// Adds an item to delete when the transaction executes.
    pub fn delete(&self, item: Arc<dyn Keyer>) {
        self.lock_pending().deletes.push(item);
    }

    /// Submits all accumulated writes atomically, puts before deletes.
    ///
    /// The pending set is not consumed; executing again resubmits it.
    pub async fn execute(&self) -> Result<()> {
        let items = {
            let pending = self.lock_pending();
            let mut items =
                Vec::with_capacity(pending.puts.len() + pending.deletes.len());
            items.extend(pending.puts.iter().cloned().map(TransactWriteItem::put));
            items.extend(pending.deletes.iter().cloned().map(TransactWriteItem::delete));
            items
        };

        self.client.transact_write_items(&items).await
    }

    fn lock_pending(&self) -> std::sync::MutexGuard<'_, Pending> {
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Client {
    /// Writes up to [`MAX_TRANSACT_ITEMS`] items in one atomic call.
    ///
    /// Every item is validated and marshaled before anything reaches the
    /// wire, so a malformed item can never leave a partial write behind.
    pub async fn transact_write_items(&self, items: &[TransactWriteItem]) -> Result<()> {
        if items.len() > MAX_TRANSACT_ITEMS {
            return Err(Error::TransactionTooLarge(items.len()));
        }

        let ops = items
            .iter()
            .map(TransactWriteItem::compile)
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(table = %self.table_name(), items = ops.len(), "executing transaction");
        self.wire().transact_write_items(self.table_name(), ops).await
    }
}
