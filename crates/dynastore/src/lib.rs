//! A typed access-pattern layer over DynamoDB single-table designs.
//!
//! Every entity implements [`Keyer`] to declare its key slots, and every
//! read is an explicit access pattern: a [`QueryBuilder`] that knows how to
//! build its own wire request and where the resulting rows belong. The
//! [`Client`] runs those patterns against one table, handing back opaque
//! continuation tokens produced by a pluggable [`Tokenizer`].
//!
//! Handlers depend on the [`Storage`] trait so they can run against
//! [`mock::MockClient`] in tests, with canned rows flowing through the same
//! dispatch path as production responses.

mod client;
mod dispatch;
mod entity_type;
mod error;
mod keys;
mod marshal;
mod pagination;
mod query;
mod storage;
mod tokenizer;
mod transaction;
mod wire;

pub mod mock;

pub use client::{Client, Config, DEFAULT_BATCH_SIZE, MAX_BATCH_SIZE};
pub use entity_type::{item_entity_type, ENTITY_TYPE_ATTRIBUTE};
pub use error::{Error, Result};
pub use keys::{GetKey, Keyer, Keys};
pub use marshal::{marshal_item, Storable};
pub use pagination::{Cursor, PaginationSecret, SECRET_LEN};
pub use query::{QueryBuilder, QueryOptions, QueryResult};
pub use storage::{query_all, Storage};
pub use tokenizer::{
    EncryptionService, EnvelopeTokenizer, JsonTokenizer, KeyMap, KmsEncryptionService, Tokenizer,
};
pub use transaction::{TransactWriteItem, Transaction, MAX_TRANSACT_ITEMS};
pub use wire::{Item, QueryRequest, QueryResponse, SdkWireClient, WireClient, WriteOp};
