//! The table client.
//!
//! [`Client`] binds a wire client to one table and carries the access
//! layer's configuration: the batch window size and the pagination token
//! codec. Cloning is cheap; clones share the underlying connection.

use std::sync::Arc;

use crate::dispatch::dispatch;
use crate::error::{Error, Result};
use crate::keys::{GetKey, Keyer};
use crate::marshal::{primary_key, Storable};
use crate::query::{QueryBuilder, QueryOptions, QueryResult};
use crate::tokenizer::{attrs_to_key_map, key_map_to_attrs, JsonTokenizer, Tokenizer};
use crate::transaction::Transaction;
use crate::wire::{Item, SdkWireClient, WireClient, WriteOp};
use aws_sdk_dynamodb::types::AttributeValue;
use serde::de::DeserializeOwned;
use serde_dynamo::aws_sdk_dynamodb_1::from_item;

/// Largest window a single batch write call accepts.
pub const MAX_BATCH_SIZE: usize = 25;

/// Window size used when none is configured.
pub const DEFAULT_BATCH_SIZE: usize = MAX_BATCH_SIZE;

/// Client configuration.
#[derive(Clone)]
pub struct Config {
    /// The table every operation targets.
    pub table_name: String,
    /// Items per batch write window, between 1 and [`MAX_BATCH_SIZE`].
    pub batch_size: usize,
    /// Page token codec. Defaults to [`JsonTokenizer`] when unset.
    pub tokenizer: Option<Arc<dyn Tokenizer>>,
}

impl Config {
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            batch_size: DEFAULT_BATCH_SIZE,
            tokenizer: None,
        }
    }

    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn tokenizer(mut self, tokenizer: Arc<dyn Tokenizer>) -> Self {
        self.tokenizer = Some(tokenizer);
        self
    }
}

/// A client bound to a single table.
#[derive(Clone)]
pub struct Client {
    wire: Arc<dyn WireClient>,
    table: String,
    batch_size: usize,
    tokenizer: Arc<dyn Tokenizer>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("table", &self.table)
            .field("batch_size", &self.batch_size)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Builds a client over the given wire connection.
    pub fn new(wire: Arc<dyn WireClient>, config: Config) -> Result<Self> {
        if config.table_name.is_empty() {
            return Err(Error::Config("table name must not be empty".to_string()));
        }
        if config.batch_size < 1 || config.batch_size > MAX_BATCH_SIZE {
            return Err(Error::InvalidBatchSize(config.batch_size));
        }

        Ok(Self {
            wire,
            table: config.table_name,
            batch_size: config.batch_size,
            tokenizer: config
                .tokenizer
                .unwrap_or_else(|| Arc::new(JsonTokenizer)),
        })
    }

    /// Builds a client from the default AWS credential chain.
    pub async fn from_env(table_name: impl Into<String>) -> Result<Self> {
        let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let sdk = aws_sdk_dynamodb::Client::new(&aws_config);
        Self::new(Arc::new(SdkWireClient::new(sdk)), Config::new(table_name))
    }

    /// The table this client operates on.
    pub fn table_name(&self) -> &str {
        &self.table
    }

    /// Runs a query access pattern and dispatches the rows onto it.
    ///
    /// A broken continuation token, in either direction, fails the whole
    /// call; the caller never receives decoded results paired with a cursor
    /// that cannot resume them.
    pub async fn query<Q: QueryBuilder>(&self, qb: &mut Q, opts: QueryOptions) -> Result<QueryResult> {
        let mut request = qb.build_query()?;
        request.table_name = self.table.clone();

        if let Some(token) = &opts.page {
            let key = self.tokenizer.decode(token).await?;
            if !key.is_empty() {
                request.exclusive_start_key = Some(key_map_to_attrs(&key));
            }
        }
        if opts.limit.is_some() {
            request.limit = opts.limit;
        }

        tracing::debug!(table = %self.table, index = ?request.index_name, "running query");
        let response = self.wire.query(request).await?;
        tracing::trace!(count = response.count, "query returned");

        let next_page = match &response.last_evaluated_key {
            Some(key) => self.tokenizer.encode(&attrs_to_key_map(key)?).await?,
            None => String::new(),
        };

        dispatch(qb, &response)?;

        Ok(QueryResult { response, next_page })
    }

    /// Fetches a single item by its primary key.
    pub async fn get<T: DeserializeOwned>(&self, key: GetKey) -> Result<T> {
        key.validate()?;

        let attrs = Item::from([
            ("PK".to_string(), AttributeValue::S(key.pk)),
            ("SK".to_string(), AttributeValue::S(key.sk)),
        ]);

        let item = self
            .wire
            .get_item(&self.table, attrs)
            .await?
            .ok_or(Error::NoItems)?;

        from_item(item).map_err(|e| Error::Decode(e.to_string()))
    }

    /// Stores a single item.
    pub async fn put<T: Storable + ?Sized>(&self, item: &T) -> Result<()> {
        let attrs = item.marshal()?;
        self.wire.put_item(&self.table, attrs).await
    }

    /// Deletes a single item by the primary key its [`Keyer`] declares.
    pub async fn delete<T: Keyer + ?Sized>(&self, item: &T) -> Result<()> {
        let keys = item.keys()?;
        self.wire.delete_item(&self.table, primary_key(&keys)).await
    }

    /// Stores many items, windowed by the configured batch size.
    ///
    /// Windows run sequentially and the first failure stops the batch, so
    /// every window before the failed one is durably written.
    pub async fn put_batch<T: Storable>(&self, items: &[T]) -> Result<()> {
        let ops = items
            .iter()
            .map(|item| item.marshal().map(WriteOp::Put))
            .collect::<Result<Vec<_>>>()?;
        self.write_batch(ops).await
    }

    /// Deletes many items, windowed by the configured batch size.
    pub async fn delete_batch<T: Keyer>(&self, items: &[T]) -> Result<()> {
        let ops = items
            .iter()
            .map(|item| item.keys().map(|keys| WriteOp::Delete(primary_key(&keys))))
            .collect::<Result<Vec<_>>>()?;
        self.write_batch(ops).await
    }

    async fn write_batch(&self, ops: Vec<WriteOp>) -> Result<()> {
        for window in ops.chunks(self.batch_size) {
            tracing::debug!(table = %self.table, size = window.len(), "writing batch window");
            self.wire.batch_write_item(&self.table, window.to_vec()).await?;
        }
        Ok(())
    }

    /// Starts an empty transaction builder against this client's table.
    pub fn transaction(&self) -> Transaction {
        Transaction::new(self.clone())
    }

    pub(crate) fn wire(&self) -> &Arc<dyn WireClient> {
        &self.wire
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde::{Deserialize, Serialize};

    use super::*;
    use crate::keys::Keys;
    use crate::wire::{QueryRequest, QueryResponse};

    /// Records every wire call and replays canned query pages in order.
    #[derive(Default)]
    struct FakeWire {
        queries: Mutex<Vec<QueryRequest>>,
        pages: Mutex<Vec<QueryResponse>>,
        gets: Mutex<Vec<Item>>,
        get_response: Mutex<Option<Item>>,
        puts: Mutex<Vec<Item>>,
        deletes: Mutex<Vec<Item>>,
        batches: Mutex<Vec<Vec<WriteOp>>>,
        fail_batches_after: Mutex<Option<usize>>,
    }

    #[async_trait]
    impl WireClient for FakeWire {
        async fn query(&self, request: QueryRequest) -> Result<QueryResponse> {
            self.queries.lock().unwrap().push(request);
            let mut pages = self.pages.lock().unwrap();
            if pages.is_empty() {
                return Ok(QueryResponse::default());
            }
            Ok(pages.remove(0))
        }

        async fn get_item(&self, _table: &str, key: Item) -> Result<Option<Item>> {
            self.gets.lock().unwrap().push(key);
            Ok(self.get_response.lock().unwrap().clone())
        }

        async fn put_item(&self, _table: &str, item: Item) -> Result<()> {
            self.puts.lock().unwrap().push(item);
            Ok(())
        }

        async fn delete_item(&self, _table: &str, key: Item) -> Result<()> {
            self.deletes.lock().unwrap().push(key);
            Ok(())
        }

        async fn batch_write_item(&self, _table: &str, window: Vec<WriteOp>) -> Result<()> {
            let mut batches = self.batches.lock().unwrap();
            if let Some(limit) = *self.fail_batches_after.lock().unwrap() {
                if batches.len() >= limit {
                    return Err(Error::Store("window rejected".to_string()));
                }
            }
            batches.push(window);
            Ok(())
        }

        async fn transact_write_items(&self, _table: &str, _items: Vec<WriteOp>) -> Result<()> {
            Ok(())
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    struct Widget {
        id: String,
    }

    impl Keyer for Widget {
        fn keys(&self) -> Result<Keys> {
            Ok(Keys {
                pk: format!("WIDGET#{}", self.id),
                sk: "DETAILS".to_string(),
                ..Default::default()
            })
        }

        fn entity_type(&self) -> Option<&'static str> {
            Some("widget")
        }
    }

    #[derive(Default)]
    struct ListWidgets {
        result: Vec<Widget>,
    }

    impl QueryBuilder for ListWidgets {
        type Row = Widget;

        fn build_query(&self) -> Result<QueryRequest> {
            Ok(QueryRequest {
                key_condition_expression: Some("PK = :pk".to_string()),
                ..Default::default()
            })
        }

        fn results(&mut self) -> Option<&mut Vec<Widget>> {
            Some(&mut self.result)
        }
    }

    fn widget_item(id: &str) -> Item {
        Item::from([("id".to_string(), AttributeValue::S(id.to_string()))])
    }

    fn key_attrs(pk: &str, sk: &str) -> Item {
        Item::from([
            ("PK".to_string(), AttributeValue::S(pk.to_string())),
            ("SK".to_string(), AttributeValue::S(sk.to_string())),
        ])
    }

    fn client_over(wire: Arc<FakeWire>, config: Config) -> Client {
        Client::new(wire, config).unwrap()
    }

    #[test]
    fn test_new_rejects_empty_table_name() {
        let err = Client::new(Arc::new(FakeWire::default()), Config::new("")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_new_validates_batch_size_bounds() {
        for size in [0, 26, 100] {
            let config = Config::new("things").batch_size(size);
            let err = Client::new(Arc::new(FakeWire::default()), config).unwrap_err();
            assert_eq!(err, Error::InvalidBatchSize(size));
        }
        for size in [1, 25] {
            let config = Config::new("things").batch_size(size);
            assert!(Client::new(Arc::new(FakeWire::default()), config).is_ok());
        }
    }

    #[tokio::test]
    async fn test_query_sets_table_and_dispatches_rows() {
        let wire = Arc::new(FakeWire::default());
        wire.pages.lock().unwrap().push(QueryResponse {
            items: vec![widget_item("1"), widget_item("2")],
            last_evaluated_key: None,
            count: 2,
        });
        let client = client_over(wire.clone(), Config::new("things"));

        let mut qb = ListWidgets::default();
        let result = client.query(&mut qb, QueryOptions::default()).await.unwrap();

        assert_eq!(qb.result.len(), 2);
        assert_eq!(result.next_page, "");
        assert_eq!(wire.queries.lock().unwrap()[0].table_name, "things");
    }

    #[tokio::test]
    async fn test_query_pagination_walks_all_pages() {
        let wire = Arc::new(FakeWire::default());
        {
            let mut pages = wire.pages.lock().unwrap();
            for i in 0..5 {
                pages.push(QueryResponse {
                    items: vec![widget_item(&i.to_string())],
                    last_evaluated_key: (i < 4)
                        .then(|| key_attrs(&format!("WIDGET#{i}"), "DETAILS")),
                    count: 1,
                });
            }
        }
        let client = client_over(wire.clone(), Config::new("things"));

        let mut collected = Vec::new();
        let mut page = String::new();
        loop {
            let mut qb = ListWidgets::default();
            let opts = QueryOptions {
                page: (!page.is_empty()).then(|| page.clone()),
                limit: Some(1),
            };
            let result = client.query(&mut qb, opts).await.unwrap();
            collected.append(&mut qb.result);
            page = result.next_page;
            if page.is_empty() {
                break;
            }
        }

        assert_eq!(collected.len(), 5);

        // Resumed requests carry the previous page's key forward.
        let queries = wire.queries.lock().unwrap();
        assert_eq!(queries.len(), 5);
        assert!(queries[0].exclusive_start_key.is_none());
        assert_eq!(
            queries[1].exclusive_start_key,
            Some(key_attrs("WIDGET#0", "DETAILS"))
        );
        assert!(queries.iter().all(|q| q.limit == Some(1)));
    }

    #[tokio::test]
    async fn test_query_rejects_undecodable_page_token() {
        let wire = Arc::new(FakeWire::default());
        let client = client_over(wire.clone(), Config::new("things"));

        let mut qb = ListWidgets::default();
        let err = client
            .query(&mut qb, QueryOptions::page("{broken"))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Token(_)));
        assert!(wire.queries.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_query_token_encode_failure_discards_results() {
        let wire = Arc::new(FakeWire::default());
        wire.pages.lock().unwrap().push(QueryResponse {
            items: vec![widget_item("1")],
            // Numeric key attribute cannot be tokenized.
            last_evaluated_key: Some(Item::from([(
                "PK".to_string(),
                AttributeValue::N("1".to_string()),
            )])),
            count: 1,
        });
        let client = client_over(wire, Config::new("things"));

        let mut qb = ListWidgets::default();
        let err = client.query(&mut qb, QueryOptions::default()).await.unwrap_err();

        assert!(matches!(err, Error::Token(_)));
        assert!(qb.result.is_empty(), "rows must not be dispatched");
    }

    #[tokio::test]
    async fn test_get_returns_decoded_item() {
        let wire = Arc::new(FakeWire::default());
        *wire.get_response.lock().unwrap() = Some(widget_item("7"));
        let client = client_over(wire.clone(), Config::new("things"));

        let got: Widget = client
            .get(GetKey::new("WIDGET#7", "DETAILS"))
            .await
            .unwrap();

        assert_eq!(got, Widget { id: "7".to_string() });
        assert_eq!(
            wire.gets.lock().unwrap()[0],
            key_attrs("WIDGET#7", "DETAILS")
        );
    }

    #[tokio::test]
    async fn test_get_missing_item_is_no_items() {
        let client = client_over(Arc::new(FakeWire::default()), Config::new("things"));
        let err = client
            .get::<Widget>(GetKey::new("WIDGET#7", "DETAILS"))
            .await
            .unwrap_err();
        assert_eq!(err, Error::NoItems);
    }

    #[tokio::test]
    async fn test_get_rejects_empty_key_parts() {
        let client = client_over(Arc::new(FakeWire::default()), Config::new("things"));
        let err = client.get::<Widget>(GetKey::new("", "SK")).await.unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[tokio::test]
    async fn test_put_writes_marshaled_item() {
        let wire = Arc::new(FakeWire::default());
        let client = client_over(wire.clone(), Config::new("things"));

        client.put(&Widget { id: "1".to_string() }).await.unwrap();

        let puts = wire.puts.lock().unwrap();
        assert_eq!(puts[0].get("PK").unwrap().as_s().unwrap(), "WIDGET#1");
        assert_eq!(puts[0].get("ddb:type").unwrap().as_s().unwrap(), "widget");
    }

    #[tokio::test]
    async fn test_delete_uses_primary_key_only() {
        let wire = Arc::new(FakeWire::default());
        let client = client_over(wire.clone(), Config::new("things"));

        client.delete(&Widget { id: "1".to_string() }).await.unwrap();

        assert_eq!(
            wire.deletes.lock().unwrap()[0],
            key_attrs("WIDGET#1", "DETAILS")
        );
    }

    #[tokio::test]
    async fn test_put_batch_windows_by_batch_size() {
        let wire = Arc::new(FakeWire::default());
        let client = client_over(wire.clone(), Config::new("things"));

        let items: Vec<Widget> = (0..53).map(|i| Widget { id: i.to_string() }).collect();
        client.put_batch(&items).await.unwrap();

        let sizes: Vec<usize> = wire.batches.lock().unwrap().iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![25, 25, 3]);
    }

    #[tokio::test]
    async fn test_put_batch_respects_configured_window() {
        let wire = Arc::new(FakeWire::default());
        let client = client_over(wire.clone(), Config::new("things").batch_size(10));

        let items: Vec<Widget> = (0..25).map(|i| Widget { id: i.to_string() }).collect();
        client.put_batch(&items).await.unwrap();

        let sizes: Vec<usize> = wire.batches.lock().unwrap().iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![10, 10, 5]);
    }

    #[tokio::test]
    async fn test_put_batch_stops_on_first_window_failure() {
        let wire = Arc::new(FakeWire::default());
        *wire.fail_batches_after.lock().unwrap() = Some(1);
        let client = client_over(wire.clone(), Config::new("things").batch_size(5));

        let items: Vec<Widget> = (0..15).map(|i| Widget { id: i.to_string() }).collect();
        let err = client.put_batch(&items).await.unwrap_err();

        assert!(matches!(err, Error::Store(_)));
        assert_eq!(wire.batches.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_batch_sends_delete_ops() {
        let wire = Arc::new(FakeWire::default());
        let client = client_over(wire.clone(), Config::new("things"));

        client
            .delete_batch(&[Widget { id: "1".to_string() }, Widget { id: "2".to_string() }])
            .await
            .unwrap();

        let batches = wire.batches.lock().unwrap();
        assert_eq!(batches.len(), 1);
        assert!(batches[0]
            .iter()
            .all(|op| matches!(op, WriteOp::Delete(_))));
    }
}
