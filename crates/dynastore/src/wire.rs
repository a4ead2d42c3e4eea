//! Wire-client boundary.
//!
//! The access layer talks to DynamoDB through the [`WireClient`] trait so the
//! engine can be exercised against fakes. [`SdkWireClient`] is the production
//! implementation over `aws_sdk_dynamodb::Client`.

use std::collections::HashMap;
use std::fmt::Debug;

use async_trait::async_trait;
use aws_sdk_dynamodb::error::SdkError;
use aws_sdk_dynamodb::operation::batch_write_item::BatchWriteItemError;
use aws_sdk_dynamodb::operation::delete_item::DeleteItemError;
use aws_sdk_dynamodb::operation::get_item::GetItemError;
use aws_sdk_dynamodb::operation::put_item::PutItemError;
use aws_sdk_dynamodb::operation::query::QueryError;
use aws_sdk_dynamodb::operation::transact_write_items::TransactWriteItemsError;
use aws_sdk_dynamodb::types::AttributeValue;

use crate::error::{Error, Result};

/// A raw stored item: attribute name to attribute value.
pub type Item = HashMap<String, AttributeValue>;

/// A fully-formed query request.
///
/// Query builders produce one of these from their own field values; the
/// engine fills in `table_name` and the pagination fields before execution.
#[derive(Debug, Default, Clone)]
pub struct QueryRequest {
    pub table_name: String,
    pub index_name: Option<String>,
    pub key_condition_expression: Option<String>,
    pub filter_expression: Option<String>,
    pub projection_expression: Option<String>,
    pub expression_attribute_names: Option<HashMap<String, String>>,
    pub expression_attribute_values: Option<Item>,
    pub scan_index_forward: Option<bool>,
    pub consistent_read: Option<bool>,
    pub limit: Option<i32>,
    pub exclusive_start_key: Option<Item>,
}

/// The raw response to a query.
#[derive(Debug, Default, Clone)]
pub struct QueryResponse {
    pub items: Vec<Item>,
    /// Key of the last item evaluated, present when more data exists.
    pub last_evaluated_key: Option<Item>,
    pub count: i32,
}

/// A single element of a batch or transactional write.
#[derive(Debug, Clone)]
pub enum WriteOp {
    /// Store the item.
    Put(Item),
    /// Delete the item with these primary-key attributes.
    Delete(Item),
}

/// The wire-level operations the access layer requires of the store.
#[async_trait]
pub trait WireClient: Send + Sync {
    async fn query(&self, request: QueryRequest) -> Result<QueryResponse>;
    async fn get_item(&self, table: &str, key: Item) -> Result<Option<Item>>;
    async fn put_item(&self, table: &str, item: Item) -> Result<()>;
    async fn delete_item(&self, table: &str, key: Item) -> Result<()>;
    async fn batch_write_item(&self, table: &str, window: Vec<WriteOp>) -> Result<()>;
    async fn transact_write_items(&self, table: &str, items: Vec<WriteOp>) -> Result<()>;
}

/// Production wire client over the AWS SDK.
#[derive(Debug, Clone)]
pub struct SdkWireClient {
    client: aws_sdk_dynamodb::Client,
}

impl SdkWireClient {
    pub fn new(client: aws_sdk_dynamodb::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl WireClient for SdkWireClient {
    async fn query(&self, request: QueryRequest) -> Result<QueryResponse> {
        let output = self
            .client
            .query()
            .table_name(request.table_name)
            .set_index_name(request.index_name)
            .set_key_condition_expression(request.key_condition_expression)
            .set_filter_expression(request.filter_expression)
            .set_projection_expression(request.projection_expression)
            .set_expression_attribute_names(request.expression_attribute_names)
            .set_expression_attribute_values(request.expression_attribute_values)
            .set_scan_index_forward(request.scan_index_forward)
            .set_consistent_read(request.consistent_read)
            .set_limit(request.limit)
            .set_exclusive_start_key(request.exclusive_start_key)
            .send()
            .await
            .map_err(map_query_error)?;

        Ok(QueryResponse {
            items: output.items.unwrap_or_default(),
            last_evaluated_key: output.last_evaluated_key,
            count: output.count,
        })
    }

    async fn get_item(&self, table: &str, key: Item) -> Result<Option<Item>> {
        let output = self
            .client
            .get_item()
            .table_name(table)
            .set_key(Some(key))
            .consistent_read(true)
            .send()
            .await
            .map_err(map_get_item_error)?;

        Ok(output.item)
    }

    async fn put_item(&self, table: &str, item: Item) -> Result<()> {
        self.client
            .put_item()
            .table_name(table)
            .set_item(Some(item))
            .send()
            .await
            .map_err(map_put_item_error)?;

        Ok(())
    }

    async fn delete_item(&self, table: &str, key: Item) -> Result<()> {
        self.client
            .delete_item()
            .table_name(table)
            .set_key(Some(key))
            .send()
            .await
            .map_err(map_delete_item_error)?;

        Ok(())
    }

    async fn batch_write_item(&self, table: &str, window: Vec<WriteOp>) -> Result<()> {
        use aws_sdk_dynamodb::types::{DeleteRequest, PutRequest, WriteRequest};

        let mut requests = Vec::with_capacity(window.len());
        for op in window {
            let request = match op {
                WriteOp::Put(item) => WriteRequest::builder()
                    .put_request(
                        PutRequest::builder()
                            .set_item(Some(item))
                            .build()
                            .map_err(|e| Error::Serialization(format!("invalid put request: {e}")))?,
                    )
                    .build(),
                WriteOp::Delete(key) => WriteRequest::builder()
                    .delete_request(
                        DeleteRequest::builder()
                            .set_key(Some(key))
                            .build()
                            .map_err(|e| Error::Serialization(format!("invalid delete request: {e}")))?,
                    )
                    .build(),
            };
            requests.push(request);
        }

        self.client
            .batch_write_item()
            .request_items(table, requests)
            .send()
            .await
            .map_err(map_batch_write_error)?;

        Ok(())
    }

    async fn transact_write_items(&self, table: &str, items: Vec<WriteOp>) -> Result<()> {
        use aws_sdk_dynamodb::types::{Delete, Put, TransactWriteItem};

        let mut transact_items = Vec::with_capacity(items.len());
        for op in items {
            let item = match op {
                WriteOp::Put(attrs) => TransactWriteItem::builder()
                    .put(
                        Put::builder()
                            .set_item(Some(attrs))
                            .table_name(table)
                            .build()
                            .map_err(|e| Error::Serialization(format!("invalid put: {e}")))?,
                    )
                    .build(),
                WriteOp::Delete(key) => TransactWriteItem::builder()
                    .delete(
                        Delete::builder()
                            .set_key(Some(key))
                            .table_name(table)
                            .build()
                            .map_err(|e| Error::Serialization(format!("invalid delete: {e}")))?,
                    )
                    .build(),
            };
            transact_items.push(item);
        }

        self.client
            .transact_write_items()
            .set_transact_items(Some(transact_items))
            .send()
            .await
            .map_err(map_transact_write_error)?;

        Ok(())
    }
}

// ============================================================================
// SDK error mapping
// ============================================================================

fn map_query_error<R: Debug + Send + Sync + 'static>(err: SdkError<QueryError, R>) -> Error {
    match err.into_service_error() {
        QueryError::ResourceNotFoundException(_) => Error::Store("Table not found".to_string()),
        QueryError::ProvisionedThroughputExceededException(_) => {
            Error::Store("Throughput exceeded, please retry".to_string())
        }
        QueryError::RequestLimitExceeded(_) => {
            Error::Store("Request limit exceeded, please retry".to_string())
        }
        QueryError::InternalServerError(_) => {
            Error::Store("DynamoDB internal server error".to_string())
        }
        err => Error::Store(format!("Query failed: {err:?}")),
    }
}

fn map_get_item_error<R: Debug + Send + Sync + 'static>(err: SdkError<GetItemError, R>) -> Error {
    match err.into_service_error() {
        GetItemError::ResourceNotFoundException(_) => Error::Store("Table not found".to_string()),
        GetItemError::ProvisionedThroughputExceededException(_) => {
            Error::Store("Throughput exceeded, please retry".to_string())
        }
        err => Error::Store(format!("GetItem failed: {err:?}")),
    }
}

fn map_put_item_error<R: Debug + Send + Sync + 'static>(err: SdkError<PutItemError, R>) -> Error {
    match err.into_service_error() {
        PutItemError::ResourceNotFoundException(_) => Error::Store("Table not found".to_string()),
        PutItemError::ProvisionedThroughputExceededException(_) => {
            Error::Store("Throughput exceeded, please retry".to_string())
        }
        PutItemError::TransactionConflictException(_) => {
            Error::Store("Transaction conflict, please retry".to_string())
        }
        err => Error::Store(format!("PutItem failed: {err:?}")),
    }
}

fn map_delete_item_error<R: Debug + Send + Sync + 'static>(
    err: SdkError<DeleteItemError, R>,
) -> Error {
    match err.into_service_error() {
        DeleteItemError::ResourceNotFoundException(_) => Error::Store("Table not found".to_string()),
        DeleteItemError::TransactionConflictException(_) => {
            Error::Store("Transaction conflict, please retry".to_string())
        }
        err => Error::Store(format!("DeleteItem failed: {err:?}")),
    }
}

fn map_batch_write_error<R: Debug + Send + Sync + 'static>(
    err: SdkError<BatchWriteItemError, R>,
) -> Error {
    match err.into_service_error() {
        BatchWriteItemError::ResourceNotFoundException(_) => {
            Error::Store("Table not found".to_string())
        }
        BatchWriteItemError::ProvisionedThroughputExceededException(_) => {
            Error::Store("Throughput exceeded, please retry".to_string())
        }
        err => Error::Store(format!("BatchWriteItem failed: {err:?}")),
    }
}

fn map_transact_write_error<R: Debug + Send + Sync + 'static>(
    err: SdkError<TransactWriteItemsError, R>,
) -> Error {
    match err.into_service_error() {
        TransactWriteItemsError::TransactionCanceledException(e) => {
            Error::Store(format!("Transaction canceled: {e:?}"))
        }
        TransactWriteItemsError::ProvisionedThroughputExceededException(_) => {
            Error::Store("Throughput exceeded, please retry".to_string())
        }
        err => Error::Store(format!("TransactWriteItems failed: {err:?}")),
    }
}
