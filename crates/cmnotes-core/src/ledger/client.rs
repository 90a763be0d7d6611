use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::{LedgerSource, TagQuery};
use crate::config::CoreConfig;
use crate::error::{NotesError, Result};
use crate::models::{LedgerTransaction, Tag, UnifiedAuthorBlob};

/// Hard stop for pagination against a misbehaving endpoint.
const MAX_PAGES: usize = 200;

const TRANSACTIONS_QUERY: &str = r#"query($tags: [TagFilter!], $first: Int, $after: String) {
  transactions(tags: $tags, first: $first, after: $after, sort: HEIGHT_DESC) {
    pageInfo { hasNextPage }
    edges {
      cursor
      node { id tags { name value } block { timestamp } }
    }
  }
}"#;

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<GraphQlData>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct GraphQlData {
    transactions: TransactionConnection,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransactionConnection {
    #[serde(default)]
    page_info: PageInfo,
    #[serde(default)]
    edges: Vec<Edge>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    #[serde(default)]
    has_next_page: bool,
}

#[derive(Debug, Deserialize)]
struct Edge {
    cursor: Option<String>,
    node: NodeDto,
}

#[derive(Debug, Deserialize)]
struct NodeDto {
    id: String,
    #[serde(default)]
    tags: Vec<Tag>,
    #[serde(default)]
    timestamp: Option<u64>,
    #[serde(default)]
    block: Option<BlockDto>,
}

#[derive(Debug, Deserialize)]
struct BlockDto {
    timestamp: Option<u64>,
}

/// One decoded result page: transactions plus the cursor to continue from.
#[derive(Debug)]
pub(crate) struct Page {
    pub transactions: Vec<LedgerTransaction>,
    pub next_cursor: Option<String>,
}

pub(crate) fn parse_page(body: &str) -> Result<Page> {
    let response: GraphQlResponse = serde_json::from_str(body)?;
    if !response.errors.is_empty() {
        let message = response
            .errors
            .into_iter()
            .map(|e| e.message)
            .collect::<Vec<_>>()
            .join("; ");
        return Err(NotesError::Query(message));
    }
    let connection = response
        .data
        .ok_or_else(|| NotesError::Query("response carried no data".to_string()))?
        .transactions;

    let last_cursor = connection.edges.last().and_then(|e| e.cursor.clone());
    let transactions = connection
        .edges
        .into_iter()
        .map(|edge| {
            let timestamp = edge
                .node
                .timestamp
                .or_else(|| edge.node.block.and_then(|b| b.timestamp));
            LedgerTransaction::new(edge.node.id, edge.node.tags, timestamp)
        })
        .collect();

    let next_cursor = if connection.page_info.has_next_page {
        last_cursor
    } else {
        None
    };

    Ok(Page {
        transactions,
        next_cursor,
    })
}

/// Per-author blob address for the unified record `tx_id`.
pub fn mutable_address(gateway_url: &str, tx_id: &str) -> String {
    format!("{}/{}", gateway_url.trim_end_matches('/'), tx_id)
}

/// Ledger gateway client: GraphQL tag queries plus blob GETs.
pub struct HttpLedgerClient {
    client: reqwest::Client,
    graphql_url: String,
    gateway_url: String,
    page_size: u32,
}

impl HttpLedgerClient {
    pub fn new(config: &CoreConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self {
            client,
            graphql_url: config.graphql_url.clone(),
            gateway_url: config.gateway_url.clone(),
            page_size: config.page_size,
        })
    }

    async fn query_page(&self, query: &TagQuery, after: Option<&str>) -> Result<Page> {
        let tags: Vec<serde_json::Value> = query
            .filters
            .iter()
            .map(|f| serde_json::json!({ "name": f.name, "values": f.values }))
            .collect();

        let body = serde_json::json!({
            "query": TRANSACTIONS_QUERY,
            "variables": {
                "tags": tags,
                "first": self.page_size,
                "after": after,
            },
        });

        let response = self
            .client
            .post(&self.graphql_url)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(NotesError::Status {
                url: self.graphql_url.clone(),
                status: response.status().as_u16(),
            });
        }

        let text = response.text().await?;
        parse_page(&text)
    }
}

#[async_trait]
impl LedgerSource for HttpLedgerClient {
    async fn query(&self, query: &TagQuery) -> Result<Vec<LedgerTransaction>> {
        let mut transactions = Vec::new();
        let mut cursor: Option<String> = None;

        for page_number in 0..MAX_PAGES {
            let page = self.query_page(query, cursor.as_deref()).await?;
            transactions.extend(page.transactions);
            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
            if page_number + 1 == MAX_PAGES {
                tracing::warn!(pages = MAX_PAGES, "ledger query truncated at page limit");
            }
        }

        tracing::debug!(count = transactions.len(), "ledger query complete");
        Ok(transactions)
    }

    async fn fetch_blob(&self, tx_id: &str) -> Result<UnifiedAuthorBlob> {
        let url = self.blob_url(tx_id);
        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(NotesError::Status {
                url,
                status: response.status().as_u16(),
            });
        }

        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| NotesError::Malformed {
            id: tx_id.to_string(),
            message: e.to_string(),
        })
    }

    fn blob_url(&self, tx_id: &str) -> String {
        mutable_address(&self.gateway_url, tx_id)
    }

    fn gateway_url(&self) -> &str {
        &self.gateway_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;

    #[test]
    fn test_parse_page_with_next_cursor() {
        let body = r#"{"data":{"transactions":{
            "pageInfo":{"hasNextPage":true},
            "edges":[
                {"cursor":"c1","node":{"id":"tx1","tags":[{"name":"App-Name","value":"X"}],"block":{"timestamp":1700}}},
                {"cursor":"c2","node":{"id":"tx2","tags":[],"timestamp":1800,"block":null}}
            ]}}}"#;
        let page = parse_page(body).unwrap();
        assert_eq!(page.transactions.len(), 2);
        assert_eq!(page.transactions[0].timestamp, Some(1700));
        assert_eq!(page.transactions[0].tags[0].value, "X");
        assert_eq!(page.transactions[1].timestamp, Some(1800));
        assert_eq!(page.next_cursor.as_deref(), Some("c2"));
    }

    #[test]
    fn test_parse_last_page_and_pending_tx() {
        let body = r#"{"data":{"transactions":{
            "pageInfo":{"hasNextPage":false},
            "edges":[{"cursor":"c1","node":{"id":"tx1","tags":[]}}]}}}"#;
        let page = parse_page(body).unwrap();
        assert!(page.next_cursor.is_none());
        assert_eq!(page.transactions[0].timestamp, None);
    }

    #[test]
    fn test_parse_graphql_errors() {
        let body = r#"{"data":null,"errors":[{"message":"rate limited"}]}"#;
        let err = parse_page(body).unwrap_err();
        assert_eq!(err.kind(), FailureKind::NetworkFailure);
        assert!(err.to_string().contains("rate limited"));
    }

    #[test]
    fn test_parse_garbage() {
        let err = parse_page("<html>").unwrap_err();
        assert_eq!(err.kind(), FailureKind::ParseFailure);
    }

    #[test]
    fn test_mutable_address() {
        assert_eq!(mutable_address("https://gw.test/", "abc"), "https://gw.test/abc");
    }

    #[tokio::test]
    #[ignore] // Requires network access to the public gateway
    async fn test_live_query() {
        let client = HttpLedgerClient::new(&CoreConfig::new("unused")).unwrap();
        let query = TagQuery::new().tag("App-Name", crate::constants::app_names::PERMISSION);
        client.query(&query).await.unwrap();
    }
}
