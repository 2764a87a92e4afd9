use models::Transaction;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::Url;
use thiserror::Error;

pub use reqwest::StatusCode;

pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Invalid accounting endpoint '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("GET {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("GET {url} returned {status}")]
    Status {
        url: String,
        status: StatusCode,
    },

    #[error("Response from {url} is not a JSON array of transactions: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Source of the full transaction list for one export run
pub trait TransactionSource {
    fn fetch_transactions(&self) -> Result<Vec<Transaction>>;
}

/// Blocking client for the accounting endpoint, one GET per call and no retries
#[derive(Debug, Clone)]
pub struct AccountingClient {
    http: Client,
    endpoint: Url,
}

impl AccountingClient {
    pub fn new(endpoint: &str) -> Result<Self> {
        let endpoint = Url::parse(endpoint).map_err(|source| ClientError::InvalidUrl {
            url: endpoint.to_string(),
            source,
        })?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|source| ClientError::Request {
                url: endpoint.to_string(),
                source,
            })?;

        Ok(Self { http, endpoint })
    }

    /// The parsed endpoint every fetch goes to
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

impl TransactionSource for AccountingClient {
    fn fetch_transactions(&self) -> Result<Vec<Transaction>> {
        let url = self.endpoint.to_string();
        tracing::info!(%url, "fetching transactions");

        let response = self
            .http
            .get(self.endpoint.clone())
            .send()
            .map_err(|source| ClientError::Request {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status { url, status });
        }

        // Read the body first so a schema problem surfaces as a decode error, not a transport one.
        let body = response.bytes().map_err(|source| ClientError::Request {
            url: url.clone(),
            source,
        })?;
        let transactions: Vec<Transaction> =
            serde_json::from_slice(&body).map_err(|source| ClientError::Decode { url, source })?;

        tracing::info!(count = transactions.len(), "transactions received");
        Ok(transactions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[test]
    fn test_fetch_transactions() {
        let server = MockServer::start();

        server.mock(|when, then| {
            when.method(GET).path("/expenses/accounting");
            then.status(200).json_body(serde_json::json!([
                {
                    "token": "DAI",
                    "datetime": "2022-05-10T00:00:00.000000Z",
                    "amount": 100.0,
                    "group_id": "LAUNCH"
                },
                {
                    "token": "ETH",
                    "datetime": "2022-05-11T12:30:00.250000Z",
                    "amount": 2.5
                }
            ]));
        });

        let client = AccountingClient::new(&server.url("/expenses/accounting")).unwrap();
        let txns = client.fetch_transactions().unwrap();
        assert_eq!(txns.len(), 2);
        assert_eq!(txns[0].group_id, "LAUNCH");
        assert_eq!(txns[1].group_id, models::UNKNOWN_GROUP);
    }

    #[test]
    fn test_non_success_status() {
        let server = MockServer::start();

        server.mock(|when, then| {
            when.method(GET).path("/expenses/accounting");
            then.status(503).body("maintenance");
        });

        let client = AccountingClient::new(&server.url("/expenses/accounting")).unwrap();
        let err = client.fetch_transactions().unwrap_err();
        assert!(
            matches!(err, ClientError::Status { status, .. } if status.as_u16() == 503),
            "unexpected error: {err}"
        );
    }

    #[test]
    fn test_body_that_is_not_an_array() {
        let server = MockServer::start();

        server.mock(|when, then| {
            when.method(GET).path("/expenses/accounting");
            then.status(200)
                .json_body(serde_json::json!({ "error": "not a list" }));
        });

        let client = AccountingClient::new(&server.url("/expenses/accounting")).unwrap();
        let err = client.fetch_transactions().unwrap_err();
        assert!(matches!(err, ClientError::Decode { .. }), "unexpected error: {err}");
    }

    #[test]
    fn test_invalid_endpoint() {
        let err = AccountingClient::new("not a url").unwrap_err();
        assert!(matches!(err, ClientError::InvalidUrl { .. }));
    }

    #[test]
    fn test_endpoint_is_parsed_once() {
        let client = AccountingClient::new("http://accounting.test/expenses/accounting").unwrap();
        assert_eq!(client.endpoint().host_str(), Some("accounting.test"));
        assert_eq!(client.endpoint().path(), "/expenses/accounting");
    }
}
