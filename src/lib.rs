use std::time::Duration;
use thiserror::Error;

pub mod config;
pub mod dom;
pub mod filter;
pub mod request;
pub mod selector;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use crate::config::{ClientConfig, ClientOverrides};
pub use dom::Document;
pub use filter::{filter_data, DataFilter, FilterOptions};
pub use request::{request, RequestClient};
pub use selector::Selector;
pub use store::{DocumentStore, MemoryStore, StoreError};
pub use types::{Entry, Fingerprint, FullResponse, IndexHandle, Payload, Transformed};

/// The `ConnectorError` enum represents the errors surfaced by the filter and the HTTP client.
#[derive(Error, Debug)]
pub enum ConnectorError {
    /// A caller-supplied argument is missing or unusable. Raised before any I/O happens.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    /// The document store failed while resolving an index or running a query.
    #[error("Store query failed for doctype {doctype}: {source}")]
    StoreQueryFailed {
        doctype: String,
        #[source]
        source: StoreError,
    },
    /// Represents an error raised by the HTTP layer, including non-2xx statuses.
    #[error("HTTP request failed: {0}")]
    TransportFailure(#[from] reqwest::Error),
    /// The server answered with a non-2xx status that is not an HTTP error, such as a redirect
    /// the client was configured not to follow.
    #[error("HTTP request failed: unexpected status {status} from {url}")]
    UnexpectedStatus {
        status: reqwest::StatusCode,
        url: String,
    },
    /// A configured header name or value is not valid HTTP.
    #[error("Invalid header: {0}")]
    InvalidHeader(String),
    /// A CSS selector could not be parsed.
    #[error("Invalid CSS selector: {0}")]
    InvalidSelector(String),
    /// Loading client overrides from a file or the environment failed.
    #[error("Configuration error: {0}")]
    Config(#[from] ::config::ConfigError),
}

/// A type alias for `Result` with the `ConnectorError` error type.
pub type Result<T> = std::result::Result<T, ConnectorError>;

// Constants

/// The default timeout duration for HTTP requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// The default maximum number of redirects followed per request.
pub const DEFAULT_MAX_REDIRECTS: usize = 10;
/// Browser user agent sent by default. Plenty of sites reject obvious bots.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:36.0) Gecko/20100101 Firefox/36.0";
/// Field used as the deduplication key when none is configured.
pub const DEFAULT_KEY: &str = "id";
/// Separator placed between key values when building a fingerprint.
pub const FINGERPRINT_DELIMITER: &str = "####";
