//! `whatsonchain` is an async client for the WhatsOnChain blockchain API.
//!
//! Every endpoint goes through one request engine on
//! [`WhatsOnChainClient`], which:
//! - builds `https://api.whatsonchain.com/v1/{chain}/{network}{path}` URLs
//!   with escaped path arguments ([`WhatsOnChainClient::build_url`])
//! - sends identifying headers and retries transient failures with
//!   jittered exponential backoff ([`RetryingExecutor`])
//! - records the most recent exchange ([`WhatsOnChainClient::last_request`])
//! - maps 404s and empty bodies onto typed not-found errors ([`WocError`])
//!
//! Settings can be changed at runtime from any task; in-flight requests keep
//! the configuration they started with.

mod addresses;
mod backoff;
mod blocks;
mod chain;
mod client;
mod context;
mod decode;
mod error;
mod gate;
pub mod models;
mod options;
mod scripts;
mod tokens;
mod transactions;
mod transport;
mod types;
mod url;
mod wire;

pub use backoff::{
    Backoff, DEFAULT_BACKOFF_FACTOR, DEFAULT_BACKOFF_INITIAL, DEFAULT_BACKOFF_MAX,
    DEFAULT_BACKOFF_MAX_JITTER,
};
pub use chain::HEALTH_OK;
pub use client::{WhatsOnChainClient, API_KEY_HEADER};
pub use context::Context;
pub use error::{ErrorKind, Resource, WocError};
pub use gate::{
    MAX_ADDRESSES_PER_REQUEST, MAX_BROADCAST_PAYLOAD_SIZE, MAX_BROADCAST_TRANSACTIONS,
    MAX_SCRIPTS_PER_REQUEST, MAX_TRANSACTIONS_PER_REQUEST, MAX_TRANSACTION_SIZE,
    MAX_UTXOS_PER_REQUEST,
};
pub use options::{
    default_user_agent, with_api_key, with_backoff, with_chain, with_dialer, with_http_client,
    with_network, with_rate_limit, with_request_retry_count, with_request_timeout,
    with_transport, with_user_agent, ClientOption, ClientOptions, DialerConfig, TransportConfig,
    DEFAULT_DIALER_KEEP_ALIVE, DEFAULT_DIALER_TIMEOUT, DEFAULT_EXPECT_CONTINUE_TIMEOUT,
    DEFAULT_MAX_IDLE_CONNECTIONS, DEFAULT_RATE_LIMIT, DEFAULT_REQUEST_TIMEOUT,
    DEFAULT_RETRY_COUNT, DEFAULT_TLS_HANDSHAKE_TIMEOUT, DEFAULT_TRANSPORT_IDLE_TIMEOUT,
};
pub use transport::{is_retryable_status, ExecuteFuture, HttpExecutor, RetryingExecutor};
pub use types::{Chain, LastRequest, Network};
pub use url::{escape_path_segment, expand_template, PathArg, API_BASE_URL};

pub type Result<T> = std::result::Result<T, WocError>;
