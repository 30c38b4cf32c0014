use std::fmt;

use crate::{Chain, Network};

/// Resource families with a dedicated "not found" identity.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Resource {
    Address,
    Block,
    Transaction,
    Script,
    ChainInfo,
    ChainTips,
    ExchangeRate,
    MempoolInfo,
    Headers,
    PeerInfo,
    Token,
    Stats,
}

impl Resource {
    /// Identity of the not-found error for this resource.
    pub fn not_found_kind(self) -> ErrorKind {
        match self {
            Self::Address => ErrorKind::AddressNotFound,
            Self::Block => ErrorKind::BlockNotFound,
            Self::Transaction => ErrorKind::TransactionNotFound,
            Self::Script => ErrorKind::ScriptNotFound,
            Self::ChainInfo => ErrorKind::ChainInfoNotFound,
            Self::ChainTips => ErrorKind::ChainTipsNotFound,
            Self::ExchangeRate => ErrorKind::ExchangeRateNotFound,
            Self::MempoolInfo => ErrorKind::MempoolInfoNotFound,
            Self::Headers => ErrorKind::HeadersNotFound,
            Self::PeerInfo => ErrorKind::PeerInfoNotFound,
            Self::Token => ErrorKind::TokenNotFound,
            Self::Stats => ErrorKind::StatsNotFound,
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Address => "address",
            Self::Block => "block",
            Self::Transaction => "transaction",
            Self::Script => "script",
            Self::ChainInfo => "chain info",
            Self::ChainTips => "chain tips",
            Self::ExchangeRate => "exchange rate",
            Self::MempoolInfo => "mempool info",
            Self::Headers => "headers",
            Self::PeerInfo => "peer info",
            Self::Token => "token",
            Self::Stats => "stats",
        };
        f.write_str(name)
    }
}

/// Stable identity of an error, comparable with `==`.
///
/// Use [`WocError::is`] to test an identity anywhere in the cause chain.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ErrorKind {
    MissingRequest,
    BadRequest,
    MaxAddressesExceeded,
    MaxScriptsExceeded,
    MaxTransactionsExceeded,
    MaxUtxosExceeded,
    MaxPayloadSizeExceeded,
    MaxTransactionSizeExceeded,
    BsvChainRequired,
    BtcChainRequired,
    AddressNotFound,
    BlockNotFound,
    TransactionNotFound,
    ScriptNotFound,
    ChainInfoNotFound,
    ChainTipsNotFound,
    ExchangeRateNotFound,
    MempoolInfoNotFound,
    HeadersNotFound,
    PeerInfoNotFound,
    TokenNotFound,
    StatsNotFound,
    RequestFailed,
    BroadcastFailed,
    Transport,
    Decode,
    Canceled,
    DeadlineExceeded,
    InvalidChain,
    InvalidNetwork,
    UnsupportedNetwork,
    InvalidUrl,
    InvalidHeader,
    RequestBody,
}

/// Error type returned by this crate.
#[derive(Debug, thiserror::Error)]
pub enum WocError {
    /// A required input was empty.
    #[error("missing request")]
    MissingRequest,
    /// Input rejected before any network call.
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("max limit of addresses exceeded")]
    MaxAddressesExceeded,
    #[error("max limit of scripts exceeded")]
    MaxScriptsExceeded,
    #[error("max limit of transactions exceeded")]
    MaxTransactionsExceeded,
    #[error("max limit of utxos exceeded")]
    MaxUtxosExceeded,
    #[error("max overall payload size exceeded")]
    MaxPayloadSizeExceeded,
    #[error("max transaction size exceeded")]
    MaxTransactionSizeExceeded,
    /// Endpoint is only served on the BSV chain.
    #[error("this endpoint requires the bsv chain")]
    BsvChainRequired,
    /// Endpoint is only served on the BTC chain.
    #[error("this endpoint requires the btc chain")]
    BtcChainRequired,
    /// The server signaled absence (404 or an empty 2xx body).
    #[error("{resource} not found")]
    NotFound {
        resource: Resource,
        /// HTTP failure that was mapped to this error, if any.
        source: Option<Box<WocError>>,
    },
    /// Non-success HTTP status code with the leading part of the body.
    #[error("request failed with status {status}: {body}")]
    RequestFailed { status: u16, body: String },
    /// Raw transaction broadcast was rejected.
    #[error("broadcast failed: {body}")]
    BroadcastFailed {
        body: String,
        #[source]
        source: Box<WocError>,
    },
    /// Network or request execution error from `reqwest`.
    #[error("transport error: {0}")]
    Transport(reqwest::Error),
    /// Response body was not the JSON shape expected.
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("context canceled")]
    Canceled,
    #[error("context deadline exceeded")]
    DeadlineExceeded,
    #[error("invalid chain '{0}'")]
    InvalidChain(String),
    #[error("invalid network '{0}'")]
    InvalidNetwork(String),
    #[error("network '{network}' is not available on chain '{chain}'")]
    UnsupportedNetwork { chain: Chain, network: Network },
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("invalid value for header '{0}'")]
    InvalidHeader(&'static str),
    /// Request body could not be buffered for replay across retries.
    #[error("request body cannot be replayed: {0}")]
    RequestBody(String),
}

impl WocError {
    pub(crate) fn not_found(resource: Resource) -> Self {
        Self::NotFound {
            resource,
            source: None,
        }
    }

    /// Identity of this error, ignoring anything it wraps.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingRequest => ErrorKind::MissingRequest,
            Self::BadRequest(_) => ErrorKind::BadRequest,
            Self::MaxAddressesExceeded => ErrorKind::MaxAddressesExceeded,
            Self::MaxScriptsExceeded => ErrorKind::MaxScriptsExceeded,
            Self::MaxTransactionsExceeded => ErrorKind::MaxTransactionsExceeded,
            Self::MaxUtxosExceeded => ErrorKind::MaxUtxosExceeded,
            Self::MaxPayloadSizeExceeded => ErrorKind::MaxPayloadSizeExceeded,
            Self::MaxTransactionSizeExceeded => ErrorKind::MaxTransactionSizeExceeded,
            Self::BsvChainRequired => ErrorKind::BsvChainRequired,
            Self::BtcChainRequired => ErrorKind::BtcChainRequired,
            Self::NotFound { resource, .. } => resource.not_found_kind(),
            Self::RequestFailed { .. } => ErrorKind::RequestFailed,
            Self::BroadcastFailed { .. } => ErrorKind::BroadcastFailed,
            Self::Transport(_) => ErrorKind::Transport,
            Self::Decode(_) => ErrorKind::Decode,
            Self::Canceled => ErrorKind::Canceled,
            Self::DeadlineExceeded => ErrorKind::DeadlineExceeded,
            Self::InvalidChain(_) => ErrorKind::InvalidChain,
            Self::InvalidNetwork(_) => ErrorKind::InvalidNetwork,
            Self::UnsupportedNetwork { .. } => ErrorKind::UnsupportedNetwork,
            Self::InvalidUrl(_) => ErrorKind::InvalidUrl,
            Self::InvalidHeader(_) => ErrorKind::InvalidHeader,
            Self::RequestBody(_) => ErrorKind::RequestBody,
        }
    }

    /// Reports whether `kind` identifies this error or any error it wraps.
    pub fn is(&self, kind: ErrorKind) -> bool {
        if self.kind() == kind {
            return true;
        }
        match self {
            Self::NotFound {
                source: Some(inner),
                ..
            } => inner.is(kind),
            Self::BroadcastFailed { source, .. } => source.is(kind),
            _ => false,
        }
    }

    /// HTTP status carried by this error or the error it wraps.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::RequestFailed { status, .. } => Some(*status),
            Self::NotFound {
                source: Some(inner),
                ..
            } => inner.status(),
            Self::BroadcastFailed { source, .. } => source.status(),
            Self::Transport(err) => err.status().map(|status| status.as_u16()),
            _ => None,
        }
    }

    pub(crate) fn is_context(&self) -> bool {
        matches!(self, Self::Canceled | Self::DeadlineExceeded)
    }
}
