use std::{fmt, sync::Arc, time::Duration};

use crate::{Backoff, Chain, HttpExecutor, Network};

pub const DEFAULT_RATE_LIMIT: u32 = 3;
pub const DEFAULT_RETRY_COUNT: usize = 2;
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_DIALER_KEEP_ALIVE: Duration = Duration::from_secs(20);
pub const DEFAULT_DIALER_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_TRANSPORT_IDLE_TIMEOUT: Duration = Duration::from_secs(20);
pub const DEFAULT_TLS_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_EXPECT_CONTINUE_TIMEOUT: Duration = Duration::from_secs(3);
pub const DEFAULT_MAX_IDLE_CONNECTIONS: usize = 10;

/// Default `User-Agent` header value.
pub fn default_user_agent() -> String {
    format!("whatsonchain-rs:v{}", env!("CARGO_PKG_VERSION"))
}

/// Core request options: routing, identity and retry policy.
#[derive(Clone, Eq, PartialEq)]
pub struct ClientOptions {
    pub chain: Chain,
    pub network: Network,
    /// Sent as `woc-api-key` when set.
    pub api_key: Option<String>,
    pub user_agent: String,
    /// Requests per second allowed by the API-key tier. Advisory only;
    /// `0` means unlimited.
    pub rate_limit: u32,
    /// Upper bound for a single attempt.
    pub request_timeout: Duration,
    /// Attempts made after the first one on retryable outcomes.
    pub retry_count: usize,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            chain: Chain::Bsv,
            network: Network::Main,
            api_key: None,
            user_agent: default_user_agent(),
            rate_limit: DEFAULT_RATE_LIMIT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            retry_count: DEFAULT_RETRY_COUNT,
        }
    }
}

impl fmt::Debug for ClientOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientOptions")
            .field("chain", &self.chain)
            .field("network", &self.network)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("user_agent", &self.user_agent)
            .field("rate_limit", &self.rate_limit)
            .field("request_timeout", &self.request_timeout)
            .field("retry_count", &self.retry_count)
            .finish()
    }
}

/// TCP connection settings.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct DialerConfig {
    pub keep_alive: Duration,
    /// Connect timeout.
    pub timeout: Duration,
}

impl Default for DialerConfig {
    fn default() -> Self {
        Self {
            keep_alive: DEFAULT_DIALER_KEEP_ALIVE,
            timeout: DEFAULT_DIALER_TIMEOUT,
        }
    }
}

/// Connection pool settings.
///
/// `tls_handshake_timeout` and `expect_continue_timeout` are kept for
/// reporting; the reqwest connector has no equivalent knobs, so the TLS
/// handshake is bounded by the request timeout instead.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TransportConfig {
    pub idle_timeout: Duration,
    pub tls_handshake_timeout: Duration,
    pub expect_continue_timeout: Duration,
    pub max_idle_connections: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            idle_timeout: DEFAULT_TRANSPORT_IDLE_TIMEOUT,
            tls_handshake_timeout: DEFAULT_TLS_HANDSHAKE_TIMEOUT,
            expect_continue_timeout: DEFAULT_EXPECT_CONTINUE_TIMEOUT,
            max_idle_connections: DEFAULT_MAX_IDLE_CONNECTIONS,
        }
    }
}

/// One construction-time setting; see the `with_*` functions.
#[derive(Clone)]
pub enum ClientOption {
    Chain(Chain),
    Network(Network),
    ApiKey(String),
    UserAgent(String),
    RateLimit(u32),
    RequestTimeout(Duration),
    RequestRetryCount(usize),
    Backoff(Backoff),
    Dialer(DialerConfig),
    Transport(TransportConfig),
    HttpClient(Arc<dyn HttpExecutor>),
}

impl fmt::Debug for ClientOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Chain(chain) => f.debug_tuple("Chain").field(chain).finish(),
            Self::Network(network) => f.debug_tuple("Network").field(network).finish(),
            Self::ApiKey(_) => f.debug_tuple("ApiKey").field(&"<redacted>").finish(),
            Self::UserAgent(agent) => f.debug_tuple("UserAgent").field(agent).finish(),
            Self::RateLimit(limit) => f.debug_tuple("RateLimit").field(limit).finish(),
            Self::RequestTimeout(timeout) => {
                f.debug_tuple("RequestTimeout").field(timeout).finish()
            }
            Self::RequestRetryCount(count) => {
                f.debug_tuple("RequestRetryCount").field(count).finish()
            }
            Self::Backoff(backoff) => f.debug_tuple("Backoff").field(backoff).finish(),
            Self::Dialer(dialer) => f.debug_tuple("Dialer").field(dialer).finish(),
            Self::Transport(transport) => f.debug_tuple("Transport").field(transport).finish(),
            Self::HttpClient(_) => f.write_str("HttpClient(..)"),
        }
    }
}

pub fn with_chain(chain: Chain) -> ClientOption {
    ClientOption::Chain(chain)
}

pub fn with_network(network: Network) -> ClientOption {
    ClientOption::Network(network)
}

pub fn with_api_key(api_key: impl Into<String>) -> ClientOption {
    ClientOption::ApiKey(api_key.into())
}

pub fn with_user_agent(user_agent: impl Into<String>) -> ClientOption {
    ClientOption::UserAgent(user_agent.into())
}

/// Advisory requests-per-second value; `0` disables limiting.
pub fn with_rate_limit(rate_limit: u32) -> ClientOption {
    ClientOption::RateLimit(rate_limit)
}

pub fn with_request_timeout(timeout: Duration) -> ClientOption {
    ClientOption::RequestTimeout(timeout)
}

pub fn with_request_retry_count(retry_count: usize) -> ClientOption {
    ClientOption::RequestRetryCount(retry_count)
}

pub fn with_backoff(
    initial: Duration,
    max: Duration,
    factor: f64,
    max_jitter: Duration,
) -> ClientOption {
    ClientOption::Backoff(Backoff::new(initial, max, factor, max_jitter))
}

pub fn with_dialer(keep_alive: Duration, timeout: Duration) -> ClientOption {
    ClientOption::Dialer(DialerConfig {
        keep_alive,
        timeout,
    })
}

pub fn with_transport(
    idle_timeout: Duration,
    tls_handshake_timeout: Duration,
    expect_continue_timeout: Duration,
    max_idle_connections: usize,
) -> ClientOption {
    ClientOption::Transport(TransportConfig {
        idle_timeout,
        tls_handshake_timeout,
        expect_continue_timeout,
        max_idle_connections,
    })
}

/// Replaces the managed transport; retries and timeouts become the
/// executor's responsibility.
pub fn with_http_client(executor: Arc<dyn HttpExecutor>) -> ClientOption {
    ClientOption::HttpClient(executor)
}

/// Every option group, as assembled at construction time.
#[derive(Clone, Default)]
pub(crate) struct Settings {
    pub options: ClientOptions,
    pub backoff: Backoff,
    pub dialer: DialerConfig,
    pub transport: TransportConfig,
    pub http_client: Option<Arc<dyn HttpExecutor>>,
}

impl Settings {
    pub fn from_options<I>(options: I) -> Self
    where
        I: IntoIterator<Item = ClientOption>,
    {
        let mut settings = Self::default();
        for option in options {
            settings.apply(option);
        }
        settings
    }

    pub fn apply(&mut self, option: ClientOption) {
        match option {
            ClientOption::Chain(chain) => self.options.chain = chain,
            ClientOption::Network(network) => self.options.network = network,
            ClientOption::ApiKey(api_key) => {
                self.options.api_key = (!api_key.is_empty()).then_some(api_key)
            }
            ClientOption::UserAgent(user_agent) => self.options.user_agent = user_agent,
            ClientOption::RateLimit(rate_limit) => self.options.rate_limit = rate_limit,
            ClientOption::RequestTimeout(timeout) => self.options.request_timeout = timeout,
            ClientOption::RequestRetryCount(count) => self.options.retry_count = count,
            ClientOption::Backoff(backoff) => self.backoff = backoff,
            ClientOption::Dialer(dialer) => self.dialer = dialer,
            ClientOption::Transport(transport) => self.transport = transport,
            ClientOption::HttpClient(executor) => self.http_client = Some(executor),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{
        with_api_key, with_backoff, with_chain, with_network, with_request_retry_count,
        ClientOptions, Settings,
    };
    use crate::{Chain, Network};

    #[test]
    fn defaults_match_documented_values() {
        let settings = Settings::default();
        assert_eq!(settings.options.chain, Chain::Bsv);
        assert_eq!(settings.options.network, Network::Main);
        assert_eq!(settings.options.rate_limit, 3);
        assert_eq!(settings.options.retry_count, 2);
        assert_eq!(settings.options.request_timeout, Duration::from_secs(30));
        assert_eq!(settings.backoff.initial, Duration::from_millis(2));
        assert_eq!(settings.backoff.max, Duration::from_millis(10));
        assert_eq!(settings.backoff.factor, 2.0);
        assert_eq!(settings.backoff.max_jitter, Duration::from_millis(2));
        assert_eq!(settings.dialer.keep_alive, Duration::from_secs(20));
        assert_eq!(settings.dialer.timeout, Duration::from_secs(5));
        assert_eq!(settings.transport.idle_timeout, Duration::from_secs(20));
        assert_eq!(settings.transport.tls_handshake_timeout, Duration::from_secs(5));
        assert_eq!(settings.transport.expect_continue_timeout, Duration::from_secs(3));
        assert_eq!(settings.transport.max_idle_connections, 10);
        assert!(settings.options.user_agent.starts_with("whatsonchain-rs:v"));
        assert!(settings.http_client.is_none());
    }

    #[test]
    fn later_options_override_earlier_ones() {
        let settings = Settings::from_options([
            with_chain(Chain::Btc),
            with_request_retry_count(7),
            with_chain(Chain::Bsv),
            with_network(Network::Test),
            with_request_retry_count(1),
        ]);
        assert_eq!(settings.options.chain, Chain::Bsv);
        assert_eq!(settings.options.network, Network::Test);
        assert_eq!(settings.options.retry_count, 1);
    }

    #[test]
    fn backoff_option_sets_every_field() {
        let settings = Settings::from_options([with_backoff(
            Duration::from_millis(5),
            Duration::from_millis(50),
            3.0,
            Duration::ZERO,
        )]);
        assert_eq!(settings.backoff.initial, Duration::from_millis(5));
        assert_eq!(settings.backoff.max, Duration::from_millis(50));
        assert_eq!(settings.backoff.factor, 3.0);
        assert_eq!(settings.backoff.max_jitter, Duration::ZERO);
    }

    #[test]
    fn empty_api_key_means_unset() {
        let settings = Settings::from_options([with_api_key("key"), with_api_key("")]);
        assert_eq!(settings.options.api_key, None);
    }

    #[test]
    fn debug_redacts_api_key() {
        let options = ClientOptions {
            api_key: Some("secret-key".to_owned()),
            ..ClientOptions::default()
        };
        let debug = format!("{options:?}");
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains("secret-key"));
    }
}
