use std::{
    fmt,
    sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
    time::Duration,
};

use reqwest::{
    header::{HeaderValue, CONTENT_TYPE, USER_AGENT},
    Method, Url,
};

use crate::{
    options::Settings,
    transport::{HttpExecutor, RetryingExecutor},
    types::ensure_network_available,
    Backoff, Chain, ClientOption, ClientOptions, Context, DialerConfig, LastRequest, Network,
    Result, TransportConfig, WocError,
};

/// Header carrying the API key.
pub const API_KEY_HEADER: &str = "woc-api-key";

/// Longest body prefix carried by [`WocError::RequestFailed`], in characters.
const ERROR_BODY_PREFIX_CHARS: usize = 200;

/// Client for the WhatsOnChain API.
///
/// Cloning is cheap and clones share options, transport and the
/// [`LastRequest`] record. All getters and setters take `&self` and may be
/// called concurrently with in-flight requests.
#[derive(Clone)]
pub struct WhatsOnChainClient {
    shared: Arc<Shared>,
    ctx: Context,
}

struct Shared {
    options: RwLock<ClientOptions>,
    backoff: RwLock<Backoff>,
    dialer: RwLock<DialerConfig>,
    transport: RwLock<TransportConfig>,
    executor: RwLock<ExecutorSlot>,
    last_request: RwLock<LastRequest>,
}

struct ExecutorSlot {
    executor: Arc<dyn HttpExecutor>,
    caller_supplied: bool,
    /// Retry count of the [`RetryingExecutor`] layered over a managed
    /// client, `None` when requests go straight to the inner executor.
    retry_layer: Option<usize>,
}

impl ExecutorSlot {
    fn caller_supplied(executor: Arc<dyn HttpExecutor>) -> Self {
        Self {
            executor,
            caller_supplied: true,
            retry_layer: None,
        }
    }
}

impl fmt::Debug for ExecutorSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutorSlot")
            .field("caller_supplied", &self.caller_supplied)
            .field("retry_layer", &self.retry_layer)
            .finish_non_exhaustive()
    }
}

/// Option fields the managed executor is built from.
#[derive(Clone, Copy)]
struct ManagedConfig {
    request_timeout: Duration,
    retry_count: usize,
    backoff: Backoff,
    dialer: DialerConfig,
    transport: TransportConfig,
}

fn read_lock<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write_lock<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

fn build_managed_executor(config: &ManagedConfig) -> Result<ExecutorSlot> {
    let http = reqwest::Client::builder()
        .timeout(config.request_timeout)
        .connect_timeout(config.dialer.timeout)
        .tcp_keepalive(config.dialer.keep_alive)
        .pool_idle_timeout(config.transport.idle_timeout)
        .pool_max_idle_per_host(config.transport.max_idle_connections)
        .build()
        .map_err(WocError::Transport)?;

    if config.retry_count == 0 {
        return Ok(ExecutorSlot {
            executor: Arc::new(http),
            caller_supplied: false,
            retry_layer: None,
        });
    }
    Ok(ExecutorSlot {
        executor: Arc::new(RetryingExecutor::new(
            Arc::new(http),
            config.backoff,
            config.retry_count,
        )),
        caller_supplied: false,
        retry_layer: Some(config.retry_count),
    })
}

impl fmt::Debug for WhatsOnChainClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Same lock order as `reconfigure`: executor slot first.
        let executor = read_lock(&self.shared.executor);
        f.debug_struct("WhatsOnChainClient")
            .field("options", &*read_lock(&self.shared.options))
            .field("backoff", &*read_lock(&self.shared.backoff))
            .field("dialer", &*read_lock(&self.shared.dialer))
            .field("transport", &*read_lock(&self.shared.transport))
            .field("executor", &*executor)
            .finish()
    }
}

impl WhatsOnChainClient {
    /// Creates a client bound to `ctx`, applying `options` in order.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use whatsonchain::{with_api_key, with_chain, Chain, Context, WhatsOnChainClient};
    ///
    /// let client = WhatsOnChainClient::new(
    ///     Context::background(),
    ///     [with_chain(Chain::Bsv), with_api_key("my-key")],
    /// )?;
    /// # Ok::<(), whatsonchain::WocError>(())
    /// ```
    pub fn new<I>(ctx: Context, options: I) -> Result<Self>
    where
        I: IntoIterator<Item = ClientOption>,
    {
        Self::from_settings(ctx, Settings::from_options(options))
    }

    fn from_settings(ctx: Context, settings: Settings) -> Result<Self> {
        let Settings {
            options,
            backoff,
            dialer,
            transport,
            http_client,
        } = settings;
        ensure_network_available(options.chain, options.network)?;

        let slot = match http_client {
            Some(executor) => ExecutorSlot::caller_supplied(executor),
            None => build_managed_executor(&ManagedConfig {
                request_timeout: options.request_timeout,
                retry_count: options.retry_count,
                backoff,
                dialer,
                transport,
            })?,
        };

        Ok(Self {
            shared: Arc::new(Shared {
                options: RwLock::new(options),
                backoff: RwLock::new(backoff),
                dialer: RwLock::new(dialer),
                transport: RwLock::new(transport),
                executor: RwLock::new(slot),
                last_request: RwLock::new(LastRequest::default()),
            }),
            ctx,
        })
    }

    /// Creates a client from optional environment variables.
    ///
    /// Reads `WOC_API_KEY`, `WOC_CHAIN` (`bsv`/`btc`) and `WOC_NETWORK`
    /// (`main`/`test`/`stn`). Unset or empty variables keep the defaults.
    pub fn from_env() -> Result<Self> {
        let mut options = Vec::new();
        if let Some(chain) = non_empty_env("WOC_CHAIN") {
            options.push(ClientOption::Chain(chain.parse()?));
        }
        if let Some(network) = non_empty_env("WOC_NETWORK") {
            options.push(ClientOption::Network(network.parse()?));
        }
        if let Some(api_key) = non_empty_env("WOC_API_KEY") {
            options.push(ClientOption::ApiKey(api_key));
        }
        Self::new(Context::background(), options)
    }

    /// Returns a handle sharing this client's state but bound to `ctx`.
    pub fn with_context(&self, ctx: Context) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            ctx,
        }
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// Snapshot of the core options.
    pub fn options(&self) -> ClientOptions {
        read_lock(&self.shared.options).clone()
    }

    pub fn chain(&self) -> Chain {
        read_lock(&self.shared.options).chain
    }

    pub fn network(&self) -> Network {
        read_lock(&self.shared.options).network
    }

    /// Chain and network read under one lock acquisition.
    pub fn chain_and_network(&self) -> (Chain, Network) {
        let options = read_lock(&self.shared.options);
        (options.chain, options.network)
    }

    pub fn api_key(&self) -> Option<String> {
        read_lock(&self.shared.options).api_key.clone()
    }

    pub fn user_agent(&self) -> String {
        read_lock(&self.shared.options).user_agent.clone()
    }

    pub fn rate_limit(&self) -> u32 {
        read_lock(&self.shared.options).rate_limit
    }

    pub fn request_timeout(&self) -> Duration {
        read_lock(&self.shared.options).request_timeout
    }

    pub fn request_retry_count(&self) -> usize {
        read_lock(&self.shared.options).retry_count
    }

    pub fn backoff(&self) -> Backoff {
        *read_lock(&self.shared.backoff)
    }

    pub fn dialer(&self) -> DialerConfig {
        *read_lock(&self.shared.dialer)
    }

    pub fn transport(&self) -> TransportConfig {
        *read_lock(&self.shared.transport)
    }

    /// Whether requests go through a caller-supplied executor.
    pub fn uses_custom_http_client(&self) -> bool {
        read_lock(&self.shared.executor).caller_supplied
    }

    /// Copy of the most recent request record.
    pub fn last_request(&self) -> LastRequest {
        read_lock(&self.shared.last_request).clone()
    }

    /// Switches chain. Fails if the current network does not exist on `chain`.
    pub fn set_chain(&self, chain: Chain) -> Result<()> {
        let mut options = write_lock(&self.shared.options);
        ensure_network_available(chain, options.network)?;
        options.chain = chain;
        Ok(())
    }

    /// Switches network. Fails for `stn` on the BTC chain.
    pub fn set_network(&self, network: Network) -> Result<()> {
        let mut options = write_lock(&self.shared.options);
        ensure_network_available(options.chain, network)?;
        options.network = network;
        Ok(())
    }

    /// Switches chain and network together.
    pub fn set_chain_and_network(&self, chain: Chain, network: Network) -> Result<()> {
        ensure_network_available(chain, network)?;
        let mut options = write_lock(&self.shared.options);
        options.chain = chain;
        options.network = network;
        Ok(())
    }

    /// Sets the API key; an empty key removes it.
    pub fn set_api_key(&self, api_key: impl Into<String>) {
        let api_key = api_key.into();
        write_lock(&self.shared.options).api_key = (!api_key.is_empty()).then_some(api_key);
    }

    pub fn set_user_agent(&self, user_agent: impl Into<String>) {
        write_lock(&self.shared.options).user_agent = user_agent.into();
    }

    pub fn set_rate_limit(&self, rate_limit: u32) {
        write_lock(&self.shared.options).rate_limit = rate_limit;
    }

    pub fn set_request_timeout(&self, timeout: Duration) -> Result<()> {
        self.reconfigure(|config| config.request_timeout = timeout)
    }

    pub fn set_request_retry_count(&self, retry_count: usize) -> Result<()> {
        self.reconfigure(|config| config.retry_count = retry_count)
    }

    pub fn set_backoff(
        &self,
        initial: Duration,
        max: Duration,
        factor: f64,
        max_jitter: Duration,
    ) -> Result<()> {
        let backoff = Backoff::new(initial, max, factor, max_jitter);
        self.reconfigure(|config| config.backoff = backoff)
    }

    pub fn set_dialer(&self, keep_alive: Duration, timeout: Duration) -> Result<()> {
        self.reconfigure(|config| {
            config.dialer = DialerConfig {
                keep_alive,
                timeout,
            }
        })
    }

    pub fn set_transport(
        &self,
        idle_timeout: Duration,
        tls_handshake_timeout: Duration,
        expect_continue_timeout: Duration,
        max_idle_connections: usize,
    ) -> Result<()> {
        self.reconfigure(|config| {
            config.transport = TransportConfig {
                idle_timeout,
                tls_handshake_timeout,
                expect_continue_timeout,
                max_idle_connections,
            }
        })
    }

    /// Replaces the transport with a caller-supplied executor.
    pub fn set_http_client(&self, executor: Arc<dyn HttpExecutor>) {
        *write_lock(&self.shared.executor) = ExecutorSlot::caller_supplied(executor);
    }

    /// Applies `update` to the executor-relevant options and rebuilds the
    /// managed executor from them.
    ///
    /// The executor slot lock is held throughout, so reconfigurations are
    /// serialized and the stored options always match the live executor.
    /// The option groups are committed while all their write locks are held,
    /// so a reader taking them in the same order (executor, options, backoff,
    /// dialer, transport) never sees half of an update. Individual getters
    /// each read one group. Nothing is committed when the rebuild fails.
    /// Requests already holding the previous executor finish on it.
    fn reconfigure<F>(&self, update: F) -> Result<()>
    where
        F: FnOnce(&mut ManagedConfig),
    {
        let mut slot = write_lock(&self.shared.executor);

        let mut config = {
            let options = read_lock(&self.shared.options);
            ManagedConfig {
                request_timeout: options.request_timeout,
                retry_count: options.retry_count,
                backoff: *read_lock(&self.shared.backoff),
                dialer: *read_lock(&self.shared.dialer),
                transport: *read_lock(&self.shared.transport),
            }
        };
        update(&mut config);

        if !slot.caller_supplied {
            *slot = build_managed_executor(&config)?;
        }

        let mut options = write_lock(&self.shared.options);
        let mut backoff = write_lock(&self.shared.backoff);
        let mut dialer = write_lock(&self.shared.dialer);
        let mut transport = write_lock(&self.shared.transport);
        options.request_timeout = config.request_timeout;
        options.retry_count = config.retry_count;
        *backoff = config.backoff;
        *dialer = config.dialer;
        *transport = config.transport;
        Ok(())
    }

    /// Retry layer of the live executor slot.
    #[cfg(test)]
    fn retry_layer(&self) -> Option<usize> {
        read_lock(&self.shared.executor).retry_layer
    }

    /// Consistent copy of the executor-relevant option groups.
    #[cfg(test)]
    fn managed_snapshot(&self) -> (usize, Backoff, DialerConfig, TransportConfig) {
        let _executor = read_lock(&self.shared.executor);
        let options = read_lock(&self.shared.options);
        let backoff = read_lock(&self.shared.backoff);
        let dialer = read_lock(&self.shared.dialer);
        let transport = read_lock(&self.shared.transport);
        (options.retry_count, *backoff, *dialer, *transport)
    }

    fn executor(&self) -> Arc<dyn HttpExecutor> {
        Arc::clone(&read_lock(&self.shared.executor).executor)
    }

    fn record_last_request(&self, record: LastRequest) {
        *write_lock(&self.shared.last_request) = record;
    }

    /// Executes one API exchange and returns the raw response body.
    ///
    /// Non-2xx statuses yield [`WocError::RequestFailed`] carrying the status
    /// and the start of the body. JSON is not interpreted here.
    pub(crate) async fn request(
        &self,
        method: Method,
        url: &str,
        body: Option<Vec<u8>>,
    ) -> Result<Vec<u8>> {
        let (user_agent, api_key) = {
            let options = read_lock(&self.shared.options);
            (options.user_agent.clone(), options.api_key.clone())
        };

        let parsed =
            Url::parse(url).map_err(|err| WocError::InvalidUrl(format!("{url}: {err}")))?;
        let mut request = reqwest::Request::new(method.clone(), parsed);
        let headers = request.headers_mut();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&user_agent).map_err(|_| WocError::InvalidHeader("user-agent"))?,
        );
        if let Some(api_key) = api_key {
            headers.insert(
                API_KEY_HEADER,
                HeaderValue::from_str(&api_key).map_err(|_| WocError::InvalidHeader(API_KEY_HEADER))?,
            );
        }

        let sends_body = method == Method::POST || method == Method::PUT;
        if sends_body {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }
        let post_data = body
            .as_deref()
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
            .unwrap_or_default();
        if sends_body {
            *request.body_mut() = body.map(reqwest::Body::from);
        }

        let mut record = LastRequest {
            method: method.to_string(),
            url: url.to_owned(),
            post_data,
            status_code: 0,
        };

        let executor = self.executor();
        let response = match executor.execute(&self.ctx, request).await {
            Ok(response) => response,
            Err(err) => {
                self.record_last_request(record);
                return Err(err);
            }
        };

        let status = response.status();
        record.status_code = status.as_u16();
        let bytes = tokio::select! {
            bytes = response.bytes() => bytes.map_err(WocError::Transport),
            err = self.ctx.done() => Err(err),
        };
        self.record_last_request(record);
        let bytes = bytes?;

        #[cfg(feature = "tracing")]
        tracing::debug!(%method, url, status = status.as_u16(), "request completed");

        if status.is_success() {
            Ok(bytes.to_vec())
        } else {
            Err(WocError::RequestFailed {
                status: status.as_u16(),
                body: body_prefix(&bytes),
            })
        }
    }
}

fn body_prefix(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .trim()
        .chars()
        .take(ERROR_BODY_PREFIX_CHARS)
        .collect()
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, thread, time::Duration};

    use super::{body_prefix, WhatsOnChainClient};
    use crate::{
        with_api_key, with_chain, with_http_client, with_network, with_rate_limit,
        with_request_retry_count, Chain, Context, Network, WocError,
    };

    fn client(options: Vec<crate::ClientOption>) -> WhatsOnChainClient {
        WhatsOnChainClient::new(Context::background(), options).expect("client must build")
    }

    #[test]
    fn new_client_uses_defaults() {
        let client = client(vec![]);
        assert_eq!(client.chain_and_network(), (Chain::Bsv, Network::Main));
        assert_eq!(client.rate_limit(), 3);
        assert_eq!(client.request_retry_count(), 2);
        assert_eq!(client.request_timeout(), Duration::from_secs(30));
        assert_eq!(client.api_key(), None);
        assert!(!client.uses_custom_http_client());
        assert_eq!(client.last_request(), Default::default());
    }

    #[test]
    fn stn_on_btc_is_rejected_at_construction() {
        let err = WhatsOnChainClient::new(
            Context::background(),
            [with_chain(Chain::Btc), with_network(Network::Stn)],
        )
        .expect_err("stn does not exist on btc");
        assert!(matches!(
            err,
            WocError::UnsupportedNetwork {
                chain: Chain::Btc,
                network: Network::Stn
            }
        ));
    }

    #[test]
    fn setters_validate_chain_network_combination() {
        let client = client(vec![with_chain(Chain::Btc)]);
        assert!(client.set_network(Network::Stn).is_err());
        assert_eq!(client.network(), Network::Main);

        client.set_chain(Chain::Bsv).expect("bsv accepts any network");
        client.set_network(Network::Stn).expect("stn exists on bsv");
        assert!(client.set_chain(Chain::Btc).is_err());
        assert_eq!(client.chain_and_network(), (Chain::Bsv, Network::Stn));

        client
            .set_chain_and_network(Chain::Btc, Network::Test)
            .expect("valid pair");
        assert_eq!(client.chain_and_network(), (Chain::Btc, Network::Test));
    }

    #[test]
    fn reconfiguring_updates_option_snapshots() {
        let client = client(vec![with_rate_limit(0), with_request_retry_count(0)]);
        assert_eq!(client.rate_limit(), 0);

        client.set_request_retry_count(4).expect("rebuild must succeed");
        client
            .set_backoff(
                Duration::from_millis(1),
                Duration::from_millis(4),
                1.5,
                Duration::ZERO,
            )
            .expect("rebuild must succeed");
        client
            .set_dialer(Duration::from_secs(1), Duration::from_secs(2))
            .expect("rebuild must succeed");
        client
            .set_transport(
                Duration::from_secs(3),
                Duration::from_secs(4),
                Duration::from_secs(5),
                6,
            )
            .expect("rebuild must succeed");

        assert_eq!(client.request_retry_count(), 4);
        assert_eq!(client.backoff().factor, 1.5);
        assert_eq!(client.dialer().timeout, Duration::from_secs(2));
        assert_eq!(client.transport().max_idle_connections, 6);
    }

    #[test]
    fn caller_supplied_executor_survives_reconfiguration() {
        let client = client(vec![with_http_client(Arc::new(reqwest::Client::new()))]);
        assert!(client.uses_custom_http_client());
        client.set_request_retry_count(5).expect("no rebuild needed");
        assert!(client.uses_custom_http_client());
        assert_eq!(client.request_retry_count(), 5);
    }

    #[test]
    fn context_handles_share_state() {
        let client = client(vec![]);
        let scoped = client.with_context(Context::background().child());
        scoped.set_user_agent("scoped-agent");
        assert_eq!(client.user_agent(), "scoped-agent");
    }

    #[test]
    fn debug_redacts_api_key() {
        let client = client(vec![with_api_key("secret-key")]);
        let debug = format!("{client:?}");
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains("secret-key"));
    }

    #[test]
    fn concurrent_setters_and_readers_do_not_deadlock() {
        let client = client(vec![]);
        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let client = client.clone();
                thread::spawn(move || {
                    for round in 0..50 {
                        if worker % 2 == 0 {
                            let chain = if round % 2 == 0 { Chain::Btc } else { Chain::Bsv };
                            client
                                .set_chain_and_network(chain, Network::Main)
                                .expect("valid pair");
                            client
                                .set_request_retry_count(round % 3)
                                .expect("rebuild must succeed");
                        } else {
                            let (chain, network) = client.chain_and_network();
                            assert!(network.is_available_on(chain));
                            let _ = client.build_url("/chain/info", &[]);
                            let _ = client.options();
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("worker must not panic");
        }
    }

    #[test]
    fn managed_executor_gets_retry_layer_only_when_retrying() {
        let default = client(vec![]);
        assert_eq!(default.retry_layer(), Some(2));

        let plain = client(vec![with_request_retry_count(0)]);
        assert_eq!(plain.retry_layer(), None);

        plain.set_request_retry_count(3).expect("rebuild must succeed");
        assert_eq!(plain.retry_layer(), Some(3));
        plain.set_request_retry_count(0).expect("rebuild must succeed");
        assert_eq!(plain.retry_layer(), None);
    }

    #[test]
    fn caller_supplied_executor_never_gets_retry_layer() {
        let client = client(vec![]);
        client.set_http_client(Arc::new(reqwest::Client::new()));
        assert_eq!(client.retry_layer(), None);
        client.set_request_retry_count(4).expect("no rebuild needed");
        assert_eq!(client.retry_layer(), None);
        assert_eq!(client.request_retry_count(), 4);
    }

    #[test]
    fn reconfiguration_is_never_observed_half_applied() {
        let client = client(vec![]);
        let writers: Vec<_> = (0..4)
            .map(|worker| {
                let client = client.clone();
                thread::spawn(move || {
                    for round in 0..25usize {
                        let count = (worker + round) % 5;
                        client
                            .reconfigure(|config| {
                                config.retry_count = count;
                                config.backoff.factor = count as f64;
                                config.transport.max_idle_connections = count;
                            })
                            .expect("rebuild must succeed");
                    }
                })
            })
            .collect();
        let readers: Vec<_> = (0..4)
            .map(|_| {
                let client = client.clone();
                thread::spawn(move || {
                    for _ in 0..200 {
                        let (retry_count, backoff, _, transport) = client.managed_snapshot();
                        if retry_count == 2 && transport.max_idle_connections == 10 {
                            continue;
                        }
                        assert_eq!(backoff.factor, retry_count as f64);
                        assert_eq!(transport.max_idle_connections, retry_count);
                        let _ = format!("{client:?}");
                    }
                })
            })
            .collect();
        for handle in writers.into_iter().chain(readers) {
            handle.join().expect("worker must not panic");
        }
    }

    #[test]
    fn error_body_prefix_is_bounded() {
        let long = "x".repeat(1_000);
        assert_eq!(body_prefix(long.as_bytes()).len(), 200);
        assert_eq!(body_prefix(b"  short \n"), "short");
    }
}
