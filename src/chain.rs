//! Network-wide endpoints: health, chain state, mempool and exchange rates.

use reqwest::Method;

use crate::{
    decode::decode_object,
    models::{ChainInfo, ChainTip, ExchangeRate, MempoolInfo, PeerInfo},
    Resource, Result, WhatsOnChainClient, WocError,
};

/// Body returned by the health endpoint when the service is up.
pub const HEALTH_OK: &str = "Whats On Chain";

impl WhatsOnChainClient {
    /// Service health check; returns the plain-text status line.
    pub async fn get_health(&self) -> Result<String> {
        let url = self.build_url("/woc", &[])?;
        let body = self.request(Method::GET, &url, None).await?;
        Ok(String::from_utf8_lossy(&body).trim().to_owned())
    }

    pub async fn get_chain_info(&self) -> Result<ChainInfo> {
        let url = self.build_url("/chain/info", &[])?;
        self.request_json(Method::GET, &url, None, Resource::ChainInfo)
            .await
    }

    pub async fn get_chain_tips(&self) -> Result<Vec<ChainTip>> {
        let url = self.build_url("/chain/tips", &[])?;
        self.request_json_list(Method::GET, &url, None, Resource::ChainTips)
            .await
    }

    /// Coins in circulation; the endpoint answers with a bare number.
    pub async fn get_circulating_supply(&self) -> Result<f64> {
        let url = self.build_url("/circulatingsupply", &[])?;
        let body = self
            .request_text(Method::GET, &url, None, Resource::ChainInfo)
            .await?;
        let supply: f64 = decode_object(body.trim().as_bytes())?;
        Ok(supply)
    }

    pub async fn get_peer_info(&self) -> Result<Vec<PeerInfo>> {
        let url = self.build_url("/peer/info", &[])?;
        self.request_json_list(Method::GET, &url, None, Resource::PeerInfo)
            .await
    }

    pub async fn get_mempool_info(&self) -> Result<MempoolInfo> {
        let url = self.build_url("/mempool/info", &[])?;
        self.request_json(Method::GET, &url, None, Resource::MempoolInfo)
            .await
    }

    /// Ids of the transactions currently in the mempool.
    pub async fn get_mempool_transactions(&self) -> Result<Vec<String>> {
        let url = self.build_url("/mempool/raw", &[])?;
        self.request_json_list(Method::GET, &url, None, Resource::MempoolInfo)
            .await
    }

    pub async fn get_exchange_rate(&self) -> Result<ExchangeRate> {
        let url = self.build_url("/exchangerate", &[])?;
        self.request_json(Method::GET, &url, None, Resource::ExchangeRate)
            .await
    }

    /// Exchange rates between two unix timestamps.
    pub async fn get_historical_exchange_rate(&self, from: i64, to: i64) -> Result<Vec<ExchangeRate>> {
        if from > to {
            return Err(WocError::BadRequest(format!(
                "range start {from} is after range end {to}"
            )));
        }
        let url = self.build_url(
            "/exchangerate/historical?from={}&to={}",
            &[from.into(), to.into()],
        )?;
        self.request_json_list(Method::GET, &url, None, Resource::ExchangeRate)
            .await
    }
}
