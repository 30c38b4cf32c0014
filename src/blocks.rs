use reqwest::Method;

use crate::{
    models::{BlockHeader, BlockInfo},
    Chain, Resource, Result, WhatsOnChainClient,
};

impl WhatsOnChainClient {
    pub async fn get_block_by_hash(&self, hash: &str) -> Result<BlockInfo> {
        let url = self.build_url("/block/hash/{}", &[hash.into()])?;
        self.request_json(Method::GET, &url, None, Resource::Block)
            .await
    }

    pub async fn get_block_by_height(&self, height: u64) -> Result<BlockInfo> {
        let url = self.build_url("/block/height/{}", &[height.into()])?;
        self.request_json(Method::GET, &url, None, Resource::Block)
            .await
    }

    /// Transaction ids of one page of a large block (pages start at 1).
    pub async fn get_block_pages(&self, hash: &str, page: u64) -> Result<Vec<String>> {
        let url = self.build_url("/block/hash/{}/page/{}", &[hash.into(), page.into()])?;
        self.request_json_list(Method::GET, &url, None, Resource::Block)
            .await
    }

    pub async fn get_header_by_hash(&self, hash: &str) -> Result<BlockHeader> {
        let url = self.build_url("/block/{}/header", &[hash.into()])?;
        self.request_json(Method::GET, &url, None, Resource::Headers)
            .await
    }

    /// Most recent block headers.
    pub async fn get_headers(&self) -> Result<Vec<BlockHeader>> {
        let url = self.build_url("/block/headers", &[])?;
        self.request_json_list(Method::GET, &url, None, Resource::Headers)
            .await
    }

    pub async fn get_block_stats(&self, hash: &str) -> Result<serde_json::Value> {
        let url = self.build_url("/block/hash/{}/stats", &[hash.into()])?;
        self.request_json(Method::GET, &url, None, Resource::Stats)
            .await
    }

    pub async fn get_block_stats_by_height(&self, height: u64) -> Result<serde_json::Value> {
        let url = self.build_url("/block/height/{}/stats", &[height.into()])?;
        self.request_json(Method::GET, &url, None, Resource::Stats)
            .await
    }

    /// Per-miner block statistics over the last `days` days. BSV only.
    pub async fn get_miner_block_stats(&self, days: u32) -> Result<Vec<serde_json::Value>> {
        let url = self.build_chain_url(Chain::Bsv, "/miner/blocks/stats?days={}", &[days.into()])?;
        self.request_json_list(Method::GET, &url, None, Resource::Stats)
            .await
    }

    /// Transaction ids of a block. BTC only.
    pub async fn get_block_txids(&self, hash: &str) -> Result<Vec<String>> {
        let url = self.build_chain_url(Chain::Btc, "/block/hash/{}/txids", &[hash.into()])?;
        self.request_json_list(Method::GET, &url, None, Resource::Block)
            .await
    }
}
