//! Token endpoints. BSV only; responses are returned untyped.

use reqwest::Method;

use crate::{Chain, Resource, Result, WhatsOnChainClient};

impl WhatsOnChainClient {
    pub async fn get_token(&self, contract_id: &str, symbol: &str) -> Result<serde_json::Value> {
        let url = self.build_chain_url(
            Chain::Bsv,
            "/token/{}/{}",
            &[contract_id.into(), symbol.into()],
        )?;
        self.request_json(Method::GET, &url, None, Resource::Token)
            .await
    }

    pub async fn get_tokens(&self) -> Result<Vec<serde_json::Value>> {
        let url = self.build_chain_url(Chain::Bsv, "/tokens", &[])?;
        self.request_json_list(Method::GET, &url, None, Resource::Token)
            .await
    }
}
