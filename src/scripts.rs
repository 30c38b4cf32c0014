use reqwest::Method;

use crate::{
    decode::decode_object,
    gate::{ensure_bulk_size, MAX_SCRIPTS_PER_REQUEST},
    models::{History, Unspent},
    wire::{self, ScriptList},
    Chain, Resource, Result, WhatsOnChainClient, WocError,
};

impl WhatsOnChainClient {
    /// Whether the script hash has ever appeared on chain. BSV only.
    pub async fn get_script_used(&self, script_hash: &str) -> Result<bool> {
        let url = self.build_chain_url(Chain::Bsv, "/script/{}/used", &[script_hash.into()])?;
        let body = self
            .request_text(Method::GET, &url, None, Resource::Script)
            .await?;
        decode_object(body.trim().as_bytes())
    }

    pub async fn get_script_confirmed_history(&self, script_hash: &str) -> Result<History> {
        let url = self.build_url("/script/{}/confirmed/history", &[script_hash.into()])?;
        self.request_json(Method::GET, &url, None, Resource::Script)
            .await
    }

    pub async fn get_script_unconfirmed_history(&self, script_hash: &str) -> Result<History> {
        let url = self.build_url("/script/{}/unconfirmed/history", &[script_hash.into()])?;
        self.request_json(Method::GET, &url, None, Resource::Script)
            .await
    }

    pub async fn get_script_confirmed_unspent(&self, script_hash: &str) -> Result<Unspent> {
        let url = self.build_url("/script/{}/confirmed/unspent", &[script_hash.into()])?;
        self.request_json(Method::GET, &url, None, Resource::Script)
            .await
    }

    /// Confirmed unspent outputs for up to 20 script hashes.
    pub async fn bulk_script_confirmed_unspent(&self, scripts: &[String]) -> Result<Vec<Unspent>> {
        ensure_bulk_size(scripts, MAX_SCRIPTS_PER_REQUEST, WocError::MaxScriptsExceeded)?;
        let url = self.build_url("/scripts/confirmed/unspent", &[])?;
        let body = wire::to_body(&ScriptList { scripts })?;
        self.request_json_list(Method::POST, &url, body, Resource::Script)
            .await
    }
}
