use reqwest::Method;

use crate::{
    gate::{
        ensure_bulk_size, process_in_chunks, MAX_BROADCAST_PAYLOAD_SIZE,
        MAX_BROADCAST_TRANSACTIONS, MAX_TRANSACTIONS_PER_REQUEST, MAX_TRANSACTION_SIZE,
        MAX_UTXOS_PER_REQUEST,
    },
    models::{Outpoint, SpentOutputRecord, TxInfo, TxStatus},
    wire::{self, OutpointList, RawTx, TxIdList},
    Chain, Resource, Result, WhatsOnChainClient, WocError,
};

/// Strips whitespace and surrounding quotes from a broadcast response.
pub(crate) fn clean_txid(body: &[u8]) -> String {
    String::from_utf8_lossy(body)
        .trim()
        .trim_matches('"')
        .to_owned()
}

fn broadcast_failure(err: WocError) -> WocError {
    match err {
        WocError::RequestFailed { ref body, .. } => WocError::BroadcastFailed {
            body: body.clone(),
            source: Box::new(err),
        },
        other => other,
    }
}

/// Validates a bulk broadcast batch and serializes it as a JSON array.
fn broadcast_payload(tx_hexes: &[String]) -> Result<Vec<u8>> {
    ensure_bulk_size(
        tx_hexes,
        MAX_BROADCAST_TRANSACTIONS,
        WocError::MaxTransactionsExceeded,
    )?;
    // An odd trailing nibble still occupies a byte.
    if tx_hexes
        .iter()
        .any(|hex| hex.len().div_ceil(2) > MAX_TRANSACTION_SIZE)
    {
        return Err(WocError::MaxTransactionSizeExceeded);
    }
    let payload = serde_json::to_vec(tx_hexes)?;
    if payload.len() > MAX_BROADCAST_PAYLOAD_SIZE {
        return Err(WocError::MaxPayloadSizeExceeded);
    }
    Ok(payload)
}

impl WhatsOnChainClient {
    pub async fn get_tx_by_hash(&self, hash: &str) -> Result<TxInfo> {
        let url = self.build_url("/tx/hash/{}", &[hash.into()])?;
        self.request_json(Method::GET, &url, None, Resource::Transaction)
            .await
    }

    /// Details for up to 20 transactions in one request.
    pub async fn bulk_tx_details(&self, txids: &[String]) -> Result<Vec<TxInfo>> {
        ensure_bulk_size(
            txids,
            MAX_TRANSACTIONS_PER_REQUEST,
            WocError::MaxTransactionsExceeded,
        )?;
        let url = self.build_url("/txs", &[])?;
        let body = wire::to_body(&TxIdList { txids })?;
        self.request_json_list(Method::POST, &url, body, Resource::Transaction)
            .await
    }

    /// Like [`bulk_tx_details`](Self::bulk_tx_details) for any number of
    /// ids, sent in chunks of 20.
    pub async fn bulk_tx_details_processor(&self, txids: &[String]) -> Result<Vec<TxInfo>> {
        process_in_chunks(txids, MAX_TRANSACTIONS_PER_REQUEST, |chunk| {
            self.bulk_tx_details(chunk)
        })
        .await
    }

    pub async fn bulk_tx_status(&self, txids: &[String]) -> Result<Vec<TxStatus>> {
        ensure_bulk_size(
            txids,
            MAX_TRANSACTIONS_PER_REQUEST,
            WocError::MaxTransactionsExceeded,
        )?;
        let url = self.build_url("/txs/status", &[])?;
        let body = wire::to_body(&TxIdList { txids })?;
        self.request_json_list(Method::POST, &url, body, Resource::Transaction)
            .await
    }

    pub async fn get_raw_tx_hex(&self, hash: &str) -> Result<String> {
        let url = self.build_url("/tx/{}/hex", &[hash.into()])?;
        let hex = self
            .request_text(Method::GET, &url, None, Resource::Transaction)
            .await?;
        Ok(hex.trim().to_owned())
    }

    pub async fn get_raw_tx_bin(&self, hash: &str) -> Result<Vec<u8>> {
        let url = self.build_url("/tx/{}/bin", &[hash.into()])?;
        self.request_bytes(Method::GET, &url, Resource::Transaction)
            .await
    }

    pub async fn get_raw_tx_output_hex(&self, hash: &str, index: u32) -> Result<String> {
        let url = self.build_url("/tx/{}/out/{}/hex", &[hash.into(), index.into()])?;
        let hex = self
            .request_text(Method::GET, &url, None, Resource::Transaction)
            .await?;
        Ok(hex.trim().to_owned())
    }

    /// TSC-format merkle proof for a confirmed transaction.
    pub async fn get_merkle_proof(&self, hash: &str) -> Result<serde_json::Value> {
        let url = self.build_url("/tx/{}/proof/tsc", &[hash.into()])?;
        self.request_json(Method::GET, &url, None, Resource::Transaction)
            .await
    }

    /// OP_RETURN data carried by a transaction. BSV only.
    pub async fn get_tx_opreturn(&self, hash: &str) -> Result<String> {
        let url = self.build_chain_url(Chain::Bsv, "/tx/{}/opreturn", &[hash.into()])?;
        self.request_text(Method::GET, &url, None, Resource::Transaction)
            .await
    }

    /// Network propagation status of a transaction. BSV only.
    pub async fn get_tx_propagation(&self, hash: &str) -> Result<serde_json::Value> {
        let url = self.build_chain_url(Chain::Bsv, "/tx/{}/propagation", &[hash.into()])?;
        self.request_json(Method::GET, &url, None, Resource::Transaction)
            .await
    }

    /// PDF receipt for a transaction.
    pub async fn get_receipt_pdf(&self, hash: &str) -> Result<Vec<u8>> {
        let url = self.build_url("/receipt/{}", &[hash.into()])?;
        self.request_bytes(Method::GET, &url, Resource::Transaction)
            .await
    }

    /// Spending transaction, if any, for up to 20 outputs.
    pub async fn bulk_spent_outputs(&self, utxos: &[Outpoint]) -> Result<Vec<SpentOutputRecord>> {
        ensure_bulk_size(utxos, MAX_UTXOS_PER_REQUEST, WocError::MaxUtxosExceeded)?;
        let url = self.build_url("/utxos/spent", &[])?;
        let body = wire::to_body(&OutpointList { utxos })?;
        self.request_json_list(Method::POST, &url, body, Resource::Transaction)
            .await
    }

    /// Broadcasts one raw transaction and returns its txid.
    ///
    /// A non-2xx answer is [`WocError::BroadcastFailed`] carrying the
    /// server's reason.
    pub async fn broadcast_tx(&self, tx_hex: &str) -> Result<String> {
        let tx_hex = tx_hex.trim();
        if tx_hex.is_empty() {
            return Err(WocError::MissingRequest);
        }
        let url = self.build_url("/tx/raw", &[])?;
        let body = wire::to_body(&RawTx { txhex: tx_hex })?;
        let response = self
            .request(Method::POST, &url, body)
            .await
            .map_err(broadcast_failure)?;
        Ok(clean_txid(&response))
    }

    /// Broadcasts up to 100 raw transactions in one request.
    ///
    /// With `feedback` the server reports per-transaction results; the raw
    /// response text is returned either way.
    pub async fn bulk_broadcast(&self, tx_hexes: &[String], feedback: bool) -> Result<String> {
        let payload = broadcast_payload(tx_hexes)?;
        let url = self.build_url("/tx/broadcast?feedback={}", &[feedback.into()])?;
        let response = self
            .request(Method::POST, &url, Some(payload))
            .await
            .map_err(broadcast_failure)?;
        Ok(String::from_utf8_lossy(&response).trim().to_owned())
    }
}
