//! Response records returned by the API.
//!
//! Every field defaults, so partial objects (or `{}`) decode to zeroed
//! records rather than failing.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AddressInfo {
    pub isvalid: bool,
    pub address: String,
    #[serde(rename = "scriptPubKey")]
    pub script_pub_key: String,
    pub ismine: bool,
    pub iswatchonly: bool,
    pub isscript: bool,
}

/// Confirmed and unconfirmed balance in satoshis.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AddressBalance {
    pub confirmed: i64,
    pub unconfirmed: i64,
}

/// One entry of a bulk balance response.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AddressBalanceRecord {
    pub address: String,
    pub confirmed: i64,
    pub unconfirmed: i64,
    pub error: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryRecord {
    pub tx_hash: String,
    pub height: i64,
}

/// History page for an address or script.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct History {
    pub address: String,
    pub script: String,
    pub result: Vec<HistoryRecord>,
    pub error: String,
    #[serde(rename = "nextPageToken", skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnspentOutput {
    pub height: i64,
    pub tx_pos: u32,
    pub tx_hash: String,
    pub value: i64,
    #[serde(rename = "isSpentInMempoolTx")]
    pub is_spent_in_mempool_tx: bool,
    pub status: String,
}

/// Unspent outputs for an address or script.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Unspent {
    pub address: String,
    pub script: String,
    pub result: Vec<UnspentOutput>,
    pub error: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptSig {
    pub asm: String,
    pub hex: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TxInput {
    pub coinbase: String,
    pub txid: String,
    pub vout: u32,
    #[serde(rename = "scriptSig")]
    pub script_sig: ScriptSig,
    pub sequence: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptPubKey {
    pub asm: String,
    pub hex: String,
    #[serde(rename = "reqSigs")]
    pub req_sigs: u32,
    #[serde(rename = "type")]
    pub kind: String,
    pub addresses: Vec<String>,
    #[serde(rename = "isTruncated")]
    pub is_truncated: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TxOutput {
    /// Amount in coins, as reported by the node.
    pub value: f64,
    pub n: u32,
    #[serde(rename = "scriptPubKey")]
    pub script_pub_key: ScriptPubKey,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TxInfo {
    pub txid: String,
    pub hash: String,
    pub version: i32,
    pub size: u64,
    pub locktime: u32,
    pub vin: Vec<TxInput>,
    pub vout: Vec<TxOutput>,
    pub blockhash: String,
    pub confirmations: u64,
    pub time: i64,
    pub blocktime: i64,
    pub blockheight: i64,
    /// Set by bulk lookups when one id could not be resolved.
    pub error: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TxStatus {
    pub txid: String,
    pub blockhash: String,
    pub blockheight: i64,
    pub blocktime: i64,
    pub confirmations: u64,
    pub error: String,
}

/// Output reference used by spent checks.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Outpoint {
    pub txid: String,
    pub vout: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpentIn {
    pub txid: String,
    pub vin: u32,
    pub status: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpentOutputRecord {
    pub utxo: Outpoint,
    #[serde(rename = "spentIn", skip_serializing_if = "Option::is_none")]
    pub spent_in: Option<SpentIn>,
    pub error: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockPages {
    pub uri: Vec<String>,
    pub size: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockInfo {
    pub hash: String,
    pub confirmations: i64,
    pub size: u64,
    pub height: u64,
    pub version: i64,
    #[serde(rename = "versionHex")]
    pub version_hex: String,
    pub merkleroot: String,
    pub txcount: u64,
    pub tx: Vec<String>,
    pub time: i64,
    pub mediantime: i64,
    pub nonce: u64,
    pub bits: String,
    pub difficulty: f64,
    pub chainwork: String,
    pub previousblockhash: String,
    pub nextblockhash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pages: Option<BlockPages>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockHeader {
    pub hash: String,
    pub confirmations: i64,
    pub size: u64,
    pub height: u64,
    pub version: i64,
    #[serde(rename = "versionHex")]
    pub version_hex: String,
    pub merkleroot: String,
    pub time: i64,
    pub mediantime: i64,
    pub nonce: u64,
    pub bits: String,
    pub difficulty: f64,
    pub chainwork: String,
    #[serde(rename = "nTx")]
    pub tx_count: u64,
    pub previousblockhash: String,
    pub nextblockhash: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainInfo {
    pub chain: String,
    pub blocks: u64,
    pub headers: u64,
    pub bestblockhash: String,
    pub difficulty: f64,
    pub mediantime: i64,
    pub verificationprogress: f64,
    pub pruned: bool,
    pub chainwork: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainTip {
    pub height: u64,
    pub hash: String,
    pub branchlen: u64,
    pub status: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeerInfo {
    pub id: i64,
    pub addr: String,
    pub version: i64,
    pub subver: String,
    pub inbound: bool,
    pub startingheight: i64,
    pub banscore: i64,
    pub synced_headers: i64,
    pub synced_blocks: i64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MempoolInfo {
    pub size: u64,
    pub bytes: u64,
    pub usage: u64,
    pub maxmempool: u64,
    pub mempoolminfee: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExchangeRate {
    pub currency: String,
    pub rate: f64,
    pub time: i64,
}

/// Result of one transaction in a bulk broadcast with feedback.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BroadcastFeedback {
    pub txid: String,
    pub error: String,
}
