//! JSON request payloads.

use serde::Serialize;

use crate::{models::Outpoint, Result};

#[derive(Debug, Serialize)]
pub struct AddressList<'a> {
    pub addresses: &'a [String],
}

#[derive(Debug, Serialize)]
pub struct ScriptList<'a> {
    pub scripts: &'a [String],
}

#[derive(Debug, Serialize)]
pub struct TxIdList<'a> {
    pub txids: &'a [String],
}

#[derive(Debug, Serialize)]
pub struct RawTx<'a> {
    pub txhex: &'a str,
}

#[derive(Debug, Serialize)]
pub struct OutpointList<'a> {
    pub utxos: &'a [Outpoint],
}

pub fn to_body<T: Serialize>(payload: &T) -> Result<Option<Vec<u8>>> {
    Ok(Some(serde_json::to_vec(payload)?))
}

#[cfg(test)]
mod tests {
    use super::{to_body, AddressList, RawTx};

    #[test]
    fn address_list_serializes_under_addresses_key() {
        let addresses = vec!["1A".to_owned(), "1B".to_owned()];
        let body = to_body(&AddressList {
            addresses: &addresses,
        })
        .expect("must serialize")
        .expect("body present");
        assert_eq!(body, br#"{"addresses":["1A","1B"]}"#);
    }

    #[test]
    fn raw_tx_serializes_txhex() {
        let body = to_body(&RawTx { txhex: "0100" })
            .expect("must serialize")
            .expect("body present");
        assert_eq!(body, br#"{"txhex":"0100"}"#);
    }
}
