//! Address endpoints.

use reqwest::Method;

use crate::{
    decode::decode_object,
    gate::{ensure_bulk_size, process_in_chunks, MAX_ADDRESSES_PER_REQUEST},
    models::{AddressBalance, AddressBalanceRecord, AddressInfo, History, Unspent},
    wire::{self, AddressList},
    Chain, Resource, Result, WhatsOnChainClient, WocError,
};

impl WhatsOnChainClient {
    pub async fn get_address_info(&self, address: &str) -> Result<AddressInfo> {
        let url = self.build_url("/address/{}/info", &[address.into()])?;
        self.request_json(Method::GET, &url, None, Resource::Address)
            .await
    }

    /// Whether the address has ever appeared on chain. BSV only.
    pub async fn get_address_used(&self, address: &str) -> Result<bool> {
        let url = self.build_chain_url(Chain::Bsv, "/address/{}/used", &[address.into()])?;
        let body = self
            .request_text(Method::GET, &url, None, Resource::Address)
            .await?;
        decode_object(body.trim().as_bytes())
    }

    pub async fn get_address_confirmed_balance(&self, address: &str) -> Result<AddressBalance> {
        let url = self.build_url("/address/{}/confirmed/balance", &[address.into()])?;
        self.request_json(Method::GET, &url, None, Resource::Address)
            .await
    }

    pub async fn get_address_unconfirmed_balance(&self, address: &str) -> Result<AddressBalance> {
        let url = self.build_url("/address/{}/unconfirmed/balance", &[address.into()])?;
        self.request_json(Method::GET, &url, None, Resource::Address)
            .await
    }

    /// Confirmed and unconfirmed balance from two requests.
    #[deprecated(note = "use get_address_confirmed_balance and get_address_unconfirmed_balance")]
    pub async fn get_address_balance(&self, address: &str) -> Result<AddressBalance> {
        let confirmed = self.get_address_confirmed_balance(address).await?;
        let unconfirmed = self.get_address_unconfirmed_balance(address).await?;
        Ok(AddressBalance {
            confirmed: confirmed.confirmed,
            unconfirmed: unconfirmed.unconfirmed,
        })
    }

    pub async fn bulk_confirmed_balance(
        &self,
        addresses: &[String],
    ) -> Result<Vec<AddressBalanceRecord>> {
        self.bulk_address_call("/addresses/confirmed/balance", addresses)
            .await
    }

    pub async fn bulk_unconfirmed_balance(
        &self,
        addresses: &[String],
    ) -> Result<Vec<AddressBalanceRecord>> {
        self.bulk_address_call("/addresses/unconfirmed/balance", addresses)
            .await
    }

    /// Confirmed balances for any number of addresses, sent in chunks of 20.
    pub async fn bulk_balance_processor(
        &self,
        addresses: &[String],
    ) -> Result<Vec<AddressBalanceRecord>> {
        process_in_chunks(addresses, MAX_ADDRESSES_PER_REQUEST, |chunk| {
            self.bulk_confirmed_balance(chunk)
        })
        .await
    }

    pub async fn get_address_confirmed_history(&self, address: &str) -> Result<History> {
        let url = self.build_url("/address/{}/confirmed/history", &[address.into()])?;
        self.request_json(Method::GET, &url, None, Resource::Address)
            .await
    }

    pub async fn get_address_unconfirmed_history(&self, address: &str) -> Result<History> {
        let url = self.build_url("/address/{}/unconfirmed/history", &[address.into()])?;
        self.request_json(Method::GET, &url, None, Resource::Address)
            .await
    }

    /// Confirmed history followed by unconfirmed history.
    #[deprecated(
        note = "use get_address_confirmed_history and get_address_unconfirmed_history"
    )]
    pub async fn get_address_history(&self, address: &str) -> Result<History> {
        let mut history = self.get_address_confirmed_history(address).await?;
        let unconfirmed = self.get_address_unconfirmed_history(address).await?;
        history.result.extend(unconfirmed.result);
        if history.address.is_empty() {
            history.address = unconfirmed.address;
        }
        Ok(history)
    }

    pub async fn get_address_confirmed_unspent(&self, address: &str) -> Result<Unspent> {
        let url = self.build_url("/address/{}/confirmed/unspent", &[address.into()])?;
        self.request_json(Method::GET, &url, None, Resource::Address)
            .await
    }

    pub async fn get_address_unconfirmed_unspent(&self, address: &str) -> Result<Unspent> {
        let url = self.build_url("/address/{}/unconfirmed/unspent", &[address.into()])?;
        self.request_json(Method::GET, &url, None, Resource::Address)
            .await
    }

    pub async fn bulk_confirmed_unspent(&self, addresses: &[String]) -> Result<Vec<Unspent>> {
        self.bulk_address_call("/addresses/confirmed/unspent", addresses)
            .await
    }

    /// Confirmed unspent outputs for any number of addresses, sent in chunks
    /// of 20.
    pub async fn bulk_unspent_processor(&self, addresses: &[String]) -> Result<Vec<Unspent>> {
        process_in_chunks(addresses, MAX_ADDRESSES_PER_REQUEST, |chunk| {
            self.bulk_confirmed_unspent(chunk)
        })
        .await
    }

    /// PDF statement for an address. BSV only.
    pub async fn get_address_statement_pdf(&self, address: &str) -> Result<Vec<u8>> {
        let url = self.build_chain_url(Chain::Bsv, "/statement/{}", &[address.into()])?;
        self.request_bytes(Method::GET, &url, Resource::Address)
            .await
    }

    async fn bulk_address_call<T>(&self, path: &str, addresses: &[String]) -> Result<Vec<T>>
    where
        T: serde::de::DeserializeOwned,
    {
        ensure_bulk_size(
            addresses,
            MAX_ADDRESSES_PER_REQUEST,
            WocError::MaxAddressesExceeded,
        )?;
        let url = self.build_url(path, &[])?;
        let body = wire::to_body(&AddressList { addresses })?;
        self.request_json_list(Method::POST, &url, body, Resource::Address)
            .await
    }
}
