//! Preconditions checked before any network activity.

use std::future::Future;

use crate::{Chain, Result, WocError};

/// Most addresses accepted by one bulk request.
pub const MAX_ADDRESSES_PER_REQUEST: usize = 20;
/// Most scripts accepted by one bulk request.
pub const MAX_SCRIPTS_PER_REQUEST: usize = 20;
/// Most transaction ids accepted by one bulk lookup.
pub const MAX_TRANSACTIONS_PER_REQUEST: usize = 20;
/// Most outpoints accepted by one bulk spent check.
pub const MAX_UTXOS_PER_REQUEST: usize = 20;
/// Most raw transactions in one bulk broadcast.
pub const MAX_BROADCAST_TRANSACTIONS: usize = 100;
/// Largest single raw transaction in a bulk broadcast, in bytes.
pub const MAX_TRANSACTION_SIZE: usize = 100 * 1024;
/// Largest serialized bulk broadcast payload, in bytes.
pub const MAX_BROADCAST_PAYLOAD_SIZE: usize = 10 * 1024 * 1024;

/// Fails unless `configured` is the `required` chain.
pub(crate) fn require_chain(configured: Chain, required: Chain) -> Result<()> {
    if configured == required {
        return Ok(());
    }
    Err(match required {
        Chain::Bsv => WocError::BsvChainRequired,
        Chain::Btc => WocError::BtcChainRequired,
    })
}

/// Rejects an empty list with `MissingRequest` and a list longer than `max`
/// with `exceeded`.
pub(crate) fn ensure_bulk_size<T>(items: &[T], max: usize, exceeded: WocError) -> Result<()> {
    if items.is_empty() {
        return Err(WocError::MissingRequest);
    }
    if items.len() > max {
        return Err(exceeded);
    }
    Ok(())
}

/// Dispatches `items` in consecutive chunks of `chunk_size` and concatenates
/// the results in order. The first failing chunk aborts the batch.
pub(crate) async fn process_in_chunks<'a, I, T, F, Fut>(
    items: &'a [I],
    chunk_size: usize,
    mut dispatch: F,
) -> Result<Vec<T>>
where
    F: FnMut(&'a [I]) -> Fut,
    Fut: Future<Output = Result<Vec<T>>>,
{
    if items.is_empty() {
        return Err(WocError::MissingRequest);
    }
    let mut results = Vec::with_capacity(items.len());
    for chunk in items.chunks(chunk_size.max(1)) {
        results.extend(dispatch(chunk).await?);
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::{ensure_bulk_size, process_in_chunks, require_chain, MAX_ADDRESSES_PER_REQUEST};
    use crate::{Chain, ErrorKind, WocError};

    #[test]
    fn chain_gate_names_the_missing_chain() {
        assert!(require_chain(Chain::Bsv, Chain::Bsv).is_ok());
        let err = require_chain(Chain::Btc, Chain::Bsv).expect_err("bsv required");
        assert_eq!(err.kind(), ErrorKind::BsvChainRequired);
        let err = require_chain(Chain::Bsv, Chain::Btc).expect_err("btc required");
        assert_eq!(err.kind(), ErrorKind::BtcChainRequired);
    }

    #[test]
    fn bulk_size_bounds() {
        let twenty = vec!["a"; MAX_ADDRESSES_PER_REQUEST];
        assert!(ensure_bulk_size(&twenty, 20, WocError::MaxAddressesExceeded).is_ok());

        let twenty_one = vec!["a"; 21];
        let err = ensure_bulk_size(&twenty_one, 20, WocError::MaxAddressesExceeded)
            .expect_err("21 is over the limit");
        assert_eq!(err.kind(), ErrorKind::MaxAddressesExceeded);

        let empty: Vec<&str> = vec![];
        let err = ensure_bulk_size(&empty, 20, WocError::MaxAddressesExceeded)
            .expect_err("empty input");
        assert_eq!(err.kind(), ErrorKind::MissingRequest);
    }

    #[tokio::test]
    async fn chunks_preserve_order_and_sizes() {
        let items: Vec<u32> = (0..45).collect();
        let sizes = Mutex::new(Vec::new());

        let out = process_in_chunks(&items, 20, |chunk| {
            sizes.lock().expect("sizes mutex").push(chunk.len());
            let doubled: Vec<u32> = chunk.iter().map(|n| n * 2).collect();
            async move { Ok(doubled) }
        })
        .await
        .expect("all chunks succeed");

        assert_eq!(*sizes.lock().expect("sizes mutex"), vec![20, 20, 5]);
        assert_eq!(out, (0..45).map(|n| n * 2).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn failing_chunk_aborts_the_batch() {
        let items: Vec<u32> = (0..60).collect();
        let calls = Mutex::new(0usize);

        let err = process_in_chunks(&items, 20, |chunk| {
            *calls.lock().expect("calls mutex") += 1;
            let first = chunk[0];
            async move {
                if first == 20 {
                    Err(WocError::RequestFailed {
                        status: 500,
                        body: "boom".to_owned(),
                    })
                } else {
                    Ok(vec![first])
                }
            }
        })
        .await
        .expect_err("second chunk fails");

        assert_eq!(err.kind(), ErrorKind::RequestFailed);
        assert_eq!(*calls.lock().expect("calls mutex"), 2);
    }
}
