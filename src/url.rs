use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::{gate::require_chain, Chain, Network, Result, WhatsOnChainClient, WocError};

/// Root of every API route.
pub const API_BASE_URL: &str = "https://api.whatsonchain.com/v1/";

/// Characters escaped inside a single path segment: everything except
/// unreserved characters and the sub-delimiters allowed in a segment.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b'=')
    .remove(b':')
    .remove(b'@');

/// Argument substituted into a `{}` placeholder of a route template.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PathArg<'a> {
    /// Escaped as a path segment before substitution.
    Str(&'a str),
    /// Formatted verbatim.
    Int(i64),
    UInt(u64),
}

impl<'a> From<&'a str> for PathArg<'a> {
    fn from(value: &'a str) -> Self {
        Self::Str(value)
    }
}

impl<'a> From<&'a String> for PathArg<'a> {
    fn from(value: &'a String) -> Self {
        Self::Str(value.as_str())
    }
}

impl From<i64> for PathArg<'_> {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<u64> for PathArg<'_> {
    fn from(value: u64) -> Self {
        Self::UInt(value)
    }
}

impl From<u32> for PathArg<'_> {
    fn from(value: u32) -> Self {
        Self::UInt(value.into())
    }
}

impl From<bool> for PathArg<'_> {
    fn from(value: bool) -> Self {
        Self::Str(if value { "true" } else { "false" })
    }
}

/// Percent-escapes `value` for use as one path segment.
pub fn escape_path_segment(value: &str) -> String {
    utf8_percent_encode(value, PATH_SEGMENT).to_string()
}

/// Fills the `{}` placeholders of `template` in order.
///
/// Anything else in the template, query strings included, is copied as-is.
pub fn expand_template(template: &str, args: &[PathArg<'_>]) -> Result<String> {
    let mut out = String::with_capacity(template.len() + 16 * args.len());
    let mut args = args.iter();
    let mut rest = template;

    while let Some(index) = rest.find("{}") {
        out.push_str(&rest[..index]);
        let arg = args.next().ok_or_else(|| {
            WocError::BadRequest(format!("missing argument for route template '{template}'"))
        })?;
        match arg {
            PathArg::Str(value) => out.push_str(&escape_path_segment(value)),
            PathArg::Int(value) => out.push_str(&value.to_string()),
            PathArg::UInt(value) => out.push_str(&value.to_string()),
        }
        rest = &rest[index + 2..];
    }
    out.push_str(rest);

    if args.next().is_some() {
        return Err(WocError::BadRequest(format!(
            "too many arguments for route template '{template}'"
        )));
    }
    Ok(out)
}

impl WhatsOnChainClient {
    /// Builds the full endpoint URL for the configured chain and network.
    ///
    /// `build_url("/tx/hash/{}", &[txid.into()])` yields
    /// `https://api.whatsonchain.com/v1/bsv/main/tx/hash/<escaped txid>`.
    pub fn build_url(&self, template: &str, args: &[PathArg<'_>]) -> Result<String> {
        let (chain, network) = self.chain_and_network();
        endpoint_url(chain, network, template, args)
    }

    /// Like [`build_url`](Self::build_url) for an endpoint served only on
    /// `required`. The gate and the URL use one chain/network snapshot.
    pub(crate) fn build_chain_url(
        &self,
        required: Chain,
        template: &str,
        args: &[PathArg<'_>],
    ) -> Result<String> {
        let (chain, network) = self.chain_and_network();
        require_chain(chain, required)?;
        endpoint_url(chain, network, template, args)
    }
}

fn endpoint_url(
    chain: Chain,
    network: Network,
    template: &str,
    args: &[PathArg<'_>],
) -> Result<String> {
    let path = expand_template(template, args)?;
    Ok(format!("{API_BASE_URL}{chain}/{network}{path}"))
}

#[cfg(test)]
mod tests {
    use std::{
        sync::atomic::{AtomicBool, Ordering},
        sync::Arc,
        thread,
    };

    use super::{escape_path_segment, expand_template, PathArg};
    use crate::{with_chain, Chain, Context, ErrorKind, Network, WhatsOnChainClient, WocError};

    #[test]
    fn escapes_reserved_characters_in_segments() {
        assert_eq!(escape_path_segment("abc123"), "abc123");
        assert_eq!(escape_path_segment("a b/c?d#e%"), "a%20b%2Fc%3Fd%23e%25");
        assert_eq!(escape_path_segment("x:y@z=1+2&$"), "x:y@z=1+2&$");
        assert_eq!(escape_path_segment("ünï"), "%C3%BCn%C3%AF");
    }

    #[test]
    fn substitutes_strings_escaped_and_numbers_verbatim() {
        let path = expand_template(
            "/tx/{}/out/{}/hex",
            &[PathArg::from("dead beef"), PathArg::from(3u32)],
        )
        .expect("must expand");
        assert_eq!(path, "/tx/dead%20beef/out/3/hex");
    }

    #[test]
    fn query_strings_pass_through() {
        let path = expand_template(
            "/exchangerate/historical?from={}&to={}",
            &[PathArg::from(1_600_000_000i64), PathArg::from(1_700_000_000i64)],
        )
        .expect("must expand");
        assert_eq!(path, "/exchangerate/historical?from=1600000000&to=1700000000");
    }

    #[test]
    fn argument_count_mismatch_is_rejected() {
        assert!(matches!(
            expand_template("/block/hash/{}", &[]),
            Err(WocError::BadRequest(_))
        ));
        assert!(matches!(
            expand_template("/chain/info", &[PathArg::from("x")]),
            Err(WocError::BadRequest(_))
        ));
    }

    #[test]
    fn chain_gated_urls_check_the_configured_chain() {
        let client = WhatsOnChainClient::new(Context::background(), [with_chain(Chain::Btc)])
            .expect("client must build");
        let err = client
            .build_chain_url(Chain::Bsv, "/tx/{}/opreturn", &["ab".into()])
            .expect_err("opreturn is BSV only");
        assert_eq!(err.kind(), ErrorKind::BsvChainRequired);

        let url = client
            .build_chain_url(Chain::Btc, "/block/hash/{}/txids", &["ab".into()])
            .expect("btc endpoint on btc client");
        assert_eq!(url, "https://api.whatsonchain.com/v1/btc/main/block/hash/ab/txids");
    }

    #[test]
    fn gated_url_never_targets_the_other_chain_during_switches() {
        let client = WhatsOnChainClient::new(Context::background(), [with_chain(Chain::Bsv)])
            .expect("client must build");
        let done = Arc::new(AtomicBool::new(false));

        let switcher = {
            let client = client.clone();
            let done = Arc::clone(&done);
            thread::spawn(move || {
                let mut chain = Chain::Btc;
                while !done.load(Ordering::SeqCst) {
                    client
                        .set_chain_and_network(chain, Network::Main)
                        .expect("valid pair");
                    chain = if chain == Chain::Btc { Chain::Bsv } else { Chain::Btc };
                }
            })
        };

        for _ in 0..2_000 {
            match client.build_chain_url(Chain::Bsv, "/tx/{}/opreturn", &["ab".into()]) {
                Ok(url) => assert!(url.contains("/bsv/main/"), "gated url went to {url}"),
                Err(err) => assert_eq!(err.kind(), ErrorKind::BsvChainRequired),
            }
        }
        done.store(true, Ordering::SeqCst);
        switcher.join().expect("switcher must not panic");
    }
}
