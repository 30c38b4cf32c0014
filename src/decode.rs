use reqwest::Method;
use serde::de::DeserializeOwned;

use crate::{Resource, Result, WhatsOnChainClient, WocError};

/// Maps a 404 from the request engine onto the resource's not-found error.
pub(crate) fn not_found_on_404(err: WocError, resource: Resource) -> WocError {
    match err {
        WocError::RequestFailed { status: 404, .. } => WocError::NotFound {
            resource,
            source: Some(Box::new(err)),
        },
        other => other,
    }
}

/// Decodes a non-empty body into `T`; JSON `null` yields `T::default()`.
pub(crate) fn decode_object<T>(body: &[u8]) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    Ok(serde_json::from_slice::<Option<T>>(body)?.unwrap_or_default())
}

/// Decodes a non-empty body into a sequence; JSON `null` yields an empty vec.
pub(crate) fn decode_list<T>(body: &[u8]) -> Result<Vec<T>>
where
    T: DeserializeOwned,
{
    Ok(serde_json::from_slice::<Option<Vec<T>>>(body)?.unwrap_or_default())
}

impl WhatsOnChainClient {
    /// Runs the request and returns the body, mapping absence to
    /// `resource`'s not-found error.
    async fn request_present(
        &self,
        method: Method,
        url: &str,
        body: Option<Vec<u8>>,
        resource: Resource,
    ) -> Result<Vec<u8>> {
        let bytes = self
            .request(method, url, body)
            .await
            .map_err(|err| not_found_on_404(err, resource))?;
        if bytes.is_empty() {
            return Err(WocError::not_found(resource));
        }
        Ok(bytes)
    }

    pub(crate) async fn request_json<T>(
        &self,
        method: Method,
        url: &str,
        body: Option<Vec<u8>>,
        resource: Resource,
    ) -> Result<T>
    where
        T: DeserializeOwned + Default,
    {
        let bytes = self.request_present(method, url, body, resource).await?;
        decode_object(&bytes)
    }

    pub(crate) async fn request_json_list<T>(
        &self,
        method: Method,
        url: &str,
        body: Option<Vec<u8>>,
        resource: Resource,
    ) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
    {
        let bytes = self.request_present(method, url, body, resource).await?;
        decode_list(&bytes)
    }

    /// Response body as text, without parsing.
    pub(crate) async fn request_text(
        &self,
        method: Method,
        url: &str,
        body: Option<Vec<u8>>,
        resource: Resource,
    ) -> Result<String> {
        let bytes = self.request_present(method, url, body, resource).await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Response body as opaque bytes.
    pub(crate) async fn request_bytes(
        &self,
        method: Method,
        url: &str,
        resource: Resource,
    ) -> Result<Vec<u8>> {
        self.request_present(method, url, None, resource).await
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::{decode_list, decode_object, not_found_on_404};
    use crate::{ErrorKind, Resource, WocError};

    #[derive(Debug, Default, Deserialize, PartialEq)]
    #[serde(default)]
    struct Sample {
        name: String,
        height: u64,
    }

    #[test]
    fn null_and_empty_object_decode_to_default() {
        assert_eq!(decode_object::<Sample>(b"null").expect("null"), Sample::default());
        assert_eq!(decode_object::<Sample>(b"{}").expect("{}"), Sample::default());
    }

    #[test]
    fn null_and_empty_array_decode_to_empty_list() {
        assert!(decode_list::<Sample>(b"null").expect("null").is_empty());
        assert!(decode_list::<Sample>(b"[]").expect("[]").is_empty());
    }

    #[test]
    fn malformed_json_is_a_decode_error() {
        let err = decode_object::<Sample>(b"{\"height\":\"tall\"}").expect_err("must fail");
        assert_eq!(err.kind(), ErrorKind::Decode);
    }

    #[test]
    fn list_preserves_order() {
        let list: Vec<Sample> =
            decode_list(br#"[{"name":"a","height":1},{"name":"b","height":2}]"#).expect("list");
        assert_eq!(list[0].name, "a");
        assert_eq!(list[1].height, 2);
    }

    #[test]
    fn only_404_is_mapped_to_not_found() {
        let mapped = not_found_on_404(
            WocError::RequestFailed {
                status: 404,
                body: String::new(),
            },
            Resource::Block,
        );
        assert!(mapped.is(ErrorKind::BlockNotFound));
        assert!(mapped.is(ErrorKind::RequestFailed));

        let untouched = not_found_on_404(
            WocError::RequestFailed {
                status: 500,
                body: String::new(),
            },
            Resource::Block,
        );
        assert_eq!(untouched.kind(), ErrorKind::RequestFailed);
    }
}
