//! HTTP API the room client calls besides the socket.
//!
//! The [`ApiClient`] trait keeps the store independent of any HTTP stack. With
//! the default `http-reqwest` feature, [`HttpApiClient`] implements it on top of
//! `reqwest`.

use async_trait::async_trait;

use crate::error::Result;
use crate::permissions::PermissionsMetadata;

/// The server's REST endpoints used by the client.
#[async_trait]
pub trait ApiClient: Send + Sync + 'static {
    /// `POST /user {username}`: claim a display name for this session.
    async fn claim_username(&self, username: &str) -> Result<()>;

    /// `GET /data/permissions`.
    async fn fetch_permissions(&self) -> Result<PermissionsMetadata>;
}

#[cfg(feature = "http-reqwest")]
pub use self::http::HttpApiClient;

#[cfg(feature = "http-reqwest")]
mod http {
    use std::time::Duration;

    use async_trait::async_trait;
    use serde::Serialize;
    use tracing::debug;

    use super::ApiClient;
    use crate::error::Result;
    use crate::permissions::PermissionsMetadata;

    const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

    #[derive(Serialize)]
    struct ClaimUsername<'a> {
        username: &'a str,
    }

    /// [`ApiClient`] over `reqwest`.
    ///
    /// `base_url` is the API root, e.g. `https://example.com/api`.
    #[derive(Debug, Clone)]
    pub struct HttpApiClient {
        client: reqwest::Client,
        base_url: String,
    }

    impl HttpApiClient {
        /// Create a client for the given API root.
        ///
        /// # Errors
        ///
        /// Returns [`OttError::Http`](crate::OttError::Http) if the underlying
        /// HTTP client cannot be built.
        pub fn new(base_url: impl Into<String>) -> Result<Self> {
            let client = reqwest::Client::builder()
                .timeout(DEFAULT_REQUEST_TIMEOUT)
                .cookie_store(true)
                .build()?;
            Ok(Self::with_client(client, base_url))
        }

        /// Use a preconfigured `reqwest` client.
        pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
            let base_url = base_url.into().trim_end_matches('/').to_string();
            Self { client, base_url }
        }

        fn url(&self, path: &str) -> String {
            format!("{}{path}", self.base_url)
        }
    }

    #[async_trait]
    impl ApiClient for HttpApiClient {
        async fn claim_username(&self, username: &str) -> Result<()> {
            debug!(%username, "claiming username");
            self.client
                .post(self.url("/user"))
                .json(&ClaimUsername { username })
                .send()
                .await?
                .error_for_status()?;
            Ok(())
        }

        async fn fetch_permissions(&self) -> Result<PermissionsMetadata> {
            let metadata = self
                .client
                .get(self.url("/data/permissions"))
                .send()
                .await?
                .error_for_status()?
                .json::<PermissionsMetadata>()
                .await?;
            Ok(metadata)
        }
    }

    #[cfg(test)]
    #[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    mod tests {
        use super::*;

        #[test]
        fn base_url_trailing_slash_is_trimmed() {
            let api = HttpApiClient::with_client(reqwest::Client::new(), "http://localhost:8080/api/");
            assert_eq!(api.url("/user"), "http://localhost:8080/api/user");
        }
    }
}
