//! Sign-in API.
//!
//! Every call that returns tokens hands them to the client's token store, so
//! subsequent requests pick them up without caller involvement.

use chatwire_auth::{AuthStatus, TokenGrant};
use reqwest::Method;

use crate::client::ChatwireClient;
use crate::error::Result;
use crate::types::{CodeExchangeRequest, SignInRequest};

/// Auth API client.
pub struct AuthApi {
    client: ChatwireClient,
}

impl AuthApi {
    pub(crate) fn new(client: ChatwireClient) -> Self {
        Self { client }
    }

    /// Sign in with email and password.
    pub async fn sign_in(
        &self,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<TokenGrant> {
        let request = SignInRequest {
            email: email.into(),
            password: password.into(),
        };
        self.client
            .pipeline()
            .authenticate("auth/login", &request)
            .await
    }

    /// Exchange an authorization code from a browser sign-in.
    pub async fn exchange_code(&self, request: CodeExchangeRequest) -> Result<TokenGrant> {
        self.client
            .pipeline()
            .authenticate("auth/token", &request)
            .await
    }

    /// Force a token refresh now.
    pub async fn refresh(&self) -> Result<()> {
        self.client.tokens().refresh().await?;
        Ok(())
    }

    /// Revoke the session server-side and wipe local credentials.
    ///
    /// Local credentials are cleared even when the server call fails.
    pub async fn sign_out(&self) -> Result<()> {
        let pipeline = self.client.pipeline();
        if pipeline.tokens().has_credential() {
            let outcome = async {
                let request = pipeline
                    .authorized(Method::POST, pipeline.url("auth/logout")?)
                    .await?;
                pipeline.send(request).await
            }
            .await;
            if let Err(e) = outcome {
                tracing::warn!(error = %e, "Server-side sign-out failed");
            }
        }

        pipeline.tokens().clear().await?;
        Ok(())
    }

    /// Status of the held credential, if any.
    pub fn status(&self) -> Option<AuthStatus> {
        self.client.tokens().status()
    }
}
