//! OTP Sign In Use Case
//!
//! Verifies a one-time code and stores the issued tokens.

use crate::application::request_client::{RequestClient, RequestOptions};
use crate::domain::credentials::TokenPair;
use crate::error::{ClientError, ClientResult};
use crate::infra::dto::{OtpVerifyRequest, TokenResponse};

pub const OTP_VERIFY_PATH: &str = "/v1/auth/otp/verify";

/// OTP sign in input
pub struct OtpSignInInput {
    pub phone: String,
    pub code: String,
}

/// OTP sign in use case
pub struct OtpSignInUseCase {
    client: RequestClient,
}

impl OtpSignInUseCase {
    pub fn new(client: RequestClient) -> Self {
        Self { client }
    }

    pub async fn execute(&self, input: OtpSignInInput) -> ClientResult<()> {
        let phone = input.phone.trim();
        let code = input.code.trim();
        if phone.is_empty() || code.is_empty() {
            return Err(ClientError::Invalid("phone and code are required".into()));
        }

        let options = RequestOptions::post_json(&OtpVerifyRequest { phone, code })?;
        // A 401 here means a wrong code, not an expired session
        let response = self.client.send(OTP_VERIFY_PATH, options, false).await?;
        let tokens: TokenResponse = RequestClient::read_json(response).await?;

        let refresh_token = tokens.refresh_token.ok_or_else(|| ClientError::InvalidResponse {
            status: 200,
            message: "missing refresh_token".into(),
        })?;

        self.client
            .store_tokens(&TokenPair::new(tokens.access_token, refresh_token))?;

        tracing::info!("Signed in with OTP");
        Ok(())
    }
}
