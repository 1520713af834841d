//! Identity Toolkit REST client.

use async_trait::async_trait;
use futures::stream::BoxStream;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use ordertrack_core::{Email, Identity};

use super::{AuthStateChannel, IdentityError, IdentityProvider, ProfileUpdate, ProviderErrorResponse};
use crate::config::IdentityConfig;

/// Identity provider backed by the Identity Toolkit `accounts:*` endpoints.
///
/// Holds the ID token of the one signed-in operator and publishes identity
/// changes through an [`AuthStateChannel`].
pub struct RestIdentityProvider {
    client: reqwest::Client,
    api_url: String,
    api_key: SecretString,
    request_uri: String,
    auth: AuthStateChannel,
    id_token: RwLock<Option<SecretString>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct IdpRequest<'a> {
    post_body: String,
    request_uri: &'a str,
    return_secure_token: bool,
    return_idp_credential: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OobRequest<'a> {
    request_type: &'static str,
    email: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateRequest<'a> {
    id_token: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    display_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    photo_url: Option<&'a str>,
    return_secure_token: bool,
}

/// Common shape of `signInWithPassword`, `signUp`, `signInWithIdp` and
/// `update` responses.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountResponse {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    photo_url: Option<String>,
    #[serde(default)]
    id_token: Option<String>,
}

impl AccountResponse {
    fn identity(&self) -> Identity {
        Identity {
            id: self.local_id.clone(),
            email: self.email.as_deref().and_then(|e| Email::parse(e).ok()),
            display_name: self.display_name.clone().filter(|n| !n.is_empty()),
            photo_url: self.photo_url.clone().filter(|u| !u.is_empty()),
        }
    }
}

impl RestIdentityProvider {
    /// Create a provider client.
    ///
    /// `request_uri` is sent with federated sign-ins and must be an origin
    /// the provider project trusts (the dashboard base URL).
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &IdentityConfig, request_uri: &str) -> Result<Self, IdentityError> {
        let client = reqwest::Client::builder().build()?;

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            request_uri: request_uri.to_string(),
            auth: AuthStateChannel::new(),
            id_token: RwLock::new(None),
        })
    }

    fn endpoint(&self, method: &str) -> String {
        format!(
            "{}/accounts:{method}?key={}",
            self.api_url,
            urlencoding::encode(self.api_key.expose_secret())
        )
    }

    /// POST to an `accounts:*` method.
    async fn call<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        method: &str,
        body: &B,
    ) -> Result<T, IdentityError> {
        let response = self
            .client
            .post(self.endpoint(method))
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return response
                .json()
                .await
                .map_err(|e| IdentityError::Parse(format!("Failed to parse response: {e}")));
        }

        let code = status.as_u16();
        let body = response.text().await.unwrap_or_default();
        match serde_json::from_str::<ProviderErrorResponse>(&body) {
            Ok(parsed) => Err(IdentityError::from_provider(code, &parsed.error.message)),
            Err(_) => Err(IdentityError::Rejected { code, message: body }),
        }
    }

    /// Store the session token and publish the identity.
    async fn establish(&self, account: &AccountResponse) -> Identity {
        let identity = account.identity();
        if let Some(token) = &account.id_token {
            *self.id_token.write().await = Some(SecretString::from(token.clone()));
        }
        self.auth.publish(Some(identity.clone()));
        identity
    }
}

#[async_trait]
impl IdentityProvider for RestIdentityProvider {
    #[instrument(skip(self, password), fields(email = %email))]
    async fn sign_in_with_password(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<Identity, IdentityError> {
        let account: AccountResponse = self
            .call(
                "signInWithPassword",
                &PasswordRequest {
                    email: email.as_str(),
                    password: password.expose_secret(),
                    return_secure_token: true,
                },
            )
            .await?;

        debug!("Password sign-in succeeded");
        Ok(self.establish(&account).await)
    }

    #[instrument(skip(self, id_token))]
    async fn sign_in_with_idp(
        &self,
        provider_id: &str,
        id_token: &SecretString,
    ) -> Result<Identity, IdentityError> {
        let post_body = format!(
            "id_token={}&providerId={}",
            urlencoding::encode(id_token.expose_secret()),
            urlencoding::encode(provider_id)
        );

        let account: AccountResponse = self
            .call(
                "signInWithIdp",
                &IdpRequest {
                    post_body,
                    request_uri: &self.request_uri,
                    return_secure_token: true,
                    return_idp_credential: true,
                },
            )
            .await?;

        debug!("Federated sign-in succeeded");
        Ok(self.establish(&account).await)
    }

    #[instrument(skip(self, password, display_name), fields(email = %email))]
    async fn sign_up(
        &self,
        email: &Email,
        password: &SecretString,
        display_name: Option<&str>,
    ) -> Result<Identity, IdentityError> {
        let mut account: AccountResponse = self
            .call(
                "signUp",
                &PasswordRequest {
                    email: email.as_str(),
                    password: password.expose_secret(),
                    return_secure_token: true,
                },
            )
            .await?;

        if let (Some(name), Some(token)) = (display_name, account.id_token.clone()) {
            let updated: Result<AccountResponse, _> = self
                .call(
                    "update",
                    &UpdateRequest {
                        id_token: &token,
                        display_name: Some(name),
                        photo_url: None,
                        return_secure_token: true,
                    },
                )
                .await;
            match updated {
                Ok(updated) => {
                    account.display_name = updated.display_name;
                    if updated.id_token.is_some() {
                        account.id_token = updated.id_token;
                    }
                }
                Err(e) => warn!(error = %e, "Account created but display name not saved"),
            }
        }

        Ok(self.establish(&account).await)
    }

    #[instrument(skip(self))]
    async fn sign_out(&self) -> Result<(), IdentityError> {
        *self.id_token.write().await = None;
        self.auth.publish(None);
        Ok(())
    }

    #[instrument(skip(self), fields(email = %email))]
    async fn send_password_reset(&self, email: &Email) -> Result<(), IdentityError> {
        let _: serde_json::Value = self
            .call(
                "sendOobCode",
                &OobRequest {
                    request_type: "PASSWORD_RESET",
                    email: email.as_str(),
                },
            )
            .await?;
        Ok(())
    }

    #[instrument(skip(self, update))]
    async fn update_profile(&self, update: &ProfileUpdate) -> Result<Identity, IdentityError> {
        let token = self
            .id_token
            .read()
            .await
            .clone()
            .ok_or(IdentityError::NotSignedIn)?;

        let mut account: AccountResponse = self
            .call(
                "update",
                &UpdateRequest {
                    id_token: token.expose_secret(),
                    display_name: update.display_name.as_deref(),
                    photo_url: update.photo_url.as_deref(),
                    return_secure_token: true,
                },
            )
            .await?;

        // `update` omits fields that were not touched.
        if let Some(current) = self.auth.current() {
            if account.email.is_none() {
                account.email = current.email.map(Email::into_inner);
            }
            if account.display_name.is_none() {
                account.display_name = current.display_name;
            }
            if account.photo_url.is_none() {
                account.photo_url = current.photo_url;
            }
        }

        Ok(self.establish(&account).await)
    }

    fn subscribe(&self) -> BoxStream<'static, Option<Identity>> {
        self.auth.stream()
    }
}

impl std::fmt::Debug for RestIdentityProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestIdentityProvider")
            .field("api_url", &self.api_url)
            .field("api_key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn provider() -> RestIdentityProvider {
        RestIdentityProvider::new(
            &IdentityConfig {
                api_url: "https://identity.example.com/v1/".to_string(),
                api_key: SecretString::from("AIzaSyD-k3y+value"),
            },
            "http://localhost:3002",
        )
        .unwrap()
    }

    #[test]
    fn test_endpoint_encodes_key() {
        assert_eq!(
            provider().endpoint("signUp"),
            "https://identity.example.com/v1/accounts:signUp?key=AIzaSyD-k3y%2Bvalue"
        );
    }

    #[test]
    fn test_account_response_to_identity() {
        let account: AccountResponse = serde_json::from_value(serde_json::json!({
            "localId": "uid-1",
            "email": "Ada@Example.com",
            "displayName": "",
            "photoUrl": "https://img.example.com/a.png",
            "idToken": "tok",
            "registered": true
        }))
        .unwrap();

        let identity = account.identity();
        assert_eq!(identity.id, "uid-1");
        assert_eq!(identity.email.unwrap().as_str(), "ada@example.com");
        assert_eq!(identity.display_name, None);
        assert_eq!(
            identity.photo_url.as_deref(),
            Some("https://img.example.com/a.png")
        );
    }

    #[test]
    fn test_idp_account_without_email() {
        let account: AccountResponse =
            serde_json::from_value(serde_json::json!({"localId": "uid-2"})).unwrap();
        assert_eq!(account.identity().email, None);
    }

    #[tokio::test]
    async fn test_update_profile_requires_session() {
        let result = provider().update_profile(&ProfileUpdate::default()).await;
        assert!(matches!(result, Err(IdentityError::NotSignedIn)));
    }

    #[tokio::test]
    async fn test_sign_out_publishes_none() {
        use futures::StreamExt;

        let provider = provider();
        let mut stream = provider.subscribe();
        assert_eq!(stream.next().await, Some(None));

        provider.sign_out().await.unwrap();
        assert!(provider.id_token.read().await.is_none());
    }

    #[test]
    fn test_debug_redacts_key() {
        let debug = format!("{:?}", provider());
        assert!(!debug.contains("AIzaSyD"));
    }
}
