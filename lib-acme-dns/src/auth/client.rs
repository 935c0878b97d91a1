use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::collections::BTreeMap;
use url::Url;
extern crate tracing;

use super::errors::AcmeDnsErrors;
use super::http_request::{post, APPLICATION_JSON};
use super::types::{AccountRecord, RegisterRequest, UpdateRequest};

const API_USER_HEADER: &str = "X-Api-User";
const API_KEY_HEADER: &str = "X-Api-Key";
const CONTENT_TYPE_HEADER: &str = "Content-Type";

/// The two calls the hook makes against an acme-dns instance.
#[allow(async_fn_in_trait)]
pub trait AcmeDnsApi {
    /// Registers a new delegated subdomain, optionally restricted to `allow_from` CIDR ranges.
    async fn register_account(&self, allow_from: &[String]) -> Result<AccountRecord, AcmeDnsErrors>;

    /// Replaces the TXT value served for the account's subdomain.
    async fn update_txt_record(&self, account: &AccountRecord, txt: &str)
        -> Result<(), AcmeDnsErrors>;
}

/// HTTP client for the acme-dns REST API.
#[derive(Debug, Clone)]
pub struct AcmeDnsClient {
    client: Client,
    base_url: Url,
}

impl AcmeDnsClient {
    pub fn new(base_url: Url) -> Self {
        Self::with_client(Client::new(), base_url)
    }
    pub fn with_client(client: Client, base_url: Url) -> Self {
        AcmeDnsClient { client, base_url }
    }
    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.as_str().trim_end_matches('/'), path)
    }
}

impl AcmeDnsApi for AcmeDnsClient {
    async fn register_account(&self, allow_from: &[String]) -> Result<AccountRecord, AcmeDnsErrors> {
        let url = self.endpoint("register");
        tracing::debug!(url = %url, allow_from = ?allow_from, "Registering acme-dns account");
        let response = if allow_from.is_empty() {
            post::<RegisterRequest>(&self.client, url, &[], None).await?
        } else {
            let request = RegisterRequest {
                allowfrom: allow_from,
            };
            post(&self.client, url, &[], Some(&request)).await?
        };

        let status = response.status();
        if status != StatusCode::CREATED {
            let body = response.text().await.unwrap_or_default();
            return Err(AcmeDnsErrors::RegistrationFailed {
                status: status.as_u16(),
                body,
            });
        }
        let account: AccountRecord = response.json().await?;
        tracing::info!(
            subdomain = %account.subdomain,
            fulldomain = %account.fulldomain,
            "Registered acme-dns account"
        );
        Ok(account)
    }

    async fn update_txt_record(
        &self,
        account: &AccountRecord,
        txt: &str,
    ) -> Result<(), AcmeDnsErrors> {
        let update = UpdateRequest {
            subdomain: &account.subdomain,
            txt,
        };
        let headers = [
            (API_USER_HEADER, account.username.as_str()),
            (API_KEY_HEADER, account.password.as_str()),
            (CONTENT_TYPE_HEADER, APPLICATION_JSON),
        ];
        let url = self.endpoint("update");
        tracing::debug!(url = %url, subdomain = %account.subdomain, "Updating TXT record");
        let response = post(&self.client, url, &headers, Some(&update)).await?;

        let status = response.status();
        if status == StatusCode::OK {
            tracing::info!(subdomain = %account.subdomain, "TXT record updated");
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        let request_headers: BTreeMap<&str, &str> = headers.into_iter().collect();
        Err(AcmeDnsErrors::UpdateFailed {
            request_headers: serde_json::to_string_pretty(&request_headers)?,
            request_body: serde_json::to_string_pretty(&update)?,
            status: status.as_u16(),
            response_body: pretty_json_or_raw(&body),
        })
    }
}

/// Pretty prints `body` with sorted keys when it is JSON, otherwise returns it untouched.
fn pretty_json_or_raw(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .and_then(|value| serde_json::to_string_pretty(&value))
        .unwrap_or_else(|_| body.to_string())
}
