use std::io::Write;
extern crate tracing;

use super::client::{AcmeDnsApi, AcmeDnsClient};
use super::errors::AcmeDnsErrors;
use super::storage::Storage;
use super::types::{AccountRecord, ChallengeRequest, CnameRecord, HookConfig};

/// Result of one successful hook run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookOutcome {
    pub base_domain: String,
    pub account: AccountRecord,
    /// Set when a new account was registered during this run.
    pub cname: Option<CnameRecord>,
}

/// Drives a single authentication hook invocation against acme-dns.
pub struct AuthHook<A> {
    config: HookConfig,
    api: A,
}

impl AuthHook<AcmeDnsClient> {
    /// Constructs an `AuthHook` talking HTTP to the acme-dns instance at `config.base_url`.
    pub fn from_config(config: HookConfig) -> Self {
        let client = AcmeDnsClient::new(config.base_url.clone());
        AuthHook::new(config, client)
    }
}

impl<A: AcmeDnsApi> AuthHook<A> {
    /// Constructs a new `AuthHook`.
    ///
    /// # Parameters
    /// * `config` - Settings resolved at process start.
    /// * `api` - The acme-dns API used to register accounts and update TXT records.
    pub fn new(config: HookConfig, api: A) -> Self {
        AuthHook { config, api }
    }

    /// Makes sure the delegated TXT record for `request` carries the validation token.
    ///
    /// Registers and persists a new account first when the base domain has none
    /// stored (or when re-registration is forced), writing the CNAME instruction
    /// for the operator to `out`. Failing to write that instruction stops the run
    /// before the update. Neither that nor a failing update undoes a registration
    /// that was already saved.
    ///
    /// # Returns
    /// A `Result<HookOutcome, AcmeDnsErrors>` describing the account that was used.
    pub async fn run<W: Write>(
        &self,
        request: &ChallengeRequest,
        out: &mut W,
    ) -> Result<HookOutcome, AcmeDnsErrors> {
        let base_domain = request.base_domain().to_string();
        let validation_domain = request.challenge_record_name();
        tracing::debug!(
            domain = %request.domain,
            base_domain = %base_domain,
            validation_domain = %validation_domain,
            "Resolved challenge inputs"
        );

        let mut storage = Storage::load(&self.config.storage_path).await?;
        let stored = storage.fetch(&base_domain).cloned();

        let (account, cname) = match stored {
            Some(account) if !self.config.force_register => {
                tracing::debug!(subdomain = %account.subdomain, "Using stored acme-dns account");
                (account, None)
            }
            stored => {
                if stored.is_some() {
                    tracing::info!(base_domain = %base_domain, "Forcing re-registration");
                }
                let account = self.api.register_account(&self.config.allow_from).await?;
                storage.put(&base_domain, account.clone());
                storage.save().await?;
                tracing::info!(
                    base_domain = %base_domain,
                    path = %storage.path().display(),
                    "Stored new acme-dns account"
                );

                let cname = CnameRecord::new(validation_domain, &account);
                writeln!(
                    out,
                    "Please add the following CNAME record to your main DNS zone:\n{}",
                    cname
                )
                .and_then(|_| out.flush())
                .map_err(AcmeDnsErrors::OutputFailed)?;
                (account, Some(cname))
            }
        };

        self.api
            .update_txt_record(&account, &request.validation)
            .await?;

        Ok(HookOutcome {
            base_domain,
            account,
            cname,
        })
    }
}
