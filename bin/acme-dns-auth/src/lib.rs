use clap::{ArgAction, Parser};
use lib_acme_dns::auth::errors::AcmeDnsErrors;
use lib_acme_dns::auth::hook::{AuthHook, HookOutcome};
use lib_acme_dns::auth::types::{
    ChallengeRequest, HookConfig, DEFAULT_STORAGE_PATH, ENV_VERSION_CURRENT, ENV_VERSION_MINMAX,
};
use std::io;
use std::path::PathBuf;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, EnvFilter};
use url::Url;

/// `--version` output: crate version plus the settings layout versions this hook understands.
fn long_version() -> &'static str {
    static LONG_VERSION: OnceLock<String> = OnceLock::new();
    LONG_VERSION.get_or_init(|| {
        let (min, max) = ENV_VERSION_MINMAX;
        format!(
            "{}\nThe current ENV_VERSION/ACMEDNSAUTH_ENV_VERSION is: {}\nThis hook is compatible with versions: {}-{}",
            env!("CARGO_PKG_VERSION"),
            ENV_VERSION_CURRENT,
            min,
            max
        )
    })
}

/// certbot `--manual-auth-hook` that publishes the DNS-01 validation token through acme-dns.
#[derive(Parser, Debug)]
#[clap(author, version, long_version = long_version(), long_about = None)]
pub struct CliInput {
    /// Domain being validated, wildcard allowed
    #[arg(short = 'd', long, env = "CERTBOT_DOMAIN")]
    pub domain: Option<String>,
    /// Validation token to publish
    #[arg(short = 't', long, env = "CERTBOT_VALIDATION")]
    pub validation: Option<String>,
    /// Base URL of the acme-dns instance
    #[arg(short = 'u', long, env = "ACMEDNSAUTH_URL")]
    pub url: Option<Url>,
    /// Settings layout version, see `--version`
    #[arg(short = 'e', long, env = "ACMEDNSAUTH_ENV_VERSION")]
    pub env_version: Option<u32>,
    /// Credential storage file
    #[arg(short = 's', long, env = "ACMEDNSAUTH_STORAGE_PATH", default_value = DEFAULT_STORAGE_PATH)]
    pub storage_path: PathBuf,
    /// CIDR ranges allowed to update new accounts, as a JSON list
    #[arg(short = 'a', long, env = "ACMEDNSAUTH_ALLOW_FROM", default_value = "[]")]
    pub allow_from: String,
    /// Register a new account even when one is stored
    #[arg(
        short = 'f',
        long,
        env = "ACMEDNSAUTH_FORCE_REGISTER",
        action = ArgAction::Set,
        value_parser = parse_force_register,
        default_value = "false"
    )]
    pub force_register: bool,
    /// Print a template of all settings and exit
    #[arg(long)]
    pub setup: bool,
}

/// `true` and `1` (any case) enable the flag, every other value disables it.
fn parse_force_register(value: &str) -> Result<bool, String> {
    Ok(matches!(value.trim().to_ascii_lowercase().as_str(), "true" | "1"))
}

fn parse_allow_from(value: &str) -> Result<Vec<String>, AcmeDnsErrors> {
    serde_json::from_str(value).map_err(|e| AcmeDnsErrors::InvalidAllowFrom(e.to_string()))
}

impl CliInput {
    /// Validates the raw input and splits it into the hook settings and the challenge to answer.
    pub fn into_config(self) -> Result<(HookConfig, ChallengeRequest), AcmeDnsErrors> {
        let base_url = self.url.ok_or(AcmeDnsErrors::MissingSetting {
            setting: "ACMEDNS_URL",
            env: "ACMEDNSAUTH_URL",
        })?;
        let found = self.env_version.ok_or(AcmeDnsErrors::MissingSetting {
            setting: "ENV_VERSION",
            env: "ACMEDNSAUTH_ENV_VERSION",
        })?;
        let (min, max) = ENV_VERSION_MINMAX;
        if !(min..=max).contains(&found) {
            return Err(AcmeDnsErrors::UnsupportedEnvVersion { found, min, max });
        }
        let allow_from = parse_allow_from(&self.allow_from)?;
        let domain = self.domain.ok_or(AcmeDnsErrors::MissingSetting {
            setting: "DOMAIN",
            env: "CERTBOT_DOMAIN",
        })?;
        let validation = self.validation.ok_or(AcmeDnsErrors::MissingSetting {
            setting: "VALIDATION_TOKEN",
            env: "CERTBOT_VALIDATION",
        })?;

        let config = HookConfig {
            base_url,
            storage_path: self.storage_path,
            allow_from,
            force_register: self.force_register,
        };
        Ok((config, ChallengeRequest::new(domain, validation)))
    }
}

/// Runs the hook for the parsed command line, printing operator instructions to stdout.
pub async fn run_hook(args: CliInput) -> Result<HookOutcome, AcmeDnsErrors> {
    let (config, request) = args.into_config()?;
    let hook = AuthHook::from_config(config);
    hook.run(&request, &mut io::stdout()).await
}

pub fn setup_template() -> String {
    format!(
        r#"
# ---------- CUSTOMIZE THE BELOW ----------

# required settings
#
# URL to acme-dns instance
export ACMEDNSAUTH_URL="https://acme-dns.example.com"
# used to maintain compatibility across future versions
export ACMEDNSAUTH_ENV_VERSION="{env_version}"

# optional settings
#
# Path for acme-dns credential storage
export ACMEDNSAUTH_STORAGE_PATH="{storage_path}"
# Whitelist for address ranges to allow the updates from
# this must be a list encoded as a json string
# Example: `export ACMEDNSAUTH_ALLOW_FROM='["192.168.10.0/24", "::1/128"]'`
export ACMEDNSAUTH_ALLOW_FROM='[]'
# Force re-registration. Overwrites the already existing acme-dns accounts.
export ACMEDNSAUTH_FORCE_REGISTER="False"

# ----------                     ----------
"#,
        env_version = ENV_VERSION_CURRENT,
        storage_path = DEFAULT_STORAGE_PATH,
    )
}

/// Logs to stderr so stdout only carries instructions meant for the operator.
/// Respects `RUST_LOG`, defaults to `info`.
pub fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .with_writer(io::stderr)
        .try_init();
}
