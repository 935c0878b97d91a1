use serde::Deserialize;
use serde::Serialize;
use serde_with::skip_serializing_none;
use std::fmt::Display;
use std::path::PathBuf;
use url::Url;

pub const WILDCARD_PREFIX: &str = "*.";
pub const ACME_CHALLENGE_PREFIX: &str = "_acme-challenge.";
pub const DEFAULT_STORAGE_PATH: &str = "/etc/letsencrypt/acmedns.json";

/// Version of the settings layout (`ACMEDNSAUTH_*` variables) understood by this hook.
pub const ENV_VERSION_CURRENT: u32 = 1;
/// Oldest and newest settings layout this hook accepts.
pub const ENV_VERSION_MINMAX: (u32, u32) = (1, 1);

/// Credentials and identity of one delegated acme-dns subdomain.
///
/// Records are only ever received from the service and replaced wholesale on
/// re-registration, they are never edited locally.
#[skip_serializing_none]
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct AccountRecord {
    pub subdomain: String,
    pub fulldomain: String,
    pub username: String,
    pub password: String,
    pub allowfrom: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub(crate) struct RegisterRequest<'a> {
    pub(crate) allowfrom: &'a [String],
}

#[derive(Debug, Serialize)]
pub(crate) struct UpdateRequest<'a> {
    pub(crate) subdomain: &'a str,
    pub(crate) txt: &'a str,
}

/// Settings for one hook invocation, resolved once at process start.
#[derive(Debug, Clone)]
pub struct HookConfig {
    pub base_url: Url,
    pub storage_path: PathBuf,
    pub allow_from: Vec<String>,
    pub force_register: bool,
}

/// What the certificate client asks us to prove.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeRequest {
    pub domain: String,
    pub validation: String,
}

impl ChallengeRequest {
    pub fn new(domain: impl Into<String>, validation: impl Into<String>) -> Self {
        ChallengeRequest {
            domain: domain.into(),
            validation: validation.into(),
        }
    }
    pub fn base_domain(&self) -> &str {
        base_domain(&self.domain)
    }
    pub fn challenge_record_name(&self) -> String {
        challenge_record_name(self.base_domain())
    }
}

/// Strips a single leading `*.` so wildcard and base names share one validation record.
pub fn base_domain(domain: &str) -> &str {
    domain.strip_prefix(WILDCARD_PREFIX).unwrap_or(domain)
}

pub fn challenge_record_name(base_domain: &str) -> String {
    format!("{}{}", ACME_CHALLENGE_PREFIX, base_domain)
}

/// The zone file line the operator has to add to the main DNS zone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CnameRecord {
    pub name: String,
    pub target: String,
}

impl CnameRecord {
    pub fn new(challenge_record_name: String, account: &AccountRecord) -> Self {
        CnameRecord {
            name: challenge_record_name,
            target: account.fulldomain.clone(),
        }
    }
}
impl Display for CnameRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} CNAME {}.", self.name, self.target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account() -> AccountRecord {
        AccountRecord {
            subdomain: "sub1".to_string(),
            fulldomain: "sub1.acme-dns.io".to_string(),
            username: "u".to_string(),
            password: "p".to_string(),
            allowfrom: None,
        }
    }

    #[test]
    fn test_base_domain_strips_wildcard_once() {
        assert_eq!(base_domain("*.example.com"), "example.com");
        assert_eq!(base_domain("example.com"), "example.com");
        assert_eq!(base_domain("*.*.example.com"), "*.example.com");
        assert_eq!(base_domain(base_domain("*.example.com")), "example.com");
    }

    #[test]
    fn test_challenge_record_name() {
        let request = ChallengeRequest::new("*.example.com", "abc123");
        assert_eq!(request.base_domain(), "example.com");
        assert_eq!(request.challenge_record_name(), "_acme-challenge.example.com");
    }

    #[test]
    fn test_cname_record_has_trailing_dot() {
        let cname = CnameRecord::new(challenge_record_name("example.com"), &account());
        assert_eq!(
            cname.to_string(),
            "_acme-challenge.example.com CNAME sub1.acme-dns.io."
        );
    }

    #[test]
    fn test_account_record_rejects_missing_fields() {
        let parsed = serde_json::from_str::<AccountRecord>(r#"{"subdomain": "sub1"}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_account_record_ignores_extra_fields_and_omits_missing_allowfrom() {
        let parsed: AccountRecord = serde_json::from_str(
            r#"{"subdomain":"sub1","fulldomain":"sub1.acme-dns.io","username":"u","password":"p","extra":1}"#,
        )
        .unwrap();
        assert_eq!(parsed, account());
        let written = serde_json::to_value(&parsed).unwrap();
        assert!(written.get("allowfrom").is_none());
    }

    #[test]
    fn test_account_record_keeps_echoed_allowfrom() {
        let parsed: AccountRecord = serde_json::from_str(
            r#"{"subdomain":"s","fulldomain":"s.d","username":"u","password":"p","allowfrom":["10.0.0.0/8"]}"#,
        )
        .unwrap();
        assert_eq!(parsed.allowfrom, Some(vec!["10.0.0.0/8".to_string()]));
    }
}
