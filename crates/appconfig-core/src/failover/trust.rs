//! Trust decisions for auto-discovered replica hosts.
//!
//! A replica is only admitted when it lives under the same trusted root
//! domain as the configured origin. Matching is label-exact: the root must be
//! preceded by a `.` (or be the whole host), so `badazconfig.io` never
//! matches `azconfig.io`.

/// Root domains the store service family is served from.
pub const TRUSTED_DOMAIN_ROOTS: &[&str] = &["azconfig.io", "appconfig.azure.com"];

/// Validator bound to the trusted root of one origin host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustedDomainValidator {
    trusted_suffix: Option<&'static str>,
}

impl TrustedDomainValidator {
    /// Derive the trusted suffix from the configured origin host.
    ///
    /// An origin outside every trusted root yields a validator that rejects
    /// all candidates.
    pub fn for_origin(origin_host: &str) -> Self {
        Self { trusted_suffix: trusted_root_for(origin_host) }
    }

    /// Validator that trusts nothing.
    pub fn reject_all() -> Self {
        Self { trusted_suffix: None }
    }

    pub fn trusted_suffix(&self) -> Option<&'static str> {
        self.trusted_suffix
    }

    /// Whether `candidate` equals the trusted root or is a proper subdomain of it.
    pub fn is_trusted(&self, candidate: &str) -> bool {
        let Some(root) = self.trusted_suffix else {
            return false;
        };
        normalize(candidate).is_some_and(|host| is_same_or_subdomain(&host, root))
    }
}

/// Trusted root that `host` equals or is a dot-boundary subdomain of.
pub fn trusted_root_for(host: &str) -> Option<&'static str> {
    let host = normalize(host)?;
    TRUSTED_DOMAIN_ROOTS.iter().copied().find(|root| is_same_or_subdomain(&host, root))
}

/// Lower-case, drop the DNS root dot, reject hosts with empty labels.
fn normalize(host: &str) -> Option<String> {
    let host = host.trim().trim_end_matches('.').to_ascii_lowercase();
    if host.is_empty() || host.split('.').any(str::is_empty) {
        return None;
    }
    Some(host)
}

fn is_same_or_subdomain(host: &str, root: &str) -> bool {
    if host == root {
        return true;
    }
    host.len() > root.len()
        && host.ends_with(root)
        && host.as_bytes()[host.len() - root.len() - 1] == b'.'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_under_azconfig_root() {
        let validator = TrustedDomainValidator::for_origin("foobar.azconfig.io");
        assert_eq!(validator.trusted_suffix(), Some("azconfig.io"));

        assert!(validator.is_trusted("azure.azconfig.io"));
        assert!(validator.is_trusted("azure.privatelink.azconfig.io"));
        assert!(validator.is_trusted("azconfig.io"));
        assert!(validator.is_trusted("Azure.AZCONFIG.io."));

        assert!(!validator.is_trusted("azure.badazconfig.io"));
        assert!(!validator.is_trusted("azure.azconfigbad.io"));
        assert!(!validator.is_trusted("azure.appconfig.azure.com"));
        assert!(!validator.is_trusted("azconfig.io.evil.com"));
        assert!(!validator.is_trusted(".azconfig.io"));
        assert!(!validator.is_trusted(""));
    }

    #[test]
    fn test_origin_under_appconfig_root() {
        let validator = TrustedDomainValidator::for_origin("foobar.appconfig.azure.com");
        assert_eq!(validator.trusted_suffix(), Some("appconfig.azure.com"));

        assert!(validator.is_trusted("azure.appconfig.azure.com"));
        assert!(validator.is_trusted("azure.z1.appconfig.azure.com"));

        assert!(!validator.is_trusted("azure.azconfig.io"));
        assert!(!validator.is_trusted("azure.badappconfig.azure.com"));
        assert!(!validator.is_trusted("azure.appconfigbad.azure.com"));
    }

    #[test]
    fn test_untrusted_origin_rejects_everything() {
        let validator = TrustedDomainValidator::for_origin("foobar.azconfig-test.io");
        assert_eq!(validator.trusted_suffix(), None);

        assert!(!validator.is_trusted("azure.azconfig-test.io"));
        assert!(!validator.is_trusted("azconfig-test.io"));
        assert!(!validator.is_trusted("azure.azconfig.io"));
        assert!(!validator.is_trusted("azure.appconfig.azure.com"));
    }

    #[test]
    fn test_fused_origin_is_not_trusted() {
        assert_eq!(trusted_root_for("foobarazconfig.io"), None);
        assert_eq!(trusted_root_for("foo.azconfig.io.evil"), None);
        assert_eq!(trusted_root_for("AZCONFIG.IO"), Some("azconfig.io"));
        assert!(!TrustedDomainValidator::reject_all().is_trusted("a.azconfig.io"));
    }
}
