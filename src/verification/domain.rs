//! Advisory check that a recipient's mail domain plausibly exists.
//!
//! Without a DNS backend the check passes everything (fail-open). With one,
//! any indeterminate answer blocks (fail-closed).

/// Classified answer to a single DNS query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupOutcome {
    /// At least one record of the requested type.
    Found(usize),
    /// The name exists but carries no record of the requested type.
    NoRecords,
    /// NXDOMAIN.
    NxDomain,
    TimedOut,
    /// Any other resolver error.
    Failed(String),
}

/// DNS capability used by [`DomainValidator`]. Implementations block the
/// calling thread for the duration of the query.
pub trait DnsLookup: Send + Sync {
    fn mx(&self, domain: &str) -> LookupOutcome;
    fn a(&self, domain: &str) -> LookupOutcome;
}

/// What to do when a domain exists but publishes no MX record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingMxPolicy {
    /// Absence of MX fails the check.
    #[default]
    Reject,
    /// Look up an A record once; pass only if one is found.
    FallBackToA,
}

pub struct DomainValidator {
    lookup: Option<Box<dyn DnsLookup>>,
    missing_mx: MissingMxPolicy,
}

impl DomainValidator {
    pub fn new(lookup: Option<Box<dyn DnsLookup>>, missing_mx: MissingMxPolicy) -> Self {
        DomainValidator { lookup, missing_mx }
    }

    /// A validator with no DNS capability; every check passes.
    pub fn disabled() -> Self {
        Self::new(None, MissingMxPolicy::default())
    }

    /// Builds a validator on the system resolver when the `dns` feature is
    /// compiled in and the resolver can be constructed.
    pub fn system(missing_mx: MissingMxPolicy) -> Self {
        #[cfg(feature = "dns")]
        {
            match super::resolver::TrustDnsLookup::from_system() {
                Ok(lookup) => return Self::new(Some(Box::new(lookup)), missing_mx),
                Err(e) => {
                    tracing::warn!(
                        target: "domain_check",
                        "DNS resolver unavailable, domain checks disabled: {}",
                        e
                    );
                }
            }
        }
        Self::new(None, missing_mx)
    }

    pub fn is_available(&self) -> bool {
        self.lookup.is_some()
    }

    /// Returns whether the domain after the last `@` in `address` looks able to
    /// receive mail. Never fails; every outcome collapses to a boolean.
    pub fn check_domain_validity(&self, address: &str) -> bool {
        let Some(lookup) = self.lookup.as_deref() else {
            tracing::debug!(target: "domain_check", "No DNS capability, skipping check for {}", address);
            return true;
        };

        let Some(domain) = extract_domain(address) else {
            tracing::info!(target: "domain_check", "Malformed address '{}', no domain part", address);
            return false;
        };

        match lookup.mx(&domain) {
            LookupOutcome::Found(count) => {
                tracing::debug!(target: "domain_check", "{} has {} MX record(s)", domain, count);
                true
            }
            LookupOutcome::NoRecords => match self.missing_mx {
                MissingMxPolicy::Reject => {
                    tracing::info!(target: "domain_check", "{} has no MX record", domain);
                    false
                }
                MissingMxPolicy::FallBackToA => self.a_record_fallback(lookup, &domain),
            },
            LookupOutcome::NxDomain => {
                tracing::info!(target: "domain_check", "{} does not exist (NXDOMAIN)", domain);
                false
            }
            LookupOutcome::TimedOut => {
                tracing::warn!(target: "domain_check", "MX lookup for {} timed out", domain);
                false
            }
            LookupOutcome::Failed(reason) => {
                tracing::warn!(target: "domain_check", "MX lookup for {} failed: {}", domain, reason);
                false
            }
        }
    }

    fn a_record_fallback(&self, lookup: &dyn DnsLookup, domain: &str) -> bool {
        match lookup.a(domain) {
            LookupOutcome::Found(_) => {
                tracing::debug!(target: "domain_check", "{} has no MX but resolves to an A record", domain);
                true
            }
            other => {
                tracing::info!(
                    target: "domain_check",
                    "{} has no MX and the A lookup returned {:?}",
                    domain,
                    other
                );
                false
            }
        }
    }
}

/// Lower-cased text after the last `@`, or `None` if there is no `@` or the
/// domain part is empty.
pub(crate) fn extract_domain(address: &str) -> Option<String> {
    let (_, domain) = address.trim().rsplit_once('@')?;
    let domain = domain.trim().trim_end_matches('.');
    if domain.is_empty() {
        None
    } else {
        Some(domain.to_ascii_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::HashMap;

    #[derive(Default)]
    struct ScriptedLookup {
        mx: HashMap<String, LookupOutcome>,
        a: HashMap<String, LookupOutcome>,
        queries: Mutex<Vec<String>>,
    }

    impl ScriptedLookup {
        fn with_mx(mut self, domain: &str, outcome: LookupOutcome) -> Self {
            self.mx.insert(domain.to_string(), outcome);
            self
        }

        fn with_a(mut self, domain: &str, outcome: LookupOutcome) -> Self {
            self.a.insert(domain.to_string(), outcome);
            self
        }
    }

    impl DnsLookup for ScriptedLookup {
        fn mx(&self, domain: &str) -> LookupOutcome {
            self.queries.lock().push(format!("MX {}", domain));
            self.mx.get(domain).cloned().unwrap_or(LookupOutcome::NxDomain)
        }

        fn a(&self, domain: &str) -> LookupOutcome {
            self.queries.lock().push(format!("A {}", domain));
            self.a.get(domain).cloned().unwrap_or(LookupOutcome::NxDomain)
        }
    }

    fn validator(lookup: ScriptedLookup, policy: MissingMxPolicy) -> DomainValidator {
        DomainValidator::new(Some(Box::new(lookup)), policy)
    }

    #[test]
    fn without_capability_everything_passes() {
        let v = DomainValidator::disabled();
        assert!(!v.is_available());
        for addr in ["user@example.com", "user@", "not-an-email", "", "@@@"] {
            assert!(v.check_domain_validity(addr), "{addr:?} should pass");
        }
    }

    #[test]
    fn empty_domain_fails_closed() {
        let v = validator(ScriptedLookup::default(), MissingMxPolicy::Reject);
        assert!(!v.check_domain_validity("user@"));
        assert!(!v.check_domain_validity("user@ "));
        assert!(!v.check_domain_validity("no-at-sign"));
    }

    #[test]
    fn uses_text_after_last_at() {
        let lookup = ScriptedLookup::default().with_mx("example.com", LookupOutcome::Found(2));
        let v = validator(lookup, MissingMxPolicy::Reject);
        assert!(v.check_domain_validity("\"odd@local\"@Example.COM"));
    }

    #[test]
    fn definitive_and_indeterminate_answers_fail() {
        let lookup = ScriptedLookup::default()
            .with_mx("gone.example", LookupOutcome::NxDomain)
            .with_mx("slow.example", LookupOutcome::TimedOut)
            .with_mx("broken.example", LookupOutcome::Failed("SERVFAIL".into()));
        let v = validator(lookup, MissingMxPolicy::Reject);
        assert!(!v.check_domain_validity("a@gone.example"));
        assert!(!v.check_domain_validity("a@slow.example"));
        assert!(!v.check_domain_validity("a@broken.example"));
    }

    #[test]
    fn reject_policy_never_queries_a_record() {
        let lookup = ScriptedLookup::default()
            .with_mx("nomx.example", LookupOutcome::NoRecords)
            .with_a("nomx.example", LookupOutcome::Found(1));
        let v = DomainValidator::new(Some(Box::new(lookup)), MissingMxPolicy::Reject);
        assert!(!v.check_domain_validity("a@nomx.example"));
    }

    #[test]
    fn fallback_policy_accepts_a_record() {
        let lookup = ScriptedLookup::default()
            .with_mx("nomx.example", LookupOutcome::NoRecords)
            .with_a("nomx.example", LookupOutcome::Found(1))
            .with_mx("bare.example", LookupOutcome::NoRecords)
            .with_a("bare.example", LookupOutcome::NoRecords);
        let v = validator(lookup, MissingMxPolicy::FallBackToA);
        assert!(v.check_domain_validity("a@nomx.example"));
        assert!(!v.check_domain_validity("a@bare.example"));
    }

    #[test]
    fn a_fallback_only_follows_missing_mx() {
        let lookup = std::sync::Arc::new(
            ScriptedLookup::default().with_mx("gone.example", LookupOutcome::NxDomain),
        );

        struct Shared(std::sync::Arc<ScriptedLookup>);
        impl DnsLookup for Shared {
            fn mx(&self, domain: &str) -> LookupOutcome {
                self.0.mx(domain)
            }
            fn a(&self, domain: &str) -> LookupOutcome {
                self.0.a(domain)
            }
        }

        let v = DomainValidator::new(
            Some(Box::new(Shared(lookup.clone()))),
            MissingMxPolicy::FallBackToA,
        );
        assert!(!v.check_domain_validity("a@gone.example"));
        assert_eq!(*lookup.queries.lock(), vec!["MX gone.example".to_string()]);
    }

    #[test]
    fn extract_domain_cases() {
        assert_eq!(extract_domain("a@example.com").as_deref(), Some("example.com"));
        assert_eq!(extract_domain("a@Example.com.").as_deref(), Some("example.com"));
        assert_eq!(extract_domain("a@"), None);
        assert_eq!(extract_domain("plain"), None);
    }
}
