//! `DnsLookup` backed by the blocking trust-dns resolver.

use super::domain::{DnsLookup, LookupOutcome};
use trust_dns_resolver::config::{ResolverConfig, ResolverOpts};
use trust_dns_resolver::error::{ResolveError, ResolveErrorKind};
use trust_dns_resolver::proto::op::ResponseCode;
use trust_dns_resolver::Resolver;

pub struct TrustDnsLookup {
    resolver: Resolver,
}

impl TrustDnsLookup {
    /// Uses the host's resolver configuration, falling back to the library's
    /// default upstreams if the system config cannot be read.
    pub fn from_system() -> std::io::Result<Self> {
        let resolver = match Resolver::from_system_conf() {
            Ok(resolver) => resolver,
            Err(e) => {
                tracing::debug!(
                    target: "domain_check",
                    "System resolver config unreadable ({}), using defaults",
                    e
                );
                Resolver::new(ResolverConfig::default(), ResolverOpts::default())?
            }
        };
        Ok(TrustDnsLookup { resolver })
    }
}

fn classify(err: &ResolveError) -> LookupOutcome {
    match err.kind() {
        ResolveErrorKind::NoRecordsFound { response_code, .. }
            if *response_code == ResponseCode::NXDomain =>
        {
            LookupOutcome::NxDomain
        }
        ResolveErrorKind::NoRecordsFound { .. } => LookupOutcome::NoRecords,
        ResolveErrorKind::Timeout => LookupOutcome::TimedOut,
        _ => LookupOutcome::Failed(err.to_string()),
    }
}

/// Appends the root label so the resolver skips the `search` list.
fn fully_qualified(domain: &str) -> String {
    if domain.ends_with('.') {
        domain.to_string()
    } else {
        format!("{}.", domain)
    }
}

impl DnsLookup for TrustDnsLookup {
    fn mx(&self, domain: &str) -> LookupOutcome {
        match self.resolver.mx_lookup(fully_qualified(domain)) {
            Ok(lookup) => match lookup.iter().count() {
                0 => LookupOutcome::NoRecords,
                n => LookupOutcome::Found(n),
            },
            Err(e) => classify(&e),
        }
    }

    fn a(&self, domain: &str) -> LookupOutcome {
        match self.resolver.ipv4_lookup(fully_qualified(domain)) {
            Ok(lookup) => match lookup.iter().count() {
                0 => LookupOutcome::NoRecords,
                n => LookupOutcome::Found(n),
            },
            Err(e) => classify(&e),
        }
    }
}
