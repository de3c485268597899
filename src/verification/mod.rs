//! Recipient domain checks run before sending.

pub mod domain;
#[cfg(feature = "dns")]
pub(crate) mod resolver;

pub use domain::{DnsLookup, DomainValidator, LookupOutcome, MissingMxPolicy};
#[cfg(feature = "dns")]
pub use resolver::TrustDnsLookup;
