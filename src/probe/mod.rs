//! Network and security probes.
//!
//! This module provides:
//! - The probe abstraction and result types
//! - A TTL cache of probe results keyed by `(host, kind)`
//! - The batch scheduler that paces probe execution
//! - Built-in probes: DNS, response headers, hosting/geo, TLS certificate,
//!   SSL grade and well-known files

mod cache;
mod dns;
mod geo;
mod headers;
mod scheduler;
mod security;
mod ssl_grade;
mod target;
mod tls;
mod types;
mod well_known;

pub use cache::ProbeCache;
pub use dns::DnsProbe;
pub use geo::GeoProbe;
pub use headers::HeadersProbe;
pub use scheduler::{ProbeEvent, ProbeFailure, ProbeRegistry, ProbeRun, ProbeScheduler};
pub use security::SecurityWarning;
pub use ssl_grade::SslGradeProbe;
pub use target::ProbeTarget;
pub use tls::TlsProbe;
pub use types::{Probe, ProbeKind, ProbeResult};
pub use well_known::WellKnownProbe;

pub(crate) use headers::header_map_to_strings;
