//! Post-hoc auditing of analysis output.

pub mod sanity;

pub use sanity::{
    audit_distribution, run_sanity_checks, CheckKind, SanityFinding, SanityReport, SanitySummary,
    Severity,
};
