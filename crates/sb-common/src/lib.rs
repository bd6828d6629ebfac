//! Signal-bias common types, IDs, and errors.
//!
//! This crate provides the data model shared by the analysis crates:
//! - Site records and the validated corpus
//! - Signal keys (source + name) used to index every analysis output
//! - CMS label normalization
//! - The unified error type with stable codes
//! - Run identifiers and output formats

pub mod cms;
pub mod error;
pub mod id;
pub mod output;
pub mod site;

pub use cms::CmsName;
pub use error::{Error, ErrorCategory, Result, StructuredError};
pub use id::RunId;
pub use output::OutputFormat;
pub use site::{Corpus, SignalKey, SignalSource, SiteRecord};
