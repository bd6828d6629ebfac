//! Core math modules.

pub mod chi_square;
pub mod descriptive;
pub mod hypergeometric;
pub mod incomplete_gamma;
pub mod normal;
pub mod stable;
