//! Signal-bias math utilities.
//!
//! Log-domain primitives, the distribution tails needed for 2x2
//! contingency testing, and the descriptive statistics used by the
//! distribution analyzer and specificity scorer.

pub mod math;

pub use math::chi_square::*;
pub use math::descriptive::*;
pub use math::hypergeometric::*;
pub use math::incomplete_gamma::*;
pub use math::normal::*;
pub use math::stable::*;
