//! Significance testing of a signal's strongest CMS association.
//!
//! Builds the 2×2 table
//!
//! ```text
//!                  CMS = target   CMS ≠ target
//!   signal              a              b
//!   no signal           c              d
//! ```
//!
//! and runs Fisher's exact test for small or sparse tables, otherwise a
//! Yates-corrected chi-square test with one degree of freedom.

use sb_common::{CmsName, SignalKey};
use sb_config::SignificanceConfig;
use sb_math::{chi_square_survival, fisher_exact_two_sided, Z_95};
use serde::{Deserialize, Serialize};

use super::correlation::HeaderCmsCorrelation;
use super::distribution::CmsDistribution;

/// Test used for a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestMethod {
    ChiSquare,
    FisherExact,
    NotApplicable,
}

impl std::fmt::Display for TestMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TestMethod::ChiSquare => write!(f, "chi-square"),
            TestMethod::FisherExact => write!(f, "Fisher exact"),
            TestMethod::NotApplicable => write!(f, "not applicable"),
        }
    }
}

/// Use/caution/reject verdict on a correlation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestRecommendation {
    Use,
    Caution,
    Reject,
}

impl std::fmt::Display for TestRecommendation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TestRecommendation::Use => write!(f, "use"),
            TestRecommendation::Caution => write!(f, "caution"),
            TestRecommendation::Reject => write!(f, "reject"),
        }
    }
}

/// Direction of the target association relative to the corpus mix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Association {
    Positive,
    Negative,
    Neutral,
}

/// 2×2 contingency table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContingencyTable {
    /// Signal and target CMS.
    pub a: u64,
    /// Signal, other CMS.
    pub b: u64,
    /// No signal, target CMS.
    pub c: u64,
    /// No signal, other CMS.
    pub d: u64,
}

impl ContingencyTable {
    pub fn new(a: u64, b: u64, c: u64, d: u64) -> Self {
        ContingencyTable { a, b, c, d }
    }

    pub fn total(&self) -> u64 {
        self.a + self.b + self.c + self.d
    }

    /// A zero row or column margin.
    pub fn is_degenerate(&self) -> bool {
        self.a + self.b == 0 || self.c + self.d == 0 || self.a + self.c == 0 || self.b + self.d == 0
    }

    /// Expected counts `[a, b, c, d]` under independence.
    pub fn expected(&self) -> [f64; 4] {
        let n = self.total() as f64;
        if n == 0.0 {
            return [0.0; 4];
        }
        let r1 = (self.a + self.b) as f64;
        let r2 = (self.c + self.d) as f64;
        let c1 = (self.a + self.c) as f64;
        let c2 = (self.b + self.d) as f64;
        [r1 * c1 / n, r1 * c2 / n, r2 * c1 / n, r2 * c2 / n]
    }

    pub fn min_expected(&self) -> f64 {
        self.expected().into_iter().fold(f64::INFINITY, f64::min)
    }

    fn observed(&self) -> [f64; 4] {
        [self.a as f64, self.b as f64, self.c as f64, self.d as f64]
    }

    /// Share of the target among signal carriers versus in the whole table.
    pub fn association(&self) -> Association {
        let carriers = self.a + self.b;
        let n = self.total();
        if carriers == 0 || n == 0 {
            return Association::Neutral;
        }
        // a/(a+b) vs (a+c)/n, cross-multiplied to stay in integers.
        let lhs = self.a as u128 * n as u128;
        let rhs = (self.a + self.c) as u128 * carriers as u128;
        match lhs.cmp(&rhs) {
            std::cmp::Ordering::Greater => Association::Positive,
            std::cmp::Ordering::Less => Association::Negative,
            std::cmp::Ordering::Equal => Association::Neutral,
        }
    }
}

/// Yates-corrected chi-square statistic and its df = 1 p-value.
pub fn chi_square_yates(table: &ContingencyTable) -> (f64, f64) {
    let statistic: f64 = table
        .observed()
        .iter()
        .zip(table.expected())
        .filter(|(_, e)| *e > 0.0)
        .map(|(o, e)| {
            let diff = ((o - e).abs() - 0.5).max(0.0);
            diff * diff / e
        })
        .sum();
    (statistic, chi_square_survival(statistic, 1.0))
}

/// Odds ratio with its approximate 95% interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OddsRatio {
    pub value: f64,
    pub lower: f64,
    pub upper: f64,
    /// 0.5 was added to every cell because one of them was zero.
    pub haldane_corrected: bool,
}

/// Odds ratio `(a·d)/(b·c)` and `exp(ln OR ± z·SE)`.
pub fn odds_ratio(table: &ContingencyTable) -> OddsRatio {
    let haldane_corrected = table.a == 0 || table.b == 0 || table.c == 0 || table.d == 0;
    let shift = if haldane_corrected { 0.5 } else { 0.0 };
    let [a, b, c, d] = table.observed().map(|x| x + shift);
    let log_or = (a * d).ln() - (b * c).ln();
    let se = (1.0 / a + 1.0 / b + 1.0 / c + 1.0 / d).sqrt();
    OddsRatio {
        value: log_or.exp(),
        lower: (log_or - Z_95 * se).exp(),
        upper: (log_or + Z_95 * se).exp(),
        haldane_corrected,
    }
}

/// Outcome of testing one signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignificanceTestResult {
    pub signal: SignalKey,
    pub method: TestMethod,
    pub target_cms: Option<CmsName>,
    pub table: Option<ContingencyTable>,
    /// Chi-square statistic (chi-square method only).
    pub statistic: Option<f64>,
    pub degrees_of_freedom: Option<u32>,
    pub p_value: Option<f64>,
    pub odds_ratio: Option<OddsRatio>,
    pub association: Association,
    pub is_significant: bool,
    pub recommendation: TestRecommendation,
    pub reason: String,
}

impl SignificanceTestResult {
    fn not_applicable(signal: SignalKey, target_cms: Option<CmsName>, reason: String) -> Self {
        SignificanceTestResult {
            signal,
            method: TestMethod::NotApplicable,
            target_cms,
            table: None,
            statistic: None,
            degrees_of_freedom: None,
            p_value: None,
            odds_ratio: None,
            association: Association::Neutral,
            is_significant: false,
            recommendation: TestRecommendation::Reject,
            reason,
        }
    }

    pub fn was_tested(&self) -> bool {
        self.method != TestMethod::NotApplicable
    }
}

/// Map a p-value onto use/caution/reject. Boundaries are exclusive below:
/// p = 0.01 is "caution", p = 0.05 is "reject".
pub fn recommendation_for(p_value: f64, config: &SignificanceConfig) -> TestRecommendation {
    if p_value < config.use_alpha {
        TestRecommendation::Use
    } else if p_value < config.caution_alpha {
        TestRecommendation::Caution
    } else {
        TestRecommendation::Reject
    }
}

/// Which test a table calls for.
pub fn select_method(table: &ContingencyTable, config: &SignificanceConfig) -> TestMethod {
    if table.is_degenerate() {
        TestMethod::NotApplicable
    } else if table.total() <= config.fisher_max_total
        || table.min_expected() < config.min_expected_count
    {
        TestMethod::FisherExact
    } else {
        TestMethod::ChiSquare
    }
}

/// Test an explicit table against `target`.
pub fn test_table(
    signal: SignalKey,
    target: CmsName,
    table: ContingencyTable,
    config: &SignificanceConfig,
) -> SignificanceTestResult {
    let method = select_method(&table, config);
    if method == TestMethod::NotApplicable {
        return SignificanceTestResult::not_applicable(
            signal,
            Some(target),
            "contingency table has an empty row or column".to_string(),
        );
    }

    let (statistic, degrees_of_freedom, p_value) = match method {
        TestMethod::ChiSquare => {
            let (stat, p) = chi_square_yates(&table);
            (Some(stat), Some(1), p)
        }
        _ => (
            None,
            None,
            fisher_exact_two_sided(table.a, table.b, table.c, table.d),
        ),
    };
    let association = table.association();
    let by_p = recommendation_for(p_value, config);
    // Only over-representation of the target supports using the signal for it.
    let recommendation = if association == Association::Positive {
        by_p
    } else {
        TestRecommendation::Reject
    };
    let reason = match (recommendation, by_p) {
        (TestRecommendation::Reject, TestRecommendation::Use | TestRecommendation::Caution) => {
            format!(
                "{} p = {:.4} < {}: {} is under-represented among carriers ({} association)",
                method,
                p_value,
                config.caution_alpha,
                target,
                match association {
                    Association::Negative => "negative",
                    _ => "no",
                }
            )
        }
        (TestRecommendation::Use, _) => format!(
            "{} p = {:.3e} < {}: strong evidence of association with {}",
            method, p_value, config.use_alpha, target
        ),
        (TestRecommendation::Caution, _) => format!(
            "{} p = {:.4} < {}: moderate evidence of association with {}",
            method, p_value, config.caution_alpha, target
        ),
        (TestRecommendation::Reject, _) => format!(
            "{} p = {:.4} >= {}: no reliable association with {}",
            method, p_value, config.caution_alpha, target
        ),
    };

    SignificanceTestResult {
        signal,
        method,
        target_cms: Some(target),
        table: Some(table),
        statistic,
        degrees_of_freedom,
        p_value: Some(p_value),
        odds_ratio: Some(odds_ratio(&table)),
        association,
        is_significant: p_value < config.caution_alpha,
        recommendation,
        reason,
    }
}

/// Test a signal's strongest CMS association.
///
/// Not applicable (never an error) when the best P(CMS | signal) is below
/// `min_correlation`, when counts cannot form a table, or when a margin is
/// empty.
pub fn test_significance(
    signal: &SignalKey,
    correlation: &HeaderCmsCorrelation,
    distribution: &CmsDistribution,
    total_sites: u64,
    config: &SignificanceConfig,
) -> SignificanceTestResult {
    let Some((target, top)) = correlation.top_cms() else {
        return SignificanceTestResult::not_applicable(
            signal.clone(),
            None,
            "signal has no carriers".to_string(),
        );
    };
    if top.probability < config.min_correlation {
        return SignificanceTestResult::not_applicable(
            signal.clone(),
            Some(target.clone()),
            format!(
                "strongest correlation {:.1}% is below the {:.0}% floor",
                top.probability * 100.0,
                config.min_correlation * 100.0
            ),
        );
    }

    let occurrences = correlation.overall_occurrences;
    let target_total = distribution.count(target);
    let a = top.count;
    let cells = occurrences
        .checked_sub(a)
        .zip(target_total.checked_sub(a))
        .and_then(|(b, c)| {
            total_sites
                .checked_sub(a + b + c)
                .map(|d| ContingencyTable::new(a, b, c, d))
        });
    match cells {
        Some(table) => test_table(signal.clone(), target.clone(), table, config),
        None => SignificanceTestResult::not_applicable(
            signal.clone(),
            Some(target.clone()),
            format!(
                "counts do not form a table: {a} carriers of {occurrences}, {target_total} {target} sites, {total_sites} total"
            ),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> SignificanceConfig {
        SignificanceConfig::default()
    }

    fn run(table: ContingencyTable) -> SignificanceTestResult {
        test_table(SignalKey::header("x-test"), CmsName::normalize("WordPress"), table, &cfg())
    }

    #[test]
    fn large_clear_association_uses_chi_square() {
        let result = run(ContingencyTable::new(300, 100, 100, 300));
        assert_eq!(result.method, TestMethod::ChiSquare);
        assert_eq!(result.degrees_of_freedom, Some(1));
        assert!(result.p_value.unwrap() < 0.01);
        assert!(result.is_significant);
        assert_eq!(result.recommendation, TestRecommendation::Use);
        assert_eq!(result.association, Association::Positive);
        assert!((result.odds_ratio.unwrap().value - 9.0).abs() < 1e-9);
    }

    #[test]
    fn large_independent_table_is_rejected() {
        let result = run(ContingencyTable::new(200, 200, 200, 200));
        assert_eq!(result.method, TestMethod::ChiSquare);
        assert!(result.p_value.unwrap() >= 0.05);
        assert!(!result.is_significant);
        assert_eq!(result.recommendation, TestRecommendation::Reject);
        assert_eq!(result.association, Association::Neutral);
    }

    #[test]
    fn significant_under_representation_is_rejected() {
        // WordPress: 300 of 3000 carry the signal; Drupal: 200 of 1000.
        let result = run(ContingencyTable::new(300, 200, 2700, 800));
        assert_eq!(result.method, TestMethod::ChiSquare);
        assert!(result.p_value.unwrap() < 0.01);
        assert_eq!(result.association, Association::Negative);
        assert!(result.is_significant);
        assert_eq!(result.recommendation, TestRecommendation::Reject);
        assert!(result.reason.contains("under-represented"));
    }

    #[test]
    fn yates_correction_shrinks_statistic() {
        let table = ContingencyTable::new(60, 40, 40, 60);
        let (stat, _) = chi_square_yates(&table);
        // Uncorrected statistic is 8.0; corrected uses |O-E| - 0.5 = 9.5.
        let expected = 4.0 * 9.5 * 9.5 / 50.0;
        assert!((stat - expected).abs() < 1e-9);
    }

    #[test]
    fn small_table_uses_fisher() {
        let result = run(ContingencyTable::new(3, 1, 1, 3));
        assert_eq!(result.method, TestMethod::FisherExact);
        assert!((result.p_value.unwrap() - 34.0 / 70.0).abs() < 1e-9);
        assert_eq!(result.recommendation, TestRecommendation::Reject);
        assert!(result.statistic.is_none());
    }

    #[test]
    fn sparse_cell_forces_fisher_on_large_table() {
        let table = ContingencyTable::new(0, 10, 200, 3000);
        assert!(table.total() > 100);
        assert!(table.min_expected() < 5.0);
        assert_eq!(select_method(&table, &cfg()), TestMethod::FisherExact);
        let result = run(table);
        assert_eq!(result.association, Association::Negative);
    }

    #[test]
    fn zero_cell_gets_haldane_correction() {
        let or = odds_ratio(&ContingencyTable::new(10, 0, 0, 10));
        assert!(or.haldane_corrected);
        assert!((or.value - 441.0).abs() < 1e-9);
        assert!(or.lower < or.value && or.value < or.upper);
    }

    #[test]
    fn degenerate_table_is_not_applicable() {
        let result = run(ContingencyTable::new(5, 5, 0, 0));
        assert_eq!(result.method, TestMethod::NotApplicable);
        assert!(!result.was_tested());
        assert_eq!(result.recommendation, TestRecommendation::Reject);
    }

    #[test]
    fn alpha_boundaries_are_exact() {
        let c = cfg();
        assert_eq!(recommendation_for(0.009_999, &c), TestRecommendation::Use);
        assert_eq!(recommendation_for(0.01, &c), TestRecommendation::Caution);
        assert_eq!(recommendation_for(0.049_999, &c), TestRecommendation::Caution);
        assert_eq!(recommendation_for(0.05, &c), TestRecommendation::Reject);
    }
}
