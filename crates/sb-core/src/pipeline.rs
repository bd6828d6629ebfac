//! Analysis coordinator.
//!
//! Runs the stages in dependency order over one frozen corpus snapshot:
//! distribution → correlations → specificity → significance → sanity →
//! classification → recommendations. Each stage implements [`Analyzer`] and
//! receives earlier results as plain inputs; nothing is shared through
//! globals.

use std::collections::BTreeMap;
use std::time::Instant;

use chrono::{DateTime, Utc};
use sb_common::{Corpus, Error, Result, RunId, SignalKey};
use sb_config::{validate_config, AnalysisConfig, ConfigSnapshot};
use serde::{Deserialize, Serialize};
use tracing::info_span;

use crate::audit::{run_sanity_checks, SanityReport};
use crate::classify::{ClassificationCache, SignalClassification, SignalClassifier};
use crate::decision::{
    generate_recommendations, Recommendation, RecommendationAction, RecommendationSummary,
};
use crate::log_event;
use crate::logging::{event_names, LogContext, Stage};
use crate::stats::{
    compute_correlations, compute_distribution, score_specificity, test_significance,
    CmsDistribution, HeaderCmsCorrelation, SignificanceTestResult,
};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

type SignalMap<T> = BTreeMap<SignalKey, T>;

/// Everything a stage may read: the corpus, the configuration, and the
/// outputs of the stages before it.
#[derive(Debug, Clone, Copy)]
pub struct StageInputs<'a> {
    pub corpus: &'a Corpus,
    pub config: &'a AnalysisConfig,
    pub distribution: Option<&'a CmsDistribution>,
    pub correlations: Option<&'a SignalMap<HeaderCmsCorrelation>>,
    pub significance: Option<&'a SignalMap<SignificanceTestResult>>,
    pub sanity: Option<&'a SanityReport>,
    pub classifications: Option<&'a SignalMap<SignalClassification>>,
}

impl<'a> StageInputs<'a> {
    pub fn new(corpus: &'a Corpus, config: &'a AnalysisConfig) -> Self {
        StageInputs {
            corpus,
            config,
            distribution: None,
            correlations: None,
            significance: None,
            sanity: None,
            classifications: None,
        }
    }

    fn require<T>(value: Option<&'a T>, what: &str, stage: &str) -> Result<&'a T> {
        value.ok_or_else(|| Error::Analysis(format!("{stage} stage needs {what}")))
    }
}

/// One analysis stage.
pub trait Analyzer {
    type Output;

    fn name(&self) -> &'static str;

    fn stage(&self) -> Stage;

    /// Run the stage. Errors only when a required earlier output is missing.
    fn analyze(&self, inputs: &StageInputs<'_>) -> Result<Self::Output>;
}

pub struct DistributionAnalyzer;

impl Analyzer for DistributionAnalyzer {
    type Output = CmsDistribution;

    fn name(&self) -> &'static str {
        "distribution"
    }

    fn stage(&self) -> Stage {
        Stage::Distribution
    }

    fn analyze(&self, inputs: &StageInputs<'_>) -> Result<CmsDistribution> {
        Ok(compute_distribution(inputs.corpus, &inputs.config.distribution))
    }
}

pub struct CorrelationAnalyzer;

impl Analyzer for CorrelationAnalyzer {
    type Output = SignalMap<HeaderCmsCorrelation>;

    fn name(&self) -> &'static str {
        "correlation"
    }

    fn stage(&self) -> Stage {
        Stage::Correlate
    }

    fn analyze(&self, inputs: &StageInputs<'_>) -> Result<Self::Output> {
        let distribution = StageInputs::require(inputs.distribution, "a distribution", self.name())?;
        Ok(compute_correlations(
            inputs.corpus,
            distribution,
            &inputs.config.correlation,
        ))
    }
}

/// Attaches a specificity score to every correlation.
pub struct SpecificityAnalyzer;

impl Analyzer for SpecificityAnalyzer {
    type Output = SignalMap<HeaderCmsCorrelation>;

    fn name(&self) -> &'static str {
        "specificity"
    }

    fn stage(&self) -> Stage {
        Stage::Score
    }

    fn analyze(&self, inputs: &StageInputs<'_>) -> Result<Self::Output> {
        let distribution = StageInputs::require(inputs.distribution, "a distribution", self.name())?;
        let correlations = StageInputs::require(inputs.correlations, "correlations", self.name())?;
        let config = &inputs.config.specificity;
        let score = |(signal, corr): (&SignalKey, &HeaderCmsCorrelation)| {
            let scored = score_specificity(corr, distribution, config);
            (signal.clone(), corr.clone().with_specificity(scored))
        };
        #[cfg(feature = "parallel")]
        let scored = correlations.par_iter().map(score).collect();
        #[cfg(not(feature = "parallel"))]
        let scored = correlations.iter().map(score).collect();
        Ok(scored)
    }
}

pub struct SignificanceAnalyzer;

impl Analyzer for SignificanceAnalyzer {
    type Output = SignalMap<SignificanceTestResult>;

    fn name(&self) -> &'static str {
        "significance"
    }

    fn stage(&self) -> Stage {
        Stage::Test
    }

    fn analyze(&self, inputs: &StageInputs<'_>) -> Result<Self::Output> {
        let distribution = StageInputs::require(inputs.distribution, "a distribution", self.name())?;
        let correlations = StageInputs::require(inputs.correlations, "correlations", self.name())?;
        let config = &inputs.config.significance;
        let total_sites = distribution.total_sites;
        let test = |(signal, corr): (&SignalKey, &HeaderCmsCorrelation)| {
            (
                signal.clone(),
                test_significance(signal, corr, distribution, total_sites, config),
            )
        };
        #[cfg(feature = "parallel")]
        let tested = correlations.par_iter().map(test).collect();
        #[cfg(not(feature = "parallel"))]
        let tested = correlations.iter().map(test).collect();
        Ok(tested)
    }
}

pub struct SanityAnalyzer;

impl Analyzer for SanityAnalyzer {
    type Output = SanityReport;

    fn name(&self) -> &'static str {
        "sanity"
    }

    fn stage(&self) -> Stage {
        Stage::Audit
    }

    fn analyze(&self, inputs: &StageInputs<'_>) -> Result<SanityReport> {
        let distribution = StageInputs::require(inputs.distribution, "a distribution", self.name())?;
        let correlations = StageInputs::require(inputs.correlations, "correlations", self.name())?;
        Ok(run_sanity_checks(correlations, distribution, &inputs.config.sanity))
    }
}

pub struct ClassificationAnalyzer<'c> {
    pub cache: &'c ClassificationCache,
}

impl Analyzer for ClassificationAnalyzer<'_> {
    type Output = SignalMap<SignalClassification>;

    fn name(&self) -> &'static str {
        "classification"
    }

    fn stage(&self) -> Stage {
        Stage::Classify
    }

    fn analyze(&self, inputs: &StageInputs<'_>) -> Result<Self::Output> {
        let correlations = StageInputs::require(inputs.correlations, "correlations", self.name())?;
        Ok(correlations
            .keys()
            .map(|k| (k.clone(), self.cache.classify(k)))
            .collect())
    }
}

pub struct RecommendationAnalyzer;

impl Analyzer for RecommendationAnalyzer {
    type Output = SignalMap<Recommendation>;

    fn name(&self) -> &'static str {
        "recommendation"
    }

    fn stage(&self) -> Stage {
        Stage::Recommend
    }

    fn analyze(&self, inputs: &StageInputs<'_>) -> Result<Self::Output> {
        let name = self.name();
        Ok(generate_recommendations(
            StageInputs::require(inputs.correlations, "correlations", name)?,
            StageInputs::require(inputs.distribution, "a distribution", name)?,
            StageInputs::require(inputs.classifications, "classifications", name)?,
            StageInputs::require(inputs.significance, "significance results", name)?,
            StageInputs::require(inputs.sanity, "a sanity report", name)?,
            inputs.config,
        ))
    }
}

/// Complete output of one analysis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub run_id: RunId,
    pub generated_at: DateTime<Utc>,
    pub config: ConfigSnapshot,
    pub total_sites: u64,
    pub distribution: CmsDistribution,
    pub correlations: SignalMap<HeaderCmsCorrelation>,
    pub significance: SignalMap<SignificanceTestResult>,
    pub sanity: SanityReport,
    pub classifications: SignalMap<SignalClassification>,
    pub recommendations: SignalMap<Recommendation>,
    pub summary: RecommendationSummary,
}

impl AnalysisReport {
    pub fn recommendation(&self, signal: &SignalKey) -> Option<&Recommendation> {
        self.recommendations.get(signal)
    }

    pub fn with_action(
        &self,
        action: RecommendationAction,
    ) -> impl Iterator<Item = &Recommendation> + '_ {
        self.recommendations
            .values()
            .filter(move |r| r.action == action)
    }

    /// Recommendations ordered by confidence, highest first (signal breaks
    /// ties).
    pub fn ranked_recommendations(&self) -> Vec<&Recommendation> {
        let mut ranked: Vec<_> = self.recommendations.values().collect();
        ranked.sort_by(|a, b| {
            b.confidence
                .value
                .total_cmp(&a.confidence.value)
                .then_with(|| a.signal.cmp(&b.signal))
        });
        ranked
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Runs every stage over a corpus with one configuration.
#[derive(Debug)]
pub struct AnalysisPipeline {
    config: AnalysisConfig,
    snapshot: ConfigSnapshot,
    cache: ClassificationCache,
}

impl AnalysisPipeline {
    /// Validate the configuration and build a pipeline.
    pub fn new(config: AnalysisConfig, classifier: SignalClassifier) -> Result<Self> {
        validate_config(&config).map_err(|e| Error::Config(e.to_string()))?;
        Ok(AnalysisPipeline {
            snapshot: ConfigSnapshot::in_memory(&config),
            config,
            cache: ClassificationCache::new(classifier),
        })
    }

    /// Replace the in-memory snapshot, e.g. with one from `load_config`.
    pub fn with_snapshot(mut self, snapshot: ConfigSnapshot) -> Self {
        self.snapshot = snapshot;
        self
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn classification_cache(&self) -> &ClassificationCache {
        &self.cache
    }

    /// Analyze one corpus snapshot.
    ///
    /// Data-quality problems (thin samples, degenerate corpora, failed sanity
    /// checks) are reported in the result, not as errors.
    pub fn run(&self, corpus: &Corpus) -> Result<AnalysisReport> {
        let run_id = RunId::new();
        let ctx = LogContext::new(run_id.as_str());
        let span = info_span!("analysis", run_id = %run_id);
        let _guard = span.enter();
        let started = Instant::now();

        log_event!(
            ctx,
            INFO,
            event_names::RUN_STARTED,
            Stage::Init,
            "analysis run started",
            sites = corpus.len() as u64,
            config_hash = self.snapshot.short_id()
        );
        log_event!(
            ctx,
            DEBUG,
            event_names::CORPUS_VALIDATED,
            Stage::Init,
            "corpus validated",
            sites = corpus.len() as u64
        );

        let mut inputs = StageInputs::new(corpus, &self.config);

        let distribution = run_stage(&DistributionAnalyzer, &inputs)?;
        log_event!(
            ctx,
            INFO,
            event_names::DISTRIBUTION_COMPUTED,
            Stage::Distribution,
            "CMS distribution computed",
            platforms = distribution.platforms.len() as u64,
            hhi = distribution.concentration,
            diversity = distribution.diversity
        );
        if distribution.is_degenerate() {
            log_event!(
                ctx,
                WARN,
                event_names::DISTRIBUTION_DEGENERATE,
                Stage::Distribution,
                "corpus has at most one CMS; no signal can discriminate",
                sites = distribution.total_sites
            );
        }
        inputs.distribution = Some(&distribution);

        let raw = run_stage(&CorrelationAnalyzer, &inputs)?;
        log_event!(
            ctx,
            INFO,
            event_names::CORRELATE_FINISHED,
            Stage::Correlate,
            "correlations computed",
            signals = raw.len() as u64
        );
        inputs.correlations = Some(&raw);

        let correlations = run_stage(&SpecificityAnalyzer, &inputs)?;
        inputs.correlations = Some(&correlations);
        log_event!(
            ctx,
            INFO,
            event_names::SCORE_FINISHED,
            Stage::Score,
            "specificity scored",
            signals = correlations.len() as u64
        );

        let significance = run_stage(&SignificanceAnalyzer, &inputs)?;
        let tested = significance.values().filter(|t| t.was_tested()).count();
        log_event!(
            ctx,
            INFO,
            event_names::TEST_FINISHED,
            Stage::Test,
            "significance tested",
            tested = tested as u64,
            not_applicable = (significance.len() - tested) as u64
        );
        inputs.significance = Some(&significance);

        let sanity = run_stage(&SanityAnalyzer, &inputs)?;
        log_findings(&ctx, &sanity);
        inputs.sanity = Some(&sanity);

        let classifications = run_stage(
            &ClassificationAnalyzer { cache: &self.cache },
            &inputs,
        )?;
        log_event!(
            ctx,
            DEBUG,
            event_names::CLASSIFY_FINISHED,
            Stage::Classify,
            "signals classified",
            signals = classifications.len() as u64,
            cached = self.cache.len() as u64
        );
        inputs.classifications = Some(&classifications);

        let recommendations = run_stage(&RecommendationAnalyzer, &inputs)?;
        let summary = RecommendationSummary::from_recommendations(recommendations.values());
        log_event!(
            ctx,
            INFO,
            event_names::RECOMMEND_FINISHED,
            Stage::Recommend,
            "recommendations generated",
            retain = summary.retain as u64,
            filter = summary.filter as u64,
            refine = summary.refine as u64
        );

        log_event!(
            ctx,
            INFO,
            event_names::RUN_FINISHED,
            Stage::Report,
            "analysis run finished",
            passed = sanity.passed,
            elapsed_ms = started.elapsed().as_millis() as u64
        );

        Ok(AnalysisReport {
            run_id,
            generated_at: Utc::now(),
            config: self.snapshot.clone(),
            total_sites: distribution.total_sites,
            distribution,
            correlations,
            significance,
            sanity,
            classifications,
            recommendations,
            summary,
        })
    }
}

fn run_stage<A: Analyzer>(analyzer: &A, inputs: &StageInputs<'_>) -> Result<A::Output> {
    let span = info_span!("stage", stage = %analyzer.stage());
    let _guard = span.enter();
    tracing::trace!(analyzer = analyzer.name(), "stage started");
    analyzer.analyze(inputs)
}

fn log_findings(ctx: &LogContext, sanity: &SanityReport) {
    for finding in &sanity.errors {
        let signal = finding.signal.as_ref().map(ToString::to_string);
        tracing::error!(
            target: event_names::AUDIT_HARD_ERROR,
            run_id = %ctx.run_id,
            stage = %Stage::Audit,
            signal = signal.as_deref(),
            check = %finding.check,
            message = %finding.message
        );
    }
    for finding in &sanity.warnings {
        let signal = finding.signal.as_ref().map(ToString::to_string);
        tracing::warn!(
            target: event_names::AUDIT_WARNING,
            run_id = %ctx.run_id,
            stage = %Stage::Audit,
            signal = signal.as_deref(),
            check = %finding.check,
            severity = %finding.severity,
            message = %finding.message
        );
    }
    log_event!(
        ctx,
        INFO,
        event_names::AUDIT_FINISHED,
        Stage::Audit,
        "sanity checks finished",
        passed = sanity.passed,
        errors = sanity.summary.errors as u64,
        warnings = sanity.summary.warnings as u64
    );
}
