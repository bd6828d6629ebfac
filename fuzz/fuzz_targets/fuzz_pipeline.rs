//! Fuzz target running the full analysis over structured corpora.
//!
//! Any corpus that validates must analyze without error, and the computed
//! correlations must pass every hard sanity check.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use sb_common::{Corpus, SiteRecord};
use sb_config::AnalysisConfig;
use sb_core::{AnalysisPipeline, SignalClassifier};

#[derive(Debug, Arbitrary)]
struct FuzzSite {
    cms: Option<String>,
    confidence: u8,
    headers: Vec<String>,
    meta: Vec<String>,
}

fuzz_target!(|sites: Vec<FuzzSite>| {
    let records = sites
        .into_iter()
        .take(512)
        .enumerate()
        .map(|(i, site)| {
            let mut record = SiteRecord::new(
                format!("https://f{i}.example"),
                site.cms.unwrap_or_default(),
                f64::from(site.confidence) / 255.0,
            );
            for name in site.headers.iter().take(16) {
                record = record.with_header(name, "v");
            }
            for name in site.meta.iter().take(8) {
                record = record.with_meta(name, "v");
            }
            record
        })
        .collect();
    let Ok(corpus) = Corpus::new(records) else {
        return;
    };
    let Ok(pipeline) = AnalysisPipeline::new(AnalysisConfig::default(), SignalClassifier::new())
    else {
        return;
    };
    let report = pipeline.run(&corpus).expect("valid corpus analyzes");
    assert!(report.sanity.passed, "{:?}", report.sanity.errors);
});
