//! Fuzz target for corpus JSON parsing.
//!
//! Malformed records must surface as errors, never panics; anything that
//! parses must analyze cleanly.

#![no_main]

use libfuzzer_sys::fuzz_target;
use sb_common::Corpus;
use sb_config::AnalysisConfig;
use sb_core::{AnalysisPipeline, SignalClassifier};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(corpus) = Corpus::from_json_str(text) else {
        return;
    };
    if let Ok(pipeline) = AnalysisPipeline::new(AnalysisConfig::default(), SignalClassifier::new()) {
        let report = pipeline.run(&corpus).expect("parsed corpus analyzes");
        assert!(report.sanity.passed, "{:?}", report.sanity.errors);
    }
});
