//! Report rendering.
//!
//! Mechanical presentation of an [`AnalysisReport`]; no analysis happens
//! here.

use std::fmt::Write as _;

use sb_common::{OutputFormat, Result};

use crate::pipeline::AnalysisReport;

/// Rows shown in the markdown recommendation table.
const MD_TOP_RECOMMENDATIONS: usize = 25;

const CSV_HEADER: &str = "signal,category,action,confidence,confidence_level,top_cms,top_probability,occurrences,specificity,specificity_method,test_method,p_value,significance,warnings,blocked_by_errors";

/// Render a report in the requested format.
pub fn render_report(report: &AnalysisReport, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => report.to_json(),
        OutputFormat::Md => Ok(render_markdown(report)),
        OutputFormat::Csv => Ok(render_csv(report)),
        OutputFormat::Summary => Ok(render_summary(report)),
    }
}

/// One-line status.
pub fn render_summary(report: &AnalysisReport) -> String {
    let s = &report.summary;
    format!(
        "{}: {} sites, {} signals; retain {}, refine {}, filter {}; sanity {} ({} errors, {} warnings)",
        report.run_id,
        report.total_sites,
        s.total,
        s.retain,
        s.refine,
        s.filter,
        if report.sanity.passed { "passed" } else { "FAILED" },
        report.sanity.summary.errors,
        report.sanity.summary.warnings
    )
}

pub fn render_csv(report: &AnalysisReport) -> String {
    let mut out = String::from(CSV_HEADER);
    out.push('\n');
    for (signal, rec) in &report.recommendations {
        let corr = report.correlations.get(signal);
        let method = corr
            .and_then(|c| c.platform_specificity.as_ref())
            .map(|s| s.method.to_string())
            .unwrap_or_default();
        let test = report.significance.get(signal);
        let fields = [
            signal.to_string(),
            rec.category.to_string(),
            rec.action.to_string(),
            format!("{:.4}", rec.confidence.value),
            rec.confidence.level.to_string(),
            rec.top_cms.as_ref().map(|c| c.to_string()).unwrap_or_default(),
            format!("{:.4}", rec.top_probability),
            rec.occurrences.to_string(),
            rec.specificity.map(|s| format!("{s:.4}")).unwrap_or_default(),
            method,
            test.map(|t| t.method.to_string()).unwrap_or_default(),
            rec.p_value.map(|p| format!("{p:.6e}")).unwrap_or_default(),
            rec.significance.map(|s| s.to_string()).unwrap_or_default(),
            rec.warnings.to_string(),
            rec.blocked_by_errors.to_string(),
        ];
        let row: Vec<String> = fields.iter().map(|f| csv_field(f)).collect();
        out.push_str(&row.join(","));
        out.push('\n');
    }
    out
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn md_cell(value: &str) -> String {
    value.replace('|', "\\|").replace('\n', " ")
}

pub fn render_markdown(report: &AnalysisReport) -> String {
    let mut out = String::new();
    let dist = &report.distribution;

    let _ = writeln!(out, "# Signal bias analysis `{}`\n", report.run_id);
    let _ = writeln!(
        out,
        "Generated {} with config `{}` ({}).\n",
        report.generated_at.to_rfc3339(),
        report.config.short_id(),
        report.config.source
    );
    let _ = writeln!(out, "{}\n", render_summary(report));

    let _ = writeln!(out, "## CMS distribution\n");
    let _ = writeln!(out, "| CMS | Sites | Share | Avg. label confidence |");
    let _ = writeln!(out, "|-----|------:|------:|----------------------:|");
    for (cms, stats) in dist.ranked() {
        let _ = writeln!(
            out,
            "| {} | {} | {:.1}% | {:.2} |",
            md_cell(cms.as_str()),
            stats.count,
            stats.percentage,
            stats.average_confidence
        );
    }
    let _ = writeln!(
        out,
        "\nHHI {:.3} ({} concentration risk), Shannon {:.3} ({} diversity risk).",
        dist.concentration, dist.concentration_risk, dist.diversity, dist.diversity_risk
    );
    if !dist.dominant_platforms.is_empty() {
        let names: Vec<&str> = dist.dominant_platforms.iter().map(|c| c.as_str()).collect();
        let _ = writeln!(out, "Dominant: {}.", names.join(", "));
    }

    let _ = writeln!(out, "\n## Recommendations\n");
    let _ = writeln!(
        out,
        "| Signal | Action | Confidence | Top CMS | P(CMS\\|signal) | Specificity | Reasoning |"
    );
    let _ = writeln!(out, "|--------|--------|-----------:|---------|---------------:|------------:|-----------|");
    for rec in report
        .ranked_recommendations()
        .into_iter()
        .take(MD_TOP_RECOMMENDATIONS)
    {
        let _ = writeln!(
            out,
            "| `{}` | {} | {:.2} ({}) | {} | {:.1}% | {} | {} |",
            rec.signal,
            rec.action,
            rec.confidence.value,
            rec.confidence.level,
            rec.top_cms.as_ref().map(|c| md_cell(c.as_str())).unwrap_or_else(|| "-".to_string()),
            rec.top_probability * 100.0,
            rec.specificity.map_or_else(|| "-".to_string(), |s| format!("{s:.2}")),
            md_cell(&rec.reasoning)
        );
    }
    if report.recommendations.len() > MD_TOP_RECOMMENDATIONS {
        let _ = writeln!(
            out,
            "\n_{} more signals omitted._",
            report.recommendations.len() - MD_TOP_RECOMMENDATIONS
        );
    }

    let _ = writeln!(out, "\n## Sanity checks\n");
    if report.sanity.errors.is_empty() && report.sanity.warnings.is_empty() {
        let _ = writeln!(out, "All checks passed.");
    } else {
        let _ = writeln!(out, "| Severity | Check | Signal | Message |");
        let _ = writeln!(out, "|----------|-------|--------|---------|");
        for finding in report.sanity.errors.iter().chain(&report.sanity.warnings) {
            let _ = writeln!(
                out,
                "| {} | {} | {} | {} |",
                finding.severity,
                finding.check,
                finding
                    .signal
                    .as_ref()
                    .map_or_else(|| "-".to_string(), |s| format!("`{s}`")),
                md_cell(&finding.message)
            );
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::SignalClassifier;
    use crate::pipeline::AnalysisPipeline;
    use sb_common::{Corpus, SiteRecord};
    use sb_config::AnalysisConfig;

    fn report() -> AnalysisReport {
        let sites = (0..12)
            .map(|i| {
                let cms = if i % 2 == 0 { "WordPress" } else { "Wix" };
                SiteRecord::new(format!("https://r{i}.example"), cms, 1.0)
                    .with_header("content-type", "text/html")
                    .with_meta("generator, custom", "x")
            })
            .collect();
        let corpus = Corpus::new(sites).unwrap();
        AnalysisPipeline::new(AnalysisConfig::default(), SignalClassifier::new())
            .unwrap()
            .run(&corpus)
            .unwrap()
    }

    #[test]
    fn csv_has_one_row_per_signal_and_quotes_commas() {
        let out = render_report(&report(), OutputFormat::Csv).unwrap();
        let lines: Vec<_> = out.lines().collect();
        assert_eq!(lines[0], CSV_HEADER);
        assert_eq!(lines.len(), 3);
        assert!(out.contains("\"meta:generator, custom\""));
    }

    #[test]
    fn json_round_trips_through_serde() {
        let report = report();
        let json = render_report(&report, OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["run_id"], report.run_id.as_str());
        assert!(value["recommendations"]["header:content-type"].is_object());
    }

    #[test]
    fn markdown_has_sections() {
        let out = render_report(&report(), OutputFormat::Md).unwrap();
        assert!(out.contains("## CMS distribution"));
        assert!(out.contains("## Recommendations"));
        assert!(out.contains("## Sanity checks"));
        assert!(out.contains("| WordPress | 6 | 50.0% |"));
    }

    #[test]
    fn summary_is_one_line() {
        let report = report();
        let out = render_report(&report, OutputFormat::Summary).unwrap();
        assert!(!out.contains('\n'));
        assert!(out.starts_with(report.run_id.as_str()));
        assert!(out.contains("12 sites, 2 signals"));
    }
}
