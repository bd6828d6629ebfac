//! Corpus loading from JSON files written the way the crawler exports them.

use sb_common::{Corpus, Error, ErrorCategory, SignalKey, SiteRecord, StructuredError};
use std::fs;

const EXPORT: &str = r#"[
  {
    "url": "https://blog.example.org",
    "cms": "WordPress 6.4",
    "confidence": 0.95,
    "headers": {"X-Pingback": ["https://blog.example.org/xmlrpc.php"], "Server": ["nginx"]},
    "meta_tags": {"generator": ["WordPress 6.4"]},
    "scripts": {"wp-emoji-release": ["/wp-includes/js/wp-emoji-release.min.js"]}
  },
  {
    "url": "https://gov.example.org",
    "cms": "Drupal 7",
    "confidence": 0.8,
    "headers": {"X-Drupal-Cache": ["HIT"], "server": ["Apache"]}
  },
  {
    "url": "https://static.example.org",
    "cms": null,
    "confidence": 0.0,
    "headers": {"server": ["cloudflare"], "cf-ray": ["8a1b"]}
  }
]"#;

#[test]
fn loads_crawler_export_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sites.json");
    fs::write(&path, EXPORT).unwrap();

    let corpus = Corpus::from_json_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(corpus.len(), 3);

    let labels: Vec<String> = corpus.iter().map(|s| s.cms_name().to_string()).collect();
    assert_eq!(labels, vec!["WordPress", "Drupal", "Unknown"]);

    let vocab = corpus.signal_vocabulary();
    assert!(vocab.contains(&SignalKey::header("server")));
    assert!(vocab.contains(&SignalKey::meta("generator")));
    assert!(vocab.contains(&SignalKey::script("wp-emoji-release")));
    // "Server" and "server" collapse
    assert_eq!(vocab.iter().filter(|k| k.name() == "server").count(), 1);
}

#[test]
fn malformed_json_is_an_io_category_error() {
    let err = Corpus::from_json_str("{not json").unwrap_err();
    assert!(matches!(err, Error::Json(_)));
    assert_eq!(err.category(), ErrorCategory::Io);
}

#[test]
fn invalid_record_reports_index() {
    let json = r#"[
      {"url": "https://a.example", "cms": "Wix", "confidence": 0.5},
      {"url": "https://b.example", "cms": "Wix", "confidence": -0.1}
    ]"#;
    let err = Corpus::from_json_str(json).unwrap_err();
    let structured = StructuredError::from(&err);
    assert_eq!(structured.code, 20);
    assert_eq!(structured.context.get("index"), Some(&serde_json::json!(1)));
}

#[test]
fn builder_records_match_parsed_records() {
    let parsed = Corpus::from_json_str(EXPORT).unwrap();
    let built = SiteRecord::new("https://blog.example.org", "WordPress 6.4", 0.95)
        .with_header("X-Pingback", "https://blog.example.org/xmlrpc.php")
        .with_header("Server", "nginx")
        .with_meta("generator", "WordPress 6.4")
        .with_script("wp-emoji-release", "/wp-includes/js/wp-emoji-release.min.js");
    assert_eq!(&parsed.sites()[0], &built);
    assert_eq!(built.signal_keys(), parsed.sites()[0].signal_keys());
}
