//! Synthesis statistics scraper

use indexmap::IndexMap;
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;
use tracing::warn;

/// Report patterns and the statistic each one feeds
const PATTERNS: [(&str, &str); 3] = [
    (r"NAND cells:\s+(\d+)", "NANDs"),
    (r"internal signals:\s+(\d+)", "Internal Signals"),
    (r"Number of cells:\s+(\d+)", "Number of cells"),
];

fn patterns() -> &'static [(Regex, &'static str)] {
    static COMPILED: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    COMPILED.get_or_init(|| {
        PATTERNS
            .iter()
            .filter_map(|(pattern, key)| Regex::new(pattern).ok().map(|re| (re, *key)))
            .collect()
    })
}

/// Sum every match of every pattern. All keys are present, zero when unmatched.
pub fn collect_statistics(report: &str) -> IndexMap<String, u64> {
    patterns()
        .iter()
        .map(|(re, key)| {
            let total = re
                .captures_iter(report)
                .filter_map(|caps| caps.get(1)?.as_str().parse::<u64>().ok())
                .sum();
            (key.to_string(), total)
        })
        .collect()
}

/// Scrape a report file. A missing or unreadable report yields no statistics.
pub fn collect_statistics_file(path: impl AsRef<Path>) -> IndexMap<String, u64> {
    let path = path.as_ref();
    match std::fs::read_to_string(path) {
        Ok(report) => collect_statistics(&report),
        Err(e) => {
            warn!("Cannot read synthesis report {}: {}", path.display(), e);
            IndexMap::new()
        }
    }
}
