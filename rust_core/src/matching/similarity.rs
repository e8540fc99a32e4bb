//! Approximate string similarity used by the last resolver tier.

use strsim::{jaro_winkler, normalized_levenshtein};

/// Similarity on a 0..=1 scale, 1 meaning identical.
pub trait Similarity: Send + Sync {
    fn name(&self) -> &'static str;

    fn score(&self, a: &str, b: &str) -> f64;
}

/// Jaro-Winkler; favours shared prefixes, which suits ticker typos.
#[derive(Debug, Clone, Copy, Default)]
pub struct JaroWinkler;

impl Similarity for JaroWinkler {
    fn name(&self) -> &'static str {
        "jaro_winkler"
    }

    fn score(&self, a: &str, b: &str) -> f64 {
        jaro_winkler(a, b)
    }
}

/// Levenshtein distance normalized by the longer length.
#[derive(Debug, Clone, Copy, Default)]
pub struct NormalizedLevenshtein;

impl Similarity for NormalizedLevenshtein {
    fn name(&self) -> &'static str {
        "levenshtein"
    }

    fn score(&self, a: &str, b: &str) -> f64 {
        normalized_levenshtein(a, b)
    }
}

/// Look up a similarity function by its configured name.
pub fn by_name(name: &str) -> Option<Box<dyn Similarity>> {
    match name.trim().to_lowercase().as_str() {
        "jaro_winkler" | "jaro-winkler" | "jw" => Some(Box::new(JaroWinkler)),
        "levenshtein" | "normalized_levenshtein" => Some(Box::new(NormalizedLevenshtein)),
        _ => None,
    }
}
