//! Article body extraction: an ordered ensemble of extractors with heuristic
//! failure classification.

use regex::Regex;
use std::sync::LazyLock;

use crate::domain::FailureReason;
use crate::text::sanitize_text;

/// Minimum sanitized body length (in characters) to accept an extraction
/// result as real article text rather than boilerplate or an error page.
pub const MIN_TEXT_LENGTH: usize = 200;

/// A single extraction backend in the fallback chain. Each implementation
/// wraps one real extraction library; failures are swallowed by the ensemble
/// runner so the next extractor gets a chance.
pub trait Extractor: Send + Sync {
    /// Human-readable name, used in logs and the `warnings` list.
    fn name(&self) -> &'static str;

    /// Attempts to extract the article body from raw HTML. Returns `None` on
    /// any failure; extractors should not panic on malformed input.
    fn extract(&self, html: &str) -> Option<String>;
}

static JS_INDICATORS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)please enable javascript",
        r"(?i)requires javascript",
        r"(?i)<noscript>",
        r"(?i)you need to enable javascript",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid regex"))
    .collect()
});

static CONSENT_INDICATORS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)accept (all )?cookies",
        r"(?i)we use cookies",
        r"(?i)gdpr",
        r"(?i)manage (your )?(cookie|privacy) (preferences|settings)",
        r"(?i)consent to (our|the) use of",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid regex"))
    .collect()
});

static PAYWALL_INDICATORS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)subscribe to (continue|read)",
        r"(?i)this (content|article) is for subscribers",
        r"(?i)you('ve| have) reached your (free )?article limit",
        r"(?i)become a (member|subscriber) to",
        r"(?i)paywall",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid regex"))
    .collect()
});

fn matches_any(patterns: &[Regex], haystack: &str) -> bool {
    patterns.iter().any(|re| re.is_match(haystack))
}

/// Classifies why extraction failed by scanning the raw HTML for known
/// indicator phrases, checked in order: paywall, consent wall, JS
/// requirement (gated on a short body, since many legitimate pages also
/// embed a `<noscript>` fallback), then a generic "no text" fallback.
#[must_use]
pub fn detect_failure_reason(html: &str, body_len: usize) -> FailureReason {
    if matches_any(&PAYWALL_INDICATORS, html) {
        return FailureReason::Paywall;
    }
    if matches_any(&CONSENT_INDICATORS, html) {
        return FailureReason::ConsentWall;
    }
    if matches_any(&JS_INDICATORS, html) && body_len < MIN_TEXT_LENGTH {
        return FailureReason::JsRequired;
    }
    FailureReason::NoText
}

/// Whether a page's extraction failure indicates a headless-browser retry
/// might succeed (JS-rendered content), as opposed to a hard wall (paywall,
/// consent) that a browser wouldn't get past either.
#[must_use]
pub fn needs_browser_rendering(reason: FailureReason) -> bool {
    matches!(reason, FailureReason::JsRequired)
}

/// Result of running the extraction ensemble over one page.
#[derive(Debug, Clone)]
pub struct ExtractionResult {
    pub text: String,
    pub extractor_used: &'static str,
    pub warnings: Vec<String>,
}

/// Extraction failed entirely; every extractor in the chain either errored or
/// produced text shorter than [`MIN_TEXT_LENGTH`].
#[derive(Debug, Clone, thiserror::Error)]
#[error("extraction failed: {reason:?}")]
pub struct ExtractionError {
    pub reason: FailureReason,
    pub warnings: Vec<String>,
}

/// Runs `extractors` in order against `html`, accepting the first result
/// whose sanitized text is at least `min_length` characters. Extractors that
/// fail or produce too-short text are recorded as warnings and skipped.
///
/// # Errors
///
/// Returns [`ExtractionError`] if no extractor in the chain produces
/// acceptable text.
pub fn extract_article_text(
    extractors: &[Box<dyn Extractor>],
    html: &str,
    min_length: usize,
) -> Result<ExtractionResult, ExtractionError> {
    let mut warnings = Vec::new();

    for extractor in extractors {
        match extractor.extract(html) {
            Some(raw) => {
                let sanitized = sanitize_text(&raw);
                if sanitized.len() >= min_length {
                    return Ok(ExtractionResult {
                        text: sanitized,
                        extractor_used: extractor.name(),
                        warnings,
                    });
                }
                warnings.push(format!(
                    "{}: extracted {} chars, below minimum {}",
                    extractor.name(),
                    sanitized.len(),
                    min_length
                ));
            }
            None => {
                warnings.push(format!("{}: extraction failed", extractor.name()));
            }
        }
    }

    let reason = detect_failure_reason(html, 0);
    Err(ExtractionError { reason, warnings })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct AlwaysFails;
    impl Extractor for AlwaysFails {
        fn name(&self) -> &'static str {
            "always_fails"
        }
        fn extract(&self, _html: &str) -> Option<String> {
            None
        }
    }

    struct AlwaysShort;
    impl Extractor for AlwaysShort {
        fn name(&self) -> &'static str {
            "always_short"
        }
        fn extract(&self, _html: &str) -> Option<String> {
            Some("too short".to_string())
        }
    }

    struct AlwaysSucceeds;
    impl Extractor for AlwaysSucceeds {
        fn name(&self) -> &'static str {
            "always_succeeds"
        }
        fn extract(&self, _html: &str) -> Option<String> {
            Some("x".repeat(500))
        }
    }

    #[test]
    fn falls_through_chain_to_first_success() {
        let extractors: Vec<Box<dyn Extractor>> =
            vec![Box::new(AlwaysFails), Box::new(AlwaysShort), Box::new(AlwaysSucceeds)];
        let result = extract_article_text(&extractors, "<html></html>", MIN_TEXT_LENGTH).unwrap();
        assert_eq!(result.extractor_used, "always_succeeds");
        assert_eq!(result.warnings.len(), 2);
    }

    #[test]
    fn all_extractors_failing_returns_error() {
        let extractors: Vec<Box<dyn Extractor>> = vec![Box::new(AlwaysFails), Box::new(AlwaysShort)];
        let err = extract_article_text(&extractors, "<html></html>", MIN_TEXT_LENGTH).unwrap_err();
        assert_eq!(err.warnings.len(), 2);
    }

    #[test]
    fn detects_paywall() {
        let html = "<p>Subscribe to continue reading this story.</p>";
        assert_eq!(detect_failure_reason(html, 10), FailureReason::Paywall);
    }

    #[test]
    fn detects_consent_wall() {
        let html = "<div>We use cookies to improve your experience.</div>";
        assert_eq!(detect_failure_reason(html, 10), FailureReason::ConsentWall);
    }

    #[test]
    fn detects_js_required_when_body_short() {
        let html = "<noscript>Please enable JavaScript to view this page.</noscript>";
        assert_eq!(detect_failure_reason(html, 10), FailureReason::JsRequired);
    }

    #[test]
    fn js_indicator_ignored_when_body_long_enough() {
        let html = format!(
            "<noscript>Please enable JavaScript.</noscript>{}",
            "word ".repeat(100)
        );
        assert_eq!(
            detect_failure_reason(&html, MIN_TEXT_LENGTH + 1),
            FailureReason::NoText
        );
    }

    #[test]
    fn falls_back_to_no_text() {
        let html = "<html><body></body></html>";
        assert_eq!(detect_failure_reason(html, 0), FailureReason::NoText);
    }

    #[test]
    fn js_required_needs_browser_but_paywall_does_not() {
        assert!(needs_browser_rendering(FailureReason::JsRequired));
        assert!(!needs_browser_rendering(FailureReason::Paywall));
        assert!(!needs_browser_rendering(FailureReason::ConsentWall));
    }
}
