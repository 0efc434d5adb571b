//! Candidate image extraction from article HTML.
//!
//! Pulls `og:image`/`twitter:image` meta tags plus up to five `<img>` `src`
//! attributes from the body, skips known tracker-pixel patterns, and
//! resolves protocol-relative and relative URLs against the page's own URL.

use std::sync::LazyLock;

use regex::Regex;

const MAX_BODY_IMAGES: usize = 5;
const MAX_TOTAL_IMAGES: usize = 20;

static TRACKER_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [r"1x1\.", r"pixel\.", r"/track(ing)?[./]", r"spacer\.(gif|png)"]
        .iter()
        .map(|p| Regex::new(p).expect("static pattern is valid regex"))
        .collect()
});

fn is_tracker(url: &str) -> bool {
    let lower = url.to_lowercase();
    TRACKER_PATTERNS.iter().any(|re| re.is_match(&lower))
}

/// Resolves a possibly protocol-relative or relative image URL against the
/// page URL it was found on.
#[must_use]
pub fn resolve_image_url(candidate: &str, page_url: &str) -> Option<String> {
    if candidate.is_empty() {
        return None;
    }
    if let Ok(base) = url::Url::parse(page_url) {
        if let Ok(resolved) = base.join(candidate) {
            return Some(resolved.to_string());
        }
    }
    if candidate.starts_with("//") {
        return Some(format!("https:{candidate}"));
    }
    if candidate.starts_with("http://") || candidate.starts_with("https://") {
        return Some(candidate.to_string());
    }
    None
}

/// Extracts and resolves candidate images from raw HTML, meta tags first
/// (`og:image`, `twitter:image`), then up to [`MAX_BODY_IMAGES`] `<img>`
/// elements from the body, preserving first-appearance order and skipping
/// tracker-pixel-like URLs.
#[must_use]
pub fn extract_candidate_images(html: &str, page_url: &str) -> Vec<String> {
    let doc = scraper::Html::parse_document(html);
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();

    for selector_str in [
        r#"meta[property="og:image"]"#,
        r#"meta[name="twitter:image"]"#,
    ] {
        let Ok(selector) = scraper::Selector::parse(selector_str) else { continue };
        for el in doc.select(&selector) {
            if let Some(content) = el.value().attr("content") {
                if let Some(resolved) = resolve_image_url(content, page_url) {
                    if !is_tracker(&resolved) && seen.insert(resolved.clone()) {
                        out.push(resolved);
                    }
                }
            }
        }
    }

    let Ok(img_selector) = scraper::Selector::parse("body img") else { return out };
    let mut body_count = 0;
    for el in doc.select(&img_selector) {
        if body_count >= MAX_BODY_IMAGES || out.len() >= MAX_TOTAL_IMAGES {
            break;
        }
        if let Some(src) = el.value().attr("src") {
            if let Some(resolved) = resolve_image_url(src, page_url) {
                if !is_tracker(&resolved) && seen.insert(resolved.clone()) {
                    out.push(resolved);
                    body_count += 1;
                }
            }
        }
    }

    out.truncate(MAX_TOTAL_IMAGES);
    out
}

/// Derives the registrable hostname from a URL, lowercased, without a
/// leading `www.`.
#[must_use]
pub fn derive_hostname(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let host = parsed.host_str()?.to_lowercase();
    Some(host.strip_prefix("www.").unwrap_or(&host).to_string())
}
