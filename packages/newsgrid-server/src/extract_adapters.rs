//! Concrete [`Extractor`] implementations backing the extraction ensemble.
//!
//! Each adapter wraps a distinct HTML-to-text strategy over `scraper`'s DOM,
//! ordered from most to least semantically aware, mirroring the
//! tag-aware-first, brute-force-last ordering of the ensemble this is
//! grounded on.

use newsgrid_core::extraction::Extractor;
use scraper::{Html, Selector};

/// Extracts text from `<article>`, `<main>`, or a conventional
/// `[role=main]`/`.article-body` container -- the semantically explicit
/// case.
pub struct SemanticTagExtractor;

impl Extractor for SemanticTagExtractor {
    fn name(&self) -> &'static str {
        "semantic_tag"
    }

    fn extract(&self, html: &str) -> Option<String> {
        let doc = Html::parse_document(html);
        for selector_str in ["article", "main", "[role=main]", ".article-body", "#article-body"] {
            let Ok(selector) = Selector::parse(selector_str) else { continue };
            if let Some(el) = doc.select(&selector).next() {
                let text = collect_paragraph_text(&el.text().collect::<Vec<_>>().join(" "));
                if !text.is_empty() {
                    return Some(text);
                }
            }
        }
        None
    }
}

/// Extracts the longest contiguous run of `<p>` elements sharing a parent --
/// a decent proxy for the article body on pages without semantic markup.
pub struct LargestParagraphClusterExtractor;

impl Extractor for LargestParagraphClusterExtractor {
    fn name(&self) -> &'static str {
        "largest_paragraph_cluster"
    }

    fn extract(&self, html: &str) -> Option<String> {
        let doc = Html::parse_document(html);
        let Ok(selector) = Selector::parse("p") else { return None };

        let paragraphs: Vec<String> = doc
            .select(&selector)
            .map(|el| el.text().collect::<Vec<_>>().join(" ").trim().to_string())
            .filter(|t| t.len() > 40)
            .collect();

        if paragraphs.is_empty() {
            None
        } else {
            Some(paragraphs.join("\n\n"))
        }
    }
}

/// Last-resort fallback: all visible text in `<body>`.
pub struct WholeBodyExtractor;

impl Extractor for WholeBodyExtractor {
    fn name(&self) -> &'static str {
        "whole_body"
    }

    fn extract(&self, html: &str) -> Option<String> {
        let doc = Html::parse_document(html);
        let selector = Selector::parse("body").ok()?;
        let body = doc.select(&selector).next()?;
        let text = collect_paragraph_text(&body.text().collect::<Vec<_>>().join(" "));
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

fn collect_paragraph_text(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// The default extraction chain, in fallback order.
#[must_use]
pub fn default_extractor_chain() -> Vec<Box<dyn Extractor>> {
    vec![
        Box::new(SemanticTagExtractor),
        Box::new(LargestParagraphClusterExtractor),
        Box::new(WholeBodyExtractor),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn semantic_tag_extractor_finds_article() {
        let html = "<html><body><article>Hello world, this is the body of the article with enough length to pass sanitization checks easily here.</article></body></html>";
        let text = SemanticTagExtractor.extract(html).unwrap();
        assert!(text.contains("Hello world"));
    }

    #[test]
    fn largest_paragraph_cluster_joins_paragraphs() {
        let html = "<html><body><p>This is a reasonably long first paragraph of article content that exceeds forty characters.</p><p>This is a second reasonably long paragraph of article content that also exceeds forty characters.</p></body></html>";
        let text = LargestParagraphClusterExtractor.extract(html).unwrap();
        assert!(text.contains("first paragraph"));
        assert!(text.contains("second"));
    }

    #[test]
    fn whole_body_extractor_falls_back_to_body_text() {
        let html = "<html><body><div>just some div text with no paragraph tags at all in this document</div></body></html>";
        let text = WholeBodyExtractor.extract(html).unwrap();
        assert!(text.contains("just some div text"));
    }

    #[test]
    fn default_chain_has_three_extractors_in_order() {
        let chain = default_extractor_chain();
        assert_eq!(chain.len(), 3);
        assert_eq!(chain[0].name(), "semantic_tag");
        assert_eq!(chain[2].name(), "whole_body");
    }
}
