//! Article detection.
//!
//! Every candidate block is scored over a fixed set of named signals
//! ([`ArticleSignals`]), each normalized to `[0, 1]`, combined with the
//! weights in [`ArticleScoring`]. The best candidate becomes the article only
//! when its confidence reaches [`ArticleScoring::threshold`]; below that no
//! article is emitted at all.

use dom_query::{Document, Selection};

use crate::dom;
use crate::patterns::{
    ARTICLE_CANDIDATE_SELECTOR, ARTICLE_CLASS, AUTHOR_SELECTOR, BYLINE_CLASS, BYLINE_TEXT,
    DATE_CLASS, DATE_SELECTOR, DATE_TEXT, NAVIGATION_CLASS,
};
use crate::result::Article;

/// Reading speed used for the reading-time estimate.
pub const WORDS_PER_MINUTE: usize = 200;

/// Default confidence needed to emit an article.
pub const ARTICLE_THRESHOLD: f64 = 0.5;

/// Ancestors that disqualify a candidate.
const CHROME_TAGS: &[&str] = &["nav", "footer", "aside", "header", "form"];

/// Paragraphs shorter than this (in characters) do not count as prose.
const MIN_PARAGRAPH_CHARS: usize = 40;

/// Candidates with fewer words are not scored.
const MIN_CANDIDATE_WORDS: usize = 30;

/// Tunable weights and saturation points of the article score.
#[derive(Debug, Clone, PartialEq)]
pub struct ArticleScoring {
    /// Words at which the length signal saturates.
    pub target_words: usize,
    /// Prose paragraphs at which the paragraph signal saturates.
    pub target_paragraphs: usize,
    /// Text-to-markup ratio at which the density signal saturates.
    pub target_density: f64,

    pub length_weight: f64,
    pub paragraph_weight: f64,
    pub density_weight: f64,
    pub byline_weight: f64,
    pub date_weight: f64,
    pub container_weight: f64,

    /// Minimum confidence for an article to be emitted.
    pub threshold: f64,
}

impl Default for ArticleScoring {
    fn default() -> Self {
        Self {
            target_words: 300,
            target_paragraphs: 5,
            target_density: 0.5,
            length_weight: 0.25,
            paragraph_weight: 0.25,
            density_weight: 0.15,
            byline_weight: 0.10,
            date_weight: 0.10,
            container_weight: 0.15,
            threshold: ARTICLE_THRESHOLD,
        }
    }
}

/// Normalized signals of one candidate block.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ArticleSignals {
    pub length: f64,
    pub paragraphs: f64,
    pub text_density: f64,
    pub link_density: f64,
    pub byline: f64,
    pub date: f64,
    /// 1 for `<article>`/`role=article|main`, 0.5 for article-like class names.
    pub container: f64,
}

impl ArticleScoring {
    /// Weighted signal sum, scaled down by link density. Always in `[0, 1]`.
    #[must_use]
    pub fn confidence(&self, signals: &ArticleSignals) -> f64 {
        let weighted = self.length_weight * signals.length
            + self.paragraph_weight * signals.paragraphs
            + self.density_weight * signals.text_density
            + self.byline_weight * signals.byline
            + self.date_weight * signals.date
            + self.container_weight * signals.container;

        (weighted * (1.0 - signals.link_density)).clamp(0.0, 1.0)
    }
}

struct Candidate<'a> {
    sel: Selection<'a>,
    confidence: f64,
    words: usize,
}

/// Detect the single most article-like block, if any is confident enough.
#[must_use]
pub fn detect_article(doc: &Document, scoring: &ArticleScoring) -> Option<Article> {
    let mut best: Option<Candidate> = None;

    for node in doc.select(ARTICLE_CANDIDATE_SELECTOR).nodes() {
        if dom::has_ancestor_tag(node, CHROME_TAGS) {
            continue;
        }
        let sel = Selection::from(*node);
        if NAVIGATION_CLASS.is_match(&dom::class_and_id(&sel)) {
            continue;
        }

        let text = dom::normalized_text(&sel);
        let words = count_words(&text);
        if words < MIN_CANDIDATE_WORDS {
            continue;
        }

        let confidence = scoring.confidence(&signals(&sel, &text, words, scoring));

        // Ties go to the later node: descendants follow their ancestors,
        // so the tighter container wins.
        if best.as_ref().is_none_or(|b| confidence >= b.confidence) {
            best = Some(Candidate { sel, confidence, words });
        }
    }

    let best = best?;
    if best.confidence < scoring.threshold {
        return None;
    }

    let body = article_body(&best.sel);
    let word_count = if body.is_empty() { best.words } else { count_words(&body) };
    let reading_time_minutes = (word_count / WORDS_PER_MINUTE).max(1);

    Some(Article {
        title: article_title(doc, &best.sel),
        body,
        author: find_author(doc, &best.sel),
        date: find_date(doc, &best.sel),
        word_count,
        reading_time_minutes,
        estimated_read_time: format!("{reading_time_minutes} min read"),
        confidence: (best.confidence * 100.0).round() / 100.0,
    })
}

/// Measure the signals of one candidate.
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn signals(sel: &Selection, text: &str, words: usize, scoring: &ArticleScoring) -> ArticleSignals {
    let text_len = text.len();
    let markup_len = sel.html().len().max(1);

    let prose_paragraphs = sel
        .select("p")
        .nodes()
        .iter()
        .filter(|p| dom::normalized_text(&Selection::from(**p)).len() >= MIN_PARAGRAPH_CHARS)
        .count();

    let link_text_len: usize = sel
        .select("a")
        .nodes()
        .iter()
        .map(|a| dom::normalized_text(&Selection::from(*a)).len())
        .sum();
    let link_density = if text_len > 0 {
        (link_text_len as f64 / text_len as f64).min(1.0)
    } else {
        1.0
    };

    let tag = dom::tag_name(sel).unwrap_or_default();
    let role = sel.attr("role").map(|r| r.to_ascii_lowercase()).unwrap_or_default();
    let container = if tag == "article" || tag == "main" || role == "article" || role == "main" {
        1.0
    } else if ARTICLE_CLASS.is_match(&dom::class_and_id(sel)) {
        0.5
    } else {
        0.0
    };

    ArticleSignals {
        length: ratio(words as f64, scoring.target_words as f64),
        paragraphs: ratio(prose_paragraphs as f64, scoring.target_paragraphs as f64),
        text_density: ratio(text_len as f64 / markup_len as f64, scoring.target_density),
        link_density,
        byline: if has_byline(sel) { 1.0 } else { 0.0 },
        date: if has_date(sel) { 1.0 } else { 0.0 },
        container,
    }
}

fn ratio(value: f64, target: f64) -> f64 {
    if target <= 0.0 {
        return 1.0;
    }
    (value / target).clamp(0.0, 1.0)
}

fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

fn has_byline(sel: &Selection) -> bool {
    sel.select(AUTHOR_SELECTOR).length() > 0
        || sel
            .select("[class], [id]")
            .nodes()
            .iter()
            .any(|n| BYLINE_CLASS.is_match(&dom::class_and_id(&Selection::from(*n))))
        || short_blocks(sel).any(|t| BYLINE_TEXT.is_match(&t))
}

fn has_date(sel: &Selection) -> bool {
    sel.select(DATE_SELECTOR).length() > 0
        || sel
            .select("[class], [id]")
            .nodes()
            .iter()
            .any(|n| DATE_CLASS.is_match(&dom::class_and_id(&Selection::from(*n))))
        || short_blocks(sel).any(|t| DATE_TEXT.is_match(&t))
}

/// Texts of short blocks (bylines, datelines) inside a candidate.
fn short_blocks<'a>(sel: &Selection<'a>) -> impl Iterator<Item = String> + 'a {
    sel.select("p, span, div, small, address")
        .nodes()
        .to_vec()
        .into_iter()
        .map(|n| dom::normalized_text(&Selection::from(n)))
        .filter(|t| !t.is_empty() && t.len() <= 100)
}

fn article_title(doc: &Document, sel: &Selection) -> String {
    [sel.select("h1"), doc.select("h1"), doc.select("title")]
        .iter()
        .find_map(|candidates| {
            candidates
                .nodes()
                .first()
                .map(|n| dom::normalized_text(&Selection::from(*n)))
                .filter(|t| !t.is_empty())
        })
        .unwrap_or_default()
}

fn article_body(sel: &Selection) -> String {
    let paragraphs: Vec<String> = sel
        .select("p, h2, h3, h4, blockquote, pre, li")
        .nodes()
        .iter()
        .filter(|n| !dom::has_ancestor_tag(n, CHROME_TAGS))
        .filter(|n| !dom::has_ancestor_tag(n, &["blockquote", "li"]))
        .map(|n| dom::normalized_text(&Selection::from(*n)))
        .filter(|t| !t.is_empty())
        .collect();

    if paragraphs.is_empty() {
        dom::normalized_text(sel)
    } else {
        paragraphs.join("\n\n")
    }
}

fn find_author(doc: &Document, sel: &Selection) -> Option<String> {
    let from_markup = sel.select(AUTHOR_SELECTOR).nodes().iter().find_map(|n| {
        let text = dom::normalized_text(&Selection::from(*n));
        let name = BYLINE_TEXT
            .captures(&text)
            .and_then(|c| c.get(1))
            .map_or(text.as_str(), |m| m.as_str())
            .trim()
            .to_string();
        (!name.is_empty() && name.len() <= 100).then_some(name)
    });

    from_markup
        .or_else(|| {
            short_blocks(sel).find_map(|t| {
                BYLINE_TEXT
                    .captures(&t)
                    .and_then(|c| c.get(1))
                    .map(|m| m.as_str().trim().to_string())
            })
        })
        .or_else(|| {
            doc.select(r#"meta[name="author"]"#)
                .nodes()
                .first()
                .and_then(|n| dom::non_empty_attribute(&Selection::from(*n), "content"))
        })
}

fn find_date(doc: &Document, sel: &Selection) -> Option<String> {
    let from_markup = sel.select(DATE_SELECTOR).nodes().iter().find_map(|n| {
        let node = Selection::from(*n);
        dom::non_empty_attribute(&node, "datetime")
            .or_else(|| dom::non_empty_attribute(&node, "content"))
            .or_else(|| Some(dom::normalized_text(&node)).filter(|t| DATE_TEXT.is_match(t)))
    });

    from_markup.or_else(|| {
        doc.select(r#"meta[property="article:published_time"]"#)
            .nodes()
            .first()
            .and_then(|n| dom::non_empty_attribute(&Selection::from(*n), "content"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prose(n: usize) -> String {
        (0..n)
            .map(|i| format!("<p>Paragraph {i} explains the findings of the study in plain words for every reader here.</p>"))
            .collect()
    }

    #[test]
    fn test_article_page_is_detected() {
        let html = format!(
            r#"<html><head><title>Site | Study</title></head><body>
                <nav><a href="/">Home</a><a href="/news">News</a></nav>
                <article>
                  <h1>The Study</h1>
                  <p class="byline">By Jane Doe</p>
                  <time datetime="2024-03-01">March 1, 2024</time>
                  {}
                </article>
                <footer>Copyright</footer>
            </body></html>"#,
            prose(12)
        );
        let article = detect_article(&Document::from(html.as_str()), &ArticleScoring::default()).expect("article detected");

        assert_eq!(article.title, "The Study");
        assert_eq!(article.author.as_deref(), Some("Jane Doe"));
        assert_eq!(article.date.as_deref(), Some("2024-03-01"));
        assert!(article.word_count > 150);
        assert_eq!(article.reading_time_minutes, (article.word_count / WORDS_PER_MINUTE).max(1));
        assert_eq!(article.estimated_read_time, format!("{} min read", article.reading_time_minutes));
        assert!(article.confidence >= ARTICLE_THRESHOLD);
        assert!(!article.body.contains("Copyright"));
    }

    #[test]
    fn test_link_list_is_not_an_article() {
        let links: String = (0..40)
            .map(|i| format!(r#"<div class="item"><a href="/p/{i}">Product number {i} in the catalogue</a></div>"#))
            .collect();
        let html = format!("<html><body><div class='grid'>{links}</div></body></html>");

        assert!(detect_article(&Document::from(html.as_str()), &ArticleScoring::default()).is_none());
    }

    #[test]
    fn test_short_page_is_not_an_article() {
        let html = "<html><body><div><p>Just a short note.</p></div></body></html>";
        assert!(detect_article(&Document::from(html), &ArticleScoring::default()).is_none());
    }

    #[test]
    fn test_threshold_is_tunable() {
        let html = format!("<html><body><article><h1>T</h1>{}</article></body></html>", prose(12));
        let strict = ArticleScoring { threshold: 1.01, ..ArticleScoring::default() };
        assert!(detect_article(&Document::from(html.as_str()), &strict).is_none());
        assert!(detect_article(&Document::from(html.as_str()), &ArticleScoring::default()).is_some());
    }

    #[test]
    fn test_confidence_is_bounded() {
        let scoring = ArticleScoring::default();
        let all = ArticleSignals {
            length: 1.0,
            paragraphs: 1.0,
            text_density: 1.0,
            link_density: 0.0,
            byline: 1.0,
            date: 1.0,
            container: 1.0,
        };
        assert!((scoring.confidence(&all) - 1.0).abs() < 1e-9);
        assert!(scoring.confidence(&ArticleSignals::default()).abs() < 1e-9);

        let linky = ArticleSignals { link_density: 1.0, ..all };
        assert!(scoring.confidence(&linky).abs() < 1e-9);
    }
}
