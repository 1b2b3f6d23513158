//! Text analysis helpers shared by the detectors.
//!
//! Everything here is a pure function over `&str`. Fenced code blocks are
//! masked before prose-level analysis so shell comments and code do not
//! count as headings or sentences.

use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

static MARKDOWN_HEADING: OnceLock<Regex> = OnceLock::new();
static HTML_HEADING: OnceLock<Regex> = OnceLock::new();
static HTML_TAG: OnceLock<Regex> = OnceLock::new();
static BLANK_LINE: OnceLock<Regex> = OnceLock::new();
static SENTENCE_END: OnceLock<Regex> = OnceLock::new();

fn markdown_heading() -> &'static Regex {
    MARKDOWN_HEADING.get_or_init(|| {
        Regex::new(r"(?m)^ {0,3}(#{1,6})[ \t]+(.+?)[ \t#]*$").expect("valid heading pattern")
    })
}

fn html_heading() -> &'static Regex {
    HTML_HEADING.get_or_init(|| {
        Regex::new(r"(?is)<h([1-6])[^>]*>(.*?)</h[1-6]\s*>").expect("valid html heading pattern")
    })
}

fn html_tag() -> &'static Regex {
    HTML_TAG.get_or_init(|| Regex::new(r"(?s)<[^>]+>").expect("valid tag pattern"))
}

fn blank_line() -> &'static Regex {
    BLANK_LINE.get_or_init(|| Regex::new(r"\n[ \t]*\n").expect("valid blank line pattern"))
}

fn sentence_end() -> &'static Regex {
    SENTENCE_END.get_or_init(|| Regex::new(r"[.!?]+(?:\s+|$)").expect("valid sentence pattern"))
}

/// A heading found in markdown (`## Title`) or HTML (`<h2>Title</h2>`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heading {
    pub level: u8,
    pub text: String,
}

/// Whitespace-separated words
pub fn words(text: &str) -> Vec<&str> {
    text.split_whitespace().collect()
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Lowercase a word and drop everything but letters and digits
pub fn normalize_word(word: &str) -> String {
    word.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Normalized, non-empty words in order
pub fn normalized_words(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(normalize_word)
        .filter(|w| !w.is_empty())
        .collect()
}

/// Replace the body of fenced code blocks (and the fences) with empty lines
pub fn mask_code_blocks(text: &str) -> String {
    let mut in_fence = false;
    let mut out = Vec::new();
    for line in text.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            in_fence = !in_fence;
            out.push("");
        } else if in_fence {
            out.push("");
        } else {
            out.push(line);
        }
    }
    out.join("\n")
}

/// Text with code blocks masked and heading lines removed
pub fn prose(text: &str) -> String {
    mask_code_blocks(text)
        .lines()
        .map(|line| if markdown_heading().is_match(line) { "" } else { line })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Blank-line-separated blocks, trimmed, empty blocks dropped
pub fn paragraphs(text: &str) -> Vec<&str> {
    blank_line()
        .split(text)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect()
}

/// Prose sentences with internal whitespace collapsed.
///
/// Paragraph breaks always end a sentence; inside a paragraph a run of
/// `.`, `!` or `?` followed by whitespace or end of text does.
pub fn sentences(text: &str) -> Vec<String> {
    let prose = prose(text);
    let mut out = Vec::new();
    for block in paragraphs(&prose) {
        for raw in sentence_end().split(block) {
            let sentence = raw.split_whitespace().collect::<Vec<_>>().join(" ");
            if !sentence.is_empty() {
                out.push(sentence);
            }
        }
    }
    out
}

/// Approximate syllables as runs of vowels, minus one for a trailing
/// silent "e", never fewer than one.
pub fn count_syllables(word: &str) -> usize {
    let letters: Vec<char> = word
        .chars()
        .filter(|c| c.is_ascii_alphabetic())
        .map(|c| c.to_ascii_lowercase())
        .collect();

    let mut count = 0usize;
    let mut previous_vowel = false;
    for c in &letters {
        let vowel = matches!(c, 'a' | 'e' | 'i' | 'o' | 'u' | 'y');
        if vowel && !previous_vowel {
            count += 1;
        }
        previous_vowel = vowel;
    }

    if letters.last() == Some(&'e') {
        count = count.saturating_sub(1);
    }
    count.max(1)
}

/// Simplified Flesch Reading Ease over the prose of `text`.
///
/// `206.835 - 1.015 * (words / sentences) - 84.6 * (syllables / words)`.
/// Tokens without letters or digits (list markers, table pipes) are not words.
/// Returns `None` when there are no words.
pub fn flesch_reading_ease(text: &str) -> Option<f64> {
    let prose = prose(text);
    let words: Vec<&str> = words(&prose)
        .into_iter()
        .filter(|w| w.chars().any(char::is_alphanumeric))
        .collect();
    if words.is_empty() {
        return None;
    }
    let sentence_count = sentences(text).len().max(1) as f64;
    let word_count = words.len() as f64;
    let syllables: usize = words.iter().map(|w| count_syllables(w)).sum();

    Some(206.835 - 1.015 * (word_count / sentence_count) - 84.6 * (syllables as f64 / word_count))
}

/// Markdown and HTML headings in document order, ignoring code blocks
pub fn headings(text: &str) -> Vec<Heading> {
    let masked = mask_code_blocks(text);
    let mut found: Vec<(usize, Heading)> = Vec::new();

    for caps in markdown_heading().captures_iter(&masked) {
        let start = caps.get(0).map_or(0, |m| m.start());
        found.push((
            start,
            Heading {
                level: caps[1].len() as u8,
                text: caps[2].trim().to_string(),
            },
        ));
    }

    for caps in html_heading().captures_iter(&masked) {
        let start = caps.get(0).map_or(0, |m| m.start());
        let level = caps[1].parse::<u8>().unwrap_or(1);
        found.push((
            start,
            Heading {
                level,
                text: strip_tags(&caps[2]).trim().to_string(),
            },
        ));
    }

    found.sort_by_key(|(start, _)| *start);
    found.into_iter().map(|(_, h)| h).collect()
}

/// Remove HTML tags, keeping inner text
pub fn strip_tags(html: &str) -> String {
    html_tag().replace_all(html, "").into_owned()
}

/// Jaccard similarity of the unique normalized words of two texts.
///
/// Symmetric; `0.0` when both texts are empty.
pub fn jaccard_similarity(a: &str, b: &str) -> f64 {
    let set_a: HashSet<String> = normalized_words(a).into_iter().collect();
    let set_b: HashSet<String> = normalized_words(b).into_iter().collect();

    let union = set_a.union(&set_b).count();
    if union == 0 {
        return 0.0;
    }
    let intersection = set_a.intersection(&set_b).count();
    intersection as f64 / union as f64
}

/// Truncate to at most `max` characters, appending `...` when shortened
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let kept: String = s.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", kept)
}
