use super::config::{RuleBase, RuleConfig, RuleDescriptor, RuleSettings};
use super::consolidate::{consolidate, Finding};
use super::text;
use super::{ExecutionContext, Rule};
use crate::report::{Issue, RuleCategory, RuleMetadata, Severity};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap, HashSet};

const MAX_SUGGESTIONS: usize = 6;
const MAX_PAIR_EXAMPLES: usize = 2;
const MIN_SENTENCE_CHARS: usize = 20;
const PHRASE_LEN: usize = 3;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct DuplicateContentSettings {
    /// Articles shorter than this many characters are skipped
    pub min_content_length: usize,
    /// Jaccard similarity at or above which two paragraphs count as duplicates
    pub min_similarity_threshold: f64,
    /// Paragraphs shorter than this many characters are not compared
    pub min_text_length: usize,
    pub min_phrase_occurrences: usize,
    pub check_headings: bool,
    pub check_paragraphs: bool,
    pub check_sentences: bool,
    pub check_phrases: bool,
    /// Phrases never reported as repetitive
    pub common_phrases: Vec<String>,
}

impl Default for DuplicateContentSettings {
    fn default() -> Self {
        Self {
            min_content_length: 100,
            min_similarity_threshold: 0.8,
            min_text_length: 50,
            min_phrase_occurrences: 3,
            check_headings: true,
            check_paragraphs: true,
            check_sentences: true,
            check_phrases: true,
            common_phrases: [
                "in order to",
                "one of the",
                "as well as",
                "you can use",
                "make sure you",
                "click on the",
                "at the top",
                "on the left",
                "on the right",
                "at the bottom",
                "if you want",
                "you need to",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

impl RuleSettings for DuplicateContentSettings {
    fn validate(&self) -> Result<(), String> {
        if !(self.min_similarity_threshold > 0.0 && self.min_similarity_threshold <= 1.0) {
            return Err("min_similarity_threshold must be in (0, 1]".to_string());
        }
        if self.min_phrase_occurrences < 2 {
            return Err("min_phrase_occurrences must be at least 2".to_string());
        }
        Ok(())
    }
}

/// Finds repeated headings, near-identical paragraphs, repeated sentences
/// and overused phrases
pub struct DuplicateContentRule {
    base: RuleBase<DuplicateContentSettings>,
}

impl Default for DuplicateContentRule {
    fn default() -> Self {
        Self::new(DuplicateContentSettings::default())
    }
}

impl DuplicateContentRule {
    pub fn new(settings: DuplicateContentSettings) -> Self {
        Self {
            base: RuleBase::new(
                RuleDescriptor {
                    id: "duplicate-content",
                    name: "Duplicate Content",
                    description: "Detects repeated headings, paragraphs, sentences and phrases",
                    category: RuleCategory::ContentQuality,
                    severity: Severity::Medium,
                    configurable: true,
                    version: "1.0.0",
                    tags: &["duplication", "repetition"],
                },
                settings,
            ),
        }
    }

    fn check_headings(&self, content: &str) -> Option<Finding> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut repeated: Vec<String> = Vec::new();
        for heading in text::headings(content) {
            let normalized = heading.text.trim().to_lowercase();
            if normalized.is_empty() {
                continue;
            }
            if !seen.insert(normalized.clone()) && !repeated.contains(&normalized) {
                repeated.push(normalized);
            }
        }
        if repeated.is_empty() {
            return None;
        }

        Some(
            Finding::new(
                Severity::Medium,
                "Duplicate headings",
                format!("{} heading(s) appear more than once", repeated.len()),
            )
            .with_suggestions(["Give each section a distinct heading"])
            .with_detail("duplicate_headings", repeated),
        )
    }

    /// Paragraph pairs at or above the similarity threshold, as
    /// `(index_a, index_b, similarity)` with 1-based indices
    fn similar_paragraphs(
        &self,
        content: &str,
        settings: &DuplicateContentSettings,
    ) -> Vec<(usize, usize, f64)> {
        let prose = text::prose(content);
        let blocks: Vec<(usize, &str)> = text::paragraphs(&prose)
            .into_iter()
            .enumerate()
            .filter(|(_, p)| p.chars().count() >= settings.min_text_length)
            .collect();

        let mut pairs = Vec::new();
        for (i, (index_a, a)) in blocks.iter().enumerate() {
            for (index_b, b) in blocks.iter().skip(i + 1) {
                let similarity = text::jaccard_similarity(a, b);
                if similarity >= settings.min_similarity_threshold {
                    pairs.push((index_a + 1, index_b + 1, similarity));
                }
            }
        }
        pairs
    }

    fn check_paragraphs(&self, pairs: &[(usize, usize, f64)]) -> Option<Finding> {
        if pairs.is_empty() {
            return None;
        }
        Some(
            Finding::new(
                Severity::Medium,
                "Similar paragraphs",
                format!("{} pair(s) of paragraphs are nearly identical", pairs.len()),
            )
            .with_suggestions([
                "Remove or merge paragraphs that repeat the same information",
                "Link to a single canonical explanation instead of repeating it",
            ])
            .with_detail("similar_paragraphs", pair_examples(pairs)),
        )
    }

    fn check_sentences(&self, content: &str) -> Option<Finding> {
        let mut counts: HashMap<String, usize> = HashMap::new();
        let mut order: Vec<String> = Vec::new();
        for sentence in text::sentences(content) {
            let normalized = text::normalized_words(&sentence).join(" ");
            if normalized.chars().count() <= MIN_SENTENCE_CHARS {
                continue;
            }
            let count = counts.entry(normalized.clone()).or_insert(0);
            *count += 1;
            if *count == 2 {
                order.push(normalized);
            }
        }
        if order.is_empty() {
            return None;
        }

        let examples: Vec<String> = order.iter().take(3).map(|s| text::truncate(s, 80)).collect();
        Some(
            Finding::new(
                Severity::Medium,
                "Repeated sentences",
                format!("{} sentence(s) appear more than once", order.len()),
            )
            .with_suggestions(["Remove repeated sentences"])
            .with_detail("repeated_sentences", order.len())
            .with_detail("examples", examples),
        )
    }

    fn check_phrases(&self, content: &str, settings: &DuplicateContentSettings) -> Option<Finding> {
        let words = text::normalized_words(&text::prose(content));
        let ignored: HashSet<String> = settings
            .common_phrases
            .iter()
            .map(|p| text::normalized_words(p).join(" "))
            .collect();

        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for window in words.windows(PHRASE_LEN) {
            *counts.entry(window.join(" ")).or_insert(0) += 1;
        }

        let mut repetitive: Vec<(String, usize)> = counts
            .into_iter()
            .filter(|(phrase, count)| {
                *count >= settings.min_phrase_occurrences && !ignored.contains(phrase)
            })
            .collect();
        if repetitive.is_empty() {
            return None;
        }
        // BTreeMap order breaks count ties alphabetically
        repetitive.sort_by(|a, b| b.1.cmp(&a.1));

        let top: Vec<Value> = repetitive
            .iter()
            .take(5)
            .map(|(phrase, count)| json!({ "phrase": phrase, "count": count }))
            .collect();
        Some(
            Finding::new(
                Severity::Low,
                "Repetitive phrases",
                format!(
                    "{} phrase(s) repeated {} or more times",
                    repetitive.len(),
                    settings.min_phrase_occurrences
                ),
            )
            .with_suggestions(["Vary the wording of frequently repeated phrases"])
            .with_detail("repetitive_phrases", top),
        )
    }
}

fn pair_examples(pairs: &[(usize, usize, f64)]) -> Vec<Value> {
    pairs
        .iter()
        .take(MAX_PAIR_EXAMPLES)
        .map(|(a, b, similarity)| {
            json!({
                "paragraph_a": a,
                "paragraph_b": b,
                "similarity": (similarity * 100.0).round() as u32,
            })
        })
        .collect()
}

impl Rule for DuplicateContentRule {
    fn id(&self) -> &'static str {
        self.base.id()
    }

    fn metadata(&self) -> RuleMetadata {
        self.base.metadata()
    }

    fn execute(&self, ctx: &ExecutionContext<'_>) -> anyhow::Result<Option<Issue>> {
        let settings = self.base.settings();
        if ctx.metadata.content_length < settings.min_content_length {
            return Ok(None);
        }
        let content = ctx.content();

        let pairs = if settings.check_paragraphs {
            self.similar_paragraphs(content, &settings)
        } else {
            Vec::new()
        };

        let mut findings = Vec::new();
        if settings.check_headings {
            findings.extend(self.check_headings(content));
        }
        findings.extend(self.check_paragraphs(&pairs));
        if settings.check_sentences {
            findings.extend(self.check_sentences(content));
        }
        if settings.check_phrases {
            findings.extend(self.check_phrases(content, &settings));
        }

        let d = self.base.descriptor();
        let mut issue = consolidate(d.id, d.category, findings, MAX_SUGGESTIONS);
        // paragraph pairs are reported even when another finding ranks first
        if let Some(issue) = issue.as_mut() {
            if !pairs.is_empty() {
                issue
                    .metadata
                    .insert("similar_paragraphs".to_string(), Value::Array(pair_examples(&pairs)));
            }
        }
        Ok(issue)
    }

    fn check_config(&self, partial: &RuleConfig) -> Result<(), String> {
        self.base.check_config(partial)
    }

    fn update_config(&self, partial: &RuleConfig) -> bool {
        self.base.update_config(partial)
    }

    fn config(&self) -> RuleConfig {
        self.base.config()
    }

    fn set_enabled(&self, enabled: bool) {
        self.base.set_enabled(enabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Article;
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    const PARAGRAPH: &str = "Password resets are handled from the account security page, \
        where every member of the workspace can request a fresh link by email. \
        The link expires after thirty minutes, so anyone who waits too long must \
        start again from the same page and confirm the request with a code sent \
        to a trusted phone number before choosing a new password for the account.";

    fn run(rule: &DuplicateContentRule, content: &str) -> Option<Issue> {
        let article = Article {
            id: "kb-7".to_string(),
            title: "Resetting a password".to_string(),
            content: content.to_string(),
            tags: vec![],
            category: "account".to_string(),
            last_modified: Utc::now(),
            description: None,
        };
        let ctx = ExecutionContext::build(&article, Utc::now());
        rule.execute(&ctx).unwrap()
    }

    #[test]
    fn test_short_content_skipped() {
        let rule = DuplicateContentRule::default();
        assert_eq!(run(&rule, "# Same\n\n# Same\n\nToo short."), None);
    }

    #[test]
    fn test_unique_content_passes() {
        let rule = DuplicateContentRule::default();
        let content = format!("# Resetting\n\n{}\n\nContact support if the email never arrives.", PARAGRAPH);
        assert_eq!(run(&rule, &content), None);
    }

    #[test]
    fn test_identical_paragraphs() {
        let rule = DuplicateContentRule::default();
        assert!(text::word_count(PARAGRAPH) >= 60);
        let content = format!("{}\n\n{}", PARAGRAPH, PARAGRAPH);
        let issue = run(&rule, &content).unwrap();

        assert_eq!(issue.title, "Similar paragraphs");
        assert_eq!(issue.severity, Severity::Medium);
        assert_eq!(
            issue.metadata["similar_paragraphs"],
            json!([{ "paragraph_a": 1, "paragraph_b": 2, "similarity": 100 }])
        );
    }

    #[test]
    fn test_pairs_kept_when_heading_ranks_first() {
        let rule = DuplicateContentRule::default();
        let content = format!("## Steps\n\n{}\n\n## Steps\n\n{}", PARAGRAPH, PARAGRAPH);
        let issue = run(&rule, &content).unwrap();

        assert_eq!(issue.title, "Duplicate headings");
        assert_eq!(issue.metadata["duplicate_headings"], json!(["steps"]));
        assert_eq!(issue.metadata["similar_paragraphs"][0]["similarity"], json!(100));
    }

    #[test]
    fn test_repeated_sentences() {
        let rule = DuplicateContentRule::default();
        let content = format!(
            "{}\n\nRemember to sign out of shared computers. Short one. \
             Remember to sign out of shared computers!",
            PARAGRAPH
        );
        let issue = run(&rule, &content).unwrap();

        assert_eq!(issue.title, "Repeated sentences");
        assert_eq!(issue.metadata["repeated_sentences"], json!(1));
        assert_eq!(
            issue.metadata["examples"],
            json!(["remember to sign out of shared computers"])
        );
    }

    #[test]
    fn test_repetitive_phrases_respect_ignore_list() {
        let rule = DuplicateContentRule::default();
        let content = "Open the admin console. Then open the admin console again. \
            Finally open the admin console once more. You need to wait. \
            You need to retry. You need to confirm the change before leaving.";
        let issue = run(&rule, content).unwrap();

        assert_eq!(issue.title, "Repetitive phrases");
        assert_eq!(issue.severity, Severity::Low);
        let phrases = issue.metadata["repetitive_phrases"].as_array().unwrap();
        let names: Vec<&str> = phrases.iter().map(|p| p["phrase"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["open the admin", "the admin console"]);
        assert_eq!(phrases[0]["count"], json!(3));
    }

    #[test]
    fn test_similarity_threshold_config() {
        let rule = DuplicateContentRule::default();
        assert!(!rule.validate_config(json!({"min_similarity_threshold": 1.5}).as_object().unwrap()));
        assert!(!rule.validate_config(json!({"min_phrase_occurrences": 1}).as_object().unwrap()));
        assert!(rule.update_config(json!({"check_paragraphs": false}).as_object().unwrap()));

        let content = format!("{}\n\n{}", PARAGRAPH, PARAGRAPH);
        let issue = run(&rule, &content).unwrap();
        assert_eq!(issue.title, "Repeated sentences");
        assert!(!issue.metadata.contains_key("similar_paragraphs"));
    }
}
