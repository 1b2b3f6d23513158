use super::config::{RuleBase, RuleConfig, RuleDescriptor, RuleSettings};
use super::consolidate::{consolidate, Finding};
use super::links::{extract_links, LinkKind};
use super::text;
use super::{ExecutionContext, Rule};
use crate::report::{Issue, RuleCategory, RuleMetadata, Severity};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::OnceLock;

const MAX_SUGGESTIONS: usize = 8;

static DOUBLE_SPACE: OnceLock<Regex> = OnceLock::new();
static CODE_LINE: OnceLock<Regex> = OnceLock::new();
static LIST_MARKER: OnceLock<Regex> = OnceLock::new();
static BLOCK_START: OnceLock<Regex> = OnceLock::new();

fn double_space() -> &'static Regex {
    DOUBLE_SPACE.get_or_init(|| Regex::new(r"\S {2,}\S").expect("valid double space pattern"))
}

fn code_line() -> &'static Regex {
    CODE_LINE.get_or_init(|| {
        Regex::new(
            r"(?x)
            ^\s*(?:
                function\s+\w+\s*\(
              | def\s+\w+\s*\(
              | class\s+\w+\s*[:{(]
              | import\s+[\w{*]
              | from\s+[\w.]+\s+import\s
              | (?:const|let|var)\s+\w+\s*=
              | \#include\s*<
              | public\s+(?:static\s+)?\w+\s+\w+\s*\(
              | \$\s+\w+
              | sudo\s+\w+
              | npm\s+(?:install|run|i)\b
              | pip\s+install\b
              | (?i:select)\s+.+\s+(?i:from)\s
            )
            | [;{]\s*$",
        )
        .expect("valid code line pattern")
    })
}

fn list_marker() -> &'static Regex {
    LIST_MARKER.get_or_init(|| Regex::new(r"(?m)^\s*([-*+])\s+\S").expect("valid list pattern"))
}

/// Blocks that are not running prose: lists, tables, quotes, html, images
fn block_start() -> &'static Regex {
    BLOCK_START.get_or_init(|| {
        Regex::new(r"^(?:[-*+]\s|\d+[.)]\s|\||>|<|!\[)").expect("valid block start pattern")
    })
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct QualitySettings {
    pub min_word_count: usize,
    pub max_word_count: usize,
    pub min_readability_score: f64,
    pub max_readability_score: f64,
    /// Longest acceptable sentence, in words
    pub max_sentence_length: usize,
    pub require_headers: bool,
    pub min_header_count: usize,
    pub min_paragraph_count: usize,
    pub check_grammar: bool,
    pub check_formatting: bool,
}

impl Default for QualitySettings {
    fn default() -> Self {
        Self {
            min_word_count: 50,
            max_word_count: 5000,
            min_readability_score: 30.0,
            max_readability_score: 90.0,
            max_sentence_length: 25,
            require_headers: true,
            min_header_count: 1,
            min_paragraph_count: 2,
            check_grammar: true,
            check_formatting: true,
        }
    }
}

impl RuleSettings for QualitySettings {
    fn validate(&self) -> Result<(), String> {
        if self.min_word_count >= self.max_word_count {
            return Err("min_word_count must be less than max_word_count".to_string());
        }
        if !(self.min_readability_score < self.max_readability_score) {
            return Err("min_readability_score must be less than max_readability_score".to_string());
        }
        if self.max_sentence_length == 0 {
            return Err("max_sentence_length must be greater than 0".to_string());
        }
        Ok(())
    }
}

/// Checks length, readability, grammar, structure and formatting
pub struct QualityRule {
    base: RuleBase<QualitySettings>,
}

impl Default for QualityRule {
    fn default() -> Self {
        Self::new(QualitySettings::default())
    }
}

impl QualityRule {
    pub fn new(settings: QualitySettings) -> Self {
        Self {
            base: RuleBase::new(
                RuleDescriptor {
                    id: "quality",
                    name: "Content Quality",
                    description: "Checks length, readability, grammar, structure and formatting",
                    category: RuleCategory::ContentQuality,
                    severity: Severity::Medium,
                    configurable: true,
                    version: "1.0.0",
                    tags: &["readability", "structure", "style"],
                },
                settings,
            ),
        }
    }

    fn check_length(&self, word_count: usize, settings: &QualitySettings) -> Option<Finding> {
        if word_count < settings.min_word_count {
            Some(
                Finding::new(
                    Severity::Medium,
                    "Content is too short",
                    format!(
                        "Article has {} words, fewer than the minimum of {}",
                        word_count, settings.min_word_count
                    ),
                )
                .with_suggestions([
                    "Expand the article with context, steps and examples",
                    "Merge with a related article if there is little to add",
                ])
                .with_detail("word_count", word_count),
            )
        } else if word_count > settings.max_word_count {
            Some(
                Finding::new(
                    Severity::Low,
                    "Content is too long",
                    format!(
                        "Article has {} words, more than the maximum of {}",
                        word_count, settings.max_word_count
                    ),
                )
                .with_suggestions(["Split the article into focused sub-articles"])
                .with_detail("word_count", word_count),
            )
        } else {
            None
        }
    }

    fn check_readability(&self, content: &str, settings: &QualitySettings) -> Option<Finding> {
        let score = text::flesch_reading_ease(content)?;
        let rounded = (score * 10.0).round() / 10.0;

        if score < settings.min_readability_score {
            Some(
                Finding::new(
                    Severity::High,
                    "Poor readability",
                    format!(
                        "Reading ease score {} is below {}",
                        rounded, settings.min_readability_score
                    ),
                )
                .with_suggestions([
                    "Use shorter sentences and simpler words",
                    "Break dense paragraphs into steps or lists",
                ])
                .with_detail("readability_score", rounded),
            )
        } else if score > settings.max_readability_score {
            Some(
                Finding::new(
                    Severity::Low,
                    "Content may be too simple",
                    format!(
                        "Reading ease score {} is above {}",
                        rounded, settings.max_readability_score
                    ),
                )
                .with_suggestions(["Add detail and explanation for complex steps"])
                .with_detail("readability_score", rounded),
            )
        } else {
            None
        }
    }

    fn check_grammar(&self, content: &str) -> Option<Finding> {
        let masked = text::mask_code_blocks(content);
        let mut problems = Vec::new();

        let double_spaces: usize = masked
            .lines()
            .filter(|l| !is_indented(l))
            .map(|l| double_space().find_iter(l).count())
            .sum();
        if double_spaces > 0 {
            problems.push(format!("{} double space(s)", double_spaces));
        }

        let prose = text::prose(content);
        let unterminated = text::paragraphs(&prose)
            .into_iter()
            .filter(|p| !block_start().is_match(p) && !is_indented(p))
            .filter(|p| {
                !p.ends_with(['.', '!', '?', ':', ';', ')', '"', '\'', '`'])
            })
            .count();
        if unterminated > 0 {
            problems.push(format!("{} paragraph(s) missing terminal punctuation", unterminated));
        }

        let lowercase_headers: Vec<String> = text::headings(content)
            .into_iter()
            .filter(|h| h.text.chars().any(char::is_alphabetic) && !h.text.chars().any(char::is_uppercase))
            .map(|h| h.text)
            .collect();
        if !lowercase_headers.is_empty() {
            problems.push(format!("{} all-lowercase heading(s)", lowercase_headers.len()));
        }

        if problems.is_empty() {
            return None;
        }
        Some(
            Finding::new(
                Severity::Low,
                "Grammar and style issues",
                format!("Found {}", problems.join(", ")),
            )
            .with_suggestions([
                "Proofread for spacing and punctuation",
                "Capitalize headings consistently",
            ])
            .with_detail("grammar_problems", problems),
        )
    }

    fn check_sentence_length(&self, content: &str, settings: &QualitySettings) -> Option<Finding> {
        let long: Vec<String> = text::sentences(content)
            .into_iter()
            .filter(|s| text::word_count(s) > settings.max_sentence_length)
            .collect();
        if long.is_empty() {
            return None;
        }

        let examples: Vec<String> = long.iter().take(2).map(|s| text::truncate(s, 80)).collect();
        Some(
            Finding::new(
                Severity::Medium,
                "Sentences are too long",
                format!(
                    "{} sentence(s) exceed {} words",
                    long.len(),
                    settings.max_sentence_length
                ),
            )
            .with_suggestions([format!(
                "Split sentences longer than {} words",
                settings.max_sentence_length
            )])
            .with_detail("long_sentences", long.len())
            .with_detail("examples", examples),
        )
    }

    fn check_structure(&self, content: &str, settings: &QualitySettings) -> Option<Finding> {
        let heading_count = text::headings(content).len();
        let paragraph_count = text::paragraphs(&text::prose(content)).len();

        let mut problems = Vec::new();
        let mut suggestions = Vec::new();
        if settings.require_headers && heading_count < settings.min_header_count {
            problems.push(format!(
                "{} heading(s), at least {} required",
                heading_count, settings.min_header_count
            ));
            suggestions.push("Add headings to organize the article into sections");
        }
        if paragraph_count < settings.min_paragraph_count {
            problems.push(format!(
                "{} paragraph(s), at least {} expected",
                paragraph_count, settings.min_paragraph_count
            ));
            suggestions.push("Separate ideas into paragraphs with blank lines");
        }
        if problems.is_empty() {
            return None;
        }

        Some(
            Finding::new(
                Severity::High,
                "Content lacks structure",
                format!("Article structure is insufficient: {}", problems.join("; ")),
            )
            .with_suggestions(suggestions)
            .with_detail("heading_count", heading_count)
            .with_detail("paragraph_count", paragraph_count),
        )
    }

    fn check_formatting(&self, content: &str) -> Option<Finding> {
        let masked = text::mask_code_blocks(content);
        let mut problems = Vec::new();
        let mut suggestions = Vec::new();

        let code_lines = masked
            .lines()
            .filter(|l| !is_indented(l) && !l.contains('`'))
            .filter(|l| code_line().is_match(l))
            .count();
        if code_lines > 0 {
            problems.push(format!("{} line(s) of unformatted code", code_lines));
            suggestions.push("Wrap code and commands in fenced code blocks");
        }

        let raw_urls = extract_links(&masked)
            .into_iter()
            .filter(|l| l.kind == LinkKind::Raw)
            .count();
        if raw_urls > 0 {
            problems.push(format!("{} raw URL(s)", raw_urls));
            suggestions.push("Format URLs as descriptive links");
        }

        let markers: BTreeSet<String> = list_marker()
            .captures_iter(&masked)
            .map(|c| c[1].to_string())
            .collect();
        if markers.len() > 1 {
            problems.push(format!(
                "mixed list markers ({})",
                markers.into_iter().collect::<Vec<_>>().join(" ")
            ));
            suggestions.push("Use one list marker style throughout");
        }

        if problems.is_empty() {
            return None;
        }
        Some(
            Finding::new(
                Severity::Low,
                "Formatting issues",
                format!("Found {}", problems.join(", ")),
            )
            .with_suggestions(suggestions)
            .with_detail("formatting_problems", problems),
        )
    }
}

fn is_indented(line: &str) -> bool {
    line.starts_with("    ") || line.starts_with('\t')
}

impl Rule for QualityRule {
    fn id(&self) -> &'static str {
        self.base.id()
    }

    fn metadata(&self) -> RuleMetadata {
        self.base.metadata()
    }

    fn execute(&self, ctx: &ExecutionContext<'_>) -> anyhow::Result<Option<Issue>> {
        let settings = self.base.settings();
        let content = ctx.content();

        let mut findings = Vec::new();
        findings.extend(self.check_length(ctx.metadata.word_count, &settings));
        findings.extend(self.check_readability(content, &settings));
        if settings.check_grammar {
            findings.extend(self.check_grammar(content));
            findings.extend(self.check_sentence_length(content, &settings));
        }
        findings.extend(self.check_structure(content, &settings));
        if settings.check_formatting {
            findings.extend(self.check_formatting(content));
        }

        let d = self.base.descriptor();
        Ok(consolidate(d.id, d.category, findings, MAX_SUGGESTIONS))
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
    use serde_json::json;

    const GOOD: &str = "# Updating your payment method\n\n\
        Open the billing settings page to update your payment method. \
        Choose a new card and save the changes right there.\n\n\
        Your next invoice will use the new card automatically. \
        If a payment fails, we will send an email with steps to fix the problem. \
        You can also contact our support team from the help menu at any time.";

    const SHORT: &str = "Open the billing settings page to update your payment method. \
        Choose a new card and save the changes right there.";

    fn run(rule: &QualityRule, content: &str) -> Option<Issue> {
        let article = Article {
            id: "kb-1".to_string(),
            title: "Updating your payment method".to_string(),
            content: content.to_string(),
            tags: vec![],
            category: "billing".to_string(),
            last_modified: Utc::now(),
            description: None,
        };
        let ctx = ExecutionContext::build(&article, Utc::now());
        rule.execute(&ctx).unwrap()
    }

    fn sub_issue_titles(issue: &Issue) -> Vec<String> {
        issue.metadata["sub_issues"]
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s["issue"].as_str().unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_well_formed_article_passes() {
        let rule = QualityRule::default();
        assert_eq!(run(&rule, GOOD), None);
    }

    #[test]
    fn test_short_unstructured_article_reports_structure() {
        let rule = QualityRule::default();
        let issue = run(&rule, SHORT).unwrap();

        assert_eq!(issue.severity, Severity::High);
        assert_eq!(issue.title, "Content lacks structure");
        assert_eq!(
            sub_issue_titles(&issue),
            vec!["Content lacks structure", "Content is too short"]
        );
        assert_eq!(issue.metadata["heading_count"], json!(0));
        assert_eq!(issue.metadata["paragraph_count"], json!(1));
    }

    #[test]
    fn test_too_long() {
        let rule = QualityRule::default();
        let partial = json!({"min_word_count": 10, "max_word_count": 40});
        assert!(rule.update_config(partial.as_object().unwrap()));

        let issue = run(&rule, GOOD).unwrap();
        assert_eq!(issue.title, "Content is too long");
        assert_eq!(issue.severity, Severity::Low);
    }

    #[test]
    fn test_poor_readability() {
        let rule = QualityRule::default();
        let content = "# Overview\n\n\
            Comprehensive organizational documentation necessitates considerable administrative \
            coordination regarding authentication configuration.\n\n\
            Institutional authorization infrastructure occasionally necessitates additional \
            verification mechanisms.";
        let issue = run(&rule, content).unwrap();

        assert_eq!(issue.severity, Severity::High);
        assert_eq!(issue.title, "Poor readability");
        assert!(issue.metadata["readability_score"].as_f64().unwrap() < 30.0);
    }

    #[test]
    fn test_long_sentences() {
        let rule = QualityRule::default();
        let long_sentence = vec!["word"; 30].join(" ");
        let content = format!("{}\n\n{}.", GOOD, long_sentence);
        let issue = run(&rule, &content).unwrap();

        assert!(sub_issue_titles(&issue).contains(&"Sentences are too long".to_string()));
    }

    #[test]
    fn test_grammar_issues() {
        let rule = QualityRule::default();
        let content = GOOD
            .replace("# Updating your payment method", "# updating your payment method")
            .replace("Open the billing", "Open  the billing");
        let issue = run(&rule, &content).unwrap();

        assert_eq!(issue.title, "Grammar and style issues");
        let problems = issue.metadata["grammar_problems"].as_array().unwrap();
        assert_eq!(problems.len(), 2);
        assert!(problems[0].as_str().unwrap().contains("double space"));
        assert!(problems[1].as_str().unwrap().contains("lowercase"));
    }

    #[test]
    fn test_missing_terminal_punctuation() {
        let rule = QualityRule::default();
        let content = format!("{}\n\nSee the billing FAQ for more", GOOD);
        let issue = run(&rule, &content).unwrap();
        assert_eq!(issue.title, "Grammar and style issues");
    }

    #[test]
    fn test_formatting_issues() {
        let rule = QualityRule::default();
        let content = format!(
            "{}\n\nnpm install billing-cli\n\nDocs live at https://docs.example.com today.\n\n- one\n* two",
            GOOD
        );
        let issue = run(&rule, &content).unwrap();

        assert!(sub_issue_titles(&issue).contains(&"Formatting issues".to_string()));
        let fmt = rule_details(&rule, &content);
        assert_eq!(fmt.len(), 3);
    }

    fn rule_details(rule: &QualityRule, content: &str) -> Vec<String> {
        rule.check_formatting(content)
            .map(|f| {
                f.details["formatting_problems"]
                    .as_array()
                    .unwrap()
                    .iter()
                    .map(|p| p.as_str().unwrap().to_string())
                    .collect()
            })
            .unwrap_or_default()
    }

    #[test]
    fn test_image_src_is_not_a_raw_url() {
        let rule = QualityRule::default();
        let content = format!(
            "{}\n\n<img src=\"https://cdn.example.com/dash.png\" alt=\"Dashboard overview\">",
            GOOD
        );
        assert!(rule_details(&rule, &content).is_empty());
    }

    #[test]
    fn test_fenced_code_is_not_flagged() {
        let rule = QualityRule::default();
        let content = format!("{}\n\n```bash\nnpm install billing-cli\n```", GOOD);
        assert!(rule_details(&rule, &content).is_empty());
    }

    #[test]
    fn test_headers_optional() {
        let rule = QualityRule::default();
        let partial = json!({"require_headers": false, "min_word_count": 5});
        assert!(rule.update_config(partial.as_object().unwrap()));

        let content = SHORT.replace(". Choose", ".\n\nChoose");
        assert_eq!(run(&rule, &content), None);
    }

    #[test]
    fn test_config_validation() {
        let rule = QualityRule::default();
        let bad = json!({"min_readability_score": 95.0});
        assert!(!rule.validate_config(bad.as_object().unwrap()));
        let bad = json!({"max_sentence_length": 0});
        assert!(!rule.validate_config(bad.as_object().unwrap()));
        let ok = json!({"max_sentence_length": 30});
        assert!(rule.validate_config(ok.as_object().unwrap()));
    }
}
