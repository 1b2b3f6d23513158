use super::config::{RuleBase, RuleConfig, RuleDescriptor, RuleSettings};
use super::consolidate::{consolidate, Finding};
use super::links::{extract_images, extract_links};
use super::text::{self, Heading};
use super::{ExecutionContext, Rule};
use crate::report::{Issue, RuleCategory, RuleMetadata, Severity};
use crate::store::Article;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

const MAX_SUGGESTIONS: usize = 8;
const MAX_KEYWORDS: usize = 3;
const MIN_KEYWORD_LEN: usize = 3;

const GENERIC_ALT_TEXTS: &[&str] = &["image", "picture", "photo", "screenshot", "img", "icon"];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SeoSettings {
    pub min_word_count: usize,
    pub max_word_count: usize,
    /// Keyword density bounds, in percent of total words
    pub min_keyword_density: f64,
    pub max_keyword_density: f64,
    pub min_title_length: usize,
    pub max_title_length: usize,
    pub require_description: bool,
    pub check_headings: bool,
    pub check_images: bool,
    pub check_internal_links: bool,
    pub stop_words: Vec<String>,
}

impl Default for SeoSettings {
    fn default() -> Self {
        Self {
            min_word_count: 300,
            max_word_count: 2500,
            min_keyword_density: 0.5,
            max_keyword_density: 3.0,
            min_title_length: 30,
            max_title_length: 60,
            require_description: true,
            check_headings: true,
            check_images: true,
            check_internal_links: true,
            stop_words: [
                "the", "and", "for", "with", "your", "you", "how", "what", "why", "when", "where",
                "this", "that", "from", "into", "are", "can", "not", "all", "use", "using", "about",
                "our", "its", "was", "will", "has", "have", "been", "but", "who", "which", "their",
                "them", "then", "than", "there", "these", "those", "does", "get", "set", "new",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

impl RuleSettings for SeoSettings {
    fn validate(&self) -> Result<(), String> {
        if self.min_word_count >= self.max_word_count {
            return Err("min_word_count must be less than max_word_count".to_string());
        }
        if !(self.min_keyword_density >= 0.0 && self.min_keyword_density < self.max_keyword_density) {
            return Err("keyword density bounds must satisfy 0 <= min < max".to_string());
        }
        if self.min_title_length >= self.max_title_length {
            return Err("min_title_length must be less than max_title_length".to_string());
        }
        Ok(())
    }
}

/// Target keywords: title words (stop words and short words removed)
/// followed by tags, deduplicated, first `MAX_KEYWORDS` kept.
/// Each keyword is a sequence of normalized words.
fn target_keywords(article: &Article, stop_words: &[String]) -> Vec<Vec<String>> {
    let is_stop = |w: &str| stop_words.iter().any(|s| s.eq_ignore_ascii_case(w));

    let from_title = text::normalized_words(&article.title)
        .into_iter()
        .filter(|w| w.chars().count() >= MIN_KEYWORD_LEN && !is_stop(w.as_str()))
        .map(|w| vec![w]);
    let from_tags = article
        .tags
        .iter()
        .map(|t| text::normalized_words(t))
        .filter(|t| !t.is_empty());

    let mut keywords: Vec<Vec<String>> = Vec::new();
    for keyword in from_title.chain(from_tags) {
        if keywords.len() >= MAX_KEYWORDS {
            break;
        }
        if !keywords.contains(&keyword) {
            keywords.push(keyword);
        }
    }
    keywords
}

fn occurrences(words: &[String], keyword: &[String]) -> usize {
    if keyword.is_empty() {
        return 0;
    }
    words.windows(keyword.len()).filter(|w| *w == keyword).count()
}

/// Checks length, headings, keyword use, title, description, image alt
/// text and internal linking
pub struct SeoRule {
    base: RuleBase<SeoSettings>,
}

impl Default for SeoRule {
    fn default() -> Self {
        Self::new(SeoSettings::default())
    }
}

impl SeoRule {
    pub fn new(settings: SeoSettings) -> Self {
        Self {
            base: RuleBase::new(
                RuleDescriptor {
                    id: "seo",
                    name: "SEO Optimization",
                    description: "Checks length, headings, keywords, title, description, images and links for search visibility",
                    category: RuleCategory::Seo,
                    severity: Severity::Low,
                    configurable: true,
                    version: "1.0.0",
                    tags: &["seo", "search", "discoverability"],
                },
                settings,
            ),
        }
    }

    fn check_length(&self, word_count: usize, settings: &SeoSettings) -> Option<Finding> {
        if word_count < settings.min_word_count {
            Some(
                Finding::new(
                    Severity::Low,
                    "Content too short for SEO",
                    format!(
                        "{} words; search engines favor at least {}",
                        word_count, settings.min_word_count
                    ),
                )
                .with_suggestions(["Expand the article to cover the topic in more depth"])
                .with_detail("word_count", word_count),
            )
        } else if word_count > settings.max_word_count {
            Some(
                Finding::new(
                    Severity::Low,
                    "Content too long for SEO",
                    format!(
                        "{} words; consider keeping under {}",
                        word_count, settings.max_word_count
                    ),
                )
                .with_suggestions(["Split long content into several focused articles"])
                .with_detail("word_count", word_count),
            )
        } else {
            None
        }
    }

    fn check_headings(&self, headings: &[Heading]) -> Option<Finding> {
        if headings.is_empty() {
            return Some(
                Finding::new(Severity::Low, "Missing headings", "Article has no headings")
                    .with_suggestions(["Add descriptive headings that include target keywords"]),
            );
        }

        let skips: Vec<String> = headings
            .windows(2)
            .filter(|pair| pair[1].level > pair[0].level + 1)
            .map(|pair| format!("H{} -> H{}", pair[0].level, pair[1].level))
            .collect();
        if skips.is_empty() {
            return None;
        }
        Some(
            Finding::new(
                Severity::Low,
                "Heading hierarchy skips levels",
                format!("Headings jump levels: {}", skips.join(", ")),
            )
            .with_suggestions(["Nest headings in order (H1, then H2, then H3)"])
            .with_detail("heading_skips", skips),
        )
    }

    fn check_keywords(
        &self,
        article: &Article,
        settings: &SeoSettings,
    ) -> (Option<Finding>, Option<Finding>) {
        let keywords = target_keywords(article, &settings.stop_words);
        let words = text::normalized_words(&text::mask_code_blocks(&article.content));
        if keywords.is_empty() || words.is_empty() {
            return (None, None);
        }

        let mut low = Vec::new();
        let mut high = Vec::new();
        for keyword in &keywords {
            let density = occurrences(&words, keyword) as f64 / words.len() as f64 * 100.0;
            let entry = json!({
                "keyword": keyword.join(" "),
                "density": (density * 100.0).round() / 100.0,
            });
            if density < settings.min_keyword_density {
                low.push(entry);
            } else if density > settings.max_keyword_density {
                high.push(entry);
            }
        }

        let low_finding = (!low.is_empty()).then(|| {
            Finding::new(
                Severity::Low,
                "Low keyword density",
                format!(
                    "{} target keyword(s) appear in under {}% of words",
                    low.len(),
                    settings.min_keyword_density
                ),
            )
            .with_suggestions(["Use the title keywords naturally in the body text"])
            .with_detail("keywords", Value::Array(low))
        });
        let high_finding = (!high.is_empty()).then(|| {
            Finding::new(
                Severity::Low,
                "Keyword over-optimization",
                format!(
                    "{} target keyword(s) exceed {}% of words",
                    high.len(),
                    settings.max_keyword_density
                ),
            )
            .with_suggestions(["Reduce keyword repetition and use synonyms"])
            .with_detail("keywords", Value::Array(high))
        });
        (low_finding, high_finding)
    }

    fn check_title(&self, title: &str, settings: &SeoSettings) -> Option<Finding> {
        let length = title.trim().chars().count();
        let (name, bound) = if length < settings.min_title_length {
            ("Title too short", format!("under {}", settings.min_title_length))
        } else if length > settings.max_title_length {
            ("Title too long", format!("over {}", settings.max_title_length))
        } else {
            return None;
        };

        Some(
            Finding::new(
                Severity::Low,
                name,
                format!("Title is {} characters, {} characters", length, bound),
            )
            .with_suggestions([format!(
                "Keep titles between {} and {} characters",
                settings.min_title_length, settings.max_title_length
            )])
            .with_detail("title_length", length),
        )
    }

    fn check_description(&self, article: &Article) -> Option<Finding> {
        let present = article
            .description
            .as_deref()
            .is_some_and(|d| !d.trim().is_empty());
        if present {
            return None;
        }
        Some(
            Finding::new(
                Severity::High,
                "Missing meta description",
                "Article has no description or excerpt for search results",
            )
            .with_suggestions(["Add a one or two sentence description summarizing the article"]),
        )
    }

    fn check_images(&self, content: &str) -> Option<Finding> {
        let images = extract_images(&text::mask_code_blocks(content));
        let missing: Vec<String> = images
            .iter()
            .filter(|image| match image.alt.as_deref() {
                None => true,
                Some(alt) => {
                    let alt = alt.trim().to_lowercase();
                    alt.chars().count() < 3
                        || GENERIC_ALT_TEXTS.contains(&alt.as_str())
                        || image.src.to_lowercase().ends_with(&alt)
                }
            })
            .map(|image| image.src.clone())
            .collect();
        if missing.is_empty() {
            return None;
        }

        Some(
            Finding::new(
                Severity::Low,
                "Images missing alt text",
                format!(
                    "{} of {} image(s) lack descriptive alt text",
                    missing.len(),
                    images.len()
                ),
            )
            .with_suggestions(["Describe each image in its alt text"])
            .with_detail("images", missing),
        )
    }

    fn check_internal_links(&self, content: &str) -> Option<Finding> {
        let found = extract_links(&text::mask_code_blocks(content));
        let external = found.iter().filter(|l| l.is_external()).count();
        let internal = found
            .iter()
            .filter(|l| !l.is_external())
            .filter(|l| {
                let lower = l.url.to_lowercase();
                !lower.starts_with("mailto:") && !lower.starts_with("tel:")
            })
            .count();
        if external == 0 || internal > 0 {
            return None;
        }

        Some(
            Finding::new(
                Severity::Low,
                "No internal links",
                format!("Article links to {} external page(s) but no related articles", external),
            )
            .with_suggestions(["Link to related knowledge base articles"])
            .with_detail("external_links", external),
        )
    }
}

impl Rule for SeoRule {
    fn id(&self) -> &'static str {
        self.base.id()
    }

    fn metadata(&self) -> RuleMetadata {
        self.base.metadata()
    }

    fn execute(&self, ctx: &ExecutionContext<'_>) -> anyhow::Result<Option<Issue>> {
        let settings = self.base.settings();
        let article = ctx.article;

        let mut findings = Vec::new();
        findings.extend(self.check_length(ctx.metadata.word_count, &settings));
        if settings.check_headings {
            findings.extend(self.check_headings(&text::headings(&article.content)));
        }
        let (low_density, over_optimized) = self.check_keywords(article, &settings);
        findings.extend(low_density);
        findings.extend(over_optimized);
        findings.extend(self.check_title(&article.title, &settings));
        if settings.require_description {
            findings.extend(self.check_description(article));
        }
        if settings.check_images {
            findings.extend(self.check_images(&article.content));
        }
        if settings.check_internal_links {
            findings.extend(self.check_internal_links(&article.content));
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
