use super::config::{RuleBase, RuleConfig, RuleDescriptor, RuleSettings};
use super::consolidate::{consolidate, Finding};
use super::links::{self, Link, LinkKind};
use super::text;
use super::{ExecutionContext, Rule};
use crate::report::{Issue, RuleCategory, RuleMetadata, Severity};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::net::Ipv4Addr;

const MAX_SUGGESTIONS: usize = 6;
const MAX_EXAMPLES: usize = 3;

/// Hosts exempt from the insecure scheme check
const LOOPBACK_HOSTS: &[&str] = &["localhost", "127.0.0.1"];

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct BrokenLinksSettings {
    /// Host patterns. `name.` matches a leading label (`staging.` matches
    /// `staging.example.com` and `api.staging.example.com`); anything else
    /// matches the host or one of its parent domains.
    pub suspicious_domains: Vec<String>,
    /// Treat loopback, private and link-local IPv4 hosts as suspicious
    pub flag_private_ips: bool,
    pub deprecated_domains: Vec<String>,
    pub allowed_schemes: Vec<String>,
    pub max_url_length: usize,
    pub generic_link_texts: Vec<String>,
    pub min_link_text_length: usize,
    pub check_link_text: bool,
    pub check_raw_urls: bool,
    pub check_duplicates: bool,
}

impl Default for BrokenLinksSettings {
    fn default() -> Self {
        Self {
            suspicious_domains: strings(&["localhost", "staging.", "dev.", "test."]),
            flag_private_ips: true,
            deprecated_domains: Vec::new(),
            allowed_schemes: strings(&["http", "https", "mailto", "tel", "ftp"]),
            max_url_length: 2000,
            generic_link_texts: strings(&[
                "here",
                "click here",
                "read more",
                "more",
                "link",
                "this",
                "this link",
                "learn more",
            ]),
            min_link_text_length: 3,
            check_link_text: true,
            check_raw_urls: true,
            check_duplicates: true,
        }
    }
}

impl RuleSettings for BrokenLinksSettings {
    fn validate(&self) -> Result<(), String> {
        if self.max_url_length == 0 {
            return Err("max_url_length must be greater than 0".to_string());
        }
        if self.allowed_schemes.is_empty() {
            return Err("allowed_schemes must not be empty".to_string());
        }
        if self.suspicious_domains.iter().chain(&self.deprecated_domains).any(|d| d.trim().is_empty()) {
            return Err("domain patterns must not be empty".to_string());
        }
        Ok(())
    }
}

/// Problems found on a single URL, in reporting order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum UrlProblem {
    Suspicious,
    Deprecated,
    Malformed,
    UnsupportedScheme,
    UnencodedSpaces,
    DoubledSlashes,
    Insecure,
    TooLong,
}

impl UrlProblem {
    fn severity(self) -> Severity {
        match self {
            UrlProblem::Suspicious | UrlProblem::Malformed => Severity::High,
            UrlProblem::Deprecated
            | UrlProblem::UnsupportedScheme
            | UrlProblem::UnencodedSpaces
            | UrlProblem::Insecure => Severity::Medium,
            UrlProblem::DoubledSlashes | UrlProblem::TooLong => Severity::Low,
        }
    }

    fn title(self) -> &'static str {
        match self {
            UrlProblem::Suspicious => "Suspicious link domains",
            UrlProblem::Deprecated => "Deprecated link domains",
            UrlProblem::Malformed => "Malformed URLs",
            UrlProblem::UnsupportedScheme => "Unsupported URL schemes",
            UrlProblem::UnencodedSpaces => "URLs with unencoded spaces",
            UrlProblem::DoubledSlashes => "URLs with doubled slashes",
            UrlProblem::Insecure => "Insecure HTTP links",
            UrlProblem::TooLong => "Overly long URLs",
        }
    }

    fn describe(self, count: usize) -> String {
        let what = match self {
            UrlProblem::Suspicious => "point to local, private or pre-production hosts",
            UrlProblem::Deprecated => "point to deprecated domains",
            UrlProblem::Malformed => "cannot be parsed or have no host",
            UrlProblem::UnsupportedScheme => "use an unsupported scheme",
            UrlProblem::UnencodedSpaces => "contain unencoded spaces",
            UrlProblem::DoubledSlashes => "contain doubled slashes in the path",
            UrlProblem::Insecure => "use insecure http",
            UrlProblem::TooLong => "are unusually long",
        };
        format!("{} link(s) {}", count, what)
    }

    fn suggestions(self) -> &'static [&'static str] {
        match self {
            UrlProblem::Suspicious => &["Replace internal or staging links with public production URLs"],
            UrlProblem::Deprecated => &["Update links that point to deprecated domains"],
            UrlProblem::Malformed => &["Fix malformed URLs so they include a valid host"],
            UrlProblem::UnsupportedScheme => &["Use http, https, mailto or tel links"],
            UrlProblem::UnencodedSpaces => &["Encode spaces in URLs as %20"],
            UrlProblem::DoubledSlashes => &["Remove doubled slashes from link paths"],
            UrlProblem::Insecure => &["Switch http links to https"],
            UrlProblem::TooLong => &["Shorten very long URLs or link to a landing page"],
        }
    }
}

/// Flags URLs that are likely broken, unsafe or badly presented
pub struct BrokenLinksRule {
    base: RuleBase<BrokenLinksSettings>,
}

impl Default for BrokenLinksRule {
    fn default() -> Self {
        Self::new(BrokenLinksSettings::default())
    }
}

impl BrokenLinksRule {
    pub fn new(settings: BrokenLinksSettings) -> Self {
        Self {
            base: RuleBase::new(
                RuleDescriptor {
                    id: "broken-links",
                    name: "Broken Links",
                    description: "Flags suspicious, malformed, insecure and poorly labelled links",
                    category: RuleCategory::Technical,
                    severity: Severity::High,
                    configurable: true,
                    version: "1.0.0",
                    tags: &["links", "urls"],
                },
                settings,
            ),
        }
    }

    fn analyze_url(&self, url: &str, settings: &BrokenLinksSettings) -> Vec<UrlProblem> {
        let mut problems = Vec::new();
        if url.chars().count() > settings.max_url_length {
            problems.push(UrlProblem::TooLong);
        }
        if url.contains(' ') {
            problems.push(UrlProblem::UnencodedSpaces);
        }
        if url.is_empty() {
            problems.push(UrlProblem::Malformed);
            return problems;
        }

        if !links::is_absolute(url) {
            // relative link: only the path can be checked
            if url.contains("//") {
                problems.push(UrlProblem::DoubledSlashes);
            }
            return problems;
        }

        let absolute = if url.starts_with("//") {
            format!("https:{}", url)
        } else {
            url.to_string()
        };
        let parsed = match links::parse_url(&absolute) {
            Ok(parsed) => parsed,
            Err(_) => {
                problems.push(UrlProblem::Malformed);
                if is_suspicious_host(&rough_host(url), settings) {
                    problems.push(UrlProblem::Suspicious);
                }
                return problems;
            }
        };

        let web = matches!(parsed.scheme.as_str(), "http" | "https" | "ftp");
        if web && parsed.host.is_empty() {
            problems.push(UrlProblem::Malformed);
        }
        if !settings.allowed_schemes.iter().any(|s| s.eq_ignore_ascii_case(&parsed.scheme)) {
            problems.push(UrlProblem::UnsupportedScheme);
        }
        if is_suspicious_host(&parsed.host, settings) {
            problems.push(UrlProblem::Suspicious);
        }
        if matches_any_domain(&parsed.host, &settings.deprecated_domains) {
            problems.push(UrlProblem::Deprecated);
        }
        if parsed.path.contains("//") {
            problems.push(UrlProblem::DoubledSlashes);
        }
        if parsed.scheme == "http" && !LOOPBACK_HOSTS.contains(&parsed.host.as_str()) {
            problems.push(UrlProblem::Insecure);
        }
        problems
    }

    fn check_urls(&self, found: &[Link], settings: &BrokenLinksSettings) -> Vec<Finding> {
        let mut by_problem: BTreeMap<UrlProblem, Vec<&str>> = BTreeMap::new();
        for link in found {
            for problem in self.analyze_url(&link.url, settings) {
                let urls = by_problem.entry(problem).or_default();
                if !urls.contains(&link.url.as_str()) {
                    urls.push(&link.url);
                }
            }
        }

        by_problem
            .into_iter()
            .map(|(problem, urls)| {
                let examples: Vec<String> =
                    urls.iter().take(MAX_EXAMPLES).map(|u| text::truncate(u, 100)).collect();
                Finding::new(problem.severity(), problem.title(), problem.describe(urls.len()))
                    .with_suggestions(problem.suggestions().iter().copied())
                    .with_detail("affected_links", urls.len())
                    .with_detail("examples", examples)
            })
            .collect()
    }

    fn check_raw_urls(&self, found: &[Link]) -> Option<Finding> {
        let raw: Vec<&str> = found
            .iter()
            .filter(|l| l.kind == LinkKind::Raw)
            .map(|l| l.url.as_str())
            .collect();
        if raw.is_empty() {
            return None;
        }
        Some(
            Finding::new(
                Severity::Low,
                "Unformatted raw URLs",
                format!("{} URL(s) are pasted as plain text", raw.len()),
            )
            .with_suggestions(["Format raw URLs as links with descriptive text"])
            .with_detail("raw_urls", raw.len()),
        )
    }

    fn check_link_text(&self, found: &[Link], settings: &BrokenLinksSettings) -> Option<Finding> {
        let poor: Vec<String> = found
            .iter()
            .filter_map(|l| l.text.as_deref().map(|t| (t, l.url.as_str())))
            .filter(|(label, url)| {
                let lower = label.trim().to_lowercase();
                settings.generic_link_texts.iter().any(|g| g.eq_ignore_ascii_case(&lower))
                    || label.trim() == url.trim()
                    || label.trim().chars().count() < settings.min_link_text_length
            })
            .map(|(label, _)| label.to_string())
            .collect();
        if poor.is_empty() {
            return None;
        }

        let examples: Vec<String> = poor.iter().take(MAX_EXAMPLES).cloned().collect();
        Some(
            Finding::new(
                Severity::Low,
                "Poor link text",
                format!("{} link(s) have generic or unhelpful text", poor.len()),
            )
            .with_suggestions(["Use link text that describes the destination"])
            .with_detail("poor_link_texts", examples),
        )
    }

    fn check_duplicates(&self, found: &[Link]) -> Option<Finding> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        let mut repeated: Vec<&str> = Vec::new();
        for link in found {
            let count = counts.entry(link.url.as_str()).or_insert(0);
            *count += 1;
            if *count == 2 {
                repeated.push(&link.url);
            }
        }
        if repeated.is_empty() {
            return None;
        }
        Some(
            Finding::new(
                Severity::Low,
                "Duplicate links",
                format!("{} URL(s) are linked more than once", repeated.len()),
            )
            .with_suggestions(["Link each destination once per article"])
            .with_detail("duplicate_urls", repeated),
        )
    }
}

/// Match a lowercased host against one domain pattern at label boundaries
fn matches_domain(host: &str, pattern: &str) -> bool {
    let pattern = pattern.trim().to_lowercase();
    if pattern.is_empty() {
        return false;
    }
    if pattern.ends_with('.') {
        host.starts_with(&pattern) || host.contains(&format!(".{}", pattern))
    } else {
        host == pattern || host.ends_with(&format!(".{}", pattern))
    }
}

fn matches_any_domain(host: &str, patterns: &[String]) -> bool {
    patterns.iter().any(|p| matches_domain(host, p))
}

fn is_private_ip(host: &str) -> bool {
    match host.parse::<Ipv4Addr>() {
        Ok(ip) => ip.is_loopback() || ip.is_private() || ip.is_link_local() || ip.is_unspecified(),
        Err(_) => false,
    }
}

fn is_suspicious_host(host: &str, settings: &BrokenLinksSettings) -> bool {
    (settings.flag_private_ips && is_private_ip(host))
        || matches_any_domain(host, &settings.suspicious_domains)
}

/// Best-effort lowercased host of a URL that failed to parse
fn rough_host(url: &str) -> String {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    let authority = rest.split(['/', '?', '#']).next().unwrap_or("");
    let host_port = authority.rsplit('@').next().unwrap_or("");
    let host = host_port.split(':').next().unwrap_or("");
    host.to_lowercase()
}

impl Rule for BrokenLinksRule {
    fn id(&self) -> &'static str {
        self.base.id()
    }

    fn metadata(&self) -> RuleMetadata {
        self.base.metadata()
    }

    fn execute(&self, ctx: &ExecutionContext<'_>) -> anyhow::Result<Option<Issue>> {
        let settings = self.base.settings();
        let found = links::extract_links(&text::mask_code_blocks(ctx.content()));
        if found.is_empty() {
            return Ok(None);
        }

        let mut findings = self.check_urls(&found, &settings);
        if settings.check_raw_urls {
            findings.extend(self.check_raw_urls(&found));
        }
        if settings.check_link_text {
            findings.extend(self.check_link_text(&found, &settings));
        }
        if settings.check_duplicates {
            findings.extend(self.check_duplicates(&found));
        }

        let categories = findings.len();
        let d = self.base.descriptor();
        let mut issue = consolidate(d.id, d.category, findings, MAX_SUGGESTIONS);
        if let Some(issue) = issue.as_mut() {
            issue.metadata.insert("total_links".to_string(), Value::from(found.len()));
            issue.metadata.insert("issue_categories".to_string(), Value::from(categories));
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
