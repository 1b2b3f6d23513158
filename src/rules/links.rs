//! Link and image extraction plus a small URL parser.

use super::text::strip_tags;
use regex::Regex;
use std::ops::Range;
use std::sync::OnceLock;

static MARKDOWN_LINK: OnceLock<Regex> = OnceLock::new();
static HTML_ANCHOR: OnceLock<Regex> = OnceLock::new();
static RAW_URL: OnceLock<Regex> = OnceLock::new();
static HTML_IMAGE: OnceLock<Regex> = OnceLock::new();
static HTML_ATTR_SRC: OnceLock<Regex> = OnceLock::new();
static HTML_ATTR_ALT: OnceLock<Regex> = OnceLock::new();
static URL_PARTS: OnceLock<Regex> = OnceLock::new();

/// `[text](url "title")` or `[text](<url>)`, with a leading `!` captured so
/// images can be told apart. The bare destination may contain spaces.
fn markdown_link() -> &'static Regex {
    MARKDOWN_LINK.get_or_init(|| {
        Regex::new(r#"(!?)\[([^\]]*)\]\(\s*(?:<([^>]*)>|([^)]*?))(?:\s+"[^"]*")?\s*\)"#)
            .expect("valid markdown link pattern")
    })
}

/// Destination of a `markdown_link` match, angle-bracketed or bare
fn markdown_target(caps: &regex::Captures<'_>) -> String {
    caps.get(3)
        .or_else(|| caps.get(4))
        .map_or("", |m| m.as_str())
        .trim()
        .to_string()
}

fn html_anchor() -> &'static Regex {
    HTML_ANCHOR.get_or_init(|| {
        Regex::new(r#"(?is)<a\s[^>]*?href\s*=\s*["']([^"']*)["'][^>]*>(.*?)</a\s*>"#)
            .expect("valid anchor pattern")
    })
}

fn raw_url() -> &'static Regex {
    RAW_URL.get_or_init(|| {
        Regex::new(r#"(?i)\b(?:https?|ftp)://[^\s<>"'()\[\]`]+"#).expect("valid raw url pattern")
    })
}

fn html_image() -> &'static Regex {
    HTML_IMAGE.get_or_init(|| Regex::new(r"(?is)<img\b[^>]*>").expect("valid img pattern"))
}

fn html_attr_src() -> &'static Regex {
    HTML_ATTR_SRC.get_or_init(|| {
        Regex::new(r#"(?i)\bsrc\s*=\s*["']([^"']*)["']"#).expect("valid src pattern")
    })
}

fn html_attr_alt() -> &'static Regex {
    HTML_ATTR_ALT.get_or_init(|| {
        Regex::new(r#"(?i)\balt\s*=\s*["']([^"']*)["']"#).expect("valid alt pattern")
    })
}

fn url_parts() -> &'static Regex {
    URL_PARTS.get_or_init(|| {
        Regex::new(r"^([A-Za-z][A-Za-z0-9+.\-]*):(?://([^/?#]*))?([^?#]*)(?:\?[^#]*)?(?:#.*)?$")
            .expect("valid url pattern")
    })
}

/// How a link was written in the article
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    Markdown,
    Html,
    Raw,
}

/// A link reference extracted from article content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub url: String,
    /// Anchor text; `None` for raw URLs
    pub text: Option<String>,
    pub kind: LinkKind,
}

impl Link {
    /// Absolute web link (`http`, `https` or protocol-relative)
    pub fn is_external(&self) -> bool {
        let lower = self.url.to_ascii_lowercase();
        lower.starts_with("http://") || lower.starts_with("https://") || lower.starts_with("//")
    }
}

/// An embedded image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    pub src: String,
    pub alt: Option<String>,
}

/// Extract markdown links, HTML anchors and raw URLs in document order.
///
/// Raw URLs that sit inside a markdown link, an anchor or an `<img>` tag are
/// not reported as links of their own.
pub fn extract_links(content: &str) -> Vec<Link> {
    let mut found: Vec<(usize, Link)> = Vec::new();
    let mut covered: Vec<Range<usize>> = Vec::new();

    for caps in markdown_link().captures_iter(content) {
        let whole = match caps.get(0) {
            Some(m) => m,
            None => continue,
        };
        covered.push(whole.range());
        if &caps[1] == "!" {
            continue;
        }
        found.push((
            whole.start(),
            Link {
                url: markdown_target(&caps),
                text: Some(caps[2].trim().to_string()),
                kind: LinkKind::Markdown,
            },
        ));
    }

    for caps in html_anchor().captures_iter(content) {
        let whole = match caps.get(0) {
            Some(m) => m,
            None => continue,
        };
        covered.push(whole.range());
        found.push((
            whole.start(),
            Link {
                url: caps[1].trim().to_string(),
                text: Some(strip_tags(&caps[2]).trim().to_string()),
                kind: LinkKind::Html,
            },
        ));
    }

    covered.extend(html_image().find_iter(content).map(|m| m.range()));

    for m in raw_url().find_iter(content) {
        if covered.iter().any(|r| r.start <= m.start() && m.start() < r.end) {
            continue;
        }
        let url = m.as_str().trim_end_matches(['.', ',', ';', ':', '!', '?']);
        found.push((
            m.start(),
            Link {
                url: url.to_string(),
                text: None,
                kind: LinkKind::Raw,
            },
        ));
    }

    found.sort_by_key(|(start, _)| *start);
    found.into_iter().map(|(_, link)| link).collect()
}

/// Extract markdown and HTML images
pub fn extract_images(content: &str) -> Vec<Image> {
    let mut found: Vec<(usize, Image)> = Vec::new();

    for caps in markdown_link().captures_iter(content) {
        if &caps[1] != "!" {
            continue;
        }
        let start = caps.get(0).map_or(0, |m| m.start());
        let alt = caps[2].trim();
        found.push((
            start,
            Image {
                src: markdown_target(&caps),
                alt: (!alt.is_empty()).then(|| alt.to_string()),
            },
        ));
    }

    for m in html_image().find_iter(content) {
        let tag = m.as_str();
        let src = html_attr_src()
            .captures(tag)
            .map(|c| c[1].trim().to_string())
            .unwrap_or_default();
        let alt = html_attr_alt()
            .captures(tag)
            .map(|c| c[1].trim().to_string())
            .filter(|a| !a.is_empty());
        found.push((m.start(), Image { src, alt }));
    }

    found.sort_by_key(|(start, _)| *start);
    found.into_iter().map(|(_, image)| image).collect()
}

/// Components of an absolute URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedUrl {
    /// Lowercased scheme
    pub scheme: String,
    /// Lowercased host without port or credentials; empty when absent
    pub host: String,
    pub port: Option<u16>,
    pub path: String,
}

/// Parse an absolute URL (`scheme:...`).
///
/// Fails on a missing scheme, a non-numeric port or a host with
/// characters that cannot appear in a hostname.
pub fn parse_url(url: &str) -> Result<ParsedUrl, String> {
    let caps = url_parts()
        .captures(url)
        .ok_or_else(|| format!("not an absolute URL: {}", url))?;

    let scheme = caps[1].to_ascii_lowercase();
    let authority = caps.get(2).map_or("", |m| m.as_str());
    let path = caps.get(3).map_or("", |m| m.as_str()).to_string();

    let host_port = authority.rsplit('@').next().unwrap_or("");
    let (host, port) = split_host_port(host_port)?;

    let valid_host = host
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | '~' | '%' | '[' | ']' | ':'));
    if !valid_host {
        return Err(format!("invalid host '{}'", host));
    }

    Ok(ParsedUrl {
        scheme,
        host: host.to_ascii_lowercase(),
        port,
        path,
    })
}

fn split_host_port(host_port: &str) -> Result<(&str, Option<u16>), String> {
    // IPv6 literal: [::1]:8080
    if let Some(end) = host_port.find(']') {
        let host = &host_port[..=end];
        return match host_port[end + 1..].strip_prefix(':') {
            Some(port) => Ok((host, Some(parse_port(port)?))),
            None => Ok((host, None)),
        };
    }
    match host_port.rsplit_once(':') {
        Some((host, port)) => Ok((host, Some(parse_port(port)?))),
        None => Ok((host_port, None)),
    }
}

fn parse_port(port: &str) -> Result<u16, String> {
    port.parse::<u16>()
        .map_err(|_| format!("invalid port '{}'", port))
}

/// True when the URL carries a scheme (`https:`, `mailto:`) or is protocol-relative
pub fn is_absolute(url: &str) -> bool {
    url.starts_with("//") || url_parts().is_match(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_extract_markdown_link() {
        let links = extract_links("See [the docs](https://docs.example.com/start) for details.");
        assert_eq!(
            links,
            vec![Link {
                url: "https://docs.example.com/start".to_string(),
                text: Some("the docs".to_string()),
                kind: LinkKind::Markdown,
            }]
        );
    }

    #[test]
    fn test_raw_url_inside_markdown_not_double_counted() {
        let links = extract_links("[https://a.example.com](https://a.example.com) and https://b.example.com.");
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].kind, LinkKind::Markdown);
        assert_eq!(links[1].kind, LinkKind::Raw);
        assert_eq!(links[1].url, "https://b.example.com");
    }

    #[test]
    fn test_img_src_is_not_a_raw_url() {
        let content = r#"<img src="https://cdn.example.com/dash.png" alt="Dashboard overview">"#;
        assert!(extract_links(content).is_empty());
        assert_eq!(extract_images(content)[0].src, "https://cdn.example.com/dash.png");
    }

    #[test]
    fn test_markdown_link_with_space_in_url() {
        let links = extract_links("Read [the setup guide](https://docs.example.com/my page) first.");
        assert_eq!(
            links,
            vec![Link {
                url: "https://docs.example.com/my page".to_string(),
                text: Some("the setup guide".to_string()),
                kind: LinkKind::Markdown,
            }]
        );
    }

    #[test]
    fn test_markdown_link_title_and_angle_brackets() {
        let links = extract_links(
            r#"[Plans](https://example.com/plans "Pricing") and [Setup](<https://example.com/a b>)"#,
        );
        let urls: Vec<&str> = links.iter().map(|l| l.url.as_str()).collect();
        assert_eq!(urls, vec!["https://example.com/plans", "https://example.com/a b"]);
        assert!(links.iter().all(|l| l.kind == LinkKind::Markdown));
    }

    #[test]
    fn test_extract_html_anchor() {
        let links = extract_links(r#"Go <a class="x" href="/billing/plans">to <b>plans</b></a> now"#);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].url, "/billing/plans");
        assert_eq!(links[0].text.as_deref(), Some("to plans"));
        assert_eq!(links[0].kind, LinkKind::Html);
    }

    #[test]
    fn test_images_are_not_links() {
        let content = "![Dashboard overview](img/dash.png) and [link](/a)";
        let links = extract_links(content);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].url, "/a");

        let images = extract_images(content);
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].alt.as_deref(), Some("Dashboard overview"));
    }

    #[test]
    fn test_extract_html_image_without_alt() {
        let images = extract_images(r#"<img src="a.png"> <img alt="Chart" src="b.png" />"#);
        assert_eq!(images.len(), 2);
        assert_eq!(images[0].src, "a.png");
        assert!(images[0].alt.is_none());
        assert_eq!(images[1].alt.as_deref(), Some("Chart"));
    }

    #[test]
    fn test_parse_url() {
        let parsed = parse_url("HTTPS://User@Docs.Example.com:8443/a//b?q=1#top").unwrap();
        assert_eq!(parsed.scheme, "https");
        assert_eq!(parsed.host, "docs.example.com");
        assert_eq!(parsed.port, Some(8443));
        assert_eq!(parsed.path, "/a//b");
    }

    #[test]
    fn test_parse_url_empty_host() {
        let parsed = parse_url("http:///path").unwrap();
        assert_eq!(parsed.host, "");
    }

    #[test]
    fn test_parse_url_failures() {
        assert!(parse_url("/relative/path").is_err());
        assert!(parse_url("http://host:notaport/").is_err());
        assert!(parse_url("http://bad host/").is_err());
    }

    #[test]
    fn test_parse_mailto() {
        let parsed = parse_url("mailto:support@example.com").unwrap();
        assert_eq!(parsed.scheme, "mailto");
        assert_eq!(parsed.host, "");
    }

    #[test]
    fn test_is_external() {
        let link = |url: &str| Link {
            url: url.to_string(),
            text: None,
            kind: LinkKind::Raw,
        };
        assert!(link("https://x.io").is_external());
        assert!(link("//cdn.x.io/a.js").is_external());
        assert!(!link("/docs/setup").is_external());
        assert!(!link("#section").is_external());
    }
}
