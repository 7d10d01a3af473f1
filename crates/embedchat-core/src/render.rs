//! Turn raw message text into markup that is safe to insert as `innerHTML`.
//!
//! User text is only escaped. Bot text is processed in a fixed order:
//!
//! 1. lightweight markdown markers are stripped,
//! 2. `[label](url)` links are swapped for placeholder tokens,
//! 3. the remaining text is escaped,
//! 4. placeholders become anchors,
//! 5. bare URLs, phone numbers and email addresses are wrapped, in that order.
//!
//! Once a piece of text has been turned into markup it is never scanned again,
//! so later detectors cannot wrap the inside of an earlier anchor.

use regex::{Captures, Regex};
use std::sync::OnceLock;

use crate::transcript::Sender;

/// Delimits link placeholders. Stripped from input before extraction.
const PLACEHOLDER: char = '\u{FFFC}';

const BULLET: &str = "• ";

/// Escaped forms of characters that end a bare URL
const URL_STOP_ENTITIES: [&str; 4] = ["&lt;", "&gt;", "&quot;", "&#39;"];

const URL_TRAILING_PUNCTUATION: &[char] = &['.', ',', ':', '!', '?'];

/// A `[label](url)` occurrence pulled out of bot text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkdownLink {
    pub label: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    /// Escaped text, still open to detection
    Text(String),
    /// Finished markup
    Markup(String),
}

/// Render a message for display.
pub fn render(raw: &str, sender: Sender) -> String {
    match sender {
        Sender::User => escape_html(raw),
        Sender::Bot => render_bot(raw),
    }
}

/// Escape HTML to prevent XSS
pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Remove emphasis, strikethrough, inline code, heading and blockquote
/// markers. Leading list markers become a bullet glyph.
pub fn strip_markdown(text: &str) -> String {
    let text = heading_re().replace_all(text, "");
    let text = blockquote_re().replace_all(&text, "");
    let text = list_marker_re().replace_all(&text, BULLET);
    let text = text.replace('*', "");
    let text = strikethrough_re().replace_all(&text, "$1");
    let text = inline_code_re().replace_all(&text, "$1");
    text.into_owned()
}

/// Replace every markdown link with a placeholder token. The returned table
/// is indexed by the number inside the token.
pub fn extract_links(text: &str) -> (String, Vec<MarkdownLink>) {
    let mut links = Vec::new();
    let replaced = markdown_link_re().replace_all(text, |caps: &Captures| {
        let token = placeholder(links.len());
        links.push(MarkdownLink {
            label: caps[1].to_string(),
            url: caps[2].to_string(),
        });
        token
    });
    (replaced.into_owned(), links)
}

fn render_bot(raw: &str) -> String {
    let cleaned = strip_markdown(&raw.replace(PLACEHOLDER, ""));
    let (text, links) = extract_links(&cleaned);
    let escaped = escape_html(&text);

    let segments = substitute_links(&escaped, &links);
    let segments = detect(segments, wrap_urls);
    let segments = detect(segments, wrap_phones);
    let segments = detect(segments, wrap_emails);

    segments
        .into_iter()
        .map(|segment| match segment {
            Segment::Text(s) | Segment::Markup(s) => s,
        })
        .collect()
}

fn placeholder(index: usize) -> String {
    format!("{PLACEHOLDER}{index}{PLACEHOLDER}")
}

fn substitute_links(escaped: &str, links: &[MarkdownLink]) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut last = 0;

    for token in placeholder_re().find_iter(escaped) {
        push_text(&mut segments, &escaped[last..token.start()]);

        let link = token
            .as_str()
            .trim_matches(PLACEHOLDER)
            .parse::<usize>()
            .ok()
            .and_then(|index| links.get(index));

        match link {
            Some(link) => segments.push(link_segment(link)),
            None => push_text(&mut segments, token.as_str()),
        }
        last = token.end();
    }

    push_text(&mut segments, &escaped[last..]);
    segments
}

fn link_segment(link: &MarkdownLink) -> Segment {
    let url = link.url.trim();
    if is_safe_href(url) {
        Segment::Markup(anchor(&escape_html(url), &escape_html(&link.label)))
    } else {
        log::debug!("Dropping link with disallowed target: {}", url);
        Segment::Text(escape_html(&link.label))
    }
}

/// Accept web, mail and phone schemes plus scheme-less references.
fn is_safe_href(url: &str) -> bool {
    if url.is_empty() || url.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return false;
    }

    match url.find(':') {
        Some(idx) if !url[..idx].contains(&['/', '?', '#'][..]) => {
            let scheme = url[..idx].to_ascii_lowercase();
            matches!(scheme.as_str(), "http" | "https" | "mailto" | "tel")
        }
        _ => true,
    }
}

/// Both arguments must already be escaped.
fn anchor(href: &str, label: &str) -> String {
    format!(r#"<a href="{href}" target="_blank" rel="noopener noreferrer">{label}</a>"#)
}

fn push_text(segments: &mut Vec<Segment>, text: &str) {
    if !text.is_empty() {
        segments.push(Segment::Text(text.to_string()));
    }
}

fn detect(segments: Vec<Segment>, detector: fn(&str) -> Vec<Segment>) -> Vec<Segment> {
    segments
        .into_iter()
        .flat_map(|segment| match segment {
            Segment::Text(text) => detector(&text),
            markup => vec![markup],
        })
        .collect()
}

/// Walk `text` with `re`, letting `wrap` turn a match into markup.
///
/// `wrap` receives the byte range of capture group 1 (or the whole match) and
/// returns the end of the consumed text with its markup, or `None` to reject.
/// A rejected match restarts the search one character later.
fn scan<F>(text: &str, re: &Regex, mut wrap: F) -> Vec<Segment>
where
    F: FnMut(&str, usize, usize) -> Option<(usize, String)>,
{
    let mut segments = Vec::new();
    let mut plain_start = 0;
    let mut pos = 0;

    while pos < text.len() {
        let Some(caps) = re.captures_at(text, pos) else {
            break;
        };
        let Some(found) = caps.get(1).or_else(|| caps.get(0)) else {
            break;
        };

        match wrap(text, found.start(), found.end()) {
            Some((end, markup)) if end > found.start() => {
                push_text(&mut segments, &text[plain_start..found.start()]);
                segments.push(Segment::Markup(markup));
                plain_start = end;
                pos = end;
            }
            _ => {
                let step = text[found.start()..]
                    .chars()
                    .next()
                    .map_or(1, char::len_utf8);
                pos = found.start() + step;
            }
        }
    }

    push_text(&mut segments, &text[plain_start..]);
    segments
}

fn wrap_urls(text: &str) -> Vec<Segment> {
    scan(text, bare_url_re(), |text, start, end| {
        let candidate = &text[start..end];
        let cut = URL_STOP_ENTITIES
            .iter()
            .filter_map(|entity| candidate.find(entity))
            .min()
            .unwrap_or(candidate.len());
        let url = candidate[..cut].trim_end_matches(URL_TRAILING_PUNCTUATION);

        let has_target = url
            .split_once("://")
            .map_or(false, |(_, rest)| !rest.is_empty());
        has_target.then(|| (start + url.len(), anchor(url, url)))
    })
}

fn wrap_phones(text: &str) -> Vec<Segment> {
    scan(text, phone_re(), |text, start, end| {
        let preceded_by_word = text[..start]
            .chars()
            .next_back()
            .map_or(false, |c| c.is_ascii_alphanumeric());
        if preceded_by_word {
            return None;
        }

        let shown = &text[start..end];
        let digits: String = shown.chars().filter(|c| *c != ' ' && *c != '-').collect();
        Some((
            end,
            format!(
                r#"<span class="phone-link" role="link" tabindex="0" data-tel="tel:{digits}">{shown}</span>"#
            ),
        ))
    })
}

fn wrap_emails(text: &str) -> Vec<Segment> {
    scan(text, email_re(), |text, start, end| {
        let address = text[start..end].trim_end_matches('.');
        let (_, domain) = address.split_once('@')?;
        if !domain.contains('.') || domain.starts_with('.') {
            return None;
        }
        Some((
            start + address.len(),
            format!(r#"<a href="mailto:{address}">{address}</a>"#),
        ))
    })
}

fn cached(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("built-in pattern must compile"))
}

fn heading_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    cached(&RE, r"(?m)^#+[ \t]")
}

fn blockquote_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    cached(&RE, r"(?m)^>[ \t]")
}

fn list_marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    cached(&RE, r"(?m)^[-*+][ \t]")
}

fn strikethrough_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    cached(&RE, r"~~(.+?)~~")
}

fn inline_code_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    cached(&RE, r"`(.+?)`")
}

fn markdown_link_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    cached(&RE, r"\[([^\]]+)\]\(([^)]+)\)")
}

fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    cached(&RE, r"\x{FFFC}\d+\x{FFFC}")
}

fn bare_url_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    cached(&RE, r#"https?://[^\s<>"']+"#)
}

fn phone_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Group 1 is the number; the trailing group only forbids a following
    // letter or digit.
    cached(
        &RE,
        r"(\+?\d{1,3}[ \-]?\d{3,4}[ \-]?\d{3,4}[ \-]?\d{3,4})(?:[^A-Za-z0-9]|$)",
    )
}

fn email_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    cached(&RE, r"[A-Za-z0-9._-]+@[A-Za-z0-9._-]+\.[A-Za-z0-9._-]+")
}
