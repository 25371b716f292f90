//! Markdown to HTML for answers and resource contents.
//!
//! Raw HTML in the source is escaped, never passed through, so the output
//! can be handed to an HTML surface as is. [`SafeHtml`] can only be built
//! here.

use std::fmt;

use pulldown_cmark::{html, CowStr, Event, LinkType, Parser, Tag};
use pulldown_cmark_escape::{escape_href, escape_html};

const EXTERNAL_REL: &str = "noreferrer noopener nofollow";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SafeHtml(String);

impl SafeHtml {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for SafeHtml {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Browsing context external links open in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkTarget {
    /// Admin dashboard: new tab.
    Blank,
    /// Ask widget, possibly embedded: break out of the frame.
    Top,
}

impl LinkTarget {
    fn as_attr(&self) -> &'static str {
        match self {
            Self::Blank => "_blank",
            Self::Top => "_top",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    /// Links outside this origin get `target`/`rel` attributes.
    pub local_origin: Option<String>,
    pub external_links: Option<LinkTarget>,
}

impl RenderOptions {
    pub fn external(target: LinkTarget) -> Self {
        Self {
            local_origin: None,
            external_links: Some(target),
        }
    }

    pub fn with_local_origin(mut self, origin: impl Into<String>) -> Self {
        self.local_origin = Some(origin.into());
        self
    }

    fn is_local(&self, href: &str) -> bool {
        match &self.local_origin {
            Some(origin) => href.starts_with(origin.as_str()),
            None => !href.contains("://") && !href.starts_with("//"),
        }
    }
}

/// Removes ```` ```markdown ```` (any case) and then bare ```` ``` ```` markers.
pub fn strip_fences(content: &str) -> String {
    const OPENER: &str = "```markdown";
    let mut out = String::with_capacity(content.len());
    let mut rest = content;
    while let Some(pos) = rest.find("```") {
        out.push_str(&rest[..pos]);
        let after = &rest[pos..];
        let skip = match after.get(..OPENER.len()) {
            Some(head) if head.eq_ignore_ascii_case(OPENER) => OPENER.len(),
            _ => 3,
        };
        rest = &after[skip..];
    }
    out.push_str(rest);
    out
}

fn is_script_url(href: &str) -> bool {
    let scheme = href.trim_start().to_ascii_lowercase();
    ["javascript:", "vbscript:", "data:text/html"]
        .iter()
        .any(|prefix| scheme.starts_with(prefix))
}

fn link_open(dest: &str, title: &str, target: Option<LinkTarget>) -> String {
    let href = if is_script_url(dest) { "#" } else { dest };
    let mut tag = String::from("<a href=\"");
    let _ = escape_href(&mut tag, href);
    tag.push('"');
    if !title.is_empty() {
        tag.push_str(" title=\"");
        let _ = escape_html(&mut tag, title);
        tag.push('"');
    }
    if let Some(target) = target {
        tag.push_str(&format!(
            " target=\"{}\" rel=\"{EXTERNAL_REL}\"",
            target.as_attr()
        ));
    }
    tag.push('>');
    tag
}

/// Renders markdown to HTML with raw HTML escaped.
pub fn render_markdown(source: &str, options: &RenderOptions) -> SafeHtml {
    let events = Parser::new(source).map(|event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        Event::Start(Tag::Link {
            link_type,
            dest_url,
            title,
            ..
        }) if link_type != LinkType::Email => {
            let target = options
                .external_links
                .filter(|_| !options.is_local(&dest_url));
            Event::InlineHtml(CowStr::from(link_open(&dest_url, &title, target)))
        }
        other => other,
    });
    let mut out = String::with_capacity(source.len() * 3 / 2);
    html::push_html(&mut out, events);
    SafeHtml(out)
}

/// Strips code fences and renders, as done for stored resource contents.
pub fn render_content(content: &str, options: &RenderOptions) -> SafeHtml {
    render_markdown(&strip_fences(content), options)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextDirection {
    Ltr,
    Rtl,
}

/// Right-to-left when more than a quarter of the characters are Hebrew.
pub fn text_direction(text: &str) -> TextDirection {
    let total = text.chars().count();
    let hebrew = text
        .chars()
        .filter(|c| ('\u{0590}'..='\u{05FF}').contains(c))
        .count();
    if total > 0 && hebrew * 4 > total {
        TextDirection::Rtl
    } else {
        TextDirection::Ltr
    }
}

/// Cuts to `max` characters and appends `…` when anything was cut.
pub fn ellipsize(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}…", &text[..cut]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fences_are_stripped_case_insensitively() {
        assert_eq!(strip_fences("```Markdown\n# T\n```"), "\n# T\n");
        assert_eq!(strip_fences("a ```py\nx\n``` b"), "a py\nx\n b");
        assert_eq!(strip_fences("plain"), "plain");
    }

    #[test]
    fn raw_html_is_escaped() {
        let html = render_markdown("hi <script>alert(1)</script>", &RenderOptions::default());
        assert!(!html.as_str().contains("<script>"));
        assert!(html.as_str().contains("&lt;script&gt;"));
    }

    #[test]
    fn markdown_renders() {
        let html = render_markdown("**bold** and *it*", &RenderOptions::default());
        assert_eq!(
            html.as_str(),
            "<p><strong>bold</strong> and <em>it</em></p>\n"
        );
    }

    #[test]
    fn external_links_get_target_and_rel() {
        let options = RenderOptions::external(LinkTarget::Top);
        let html = render_markdown("[src](https://data.gov.il/x)", &options);
        assert_eq!(
            html.as_str(),
            "<p><a href=\"https://data.gov.il/x\" target=\"_top\" rel=\"noreferrer noopener nofollow\">src</a></p>\n"
        );
    }

    #[test]
    fn local_links_are_left_alone() {
        let options = RenderOptions::external(LinkTarget::Blank).with_local_origin("https://ask.example");
        let html = render_markdown("[a](https://ask.example/gov/a/1)", &options);
        assert_eq!(
            html.as_str(),
            "<p><a href=\"https://ask.example/gov/a/1\">a</a></p>\n"
        );
    }

    #[test]
    fn link_attributes_are_escaped() {
        let html = render_markdown(
            "[x](https://a.example/?q=1&r=\"2\" \"say \\\"hi\\\" <b>\")",
            &RenderOptions::default(),
        );
        assert_eq!(
            html.as_str(),
            "<p><a href=\"https://a.example/?q=1&amp;r=%222%22\" title=\"say &quot;hi&quot; &lt;b&gt;\">x</a></p>\n"
        );
    }

    #[test]
    fn script_urls_are_neutralised() {
        let html = render_markdown("[x](javascript:alert(1))", &RenderOptions::default());
        assert!(html.as_str().contains("href=\"#\""));
    }

    #[test]
    fn content_rendering_strips_fences_first() {
        let html = render_content("```markdown\n# Title\n```", &RenderOptions::default());
        assert_eq!(html.as_str(), "<h1>Title</h1>\n");
    }

    #[test]
    fn direction_threshold() {
        assert_eq!(text_direction("שלום world"), TextDirection::Rtl);
        assert_eq!(text_direction("hello world, ש"), TextDirection::Ltr);
        assert_eq!(text_direction(""), TextDirection::Ltr);
    }

    #[test]
    fn ellipsize_counts_characters() {
        assert_eq!(ellipsize("short", 100), "short");
        assert_eq!(ellipsize("abcdef", 3), "abc…");
        assert_eq!(ellipsize("שלום עולם", 4), "שלום…");
    }
}
