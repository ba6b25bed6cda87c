use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Annotations {
    pub bold: bool,
    pub italic: bool,
    pub strikethrough: bool,
    pub underline: bool,
    pub code: bool,
    pub color: String,
}

impl Default for Annotations {
    fn default() -> Self {
        Self {
            bold: false,
            italic: false,
            strikethrough: false,
            underline: false,
            code: false,
            color: "default".to_string(),
        }
    }
}

/// One inline fragment of styled text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawRichText")]
pub struct RichTextSpan {
    pub content: String,
    pub link: Option<String>,
    pub annotations: Annotations,
}

impl RichTextSpan {
    pub fn plain(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            link: None,
            annotations: Annotations::default(),
        }
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }

    pub fn with_annotations(mut self, annotations: Annotations) -> Self {
        self.annotations = annotations;
        self
    }
}

// Accepts both the API item (`text.content`, `plain_text`, `href`) and our own serialized form.
#[derive(Deserialize)]
struct RawRichText {
    text: Option<RawText>,
    plain_text: Option<String>,
    href: Option<String>,
    content: Option<String>,
    link: Option<String>,
    #[serde(default)]
    annotations: Annotations,
}

#[derive(Deserialize)]
struct RawText {
    content: String,
    link: Option<RawLink>,
}

#[derive(Deserialize)]
struct RawLink {
    url: String,
}

impl From<RawRichText> for RichTextSpan {
    fn from(raw: RawRichText) -> Self {
        let (text_content, text_link) = match raw.text {
            Some(text) => (Some(text.content), text.link.map(|l| l.url)),
            None => (None, None),
        };
        Self {
            content: text_content
                .or(raw.content)
                .or(raw.plain_text)
                .unwrap_or_default(),
            link: text_link.or(raw.link).or(raw.href),
            annotations: raw.annotations,
        }
    }
}

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Renders spans to inline HTML.
///
/// Tags nest innermost to outermost as code, em, strong, s, u, then the link.
pub fn render_rich_text(spans: &[RichTextSpan]) -> String {
    spans.iter().map(render_span).collect()
}

fn render_span(span: &RichTextSpan) -> String {
    let a = &span.annotations;
    let mut html = escape_html(&span.content);

    for (enabled, tag) in [
        (a.code, "code"),
        (a.italic, "em"),
        (a.bold, "strong"),
        (a.strikethrough, "s"),
        (a.underline, "u"),
    ] {
        if enabled {
            html = format!("<{tag}>{html}</{tag}>");
        }
    }

    if let Some(link) = &span.link {
        html = format!(
            r#"<a href="{}" target="_blank" rel="noopener noreferrer">{}</a>"#,
            escape_html(link),
            html
        );
    }

    html
}
