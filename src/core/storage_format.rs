//! Converts generated documents into Confluence storage format.

use regex::Regex;
use std::sync::OnceLock;

fn heading_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?s)(<h[1-3][^>]*>.*?</h[1-3]>)").expect("valid heading pattern"))
}

fn blank_lines_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\n\s*\n\s*\n+").expect("valid blank line pattern"))
}

fn bold_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\*\*(.+?)\*\*").expect("valid bold pattern"))
}

fn code_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"`([^`]+)`").expect("valid code pattern"))
}

fn h1_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?s)<h1[^>]*>(.*?)</h1>").expect("valid h1 pattern"))
}

/// Anything that already carries block-level tags is treated as HTML.
pub fn is_html(content: &str) -> bool {
    ["<h1", "<h2", "<h3", "<p>", "<div", "<ul>", "<ol>", "<table"]
        .iter()
        .any(|tag| content.contains(tag))
}

/// 標題前後加換行，再把多餘空行壓成一行
pub fn html_to_storage(html: &str) -> String {
    let spaced = heading_pattern().replace_all(html, "\n$1\n");
    blank_lines_pattern()
        .replace_all(&spaced, "\n\n")
        .trim()
        .to_string()
}

/// Storage format is XHTML, so text must not carry bare `&`, `<` or `>`.
pub fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn looks_like_tag(line: &str) -> bool {
    let mut chars = line.chars();
    chars.next() == Some('<')
        && chars
            .next()
            .map(|c| c.is_ascii_alphabetic() || c == '/' || c == '!')
            .unwrap_or(false)
}

fn inline(text: &str) -> String {
    let escaped = xml_escape(text);
    let bold = bold_pattern().replace_all(&escaped, "<strong>$1</strong>");
    code_pattern().replace_all(&bold, "<code>$1</code>").to_string()
}

#[derive(PartialEq)]
enum Block {
    None,
    Paragraph,
    Bullets,
    Numbers,
}

fn close(block: &mut Block, out: &mut Vec<String>) {
    match block {
        Block::Paragraph => out.push("</p>".to_string()),
        Block::Bullets => out.push("</ul>".to_string()),
        Block::Numbers => out.push("</ol>".to_string()),
        Block::None => {}
    }
    *block = Block::None;
}

fn numbered_item(line: &str) -> Option<&str> {
    let (number, rest) = line.split_once(". ")?;
    if !number.is_empty() && number.chars().all(|c| c.is_ascii_digit()) {
        Some(rest)
    } else {
        None
    }
}

/// Basic Markdown: headers, bold, inline code, bullet and numbered lists, paragraphs.
pub fn markdown_to_html(markdown: &str) -> String {
    let mut out = Vec::new();
    let mut block = Block::None;

    for raw in markdown.lines() {
        let line = raw.trim();

        if line.is_empty() {
            close(&mut block, &mut out);
            continue;
        }

        if let Some(level) = ["### ", "## ", "# "].iter().position(|p| line.starts_with(p)) {
            close(&mut block, &mut out);
            let depth = 3 - level;
            let text = line.trim_start_matches('#').trim();
            out.push(format!("<h{d}>{}</h{d}>", inline(text), d = depth));
            continue;
        }

        if let Some(item) = line.strip_prefix("- ").or_else(|| line.strip_prefix("* ")) {
            if block != Block::Bullets {
                close(&mut block, &mut out);
                out.push("<ul>".to_string());
                block = Block::Bullets;
            }
            out.push(format!("<li>{}</li>", inline(item)));
            continue;
        }

        if let Some(item) = numbered_item(line) {
            if block != Block::Numbers {
                close(&mut block, &mut out);
                out.push("<ol>".to_string());
                block = Block::Numbers;
            }
            out.push(format!("<li>{}</li>", inline(item)));
            continue;
        }

        // raw HTML lines pass through untouched
        if looks_like_tag(line) {
            close(&mut block, &mut out);
            out.push(line.to_string());
            continue;
        }

        if block == Block::Paragraph {
            out.push("<br/>".to_string());
        } else {
            close(&mut block, &mut out);
            out.push("<p>".to_string());
            block = Block::Paragraph;
        }
        out.push(inline(line));
    }
    close(&mut block, &mut out);

    out.join("\n")
}

/// Markdown or HTML in, storage format out.
pub fn to_storage(content: &str) -> String {
    if is_html(content) {
        html_to_storage(content)
    } else {
        html_to_storage(&markdown_to_html(content))
    }
}

pub fn image_macro(filename: &str) -> String {
    format!(
        "<ac:image ac:width=\"800\"><ri:attachment ri:filename=\"{}\"/></ac:image>",
        xml_escape(filename)
    )
}

/// Appends a screenshot section embedding each uploaded attachment.
/// `attachments` pairs the uploaded file name with the original name shown in the heading.
pub fn embed_images(content: &str, attachments: &[(String, String)]) -> String {
    if attachments.is_empty() {
        return content.to_string();
    }

    let mut out = String::from(content.trim_end());
    out.push_str("\n\n<h2>Dashboard Screenshots</h2>\n");
    for (i, (uploaded, display)) in attachments.iter().enumerate() {
        out.push_str(&format!("<h3>View {}: {}</h3>\n", i + 1, xml_escape(display)));
        out.push_str(&format!("<p>{}</p>\n", image_macro(uploaded)));
    }
    out
}

fn strip_tags(text: &str) -> String {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"<[^>]+>").expect("valid tag pattern"))
        .replace_all(text, "")
        .trim()
        .to_string()
}

/// Title from the first `# ` line or `<h1>` element.
pub fn extract_title(content: &str) -> Option<String> {
    for line in content.lines() {
        if let Some(title) = line.trim().strip_prefix("# ") {
            let title = title.trim();
            if !title.is_empty() {
                return Some(title.to_string());
            }
        }
    }

    h1_pattern()
        .captures(content)
        .map(|caps| strip_tags(&caps[1]))
        .filter(|title| !title.is_empty())
}
