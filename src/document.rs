//! Printable documents built from generated text.
//!
//! A section body is split into paragraphs on blank lines, and each paragraph
//! into plain text and LaTeX math (`$...$` inline, `$$...$$` display). Page
//! layout and math rasterization happen downstream; this module produces the
//! block structure and a Markdown rendering of it.

use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

static PARAGRAPH_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n[ \t]*\n").expect("paragraph pattern"));

// Display math first so `$$x$$` is never read as two empty inline spans.
static MATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)\$\$(.+?)\$\$|\$([^$\n]+?)\$").expect("math pattern")
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "content", rename_all = "camelCase")]
pub enum Segment {
    Text(String),
    InlineMath(String),
    DisplayMath(String),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionInput {
    #[serde(default)]
    pub heading: String,
    #[serde(default)]
    pub body: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentInput {
    pub title: String,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub sections: Vec<SectionInput>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedSection {
    pub heading: String,
    pub paragraphs: Vec<Vec<Segment>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedDocument {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    pub generated_at: String,
    pub sections: Vec<RenderedSection>,
}

impl RenderedDocument {
    pub fn math_count(&self) -> usize {
        self.sections
            .iter()
            .flat_map(|s| s.paragraphs.iter())
            .flat_map(|p| p.iter())
            .filter(|seg| !matches!(seg, Segment::Text(_)))
            .count()
    }
}

pub fn split_paragraphs(body: &str) -> Vec<String> {
    let normalized = body.replace("\r\n", "\n");
    PARAGRAPH_BREAK
        .split(&normalized)
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .map(|p| p.to_string())
        .collect()
}

pub fn segment_paragraph(paragraph: &str) -> Vec<Segment> {
    let mut out = Vec::new();
    let mut last = 0;
    for caps in MATH.captures_iter(paragraph) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        if whole.start() > last {
            out.push(Segment::Text(paragraph[last..whole.start()].to_string()));
        }
        if let Some(display) = caps.get(1) {
            out.push(Segment::DisplayMath(display.as_str().trim().to_string()));
        } else if let Some(inline) = caps.get(2) {
            out.push(Segment::InlineMath(inline.as_str().trim().to_string()));
        }
        last = whole.end();
    }
    if last < paragraph.len() {
        out.push(Segment::Text(paragraph[last..].to_string()));
    }
    out
}

pub fn render(input: &DocumentInput) -> RenderedDocument {
    let sections = input
        .sections
        .iter()
        .map(|s| RenderedSection {
            heading: s.heading.trim().to_string(),
            paragraphs: split_paragraphs(&s.body)
                .iter()
                .map(|p| segment_paragraph(p))
                .collect(),
        })
        .collect();
    RenderedDocument {
        id: Uuid::new_v4().to_string(),
        title: input.title.trim().to_string(),
        subtitle: input
            .subtitle
            .as_ref()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()),
        generated_at: Utc::now().to_rfc3339(),
        sections,
    }
}

pub fn to_markdown(doc: &RenderedDocument) -> String {
    let mut md = format!("# {}\n\n", doc.title);
    if let Some(sub) = &doc.subtitle {
        md.push_str(&format!("_{}_\n\n", sub));
    }
    for section in &doc.sections {
        if !section.heading.is_empty() {
            md.push_str(&format!("## {}\n\n", section.heading));
        }
        for paragraph in &section.paragraphs {
            let mut line = String::new();
            for seg in paragraph {
                match seg {
                    Segment::Text(t) => line.push_str(t),
                    Segment::InlineMath(m) => line.push_str(&format!("${}$", m)),
                    Segment::DisplayMath(m) => {
                        if !line.trim().is_empty() {
                            md.push_str(line.trim());
                            md.push_str("\n\n");
                        }
                        line.clear();
                        md.push_str(&format!("**Formula:**\n\n$$\n{}\n$$\n\n", m));
                    }
                }
            }
            if !line.trim().is_empty() {
                md.push_str(line.trim());
                md.push_str("\n\n");
            }
        }
    }
    md
}
