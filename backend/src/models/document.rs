//! Template document tree.
//!
//! A [`Document`] owns one or more [`Tab`]s; generation always works on the
//! first tab's [`Body`]. Body children form a closed set of [`Element`] kinds,
//! so every consumer matches exhaustively and decides explicitly what to do
//! with [`Element::Unsupported`].

use serde::{Deserialize, Serialize};

/// An editable document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: String,
    pub name: String,
    pub tabs: Vec<Tab>,
}

impl Document {
    /// Create a single-tab document.
    pub fn new(id: impl Into<String>, name: impl Into<String>, body: Body) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            tabs: vec![Tab {
                id: "t.0".to_string(),
                title: "Tab 1".to_string(),
                body,
            }],
        }
    }

    /// The first tab, which is what generation and export target.
    pub fn first_tab(&self) -> Option<&Tab> {
        self.tabs.first()
    }

    pub fn body(&self) -> Option<&Body> {
        self.tabs.first().map(|t| &t.body)
    }

    pub fn body_mut(&mut self) -> Option<&mut Body> {
        self.tabs.first_mut().map(|t| &mut t.body)
    }
}

/// An independently addressable content partition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Tab {
    pub id: String,
    pub title: String,
    pub body: Body,
}

/// Page geometry plus the ordered top-level elements.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Body {
    /// Points
    pub page_width: f64,
    /// Points
    pub page_height: f64,
    pub children: Vec<Element>,
}

impl Default for Body {
    fn default() -> Self {
        Self {
            page_width: 595.276,
            page_height: 841.89,
            children: Vec::new(),
        }
    }
}

impl Body {
    pub fn with_children(children: Vec<Element>) -> Self {
        Self {
            children,
            ..Default::default()
        }
    }

    /// Rendered text of the body, one line per top-level element.
    pub fn text(&self) -> String {
        self.children
            .iter()
            .map(Element::text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn append(&mut self, element: Element) {
        self.children.push(element);
    }

    /// Append an empty paragraph carrying a page break.
    pub fn append_page_break(&mut self) {
        self.children.push(Element::Paragraph {
            text: String::new(),
            page_break: true,
        });
    }

    /// Number of page breaks among the top-level children.
    pub fn page_break_count(&self) -> usize {
        self.children.iter().filter(|e| e.is_page_break()).count()
    }

    /// Apply `f` to every text node in the body.
    pub fn for_each_text_mut(&mut self, mut f: impl FnMut(&mut String)) {
        for element in &mut self.children {
            match element {
                Element::Paragraph { text, .. } | Element::ListItem { text, .. } => f(text),
                Element::Table { rows } => {
                    for cell in rows.iter_mut().flatten() {
                        f(cell);
                    }
                }
                Element::InlineImage { alt_text, .. } => {
                    if let Some(alt) = alt_text {
                        f(alt);
                    }
                }
                Element::Unsupported { .. } => {}
            }
        }
    }
}

/// A top-level body element.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Element {
    #[serde(rename_all = "camelCase")]
    Paragraph {
        text: String,
        #[serde(default)]
        page_break: bool,
    },
    Table {
        rows: Vec<Vec<String>>,
    },
    #[serde(rename_all = "camelCase")]
    ListItem {
        text: String,
        #[serde(default)]
        nesting_level: u8,
    },
    #[serde(rename_all = "camelCase")]
    InlineImage {
        uri: String,
        width: f64,
        height: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        alt_text: Option<String>,
    },
    /// Any element kind the engine does not transplant (TOC, equations, ...)
    Unsupported {
        kind: String,
    },
}

impl Element {
    pub fn paragraph(text: impl Into<String>) -> Self {
        Element::Paragraph {
            text: text.into(),
            page_break: false,
        }
    }

    pub fn list_item(text: impl Into<String>) -> Self {
        Element::ListItem {
            text: text.into(),
            nesting_level: 0,
        }
    }

    /// Plain text of the element.
    pub fn text(&self) -> String {
        match self {
            Element::Paragraph { text, .. } | Element::ListItem { text, .. } => text.clone(),
            Element::Table { rows } => rows
                .iter()
                .map(|row| row.join("\t"))
                .collect::<Vec<_>>()
                .join("\n"),
            Element::InlineImage { alt_text, .. } => alt_text.clone().unwrap_or_default(),
            Element::Unsupported { .. } => String::new(),
        }
    }

    pub fn is_page_break(&self) -> bool {
        matches!(self, Element::Paragraph { page_break: true, .. })
    }

    /// Short kind name used in logs.
    pub fn kind(&self) -> &str {
        match self {
            Element::Paragraph { .. } => "paragraph",
            Element::Table { .. } => "table",
            Element::ListItem { .. } => "list item",
            Element::InlineImage { .. } => "inline image",
            Element::Unsupported { kind } => kind,
        }
    }
}
