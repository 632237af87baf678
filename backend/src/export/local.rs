//! Local PDF rendering with lopdf.
//!
//! Renders one tab as plain text pages: Helvetica, fixed leading, a new page
//! at every page break and whenever the cursor reaches the bottom margin.
//! Formatting is not reproduced.

use async_trait::async_trait;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document as PdfDocument, Object, ObjectId, Stream, StringFormat};
use std::sync::Arc;

use crate::error::{ExportError, ExportResult};
use crate::models::{Body, Element};
use crate::store::{AuthContext, DocumentStore, PdfExporter};

const MARGIN: f32 = 56.0;
const FONT_SIZE: f32 = 11.0;
const LEADING: f32 = 14.0;
const LIST_INDENT: f32 = 18.0;
/// Rough Helvetica advance width as a fraction of the font size.
const AVG_CHAR_WIDTH: f32 = 0.5;

/// A positioned line of text.
#[derive(Debug, Clone, PartialEq)]
struct Line {
    x: f32,
    y: f32,
    text: String,
}

/// Exporter that renders documents from a [`DocumentStore`] in process.
pub struct LocalPdfExporter {
    documents: Arc<dyn DocumentStore>,
}

impl LocalPdfExporter {
    pub fn new(documents: Arc<dyn DocumentStore>) -> Self {
        Self { documents }
    }
}

#[async_trait]
impl PdfExporter for LocalPdfExporter {
    async fn export_pdf(&self, auth: &AuthContext, document_id: &str, tab_id: &str) -> ExportResult<Vec<u8>> {
        let document = self.documents.open_document(auth, document_id).await?;
        let tab = document
            .tabs
            .iter()
            .find(|t| t.id == tab_id)
            .ok_or_else(|| ExportError::Render(format!("tab {} not found in {}", tab_id, document_id)))?;
        render_body(&tab.body)
    }
}

/// Lay out the body into pages of positioned lines.
fn paginate(body: &Body) -> Vec<Vec<Line>> {
    let width = body.page_width as f32;
    let height = body.page_height as f32;
    let top = height - MARGIN;
    let mut pages: Vec<Vec<Line>> = vec![Vec::new()];
    let mut y = top;

    let emit = |pages: &mut Vec<Vec<Line>>, y: &mut f32, x: f32, text: String| {
        if *y < MARGIN {
            pages.push(Vec::new());
            *y = top;
        }
        if let Some(page) = pages.last_mut() {
            page.push(Line { x, y: *y, text });
        }
        *y -= LEADING;
    };

    for element in &body.children {
        match element {
            Element::Paragraph { page_break: true, .. } => {
                pages.push(Vec::new());
                y = top;
            }
            Element::Paragraph { text, .. } => {
                for line in wrap(text, width - 2.0 * MARGIN) {
                    emit(&mut pages, &mut y, MARGIN, line);
                }
            }
            Element::ListItem { text, nesting_level } => {
                let x = MARGIN + LIST_INDENT * (*nesting_level as f32 + 1.0);
                let bulleted = format!("\u{2022} {}", text);
                for line in wrap(&bulleted, width - x - MARGIN) {
                    emit(&mut pages, &mut y, x, line);
                }
            }
            Element::Table { rows } => {
                for row in rows {
                    for line in wrap(&row.join("  |  "), width - 2.0 * MARGIN) {
                        emit(&mut pages, &mut y, MARGIN, line);
                    }
                }
            }
            Element::InlineImage { alt_text, .. } => {
                let label = match alt_text {
                    Some(alt) if !alt.is_empty() => format!("[image: {}]", alt),
                    _ => "[image]".to_string(),
                };
                emit(&mut pages, &mut y, MARGIN, label);
            }
            Element::Unsupported { .. } => {}
        }
    }
    pages
}

/// Greedy word wrap on an estimated character budget. Empty text keeps one blank line.
fn wrap(text: &str, available: f32) -> Vec<String> {
    let budget = ((available / (FONT_SIZE * AVG_CHAR_WIDTH)) as usize).max(1);
    let mut lines = Vec::new();
    for raw_line in text.split('\n') {
        let mut current = String::new();
        for word in raw_line.split(' ') {
            let needed = current.chars().count() + word.chars().count() + usize::from(!current.is_empty());
            if !current.is_empty() && needed > budget {
                lines.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
        }
        lines.push(current);
    }
    lines
}

/// Encode text for the WinAnsi-encoded standard font.
///
/// Characters outside Windows-1252 become `?`.
fn win_ansi(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    let mut buf = [0u8; 4];
    for ch in text.chars() {
        let (bytes, _, unmappable) = encoding_rs::WINDOWS_1252.encode(ch.encode_utf8(&mut buf));
        if unmappable {
            out.push(b'?');
        } else {
            out.extend_from_slice(&bytes);
        }
    }
    out
}

/// Render a body to PDF bytes.
pub fn render_body(body: &Body) -> ExportResult<Vec<u8>> {
    let render_err = |e: lopdf::Error| ExportError::Render(e.to_string());

    let mut doc = PdfDocument::with_version("1.7");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });
    let media_box: Vec<Object> = vec![
        0.into(),
        0.into(),
        (body.page_width as f32).into(),
        (body.page_height as f32).into(),
    ];

    let mut page_ids: Vec<Object> = Vec::new();
    for lines in paginate(body) {
        let mut operations = Vec::with_capacity(lines.len() * 4 + 2);
        operations.push(Operation::new("BT", vec![]));
        operations.push(Operation::new("Tf", vec!["F1".into(), FONT_SIZE.into()]));
        for line in &lines {
            // Tm sets an absolute position for each line
            operations.push(Operation::new(
                "Tm",
                vec![1.into(), 0.into(), 0.into(), 1.into(), line.x.into(), line.y.into()],
            ));
            operations.push(Operation::new(
                "Tj",
                vec![Object::String(win_ansi(&line.text), StringFormat::Literal)],
            ));
        }
        operations.push(Operation::new("ET", vec![]));

        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().map_err(render_err)?));
        let page_id: ObjectId = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => media_box.clone(),
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        page_ids.push(page_id.into());
    }

    let count = page_ids.len() as i64;
    doc.objects.insert(
        pages_id,
        dictionary! {
            "Type" => "Pages",
            "Kids" => page_ids,
            "Count" => count,
        }
        .into(),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| ExportError::Render(e.to_string()))?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryWorkspace;

    fn page_count(bytes: &[u8]) -> usize {
        PdfDocument::load_mem(bytes).unwrap().get_pages().len()
    }

    #[test]
    fn test_win_ansi_replaces_unmappable() {
        assert_eq!(win_ansi("Café €5"), b"Caf\xe9 \x805".to_vec());
        assert_eq!(win_ansi("山田様 a"), b"??? a".to_vec());
    }

    #[test]
    fn test_wrap() {
        assert_eq!(wrap("", 100.0), vec![""]);
        // 100pt / 5.5pt per char = 18 chars per line
        let lines = wrap("aaaa bbbb cccc dddd eeee", 100.0);
        assert_eq!(lines, vec!["aaaa bbbb cccc", "dddd eeee"]);
    }

    #[test]
    fn test_page_break_starts_new_page() {
        let mut body = Body::with_children(vec![Element::paragraph("first")]);
        body.append_page_break();
        body.append(Element::paragraph("second"));
        let pages = paginate(&body);
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[1][0].text, "second");

        let bytes = render_body(&body).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
        assert_eq!(page_count(&bytes), 2);
    }

    #[test]
    fn test_overflow_starts_new_page() {
        let children = (0..200).map(|i| Element::paragraph(format!("line {i}"))).collect();
        let pages = paginate(&Body::with_children(children));
        assert!(pages.len() > 1);
        assert!(pages.iter().flatten().all(|l| l.y >= MARGIN));
    }

    #[test]
    fn test_unsupported_elements_are_not_rendered() {
        let body = Body::with_children(vec![
            Element::Unsupported { kind: "equation".into() },
            Element::InlineImage {
                uri: "x".into(),
                width: 1.0,
                height: 1.0,
                alt_text: Some("logo".into()),
            },
        ]);
        let pages = paginate(&body);
        assert_eq!(pages[0].len(), 1);
        assert_eq!(pages[0][0].text, "[image: logo]");
    }

    #[tokio::test]
    async fn test_export_through_store() {
        let ws = Arc::new(MemoryWorkspace::new());
        let doc = ws
            .create_document("d", None, Body::with_children(vec![Element::paragraph("hello")]))
            .unwrap();
        let exporter = LocalPdfExporter::new(ws.clone());
        let auth = AuthContext::bearer("t");
        let bytes = exporter.export_pdf(&auth, &doc.id, "t.0").await.unwrap();
        assert_eq!(page_count(&bytes), 1);
        assert!(exporter.export_pdf(&auth, &doc.id, "t.9").await.is_err());
    }
}
