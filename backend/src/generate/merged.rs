//! One output document holding every row.
//!
//! The first row is substituted straight into the merged copy. Every later
//! row gets a page break, then its own scratch copy of the template: the row
//! is substituted there, the copy is saved and reopened, and its top-level
//! elements are appended to the merged body. Substituting in isolation keeps
//! one row's leftover placeholders away from content already merged.

use futures::FutureExt;
use std::panic::AssertUnwindSafe;

use super::output::{finalize_output, settle, timestamp, CreatedFiles};
use super::working_tab;
use crate::api::logs::{log_info, log_info_indent};
use crate::error::{GenerationError, GenerationOutcome};
use crate::layout::apply_page_size;
use crate::models::{Body, Element, GenerationResult, OutputConfig};
use crate::store::{AuthContext, Collaborators};
use crate::substitute::substitute_body;

pub const MERGED_NAME_PREFIX: &str = "MergedOutput";

/// Append transplantable elements to `body` in order.
///
/// Returns how many elements were skipped as unsupported.
pub fn transplant(body: &mut Body, elements: Vec<Element>) -> usize {
    let mut skipped = 0;
    for element in elements {
        match element {
            Element::Paragraph { .. }
            | Element::Table { .. }
            | Element::ListItem { .. }
            | Element::InlineImage { .. } => body.append(element),
            Element::Unsupported { kind } => {
                log_info_indent(format!("Skipping unsupported {} element", kind), 2);
                skipped += 1;
            }
        }
    }
    skipped
}

/// Generate one document for all rows, in row order.
///
/// Never fails: faults come back as `success = false`. Scratch copies are
/// trashed whatever happens, and the merged copy is trashed if the merge
/// does not complete.
pub async fn generate_merged_document(
    c: &Collaborators,
    auth: &AuthContext,
    template_id: &str,
    folder_id: &str,
    rows: &[Vec<String>],
    headers: &[String],
    config: &OutputConfig,
) -> GenerationResult {
    let mut created = CreatedFiles::default();
    let run = produce(c, auth, template_id, folder_id, rows, headers, config, &mut created);
    let outcome = AssertUnwindSafe(run).catch_unwind().await;
    settle(c, auth, outcome, created).await
}

#[allow(clippy::too_many_arguments)]
async fn produce(
    c: &Collaborators,
    auth: &AuthContext,
    template_id: &str,
    folder_id: &str,
    rows: &[Vec<String>],
    headers: &[String],
    config: &OutputConfig,
    created: &mut CreatedFiles,
) -> GenerationOutcome<GenerationResult> {
    let name = format!("{}_{}", MERGED_NAME_PREFIX, timestamp());
    log_info(format!("📚 Merging {} rows into {}", rows.len(), name));

    let copy = c.files.copy_file(auth, template_id, &name, Some(folder_id)).await?;
    created.output = Some(copy.id.clone());

    let mut merged = c.documents.open_document(auth, &copy.id).await?;
    let body = working_tab(&mut merged)?;
    apply_page_size(body, config);
    if let Some(first) = rows.first() {
        substitute_body(body, first, headers)?;
    }

    for (i, row) in rows.iter().enumerate().skip(1) {
        log_info_indent(format!("Row {}/{}", i + 1, rows.len()), 1);
        working_tab(&mut merged)?.append_page_break();
        let elements = substitute_in_scratch(c, auth, template_id, i, row, headers, created).await?;
        transplant(working_tab(&mut merged)?, elements);
    }

    c.documents.save_document(auth, &merged).await?;
    finalize_output(c, auth, folder_id, &copy, config, created).await
}

/// Substitute one row into a scratch copy and return its top-level elements.
async fn substitute_in_scratch(
    c: &Collaborators,
    auth: &AuthContext,
    template_id: &str,
    index: usize,
    row: &[String],
    headers: &[String],
    created: &mut CreatedFiles,
) -> GenerationOutcome<Vec<Element>> {
    let scratch = c
        .files
        .copy_file(auth, template_id, &format!("temp_{}", index), None)
        .await?;
    created.track_scratch(&scratch.id);

    let mut document = c.documents.open_document(auth, &scratch.id).await?;
    substitute_body(working_tab(&mut document)?, row, headers)?;
    c.documents.save_document(auth, &document).await?;

    let reopened = c.documents.open_document(auth, &scratch.id).await?;
    let elements = reopened
        .tabs
        .into_iter()
        .next()
        .map(|tab| tab.body.children)
        .ok_or_else(|| GenerationError::EmptyTemplate(scratch.id.clone()))?;

    created.release_scratch(c, auth, &scratch.id).await;
    Ok(elements)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{OutputType, Orientation};
    use crate::store::DocumentStore;
    use crate::test_support::{grid, FailingExporter, Fixture, FlakyDocs};
    use std::sync::Arc;

    #[test]
    fn test_transplant_skips_unsupported() {
        let mut body = Body::default();
        let skipped = transplant(
            &mut body,
            vec![
                Element::paragraph("a"),
                Element::Unsupported {
                    kind: "footnote".into(),
                },
                Element::Table {
                    rows: vec![vec!["x".into()]],
                },
                Element::InlineImage {
                    uri: "img.png".into(),
                    width: 10.0,
                    height: 10.0,
                    alt_text: None,
                },
                Element::list_item("b"),
            ],
        );
        assert_eq!(skipped, 1);
        let kinds: Vec<&str> = body.children.iter().map(Element::kind).collect();
        assert_eq!(kinds, vec!["paragraph", "table", "inline image", "list item"]);
    }

    #[tokio::test]
    async fn test_merge_preserves_order_with_page_breaks() {
        let fx = Fixture::new();
        let rows = grid(&[&["1", "", "Alice"], &["2", "", "Bob"], &["3", "", "Carol"]]);
        let result = generate_merged_document(
            &fx.collaborators,
            &fx.auth,
            &fx.template.id,
            &fx.folder.id,
            &rows,
            &fx.headers(),
            &OutputConfig::default(),
        )
        .await;
        assert!(result.success, "{}", result.error);
        assert!(result.file_name.starts_with("MergedOutput_"));

        let outputs = fx.outputs();
        assert_eq!(outputs.len(), 1);
        let merged = fx.workspace.open_document(&fx.auth, &outputs[0].id).await.unwrap();
        let body = merged.body().unwrap();
        assert_eq!(body.page_break_count(), 2);

        // Base copy keeps all 3 elements; later rows lose the unsupported one
        assert_eq!(body.children.len(), 3 + 2 * 3);
        let texts: Vec<String> = body
            .children
            .iter()
            .filter(|e| !e.is_page_break())
            .map(Element::text)
            .filter(|t| !t.is_empty())
            .collect();
        assert_eq!(
            texts,
            vec![
                "Dear Alice,",
                "Reference 1",
                "Dear Bob,",
                "Reference 2",
                "Dear Carol,",
                "Reference 3"
            ]
        );
        // Every scratch copy is gone
        assert!(fx.strays().is_empty());
    }

    #[tokio::test]
    async fn test_single_row_has_no_page_break() {
        let fx = Fixture::new();
        let config = OutputConfig {
            orientation: Orientation::Landscape,
            ..Default::default()
        };
        let result = generate_merged_document(
            &fx.collaborators,
            &fx.auth,
            &fx.template.id,
            &fx.folder.id,
            &grid(&[&["1", "", "Alice"]]),
            &fx.headers(),
            &config,
        )
        .await;
        assert!(result.success, "{}", result.error);
        let merged = fx.workspace.open_document(&fx.auth, &fx.outputs()[0].id).await.unwrap();
        let body = merged.body().unwrap();
        assert_eq!(body.page_break_count(), 0);
        assert_eq!(body.page_width, 841.89);
    }

    #[tokio::test]
    async fn test_pdf_merge() {
        let fx = Fixture::new();
        let config = OutputConfig {
            output_type: OutputType::Pdf,
            ..Default::default()
        };
        let result = generate_merged_document(
            &fx.collaborators,
            &fx.auth,
            &fx.template.id,
            &fx.folder.id,
            &grid(&[&["1", "", "Alice"], &["2", "", "Bob"]]),
            &fx.headers(),
            &config,
        )
        .await;
        assert!(result.success, "{}", result.error);
        assert!(result.file_name.ends_with(".pdf"));
        let outputs = fx.outputs();
        assert_eq!(outputs.len(), 1);
        let pdf = lopdf::Document::load_mem(&fx.workspace.blob(&outputs[0].id).unwrap()).unwrap();
        assert_eq!(pdf.get_pages().len(), 2);
        assert!(fx.strays().is_empty());
    }

    #[tokio::test]
    async fn test_failed_merge_leaves_nothing_behind() {
        let fx = Fixture::new();
        let mut collaborators = fx.collaborators.clone();
        collaborators.exporter = Arc::new(FailingExporter);
        let config = OutputConfig {
            output_type: OutputType::Pdf,
            ..Default::default()
        };
        let result = generate_merged_document(
            &collaborators,
            &fx.auth,
            &fx.template.id,
            &fx.folder.id,
            &grid(&[&["1", "", "Alice"], &["2", "", "Bob"]]),
            &fx.headers(),
            &config,
        )
        .await;
        assert!(!result.success);
        assert!(result.error.contains("export backend down"));
        assert!(fx.outputs().is_empty());
        assert!(fx.strays().is_empty());
    }

    async fn merge_three_with(fx: &Fixture, documents: FlakyDocs) -> GenerationResult {
        let mut collaborators = fx.collaborators.clone();
        collaborators.documents = Arc::new(documents);
        generate_merged_document(
            &collaborators,
            &fx.auth,
            &fx.template.id,
            &fx.folder.id,
            &grid(&[&["1", "", "Alice"], &["2", "", "Bob"], &["3", "", "Carol"]]),
            &fx.headers(),
            &OutputConfig::default(),
        )
        .await
    }

    #[tokio::test]
    async fn test_scratch_save_failure_cleans_up() {
        let fx = Fixture::new();
        let result = merge_three_with(&fx, FlakyDocs::failing(fx.workspace.clone(), "temp_2")).await;
        assert!(!result.success);
        assert!(result.error.contains("scratch save failed"), "{}", result.error);
        // temp_1 was released, temp_2 is discarded on the way out
        assert!(fx.outputs().is_empty());
        assert!(fx.strays().is_empty());
    }

    #[tokio::test]
    async fn test_scratch_save_panic_cleans_up() {
        let fx = Fixture::new();
        let result = merge_three_with(&fx, FlakyDocs::panicking(fx.workspace.clone(), "temp_2")).await;
        assert!(!result.success);
        assert!(result.error.contains("document backend exploded"), "{}", result.error);
        assert!(fx.outputs().is_empty());
        assert!(fx.strays().is_empty());
    }
}
