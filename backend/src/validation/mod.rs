//! Pre-generation validation gate.
//!
//! [`validate_and_fetch_data`] checks the three user references, reads the
//! data sheet, and cross-checks template placeholders against the sheet
//! headers. It runs in stages and stops at the first stage that reports a
//! problem:
//!
//! 1. Resolve template, data and destination references
//! 2. Check each resource exists, is reachable and has the right kind
//! 3. Select the target sheet (`gid` selector, else the first sheet)
//! 4. Scan rows: stop at the first empty sequence number, and in individual
//!    mode require a file name on every accepted row
//! 5. Require at least one accepted row
//! 6. Require every template placeholder to be a header
//!
//! Problems are returned as messages in the report, never as errors. An
//! unexpected fault (backend failure, panic in a collaborator) yields
//! `success = false` with the detail in `message`.

use futures::FutureExt;
use std::panic::AssertUnwindSafe;

use crate::api::logs::{log_error, log_info, log_success, log_warning};
use crate::error::{panic_detail, StoreError};
use crate::models::{FileKind, OutputMode, ResolvedIds, ValidationReport};
use crate::placeholder::extract_placeholders;
use crate::resolver::{extract_selector, resolve_id};
use crate::store::{AuthContext, Collaborators};

/// The three user-supplied resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Resource {
    Template,
    DataSource,
    Destination,
}

impl Resource {
    fn label(self) -> &'static str {
        match self {
            Resource::Template => "template document",
            Resource::DataSource => "spreadsheet",
            Resource::Destination => "destination folder",
        }
    }

    fn invalid_reference(self) -> String {
        format!("The {} URL is invalid.", self.label())
    }

    fn expected_kind(self) -> &'static str {
        match self {
            Resource::Template => "The template must be a document",
            Resource::DataSource => "The data source must be a spreadsheet",
            Resource::Destination => "The destination must be a folder",
        }
    }

    /// Message for a failed collaborator call on this resource.
    fn access_failure(self, error: &StoreError) -> String {
        match error {
            StoreError::NotFound(_) => format!("The {} was not found. Check the URL.", self.label()),
            StoreError::PermissionDenied(_) => format!(
                "Cannot access the {}. Check its sharing permissions.",
                self.label()
            ),
            StoreError::WrongKind { actual, .. } => {
                format!("{} (found a {}).", self.expected_kind(), actual)
            }
            StoreError::Backend(detail) => format!("Cannot access the {}: {}", self.label(), detail),
        }
    }
}

const NO_DATA: &str =
    "The spreadsheet has no data (a header row and at least one data row are required).";
const NO_VALID_ROWS: &str = "No valid data rows found. Fill in the sequence number in column A.";

/// Accepted rows plus the sheet row numbers missing a file name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowScan {
    pub valid: Vec<Vec<String>>,
    /// 1-based sheet row numbers (the header is row 1)
    pub missing_file_name: Vec<usize>,
}

/// Scan data rows (header excluded) top to bottom.
///
/// Scanning stops for good at the first row whose first column is empty.
/// Outside merged mode, every accepted row with an empty second column is
/// recorded; all such rows are collected, not just the first.
pub fn scan_rows(rows: &[Vec<String>], mode: OutputMode) -> RowScan {
    let mut scan = RowScan::default();
    for (i, row) in rows.iter().enumerate() {
        if row.first().map_or(true, |c| c.is_empty()) {
            break;
        }
        if !mode.is_merged() && row.get(1).map_or(true, |c| c.is_empty()) {
            scan.missing_file_name.push(i + 2);
        }
        scan.valid.push(row.clone());
    }
    scan
}

/// Placeholders with no header of the same name, in template order.
pub fn missing_variables(placeholders: &[String], headers: &[String]) -> Vec<String> {
    placeholders
        .iter()
        .filter(|p| !headers.contains(p))
        .cloned()
        .collect()
}

/// Drop trailing rows with no content, like a sheet's data range does.
fn trim_trailing_empty_rows(mut values: Vec<Vec<String>>) -> Vec<Vec<String>> {
    while values
        .last()
        .is_some_and(|row| row.iter().all(|c| c.is_empty()))
    {
        values.pop();
    }
    values
}

/// Validate the references and fetch the rows to merge.
pub async fn validate_and_fetch_data(
    collaborators: &Collaborators,
    auth: &AuthContext,
    template_ref: &str,
    data_ref: &str,
    destination_ref: &str,
    mode: OutputMode,
) -> ValidationReport {
    log_info("🔍 Validating merge inputs...");
    let run = run_validation(collaborators, auth, template_ref, data_ref, destination_ref, mode);
    let detail = match AssertUnwindSafe(run).catch_unwind().await {
        Ok(Ok(report)) => {
            if report.success {
                log_success(format!(
                    "{} rows ready, {} columns",
                    report.rows.len(),
                    report.headers.len()
                ));
            } else {
                for err in &report.validation_errors {
                    log_warning(err.clone());
                }
            }
            return report;
        }
        Ok(Err(fault)) => fault.to_string(),
        Err(payload) => panic_detail(payload),
    };

    log_error(format!("Unexpected validation fault: {}", detail));
    ValidationReport {
        success: false,
        message: format!("Unexpected error: {}", detail),
        ..Default::default()
    }
}

async fn run_validation(
    c: &Collaborators,
    auth: &AuthContext,
    template_ref: &str,
    data_ref: &str,
    destination_ref: &str,
    mode: OutputMode,
) -> Result<ValidationReport, StoreError> {
    let mut report = ValidationReport::default();

    // Stage 1: references
    let template_id = resolve_id(template_ref);
    let sheet_id = resolve_id(data_ref);
    let folder_id = resolve_id(destination_ref);
    let selector = extract_selector(data_ref);

    let (template_id, sheet_id, folder_id) = match (template_id, sheet_id, folder_id) {
        (Some(t), Some(s), Some(f)) => (t, s, f),
        (t, s, f) => {
            for (resolved, resource) in [
                (t, Resource::Template),
                (s, Resource::DataSource),
                (f, Resource::Destination),
            ] {
                if resolved.is_none() {
                    report.push_error(resource.invalid_reference());
                }
            }
            return Ok(report);
        }
    };

    // Stage 2: access and kind
    match c.files.get_file(auth, &template_id).await {
        Ok(info) if info.kind != FileKind::Document => report.push_error(format!(
            "{} (found a {}).",
            Resource::Template.expected_kind(),
            info.kind.label()
        )),
        Ok(_) => {}
        Err(e) => report.push_error(Resource::Template.access_failure(&e)),
    }

    if let Err(e) = c.files.get_folder(auth, &folder_id).await {
        report.push_error(Resource::Destination.access_failure(&e));
    }

    // Stage 3 is folded in here: the selected sheet must hold data
    let values = match read_target_sheet(c, auth, &sheet_id, selector).await {
        Ok(values) => {
            if values.len() < 2 {
                report.push_error(NO_DATA);
            }
            values
        }
        Err(e) => {
            report.push_error(Resource::DataSource.access_failure(&e));
            Vec::new()
        }
    };

    if report.has_errors() {
        return Ok(report);
    }

    let mut values = values.into_iter();
    let headers = values.next().unwrap_or_default();
    let data_rows: Vec<Vec<String>> = values.collect();

    // Stage 4: rows
    let scan = scan_rows(&data_rows, mode);
    if !scan.missing_file_name.is_empty() {
        let rows = scan
            .missing_file_name
            .iter()
            .map(|n| format!("row {}", n))
            .collect::<Vec<_>>()
            .join(", ");
        report.push_error(format!(
            "A file name (column B) is required in individual mode. Check the following rows: {}",
            rows
        ));
        return Ok(report);
    }

    // Stage 5: something to merge
    if scan.valid.is_empty() {
        report.push_error(NO_VALID_ROWS);
        return Ok(report);
    }

    // Stage 6: placeholders against headers
    let template = c.documents.open_document(auth, &template_id).await?;
    let text = template.body().map(|b| b.text()).unwrap_or_default();
    let placeholders = extract_placeholders(&text);
    log_info(format!("Template uses {} variable(s)", placeholders.len()));

    let missing = missing_variables(&placeholders, &headers);
    if !missing.is_empty() {
        report.push_error(format!(
            "The following variables were not found in the spreadsheet headers: {}",
            missing.join(", ")
        ));
        return Ok(report);
    }

    // Stage 7
    report.success = true;
    report.headers = headers;
    report.rows = scan.valid;
    report.ids = Some(ResolvedIds {
        template: template_id,
        folder: folder_id,
    });
    Ok(report)
}

/// Display values of the selected sheet, or of the first sheet when the
/// selector is absent or matches nothing.
async fn read_target_sheet(
    c: &Collaborators,
    auth: &AuthContext,
    spreadsheet_id: &str,
    selector: Option<i64>,
) -> Result<Vec<Vec<String>>, StoreError> {
    let sheets = c.sheets.list_sheets(auth, spreadsheet_id).await?;
    let target = selector
        .and_then(|gid| sheets.iter().find(|s| s.sheet_id == gid))
        .or_else(|| sheets.first());
    match target {
        Some(sheet) => {
            let values = c.sheets.display_values(auth, spreadsheet_id, sheet.sheet_id).await?;
            Ok(trim_trailing_empty_rows(values))
        }
        None => Ok(Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Body, Element};
    use crate::store::memory::Sheet;
    use crate::test_support::{grid, Fixture, PanickingSheets};
    use std::sync::Arc;

    fn rows(values: &[&[&str]]) -> Vec<Vec<String>> {
        grid(values)
    }

    #[test]
    fn test_scan_stops_at_first_empty_sequence_number() {
        let data = rows(&[&["1", "a"], &["2", "b"], &["", "x"], &["4", "d"]]);
        let scan = scan_rows(&data, OutputMode::Individual);
        assert_eq!(scan.valid, rows(&[&["1", "a"], &["2", "b"]]));
        assert!(scan.missing_file_name.is_empty());
    }

    #[test]
    fn test_file_name_required_only_in_individual_mode() {
        let data = rows(&[&["1", "a"], &["2", ""], &["", "x"], &["4", "d"]]);
        let individual = scan_rows(&data, OutputMode::Individual);
        assert_eq!(individual.missing_file_name, vec![3]);
        let merged = scan_rows(&data, OutputMode::Merged);
        assert!(merged.missing_file_name.is_empty());
        assert_eq!(merged.valid.len(), 2);
    }

    #[test]
    fn test_short_rows_count_as_empty_columns() {
        let data = rows(&[&["1"], &[]]);
        let scan = scan_rows(&data, OutputMode::Individual);
        assert_eq!(scan.valid.len(), 1);
        assert_eq!(scan.missing_file_name, vec![2]);
    }

    #[test]
    fn test_missing_variables() {
        let placeholders = vec!["Name".to_string(), "City".to_string()];
        let headers = vec!["No".to_string(), "Name".to_string()];
        assert_eq!(missing_variables(&placeholders, &headers), vec!["City"]);
    }

    #[test]
    fn test_trim_trailing_empty_rows() {
        let values = rows(&[&["No"], &["1"], &[""], &[]]);
        assert_eq!(trim_trailing_empty_rows(values).len(), 2);
    }

    #[tokio::test]
    async fn test_happy_path() {
        let fx = Fixture::new();
        let report = fx.validate(OutputMode::Individual).await;
        assert!(report.success, "{:?}", report.validation_errors);
        assert_eq!(report.headers, vec!["No", "FileName", "Name"]);
        assert_eq!(report.rows.len(), 2);
        let ids = report.ids.unwrap();
        assert_eq!(ids.template, fx.template.id);
        assert_eq!(ids.folder, fx.folder.id);
    }

    #[tokio::test]
    async fn test_unresolvable_references_reported_together() {
        let fx = Fixture::new();
        let report = validate_and_fetch_data(
            &fx.collaborators,
            &fx.auth,
            "not an id",
            "https://example.com/x",
            "",
            OutputMode::Individual,
        )
        .await;
        assert!(!report.success);
        assert_eq!(
            report.validation_errors,
            vec![
                "The template document URL is invalid.",
                "The spreadsheet URL is invalid.",
                "The destination folder URL is invalid.",
            ]
        );
    }

    #[tokio::test]
    async fn test_access_and_kind_failures_are_distinct() {
        let fx = Fixture::new();
        fx.workspace.restrict(&fx.folder.id, "someone-else").unwrap();
        // Folder passed where the template should be
        let report = validate_and_fetch_data(
            &fx.collaborators,
            &fx.auth,
            &fx.folder.url,
            &fx.sheet.url,
            &fx.folder.url,
            OutputMode::Individual,
        )
        .await;
        assert!(!report.success);
        assert_eq!(report.validation_errors.len(), 2);
        assert!(report.validation_errors[0].contains("Check its sharing permissions"));
        assert!(report.validation_errors[0].contains("template document"));
        assert!(report.validation_errors[1].contains("destination folder"));

        let report = validate_and_fetch_data(
            &fx.collaborators,
            &fx.auth,
            &fx.sheet.url,
            &fx.sheet.url,
            &fx.folder.id,
            OutputMode::Merged,
        )
        .await;
        assert!(report.validation_errors[0].starts_with("The template must be a document"));
    }

    #[tokio::test]
    async fn test_header_only_sheet_has_no_data() {
        let fx = Fixture::new();
        let sheet = fx
            .workspace
            .create_spreadsheet(
                "empty",
                None,
                vec![Sheet {
                    sheet_id: 0,
                    title: "S".into(),
                    values: rows(&[&["No", "FileName"], &["", ""]]),
                }],
            )
            .unwrap();
        let report = validate_and_fetch_data(
            &fx.collaborators,
            &fx.auth,
            &fx.template.id,
            &sheet.url,
            &fx.folder.id,
            OutputMode::Individual,
        )
        .await;
        assert_eq!(report.validation_errors, vec![NO_DATA]);
    }

    #[tokio::test]
    async fn test_selector_picks_sheet_and_falls_back() {
        let fx = Fixture::new();
        let sheet = fx
            .workspace
            .create_spreadsheet(
                "multi",
                None,
                vec![
                    Sheet {
                        sheet_id: 0,
                        title: "First".into(),
                        values: rows(&[&["No", "FileName", "Name"], &["1", "a", "x"]]),
                    },
                    Sheet {
                        sheet_id: 55,
                        title: "Second".into(),
                        values: rows(&[
                            &["No", "FileName", "Name"],
                            &["1", "a", "x"],
                            &["2", "b", "y"],
                        ]),
                    },
                ],
            )
            .unwrap();

        let selected = format!("{}#gid=55", sheet.url);
        let report = validate_and_fetch_data(
            &fx.collaborators,
            &fx.auth,
            &fx.template.id,
            &selected,
            &fx.folder.id,
            OutputMode::Individual,
        )
        .await;
        assert_eq!(report.rows.len(), 2);

        let unknown = format!("{}#gid=999", sheet.url);
        let report = validate_and_fetch_data(
            &fx.collaborators,
            &fx.auth,
            &fx.template.id,
            &unknown,
            &fx.folder.id,
            OutputMode::Individual,
        )
        .await;
        assert_eq!(report.rows.len(), 1);
    }

    #[tokio::test]
    async fn test_all_missing_file_names_listed_before_variable_check() {
        let fx = Fixture::with_rows(rows(&[
            &["No", "FileName", "Name"],
            &["1", "", "x"],
            &["2", "b", "y"],
            &["3", "", "z"],
        ]));
        let report = fx.validate(OutputMode::Individual).await;
        assert_eq!(report.validation_errors.len(), 1);
        assert!(report.validation_errors[0].ends_with("row 2, row 4"));

        assert!(fx.validate(OutputMode::Merged).await.success);
    }

    #[tokio::test]
    async fn test_no_valid_rows() {
        let fx = Fixture::with_rows(rows(&[&["No", "FileName"], &["", "orphan"]]));
        let report = fx.validate(OutputMode::Merged).await;
        assert_eq!(report.validation_errors, vec![NO_VALID_ROWS]);
    }

    #[tokio::test]
    async fn test_missing_variables_listed_in_one_message() {
        let fx = Fixture::new();
        let template = fx
            .workspace
            .create_document(
                "tpl2",
                None,
                Body::with_children(vec![
                    Element::paragraph("{{Name}} from {{City}}"),
                    Element::Table {
                        rows: vec![vec!["{{ Zip }}".into()]],
                    },
                ]),
            )
            .unwrap();
        let report = validate_and_fetch_data(
            &fx.collaborators,
            &fx.auth,
            &template.id,
            &fx.sheet.id,
            &fx.folder.id,
            OutputMode::Individual,
        )
        .await;
        assert_eq!(
            report.validation_errors,
            vec!["The following variables were not found in the spreadsheet headers: City, Zip"]
        );
    }

    #[tokio::test]
    async fn test_image_alt_text_placeholders_are_checked() {
        let fx = Fixture::new();
        let template = fx
            .workspace
            .create_document(
                "tpl3",
                None,
                Body::with_children(vec![
                    Element::paragraph("Dear {{Name}},"),
                    Element::InlineImage {
                        uri: "img://logo".into(),
                        width: 40.0,
                        height: 20.0,
                        alt_text: Some("Logo of {{Company}}".into()),
                    },
                ]),
            )
            .unwrap();
        let report = validate_and_fetch_data(
            &fx.collaborators,
            &fx.auth,
            &template.id,
            &fx.sheet.id,
            &fx.folder.id,
            OutputMode::Individual,
        )
        .await;
        assert_eq!(
            report.validation_errors,
            vec!["The following variables were not found in the spreadsheet headers: Company"]
        );
    }

    #[tokio::test]
    async fn test_panicking_collaborator_is_contained() {
        let fx = Fixture::new();
        let mut collaborators = fx.collaborators.clone();
        collaborators.sheets = Arc::new(PanickingSheets);
        let report = validate_and_fetch_data(
            &collaborators,
            &fx.auth,
            &fx.template.id,
            &fx.sheet.id,
            &fx.folder.id,
            OutputMode::Individual,
        )
        .await;
        assert!(!report.success);
        assert!(report.validation_errors.is_empty());
        assert!(report.message.starts_with("Unexpected error:"));
        assert!(report.message.contains("sheet backend exploded"));
    }
}
