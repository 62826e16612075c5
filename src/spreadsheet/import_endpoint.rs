//! Route handler for importing transactions from an uploaded workbook.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, Multipart, State, multipart::Field},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    alert::Alert,
    transaction::{TransactionRecord, create_transaction},
};

use super::workbook::{WorkbookError, parse_workbook};

const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// The state needed for importing transactions.
#[derive(Debug, Clone)]
pub struct ImportState {
    /// The database connection for managing transactions.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for ImportState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Route handler for importing transactions from an uploaded workbook.
///
/// The import is all-or-nothing: if any row fails validation, the errors are
/// reported per row and nothing is persisted. Rows that are already in the
/// database (same import ID) are skipped and counted.
pub async fn import_transactions(
    State(state): State<ImportState>,
    mut multipart: Multipart,
) -> Result<Response, Response> {
    let mut records: Option<Vec<TransactionRecord>> = None;

    while let Some(field) = multipart.next_field().await.map_err(|error| {
        tracing::error!("could not read multipart form: {error}");
        Error::MultipartError(error.to_string()).into_alert_response()
    })? {
        let data = parse_multipart_field(field)
            .await
            .map_err(|error| match error {
                Error::NotSpreadsheet => (
                    StatusCode::BAD_REQUEST,
                    Alert::ErrorSimple {
                        message: "Only .xlsx files are allowed.".to_owned(),
                    }
                    .into_html(),
                )
                    .into_response(),
                error => {
                    tracing::error!("Failed to parse multipart field: {}", error);
                    error.into_alert_response()
                }
            })?;

        let parsed = parse_workbook(&data).map_err(workbook_error_response)?;
        records = Some(parsed);
    }

    let Some(records) = records else {
        return Err((
            StatusCode::BAD_REQUEST,
            Alert::ErrorSimple {
                message: "No file was uploaded.".to_owned(),
            }
            .into_html(),
        )
            .into_response());
    };

    let connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError.into_alert_response()
    })?;

    let sql_transaction = connection
        .unchecked_transaction()
        .inspect_err(|error| tracing::error!("could not start transaction: {error}"))
        .map_err(|_| {
            Alert::ErrorSimple {
                message: "Could not import transactions".to_owned(),
            }
            .into_response()
        })?;

    let mut imported = 0usize;
    let mut duplicates = 0usize;

    for record in records {
        match create_transaction(record, &sql_transaction) {
            Ok(_) => imported += 1,
            Err(Error::DuplicateImportId) => duplicates += 1,
            Err(error) => {
                tracing::error!("Failed to import transactions: {error}");
                return Err((
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Alert::Error {
                        message: "Import failed".to_owned(),
                        details: "An unexpected error occurred, please try again later"
                            .to_owned(),
                    }
                    .into_html(),
                )
                    .into_response());
            }
        }
    }

    sql_transaction
        .commit()
        .inspect_err(|error| tracing::error!("could not commit transaction: {error}"))
        .map_err(|_| {
            Alert::ErrorSimple {
                message: "Could not import transactions".to_owned(),
            }
            .into_response()
        })?;

    tracing::info!("Imported {imported} transactions, skipped {duplicates} duplicates");

    Ok((StatusCode::CREATED, success_alert(imported, duplicates).into_html()).into_response())
}

fn success_alert(imported: usize, duplicates: usize) -> Alert {
    match (imported, duplicates) {
        (0, 0) => Alert::Success {
            message: "Import completed".to_owned(),
            details: "The workbook contained no entries.".to_owned(),
        },
        (0, _) => Alert::Success {
            message: "Import completed".to_owned(),
            details: "No new entries were imported, every row was already in the books."
                .to_owned(),
        },
        (imported, 0) => Alert::Success {
            message: "File uploaded successfully".to_owned(),
            details: format!("Imported {imported} entries."),
        },
        (imported, duplicates) => Alert::Success {
            message: "File uploaded successfully".to_owned(),
            details: format!(
                "Imported {imported} entries and skipped {duplicates} duplicates."
            ),
        },
    }
}

fn workbook_error_response(error: WorkbookError) -> Response {
    match error {
        WorkbookError::Unreadable(details) => {
            tracing::debug!("Failed to parse workbook: {details}");
            (
                StatusCode::BAD_REQUEST,
                Alert::Error {
                    message: "Failed to read the workbook".to_owned(),
                    details: "Check that the file is a valid .xlsx workbook.".to_owned(),
                }
                .into_html(),
            )
                .into_response()
        }
        WorkbookError::Header(details) => (
            StatusCode::BAD_REQUEST,
            Alert::Error {
                message: "The workbook does not match the template".to_owned(),
                details,
            }
            .into_html(),
        )
            .into_response(),
        WorkbookError::Rows(row_errors) => {
            let details = row_errors
                .iter()
                .map(|row_error| format!("Row {}: {}", row_error.row, row_error.error))
                .collect::<Vec<_>>()
                .join("\n");

            (
                StatusCode::BAD_REQUEST,
                Alert::Error {
                    message: "Validation failed:".to_owned(),
                    details,
                }
                .into_html(),
            )
                .into_response()
        }
    }
}

async fn parse_multipart_field(field: Field<'_>) -> Result<Vec<u8>, Error> {
    let is_xlsx_content_type = field.content_type() == Some(XLSX_CONTENT_TYPE);
    let is_xlsx_file_name = field
        .file_name()
        .map(|file_name| file_name.to_ascii_lowercase().ends_with(".xlsx"))
        .unwrap_or(false);

    if !is_xlsx_content_type && !is_xlsx_file_name {
        return Err(Error::NotSpreadsheet);
    }

    field.bytes().await.map(|bytes| bytes.to_vec()).map_err(|error| {
        tracing::error!("Could not read data from multipart form field: {error}");
        Error::MultipartError("Could not read data from multipart form field.".to_owned())
    })
}

#[cfg(test)]
mod import_tests {
    use std::sync::{Arc, Mutex};

    use axum::{Router, routing::post};
    use axum_test::{
        TestServer,
        multipart::{MultipartForm, Part},
    };
    use rusqlite::Connection;

    use crate::{db::initialize, transaction::count_transactions};

    use super::{ImportState, XLSX_CONTENT_TYPE, import_transactions};

    fn get_test_state() -> ImportState {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();

        ImportState {
            db_connection: Arc::new(Mutex::new(conn)),
        }
    }

    fn get_test_server(state: ImportState) -> TestServer {
        let app = Router::new()
            .route("/api/import", post(import_transactions))
            .with_state(state);

        TestServer::new(app)
    }

    fn workbook_with_one_entry() -> Vec<u8> {
        let mut workbook = rust_xlsxwriter::Workbook::new();
        let worksheet = workbook.add_worksheet();

        for (column, header) in super::super::workbook::SHEET_COLUMNS.iter().enumerate() {
            worksheet.write_string(0, column as u16, *header).unwrap();
        }

        let cells = [
            "2025-04-05",
            "STANDARD",
            "INCOME",
            "BROILER",
            "MALE",
            "3",
            "CASH",
            "",
            "500",
            "",
            "",
            "",
        ];
        for (column, value) in cells.iter().enumerate() {
            worksheet.write_string(1, column as u16, *value).unwrap();
        }

        workbook.save_to_buffer().unwrap()
    }

    fn upload_form(data: Vec<u8>, file_name: &str, content_type: &str) -> MultipartForm {
        MultipartForm::new().add_part(
            "file",
            Part::bytes(data)
                .file_name(file_name)
                .mime_type(content_type),
        )
    }

    #[tokio::test]
    async fn imports_valid_workbook() {
        let state = get_test_state();
        let server = get_test_server(state.clone());

        let response = server
            .post("/api/import")
            .multipart(upload_form(
                workbook_with_one_entry(),
                "entries.xlsx",
                XLSX_CONTENT_TYPE,
            ))
            .await;

        response.assert_status(axum::http::StatusCode::CREATED);

        let connection = state.db_connection.lock().unwrap();
        assert_eq!(count_transactions(&connection).unwrap(), 1);
    }

    #[tokio::test]
    async fn reimporting_the_same_workbook_skips_duplicates() {
        let state = get_test_state();
        let server = get_test_server(state.clone());

        for _ in 0..2 {
            server
                .post("/api/import")
                .multipart(upload_form(
                    workbook_with_one_entry(),
                    "entries.xlsx",
                    XLSX_CONTENT_TYPE,
                ))
                .await
                .assert_status(axum::http::StatusCode::CREATED);
        }

        let connection = state.db_connection.lock().unwrap();
        assert_eq!(count_transactions(&connection).unwrap(), 1);
    }

    #[tokio::test]
    async fn rejects_non_spreadsheet_upload() {
        let state = get_test_state();
        let server = get_test_server(state.clone());

        let response = server
            .post("/api/import")
            .multipart(upload_form(
                b"name,amount\nfoo,1".to_vec(),
                "entries.csv",
                "text/csv",
            ))
            .await;

        response.assert_status(axum::http::StatusCode::BAD_REQUEST);
        response.assert_text_contains("Only .xlsx files are allowed.");

        let connection = state.db_connection.lock().unwrap();
        assert_eq!(count_transactions(&connection).unwrap(), 0);
    }

    #[tokio::test]
    async fn row_errors_block_the_whole_import() {
        let state = get_test_state();
        let server = get_test_server(state.clone());

        let mut workbook = rust_xlsxwriter::Workbook::new();
        let worksheet = workbook.add_worksheet();
        for (column, header) in super::super::workbook::SHEET_COLUMNS.iter().enumerate() {
            worksheet.write_string(0, column as u16, *header).unwrap();
        }
        // A valid row followed by one with a bad transaction type.
        let rows = [
            [
                "2025-04-05",
                "STANDARD",
                "INCOME",
                "BROILER",
                "MALE",
                "3",
                "CASH",
                "",
                "500",
                "",
                "",
                "",
            ],
            [
                "2025-04-06",
                "STANDARD",
                "BARTER",
                "BROILER",
                "MALE",
                "3",
                "CASH",
                "",
                "500",
                "",
                "",
                "",
            ],
        ];
        for (row_index, row) in rows.iter().enumerate() {
            for (column, value) in row.iter().enumerate() {
                worksheet
                    .write_string((row_index + 1) as u32, column as u16, *value)
                    .unwrap();
            }
        }
        let data = workbook.save_to_buffer().unwrap();

        let response = server
            .post("/api/import")
            .multipart(upload_form(data, "entries.xlsx", XLSX_CONTENT_TYPE))
            .await;

        response.assert_status(axum::http::StatusCode::BAD_REQUEST);
        response.assert_text_contains("Row 3");

        let connection = state.db_connection.lock().unwrap();
        assert_eq!(
            count_transactions(&connection).unwrap(),
            0,
            "a row error must import nothing"
        );
    }
}
