//! Route handlers for downloading transactions as an Excel workbook, and the
//! sample template for bulk imports.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, State},
    http::{
        HeaderValue, StatusCode,
        header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    },
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use rust_xlsxwriter::Workbook;

use crate::{
    AppState, Error,
    transaction::{Transaction, get_all_transactions},
};

use super::workbook::SHEET_COLUMNS;

const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// The fixed filename of the full export.
const EXPORT_FILE_NAME: &str = "transactions_export.xlsx";
/// The fixed filename of the import template.
const SAMPLE_FILE_NAME: &str = "transaction_sample.xlsx";

/// The state needed to export transactions.
#[derive(Debug, Clone)]
pub struct ExportState {
    /// The database connection for reading transactions.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for ExportState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Route handler that downloads every transaction as an Excel workbook.
pub async fn export_transactions(State(state): State<ExportState>) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    let transactions = match get_all_transactions(&connection) {
        Ok(transactions) => transactions,
        Err(error) => {
            tracing::error!("could not fetch transactions for export: {error}");
            return error.into_alert_response();
        }
    };
    drop(connection);

    match build_export_workbook(&transactions) {
        Ok(data) => workbook_download(data, EXPORT_FILE_NAME),
        Err(error) => {
            tracing::error!("could not build export workbook: {error}");
            Error::InvalidWorkbook(error.to_string()).into_alert_response()
        }
    }
}

/// Route handler that downloads the sample import template.
pub async fn export_sample_template() -> Response {
    match build_sample_workbook() {
        Ok(data) => workbook_download(data, SAMPLE_FILE_NAME),
        Err(error) => {
            tracing::error!("could not build sample workbook: {error}");
            Error::InvalidWorkbook(error.to_string()).into_alert_response()
        }
    }
}

fn workbook_download(data: Vec<u8>, file_name: &str) -> Response {
    let disposition = format!("attachment; filename=\"{file_name}\"");

    let Ok(disposition) = HeaderValue::from_str(&disposition) else {
        tracing::error!("invalid content disposition for {file_name}");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    };

    (
        StatusCode::OK,
        [
            (CONTENT_TYPE, HeaderValue::from_static(XLSX_CONTENT_TYPE)),
            (CONTENT_DISPOSITION, disposition),
        ],
        data,
    )
        .into_response()
}

fn write_header(worksheet: &mut rust_xlsxwriter::Worksheet) -> Result<(), rust_xlsxwriter::XlsxError> {
    for (column, header) in SHEET_COLUMNS.iter().enumerate() {
        worksheet.write_string(0, column as u16, *header)?;
    }
    worksheet.write_string(0, SHEET_COLUMNS.len() as u16, "total_price")?;

    Ok(())
}

fn build_export_workbook(
    transactions: &[Transaction],
) -> Result<Vec<u8>, rust_xlsxwriter::XlsxError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();

    write_header(worksheet)?;

    for (index, transaction) in transactions.iter().enumerate() {
        let row = (index + 1) as u32;
        let date = transaction.date.to_string();

        worksheet.write_string(row, 0, date.as_str())?;
        worksheet.write_string(row, 1, transaction.sale_type.as_str())?;
        worksheet.write_string(row, 2, transaction.transaction_type.as_str())?;
        worksheet.write_string(row, 3, transaction.category.as_str())?;
        worksheet.write_string(row, 4, transaction.gender.as_str())?;
        worksheet.write_number(row, 5, transaction.quantity as f64)?;
        worksheet.write_string(row, 6, transaction.payment_method.as_str())?;
        worksheet.write_string(row, 7, transaction.details.as_str())?;
        worksheet.write_number(row, 8, transaction.income_amount)?;
        worksheet.write_number(row, 9, transaction.purchase_amount)?;
        worksheet.write_number(row, 10, transaction.salary_amount)?;
        worksheet.write_number(row, 11, transaction.others_amount)?;
        worksheet.write_number(row, 12, transaction.total_price)?;
    }

    workbook.save_to_buffer()
}

fn build_sample_workbook() -> Result<Vec<u8>, rust_xlsxwriter::XlsxError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();

    write_header(worksheet)?;

    let example = [
        "2025-04-05",
        "STANDARD",
        "INCOME",
        "BROILER",
        "MALE",
        "3",
        "CASH",
        "sold at the market",
        "500",
        "",
        "",
        "",
    ];
    for (column, value) in example.iter().enumerate() {
        worksheet.write_string(1, column as u16, *value)?;
    }

    workbook.save_to_buffer()
}

#[cfg(test)]
mod export_tests {
    use std::sync::{Arc, Mutex};

    use axum::extract::State;
    use rusqlite::Connection;
    use time::macros::date;

    use crate::{
        db::initialize,
        spreadsheet::workbook::parse_workbook,
        test_utils::{assert_content_type, assert_status_ok, get_header},
        transaction::{create_transaction, sample_record},
    };

    use super::{
        EXPORT_FILE_NAME, ExportState, XLSX_CONTENT_TYPE, export_sample_template,
        export_transactions,
    };

    fn get_test_state() -> ExportState {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();

        ExportState {
            db_connection: Arc::new(Mutex::new(conn)),
        }
    }

    #[tokio::test]
    async fn export_downloads_workbook_with_fixed_filename() {
        let state = get_test_state();
        create_transaction(
            sample_record(date!(2025 - 04 - 05)),
            &state.db_connection.lock().unwrap(),
        )
        .unwrap();

        let response = export_transactions(State(state)).await;

        assert_status_ok(&response);
        assert_content_type(&response, XLSX_CONTENT_TYPE);
        assert!(get_header(&response, "content-disposition").contains(EXPORT_FILE_NAME));
    }

    #[tokio::test]
    async fn exported_workbook_round_trips_through_the_importer() {
        let state = get_test_state();
        create_transaction(
            sample_record(date!(2025 - 04 - 05)),
            &state.db_connection.lock().unwrap(),
        )
        .unwrap();

        let response = export_transactions(State(state)).await;
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        // The exporter writes one extra column (total_price), which the
        // importer ignores.
        let records = parse_workbook(&body).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].date, date!(2025 - 04 - 05));
        assert_eq!(records[0].income_amount, 500.0);
    }

    #[tokio::test]
    async fn sample_template_parses_cleanly() {
        let response = export_sample_template().await;

        assert_status_ok(&response);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let records = parse_workbook(&body).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].total_price, 500.0);
    }
}
