//! Parsing uploaded Excel workbooks into transaction records.
//!
//! Rows go through the same validation as the entry form: each row is loaded
//! into a [TransactionDraft] and finalized, so a workbook can never smuggle
//! in an entry the form would have rejected. Failures are reported per row
//! and nothing is imported unless every row passes.

use std::io::Cursor;

use calamine::{Data, Reader, Xlsx};
use time::Date;

use crate::transaction::{
    TransactionDraft, TransactionRecord,
};

/// The expected header row, in column order.
pub const SHEET_COLUMNS: [&str; 12] = [
    "date",
    "sale_type",
    "transaction_type",
    "category",
    "gender",
    "quantity",
    "payment_method",
    "details",
    "income_amount",
    "purchase_amount",
    "salary_amount",
    "others_amount",
];

/// A validation failure on a single spreadsheet row.
#[derive(Debug, Clone, PartialEq)]
pub struct RowError {
    /// The 1-based spreadsheet row the error belongs to.
    pub row: usize,
    /// What was wrong with the row.
    pub error: String,
}

/// The reasons a workbook can be rejected.
#[derive(Debug, PartialEq)]
pub enum WorkbookError {
    /// The file could not be read as an Excel workbook.
    Unreadable(String),
    /// The workbook does not have the expected header row.
    Header(String),
    /// One or more data rows failed validation. Nothing is imported.
    Rows(Vec<RowError>),
}

/// Parse an uploaded workbook into transaction records.
///
/// Each record carries an import ID derived from the row contents, so
/// re-uploading the same workbook skips rows that are already in the
/// database.
///
/// # Errors
/// Returns a [WorkbookError] describing why the workbook was rejected. Row
/// errors are collected across the whole sheet before returning, so the user
/// can fix everything in one pass.
pub fn parse_workbook(data: &[u8]) -> Result<Vec<TransactionRecord>, WorkbookError> {
    let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(data))
        .map_err(|error| WorkbookError::Unreadable(error.to_string()))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| WorkbookError::Unreadable("the workbook has no sheets".to_owned()))?
        .map_err(|error| WorkbookError::Unreadable(error.to_string()))?;

    let mut rows = range.rows();

    let header = rows
        .next()
        .ok_or_else(|| WorkbookError::Header("the sheet is empty".to_owned()))?;
    check_header(header)?;

    let mut records = Vec::new();
    let mut errors = Vec::new();

    for (index, row) in rows.enumerate() {
        // Row 1 is the header, so data rows start at 2.
        let row_number = index + 2;

        if row.iter().all(is_blank_cell) {
            continue;
        }

        match parse_row(row) {
            Ok(record) => {
                let import_id = create_import_id(row);
                records.push(record.import_id(Some(import_id)));
            }
            Err(error) => errors.push(RowError {
                row: row_number,
                error,
            }),
        }
    }

    if !errors.is_empty() {
        return Err(WorkbookError::Rows(errors));
    }

    Ok(records)
}

fn check_header(header: &[Data]) -> Result<(), WorkbookError> {
    for (index, expected) in SHEET_COLUMNS.iter().enumerate() {
        let got = header.get(index).map(cell_string).unwrap_or_default();

        if !got.eq_ignore_ascii_case(expected) {
            return Err(WorkbookError::Header(format!(
                "expected column {} to be \"{expected}\", got \"{got}\"",
                index + 1
            )));
        }
    }

    Ok(())
}

fn parse_row(row: &[Data]) -> Result<TransactionRecord, String> {
    let cell = |index: usize| row.get(index).unwrap_or(&Data::Empty);

    let mut draft = TransactionDraft {
        date: Some(cell_date(cell(0)).map_err(|error| format!("date: {error}"))?),
        sale_type: cell_string(cell(1))
            .parse()
            .map_err(|error| format!("sale_type: {error}"))?,
        transaction_type: cell_string(cell(2))
            .parse()
            .map_err(|error| format!("transaction_type: {error}"))?,
        category: Some(
            cell_string(cell(3))
                .parse()
                .map_err(|error| format!("category: {error}"))?,
        ),
        gender: Some(
            cell_string(cell(4))
                .parse()
                .map_err(|error| format!("gender: {error}"))?,
        ),
        quantity: cell_quantity(cell(5)).map_err(|error| format!("quantity: {error}"))?,
        payment_method: cell_string(cell(6))
            .parse()
            .map_err(|error| format!("payment_method: {error}"))?,
        details: cell_string(cell(7)),
        income_amount: cell_amount(cell(8)).map_err(|error| format!("income_amount: {error}"))?,
        purchase_amount: cell_amount(cell(9))
            .map_err(|error| format!("purchase_amount: {error}"))?,
        salary_amount: cell_amount(cell(10))
            .map_err(|error| format!("salary_amount: {error}"))?,
        others_amount: cell_amount(cell(11))
            .map_err(|error| format!("others_amount: {error}"))?,
        total_price: 0.0,
    };
    draft.recompute_total();

    draft.finalize().map_err(|errors| {
        errors
            .iter()
            .map(|error| error.message.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    })
}

fn is_blank_cell(cell: &Data) -> bool {
    match cell {
        Data::Empty => true,
        Data::String(text) => text.trim().is_empty(),
        _ => false,
    }
}

fn cell_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(text) => text.trim().to_owned(),
        other => other.to_string().trim().to_owned(),
    }
}

fn cell_date(cell: &Data) -> Result<Date, String> {
    const DATE_FORMAT: &[time::format_description::BorrowedFormatItem] =
        time::macros::format_description!("[year]-[month]-[day]");

    match cell {
        Data::DateTime(date_time) => excel_serial_to_date(date_time.as_f64()),
        Data::DateTimeIso(text) => {
            let date_part = text.get(..10).unwrap_or(text);
            Date::parse(date_part, DATE_FORMAT).map_err(|error| error.to_string())
        }
        Data::String(text) => {
            Date::parse(text.trim(), DATE_FORMAT).map_err(|error| error.to_string())
        }
        Data::Empty => Err("the cell is empty".to_owned()),
        other => Err(format!("cannot read a date from \"{other}\"")),
    }
}

/// Convert an Excel serial date to a calendar date.
///
/// Excel counts days from 1899-12-30, with the quirk that it believes 1900
/// was a leap year, so serials up to 59 are offset by one day.
fn excel_serial_to_date(serial: f64) -> Result<Date, String> {
    let days = serial.trunc() as i32;
    if days <= 0 {
        return Err(format!("\"{serial}\" is not a valid date serial"));
    }

    let julian_day = if days > 59 {
        days + 2_415_019
    } else {
        days + 2_415_020
    };

    Date::from_julian_day(julian_day).map_err(|error| error.to_string())
}

fn cell_quantity(cell: &Data) -> Result<Option<u32>, String> {
    match cell {
        Data::Empty => Ok(None),
        Data::Int(value) if *value >= 0 => Ok(Some(*value as u32)),
        Data::Float(value) if *value >= 0.0 && value.fract() == 0.0 => Ok(Some(*value as u32)),
        Data::String(text) if text.trim().is_empty() => Ok(None),
        Data::String(text) => text
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| format!("\"{text}\" is not a whole number")),
        other => Err(format!("\"{other}\" is not a whole number")),
    }
}

fn cell_amount(cell: &Data) -> Result<Option<f64>, String> {
    match cell {
        Data::Empty => Ok(None),
        Data::Int(value) => Ok(Some(*value as f64)),
        Data::Float(value) => Ok(Some(*value)),
        Data::String(text) if text.trim().is_empty() => Ok(None),
        Data::String(text) => text
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| format!("\"{text}\" is not a number")),
        other => Err(format!("\"{other}\" is not a number")),
    }
}

/// Derive a stable import ID from the raw contents of a row.
///
/// The same row always hashes to the same ID, which the unique import_id
/// column turns into duplicate detection across uploads.
pub(crate) fn create_import_id(row: &[Data]) -> i64 {
    let canonical = row
        .iter()
        .map(cell_string)
        .collect::<Vec<_>>()
        .join("\u{1f}");

    let digest = md5::compute(canonical.as_bytes());
    i64::from_le_bytes(digest.0[..8].try_into().expect("digest is 16 bytes"))
}
