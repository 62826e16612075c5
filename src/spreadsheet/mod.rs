//! Bulk import and export of transactions as Excel workbooks.
//!
//! Uploaded workbooks are validated row by row with the same rules as the
//! entry form; exports and the import template are generated server side and
//! downloaded with fixed filenames.

mod export_endpoint;
mod import_endpoint;
mod workbook;

pub use export_endpoint::{export_sample_template, export_transactions};
pub use import_endpoint::import_transactions;
