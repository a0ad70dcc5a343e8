//! Workbook/Sheet data core for webbook.
//!
//! Provides the in-memory model for an uploaded spreadsheet workbook:
//! typed cells, named-column sheets, and ordered sheet collections, plus the
//! operations the web session needs: best-effort cell normalization, row
//! editing, grouped reports, CSV export, and XLSX/XLSM container I/O that
//! keeps embedded macros intact.
//!
//! # Examples
//!
//! ## Editing a sheet
//!
//! ```
//! use webbook_sheet::{CellValue, Sheet};
//!
//! let mut sheet = Sheet::from_rows(
//!     "People",
//!     vec!["name".to_string(), "age".to_string()],
//!     vec![vec!["Alice", "30"]],
//! );
//!
//! sheet.row_append_padded(vec![CellValue::from("Bob")]);
//! sheet.set_cell(1, "age", "25").unwrap();
//!
//! assert_eq!(sheet.get(1, "age").unwrap(), &CellValue::Int(25));
//! ```
//!
//! ## Grouped reports
//!
//! ```
//! use webbook_sheet::{report, Aggregate, CellValue, ReportSpec, Sheet};
//!
//! let sheet = Sheet::from_rows(
//!     "Data",
//!     vec!["g".to_string(), "v".to_string()],
//!     vec![
//!         vec![CellValue::from("A"), CellValue::Int(1)],
//!         vec![CellValue::from("A"), CellValue::Int(3)],
//!         vec![CellValue::from("B"), CellValue::Int(5)],
//!     ],
//! );
//!
//! let spec = ReportSpec {
//!     group_by: vec!["g".to_string()],
//!     metrics: vec!["v".to_string()],
//!     agg: Aggregate::Sum,
//! };
//! let result = report(&sheet, &spec).unwrap();
//!
//! assert_eq!(result.rows()[0][1], CellValue::Float(4.0));
//! ```

mod book;
mod cell;
mod csv;
mod error;
mod report;
mod sheet;
mod xlsx;

/// Re-export workbook type.
pub use book::Workbook;
/// Re-export cell value type.
pub use cell::CellValue;
/// Re-export error types.
pub use error::{Result, SheetError};
/// Re-export the report engine.
pub use report::{report, Aggregate, ReportSpec};
/// Re-export sheet type.
pub use sheet::Sheet;
/// Re-export container name validation.
pub use xlsx::validate_sheet_name;
