use thiserror::Error;

/// Errors that can occur during workbook and sheet operations
#[derive(Error, Debug)]
pub enum SheetError {
    #[error("Failed to load workbook: {0}")]
    Load(String),

    #[error("No group-by column selected")]
    EmptySelection,

    #[error("Sheet name {name:?} is not valid for the workbook container: {reason}")]
    InvalidSheetName { name: String, reason: String },

    #[error("Failed to save workbook: {0}")]
    Save(String),

    #[error("Row index out of bounds: {index} (sheet has {count} rows)")]
    RowIndexOutOfBounds { index: usize, count: usize },

    #[error("Column not found: {name}")]
    ColumnNotFound { name: String },

    #[error("Sheet not found: {name}")]
    SheetNotFound { name: String },

    #[error("Sheet already exists: {name}")]
    SheetAlreadyExists { name: String },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SheetError>;
