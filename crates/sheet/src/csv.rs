use crate::book::Workbook;
use crate::cell::CellValue;
use crate::error::Result;
use crate::sheet::Sheet;
use std::io::Write;
use zip::write::FileOptions;
use zip::ZipWriter;

impl Sheet {
    /// Write the sheet as CSV: header row first, then data rows
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record(self.columns())?;
        for row in self.rows() {
            let record: Vec<String> = row.iter().map(CellValue::as_str).collect();
            csv_writer.write_record(&record)?;
        }

        csv_writer.flush()?;
        Ok(())
    }

    /// Render the sheet as a CSV string
    pub fn to_csv_string(&self) -> Result<String> {
        let mut buffer = Vec::new();
        self.write_csv(&mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).to_string())
    }
}

impl Workbook {
    /// Package every sheet as `{name}.csv` inside a single ZIP archive.
    ///
    /// Files appear in sheet order and are deflate-compressed.
    pub fn export_csv_zip(&self) -> Result<Vec<u8>> {
        let mut writer = ZipWriter::new(std::io::Cursor::new(Vec::new()));
        let options = FileOptions::default().compression_method(zip::CompressionMethod::Deflated);

        for (name, sheet) in self.sheets() {
            writer.start_file(format!("{name}.csv"), options)?;
            let csv = sheet.to_csv_string()?;
            writer.write_all(csv.as_bytes())?;
        }

        let cursor = writer.finish()?;
        Ok(cursor.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zip::ZipArchive;

    fn sample() -> Sheet {
        Sheet::from_rows(
            "Data",
            vec!["g".to_string(), "v".to_string()],
            vec![vec!["A", "1"], vec!["B, Inc.", "2"]],
        )
    }

    #[test]
    fn test_csv_has_header_and_quoting() {
        let csv = sample().to_csv_string().unwrap();
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("g,v"));
        assert_eq!(lines.next(), Some("A,1"));
        // comma in value forces quoting
        assert_eq!(lines.next(), Some("\"B, Inc.\",2"));
    }

    #[test]
    fn test_null_renders_empty() {
        let sheet = Sheet::from_rows(
            "S",
            vec!["a".to_string(), "b".to_string()],
            vec![vec![CellValue::Int(1), CellValue::Null]],
        );
        let csv = sheet.to_csv_string().unwrap();
        assert!(csv.contains("1,"));
    }

    #[test]
    fn test_export_zip_one_file_per_sheet() {
        let mut book = Workbook::new();
        book.add_sheet("First", sample()).unwrap();
        book.add_sheet("Second", Sheet::new()).unwrap();

        let bytes = book.export_csv_zip().unwrap();
        let mut archive = ZipArchive::new(std::io::Cursor::new(bytes)).unwrap();

        assert_eq!(archive.len(), 2);
        let names: Vec<String> = (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect();
        assert_eq!(names, vec!["First.csv", "Second.csv"]);

        let mut content = String::new();
        std::io::Read::read_to_string(&mut archive.by_name("First.csv").unwrap(), &mut content)
            .unwrap();
        assert!(content.starts_with("g,v"));
    }
}
