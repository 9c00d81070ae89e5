use crate::models::RawTable;
use calamine::{open_workbook_auto, open_workbook_auto_from_rs, Data, Range, Reader, Sheets};
use csv::ReaderBuilder;
use std::fs;
use std::io::{Cursor, Read, Seek};
use std::path::Path;
use thiserror::Error;

/// Sheet picked when the caller does not name one and it exists
pub const PREFERRED_SHEET: &str = "Query2";

/// File extensions read as spreadsheets rather than CSV
const SPREADSHEET_EXTENSIONS: [&str; 5] = ["xlsx", "xlsm", "xlsb", "xls", "ods"];

/// Errors that can occur while reading a table source
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error("Spreadsheet error: {0}")]
    Spreadsheet(#[from] calamine::Error),

    #[error("No sheets found in {0}")]
    NoSheets(String),

    #[error("Sheet {sheet:?} not found; available: {available:?}")]
    SheetNotFound {
        sheet: String,
        available: Vec<String>,
    },
}

/// Ordered collection of named raw tables
///
/// A spreadsheet file keeps its own sheet names and order. A single CSV file
/// is a one-sheet workbook named after the file stem; a directory contributes
/// one sheet per `*.csv` file, sorted by file name.
#[derive(Debug, Clone, Default)]
pub struct Workbook {
    sheets: Vec<(String, RawTable)>,
}

impl Workbook {
    pub fn from_sheets(sheets: Vec<(String, RawTable)>) -> Self {
        Self { sheets }
    }

    /// Load a spreadsheet, a CSV file or a directory of CSV files
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref();
        if path.is_file() && is_spreadsheet_path(path) {
            let sheets = read_spreadsheet(open_workbook_auto(path)?)?;
            tracing::debug!("Read {} sheet(s) from {}", sheets.len(), path.display());
            return Self::non_empty(sheets, path.display().to_string());
        }

        let io_err = |source| SourceError::Io {
            path: path.display().to_string(),
            source,
        };

        let metadata = fs::metadata(path).map_err(io_err)?;

        let files = if metadata.is_dir() {
            let mut files: Vec<_> = fs::read_dir(path)
                .map_err(io_err)?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| {
                    p.is_file()
                        && p.extension()
                            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
                })
                .collect();
            files.sort();
            files
        } else {
            vec![path.to_path_buf()]
        };

        let mut sheets = Vec::with_capacity(files.len());
        for file in files {
            let name = file
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "Sheet1".to_string());
            let reader = fs::File::open(&file).map_err(|source| SourceError::Io {
                path: file.display().to_string(),
                source,
            })?;
            sheets.push((name, read_csv(reader)?));
        }

        tracing::debug!("Read {} sheet(s) from {}", sheets.len(), path.display());
        Self::non_empty(sheets, path.display().to_string())
    }

    /// Workbook from an uploaded body, sniffing spreadsheet containers
    ///
    /// Anything that is not a zip (xlsx, ods) or OLE (xls) container is read as
    /// a single CSV sheet called `name`.
    pub fn from_bytes(name: &str, bytes: Vec<u8>) -> Result<Self, SourceError> {
        if looks_like_spreadsheet(&bytes) {
            let sheets = read_spreadsheet(open_workbook_auto_from_rs(Cursor::new(bytes))?)?;
            return Self::non_empty(sheets, name.to_string());
        }
        Self::from_csv_reader(name, bytes.as_slice())
    }

    fn non_empty(sheets: Vec<(String, RawTable)>, origin: String) -> Result<Self, SourceError> {
        if sheets.is_empty() {
            return Err(SourceError::NoSheets(origin));
        }
        Ok(Self { sheets })
    }

    /// Single-sheet workbook from an in-memory CSV body
    pub fn from_csv_reader<R: Read>(name: &str, reader: R) -> Result<Self, SourceError> {
        Ok(Self {
            sheets: vec![(name.to_string(), read_csv(reader)?)],
        })
    }

    pub fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|(name, _)| name.clone()).collect()
    }

    /// Pick a sheet by exact name, or the default one
    ///
    /// The default is [`PREFERRED_SHEET`] when present, otherwise the first.
    pub fn select(&self, sheet: Option<&str>) -> Result<(&str, &RawTable), SourceError> {
        let found = match sheet {
            Some(wanted) => self.sheets.iter().find(|(name, _)| name == wanted),
            None => self
                .sheets
                .iter()
                .find(|(name, _)| name == PREFERRED_SHEET)
                .or_else(|| self.sheets.first()),
        };

        found
            .map(|(name, table)| (name.as_str(), table))
            .ok_or_else(|| match sheet {
                Some(wanted) => SourceError::SheetNotFound {
                    sheet: wanted.to_string(),
                    available: self.sheet_names(),
                },
                None => SourceError::NoSheets("workbook".to_string()),
            })
    }
}

fn is_spreadsheet_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            SPREADSHEET_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

fn looks_like_spreadsheet(bytes: &[u8]) -> bool {
    const ZIP: &[u8] = b"PK\x03\x04";
    const OLE: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];
    bytes.starts_with(ZIP) || bytes.starts_with(OLE)
}

fn read_spreadsheet<RS: Read + Seek>(
    mut workbook: Sheets<RS>,
) -> Result<Vec<(String, RawTable)>, SourceError> {
    let names = workbook.sheet_names();
    let mut sheets = Vec::with_capacity(names.len());
    for name in names {
        let range = workbook.worksheet_range(&name)?;
        sheets.push((name, range_to_table(&range)));
    }
    Ok(sheets)
}

/// First row of the used range is the header row
fn range_to_table(range: &Range<Data>) -> RawTable {
    let mut rows = range
        .rows()
        .map(|row| row.iter().map(|cell| cell.to_string()).collect::<Vec<String>>());
    let headers = rows.next().unwrap_or_default();
    RawTable::new(headers, rows.collect())
}

fn read_csv<R: Read>(reader: R) -> Result<RawTable, SourceError> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let mut headers: Vec<String> = rdr.byte_headers()?.iter().map(lossy).collect();
    if let Some(first) = headers.first_mut() {
        if let Some(stripped) = first.strip_prefix('\u{feff}') {
            *first = stripped.to_string();
        }
    }

    // Cells that are not UTF-8 (cp1252 exports) are decoded lossily
    let mut rows = Vec::new();
    let mut lossy_rows = 0usize;
    for record in rdr.byte_records() {
        let record = record?;
        if std::str::from_utf8(record.as_slice()).is_err() {
            lossy_rows += 1;
        }
        rows.push(record.iter().map(lossy).collect());
    }

    if lossy_rows > 0 {
        tracing::debug!("Replaced invalid UTF-8 in {} row(s)", lossy_rows);
    }

    Ok(RawTable::new(headers, rows))
}

fn lossy(field: &[u8]) -> String {
    String::from_utf8_lossy(field).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = "Sub Name,Lattitude,Longitude\nAlpha,38.9,-77.0\nBravo,39.0,-77.1,extra\n";

    #[test]
    fn test_read_csv_from_memory() {
        let wb = Workbook::from_csv_reader("upload", SAMPLE.as_bytes()).unwrap();
        let (name, table) = wb.select(None).unwrap();
        assert_eq!(name, "upload");
        assert_eq!(table.headers, vec!["Sub Name", "Lattitude", "Longitude"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[1].len(), 4);
    }

    #[test]
    fn test_bom_is_stripped() {
        let body = format!("\u{feff}{}", SAMPLE);
        let wb = Workbook::from_csv_reader("bom", body.as_bytes()).unwrap();
        assert_eq!(wb.select(None).unwrap().1.headers[0], "Sub Name");
    }

    #[test]
    fn test_default_sheet_prefers_query2() {
        let wb = Workbook::from_sheets(vec![
            ("Summary".to_string(), RawTable::default()),
            ("Query2".to_string(), RawTable::default()),
        ]);
        assert_eq!(wb.select(None).unwrap().0, "Query2");

        let wb = Workbook::from_sheets(vec![
            ("Summary".to_string(), RawTable::default()),
            ("Other".to_string(), RawTable::default()),
        ]);
        assert_eq!(wb.select(None).unwrap().0, "Summary");
    }

    #[test]
    fn test_unknown_sheet_is_an_error() {
        let wb = Workbook::from_sheets(vec![("Only".to_string(), RawTable::default())]);
        match wb.select(Some("Missing")) {
            Err(SourceError::SheetNotFound { sheet, available }) => {
                assert_eq!(sheet, "Missing");
                assert_eq!(available, vec!["Only"]);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_directory_becomes_sorted_sheets() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b_sheet.csv", "a_sheet.CSV", "notes.txt"] {
            let mut f = fs::File::create(dir.path().join(name)).unwrap();
            f.write_all(SAMPLE.as_bytes()).unwrap();
        }

        let wb = Workbook::from_path(dir.path()).unwrap();
        assert_eq!(wb.sheet_names(), vec!["a_sheet", "b_sheet"]);
    }

    #[test]
    fn test_invalid_utf8_cell_keeps_every_row() {
        let body: &[u8] =
            b"Sub Name,Lattitude,Longitude\nAlpha,38.9,-77.0\nCaf\xE9,39.0,-77.1\nBravo,39.1,-77.2\n";
        let wb = Workbook::from_bytes("cp1252", body.to_vec()).unwrap();
        let (_, table) = wb.select(None).unwrap();
        assert_eq!(table.rows.len(), 3);
        assert_eq!(table.rows[1][0], "Caf\u{FFFD}");
        assert_eq!(table.rows[2][0], "Bravo");
    }

    #[test]
    fn test_csv_error_display_is_passed_through() {
        let inner = csv::Error::from(std::io::Error::new(std::io::ErrorKind::Other, "disk gone"));
        let expected = inner.to_string();
        assert_eq!(SourceError::from(inner).to_string(), expected);
    }

    #[test]
    fn test_spreadsheet_sheets_keep_workbook_order() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/Sub_Plus_OT.xlsx");
        let wb = Workbook::from_path(&path).unwrap();
        assert_eq!(wb.sheet_names(), vec!["Summary", "Query2"]);

        let (name, table) = wb.select(None).unwrap();
        assert_eq!(name, "Query2");
        assert_eq!(table.headers[..3], ["Sub", "Sub Name", "Lattitude"]);
        assert_eq!(table.rows[0][1], "Fairfax");
        assert_eq!(table.rows[0][2], "38.8462");
    }

    #[test]
    fn test_uploaded_spreadsheet_is_sniffed() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/Sub_Plus_OT.xlsx");
        let wb = Workbook::from_bytes("upload", fs::read(path).unwrap()).unwrap();
        assert_eq!(wb.sheet_names(), vec!["Summary", "Query2"]);
        assert!(is_spreadsheet_path(Path::new("Subs.XLSX")));
        assert!(!is_spreadsheet_path(Path::new("subs.csv")));
    }

    #[test]
    fn test_missing_path_is_io_error() {
        let err = Workbook::from_path("/definitely/not/here.csv").unwrap_err();
        assert!(matches!(err, SourceError::Io { .. }));
    }
}
