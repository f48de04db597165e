// Primitives for reading CSV files.

use crate::lottery::io_common::{RawRow, RawTable};
use crate::lottery::*;

pub fn read_csv_table(path: &str) -> DrawResult<RawTable> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .context(OpeningCsvSnafu { path })?;
    let mut records = rdr.records();

    let header: Vec<String> = match records.next() {
        Some(line_r) => line_r
            .context(CsvLineParseSnafu { path, lineno: 1_usize })?
            .iter()
            // Spreadsheet exports often start with a byte order mark.
            .map(|s| s.trim_start_matches('\u{feff}').to_string())
            .collect(),
        None => return EmptyInputSnafu { path }.fail(),
    };
    debug!("read_csv_table: path: {:?} header: {:?}", path, header);

    let mut rows: Vec<RawRow> = Vec::new();
    let mut last_lineno = 1_usize;
    for line_r in records {
        let line = match line_r {
            Ok(line) => line,
            Err(e) => {
                let lineno = e
                    .position()
                    .map(|p| p.line() as usize)
                    .unwrap_or(last_lineno + 1);
                return Err(e).context(CsvLineParseSnafu { path, lineno });
            }
        };
        // The reader skips empty lines, the position gives the line in the file.
        let lineno = line
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or(last_lineno + 1);
        last_lineno = lineno;
        // Blank lines do not make candidates.
        if line.iter().all(|s| s.trim().is_empty()) {
            continue;
        }
        rows.push(RawRow {
            lineno,
            cells: line.iter().map(|s| s.to_string()).collect(),
        });
    }
    Ok(RawTable { header, rows })
}
