// Reading the candidates from Excel workbooks.

use calamine::DataType;

use crate::lottery::io_common::{RawRow, RawTable};
use crate::lottery::*;

pub fn read_excel_table(path: &str, worksheet_name: Option<&str>) -> DrawResult<RawTable> {
    let wrange = get_range(path, worksheet_name)?;

    // The range may not start on the first row of the worksheet.
    let first_lineno = wrange.start().map(|(r, _)| r as usize + 1).unwrap_or(1);
    let mut iter = wrange.rows();
    let header: Vec<String> = iter
        .next()
        .context(EmptyInputSnafu { path })?
        .iter()
        .map(|c| cell_to_string(c).trim().to_string())
        .collect();
    debug!("read_excel_table: path: {:?} header: {:?}", path, header);

    let mut rows: Vec<RawRow> = Vec::new();
    for (idx, row) in iter.enumerate() {
        let cells: Vec<String> = row.iter().map(cell_to_string).collect();
        if cells.iter().all(|s| s.trim().is_empty()) {
            continue;
        }
        rows.push(RawRow {
            lineno: first_lineno + idx + 1,
            cells,
        });
    }
    Ok(RawTable { header, rows })
}

fn get_range(path: &str, worksheet_name: Option<&str>) -> DrawResult<calamine::Range<DataType>> {
    debug!(
        "get_range: path: {:?} worksheet: {:?}",
        path, worksheet_name
    );
    let mut workbook: Xlsx<_> = open_workbook(path).context(OpeningExcelSnafu { path })?;

    // A worksheet name was provided, use it.
    let wrange_r = match worksheet_name {
        Some(name) => workbook
            .worksheet_range(name)
            .context(MissingWorksheetSnafu { path, name })?,
        None => workbook
            .worksheet_range_at(0)
            .context(EmptyInputSnafu { path })?,
    };
    wrange_r.context(OpeningExcelSnafu { path })
}

fn cell_to_string(cell: &DataType) -> String {
    match cell {
        DataType::Empty => "".to_string(),
        DataType::String(s) => s.clone(),
        // Identifiers and counts are stored as floats.
        DataType::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        DataType::Bool(b) => b.to_string(),
        x => x.to_string(),
    }
}
