// Primitives for reading CSV files.

use log::debug;
use snafu::prelude::*;

use crate::survey::*;

/// Reads all the rows of a CSV export, header rows included.
///
/// Rows may have different lengths. Cells are trimmed. A blank line is kept as an
/// empty row, so that rows keep the numbering of the file.
pub fn read_csv_survey(path: &str) -> BSurveyResult<Vec<Vec<String>>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .context(CsvOpenSnafu { path })?;

    let mut res: Vec<Vec<String>> = Vec::new();
    let mut record = csv::StringRecord::new();
    loop {
        // Lines start at 1, as in spreadsheets.
        let line_before = rdr.position().line();
        let has_record = rdr.read_record(&mut record).context(CsvLineParseSnafu {
            path,
            lineno: line_before as usize,
        })?;
        if !has_record {
            break;
        }
        // The reader skips blank lines: whatever was consumed beyond the record
        // itself and its terminator was blank.
        let embedded: u64 = record.iter().map(|f| f.matches('\n').count() as u64).sum();
        let start_line = rdr
            .position()
            .line()
            .saturating_sub(embedded + 1)
            .max(line_before);
        for blank_line in line_before..start_line {
            debug!("read_csv_survey: lineno: {:?} blank line", blank_line);
            res.push(Vec::new());
        }
        let cells: Vec<String> = record
            .iter()
            .map(|s| s.trim_start_matches('\u{feff}').trim().to_string())
            .collect();
        debug!("read_csv_survey: lineno: {:?} row: {:?}", start_line, cells);
        res.push(cells);
    }
    Ok(res)
}
