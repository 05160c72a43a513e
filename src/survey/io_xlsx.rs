// Primitives for reading Excel workbooks.

use calamine::{open_workbook, DataType, Reader, Xlsx};
use log::{debug, warn};
use snafu::prelude::*;

use crate::survey::*;

pub fn read_xlsx_survey(path: &str, settings: &InputSettings) -> BSurveyResult<Vec<Vec<String>>> {
    let wrange = get_range(path, settings)?;
    let mut res: Vec<Vec<String>> = Vec::new();
    for (idx, row) in wrange.rows().enumerate() {
        let cells: Vec<String> = row.iter().map(|c| cell_to_string(c, idx)).collect();
        debug!("read_xlsx_survey: idx: {:?} row: {:?}", idx, cells);
        res.push(cells);
    }
    Ok(res)
}

/// Renders a cell the way it is displayed in the spreadsheet: whole numbers have no decimals.
fn cell_to_string(cell: &DataType, row_idx: usize) -> String {
    match cell {
        DataType::String(s) => s.trim().to_string(),
        DataType::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        DataType::Float(f) => f.to_string(),
        DataType::Int(i) => i.to_string(),
        DataType::Bool(b) => b.to_string(),
        DataType::Empty => "".to_string(),
        other => {
            warn!(
                "read_xlsx_survey: row {}: cannot read cell {:?}, treating it as blank",
                row_idx + 1,
                other
            );
            "".to_string()
        }
    }
}

fn get_range(path: &str, settings: &InputSettings) -> BSurveyResult<calamine::Range<DataType>> {
    let worksheet_name_o = settings.excel_worksheet_name.clone();
    debug!(
        "get_range: path: {:?} worksheet: {:?}",
        &path, &worksheet_name_o
    );
    let mut workbook: Xlsx<_> = open_workbook(path).context(OpeningExcelSnafu { path })?;

    // A worksheet name was provided, use it.
    if let Some(worksheet_name) = worksheet_name_o {
        let wrange = workbook
            .worksheet_range(&worksheet_name)
            .context(MissingWorksheetSnafu {
                path,
                worksheet: worksheet_name.clone(),
            })?
            .context(OpeningExcelSnafu { path })?;
        Ok(wrange)
    } else {
        let all_worksheets = workbook.worksheets();
        match all_worksheets.as_slice() {
            [] => Err(Box::new(SurveyError::EmptyExcel {
                path: path.to_string(),
            })),
            [(worksheet_name, wrange)] => {
                debug!(
                    "get_range: path: {:?} worksheet: {:?}",
                    &path, &worksheet_name
                );
                Ok(wrange.clone())
            }
            _ => {
                let names: Vec<&str> = all_worksheets.iter().map(|(n, _)| n.as_str()).collect();
                Err(Box::new(SurveyError::AmbiguousWorksheet {
                    path: path.to_string(),
                    worksheets: names.join(", "),
                }))
            }
        }
    }
}
