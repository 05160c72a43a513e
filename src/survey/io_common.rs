use std::collections::HashMap;
use std::path::Path;

use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use snafu::prelude::*;

use crate::survey::*;

pub const COMPLETION_COLUMN: &str = "Finished";
pub const ID_COLUMN: &str = "ResponseId";
pub const CORE_RANK_PREFIX: &str = "Q35_";
pub const ELECTIVE_RATING_COLUMNS: [&str; 8] = [
    "Q76_1", "Q77_2", "Q78_3", "Q83_4", "Q82_5", "Q80_6", "Q81_9", "Q79_7",
];

// Header, question text, import metadata, then the responses.
const HEADER_ROWS: usize = 3;

const UNKNOWN_COURSE: &str = "Unknown Course";

static NUMERIC_CELL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+(\.0+)?$").unwrap());

pub fn simplify_file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string())
}

pub fn make_default_id(path: &str) -> impl Fn(usize) -> String {
    let simplified_file_name = simplify_file_name(path);
    move |lineno| format!("{}-{:08}", simplified_file_name, lineno)
}

/// The course is named at the end of the question, after the last ` - `.
pub fn parse_course_name(question: &str) -> String {
    let name = match question.rsplit_once(" - ") {
        Some((_, course)) => course.trim(),
        None => question.trim(),
    };
    if name.is_empty() {
        UNKNOWN_COURSE.to_string()
    } else {
        name.to_string()
    }
}

pub fn is_finished(cell: &str) -> bool {
    matches!(cell.trim(), "1" | "true" | "TRUE" | "True")
}

pub fn read_answer(cell: &str) -> Answer {
    let s = cell.trim();
    if s.is_empty() {
        return Answer::Blank;
    }
    if !NUMERIC_CELL.is_match(s) {
        return Answer::Unreadable(s.to_string());
    }
    let whole = s.split('.').next().unwrap_or(s);
    // Only digits are left: a failure to parse is an overflow. Saturating keeps the
    // value out of range for every column.
    Answer::Numeric(whole.parse::<i64>().unwrap_or(i64::MAX))
}

fn cell(row: &[String], idx: usize) -> &str {
    row.get(idx).map(|s| s.as_str()).unwrap_or("")
}

/// Applies the column conventions of the export to the rows of the sheet.
///
/// Returns the scored columns (core ranks in header order, then the electives in their
/// fixed order) and every response, complete or not.
pub fn build_survey(
    path: &str,
    rows: &[Vec<String>],
) -> BSurveyResult<(Vec<SurveyColumn>, Vec<Response>)> {
    if rows.len() <= HEADER_ROWS {
        return Err(Box::new(SurveyError::TruncatedSheet {
            path: path.to_string(),
            rows: rows.len(),
        }));
    }
    let header = &rows[0];
    let questions = &rows[1];
    let num_cols = rows.iter().map(|r| r.len()).max().unwrap_or(0);

    let codes: Vec<String> = (0..num_cols)
        .map(|idx| match cell(header, idx) {
            "" => format!("COL_{}", idx),
            s => s.to_string(),
        })
        .collect();
    debug!("build_survey: header: {:?}", codes);

    // The first column wins when a code is repeated.
    let mut col_names: HashMap<&str, usize> = HashMap::new();
    for (idx, code) in codes.iter().enumerate() {
        let first_idx = *col_names.entry(code.as_str()).or_insert(idx);
        if first_idx != idx {
            warn!(
                "build_survey: column {} is repeated in {}, only the first one is used",
                code, path
            );
        }
    }

    let finished_idx = *col_names
        .get(COMPLETION_COLUMN)
        .context(SchemaMismatchSnafu {
            path,
            column: COMPLETION_COLUMN,
        })?;
    let id_idx = col_names.get(ID_COLUMN).cloned();

    let mut col_indexes: Vec<usize> = Vec::new();
    let mut columns: Vec<SurveyColumn> = Vec::new();
    for (idx, code) in codes.iter().enumerate() {
        if code.starts_with(CORE_RANK_PREFIX) && col_names.get(code.as_str()) == Some(&idx) {
            col_indexes.push(idx);
            columns.push(SurveyColumn {
                code: code.clone(),
                course: parse_course_name(cell(questions, idx)),
                kind: MetricKind::CoreRank,
            });
        }
    }
    for code in ELECTIVE_RATING_COLUMNS.iter() {
        if let Some(&idx) = col_names.get(code) {
            col_indexes.push(idx);
            columns.push(SurveyColumn {
                code: code.to_string(),
                course: parse_course_name(cell(questions, idx)),
                kind: MetricKind::ElectiveRating,
            });
        }
    }
    if columns.is_empty() {
        return Err(Box::new(SurveyError::SchemaMismatch {
            path: path.to_string(),
            column: format!("{}* or {}", CORE_RANK_PREFIX, ELECTIVE_RATING_COLUMNS.join(", ")),
        }));
    }
    debug!("build_survey: columns: {:?}", columns);

    let default_id = make_default_id(path);
    let mut responses: Vec<Response> = Vec::new();
    for (idx, row) in rows.iter().enumerate().skip(HEADER_ROWS) {
        // Rows are numbered from 1, as in the spreadsheet.
        let lineno = idx + 1;
        if row.iter().all(|c| c.trim().is_empty()) {
            debug!("build_survey: lineno: {:?} empty row, skipping", lineno);
            continue;
        }
        let id = match id_idx.map(|i| cell(row, i)) {
            Some(s) if !s.is_empty() => s.to_string(),
            _ => default_id(lineno),
        };
        let answers: Vec<Answer> = col_indexes.iter().map(|i| read_answer(cell(row, *i))).collect();
        let response = Response {
            id,
            completed: is_finished(cell(row, finished_idx)),
            answers,
        };
        debug!("build_survey: lineno: {:?} response: {:?}", lineno, response);
        responses.push(response);
    }
    Ok((columns, responses))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn course_names() {
        assert_eq!(
            parse_course_name("Please rank the core courses - Financial Accounting"),
            "Financial Accounting"
        );
        assert_eq!(
            parse_course_name("Rate the elective - Tax - Advanced Topics "),
            "Advanced Topics"
        );
        assert_eq!(parse_course_name(" Auditing "), "Auditing");
        assert_eq!(parse_course_name(""), "Unknown Course");
    }

    #[test]
    fn answers() {
        assert_eq!(read_answer(""), Answer::Blank);
        assert_eq!(read_answer("   "), Answer::Blank);
        assert_eq!(read_answer("3"), Answer::Numeric(3));
        assert_eq!(read_answer(" 4.0 "), Answer::Numeric(4));
        assert_eq!(read_answer("12"), Answer::Numeric(12));
        assert_eq!(read_answer("3.5"), Answer::Unreadable("3.5".to_string()));
        assert_eq!(read_answer("-1"), Answer::Unreadable("-1".to_string()));
        assert_eq!(read_answer("abc"), Answer::Unreadable("abc".to_string()));
        assert_eq!(read_answer("99999999999999999999"), Answer::Numeric(i64::MAX));
        assert_eq!(read_answer("99999999999999999999.0"), Answer::Numeric(i64::MAX));
    }

    #[test]
    fn completion_flag() {
        for s in ["1", "true", "TRUE", "True", " 1 "] {
            assert!(is_finished(s), "{:?}", s);
        }
        for s in ["0", "", "false", "yes", "1.0"] {
            assert!(!is_finished(s), "{:?}", s);
        }
    }

    #[test]
    fn survey_layout() {
        let rows = vec![
            row(&["Finished", "Q76_1", "Q35_2", "Comments", "Q35_1"]),
            row(&[
                "Finished",
                "Rate the elective - Data Analytics",
                "Rank the core courses - Auditing",
                "Any comments?",
                "Rank the core courses - Taxation",
            ]),
            row(&["{ImportId:finished}", "", "", "", ""]),
            row(&["1", "5", "2", "none", "1"]),
            row(&["0", "", "1"]),
        ];
        let (columns, responses) = build_survey("data/survey.csv", &rows).unwrap();
        let codes: Vec<&str> = columns.iter().map(|c| c.code.as_str()).collect();
        assert_eq!(codes, vec!["Q35_2", "Q35_1", "Q76_1"]);
        assert_eq!(columns[1].course, "Taxation");
        assert_eq!(columns[2].kind, MetricKind::ElectiveRating);

        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0].id, "survey.csv-00000004");
        assert!(responses[0].completed);
        assert_eq!(
            responses[0].answers,
            vec![Answer::Numeric(2), Answer::Numeric(1), Answer::Numeric(5)]
        );
        // Short rows are padded with blanks.
        assert!(!responses[1].completed);
        assert_eq!(
            responses[1].answers,
            vec![Answer::Numeric(1), Answer::Blank, Answer::Blank]
        );
    }

    #[test]
    fn repeated_codes_use_the_first_column() {
        let rows = vec![
            row(&["Finished", "Q35_1", "Q35_1", "Q76_1", "Q76_1"]),
            row(&[
                "Finished",
                "Rank - Auditing",
                "Rank - Auditing (copy)",
                "Rate - Ethics",
                "Rate - Ethics (copy)",
            ]),
            row(&["", "", "", "", ""]),
            row(&["1", "2", "7", "4", "1"]),
        ];
        let (columns, responses) = build_survey("survey.csv", &rows).unwrap();
        let courses: Vec<&str> = columns.iter().map(|c| c.course.as_str()).collect();
        assert_eq!(courses, vec!["Auditing", "Ethics"]);
        assert_eq!(
            responses[0].answers,
            vec![Answer::Numeric(2), Answer::Numeric(4)]
        );
    }

    #[test]
    fn empty_rows_are_not_responses() {
        let rows = vec![
            row(&["Finished", "ResponseId", "Q35_1"]),
            row(&["Finished", "Response ID", "Rank - Auditing"]),
            vec![],
            row(&["1", "R_1", "1"]),
            vec![],
            row(&["", " ", ""]),
            row(&["1", "", "3"]),
        ];
        let (_, responses) = build_survey("data/survey.csv", &rows).unwrap();
        let ids: Vec<&str> = responses.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["R_1", "survey.csv-00000007"]);
    }

    #[test]
    fn missing_completion_column() {
        let rows = vec![
            row(&["ResponseId", "Q35_1"]),
            row(&["Response ID", "Rank - Auditing"]),
            row(&["", ""]),
            row(&["R_1", "1"]),
        ];
        let res = build_survey("survey.csv", &rows).map_err(|e| *e);
        assert!(matches!(
            res,
            Err(SurveyError::SchemaMismatch { column, .. }) if column == "Finished"
        ));
    }

    #[test]
    fn missing_scored_columns() {
        let rows = vec![
            row(&["Finished", "ResponseId"]),
            row(&["Finished", "Response ID"]),
            row(&["", ""]),
            row(&["1", "R_1"]),
        ];
        let res = build_survey("survey.csv", &rows).map_err(|e| *e);
        assert!(matches!(res, Err(SurveyError::SchemaMismatch { .. })));
    }

    #[test]
    fn truncated_sheet() {
        let rows = vec![row(&["Finished", "Q35_1"]), row(&["", ""])];
        let res = build_survey("survey.csv", &rows).map_err(|e| *e);
        assert!(matches!(
            res,
            Err(SurveyError::TruncatedSheet { rows: 2, .. })
        ));
    }
}
