use log::{debug, info, warn};

use course_scores::builder::Builder;
use course_scores::*;
use snafu::{prelude::*, Snafu};

use std::path::Path;

use text_diff::print_diff;

use crate::survey::config_reader::*;

mod config_reader;
mod io_common;
mod io_csv;
mod io_xlsx;
mod report;

#[derive(Debug, Snafu)]
pub enum SurveyError {
    #[snafu(display("Input file not found: {path}"))]
    InputNotFound { path: String },

    #[snafu(display("Unknown input type {input_type}: expected xlsx or csv"))]
    UnknownInputType { input_type: String },

    #[snafu(display("Error opening file {path}: {source}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("The workbook {path} does not contain any worksheet"))]
    EmptyExcel { path: String },
    #[snafu(display("Cannot find the worksheet {worksheet} in {path}"))]
    MissingWorksheet { path: String, worksheet: String },
    #[snafu(display(
        "The workbook {path} has several worksheets ({worksheets}), the worksheet name must be provided"
    ))]
    AmbiguousWorksheet { path: String, worksheets: String },

    #[snafu(display("Error opening CSV file {path}: {source}"))]
    CsvOpen { source: csv::Error, path: String },
    #[snafu(display("Error reading line {lineno} of {path}: {source}"))]
    CsvLineParse {
        source: csv::Error,
        path: String,
        lineno: usize,
    },

    #[snafu(display(
        "The sheet in {path} has {rows} rows, expected a header, a question row, a metadata row and at least one response"
    ))]
    TruncatedSheet { path: String, rows: usize },
    #[snafu(display("Required column {column} is missing from {path}"))]
    SchemaMismatch { path: String, column: String },
    #[snafu(display("No completed response in {path}"))]
    NoCompletedResponses { path: String },
    #[snafu(display("Scoring failed: {source}"))]
    Scoring { source: ScoringErrors },

    #[snafu(display("Cannot render {name}: {source}"))]
    RenderingCsv { source: csv::Error, name: String },
    #[snafu(display("Cannot write outputs to {path}: {source}"))]
    OutputWriteFailure {
        source: std::io::Error,
        path: String,
    },

    #[snafu(display("Error opening file {path}: {source}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing the configuration {path}: {source}"))]
    ParsingJson {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("Invalid value {value:?} for option {option}"))]
    InvalidOption { option: String, value: String },

    #[snafu(display("Error opening the reference {path}: {source}"))]
    OpeningReference {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Difference detected between the computed ranking and the reference {path}"))]
    ReferenceMismatch { path: String },
}

type SurveyResult<T> = Result<T, SurveyError>;

type BSurveyResult<T> = Result<T, Box<SurveyError>>;

/// The format of the survey export.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
enum InputType {
    Xlsx,
    Csv,
}

fn input_type(path: &str, input_type: Option<&str>) -> SurveyResult<InputType> {
    match input_type {
        Some("xlsx") => Ok(InputType::Xlsx),
        Some("csv") => Ok(InputType::Csv),
        Some(x) => UnknownInputTypeSnafu { input_type: x }.fail(),
        None => {
            let is_csv = Path::new(path)
                .extension()
                .map(|ext| ext.eq_ignore_ascii_case("csv"))
                .unwrap_or(false);
            if is_csv {
                Ok(InputType::Csv)
            } else {
                Ok(InputType::Xlsx)
            }
        }
    }
}

fn read_survey_data(
    path: &str,
    input_type_o: Option<&str>,
    settings: &InputSettings,
) -> BSurveyResult<Vec<Vec<String>>> {
    if !Path::new(path).is_file() {
        return Err(Box::new(SurveyError::InputNotFound {
            path: path.to_string(),
        }));
    }
    let it = input_type(path, input_type_o)?;
    info!("Attempting to read survey file {:?} as {:?}", path, it);
    let rows = match it {
        InputType::Xlsx => io_xlsx::read_xlsx_survey(path, settings)?,
        InputType::Csv => io_csv::read_csv_survey(path)?,
    };
    debug!("read_survey_data: {} rows read from {:?}", rows.len(), path);
    Ok(rows)
}

fn check_reference(reference_path: &str, computed: &str) -> BSurveyResult<()> {
    let reference = read_reference(reference_path)?;
    if reference != computed {
        warn!("Found differences with the reference ranking");
        print_diff(reference.as_str(), computed, "\n");
        return Err(Box::new(SurveyError::ReferenceMismatch {
            path: reference_path.to_string(),
        }));
    }
    info!("The computed ranking matches the reference {:?}", reference_path);
    Ok(())
}

/// Reads the survey, ranks the courses and writes all the outputs.
pub fn run_survey(
    input_path: &str,
    output_dir: &str,
    input_type_o: Option<&str>,
    config_path: Option<&str>,
    reference_path: Option<&str>,
) -> BSurveyResult<()> {
    let config: SurveyConfig = match config_path {
        Some(p) => read_config(p)?,
        None => SurveyConfig::default(),
    };
    info!("config: {:?}", config);

    // Validate the rules:
    let rules = validate_rules(&config.rules)?;
    let top_courses = config.output_settings.top_courses()?;

    let rows = read_survey_data(input_path, input_type_o, &config.input_settings)?;
    let (columns, responses) = io_common::build_survey(input_path, &rows)?;
    info!(
        "Read {} responses with {} scored columns",
        responses.len(),
        columns.len()
    );

    let mut builder = Builder::new(&rules)
        .context(ScoringSnafu {})?
        .columns(&columns)
        .context(ScoringSnafu {})?;
    for r in responses.iter() {
        builder.add_response_2(r).context(ScoringSnafu {})?;
    }

    let result = match builder.run() {
        Ok(x) => x,
        Err(ScoringErrors::NoCompletedResponses) => {
            return Err(Box::new(SurveyError::NoCompletedResponses {
                path: input_path.to_string(),
            }));
        }
        Err(x) => {
            return Err(Box::new(SurveyError::Scoring { source: x }));
        }
    };

    let outputs = report::render_outputs(
        &result,
        &rules,
        config.output_settings.survey_name(),
        top_courses,
    )?;
    report::write_outputs(output_dir, &outputs)?;

    // The reference ranking, if provided for comparison
    if let Some(reference_p) = reference_path {
        let computed = outputs
            .iter()
            .find(|o| o.file_name == report::RANKING_FILE)
            .map(|o| o.contents.as_str())
            .unwrap_or_default();
        check_reference(reference_p, computed)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;

    fn test_data(name: &str) -> String {
        format!("{}/tests/data/{}", env!("CARGO_MANIFEST_DIR"), name)
    }

    fn read_output(dir: &Path, name: &str) -> String {
        fs::read_to_string(dir.join(name)).unwrap()
    }

    #[test]
    fn input_type_from_extension() {
        assert_eq!(input_type("a/b.csv", None).unwrap(), InputType::Csv);
        assert_eq!(input_type("a/b.CSV", None).unwrap(), InputType::Csv);
        assert_eq!(input_type("a/b.xlsx", None).unwrap(), InputType::Xlsx);
        assert_eq!(input_type("a/b", None).unwrap(), InputType::Xlsx);
        assert_eq!(input_type("a/b.xlsx", Some("csv")).unwrap(), InputType::Csv);
        assert!(matches!(
            input_type("a/b.xlsx", Some("ods")),
            Err(SurveyError::UnknownInputType { .. })
        ));
    }

    #[test]
    fn exit_survey_csv() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("outputs");
        run_survey(
            &test_data("exit_survey.csv"),
            out.to_str().unwrap(),
            None,
            None,
            Some(&test_data("exit_survey_expected_ranking.csv")),
        )
        .unwrap();

        let ranking = read_output(&out, report::RANKING_FILE);
        assert_eq!(
            ranking,
            fs::read_to_string(test_data("exit_survey_expected_ranking.csv")).unwrap()
        );

        let long = read_output(&out, report::LONG_FILE);
        let lines: Vec<&str> = long.lines().collect();
        assert_eq!(
            lines[0],
            "response_id,course,source_type,response_value,normalized_score"
        );
        assert_eq!(lines[1], "R_1,Financial Accounting,core_rank,1,100.000000");
        assert_eq!(lines[7], "R_2,Financial Accounting,core_rank,2,87.500000");
        assert_eq!(lines.len(), 19);
        assert!(!long.contains("R_3,"));
        assert!(!long.contains("R_6,"));

        for chart in report::CHART_STYLES.iter() {
            let svg = read_output(&out, chart.file_name);
            assert!(svg.starts_with("<svg"));
            assert!(svg.contains(chart.bar_color));
        }

        let summary = read_output(&out, report::SUMMARY_FILE);
        assert!(summary.contains("| 1 | Financial Accounting | 93.75 | 2 |"));
        assert!(summary.contains("| 5 | Data Analytics | 75.00 | 3 |"));
        assert!(!summary.contains("Forensic Accounting |"));
    }

    #[test]
    fn exit_survey_xlsx_matches_csv() {
        let dir = tempfile::tempdir().unwrap();
        let from_csv = dir.path().join("csv");
        let from_xlsx = dir.path().join("xlsx");
        run_survey(
            &test_data("exit_survey.csv"),
            from_csv.to_str().unwrap(),
            None,
            None,
            None,
        )
        .unwrap();
        run_survey(
            &test_data("exit_survey.xlsx"),
            from_xlsx.to_str().unwrap(),
            None,
            None,
            None,
        )
        .unwrap();
        for name in [report::RANKING_FILE, report::LONG_FILE, report::SUMMARY_FILE] {
            assert_eq!(read_output(&from_csv, name), read_output(&from_xlsx, name));
        }
    }

    #[test]
    fn rerun_is_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("outputs");
        let input = test_data("exit_survey.csv");
        run_survey(&input, out.to_str().unwrap(), None, None, None).unwrap();
        let first: Vec<String> = report::OUTPUT_FILES
            .iter()
            .map(|n| read_output(&out, n))
            .collect();
        run_survey(&input, out.to_str().unwrap(), None, None, None).unwrap();
        let second: Vec<String> = report::OUTPUT_FILES
            .iter()
            .map(|n| read_output(&out, n))
            .collect();
        assert_eq!(first, second);
    }

    #[test]
    fn config_changes_tiebreak_and_title() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("outputs");
        run_survey(
            &test_data("exit_survey.csv"),
            out.to_str().unwrap(),
            None,
            Some(&test_data("exit_survey_config.json")),
            None,
        )
        .unwrap();
        let ranking = read_output(&out, report::RANKING_FILE);
        let lines: Vec<&str> = ranking.lines().collect();
        assert_eq!(lines[4], "4,Data Analytics,75.00,3,,0,75.00,3");
        assert_eq!(lines[5], "5,Business Ethics,75.00,2,,0,75.00,2");
        let summary = read_output(&out, report::SUMMARY_FILE);
        assert!(summary.starts_with("# MAcc Exit Survey 2024 Course Ranking"));
        assert!(summary.contains("## Top 3 Courses"));
        assert!(!summary.contains("| 4 |"));
    }

    #[test]
    fn missing_input() {
        let dir = tempfile::tempdir().unwrap();
        let res = run_survey(
            &test_data("does_not_exist.xlsx"),
            dir.path().to_str().unwrap(),
            None,
            None,
            None,
        );
        assert!(matches!(
            res.map_err(|e| *e),
            Err(SurveyError::InputNotFound { .. })
        ));
    }

    #[test]
    fn only_incomplete_responses() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("outputs");
        let res = run_survey(
            &test_data("all_incomplete.csv"),
            out.to_str().unwrap(),
            None,
            None,
            None,
        );
        assert!(matches!(
            res.map_err(|e| *e),
            Err(SurveyError::NoCompletedResponses { .. })
        ));
        // Nothing is written when the scoring fails.
        assert!(!out.exists());
    }

    #[test]
    fn reference_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("outputs");
        let reference = dir.path().join("reference.csv");
        fs::write(&reference, "rank,course\n1,Auditing\n").unwrap();
        let res = run_survey(
            &test_data("exit_survey.csv"),
            out.to_str().unwrap(),
            None,
            None,
            reference.to_str(),
        );
        assert!(matches!(
            res.map_err(|e| *e),
            Err(SurveyError::ReferenceMismatch { .. })
        ));
    }

    #[test]
    fn overflowing_value_follows_the_out_of_range_rule() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("survey.csv");
        fs::write(
            &input,
            "Finished,ResponseId,Q35_1,Q35_2\n\
             Finished,Response ID,Rank - Auditing,Rank - Taxation\n\
             ,,,\n\
             1,R_1,99999999999999999999,1\n",
        )
        .unwrap();
        let config = dir.path().join("config.json");
        fs::write(&config, r#"{ "rules": { "outOfRangeRule": "reject" } }"#).unwrap();

        let res = run_survey(
            input.to_str().unwrap(),
            dir.path().join("rejected").to_str().unwrap(),
            None,
            config.to_str(),
            None,
        );
        assert!(matches!(
            res.map_err(|e| *e),
            Err(SurveyError::Scoring {
                source: ScoringErrors::ValueOutOfRange { .. }
            })
        ));

        let out = dir.path().join("excluded");
        run_survey(
            input.to_str().unwrap(),
            out.to_str().unwrap(),
            None,
            None,
            None,
        )
        .unwrap();
        let ranking = read_output(&out, report::RANKING_FILE);
        assert!(ranking.contains("1,Taxation,100.00,1"));
        assert!(!ranking.contains("Auditing"));
    }
}
