use crate::survey::*;

use log::debug;
use serde::{Deserialize, Serialize};
use snafu::prelude::*;
use std::fs;

pub const DEFAULT_SURVEY_NAME: &str = "Exit Survey";
pub const DEFAULT_TOP_COURSES: usize = 5;

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputSettings {
    #[serde(rename = "surveyName")]
    pub survey_name: Option<String>,
    #[serde(rename = "topCourses")]
    pub top_courses: Option<usize>,
}

impl OutputSettings {
    pub fn survey_name(&self) -> &str {
        self.survey_name.as_deref().unwrap_or(DEFAULT_SURVEY_NAME)
    }

    pub fn top_courses(&self) -> SurveyResult<usize> {
        match self.top_courses {
            None => Ok(DEFAULT_TOP_COURSES),
            Some(0) => InvalidOptionSnafu {
                option: "topCourses",
                value: "0",
            }
            .fail(),
            Some(x) => Ok(x),
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct InputSettings {
    #[serde(rename = "excelWorksheetName")]
    pub excel_worksheet_name: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct SurveyRules {
    #[serde(rename = "tiebreakMode")]
    pub tiebreak_mode: Option<String>,
    #[serde(rename = "outOfRangeRule")]
    pub out_of_range_rule: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct SurveyConfig {
    #[serde(rename = "outputSettings", default)]
    pub output_settings: OutputSettings,
    #[serde(rename = "inputSettings", default)]
    pub input_settings: InputSettings,
    #[serde(default)]
    pub rules: SurveyRules,
}

pub fn read_config(path: &str) -> BSurveyResult<SurveyConfig> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    debug!("read_config: read content: {:?}", contents);
    let config: SurveyConfig =
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path })?;
    Ok(config)
}

pub fn validate_rules(rules: &SurveyRules) -> SurveyResult<ScoringRules> {
    let res = ScoringRules {
        tiebreak_mode: match rules.tiebreak_mode.as_deref() {
            None | Some("courseName") => TieBreakMode::CourseName,
            Some("responseCount") => TieBreakMode::ResponseCount,
            Some(x) => {
                return InvalidOptionSnafu {
                    option: "tiebreakMode",
                    value: x,
                }
                .fail();
            }
        },
        out_of_range_rule: match rules.out_of_range_rule.as_deref() {
            None | Some("exclude") => OutOfRangeRule::Exclude,
            Some("reject") => OutOfRangeRule::Reject,
            Some(x) => {
                return InvalidOptionSnafu {
                    option: "outOfRangeRule",
                    value: x,
                }
                .fail();
            }
        },
    };
    Ok(res)
}

pub fn read_reference(path: &str) -> BSurveyResult<String> {
    let contents = fs::read_to_string(path).context(OpeningReferenceSnafu { path })?;
    Ok(contents)
}
