// ********* Input data structures ***********

use std::error::Error;
use std::fmt::Display;

/// The two families of survey questions that can be scored.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub enum MetricKind {
    /// Core courses ordered by the respondent, from 1 (best) to 8 (worst).
    CoreRank,
    /// Elective courses rated by the respondent, from 1 (worst) to 5 (best).
    ElectiveRating,
}

impl MetricKind {
    /// The label used for this kind in the long-format outputs.
    pub const fn label(self) -> &'static str {
        match self {
            MetricKind::CoreRank => "core_rank",
            MetricKind::ElectiveRating => "elective_rating",
        }
    }

    /// The inclusive range of values accepted for this kind.
    pub const fn valid_range(self) -> (i64, i64) {
        match self {
            MetricKind::CoreRank => (RANK_MIN, RANK_MAX),
            MetricKind::ElectiveRating => (RATING_MIN, RATING_MAX),
        }
    }
}

pub const RANK_MIN: i64 = 1;
pub const RANK_MAX: i64 = 8;
pub const RATING_MIN: i64 = 1;
pub const RATING_MAX: i64 = 5;

/// A scored column of the survey.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct SurveyColumn {
    /// The code of the column in the export (for example `Q35_1`).
    pub code: String,
    /// The course this column is about.
    pub course: String,
    pub kind: MetricKind,
}

/// All the possible states of an answer in a response, as read from the sheet.
///
/// In most cases, it is enough to use the higher-level builder API.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub enum Answer {
    /// Nothing was entered.
    Blank,
    /// A whole number, not yet checked against the range of the column.
    Numeric(i64),
    /// Some content that cannot be read as a whole number.
    Unreadable(String),
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Response {
    pub id: String,
    pub completed: bool,
    /// One answer per survey column, in the order of the columns.
    pub answers: Vec<Answer>,
}

// ******** Output data structures *********

/// One answer of one respondent, placed on the common 0-100 scale.
#[derive(PartialEq, Debug, Clone)]
pub struct MetricRecord {
    pub response_id: String,
    pub course: String,
    pub kind: MetricKind,
    pub raw_value: i64,
    pub score: f64,
}

#[derive(PartialEq, Debug, Clone)]
pub struct CourseSummary {
    /// Position in the ranking, starting at 1.
    pub rank: u32,
    pub course: String,
    pub mean_score: f64,
    pub count: usize,
    pub core_score: Option<f64>,
    pub core_count: usize,
    pub elective_score: Option<f64>,
    pub elective_count: usize,
}

#[derive(PartialEq, Debug, Clone)]
pub struct RankingResult {
    /// Every record that contributed to the ranking, in response then column order.
    pub records: Vec<MetricRecord>,
    pub ranking: Vec<CourseSummary>,
    pub completed_responses: usize,
    pub incomplete_responses: usize,
    /// Answers that were present but could not be scored.
    pub excluded_answers: usize,
}

/// Errors that prevent the scoring from completing successfully.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum ScoringErrors {
    NoCompletedResponses,
    /// A response does not have one answer per column.
    MismatchedAnswers {
        response_id: String,
        expected: usize,
        found: usize,
    },
    /// Only raised with `OutOfRangeRule::Reject`.
    ValueOutOfRange {
        response_id: String,
        column: String,
        value: i64,
    },
}

impl Error for ScoringErrors {}

impl Display for ScoringErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScoringErrors::NoCompletedResponses => {
                write!(f, "no completed response in the survey")
            }
            ScoringErrors::MismatchedAnswers {
                response_id,
                expected,
                found,
            } => write!(
                f,
                "response {} has {} answers, expected {}",
                response_id, found, expected
            ),
            ScoringErrors::ValueOutOfRange {
                response_id,
                column,
                value,
            } => write!(
                f,
                "response {}: value {} in column {} is out of range",
                response_id, value, column
            ),
        }
    }
}

// ********* Configuration **********

/// How to order courses that have the same mean score.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum TieBreakMode {
    /// Course name, ascending.
    CourseName,
    /// Number of records, descending, then course name ascending.
    ResponseCount,
}

/// What to do with a whole number that is outside the range of its column.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum OutOfRangeRule {
    /// Treat the answer as missing.
    Exclude,
    /// Stop the scoring with an error.
    Reject,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ScoringRules {
    pub tiebreak_mode: TieBreakMode,
    pub out_of_range_rule: OutOfRangeRule,
}

impl ScoringRules {
    pub const DEFAULT_RULES: ScoringRules = ScoringRules {
        tiebreak_mode: TieBreakMode::CourseName,
        out_of_range_rule: OutOfRangeRule::Exclude,
    };
}
