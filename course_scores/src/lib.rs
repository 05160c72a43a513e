pub mod builder;
mod config;
pub mod manual;

use log::{debug, info, warn};

use std::{
    cmp::Ordering,
    collections::BTreeMap,
    ops::AddAssign,
};

pub use crate::config::*;

// **** Private structures ****

#[derive(PartialEq, Debug, Clone, Copy, Default)]
struct ScoreTally {
    sum: f64,
    count: usize,
}

impl ScoreTally {
    fn mean(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.sum / self.count as f64)
        }
    }
}

impl AddAssign<f64> for ScoreTally {
    fn add_assign(&mut self, score: f64) {
        self.sum += score;
        self.count += 1;
    }
}

impl AddAssign for ScoreTally {
    fn add_assign(&mut self, rhs: ScoreTally) {
        self.sum += rhs.sum;
        self.count += rhs.count;
    }
}

#[derive(PartialEq, Debug, Clone, Default)]
struct CourseTally {
    core: ScoreTally,
    elective: ScoreTally,
}

impl CourseTally {
    fn overall(&self) -> ScoreTally {
        let mut total = self.core;
        total += self.elective;
        total
    }
}

struct ReshapeResult {
    records: Vec<MetricRecord>,
    completed: usize,
    incomplete: usize,
    excluded: usize,
}

// **** Normalization ****

/// Places a rank on the 0-100 scale. Rank 1 is the best and maps to 100.
///
/// Returns `None` for ranks outside of [1, 8].
pub fn normalize_rank(rank: i64) -> Option<f64> {
    if !(RANK_MIN..=RANK_MAX).contains(&rank) {
        return None;
    }
    let score = ((RANK_MAX + 1 - rank) as f64 / RANK_MAX as f64) * 100.0;
    Some(score.clamp(0.0, 100.0))
}

/// Places a rating on the 0-100 scale. Rating 5 is the best and maps to 100.
///
/// Returns `None` for ratings outside of [1, 5].
pub fn normalize_rating(rating: i64) -> Option<f64> {
    if !(RATING_MIN..=RATING_MAX).contains(&rating) {
        return None;
    }
    let score = ((rating - RATING_MIN) as f64 / (RATING_MAX - RATING_MIN) as f64) * 100.0;
    Some(score.clamp(0.0, 100.0))
}

pub fn normalize(kind: MetricKind, value: i64) -> Option<f64> {
    match kind {
        MetricKind::CoreRank => normalize_rank(value),
        MetricKind::ElectiveRating => normalize_rating(value),
    }
}

// **** Reshape ****

/// Turns the completed responses into long-format records, one per scored answer.
///
/// Incomplete responses and blank, unreadable or out-of-range answers produce no record.
pub fn reshape_responses(
    responses: &[Response],
    columns: &[SurveyColumn],
    rules: &ScoringRules,
) -> Result<Vec<MetricRecord>, ScoringErrors> {
    reshape(responses, columns, rules).map(|rr| rr.records)
}

fn reshape(
    responses: &[Response],
    columns: &[SurveyColumn],
    rules: &ScoringRules,
) -> Result<ReshapeResult, ScoringErrors> {
    let mut res = ReshapeResult {
        records: Vec::new(),
        completed: 0,
        incomplete: 0,
        excluded: 0,
    };

    for response in responses.iter() {
        if response.answers.len() != columns.len() {
            return Err(ScoringErrors::MismatchedAnswers {
                response_id: response.id.clone(),
                expected: columns.len(),
                found: response.answers.len(),
            });
        }
        if !response.completed {
            debug!("reshape: skipping incomplete response {}", response.id);
            res.incomplete += 1;
            continue;
        }
        res.completed += 1;

        for (column, answer) in columns.iter().zip(response.answers.iter()) {
            let value = match answer {
                Answer::Blank => continue,
                Answer::Unreadable(s) => {
                    warn!(
                        "reshape: response {}: cannot read {:?} in column {}, skipping",
                        response.id, s, column.code
                    );
                    res.excluded += 1;
                    continue;
                }
                Answer::Numeric(v) => *v,
            };
            match normalize(column.kind, value) {
                Some(score) => res.records.push(MetricRecord {
                    response_id: response.id.clone(),
                    course: column.course.clone(),
                    kind: column.kind,
                    raw_value: value,
                    score,
                }),
                None if rules.out_of_range_rule == OutOfRangeRule::Reject => {
                    return Err(ScoringErrors::ValueOutOfRange {
                        response_id: response.id.clone(),
                        column: column.code.clone(),
                        value,
                    });
                }
                None => {
                    let (lo, hi) = column.kind.valid_range();
                    warn!(
                        "reshape: response {}: value {} in column {} outside of [{}, {}], skipping",
                        response.id, value, column.code, lo, hi
                    );
                    res.excluded += 1;
                }
            }
        }
    }
    Ok(res)
}

// **** Aggregation ****

/// Groups the records by course and orders the courses from the best mean score to the worst.
pub fn summarize_courses(records: &[MetricRecord], tiebreak: TieBreakMode) -> Vec<CourseSummary> {
    let mut tallies: BTreeMap<&str, CourseTally> = BTreeMap::new();
    for r in records.iter() {
        let tally = tallies.entry(r.course.as_str()).or_default();
        match r.kind {
            MetricKind::CoreRank => tally.core += r.score,
            MetricKind::ElectiveRating => tally.elective += r.score,
        }
    }
    debug!("summarize_courses: tallies: {:?}", tallies);

    let mut summaries: Vec<CourseSummary> = tallies
        .iter()
        .filter_map(|(course, tally)| {
            let overall = tally.overall();
            overall.mean().map(|mean_score| CourseSummary {
                rank: 0,
                course: course.to_string(),
                mean_score,
                count: overall.count,
                core_score: tally.core.mean(),
                core_count: tally.core.count,
                elective_score: tally.elective.mean(),
                elective_count: tally.elective.count,
            })
        })
        .collect();

    summaries.sort_by(|a, b| compare_summaries(a, b, tiebreak));
    for (idx, s) in summaries.iter_mut().enumerate() {
        s.rank = (idx + 1) as u32;
    }
    summaries
}

fn compare_summaries(a: &CourseSummary, b: &CourseSummary, tiebreak: TieBreakMode) -> Ordering {
    let by_score = b.mean_score.total_cmp(&a.mean_score);
    let by_count = match tiebreak {
        TieBreakMode::CourseName => Ordering::Equal,
        TieBreakMode::ResponseCount => b.count.cmp(&a.count),
    };
    by_score
        .then(by_count)
        .then_with(|| a.course.cmp(&b.course))
}

/// Runs the whole scoring with the given rules for the given responses.
///
/// Arguments:
/// * `responses` the survey responses, complete or not, in the order of the export
/// * `columns` the scored columns. Each response has one answer per column, in this order.
/// * `rules` the rules that govern the scoring
pub fn run_course_ranking(
    responses: &[Response],
    columns: &[SurveyColumn],
    rules: &ScoringRules,
) -> Result<RankingResult, ScoringErrors> {
    info!(
        "run_course_ranking: Processing {:?} responses over {:?} columns, rules: {:?}",
        responses.len(),
        columns.len(),
        rules
    );

    let reshaped = reshape(responses, columns, rules)?;
    if reshaped.completed == 0 {
        return Err(ScoringErrors::NoCompletedResponses);
    }
    info!(
        "run_course_ranking: {} completed responses, {} incomplete, {} records, {} excluded answers",
        reshaped.completed,
        reshaped.incomplete,
        reshaped.records.len(),
        reshaped.excluded
    );

    let ranking = summarize_courses(&reshaped.records, rules.tiebreak_mode);
    if ranking.is_empty() {
        warn!("run_course_ranking: no answer could be scored, the ranking is empty");
    }
    for s in ranking.iter() {
        info!(
            "Rank {}: {:.2} {} (n={})",
            s.rank, s.mean_score, s.course, s.count
        );
    }

    Ok(RankingResult {
        records: reshaped.records,
        ranking,
        completed_responses: reshaped.completed,
        incomplete_responses: reshaped.incomplete,
        excluded_answers: reshaped.excluded,
    })
}
