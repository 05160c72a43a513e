pub use crate::config::*;

/// A builder for adding survey responses.
///
/// ```
/// pub use course_scores::builder::Builder;
/// pub use course_scores::{Answer, MetricKind, ScoringRules, SurveyColumn};
/// # use course_scores::ScoringErrors;
///
/// let mut builder = Builder::new(&ScoringRules::DEFAULT_RULES)?.columns(&[SurveyColumn {
///     code: "Q35_1".to_string(),
///     course: "Audit".to_string(),
///     kind: MetricKind::CoreRank,
/// }])?;
///
/// builder.add_response("R_1", true, &[Answer::Numeric(1)])?;
/// let result = builder.run()?;
/// assert_eq!(result.ranking[0].mean_score, 100.0);
///
/// # Ok::<(), ScoringErrors>(())
/// ```
pub struct Builder {
    pub(crate) _rules: ScoringRules,
    pub(crate) _columns: Vec<SurveyColumn>,
    pub(crate) _responses: Vec<Response>,
}

impl Builder {
    pub fn new(rules: &ScoringRules) -> Result<Builder, ScoringErrors> {
        Ok(Builder {
            _rules: rules.clone(),
            _columns: Vec::new(),
            _responses: Vec::new(),
        })
    }

    /// Sets the scored columns. Responses added before are dropped.
    pub fn columns(self, cols: &[SurveyColumn]) -> Result<Builder, ScoringErrors> {
        Ok(Builder {
            _rules: self._rules,
            _columns: cols.to_vec(),
            _responses: Vec::new(),
        })
    }

    /// Adds a response, with one answer per column in the order of the columns.
    pub fn add_response(
        &mut self,
        id: &str,
        completed: bool,
        answers: &[Answer],
    ) -> Result<(), ScoringErrors> {
        self.add_response_2(&Response {
            id: id.to_string(),
            completed,
            answers: answers.to_vec(),
        })
    }

    pub fn add_response_2(&mut self, response: &Response) -> Result<(), ScoringErrors> {
        if response.answers.len() != self._columns.len() {
            return Err(ScoringErrors::MismatchedAnswers {
                response_id: response.id.clone(),
                expected: self._columns.len(),
                found: response.answers.len(),
            });
        }
        self._responses.push(response.clone());
        Ok(())
    }

    pub fn run(&self) -> Result<RankingResult, ScoringErrors> {
        crate::run_course_ranking(&self._responses, &self._columns, &self._rules)
    }
}
