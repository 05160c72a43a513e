// Rendering and writing of the outputs of a run.

use std::fmt::Write;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use snafu::prelude::*;

use crate::survey::*;

pub const RANKING_FILE: &str = "course_ranking.csv";
pub const LONG_FILE: &str = "cleaned_responses_long.csv";
pub const SUMMARY_FILE: &str = "summary.md";

const RANKING_HEADER: [&str; 8] = [
    "rank",
    "course",
    "overall_score",
    "num_responses",
    "core_pref_score",
    "core_n",
    "elective_rating_score",
    "elective_n",
];

const LONG_HEADER: [&str; 5] = [
    "response_id",
    "course",
    "source_type",
    "response_value",
    "normalized_score",
];

/// The look of a bar chart. Both charts show the same data.
#[derive(Debug, Clone, Copy)]
pub struct ChartStyle {
    pub file_name: &'static str,
    pub bar_color: &'static str,
    pub track_color: &'static str,
    /// Horizontal room given to the rank and the course name.
    pub label_width: usize,
}

pub const CHART_STYLES: [ChartStyle; 2] = [
    ChartStyle {
        file_name: "course_ranking.svg",
        bar_color: "#2563eb",
        track_color: "#e5e7eb",
        label_width: 170,
    },
    ChartStyle {
        file_name: "course_ranking_wide.svg",
        bar_color: "#0f766e",
        track_color: "#d1d5db",
        label_width: 320,
    },
];

pub const OUTPUT_FILES: [&str; 5] = [
    RANKING_FILE,
    LONG_FILE,
    CHART_STYLES[0].file_name,
    CHART_STYLES[1].file_name,
    SUMMARY_FILE,
];

const CHART_WIDTH: usize = 1100;
const CHART_ROW_HEIGHT: usize = 42;
const CHART_SCORE_WIDTH: usize = 220;
// Approximate width of a character of the label font.
const CHART_CHAR_WIDTH: usize = 7;

/// An output file, fully rendered in memory.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct RenderedOutput {
    pub file_name: String,
    pub contents: String,
}

fn format_score(score: Option<f64>) -> String {
    score.map(|x| format!("{:.2}", x)).unwrap_or_default()
}

fn render_csv(name: &str, header: &[&str], rows: &[Vec<String>]) -> BSurveyResult<String> {
    let mut buffer: Vec<u8> = Vec::new();
    {
        let mut wtr = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(&mut buffer);
        wtr.write_record(header)
            .context(RenderingCsvSnafu { name })?;
        for row in rows.iter() {
            wtr.write_record(row).context(RenderingCsvSnafu { name })?;
        }
        wtr.flush()
            .map_err(csv::Error::from)
            .context(RenderingCsvSnafu { name })?;
    }
    Ok(String::from_utf8_lossy(&buffer).to_string())
}

fn render_ranking(ranking: &[CourseSummary]) -> BSurveyResult<String> {
    let rows: Vec<Vec<String>> = ranking
        .iter()
        .map(|cs| {
            vec![
                cs.rank.to_string(),
                cs.course.clone(),
                format!("{:.2}", cs.mean_score),
                cs.count.to_string(),
                format_score(cs.core_score),
                cs.core_count.to_string(),
                format_score(cs.elective_score),
                cs.elective_count.to_string(),
            ]
        })
        .collect();
    render_csv(RANKING_FILE, &RANKING_HEADER, &rows)
}

fn render_long(records: &[MetricRecord]) -> BSurveyResult<String> {
    let rows: Vec<Vec<String>> = records
        .iter()
        .map(|r| {
            vec![
                r.response_id.clone(),
                r.course.clone(),
                r.kind.label().to_string(),
                r.raw_value.to_string(),
                format!("{:.6}", r.score),
            ]
        })
        .collect();
    render_csv(LONG_FILE, &LONG_HEADER, &rows)
}

/// Shortens a label that would overflow into the bars.
fn fit_label(label: &str, label_width: usize) -> String {
    let max_chars = label_width.saturating_sub(64) / CHART_CHAR_WIDTH;
    if label.chars().count() <= max_chars || max_chars == 0 {
        label.to_string()
    } else {
        let mut s: String = label.chars().take(max_chars - 1).collect();
        s.push('…');
        s
    }
}

fn render_chart(ranking: &[CourseSummary], survey_name: &str, style: &ChartStyle) -> String {
    let width = CHART_WIDTH;
    let margin = style.label_width;
    let bar_max = width - margin - CHART_SCORE_WIDTH;
    let height = 90 + CHART_ROW_HEIGHT * ranking.len();

    let mut out = String::new();
    let _ = writeln!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
        w = width,
        h = height
    );
    let _ = writeln!(
        out,
        "<style>text {{ font-family: Arial, sans-serif; fill: #1f2937; }} .title {{ font-size: 20px; font-weight: 700; }} .label {{ font-size: 13px; }} .score {{ font-size: 12px; }}</style>"
    );
    let _ = writeln!(
        out,
        r##"<rect x="0" y="0" width="100%" height="100%" fill="#ffffff"/>"##
    );
    let _ = writeln!(
        out,
        r#"<text x="24" y="34" class="title">{}: Course Ranking (Higher = Better)</text>"#,
        html_escape::encode_text(survey_name)
    );

    for (i, cs) in ranking.iter().enumerate() {
        let y = 62 + i * CHART_ROW_HEIGHT;
        let score = cs.mean_score.clamp(0.0, 100.0);
        let bar_w = (bar_max as f64 * score / 100.0) as usize;
        let label = fit_label(&cs.course, style.label_width);
        let _ = writeln!(
            out,
            r#"<text x="24" y="{}" class="label">#{}</text>"#,
            y + 19,
            cs.rank
        );
        let _ = writeln!(
            out,
            r#"<text x="56" y="{}" class="label">{}</text>"#,
            y + 19,
            html_escape::encode_text(&label)
        );
        let _ = writeln!(
            out,
            r#"<rect x="{}" y="{}" width="{}" height="20" fill="{}" rx="3"/>"#,
            margin, y, bar_max, style.track_color
        );
        let _ = writeln!(
            out,
            r#"<rect x="{}" y="{}" width="{}" height="20" fill="{}" rx="3"/>"#,
            margin, y, bar_w, style.bar_color
        );
        let _ = writeln!(
            out,
            r#"<text x="{}" y="{}" class="score">{:.1} (n={})</text>"#,
            margin + bar_max + 10,
            y + 15,
            cs.mean_score,
            cs.count
        );
    }
    out.push_str("</svg>\n");
    out
}

fn render_summary(
    result: &RankingResult,
    rules: &ScoringRules,
    survey_name: &str,
    top_courses: usize,
) -> String {
    let top: Vec<&CourseSummary> = result.ranking.iter().take(top_courses).collect();

    let mut output = String::new();
    let _ = writeln!(output, "# {} Course Ranking", survey_name);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Method");
    let _ = writeln!(
        output,
        "- Included only completed responses (`Finished` = 1 or true): {} completed, {} left out.",
        result.completed_responses, result.incomplete_responses
    );
    let _ = writeln!(
        output,
        "- Reshaped wide survey columns to long format in `{}`.",
        LONG_FILE
    );
    let _ = writeln!(
        output,
        "- Normalized scores to a 0-100 scale for comparability:"
    );
    let _ = writeln!(
        output,
        "  - Core ranked courses (`Q35_*`): `((9 - rank) / 8) * 100` (rank 1 is best)."
    );
    let _ = writeln!(
        output,
        "  - Elective ratings (`Q76_1` etc.): `((rating - 1) / 4) * 100` (rating 5 is best)."
    );
    if result.excluded_answers > 0 {
        let _ = writeln!(
            output,
            "- {} answers could not be scored and were left out.",
            result.excluded_answers
        );
    }
    let _ = writeln!(
        output,
        "- Overall course score is the mean of all normalized scores for that course."
    );
    let tiebreak = match rules.tiebreak_mode {
        TieBreakMode::CourseName => "course name",
        TieBreakMode::ResponseCount => "number of responses, then course name",
    };
    let _ = writeln!(output, "- Courses with the same score are ordered by {}.", tiebreak);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Top {} Courses", top.len());
    let _ = writeln!(output);
    let _ = writeln!(output, "| Rank | Course | Overall Score | N |");
    let _ = writeln!(output, "|---:|---|---:|---:|");
    for cs in top.iter() {
        let _ = writeln!(
            output,
            "| {} | {} | {:.2} | {} |",
            cs.rank,
            cs.course.replace('|', "\\|"),
            cs.mean_score,
            cs.count
        );
    }
    output
}

/// Renders every output in memory. Nothing is written.
pub fn render_outputs(
    result: &RankingResult,
    rules: &ScoringRules,
    survey_name: &str,
    top_courses: usize,
) -> BSurveyResult<Vec<RenderedOutput>> {
    let mut res: Vec<RenderedOutput> = vec![
        RenderedOutput {
            file_name: RANKING_FILE.to_string(),
            contents: render_ranking(&result.ranking)?,
        },
        RenderedOutput {
            file_name: LONG_FILE.to_string(),
            contents: render_long(&result.records)?,
        },
    ];
    for style in CHART_STYLES.iter() {
        res.push(RenderedOutput {
            file_name: style.file_name.to_string(),
            contents: render_chart(&result.ranking, survey_name, style),
        });
    }
    res.push(RenderedOutput {
        file_name: SUMMARY_FILE.to_string(),
        contents: render_summary(result, rules, survey_name, top_courses),
    });
    debug!("render_outputs: rendered {} outputs", res.len());
    Ok(res)
}

/// An output on its way to its destination.
struct StagedOutput {
    tmp: PathBuf,
    dest: PathBuf,
    /// The previous content of the destination, moved aside until the run succeeds.
    backup: Option<PathBuf>,
}

fn remove_quietly(path: &Path) {
    if path.exists() {
        if let Err(e) = fs::remove_file(path) {
            warn!("write_outputs: could not remove {:?}: {}", path, e);
        }
    }
}

/// Puts the directory back in its previous state. The first `replaced` outputs
/// already hold the new content.
fn roll_back(staged: &[StagedOutput], replaced: usize) {
    for (idx, s) in staged.iter().enumerate() {
        if idx < replaced {
            remove_quietly(&s.dest);
        }
        if let Some(backup) = &s.backup {
            if let Err(e) = fs::rename(backup, &s.dest) {
                warn!(
                    "write_outputs: could not restore {:?} from {:?}: {}",
                    s.dest, backup, e
                );
            }
        }
        remove_quietly(&s.tmp);
    }
}

fn write_failure(source: std::io::Error, path: &Path) -> Box<SurveyError> {
    Box::new(SurveyError::OutputWriteFailure {
        source,
        path: path.to_string_lossy().to_string(),
    })
}

/// Writes the outputs to the directory, replacing previous outputs.
///
/// Every output is first written to a temporary file next to its destination. Previous
/// outputs are then moved aside and the temporaries renamed into place. If any step
/// fails, the previous outputs are restored and no new output is left behind.
pub fn write_outputs(output_dir: &str, outputs: &[RenderedOutput]) -> BSurveyResult<()> {
    let dir = Path::new(output_dir);
    fs::create_dir_all(dir).context(OutputWriteFailureSnafu { path: output_dir })?;

    let mut staged: Vec<StagedOutput> = Vec::new();
    for o in outputs.iter() {
        let s = StagedOutput {
            tmp: dir.join(format!(".{}.tmp", o.file_name)),
            dest: dir.join(&o.file_name),
            backup: None,
        };
        debug!("write_outputs: writing {:?}", s.tmp);
        let res = fs::write(&s.tmp, o.contents.as_bytes());
        let tmp = s.tmp.clone();
        staged.push(s);
        if let Err(e) = res {
            roll_back(&staged, 0);
            return Err(write_failure(e, &tmp));
        }
    }

    // Only regular files are replaced.
    for s in staged.iter() {
        if let Ok(meta) = fs::symlink_metadata(&s.dest) {
            if !meta.is_file() {
                roll_back(&staged, 0);
                return Err(write_failure(
                    std::io::Error::new(
                        std::io::ErrorKind::AlreadyExists,
                        "the destination exists and is not a regular file",
                    ),
                    &s.dest,
                ));
            }
        }
    }

    for idx in 0..staged.len() {
        if !staged[idx].dest.exists() {
            continue;
        }
        let backup = dir.join(format!(".{}.bak", outputs[idx].file_name));
        if let Err(e) = fs::rename(&staged[idx].dest, &backup) {
            let dest = staged[idx].dest.clone();
            roll_back(&staged, 0);
            return Err(write_failure(e, &dest));
        }
        staged[idx].backup = Some(backup);
    }

    for (idx, s) in staged.iter().enumerate() {
        if let Err(e) = fs::rename(&s.tmp, &s.dest) {
            roll_back(&staged, idx);
            return Err(write_failure(e, &s.dest));
        }
    }

    for s in staged.iter() {
        if let Some(backup) = &s.backup {
            remove_quietly(backup);
        }
        info!("Wrote {:?}", s.dest);
    }
    Ok(())
}
