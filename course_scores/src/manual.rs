/*!

This is the long-form manual for `course_scores` and `courserank`.

## Input format

The input is the raw export of a survey platform, either as an Excel workbook
(`.xlsx`) or as a CSV file with the same layout:

| row | content                                                       |
|-----|---------------------------------------------------------------|
| 1   | column codes: `Finished`, `ResponseId`, `Q35_1`, `Q76_1`, ... |
| 2   | the full text of each question                                |
| 3   | import metadata from the platform (ignored)                   |
| 4+  | one response per row                                          |

The following columns are recognized:
* `Finished` (mandatory): the response is kept only if this is `1`, `true`, `True` or `TRUE`.
* `ResponseId` (optional): the identifier of the respondent. When absent, the
  respondent is identified by the file name and the row number.
* `Q35_*`: core courses ranked by preference, from 1 (best) to 8 (worst).
* `Q76_1`, `Q77_2`, `Q78_3`, `Q83_4`, `Q82_5`, `Q80_6`, `Q81_9`, `Q79_7`:
  elective courses rated from 1 (worst) to 5 (best).

When a column code appears more than once, only its first column is used. Empty
rows (a blank line in a CSV file, for example) are not responses, but they still
count in the numbering of the rows.

The name of the course is read from the question text, after the last ` - `.
For example `Please rank the core courses - Financial Accounting` is about
`Financial Accounting`.

## Scoring

Every answer is placed on a common scale from 0 to 100:

* rank `r`: `((9 - r) / 8) * 100`, so rank 1 is 100 and rank 8 is 0
* rating `v`: `((v - 1) / 4) * 100`, so rating 5 is 100 and rating 1 is 0

Blank answers are ignored. Answers that are not whole numbers, or that are
outside of the range of their column, are ignored as well under the default
`exclude` rule. The `reject` rule turns an out-of-range answer into an error.
Whole numbers too large to be represented are out of range.

The score of a course is the mean of all the scores of its answers, ranks and
ratings together. Courses are ordered from the highest score to the lowest.
Ties are resolved by course name (`courseName`, the default), or by the number
of answers and then by course name (`responseCount`).

## Configuration

The optional configuration file is a JSON document:

```json
{
  "outputSettings": { "surveyName": "Exit Survey 2024", "topCourses": 5 },
  "inputSettings": { "excelWorksheetName": "Sheet1" },
  "rules": { "tiebreakMode": "courseName", "outOfRangeRule": "exclude" }
}
```

All the fields are optional.

## Outputs

The following files are written in the output directory:
* `course_ranking.csv` the ranking, with the scores of each course
* `cleaned_responses_long.csv` every scored answer, one per line
* `course_ranking.svg` and `course_ranking_wide.svg` bar charts of the ranking
* `summary.md` the method and the top courses

The files are only replaced once all of them have been written successfully. If
the replacement fails, the previous files are put back.

*/
