use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Deserialize;

use crate::error::{MalformedRow, ScoutError};
use crate::models::{FeedbackRow, DIMENSION_COUNT};

const DATE_FORMATS: [&str; 3] = ["%b %d, %Y %I:%M %p", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Required logical columns with every header name accepted for them.
const REQUIRED_COLUMNS: [(&str, &[&str]); 8] = [
    ("Trainer", &["Trainer", "trainer"]),
    ("Creation Date", &["Creation Date", "date", "response_date"]),
    (
        "1.3 teaching style rating",
        &[
            "1.3_The trainer\u{2019}s teaching style helped me to stay concentrated.*",
            "rating_1",
        ],
    ),
    (
        "1.4 participation rating",
        &["1.4_The trainer offered the opportunity to participate.*", "rating_2"],
    ),
    (
        "2.8 theory into practice rating",
        &[
            "2.8_The trainer was helpful in explaining how to put theory into practice.*",
            "rating_3",
        ],
    ),
    (
        "v1_1.2 concentration rating",
        &["v1_1.2_I perceived the trainer as concentrated.*", "rating_4"],
    ),
    (
        "v2_1.1 motivation rating",
        &["v2_1.1_I perceived the trainer as motivated.*", "rating_5"],
    ),
    (
        "v2_1.2 clarity rating",
        &["v2_1.2_ The trainer was very clear in their explanations.*", "rating_6"],
    ),
];

/// Optional columns; only checked for duplicate headers.
const OPTIONAL_COLUMNS: [(&str, &[&str]); 5] = [
    ("completed", &["completed"]),
    (
        "3.12 liked most",
        &["3.12_What did you like most about their training style?*", "liked_most"],
    ),
    (
        "3.13 highlight",
        &[
            "3.13_Could you please share a highlight from the training? What stood out to you as particularly enjoyable or beneficial?*",
            "highlight",
        ],
    ),
    (
        "2.6 rapport",
        &[
            "2.6_Did the trainer establish good rapport with the learners? Did they make you feel at ease to ask question, interact, and\u{a0}engage with the training? Give details.*",
            "rapport",
        ],
    ),
    ("comment", &["comment", "Comment", "comments"]),
];

#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(rename = "Trainer", alias = "trainer")]
    trainer: Option<String>,
    #[serde(rename = "Creation Date", alias = "date", alias = "response_date")]
    date: Option<String>,
    completed: Option<String>,
    #[serde(
        rename = "1.3_The trainer\u{2019}s teaching style helped me to stay concentrated.*",
        alias = "rating_1"
    )]
    focused_teaching: Option<String>,
    #[serde(
        rename = "1.4_The trainer offered the opportunity to participate.*",
        alias = "rating_2"
    )]
    participation: Option<String>,
    #[serde(
        rename = "2.8_The trainer was helpful in explaining how to put theory into practice.*",
        alias = "rating_3"
    )]
    theory_into_practice: Option<String>,
    #[serde(
        rename = "v1_1.2_I perceived the trainer as concentrated.*",
        alias = "rating_4"
    )]
    concentration: Option<String>,
    #[serde(rename = "v2_1.1_I perceived the trainer as motivated.*", alias = "rating_5")]
    motivation: Option<String>,
    #[serde(
        rename = "v2_1.2_ The trainer was very clear in their explanations.*",
        alias = "rating_6"
    )]
    clarity: Option<String>,
    #[serde(
        rename = "3.12_What did you like most about their training style?*",
        alias = "liked_most"
    )]
    liked_most: Option<String>,
    #[serde(
        rename = "3.13_Could you please share a highlight from the training? What stood out to you as particularly enjoyable or beneficial?*",
        alias = "highlight"
    )]
    highlight: Option<String>,
    #[serde(
        rename = "2.6_Did the trainer establish good rapport with the learners? Did they make you feel at ease to ask question, interact, and\u{a0}engage with the training? Give details.*",
        alias = "rapport"
    )]
    rapport: Option<String>,
    #[serde(rename = "comment", alias = "Comment", alias = "comments")]
    comment: Option<String>,
}

#[derive(Debug, Default)]
pub struct LoadedFeedback {
    pub rows: Vec<FeedbackRow>,
    pub malformed: Vec<MalformedRow>,
    /// Rows dropped because the survey was not marked completed.
    pub incomplete: usize,
}

pub fn load_feedback(csv_path: &Path) -> Result<LoadedFeedback, ScoutError> {
    if !csv_path.is_file() {
        return Err(ScoutError::InputNotFound {
            path: csv_path.to_path_buf(),
        });
    }

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .from_path(csv_path)?;
    let headers = reader.headers()?.clone();
    for (column, accepted) in REQUIRED_COLUMNS.into_iter().chain(OPTIONAL_COLUMNS) {
        let matches = headers.iter().filter(|h| accepted.contains(h)).count();
        if matches > 1 {
            return Err(ScoutError::DuplicateColumn {
                column,
                path: csv_path.to_path_buf(),
            });
        }
    }
    for (column, accepted) in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| accepted.contains(&h)) {
            return Err(ScoutError::MissingColumn {
                column,
                path: csv_path.to_path_buf(),
            });
        }
    }
    let has_completed = headers.iter().any(|h| h == "completed");

    let mut loaded = LoadedFeedback::default();
    for (idx, result) in reader.deserialize::<CsvRow>().enumerate() {
        let row_id = format!("ROW-{:03}", idx + 1);
        let row = match result {
            Ok(row) => row,
            Err(err) => {
                tracing::warn!(row_id = %row_id, error = %err, "skipping unreadable row");
                loaded.malformed.push(MalformedRow {
                    row_id,
                    reason: err.to_string(),
                });
                continue;
            }
        };

        if has_completed && !is_completed(row.completed.as_deref()) {
            tracing::debug!(row_id = %row_id, "dropping incomplete response");
            loaded.incomplete += 1;
            continue;
        }

        match convert_row(row_id.clone(), row) {
            Ok(feedback) => loaded.rows.push(feedback),
            Err(reason) => {
                tracing::warn!(row_id = %row_id, reason = %reason, "skipping malformed row");
                loaded.malformed.push(MalformedRow { row_id, reason });
            }
        }
    }

    tracing::info!(
        path = %csv_path.display(),
        rows = loaded.rows.len(),
        malformed = loaded.malformed.len(),
        incomplete = loaded.incomplete,
        "loaded feedback"
    );
    Ok(loaded)
}

fn is_completed(value: Option<&str>) -> bool {
    value.is_some_and(|v| v.trim().eq_ignore_ascii_case("yes"))
}

fn convert_row(row_id: String, row: CsvRow) -> Result<FeedbackRow, String> {
    let trainer = non_blank(row.trainer.as_deref()).ok_or("missing trainer")?;
    let raw_date = non_blank(row.date.as_deref()).ok_or("missing response date")?;
    let responded_at =
        parse_response_date(raw_date).ok_or_else(|| format!("unparseable date `{raw_date}`"))?;

    let raw_ratings: [Option<&str>; DIMENSION_COUNT] = [
        row.focused_teaching.as_deref(),
        row.participation.as_deref(),
        row.theory_into_practice.as_deref(),
        row.concentration.as_deref(),
        row.motivation.as_deref(),
        row.clarity.as_deref(),
    ];
    let mut ratings = [0.0; DIMENSION_COUNT];
    for (slot, raw) in ratings.iter_mut().zip(raw_ratings) {
        *slot = parse_rating(raw)?;
    }

    let comments = [row.liked_most, row.highlight, row.rapport, row.comment]
        .into_iter()
        .flatten()
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
        .collect();

    Ok(FeedbackRow {
        row_id,
        trainer: trainer.to_string(),
        responded_at,
        ratings,
        comments,
    })
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

pub fn parse_response_date(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .map(|date| date.and_time(NaiveTime::MIN))
        })
}

fn parse_rating(raw: Option<&str>) -> Result<f64, String> {
    let raw = non_blank(raw).ok_or("missing rating")?;
    let value: f64 = raw
        .parse()
        .map_err(|_| format!("non-numeric rating `{raw}`"))?;
    if !(1.0..=10.0).contains(&value) {
        return Err(format!("rating {value} outside 1-10"));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const HEADER: &str = "trainer,date,completed,rating_1,rating_2,rating_3,rating_4,rating_5,rating_6,comment";

    fn write_csv(body: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{HEADER}").unwrap();
        write!(file, "{body}").unwrap();
        file
    }

    #[test]
    fn parses_survey_and_iso_dates() {
        let survey = parse_response_date("Mar 04, 2025 02:15 PM").unwrap();
        assert_eq!(survey.to_string(), "2025-03-04 14:15:00");
        let iso = parse_response_date("2025-03-04").unwrap();
        assert_eq!(iso.to_string(), "2025-03-04 00:00:00");
        assert!(parse_response_date("yesterday").is_none());
    }

    #[test]
    fn loads_rows_with_stable_ids() {
        let file = write_csv(
            "ana@x.io,2025-01-01,yes,8,8,8,8,8,8,Great pacing\n\
             ben@x.io,2025-01-02,Yes ,7,7,7,7,7,7,\n",
        );
        let loaded = load_feedback(file.path()).unwrap();
        assert_eq!(loaded.rows.len(), 2);
        assert_eq!(loaded.rows[0].row_id, "ROW-001");
        assert_eq!(loaded.rows[1].row_id, "ROW-002");
        assert_eq!(loaded.rows[0].comments, vec!["Great pacing".to_string()]);
        assert!(loaded.rows[1].comments.is_empty());
        assert_eq!(loaded.rows[1].rating_mean(), 7.0);
    }

    #[test]
    fn skips_malformed_rows_and_keeps_the_rest() {
        let file = write_csv(
            "ana@x.io,2025-01-01,yes,8,8,8,8,8,8,\n\
             ana@x.io,2025-01-02,yes,8,abc,8,8,8,8,\n\
             ana@x.io,not a date,yes,8,8,8,8,8,8,\n\
             ,2025-01-03,yes,8,8,8,8,8,8,\n\
             ana@x.io,2025-01-04,yes,8,8,8,8,8,11,\n\
             ana@x.io,2025-01-05,yes,8,8,8,8,,8,\n",
        );
        let loaded = load_feedback(file.path()).unwrap();
        assert_eq!(loaded.rows.len(), 1);
        let skipped: Vec<&str> = loaded.malformed.iter().map(|m| m.row_id.as_str()).collect();
        assert_eq!(skipped, ["ROW-002", "ROW-003", "ROW-004", "ROW-005", "ROW-006"]);
        assert!(loaded.malformed[0].reason.contains("non-numeric"));
    }

    #[test]
    fn drops_incomplete_responses() {
        let file = write_csv(
            "ana@x.io,2025-01-01,no,8,8,8,8,8,8,\n\
             ana@x.io,2025-01-02,,8,8,8,8,8,8,\n\
             ana@x.io,2025-01-03,yes,8,8,8,8,8,8,\n",
        );
        let loaded = load_feedback(file.path()).unwrap();
        assert_eq!(loaded.rows.len(), 1);
        assert_eq!(loaded.incomplete, 2);
        assert!(loaded.malformed.is_empty());
    }

    #[test]
    fn missing_file_is_input_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_feedback(&dir.path().join("absent.csv")).unwrap_err();
        assert!(matches!(err, ScoutError::InputNotFound { .. }));
    }

    #[test]
    fn missing_rating_column_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "trainer,date,rating_1,rating_2,rating_3,rating_4,rating_5").unwrap();
        writeln!(file, "ana@x.io,2025-01-01,8,8,8,8,8").unwrap();
        let err = load_feedback(file.path()).unwrap_err();
        assert!(matches!(
            err,
            ScoutError::MissingColumn { column: "v2_1.2 clarity rating", .. }
        ));
    }

    #[test]
    fn padded_headers_still_match() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            " trainer , date ,rating_1,rating_2,rating_3,rating_4,rating_5, rating_6 "
        )
        .unwrap();
        writeln!(file, "ana@x.io,2025-01-01,8,8,8,8,8,8").unwrap();
        let loaded = load_feedback(file.path()).unwrap();
        assert_eq!(loaded.rows.len(), 1);
        assert!(loaded.malformed.is_empty());
        assert_eq!(loaded.rows[0].trainer, "ana@x.io");
    }

    #[test]
    fn two_headers_for_one_column_are_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "Trainer,trainer,date,rating_1,rating_2,rating_3,rating_4,rating_5,rating_6"
        )
        .unwrap();
        writeln!(file, "ana@x.io,ana@x.io,2025-01-01,8,8,8,8,8,8").unwrap();
        let err = load_feedback(file.path()).unwrap_err();
        assert!(matches!(err, ScoutError::DuplicateColumn { column: "Trainer", .. }));
        assert!(err.to_string().contains("more than one header"));
    }

    #[test]
    fn reads_survey_export_headers() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let headers = [
            "Trainer",
            "Creation Date",
            "completed",
            "1.3_The trainer\u{2019}s teaching style helped me to stay concentrated.*",
            "1.4_The trainer offered the opportunity to participate.*",
            "2.8_The trainer was helpful in explaining how to put theory into practice.*",
            "v1_1.2_I perceived the trainer as concentrated.*",
            "v2_1.1_I perceived the trainer as motivated.*",
            "v2_1.2_ The trainer was very clear in their explanations.*",
            "3.12_What did you like most about their training style?*",
        ];
        let mut writer = csv::Writer::from_writer(file.as_file_mut());
        writer.write_record(headers).unwrap();
        writer
            .write_record([
                "ana@x.io",
                "Jan 05, 2025 03:30 PM",
                "Yes",
                "9",
                "8",
                "7",
                "9",
                "10",
                "9",
                "She made every exercise feel relevant to my job.",
            ])
            .unwrap();
        writer.flush().unwrap();
        drop(writer);

        let loaded = load_feedback(file.path()).unwrap();
        assert_eq!(loaded.rows.len(), 1);
        let row = &loaded.rows[0];
        assert_eq!(row.trainer, "ana@x.io");
        assert_eq!(row.ratings, [9.0, 8.0, 7.0, 9.0, 10.0, 9.0]);
        assert_eq!(row.comments.len(), 1);
    }
}
