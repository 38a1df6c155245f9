use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DIMENSION_COUNT: usize = 6;

/// The six rated dimensions of a feedback response, in survey column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    FocusedTeaching,
    Participation,
    TheoryIntoPractice,
    Concentration,
    Motivation,
    Clarity,
}

impl Dimension {
    pub const ALL: [Dimension; DIMENSION_COUNT] = [
        Dimension::FocusedTeaching,
        Dimension::Participation,
        Dimension::TheoryIntoPractice,
        Dimension::Concentration,
        Dimension::Motivation,
        Dimension::Clarity,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Dimension::FocusedTeaching => "keeping learners focused",
            Dimension::Participation => "inviting participation",
            Dimension::TheoryIntoPractice => "putting theory into practice",
            Dimension::Concentration => "staying concentrated",
            Dimension::Motivation => "motivation",
            Dimension::Clarity => "clear explanations",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackRow {
    pub row_id: String,
    pub trainer: String,
    pub responded_at: NaiveDateTime,
    pub ratings: [f64; DIMENSION_COUNT],
    pub comments: Vec<String>,
}

impl FeedbackRow {
    /// Mean of the six ratings.
    pub fn rating_mean(&self) -> f64 {
        self.ratings.iter().sum::<f64>() / DIMENSION_COUNT as f64
    }
}

#[derive(Debug, Clone)]
pub struct TrainerAggregate {
    pub trainer: String,
    /// The trainer's rows in chronological order.
    pub rows: Vec<FeedbackRow>,
    pub overall_avg: f64,
    pub early_half_avg: f64,
    pub late_half_avg: f64,
    pub dimension_avgs: [f64; DIMENSION_COUNT],
    pub trainer_score: f64,
}

impl TrainerAggregate {
    pub fn response_count(&self) -> usize {
        self.rows.len()
    }

    pub fn improvement(&self) -> f64 {
        self.late_half_avg - self.early_half_avg
    }

    pub fn strongest_dimension(&self) -> Dimension {
        let mut best = 0;
        for (idx, value) in self.dimension_avgs.iter().enumerate() {
            if *value > self.dimension_avgs[best] {
                best = idx;
            }
        }
        Dimension::ALL[best]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderboardRow {
    pub rank: usize,
    pub trainer: String,
    pub n_responses: usize,
    pub overall_avg: f64,
    pub late_half_avg: f64,
    pub early_half_avg: f64,
    pub improvement: f64,
    pub trainer_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceQuote {
    pub row_id: String,
    pub quote: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopTrainer {
    pub rank: usize,
    pub trainer_name: String,
    pub n_responses: usize,
    pub trainer_score: f64,
    pub overall_avg: f64,
    pub late_half_avg: f64,
    pub early_half_avg: f64,
    pub improvement: f64,
    pub strongest_dimension: Dimension,
    pub evidence_quotes: Vec<EvidenceQuote>,
    pub case_study_angle: String,
}

/// Contents of `results.json`, the handoff between the two stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoutResults {
    pub generated_at: DateTime<Utc>,
    pub min_responses: usize,
    pub qualifying_trainers: usize,
    pub top_trainers: Vec<TopTrainer>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftStatus {
    Draft,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutreachDraft {
    pub draft_id: Uuid,
    pub trainer_name: String,
    pub trainer_display_name: String,
    pub subject: String,
    pub body: String,
    pub trainer_score: f64,
    pub n_responses: usize,
    pub case_study_angle: String,
    pub send_priority: usize,
    pub generated_at: DateTime<Utc>,
    pub status: DraftStatus,
}
