use std::cmp::Ordering;
use std::collections::HashMap;

use crate::models::{FeedbackRow, LeaderboardRow, TrainerAggregate, DIMENSION_COUNT};

pub const MIN_RESPONSES: usize = 3;
pub const OVERALL_WEIGHT: f64 = 0.6;
pub const LATE_WEIGHT: f64 = 0.4;

/// Groups rows by trainer, drops trainers below `MIN_RESPONSES` and ranks the
/// rest by descending score. Equal scores fall back to trainer identity.
pub fn score_trainers(rows: &[FeedbackRow]) -> Vec<TrainerAggregate> {
    let mut groups: HashMap<&str, Vec<FeedbackRow>> = HashMap::new();
    for row in rows {
        groups.entry(row.trainer.as_str()).or_default().push(row.clone());
    }

    let mut ranked: Vec<TrainerAggregate> = groups
        .into_iter()
        .filter(|(trainer, group)| {
            let qualifies = group.len() >= MIN_RESPONSES;
            if !qualifies {
                tracing::debug!(trainer = %trainer, responses = group.len(), "below response threshold");
            }
            qualifies
        })
        .map(|(trainer, group)| aggregate(trainer.to_string(), group))
        .collect();

    ranked.sort_by(compare_rank);
    ranked
}

fn compare_rank(a: &TrainerAggregate, b: &TrainerAggregate) -> Ordering {
    b.trainer_score
        .total_cmp(&a.trainer_score)
        .then_with(|| a.trainer.cmp(&b.trainer))
}

pub fn aggregate(trainer: String, mut rows: Vec<FeedbackRow>) -> TrainerAggregate {
    // Stable sort: responses with equal timestamps keep file order.
    rows.sort_by_key(|row| row.responded_at);

    let means: Vec<f64> = rows.iter().map(FeedbackRow::rating_mean).collect();
    let mid = rows.len() / 2;
    let overall_avg = mean(&means);
    let late_half_avg = mean(&means[mid..]);
    let early_half_avg = if mid == 0 {
        overall_avg
    } else {
        mean(&means[..mid])
    };

    let mut dimension_avgs = [0.0; DIMENSION_COUNT];
    for (idx, slot) in dimension_avgs.iter_mut().enumerate() {
        let column: Vec<f64> = rows.iter().map(|row| row.ratings[idx]).collect();
        *slot = mean(&column);
    }

    TrainerAggregate {
        trainer,
        rows,
        overall_avg,
        early_half_avg,
        late_half_avg,
        dimension_avgs,
        trainer_score: blend(overall_avg, late_half_avg),
    }
}

pub fn blend(overall_avg: f64, late_half_avg: f64) -> f64 {
    OVERALL_WEIGHT * overall_avg + LATE_WEIGHT * late_half_avg
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Rounds to two decimals for display and serialization. Never yields `-0.0`.
pub fn round2(value: f64) -> f64 {
    let rounded = (value * 100.0).round() / 100.0;
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

pub fn leaderboard(ranked: &[TrainerAggregate]) -> Vec<LeaderboardRow> {
    ranked
        .iter()
        .enumerate()
        .map(|(idx, agg)| LeaderboardRow {
            rank: idx + 1,
            trainer: agg.trainer.clone(),
            n_responses: agg.response_count(),
            overall_avg: round2(agg.overall_avg),
            late_half_avg: round2(agg.late_half_avg),
            early_half_avg: round2(agg.early_half_avg),
            improvement: round2(agg.improvement()),
            trainer_score: round2(agg.trainer_score),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Dimension;
    use chrono::{Duration, NaiveDate, NaiveDateTime};

    fn day(offset: i64) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
            + Duration::days(offset)
    }

    fn row(trainer: &str, offset: i64, rating: f64) -> FeedbackRow {
        FeedbackRow {
            row_id: format!("ROW-{offset:03}"),
            trainer: trainer.to_string(),
            responded_at: day(offset),
            ratings: [rating; DIMENSION_COUNT],
            comments: Vec::new(),
        }
    }

    #[test]
    fn three_responses_match_hand_computed_score() {
        // Deliberately out of file order: the split must follow dates.
        let rows = vec![row("ana", 2, 9.0), row("ana", 0, 5.0), row("ana", 1, 7.0)];
        let ranked = score_trainers(&rows);
        assert_eq!(ranked.len(), 1);
        let ana = &ranked[0];
        assert!((ana.overall_avg - 7.0).abs() < 1e-9);
        assert!((ana.late_half_avg - 8.0).abs() < 1e-9);
        assert!((ana.early_half_avg - 5.0).abs() < 1e-9);
        assert!((ana.trainer_score - 7.4).abs() < 1e-9);
        assert!((ana.improvement() - 3.0).abs() < 1e-9);
    }

    #[test]
    fn row_mean_averages_all_six_dimensions() {
        let mut r = row("ana", 0, 0.0);
        r.ratings = [4.0, 5.0, 6.0, 7.0, 8.0, 9.0];
        assert!((r.rating_mean() - 6.5).abs() < 1e-9);
    }

    #[test]
    fn late_half_includes_middle_element_for_odd_counts() {
        let rows = vec![
            row("ana", 0, 2.0),
            row("ana", 1, 4.0),
            row("ana", 2, 6.0),
            row("ana", 3, 8.0),
            row("ana", 4, 10.0),
        ];
        let agg = aggregate("ana".to_string(), rows);
        // indices [2, 5) -> 6, 8, 10
        assert!((agg.late_half_avg - 8.0).abs() < 1e-9);
        assert!((agg.early_half_avg - 3.0).abs() < 1e-9);
    }

    #[test]
    fn tiny_groups_have_defined_halves() {
        let single = aggregate("ana".to_string(), vec![row("ana", 0, 6.0)]);
        assert_eq!(single.late_half_avg, 6.0);
        assert_eq!(single.early_half_avg, 6.0);

        let pair = aggregate("ana".to_string(), vec![row("ana", 1, 8.0), row("ana", 0, 4.0)]);
        assert_eq!(pair.late_half_avg, 8.0);
        assert_eq!(pair.early_half_avg, 4.0);
    }

    #[test]
    fn trainers_below_threshold_are_excluded() {
        let rows = vec![
            row("ana", 0, 9.0),
            row("ana", 1, 9.0),
            row("ben", 0, 5.0),
            row("ben", 1, 5.0),
            row("ben", 2, 5.0),
        ];
        let ranked = score_trainers(&rows);
        let names: Vec<&str> = ranked.iter().map(|a| a.trainer.as_str()).collect();
        assert_eq!(names, ["ben"]);
    }

    #[test]
    fn ranking_is_descending_with_name_tiebreak() {
        let mut rows = Vec::new();
        for trainer in ["cara", "ana", "ben"] {
            let rating = if trainer == "ben" { 9.0 } else { 7.0 };
            for offset in 0..3 {
                rows.push(row(trainer, offset, rating));
            }
        }
        let ranked = score_trainers(&rows);
        let names: Vec<&str> = ranked.iter().map(|a| a.trainer.as_str()).collect();
        assert_eq!(names, ["ben", "ana", "cara"]);

        let reversed: Vec<FeedbackRow> = rows.into_iter().rev().collect();
        let again = score_trainers(&reversed);
        let names_again: Vec<&str> = again.iter().map(|a| a.trainer.as_str()).collect();
        assert_eq!(names, names_again);
        for (a, b) in ranked.iter().zip(&again) {
            assert_eq!(a.trainer_score, b.trainer_score);
        }
    }

    #[test]
    fn no_qualifying_trainers_yields_empty_ranking() {
        let rows = vec![row("ana", 0, 9.0), row("ben", 0, 9.0)];
        assert!(score_trainers(&rows).is_empty());
        assert!(leaderboard(&[]).is_empty());
    }

    #[test]
    fn leaderboard_rounds_for_display() {
        let rows = vec![row("ana", 0, 7.0), row("ana", 1, 7.0), row("ana", 2, 8.0)];
        let ranked = score_trainers(&rows);
        let board = leaderboard(&ranked);
        assert_eq!(board[0].rank, 1);
        assert_eq!(board[0].n_responses, 3);
        assert_eq!(board[0].overall_avg, 7.33);
        assert_eq!(board[0].late_half_avg, 7.5);
        assert_eq!(board[0].trainer_score, 7.4);
    }

    #[test]
    fn tiny_late_dip_rounds_to_positive_zero() {
        assert!(round2(-0.001).is_sign_positive());
        assert_eq!(round2(-0.006), -0.01);

        let mut rows: Vec<FeedbackRow> = (0..4).map(|offset| row("ana", offset, 8.0)).collect();
        rows[3].ratings[5] = 7.99;
        let ranked = score_trainers(&rows);
        assert!(ranked[0].improvement() < 0.0);
        let board = leaderboard(&ranked);
        assert_eq!(board[0].improvement, 0.0);
        assert!(board[0].improvement.is_sign_positive());
    }

    #[test]
    fn strongest_dimension_prefers_first_on_ties() {
        let mut rows = vec![row("ana", 0, 5.0), row("ana", 1, 5.0), row("ana", 2, 5.0)];
        for r in rows.iter_mut() {
            r.ratings[4] = 9.0;
        }
        let agg = aggregate("ana".to_string(), rows.clone());
        assert_eq!(agg.strongest_dimension(), Dimension::Motivation);

        for r in rows.iter_mut() {
            r.ratings = [5.0; DIMENSION_COUNT];
        }
        let flat = aggregate("ana".to_string(), rows);
        assert_eq!(flat.strongest_dimension(), Dimension::FocusedTeaching);
    }
}
