use std::fmt::Write;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};

use crate::error::ScoutError;
use crate::models::{EvidenceQuote, LeaderboardRow, ScoutResults, TopTrainer, TrainerAggregate};
use crate::score::{self, MIN_RESPONSES};

pub const TOP_N: usize = 2;
pub const RESULTS_FILE: &str = "results.json";
pub const REPORT_FILE: &str = "report.html";
pub const LEADERBOARD_FILE: &str = "leaderboard.csv";

const QUOTES_PER_TRAINER: usize = 2;
const MIN_QUOTE_CHARS: usize = 20;
const CONSOLE_QUOTE_CHARS: usize = 120;

pub fn build_results(ranked: &[TrainerAggregate], generated_at: DateTime<Utc>) -> ScoutResults {
    let top_trainers = ranked
        .iter()
        .take(TOP_N)
        .enumerate()
        .map(|(idx, agg)| TopTrainer {
            rank: idx + 1,
            trainer_name: agg.trainer.clone(),
            n_responses: agg.response_count(),
            trainer_score: score::round2(agg.trainer_score),
            overall_avg: score::round2(agg.overall_avg),
            late_half_avg: score::round2(agg.late_half_avg),
            early_half_avg: score::round2(agg.early_half_avg),
            improvement: score::round2(agg.improvement()),
            strongest_dimension: agg.strongest_dimension(),
            evidence_quotes: evidence_quotes(agg),
            case_study_angle: case_study_angle(agg),
        })
        .collect();

    ScoutResults {
        generated_at,
        min_responses: MIN_RESPONSES,
        qualifying_trainers: ranked.len(),
        top_trainers,
    }
}

/// Picks the longest substantive comments, longest first.
pub fn evidence_quotes(agg: &TrainerAggregate) -> Vec<EvidenceQuote> {
    let mut candidates: Vec<EvidenceQuote> = agg
        .rows
        .iter()
        .flat_map(|row| {
            row.comments.iter().map(move |text| EvidenceQuote {
                row_id: row.row_id.clone(),
                quote: text.trim().replace(['\r', '\n'], " "),
            })
        })
        .filter(|candidate| candidate.quote.chars().count() > MIN_QUOTE_CHARS)
        .collect();

    candidates.sort_by_key(|candidate| std::cmp::Reverse(candidate.quote.chars().count()));
    candidates.truncate(QUOTES_PER_TRAINER);
    candidates
}

pub fn case_study_angle(agg: &TrainerAggregate) -> String {
    let overall = score::round2(agg.overall_avg);
    let responses = agg.response_count();
    let strength = agg.strongest_dimension().label();
    let improvement = score::round2(agg.improvement());

    if improvement > 0.0 {
        format!(
            "Strong overall performance (avg {overall:.2}/10 across {responses} reviews) \
             with visible improvement over time (+{improvement:.2} pts), rated highest for {strength}. \
             Great candidate for a 'growth journey' testimonial."
        )
    } else {
        format!(
            "Consistently high performer (avg {overall:.2}/10 across {responses} reviews), \
             rated highest for {strength}. Ideal for a 'best practices' case study."
        )
    }
}

fn signed(value: f64) -> String {
    if value >= 0.0 {
        format!("+{value:.2}")
    } else {
        format!("{value:.2}")
    }
}

pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

const STYLE: &str = r#"  body { font-family: 'Segoe UI', system-ui, sans-serif; max-width: 900px; margin: 40px auto; padding: 0 20px; background: #f8f9fa; color: #333; }
  h1 { color: #1a1a2e; border-bottom: 3px solid #e94560; padding-bottom: 10px; }
  h2 { color: #e94560; margin-top: 40px; }
  .trainer-card { background: #fff; border-radius: 12px; padding: 24px; margin: 20px 0; box-shadow: 0 2px 8px rgba(0,0,0,0.08); }
  .rank { font-size: 2em; font-weight: bold; color: #e94560; float: left; margin-right: 16px; }
  .stats { display: grid; grid-template-columns: repeat(4, 1fr); gap: 12px; margin: 16px 0; }
  .stat { background: #f0f0f5; border-radius: 8px; padding: 12px; text-align: center; }
  .stat-value { font-size: 1.4em; font-weight: bold; color: #1a1a2e; }
  .stat-label { font-size: 0.85em; color: #666; }
  .quote { background: #fffde7; border-left: 4px solid #ffc107; padding: 12px 16px; margin: 8px 0; font-style: italic; }
  .quote .row-id { font-style: normal; font-size: 0.8em; color: #999; }
  .angle { background: #e8f5e9; padding: 12px 16px; border-radius: 8px; margin-top: 12px; }
  .empty { background: #fff3e0; padding: 16px; border-radius: 8px; }
  table { width: 100%; border-collapse: collapse; margin: 20px 0; background: #fff; }
  th { background: #1a1a2e; color: #fff; padding: 12px; text-align: left; }
  td { padding: 10px 12px; border-bottom: 1px solid #eee; }
  .footer { text-align: center; color: #999; margin-top: 40px; font-size: 0.85em; }
"#;

pub fn render_html(results: &ScoutResults, board: &[LeaderboardRow]) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "<!DOCTYPE html>");
    let _ = writeln!(output, "<html lang=\"en\">");
    let _ = writeln!(output, "<head>");
    let _ = writeln!(output, "<meta charset=\"UTF-8\">");
    let _ = writeln!(output, "<title>Trainer Scout Report</title>");
    let _ = writeln!(output, "<style>\n{STYLE}</style>");
    let _ = writeln!(output, "</head>");
    let _ = writeln!(output, "<body>");
    let _ = writeln!(output, "<h1>Trainer Scout</h1>");
    let _ = writeln!(
        output,
        "<p>Generated: {} &middot; {} qualifying trainer(s)</p>",
        results.generated_at.format("%Y-%m-%d %H:%M UTC"),
        results.qualifying_trainers
    );

    if results.top_trainers.is_empty() {
        let _ = writeln!(
            output,
            "<div class=\"empty\">No qualifying trainers: nobody reached {} responses.</div>",
            results.min_responses
        );
    }

    for trainer in &results.top_trainers {
        write_card(&mut output, trainer);
    }

    let _ = writeln!(output, "<h2>Full Trainer Leaderboard</h2>");
    let _ = writeln!(output, "<table>");
    let _ = writeln!(
        output,
        "<tr><th>#</th><th>Trainer</th><th>Score</th><th>Avg Rating</th><th>Late-half Avg</th><th>Improvement</th><th>Responses</th></tr>"
    );
    if board.is_empty() {
        let _ = writeln!(output, "<tr><td colspan=\"7\">No qualifying trainers.</td></tr>");
    }
    for row in board {
        let _ = writeln!(
            output,
            "<tr><td>{}</td><td>{}</td><td><strong>{:.2}</strong></td><td>{:.2}/10</td><td>{:.2}/10</td><td>{}</td><td>{}</td></tr>",
            row.rank,
            escape_html(&row.trainer),
            row.trainer_score,
            row.overall_avg,
            row.late_half_avg,
            signed(row.improvement),
            row.n_responses
        );
    }
    let _ = writeln!(output, "</table>");

    let _ = writeln!(output, "<div class=\"footer\">");
    let _ = writeln!(
        output,
        "  <p>Score = {:.0}% overall rating avg + {:.0}% later-half avg | Min responses: {}</p>",
        score::OVERALL_WEIGHT * 100.0,
        score::LATE_WEIGHT * 100.0,
        results.min_responses
    );
    let _ = writeln!(output, "</div>");
    let _ = writeln!(output, "</body></html>");

    output
}

fn write_card(output: &mut String, trainer: &TopTrainer) {
    let _ = writeln!(output, "<div class=\"trainer-card\">");
    let _ = writeln!(output, "  <div class=\"rank\">#{}</div>", trainer.rank);
    let _ = writeln!(output, "  <h2>{}</h2>", escape_html(&trainer.trainer_name));
    let _ = writeln!(output, "  <div class=\"stats\">");
    let stats = [
        (format!("{:.2}", trainer.trainer_score), "Trainer Score"),
        (format!("{:.2}/10", trainer.overall_avg), "Overall Average"),
        (signed(trainer.improvement), "Improvement (early to late)"),
        (trainer.n_responses.to_string(), "Responses"),
    ];
    for (value, label) in stats {
        let _ = writeln!(
            output,
            "    <div class=\"stat\"><div class=\"stat-value\">{value}</div><div class=\"stat-label\">{label}</div></div>"
        );
    }
    let _ = writeln!(output, "  </div>");
    let _ = writeln!(output, "  <h3>Evidence Quotes</h3>");
    if trainer.evidence_quotes.is_empty() {
        let _ = writeln!(output, "  <p>No written feedback available.</p>");
    }
    for quote in &trainer.evidence_quotes {
        let _ = writeln!(
            output,
            "  <div class=\"quote\">&ldquo;{}&rdquo; <span class=\"row-id\">[{}]</span></div>",
            escape_html(&quote.quote),
            escape_html(&quote.row_id)
        );
    }
    let _ = writeln!(
        output,
        "  <div class=\"angle\"><strong>Case Study Angle:</strong> {}</div>",
        escape_html(&trainer.case_study_angle)
    );
    let _ = writeln!(output, "</div>");
}

/// Writes `results.json`, `report.html` and `leaderboard.csv` into `out_dir`.
///
/// Every artifact is attempted; a failure is logged and reported at the end
/// without removing the artifacts that were written.
pub fn write_artifacts(
    out_dir: &Path,
    results: &ScoutResults,
    board: &[LeaderboardRow],
) -> Result<(), ScoutError> {
    fs::create_dir_all(out_dir)?;

    let attempts: [(&str, Result<(), ScoutError>); 3] = [
        (RESULTS_FILE, write_results(&out_dir.join(RESULTS_FILE), results)),
        (
            REPORT_FILE,
            fs::write(out_dir.join(REPORT_FILE), render_html(results, board)).map_err(Into::into),
        ),
        (
            LEADERBOARD_FILE,
            write_leaderboard(&out_dir.join(LEADERBOARD_FILE), board),
        ),
    ];

    let mut failed = Vec::new();
    for (name, outcome) in attempts {
        let path = out_dir.join(name);
        match outcome {
            Ok(()) => tracing::info!(path = %path.display(), "wrote artifact"),
            Err(err) => {
                tracing::error!(path = %path.display(), error = %err, "failed to write artifact");
                failed.push(name.to_string());
            }
        }
    }

    if failed.is_empty() {
        Ok(())
    } else {
        Err(ScoutError::ArtifactWrite { failed })
    }
}

fn write_results(path: &Path, results: &ScoutResults) -> Result<(), ScoutError> {
    let json = serde_json::to_string_pretty(results).map_err(std::io::Error::from)?;
    fs::write(path, json)?;
    Ok(())
}

fn write_leaderboard(path: &Path, board: &[LeaderboardRow]) -> Result<(), ScoutError> {
    let mut writer = csv::Writer::from_path(path)?;
    if board.is_empty() {
        writer.write_record([
            "rank",
            "trainer",
            "n_responses",
            "overall_avg",
            "late_half_avg",
            "early_half_avg",
            "improvement",
            "trainer_score",
        ])?;
    }
    for row in board {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn console_summary(results: &ScoutResults) -> String {
    let mut output = String::new();
    let rule = "=".repeat(70);

    let _ = writeln!(output, "{rule}");
    let _ = writeln!(output, "TOP {TOP_N} TRAINERS");
    let _ = writeln!(output, "{rule}");

    if results.top_trainers.is_empty() {
        let _ = writeln!(output, "No trainers met the minimum of {} responses.", results.min_responses);
    }

    for trainer in &results.top_trainers {
        let _ = writeln!(output);
        let _ = writeln!(output, "#{}  {}", trainer.rank, trainer.trainer_name);
        let _ = writeln!(
            output,
            "    Score: {:.2}  |  Avg: {:.2}/10  |  Improvement: {}  |  Responses: {}",
            trainer.trainer_score,
            trainer.overall_avg,
            signed(trainer.improvement),
            trainer.n_responses
        );
        let _ = writeln!(output, "    Quotes:");
        for quote in &trainer.evidence_quotes {
            let _ = writeln!(output, "      [{}] \"{}\"", quote.row_id, shorten(&quote.quote, CONSOLE_QUOTE_CHARS));
        }
        let _ = writeln!(output, "    Angle: {}", trainer.case_study_angle);
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "{rule}");
    output
}

fn shorten(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        let head: String = text.chars().take(max_chars).collect();
        format!("{head}...")
    } else {
        text.to_string()
    }
}
