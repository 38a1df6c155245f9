use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::ScoutError;
use crate::models::{DraftStatus, OutreachDraft, ScoutResults, TopTrainer};

const SUBJECT: &str = "Your learners love your training - would you share your story?";
const MAX_QUOTE_CHARS: usize = 200;

pub fn load_results(path: &Path) -> Result<ScoutResults, ScoutError> {
    let missing = |reason: String| ScoutError::MissingStage1Output {
        path: path.to_path_buf(),
        reason,
    };
    let raw = fs::read_to_string(path).map_err(|err| missing(err.to_string()))?;
    serde_json::from_str(&raw).map_err(|err| missing(format!("not a results file ({err})")))
}

/// `ana.maria@example.com` becomes `Ana Maria`.
pub fn display_name(identity: &str) -> String {
    let local = identity.split('@').next().unwrap_or(identity);
    local
        .replace('.', " ")
        .split_whitespace()
        .map(title_case)
        .collect::<Vec<_>>()
        .join(" ")
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

fn headline_quote(trainer: &TopTrainer) -> String {
    let Some(first) = trainer.evidence_quotes.first() else {
        return "N/A".to_string();
    };
    if first.quote.chars().count() > MAX_QUOTE_CHARS {
        let head: String = first.quote.chars().take(MAX_QUOTE_CHARS - 3).collect();
        format!("{head}...")
    } else {
        first.quote.clone()
    }
}

pub fn draft_for(trainer: &TopTrainer, generated_at: DateTime<Utc>) -> OutreachDraft {
    let name = display_name(&trainer.trainer_name);
    let quote = headline_quote(trainer);

    let body = format!(
        "Hi {name},

I hope this message finds you well!

We've been reviewing learner feedback across our trainer network, and your name stood out. \
Your training sessions have received consistently strong feedback, with an overall rating of \
{overall:.2}/10 across {responses} responses.

Here's what one of your learners said:

  \"{quote}\"

We'd love to feature your journey in a short case study to inspire other trainers in our network. \
This would involve either:

  - A short testimonial quote (2-3 sentences, we can draft it for your approval), or
  - A 15-20 minute chat (or written Q&A) for a fuller case study

Would you be open to either of these? Happy to work around your schedule.

Thanks for the great work you do!

Best regards,
The Trainer Success Team",
        overall = trainer.overall_avg,
        responses = trainer.n_responses,
    );

    OutreachDraft {
        draft_id: Uuid::new_v4(),
        trainer_name: trainer.trainer_name.clone(),
        trainer_display_name: name,
        subject: SUBJECT.to_string(),
        body,
        trainer_score: trainer.trainer_score,
        n_responses: trainer.n_responses,
        case_study_angle: trainer.case_study_angle.clone(),
        send_priority: trainer.rank,
        generated_at,
        status: DraftStatus::Draft,
    }
}

pub fn generate_drafts(results: &ScoutResults, generated_at: DateTime<Utc>) -> Vec<OutreachDraft> {
    results
        .top_trainers
        .iter()
        .map(|trainer| draft_for(trainer, generated_at))
        .collect()
}

pub fn write_drafts(path: &Path, drafts: &[OutreachDraft]) -> Result<(), ScoutError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(drafts).map_err(std::io::Error::from)?;
    fs::write(path, json)?;
    tracing::info!(path = %path.display(), drafts = drafts.len(), "wrote outreach drafts");
    Ok(())
}
