//! Rolling-summary cadence and input filtering.

use cortex_core::entity::Message;

/// A summary is produced for every log position that is a multiple of this.
pub const SUMMARY_INTERVAL: u64 = 15;

/// Messages fed to the summarizer.
pub const SUMMARY_WINDOW: usize = 15;

/// Stand-in for the previous summary on a campaign that has none.
pub const START_OF_ADVENTURE: &str = "Start of the adventure.";

/// Whole words that mark a dice line.
const DICE_WORDS: [&str; 5] = ["roll", "rolls", "rolled", "success", "successes"];

/// Labels that open a vitals readout.
const VITAL_LABELS: [&str; 2] = ["hp:", "mp:"];

/// Whether the message at `position` closes a summary window. Positions are
/// unique per campaign, so each boundary is claimed by exactly one append.
#[must_use]
pub fn is_summary_boundary(position: u64) -> bool {
    position > 0 && position % SUMMARY_INTERVAL == 0
}

fn has_vital_label(lower: &str) -> bool {
    VITAL_LABELS.iter().any(|label| {
        lower.match_indices(label).any(|(at, _)| {
            !lower[..at]
                .chars()
                .next_back()
                .is_some_and(char::is_alphanumeric)
        })
    })
}

/// Whether a line reads as dice or vitals bookkeeping. Markers match whole
/// words, so "troll" or "successor" stay in the transcript.
#[must_use]
pub fn is_mechanical_line(line: &str) -> bool {
    let lower = line.to_lowercase();
    lower
        .split(|c: char| !c.is_alphanumeric())
        .any(|word| DICE_WORDS.contains(&word))
        || has_vital_label(&lower)
}

/// Renders messages as `role: content` lines with mechanical lines removed.
/// Messages left empty by the filter are dropped entirely.
#[must_use]
pub fn narrative_transcript(messages: &[Message]) -> Vec<String> {
    messages
        .iter()
        .filter_map(|m| {
            let kept: Vec<&str> = m
                .content
                .lines()
                .filter(|line| !is_mechanical_line(line))
                .collect();
            let content = kept.join("\n");
            if content.trim().is_empty() {
                None
            } else {
                Some(format!("{}: {content}", m.role))
            }
        })
        .collect()
}

/// Prompt sent to the summarizer.
#[must_use]
pub fn summary_prompt(transcript: &[String], previous: &str) -> String {
    format!(
        "Synthesize these messages into a 1-paragraph summary:\n{}\nPrevious: {previous}",
        transcript.join("\n")
    )
}
