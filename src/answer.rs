use std::time::Instant;

use crate::api::models::AskResponse;
use crate::error::{AppError, Result};
use crate::inference::{QuestionAnswerer, SummaryParams, Summarizer};
use crate::truncate_chars;

pub const NO_ANSWER: &str = "No answer found.";
pub const SOURCE_LABEL: &str = "Extracted from the provided context";

/// How much of the context is folded into the summarizer input.
const SUMMARY_CONTEXT_CHARS: usize = 3000;
/// How much of the context is echoed back to the caller.
const ECHO_CONTEXT_CHARS: usize = 1000;

/// Answers `question` from `context`, then rewrites the answer with the summarizer.
pub async fn answer(
    qa: &dyn QuestionAnswerer,
    summarizer: &dyn Summarizer,
    question: &str,
    context: &str,
) -> Result<AskResponse> {
    if question.is_empty() || context.is_empty() {
        return Err(AppError::BadRequest(
            "Both question and context are required".to_string(),
        ));
    }

    let started = Instant::now();
    let output = qa.answer(question, context).await?;
    let raw_answer = output.answer.unwrap_or_else(|| NO_ANSWER.to_string());
    let score = output.score.unwrap_or(0.0);
    tracing::debug!(score, elapsed = ?started.elapsed(), "question answered");

    let started = Instant::now();
    let summary = summarizer
        .summarize(&summary_input(&raw_answer, context), &SummaryParams::default())
        .await?;
    tracing::debug!(summarized = summary.is_some(), elapsed = ?started.elapsed(), "answer summarized");

    Ok(AskResponse {
        question: question.to_string(),
        answer: summary.unwrap_or(raw_answer),
        confidence: format_confidence(score),
        source: SOURCE_LABEL.to_string(),
        context_used: context_echo(context),
    })
}

fn summary_input(raw_answer: &str, context: &str) -> String {
    format!(
        "Answer: {}. Additional Information: {}",
        raw_answer,
        truncate_chars(context, SUMMARY_CONTEXT_CHARS)
    )
}

/// Formats a model score in `[0, 1]` as a percentage with two decimals.
pub fn format_confidence(score: f64) -> String {
    format!("{:.2}%", score * 100.0)
}

/// The context echoed in responses, cut to 1000 characters plus an ellipsis.
pub fn context_echo(context: &str) -> String {
    if context.chars().count() > ECHO_CONTEXT_CHARS {
        format!("{}...", truncate_chars(context, ECHO_CONTEXT_CHARS))
    } else {
        context.to_string()
    }
}
