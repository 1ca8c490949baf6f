// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Joining per-region text into document text

use anyhow::Result;
use tracing::{debug, info, warn};

/// Document text plus the lines it was joined from
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregatedText {
    pub text: String,
    pub lines: Vec<String>,
    pub used_fallback: bool,
}

/// Keep trimmed, non-empty lines in detection order
pub fn aggregate_lines(mut entries: Vec<(usize, Option<String>)>) -> Vec<String> {
    entries.sort_by_key(|(index, _)| *index);
    entries
        .into_iter()
        .filter_map(|(_, text)| {
            let trimmed = text?.trim().to_string();
            (!trimmed.is_empty()).then_some(trimmed)
        })
        .collect()
}

/// Join region lines, or fall back to one whole-image recognition
///
/// `fallback` runs at most once, and only when no entry produced text.
/// A failing fallback yields empty text.
pub fn aggregate_with_fallback<F>(entries: Vec<(usize, Option<String>)>, fallback: F) -> AggregatedText
where
    F: FnOnce() -> Result<String>,
{
    let region_count = entries.len();
    let lines = aggregate_lines(entries);

    if !lines.is_empty() {
        debug!("Joined {} line(s) from {} region(s)", lines.len(), region_count);
        return AggregatedText {
            text: lines.join("\n"),
            lines,
            used_fallback: false,
        };
    }

    info!(
        "No usable text from {} region(s), recognizing whole image",
        region_count
    );
    let text = match fallback() {
        Ok(text) => text.trim().to_string(),
        Err(e) => {
            warn!("Whole-image recognition failed: {:#}", e);
            String::new()
        }
    };

    let lines = if text.is_empty() {
        Vec::new()
    } else {
        vec![text.clone()]
    };

    AggregatedText {
        text,
        lines,
        used_fallback: true,
    }
}
