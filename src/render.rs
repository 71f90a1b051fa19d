//! Plain-text rendering of a session snapshot.

use std::fmt::Write;

use crate::locale::{Language, Messages};
use crate::progress::{render_bar, ProgressState};
use crate::session::SessionSnapshot;
use crate::types::{Hairstyle, HairstyleSet, OutfitKind, OutfitResult};

const BAR_WIDTH: usize = 30;
const SCORE_SUMMARY_MARKER: &str = "综合评分";

/// Number of filled stars (out of five) for a 0..=10 score.
pub fn filled_stars(score: f64) -> usize {
    (1..=5).filter(|star| (*star as f64) <= score / 2.0).count()
}

pub fn star_row(score: f64) -> String {
    let filled = filled_stars(score);
    format!("{}{}", "★".repeat(filled), "☆".repeat(5 - filled))
}

/// Commentary lines as displayed: non-empty, trimmed, minus the overall-score
/// summary line. The flag marks the line tagged as the AI review.
pub fn commentary_lines(commentary: &str) -> Vec<(String, bool)> {
    commentary
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .enumerate()
        .filter(|(_, line)| !line.contains(SCORE_SUMMARY_MARKER))
        .map(|(index, line)| (line.to_string(), index == 0))
        .collect()
}

pub fn render_outfit(
    outfit: &OutfitResult,
    kind: OutfitKind,
    messages: &Messages,
    lang: Language,
) -> String {
    let title = match kind {
        OutfitKind::Custom => &messages.custom_outfit_title,
        OutfitKind::Generated => &messages.generated_outfit_title,
    };

    let mut out = String::new();
    let _ = writeln!(out, "== {} ({}) ==", title.get(lang), outfit.score);
    let _ = writeln!(out, "{}: {}", messages.try_on_alt.get(lang), outfit.try_on_url);
    let _ = writeln!(
        out,
        "{}: {} {}",
        messages.score_label.get(lang),
        star_row(outfit.score),
        outfit.score
    );

    let lines = commentary_lines(outfit.commentary.text(lang));
    if !lines.is_empty() {
        let _ = writeln!(out, "{}:", messages.commentary_label.get(lang));
        for (line, is_review) in lines {
            let _ = writeln!(out, "  - {}", line);
            if is_review {
                let _ = writeln!(out, "    [{}]", messages.ai_review_tag.get(lang));
            }
        }
    }
    out
}

fn render_hairstyle(out: &mut String, hairstyle: &Hairstyle) {
    let _ = writeln!(out, "  * {}", hairstyle.hairstyle);
    if !hairstyle.reasons.is_empty() {
        let _ = writeln!(out, "    {}", hairstyle.reasons);
    }
    if !hairstyle.img.is_empty() {
        let _ = writeln!(out, "    {}", hairstyle.img);
    }
}

pub fn render_hairstyles(set: &HairstyleSet, messages: &Messages, lang: Language) -> String {
    let mut out = String::new();
    for kind in OutfitKind::BOTH {
        let (title, empty) = match kind {
            OutfitKind::Custom => (&messages.custom_hairstyles_title, &messages.no_custom_hairstyles),
            OutfitKind::Generated => (
                &messages.generated_hairstyles_title,
                &messages.no_generated_hairstyles,
            ),
        };
        let _ = writeln!(out, "-- {} --", title.get(lang));
        let styles = set.get(kind);
        if styles.is_empty() {
            let _ = writeln!(out, "  {}", empty.get(lang));
        }
        for hairstyle in styles {
            render_hairstyle(&mut out, hairstyle);
        }
    }
    out
}

pub fn render_progress(state: &ProgressState) -> String {
    render_bar(state, BAR_WIDTH)
}

/// Full page: error banner, progress (while loading), outfits, hairstyles.
pub fn render_snapshot(snapshot: &SessionSnapshot, messages: &Messages) -> String {
    let lang = snapshot.language;
    let mut out = String::new();

    if let Some(error) = &snapshot.error {
        let _ = writeln!(out, "! {}", error);
    }
    if snapshot.loading {
        if let Some(progress) = &snapshot.progress {
            let _ = writeln!(out, "{}", render_progress(progress));
        }
    }
    if let Some(result) = &snapshot.result {
        for kind in OutfitKind::BOTH {
            out.push_str(&render_outfit(result.outfit(kind), kind, messages, lang));
            out.push('\n');
        }
        if let Some(recommendations) = result.recommendations.as_deref().filter(|r| !r.is_empty()) {
            let _ = writeln!(out, "{}\n", recommendations);
        }
        out.push_str(&render_hairstyles(&snapshot.hairstyles, messages, lang));
    }
    out
}
