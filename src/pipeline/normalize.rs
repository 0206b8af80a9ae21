//! Markdown normalizer: clean recognition output without losing recall.
//!
//! Recognition engines emit noisy markdown — image references for logos and
//! stamps, table bodies padded with dozens of empty rows, runs of blank
//! lines. This module strips the noise while guaranteeing that no short but
//! meaningful token (a tax ID, a phone number, a single-character cell) is
//! ever discarded, and it never truncates: token-budget pressure is the
//! structured extractor's problem, handled there explicitly.
//!
//! [`clean`] is a pure function and idempotent after the first pass.

use once_cell::sync::Lazy;
use regex::Regex;

/// Empty table rows tolerated per run before suppression starts.
const MAX_EMPTY_TABLE_ROWS: usize = 5;

static RE_IMAGE_REF: Lazy<Regex> = Lazy::new(|| Regex::new(r"!\[[^\]]*\]\([^)]*\)").unwrap());

// 4-or-more blank lines (5+ newlines) collapse to exactly 3 blank lines.
static RE_BLANK_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{5,}").unwrap());

/// Clean recognized markdown.
///
/// Rules, in order:
/// 1. Strip image-reference tokens (`![...](...)`)
/// 2. Inside table blocks, suppress runs of fully-empty rows beyond
///    [`MAX_EMPTY_TABLE_ROWS`]; any non-empty row resets the run
/// 3. Collapse 4-or-more consecutive blank lines to exactly 3
///
/// Content is never truncated by length.
pub fn clean(markdown: &str) -> String {
    if markdown.is_empty() {
        return String::new();
    }

    let stripped = RE_IMAGE_REF.replace_all(markdown, "");
    let pruned = prune_empty_table_rows(&stripped);
    let collapsed = RE_BLANK_RUN.replace_all(&pruned, "\n\n\n\n");
    collapsed.trim().to_string()
}

/// True when the character carries meaning worth keeping a cell for.
/// `is_alphanumeric` covers Latin digits/letters and CJK ideographs alike.
fn is_meaningful(c: char) -> bool {
    c.is_alphanumeric()
}

fn is_table_row(line: &str) -> bool {
    line.trim_start().starts_with('|')
}

fn is_separator_row(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.starts_with('|')
        && trimmed.contains('-')
        && trimmed
            .chars()
            .all(|c| matches!(c, '|' | '-' | ':' | ' '))
}

/// A row is empty only when *every* cell lacks meaningful characters —
/// a row with a lone tax-ID digit in one cell always passes through.
fn is_empty_row(line: &str) -> bool {
    line.split('|').all(|cell| !cell.chars().any(is_meaningful))
}

fn prune_empty_table_rows(input: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    let mut in_table = false;
    let mut empty_run = 0usize;

    for line in input.lines() {
        if is_table_row(line) {
            if !in_table {
                in_table = true;
                empty_run = 0;
            }
            if is_separator_row(line) {
                out.push(line);
                continue;
            }
            if is_empty_row(line) {
                empty_run += 1;
                if empty_run > MAX_EMPTY_TABLE_ROWS {
                    continue;
                }
            } else {
                empty_run = 0;
            }
            out.push(line);
        } else {
            in_table = false;
            empty_run = 0;
            out.push(line);
        }
    }

    out.join("\n")
}
