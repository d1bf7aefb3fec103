//! Find-and-replace for the `edit_file` tool.
//!
//! Matching runs in passes, first success wins:
//!
//! 1. Exact substring.
//! 2. Line-trimmed: a window of content lines equal to the target lines
//!    after trimming surrounding whitespace.
//! 3. Punctuation-normalized: like (2), with typographic quotes, dashes,
//!    ellipses and non-breaking spaces folded to ASCII first.
//!
//! An ambiguous exact match is an error; it is never retried with a looser
//! pass. Fuzzy passes splice `new` into the original content at the matched
//! byte range, so text outside the match is preserved byte for byte.

use std::borrow::Cow;
use std::fmt;
use std::ops::Range;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReplaceError {
    #[error("old_string and new_string are identical (no changes)")]
    NoChange,
    #[error("old_string must not be empty")]
    EmptyTarget,
    #[error("old_string not found")]
    NotFound,
    #[error(
        "old_string matches {count} locations; include more surrounding context or set replace_all"
    )]
    MultipleMatches { count: usize },
}

/// Which pass produced the match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStrategy {
    Exact,
    LineTrimmed,
    Normalized,
}

impl MatchStrategy {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            MatchStrategy::Exact => "exact",
            MatchStrategy::LineTrimmed => "line-trimmed",
            MatchStrategy::Normalized => "normalized",
        }
    }
}

impl fmt::Display for MatchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a successful [`replace`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replacement {
    pub content: String,
    pub strategy: MatchStrategy,
    pub replacements: usize,
}

/// Replace `old` with `new` in `content`.
///
/// Without `replace_all`, more than one match in the winning pass fails with
/// [`ReplaceError::MultipleMatches`].
pub fn replace(
    content: &str,
    old: &str,
    new: &str,
    replace_all: bool,
) -> Result<Replacement, ReplaceError> {
    if old == new {
        return Err(ReplaceError::NoChange);
    }
    if old.is_empty() {
        return Err(ReplaceError::EmptyTarget);
    }

    let exact = content.matches(old).count();
    match exact {
        0 => {}
        1 => return Ok(exact_replacement(content.replacen(old, new, 1), 1)),
        count if replace_all => return Ok(exact_replacement(content.replace(old, new), count)),
        count => return Err(ReplaceError::MultipleMatches { count }),
    }

    for pass in [FuzzyPass::LineTrimmed, FuzzyPass::Normalized] {
        let windows = fuzzy_windows(content, old, pass);
        let Some(first) = windows.first().cloned() else {
            continue;
        };
        tracing::debug!(strategy = pass.strategy().as_str(), matches = windows.len(), "fuzzy match");

        if !replace_all {
            if windows.len() > 1 {
                return Err(ReplaceError::MultipleMatches {
                    count: windows.len(),
                });
            }
            let mut result = content.to_string();
            result.replace_range(first, new);
            return Ok(Replacement {
                content: result,
                strategy: pass.strategy(),
                replacements: 1,
            });
        }

        return Ok(replace_all_fuzzy(content, old, new, pass));
    }

    Err(ReplaceError::NotFound)
}

fn exact_replacement(content: String, replacements: usize) -> Replacement {
    Replacement {
        content,
        strategy: MatchStrategy::Exact,
        replacements,
    }
}

/// Substitute one window at a time, re-scanning the updated content after
/// each. Windows starting inside already inserted text are skipped, so a
/// replacement that itself matches cannot loop.
fn replace_all_fuzzy(content: &str, old: &str, new: &str, pass: FuzzyPass) -> Replacement {
    let mut result = content.to_string();
    let mut resume_at = 0usize;
    let mut replacements = 0usize;

    while let Some(window) = fuzzy_windows(&result, old, pass)
        .into_iter()
        .find(|window| window.start >= resume_at)
    {
        let start = window.start;
        let stalled = window.is_empty() && new.is_empty();
        result.replace_range(window, new);
        resume_at = start + new.len() + usize::from(stalled);
        replacements += 1;
    }

    Replacement {
        content: result,
        strategy: pass.strategy(),
        replacements,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FuzzyPass {
    LineTrimmed,
    Normalized,
}

impl FuzzyPass {
    fn strategy(self) -> MatchStrategy {
        match self {
            FuzzyPass::LineTrimmed => MatchStrategy::LineTrimmed,
            FuzzyPass::Normalized => MatchStrategy::Normalized,
        }
    }

    fn prepare(self, line: &str) -> Cow<'_, str> {
        let trimmed = line.trim();
        match self {
            FuzzyPass::LineTrimmed => Cow::Borrowed(trimmed),
            FuzzyPass::Normalized => normalize_punctuation(trimmed),
        }
    }
}

/// Byte ranges of every window of `content` lines matching `target` lines.
///
/// A target ending in `\n` matches whole lines including the final newline;
/// otherwise the range stops before the last matched line's newline.
fn fuzzy_windows(content: &str, target: &str, pass: FuzzyPass) -> Vec<Range<usize>> {
    let keep_newline = target.ends_with('\n');
    let body = target.strip_suffix('\n').unwrap_or(target);
    let wanted: Vec<Cow<'_, str>> = body.split('\n').map(|line| pass.prepare(line)).collect();

    let lines: Vec<&str> = content.split('\n').collect();
    if lines.len() < wanted.len() {
        return Vec::new();
    }
    let prepared: Vec<Cow<'_, str>> = lines.iter().map(|line| pass.prepare(line)).collect();

    let mut starts = Vec::with_capacity(lines.len());
    let mut offset = 0usize;
    for line in &lines {
        starts.push(offset);
        offset += line.len() + 1;
    }

    let mut windows = Vec::new();
    for first in 0..=(lines.len() - wanted.len()) {
        let matched = wanted
            .iter()
            .enumerate()
            .all(|(j, want)| prepared[first + j] == *want);
        if !matched {
            continue;
        }
        let last = first + wanted.len() - 1;
        let line_end = starts[last] + lines[last].len();
        let end = if keep_newline {
            (line_end + 1).min(content.len())
        } else {
            line_end
        };
        windows.push(starts[first]..end);
    }
    windows
}

/// Fold typographic punctuation to ASCII.
///
/// Curly single quotes become `'`, curly double quotes `"`, the U+2010 to
/// U+2015 dashes `-`, the ellipsis `...`, and U+00A0 a plain space.
#[must_use]
pub fn normalize_punctuation(text: &str) -> Cow<'_, str> {
    if !text.chars().any(is_foldable) {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\u{2018}'..='\u{201B}' => out.push('\''),
            '\u{201C}'..='\u{201F}' => out.push('"'),
            '\u{2010}'..='\u{2015}' => out.push('-'),
            '\u{2026}' => out.push_str("..."),
            '\u{00A0}' => out.push(' '),
            other => out.push(other),
        }
    }
    Cow::Owned(out)
}

fn is_foldable(c: char) -> bool {
    matches!(
        c,
        '\u{2018}'..='\u{201F}' | '\u{2010}'..='\u{2015}' | '\u{2026}' | '\u{00A0}'
    )
}
