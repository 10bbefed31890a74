//! Expanding sparse sub-line change ranges into runs of text that cover a whole line.

use crate::diff::{SubOpcode, TextRun};
use serde::Serialize;
use strum::Display;
use thiserror::Error;

/// How a piece of a line's text changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RunCategory {
    Unchanged,
    Changed,
    Inserted,
    Deleted,
}

impl From<SubOpcode> for RunCategory {
    fn from(op: SubOpcode) -> Self {
        match op {
            SubOpcode::Unchanged => RunCategory::Unchanged,
            SubOpcode::Changed | SubOpcode::ReplaceLeft | SubOpcode::ReplaceRight => {
                RunCategory::Changed
            }
            SubOpcode::Insert => RunCategory::Inserted,
            SubOpcode::Delete => RunCategory::Deleted,
        }
    }
}

/// A contiguous piece of a line's text with a single change category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Segment<'a> {
    pub category: RunCategory,
    pub text: &'a str,
}

impl<'a> Segment<'a> {
    fn unchanged(text: &'a str) -> Self {
        Segment {
            category: RunCategory::Unchanged,
            text,
        }
    }
}

/// Split `text` into segments according to `runs`.
///
/// Text that isn't covered by a run is emitted as [RunCategory::Unchanged]. The segments appear
/// in order and concatenate back to `text`. Empty segments are never emitted, except when there
/// are no runs at all, where the whole text is a single segment even if it is empty.
///
/// `runs` is expected to be sorted and non-overlapping (see [check_runs]). This will not panic on
/// malformed runs: they are clamped to the text and to the end of the previous run.
pub fn compose<'a>(text: &'a str, runs: &[TextRun]) -> Vec<Segment<'a>> {
    if runs.is_empty() {
        return vec![Segment::unchanged(text)];
    }
    let mut segments = Vec::with_capacity(runs.len() * 2 + 1);
    let mut cursor = 0;

    for run in runs {
        let start = floor_char_boundary(text, run.start.max(cursor));
        let end = floor_char_boundary(text, run.end.max(start));

        if end == start {
            continue;
        }
        if start > cursor {
            segments.push(Segment::unchanged(&text[cursor..start]));
        }
        segments.push(Segment {
            category: run.op.into(),
            text: &text[start..end],
        });
        cursor = end;
    }

    if cursor < text.len() {
        segments.push(Segment::unchanged(&text[cursor..]));
    }
    segments
}

/// The largest character boundary in `text` that is not past `index`.
fn floor_char_boundary(text: &str, index: usize) -> usize {
    let mut index = index.min(text.len());
    while !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

/// Ways a list of text runs can be malformed.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum MalformedRunsError {
    #[error("Run {start}..{end} ends before it starts")]
    Reversed { start: usize, end: usize },
    #[error("Run {start}..{end} starts before the previous run ends at {previous_end}")]
    Overlapping {
        start: usize,
        end: usize,
        previous_end: usize,
    },
    #[error("Run {start}..{end} is out of bounds for a line of {len} bytes")]
    OutOfBounds { start: usize, end: usize, len: usize },
    #[error("Run {start}..{end} splits a character")]
    NotCharBoundary { start: usize, end: usize },
}

/// Check that `runs` are sorted, don't overlap, and lie on character boundaries within `text`.
pub fn check_runs(text: &str, runs: &[TextRun]) -> Result<(), MalformedRunsError> {
    let mut previous_end = 0;

    for &TextRun { start, end, .. } in runs {
        if start > end {
            return Err(MalformedRunsError::Reversed { start, end });
        }
        if end > text.len() {
            return Err(MalformedRunsError::OutOfBounds {
                start,
                end,
                len: text.len(),
            });
        }
        if start < previous_end {
            return Err(MalformedRunsError::Overlapping {
                start,
                end,
                previous_end,
            });
        }
        if !text.is_char_boundary(start) || !text.is_char_boundary(end) {
            return Err(MalformedRunsError::NotCharBoundary { start, end });
        }
        previous_end = end;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::*;

    fn flatten<'a>(segments: &[Segment<'a>]) -> Vec<(RunCategory, &'a str)> {
        segments.iter().map(|s| (s.category, s.text)).collect()
    }

    #[rstest]
    #[case("")]
    #[case("mov r0, r1")]
    fn test_no_runs(#[case] text: &str) {
        assert_eq!(
            flatten(&compose(text, &[])),
            vec![(RunCategory::Unchanged, text)]
        );
    }

    #[test]
    fn test_gaps_are_filled() {
        let runs = [
            TextRun::new(SubOpcode::Changed, 4, 6),
            TextRun::new(SubOpcode::Delete, 8, 10),
        ];
        assert_eq!(
            flatten(&compose("ldr r0, r1", &runs)),
            vec![
                (RunCategory::Unchanged, "ldr "),
                (RunCategory::Changed, "r0"),
                (RunCategory::Unchanged, ", "),
                (RunCategory::Deleted, "r1"),
            ]
        );
    }

    #[test]
    fn test_run_covering_everything() {
        let runs = [TextRun::new(SubOpcode::Insert, 0, 5)];
        assert_eq!(
            flatten(&compose("bx lr", &runs)),
            vec![(RunCategory::Inserted, "bx lr")]
        );
    }

    #[test]
    fn test_empty_runs_are_skipped() {
        let runs = [
            TextRun::new(SubOpcode::Changed, 2, 2),
            TextRun::new(SubOpcode::ReplaceRight, 3, 4),
        ];
        assert_eq!(
            flatten(&compose("push", &runs)),
            vec![
                (RunCategory::Unchanged, "pus"),
                (RunCategory::Changed, "h"),
            ]
        );
    }

    #[test]
    fn test_adjacent_runs() {
        let runs = [
            TextRun::new(SubOpcode::Unchanged, 0, 3),
            TextRun::new(SubOpcode::Changed, 3, 6),
        ];
        assert_eq!(
            flatten(&compose("addsub", &runs)),
            vec![
                (RunCategory::Unchanged, "add"),
                (RunCategory::Changed, "sub"),
            ]
        );
    }

    #[test]
    fn test_malformed_runs_are_clamped() {
        let runs = [
            TextRun::new(SubOpcode::Changed, 2, 4),
            TextRun::new(SubOpcode::Delete, 1, 3),
            TextRun::new(SubOpcode::Insert, 5, 100),
        ];
        let text = "cmp r0";
        let segments = compose(text, &runs);
        assert_eq!(
            flatten(&segments),
            vec![
                (RunCategory::Unchanged, "cm"),
                (RunCategory::Changed, "p "),
                (RunCategory::Unchanged, "r"),
                (RunCategory::Inserted, "0"),
            ]
        );
        let rebuilt: String = segments.iter().map(|s| s.text).collect();
        assert_eq!(rebuilt, text);
    }

    #[test]
    fn test_multibyte_text_is_not_split() {
        let runs = [TextRun::new(SubOpcode::Changed, 1, 2)];
        let segments = compose("é", &runs);
        let rebuilt: String = segments.iter().map(|s| s.text).collect();
        assert_eq!(rebuilt, "é");
    }

    #[rstest]
    #[case(vec![], Ok(()))]
    #[case(vec![TextRun::new(SubOpcode::Changed, 0, 3), TextRun::new(SubOpcode::Changed, 3, 6)], Ok(()))]
    #[case(
        vec![TextRun::new(SubOpcode::Changed, 3, 2)],
        Err(MalformedRunsError::Reversed { start: 3, end: 2 })
    )]
    #[case(
        vec![TextRun::new(SubOpcode::Changed, 0, 4), TextRun::new(SubOpcode::Changed, 2, 5)],
        Err(MalformedRunsError::Overlapping { start: 2, end: 5, previous_end: 4 })
    )]
    #[case(
        vec![TextRun::new(SubOpcode::Changed, 4, 7)],
        Err(MalformedRunsError::OutOfBounds { start: 4, end: 7, len: 6 })
    )]
    fn test_check_runs(
        #[case] runs: Vec<TextRun>,
        #[case] expected: Result<(), MalformedRunsError>,
    ) {
        assert_eq!(check_runs("lsl r2", &runs), expected);
    }

    #[test]
    fn test_check_runs_char_boundary() {
        let runs = [TextRun::new(SubOpcode::Changed, 0, 1)];
        assert_eq!(
            check_runs("é", &runs),
            Err(MalformedRunsError::NotCharBoundary { start: 0, end: 1 })
        );
    }
}
