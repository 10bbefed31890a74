//! Projection of the linear diff stream onto two side-by-side columns.
//!
//! The backend sends a single stream where each operation describes one line of the original
//! binary, the modified binary, or both. To display it side by side we split it into a left
//! (original) and a right (modified) column of the same length, filling the gaps with blank
//! placeholders so that corresponding lines stay on the same row.

use crate::align::{self, AlignmentError};
use crate::classify::{Category, classify};
use crate::compose::{self, MalformedRunsError};
use crate::diff::{
    Changes, DiffOperation, LabelState, LineKind, Opcode, RawDiffOperation, Side,
    UnrecognizedOpcodeError,
};
use log::debug;
use logging_timer::time;
use serde::Serialize;
use std::cmp::max;
use thiserror::Error;

/// The data for a line that exists on one side of the comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SideLine {
    pub category: Category,
    pub kind: LineKind,
    pub address: u64,
    pub size: u64,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// The sub-line annotations that are meaningful on this line's side.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changes: Option<Changes>,
}

impl SideLine {
    pub fn label_state(&self) -> LabelState<'_> {
        self.label.as_deref().into()
    }
}

/// A row of a single column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ColumnLine {
    /// There is no counterpart for this row on this side.
    Blank,
    Line(SideLine),
}

impl ColumnLine {
    /// Project an operation onto one side, producing a placeholder if it doesn't exist there.
    pub fn project(op: &DiffOperation, side: Side) -> Self {
        if !op.opcode.is_present_on(side) {
            return ColumnLine::Blank;
        }
        ColumnLine::Line(SideLine {
            category: classify(op.opcode, false),
            kind: op.kind,
            address: op.address,
            size: op.size,
            text: op.text.clone(),
            label: op.label.clone(),
            changes: op.changes.as_ref().map(|changes| changes.for_side(side)),
        })
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, ColumnLine::Blank)
    }

    pub fn category(&self) -> Category {
        match self {
            ColumnLine::Blank => Category::Blank,
            ColumnLine::Line(line) => line.category,
        }
    }

    /// The line's address, if it isn't a placeholder.
    pub fn address(&self) -> Option<u64> {
        match self {
            ColumnLine::Blank => None,
            ColumnLine::Line(line) => Some(line.address),
        }
    }

    pub fn as_line(&self) -> Option<&SideLine> {
        match self {
            ColumnLine::Blank => None,
            ColumnLine::Line(line) => Some(line),
        }
    }
}

/// The two aligned columns produced from one diff stream.
///
/// Both columns always have the same length and row `i` of one column corresponds to row `i` of
/// the other.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Columns {
    left: Vec<ColumnLine>,
    right: Vec<ColumnLine>,
}

impl Columns {
    pub fn left(&self) -> &[ColumnLine] {
        &self.left
    }

    pub fn right(&self) -> &[ColumnLine] {
        &self.right
    }

    /// The number of rows.
    pub fn len(&self) -> usize {
        self.left.len()
    }

    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }

    /// Iterate over the rows as `(left, right)` pairs.
    pub fn rows(&self) -> impl Iterator<Item = (&ColumnLine, &ColumnLine)> {
        self.left.iter().zip(self.right.iter())
    }
}

/// Reasons a diff stream could not be projected.
///
/// Any of these abandons the whole update.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProjectionError {
    #[error("Operation {index}: {source}")]
    UnrecognizedOpcode {
        index: usize,
        source: UnrecognizedOpcodeError,
    },
    #[error("The {side} column is misaligned: {source}")]
    Alignment { side: Side, source: AlignmentError },
    #[error("The {side} column has malformed text runs on row {row}: {source}")]
    MalformedRuns {
        side: Side,
        row: usize,
        source: MalformedRunsError,
    },
}

/// The index one past the end of the run of `opcode` operations starting at `start`.
fn run_end(operations: &[DiffOperation], start: usize, opcode: Opcode) -> usize {
    operations[start..]
        .iter()
        .position(|op| op.opcode != opcode)
        .map_or(operations.len(), |offset| start + offset)
}

/// Check every line of a column before it goes anywhere near a renderer.
fn check_column(column: &[ColumnLine], side: Side) -> Result<(), ProjectionError> {
    for (row, line) in column.iter().enumerate() {
        let Some(line) = line.as_line() else {
            continue;
        };
        if let Some(changes) = &line.changes {
            compose::check_runs(&line.text, &changes.text_runs)
                .map_err(|source| ProjectionError::MalformedRuns { side, row, source })?;
        }
    }
    align::validate(column).map_err(|source| ProjectionError::Alignment { side, source })
}

/// Split a diff stream into two aligned columns.
///
/// Insertions get a blank placeholder in the left column and deletions one in the right column.
/// A run of `replace-left` operations directly followed by a run of `replace-right` operations
/// is laid out row by row, so that each original line sits next to the line that replaced it.
/// If one of the two runs is longer, its extra lines get blank counterparts.
///
/// Both columns are validated before returning. Nothing is returned if either fails.
#[time("info", "project::{}")]
pub fn project(operations: &[DiffOperation]) -> Result<Columns, ProjectionError> {
    let mut left = Vec::with_capacity(operations.len());
    let mut right = Vec::with_capacity(operations.len());
    let mut index = 0;

    while index < operations.len() {
        let op = &operations[index];

        match op.opcode {
            Opcode::ReplaceLeft | Opcode::ReplaceRight => {
                let originals_end = run_end(operations, index, Opcode::ReplaceLeft);
                let replacements_end = run_end(operations, originals_end, Opcode::ReplaceRight);
                let originals = &operations[index..originals_end];
                let replacements = &operations[originals_end..replacements_end];
                debug!(
                    "Pairing {} replaced lines with {} replacements at operation {}",
                    originals.len(),
                    replacements.len(),
                    index
                );

                for row in 0..max(originals.len(), replacements.len()) {
                    left.push(
                        originals
                            .get(row)
                            .map_or(ColumnLine::Blank, |op| ColumnLine::project(op, Side::Left)),
                    );
                    right.push(
                        replacements
                            .get(row)
                            .map_or(ColumnLine::Blank, |op| ColumnLine::project(op, Side::Right)),
                    );
                }
                index = replacements_end;
            }
            Opcode::Equal | Opcode::Insert | Opcode::Delete => {
                left.push(ColumnLine::project(op, Side::Left));
                right.push(ColumnLine::project(op, Side::Right));
                index += 1;
            }
        }
    }
    debug_assert_eq!(left.len(), right.len());

    check_column(&left, Side::Left)?;
    check_column(&right, Side::Right)?;
    debug!(
        "Projected {} operations onto {} rows",
        operations.len(),
        left.len()
    );
    Ok(Columns { left, right })
}

/// Resolve the opcodes of a stream straight off the wire, then [project] it.
pub fn project_raw(operations: Vec<RawDiffOperation>) -> Result<Columns, ProjectionError> {
    let operations = operations
        .into_iter()
        .enumerate()
        .map(|(index, raw)| {
            DiffOperation::try_from(raw)
                .map_err(|source| ProjectionError::UnrecognizedOpcode { index, source })
        })
        .collect::<Result<Vec<_>, _>>()?;
    project(&operations)
}
