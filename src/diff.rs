//! The diff operation stream emitted by the binary diffing backend, along with the vocabulary
//! (opcodes, sub-opcodes, line kinds) used to describe how a line of the original binary relates
//! to a line of the rebuilt one.

use phf::phf_map;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};
use thiserror::Error;

/// How a single line relates across the original and modified binaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, Serialize)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum Opcode {
    /// The line is the same in both binaries.
    Equal,
    /// The line only exists in the modified binary.
    Insert,
    /// The line only exists in the original binary.
    Delete,
    /// The original binary's half of a replaced line.
    ReplaceLeft,
    /// The modified binary's half of a replaced line.
    ReplaceRight,
}

/// Every spelling of an opcode we accept on the wire.
///
/// The backend historically sent single character symbols, newer producers send the names.
static OPCODES: phf::Map<&'static str, Opcode> = phf_map! {
    " " => Opcode::Equal,
    "equal" => Opcode::Equal,
    "+" => Opcode::Insert,
    "insert" => Opcode::Insert,
    "-" => Opcode::Delete,
    "delete" => Opcode::Delete,
    "<" => Opcode::ReplaceLeft,
    "replace-left" => Opcode::ReplaceLeft,
    ">" => Opcode::ReplaceRight,
    "replace-right" => Opcode::ReplaceRight,
};

/// An opcode string that isn't part of the protocol.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Unrecognized opcode {opcode:?}")]
pub struct UnrecognizedOpcodeError {
    pub opcode: String,
}

impl Opcode {
    /// Resolve an opcode from either its symbol or its name.
    pub fn from_wire(s: &str) -> Result<Self, UnrecognizedOpcodeError> {
        OPCODES
            .get(s)
            .copied()
            .ok_or_else(|| UnrecognizedOpcodeError { opcode: s.into() })
    }

    /// Whether a line with this opcode exists on the given side.
    pub fn is_present_on(self, side: Side) -> bool {
        match side {
            Side::Left => !matches!(self, Opcode::Insert | Opcode::ReplaceRight),
            Side::Right => !matches!(self, Opcode::Delete | Opcode::ReplaceLeft),
        }
    }
}

/// One of the two versions being compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Side {
    /// The original binary.
    Left,
    /// The rebuilt binary.
    Right,
}

/// The category of a sub-line text run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, Serialize, Deserialize)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum SubOpcode {
    Unchanged,
    Changed,
    Insert,
    Delete,
    ReplaceLeft,
    ReplaceRight,
}

impl SubOpcode {
    /// Whether a run with this sub-opcode should be shown in the given column.
    ///
    /// Insertions only make sense in the modified column and deletions in the original one.
    /// Replacement markers refer to text that only exists on their own side.
    pub fn is_visible_on(self, side: Side) -> bool {
        match self {
            SubOpcode::Unchanged | SubOpcode::Changed => true,
            SubOpcode::Delete | SubOpcode::ReplaceLeft => side == Side::Left,
            SubOpcode::Insert | SubOpcode::ReplaceRight => side == Side::Right,
        }
    }
}

/// What a line represents in the disassembly. This only affects how a line is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LineKind {
    Code,
    Data,
    Padding,
}

/// A half-open byte range `[start, end)` of a line's text tagged with a change category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextRun {
    pub op: SubOpcode,
    pub start: usize,
    pub end: usize,
}

impl TextRun {
    pub fn new(op: SubOpcode, start: usize, end: usize) -> Self {
        TextRun { op, start, end }
    }
}

/// Sub-line annotations for a single operation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Changes {
    /// Whether the line moved to a different address between the two binaries.
    #[serde(default)]
    pub address_changed: bool,
    /// Ranges of changed text, sorted by `start` and non-overlapping.
    #[serde(default)]
    pub text_runs: Vec<TextRun>,
}

impl Changes {
    /// Only keep the text runs that are meaningful for `side`.
    pub fn for_side(&self, side: Side) -> Changes {
        Changes {
            address_changed: self.address_changed,
            text_runs: self
                .text_runs
                .iter()
                .filter(|run| run.op.is_visible_on(side))
                .copied()
                .collect(),
        }
    }
}

/// A label's presence.
///
/// The backend distinguishes between a label that is missing and one that was emitted with no
/// name, and the two render differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelState<'a> {
    Absent,
    Empty,
    Named(&'a str),
}

impl<'a> From<Option<&'a str>> for LabelState<'a> {
    fn from(label: Option<&'a str>) -> Self {
        match label {
            None => LabelState::Absent,
            Some("") => LabelState::Empty,
            Some(name) => LabelState::Named(name),
        }
    }
}

/// A diff operation exactly as it arrives on the wire, before the opcode has been checked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawDiffOperation {
    pub opcode: String,
    #[serde(alias = "type")]
    pub kind: LineKind,
    pub address: u64,
    pub size: u64,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, alias = "diff", skip_serializing_if = "Option::is_none")]
    pub changes: Option<Changes>,
}

/// One record of the diff stream, describing one line of the original and/or modified binary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffOperation {
    pub opcode: Opcode,
    pub kind: LineKind,
    /// Byte offset of the line in the binary it belongs to.
    pub address: u64,
    /// The number of bytes the line occupies.
    pub size: u64,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changes: Option<Changes>,
}

impl DiffOperation {
    /// Create an operation with no label and no sub-line annotations.
    pub fn new(opcode: Opcode, kind: LineKind, address: u64, size: u64, text: &str) -> Self {
        DiffOperation {
            opcode,
            kind,
            address,
            size,
            text: text.into(),
            label: None,
            changes: None,
        }
    }

    pub fn with_label(mut self, label: &str) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_changes(mut self, changes: Changes) -> Self {
        self.changes = Some(changes);
        self
    }

    pub fn label_state(&self) -> LabelState<'_> {
        self.label.as_deref().into()
    }
}

impl TryFrom<RawDiffOperation> for DiffOperation {
    type Error = UnrecognizedOpcodeError;

    fn try_from(raw: RawDiffOperation) -> Result<Self, Self::Error> {
        Ok(DiffOperation {
            opcode: Opcode::from_wire(&raw.opcode)?,
            kind: raw.kind,
            address: raw.address,
            size: raw.size,
            text: raw.text,
            label: raw.label,
            changes: raw.changes,
        })
    }
}
