//! Mapping from an operation's opcode to how its line is presented in a column.

use crate::diff::Opcode;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

/// The presentation category of a row in a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// A line that is unchanged, or only carries sub-line annotations.
    Plain,
    /// A line that only exists in the modified binary.
    Inserted,
    /// A line that only exists in the original binary.
    Deleted,
    /// A placeholder for a line that has no counterpart on this side.
    Blank,
}

/// Classify a row.
///
/// Placeholders never get insert or delete styling, so `is_blank` takes priority over the
/// opcode.
pub fn classify(opcode: Opcode, is_blank: bool) -> Category {
    if is_blank {
        return Category::Blank;
    }
    match opcode {
        Opcode::Insert => Category::Inserted,
        Opcode::Delete => Category::Deleted,
        Opcode::Equal | Opcode::ReplaceLeft | Opcode::ReplaceRight => Category::Plain,
    }
}
