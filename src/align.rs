//! Address contiguity checks for a projected column.
//!
//! Every line the backend emits occupies `size` bytes starting at `address`, so consecutive lines
//! of one column have to tile the address space exactly. A gap or an overlap means the backend
//! produced a corrupt stream (reordered operations, a miscalculated size) and there is nothing we
//! can do about it locally.

use crate::project::ColumnLine;
use log::trace;
use thiserror::Error;

/// The ways a column can fail to tile its address space.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum AlignmentError {
    #[error("Row {row} is at address {actual:#010x} but the previous line ends at {expected:#010x}")]
    Discontiguous {
        row: usize,
        expected: u64,
        actual: u64,
    },
    #[error("Row {row} at address {address:#010x} with size {size} overflows the address space")]
    Overflow { row: usize, address: u64, size: u64 },
    #[error("Row {row} at address {address:#010x} has a size of zero")]
    Empty { row: usize, address: u64 },
}

/// Check that the non-blank lines of a column are contiguous.
///
/// The first line seeds the expected address. A blank placeholder has no address of its own and
/// breaks the chain: the line after it seeds the expected address again, since the two sides'
/// addresses diverge across an insertion or deletion. Every line has to occupy at least one byte.
pub fn validate(column: &[ColumnLine]) -> Result<(), AlignmentError> {
    let mut expected: Option<u64> = None;

    for (row, entry) in column.iter().enumerate() {
        let ColumnLine::Line(line) = entry else {
            expected = None;
            continue;
        };

        if line.size == 0 {
            return Err(AlignmentError::Empty {
                row,
                address: line.address,
            });
        }
        match expected {
            Some(expected) if line.address != expected => {
                return Err(AlignmentError::Discontiguous {
                    row,
                    expected,
                    actual: line.address,
                });
            }
            _ => (),
        }
        expected = Some(line.address.checked_add(line.size).ok_or(
            AlignmentError::Overflow {
                row,
                address: line.address,
                size: line.size,
            },
        )?);
        trace!("Row {row} ends at {:?}", expected);
    }
    Ok(())
}
