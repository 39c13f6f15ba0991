//! Column-order bitmap decoding.
//!
//! DBMaker stores the columns of a composite key in `SYSFOREIGNKEY` as a
//! fixed-width array of little-endian `u16` column ordinals (1-based),
//! terminated by a zero ordinal or by the end of the buffer.

use thiserror::Error;

/// Width of one encoded ordinal.
const ORDINAL_WIDTH: usize = 2;

/// Errors produced while decoding a column-order bitmap.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// A trailing unpaired byte was reached before the zero sentinel.
    #[error("column-order bitmap has odd length {len} (expected pairs of bytes)")]
    OddLength {
        /// Length of the offending buffer.
        len: usize,
    },
}

/// Decodes a column-order bitmap into 0-based column indices.
///
/// Each pair of bytes is one ordinal; the decoded index is `ordinal - 1`.
/// Decoding stops at the first zero ordinal, which is never read past, so
/// trailing bytes after it are ignored whatever their length.
///
/// ```
/// use oxide_sql_dbmaker::codec::decode_column_order;
///
/// let bytes = [3, 0, 2, 0, 1, 0, 0, 0];
/// assert_eq!(decode_column_order(&bytes).unwrap(), vec![2, 1, 0]);
/// ```
pub fn decode_column_order(bytes: &[u8]) -> Result<Vec<usize>, DecodeError> {
    let mut indices = Vec::new();
    for pair in bytes.chunks(ORDINAL_WIDTH) {
        let &[lo, hi] = pair else {
            return Err(DecodeError::OddLength { len: bytes.len() });
        };
        let ordinal = u16::from_le_bytes([lo, hi]);
        let Some(index) = ordinal.checked_sub(1) else {
            break;
        };
        indices.push(usize::from(index));
    }
    Ok(indices)
}
