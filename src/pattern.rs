use std::fmt;
use std::hash::{Hash, Hasher};

use serde::Serialize;

use crate::error::ModelConstructionError;
use crate::piece::Piece;

/// Identifier of a [`Pattern`]. The controller hands them out in column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct PatternId(pub usize);

impl fmt::Display for PatternId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A set of pieces cut from a single rod, i.e. one column of the master problem.
///
/// The total length never exceeds the capacity the pattern was built for; this is checked on
/// construction and the pattern is immutable afterwards. Like [`Piece`], patterns compare by id.
#[derive(Debug, Clone, Serialize)]
pub struct Pattern {
    id: PatternId,
    pieces: Vec<Piece>,
    capacity: u32,
}

impl Pattern {
    /// Creates a pattern, rejecting repeated pieces and contents longer than `capacity`.
    pub fn new(
        id: PatternId,
        pieces: Vec<Piece>,
        capacity: u32,
    ) -> Result<Self, ModelConstructionError> {
        for (i, piece) in pieces.iter().enumerate() {
            if pieces[..i].contains(piece) {
                return Err(ModelConstructionError::RepeatedPieceInPattern {
                    pattern: id,
                    piece: piece.id(),
                });
            }
        }
        let pattern = Pattern {
            id,
            pieces,
            capacity,
        };
        let length = pattern.total_length();
        if length > u64::from(capacity) {
            return Err(ModelConstructionError::PatternTooLong {
                pattern: id,
                length,
                capacity,
            });
        }
        Ok(pattern)
    }

    /// A pattern holding `piece` alone.
    pub fn single(id: PatternId, piece: Piece, capacity: u32) -> Result<Self, ModelConstructionError> {
        Self::new(id, vec![piece], capacity)
    }

    /// Builds a pattern from a 0/1 membership row aligned with `pieces`: entry `i` tells whether
    /// `pieces[i]` belongs to the pattern.
    pub fn from_membership_row(
        id: PatternId,
        row: &[bool],
        pieces: &[Piece],
        capacity: u32,
    ) -> Result<Self, ModelConstructionError> {
        if row.len() != pieces.len() {
            return Err(ModelConstructionError::RowLength {
                expected: pieces.len(),
                found: row.len(),
            });
        }
        let members = pieces
            .iter()
            .zip(row)
            .filter(|(_, in_pattern)| **in_pattern)
            .map(|(piece, _)| *piece)
            .collect();
        Self::new(id, members, capacity)
    }

    /// The inverse of [`Pattern::from_membership_row`].
    pub fn membership_row(&self, pieces: &[Piece]) -> Vec<bool> {
        pieces.iter().map(|piece| self.contains(piece)).collect()
    }

    pub fn id(&self) -> PatternId {
        self.id
    }

    pub fn pieces(&self) -> &[Piece] {
        &self.pieces
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.pieces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }

    /// Sum of the lengths of all member pieces.
    pub fn total_length(&self) -> u64 {
        self.pieces.iter().map(|p| u64::from(p.length())).sum()
    }

    /// Rod length left over after cutting this pattern from a rod of its capacity.
    pub fn waste(&self) -> u64 {
        u64::from(self.capacity) - self.total_length()
    }

    /// Whether the pattern can be cut from a rod of length `capacity`.
    pub fn fits(&self, capacity: u32) -> bool {
        self.total_length() <= u64::from(capacity)
    }

    pub fn contains(&self, piece: &Piece) -> bool {
        self.pieces.contains(piece)
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Pattern {}

impl Hash for Pattern {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[", self.id)?;
        for (i, piece) in self.pieces.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", piece.length())?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::piece::PieceId;

    fn pieces() -> Vec<Piece> {
        [110, 150, 125, 140, 105, 123]
            .iter()
            .enumerate()
            .map(|(i, &len)| Piece::new(i as u32, len))
            .collect()
    }

    #[test]
    fn total_length_and_fit() {
        let p = pieces();
        let pattern = Pattern::new(PatternId(0), vec![p[0], p[4]], 250).unwrap();
        assert_eq!(pattern.total_length(), 215);
        assert_eq!(pattern.waste(), 35);
        assert!(pattern.fits(215));
        assert!(!pattern.fits(214));
        assert!(pattern.contains(&p[4]));
        assert!(!pattern.contains(&p[1]));
    }

    #[test]
    fn containment_ignores_equal_lengths() {
        let a = Piece::new(0, 50);
        let b = Piece::new(1, 50);
        let pattern = Pattern::single(PatternId(0), a, 100).unwrap();
        assert!(pattern.contains(&a));
        assert!(!pattern.contains(&b));
    }

    #[test]
    fn rejects_overlong_pattern() {
        let p = pieces();
        let err = Pattern::new(PatternId(3), vec![p[0], p[2]], 150).unwrap_err();
        assert_eq!(
            err,
            ModelConstructionError::PatternTooLong {
                pattern: PatternId(3),
                length: 235,
                capacity: 150,
            }
        );
    }

    #[test]
    fn rejects_repeated_piece() {
        let p = pieces();
        let err = Pattern::new(PatternId(0), vec![p[4], p[4]], 400).unwrap_err();
        assert_eq!(
            err,
            ModelConstructionError::RepeatedPieceInPattern {
                pattern: PatternId(0),
                piece: PieceId(4),
            }
        );
    }

    #[test]
    fn membership_row_round_trip() {
        let p = pieces();
        let row = [true, false, false, false, true, false];
        let pattern = Pattern::from_membership_row(PatternId(1), &row, &p, 400).unwrap();
        assert_eq!(pattern.len(), 2);
        assert_eq!(pattern.membership_row(&p), row.to_vec());
    }

    #[test]
    fn membership_row_length_must_match() {
        let p = pieces();
        let err = Pattern::from_membership_row(PatternId(1), &[true], &p, 400).unwrap_err();
        assert_eq!(
            err,
            ModelConstructionError::RowLength {
                expected: 6,
                found: 1
            }
        );
    }

    #[test]
    fn empty_pattern_is_feasible() {
        let pattern = Pattern::new(PatternId(0), Vec::new(), 0).unwrap();
        assert!(pattern.is_empty());
        assert_eq!(pattern.total_length(), 0);
        assert_eq!(pattern.to_string(), "0[]");
    }

    #[test]
    fn display_lists_lengths() {
        let p = pieces();
        let pattern = Pattern::new(PatternId(7), vec![p[0], p[3]], 400).unwrap();
        assert_eq!(pattern.to_string(), "7[110,140]");
    }
}
