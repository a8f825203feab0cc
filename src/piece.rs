use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// Identifier of a [`Piece`]. Unique within one instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PieceId(pub u32);

impl fmt::Display for PieceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A demand item that has to be cut exactly once.
///
/// Two pieces are the same item only if their ids agree; equal lengths do not merge them.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Piece {
    id: PieceId,
    length: u32,
}

impl Piece {
    pub fn new(id: u32, length: u32) -> Self {
        Piece {
            id: PieceId(id),
            length,
        }
    }

    pub fn id(&self) -> PieceId {
        self.id
    }

    pub fn length(&self) -> u32 {
        self.length
    }
}

impl PartialEq for Piece {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Piece {}

impl Hash for Piece {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Piece {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.id, self.length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn identity_is_by_id() {
        let a = Piece::new(1, 100);
        let b = Piece::new(2, 100);
        let c = Piece::new(1, 40);
        assert_ne!(a, b);
        assert_eq!(a, c);

        let set: HashSet<Piece> = [a, b, c].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn display() {
        assert_eq!(Piece::new(4, 125).to_string(), "(4,125)");
    }
}
