//! Move application seam.

use analysis_queue::Position;

use crate::error::TreeError;

/// Applies moves to positions.
///
/// Real legality checking lives with whoever owns the board model. Moves fed
/// through here during a build always come from the engine's own output.
pub trait MoveRules: Send + Sync {
    /// The position after `mv`, or [`TreeError::IllegalMove`].
    fn apply(&self, position: &Position, mv: &str) -> Result<Position, TreeError>;
}

/// Accepts any well-formed UCI move (`e2e4`, `e7e8q`) and leaves board
/// legality to the engine, which resolves `position ... moves ...` itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct UciNotation;

impl MoveRules for UciNotation {
    fn apply(&self, position: &Position, mv: &str) -> Result<Position, TreeError> {
        if is_uci_move(mv) {
            Ok(position.with_move(mv))
        } else {
            Err(TreeError::IllegalMove {
                mv: mv.to_string(),
                position: position.clone(),
            })
        }
    }
}

/// Checks UCI long algebraic syntax: two distinct squares plus an optional
/// promotion piece.
pub fn is_uci_move(mv: &str) -> bool {
    let bytes = mv.as_bytes();
    if bytes.len() != 4 && bytes.len() != 5 {
        return false;
    }
    let square = |file: u8, rank: u8| (b'a'..=b'h').contains(&file) && (b'1'..=b'8').contains(&rank);
    if !square(bytes[0], bytes[1]) || !square(bytes[2], bytes[3]) {
        return false;
    }
    if bytes[0..2] == bytes[2..4] {
        return false;
    }
    match bytes.get(4) {
        None => true,
        Some(promo) => matches!(promo, b'n' | b'b' | b'r' | b'q'),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_well_formed_moves() {
        assert!(is_uci_move("e2e4"));
        assert!(is_uci_move("e7e8q"));
        assert!(is_uci_move("a7b8n"));
        assert!(is_uci_move("e1g1"));
    }

    #[test]
    fn rejects_malformed_moves() {
        assert!(!is_uci_move(""));
        assert!(!is_uci_move("e2"));
        assert!(!is_uci_move("e2e9"));
        assert!(!is_uci_move("i2i4"));
        assert!(!is_uci_move("e7e8k"));
        assert!(!is_uci_move("e4e4"));
        assert!(!is_uci_move("Nf3"));
        assert!(!is_uci_move("e2e4e5"));
    }

    #[test]
    fn apply_appends_move() {
        let pos = UciNotation.apply(&Position::startpos(), "e2e4").unwrap();
        assert_eq!(pos.moves, vec!["e2e4"]);
    }

    #[test]
    fn apply_reports_illegal_move() {
        let err = UciNotation.apply(&Position::startpos(), "zz").unwrap_err();
        assert_eq!(
            err,
            TreeError::IllegalMove {
                mv: "zz".to_string(),
                position: Position::startpos()
            }
        );
        assert!(err.to_string().contains("Illegal move zz"));
    }
}
