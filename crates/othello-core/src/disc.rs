use std::fmt;

/// Represents a disc in the game.
///
/// The `Disc` enum has three variants:
///
/// * `Empty` - An empty cell.
/// * `Black` - A black disc.
/// * `White` - A white disc.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Disc {
    #[default]
    Empty,
    Black,
    White,
}

impl Disc {
    /// Converts the disc to its character representation.
    ///
    /// # Returns
    ///
    /// * `'-'` for `Disc::Empty`
    /// * `'X'` for `Disc::Black`
    /// * `'O'` for `Disc::White`
    pub fn to_char(self) -> char {
        match self {
            Disc::Empty => '-',
            Disc::Black => 'X',
            Disc::White => 'O',
        }
    }

    /// Parses a board character. `'-'` and `'.'` both denote an empty cell.
    pub fn from_char(c: char) -> Option<Disc> {
        match c {
            'X' | 'x' | '*' => Some(Disc::Black),
            'O' | 'o' => Some(Disc::White),
            '-' | '.' => Some(Disc::Empty),
            _ => None,
        }
    }

    /// Returns the owning player, or `None` for an empty cell.
    pub fn player(self) -> Option<Player> {
        match self {
            Disc::Black => Some(Player::Black),
            Disc::White => Some(Player::White),
            Disc::Empty => None,
        }
    }
}

/// One of the two sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Player {
    Black = 0,
    White = 1,
}

impl Player {
    /// Returns the other side.
    #[inline]
    pub fn opposite(self) -> Player {
        match self {
            Player::Black => Player::White,
            Player::White => Player::Black,
        }
    }

    /// Returns the disc this player places.
    #[inline]
    pub fn disc(self) -> Disc {
        match self {
            Player::Black => Disc::Black,
            Player::White => Disc::White,
        }
    }

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Player::Black => write!(f, "black"),
            Player::White => write!(f, "white"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_opposite() {
        assert_eq!(Player::Black.opposite(), Player::White);
        assert_eq!(Player::White.opposite().opposite(), Player::White);
    }

    #[test]
    fn test_disc_chars() {
        for disc in [Disc::Empty, Disc::Black, Disc::White] {
            assert_eq!(Disc::from_char(disc.to_char()), Some(disc));
        }
        assert_eq!(Disc::from_char('?'), None);
        assert_eq!(Disc::Black.player(), Some(Player::Black));
        assert_eq!(Disc::Empty.player(), None);
    }
}
