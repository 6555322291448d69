//! Boggle boards: dice sets, random rolls, and the plain-text board format.

use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::BoggleError;

/// The 16 Boggle dice (1992 version).
pub const BOGGLE_1992: [&str; 16] = [
    "LRYTTE", "VTHRWE", "EGHWNE", "SEOTIS", "ANAEEG", "IDSYTT", "OATTOW", "MTOICU", "AFPKFS",
    "XLDERI", "HCPOAS", "ENSIEU", "YLDEVR", "ZNRNHL", "NMIQHU", "OBBAOJ",
];

/// The 16 Boggle dice (1983 version).
pub const BOGGLE_1983: [&str; 16] = [
    "AACIOT", "ABILTY", "ABJMOQ", "ACDEMP", "ACELRS", "ADENVZ", "AHMORS", "BIFORX", "DENOSW",
    "DKNOTU", "EEFHIY", "EGINTV", "EGKLUY", "EHINPS", "ELPSTU", "GILRUW",
];

/// The 25 Boggle Master / Boggle Deluxe dice.
pub const BOGGLE_MASTER: [&str; 25] = [
    "AAAFRS", "AAEEEE", "AAFIRS", "ADENNN", "AEEEEM", "AEEGMU", "AEGMNN", "AFIRSY", "BJKQXZ",
    "CCNSTW", "CEIILT", "CEILPT", "CEIPST", "DDLNOR", "DHHLOR", "DHHNOT", "DHLNOR", "EIIITT",
    "EMOTTT", "ENSSSU", "FIPRSY", "GORRVW", "HIPRRY", "NOOTUW", "OOOTTU",
];

/// The 25 Big Boggle dice.
pub const BOGGLE_BIG: [&str; 25] = [
    "AAAFRS", "AAEEEE", "AAFIRS", "ADENNN", "AEEEEM", "AEEGMU", "AEGMNN", "AFIRSY", "BJKQXZ",
    "CCENST", "CEIILT", "CEILPT", "CEIPST", "DDHNOT", "DHHLOR", "DHLNOR", "DHLNOR", "EIIITT",
    "EMOTTT", "ENSSSU", "FIPRSY", "GORRVW", "IPRRRY", "NOOTUW", "OOOTTU",
];

const ALPHABET: &[u8; 26] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Frequencies of letters in the English alphabet.
const ENGLISH_FREQUENCIES: [f64; 26] = [
    0.08167, 0.01492, 0.02782, 0.04253, 0.12703, 0.02228, 0.02015, 0.06094, 0.06966, 0.00153,
    0.00772, 0.04025, 0.02406, 0.06749, 0.07507, 0.01929, 0.00095, 0.05987, 0.06327, 0.09056,
    0.02758, 0.00978, 0.02360, 0.00150, 0.01974, 0.00074,
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DiceSet {
    Classic1992,
    Classic1983,
    Master,
    Big,
}

impl Default for DiceSet {
    fn default() -> Self {
        DiceSet::Classic1992
    }
}

impl DiceSet {
    pub fn faces(&self) -> &'static [&'static str] {
        match self {
            DiceSet::Classic1992 => &BOGGLE_1992,
            DiceSet::Classic1983 => &BOGGLE_1983,
            DiceSet::Master => &BOGGLE_MASTER,
            DiceSet::Big => &BOGGLE_BIG,
        }
    }

    pub fn dims(&self) -> (usize, usize) {
        match self {
            DiceSet::Classic1992 | DiceSet::Classic1983 => (4, 4),
            DiceSet::Master | DiceSet::Big => (5, 5),
        }
    }
}

/// A rows-by-cols grid of uppercase letters; `Q` stands for the `Qu` face.
///
/// Boards rolled from a dice set remember which die landed on each cell so a
/// mutation can re-roll a cell within its die's faces.
#[derive(Clone, Debug)]
pub struct Board {
    rows: usize,
    cols: usize,
    letters: Vec<u8>,
    dice: Vec<&'static str>,
}

impl Board {
    /// Roll a fresh board: shuffle the dice onto the grid, then pick a random
    /// face of each die.
    pub fn roll<R: Rng>(dice: DiceSet, rng: &mut R) -> Board {
        let (rows, cols) = dice.dims();
        let mut assigned: Vec<&'static str> = dice.faces().to_vec();
        assigned.shuffle(rng);
        let letters = assigned
            .iter()
            .map(|faces| {
                let bytes = faces.as_bytes();
                bytes[rng.gen_range(0..bytes.len())]
            })
            .collect();
        Board {
            rows,
            cols,
            letters,
            dice: assigned,
        }
    }

    /// A random rows-by-cols board drawn from English letter frequencies.
    pub fn random<R: Rng>(rows: usize, cols: usize, rng: &mut R) -> Result<Board, BoggleError> {
        if rows == 0 || cols == 0 {
            return Err(BoggleError::InvalidParameter(format!(
                "board dimensions must be positive, got {}x{}",
                rows, cols
            )));
        }
        let letters = (0..rows * cols)
            .map(|_| {
                let idx = weighted_index(&ENGLISH_FREQUENCIES, rng).unwrap_or(0);
                ALPHABET[idx]
            })
            .collect();
        Ok(Board {
            rows,
            cols,
            letters,
            dice: Vec::new(),
        })
    }

    pub fn from_file(path: &Path) -> Result<Board, BoggleError> {
        let text = fs::read_to_string(path)
            .map_err(|e| BoggleError::BoardParse(format!("{}: {}", path.display(), e)))?;
        text.parse()
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn len(&self) -> usize {
        self.letters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.letters.is_empty()
    }

    /// Letter at a linear cell index (row-major).
    pub fn letter(&self, idx: usize) -> u8 {
        self.letters[idx]
    }

    pub fn letters(&self) -> &[u8] {
        &self.letters
    }

    pub(crate) fn set_letter(&mut self, idx: usize, letter: u8) {
        self.letters[idx] = letter;
    }

    /// Faces of the die sitting on a cell, or `None` when the board was not
    /// rolled from dice.
    pub fn faces_at(&self, idx: usize) -> Option<&'static str> {
        self.dice.get(idx).copied()
    }

    /// Cells in row-major order as display tokens, `Qu` for the Q face.
    pub fn cells(&self) -> Vec<String> {
        self.letters
            .iter()
            .map(|&b| {
                if b == b'Q' {
                    "Qu".to_string()
                } else {
                    (b as char).to_string()
                }
            })
            .collect()
    }
}

impl FromStr for Board {
    type Err = BoggleError;

    /// Parse the text form: `<rows> <cols>` followed by rows*cols letter
    /// tokens, whitespace separated. `Qu` (any case) is accepted for Q.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut tokens = s.split_whitespace();
        let rows = parse_dim(tokens.next(), "rows")?;
        let cols = parse_dim(tokens.next(), "cols")?;

        let mut letters = Vec::with_capacity(rows * cols);
        for _ in 0..rows * cols {
            let token = tokens
                .next()
                .ok_or_else(|| BoggleError::BoardParse("ran out of letters".to_string()))?;
            let upper = token.to_ascii_uppercase();
            let letter = match upper.as_str() {
                "QU" => b'Q',
                t if t.len() == 1 && t.as_bytes()[0].is_ascii_uppercase() => t.as_bytes()[0],
                _ => {
                    return Err(BoggleError::BoardParse(format!(
                        "invalid character: {}",
                        token
                    )))
                }
            };
            letters.push(letter);
        }

        Ok(Board {
            rows,
            cols,
            letters,
            dice: Vec::new(),
        })
    }
}

fn parse_dim(token: Option<&str>, name: &str) -> Result<usize, BoggleError> {
    let raw = token.ok_or_else(|| BoggleError::BoardParse(format!("missing {}", name)))?;
    let value: usize = raw
        .parse()
        .map_err(|_| BoggleError::BoardParse(format!("invalid {}: {}", name, raw)))?;
    if value == 0 {
        return Err(BoggleError::BoardParse(format!("{} must be positive", name)));
    }
    Ok(value)
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} {}", self.rows, self.cols)?;
        for r in 0..self.rows {
            let row: Vec<String> = (0..self.cols)
                .map(|c| {
                    let b = self.letters[r * self.cols + c];
                    if b == b'Q' {
                        "Qu".to_string()
                    } else {
                        (b as char).to_string()
                    }
                })
                .collect();
            let line: String = row
                .iter()
                .map(|token| format!("{:<3}", token))
                .collect::<String>();
            if r + 1 == self.rows {
                write!(f, "{}", line.trim_end())?;
            } else {
                writeln!(f, "{}", line.trim_end())?;
            }
        }
        Ok(())
    }
}

/// Sample an index proportionally to the given non-negative weights.
/// Returns `None` when no weight is positive.
pub(crate) fn weighted_index<R: Rng>(weights: &[f64], rng: &mut R) -> Option<usize> {
    let total: f64 = weights.iter().copied().filter(|w| *w > 0.0).sum();
    if total <= 0.0 || !total.is_finite() {
        return None;
    }
    let mut target = rng.gen::<f64>() * total;
    let mut last = None;
    for (idx, &w) in weights.iter().enumerate() {
        if w <= 0.0 {
            continue;
        }
        last = Some(idx);
        target -= w;
        if target < 0.0 {
            return Some(idx);
        }
    }
    // float rounding can leave a sliver of target; fall back to the last
    // positive weight
    last
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_parse_and_display_round_trip() {
        let text = "4 4\nC  A  T  S\nO  X  X  X\nX  X  X  X\nX  X  X  X";
        let board: Board = text.parse().unwrap();
        assert_eq!(board.rows(), 4);
        assert_eq!(board.cols(), 4);
        assert_eq!(board.letter(0), b'C');
        assert_eq!(board.letter(3), b'S');

        let rendered = board.to_string();
        let reparsed: Board = rendered.parse().unwrap();
        assert_eq!(reparsed.letters(), board.letters());
    }

    #[test]
    fn test_parse_qu_token() {
        let board: Board = "2 2\nQu I\nZ  X".parse().unwrap();
        assert_eq!(board.letter(0), b'Q');
        assert_eq!(board.cells(), vec!["Qu", "I", "Z", "X"]);
        assert!(board.to_string().starts_with("2 2\nQu I"));
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!("1 1\n#".parse::<Board>().is_err());
        assert!("2 2\nA B C".parse::<Board>().is_err());
        assert!("0 4\n".parse::<Board>().is_err());
        assert!("x 4\nA".parse::<Board>().is_err());
        assert!("1 1\nAB".parse::<Board>().is_err());
    }

    #[test]
    fn test_roll_draws_faces_from_assigned_dice() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let board = Board::roll(DiceSet::Classic1992, &mut rng);
        assert_eq!((board.rows(), board.cols()), (4, 4));
        assert_eq!(board.len(), 16);
        for idx in 0..board.len() {
            let faces = board.faces_at(idx).unwrap();
            assert!(faces.as_bytes().contains(&board.letter(idx)));
        }
    }

    #[test]
    fn test_random_board_uses_alphabet() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let board = Board::random(3, 5, &mut rng).unwrap();
        assert_eq!(board.len(), 15);
        assert!(board.letters().iter().all(|b| b.is_ascii_uppercase()));
        assert!(board.faces_at(0).is_none());
        assert!(Board::random(0, 5, &mut rng).is_err());
    }

    #[test]
    fn test_weighted_index_respects_weights() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let weights = [0.0, 0.0, 1.0];
        for _ in 0..32 {
            assert_eq!(weighted_index(&weights, &mut rng), Some(2));
        }
        assert_eq!(weighted_index(&[0.0, 0.0], &mut rng), None);
        assert_eq!(weighted_index(&[], &mut rng), None);
    }
}
