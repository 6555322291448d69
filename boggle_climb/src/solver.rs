//! Board scoring: grid adjacency, the length points table, and the
//! dictionary-trie DFS.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::board::Board;
use crate::trie::{Cursor, Trie};
use crate::BoggleError;

/// Words shorter than this score nothing and are dropped from the dictionary.
pub const MIN_WORD_LEN: usize = 3;

/// One dictionary word found on a board, with its points.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FoundWord {
    pub word: String,
    pub points: u32,
}

/// Result of scoring a board: the total and every distinct word found.
#[derive(Clone, Debug, Default)]
pub struct Solution {
    pub score: u32,
    pub words: Vec<FoundWord>,
}

/// Scores boards of a fixed shape against a dictionary trie.
pub struct Solver {
    rows: usize,
    cols: usize,
    adjacency: Vec<Vec<usize>>,
    dictionary: Trie,
}

impl Solver {
    /// Build a solver for rows-by-cols boards. Words outside
    /// `MIN_WORD_LEN..=rows*cols` or containing non-alphabetic characters are
    /// skipped; the rest are upper-cased and inserted with their length
    /// points.
    pub fn new(rows: usize, cols: usize, words: &[String]) -> Result<Self, BoggleError> {
        if rows == 0 || cols == 0 {
            return Err(BoggleError::InvalidParameter(format!(
                "solver dimensions must be positive, got {}x{}",
                rows, cols
            )));
        }
        let max_len = rows * cols;
        let points = word_points(max_len);
        let mut dictionary = Trie::new();
        for word in words {
            let word = word.trim();
            if word.len() < MIN_WORD_LEN || word.len() > max_len {
                continue;
            }
            if !word.bytes().all(|b| b.is_ascii_alphabetic()) {
                continue;
            }
            let upper = word.to_ascii_uppercase();
            dictionary.insert(&upper, points[upper.len()]);
        }
        Ok(Self {
            rows,
            cols,
            adjacency: adjacency(rows, cols),
            dictionary,
        })
    }

    pub fn from_word_file(rows: usize, cols: usize, path: &Path) -> Result<Self, BoggleError> {
        let words = load_words(path)?;
        Self::new(rows, cols, &words)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// 8-neighborhood adjacency over linear cell indices.
    pub fn adjacency(&self) -> &[Vec<usize>] {
        &self.adjacency
    }

    /// Total points for a board.
    pub fn score(&self, board: &Board) -> Result<u32, BoggleError> {
        Ok(self.solve(board)?.score)
    }

    /// Score a board and collect every distinct dictionary word on it.
    pub fn solve(&self, board: &Board) -> Result<Solution, BoggleError> {
        if board.rows() != self.rows || board.cols() != self.cols {
            return Err(BoggleError::InvalidParameter(format!(
                "board is {}x{} but solver expects {}x{}",
                board.rows(),
                board.cols(),
                self.rows,
                self.cols
            )));
        }
        let root = match self.dictionary.descend() {
            Some(root) => root,
            None => return Ok(Solution::default()),
        };

        let mut visited = vec![false; self.adjacency.len()];
        let mut word = String::new();
        let mut found = Trie::new();
        let mut words = Vec::new();
        let mut score = 0;
        for p in 0..self.adjacency.len() {
            score += self.dfs(
                board,
                p,
                root,
                &mut visited,
                &mut word,
                &mut found,
                &mut words,
            );
        }

        words.sort_by(|a, b| a.word.cmp(&b.word));
        Ok(Solution { score, words })
    }

    #[allow(clippy::too_many_arguments)]
    fn dfs(
        &self,
        board: &Board,
        p: usize,
        cursor: Cursor<'_>,
        visited: &mut [bool],
        word: &mut String,
        found: &mut Trie,
        words: &mut Vec<FoundWord>,
    ) -> u32 {
        if visited[p] {
            return 0;
        }
        let letter = board.letter(p);
        let next = match cursor.step(letter) {
            Some(next) => next,
            None => return 0,
        };

        visited[p] = true;
        word.push(letter as char);
        if letter == b'Q' {
            word.push('U');
        }

        let mut total = 0;
        let points = next.points();
        if points > 0 && !found.contains(word) {
            found.insert(word, points);
            words.push(FoundWord {
                word: word.clone(),
                points,
            });
            total += points;
        }

        for &q in &self.adjacency[p] {
            total += self.dfs(board, q, next, visited, word, found, words);
        }

        visited[p] = false;
        word.pop();
        if letter == b'Q' {
            word.pop();
        }

        total
    }
}

/// Read a word list, one word per line.
pub fn load_words(path: &Path) -> Result<Vec<String>, BoggleError> {
    let file = File::open(path)
        .map_err(|e| BoggleError::Dictionary(format!("{}: {}", path.display(), e)))?;
    let reader = BufReader::new(file);
    let mut words = Vec::new();
    for line in reader.lines() {
        let line =
            line.map_err(|e| BoggleError::Dictionary(format!("{}: {}", path.display(), e)))?;
        let word = line.trim();
        if !word.is_empty() {
            words.push(word.to_string());
        }
    }
    Ok(words)
}

fn adjacency(rows: usize, cols: usize) -> Vec<Vec<usize>> {
    let mut out = vec![Vec::new(); rows * cols];
    for r in 0..rows {
        for c in 0..cols {
            let i = r * cols + c;
            for dr in [-1i64, 0, 1] {
                let tr = r as i64 + dr;
                if tr < 0 || tr as usize == rows {
                    continue;
                }
                for dc in [-1i64, 0, 1] {
                    let tc = c as i64 + dc;
                    if tc < 0 || tc as usize == cols {
                        continue;
                    }
                    if dr == 0 && dc == 0 {
                        continue;
                    }
                    out[i].push(tr as usize * cols + tc as usize);
                }
            }
        }
    }
    out
}

/// Points by word length: nothing below `MIN_WORD_LEN`, then the classic
/// 1/1/2/3/5/11 schedule.
fn word_points(max_len: usize) -> Vec<u32> {
    (0..=max_len)
        .map(|len| match len {
            _ if len < MIN_WORD_LEN => 0,
            3 | 4 => 1,
            5 => 2,
            6 => 3,
            7 => 5,
            _ => 11,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dict(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_adjacency_neighbor_counts() {
        let adj = adjacency(4, 4);
        assert_eq!(adj[0].len(), 3); // corner
        assert_eq!(adj[1].len(), 5); // edge
        assert_eq!(adj[5].len(), 8); // interior
        assert_eq!(adj[15].len(), 3);
        assert!(adj[0].contains(&1));
        assert!(adj[0].contains(&4));
        assert!(adj[0].contains(&5));
    }

    #[test]
    fn test_word_points_schedule() {
        let points = word_points(16);
        assert_eq!(points[0], 0);
        assert_eq!(points[2], 0);
        assert_eq!(points[3], 1);
        assert_eq!(points[4], 1);
        assert_eq!(points[5], 2);
        assert_eq!(points[6], 3);
        assert_eq!(points[7], 5);
        assert_eq!(points[8], 11);
        assert_eq!(points[16], 11);
    }

    #[test]
    fn test_solve_fixed_board() {
        let words = dict(&["cat", "cats", "taco", "coat", "ox", "zebra"]);
        let solver = Solver::new(4, 4, &words).unwrap();
        let board = "4 4\nC A T S\nO X X X\nX X X X\nX X X X".parse().unwrap();
        let solution = solver.solve(&board).unwrap();

        let found: Vec<&str> = solution.words.iter().map(|w| w.word.as_str()).collect();
        assert_eq!(found, vec!["CAT", "CATS", "COAT", "TACO"]);
        assert_eq!(solution.score, 4);
    }

    #[test]
    fn test_duplicate_paths_count_once() {
        // ABA reads the same downward and upward
        let words = dict(&["aba"]);
        let solver = Solver::new(3, 1, &words).unwrap();
        let board = "3 1\nA\nB\nA".parse().unwrap();
        let solution = solver.solve(&board).unwrap();
        assert_eq!(solution.score, 1);
        assert_eq!(solution.words.len(), 1);
    }

    #[test]
    fn test_qu_cell_spells_qu_words() {
        let words = dict(&["quiz"]);
        let solver = Solver::new(2, 2, &words).unwrap();
        let board = "2 2\nQu I\nZ X".parse().unwrap();
        let solution = solver.solve(&board).unwrap();
        assert_eq!(solution.score, 1);
        assert_eq!(solution.words[0].word, "QUIZ");
    }

    #[test]
    fn test_dimension_mismatch_is_rejected() {
        let solver = Solver::new(4, 4, &dict(&["cat"])).unwrap();
        let board: Board = "2 2\nA B\nC D".parse().unwrap();
        assert!(solver.solve(&board).is_err());
    }

    #[test]
    fn test_overlong_words_are_dropped() {
        let words = dict(&["abcde"]);
        let solver = Solver::new(2, 2, &words).unwrap();
        let board: Board = "2 2\nA B\nC D".parse().unwrap();
        assert_eq!(solver.score(&board).unwrap(), 0);
    }

    #[test]
    fn test_missing_dictionary_file() {
        let err = load_words(Path::new("no-such-dictionary.txt"));
        assert!(err.is_err());
    }
}
