//! Hill-climb search over random boards with bigram-guided mutation and
//! periodic random restarts.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

use crate::board::{weighted_index, Board, DiceSet};
use crate::solver::{Solver, MIN_WORD_LEN};
use crate::BoggleError;

/// How many random boards are scored per worker to seed the climb.
const MULTISTART_FACTOR: usize = 32;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Clone, Debug)]
pub struct SearchParams {
    pub dice: DiceSet,
    pub workers: usize,
    /// Wall-clock bound; `None` runs until the process is killed.
    pub duration: Option<Duration>,
    pub restart_interval: Duration,
    pub seed: Option<u64>,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            dice: DiceSet::default(),
            workers: thread::available_parallelism().map_or(1, |n| n.get()),
            duration: None,
            restart_interval: Duration::from_secs(300),
            seed: None,
        }
    }
}

/// A new best score, as handed to the improvement sink.
#[derive(Clone, Debug)]
pub struct Improvement {
    pub epoch: u64,
    pub elapsed_ms: u64,
    pub score: u32,
    pub cells: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct SearchSummary {
    pub best_score: u32,
    pub best_cells: Vec<String>,
    pub improvements: u64,
    pub elapsed: Duration,
}

/// Symmetric, normalized adjacent-letter pair frequencies over a word list.
pub struct BigramFrequencies {
    table: [[f64; 26]; 26],
}

impl BigramFrequencies {
    /// Count letter pairs in words within `MIN_WORD_LEN..=max_word_len`,
    /// both directions, normalized by the number of pairs seen.
    pub fn from_words(words: &[String], max_word_len: usize) -> Self {
        let mut counts = [[0u64; 26]; 26];
        let mut pairs = 0u64;
        for word in words {
            let word = word.trim();
            if word.len() < MIN_WORD_LEN || word.len() > max_word_len {
                continue;
            }
            let upper = word.to_ascii_uppercase();
            let bytes = upper.as_bytes();
            for pair in bytes.windows(2) {
                if !pair[0].is_ascii_uppercase() || !pair[1].is_ascii_uppercase() {
                    continue;
                }
                let a = (pair[0] - b'A') as usize;
                let b = (pair[1] - b'A') as usize;
                pairs += 1;
                counts[a][b] += 1;
                counts[b][a] += 1;
            }
        }

        let mut table = [[0f64; 26]; 26];
        if pairs > 0 {
            for (row, count_row) in table.iter_mut().zip(counts.iter()) {
                for (cell, &count) in row.iter_mut().zip(count_row.iter()) {
                    *cell = count as f64 / pairs as f64;
                }
            }
        }
        Self { table }
    }

    pub fn weight(&self, a: u8, b: u8) -> f64 {
        if !a.is_ascii_uppercase() || !b.is_ascii_uppercase() {
            return 0.0;
        }
        self.table[(a - b'A') as usize][(b - b'A') as usize]
    }
}

/// Re-roll one random cell, weighting the candidate faces by their bigram
/// affinity with the cell's neighbors. Falls back to a uniform pick when no
/// candidate has affinity.
pub fn mutate_board<R: Rng>(
    board: &mut Board,
    adjacency: &[Vec<usize>],
    freqs: &BigramFrequencies,
    rng: &mut R,
) {
    if board.is_empty() {
        return;
    }
    let p = rng.gen_range(0..board.len());
    let candidates: Vec<u8> = match board.faces_at(p) {
        Some(faces) => faces.bytes().collect(),
        None => (b'A'..=b'Z').collect(),
    };

    let weights: Vec<f64> = candidates
        .iter()
        .map(|&letter| {
            adjacency[p]
                .iter()
                .map(|&q| freqs.weight(letter, board.letter(q)))
                .sum()
        })
        .collect();

    let choice = weighted_index(&weights, rng).unwrap_or_else(|| rng.gen_range(0..candidates.len()));
    board.set_letter(p, candidates[choice]);
}

struct Candidate {
    epoch: u64,
    at: Duration,
    score: u32,
    cells: Vec<String>,
}

/// Run the hill climb, invoking `on_improvement` for every strict improvement
/// of the global best score, in nondecreasing score order.
///
/// Workers anneal independently: each mutates its board, keeps improvements,
/// and reverts a worsening step with probability `1 - score/last_score`.
/// Every `restart_interval` all workers re-roll fresh boards.
pub fn run_search<F>(
    solver: &Solver,
    freqs: &BigramFrequencies,
    params: &SearchParams,
    mut on_improvement: F,
) -> Result<SearchSummary, BoggleError>
where
    F: FnMut(&Improvement) -> Result<(), BoggleError>,
{
    if params.workers == 0 {
        return Err(BoggleError::InvalidParameter(
            "worker count must be positive".to_string(),
        ));
    }
    if params.dice.dims() != (solver.rows(), solver.cols()) {
        return Err(BoggleError::InvalidParameter(format!(
            "dice set rolls {}x{} boards but solver expects {}x{}",
            params.dice.dims().0,
            params.dice.dims().1,
            solver.rows(),
            solver.cols()
        )));
    }

    let master_seed = params.seed.unwrap_or_else(rand::random);
    let start = Instant::now();
    let deadline = params.duration.map(|d| start + d);

    // Multi-start: score a batch of random boards in parallel and hand the
    // best ones to the workers.
    let mut seeds = (0..params.workers * MULTISTART_FACTOR)
        .into_par_iter()
        .map(|i| {
            let mut rng = ChaCha8Rng::seed_from_u64(worker_seed(master_seed, i as u64 + 1));
            let board = Board::roll(params.dice, &mut rng);
            let score = solver.score(&board)?;
            Ok((board, score))
        })
        .collect::<Result<Vec<_>, BoggleError>>()?;
    seeds.sort_by(|a, b| b.1.cmp(&a.1));
    seeds.truncate(params.workers);

    let best = AtomicU32::new(0);
    let epoch = AtomicU64::new(0);
    let stop = AtomicBool::new(false);
    let (tx, rx) = mpsc::channel::<Candidate>();

    thread::scope(|scope| {
        for (worker_id, (seed_board, seed_score)) in seeds.into_iter().enumerate() {
            let tx = tx.clone();
            let best = &best;
            let epoch = &epoch;
            let stop = &stop;
            let dice = params.dice;
            scope.spawn(move || {
                // offset past the multi-start streams
                let mut rng = ChaCha8Rng::seed_from_u64(worker_seed(
                    master_seed,
                    (1 << 32) | worker_id as u64,
                ));
                let mut board = seed_board;
                let mut score = seed_score;
                let mut seen_epoch = epoch.load(Ordering::SeqCst);

                if score > best.fetch_max(score, Ordering::SeqCst) {
                    let _ = tx.send(Candidate {
                        epoch: seen_epoch,
                        at: start.elapsed(),
                        score,
                        cells: board.cells(),
                    });
                }

                loop {
                    if stop.load(Ordering::SeqCst) {
                        break;
                    }
                    let current_epoch = epoch.load(Ordering::SeqCst);
                    if current_epoch != seen_epoch {
                        seen_epoch = current_epoch;
                        board = Board::roll(dice, &mut rng);
                        score = 0;
                    }

                    let last = board.clone();
                    let last_score = score;
                    mutate_board(&mut board, solver.adjacency(), freqs, &mut rng);
                    score = match solver.score(&board) {
                        Ok(score) => score,
                        Err(_) => break,
                    };

                    if score > best.fetch_max(score, Ordering::SeqCst) {
                        let _ = tx.send(Candidate {
                            epoch: seen_epoch,
                            at: start.elapsed(),
                            score,
                            cells: board.cells(),
                        });
                    }

                    if score <= last_score {
                        let keep = if last_score == 0 {
                            1.0
                        } else {
                            score as f64 / last_score as f64
                        };
                        if rng.gen::<f64>() > keep {
                            board = last;
                            score = last_score;
                        }
                    }
                }
            });
        }
        drop(tx);

        let mut top = 0u32;
        let mut best_cells = Vec::new();
        let mut improvements = 0u64;
        let mut last_restart = start;
        let mut sink_err = None;

        loop {
            if let Some(deadline) = deadline {
                if Instant::now() >= deadline {
                    break;
                }
            }
            if last_restart.elapsed() >= params.restart_interval {
                epoch.fetch_add(1, Ordering::SeqCst);
                last_restart = Instant::now();
            }

            match rx.recv_timeout(POLL_INTERVAL) {
                Ok(candidate) => {
                    if candidate.score > top {
                        top = candidate.score;
                        best_cells = candidate.cells.clone();
                        improvements += 1;
                        let improvement = Improvement {
                            epoch: candidate.epoch,
                            elapsed_ms: candidate.at.as_millis() as u64,
                            score: candidate.score,
                            cells: candidate.cells,
                        };
                        if let Err(err) = on_improvement(&improvement) {
                            sink_err = Some(err);
                            break;
                        }
                    }
                }
                Err(mpsc::RecvTimeoutError::Timeout) => {}
                Err(mpsc::RecvTimeoutError::Disconnected) => break,
            }
        }

        stop.store(true, Ordering::SeqCst);

        // Drain improvements that were in flight when the deadline hit;
        // recv() ends once every worker has observed the stop flag and hung
        // up its sender.
        while let Ok(candidate) = rx.recv() {
            if candidate.score > top {
                top = candidate.score;
                best_cells = candidate.cells.clone();
                improvements += 1;
                if sink_err.is_none() {
                    let improvement = Improvement {
                        epoch: candidate.epoch,
                        elapsed_ms: candidate.at.as_millis() as u64,
                        score: candidate.score,
                        cells: candidate.cells,
                    };
                    if let Err(err) = on_improvement(&improvement) {
                        sink_err = Some(err);
                    }
                }
            }
        }

        match sink_err {
            Some(err) => Err(err),
            None => Ok(SearchSummary {
                best_score: top,
                best_cells,
                improvements,
                elapsed: start.elapsed(),
            }),
        }
    })
}

fn worker_seed(master: u64, stream: u64) -> u64 {
    master ^ stream.wrapping_mul(0x9e37_79b9_7f4a_7c15)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word_list() -> Vec<String> {
        [
            "tee", "eat", "tat", "tot", "tie", "see", "set", "sit", "sat", "tea", "ate", "eta",
            "oat", "toe", "net", "ten", "not", "ton", "son", "sun", "run", "rat", "tar", "art",
            "ear", "era", "are", "ore", "roe", "oar", "air", "rim", "hen", "the", "hat", "hit",
            "hot", "her", "his", "she", "sea", "eel", "lee", "let", "tel", "red", "den", "end",
        ]
        .iter()
        .map(|w| w.to_string())
        .collect()
    }

    #[test]
    fn test_bigram_frequencies_symmetric_and_normalized() {
        let words = vec!["ABC".to_string()];
        let freqs = BigramFrequencies::from_words(&words, 16);
        assert_eq!(freqs.weight(b'A', b'B'), 0.5);
        assert_eq!(freqs.weight(b'B', b'A'), 0.5);
        assert_eq!(freqs.weight(b'B', b'C'), 0.5);
        assert_eq!(freqs.weight(b'A', b'C'), 0.0);

        let total: f64 = (b'A'..=b'Z')
            .flat_map(|a| (b'A'..=b'Z').map(move |b| (a, b)))
            .map(|(a, b)| freqs.weight(a, b))
            .sum();
        assert!((total - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_bigram_frequencies_filter_by_length() {
        let words = vec!["ab".to_string(), "abcdefghijklmnopq".to_string()];
        let freqs = BigramFrequencies::from_words(&words, 16);
        assert_eq!(freqs.weight(b'A', b'B'), 0.0);
    }

    #[test]
    fn test_mutation_changes_at_most_one_cell_to_a_legal_face() {
        let words = word_list();
        let solver = Solver::new(4, 4, &words).unwrap();
        let freqs = BigramFrequencies::from_words(&words, 16);
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let mut board = Board::roll(DiceSet::Classic1992, &mut rng);
        let before = board.clone();

        mutate_board(&mut board, solver.adjacency(), &freqs, &mut rng);

        let changed: Vec<usize> = (0..board.len())
            .filter(|&i| board.letter(i) != before.letter(i))
            .collect();
        assert!(changed.len() <= 1);
        for &i in &changed {
            let faces = board.faces_at(i).unwrap();
            assert!(faces.as_bytes().contains(&board.letter(i)));
        }
    }

    #[test]
    fn test_search_reports_monotonic_improvements() {
        let words = word_list();
        let solver = Solver::new(4, 4, &words).unwrap();
        let freqs = BigramFrequencies::from_words(&words, 16);
        let params = SearchParams {
            dice: DiceSet::Classic1992,
            workers: 1,
            duration: Some(Duration::from_millis(500)),
            restart_interval: Duration::from_secs(300),
            seed: Some(7),
        };

        let mut seen: Vec<(u64, u32)> = Vec::new();
        let summary = run_search(&solver, &freqs, &params, |imp| {
            seen.push((imp.elapsed_ms, imp.score));
            assert_eq!(imp.cells.len(), 16);
            Ok(())
        })
        .unwrap();

        assert!(summary.best_score > 0);
        assert_eq!(summary.improvements as usize, seen.len());
        assert_eq!(seen.last().map(|&(_, s)| s), Some(summary.best_score));
        for pair in seen.windows(2) {
            assert!(pair[1].1 > pair[0].1);
            assert!(pair[1].0 >= pair[0].0);
        }
    }

    #[test]
    fn test_search_rejects_mismatched_dice() {
        let words = word_list();
        let solver = Solver::new(4, 4, &words).unwrap();
        let freqs = BigramFrequencies::from_words(&words, 16);
        let params = SearchParams {
            dice: DiceSet::Master,
            workers: 1,
            duration: Some(Duration::from_millis(10)),
            restart_interval: Duration::from_secs(300),
            seed: Some(1),
        };
        assert!(run_search(&solver, &freqs, &params, |_| Ok(())).is_err());
    }

    #[test]
    fn test_sink_errors_abort_the_search() {
        let words = word_list();
        let solver = Solver::new(4, 4, &words).unwrap();
        let freqs = BigramFrequencies::from_words(&words, 16);
        let params = SearchParams {
            dice: DiceSet::Classic1992,
            workers: 2,
            duration: Some(Duration::from_secs(30)),
            restart_interval: Duration::from_secs(300),
            seed: Some(3),
        };
        let result = run_search(&solver, &freqs, &params, |_| {
            Err(BoggleError::LogWrite("sink closed".to_string()))
        });
        assert!(matches!(result, Err(BoggleError::LogWrite(_))));
    }
}
