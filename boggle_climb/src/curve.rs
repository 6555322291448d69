//! Score-log parsing and the derived score-over-time curve.
//!
//! The log is the CSV the search appends to: `epoch,elapsed_ms,score,cells…`
//! with no header. Only columns 1 and 2 matter here; column 0 and the board
//! cells are ignored.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::ReaderBuilder;
use ndarray::Array1;

use crate::BoggleError;

/// Best score reached by Sedgewick & Wayne students, the benchmark the chart
/// compares against.
pub const REFERENCE_SCORE: f64 = 4540.0;

/// Far-future time (seconds) the trend line extrapolates to.
pub const TREND_HORIZON_S: f64 = 1e17;

/// One score-log row: elapsed milliseconds and the best score at that time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Observation {
    pub time_ms: f64,
    pub score: f64,
}

/// Parse a score log. Rows need at least three columns; trailing board cells
/// are tolerated and ignored.
pub fn read_score_log<R: Read>(reader: R) -> Result<Vec<Observation>, BoggleError> {
    let mut csv_reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut out = Vec::new();
    for (idx, record) in csv_reader.records().enumerate() {
        let record = record.map_err(|e| BoggleError::LogParse(e.to_string()))?;
        let line = record.position().map_or(idx as u64 + 1, |p| p.line());
        if record.len() < 3 {
            return Err(BoggleError::LogParse(format!(
                "line {}: expected at least 3 columns, got {}",
                line,
                record.len()
            )));
        }
        let time_ms = parse_field(&record, 1, "time", line)?;
        let score = parse_field(&record, 2, "score", line)?;
        if time_ms < 0.0 || !time_ms.is_finite() {
            return Err(BoggleError::LogParse(format!(
                "line {}: time must be a non-negative number of milliseconds",
                line
            )));
        }
        if !score.is_finite() {
            return Err(BoggleError::LogParse(format!(
                "line {}: score must be finite",
                line
            )));
        }
        out.push(Observation { time_ms, score });
    }
    Ok(out)
}

pub fn read_score_log_file(path: &Path) -> Result<Vec<Observation>, BoggleError> {
    let file =
        File::open(path).map_err(|e| BoggleError::LogRead(format!("{}: {}", path.display(), e)))?;
    read_score_log(file)
}

fn parse_field(
    record: &csv::StringRecord,
    idx: usize,
    name: &str,
    line: u64,
) -> Result<f64, BoggleError> {
    let raw = record.get(idx).unwrap_or("");
    raw.trim().parse::<f64>().map_err(|_| {
        BoggleError::LogParse(format!("line {}: invalid {} value '{}'", line, name, raw))
    })
}

/// The derived series: observation times in seconds and scores in points.
/// Never empty.
#[derive(Clone, Debug)]
pub struct ScoreCurve {
    times_s: Array1<f64>,
    scores: Array1<f64>,
}

impl ScoreCurve {
    pub fn from_observations(observations: &[Observation]) -> Result<Self, BoggleError> {
        if observations.is_empty() {
            return Err(BoggleError::EmptyLog);
        }
        let times_ms = Array1::from_iter(observations.iter().map(|o| o.time_ms));
        let scores = Array1::from_iter(observations.iter().map(|o| o.score));
        Ok(Self {
            times_s: times_ms / 1000.0,
            scores,
        })
    }

    pub fn len(&self) -> usize {
        self.times_s.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times_s.is_empty()
    }

    pub fn times_s(&self) -> &Array1<f64> {
        &self.times_s
    }

    pub fn scores(&self) -> &Array1<f64> {
        &self.scores
    }

    /// `(time_s, score)` pairs in log order.
    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.times_s
            .iter()
            .copied()
            .zip(self.scores.iter().copied())
    }

    pub fn x_max(&self) -> f64 {
        self.times_s.iter().copied().fold(f64::MIN, f64::max)
    }

    pub fn y_max(&self) -> f64 {
        self.scores.iter().copied().fold(f64::MIN, f64::max)
    }

    /// Endpoints of the trend segment from the best observation out to the
    /// reference score at the far horizon.
    pub fn trend_to_reference(&self) -> [(f64, f64); 2] {
        [
            (self.x_max(), self.y_max()),
            (TREND_HORIZON_S, REFERENCE_SCORE),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_series_is_milliseconds_over_1000() {
        let observations = read_score_log("0,1000,100\n1,2000,4000\n".as_bytes()).unwrap();
        let curve = ScoreCurve::from_observations(&observations).unwrap();
        assert_eq!(curve.times_s().to_vec(), vec![1.0, 2.0]);
        assert_eq!(curve.scores().to_vec(), vec![100.0, 4000.0]);
        assert_eq!(curve.x_max(), 2.0);
        assert_eq!(curve.y_max(), 4000.0);
        assert_eq!(curve.len(), observations.len());
    }

    #[test]
    fn test_trend_is_horizontal_at_the_reference() {
        let observations = read_score_log("3,500000000,4540\n".as_bytes()).unwrap();
        let curve = ScoreCurve::from_observations(&observations).unwrap();
        assert_eq!(curve.times_s().to_vec(), vec![500000.0]);
        let [from, to] = curve.trend_to_reference();
        assert_eq!(from, (500000.0, 4540.0));
        assert_eq!(to, (TREND_HORIZON_S, REFERENCE_SCORE));
        assert_eq!(from.1, to.1);
    }

    #[test]
    fn test_extra_columns_are_ignored() {
        let rows = "7,1500,123,A,B,Qu,D\n8,2500,130,A,B,C,D,E,F\n";
        let observations = read_score_log(rows.as_bytes()).unwrap();
        assert_eq!(
            observations,
            vec![
                Observation {
                    time_ms: 1500.0,
                    score: 123.0
                },
                Observation {
                    time_ms: 2500.0,
                    score: 130.0
                },
            ]
        );
    }

    #[test]
    fn test_malformed_rows_are_fatal() {
        assert!(read_score_log("0,1000,notanumber\n".as_bytes()).is_err());
        assert!(read_score_log("0,oops,100\n".as_bytes()).is_err());
        assert!(read_score_log("0,1000\n".as_bytes()).is_err());
        assert!(read_score_log("0,-5,100\n".as_bytes()).is_err());
        assert!(read_score_log("0,inf,100\n".as_bytes()).is_err());
        assert!(read_score_log("0,1000,nan\n".as_bytes()).is_err());
    }

    #[test]
    fn test_error_messages_carry_line_numbers() {
        let err = read_score_log("0,1000,10\n1,2000,bad\n".as_bytes()).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let err = read_score_log_file(Path::new("no-such-score-log.csv"));
        assert!(err.is_err());
    }

    #[test]
    fn test_empty_log_has_no_curve() {
        let observations = read_score_log("".as_bytes()).unwrap();
        assert!(observations.is_empty());
        assert!(matches!(
            ScoreCurve::from_observations(&observations),
            Err(BoggleError::EmptyLog)
        ));
    }
}
