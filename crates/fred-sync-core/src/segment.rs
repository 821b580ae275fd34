//! Splitting a series into contiguous runs of non-null readings.
//!
//! Consumers that draw a series as a line must not bridge a gap where the
//! provider withheld a value, and must not draw the gap as zero. A
//! [`Segment`] is a maximal run of consecutive observations that all carry
//! a reading; missing readings separate segments and never appear in one.

use chrono::NaiveDate;
use serde::Serialize;

use crate::models::Observation;

/// One plotted point inside a segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    pub date: NaiveDate,
    pub value: f64,
}

/// A maximal run of consecutive non-null observations.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Segment {
    pub points: Vec<Point>,
}

impl Segment {
    pub fn start(&self) -> Option<NaiveDate> {
        self.points.first().map(|p| p.date)
    }

    pub fn end(&self) -> Option<NaiveDate> {
        self.points.last().map(|p| p.date)
    }
}

/// Split `observations` (already ordered by date) into non-null runs.
///
/// Never emits an empty segment.
pub fn segments(observations: &[Observation]) -> Vec<Segment> {
    let mut out = Vec::new();
    let mut current: Vec<Point> = Vec::new();

    for obs in observations {
        match obs.value {
            Some(value) => current.push(Point {
                date: obs.date,
                value,
            }),
            None => {
                if !current.is_empty() {
                    out.push(Segment {
                        points: std::mem::take(&mut current),
                    });
                }
            }
        }
    }

    if !current.is_empty() {
        out.push(Segment { points: current });
    }
    out
}

/// Whether a series has enough readings (two or more) to draw a line.
pub fn plottable(observations: &[Observation]) -> bool {
    observations.iter().filter(|o| o.value.is_some()).count() >= 2
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(day: u32, value: Option<f64>) -> Observation {
        Observation {
            series_id: "UNRATE".to_string(),
            date: NaiveDate::from_ymd_opt(2020, 1, day).unwrap(),
            value,
        }
    }

    #[test]
    fn test_empty_series() {
        assert!(segments(&[]).is_empty());
        assert!(!plottable(&[]));
    }

    #[test]
    fn test_no_gaps_single_segment() {
        let rows = vec![obs(1, Some(1.0)), obs(2, Some(2.0)), obs(3, Some(3.0))];
        let segs = segments(&rows);
        assert_eq!(segs.len(), 1);
        assert_eq!(segs[0].points.len(), 3);
        assert_eq!(segs[0].start(), Some(rows[0].date));
        assert_eq!(segs[0].end(), Some(rows[2].date));
    }

    #[test]
    fn test_gap_splits_segments() {
        let rows = vec![
            obs(1, Some(1.0)),
            obs(2, None),
            obs(3, Some(3.0)),
            obs(4, Some(4.0)),
        ];
        let segs = segments(&rows);
        assert_eq!(segs.len(), 2);
        assert_eq!(segs[0].points.len(), 1);
        assert_eq!(segs[1].points[0].value, 3.0);
    }

    #[test]
    fn test_leading_trailing_and_repeated_nulls() {
        let rows = vec![
            obs(1, None),
            obs(2, Some(2.0)),
            obs(3, None),
            obs(4, None),
            obs(5, Some(5.0)),
            obs(6, None),
        ];
        let segs = segments(&rows);
        assert_eq!(segs.len(), 2);
        assert!(segs.iter().all(|s| !s.points.is_empty()));
    }

    #[test]
    fn test_zero_is_not_a_gap() {
        let rows = vec![obs(1, Some(0.0)), obs(2, Some(0.0))];
        let segs = segments(&rows);
        assert_eq!(segs.len(), 1);
        assert!(plottable(&rows));
    }

    #[test]
    fn test_all_null_not_plottable() {
        let rows = vec![obs(1, None), obs(2, None), obs(3, Some(1.0))];
        assert!(!plottable(&rows));
        assert_eq!(segments(&rows).len(), 1);
    }
}
