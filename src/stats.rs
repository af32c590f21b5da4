use crate::lap::LapRow;
use crate::util;

/// The fastest finished lap, carrying its row index and a copy of the row so
/// the summary can show the sector times that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FastestLap {
    pub index: usize,
    pub row: LapRow,
}

/// Theoretical best built from each sector's session-wide minimum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SumOfBest {
    pub lap_ms: u64,
    pub s1_ms: u64,
    pub s2_ms: u64,
    pub s3_ms: u64,
}

/// Per-column minima, used to highlight the best cell in each column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ColumnMinima {
    pub lap_ms: Option<u64>,
    pub s1_ms: Option<u64>,
    pub s2_ms: Option<u64>,
    pub s3_ms: Option<u64>,
}

/// Per-column rounded averages for the summary block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ColumnAverages {
    pub lap_ms: Option<u64>,
    pub s1_ms: Option<u64>,
    pub s2_ms: Option<u64>,
    pub s3_ms: Option<u64>,
}

/// Fastest lap by time, earliest row winning ties.
pub fn fastest_lap(rows: &[LapRow]) -> Option<FastestLap> {
    rows.iter()
        .enumerate()
        .filter_map(|(index, row)| row.lap_ms.map(|ms| (index, row, ms)))
        .min_by_key(|&(_, _, ms)| ms)
        .map(|(index, row, _)| FastestLap { index, row: *row })
}

/// Defined only once every sector column has at least one time.
pub fn sum_of_best(rows: &[LapRow]) -> Option<SumOfBest> {
    let s1_ms = column_min(rows, |r| r.s1_ms)?;
    let s2_ms = column_min(rows, |r| r.s2_ms)?;
    let s3_ms = column_min(rows, |r| r.s3_ms)?;

    Some(SumOfBest {
        lap_ms: s1_ms + s2_ms + s3_ms,
        s1_ms,
        s2_ms,
        s3_ms,
    })
}

pub fn average_lap(rows: &[LapRow]) -> Option<u64> {
    column_mean(rows, |r| r.lap_ms)
}

pub fn column_minima(rows: &[LapRow]) -> ColumnMinima {
    ColumnMinima {
        lap_ms: column_min(rows, |r| r.lap_ms),
        s1_ms: column_min(rows, |r| r.s1_ms),
        s2_ms: column_min(rows, |r| r.s2_ms),
        s3_ms: column_min(rows, |r| r.s3_ms),
    }
}

pub fn column_averages(rows: &[LapRow]) -> ColumnAverages {
    ColumnAverages {
        lap_ms: column_mean(rows, |r| r.lap_ms),
        s1_ms: column_mean(rows, |r| r.s1_ms),
        s2_ms: column_mean(rows, |r| r.s2_ms),
        s3_ms: column_mean(rows, |r| r.s3_ms),
    }
}

/// Signed distance from the fastest lap; None when either side is missing.
pub fn gap(row: &LapRow, fastest: Option<&FastestLap>) -> Option<i64> {
    let fastest_ms = fastest?.row.lap_ms?;
    let row_ms = row.lap_ms?;

    Some(row_ms as i64 - fastest_ms as i64)
}

fn column_min(rows: &[LapRow], value: fn(&LapRow) -> Option<u64>) -> Option<u64> {
    rows.iter().filter_map(value).min()
}

fn column_mean(rows: &[LapRow], value: fn(&LapRow) -> Option<u64>) -> Option<u64> {
    let samples = rows.iter().filter_map(value).collect::<Vec<_>>();

    util::mean_ms(&samples)
}

/// Everything the table view and exporter need, recomputed from the rows
/// after every committed change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub fastest: Option<FastestLap>,
    pub sum_of_best: Option<SumOfBest>,
    pub minima: ColumnMinima,
    pub averages: ColumnAverages,
}

impl StatsSnapshot {
    pub fn compute(rows: &[LapRow]) -> Self {
        Self {
            fastest: fastest_lap(rows),
            sum_of_best: sum_of_best(rows),
            minima: column_minima(rows),
            averages: column_averages(rows),
        }
    }

    pub fn gap_for(&self, row: &LapRow) -> Option<i64> {
        gap(row, self.fastest.as_ref())
    }
}
