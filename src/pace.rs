use crate::lap::{LapField, LapRow};
use crate::laptime;

/// Default minimum number of rows kept visible in the pace table.
pub const MIN_LAP_ROWS: usize = 7;

/// Where the cursor should land after a commit or Tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FocusTarget {
    pub row: usize,
    pub field: LapField,
}

/// The session's lap rows plus the pending focus hint.
///
/// All row mutation funnels through `commit`/`tab_advance`/`reset`; the view
/// reads `rows()` and takes the focus hint after each event. The table keeps
/// itself padded so exactly one open row follows the last finished lap and
/// the row count never drops below the configured minimum.
#[derive(Debug, Clone)]
pub struct PaceTable {
    rows: Vec<LapRow>,
    target_rows: usize,
    next_focus: Option<FocusTarget>,
}

impl PaceTable {
    pub fn new(target_rows: usize) -> Self {
        let mut table = Self {
            rows: vec![LapRow::default()],
            target_rows: target_rows.max(1),
            next_focus: None,
        };
        table.ensure_trailing_blank();
        table
    }

    pub fn rows(&self) -> &[LapRow] {
        &self.rows
    }

    pub fn target_rows(&self) -> usize {
        self.target_rows
    }

    pub fn finished_count(&self) -> usize {
        self.rows.iter().filter(|r| r.is_finished()).count()
    }

    /// First row still missing a lap time; entry beyond it stays disabled.
    pub fn editable_row(&self) -> usize {
        self.rows
            .iter()
            .position(|r| !r.is_finished())
            .unwrap_or(self.rows.len() - 1)
    }

    /// Commits raw cell text into a field. Returns false — leaving rows and
    /// the focus hint untouched — when the text does not normalize to a
    /// valid time, the row index is out of range, or the field is locked.
    ///
    /// A lap typed while all three sectors are present is ignored in favor
    /// of the sector sum, and a sector commit that completes the set derives
    /// the lap time through the lap lock.
    pub fn commit(&mut self, row: usize, field: LapField, raw: &str) -> bool {
        let Some(padded) = laptime::normalize_digits(raw) else {
            return false;
        };
        let text = laptime::digits_to_time_text(&padded);
        let Some(ms) = laptime::parse_ms(&text) else {
            return false;
        };
        if row >= self.rows.len() || self.rows[row].is_locked(field) {
            return false;
        }

        let entry = &mut self.rows[row];
        if field == LapField::Lap {
            match entry.sector_sum() {
                Some(sum) => entry.lock_in(LapField::Lap, sum),
                None => entry.lock_in(LapField::Lap, ms),
            }
        } else {
            entry.lock_in(field, ms);
            if let Some(sum) = entry.sector_sum() {
                entry.lock_in(LapField::Lap, sum);
            }
        }

        let derived = field != LapField::Lap && self.rows[row].sector_sum().is_some();
        self.ensure_trailing_blank();

        self.next_focus = Some(match (field, derived) {
            (LapField::Lap, _) | (_, true) => FocusTarget {
                row: row + 1,
                field: LapField::S1,
            },
            (LapField::S1, false) => FocusTarget {
                row,
                field: LapField::S2,
            },
            (LapField::S2, false) => FocusTarget {
                row,
                field: LapField::S3,
            },
            (LapField::S3, false) => FocusTarget {
                row,
                field: LapField::Lap,
            },
        });
        true
    }

    /// Tab moves to the same field one row down, but only off a finished row.
    pub fn tab_advance(&mut self, row: usize, field: LapField) -> bool {
        if self.rows.get(row).is_some_and(|r| r.is_finished()) {
            self.next_focus = Some(FocusTarget {
                row: row + 1,
                field,
            });
            true
        } else {
            false
        }
    }

    /// Drops every row and starts over with blanks; used on circuit/group
    /// switches and after a successful finish.
    pub fn reset(&mut self) {
        self.rows = vec![LapRow::default()];
        self.next_focus = None;
        self.ensure_trailing_blank();
    }

    /// Consumes the pending focus hint, if any.
    pub fn take_focus(&mut self) -> Option<FocusTarget> {
        self.next_focus.take()
    }

    // Row-count invariant: collapse surplus trailing blanks down to
    // max(target, finished + 1), pad back up to that floor, and keep one
    // open row after a finished tail.
    fn ensure_trailing_blank(&mut self) {
        if self.rows.is_empty() {
            self.rows.push(LapRow::default());
        }
        let min_rows = self.target_rows.max(self.finished_count() + 1);

        while self.rows.len() >= 2
            && self.rows.len() > min_rows
            && self.rows[self.rows.len() - 1].is_empty()
            && self.rows[self.rows.len() - 2].is_empty()
        {
            self.rows.pop();
        }

        while self.rows.len() < min_rows {
            self.rows.push(LapRow::default());
        }

        if self.rows[self.rows.len() - 1].is_finished() {
            self.rows.push(LapRow::default());
        }
    }
}

impl Default for PaceTable {
    fn default() -> Self {
        Self::new(MIN_LAP_ROWS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn committed(table: &mut PaceTable, row: usize, field: LapField, raw: &str) {
        assert!(table.commit(row, field, raw), "commit {raw} at {row}");
    }

    #[test]
    fn new_table_is_padded_to_target() {
        let table = PaceTable::new(7);
        assert_eq!(table.rows().len(), 7);
        assert!(table.rows().iter().all(|r| r.is_empty()));
    }

    #[test]
    fn invalid_text_is_rejected_without_mutation() {
        let mut table = PaceTable::new(7);
        assert!(!table.commit(0, LapField::S1, "961"));
        assert!(!table.commit(0, LapField::S1, "12345678"));
        assert!(!table.commit(0, LapField::S1, ""));
        assert!(!table.commit(0, LapField::S1, "abc"));
        assert!(table.rows()[0].is_empty());
        assert_eq!(table.take_focus(), None);
    }

    #[test]
    fn out_of_range_row_is_rejected() {
        let mut table = PaceTable::new(3);
        assert!(!table.commit(99, LapField::Lap, "0130000"));
        assert_eq!(table.take_focus(), None);
    }

    #[test]
    fn sector_commit_locks_and_advances_focus() {
        let mut table = PaceTable::new(7);
        committed(&mut table, 0, LapField::S1, "0030000");
        assert_eq!(table.rows()[0].s1_ms, Some(30_000));
        assert!(table.rows()[0].s1_locked);
        assert_eq!(
            table.take_focus(),
            Some(FocusTarget {
                row: 0,
                field: LapField::S2
            })
        );

        committed(&mut table, 0, LapField::S2, "0030000");
        assert_eq!(
            table.take_focus(),
            Some(FocusTarget {
                row: 0,
                field: LapField::S3
            })
        );
    }

    #[test]
    fn completing_sectors_derives_locked_lap() {
        let mut table = PaceTable::new(7);
        committed(&mut table, 0, LapField::S1, "0030000");
        committed(&mut table, 0, LapField::S2, "0030000");
        committed(&mut table, 0, LapField::S3, "0030001");

        let row = table.rows()[0];
        assert_eq!(row.lap_ms, Some(90_001));
        assert!(row.lap_locked);
        assert_eq!(
            table.take_focus(),
            Some(FocusTarget {
                row: 1,
                field: LapField::S1
            })
        );
    }

    #[test]
    fn derivation_overrides_direct_lap_in_any_order() {
        let mut table = PaceTable::new(7);
        committed(&mut table, 0, LapField::Lap, "0129000");
        assert_eq!(table.rows()[0].lap_ms, Some(89_000));

        committed(&mut table, 0, LapField::S3, "0030001");
        committed(&mut table, 0, LapField::S1, "0030000");
        committed(&mut table, 0, LapField::S2, "0030000");

        let row = table.rows()[0];
        assert_eq!(row.lap_ms, Some(90_001));
        assert!(row.lap_locked);
    }

    #[test]
    fn sector_commit_completing_the_lap_jumps_to_next_row() {
        let mut table = PaceTable::new(7);
        committed(&mut table, 0, LapField::S3, "0030001");
        committed(&mut table, 0, LapField::S2, "0030000");
        table.take_focus();
        committed(&mut table, 0, LapField::S1, "0030000");
        assert_eq!(
            table.take_focus(),
            Some(FocusTarget {
                row: 1,
                field: LapField::S1
            })
        );
    }

    #[test]
    fn third_sector_without_full_set_returns_to_lap() {
        let mut table = PaceTable::new(7);
        committed(&mut table, 0, LapField::S3, "0030000");
        assert_eq!(
            table.take_focus(),
            Some(FocusTarget {
                row: 0,
                field: LapField::Lap
            })
        );
    }

    #[test]
    fn typed_lap_is_ignored_when_sectors_are_complete() {
        let mut table = PaceTable::new(7);
        table.rows[0].lock_in(LapField::S1, 30_000);
        table.rows[0].lock_in(LapField::S2, 30_000);
        table.rows[0].lock_in(LapField::S3, 30_000);

        committed(&mut table, 0, LapField::Lap, "0145000");
        assert_eq!(table.rows()[0].lap_ms, Some(90_000));
        assert!(table.rows()[0].lap_locked);
    }

    #[test]
    fn locked_field_recommit_is_a_noop() {
        let mut table = PaceTable::new(7);
        committed(&mut table, 0, LapField::S1, "0030000");
        table.take_focus();

        assert!(!table.commit(0, LapField::S1, "0031000"));
        assert_eq!(table.rows()[0].s1_ms, Some(30_000));
        assert_eq!(table.take_focus(), None);
    }

    #[test]
    fn direct_lap_commit_opens_next_row() {
        let mut table = PaceTable::new(2);
        committed(&mut table, 0, LapField::Lap, "0130000");
        assert!(table.rows()[0].is_finished());
        assert_eq!(
            table.take_focus(),
            Some(FocusTarget {
                row: 1,
                field: LapField::S1
            })
        );
        assert!(!table.rows().last().unwrap().is_finished());
    }

    #[test]
    fn table_grows_one_open_row_past_the_finished_tail() {
        let mut table = PaceTable::new(7);
        for row in 0..9 {
            committed(&mut table, row, LapField::Lap, "0130000");
            let len = table.rows().len();
            assert_eq!(len, 7.max(row + 2));
            assert!(table.rows()[len - 1].is_empty());
        }
        assert_eq!(table.finished_count(), 9);
        assert_eq!(table.rows().len(), 10);
    }

    #[test]
    fn row_count_never_drops_below_floor() {
        let mut table = PaceTable::new(7);
        committed(&mut table, 3, LapField::S1, "0030000");
        assert_eq!(table.rows().len(), 7);
        assert!(table.rows()[6].is_empty());
    }

    #[test]
    fn surplus_trailing_blanks_collapse_to_floor() {
        let mut table = PaceTable::new(3);
        table.rows = vec![LapRow::default(); 9];
        table.rows[0].lock_in(LapField::Lap, 90_000);
        table.ensure_trailing_blank();
        // finished + 1 = 2, target 3: everything past row 2 was blank fill
        assert_eq!(table.rows().len(), 3);
        assert!(table.rows()[2].is_empty());
    }

    #[test]
    fn collapse_never_removes_the_open_row() {
        let mut table = PaceTable::new(1);
        table.rows = vec![LapRow::default(); 5];
        table.ensure_trailing_blank();
        assert_eq!(table.rows().len(), 1);
    }

    #[test]
    fn tab_advances_only_from_finished_rows() {
        let mut table = PaceTable::new(7);
        assert!(!table.tab_advance(0, LapField::S1));
        assert_eq!(table.take_focus(), None);

        committed(&mut table, 0, LapField::Lap, "0130000");
        table.take_focus();
        assert!(table.tab_advance(0, LapField::Lap));
        assert_eq!(
            table.take_focus(),
            Some(FocusTarget {
                row: 1,
                field: LapField::Lap
            })
        );
    }

    #[test]
    fn reset_returns_to_blank_floor() {
        let mut table = PaceTable::new(7);
        committed(&mut table, 0, LapField::Lap, "0130000");
        committed(&mut table, 1, LapField::Lap, "0131000");
        table.reset();
        assert_eq!(table.rows().len(), 7);
        assert!(table.rows().iter().all(|r| r.is_empty()));
        assert_eq!(table.take_focus(), None);
    }

    #[test]
    fn editable_row_tracks_first_unfinished() {
        let mut table = PaceTable::new(7);
        assert_eq!(table.editable_row(), 0);
        committed(&mut table, 0, LapField::Lap, "0130000");
        assert_eq!(table.editable_row(), 1);
        committed(&mut table, 1, LapField::S1, "0030000");
        assert_eq!(table.editable_row(), 1);
    }
}
