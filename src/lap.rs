use strum_macros::Display;

/// Column key for one editable cell of a lap row. Display names match the
/// table headers used in exports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum LapField {
    #[strum(serialize = "Lap_speed")]
    Lap,
    #[strum(serialize = "Sector1")]
    S1,
    #[strum(serialize = "Sector2")]
    S2,
    #[strum(serialize = "Sector3")]
    S3,
}

impl LapField {
    /// Table column order: full lap first, then the three sectors.
    pub const ALL: [LapField; 4] = [LapField::Lap, LapField::S1, LapField::S2, LapField::S3];
}

/// One lap attempt: up to three sector times plus the full lap time, with a
/// lock bit per field. A locked value survives until the session is reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LapRow {
    pub lap_ms: Option<u64>,
    pub s1_ms: Option<u64>,
    pub s2_ms: Option<u64>,
    pub s3_ms: Option<u64>,
    pub lap_locked: bool,
    pub s1_locked: bool,
    pub s2_locked: bool,
    pub s3_locked: bool,
}

impl LapRow {
    /// True when no field holds a value yet. Lock bits are irrelevant here.
    pub fn is_empty(&self) -> bool {
        self.lap_ms.is_none() && self.s1_ms.is_none() && self.s2_ms.is_none() && self.s3_ms.is_none()
    }

    /// A row counts as a finished lap once its lap time is present.
    pub fn is_finished(&self) -> bool {
        self.lap_ms.is_some()
    }

    pub fn value(&self, field: LapField) -> Option<u64> {
        match field {
            LapField::Lap => self.lap_ms,
            LapField::S1 => self.s1_ms,
            LapField::S2 => self.s2_ms,
            LapField::S3 => self.s3_ms,
        }
    }

    pub fn is_locked(&self, field: LapField) -> bool {
        match field {
            LapField::Lap => self.lap_locked,
            LapField::S1 => self.s1_locked,
            LapField::S2 => self.s2_locked,
            LapField::S3 => self.s3_locked,
        }
    }

    /// Writes a value and latches its lock bit. Lock checks happen at the
    /// commit boundary; sector-sum derivation writes through the lap lock.
    pub fn lock_in(&mut self, field: LapField, ms: u64) {
        match field {
            LapField::Lap => {
                self.lap_ms = Some(ms);
                self.lap_locked = true;
            }
            LapField::S1 => {
                self.s1_ms = Some(ms);
                self.s1_locked = true;
            }
            LapField::S2 => {
                self.s2_ms = Some(ms);
                self.s2_locked = true;
            }
            LapField::S3 => {
                self.s3_ms = Some(ms);
                self.s3_locked = true;
            }
        }
    }

    /// Sum of the three sectors, available only once all of them are.
    pub fn sector_sum(&self) -> Option<u64> {
        Some(self.s1_ms? + self.s2_ms? + self.s3_ms?)
    }
}
