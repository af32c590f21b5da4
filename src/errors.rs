// Error types for lapdash

use snafu::Snafu;
use std::io;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum LapdashError {
    // Data directory and database errors
    #[snafu(display("Could not find an application data directory"))]
    NoDataDir,
    #[snafu(display("Error preparing data directory {path}"))]
    DataDirIo { path: String, source: io::Error },
    #[snafu(display("Error opening records database"))]
    DbOpen { source: rusqlite::Error },
    #[snafu(display("Records database query failed"))]
    DbQuery { source: rusqlite::Error },
    #[snafu(display("Record rejected: {field} must not be empty"))]
    InvalidRecordField { field: &'static str },

    // Session errors
    #[snafu(display("No circuit selected"))]
    NoCircuitSelected,
    #[snafu(display("No competition group selected"))]
    NoGroupSelected,
    #[snafu(display("No valid Fastest_Lap found. Please enter lap_speed."))]
    NoFastestLap,

    // Export errors
    #[snafu(display("Error writing pace report"))]
    ExportIo { source: io::Error },
}

pub type Result<T, E = LapdashError> = std::result::Result<T, E>;
