mod archive_reader;
mod archive_writer;
mod constants;
mod errors;
pub mod roster;

pub use crate::archive_reader::{HistoryReader, Records};
pub use crate::archive_writer::{encode_records, HistoryPacker, HistoryWriter};
pub use crate::constants::RECORD_WIDTH;
pub use crate::errors::{HistoryError, RosterError};
pub use crate::roster::Roster;
