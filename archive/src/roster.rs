use std::{
    collections::HashMap,
    fs,
    io::{Read, Write},
    path::Path,
};

use log::{debug, warn};

use crate::errors::RosterError;

/// The players a history refers to.
///
/// A player index in a record is the line number of that player's address in
/// the addresses file. Display handles come from a separate `handle,address`
/// CSV and are optional.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    addresses: Vec<String>,
    handles: HashMap<String, String>,
}

impl Roster {
    pub fn new(addresses: Vec<String>) -> Self {
        Self {
            addresses,
            handles: HashMap::new(),
        }
    }

    /// Parses a newline-delimited address list.
    pub fn from_addresses(text: &str) -> Self {
        let text = text.trim();
        if text.is_empty() {
            return Self::default();
        }

        Self::new(text.lines().map(|line| line.trim().to_string()).collect())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, RosterError> {
        let roster = Self::from_addresses(&fs::read_to_string(path)?);
        debug!("loaded {} player addresses", roster.len());

        Ok(roster)
    }

    /// Reads `handle,address` rows, returning how many were accepted.
    pub fn read_handles<R: Read>(&mut self, reader: R) -> Result<usize, RosterError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut accepted = 0;
        for result in reader.records() {
            let record = result?;
            match (record.get(0), record.get(1)) {
                (Some(handle), Some(address)) if !handle.is_empty() && !address.is_empty() => {
                    self.handles.insert(address.to_string(), handle.to_string());
                    accepted += 1;
                }
                _ => warn!("skipping malformed handle row {:?}", record),
            }
        }

        Ok(accepted)
    }

    pub fn load_handles(&mut self, path: impl AsRef<Path>) -> Result<usize, RosterError> {
        let file = fs::File::open(path)?;
        let accepted = self.read_handles(file)?;
        debug!("loaded {} verified handles", accepted);

        Ok(accepted)
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }

    pub fn index_of(&self, address: &str) -> Option<u32> {
        self.addresses
            .iter()
            .position(|known| known == address)
            .map(|index| index as u32)
    }

    pub fn address(&self, index: u32) -> Option<&str> {
        self.addresses.get(index as usize).map(String::as_str)
    }

    pub fn handle(&self, index: u32) -> Option<&str> {
        let address = self.address(index)?;
        self.handles.get(address).map(String::as_str)
    }

    /// `@handle as <address>`, or `anon as <address>` for unverified players.
    pub fn display_name(&self, index: u32) -> Option<String> {
        let address = self.address(index)?;
        Some(match self.handles.get(address) {
            Some(handle) => format!("@{} as {}", handle, address),
            None => format!("anon as {}", address),
        })
    }

    pub fn write_addresses<W: Write>(&self, mut dest: W) -> std::io::Result<()> {
        for address in &self.addresses {
            writeln!(dest, "{}", address)?;
        }
        dest.flush()
    }
}
