use std::collections::HashMap;

/// Who placed the pixel currently visible at each coordinate.
///
/// Later placements replace earlier ones, just like the pixel itself.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AttributionIndex {
    owners: HashMap<(u32, u32), u32>,
}

impl AttributionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, x: u32, y: u32, player_index: u32) {
        self.owners.insert((x, y), player_index);
    }

    pub fn lookup(&self, x: u32, y: u32) -> Option<u32> {
        self.owners.get(&(x, y)).copied()
    }

    /// Number of attributed pixels.
    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    /// How many visible pixels `player_index` owns.
    pub fn pixels_owned_by(&self, player_index: u32) -> usize {
        self.owners
            .values()
            .filter(|owner| **owner == player_index)
            .count()
    }
}
