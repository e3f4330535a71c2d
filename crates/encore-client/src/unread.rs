/// Highest count the badge distinguishes.
pub const UNREAD_CEILING: u8 = 9;

/// Unread-message counter shown on the closed chat widget. Saturates at
/// `UNREAD_CEILING`; never persisted.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct UnreadCounter {
    count: u8,
    overflowed: bool,
}

impl UnreadCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&mut self) {
        if self.count == UNREAD_CEILING {
            self.overflowed = true;
        } else {
            self.count += 1;
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn count(&self) -> u8 {
        self.count
    }

    /// Badge text, `None` when there is nothing unread. Past the ceiling
    /// the badge reads `9+`.
    pub fn badge(&self) -> Option<String> {
        match (self.count, self.overflowed) {
            (0, _) => None,
            (n, true) => Some(format!("{}+", n)),
            (n, false) => Some(n.to_string()),
        }
    }
}
