//! Command tag generation.

/// Produces unique, increasing tags (`A0001`, `A0002`, ...) for one connection.
#[derive(Debug, Clone)]
pub struct TagGenerator {
    prefix: char,
    counter: u32,
}

impl TagGenerator {
    /// Creates a generator with the given prefix.
    #[must_use]
    pub const fn new(prefix: char) -> Self {
        Self { prefix, counter: 0 }
    }

    /// Returns the next tag.
    ///
    /// The counter wraps after `u32::MAX` tags; tags only need to be unique
    /// among commands in flight, and this client has one at a time.
    pub fn next_tag(&mut self) -> String {
        self.counter = self.counter.wrapping_add(1);
        format!("{}{:04}", self.prefix, self.counter)
    }

    /// Number of tags handed out so far.
    #[must_use]
    pub const fn issued(&self) -> u32 {
        self.counter
    }
}

impl Default for TagGenerator {
    fn default() -> Self {
        Self::new('A')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_are_sequential() {
        let mut tags = TagGenerator::default();
        assert_eq!(tags.next_tag(), "A0001");
        assert_eq!(tags.next_tag(), "A0002");
        assert_eq!(tags.issued(), 2);
    }

    #[test]
    fn custom_prefix() {
        let mut tags = TagGenerator::new('S');
        assert_eq!(tags.next_tag(), "S0001");
    }

    #[test]
    fn wide_counters_are_not_truncated() {
        let mut tags = TagGenerator::default();
        for _ in 0..12_344 {
            let _ = tags.next_tag();
        }
        assert_eq!(tags.next_tag(), "A12345");
    }
}
