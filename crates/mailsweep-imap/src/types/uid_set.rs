//! UID sets for UID FETCH/STORE/COPY/MOVE/EXPUNGE.

use std::fmt;

use super::Uid;

/// A non-empty set of UIDs, stored as sorted, non-overlapping ranges.
///
/// Serializes to the `1:3,7,9:12` form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UidSet {
    ranges: Vec<(Uid, Uid)>,
}

impl UidSet {
    /// A set containing one UID.
    #[must_use]
    pub fn single(uid: Uid) -> Self {
        Self {
            ranges: vec![(uid, uid)],
        }
    }

    /// Builds a compact set from arbitrary UIDs. Returns `None` when empty.
    pub fn from_uids(uids: impl IntoIterator<Item = Uid>) -> Option<Self> {
        let mut sorted: Vec<Uid> = uids.into_iter().collect();
        sorted.sort_unstable();
        sorted.dedup();

        let mut ranges: Vec<(Uid, Uid)> = Vec::new();
        for uid in sorted {
            match ranges.last_mut() {
                Some((_, end)) if end.get().checked_add(1) == Some(uid.get()) => *end = uid,
                _ => ranges.push((uid, uid)),
            }
        }

        if ranges.is_empty() {
            None
        } else {
            Some(Self { ranges })
        }
    }

    /// Returns true if `uid` is a member.
    #[must_use]
    pub fn contains(&self, uid: Uid) -> bool {
        self.ranges
            .iter()
            .any(|(start, end)| *start <= uid && uid <= *end)
    }

    /// Number of UIDs in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ranges
            .iter()
            .map(|(start, end)| (end.get() - start.get()) as usize + 1)
            .sum()
    }

    /// Always false; an empty set cannot be constructed.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}

impl From<Uid> for UidSet {
    fn from(uid: Uid) -> Self {
        Self::single(uid)
    }
}

impl fmt::Display for UidSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (start, end)) in self.ranges.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            if start == end {
                write!(f, "{start}")?;
            } else {
                write!(f, "{start}:{end}")?;
            }
        }
        Ok(())
    }
}
