//! Command argument types.

use chrono::NaiveDate;

use crate::types::{Flag, UidSet};

/// FETCH data items to request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchAttribute {
    /// UID.
    Uid,
    /// Message flags.
    Flags,
    /// `BODY.PEEK[HEADER.FIELDS (...)]`: selected header lines without
    /// setting `\Seen`.
    HeaderFields(Vec<String>),
}

impl FetchAttribute {
    /// Header-field fetch for the given names.
    #[must_use]
    pub fn header_fields<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::HeaderFields(names.into_iter().map(Into::into).collect())
    }
}

/// STORE action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreAction {
    /// `+FLAGS`
    AddFlags(Vec<Flag>),
    /// `-FLAGS`
    RemoveFlags(Vec<Flag>),
}

/// A search key tree for (UID) SEARCH.
///
/// `And` is the implicit conjunction of IMAP search keys; `Or` is the
/// binary prefix operator. Serialization adds parentheses wherever a
/// conjunction appears as an operand, so trees can be nested freely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchCriteria {
    /// All messages.
    All,
    /// Messages with `\Flagged`.
    Flagged,
    /// Messages with `\Deleted`.
    Deleted,
    /// Subject contains text (case-insensitive on the server).
    Subject(String),
    /// From header contains text.
    From(String),
    /// Header field contains value; an empty value matches any message
    /// that has the field at all.
    Header(String, String),
    /// Internal date earlier than the given day.
    Before(NaiveDate),
    /// Internal date on or after the given day.
    Since(NaiveDate),
    /// Messages in the UID set.
    Uid(UidSet),
    /// Every criterion must match.
    And(Vec<Self>),
    /// Either criterion matches.
    Or(Box<Self>, Box<Self>),
    /// Criterion does not match.
    Not(Box<Self>),
}

impl SearchCriteria {
    /// `NOT <criteria>`
    #[must_use]
    pub fn not(criteria: Self) -> Self {
        Self::Not(Box::new(criteria))
    }

    /// `OR <a> <b>`
    #[must_use]
    pub fn or(a: Self, b: Self) -> Self {
        Self::Or(Box::new(a), Box::new(b))
    }

    /// Folds alternatives into nested binary ORs.
    ///
    /// `[a, b, c]` becomes `OR a (OR b c)`. Returns `None` for no
    /// alternatives and the criterion itself for exactly one.
    pub fn any_of(alternatives: impl IntoIterator<Item = Self>) -> Option<Self> {
        let mut items: Vec<Self> = alternatives.into_iter().collect();
        let mut folded = items.pop()?;
        while let Some(prev) = items.pop() {
            folded = Self::or(prev, folded);
        }
        Some(folded)
    }

    /// Appends `other` to a conjunction, flattening nested `And`s.
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        let mut keys = match self {
            Self::And(keys) => keys,
            single => vec![single],
        };
        match other {
            Self::And(more) => keys.extend(more),
            single => keys.push(single),
        }
        Self::And(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn any_of_empty_is_none() {
        assert_eq!(SearchCriteria::any_of(Vec::new()), None);
    }

    #[test]
    fn any_of_single_is_identity() {
        let only = SearchCriteria::Subject("sale".into());
        assert_eq!(SearchCriteria::any_of([only.clone()]), Some(only));
    }

    #[test]
    fn any_of_nests_to_the_right() {
        let folded = SearchCriteria::any_of([
            SearchCriteria::Subject("a".into()),
            SearchCriteria::Subject("b".into()),
            SearchCriteria::Subject("c".into()),
        ]);
        assert_eq!(
            folded,
            Some(SearchCriteria::or(
                SearchCriteria::Subject("a".into()),
                SearchCriteria::or(
                    SearchCriteria::Subject("b".into()),
                    SearchCriteria::Subject("c".into()),
                ),
            ))
        );
    }

    #[test]
    fn and_flattens() {
        let combined = SearchCriteria::not(SearchCriteria::Flagged)
            .and(SearchCriteria::All)
            .and(SearchCriteria::And(vec![SearchCriteria::Deleted]));
        match combined {
            SearchCriteria::And(keys) => assert_eq!(keys.len(), 3),
            other => panic!("expected conjunction, got {other:?}"),
        }
    }
}
