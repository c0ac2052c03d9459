//! Search queries for one folder.

use chrono::{Days, NaiveDate};
use mailsweep_imap::SearchCriteria;

/// The three query groups run against each folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderQueries {
    /// Messages carrying a `List-Unsubscribe` header.
    pub unsubscribe: SearchCriteria,
    /// Subject keyword searches.
    pub subject: Vec<SearchCriteria>,
    /// One sender search per deletion domain.
    pub domain: Vec<SearchCriteria>,
}

impl FolderQueries {
    /// Builds every query, each limited to unflagged mail older than
    /// `cutoff`.
    ///
    /// Up to `max_keywords` subject keywords get one search each. Longer
    /// lists are split into groups of `max_keywords`, each group one
    /// OR-combined search.
    #[must_use]
    pub fn build(
        cutoff: NaiveDate,
        subject_keywords: &[String],
        max_keywords: usize,
        delete_domains: &[String],
    ) -> Self {
        let unsubscribe = base(cutoff).and(SearchCriteria::Header(
            "List-Unsubscribe".to_string(),
            String::new(),
        ));

        let max_keywords = max_keywords.max(1);
        let subject = if subject_keywords.len() > max_keywords {
            tracing::debug!(
                keywords = subject_keywords.len(),
                per_query = max_keywords,
                "grouping subject keywords"
            );
            subject_keywords
                .chunks(max_keywords)
                .filter_map(|group| {
                    SearchCriteria::any_of(
                        group
                            .iter()
                            .map(|keyword| SearchCriteria::Subject(keyword.clone())),
                    )
                })
                .map(|any| base(cutoff).and(any))
                .collect()
        } else {
            subject_keywords
                .iter()
                .map(|keyword| base(cutoff).and(SearchCriteria::Subject(keyword.clone())))
                .collect()
        };

        let domain = delete_domains
            .iter()
            .map(|domain| base(cutoff).and(SearchCriteria::From(domain.clone())))
            .collect();

        Self {
            unsubscribe,
            subject,
            domain,
        }
    }

    /// Total number of searches.
    #[must_use]
    pub fn len(&self) -> usize {
        1 + self.subject.len() + self.domain.len()
    }

    /// Never true; the unsubscribe search always exists.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }
}

/// `today` minus `age_days`; saturates at the earliest date.
#[must_use]
pub fn cutoff_date(today: NaiveDate, age_days: u32) -> NaiveDate {
    today
        .checked_sub_days(Days::new(u64::from(age_days)))
        .unwrap_or(NaiveDate::MIN)
}

/// `NOT FLAGGED BEFORE <cutoff>`
fn base(cutoff: NaiveDate) -> SearchCriteria {
    SearchCriteria::And(vec![
        SearchCriteria::not(SearchCriteria::Flagged),
        SearchCriteria::Before(cutoff),
    ])
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn words(items: &[&str]) -> Vec<String> {
        items.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_cutoff() {
        assert_eq!(cutoff_date(date(2024, 3, 1), 1), date(2024, 2, 29));
        assert_eq!(cutoff_date(date(2024, 3, 1), 366), date(2023, 3, 1));
    }

    #[test]
    fn test_unsubscribe_query() {
        let q = FolderQueries::build(date(2024, 1, 31), &[], 10, &[]);
        assert_eq!(
            q.unsubscribe,
            SearchCriteria::And(vec![
                SearchCriteria::not(SearchCriteria::Flagged),
                SearchCriteria::Before(date(2024, 1, 31)),
                SearchCriteria::Header("List-Unsubscribe".into(), String::new()),
            ])
        );
        assert!(q.subject.is_empty());
        assert!(q.domain.is_empty());
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn test_one_query_per_keyword_when_short() {
        let q = FolderQueries::build(date(2024, 1, 31), &words(&["sale", "promo"]), 2, &[]);
        assert_eq!(q.subject.len(), 2);
        assert_eq!(
            q.subject[1],
            SearchCriteria::And(vec![
                SearchCriteria::not(SearchCriteria::Flagged),
                SearchCriteria::Before(date(2024, 1, 31)),
                SearchCriteria::Subject("promo".into()),
            ])
        );
    }

    #[test]
    fn test_long_keyword_list_is_grouped() {
        let keywords = words(&["a", "b", "c", "d", "e"]);
        let q = FolderQueries::build(date(2024, 1, 31), &keywords, 2, &[]);
        assert_eq!(q.subject.len(), 3);

        let SearchCriteria::And(keys) = &q.subject[0] else {
            panic!("expected conjunction");
        };
        assert_eq!(
            keys[2],
            SearchCriteria::or(
                SearchCriteria::Subject("a".into()),
                SearchCriteria::Subject("b".into())
            )
        );
        let SearchCriteria::And(last) = &q.subject[2] else {
            panic!("expected conjunction");
        };
        assert_eq!(last[2], SearchCriteria::Subject("e".into()));
    }

    #[test]
    fn test_domain_queries() {
        let q = FolderQueries::build(
            date(2024, 1, 31),
            &[],
            10,
            &words(&["spam.example", "ads.example"]),
        );
        assert_eq!(q.domain.len(), 2);
        let SearchCriteria::And(keys) = &q.domain[0] else {
            panic!("expected conjunction");
        };
        assert_eq!(keys[2], SearchCriteria::From("spam.example".into()));
        assert_eq!(q.len(), 3);
    }
}
