//! Per-message decisions.
//!
//! Classification is pure: it sees the sender and subject of one message,
//! the rule lists and the three match sets from the search phase, and
//! nothing else.

use std::collections::{BTreeSet, HashSet};
use std::fmt;

use mailsweep_imap::Uid;
use mailsweep_mime::Address;

use crate::config::Config;

/// Rule lists a run classifies against.
#[derive(Debug, Clone, Default)]
pub struct Rules {
    whitelist: HashSet<String>,
    protect_keywords: Vec<String>,
    subject_keywords: Vec<String>,
    delete_domains: Vec<String>,
}

impl Rules {
    /// Builds rules; whitelist entries, protect keywords and domains are
    /// compared lowercased.
    #[must_use]
    pub fn new(
        whitelist: HashSet<String>,
        protect_keywords: Vec<String>,
        subject_keywords: Vec<String>,
        delete_domains: Vec<String>,
    ) -> Self {
        Self {
            whitelist: whitelist.into_iter().map(|e| e.to_lowercase()).collect(),
            protect_keywords: protect_keywords.iter().map(|k| k.to_lowercase()).collect(),
            subject_keywords,
            delete_domains: delete_domains.iter().map(|d| d.to_lowercase()).collect(),
        }
    }

    /// Rules from the configuration plus a loaded whitelist.
    #[must_use]
    pub fn from_config(config: &Config, whitelist: HashSet<String>) -> Self {
        Self::new(
            whitelist,
            config.protect_keywords.clone(),
            config.subject_keywords.clone(),
            config.delete_domains.clone(),
        )
    }

    /// Sender address or its domain is whitelisted.
    #[must_use]
    pub fn is_whitelisted(&self, from: &str) -> bool {
        self.is_whitelisted_address(&Address::parse(from))
    }

    /// Subject contains a protect keyword, ignoring case.
    #[must_use]
    pub fn is_protected(&self, subject: &str) -> bool {
        let subject = subject.to_lowercase();
        self.protect_keywords
            .iter()
            .any(|keyword| subject.contains(keyword.as_str()))
    }

    /// Whether a message is protected and why, for display.
    #[must_use]
    pub fn protection_status(&self, from: &str, subject: &str) -> (bool, &'static str) {
        if self.is_whitelisted(from) {
            (true, "whitelisted sender")
        } else if self.is_protected(subject) {
            (true, "protected keywords in subject")
        } else {
            (false, "not protected")
        }
    }

    fn is_whitelisted_address(&self, address: &Address) -> bool {
        (!address.address.is_empty() && self.whitelist.contains(&address.address))
            || (!address.domain.is_empty() && self.whitelist.contains(&address.domain))
    }

    fn matched_keyword(&self, subject_lower: &str) -> Option<&str> {
        self.subject_keywords
            .iter()
            .find(|keyword| subject_lower.contains(&keyword.to_lowercase()))
            .map(String::as_str)
    }

    fn matched_domain(&self, address: &Address) -> Option<&str> {
        self.delete_domains
            .iter()
            .find(|domain| {
                address.domain == **domain || address.address.ends_with(&format!("@{domain}"))
            })
            .map(String::as_str)
    }
}

/// UIDs found by each of the three searches of one folder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchSets {
    /// Messages with a `List-Unsubscribe` header.
    pub unsubscribe: BTreeSet<Uid>,
    /// Messages whose subject hit a trigger keyword.
    pub subject: BTreeSet<Uid>,
    /// Messages from a deletion domain.
    pub domain: BTreeSet<Uid>,
}

impl MatchSets {
    /// Every UID in any set.
    #[must_use]
    pub fn candidates(&self) -> BTreeSet<Uid> {
        self.unsubscribe
            .iter()
            .chain(&self.subject)
            .chain(&self.domain)
            .copied()
            .collect()
    }
}

/// Why a message is moved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchReason {
    /// Found by the `List-Unsubscribe` search.
    ListUnsubscribe,
    /// Found by a subject search; the keyword when it can be named.
    SubjectKeyword(Option<String>),
    /// Found by a sender search; the domain when it can be named.
    DeleteDomain(Option<String>),
    /// In no match set. Never expected for a candidate.
    Unknown,
}

impl fmt::Display for MatchReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ListUnsubscribe => f.write_str("List-Unsubscribe header"),
            Self::SubjectKeyword(Some(keyword)) => write!(f, "subject keyword '{keyword}'"),
            Self::SubjectKeyword(None) => f.write_str("subject keyword"),
            Self::DeleteDomain(Some(domain)) => write!(f, "delete domain '{domain}'"),
            Self::DeleteDomain(None) => f.write_str("delete domain"),
            Self::Unknown => f.write_str("unknown"),
        }
    }
}

/// Why a message is left alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Sender or sender domain is whitelisted.
    Whitelist,
    /// Subject contains a protect keyword.
    ProtectedSubject,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Whitelist => "whitelist",
            Self::ProtectedSubject => "protected subject",
        })
    }
}

/// Outcome for one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Leave it.
    Skip(SkipReason),
    /// Move it.
    Process(MatchReason),
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Skip(reason) => fmt::Display::fmt(reason, f),
            Self::Process(reason) => fmt::Display::fmt(reason, f),
        }
    }
}

/// A classified message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    /// Message UID.
    pub uid: Uid,
    /// What to do with it.
    pub verdict: Verdict,
    /// Sender address, lowercased.
    pub address: String,
    /// Decoded subject; empty when absent.
    pub subject: String,
}

/// Classifies one message. The first rule that applies wins:
///
/// 1. whitelisted sender or domain: skip
/// 2. protect keyword in the subject: skip
/// 3. otherwise move, for the reason of the first set containing `uid`
///
/// Returns `None` without a sender, which excludes the message.
#[must_use]
pub fn classify(
    uid: Uid,
    from: Option<&str>,
    subject: Option<&str>,
    rules: &Rules,
    sets: &MatchSets,
) -> Option<Decision> {
    let address = Address::parse(from?);
    let subject = subject.unwrap_or_default();

    let verdict = if rules.is_whitelisted_address(&address) {
        Verdict::Skip(SkipReason::Whitelist)
    } else if rules.is_protected(subject) {
        Verdict::Skip(SkipReason::ProtectedSubject)
    } else {
        Verdict::Process(match_reason(uid, subject, &address, rules, sets))
    };

    Some(Decision {
        uid,
        verdict,
        address: address.address,
        subject: subject.to_string(),
    })
}

fn match_reason(
    uid: Uid,
    subject: &str,
    address: &Address,
    rules: &Rules,
    sets: &MatchSets,
) -> MatchReason {
    if sets.unsubscribe.contains(&uid) {
        MatchReason::ListUnsubscribe
    } else if sets.subject.contains(&uid) {
        let subject = subject.to_lowercase();
        MatchReason::SubjectKeyword(rules.matched_keyword(&subject).map(str::to_string))
    } else if sets.domain.contains(&uid) {
        MatchReason::DeleteDomain(rules.matched_domain(address).map(str::to_string))
    } else {
        tracing::error!(uid = uid.get(), "classified a message that no search matched");
        MatchReason::Unknown
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn uid(n: u32) -> Uid {
        Uid::new(n).unwrap()
    }

    fn rules() -> Rules {
        Rules::new(
            ["friend@x.example".to_string(), "Family.Example".to_string()]
                .into_iter()
                .collect(),
            vec!["Invoice".into(), "factuur".into()],
            vec!["newsletter".into(), "Sale".into()],
            vec!["spam.example".into()],
        )
    }

    fn sets(a: &[u32], b: &[u32], c: &[u32]) -> MatchSets {
        MatchSets {
            unsubscribe: a.iter().map(|&n| uid(n)).collect(),
            subject: b.iter().map(|&n| uid(n)).collect(),
            domain: c.iter().map(|&n| uid(n)).collect(),
        }
    }

    #[test]
    fn test_missing_sender_is_excluded() {
        assert!(classify(uid(1), None, Some("Sale"), &rules(), &sets(&[1], &[], &[])).is_none());
    }

    #[test]
    fn test_whitelisted_domain_is_skipped() {
        let decision = classify(
            uid(1),
            Some("Mom <mom@family.example>"),
            Some("newsletter"),
            &rules(),
            &sets(&[1], &[1], &[]),
        )
        .unwrap();
        assert_eq!(decision.verdict, Verdict::Skip(SkipReason::Whitelist));
        assert_eq!(decision.verdict.to_string(), "whitelist");
        assert_eq!(decision.address, "mom@family.example");
    }

    #[test]
    fn test_display_name_alone_is_not_whitelisted() {
        let rules = Rules::new(
            ["newsletter team".to_string(), String::new()].into_iter().collect(),
            Vec::new(),
            vec!["newsletter".into()],
            Vec::new(),
        );
        let decision = classify(
            uid(5),
            Some("Newsletter Team"),
            Some("newsletter"),
            &rules,
            &sets(&[], &[5], &[]),
        )
        .unwrap();
        assert!(matches!(decision.verdict, Verdict::Process(_)));
        assert_eq!(decision.address, "");
    }

    #[test]
    fn test_protected_subject_any_case() {
        let decision = classify(
            uid(2),
            Some("billing@shop.example"),
            Some("Your INVOICE and newsletter"),
            &rules(),
            &sets(&[], &[2], &[]),
        )
        .unwrap();
        assert_eq!(decision.verdict, Verdict::Skip(SkipReason::ProtectedSubject));
        assert_eq!(decision.verdict.to_string(), "protected subject");
    }

    #[test]
    fn test_reason_follows_set_order() {
        let rules = rules();
        let all = sets(&[3], &[3], &[3]);
        let d = classify(uid(3), Some("a@spam.example"), Some("Big sale"), &rules, &all).unwrap();
        assert_eq!(d.verdict.to_string(), "List-Unsubscribe header");

        let b = sets(&[], &[3], &[3]);
        let d = classify(uid(3), Some("a@spam.example"), Some("Big sale"), &rules, &b).unwrap();
        assert_eq!(d.verdict.to_string(), "subject keyword 'Sale'");

        let c = sets(&[], &[], &[3]);
        let d = classify(uid(3), Some("a@spam.example"), Some("Big sale"), &rules, &c).unwrap();
        assert_eq!(d.verdict.to_string(), "delete domain 'spam.example'");
    }

    #[test]
    fn test_unnamed_reasons() {
        let rules = rules();
        let d = classify(uid(4), Some("a@b.example"), Some("hi"), &rules, &sets(&[], &[4], &[]))
            .unwrap();
        assert_eq!(d.verdict, Verdict::Process(MatchReason::SubjectKeyword(None)));

        let d = classify(uid(4), Some("a@b.example"), None, &rules, &sets(&[], &[], &[4])).unwrap();
        assert_eq!(d.verdict.to_string(), "delete domain");
        assert_eq!(d.subject, "");

        let d = classify(uid(4), Some("a@b.example"), None, &rules, &MatchSets::default()).unwrap();
        assert_eq!(d.verdict, Verdict::Process(MatchReason::Unknown));
    }

    #[test]
    fn test_protection_helpers() {
        let rules = rules();
        assert!(rules.is_whitelisted("Friend <FRIEND@x.example>"));
        assert!(!rules.is_whitelisted("other@x.example"));
        assert!(rules.is_protected("Factuur maart"));
        assert_eq!(
            rules.protection_status("friend@x.example", "Invoice"),
            (true, "whitelisted sender")
        );
        assert_eq!(
            rules.protection_status("shop@x.example", "Invoice"),
            (true, "protected keywords in subject")
        );
        assert_eq!(
            rules.protection_status("shop@x.example", "Hello"),
            (false, "not protected")
        );
    }

    #[test]
    fn test_candidates_is_union() {
        let s = sets(&[1, 2], &[2, 3], &[5]);
        let got: Vec<u32> = s.candidates().into_iter().map(Uid::get).collect();
        assert_eq!(got, vec![1, 2, 3, 5]);
    }

    proptest! {
        #[test]
        fn whitelist_wins_over_every_set(
            n in 1u32..10_000,
            in_a: bool,
            in_b: bool,
            in_c: bool,
            subject in "[a-zA-Z ]{0,30}",
        ) {
            let id = uid(n);
            let mut s = MatchSets::default();
            if in_a { s.unsubscribe.insert(id); }
            if in_b { s.subject.insert(id); }
            if in_c { s.domain.insert(id); }

            let d = classify(id, Some("friend@x.example"), Some(&subject), &rules(), &s).unwrap();
            prop_assert_eq!(d.verdict, Verdict::Skip(SkipReason::Whitelist));
        }

        #[test]
        fn single_set_names_its_reason(n in 1u32..10_000, which in 0usize..3) {
            let id = uid(n);
            let mut s = MatchSets::default();
            match which {
                0 => { s.unsubscribe.insert(id); }
                1 => { s.subject.insert(id); }
                _ => { s.domain.insert(id); }
            }

            let d = classify(id, Some("x@y.example"), Some("hello"), &rules(), &s).unwrap();
            let ok = match (which, &d.verdict) {
                (0, Verdict::Process(MatchReason::ListUnsubscribe))
                | (1, Verdict::Process(MatchReason::SubjectKeyword(_)))
                | (2, Verdict::Process(MatchReason::DeleteDomain(_))) => true,
                _ => false,
            };
            prop_assert!(ok, "unexpected verdict {:?} for set {}", d.verdict, which);
        }
    }
}
