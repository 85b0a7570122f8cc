//! Recipient matcher: resolves configured names against the chat directory.
//!
//! Directory entries are scanned in order. Each entry is compared
//! case-insensitively, by display name and real name, against the names still
//! pending. The first entry to match a name consumes it, so later entries
//! (duplicate accounts, colliding names) cannot match the same name again.
//! When one entry satisfies several pending names, the one configured first
//! is consumed.

use std::collections::{HashMap, VecDeque};

use nudge_common::types::{Recipient, normalize_name};

/// Result of matching configured names against a directory snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchOutcome {
    /// Recipients to remind, in directory order.
    pub matched: Vec<Recipient>,
    /// Configured names no directory entry matched, in configured order.
    pub unresolved: Vec<String>,
}

struct PendingTargets<'a> {
    names: &'a [String],
    /// Normalized name → indices of still-pending targets, lowest first.
    by_key: HashMap<String, VecDeque<usize>>,
    consumed: Vec<bool>,
}

impl<'a> PendingTargets<'a> {
    fn new(names: &'a [String]) -> Self {
        let mut by_key: HashMap<String, VecDeque<usize>> = HashMap::new();
        for (idx, name) in names.iter().enumerate() {
            by_key.entry(normalize_name(name)).or_default().push_back(idx);
        }
        Self {
            names,
            by_key,
            consumed: vec![false; names.len()],
        }
    }

    /// Consume the earliest-configured pending name this recipient satisfies.
    fn take(&mut self, recipient: &Recipient) -> Option<usize> {
        let [name_key, real_key] = recipient.match_keys();

        let candidate = |key: &str| {
            if key.is_empty() {
                return None;
            }
            self.by_key.get(key).and_then(|q| q.front().copied())
        };

        let idx = match (candidate(&name_key), candidate(&real_key)) {
            (Some(a), Some(b)) => a.min(b),
            (Some(a), None) | (None, Some(a)) => a,
            (None, None) => return None,
        };

        let key = normalize_name(&self.names[idx]);
        if let Some(queue) = self.by_key.get_mut(&key) {
            queue.pop_front();
            if queue.is_empty() {
                self.by_key.remove(&key);
            }
        }
        self.consumed[idx] = true;
        Some(idx)
    }

    fn unresolved(&self) -> Vec<String> {
        self.names
            .iter()
            .zip(&self.consumed)
            .filter(|(_, consumed)| !**consumed)
            .map(|(name, _)| name.clone())
            .collect()
    }
}

/// Match configured names against an ordered directory snapshot.
pub fn match_recipients(targets: &[String], directory: &[Recipient]) -> MatchOutcome {
    let mut pending = PendingTargets::new(targets);
    let mut matched = Vec::new();

    for recipient in directory {
        if pending.by_key.is_empty() {
            break;
        }
        if let Some(idx) = pending.take(recipient) {
            tracing::debug!(
                target_name = %targets[idx],
                recipient_id = %recipient.id,
                recipient = %recipient.name,
                "Matched configured name"
            );
            matched.push(recipient.clone());
        }
    }

    MatchOutcome {
        matched,
        unresolved: pending.unresolved(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn ids(outcome: &MatchOutcome) -> Vec<&str> {
        outcome.matched.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn test_matches_display_or_real_name_case_insensitively() {
        let directory = vec![
            Recipient::new("U1", "bob", "Bob Smith"),
            Recipient::new("U2", "asmith", "Alice Smith"),
            Recipient::new("U3", "carol", "Carol King"),
        ];
        let outcome = match_recipients(&names(&["BOB", "alice smith"]), &directory);
        assert_eq!(ids(&outcome), vec!["U1", "U2"]);
        assert!(outcome.unresolved.is_empty());
    }

    #[test]
    fn test_first_directory_entry_wins_and_consumes_name() {
        let directory = vec![
            Recipient::new("U1", "bob", "Bob Smith"),
            Recipient::new("U9", "Bob", "Robert"),
        ];
        let outcome = match_recipients(&names(&["bob"]), &directory);
        assert_eq!(ids(&outcome), vec!["U1"]);
        assert!(outcome.unresolved.is_empty());
    }

    #[test]
    fn test_colliding_real_name_only_first_scheduled() {
        let directory = vec![
            Recipient::new("U5", "jdoe", "Jane Doe"),
            Recipient::new("U6", "jane.doe", "Jane Doe"),
        ];
        let outcome = match_recipients(&names(&["jane doe"]), &directory);
        assert_eq!(ids(&outcome), vec!["U5"]);
    }

    #[test]
    fn test_unmatched_names_are_unresolved() {
        let directory = vec![Recipient::new("U1", "bob", "Bob Smith")];
        let outcome = match_recipients(&names(&["zed", "bob", "yolanda"]), &directory);
        assert_eq!(ids(&outcome), vec!["U1"]);
        assert_eq!(outcome.unresolved, names(&["zed", "yolanda"]));
    }

    #[test]
    fn test_one_entry_satisfying_two_names_consumes_earliest() {
        let directory = vec![Recipient::new("U1", "bob", "Bob Smith")];
        let outcome = match_recipients(&names(&["Bob Smith", "bob"]), &directory);
        assert_eq!(ids(&outcome), vec!["U1"]);
        assert_eq!(outcome.unresolved, names(&["bob"]));
    }

    #[test]
    fn test_duplicate_configured_name_is_two_targets() {
        let directory = vec![
            Recipient::new("U1", "sam", "Sam One"),
            Recipient::new("U2", "sam", "Sam Two"),
        ];
        let outcome = match_recipients(&names(&["sam", "sam"]), &directory);
        assert_eq!(ids(&outcome), vec!["U1", "U2"]);
        assert!(outcome.unresolved.is_empty());
    }

    #[test]
    fn test_empty_real_name_never_matches() {
        let directory = vec![Recipient::new("U1", "bot", "")];
        let outcome = match_recipients(&names(&["carol"]), &directory);
        assert!(outcome.matched.is_empty());
        assert_eq!(outcome.unresolved, names(&["carol"]));
    }
}
