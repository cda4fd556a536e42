//! Field-level comparison between a tracked issue and its upstream counterpart.

use std::collections::BTreeSet;
use std::fmt;

use super::tracked_issue::TrackedIssue;
use super::upstream_issue::UpstreamIssue;

/// An upstream-owned field of a tracked issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IssueField {
    Title,
    Labels,
    Milestone,
    Upvotes,
    Number,
}

impl IssueField {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueField::Title => "title",
            IssueField::Labels => "labels",
            IssueField::Milestone => "milestone",
            IssueField::Upvotes => "upvotes",
            IssueField::Number => "number",
        }
    }
}

impl fmt::Display for IssueField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The set of upstream-owned fields that differ.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssueDiff {
    changed: BTreeSet<IssueField>,
}

impl IssueDiff {
    /// True when nothing differs.
    pub fn is_empty(&self) -> bool {
        self.changed.is_empty()
    }

    pub fn contains(&self, field: IssueField) -> bool {
        self.changed.contains(&field)
    }

    /// Changed fields in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = IssueField> + '_ {
        self.changed.iter().copied()
    }

    fn record(&mut self, field: IssueField, differs: bool) {
        if differs {
            self.changed.insert(field);
        }
    }
}

impl fmt::Display for IssueDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.fields().map(|field| field.as_str()).collect();
        f.write_str(&names.join(","))
    }
}

/// Compares the upstream-owned fields of `tracked` against `upstream`.
///
/// Labels are compared as sets of names; order and duplicates are ignored.
pub fn diff_issue(tracked: &TrackedIssue, upstream: &UpstreamIssue) -> IssueDiff {
    let mut diff = IssueDiff::default();
    diff.record(IssueField::Title, tracked.title != upstream.title);
    diff.record(
        IssueField::Labels,
        !same_label_set(&tracked.labels, &upstream.labels),
    );
    diff.record(IssueField::Milestone, tracked.milestone != upstream.milestone);
    diff.record(IssueField::Upvotes, tracked.upvotes != upstream.upvotes);
    diff.record(IssueField::Number, tracked.number != upstream.number);
    diff
}

/// Order-insensitive equality of two label name lists.
pub fn same_label_set(left: &[String], right: &[String]) -> bool {
    let left: BTreeSet<&str> = left.iter().map(String::as_str).collect();
    let right: BTreeSet<&str> = right.iter().map(String::as_str).collect();
    left == right
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn tracked() -> TrackedIssue {
        TrackedIssue {
            title: "A".to_string(),
            url: "https://github.com/o/r/issues/1".to_string(),
            number: 1,
            labels: vec!["bug".to_string(), "untriaged".to_string()],
            upvotes: 2,
            ..Default::default()
        }
    }

    fn matching_upstream() -> UpstreamIssue {
        UpstreamIssue::new(1, "A", "https://github.com/o/r/issues/1")
            .with_label("untriaged")
            .with_label("bug")
            .with_upvotes(2)
    }

    #[test]
    fn identical_fields_produce_empty_diff() {
        let diff = diff_issue(&tracked(), &matching_upstream());
        assert!(diff.is_empty());
        assert_eq!(diff.to_string(), "");
    }

    #[test]
    fn detects_each_changed_field() {
        let upstream = UpstreamIssue::new(2, "B", "https://github.com/o/r/issues/1")
            .with_label("bug")
            .with_milestone("10.0")
            .with_upvotes(5);

        let diff = diff_issue(&tracked(), &upstream);

        assert!(diff.contains(IssueField::Title));
        assert!(diff.contains(IssueField::Labels));
        assert!(diff.contains(IssueField::Milestone));
        assert!(diff.contains(IssueField::Upvotes));
        assert!(diff.contains(IssueField::Number));
        assert_eq!(diff.to_string(), "title,labels,milestone,upvotes,number");
    }

    #[test]
    fn milestone_removed_upstream_is_a_change() {
        let mut issue = tracked();
        issue.milestone = Some("9.0".to_string());

        let diff = diff_issue(&issue, &matching_upstream());

        assert_eq!(diff.fields().collect::<Vec<_>>(), vec![IssueField::Milestone]);
    }

    #[test]
    fn label_set_ignores_duplicates() {
        let left = vec!["bug".to_string(), "bug".to_string()];
        let right = vec!["bug".to_string()];
        assert!(same_label_set(&left, &right));
    }

    #[test]
    fn label_set_detects_swapped_label() {
        let left = vec!["bug".to_string(), "area-docs".to_string()];
        let right = vec!["bug".to_string(), "area-app-model".to_string()];
        assert!(!same_label_set(&left, &right));
    }

    proptest! {
        #[test]
        fn label_order_never_produces_a_diff(
            labels in proptest::collection::vec("[a-z-]{1,12}", 0..8),
            seed in any::<u64>(),
        ) {
            let mut shuffled = labels.clone();
            let len = shuffled.len();
            if len > 1 {
                shuffled.rotate_left((seed as usize) % len);
            }
            shuffled.reverse();

            let issue = TrackedIssue {
                title: "t".to_string(),
                url: "u".to_string(),
                number: 9,
                labels,
                ..Default::default()
            };
            let mut upstream = UpstreamIssue::new(9, "t", "u");
            upstream.labels = shuffled;

            prop_assert!(diff_issue(&issue, &upstream).is_empty());
        }
    }
}
