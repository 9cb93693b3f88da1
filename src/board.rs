//! Kanban view derived from the cached bug list.

use serde::Serialize;

use crate::models::{Bug, Status};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    pub status: Status,
    pub label: &'static str,
    pub bugs: Vec<Bug>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Board {
    pub columns: Vec<Column>,
}

impl Board {
    /// One column per status in workflow order. Bugs keep their cache order.
    /// `filter` matches title or description, case-insensitively.
    pub fn build(bugs: &[Bug], filter: Option<&str>) -> Self {
        let needle = filter
            .map(|f| f.trim().to_lowercase())
            .filter(|f| !f.is_empty());

        let columns = Status::ALL
            .iter()
            .map(|&status| Column {
                status,
                label: status.label(),
                bugs: bugs
                    .iter()
                    .filter(|b| b.status == status)
                    .filter(|b| needle.as_deref().is_none_or(|n| matches_filter(b, n)))
                    .cloned()
                    .collect(),
            })
            .collect();

        Self { columns }
    }

    pub fn column(&self, status: Status) -> Option<&Column> {
        self.columns.iter().find(|c| c.status == status)
    }

    pub fn total(&self) -> usize {
        self.columns.iter().map(|c| c.bugs.len()).sum()
    }
}

fn matches_filter(bug: &Bug, needle: &str) -> bool {
    bug.title.to_lowercase().contains(needle)
        || bug
            .description
            .as_deref()
            .is_some_and(|d| d.to_lowercase().contains(needle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::bug;

    #[test]
    fn test_empty_board_has_five_columns() {
        let board = Board::build(&[], None);
        assert_eq!(board.columns.len(), 5);
        assert_eq!(board.columns[0].status, Status::Triage);
        assert_eq!(board.columns[4].label, "Deployed");
        assert_eq!(board.total(), 0);
    }

    #[test]
    fn test_bugs_grouped_by_status_preserving_order() {
        let bugs = vec![
            bug("b1", "p1", Status::QaTesting),
            bug("b2", "p1", Status::Triage),
            bug("b3", "p1", Status::QaTesting),
        ];
        let board = Board::build(&bugs, None);
        let qa: Vec<_> = board
            .column(Status::QaTesting)
            .unwrap()
            .bugs
            .iter()
            .map(|b| b.id.as_str())
            .collect();
        assert_eq!(qa, vec!["b1", "b3"]);
        assert_eq!(board.column(Status::Triage).unwrap().bugs.len(), 1);
        assert_eq!(board.total(), 3);
    }

    #[test]
    fn test_filter_matches_title_and_description() {
        let mut a = bug("b1", "p1", Status::Triage);
        a.title = "Checkout CRASH".into();
        let mut b = bug("b2", "p1", Status::Triage);
        b.description = Some("crash when saving".into());
        let c = bug("b3", "p1", Status::Triage);

        let board = Board::build(&[a, b, c], Some("crash"));
        assert_eq!(board.total(), 2);
    }

    #[test]
    fn test_blank_filter_is_ignored() {
        let bugs = vec![bug("b1", "p1", Status::Deployed)];
        assert_eq!(Board::build(&bugs, Some("   ")).total(), 1);
    }
}
