use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// One instance in the fleet under test. A fresh snapshot is fetched per run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Member {
    pub id: String,
    pub name: String,
    pub group: String,
}

impl Member {
    pub fn new(id: impl Into<String>, name: impl Into<String>, group: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            group: group.into(),
        }
    }
}

impl Ord for Member {
    fn cmp(&self, other: &Self) -> Ordering {
        self.name
            .cmp(&other.name)
            .then_with(|| self.id.cmp(&other.id))
            .then_with(|| self.group.cmp(&other.group))
    }
}

impl PartialOrd for Member {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} ({})", self.group, self.name, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orders_by_name_first() {
        let mut members = vec![
            Member::new("1", "zeta", "a"),
            Member::new("2", "alpha", "z"),
            Member::new("0", "mu", "m"),
        ];
        members.sort();
        let names: Vec<_> = members.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, ["alpha", "mu", "zeta"]);
    }

    #[test]
    fn same_name_falls_back_to_id() {
        let a = Member::new("a", "web", "g");
        let b = Member::new("b", "web", "g");
        assert!(a < b);
    }

    #[test]
    fn display_includes_group_name_and_id() {
        let m = Member::new("i-123", "web-0", "web");
        assert_eq!(m.to_string(), "web/web-0 (i-123)");
    }
}
