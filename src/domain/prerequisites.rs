//! Prerequisite graph rules.
//!
//! Edges point from a course to the courses it requires. The graph must stay
//! acyclic.

use std::collections::{HashMap, HashSet};

use uuid::Uuid;

use super::DomainError;

#[derive(Debug, Default, Clone)]
pub struct PrerequisiteGraph {
    edges: HashMap<Uuid, Vec<Uuid>>,
}

impl PrerequisiteGraph {
    pub fn from_edges(edges: impl IntoIterator<Item = (Uuid, Uuid)>) -> Self {
        let mut graph = Self::default();
        for (course, prerequisite) in edges {
            graph.edges.entry(course).or_default().push(prerequisite);
        }
        graph
    }

    /// True when `to` can be reached from `from` by following prerequisite edges.
    pub fn reaches(&self, from: Uuid, to: Uuid) -> bool {
        let mut stack = vec![from];
        let mut seen = HashSet::new();
        while let Some(node) = stack.pop() {
            if node == to {
                return true;
            }
            if !seen.insert(node) {
                continue;
            }
            if let Some(next) = self.edges.get(&node) {
                stack.extend(next.iter().copied());
            }
        }
        false
    }

    /// Check a single new edge `course -> prerequisite`.
    pub fn check_new_edge(&self, course: Uuid, prerequisite: Uuid) -> Result<(), DomainError> {
        if course == prerequisite {
            return Err(DomainError::Validation(
                "A course cannot be a prerequisite for itself".to_string(),
            ));
        }
        if self.reaches(prerequisite, course) {
            return Err(DomainError::Validation(
                "Adding this prerequisite would create a circular dependency".to_string(),
            ));
        }
        Ok(())
    }

    /// Check replacing every outgoing edge of `course` with `prerequisites`.
    ///
    /// Returns the offending prerequisite id on failure so callers can name it.
    pub fn check_replacement(&self, course: Uuid, prerequisites: &[Uuid]) -> Result<(), Uuid> {
        let mut without = self.clone();
        without.edges.remove(&course);
        for &prerequisite in prerequisites {
            if prerequisite == course || without.reaches(prerequisite, course) {
                return Err(prerequisite);
            }
        }
        Ok(())
    }
}
