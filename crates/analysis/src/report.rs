//! Nested result tree: section labels down to statistics or test results.

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::correlation::CorrelationResult;
use crate::describe::StatisticsResult;
use crate::error::AnalysisError;

#[derive(Debug, Clone, PartialEq)]
pub enum ReportNode {
    Section(Section),
    Statistics(StatisticsResult),
    Correlation(CorrelationResult),
}

impl Serialize for ReportNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ReportNode::Section(s) => s.serialize(serializer),
            ReportNode::Statistics(s) => s.serialize(serializer),
            ReportNode::Correlation(c) => c.serialize(serializer),
        }
    }
}

/// Labelled entries, kept in insertion order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Section {
    entries: Vec<(String, ReportNode)>,
}

impl Section {
    pub fn get(&self, label: &str) -> Option<&ReportNode> {
        self.entries.iter().find(|(l, _)| l == label).map(|(_, n)| n)
    }

    fn get_mut(&mut self, label: &str) -> Option<&mut ReportNode> {
        self.entries.iter_mut().find(|(l, _)| l == label).map(|(_, n)| n)
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(l, _)| l.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for Section {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (label, node) in &self.entries {
            map.serialize_entry(label, node)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Report {
    root: Section,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn root(&self) -> &Section {
        &self.root
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// Place `node` at `path`, creating intermediate sections.
    ///
    /// Fails if the path is empty, crosses an existing result, or ends on an
    /// occupied label.
    pub fn insert<S: AsRef<str>>(&mut self, path: &[S], node: ReportNode) -> Result<(), AnalysisError> {
        let Some((leaf, parents)) = path.split_last() else {
            return Err(AnalysisError::EmptyPath);
        };
        let conflict = || AnalysisError::PathConflict {
            path: path.iter().map(|p| p.as_ref()).collect::<Vec<_>>().join("/"),
        };

        let mut section = &mut self.root;
        for label in parents {
            let label = label.as_ref();
            if section.get(label).is_none() {
                section.entries.push((label.to_string(), ReportNode::Section(Section::default())));
            }
            section = match section.get_mut(label) {
                Some(ReportNode::Section(s)) => s,
                _ => return Err(conflict()),
            };
        }

        if section.get(leaf.as_ref()).is_some() {
            return Err(conflict());
        }
        section.entries.push((leaf.as_ref().to_string(), node));
        Ok(())
    }

    /// Node at `path`, if any.
    pub fn get<S: AsRef<str>>(&self, path: &[S]) -> Option<&ReportNode> {
        let (first, rest) = path.split_first()?;
        let mut node = self.root.get(first.as_ref())?;
        for label in rest {
            match node {
                ReportNode::Section(s) => node = s.get(label.as_ref())?,
                _ => return None,
            }
        }
        Some(node)
    }
}

impl Serialize for Report {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.root.serialize(serializer)
    }
}
