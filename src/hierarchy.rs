//! Generalization ladders
//!
//! A `Hierarchy` is a per-QI ladder of coarsening levels. Level 0 holds the
//! original values; every level is a sequence aligned by position, so the
//! label for a value at any level is found by locating the value in the
//! source level and reading the same position in the target level. This is
//! exactly the layout of a hierarchy CSV whose column i is level i.

use crate::table::Value;
use std::collections::{HashMap, HashSet};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum HierarchyError {
    #[error("hierarchy has no levels")]
    Empty,

    #[error("level {level} has {got} entries, expected {expected}")]
    Misaligned {
        level: usize,
        got: usize,
        expected: usize,
    },
}

#[derive(Debug, Error, PartialEq)]
pub enum LiftError {
    #[error("level {level} exceeds the ladder top {top}")]
    InvalidLevel { level: usize, top: usize },

    #[error("value '{value}' has no image at level {level}")]
    UnknownValue { value: String, level: usize },
}

/// One quasi-identifier's ladder of generalization levels.
#[derive(Debug, Clone)]
pub struct Hierarchy {
    levels: Vec<Vec<Value>>,
}

impl Hierarchy {
    pub fn new(levels: Vec<Vec<Value>>) -> Result<Self, HierarchyError> {
        let Some(first) = levels.first() else {
            return Err(HierarchyError::Empty);
        };
        let expected = first.len();
        for (i, level) in levels.iter().enumerate() {
            if level.len() != expected {
                return Err(HierarchyError::Misaligned {
                    level: i,
                    got: level.len(),
                    expected,
                });
            }
        }
        Ok(Hierarchy { levels })
    }

    /// Index of the coarsest level.
    pub fn top_level(&self) -> usize {
        self.levels.len() - 1
    }

    pub fn level(&self, i: usize) -> Option<&[Value]> {
        self.levels.get(i).map(Vec::as_slice)
    }

    /// Rewrite a column from one level to another. The mapping is positional,
    /// so `to` may be below `from` (used when applying an explicit
    /// transformation that lowers a level).
    pub fn lift(&self, column: &[Value], from: usize, to: usize) -> Result<Vec<Value>, LiftError> {
        let top = self.top_level();
        if from > top {
            return Err(LiftError::InvalidLevel { level: from, top });
        }
        if to > top {
            return Err(LiftError::InvalidLevel { level: to, top });
        }
        let src = &self.levels[from];
        let dst = &self.levels[to];
        let mut image: HashMap<&Value, &Value> = HashMap::with_capacity(src.len());
        for (s, d) in src.iter().zip(dst.iter()) {
            image.entry(s).or_insert(d);
        }
        column
            .iter()
            .map(|cell| {
                image
                    .get(cell)
                    .map(|v| (*v).clone())
                    .ok_or_else(|| LiftError::UnknownValue {
                        value: cell.to_string(),
                        level: from,
                    })
            })
            .collect()
    }

    /// The smallest level whose label set covers every observed value, or
    /// `None` when no level does (callers treat that as level 0).
    pub fn infer_level(&self, column: &[Value]) -> Option<usize> {
        let observed: HashSet<&Value> = column.iter().collect();
        for (i, level) in self.levels.iter().enumerate() {
            let labels: HashSet<&Value> = level.iter().collect();
            if observed.is_subset(&labels) {
                return Some(i);
            }
        }
        None
    }
}

/// All hierarchies of a dataset, keyed by quasi-identifier name. Read-only
/// once built; safely shareable across independent engine invocations.
#[derive(Debug, Clone, Default)]
pub struct HierarchyStore {
    ladders: HashMap<String, Hierarchy>,
}

impl HierarchyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, qi: impl Into<String>, hierarchy: Hierarchy) {
        self.ladders.insert(qi.into(), hierarchy);
    }

    pub fn get(&self, qi: &str) -> Option<&Hierarchy> {
        self.ladders.get(qi)
    }

    pub fn contains(&self, qi: &str) -> bool {
        self.ladders.contains_key(qi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn str_level(labels: &[&str]) -> Vec<Value> {
        labels.iter().map(|l| Value::parse(l)).collect()
    }

    fn city_ladder() -> Hierarchy {
        Hierarchy::new(vec![
            str_level(&["Kerala", "Madrid", "Karnataka", "Kerala"]),
            str_level(&["IN", "ES", "IN", "IN"]),
            str_level(&["*", "*", "*", "*"]),
        ])
        .unwrap()
    }

    #[test]
    fn test_misaligned_rejected() {
        let err = Hierarchy::new(vec![str_level(&["a", "b"]), str_level(&["x"])]).unwrap_err();
        assert_eq!(
            err,
            HierarchyError::Misaligned {
                level: 1,
                got: 1,
                expected: 2
            }
        );
    }

    #[test]
    fn test_lift_one_level() {
        let h = city_ladder();
        let column = str_level(&["Madrid", "Kerala", "Karnataka"]);
        let lifted = h.lift(&column, 0, 1).unwrap();
        assert_eq!(lifted, str_level(&["ES", "IN", "IN"]));
    }

    #[test]
    fn test_lift_down_is_positional() {
        // Lowering a level follows the first occurrence of the label, which
        // is the inverse used by apply_transformation.
        let h = city_ladder();
        let column = str_level(&["ES", "ES"]);
        let lowered = h.lift(&column, 1, 0).unwrap();
        assert_eq!(lowered, str_level(&["Madrid", "Madrid"]));
    }

    #[test]
    fn test_lift_past_top_is_invalid_level() {
        let h = city_ladder();
        let column = str_level(&["Kerala"]);
        assert_eq!(
            h.lift(&column, 0, 3).unwrap_err(),
            LiftError::InvalidLevel { level: 3, top: 2 }
        );
    }

    #[test]
    fn test_lift_unknown_value() {
        let h = city_ladder();
        let column = str_level(&["Atlantis"]);
        assert_eq!(
            h.lift(&column, 0, 1).unwrap_err(),
            LiftError::UnknownValue {
                value: "Atlantis".to_string(),
                level: 0
            }
        );
    }

    #[test]
    fn test_infer_level_smallest_superset() {
        let h = city_ladder();
        assert_eq!(h.infer_level(&str_level(&["Kerala", "Madrid"])), Some(0));
        assert_eq!(h.infer_level(&str_level(&["IN", "ES"])), Some(1));
        // "*" appears only at the top.
        assert_eq!(h.infer_level(&str_level(&["*"])), Some(2));
        assert_eq!(h.infer_level(&str_level(&["Pluto"])), None);
    }

    #[test]
    fn test_infer_level_prefers_lowest_on_overlap() {
        // A label present at several levels must resolve to the lowest one.
        let h = Hierarchy::new(vec![
            str_level(&["a", "b"]),
            str_level(&["a", "a"]),
        ])
        .unwrap();
        assert_eq!(h.infer_level(&str_level(&["a"])), Some(0));
    }
}
