//! Transformation engine
//!
//! Explicit table transformations used both by the search driver and as a
//! standalone API: identifier erasure, applying a per-QI level vector, and
//! reading the level vector a table currently sits at. Interval generation
//! for numeric ladders lives here too.

use crate::error::AnonymityError;
use crate::hierarchy::{HierarchyStore, LiftError};
use crate::table::{Table, Value};

/// Replace every cell of every identifier column with `"*"`. The input table
/// is left untouched.
pub fn suppress_identifiers(table: &Table, ident: &[&str]) -> Result<Table, AnonymityError> {
    let mut out = table.clone();
    for column in ident {
        if !out.has_column(column) {
            return Err(AnonymityError::UnknownColumn(column.to_string()));
        }
        out.set_column(column, vec![Value::star(); out.n_rows()])?;
    }
    Ok(out)
}

/// The level each QI currently sits at, in the order the QIs are declared.
/// A QI absent from the store, or whose values match no level, reads as 0.
pub fn get_transformation(
    table: &Table,
    quasi_ident: &[&str],
    hierarchies: &HierarchyStore,
) -> Result<Vec<usize>, AnonymityError> {
    let mut levels = Vec::with_capacity(quasi_ident.len());
    for qi in quasi_ident {
        let column = table.column(qi)?;
        let level = hierarchies
            .get(qi)
            .and_then(|h| h.infer_level(column))
            .unwrap_or(0);
        levels.push(level);
    }
    Ok(levels)
}

/// Generalize (or refine) every QI to the requested level. `transformation`
/// is aligned with `quasi_ident`; levels beyond a ladder's top fail with
/// `InvalidLevel`.
pub fn apply_transformation(
    table: &Table,
    quasi_ident: &[&str],
    hierarchies: &HierarchyStore,
    transformation: &[usize],
) -> Result<Table, AnonymityError> {
    if transformation.len() != quasi_ident.len() {
        return Err(AnonymityError::InvalidParameter(format!(
            "transformation has {} levels for {} quasi-identifiers",
            transformation.len(),
            quasi_ident.len()
        )));
    }
    let mut out = table.clone();
    for (qi, &target) in quasi_ident.iter().zip(transformation) {
        let column = out.column(qi)?;
        let Some(hierarchy) = hierarchies.get(qi) else {
            if target != 0 {
                return Err(AnonymityError::InvalidLevel {
                    qi: qi.to_string(),
                    level: target,
                    top: 0,
                });
            }
            continue;
        };
        let current = hierarchy.infer_level(column).unwrap_or(0);
        if current == target {
            continue;
        }
        match hierarchy.lift(column, current, target) {
            Ok(lifted) => out.set_column(qi, lifted)?,
            Err(LiftError::InvalidLevel { level, top }) => {
                return Err(AnonymityError::InvalidLevel {
                    qi: qi.to_string(),
                    level,
                    top,
                });
            }
            Err(LiftError::UnknownValue { value, level }) => {
                return Err(AnonymityError::UnknownValue {
                    qi: qi.to_string(),
                    value,
                    level,
                });
            }
        }
    }
    Ok(out)
}

/// Interval labels for a numeric column: `"[a, b)"` with bounds stepping from
/// `inf` to `sup`. A value equal to a boundary lands in the lower interval
/// and values above `sup` land in the top one; non-numeric cells pass through
/// unchanged.
pub fn generate_intervals(values: &[Value], inf: i64, sup: i64, step: i64) -> Vec<Value> {
    let bounds: Vec<i64> = (inf..=sup).step_by(step.max(1) as usize).collect();
    if bounds.len() < 2 {
        return values.to_vec();
    }
    values
        .iter()
        .map(|v| match v.as_f64() {
            None => v.clone(),
            Some(x) => {
                let upper = bounds
                    .partition_point(|b| (*b as f64) < x)
                    .clamp(1, bounds.len() - 1);
                Value::Str(format!("[{}, {})", bounds[upper - 1], bounds[upper]))
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::Hierarchy;

    fn values(raw: &[&str]) -> Vec<Value> {
        raw.iter().map(|v| Value::parse(v)).collect()
    }

    fn fixture() -> (Table, HierarchyStore) {
        let table = Table::from_rows(
            vec!["name".to_string(), "age".to_string(), "city".to_string()],
            vec![
                values(&["ada", "23", "Kerala"]),
                values(&["grace", "27", "Madrid"]),
                values(&["alan", "31", "Kerala"]),
            ],
        )
        .unwrap();
        let ages = values(&["23", "27", "31"]);
        let mut store = HierarchyStore::new();
        store.insert(
            "age",
            Hierarchy::new(vec![
                ages.clone(),
                generate_intervals(&ages, 0, 100, 10),
                values(&["*", "*", "*"]),
            ])
            .unwrap(),
        );
        store.insert(
            "city",
            Hierarchy::new(vec![
                values(&["Kerala", "Madrid", "Kerala"]),
                values(&["*", "*", "*"]),
            ])
            .unwrap(),
        );
        (table, store)
    }

    #[test]
    fn test_suppress_identifiers() {
        let (table, _) = fixture();
        let out = suppress_identifiers(&table, &["name"]).unwrap();
        assert!(out.column("name").unwrap().iter().all(|v| *v == Value::star()));
        // Input untouched.
        assert_eq!(table.column("name").unwrap()[0], Value::parse("ada"));
    }

    #[test]
    fn test_suppress_unknown_identifier() {
        let (table, _) = fixture();
        assert_eq!(
            suppress_identifiers(&table, &["ssn"]).unwrap_err(),
            AnonymityError::UnknownColumn("ssn".to_string())
        );
    }

    #[test]
    fn test_get_transformation_defaults_to_zero() {
        let (table, store) = fixture();
        // "name" has no ladder; raw columns read level 0.
        assert_eq!(
            get_transformation(&table, &["age", "city", "name"], &store).unwrap(),
            vec![0, 0, 0]
        );
    }

    #[test]
    fn test_apply_then_read_back() {
        let (table, store) = fixture();
        let out = apply_transformation(&table, &["age", "city"], &store, &[1, 1]).unwrap();
        assert_eq!(
            out.column("age").unwrap(),
            &values(&["[20, 30)", "[20, 30)", "[30, 40)"])[..]
        );
        assert!(out.column("city").unwrap().iter().all(|v| *v == Value::star()));
        assert_eq!(
            get_transformation(&out, &["age", "city"], &store).unwrap(),
            vec![1, 1]
        );
    }

    #[test]
    fn test_apply_transformation_rejects_level_past_top() {
        let (table, store) = fixture();
        let err = apply_transformation(&table, &["age"], &store, &[3]).unwrap_err();
        assert_eq!(
            err,
            AnonymityError::InvalidLevel {
                qi: "age".to_string(),
                level: 3,
                top: 2
            }
        );
    }

    #[test]
    fn test_apply_transformation_can_lower_a_level() {
        let (table, store) = fixture();
        let generalized = apply_transformation(&table, &["age"], &store, &[1]).unwrap();
        let back = apply_transformation(&generalized, &["age"], &store, &[0]).unwrap();
        // Positional inverse: 23 and 27 share "[20, 30)", so both map back to
        // the first value carrying that label.
        assert_eq!(
            back.column("age").unwrap(),
            &values(&["23", "23", "31"])[..]
        );
    }

    #[test]
    fn test_generate_intervals_boundaries() {
        let labels = generate_intervals(&values(&["21", "25", "30", "12"]), 0, 100, 5);
        assert_eq!(
            labels,
            values(&["[20, 25)", "[20, 25)", "[25, 30)", "[10, 15)"])
        );
    }

    #[test]
    fn test_generate_intervals_clamps_out_of_range() {
        let labels = generate_intervals(&values(&["0", "150"]), 0, 100, 50);
        assert_eq!(labels, values(&["[0, 50)", "[50, 100)"]));
    }

    #[test]
    fn test_generate_intervals_passes_strings_through() {
        let labels = generate_intervals(&values(&["n/a", "40"]), 0, 100, 20);
        assert_eq!(labels, values(&["n/a", "[20, 40)"]));
    }
}
