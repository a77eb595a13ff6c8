//! Equivalence-class index
//!
//! Groups the rows of a table by their quasi-identifier tuple under the
//! current generalization. Rebuilt on demand after any structural change;
//! nothing is cached across mutations.

use crate::table::{Table, TableError, Value};
use std::collections::HashMap;

/// A maximal set of row positions sharing one QI tuple.
#[derive(Debug, Clone, PartialEq)]
pub struct EquivalenceClass {
    rows: Vec<usize>,
}

impl EquivalenceClass {
    pub fn rows(&self) -> &[usize] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Partition the table's rows by QI tuple in a single pass. Classes are
/// ordered by their first row position so iteration is deterministic.
pub fn partition(table: &Table, qis: &[&str]) -> Result<Vec<EquivalenceClass>, TableError> {
    let columns: Vec<&[Value]> = qis
        .iter()
        .map(|qi| table.column(qi))
        .collect::<Result<_, _>>()?;

    let mut groups: HashMap<Vec<&Value>, Vec<usize>> = HashMap::new();
    for r in 0..table.n_rows() {
        let key: Vec<&Value> = columns.iter().map(|col| &col[r]).collect();
        groups.entry(key).or_default().push(r);
    }

    let mut classes: Vec<EquivalenceClass> = groups
        .into_values()
        .map(|rows| EquivalenceClass { rows })
        .collect();
    classes.sort_by_key(|class| class.rows[0]);
    Ok(classes)
}

/// Multiset of a column's values restricted to one class.
pub fn value_counts<'a>(
    class: &EquivalenceClass,
    column: &'a [Value],
) -> HashMap<&'a Value, usize> {
    let mut counts: HashMap<&Value, usize> = HashMap::new();
    for &r in class.rows() {
        *counts.entry(&column[r]).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Table {
        let rows = [
            ("20s", "M", "flu"),
            ("20s", "F", "flu"),
            ("20s", "M", "cancer"),
            ("30s", "M", "flu"),
            ("20s", "M", "flu"),
        ];
        Table::from_rows(
            vec!["age".to_string(), "sex".to_string(), "disease".to_string()],
            rows.iter()
                .map(|(a, s, d)| vec![Value::parse(a), Value::parse(s), Value::parse(d)])
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_partition_groups_by_tuple() {
        let t = table();
        let classes = partition(&t, &["age", "sex"]).unwrap();
        assert_eq!(classes.len(), 3);
        // Ordered by first row position.
        assert_eq!(classes[0].rows(), &[0, 2, 4]);
        assert_eq!(classes[1].rows(), &[1]);
        assert_eq!(classes[2].rows(), &[3]);
    }

    #[test]
    fn test_partition_no_qis_is_one_class() {
        let t = table();
        let classes = partition(&t, &[]).unwrap();
        assert_eq!(classes.len(), 1);
        assert_eq!(classes[0].len(), 5);
    }

    #[test]
    fn test_partition_unknown_column() {
        let t = table();
        assert!(partition(&t, &["zip"]).is_err());
    }

    #[test]
    fn test_value_counts() {
        let t = table();
        let classes = partition(&t, &["age", "sex"]).unwrap();
        let sens = t.column("disease").unwrap();
        let counts = value_counts(&classes[0], sens);
        assert_eq!(counts.len(), 2);
        assert_eq!(counts[&Value::parse("flu")], 2);
        assert_eq!(counts[&Value::parse("cancer")], 1);
    }
}
