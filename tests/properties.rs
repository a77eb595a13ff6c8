//! Property-based checks of the universal guarantees: identifier erasure,
//! suppression bound, oracle post-conditions, generalization monotonicity
//! and determinism, over randomly generated microdata tables.

use microdata_anon::{
    Hierarchy, HierarchyStore, Table, Value, generate_intervals, k_anonymity, l_diversity, metrics,
};
use proptest::prelude::*;
use proptest::test_runner::TestCaseError;

const GENDERS: [&str; 3] = ["Female", "Male", "Other"];
const CITIES: [&str; 4] = ["Kerala", "Karnataka", "Madrid", "Lisbon"];
const DISEASES: [&str; 4] = ["Cancer", "TB", "Flu", "None"];

const QIS: &[&str] = &["age", "gender", "city"];

type RawRow = (i64, usize, usize, usize);

fn rows_strategy() -> impl Strategy<Value = Vec<RawRow>> {
    prop::collection::vec((0i64..100, 0usize..3, 0usize..4, 0usize..4), 1..30)
}

fn build(rows: &[RawRow]) -> (Table, HierarchyStore) {
    let table = Table::from_rows(
        vec![
            "name".to_string(),
            "age".to_string(),
            "gender".to_string(),
            "city".to_string(),
            "disease".to_string(),
        ],
        rows.iter()
            .enumerate()
            .map(|(i, &(age, g, c, d))| {
                vec![
                    Value::Str(format!("patient-{i}")),
                    Value::Int(age),
                    Value::parse(GENDERS[g]),
                    Value::parse(CITIES[c]),
                    Value::parse(DISEASES[d]),
                ]
            })
            .collect(),
    )
    .unwrap();

    let stars = vec![Value::star(); rows.len()];
    let ages = table.column("age").unwrap().to_vec();
    let mut store = HierarchyStore::new();
    store.insert(
        "age",
        Hierarchy::new(vec![
            ages.clone(),
            generate_intervals(&ages, 0, 100, 20),
            stars.clone(),
        ])
        .unwrap(),
    );
    store.insert(
        "gender",
        Hierarchy::new(vec![table.column("gender").unwrap().to_vec(), stars.clone()]).unwrap(),
    );
    store.insert(
        "city",
        Hierarchy::new(vec![table.column("city").unwrap().to_vec(), stars]).unwrap(),
    );
    (table, store)
}

fn assert_universal_properties(
    table: &Table,
    result: &Table,
    store: &HierarchyStore,
    supp_level: f64,
) -> Result<(), TestCaseError> {
    // Identifier erasure.
    prop_assert!(
        result
            .column("name")
            .unwrap()
            .iter()
            .all(|v| *v == Value::star())
    );
    // Suppression bound against the original row count.
    let suppressed = table.n_rows() - result.n_rows();
    prop_assert!(
        suppressed as f64 * 100.0 / table.n_rows() as f64 <= supp_level + 1e-9,
        "suppressed {} of {} rows with budget {}%",
        suppressed,
        table.n_rows(),
        supp_level
    );
    // Generalization monotonicity: every QI column matches one ladder level.
    for qi in QIS {
        let column = result.column(qi).unwrap();
        prop_assert!(
            store.get(qi).unwrap().infer_level(column).is_some(),
            "column '{qi}' is not a subset of any hierarchy level"
        );
    }
    Ok(())
}

proptest! {
    #[test]
    fn prop_k_anonymity_postconditions(
        rows in rows_strategy(),
        k in 1usize..=5,
        supp_idx in 0usize..3,
    ) {
        let supp_level = [0.0, 30.0, 100.0][supp_idx];
        let (table, store) = build(&rows);

        let result = k_anonymity(&table, &["name"], QIS, k, supp_level, &store).unwrap();
        let again = k_anonymity(&table, &["name"], QIS, k, supp_level, &store).unwrap();
        prop_assert_eq!(&result, &again);

        if !result.is_empty() {
            assert_universal_properties(&table, &result, &store, supp_level)?;
            prop_assert!(metrics::k_anonymity(&result, QIS).unwrap() >= k);
        }
    }

    #[test]
    fn prop_l_diversity_postconditions(
        rows in rows_strategy(),
        k in 1usize..=4,
        l in 1usize..=3,
        supp_idx in 0usize..3,
    ) {
        let supp_level = [0.0, 30.0, 100.0][supp_idx];
        let (table, store) = build(&rows);

        let result =
            l_diversity(&table, &["name"], QIS, "disease", k, l, supp_level, &store).unwrap();
        let again =
            l_diversity(&table, &["name"], QIS, "disease", k, l, supp_level, &store).unwrap();
        prop_assert_eq!(&result, &again);

        if !result.is_empty() {
            assert_universal_properties(&table, &result, &store, supp_level)?;
            prop_assert!(metrics::k_anonymity(&result, QIS).unwrap() >= k);
            prop_assert!(metrics::l_diversity(&result, QIS, "disease").unwrap() >= l);
        }
    }
}
