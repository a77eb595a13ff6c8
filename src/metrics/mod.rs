//! Privacy-metric oracles
//!
//! Each oracle is a pure function over `(table, quasi-identifiers, [sensitive
//! attribute])` returning the worst-case parameter the current table attains:
//! the smallest group size for k, the smallest distinct-sensitive count for
//! ℓ, the largest divergence for t/β/δ. The search driver only compares these
//! values against its targets; it never re-derives metric internals.
//!
//! Empty tables evaluate to the weakest possible parameter (0 for the ≥
//! metrics) so an empty candidate can never satisfy a predicate.

use crate::classes::{partition, value_counts};
use crate::table::{Table, TableError, Value};
use std::collections::HashMap;

/// Minimum equivalence-class size.
pub fn k_anonymity(table: &Table, qis: &[&str]) -> Result<usize, TableError> {
    let classes = partition(table, qis)?;
    Ok(classes.iter().map(|c| c.len()).min().unwrap_or(0))
}

/// Minimum per-class count of distinct sensitive values.
pub fn l_diversity(table: &Table, qis: &[&str], sens: &str) -> Result<usize, TableError> {
    let sens_col = table.column(sens)?;
    let classes = partition(table, qis)?;
    Ok(classes
        .iter()
        .map(|c| value_counts(c, sens_col).len())
        .min()
        .unwrap_or(0))
}

/// Minimum per-class `exp(entropy)` of the sensitive distribution, natural
/// log. A class of exactly ℓ uniformly distributed values scores ℓ.
pub fn entropy_l_diversity(table: &Table, qis: &[&str], sens: &str) -> Result<f64, TableError> {
    let sens_col = table.column(sens)?;
    let classes = partition(table, qis)?;
    if classes.is_empty() {
        return Ok(0.0);
    }
    let mut worst = f64::INFINITY;
    for class in &classes {
        let size = class.len() as f64;
        let entropy: f64 = value_counts(class, sens_col)
            .values()
            .map(|&count| {
                let p = count as f64 / size;
                -p * p.ln()
            })
            .sum();
        worst = worst.min(entropy.exp());
    }
    Ok(worst)
}

/// Per-class c for recursive (c,ℓ)-diversity: frequencies sorted ascending,
/// `floor(r[0] / Σ r[l-1..] + 1)`. Classes with fewer than `l` distinct
/// values score 0, the maximally violating value.
pub(crate) fn recursive_c_value(mut freqs: Vec<usize>, l: usize) -> u64 {
    freqs.sort_unstable();
    if l == 0 || freqs.len() < l {
        return 0;
    }
    let tail: usize = freqs[l - 1..].iter().sum();
    ((freqs[0] as f64 / tail as f64) + 1.0).floor() as u64
}

/// `(c_real, l_real)`: the minimum per-class c (computed against the measured
/// `l_real`) and the minimum per-class distinct-sensitive count.
pub fn recursive_cl_diversity(
    table: &Table,
    qis: &[&str],
    sens: &str,
) -> Result<(u64, usize), TableError> {
    let sens_col = table.column(sens)?;
    let classes = partition(table, qis)?;
    if classes.is_empty() {
        return Ok((0, 0));
    }
    let l_real = classes
        .iter()
        .map(|c| value_counts(c, sens_col).len())
        .min()
        .unwrap_or(0);
    let mut c_real = u64::MAX;
    for class in &classes {
        let freqs: Vec<usize> = value_counts(class, sens_col).into_values().collect();
        c_real = c_real.min(recursive_c_value(freqs, l_real));
    }
    Ok((c_real, l_real))
}

/// `(α_real, k_real)`: the largest per-class frequency of any single
/// sensitive value, and the minimum class size.
pub fn alpha_k_anonymity(
    table: &Table,
    qis: &[&str],
    sens: &str,
) -> Result<(f64, usize), TableError> {
    let sens_col = table.column(sens)?;
    let classes = partition(table, qis)?;
    if classes.is_empty() {
        return Ok((0.0, 0));
    }
    let mut alpha = 0.0f64;
    let mut k = usize::MAX;
    for class in &classes {
        let size = class.len();
        let max_count = value_counts(class, sens_col)
            .values()
            .copied()
            .max()
            .unwrap_or(0);
        alpha = alpha.max(max_count as f64 / size as f64);
        k = k.min(size);
    }
    Ok((alpha, k))
}

/// Maximum earth mover's distance between any class's sensitive distribution
/// and the table-wide one. Numeric sensitive attributes use the ordered
/// distance over the sorted value support; categorical ones use the
/// equal-distance ground, i.e. total variation.
pub fn t_closeness(table: &Table, qis: &[&str], sens: &str) -> Result<f64, TableError> {
    let sens_col = table.column(sens)?;
    let classes = partition(table, qis)?;
    if table.is_empty() {
        return Ok(0.0);
    }
    let n = sens_col.len() as f64;

    let mut global: HashMap<&Value, usize> = HashMap::new();
    for v in sens_col {
        *global.entry(v).or_insert(0) += 1;
    }
    let mut support: Vec<&Value> = global.keys().copied().collect();
    let numeric = support.iter().all(|v| v.is_numeric());
    if numeric {
        support.sort_by(|a, b| {
            a.as_f64()
                .unwrap_or(f64::NAN)
                .total_cmp(&b.as_f64().unwrap_or(f64::NAN))
        });
    } else {
        support.sort_by_key(|v| v.to_string());
    }
    let q: Vec<f64> = support.iter().map(|v| global[*v] as f64 / n).collect();
    let m = support.len();

    let mut worst = 0.0f64;
    for class in &classes {
        let counts = value_counts(class, sens_col);
        let size = class.len() as f64;
        let p: Vec<f64> = support
            .iter()
            .map(|v| counts.get(*v).copied().unwrap_or(0) as f64 / size)
            .collect();
        let emd = if m <= 1 {
            0.0
        } else if numeric {
            let mut acc = 0.0;
            let mut cum = 0.0;
            for i in 0..m - 1 {
                cum += p[i] - q[i];
                acc += cum.abs();
            }
            acc / (m as f64 - 1.0)
        } else {
            0.5 * p.iter().zip(&q).map(|(a, b)| (a - b).abs()).sum::<f64>()
        };
        worst = worst.max(emd);
    }
    Ok(worst)
}

/// Maximum over classes and their sensitive values of `(p - q) / q`, where
/// `p` is the in-class frequency and `q` the table-wide one.
pub fn basic_beta_likeness(table: &Table, qis: &[&str], sens: &str) -> Result<f64, TableError> {
    let pairs = frequency_pairs(table, qis, sens)?;
    Ok(pairs
        .iter()
        .map(|&(p, q)| (p - q) / q)
        .fold(0.0f64, f64::max))
}

/// As basic β-likeness, except a pair whose distance already exceeds the
/// data-intrinsic bound `-ln(q)` can never be admitted by any β and makes
/// the result infinite.
pub fn enhanced_beta_likeness(table: &Table, qis: &[&str], sens: &str) -> Result<f64, TableError> {
    let pairs = frequency_pairs(table, qis, sens)?;
    Ok(pairs
        .iter()
        .map(|&(p, q)| {
            let dist = (p - q) / q;
            if dist > -q.ln() { f64::INFINITY } else { dist }
        })
        .fold(0.0f64, f64::max))
}

/// Maximum over classes and their sensitive values of `|ln(p / q)|`.
pub fn delta_disclosure(table: &Table, qis: &[&str], sens: &str) -> Result<f64, TableError> {
    let pairs = frequency_pairs(table, qis, sens)?;
    Ok(pairs
        .iter()
        .map(|&(p, q)| (p / q).ln().abs())
        .fold(0.0f64, f64::max))
}

/// All `(p, q)` frequency pairs over classes and the sensitive values present
/// in them. Shared by the β-likeness and δ-disclosure oracles.
fn frequency_pairs(
    table: &Table,
    qis: &[&str],
    sens: &str,
) -> Result<Vec<(f64, f64)>, TableError> {
    let sens_col = table.column(sens)?;
    let classes = partition(table, qis)?;
    if table.is_empty() {
        return Ok(Vec::new());
    }
    let n = sens_col.len() as f64;
    let mut global: HashMap<&Value, usize> = HashMap::new();
    for v in sens_col {
        *global.entry(v).or_insert(0) += 1;
    }

    let mut pairs = Vec::new();
    for class in &classes {
        let size = class.len() as f64;
        for (value, count) in value_counts(class, sens_col) {
            let p = count as f64 / size;
            let q = global[value] as f64 / n;
            pairs.push((p, q));
        }
    }
    Ok(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(rows: &[(&str, &str)]) -> Table {
        Table::from_rows(
            vec!["zip".to_string(), "disease".to_string()],
            rows.iter()
                .map(|(z, d)| vec![Value::parse(z), Value::parse(d)])
                .collect(),
        )
        .unwrap()
    }

    const QIS: &[&str] = &["zip"];

    #[test]
    fn test_k_is_min_class_size() {
        let t = table(&[("a", "x"), ("a", "y"), ("a", "x"), ("b", "x"), ("b", "y")]);
        assert_eq!(k_anonymity(&t, QIS).unwrap(), 2);
    }

    #[test]
    fn test_k_empty_table_is_zero() {
        let t = table(&[]);
        assert_eq!(k_anonymity(&t, QIS).unwrap(), 0);
    }

    #[test]
    fn test_l_is_min_distinct_sens() {
        let t = table(&[("a", "x"), ("a", "y"), ("b", "x"), ("b", "x")]);
        assert_eq!(l_diversity(&t, QIS, "disease").unwrap(), 1);
    }

    #[test]
    fn test_entropy_uniform_pair_scores_two() {
        let t = table(&[("a", "x"), ("a", "y"), ("a", "x"), ("a", "y")]);
        let l = entropy_l_diversity(&t, QIS, "disease").unwrap();
        assert!((l - 2.0).abs() < 1e-9, "expected 2.0, got {l}");
    }

    #[test]
    fn test_entropy_skew_scores_below_distinct_count() {
        // Three distinct values but heavily skewed: exp(entropy) < 3.
        let t = table(&[("a", "x"), ("a", "x"), ("a", "x"), ("a", "y"), ("a", "z")]);
        let l = entropy_l_diversity(&t, QIS, "disease").unwrap();
        assert!(l > 1.0 && l < 3.0, "got {l}");
    }

    #[test]
    fn test_recursive_c_value_formula() {
        // Ascending r = [1, 2]; l = 2: floor(1/2 + 1) = 1.
        assert_eq!(recursive_c_value(vec![2, 1], 2), 1);
        // Single-value class at l = 1: floor(3/3 + 1) = 2.
        assert_eq!(recursive_c_value(vec![3], 1), 2);
        // Balanced pair at l = 2: floor(3/3 + 1) = 2.
        assert_eq!(recursive_c_value(vec![3, 3], 2), 2);
        // Too few distinct values is maximally violating.
        assert_eq!(recursive_c_value(vec![4], 2), 0);
    }

    #[test]
    fn test_recursive_oracle_reports_min_over_classes() {
        let t = table(&[
            ("a", "x"),
            ("a", "x"),
            ("a", "y"),
            ("b", "x"),
            ("b", "y"),
        ]);
        // l_real = 2; class a: r=[1,2] -> 1; class b: r=[1,1] -> floor(1/1+1)=2.
        assert_eq!(recursive_cl_diversity(&t, QIS, "disease").unwrap(), (1, 2));
    }

    #[test]
    fn test_alpha_k() {
        let t = table(&[("a", "x"), ("a", "x"), ("a", "y"), ("b", "x"), ("b", "y")]);
        let (alpha, k) = alpha_k_anonymity(&t, QIS, "disease").unwrap();
        assert!((alpha - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(k, 2);
    }

    #[test]
    fn test_t_closeness_identical_distributions_is_zero() {
        let t = table(&[("a", "x"), ("a", "y"), ("b", "x"), ("b", "y")]);
        let tc = t_closeness(&t, QIS, "disease").unwrap();
        assert!(tc.abs() < 1e-12);
    }

    #[test]
    fn test_t_closeness_categorical_is_total_variation() {
        // Global: x 1/2, y 1/4, z 1/4. Class a = {x,x}: p = (1,0,0).
        // TV = 0.5 * (|1-.5| + .25 + .25) = 0.5.
        let t = table(&[("a", "x"), ("a", "x"), ("b", "y"), ("b", "z")]);
        let tc = t_closeness(&t, QIS, "disease").unwrap();
        assert!((tc - 0.5).abs() < 1e-12, "got {tc}");
    }

    #[test]
    fn test_t_closeness_numeric_ordered_distance() {
        // Sens values 1,2,3 uniform globally; class a = {1,1}, p = (1,0,0).
        // cum1 = 1 - 1/3 = 2/3; cum2 = 2/3 - 1/3 = 1/3; emd = (2/3 + 1/3)/2.
        let t = table(&[("a", "1"), ("a", "1"), ("b", "2"), ("b", "3"), ("b", "2"), ("b", "3")]);
        let tc = t_closeness(&t, QIS, "disease").unwrap();
        assert!((tc - 0.5).abs() < 1e-12, "got {tc}");
    }

    #[test]
    fn test_basic_beta() {
        // Global q(x) = 1/2; class a has p(x) = 1: (1 - .5)/.5 = 1.
        let t = table(&[("a", "x"), ("a", "x"), ("b", "y"), ("b", "y")]);
        let beta = basic_beta_likeness(&t, QIS, "disease").unwrap();
        assert!((beta - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_enhanced_beta_infinite_past_intrinsic_bound() {
        // dist = 1.0 > -ln(0.5) ≈ 0.693, so no β admits this table.
        let t = table(&[("a", "x"), ("a", "x"), ("b", "y"), ("b", "y")]);
        let beta = enhanced_beta_likeness(&t, QIS, "disease").unwrap();
        assert!(beta.is_infinite());
    }

    #[test]
    fn test_enhanced_beta_finite_within_bound() {
        // Every class matches the global distribution: dist = 0 <= -ln(q).
        let t = table(&[("a", "x"), ("a", "y"), ("b", "x"), ("b", "y")]);
        let beta = enhanced_beta_likeness(&t, QIS, "disease").unwrap();
        assert!(beta.abs() < 1e-12);
    }

    #[test]
    fn test_delta_disclosure() {
        // Class a: p(x) = 1, q(x) = 1/2 -> |ln 2| ≈ 0.6931.
        let t = table(&[("a", "x"), ("a", "x"), ("b", "y"), ("b", "y")]);
        let delta = delta_disclosure(&t, QIS, "disease").unwrap();
        assert!((delta - 2.0f64.ln()).abs() < 1e-9, "got {delta}");
    }

    #[test]
    fn test_unknown_sens_column() {
        let t = table(&[("a", "x")]);
        assert!(l_diversity(&t, QIS, "salary").is_err());
    }
}
