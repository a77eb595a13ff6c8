//! Search driver
//!
//! The monotone generalize-and-suppress loop. Levels only ever increase and
//! a quasi-identifier whose ladder is exhausted leaves the candidate set for
//! good, so the search terminates after at most the sum of all ladder heights
//! plus one suppression attempt per iteration.
//!
//! Suppression is tentative: the violating classes are dropped into a
//! candidate table, and the candidate replaces the working table only if the
//! predicate actually holds on it. The budget counts every committed deletion
//! against the ORIGINAL row count, shared across the k phase and all
//! secondary phases.

use crate::classes::{EquivalenceClass, partition, value_counts};
use crate::engine::{Anonymization, PrivacyModel};
use crate::error::AnonymityError;
use crate::hierarchy::{HierarchyStore, LiftError};
use crate::metrics;
use crate::table::Table;
use log::{debug, info, warn};
use std::collections::BTreeMap;

/// Driver state, advanced by [`SearchDriver::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Phase {
    Init,
    KLoop,
    SecondaryLoop,
    DoneOk,
    DoneEmpty,
}

/// A secondary predicate chased after the k phase. Only the frequency-count
/// metrics (l, recursive (c,l), alpha) admit suppression; the divergence
/// metrics generalize only.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum SecondaryMetric {
    LDiversity { l: usize },
    EntropyL { l: usize },
    RecursiveCl { c: u64, l: usize },
    AlphaK { alpha: f64, k: usize },
    TCloseness { t: f64 },
    BasicBeta { beta: f64 },
    EnhancedBeta { beta: f64 },
    DeltaDisclosure { delta: f64 },
}

impl SecondaryMetric {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            SecondaryMetric::LDiversity { .. } => "l-diversity",
            SecondaryMetric::EntropyL { .. } => "entropy l-diversity",
            SecondaryMetric::RecursiveCl { .. } => "recursive (c,l)-diversity",
            SecondaryMetric::AlphaK { .. } => "(alpha,k)-anonymity",
            SecondaryMetric::TCloseness { .. } => "t-closeness",
            SecondaryMetric::BasicBeta { .. } => "basic beta-likeness",
            SecondaryMetric::EnhancedBeta { .. } => "enhanced beta-likeness",
            SecondaryMetric::DeltaDisclosure { .. } => "delta-disclosure privacy",
        }
    }

    fn satisfied(&self, table: &Table, qis: &[&str], sens: &str) -> Result<bool, AnonymityError> {
        if table.is_empty() {
            return Ok(false);
        }
        Ok(match *self {
            SecondaryMetric::LDiversity { l } => metrics::l_diversity(table, qis, sens)? >= l,
            // Slack tolerates float noise at integer boundaries of exp(entropy).
            SecondaryMetric::EntropyL { l } => {
                metrics::entropy_l_diversity(table, qis, sens)? >= l as f64 - 1e-9
            }
            SecondaryMetric::RecursiveCl { c, l } => {
                let (c_real, l_real) = metrics::recursive_cl_diversity(table, qis, sens)?;
                c_real >= c && l_real >= l
            }
            SecondaryMetric::AlphaK { alpha, k } => {
                let (alpha_real, k_real) = metrics::alpha_k_anonymity(table, qis, sens)?;
                alpha_real <= alpha && k_real >= k
            }
            SecondaryMetric::TCloseness { t } => metrics::t_closeness(table, qis, sens)? <= t,
            SecondaryMetric::BasicBeta { beta } => {
                metrics::basic_beta_likeness(table, qis, sens)? <= beta
            }
            SecondaryMetric::EnhancedBeta { beta } => {
                metrics::enhanced_beta_likeness(table, qis, sens)? <= beta
            }
            SecondaryMetric::DeltaDisclosure { delta } => {
                metrics::delta_disclosure(table, qis, sens)? <= delta
            }
        })
    }

    /// Row positions of the classes violating the predicate, or `None` when
    /// the metric does not admit suppression.
    fn violating_rows(
        &self,
        table: &Table,
        qis: &[&str],
        sens: &str,
    ) -> Result<Option<Vec<usize>>, AnonymityError> {
        let sens_col = table.column(sens)?;
        let classes = partition(table, qis)?;
        let rows = match *self {
            SecondaryMetric::LDiversity { l } => {
                rows_of(&classes, |class| value_counts(class, sens_col).len() < l)
            }
            SecondaryMetric::RecursiveCl { c, l } => rows_of(&classes, |class| {
                let freqs: Vec<usize> = value_counts(class, sens_col).into_values().collect();
                metrics::recursive_c_value(freqs, l) < c
            }),
            SecondaryMetric::AlphaK { alpha, .. } => rows_of(&classes, |class| {
                let max_count = value_counts(class, sens_col)
                    .values()
                    .copied()
                    .max()
                    .unwrap_or(0);
                max_count as f64 / class.len() as f64 > alpha
            }),
            _ => return Ok(None),
        };
        Ok(Some(rows))
    }

    /// Recursive (c,l) cannot recover once even the best class sits below the
    /// c target; the other metrics have no such early exit.
    fn fatally_infeasible(
        &self,
        table: &Table,
        qis: &[&str],
        sens: &str,
    ) -> Result<bool, AnonymityError> {
        match *self {
            SecondaryMetric::RecursiveCl { c, l } => {
                let sens_col = table.column(sens)?;
                let classes = partition(table, qis)?;
                let best = classes
                    .iter()
                    .map(|class| {
                        let freqs: Vec<usize> =
                            value_counts(class, sens_col).into_values().collect();
                        metrics::recursive_c_value(freqs, l)
                    })
                    .max()
                    .unwrap_or(0);
                Ok(best < c)
            }
            _ => Ok(false),
        }
    }
}

fn rows_of<F: Fn(&EquivalenceClass) -> bool>(
    classes: &[EquivalenceClass],
    violates: F,
) -> Vec<usize> {
    classes
        .iter()
        .filter(|class| violates(class))
        .flat_map(|class| class.rows().iter().copied())
        .collect()
}

pub(crate) struct SearchDriver<'a> {
    table: Table,
    qis: &'a [&'a str],
    sens: Option<&'a str>,
    store: &'a HierarchyStore,
    supp_level: f64,
    gen_level: BTreeMap<String, usize>,
    /// QIs still eligible for generalization, in declared order.
    candidates: Vec<&'a str>,
    suppressed: usize,
    /// Original row count; the budget denominator for every phase.
    n: usize,
    phase: Phase,
}

impl<'a> SearchDriver<'a> {
    /// `table` must already have its identifier columns erased.
    pub fn new(
        table: Table,
        qis: &'a [&'a str],
        sens: Option<&'a str>,
        store: &'a HierarchyStore,
        supp_level: f64,
    ) -> Result<Self, AnonymityError> {
        let mut gen_level = BTreeMap::new();
        for &qi in qis {
            let level = match store.get(qi) {
                Some(hierarchy) => hierarchy.infer_level(table.column(qi)?).unwrap_or(0),
                None => 0,
            };
            gen_level.insert(qi.to_string(), level);
        }
        let n = table.n_rows();
        Ok(SearchDriver {
            table,
            qis,
            sens,
            store,
            supp_level,
            gen_level,
            candidates: qis.to_vec(),
            suppressed: 0,
            n,
            phase: Phase::Init,
        })
    }

    #[cfg(test)]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn run(&mut self, model: &PrivacyModel) -> Result<Anonymization, AnonymityError> {
        if self.table.is_empty() {
            debug!("input table is empty, nothing to anonymize");
            self.phase = Phase::DoneEmpty;
            return Ok(self.outcome());
        }
        self.phase = Phase::KLoop;
        if !self.k_loop(model.k())? {
            warn!(
                "anonymization cannot be carried out for the given value k={}",
                model.k()
            );
            self.phase = Phase::DoneEmpty;
            return Ok(self.empty_outcome());
        }
        for metric in model.secondary_metrics() {
            self.phase = Phase::SecondaryLoop;
            if !self.secondary_loop(&metric)? {
                warn!(
                    "{} cannot be achieved with the given parameters",
                    metric.name()
                );
                self.phase = Phase::DoneEmpty;
                return Ok(self.empty_outcome());
            }
        }
        self.phase = Phase::DoneOk;
        Ok(self.outcome())
    }

    fn k_loop(&mut self, k: usize) -> Result<bool, AnonymityError> {
        loop {
            let k_real = metrics::k_anonymity(&self.table, self.qis)?;
            if k_real >= k {
                info!("table satisfies k-anonymity with k={k_real}");
                return Ok(true);
            }
            let classes = partition(&self.table, self.qis)?;
            let max_size = classes.iter().map(EquivalenceClass::len).max().unwrap_or(0);
            // Only worth suppressing once at least one class already reaches k.
            if max_size >= k {
                let rows = rows_of(&classes, |class| class.len() < k);
                if let Some(candidate) = self.suppression_candidate(&rows) {
                    if metrics::k_anonymity(&candidate, self.qis)? >= k {
                        self.commit(candidate, rows.len());
                        info!("suppressed {} records to reach k={k}", rows.len());
                        return Ok(true);
                    }
                }
            }
            if !self.generalize_step()? {
                return Ok(false);
            }
        }
    }

    fn secondary_loop(&mut self, metric: &SecondaryMetric) -> Result<bool, AnonymityError> {
        let Some(sens) = self.sens else {
            return Err(AnonymityError::InvalidParameter(format!(
                "{} requires a sensitive attribute",
                metric.name()
            )));
        };
        loop {
            if metric.satisfied(&self.table, self.qis, sens)? {
                info!("table satisfies {}", metric.name());
                return Ok(true);
            }
            if metric.fatally_infeasible(&self.table, self.qis, sens)? {
                debug!("{} is infeasible on the current classes", metric.name());
                return Ok(false);
            }
            if let Some(rows) = metric.violating_rows(&self.table, self.qis, sens)? {
                if let Some(candidate) = self.suppression_candidate(&rows) {
                    if metric.satisfied(&candidate, self.qis, sens)? {
                        self.commit(candidate, rows.len());
                        info!(
                            "suppressed {} records to satisfy {}",
                            rows.len(),
                            metric.name()
                        );
                        return Ok(true);
                    }
                }
            }
            if !self.generalize_step()? {
                return Ok(false);
            }
        }
    }

    /// The table minus the given rows, if deleting them stays within the
    /// budget. The caller decides whether to commit.
    fn suppression_candidate(&self, rows: &[usize]) -> Option<Table> {
        if rows.is_empty() {
            return None;
        }
        let total = self.suppressed + rows.len();
        if (total * 100) as f64 / self.n as f64 > self.supp_level {
            return None;
        }
        let mut keep = vec![true; self.table.n_rows()];
        for &r in rows {
            keep[r] = false;
        }
        let mut candidate = self.table.clone();
        candidate.retain_rows(&keep);
        Some(candidate)
    }

    fn commit(&mut self, table: Table, dropped: usize) {
        self.table = table;
        self.suppressed += dropped;
    }

    /// Bump the candidate QI with the most distinct values by one level,
    /// ties to the first-declared QI. Exhausted ladders leave the candidate
    /// set. Returns false once no candidate remains.
    fn generalize_step(&mut self) -> Result<bool, AnonymityError> {
        loop {
            let Some(qi) = self.pick_target()? else {
                return Ok(false);
            };
            let Some(hierarchy) = self.store.get(qi) else {
                self.drop_candidate(qi);
                continue;
            };
            let level = self.gen_level.get(qi).copied().unwrap_or(0);
            let lifted = hierarchy.lift(self.table.column(qi)?, level, level + 1);
            match lifted {
                Ok(column) => {
                    self.table.set_column(qi, column)?;
                    *self.gen_level.entry(qi.to_string()).or_insert(0) += 1;
                    debug!("generalized '{qi}' to level {}", level + 1);
                    return Ok(true);
                }
                Err(LiftError::InvalidLevel { .. }) => self.drop_candidate(qi),
                Err(LiftError::UnknownValue { value, level }) => {
                    return Err(AnonymityError::UnknownValue {
                        qi: qi.to_string(),
                        value,
                        level,
                    });
                }
            }
        }
    }

    fn pick_target(&self) -> Result<Option<&'a str>, AnonymityError> {
        let mut best: Option<(&'a str, usize)> = None;
        for &qi in &self.candidates {
            let count = self.table.distinct_count(qi)?;
            match best {
                Some((_, best_count)) if count <= best_count => {}
                _ => best = Some((qi, count)),
            }
        }
        Ok(best.map(|(qi, _)| qi))
    }

    fn drop_candidate(&mut self, qi: &str) {
        self.candidates.retain(|candidate| *candidate != qi);
    }

    fn outcome(&self) -> Anonymization {
        Anonymization {
            table: self.table.clone(),
            suppressed: self.suppressed,
            gen_level: self.gen_level.clone(),
        }
    }

    fn empty_outcome(&self) -> Anonymization {
        Anonymization {
            table: self.table.cleared(),
            suppressed: self.suppressed,
            gen_level: self.gen_level.clone(),
        }
    }
}
