//! Privacy models and the anonymization entry points
//!
//! One public function per privacy model, all thin wrappers over
//! [`anonymize`], which validates the request and hands the table to the
//! search driver. An infeasible request yields an EMPTY table (schema kept,
//! zero rows), never an error; callers test `result.is_empty()`.

mod driver;

use crate::error::AnonymityError;
use crate::hierarchy::HierarchyStore;
use crate::table::Table;
use crate::transform;
use driver::{SearchDriver, SecondaryMetric};
use std::collections::BTreeMap;
use strum_macros::{EnumIter, EnumString, IntoStaticStr};

/// Privacy model identifier, stable-named for the config file and CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, EnumString, IntoStaticStr)]
pub enum ModelKind {
    #[strum(serialize = "k-anonymity")]
    KAnonymity,
    #[strum(serialize = "alpha-k-anonymity")]
    AlphaKAnonymity,
    #[strum(serialize = "l-diversity")]
    LDiversity,
    #[strum(serialize = "entropy-l-diversity")]
    EntropyLDiversity,
    #[strum(serialize = "recursive-cl-diversity")]
    RecursiveClDiversity,
    #[strum(serialize = "t-closeness")]
    TCloseness,
    #[strum(serialize = "basic-beta-likeness")]
    BasicBetaLikeness,
    #[strum(serialize = "enhanced-beta-likeness")]
    EnhancedBetaLikeness,
    #[strum(serialize = "delta-disclosure")]
    DeltaDisclosure,
}

impl ModelKind {
    /// Every model except plain k-anonymity reasons about one sensitive
    /// attribute.
    pub fn requires_sensitive(&self) -> bool {
        !matches!(self, ModelKind::KAnonymity)
    }

    /// Short reference text for `--explain`.
    pub fn describe(&self) -> &'static str {
        match self {
            ModelKind::KAnonymity => {
                "k-anonymity\n\
                 Every combination of quasi-identifier values must be shared\n\
                 by at least k records. Targets: k. Satisfied by generalizing\n\
                 quasi-identifiers and suppressing small equivalence classes\n\
                 within the suppression budget."
            }
            ModelKind::AlphaKAnonymity => {
                "(alpha,k)-anonymity\n\
                 k-anonymity plus a cap on the in-class frequency of any\n\
                 single sensitive value: no value may exceed the fraction\n\
                 alpha within its class. Targets: alpha (0..=1), k.\n\
                 Violating classes may be suppressed within budget."
            }
            ModelKind::LDiversity => {
                "l-diversity\n\
                 Every equivalence class must contain at least l distinct\n\
                 sensitive values. Targets: l, k. Violating classes may be\n\
                 suppressed within budget."
            }
            ModelKind::EntropyLDiversity => {
                "entropy l-diversity\n\
                 The entropy of each class's sensitive distribution must be\n\
                 at least ln(l). Targets: l, k. Runs the plain l-diversity\n\
                 search first, then generalizes further; no suppression in\n\
                 the entropy phase."
            }
            ModelKind::RecursiveClDiversity => {
                "recursive (c,l)-diversity\n\
                 A frequency-skew refinement of l-diversity controlled by c.\n\
                 Targets: c, l, k. Runs the plain l-diversity search first;\n\
                 violating classes may be suppressed within budget."
            }
            ModelKind::TCloseness => {
                "t-closeness\n\
                 The earth mover's distance between each class's sensitive\n\
                 distribution and the table-wide one must not exceed t.\n\
                 Targets: t (0..=1), k. Generalization only."
            }
            ModelKind::BasicBetaLikeness => {
                "basic beta-likeness\n\
                 The relative gain (p - q) / q of any sensitive value's\n\
                 in-class frequency over its table-wide frequency must not\n\
                 exceed beta. Targets: beta (>= 0), k. Generalization only."
            }
            ModelKind::EnhancedBetaLikeness => {
                "enhanced beta-likeness\n\
                 As basic beta-likeness with the sharper per-value bound\n\
                 min(beta, -ln q). Targets: beta (>= 0), k. Generalization\n\
                 only."
            }
            ModelKind::DeltaDisclosure => {
                "delta-disclosure privacy\n\
                 |ln(p / q)| must not exceed delta for every sensitive value\n\
                 of every class. Targets: delta (>= 0), k. Generalization\n\
                 only."
            }
        }
    }
}

/// A privacy model with its target parameters. All models carry the k target
/// of the primary phase.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PrivacyModel {
    KAnonymity { k: usize },
    AlphaKAnonymity { k: usize, alpha: f64 },
    LDiversity { k: usize, l: usize },
    EntropyLDiversity { k: usize, l: usize },
    RecursiveClDiversity { k: usize, c: u64, l: usize },
    TCloseness { k: usize, t: f64 },
    BasicBetaLikeness { k: usize, beta: f64 },
    EnhancedBetaLikeness { k: usize, beta: f64 },
    DeltaDisclosure { k: usize, delta: f64 },
}

impl PrivacyModel {
    pub fn kind(&self) -> ModelKind {
        match self {
            PrivacyModel::KAnonymity { .. } => ModelKind::KAnonymity,
            PrivacyModel::AlphaKAnonymity { .. } => ModelKind::AlphaKAnonymity,
            PrivacyModel::LDiversity { .. } => ModelKind::LDiversity,
            PrivacyModel::EntropyLDiversity { .. } => ModelKind::EntropyLDiversity,
            PrivacyModel::RecursiveClDiversity { .. } => ModelKind::RecursiveClDiversity,
            PrivacyModel::TCloseness { .. } => ModelKind::TCloseness,
            PrivacyModel::BasicBetaLikeness { .. } => ModelKind::BasicBetaLikeness,
            PrivacyModel::EnhancedBetaLikeness { .. } => ModelKind::EnhancedBetaLikeness,
            PrivacyModel::DeltaDisclosure { .. } => ModelKind::DeltaDisclosure,
        }
    }

    pub fn k(&self) -> usize {
        match *self {
            PrivacyModel::KAnonymity { k }
            | PrivacyModel::AlphaKAnonymity { k, .. }
            | PrivacyModel::LDiversity { k, .. }
            | PrivacyModel::EntropyLDiversity { k, .. }
            | PrivacyModel::RecursiveClDiversity { k, .. }
            | PrivacyModel::TCloseness { k, .. }
            | PrivacyModel::BasicBetaLikeness { k, .. }
            | PrivacyModel::EnhancedBetaLikeness { k, .. }
            | PrivacyModel::DeltaDisclosure { k, .. } => k,
        }
    }

    /// Reject out-of-domain targets before any data work.
    pub fn validate(&self) -> Result<(), AnonymityError> {
        let name: &'static str = self.kind().into();
        if self.k() < 1 {
            return Err(AnonymityError::InvalidParameter(format!(
                "invalid value of k for {name}, k={}",
                self.k()
            )));
        }
        let unit = |label: &str, value: f64| {
            if value.is_finite() && (0.0..=1.0).contains(&value) {
                Ok(())
            } else {
                Err(AnonymityError::InvalidParameter(format!(
                    "invalid value of {label} for {name}, {label}={value}"
                )))
            }
        };
        let non_negative = |label: &str, value: f64| {
            if value.is_finite() && value >= 0.0 {
                Ok(())
            } else {
                Err(AnonymityError::InvalidParameter(format!(
                    "invalid value of {label} for {name}, {label}={value}"
                )))
            }
        };
        let at_least_one = |label: &str, value: u64| {
            if value >= 1 {
                Ok(())
            } else {
                Err(AnonymityError::InvalidParameter(format!(
                    "invalid value of {label} for {name}, {label}={value}"
                )))
            }
        };
        match *self {
            PrivacyModel::KAnonymity { .. } => Ok(()),
            PrivacyModel::AlphaKAnonymity { alpha, .. } => unit("alpha", alpha),
            PrivacyModel::LDiversity { l, .. } | PrivacyModel::EntropyLDiversity { l, .. } => {
                at_least_one("l", l as u64)
            }
            PrivacyModel::RecursiveClDiversity { c, l, .. } => {
                at_least_one("l", l as u64)?;
                at_least_one("c", c)
            }
            PrivacyModel::TCloseness { t, .. } => unit("t", t),
            PrivacyModel::BasicBetaLikeness { beta, .. }
            | PrivacyModel::EnhancedBetaLikeness { beta, .. } => non_negative("beta", beta),
            PrivacyModel::DeltaDisclosure { delta, .. } => non_negative("delta", delta),
        }
    }

    /// The secondary loops run after the k phase, in order. Entropy and
    /// recursive (c,l) chase the plain l-diversity predicate first, exactly
    /// as their definitions build on it.
    pub(crate) fn secondary_metrics(&self) -> Vec<SecondaryMetric> {
        match *self {
            PrivacyModel::KAnonymity { .. } => vec![],
            PrivacyModel::AlphaKAnonymity { k, alpha } => {
                vec![SecondaryMetric::AlphaK { alpha, k }]
            }
            PrivacyModel::LDiversity { l, .. } => vec![SecondaryMetric::LDiversity { l }],
            PrivacyModel::EntropyLDiversity { l, .. } => vec![
                SecondaryMetric::LDiversity { l },
                SecondaryMetric::EntropyL { l },
            ],
            PrivacyModel::RecursiveClDiversity { c, l, .. } => vec![
                SecondaryMetric::LDiversity { l },
                SecondaryMetric::RecursiveCl { c, l },
            ],
            PrivacyModel::TCloseness { t, .. } => vec![SecondaryMetric::TCloseness { t }],
            PrivacyModel::BasicBetaLikeness { beta, .. } => {
                vec![SecondaryMetric::BasicBeta { beta }]
            }
            PrivacyModel::EnhancedBetaLikeness { beta, .. } => {
                vec![SecondaryMetric::EnhancedBeta { beta }]
            }
            PrivacyModel::DeltaDisclosure { delta, .. } => {
                vec![SecondaryMetric::DeltaDisclosure { delta }]
            }
        }
    }
}

/// One anonymization request: column roles, model and suppression budget.
#[derive(Debug, Clone)]
pub struct Job<'a> {
    pub identifiers: &'a [&'a str],
    pub quasi_identifiers: &'a [&'a str],
    pub sensitive: Option<&'a str>,
    pub model: PrivacyModel,
    /// Maximum percentage of the original rows that may be deleted.
    pub supp_level: f64,
}

/// The driver's full result: the anonymized table, the number of suppressed
/// records, and the generalization level each QI ended at.
#[derive(Debug, Clone, PartialEq)]
pub struct Anonymization {
    pub table: Table,
    pub suppressed: usize,
    pub gen_level: BTreeMap<String, usize>,
}

/// Validate a request and run the search. Postcondition for a non-empty
/// result: re-evaluating the model's oracle on `table` satisfies the
/// requested predicate.
pub fn anonymize(
    data: &Table,
    job: &Job<'_>,
    hierarchies: &HierarchyStore,
) -> Result<Anonymization, AnonymityError> {
    job.model.validate()?;
    if !job.supp_level.is_finite() || !(0.0..=100.0).contains(&job.supp_level) {
        return Err(AnonymityError::InvalidParameter(format!(
            "invalid suppression level {}, must be in [0, 100]",
            job.supp_level
        )));
    }
    let kind = job.model.kind();
    if kind.requires_sensitive() && job.sensitive.is_none() {
        let name: &'static str = kind.into();
        return Err(AnonymityError::InvalidParameter(format!(
            "{name} requires a sensitive attribute"
        )));
    }
    for column in job.quasi_identifiers.iter().chain(job.sensitive.iter()) {
        if !data.has_column(column) {
            return Err(AnonymityError::UnknownColumn(column.to_string()));
        }
    }

    let working = transform::suppress_identifiers(data, job.identifiers)?;
    let mut driver = SearchDriver::new(
        working,
        job.quasi_identifiers,
        job.sensitive,
        hierarchies,
        job.supp_level,
    )?;
    driver.run(&job.model)
}

fn run_model(
    data: &Table,
    ident: &[&str],
    quasi_ident: &[&str],
    sensitive: Option<&str>,
    model: PrivacyModel,
    supp_level: f64,
    hierarchies: &HierarchyStore,
) -> Result<Table, AnonymityError> {
    let job = Job {
        identifiers: ident,
        quasi_identifiers: quasi_ident,
        sensitive,
        model,
        supp_level,
    };
    anonymize(data, &job, hierarchies).map(|a| a.table)
}

/// Anonymize a table to k-anonymity.
pub fn k_anonymity(
    data: &Table,
    ident: &[&str],
    quasi_ident: &[&str],
    k: usize,
    supp_level: f64,
    hierarchies: &HierarchyStore,
) -> Result<Table, AnonymityError> {
    run_model(
        data,
        ident,
        quasi_ident,
        None,
        PrivacyModel::KAnonymity { k },
        supp_level,
        hierarchies,
    )
}

/// Anonymize a table to (alpha,k)-anonymity.
pub fn alpha_k_anonymity(
    data: &Table,
    ident: &[&str],
    quasi_ident: &[&str],
    sens_att: &str,
    k: usize,
    alpha: f64,
    supp_level: f64,
    hierarchies: &HierarchyStore,
) -> Result<Table, AnonymityError> {
    run_model(
        data,
        ident,
        quasi_ident,
        Some(sens_att),
        PrivacyModel::AlphaKAnonymity { k, alpha },
        supp_level,
        hierarchies,
    )
}

/// Anonymize a table to l-diversity (and k-anonymity).
pub fn l_diversity(
    data: &Table,
    ident: &[&str],
    quasi_ident: &[&str],
    sens_att: &str,
    k: usize,
    l: usize,
    supp_level: f64,
    hierarchies: &HierarchyStore,
) -> Result<Table, AnonymityError> {
    run_model(
        data,
        ident,
        quasi_ident,
        Some(sens_att),
        PrivacyModel::LDiversity { k, l },
        supp_level,
        hierarchies,
    )
}

/// Anonymize a table to entropy l-diversity (and k-anonymity).
pub fn entropy_l_diversity(
    data: &Table,
    ident: &[&str],
    quasi_ident: &[&str],
    sens_att: &str,
    k: usize,
    l: usize,
    supp_level: f64,
    hierarchies: &HierarchyStore,
) -> Result<Table, AnonymityError> {
    run_model(
        data,
        ident,
        quasi_ident,
        Some(sens_att),
        PrivacyModel::EntropyLDiversity { k, l },
        supp_level,
        hierarchies,
    )
}

/// Anonymize a table to recursive (c,l)-diversity (and k-anonymity).
pub fn recursive_c_l_diversity(
    data: &Table,
    ident: &[&str],
    quasi_ident: &[&str],
    sens_att: &str,
    k: usize,
    c: u64,
    l: usize,
    supp_level: f64,
    hierarchies: &HierarchyStore,
) -> Result<Table, AnonymityError> {
    run_model(
        data,
        ident,
        quasi_ident,
        Some(sens_att),
        PrivacyModel::RecursiveClDiversity { k, c, l },
        supp_level,
        hierarchies,
    )
}

/// Anonymize a table to t-closeness (and k-anonymity).
pub fn t_closeness(
    data: &Table,
    ident: &[&str],
    quasi_ident: &[&str],
    sens_att: &str,
    k: usize,
    t: f64,
    supp_level: f64,
    hierarchies: &HierarchyStore,
) -> Result<Table, AnonymityError> {
    run_model(
        data,
        ident,
        quasi_ident,
        Some(sens_att),
        PrivacyModel::TCloseness { k, t },
        supp_level,
        hierarchies,
    )
}

/// Anonymize a table to basic beta-likeness (and k-anonymity).
pub fn basic_beta_likeness(
    data: &Table,
    ident: &[&str],
    quasi_ident: &[&str],
    sens_att: &str,
    k: usize,
    beta: f64,
    supp_level: f64,
    hierarchies: &HierarchyStore,
) -> Result<Table, AnonymityError> {
    run_model(
        data,
        ident,
        quasi_ident,
        Some(sens_att),
        PrivacyModel::BasicBetaLikeness { k, beta },
        supp_level,
        hierarchies,
    )
}

/// Anonymize a table to enhanced beta-likeness (and k-anonymity).
pub fn enhanced_beta_likeness(
    data: &Table,
    ident: &[&str],
    quasi_ident: &[&str],
    sens_att: &str,
    k: usize,
    beta: f64,
    supp_level: f64,
    hierarchies: &HierarchyStore,
) -> Result<Table, AnonymityError> {
    run_model(
        data,
        ident,
        quasi_ident,
        Some(sens_att),
        PrivacyModel::EnhancedBetaLikeness { k, beta },
        supp_level,
        hierarchies,
    )
}

/// Anonymize a table to delta-disclosure privacy (and k-anonymity).
pub fn delta_disclosure(
    data: &Table,
    ident: &[&str],
    quasi_ident: &[&str],
    sens_att: &str,
    k: usize,
    delta: f64,
    supp_level: f64,
    hierarchies: &HierarchyStore,
) -> Result<Table, AnonymityError> {
    run_model(
        data,
        ident,
        quasi_ident,
        Some(sens_att),
        PrivacyModel::DeltaDisclosure { k, delta },
        supp_level,
        hierarchies,
    )
}
