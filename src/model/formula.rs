//! Model formulas and the parameterized formula builder
//!
//! A formula is a response plus an ordered list of main-effect and two-way
//! interaction terms. The standard model battery is generated from a single
//! [`FormulaBuilder`] by switching covariate groups on.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::pipeline::schema::{
    AGE_NAME, COUNTRY_NAME, GDP_PER_CAPITA, LOG_MORTALITY_PER_100K, SEX_NAME, VAL, YEAR, YEAR_2004,
};

/// How a variable enters the design matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableKind {
    Numeric,
    /// Reference-level (dummy) coded categorical
    Factor,
}

/// Known categorical variables; everything else is numeric
pub fn variable_kind(name: &str) -> VariableKind {
    match name {
        AGE_NAME | SEX_NAME | COUNTRY_NAME | YEAR_2004 => VariableKind::Factor,
        _ => VariableKind::Numeric,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    pub name: String,
    pub kind: VariableKind,
}

impl Variable {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: variable_kind(name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Term {
    Main(Variable),
    Interaction(Variable, Variable),
}

impl Term {
    pub fn main(name: &str) -> Self {
        Term::Main(Variable::new(name))
    }

    pub fn interaction(a: &str, b: &str) -> Self {
        Term::Interaction(Variable::new(a), Variable::new(b))
    }

    pub fn variables(&self) -> Vec<&Variable> {
        match self {
            Term::Main(v) => vec![v],
            Term::Interaction(a, b) => vec![a, b],
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Main(v) => write!(f, "{}", v.name),
            Term::Interaction(a, b) => write!(f, "{}:{}", a.name, b.name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Formula {
    pub response: String,
    pub terms: Vec<Term>,
}

impl Formula {
    /// Every variable the formula reads, response first, without duplicates
    pub fn variables(&self) -> Vec<Variable> {
        let mut seen: Vec<Variable> = vec![Variable {
            name: self.response.clone(),
            kind: VariableKind::Numeric,
        }];
        for term in &self.terms {
            for v in term.variables() {
                if !seen.iter().any(|s| s.name == v.name) {
                    seen.push(v.clone());
                }
            }
        }
        seen
    }

    pub fn has_term(&self, term: &Term) -> bool {
        self.terms.contains(term)
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let terms: Vec<String> = self.terms.iter().map(|t| t.to_string()).collect();
        if terms.is_empty() {
            write!(f, "{} ~ 1", self.response)
        } else {
            write!(f, "{} ~ {}", self.response, terms.join(" + "))
        }
    }
}

impl FromStr for Formula {
    type Err = String;

    /// Parse `response ~ a + b + a:b`. `a*b` expands to `a + b + a:b`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (response, rhs) = s
            .split_once('~')
            .ok_or_else(|| format!("Formula '{}' must contain '~'", s))?;

        let response = response.trim();
        if response.is_empty() {
            return Err(format!("Formula '{}' has no response variable", s));
        }

        let mut terms: Vec<Term> = Vec::new();
        let mut push = |term: Term| {
            if !terms.contains(&term) {
                terms.push(term);
            }
        };

        for raw in rhs.split('+').map(str::trim) {
            if raw.is_empty() {
                return Err(format!("Formula '{}' has an empty term", s));
            }
            if raw == "1" {
                continue;
            }
            if let Some((a, b)) = raw.split_once('*') {
                let (a, b) = (a.trim(), b.trim());
                check_name(a, s)?;
                check_name(b, s)?;
                push(Term::main(a));
                push(Term::main(b));
                push(Term::interaction(a, b));
            } else if let Some((a, b)) = raw.split_once(':') {
                let (a, b) = (a.trim(), b.trim());
                check_name(a, s)?;
                check_name(b, s)?;
                push(Term::interaction(a, b));
            } else {
                check_name(raw, s)?;
                push(Term::main(raw));
            }
        }

        Ok(Formula {
            response: response.to_string(),
            terms,
        })
    }
}

fn check_name(name: &str, formula: &str) -> Result<(), String> {
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Err(format!("Invalid variable name '{}' in formula '{}'", name, formula))
    } else {
        Ok(())
    }
}

/// Error distribution and link of a model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Family {
    /// Normal errors, identity link (ordinary least squares)
    Gaussian,
    /// Poisson errors, log link
    Poisson,
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Family::Gaussian => write!(f, "gaussian"),
            Family::Poisson => write!(f, "poisson"),
        }
    }
}

impl FromStr for Family {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gaussian" | "linear" | "lm" => Ok(Family::Gaussian),
            "poisson" | "glm" => Ok(Family::Poisson),
            _ => Err(format!("Unknown model family: '{}'. Use 'gaussian' or 'poisson'.", s)),
        }
    }
}

/// Outcome modelled by the standard battery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// `log_mortality_per_100k`, fitted by least squares
    LogMortality,
    /// Raw death count `val`, fitted by Poisson regression
    Deaths,
}

impl Outcome {
    pub fn column(&self) -> &'static str {
        match self {
            Outcome::LogMortality => LOG_MORTALITY_PER_100K,
            Outcome::Deaths => VAL,
        }
    }

    pub fn family(&self) -> Family {
        match self {
            Outcome::LogMortality => Family::Gaussian,
            Outcome::Deaths => Family::Poisson,
        }
    }
}

/// Optional covariate groups layered onto the base terms
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Covariates {
    pub year_2004: bool,
    pub year_interaction: bool,
    pub age_sex_interaction: bool,
    pub country: bool,
}

/// Builds formulas of the form `outcome ~ age_name + sex_name + year + gdp_per_capita [+ ...]`
#[derive(Debug, Clone, Copy)]
pub struct FormulaBuilder {
    outcome: Outcome,
    covariates: Covariates,
}

impl FormulaBuilder {
    pub fn new(outcome: Outcome) -> Self {
        Self {
            outcome,
            covariates: Covariates::default(),
        }
    }

    pub fn covariates(mut self, covariates: Covariates) -> Self {
        self.covariates = covariates;
        self
    }

    pub fn with_year_2004(mut self) -> Self {
        self.covariates.year_2004 = true;
        self
    }

    /// `year:year_2004`; implies the `year_2004` main effect
    pub fn with_year_interaction(mut self) -> Self {
        self.covariates.year_2004 = true;
        self.covariates.year_interaction = true;
        self
    }

    pub fn with_age_sex_interaction(mut self) -> Self {
        self.covariates.age_sex_interaction = true;
        self
    }

    pub fn with_country(mut self) -> Self {
        self.covariates.country = true;
        self
    }

    pub fn build(&self) -> Formula {
        let mut terms = vec![
            Term::main(AGE_NAME),
            Term::main(SEX_NAME),
            Term::main(YEAR),
            Term::main(GDP_PER_CAPITA),
        ];

        let c = self.covariates;
        if c.year_2004 || c.year_interaction {
            terms.push(Term::main(YEAR_2004));
        }
        if c.year_interaction {
            terms.push(Term::interaction(YEAR, YEAR_2004));
        }
        if c.age_sex_interaction {
            terms.push(Term::interaction(AGE_NAME, SEX_NAME));
        }
        if c.country {
            terms.push(Term::main(COUNTRY_NAME));
        }

        Formula {
            response: self.outcome.column().to_string(),
            terms,
        }
    }
}

/// A named model to fit
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSpec {
    pub name: String,
    pub family: Family,
    pub formula: Formula,
}

impl ModelSpec {
    pub fn new(name: &str, family: Family, formula: Formula) -> Self {
        Self {
            name: name.to_string(),
            family,
            formula,
        }
    }

    /// Log-scale models report `exp(estimate)` alongside each coefficient
    pub fn is_log_scale(&self) -> bool {
        self.family == Family::Poisson || self.formula.response == LOG_MORTALITY_PER_100K
    }
}

/// The cumulative covariate progression A through D
fn progression(outcome: Outcome) -> [(char, FormulaBuilder); 4] {
    let a = FormulaBuilder::new(outcome);
    let b = a.with_year_interaction();
    let c = b.with_age_sex_interaction();
    let d = c.with_country();
    [('A', a), ('B', b), ('C', c), ('D', d)]
}

/// Linear models A-D on log mortality followed by Poisson models A-D on deaths
pub fn standard_battery() -> Vec<ModelSpec> {
    let mut specs = Vec::with_capacity(8);
    for (prefix, outcome) in [("linear", Outcome::LogMortality), ("poisson", Outcome::Deaths)] {
        for (letter, builder) in progression(outcome) {
            specs.push(ModelSpec::new(
                &format!("{}_{}", prefix, letter),
                outcome.family(),
                builder.build(),
            ));
        }
    }
    specs
}

/// Nested pairs (reduced, full) compared after the standard battery
pub fn standard_comparisons() -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for prefix in ["linear", "poisson"] {
        for (reduced, full) in [('A', 'B'), ('B', 'C'), ('C', 'D')] {
            pairs.push((format!("{}_{}", prefix, reduced), format!("{}_{}", prefix, full)));
        }
    }
    pairs
}
