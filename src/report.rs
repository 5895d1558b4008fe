//! Rule outcomes and the report printed by the CLI.

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleClass {
    /// A MUST / SHALL NOT of the packaging rules.
    Requirement,
    /// A SHOULD.
    Recommendation,
}

impl fmt::Display for RuleClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleClass::Requirement => write!(f, "requirement"),
            RuleClass::Recommendation => write!(f, "recommendation"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Pass,
    Fail,
    /// The rule's precondition does not hold, so it was not evaluated.
    Inapplicable,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Pass => write!(f, "pass"),
            Outcome::Fail => write!(f, "FAIL"),
            Outcome::Inapplicable => write!(f, "n/a"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleReport {
    pub id: &'static str,
    pub class: RuleClass,
    pub outcome: Outcome,
    /// Empty on pass.
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub location: String,
    pub conformant: bool,
    pub rules: Vec<RuleReport>,
}

impl ValidationReport {
    pub fn new(location: impl Into<String>, rules: Vec<RuleReport>) -> Self {
        let conformant = rules.iter().all(|r| r.outcome != Outcome::Fail);
        Self {
            location: location.into(),
            conformant,
            rules,
        }
    }

    pub fn is_conformant(&self) -> bool {
        self.conformant
    }

    pub fn rule(&self, id: &str) -> Option<&RuleReport> {
        self.rules.iter().find(|r| r.id == id)
    }

    /// Failed requirements only; a report without any is still a valid archive.
    pub fn requirements_met(&self) -> bool {
        self.rules
            .iter()
            .all(|r| r.class == RuleClass::Recommendation || r.outcome != Outcome::Fail)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.location)?;
        writeln!(f, "{:<22}  {:<14}  {:<7}  Message", "Rule", "Class", "Outcome")?;
        writeln!(f, "{}", "-".repeat(70))?;
        for rule in &self.rules {
            writeln!(
                f,
                "{:<22}  {:<14}  {:<7}  {}",
                rule.id,
                rule.class.to_string(),
                rule.outcome.to_string(),
                rule.message
            )?;
        }
        writeln!(f, "{}", "-".repeat(70))?;
        let failed = self
            .rules
            .iter()
            .filter(|r| r.outcome == Outcome::Fail)
            .count();
        if self.conformant {
            write!(f, "conformant ({} rules)", self.rules.len())
        } else {
            write!(
                f,
                "not conformant ({failed} of {} rules failed)",
                self.rules.len()
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(id: &'static str, class: RuleClass, outcome: Outcome) -> RuleReport {
        RuleReport {
            id,
            class,
            outcome,
            message: String::new(),
        }
    }

    #[test]
    fn inapplicable_rules_do_not_break_conformance() {
        let report = ValidationReport::new(
            "a.ozx",
            vec![
                rule("req-no-multipart", RuleClass::Requirement, Outcome::Pass),
                rule("rec-zip64", RuleClass::Recommendation, Outcome::Inapplicable),
            ],
        );
        assert!(report.is_conformant());
        assert!(report.to_string().ends_with("conformant (2 rules)"));
    }

    #[test]
    fn failed_recommendation_keeps_requirements_met() {
        let report = ValidationReport::new(
            "a.zip",
            vec![
                rule("req-no-multipart", RuleClass::Requirement, Outcome::Pass),
                rule("rec-extension", RuleClass::Recommendation, Outcome::Fail),
            ],
        );
        assert!(!report.is_conformant());
        assert!(report.requirements_met());
        assert_eq!(report.rule("rec-extension").unwrap().outcome, Outcome::Fail);
    }

    #[test]
    fn json_uses_lowercase_outcomes() {
        let report = ValidationReport::new(
            "a.ozx",
            vec![rule("rec-zip64", RuleClass::Recommendation, Outcome::Inapplicable)],
        );
        let value: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(value["rules"][0]["outcome"], "inapplicable");
        assert_eq!(value["rules"][0]["class"], "recommendation");
        assert_eq!(value["conformant"], true);
    }
}
