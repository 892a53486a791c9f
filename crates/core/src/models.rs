use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// One requirement within a compliance framework. Loaded by the (external)
/// framework loader and referenced during indexing; never mutated here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Control {
    pub control_id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub criticality: Criticality,
    pub status: String,
    /// Owning framework name, e.g. "ISO27001".
    pub framework: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Criticality {
    Low,
    Medium,
    High,
    Critical,
}

impl Criticality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Criticality::Low => "Low",
            Criticality::Medium => "Medium",
            Criticality::High => "High",
            Criticality::Critical => "Critical",
        }
    }
}

impl FromStr for Criticality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Low" => Ok(Criticality::Low),
            "Medium" => Ok(Criticality::Medium),
            "High" => Ok(Criticality::High),
            "Critical" => Ok(Criticality::Critical),
            other => Err(format!("unknown criticality: {other}")),
        }
    }
}

/// Gap severity, most severe first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "Critical",
            Severity::High => "High",
            Severity::Medium => "Medium",
            Severity::Low => "Low",
        }
    }

    /// One band more severe; Critical stays Critical.
    pub fn promoted(self) -> Severity {
        match self {
            Severity::Low => Severity::Medium,
            Severity::Medium => Severity::High,
            Severity::High => Severity::Critical,
            Severity::Critical => Severity::Critical,
        }
    }
}

/// One coverage finding: a control with insufficient policy evidence.
/// Lower confidence means weaker evidence of coverage, i.e. a worse gap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Gap {
    pub control_id: String,
    pub framework: String,
    pub requirement: String,
    pub current_state: String,
    pub severity: Severity,
    pub confidence: f32,
    pub recommendations: Vec<String>,
}

/// The two logical index collections. Caller-supplied strings are parsed
/// here so an invalid name is rejected before any retrieval runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Frameworks,
    Policies,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Frameworks => "frameworks",
            Collection::Policies => "policies",
        }
    }
}

impl FromStr for Collection {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "frameworks" => Ok(Collection::Frameworks),
            "policies" => Ok(Collection::Policies),
            other => Err(CoreError::InvalidCollection(other.to_string())),
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One raw hit from semantic search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub document: String,
    pub metadata: HashMap<String, String>,
    pub distance: f32,
}

/// Analyst-supplied input to risk scoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskFactor {
    pub name: String,
    pub category: String,
    /// 1..=matrix_size
    pub likelihood: u8,
    /// 1..=matrix_size
    pub impact: u8,
    pub current_controls: String,
    /// Percent, 0..=100.
    pub control_effectiveness: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    Critical,
    High,
    Medium,
    Low,
    Minimal,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Critical => "Critical",
            RiskLevel::High => "High",
            RiskLevel::Medium => "Medium",
            RiskLevel::Low => "Low",
            RiskLevel::Minimal => "Minimal",
        }
    }
}

/// Result of one `assess_risk` call. Immutable once produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub risk_id: String,
    pub description: String,
    pub category: String,
    pub inherent_risk_score: f64,
    pub residual_risk_score: f64,
    pub risk_level: RiskLevel,
    pub recommendations: Vec<String>,
    pub assessment_date: String,
}
