use crate::error::CoreError;
use crate::models::{RiskAssessment, RiskFactor, RiskLevel};
use tracing::info;

/// Multi-factor risk scorer. Stateless: every call validates its inputs and
/// computes from scratch, so concurrent use needs no coordination.
///
/// Scores live on a `0..=matrix_size²` scale (default 5x5, so 0-25). Inherent
/// risk is the mean of `likelihood × impact` across factors; residual risk
/// discounts each factor by its control effectiveness before averaging.
#[derive(Debug, Clone)]
pub struct RiskScorer {
    matrix_size: u8,
}

impl RiskScorer {
    pub fn new(matrix_size: u8) -> Self {
        Self {
            matrix_size: matrix_size.max(2),
        }
    }

    fn max_score(&self) -> f64 {
        (self.matrix_size as f64) * (self.matrix_size as f64)
    }

    fn validate(&self, factors: &[RiskFactor]) -> Result<(), CoreError> {
        if factors.is_empty() {
            return Err(CoreError::EmptyRiskFactors);
        }
        let max = self.matrix_size;
        for f in factors {
            if f.likelihood < 1 || f.likelihood > max {
                return Err(CoreError::FactorOutOfRange {
                    name: f.name.clone(),
                    field: "likelihood",
                    value: f.likelihood as f64,
                });
            }
            if f.impact < 1 || f.impact > max {
                return Err(CoreError::FactorOutOfRange {
                    name: f.name.clone(),
                    field: "impact",
                    value: f.impact as f64,
                });
            }
            if !(0.0..=100.0).contains(&f.control_effectiveness) {
                return Err(CoreError::FactorOutOfRange {
                    name: f.name.clone(),
                    field: "control_effectiveness",
                    value: f.control_effectiveness,
                });
            }
        }
        Ok(())
    }

    pub fn assess_risk(
        &self,
        factors: &[RiskFactor],
        risk_id: &str,
        description: &str,
    ) -> Result<RiskAssessment, CoreError> {
        self.validate(factors)?;

        let raw_scores: Vec<f64> = factors
            .iter()
            .map(|f| (f.likelihood as f64) * (f.impact as f64))
            .collect();
        let residual_scores: Vec<f64> = factors
            .iter()
            .zip(&raw_scores)
            .map(|(f, raw)| raw * (1.0 - f.control_effectiveness / 100.0))
            .collect();

        let n = factors.len() as f64;
        let inherent_risk_score = raw_scores.iter().sum::<f64>() / n;
        let residual_risk_score = residual_scores.iter().sum::<f64>() / n;

        // Dominant driver: highest raw risk, first occurrence wins ties.
        let mut dominant = 0;
        for (i, raw) in raw_scores.iter().enumerate() {
            if *raw > raw_scores[dominant] {
                dominant = i;
            }
        }
        let category = factors[dominant].category.clone();

        let risk_level = self.classify(residual_risk_score);
        let recommendations = self.build_recommendations(factors, &raw_scores);

        info!(
            risk_id,
            inherent = inherent_risk_score,
            residual = residual_risk_score,
            level = risk_level.as_str(),
            "risk assessment complete"
        );

        Ok(RiskAssessment {
            risk_id: risk_id.to_string(),
            description: description.to_string(),
            category,
            inherent_risk_score,
            residual_risk_score,
            risk_level,
            recommendations,
            assessment_date: chrono::Utc::now().to_rfc3339(),
        })
    }

    /// Five equal-width bands over `0..=matrix_size²`, classified on the
    /// residual score.
    pub fn classify(&self, score: f64) -> RiskLevel {
        let band = self.max_score() / 5.0;
        if score < band {
            RiskLevel::Minimal
        } else if score < 2.0 * band {
            RiskLevel::Low
        } else if score < 3.0 * band {
            RiskLevel::Medium
        } else if score < 4.0 * band {
            RiskLevel::High
        } else {
            RiskLevel::Critical
        }
    }

    fn build_recommendations(&self, factors: &[RiskFactor], raw_scores: &[f64]) -> Vec<String> {
        let high_band_floor = 3.0 * self.max_score() / 5.0;
        let mut recs = Vec::new();
        for (f, raw) in factors.iter().zip(raw_scores) {
            if f.control_effectiveness < 50.0 && *raw >= high_band_floor {
                recs.push(format!(
                    "Strengthen controls for '{}': current measures ({}) mitigate only {:.0}% of a {:.0}-point {} risk",
                    f.name, f.current_controls, f.control_effectiveness, raw, f.category
                ));
            }
        }
        if recs.is_empty() {
            recs.push(
                "Risk is adequately mitigated; maintain current controls and review periodically"
                    .to_string(),
            );
        }
        recs
    }
}

impl Default for RiskScorer {
    fn default() -> Self {
        Self::new(5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn factor(name: &str, likelihood: u8, impact: u8, effectiveness: f64) -> RiskFactor {
        RiskFactor {
            name: name.to_string(),
            category: format!("{name}-category"),
            likelihood,
            impact,
            current_controls: "annual review".to_string(),
            control_effectiveness: effectiveness,
        }
    }

    #[test]
    fn single_factor_scores() {
        let scorer = RiskScorer::default();
        let assessment = scorer
            .assess_risk(&[factor("phishing", 3, 4, 50.0)], "R-1", "phishing exposure")
            .unwrap();
        assert_eq!(assessment.inherent_risk_score, 12.0);
        assert_eq!(assessment.residual_risk_score, 6.0);
        assert_eq!(assessment.risk_level, RiskLevel::Low);
    }

    #[test]
    fn mean_aggregation_across_factors() {
        let scorer = RiskScorer::default();
        let assessment = scorer
            .assess_risk(
                &[factor("a", 5, 5, 0.0), factor("b", 1, 1, 0.0)],
                "R-2",
                "mixed",
            )
            .unwrap();
        assert_eq!(assessment.inherent_risk_score, 13.0);
        assert_eq!(assessment.residual_risk_score, 13.0);
        assert_eq!(assessment.risk_level, RiskLevel::Medium);
    }

    #[test]
    fn category_is_dominant_factor_first_wins_ties() {
        let scorer = RiskScorer::default();
        let assessment = scorer
            .assess_risk(
                &[
                    factor("first", 4, 4, 10.0),
                    factor("second", 4, 4, 10.0),
                    factor("small", 1, 2, 10.0),
                ],
                "R-3",
                "tied",
            )
            .unwrap();
        assert_eq!(assessment.category, "first-category");
    }

    #[test]
    fn classification_bands() {
        let scorer = RiskScorer::default();
        assert_eq!(scorer.classify(0.0), RiskLevel::Minimal);
        assert_eq!(scorer.classify(4.9), RiskLevel::Minimal);
        assert_eq!(scorer.classify(5.0), RiskLevel::Low);
        assert_eq!(scorer.classify(12.0), RiskLevel::Medium);
        assert_eq!(scorer.classify(17.5), RiskLevel::High);
        assert_eq!(scorer.classify(25.0), RiskLevel::Critical);
    }

    #[test]
    fn empty_factors_rejected() {
        let scorer = RiskScorer::default();
        assert!(matches!(
            scorer.assess_risk(&[], "R-4", "none"),
            Err(CoreError::EmptyRiskFactors)
        ));
    }

    #[test]
    fn out_of_range_factors_rejected() {
        let scorer = RiskScorer::default();
        let err = scorer
            .assess_risk(&[factor("bad", 6, 3, 50.0)], "R-5", "bad likelihood")
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::FactorOutOfRange {
                field: "likelihood",
                ..
            }
        ));

        let err = scorer
            .assess_risk(&[factor("bad", 3, 0, 50.0)], "R-6", "bad impact")
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::FactorOutOfRange { field: "impact", .. }
        ));

        let err = scorer
            .assess_risk(&[factor("bad", 3, 3, 120.0)], "R-7", "bad effectiveness")
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::FactorOutOfRange {
                field: "control_effectiveness",
                ..
            }
        ));
    }

    #[test]
    fn weak_controls_on_high_risk_drive_recommendations() {
        let scorer = RiskScorer::default();
        let assessment = scorer
            .assess_risk(
                &[factor("ransomware", 4, 5, 20.0)],
                "R-8",
                "ransomware exposure",
            )
            .unwrap();
        assert!(assessment.recommendations[0].contains("ransomware"));
    }

    #[test]
    fn fully_mitigated_risk_still_gets_a_recommendation() {
        let scorer = RiskScorer::default();
        let assessment = scorer
            .assess_risk(&[factor("patched", 2, 2, 100.0)], "R-9", "patched systems")
            .unwrap();
        assert_eq!(assessment.residual_risk_score, 0.0);
        assert_eq!(assessment.risk_level, RiskLevel::Minimal);
        assert!(!assessment.recommendations.is_empty());
    }
}
