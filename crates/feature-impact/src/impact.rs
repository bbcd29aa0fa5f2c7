//! Odds Ratio Ranking and Filtering

use crate::error::ImpactError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator between a preprocessing stage prefix and the column name
pub const STAGE_SEPARATOR: &str = "__";

/// Default odds-ratio cutoff for reporting a feature
pub const DEFAULT_IMPACT_THRESHOLD: f64 = 1.2;

/// Fitted weight for one expanded model input column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureCoefficient {
    pub feature_name: String,
    pub coefficient: f64,
}

impl FeatureCoefficient {
    pub fn new(feature_name: impl Into<String>, coefficient: f64) -> Self {
        Self {
            feature_name: feature_name.into(),
            coefficient,
        }
    }

    /// Convert to an odds ratio, stripping the stage prefix from the name
    pub fn to_impact(&self) -> FeatureImpact {
        FeatureImpact {
            feature_name: display_name(&self.feature_name).to_string(),
            odds_ratio: self.coefficient.exp(),
        }
    }
}

/// Multiplicative change in the odds of the outcome per unit of a feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImpact {
    pub feature_name: String,
    pub odds_ratio: f64,
}

/// Which side(s) of 1.0 count as impactful
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FilterPolicy {
    /// Keep `odds_ratio >= T` and `odds_ratio <= 1/T`
    #[default]
    TwoSided,
    /// Keep `odds_ratio >= T` only
    OneSided,
}

impl FilterPolicy {
    /// Whether an odds ratio passes this policy at the given threshold
    pub fn retains(&self, odds_ratio: f64, threshold: f64) -> bool {
        match self {
            FilterPolicy::TwoSided => odds_ratio >= threshold || odds_ratio <= 1.0 / threshold,
            FilterPolicy::OneSided => odds_ratio >= threshold,
        }
    }
}

/// Impactful features, descending by odds ratio
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ImpactReport {
    pub threshold: f64,
    pub policy: FilterPolicy,
    pub impacts: Vec<FeatureImpact>,
}

impl ImpactReport {
    pub fn len(&self) -> usize {
        self.impacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.impacts.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FeatureImpact> {
        self.impacts.iter()
    }
}

impl fmt::Display for ImpactReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const FEATURE: &str = "Feature";
        const ODDS: &str = "Odds Ratio";

        let ratios: Vec<String> = self
            .impacts
            .iter()
            .map(|i| format!("{:.4}", i.odds_ratio))
            .collect();
        let name_width = self
            .impacts
            .iter()
            .map(|i| i.feature_name.chars().count())
            .chain(std::iter::once(FEATURE.len()))
            .max()
            .unwrap_or(FEATURE.len());
        let ratio_width = ratios
            .iter()
            .map(String::len)
            .chain(std::iter::once(ODDS.len()))
            .max()
            .unwrap_or(ODDS.len());

        write!(f, "{:<name_width$}  {:>ratio_width$}", FEATURE, ODDS)?;
        for (impact, ratio) in self.impacts.iter().zip(&ratios) {
            write!(
                f,
                "\n{:<name_width$}  {:>ratio_width$}",
                impact.feature_name, ratio
            )?;
        }
        Ok(())
    }
}

/// Strip everything up to and including the first stage separator.
///
/// `"num__CNT_DAYS"` becomes `"CNT_DAYS"`; a name without a separator is
/// returned unchanged.
pub fn display_name(name: &str) -> &str {
    match name.split_once(STAGE_SEPARATOR) {
        Some((_, suffix)) => suffix,
        None => name,
    }
}

/// Ranks and filters fitted coefficients by odds ratio
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImpactExtractor {
    threshold: f64,
    policy: FilterPolicy,
}

impl ImpactExtractor {
    /// Create an extractor, rejecting thresholds that are not finite and positive
    pub fn new(threshold: f64, policy: FilterPolicy) -> Result<Self, ImpactError> {
        if !threshold.is_finite() || threshold <= 0.0 {
            return Err(ImpactError::InvalidThreshold(threshold));
        }
        Ok(Self { threshold, policy })
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn policy(&self) -> FilterPolicy {
        self.policy
    }

    /// Compute the impact report for positionally aligned names and coefficients
    pub fn extract<S: AsRef<str>>(
        &self,
        feature_names: &[S],
        coefficients: &[f64],
    ) -> Result<ImpactReport, ImpactError> {
        if feature_names.len() != coefficients.len() {
            return Err(ImpactError::ShapeMismatch {
                names: feature_names.len(),
                coefficients: coefficients.len(),
            });
        }

        let mut impacts: Vec<FeatureImpact> = feature_names
            .iter()
            .zip(coefficients)
            .map(|(name, &coefficient)| FeatureImpact {
                feature_name: display_name(name.as_ref()).to_string(),
                odds_ratio: coefficient.exp(),
            })
            .collect();

        // Stable: equal odds ratios keep input order
        impacts.sort_by(|a, b| b.odds_ratio.total_cmp(&a.odds_ratio));
        impacts.retain(|i| self.policy.retains(i.odds_ratio, self.threshold));

        Ok(ImpactReport {
            threshold: self.threshold,
            policy: self.policy,
            impacts,
        })
    }

    /// Same as [`extract`](Self::extract) for paired coefficients
    pub fn extract_pairs(
        &self,
        coefficients: &[FeatureCoefficient],
    ) -> Result<ImpactReport, ImpactError> {
        let names: Vec<&str> = coefficients
            .iter()
            .map(|c| c.feature_name.as_str())
            .collect();
        let weights: Vec<f64> = coefficients.iter().map(|c| c.coefficient).collect();
        self.extract(&names, &weights)
    }
}

impl Default for ImpactExtractor {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_IMPACT_THRESHOLD,
            policy: FilterPolicy::TwoSided,
        }
    }
}

/// Validate the threshold, then rank and filter in one call
pub fn extract_feature_impact<S: AsRef<str>>(
    feature_names: &[S],
    coefficients: &[f64],
    impact_threshold: f64,
    policy: FilterPolicy,
) -> Result<ImpactReport, ImpactError> {
    ImpactExtractor::new(impact_threshold, policy)?.extract(feature_names, coefficients)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_display_name_strips_first_prefix() {
        assert_eq!(display_name("num__A"), "A");
        assert_eq!(display_name("cat__B_x"), "B_x");
        assert_eq!(display_name("cat__PLATFORM__web"), "PLATFORM__web");
        assert_eq!(display_name("plain_name"), "plain_name");
        assert_eq!(display_name("__lead"), "lead");
    }

    #[test]
    fn test_two_sided_concrete_scenario() {
        let names = ["num__A", "cat__B_x"];
        let coefficients = [0.0, 2.0_f64.ln()];

        let report =
            extract_feature_impact(&names, &coefficients, 1.2, FilterPolicy::TwoSided).unwrap();

        assert_eq!(report.len(), 1);
        assert_eq!(report.impacts[0].feature_name, "B_x");
        assert!((report.impacts[0].odds_ratio - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_two_sided_keeps_strong_negative_drivers() {
        let names = ["num__up", "num__flat", "num__down"];
        let coefficients = [1.0, 0.01, -1.0];

        let report =
            extract_feature_impact(&names, &coefficients, 1.2, FilterPolicy::TwoSided).unwrap();

        let kept: Vec<&str> = report.iter().map(|i| i.feature_name.as_str()).collect();
        assert_eq!(kept, vec!["up", "down"]);
    }

    #[test]
    fn test_one_sided_drops_negative_drivers() {
        let names = ["num__up", "num__down"];
        let coefficients = [1.0, -1.0];

        let report =
            extract_feature_impact(&names, &coefficients, 1.2, FilterPolicy::OneSided).unwrap();

        assert_eq!(report.len(), 1);
        assert_eq!(report.impacts[0].feature_name, "up");
    }

    #[test]
    fn test_threshold_boundaries_are_inclusive() {
        let t: f64 = 1.25;
        let policy = FilterPolicy::TwoSided;
        assert!(policy.retains(t, t));
        assert!(policy.retains(1.0 / t, t));
        assert!(!policy.retains(1.0, t));
        assert!(!policy.retains(1.2, t));

        // exp(0.5) is computed the same way on both sides
        let t = 0.5_f64.exp();
        let extractor = ImpactExtractor::new(t, policy).unwrap();
        let report = extractor
            .extract(&["at_t", "between", "below"], &[0.5, 0.1, -5.0])
            .unwrap();
        let kept: Vec<&str> = report.iter().map(|i| i.feature_name.as_str()).collect();
        assert_eq!(kept, vec!["at_t", "below"]);
    }

    #[test]
    fn test_shape_mismatch() {
        let names = ["a", "b", "c", "d", "e"];
        let coefficients = [0.1, 0.2, 0.3, 0.4];

        let err = extract_feature_impact(&names, &coefficients, 1.2, FilterPolicy::TwoSided)
            .unwrap_err();
        assert_eq!(
            err,
            ImpactError::ShapeMismatch {
                names: 5,
                coefficients: 4
            }
        );
    }

    #[test]
    fn test_invalid_threshold() {
        for t in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let result = extract_feature_impact(&["a"], &[1.0], t, FilterPolicy::TwoSided);
            assert!(matches!(result, Err(ImpactError::InvalidThreshold(_))));
        }
        let empty: [&str; 0] = [];
        assert!(extract_feature_impact(&empty, &[], 0.0, FilterPolicy::OneSided).is_err());
    }

    #[test]
    fn test_empty_input() {
        let empty: [&str; 0] = [];
        let report = ImpactExtractor::default().extract(&empty, &[]).unwrap();
        assert!(report.is_empty());
    }

    #[test]
    fn test_overflow_is_impactful() {
        let report = ImpactExtractor::default()
            .extract(&["num__huge", "num__tiny"], &[1000.0, -1000.0])
            .unwrap();
        assert_eq!(report.len(), 2);
        assert!(report.impacts[0].odds_ratio.is_infinite());
        assert_eq!(report.impacts[1].feature_name, "tiny");
    }

    #[test]
    fn test_ties_keep_input_order() {
        let names = ["num__first", "num__second", "num__third"];
        let report = ImpactExtractor::default()
            .extract(&names, &[0.5, 0.5, 0.5])
            .unwrap();
        let kept: Vec<&str> = report.iter().map(|i| i.feature_name.as_str()).collect();
        assert_eq!(kept, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_extract_pairs_matches_extract() {
        let pairs = vec![
            FeatureCoefficient::new("num__A", 0.7),
            FeatureCoefficient::new("cat__B_x", -0.9),
        ];
        let extractor = ImpactExtractor::default();
        let from_pairs = extractor.extract_pairs(&pairs).unwrap();
        let direct = extractor
            .extract(&["num__A", "cat__B_x"], &[0.7, -0.9])
            .unwrap();
        assert_eq!(from_pairs, direct);
        assert_eq!(pairs[0].to_impact().feature_name, "A");
    }

    #[test]
    fn test_report_table_layout() {
        let report = ImpactExtractor::default()
            .extract(&["num__LONG_FEATURE_NAME", "cat__B_x"], &[2.0_f64.ln(), 0.0])
            .unwrap();
        let table = report.to_string();
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("Feature"));
        assert!(lines[0].ends_with("Odds Ratio"));
        assert!(lines[1].starts_with("LONG_FEATURE_NAME"));
        assert!(lines[1].ends_with("2.0000"));
    }

    #[test]
    fn test_report_table_aligns_non_ascii_names() {
        let report = ImpactExtractor::default()
            .extract(
                &["cat__COUNTRY_Côte_d’Ivoire", "cat__COUNTRY_Sverige"],
                &[3.0_f64.ln(), 2.0_f64.ln()],
            )
            .unwrap();
        let table = report.to_string();
        let widths: Vec<usize> = table.lines().map(|l| l.chars().count()).collect();
        assert_eq!(widths.len(), 3);
        assert!(widths.iter().all(|&w| w == widths[0]), "{table}");
    }

    #[test]
    fn test_report_serializes() {
        let report = ImpactExtractor::default()
            .extract(&["num__A"], &[1.0])
            .unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["policy"], "TwoSided");
        assert_eq!(json["impacts"][0]["feature_name"], "A");
    }

    proptest! {
        #[test]
        fn prop_odds_ratio_positive(c in -700.0f64..700.0) {
            prop_assert!(FeatureCoefficient::new("x", c).to_impact().odds_ratio > 0.0);
        }

        #[test]
        fn prop_output_sorted_and_never_longer(
            coefficients in proptest::collection::vec(-10.0f64..10.0, 0..40),
            threshold in 1.0001f64..5.0,
        ) {
            let names: Vec<String> = (0..coefficients.len()).map(|i| format!("num__f{i}")).collect();
            let report = extract_feature_impact(&names, &coefficients, threshold, FilterPolicy::TwoSided).unwrap();

            prop_assert!(report.len() <= coefficients.len());
            for pair in report.impacts.windows(2) {
                prop_assert!(pair[0].odds_ratio >= pair[1].odds_ratio);
            }
            for impact in report.iter() {
                prop_assert!(impact.odds_ratio >= threshold || impact.odds_ratio <= 1.0 / threshold);
            }
        }

        #[test]
        fn prop_deterministic(
            coefficients in proptest::collection::vec(-3.0f64..3.0, 0..20),
        ) {
            let names: Vec<String> = (0..coefficients.len()).map(|i| format!("cat__c_{}", i % 3)).collect();
            let extractor = ImpactExtractor::default();
            prop_assert_eq!(
                extractor.extract(&names, &coefficients).unwrap(),
                extractor.extract(&names, &coefficients).unwrap()
            );
        }

        #[test]
        fn prop_length_mismatch_always_errors(n in 0usize..20, extra in 1usize..5) {
            let names: Vec<String> = (0..n + extra).map(|i| format!("f{i}")).collect();
            let coefficients = vec![0.5; n];
            let result = ImpactExtractor::default().extract(&names, &coefficients);
            prop_assert!(matches!(result, Err(ImpactError::ShapeMismatch { .. })), "expected shape mismatch");
        }
    }
}
