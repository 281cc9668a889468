//! Provider quality summary for admin triage (`PROVIDER_QUALITY_SUMMARY`).

use serde::{Deserialize, Serialize};

use crate::registry::TaskType;
use crate::result::{AiError, ValidationError};
use crate::task::{AiTask, Prompt};

use super::{clean_list, require_input_text, require_text, truncate_chars};

/// Reviews needed before the rating average is trusted.
const MIN_REVIEWS: u32 = 3;
/// Jobs needed before cancellation rate is meaningful.
const MIN_JOBS_FOR_RATES: u32 = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderQualityInput {
    pub provider_id: String,
    pub provider_name: String,
    #[serde(default)]
    pub avg_rating: Option<f64>,
    #[serde(default)]
    pub review_count: u32,
    #[serde(default)]
    pub completed_jobs: u32,
    #[serde(default)]
    pub cancelled_jobs: u32,
    #[serde(default)]
    pub dispute_count: u32,
    #[serde(default)]
    pub avg_response_hours: Option<f64>,
    /// Fraction of jobs started within the booked window, 0-1.
    #[serde(default)]
    pub on_time_rate: Option<f64>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityTier {
    Excellent,
    Good,
    NeedsAttention,
    AtRisk,
}

impl QualityTier {
    pub fn from_score(score: f64) -> Self {
        if score >= 85.0 {
            QualityTier::Excellent
        } else if score >= 70.0 {
            QualityTier::Good
        } else if score >= 50.0 {
            QualityTier::NeedsAttention
        } else {
            QualityTier::AtRisk
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            QualityTier::Excellent => "excellent",
            QualityTier::Good => "good",
            QualityTier::NeedsAttention => "needs attention",
            QualityTier::AtRisk => "at risk",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderQualityOutput {
    pub quality_score: f64,
    pub tier: QualityTier,
    pub summary: String,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub concerns: Vec<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct ProviderQualityTask;

impl AiTask for ProviderQualityTask {
    type Input = ProviderQualityInput;
    type Output = ProviderQualityOutput;

    const TASK_TYPE: TaskType = TaskType::ProviderQualitySummary;

    fn check_input(input: &Self::Input) -> Result<(), AiError> {
        require_input_text("provider_id", &input.provider_id)?;
        require_input_text("provider_name", &input.provider_name)?;
        if let Some(r) = input.avg_rating {
            if !(0.0..=5.0).contains(&r) {
                return Err(AiError::invalid_input("avg_rating must be within 0-5"));
            }
        }
        if let Some(r) = input.on_time_rate {
            if !(0.0..=1.0).contains(&r) {
                return Err(AiError::invalid_input("on_time_rate must be within 0-1"));
            }
        }
        if let Some(h) = input.avg_response_hours {
            if !(h.is_finite() && h >= 0.0) {
                return Err(AiError::invalid_input("avg_response_hours must be >= 0"));
            }
        }
        Ok(())
    }

    fn prompt(input: &Self::Input) -> Prompt {
        Prompt::json_task(
            "You review service-provider performance for a home-maintenance marketplace.",
            "Summarise this provider's quality for an admin deciding whether to intervene. \
             Score 0-100, list concrete strengths and concerns grounded in the metrics, and keep \
             the summary under 400 characters.",
            r#"{"quality_score": number 0-100, "tier": "excellent"|"good"|"needs_attention"|"at_risk",
 "summary": string, "strengths": [string], "concerns": [string]}"#,
            input,
        )
    }

    fn fallback(input: &Self::Input) -> Self::Output {
        let mut score = 50.0_f64;
        let mut strengths = Vec::new();
        let mut concerns = Vec::new();

        match input.avg_rating {
            Some(rating) if input.review_count >= MIN_REVIEWS => {
                score += (rating - 3.5) * 20.0;
                if rating >= 4.5 {
                    strengths.push(format!(
                        "High customer rating ({rating:.1} from {} reviews)",
                        input.review_count
                    ));
                } else if rating < 3.5 {
                    concerns.push(format!(
                        "Low customer rating ({rating:.1} from {} reviews)",
                        input.review_count
                    ));
                }
            }
            _ => concerns.push(format!(
                "Fewer than {MIN_REVIEWS} reviews; rating is not yet reliable"
            )),
        }

        let total_jobs = input.completed_jobs.saturating_add(input.cancelled_jobs);
        if total_jobs >= MIN_JOBS_FOR_RATES {
            let cancel_rate = f64::from(input.cancelled_jobs) / f64::from(total_jobs);
            if cancel_rate > 0.2 {
                score -= 20.0;
                concerns.push(format!(
                    "High cancellation rate ({:.0}% of {total_jobs} jobs)",
                    cancel_rate * 100.0
                ));
            } else if cancel_rate < 0.05 {
                score += 10.0;
                strengths.push("Rarely cancels booked jobs".to_string());
            }
        }

        if input.dispute_count > 0 {
            let dispute_rate = if input.completed_jobs == 0 {
                1.0
            } else {
                f64::from(input.dispute_count) / f64::from(input.completed_jobs)
            };
            if input.dispute_count >= 3 || dispute_rate > 0.1 {
                score -= 15.0;
                concerns.push(format!("{} customer dispute(s) on record", input.dispute_count));
            }
        } else if input.completed_jobs >= 10 {
            score += 5.0;
            strengths.push(format!("No disputes across {} completed jobs", input.completed_jobs));
        }

        if let Some(hours) = input.avg_response_hours {
            if hours <= 2.0 {
                score += 5.0;
                strengths.push(format!("Responds quickly (about {hours:.1}h on average)"));
            } else if hours > 24.0 {
                score -= 10.0;
                concerns.push(format!("Slow to respond (about {hours:.0}h on average)"));
            }
        }

        if let Some(rate) = input.on_time_rate {
            if rate >= 0.9 {
                score += 5.0;
                strengths.push(format!("On time for {:.0}% of jobs", rate * 100.0));
            } else if rate < 0.7 {
                score -= 10.0;
                concerns.push(format!("Late for {:.0}% of jobs", (1.0 - rate) * 100.0));
            }
        }

        let quality_score = score.clamp(0.0, 100.0).round();
        let tier = QualityTier::from_score(quality_score);

        let mut summary = format!(
            "{} scores {quality_score:.0}/100 ({}) across {} completed job(s).",
            input.provider_name.trim(),
            tier.label(),
            input.completed_jobs
        );
        if let Some(top) = concerns.first() {
            summary.push_str(&format!(" Main concern: {}.", top.to_lowercase()));
        } else if let Some(top) = strengths.first() {
            summary.push_str(&format!(" Standout: {}.", top.to_lowercase()));
        }

        ProviderQualityOutput {
            quality_score,
            tier,
            summary,
            strengths,
            concerns,
        }
    }

    fn validate(output: Self::Output, _input: &Self::Input) -> Result<Self::Output, ValidationError> {
        if !output.quality_score.is_finite() {
            return Err(ValidationError::new("quality_score is not a finite number"));
        }
        let quality_score = output.quality_score.clamp(0.0, 100.0).round();
        let summary = truncate_chars(&require_text("summary", &output.summary)?, 600);

        Ok(ProviderQualityOutput {
            quality_score,
            tier: QualityTier::from_score(quality_score),
            summary,
            strengths: clean_list(output.strengths, 5),
            concerns: clean_list(output.concerns, 5),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> ProviderQualityInput {
        ProviderQualityInput {
            provider_id: "p_1".to_string(),
            provider_name: "Acme Plumbing".to_string(),
            avg_rating: Some(4.8),
            review_count: 40,
            completed_jobs: 120,
            cancelled_jobs: 2,
            dispute_count: 0,
            avg_response_hours: Some(1.5),
            on_time_rate: Some(0.95),
        }
    }

    #[test]
    fn strong_provider_is_excellent() {
        let out = ProviderQualityTask::fallback(&input());
        // 50 + 26 + 10 + 5 + 5 + 5
        assert_eq!(out.quality_score, 100.0);
        assert_eq!(out.tier, QualityTier::Excellent);
        assert!(out.concerns.is_empty());
        assert_eq!(out.strengths.len(), 5);
        assert!(out.summary.starts_with("Acme Plumbing scores 100/100"));
    }

    #[test]
    fn troubled_provider_is_at_risk() {
        let out = ProviderQualityTask::fallback(&ProviderQualityInput {
            avg_rating: Some(2.5),
            review_count: 12,
            completed_jobs: 20,
            cancelled_jobs: 10,
            dispute_count: 4,
            avg_response_hours: Some(48.0),
            on_time_rate: Some(0.5),
            ..input()
        });
        assert_eq!(out.tier, QualityTier::AtRisk);
        assert_eq!(out.concerns.len(), 5);
        assert!(out.summary.contains("Main concern"));
    }

    #[test]
    fn new_provider_gets_a_neutral_score() {
        let out = ProviderQualityTask::fallback(&ProviderQualityInput {
            avg_rating: None,
            review_count: 0,
            completed_jobs: 0,
            cancelled_jobs: 0,
            avg_response_hours: None,
            on_time_rate: None,
            ..input()
        });
        assert_eq!(out.quality_score, 50.0);
        assert_eq!(out.tier, QualityTier::NeedsAttention);
        assert_eq!(out.concerns.len(), 1);
    }

    #[test]
    fn out_of_range_rating_is_rejected() {
        let bad = ProviderQualityInput {
            avg_rating: Some(7.0),
            ..input()
        };
        assert!(ProviderQualityTask::check_input(&bad).is_err());
    }

    #[test]
    fn validation_requires_summary() {
        let out = ProviderQualityOutput {
            quality_score: 80.0,
            tier: QualityTier::Good,
            summary: " ".to_string(),
            strengths: vec![],
            concerns: vec![],
        };
        assert!(ProviderQualityTask::validate(out, &input()).is_err());
    }
}
