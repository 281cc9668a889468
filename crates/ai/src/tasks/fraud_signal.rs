//! Referral fraud-signal scoring (`FRAUD_SIGNAL_REFERRALS`).
//!
//! Fallback model: additive rule thresholds over signup velocity, device/IP
//! cluster matches, conversion rate and account age, capped at 100.

use serde::{Deserialize, Serialize};

use crate::registry::TaskType;
use crate::result::{AiError, ValidationError};
use crate::task::{AiTask, Prompt};

use super::{clean_list, require_input_text};

pub const HIGH_RISK_SCORE: f64 = 60.0;
pub const ELEVATED_RISK_SCORE: f64 = 30.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FraudSignalInput {
    pub referrer_id: String,
    #[serde(default)]
    pub referral_code: Option<String>,
    pub signups_last_24h: u32,
    pub signups_last_7d: u32,
    #[serde(default)]
    pub conversions_last_7d: u32,
    /// Signups sharing a device/IP fingerprint hash with the referrer or each other.
    #[serde(default)]
    pub cluster_hash_matches: u32,
    #[serde(default)]
    pub account_age_days: Option<u32>,
    #[serde(default)]
    pub self_referral_suspected: bool,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Elevated,
    High,
}

impl RiskLevel {
    pub fn from_score(score: f64) -> Self {
        if score >= HIGH_RISK_SCORE {
            RiskLevel::High
        } else if score >= ELEVATED_RISK_SCORE {
            RiskLevel::Elevated
        } else {
            RiskLevel::Low
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendedAction {
    Allow,
    Review,
    HoldPayouts,
}

impl From<RiskLevel> for RecommendedAction {
    fn from(level: RiskLevel) -> Self {
        match level {
            RiskLevel::Low => RecommendedAction::Allow,
            RiskLevel::Elevated => RecommendedAction::Review,
            RiskLevel::High => RecommendedAction::HoldPayouts,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FraudSignalOutput {
    /// 0-100, integral.
    pub risk_score: f64,
    pub risk_level: RiskLevel,
    pub reasons: Vec<String>,
    pub recommended_action: RecommendedAction,
}

#[derive(Debug, Clone, Copy)]
pub struct FraudSignalTask;

impl AiTask for FraudSignalTask {
    type Input = FraudSignalInput;
    type Output = FraudSignalOutput;

    const TASK_TYPE: TaskType = TaskType::FraudSignalReferrals;

    fn check_input(input: &Self::Input) -> Result<(), AiError> {
        require_input_text("referrer_id", &input.referrer_id)
    }

    fn prompt(input: &Self::Input) -> Prompt {
        Prompt::json_task(
            "You are a fraud analyst for a home-services referral program.",
            "Assess whether this referrer's recent activity looks like referral fraud \
             (fake signups, self-referrals, device farms). Score 0 (clean) to 100 (certain fraud). \
             Give short, factual reasons tied to the numbers.",
            r#"{"risk_score": number 0-100, "risk_level": "low"|"elevated"|"high",
 "reasons": [string, ...], "recommended_action": "allow"|"review"|"hold_payouts"}"#,
            input,
        )
    }

    fn fallback(input: &Self::Input) -> Self::Output {
        let mut score: u32 = 0;
        let mut reasons = Vec::new();

        let day = input.signups_last_24h;
        let velocity = match day {
            n if n >= 20 => 40,
            n if n >= 10 => 25,
            n if n >= 5 => 10,
            _ => 0,
        };
        if velocity > 0 {
            score += velocity;
            reasons.push(format!("{day} signups in the last 24 hours"));
        }

        let clusters = input.cluster_hash_matches;
        if clusters >= 3 {
            score += 30;
            reasons.push(format!("{clusters} signups share a device or network fingerprint"));
        } else if clusters >= 1 {
            score += 15;
            reasons.push(format!("{clusters} signup(s) share a device or network fingerprint"));
        }

        let week = input.signups_last_7d;
        if week >= 10 {
            let rate = f64::from(input.conversions_last_7d) / f64::from(week);
            if rate < 0.05 {
                score += 15;
                reasons.push(format!(
                    "only {} of {week} signups converted this week",
                    input.conversions_last_7d
                ));
            }
        }

        if let Some(age) = input.account_age_days {
            if age < 3 && day >= 5 {
                score += 10;
                reasons.push(format!("referrer account is {age} day(s) old"));
            }
        }

        if input.self_referral_suspected {
            score += 25;
            reasons.push("self-referral suspected".to_string());
        }

        let risk_score = f64::from(score.min(100));
        if reasons.is_empty() {
            reasons.push("no fraud thresholds exceeded".to_string());
        }

        let risk_level = RiskLevel::from_score(risk_score);
        FraudSignalOutput {
            risk_score,
            risk_level,
            reasons,
            recommended_action: risk_level.into(),
        }
    }

    fn validate(output: Self::Output, _input: &Self::Input) -> Result<Self::Output, ValidationError> {
        if !output.risk_score.is_finite() {
            return Err(ValidationError::new("risk_score is not a finite number"));
        }
        let risk_score = output.risk_score.clamp(0.0, 100.0).round();

        let reasons = clean_list(output.reasons, 8);
        if reasons.is_empty() {
            return Err(ValidationError::new("reasons is empty"));
        }

        // The action always follows the recomputed level.
        let risk_level = RiskLevel::from_score(risk_score);
        Ok(FraudSignalOutput {
            risk_score,
            risk_level,
            reasons,
            recommended_action: risk_level.into(),
        })
    }
}
