//! CRM copilot next-best-action suggestions (`CRM_NEXT_BEST_ACTION`).

use serde::{Deserialize, Serialize};

use crate::registry::TaskType;
use crate::result::{AiError, ValidationError};
use crate::task::{AiTask, Prompt};

use super::{format_cents, require_input_text, require_text, truncate_chars};

pub const MAX_SUGGESTIONS: usize = 5;
const HIGH_VALUE_CENTS: i64 = 200_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrmNextActionInput {
    pub customer_id: String,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub days_since_last_booking: Option<u32>,
    #[serde(default)]
    pub total_bookings: u32,
    #[serde(default)]
    pub open_requests: u32,
    #[serde(default)]
    pub days_since_last_contact: Option<u32>,
    #[serde(default)]
    pub lifetime_value_cents: i64,
    #[serde(default)]
    pub has_membership: bool,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Call,
    Email,
    Sms,
    OfferDiscount,
    ScheduleMaintenance,
    MembershipOffer,
    FollowUpRequest,
    NoAction,
}

/// Ordered so that `High` sorts first.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionSuggestion {
    pub action: ActionKind,
    pub priority: Priority,
    pub title: String,
    pub rationale: String,
}

impl ActionSuggestion {
    fn new(action: ActionKind, priority: Priority, title: &str, rationale: String) -> Self {
        Self {
            action,
            priority,
            title: title.to_string(),
            rationale,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrmNextActionOutput {
    pub suggestions: Vec<ActionSuggestion>,
}

#[derive(Debug, Clone, Copy)]
pub struct CrmNextBestActionTask;

impl AiTask for CrmNextBestActionTask {
    type Input = CrmNextActionInput;
    type Output = CrmNextActionOutput;

    const TASK_TYPE: TaskType = TaskType::CrmNextBestAction;

    fn check_input(input: &Self::Input) -> Result<(), AiError> {
        require_input_text("customer_id", &input.customer_id)?;
        if input.lifetime_value_cents < 0 {
            return Err(AiError::invalid_input("lifetime_value_cents must be >= 0"));
        }
        Ok(())
    }

    fn prompt(input: &Self::Input) -> Prompt {
        Prompt::json_task(
            "You are a CRM assistant for a home-maintenance marketplace.",
            "Suggest up to five next-best actions for this customer, most important first. \
             Each suggestion needs a short title and a one-sentence rationale that cites the data.",
            r#"{"suggestions": [{"action": "call"|"email"|"sms"|"offer_discount"|"schedule_maintenance"|
 "membership_offer"|"follow_up_request"|"no_action", "priority": "high"|"medium"|"low",
 "title": string, "rationale": string}]}"#,
            input,
        )
    }

    fn fallback(input: &Self::Input) -> Self::Output {
        let mut suggestions = Vec::new();

        if input.open_requests > 0 {
            suggestions.push(ActionSuggestion::new(
                ActionKind::FollowUpRequest,
                Priority::High,
                "Follow up on open request",
                format!(
                    "{} service request(s) are still open; confirm a provider is assigned.",
                    input.open_requests
                ),
            ));
        }

        if input.total_bookings == 0 {
            suggestions.push(ActionSuggestion::new(
                ActionKind::Email,
                Priority::Medium,
                "Send welcome email",
                "Customer has not booked yet; introduce popular services.".to_string(),
            ));
        } else if let Some(days) = input.days_since_last_booking {
            if days >= 180 {
                suggestions.push(ActionSuggestion::new(
                    ActionKind::OfferDiscount,
                    Priority::High,
                    "Win back with a discount",
                    format!("Last booking was {days} days ago; the customer is at risk of churning."),
                ));
            } else if days >= 90 {
                suggestions.push(ActionSuggestion::new(
                    ActionKind::ScheduleMaintenance,
                    Priority::Medium,
                    "Suggest seasonal maintenance",
                    format!("Last booking was {days} days ago; a maintenance visit is likely due."),
                ));
            }
        }

        if !input.has_membership && input.total_bookings >= 3 {
            suggestions.push(ActionSuggestion::new(
                ActionKind::MembershipOffer,
                Priority::Medium,
                "Offer a membership",
                format!(
                    "{} bookings without a membership; recurring savings should appeal.",
                    input.total_bookings
                ),
            ));
        }

        let contact_stale = input.days_since_last_contact.is_none_or(|d| d >= 30);
        if input.lifetime_value_cents >= HIGH_VALUE_CENTS && contact_stale {
            suggestions.push(ActionSuggestion::new(
                ActionKind::Call,
                Priority::High,
                "Personal check-in call",
                format!(
                    "High-value customer ({} lifetime) has not been contacted recently.",
                    format_cents(input.lifetime_value_cents)
                ),
            ));
        }

        if suggestions.is_empty() {
            suggestions.push(ActionSuggestion::new(
                ActionKind::NoAction,
                Priority::Low,
                "No action needed",
                "Customer is active and recently engaged.".to_string(),
            ));
        }

        // stable sort keeps rule order within a priority
        suggestions.sort_by_key(|s| s.priority);
        suggestions.truncate(MAX_SUGGESTIONS);
        CrmNextActionOutput { suggestions }
    }

    fn validate(output: Self::Output, _input: &Self::Input) -> Result<Self::Output, ValidationError> {
        if output.suggestions.is_empty() {
            return Err(ValidationError::new("no suggestions returned"));
        }
        let mut suggestions = output
            .suggestions
            .into_iter()
            .take(MAX_SUGGESTIONS)
            .map(|s| {
                Ok(ActionSuggestion {
                    action: s.action,
                    priority: s.priority,
                    title: truncate_chars(&require_text("title", &s.title)?, 80),
                    rationale: truncate_chars(&require_text("rationale", &s.rationale)?, 300),
                })
            })
            .collect::<Result<Vec<_>, ValidationError>>()?;
        suggestions.sort_by_key(|s| s.priority);
        Ok(CrmNextActionOutput { suggestions })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> CrmNextActionInput {
        CrmNextActionInput {
            customer_id: "c_1".to_string(),
            customer_name: Some("Dana".to_string()),
            days_since_last_booking: Some(10),
            total_bookings: 1,
            open_requests: 0,
            days_since_last_contact: Some(5),
            lifetime_value_cents: 15_000,
            has_membership: false,
        }
    }

    fn kinds(out: &CrmNextActionOutput) -> Vec<ActionKind> {
        out.suggestions.iter().map(|s| s.action).collect()
    }

    #[test]
    fn engaged_customer_needs_nothing() {
        let out = CrmNextBestActionTask::fallback(&input());
        assert_eq!(kinds(&out), vec![ActionKind::NoAction]);
    }

    #[test]
    fn lapsed_loyal_customer_gets_prioritised_actions() {
        let out = CrmNextBestActionTask::fallback(&CrmNextActionInput {
            days_since_last_booking: Some(200),
            total_bookings: 6,
            open_requests: 1,
            days_since_last_contact: None,
            lifetime_value_cents: 450_000,
            ..input()
        });
        assert_eq!(
            kinds(&out),
            vec![
                ActionKind::FollowUpRequest,
                ActionKind::OfferDiscount,
                ActionKind::Call,
                ActionKind::MembershipOffer,
            ]
        );
        assert!(out.suggestions[2].rationale.contains("$4500.00"));
    }

    #[test]
    fn new_customer_gets_welcome_email() {
        let out = CrmNextBestActionTask::fallback(&CrmNextActionInput {
            days_since_last_booking: None,
            total_bookings: 0,
            ..input()
        });
        assert_eq!(kinds(&out), vec![ActionKind::Email]);
    }

    #[test]
    fn validation_rejects_blank_titles_and_sorts() {
        let blank = CrmNextActionOutput {
            suggestions: vec![ActionSuggestion::new(
                ActionKind::Call,
                Priority::High,
                "  ",
                "why".to_string(),
            )],
        };
        assert!(CrmNextBestActionTask::validate(blank, &input()).is_err());

        let unsorted = CrmNextActionOutput {
            suggestions: vec![
                ActionSuggestion::new(ActionKind::Email, Priority::Low, "Email", "r".to_string()),
                ActionSuggestion::new(ActionKind::Call, Priority::High, "Call", "r".to_string()),
            ],
        };
        let out = CrmNextBestActionTask::validate(unsorted, &input()).unwrap();
        assert_eq!(out.suggestions[0].action, ActionKind::Call);
    }

    #[test]
    fn empty_suggestions_fail_validation() {
        let out = CrmNextActionOutput { suggestions: vec![] };
        assert!(CrmNextBestActionTask::validate(out, &input()).is_err());
    }
}
