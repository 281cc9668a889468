//! Static task registry.
//!
//! The set of tasks is closed: [`TaskType`] is the only way to name one, and the
//! registry table is indexed by its discriminant. String keys coming from JSON
//! callers are resolved once via [`TaskType::from_str`] / [`get_task_definition`].

use core::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::result::AiError;
use crate::task::AiTask;
use crate::tasks::{
    CrmNextBestActionTask, FraudSignalTask, IntakeFollowupTask, InvoiceNarrativeTask,
    ProviderBriefTask, ProviderQualityTask, SponsorTileCopyTask,
};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskType {
    FraudSignalReferrals,
    ProviderQualitySummary,
    CrmNextBestAction,
    SponsorTileCopy,
    IntakeFollowupQuestions,
    ProviderBriefGenerate,
    InvoiceNarrative,
}

impl TaskType {
    pub const ALL: [TaskType; 7] = [
        TaskType::FraudSignalReferrals,
        TaskType::ProviderQualitySummary,
        TaskType::CrmNextBestAction,
        TaskType::SponsorTileCopy,
        TaskType::IntakeFollowupQuestions,
        TaskType::ProviderBriefGenerate,
        TaskType::InvoiceNarrative,
    ];

    /// Wire key (also the persisted `task_type` column).
    pub const fn as_str(&self) -> &'static str {
        match self {
            TaskType::FraudSignalReferrals => "FRAUD_SIGNAL_REFERRALS",
            TaskType::ProviderQualitySummary => "PROVIDER_QUALITY_SUMMARY",
            TaskType::CrmNextBestAction => "CRM_NEXT_BEST_ACTION",
            TaskType::SponsorTileCopy => "SPONSOR_TILE_COPY",
            TaskType::IntakeFollowupQuestions => "INTAKE_FOLLOWUP_QUESTIONS",
            TaskType::ProviderBriefGenerate => "PROVIDER_BRIEF_GENERATE",
            TaskType::InvoiceNarrative => "INVOICE_NARRATIVE",
        }
    }

    pub const fn capability(&self) -> CapabilityGroup {
        match self {
            TaskType::FraudSignalReferrals | TaskType::ProviderQualitySummary => {
                CapabilityGroup::AdminTriage
            }
            TaskType::CrmNextBestAction => CapabilityGroup::CrmCopilot,
            TaskType::SponsorTileCopy => CapabilityGroup::SponsorCopy,
            TaskType::IntakeFollowupQuestions => CapabilityGroup::IntakeAssist,
            TaskType::ProviderBriefGenerate => CapabilityGroup::ProviderBrief,
            TaskType::InvoiceNarrative => CapabilityGroup::InvoiceAssist,
        }
    }

    pub fn definition(&self) -> &'static TaskDefinition {
        &REGISTRY[*self as usize]
    }
}

impl core::fmt::Display for TaskType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskType {
    type Err = AiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaskType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| AiError::UnknownTaskType(s.to_string()))
    }
}

/// A named group of related tasks switched by a single feature flag.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityGroup {
    AdminTriage,
    CrmCopilot,
    SponsorCopy,
    IntakeAssist,
    ProviderBrief,
    InvoiceAssist,
}

impl CapabilityGroup {
    pub const ALL: [CapabilityGroup; 6] = [
        CapabilityGroup::AdminTriage,
        CapabilityGroup::CrmCopilot,
        CapabilityGroup::SponsorCopy,
        CapabilityGroup::IntakeAssist,
        CapabilityGroup::ProviderBrief,
        CapabilityGroup::InvoiceAssist,
    ];

    pub const fn flag_key(&self) -> &'static str {
        match self {
            CapabilityGroup::AdminTriage => "ai_admin_triage_enabled",
            CapabilityGroup::CrmCopilot => "ai_crm_copilot_enabled",
            CapabilityGroup::SponsorCopy => "ai_sponsor_copy_enabled",
            CapabilityGroup::IntakeAssist => "ai_intake_assist_enabled",
            CapabilityGroup::ProviderBrief => "ai_provider_brief_enabled",
            CapabilityGroup::InvoiceAssist => "ai_invoice_narrative_enabled",
        }
    }

    pub fn tasks(&self) -> impl Iterator<Item = TaskType> + '_ {
        TaskType::ALL
            .into_iter()
            .filter(move |t| t.capability() == *self)
    }
}

type JsonFallbackFn = fn(&JsonValue) -> Result<JsonValue, AiError>;
type JsonCheckFn = fn(&JsonValue) -> Result<(), AiError>;

/// Type-erased view of a task for JSON callers.
pub struct TaskDefinition {
    pub task_type: TaskType,
    pub description: &'static str,
    fallback: JsonFallbackFn,
    validate_input: JsonCheckFn,
}

impl TaskDefinition {
    pub fn capability(&self) -> CapabilityGroup {
        self.task_type.capability()
    }

    pub fn flag_key(&self) -> &'static str {
        self.capability().flag_key()
    }

    /// Rule-based output for a JSON input.
    ///
    /// Fails only when `input` does not describe a well-formed task input.
    pub fn fallback(&self, input: &JsonValue) -> Result<JsonValue, AiError> {
        (self.fallback)(input)
    }

    pub fn validate_input(&self, input: &JsonValue) -> Result<(), AiError> {
        (self.validate_input)(input)
    }
}

impl core::fmt::Debug for TaskDefinition {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TaskDefinition")
            .field("task_type", &self.task_type)
            .field("capability", &self.capability())
            .field("description", &self.description)
            .finish()
    }
}

/// Look up a task by its wire key. `None` is a configuration error for the caller.
pub fn get_task_definition(task_type: &str) -> Option<&'static TaskDefinition> {
    task_type.parse::<TaskType>().ok().map(|t| t.definition())
}

/// Deserialize and check a JSON input for task `T`.
pub(crate) fn parse_input<T: AiTask>(input: &JsonValue) -> Result<T::Input, AiError> {
    let typed: T::Input = serde_json::from_value(input.clone())
        .map_err(|e| AiError::invalid_input(format!("{}: {e}", T::TASK_TYPE)))?;
    T::check_input(&typed)?;
    Ok(typed)
}

fn erased_fallback<T: AiTask>(input: &JsonValue) -> Result<JsonValue, AiError> {
    let typed = parse_input::<T>(input)?;
    serde_json::to_value(T::fallback(&typed))
        .map_err(|e| AiError::invalid_input(format!("{}: fallback output: {e}", T::TASK_TYPE)))
}

fn erased_check<T: AiTask>(input: &JsonValue) -> Result<(), AiError> {
    parse_input::<T>(input).map(|_| ())
}

macro_rules! define_task {
    ($task:ty, $description:literal) => {
        TaskDefinition {
            task_type: <$task as AiTask>::TASK_TYPE,
            description: $description,
            fallback: erased_fallback::<$task>,
            validate_input: erased_check::<$task>,
        }
    };
}

/// Indexed by `TaskType as usize`; order must follow the enum declaration.
static REGISTRY: [TaskDefinition; 7] = [
    define_task!(
        FraudSignalTask,
        "Score referral activity for fraud risk and recommend a payout action"
    ),
    define_task!(
        ProviderQualityTask,
        "Summarise a provider's service quality for admin review"
    ),
    define_task!(
        CrmNextBestActionTask,
        "Suggest the next CRM actions for a customer"
    ),
    define_task!(
        SponsorTileCopyTask,
        "Generate headline/body/CTA variants for a sponsor tile"
    ),
    define_task!(
        IntakeFollowupTask,
        "Ask follow-up questions about a new service request"
    ),
    define_task!(
        ProviderBriefTask,
        "Brief a provider on a service request before they quote"
    ),
    define_task!(
        InvoiceNarrativeTask,
        "Explain an invoice to the customer in plain language"
    ),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_is_indexed_by_task_type() {
        for task_type in TaskType::ALL {
            assert_eq!(task_type.definition().task_type, task_type);
        }
    }

    #[test]
    fn wire_keys_round_trip() {
        for task_type in TaskType::ALL {
            assert_eq!(task_type.as_str().parse::<TaskType>().unwrap(), task_type);
            let json = serde_json::to_string(&task_type).unwrap();
            assert_eq!(json, format!("\"{}\"", task_type.as_str()));
        }
    }

    #[test]
    fn unknown_task_type_is_a_configuration_error() {
        assert!(get_task_definition("NOT_REGISTERED").is_none());
        assert_eq!(
            "NOT_REGISTERED".parse::<TaskType>(),
            Err(AiError::UnknownTaskType("NOT_REGISTERED".to_string()))
        );
    }

    #[test]
    fn one_flag_gates_both_admin_triage_tasks() {
        let triage: Vec<_> = CapabilityGroup::AdminTriage.tasks().collect();
        assert_eq!(
            triage,
            vec![TaskType::FraudSignalReferrals, TaskType::ProviderQualitySummary]
        );
        assert_eq!(
            TaskType::FraudSignalReferrals.definition().flag_key(),
            "ai_admin_triage_enabled"
        );
    }

    #[test]
    fn every_capability_group_has_a_task() {
        for group in CapabilityGroup::ALL {
            assert!(group.tasks().next().is_some(), "{group:?} has no tasks");
        }
    }

    #[test]
    fn json_fallback_rejects_malformed_input() {
        let def = get_task_definition("FRAUD_SIGNAL_REFERRALS").unwrap();
        let err = def.fallback(&serde_json::json!({"nope": true})).unwrap_err();
        assert!(matches!(err, AiError::InvalidInput(_)));
    }

    #[test]
    fn json_fallback_produces_output_for_well_formed_input() {
        let def = get_task_definition("FRAUD_SIGNAL_REFERRALS").unwrap();
        let out = def
            .fallback(&serde_json::json!({
                "referrer_id": "u_1",
                "signups_last_24h": 50,
                "signups_last_7d": 50
            }))
            .unwrap();
        assert_eq!(out["risk_level"], "elevated");
    }
}
