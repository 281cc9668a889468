//! Job brief for the assigned provider (`PROVIDER_BRIEF_GENERATE`).

use serde::{Deserialize, Serialize};

use crate::registry::TaskType;
use crate::result::{AiError, ValidationError};
use crate::task::{AiTask, Prompt};

use super::{
    ServiceCategory, capitalize, clean_list, clean_text, require_input_text, require_text,
    truncate_chars,
};

pub const SCOPE_MAX: usize = 280;
pub const MAX_DETAILS: usize = 8;
pub const MAX_MATERIALS: usize = 6;
/// Model estimates above this are discarded.
pub const MAX_DURATION_HOURS: f64 = 40.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntakeAnswer {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderBriefInput {
    pub request_id: String,
    pub service_category: String,
    pub description: String,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub urgency: Option<String>,
    #[serde(default)]
    pub preferred_window: Option<String>,
    #[serde(default)]
    pub photo_count: u32,
    #[serde(default)]
    pub answers: Vec<IntakeAnswer>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderBriefOutput {
    pub headline: String,
    pub scope_summary: String,
    #[serde(default)]
    pub key_details: Vec<String>,
    #[serde(default)]
    pub suggested_materials: Vec<String>,
    #[serde(default)]
    pub estimated_duration_hours: Option<f64>,
}

fn category_label(category: ServiceCategory) -> &'static str {
    match category {
        ServiceCategory::Plumbing => "Plumbing",
        ServiceCategory::Electrical => "Electrical",
        ServiceCategory::Hvac => "HVAC",
        ServiceCategory::Roofing => "Roofing",
        ServiceCategory::Appliance => "Appliance",
        ServiceCategory::General => "General maintenance",
    }
}

fn materials(category: ServiceCategory) -> &'static [&'static str] {
    match category {
        ServiceCategory::Plumbing => &["Pipe wrench", "Plumber's tape", "Replacement washers and fittings"],
        ServiceCategory::Electrical => &["Voltage tester", "Replacement breakers", "Wire nuts and connectors"],
        ServiceCategory::Hvac => &["Replacement filters", "Refrigerant gauges", "Capacitors"],
        ServiceCategory::Roofing => &["Roofing sealant", "Replacement shingles", "Flashing"],
        ServiceCategory::Appliance => &["Multimeter", "Common replacement parts for the model"],
        ServiceCategory::General => &["General hand tools"],
    }
}

fn typical_duration_hours(category: ServiceCategory) -> Option<f64> {
    match category {
        ServiceCategory::Plumbing | ServiceCategory::Electrical => Some(2.0),
        ServiceCategory::Hvac => Some(3.0),
        ServiceCategory::Roofing => Some(4.0),
        ServiceCategory::Appliance => Some(1.5),
        ServiceCategory::General => None,
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value.as_deref().map(clean_text).filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, Copy)]
pub struct ProviderBriefTask;

impl AiTask for ProviderBriefTask {
    type Input = ProviderBriefInput;
    type Output = ProviderBriefOutput;

    const TASK_TYPE: TaskType = TaskType::ProviderBriefGenerate;

    fn check_input(input: &Self::Input) -> Result<(), AiError> {
        require_input_text("request_id", &input.request_id)?;
        require_input_text("service_category", &input.service_category)?;
        require_input_text("description", &input.description)
    }

    fn prompt(input: &Self::Input) -> Prompt {
        Prompt::json_task(
            "You prepare job briefs for tradespeople on a home-maintenance marketplace.",
            "Write a brief the provider can read in 30 seconds before accepting the job. \
             Keep the scope summary under 280 characters. Only suggest materials the description \
             supports. Omit the duration estimate if you cannot judge it.",
            r#"{"headline": string, "scope_summary": string, "key_details": [string],
 "suggested_materials": [string], "estimated_duration_hours": number|null}"#,
            input,
        )
    }

    fn fallback(input: &Self::Input) -> Self::Output {
        let category = ServiceCategory::classify(&input.service_category);
        let headline = match non_blank(&input.city) {
            Some(city) => format!("{} request in {city}", category_label(category)),
            None => format!("{} request", category_label(category)),
        };

        let mut key_details: Vec<String> = input
            .answers
            .iter()
            .filter(|a| !a.answer.trim().is_empty())
            .map(|a| {
                format!(
                    "{}: {}",
                    clean_text(&a.question).trim_end_matches('?'),
                    clean_text(&a.answer)
                )
            })
            .collect();
        if input.photo_count > 0 {
            key_details.push(format!("{} photo(s) attached", input.photo_count));
        }
        if let Some(window) = non_blank(&input.preferred_window) {
            key_details.push(format!("Preferred window: {window}"));
        }
        if let Some(urgency) = non_blank(&input.urgency) {
            key_details.push(format!("Urgency: {}", capitalize(&urgency)));
        }

        ProviderBriefOutput {
            headline,
            scope_summary: truncate_chars(&capitalize(&clean_text(&input.description)), SCOPE_MAX),
            key_details: clean_list(key_details, MAX_DETAILS),
            suggested_materials: materials(category).iter().map(|m| m.to_string()).collect(),
            estimated_duration_hours: typical_duration_hours(category),
        }
    }

    fn validate(output: Self::Output, _input: &Self::Input) -> Result<Self::Output, ValidationError> {
        let estimated_duration_hours = output
            .estimated_duration_hours
            .filter(|h| h.is_finite() && *h > 0.0 && *h <= MAX_DURATION_HOURS)
            .map(|h| (h * 2.0).round() / 2.0);

        Ok(ProviderBriefOutput {
            headline: truncate_chars(&require_text("headline", &output.headline)?, 80),
            scope_summary: truncate_chars(
                &require_text("scope_summary", &output.scope_summary)?,
                SCOPE_MAX,
            ),
            key_details: clean_list(output.key_details, MAX_DETAILS),
            suggested_materials: clean_list(output.suggested_materials, MAX_MATERIALS),
            estimated_duration_hours,
        })
    }
}
