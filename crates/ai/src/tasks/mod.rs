//! Task contracts and their rule-based fallbacks.
//!
//! One module per task: input/output types, prompt, fallback heuristics, and
//! output validation. Fallbacks are pure functions of the input; they must
//! never panic for an input accepted by `check_input`.

pub mod crm_next_action;
pub mod fraud_signal;
pub mod intake_followup;
pub mod invoice_narrative;
pub mod provider_brief;
pub mod provider_quality;
pub mod sponsor_copy;

#[cfg(test)]
pub(crate) mod samples;

pub use crm_next_action::CrmNextBestActionTask;
pub use fraud_signal::FraudSignalTask;
pub use intake_followup::IntakeFollowupTask;
pub use invoice_narrative::InvoiceNarrativeTask;
pub use provider_brief::ProviderBriefTask;
pub use provider_quality::ProviderQualityTask;
pub use sponsor_copy::SponsorTileCopyTask;

use crate::result::{AiError, ValidationError};

/// Coarse service category derived from free-form category text.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum ServiceCategory {
    Plumbing,
    Electrical,
    Hvac,
    Roofing,
    Appliance,
    General,
}

impl ServiceCategory {
    pub(crate) fn classify(raw: &str) -> Self {
        let s = raw.to_lowercase();
        if s.contains("plumb") || s.contains("drain") || s.contains("water heater") {
            ServiceCategory::Plumbing
        } else if s.contains("electric") || s.contains("wiring") || s.contains("outlet") {
            ServiceCategory::Electrical
        } else if s.contains("hvac")
            || s.contains("heating")
            || s.contains("cooling")
            || s.contains("air condition")
            || s.contains("furnace")
        {
            ServiceCategory::Hvac
        } else if s.contains("roof") || s.contains("gutter") {
            ServiceCategory::Roofing
        } else if s.contains("appliance")
            || s.contains("washer")
            || s.contains("dryer")
            || s.contains("dishwasher")
            || s.contains("fridge")
            || s.contains("refrigerator")
        {
            ServiceCategory::Appliance
        } else {
            ServiceCategory::General
        }
    }
}

/// Trim and collapse internal whitespace.
pub(crate) fn clean_text(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Truncate to at most `max` chars on a char boundary, trimming trailing space.
pub(crate) fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    s.chars().take(max).collect::<String>().trim_end().to_string()
}

/// Cleaned, non-empty text or a validation error naming `field`.
pub(crate) fn require_text(field: &str, s: &str) -> Result<String, ValidationError> {
    let cleaned = clean_text(s);
    if cleaned.is_empty() {
        return Err(ValidationError::new(format!("{field} is empty")));
    }
    Ok(cleaned)
}

/// Clean every item, drop empties and case-insensitive duplicates, keep at most `max`.
pub(crate) fn clean_list(items: Vec<String>, max: usize) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(items.len().min(max));
    for item in items {
        let cleaned = clean_text(&item);
        if cleaned.is_empty() || out.iter().any(|o| o.eq_ignore_ascii_case(&cleaned)) {
            continue;
        }
        out.push(cleaned);
        if out.len() == max {
            break;
        }
    }
    out
}

pub(crate) fn require_input_text(field: &str, s: &str) -> Result<(), AiError> {
    if s.trim().is_empty() {
        return Err(AiError::invalid_input(format!("{field} must not be empty")));
    }
    Ok(())
}

/// Upper-case the first character.
pub(crate) fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `$1234.50` style formatting for integer cents.
pub(crate) fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{sign}${}.{:02}", abs / 100, abs % 100)
}
