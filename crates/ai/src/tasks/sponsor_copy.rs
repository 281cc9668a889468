//! Sponsor tile copy variants (`SPONSOR_TILE_COPY`).

use serde::{Deserialize, Serialize};

use crate::registry::TaskType;
use crate::result::{AiError, ValidationError};
use crate::task::{AiTask, Prompt};

use super::{capitalize, clean_text, require_input_text, require_text, truncate_chars};

pub const HEADLINE_MAX: usize = 60;
pub const BODY_MAX: usize = 160;
pub const CTA_MAX: usize = 24;
pub const MAX_VARIANTS: usize = 3;

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    #[default]
    Friendly,
    Professional,
    Urgent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SponsorCopyInput {
    pub sponsor_name: String,
    pub category: String,
    pub territory: String,
    #[serde(default)]
    pub offer: Option<String>,
    #[serde(default)]
    pub tone: Tone,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CopyVariant {
    pub headline: String,
    pub body: String,
    pub call_to_action: String,
}

impl CopyVariant {
    fn fitted(headline: &str, body: &str, call_to_action: &str) -> Self {
        Self {
            headline: truncate_chars(&clean_text(headline), HEADLINE_MAX),
            body: truncate_chars(&clean_text(body), BODY_MAX),
            call_to_action: truncate_chars(&clean_text(call_to_action), CTA_MAX),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SponsorCopyOutput {
    pub variants: Vec<CopyVariant>,
}

#[derive(Debug, Clone, Copy)]
pub struct SponsorTileCopyTask;

impl AiTask for SponsorTileCopyTask {
    type Input = SponsorCopyInput;
    type Output = SponsorCopyOutput;

    const TASK_TYPE: TaskType = TaskType::SponsorTileCopy;

    fn check_input(input: &Self::Input) -> Result<(), AiError> {
        require_input_text("sponsor_name", &input.sponsor_name)?;
        require_input_text("category", &input.category)?;
        require_input_text("territory", &input.territory)
    }

    fn prompt(input: &Self::Input) -> Prompt {
        Prompt::json_task(
            "You write short local advertising copy for sponsors on a home-services marketplace.",
            &format!(
                "Write up to {MAX_VARIANTS} tile variants. Headline at most {HEADLINE_MAX} characters, \
                 body at most {BODY_MAX}, call to action at most {CTA_MAX}. Mention the territory. \
                 Only use the offer if one is given."
            ),
            r#"{"variants": [{"headline": string, "body": string, "call_to_action": string}]}"#,
            input,
        )
    }

    fn fallback(input: &Self::Input) -> Self::Output {
        let sponsor = clean_text(&input.sponsor_name);
        let category = clean_text(&input.category).to_lowercase();
        let territory = clean_text(&input.territory);
        let offer = input
            .offer
            .as_deref()
            .map(clean_text)
            .filter(|o| !o.is_empty());

        let offer_line = offer
            .as_ref()
            .map(|o| format!(" {}.", capitalize(o).trim_end_matches('.')))
            .unwrap_or_default();

        let (cta_primary, cta_secondary) = match input.tone {
            Tone::Friendly => ("Book today", "Say hello"),
            Tone::Professional => ("Request a quote", "Learn more"),
            Tone::Urgent => ("Book now", "Get help now"),
        };

        let variants = vec![
            CopyVariant::fitted(
                &format!("{sponsor}: {category} in {territory}"),
                &format!("Trusted {category} pros serving {territory}.{offer_line}"),
                cta_primary,
            ),
            CopyVariant::fitted(
                &format!("{territory}'s {category} specialists"),
                &format!("{sponsor} handles {category} jobs big and small.{offer_line}"),
                cta_secondary,
            ),
            CopyVariant::fitted(
                &match &offer {
                    Some(o) => capitalize(o),
                    None => format!("Need {category} help?"),
                },
                &format!("Local {category} service from {sponsor}, right here in {territory}."),
                cta_primary,
            ),
        ];

        SponsorCopyOutput { variants }
    }

    fn validate(output: Self::Output, _input: &Self::Input) -> Result<Self::Output, ValidationError> {
        if output.variants.is_empty() {
            return Err(ValidationError::new("no copy variants returned"));
        }
        let variants = output
            .variants
            .into_iter()
            .take(MAX_VARIANTS)
            .map(|v| {
                Ok(CopyVariant::fitted(
                    &require_text("headline", &v.headline)?,
                    &require_text("body", &v.body)?,
                    &require_text("call_to_action", &v.call_to_action)?,
                ))
            })
            .collect::<Result<Vec<_>, ValidationError>>()?;
        Ok(SponsorCopyOutput { variants })
    }
}
