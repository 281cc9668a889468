//! Intake follow-up questions for new service requests (`INTAKE_FOLLOWUP_QUESTIONS`).
//!
//! The fallback draws from a per-category question bank, then adds photo,
//! urgency and property-type prompts for whatever the customer left out.

use serde::{Deserialize, Serialize};

use crate::registry::TaskType;
use crate::result::{AiError, ValidationError};
use crate::task::{AiTask, Prompt};

use super::{ServiceCategory, clean_list, clean_text, require_input_text, require_text, truncate_chars};

pub const MAX_QUESTIONS: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntakeFollowupInput {
    pub service_category: String,
    pub description: String,
    #[serde(default)]
    pub has_photos: bool,
    #[serde(default)]
    pub urgency: Option<String>,
    #[serde(default)]
    pub property_type: Option<String>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    FreeText,
    YesNo,
    SingleChoice,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FollowupQuestion {
    #[serde(default)]
    pub id: String,
    pub question: String,
    pub kind: QuestionKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntakeFollowupOutput {
    pub questions: Vec<FollowupQuestion>,
}

fn free_text(id: &str, question: &str) -> FollowupQuestion {
    FollowupQuestion {
        id: id.to_string(),
        question: question.to_string(),
        kind: QuestionKind::FreeText,
        options: Vec::new(),
    }
}

fn yes_no(id: &str, question: &str) -> FollowupQuestion {
    FollowupQuestion {
        id: id.to_string(),
        question: question.to_string(),
        kind: QuestionKind::YesNo,
        options: Vec::new(),
    }
}

fn choice(id: &str, question: &str, options: &[&str]) -> FollowupQuestion {
    FollowupQuestion {
        id: id.to_string(),
        question: question.to_string(),
        kind: QuestionKind::SingleChoice,
        options: options.iter().map(|o| o.to_string()).collect(),
    }
}

fn question_bank(category: ServiceCategory) -> Vec<FollowupQuestion> {
    match category {
        ServiceCategory::Plumbing => vec![
            free_text("leak_location", "Where exactly is the leak or clog?"),
            yes_no("water_shutoff", "Have you been able to shut off the water supply?"),
        ],
        ServiceCategory::Electrical => vec![
            yes_no("breaker_tripped", "Has a breaker tripped or a fuse blown?"),
            free_text("affected_area", "Which rooms or outlets are affected?"),
        ],
        ServiceCategory::Hvac => vec![
            choice(
                "system_type",
                "What type of system do you have?",
                &["Central air", "Heat pump", "Furnace", "Mini-split", "Not sure"],
            ),
            choice(
                "system_age",
                "Roughly how old is the system?",
                &["Under 5 years", "5-10 years", "Over 10 years", "Not sure"],
            ),
        ],
        ServiceCategory::Roofing => vec![
            choice(
                "roof_material",
                "What is the roof made of?",
                &["Asphalt shingle", "Metal", "Tile", "Flat / membrane", "Not sure"],
            ),
            yes_no("active_leak", "Is water coming inside right now?"),
        ],
        ServiceCategory::Appliance => vec![
            free_text("appliance_make", "What is the make and model of the appliance?"),
            free_text("error_code", "Is the appliance showing an error code? If so, which one?"),
        ],
        ServiceCategory::General => vec![
            free_text("problem_start", "When did you first notice the problem?"),
            yes_no("previous_repairs", "Has anyone tried to repair this before?"),
        ],
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().is_none_or(|v| v.trim().is_empty())
}

/// Lowercase slug of `text`, at most 40 chars.
fn slug(text: &str) -> String {
    let mut out = String::new();
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.is_empty() && !out.ends_with('_') {
            out.push('_');
        }
        if out.len() >= 40 {
            break;
        }
    }
    out.trim_end_matches('_').to_string()
}

#[derive(Debug, Clone, Copy)]
pub struct IntakeFollowupTask;

impl AiTask for IntakeFollowupTask {
    type Input = IntakeFollowupInput;
    type Output = IntakeFollowupOutput;

    const TASK_TYPE: TaskType = TaskType::IntakeFollowupQuestions;

    fn check_input(input: &Self::Input) -> Result<(), AiError> {
        require_input_text("service_category", &input.service_category)
    }

    fn prompt(input: &Self::Input) -> Prompt {
        Prompt::json_task(
            "You help homeowners describe maintenance problems so providers can quote accurately.",
            &format!(
                "Ask at most {MAX_QUESTIONS} short follow-up questions that would most change the quote. \
                 Do not ask about anything the description already answers. single_choice questions \
                 need at least two options."
            ),
            r#"{"questions": [{"id": string, "question": string,
 "kind": "free_text"|"yes_no"|"single_choice", "options": [string]}]}"#,
            input,
        )
    }

    fn fallback(input: &Self::Input) -> Self::Output {
        let mut questions = question_bank(ServiceCategory::classify(&input.service_category));

        if !input.has_photos {
            questions.push(yes_no(
                "photos",
                "Can you upload a photo or two of the problem area?",
            ));
        }
        if is_blank(&input.urgency) {
            questions.push(choice(
                "urgency",
                "How soon do you need someone?",
                &["Emergency (today)", "Within a few days", "Flexible"],
            ));
        }
        if is_blank(&input.property_type) {
            questions.push(choice(
                "property_type",
                "What type of property is this?",
                &["House", "Apartment / condo", "Townhouse", "Commercial"],
            ));
        }

        questions.truncate(MAX_QUESTIONS);
        IntakeFollowupOutput { questions }
    }

    fn validate(output: Self::Output, _input: &Self::Input) -> Result<Self::Output, ValidationError> {
        let mut questions: Vec<FollowupQuestion> = Vec::new();
        for (i, q) in output.questions.into_iter().take(MAX_QUESTIONS).enumerate() {
            let text = truncate_chars(&require_text("question", &q.question)?, 200);
            let options = match q.kind {
                QuestionKind::SingleChoice => {
                    let options = clean_list(q.options, 8);
                    if options.len() < 2 {
                        return Err(ValidationError::new(format!(
                            "single_choice question {i} has fewer than two options"
                        )));
                    }
                    options
                }
                QuestionKind::FreeText | QuestionKind::YesNo => Vec::new(),
            };

            let mut id = slug(&clean_text(&q.id));
            if id.is_empty() {
                id = slug(&text);
            }
            let mut n = i + 1;
            while id.is_empty() || questions.iter().any(|existing| existing.id == id) {
                id = format!("q{n}");
                n += 1;
            }

            questions.push(FollowupQuestion {
                id,
                question: text,
                kind: q.kind,
                options,
            });
        }
        if questions.is_empty() {
            return Err(ValidationError::new("no questions returned"));
        }
        Ok(IntakeFollowupOutput { questions })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> IntakeFollowupInput {
        IntakeFollowupInput {
            service_category: "Plumbing".to_string(),
            description: "Kitchen sink drains slowly".to_string(),
            has_photos: false,
            urgency: None,
            property_type: Some("House".to_string()),
        }
    }

    fn ids(out: &IntakeFollowupOutput) -> Vec<&str> {
        out.questions.iter().map(|q| q.id.as_str()).collect()
    }

    #[test]
    fn plumbing_bank_plus_missing_details() {
        let out = IntakeFollowupTask::fallback(&input());
        assert_eq!(ids(&out), vec!["leak_location", "water_shutoff", "photos", "urgency"]);
    }

    #[test]
    fn never_more_than_five_questions() {
        let out = IntakeFollowupTask::fallback(&IntakeFollowupInput {
            service_category: "Roof repair".to_string(),
            property_type: Some("  ".to_string()),
            ..input()
        });
        assert_eq!(out.questions.len(), MAX_QUESTIONS);
        assert_eq!(out.questions[0].id, "roof_material");
        assert!(
            out.questions
                .iter()
                .filter(|q| q.kind == QuestionKind::SingleChoice)
                .all(|q| q.options.len() >= 2)
        );
    }

    #[test]
    fn complete_request_only_gets_bank_questions() {
        let out = IntakeFollowupTask::fallback(&IntakeFollowupInput {
            service_category: "Dishwasher".to_string(),
            has_photos: true,
            urgency: Some("flexible".to_string()),
            ..input()
        });
        assert_eq!(ids(&out), vec!["appliance_make", "error_code"]);
    }

    #[test]
    fn single_choice_without_options_is_rejected() {
        let out = IntakeFollowupOutput {
            questions: vec![FollowupQuestion {
                id: "x".to_string(),
                question: "Pick one".to_string(),
                kind: QuestionKind::SingleChoice,
                options: vec!["Only".to_string()],
            }],
        };
        assert!(IntakeFollowupTask::validate(out, &input()).is_err());
    }

    #[test]
    fn missing_and_duplicate_ids_are_generated() {
        let out = IntakeFollowupOutput {
            questions: vec![
                free_text("", "Where is the leak?"),
                free_text("where_is_the_leak", "Where is it exactly?"),
                yes_no("shutoff", "Water off?"),
            ],
        };
        let out = IntakeFollowupTask::validate(out, &input()).unwrap();
        assert_eq!(ids(&out), vec!["where_is_the_leak", "q2", "shutoff"]);
    }

    #[test]
    fn generated_ids_skip_ones_already_taken() {
        let out = IntakeFollowupOutput {
            questions: vec![
                free_text("q3", "Which room?"),
                free_text("a", "How old is the fixture?"),
                free_text("a", "Any recent repairs?"),
            ],
        };
        let out = IntakeFollowupTask::validate(out, &input()).unwrap();
        assert_eq!(ids(&out), vec!["q3", "a", "q4"]);
    }
}
