//! Plain-language invoice narrative (`INVOICE_NARRATIVE`).
//!
//! Money always comes from the input: the validator recomputes `total_cents`
//! and a model can only change wording.

use serde::{Deserialize, Serialize};

use crate::registry::TaskType;
use crate::result::{AiError, ValidationError};
use crate::task::{AiTask, Prompt};

use super::{clean_text, format_cents, require_input_text, require_text, truncate_chars};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceLineItem {
    pub description: String,
    pub quantity: f64,
    pub unit_price_cents: i64,
}

impl InvoiceLineItem {
    pub fn amount_cents(&self) -> i64 {
        (self.quantity * self.unit_price_cents as f64).round() as i64
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceNarrativeInput {
    pub invoice_id: String,
    pub line_items: Vec<InvoiceLineItem>,
    #[serde(default)]
    pub labor_hours: Option<f64>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl InvoiceNarrativeInput {
    pub fn total_cents(&self) -> i64 {
        self.line_items
            .iter()
            .fold(0_i64, |acc, item| acc.saturating_add(item.amount_cents()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineExplanation {
    pub description: String,
    pub explanation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceNarrativeOutput {
    pub narrative: String,
    pub line_explanations: Vec<LineExplanation>,
    pub total_cents: i64,
}

fn explain_line(item: &InvoiceLineItem) -> LineExplanation {
    let description = clean_text(&item.description);
    let explanation = if (item.quantity - 1.0).abs() < f64::EPSILON {
        format!("{description}: {}", format_cents(item.amount_cents()))
    } else {
        format!(
            "{description}: {} x {} = {}",
            item.quantity,
            format_cents(item.unit_price_cents),
            format_cents(item.amount_cents())
        )
    };
    LineExplanation {
        description,
        explanation,
    }
}

#[derive(Debug, Clone, Copy)]
pub struct InvoiceNarrativeTask;

impl AiTask for InvoiceNarrativeTask {
    type Input = InvoiceNarrativeInput;
    type Output = InvoiceNarrativeOutput;

    const TASK_TYPE: TaskType = TaskType::InvoiceNarrative;

    fn check_input(input: &Self::Input) -> Result<(), AiError> {
        require_input_text("invoice_id", &input.invoice_id)?;
        if input.line_items.is_empty() {
            return Err(AiError::invalid_input("line_items must not be empty"));
        }
        for (i, item) in input.line_items.iter().enumerate() {
            if !(item.quantity.is_finite() && item.quantity >= 0.0) {
                return Err(AiError::invalid_input(format!(
                    "line_items[{i}].quantity must be a non-negative number"
                )));
            }
            require_input_text(&format!("line_items[{i}].description"), &item.description)?;
        }
        if let Some(h) = input.labor_hours {
            if !(h.is_finite() && h >= 0.0) {
                return Err(AiError::invalid_input("labor_hours must be >= 0"));
            }
        }
        Ok(())
    }

    fn prompt(input: &Self::Input) -> Prompt {
        Prompt::json_task(
            "You explain home-repair invoices to homeowners in plain, friendly language.",
            "Write a short narrative of the work performed and one explanation per line item, \
             in the same order. Do not change any amounts; total_cents must equal the sum of the \
             line items.",
            r#"{"narrative": string, "line_explanations": [{"description": string, "explanation": string}],
 "total_cents": integer}"#,
            input,
        )
    }

    fn fallback(input: &Self::Input) -> Self::Output {
        let total_cents = input.total_cents();
        let mut narrative = format!(
            "This invoice covers {} item(s) totalling {}.",
            input.line_items.len(),
            format_cents(total_cents)
        );
        if let Some(hours) = input.labor_hours.filter(|h| *h > 0.0) {
            narrative.push_str(&format!(" Labor time was {hours} hour(s)."));
        }
        if let Some(notes) = input.notes.as_deref().map(clean_text).filter(|n| !n.is_empty()) {
            narrative.push_str(&format!(" Technician notes: {}", truncate_chars(&notes, 400)));
        }

        InvoiceNarrativeOutput {
            narrative,
            line_explanations: input.line_items.iter().map(explain_line).collect(),
            total_cents,
        }
    }

    fn validate(output: Self::Output, input: &Self::Input) -> Result<Self::Output, ValidationError> {
        let narrative = truncate_chars(&require_text("narrative", &output.narrative)?, 1200);

        let line_explanations = if output.line_explanations.len() == input.line_items.len()
            && output
                .line_explanations
                .iter()
                .all(|l| !l.explanation.trim().is_empty())
        {
            output
                .line_explanations
                .into_iter()
                .zip(&input.line_items)
                .map(|(l, item)| LineExplanation {
                    description: clean_text(&item.description),
                    explanation: truncate_chars(&clean_text(&l.explanation), 300),
                })
                .collect()
        } else {
            input.line_items.iter().map(explain_line).collect()
        };

        Ok(InvoiceNarrativeOutput {
            narrative,
            line_explanations,
            total_cents: input.total_cents(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> InvoiceNarrativeInput {
        InvoiceNarrativeInput {
            invoice_id: "inv_1".to_string(),
            line_items: vec![
                InvoiceLineItem {
                    description: "Service call".to_string(),
                    quantity: 1.0,
                    unit_price_cents: 8_900,
                },
                InvoiceLineItem {
                    description: "Labor".to_string(),
                    quantity: 1.5,
                    unit_price_cents: 9_500,
                },
            ],
            labor_hours: Some(1.5),
            notes: Some("Replaced wax ring.".to_string()),
        }
    }

    #[test]
    fn fallback_totals_and_explains_each_line() {
        let out = InvoiceNarrativeTask::fallback(&input());
        assert_eq!(out.total_cents, 8_900 + 14_250);
        assert_eq!(out.line_explanations.len(), 2);
        assert_eq!(out.line_explanations[0].explanation, "Service call: $89.00");
        assert_eq!(
            out.line_explanations[1].explanation,
            "Labor: 1.5 x $95.00 = $142.50"
        );
        assert!(out.narrative.contains("$231.50"));
        assert!(out.narrative.contains("Replaced wax ring."));
    }

    #[test]
    fn model_cannot_change_the_total() {
        let mut out = InvoiceNarrativeTask::fallback(&input());
        out.total_cents = 1;
        let out = InvoiceNarrativeTask::validate(out, &input()).unwrap();
        assert_eq!(out.total_cents, 23_150);
    }

    #[test]
    fn mismatched_explanations_are_regenerated() {
        let out = InvoiceNarrativeOutput {
            narrative: "We fixed the toilet.".to_string(),
            line_explanations: vec![LineExplanation {
                description: "x".to_string(),
                explanation: "only one".to_string(),
            }],
            total_cents: 0,
        };
        let out = InvoiceNarrativeTask::validate(out, &input()).unwrap();
        assert_eq!(out.line_explanations.len(), 2);
        assert_eq!(out.line_explanations[1].description, "Labor");
    }

    #[test]
    fn empty_invoice_is_rejected() {
        let bad = InvoiceNarrativeInput {
            line_items: vec![],
            ..input()
        };
        assert!(InvoiceNarrativeTask::check_input(&bad).is_err());
    }

    #[test]
    fn negative_quantity_is_rejected() {
        let mut bad = input();
        bad.line_items[1].quantity = -1.0;
        assert!(InvoiceNarrativeTask::check_input(&bad).is_err());
    }
}
