//! Well-formed JSON inputs for every task type, shared by tests.

use serde_json::{Value as JsonValue, json};

use crate::registry::TaskType;

pub(crate) fn input_for(task_type: TaskType) -> JsonValue {
    match task_type {
        TaskType::FraudSignalReferrals => json!({
            "referrer_id": "u_42",
            "signups_last_24h": 12,
            "signups_last_7d": 30,
            "conversions_last_7d": 1,
            "cluster_hash_matches": 2,
        }),
        TaskType::ProviderQualitySummary => json!({
            "provider_id": "p_7",
            "provider_name": "Acme Plumbing",
            "avg_rating": 4.2,
            "review_count": 18,
            "completed_jobs": 40,
            "cancelled_jobs": 3,
            "dispute_count": 1,
            "avg_response_hours": 3.5,
            "on_time_rate": 0.88,
        }),
        TaskType::CrmNextBestAction => json!({
            "customer_id": "c_9",
            "days_since_last_booking": 120,
            "total_bookings": 4,
            "open_requests": 0,
            "lifetime_value_cents": 98_000,
            "has_membership": false,
        }),
        TaskType::SponsorTileCopy => json!({
            "sponsor_name": "Cool Breeze HVAC",
            "category": "HVAC",
            "territory": "Phoenix",
            "offer": "free filter with every tune-up",
            "tone": "friendly",
        }),
        TaskType::IntakeFollowupQuestions => json!({
            "service_category": "Electrical",
            "description": "Half the outlets in the kitchen stopped working",
            "has_photos": false,
        }),
        TaskType::ProviderBriefGenerate => json!({
            "request_id": "sr_3",
            "service_category": "Plumbing",
            "description": "Water heater is leaking from the bottom",
            "city": "Tulsa",
            "photo_count": 1,
            "answers": [
                { "question": "Have you been able to shut off the water supply?", "answer": "Yes" }
            ],
        }),
        TaskType::InvoiceNarrative => json!({
            "invoice_id": "inv_5",
            "line_items": [
                { "description": "Diagnostic visit", "quantity": 1, "unit_price_cents": 7_500 },
                { "description": "Capacitor", "quantity": 2, "unit_price_cents": 3_250 }
            ],
            "labor_hours": 1.0,
        }),
    }
}
