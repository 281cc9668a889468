use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use serde_json::{Value as JsonValue, json};

use homefix_ai::model::extract_json;
use homefix_ai::{FeatureFlagGate, RunTaskParams, TaskExecutor, TaskType, UnconfiguredModelClient};
use homefix_core::{ActorId, EntityRef};

fn sample_input(task_type: TaskType) -> JsonValue {
    match task_type {
        TaskType::FraudSignalReferrals => json!({
            "referrer_id": "u_1", "signups_last_24h": 14, "signups_last_7d": 40,
            "conversions_last_7d": 1, "cluster_hash_matches": 3,
        }),
        TaskType::ProviderQualitySummary => json!({
            "provider_id": "p_1", "provider_name": "Acme", "avg_rating": 4.4,
            "review_count": 25, "completed_jobs": 60, "cancelled_jobs": 4,
        }),
        TaskType::CrmNextBestAction => json!({
            "customer_id": "c_1", "days_since_last_booking": 200, "total_bookings": 5,
            "open_requests": 1, "lifetime_value_cents": 250_000,
        }),
        TaskType::SponsorTileCopy => json!({
            "sponsor_name": "Bright Spark", "category": "Electrical", "territory": "Austin",
            "offer": "10% off", "tone": "urgent",
        }),
        TaskType::IntakeFollowupQuestions => json!({
            "service_category": "Roofing", "description": "Shingles missing after storm",
        }),
        TaskType::ProviderBriefGenerate => json!({
            "request_id": "sr_1", "service_category": "HVAC", "description": "No heat",
            "city": "Denver", "answers": [{ "question": "System age?", "answer": "12 years" }],
        }),
        TaskType::InvoiceNarrative => json!({
            "invoice_id": "inv_1",
            "line_items": [
                { "description": "Service call", "quantity": 1, "unit_price_cents": 8_900 },
                { "description": "Labor", "quantity": 2.5, "unit_price_cents": 9_500 }
            ],
            "notes": "Replaced igniter",
        }),
    }
}

/// JSON-level fallback per task: parse input, run rules, serialize output.
fn bench_fallbacks(c: &mut Criterion) {
    let mut group = c.benchmark_group("fallback");
    for task_type in TaskType::ALL {
        let input = sample_input(task_type);
        let def = task_type.definition();
        group.bench_with_input(BenchmarkId::from_parameter(task_type), &input, |b, input| {
            b.iter(|| def.fallback(black_box(input)))
        });
    }
    group.finish();
}

fn bench_extract_json(c: &mut Criterion) {
    let raw = format!(
        "Sure! Here is the result:\n```json\n{}\n```\nLet me know if you need more.",
        json!({"risk_score": 72, "risk_level": "high", "reasons": ["velocity"], "recommended_action": "hold_payouts"})
    );
    c.bench_function("extract_json/fenced", |b| b.iter(|| extract_json(black_box(&raw))));
}

/// Full `run_task` path with the capability switched off (flag read from a warm cache).
fn bench_disabled_run(c: &mut Criterion) {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .unwrap();
    let exec = TaskExecutor::new(
        Arc::new(UnconfiguredModelClient),
        Arc::new(FeatureFlagGate::in_memory()),
    );
    let entity = EntityRef::referral("ref_1").unwrap();
    let input = sample_input(TaskType::FraudSignalReferrals);

    c.bench_function("run_task/flag_disabled", |b| {
        b.iter(|| {
            let params = RunTaskParams {
                task_type: TaskType::FraudSignalReferrals.as_str().to_string(),
                actor: ActorId::system(),
                entity: entity.clone(),
                inputs: input.clone(),
            };
            rt.block_on(exec.run_task(params)).unwrap()
        })
    });
}

criterion_group!(benches, bench_fallbacks, bench_extract_json, bench_disabled_run);
criterion_main!(benches);
