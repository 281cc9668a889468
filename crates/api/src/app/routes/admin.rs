use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
    Json, Router,
};

use homefix_ai::{CapabilityGroup, FeatureFlag};
use homefix_infra::AiServices;

use crate::app::{dto, errors};
use crate::context::ActorContext;

pub fn router() -> Router {
    Router::new()
        .route("/feature-flags", get(list_flags))
        .route("/feature-flags/:flag_key", put(set_flag))
}

pub async fn list_flags(Extension(services): Extension<Arc<AiServices>>) -> axum::response::Response {
    let stored = match services.flags.list_flags().await {
        Ok(flags) => flags,
        Err(e) => return errors::flag_error_to_response(e),
    };

    (StatusCode::OK, Json(serde_json::json!({ "items": merge_flags(stored) }))).into_response()
}

pub async fn set_flag(
    Extension(services): Extension<Arc<AiServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(flag_key): Path<String>,
    body: Result<Json<dto::SetFlagRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return errors::json_rejection_to_response(rejection),
    };

    match services.flags.set_flag(&flag_key, body.enabled, actor.actor()).await {
        Ok(flag) => (StatusCode::OK, Json(flag)).into_response(),
        Err(e) => errors::flag_error_to_response(e),
    }
}

/// Every capability flag, stored or not, followed by any other stored keys.
fn merge_flags(stored: Vec<FeatureFlag>) -> Vec<dto::FlagView> {
    let mut by_key: HashMap<String, FeatureFlag> =
        stored.into_iter().map(|f| (f.flag_key.clone(), f)).collect();

    let mut views: Vec<dto::FlagView> = CapabilityGroup::ALL
        .iter()
        .map(|group| {
            let tasks = group.tasks().map(|t| t.as_str()).collect();
            match by_key.remove(group.flag_key()) {
                Some(flag) => view(flag, tasks),
                None => dto::FlagView {
                    flag_key: group.flag_key().to_string(),
                    enabled: false,
                    stored: false,
                    updated_by: None,
                    updated_at: None,
                    tasks,
                },
            }
        })
        .collect();

    let mut rest: Vec<FeatureFlag> = by_key.into_values().collect();
    rest.sort_by(|a, b| a.flag_key.cmp(&b.flag_key));
    views.extend(rest.into_iter().map(|flag| view(flag, Vec::new())));
    views
}

fn view(flag: FeatureFlag, tasks: Vec<&'static str>) -> dto::FlagView {
    dto::FlagView {
        flag_key: flag.flag_key,
        enabled: flag.enabled,
        stored: true,
        updated_by: flag.updated_by,
        updated_at: Some(flag.updated_at),
        tasks,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn flag(key: &str, enabled: bool) -> FeatureFlag {
        FeatureFlag {
            flag_key: key.to_string(),
            enabled,
            updated_by: Some("admin".to_string()),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn unset_capabilities_are_listed_as_disabled() {
        let views = merge_flags(vec![flag("ai_crm_copilot_enabled", true)]);
        assert_eq!(views.len(), CapabilityGroup::ALL.len());

        let crm = views.iter().find(|v| v.flag_key == "ai_crm_copilot_enabled").unwrap();
        assert!(crm.enabled && crm.stored);
        assert_eq!(crm.tasks, vec!["CRM_NEXT_BEST_ACTION"]);

        let triage = views.iter().find(|v| v.flag_key == "ai_admin_triage_enabled").unwrap();
        assert!(!triage.enabled && !triage.stored);
        assert_eq!(triage.tasks.len(), 2);
    }

    #[test]
    fn unrelated_stored_flags_follow_capabilities() {
        let views = merge_flags(vec![flag("zz_other", true), flag("aa_other", false)]);
        let tail: Vec<_> = views[CapabilityGroup::ALL.len()..].iter().map(|v| v.flag_key.as_str()).collect();
        assert_eq!(tail, vec!["aa_other", "zz_other"]);
    }
}
