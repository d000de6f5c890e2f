use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::AppState;
use crate::db::Database;
use crate::engine::{self, groups, DecreaseRule, ExportFormat, PatternError};
use crate::models::*;

// ============================================================
// Error Handling
// ============================================================

/// Log an internal error and return a sanitized response to the client.
///
/// Validation failures raised by the database layer (missing profiles,
/// empty names, duplicate emails) are safe to show and come back as
/// BAD_REQUEST. Anything else is logged and hidden behind a generic 500.
fn internal_error(e: impl std::fmt::Display) -> (StatusCode, String) {
    let msg = e.to_string();

    if msg.contains("not found")
        || msg.contains("required")
        || msg.contains("already exists")
        || msg.contains("built-in")
    {
        tracing::warn!("Validation error: {}", msg);
        return (StatusCode::BAD_REQUEST, msg);
    }

    tracing::error!("Internal error: {}", msg);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error".to_string(),
    )
}

fn pattern_error(e: PatternError) -> (StatusCode, String) {
    let status = match e {
        PatternError::RoundNotFound(_) | PatternError::StitchNotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::BAD_REQUEST,
    };
    tracing::warn!("Rejected pattern edit: {}", e);
    (status, e.to_string())
}

/// Structural edits report rejected changes as [`PatternError`] wrapped in
/// the database error; unwrap those before falling back to `internal_error`.
fn edit_error(e: anyhow::Error) -> (StatusCode, String) {
    match e.downcast::<PatternError>() {
        Ok(e) => pattern_error(e),
        Err(e) => internal_error(e),
    }
}

fn pattern_not_found() -> (StatusCode, String) {
    (StatusCode::NOT_FOUND, "Pattern not found".to_string())
}

fn profile_not_found() -> (StatusCode, String) {
    (StatusCode::NOT_FOUND, "Profile not found".to_string())
}

// ============================================================
// Health
// ============================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ============================================================
// Patterns
// ============================================================

pub async fn list_patterns(
    State(db): State<Database>,
    Query(query): Query<ListPatternsQuery>,
) -> Result<Json<Vec<PatternSummary>>, (StatusCode, String)> {
    let patterns = db.get_patterns(&query).map_err(internal_error)?;
    Ok(Json(patterns.into_iter().map(Into::into).collect()))
}

pub async fn get_pattern(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
) -> Result<Json<Pattern>, (StatusCode, String)> {
    db.get_pattern(id)
        .map_err(internal_error)?
        .map(Json)
        .ok_or_else(pattern_not_found)
}

pub async fn create_pattern(
    State(db): State<Database>,
    Json(input): Json<CreatePatternInput>,
) -> Result<(StatusCode, Json<Pattern>), (StatusCode, String)> {
    db.create_pattern(input)
        .map(|p| (StatusCode::CREATED, Json(p)))
        .map_err(internal_error)
}

pub async fn update_pattern(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdatePatternInput>,
) -> Result<Json<Pattern>, (StatusCode, String)> {
    db.update_pattern(id, input)
        .map_err(internal_error)?
        .map(Json)
        .ok_or_else(pattern_not_found)
}

pub async fn delete_pattern(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    if db.delete_pattern(id).map_err(internal_error)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(pattern_not_found())
    }
}

/// Query parameters shared by endpoints that count stitches.
#[derive(Debug, Default, Deserialize)]
pub struct RuleQuery {
    pub decrease_rule: Option<DecreaseRule>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ExportQuery {
    pub format: Option<ExportFormat>,
    pub decrease_rule: Option<DecreaseRule>,
}

pub async fn export_pattern(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<ExportQuery>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let pattern = state
        .db
        .get_pattern(id)
        .map_err(internal_error)?
        .ok_or_else(pattern_not_found)?;

    let format = query.format.unwrap_or_default();
    let rule = query.decrease_rule.unwrap_or(state.decrease_rule);
    let body = engine::export_pattern(&pattern, format, rule);

    Ok(([(header::CONTENT_TYPE, format.content_type())], body))
}

pub async fn list_rounds(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<RuleQuery>,
) -> Result<Json<Vec<RoundSummary>>, (StatusCode, String)> {
    let pattern = state
        .db
        .get_pattern(id)
        .map_err(internal_error)?
        .ok_or_else(pattern_not_found)?;

    let rule = query.decrease_rule.unwrap_or(state.decrease_rule);
    Ok(Json(engine::round_summaries(&pattern, rule)))
}

pub async fn create_group(
    State(db): State<Database>,
    Path((id, round_id)): Path<(Uuid, Uuid)>,
    Json(input): Json<CreateGroupInput>,
) -> Result<(StatusCode, Json<RepetitionGroup>), (StatusCode, String)> {
    let (_, group) = db
        .modify_sections(id, |sections| {
            let round = groups::find_round_mut(sections, round_id)?;
            groups::create_group(round, &input.stitch_ids, input.count)
        })
        .map_err(edit_error)?
        .ok_or_else(pattern_not_found)?;

    Ok((StatusCode::CREATED, Json(group)))
}

/// Delete a stitch and drop any repetition group it leaves with fewer than
/// two members. Returns the updated pattern.
pub async fn delete_stitch(
    State(db): State<Database>,
    Path((id, stitch_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Pattern>, (StatusCode, String)> {
    let (pattern, _) = db
        .modify_sections(id, |sections| {
            if groups::remove_stitch_from_sections(sections, stitch_id) {
                Ok(())
            } else {
                Err(PatternError::StitchNotFound(stitch_id))
            }
        })
        .map_err(edit_error)?
        .ok_or_else(pattern_not_found)?;

    Ok(Json(pattern))
}

/// An unsaved round to format, as edited in the designer.
#[derive(Debug, Deserialize, Serialize)]
pub struct PreviewInput {
    pub stitches: Vec<Stitch>,
    #[serde(default)]
    pub groups: Vec<RepetitionGroup>,
    pub repeat: Option<u32>,
    pub decrease_rule: Option<DecreaseRule>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct PreviewResponse {
    pub text: String,
    pub total: i64,
}

pub async fn preview_round(
    State(state): State<AppState>,
    Json(input): Json<PreviewInput>,
) -> Json<PreviewResponse> {
    let rule = input.decrease_rule.unwrap_or(state.decrease_rule);
    Json(PreviewResponse {
        text: engine::format_stitches(&input.stitches, &input.groups, input.repeat, rule),
        total: engine::count_stitches(&input.stitches, &input.groups, input.repeat, rule),
    })
}

// ============================================================
// Profiles
// ============================================================

pub async fn list_profiles(
    State(db): State<Database>,
) -> Result<Json<Vec<Profile>>, (StatusCode, String)> {
    db.get_all_profiles().map(Json).map_err(internal_error)
}

pub async fn get_profile(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
) -> Result<Json<Profile>, (StatusCode, String)> {
    db.get_profile(id)
        .map_err(internal_error)?
        .map(Json)
        .ok_or_else(profile_not_found)
}

pub async fn create_profile(
    State(db): State<Database>,
    Json(input): Json<CreateProfileInput>,
) -> Result<(StatusCode, Json<Profile>), (StatusCode, String)> {
    db.create_profile(input)
        .map(|p| (StatusCode::CREATED, Json(p)))
        .map_err(internal_error)
}

/// Subscription status, served from the cache while fresh.
///
/// The `x-cache` response header reports `hit` or `miss`.
pub async fn get_subscription(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let (status, cache) = match state.subscriptions.get(id) {
        Some(status) => (status, "hit"),
        None => {
            let profile = state
                .db
                .get_profile(id)
                .map_err(internal_error)?
                .ok_or_else(profile_not_found)?;
            state.subscriptions.insert(id, profile.subscription);
            (profile.subscription, "miss")
        }
    };

    Ok((
        [("x-cache", cache)],
        Json(SubscriptionResponse {
            profile_id: id,
            status,
            is_active: status.is_active(),
        }),
    ))
}

pub async fn billing_webhook(
    State(state): State<AppState>,
    Json(event): Json<BillingEvent>,
) -> Result<Json<SubscriptionResponse>, (StatusCode, String)> {
    let profile = state
        .db
        .apply_billing_event(&event)
        .map_err(internal_error)?
        .ok_or_else(profile_not_found)?;

    state.subscriptions.invalidate(profile.id);
    tracing::info!(
        profile_id = %profile.id,
        tier = profile.subscription.tier.as_str(),
        state = profile.subscription.state.as_str(),
        "Subscription updated"
    );

    Ok(Json(SubscriptionResponse {
        profile_id: profile.id,
        status: profile.subscription,
        is_active: profile.subscription.is_active(),
    }))
}

pub async fn list_custom_stitches(
    State(db): State<Database>,
    Path(profile_id): Path<Uuid>,
) -> Result<Json<Vec<CustomStitch>>, (StatusCode, String)> {
    db.get_profile(profile_id)
        .map_err(internal_error)?
        .ok_or_else(profile_not_found)?;

    db.get_custom_stitches(profile_id)
        .map(Json)
        .map_err(internal_error)
}

pub async fn add_custom_stitch(
    State(db): State<Database>,
    Path(profile_id): Path<Uuid>,
    Json(input): Json<CreateCustomStitchInput>,
) -> Result<(StatusCode, Json<CustomStitch>), (StatusCode, String)> {
    db.add_custom_stitch(profile_id, input)
        .map(|s| (StatusCode::CREATED, Json(s)))
        .map_err(internal_error)
}

// ============================================================
// Free pattern directory
// ============================================================

pub async fn list_free_patterns(
    State(db): State<Database>,
    Query(query): Query<FreePatternQuery>,
) -> Result<Json<Vec<FreePattern>>, (StatusCode, String)> {
    db.search_free_patterns(&query)
        .map(Json)
        .map_err(internal_error)
}

pub async fn get_free_pattern(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
) -> Result<Json<FreePattern>, (StatusCode, String)> {
    db.get_free_pattern(id)
        .map_err(internal_error)?
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "Free pattern not found".to_string()))
}

pub async fn create_free_pattern(
    State(db): State<Database>,
    Json(input): Json<CreateFreePatternInput>,
) -> Result<(StatusCode, Json<FreePattern>), (StatusCode, String)> {
    db.create_free_pattern(input)
        .map(|p| (StatusCode::CREATED, Json(p)))
        .map_err(internal_error)
}
