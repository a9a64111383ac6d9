//! Bulk copywriting runs and single-product optimization.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;

use crate::billing::PlanResolver;
use crate::db::ShopSettingsRepository;
use crate::error::AppError;
use crate::middleware::ShopSession;
use crate::services::{Pipeline, PipelineContext, PipelineOutcome};
use crate::shopify::product_gid;
use crate::state::AppState;

/// Body of a batch request. Everything is optional.
#[derive(Debug, Default, Deserialize)]
pub struct BatchRequest {
    /// Products to select; capped by the tier's scan size.
    pub limit: Option<u32>,
}

/// What a request asks the pipeline to do.
enum Job {
    Batch {
        pipeline: Pipeline,
        limit: Option<u32>,
    },
    Product(String),
}

/// Resolve the shop's tier and settings, then run `job` under the gate.
async fn run(state: &AppState, session: &ShopSession, job: Job) -> Result<PipelineOutcome, AppError> {
    let tier = state.plans().resolve(&session.shop, &session.admin).await?;
    let settings = ShopSettingsRepository::new(state.pool())
        .get(&session.shop)
        .await?;
    let ledger = state.ledger();
    let guard = state.anti_churn();

    let ctx = PipelineContext {
        runner: state.batch(),
        generator: state.gemini(),
        admin: &session.admin,
        ledger: &ledger,
        guard: &guard,
        shop: &session.shop,
        tier,
        settings: &settings,
    };
    let outcome = match job {
        Job::Batch { pipeline, limit } => ctx.run_batch(pipeline, limit).await?,
        Job::Product(gid) => ctx.optimize_product(&gid).await?,
    };
    Ok(outcome)
}

async fn run_batch(
    state: &AppState,
    session: &ShopSession,
    pipeline: Pipeline,
    body: Option<Json<BatchRequest>>,
) -> Result<Json<PipelineOutcome>, AppError> {
    let limit = body.and_then(|Json(b)| b.limit);
    run(state, session, Job::Batch { pipeline, limit })
        .await
        .map(Json)
}

/// `POST /api/batch/descriptions`
pub async fn descriptions(
    State(state): State<AppState>,
    session: ShopSession,
    body: Option<Json<BatchRequest>>,
) -> Result<Json<PipelineOutcome>, AppError> {
    run_batch(&state, &session, Pipeline::Descriptions, body).await
}

/// `POST /api/batch/alt-text`
pub async fn alt_text(
    State(state): State<AppState>,
    session: ShopSession,
    body: Option<Json<BatchRequest>>,
) -> Result<Json<PipelineOutcome>, AppError> {
    run_batch(&state, &session, Pipeline::AltText, body).await
}

/// `POST /api/batch/ads`
pub async fn ads(
    State(state): State<AppState>,
    session: ShopSession,
    body: Option<Json<BatchRequest>>,
) -> Result<Json<PipelineOutcome>, AppError> {
    run_batch(&state, &session, Pipeline::Ads, body).await
}

/// `POST /api/products/{id}/optimize`
///
/// Accepts a numeric ID or a product GID.
pub async fn optimize_product(
    State(state): State<AppState>,
    session: ShopSession,
    Path(id): Path<String>,
) -> Result<Json<PipelineOutcome>, AppError> {
    let gid = product_gid(&id).ok_or_else(|| AppError::BadRequest(format!("invalid product id: {id}")))?;

    run(&state, &session, Job::Product(gid)).await.map(Json)
}
