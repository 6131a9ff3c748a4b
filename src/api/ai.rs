//! AI-assisted content generation for the admin dashboard

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};

use crate::db;
use crate::error::{AppError, ErrorCode};
use crate::gemini;
use crate::state::AppState;

use super::{ApiResult, internal};

#[derive(Deserialize)]
pub struct DescriptionRequest {
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub keywords: Vec<String>,
}

#[derive(Serialize)]
pub struct DescriptionResponse {
    pub description: String,
}

/// POST /ai/description
pub async fn description(
    State(state): State<AppState>,
    Json(req): Json<DescriptionRequest>,
) -> ApiResult<DescriptionResponse> {
    if req.name.trim().is_empty() {
        return Err(AppError::validation("Product name is required"));
    }

    let prompt = format!(
        "Product name: {}\nCategory: {}\nKeywords: {}",
        req.name.trim(),
        req.category.trim(),
        req.keywords.join(", ")
    );

    let raw = gemini::generate_text(
        &state.http,
        &state.gemini_api_key,
        "You write product descriptions for an online furniture and home goods store. \
         Write a single engaging paragraph of 60-100 words. Plain text only, no Markdown.",
        &prompt,
    )
    .await
    .map_err(internal)?;

    // Models sneak Markdown emphasis in despite the instruction
    let description = raw.replace('*', "").trim().to_string();

    Ok(Json(DescriptionResponse { description }))
}

#[derive(Deserialize)]
pub struct SeoRequest {
    pub product_id: String,
}

#[derive(Serialize, Deserialize)]
pub struct SeoResponse {
    pub meta_title: String,
    pub meta_description: String,
    pub keywords: Vec<String>,
}

/// POST /ai/seo — generate SEO metadata for a product and persist it
pub async fn seo(
    State(state): State<AppState>,
    Json(req): Json<SeoRequest>,
) -> ApiResult<SeoResponse> {
    let product = db::products::find(&state.pool, &req.product_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| AppError::new(ErrorCode::ProductNotFound))?;

    let prompt = format!(
        "Product name: {}\nDescription: {}",
        product.name, product.description
    );

    let raw = gemini::generate_text(
        &state.http,
        &state.gemini_api_key,
        "You generate SEO metadata for e-commerce product pages. Respond with ONLY a JSON \
         object with keys: meta_title (max 60 chars), meta_description (max 160 chars), \
         keywords (array of 5-10 strings). No Markdown, no commentary.",
        &prompt,
    )
    .await
    .map_err(internal)?;

    let seo: SeoResponse = serde_json::from_str(gemini::strip_code_fence(&raw)).map_err(|e| {
        tracing::warn!("Gemini returned unparseable SEO JSON: {e}");
        internal(e)
    })?;

    let keywords = serde_json::json!(seo.keywords);
    db::products::update(
        &state.pool,
        &product.id,
        db::products::ProductUpdate {
            name: None,
            slug: None,
            sku: None,
            description: None,
            price: None,
            stock: None,
            category_id: None,
            images: None,
            tags: None,
            keywords: Some(&keywords),
            is_active: None,
            meta_title: Some(&seo.meta_title),
            meta_description: Some(&seo.meta_description),
        },
    )
    .await
    .map_err(internal)?;

    Ok(Json(seo))
}

#[derive(Deserialize)]
pub struct MarketingPlanRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub audience: String,
}

#[derive(Serialize)]
pub struct MarketingPlanResponse {
    pub plan: String,
}

/// POST /ai/marketing-plan
pub async fn marketing_plan(
    State(state): State<AppState>,
    Json(req): Json<MarketingPlanRequest>,
) -> ApiResult<MarketingPlanResponse> {
    if req.name.trim().is_empty() {
        return Err(AppError::validation("Product name is required"));
    }

    let prompt = format!(
        "Product name: {}\nDescription: {}\nTarget audience: {}",
        req.name.trim(),
        req.description.trim(),
        req.audience.trim()
    );

    let plan = gemini::generate_text(
        &state.http,
        &state.gemini_api_key,
        "You are a marketing strategist for an online store. Produce a concise launch \
         plan with sections for positioning, channels, promotions and a two-week \
         timeline. Use Markdown headings.",
        &prompt,
    )
    .await
    .map_err(internal)?;

    Ok(Json(MarketingPlanResponse { plan }))
}
