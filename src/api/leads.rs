// src/api/leads.rs
use crate::api::stats::ApiResponse;
use crate::database::get_leads;
use crate::models::{ContactStatus, Lead, LeadQuality};
use crate::server::ServerState;
use rocket::{get, serde::json::Json, State};
use serde::Serialize;

#[derive(Serialize)]
pub struct LeadsResponse {
    pub leads: Vec<Lead>,
    pub total_count: usize,
    pub page: usize,
    pub per_page: usize,
}

#[get("/leads?<page>&<per_page>&<quality>&<status>")]
pub async fn list_leads(
    state: &State<ServerState>,
    page: Option<usize>,
    per_page: Option<usize>,
    quality: Option<String>,
    status: Option<String>,
) -> Json<ApiResponse<LeadsResponse>> {
    let page = page.unwrap_or(1).max(1);
    let per_page = per_page.unwrap_or(50).min(1000);
    let offset = (page - 1) * per_page;

    let quality = quality.as_deref().map(LeadQuality::parse);
    let status = status.as_deref().map(ContactStatus::parse);

    match get_leads(&state.db_pool, quality, status, per_page, offset).await {
        Ok(leads) => {
            let total_count = leads.len();
            Json(ApiResponse::success(LeadsResponse {
                leads,
                total_count,
                page,
                per_page,
            }))
        }
        Err(e) => Json(ApiResponse::error(e.to_string())),
    }
}
