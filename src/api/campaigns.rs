// src/api/campaigns.rs
use crate::api::stats::ApiResponse;
use crate::database::{get_followup_candidates, SentEmailRecord};
use crate::email_sender::{MailgunConfig, MailgunSender};
use crate::models::CampaignReport;
use crate::outreach::{CampaignRequest, FollowUpRequest, OutreachScheduler, QuotaExceeded};
use crate::server::ServerState;
use chrono::Utc;
use rocket::http::Status;
use rocket::response::status::Custom;
use rocket::serde::{json::Json, Deserialize};
use rocket::{get, post, State};
use serde::Serialize;
use tracing::error;

type ReportResult = Custom<Json<ApiResponse<CampaignReport>>>;

fn bad_request<T>(message: &str) -> Custom<Json<ApiResponse<T>>> {
    Custom(
        Status::BadRequest,
        Json(ApiResponse::error(message.to_string())),
    )
}

/// Map a batch-level error onto the taxonomy: exhausted quota is 429,
/// provider trouble is 502, anything else is ours.
fn report_error(e: Box<dyn std::error::Error + Send + Sync>) -> ReportResult {
    if let Some(quota) = e.downcast_ref::<QuotaExceeded>() {
        return Custom(
            Status::TooManyRequests,
            Json(ApiResponse::error(quota.to_string())),
        );
    }
    let message = e.to_string();
    let status = if message.contains("Mailgun") {
        Status::BadGateway
    } else {
        Status::InternalServerError
    };
    error!("Campaign request failed: {}", message);
    Custom(status, Json(ApiResponse::error(message)))
}

fn build_sender<T>() -> Result<MailgunSender, Custom<Json<ApiResponse<T>>>> {
    match MailgunConfig::from_env() {
        Ok(config) => Ok(MailgunSender::new(config)),
        Err(e) => Err(Custom(
            Status::InternalServerError,
            Json(ApiResponse::error(format!(
                "mail provider not configured: {}",
                e
            ))),
        )),
    }
}

#[post("/campaigns/send", data = "<request>")]
pub async fn send_campaign(
    state: &State<ServerState>,
    request: Json<CampaignRequest>,
) -> ReportResult {
    if request.user_id.trim().is_empty() {
        return bad_request("user_id is required");
    }
    if request.recipients.is_empty() {
        return bad_request("recipients must not be empty");
    }
    if request.subject_template.trim().is_empty() || request.body_template.trim().is_empty() {
        return bad_request("subject_template and body_template are required");
    }

    let sender = match build_sender() {
        Ok(sender) => sender,
        Err(response) => return response,
    };

    let scheduler = OutreachScheduler::new(state.db_pool.clone(), state.config.outreach.clone());
    match scheduler.send_campaign(&sender, &request).await {
        Ok(report) => Custom(Status::Ok, Json(ApiResponse::success(report))),
        Err(e) => report_error(e),
    }
}

#[post("/campaigns/followups", data = "<request>")]
pub async fn run_followups(
    state: &State<ServerState>,
    request: Json<FollowUpRequest>,
) -> ReportResult {
    if request.user_id.trim().is_empty() {
        return bad_request("user_id is required");
    }
    if request.body_template.trim().is_empty() {
        return bad_request("body_template is required");
    }

    let sender = match build_sender() {
        Ok(sender) => sender,
        Err(response) => return response,
    };

    let scheduler = OutreachScheduler::new(state.db_pool.clone(), state.config.outreach.clone());
    match scheduler.run_follow_ups(&sender, &request).await {
        Ok(report) => Custom(Status::Ok, Json(ApiResponse::success(report))),
        Err(e) => report_error(e),
    }
}

#[get("/campaigns/followup-candidates?<user_id>")]
pub async fn followup_candidates(
    state: &State<ServerState>,
    user_id: Option<String>,
) -> Custom<Json<ApiResponse<Vec<SentEmailRecord>>>> {
    let user_id = match user_id {
        Some(user_id) if !user_id.trim().is_empty() => user_id,
        _ => return bad_request("user_id is required"),
    };

    match get_followup_candidates(&state.db_pool, &user_id, Utc::now()).await {
        Ok(records) => Custom(Status::Ok, Json(ApiResponse::success(records))),
        Err(e) => Custom(
            Status::InternalServerError,
            Json(ApiResponse::error(e.to_string())),
        ),
    }
}

#[derive(Deserialize)]
pub struct ReplyCheckRequest {
    pub user_id: String,
}

#[derive(Serialize)]
pub struct ReplyCheckResponse {
    pub replies_found: usize,
}

#[post("/campaigns/check-replies", data = "<request>")]
pub async fn check_replies(
    state: &State<ServerState>,
    request: Json<ReplyCheckRequest>,
) -> Custom<Json<ApiResponse<ReplyCheckResponse>>> {
    if request.user_id.trim().is_empty() {
        return bad_request("user_id is required");
    }

    let sender = match build_sender() {
        Ok(sender) => sender,
        Err(response) => return response,
    };

    let scheduler = OutreachScheduler::new(state.db_pool.clone(), state.config.outreach.clone());
    match scheduler.check_replies(&sender, &request.user_id).await {
        Ok(replies_found) => Custom(
            Status::Ok,
            Json(ApiResponse::success(ReplyCheckResponse { replies_found })),
        ),
        Err(e) => {
            let message = e.to_string();
            let status = if message.contains("Mailgun") {
                Status::BadGateway
            } else {
                Status::InternalServerError
            };
            Custom(status, Json(ApiResponse::error(message)))
        }
    }
}

#[derive(Serialize)]
pub struct PurgeResponse {
    pub purged: usize,
}

#[post("/maintenance/purge")]
pub async fn purge_closed(
    state: &State<ServerState>,
) -> Custom<Json<ApiResponse<PurgeResponse>>> {
    let scheduler = OutreachScheduler::new(state.db_pool.clone(), state.config.outreach.clone());
    match scheduler.purge_closed().await {
        Ok(purged) => Custom(Status::Ok, Json(ApiResponse::success(PurgeResponse { purged }))),
        Err(e) => Custom(
            Status::InternalServerError,
            Json(ApiResponse::error(e.to_string())),
        ),
    }
}
