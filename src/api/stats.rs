// src/api/stats.rs
use crate::database::get_database_stats;
use crate::outreach::quota::day_key;
use crate::server::ServerState;
use chrono::Utc;
use rocket::{get, serde::json::Json, State};
use serde::Serialize;

#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

#[derive(Serialize)]
pub struct StatsOverview {
    pub total_leads: i64,
    pub leads_with_email: i64,
    pub leads_with_phone: i64,
    pub hot_leads: i64,
    pub warm_leads: i64,
    pub cold_leads: i64,
    pub contacted_leads: i64,
    pub records_open: i64,
    pub records_replied: i64,
    pub records_closed: i64,
    pub total_opens: i64,
    pub total_clicks: i64,
    pub avg_interest_score: f64,
    pub quota: Option<QuotaOverview>,
}

#[derive(Serialize)]
pub struct QuotaOverview {
    pub user_id: String,
    pub day: String,
    pub daily_quota: i64,
    pub sent_today: i64,
    pub remaining_today: i64,
}

#[get("/stats?<user_id>")]
pub async fn get_stats(
    state: &State<ServerState>,
    user_id: Option<String>,
) -> Json<ApiResponse<StatsOverview>> {
    let stats = match get_database_stats(&state.db_pool).await {
        Ok(stats) => stats,
        Err(e) => return Json(ApiResponse::error(e.to_string())),
    };

    let quota = match &user_id {
        Some(user_id) => {
            let day = day_key(Utc::now());
            match crate::database::get_daily_sent(&state.db_pool, user_id, &day).await {
                Ok(sent_today) => Some(QuotaOverview {
                    user_id: user_id.clone(),
                    day,
                    daily_quota: state.config.outreach.daily_quota,
                    sent_today,
                    remaining_today: (state.config.outreach.daily_quota - sent_today).max(0),
                }),
                Err(e) => return Json(ApiResponse::error(e.to_string())),
            }
        }
        None => None,
    };

    let overview = StatsOverview {
        total_leads: stats.total_leads,
        leads_with_email: stats.leads_with_email,
        leads_with_phone: stats.leads_with_phone,
        hot_leads: stats.hot_leads,
        warm_leads: stats.warm_leads,
        cold_leads: stats.cold_leads,
        contacted_leads: stats.contacted_leads,
        records_open: stats.records_open,
        records_replied: stats.records_replied,
        records_closed: stats.records_closed,
        total_opens: stats.total_opens,
        total_clicks: stats.total_clicks,
        avg_interest_score: stats.avg_interest_score,
        quota,
    };

    Json(ApiResponse::success(overview))
}
