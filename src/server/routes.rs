// src/server/routes.rs
pub mod health {
    use rocket::{get, serde::json::Json};
    use serde_json::{json, Value};

    #[get("/health")]
    pub async fn health_check() -> Json<Value> {
        Json(json!({
            "status": "healthy",
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "service": "lead-outreach-api"
        }))
    }

    #[get("/")]
    pub async fn index() -> Json<Value> {
        Json(json!({
            "name": "Lead Outreach API",
            "version": "0.1.0",
            "description": "CSV lead ingestion and email outreach pipeline",
            "endpoints": {
                "health": "/api/health",
                "stats": "/api/stats",
                "ingest": "/api/ingest",
                "leads": "/api/leads",
                "campaigns": "/api/campaigns/send",
                "followups": "/api/campaigns/followups",
                "tracking": "/api/track/open/<record_id>"
            }
        }))
    }
}
