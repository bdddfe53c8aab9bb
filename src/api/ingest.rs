// src/api/ingest.rs
use crate::api::stats::ApiResponse;
use crate::database::upsert_lead;
use crate::ingest::IngestPipeline;
use crate::models::IngestReport;
use crate::server::ServerState;
use rocket::http::Status;
use rocket::response::status::Custom;
use rocket::serde::{json::Json, Deserialize};
use rocket::{post, State};
use tracing::{error, info};

#[derive(Deserialize)]
pub struct IngestRequest {
    /// Inline CSV text, header row included.
    pub csv_text: Option<String>,
    /// Alternatively, a server-side CSV file to read.
    pub file: Option<String>,
}

#[post("/ingest", data = "<request>")]
pub async fn ingest_csv(
    state: &State<ServerState>,
    request: Json<IngestRequest>,
) -> Custom<Json<ApiResponse<IngestReport>>> {
    let csv_text = match (&request.csv_text, &request.file) {
        (Some(text), _) => text.clone(),
        (None, Some(path)) => match tokio::fs::read_to_string(path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Custom(
                    Status::NotFound,
                    Json(ApiResponse::error(format!("file not found: {}", path))),
                );
            }
            Err(e) => {
                error!("Failed to read {}: {}", path, e);
                return Custom(
                    Status::InternalServerError,
                    Json(ApiResponse::error(e.to_string())),
                );
            }
        },
        (None, None) => {
            return Custom(
                Status::BadRequest,
                Json(ApiResponse::error(
                    "csv_text or file is required".to_string(),
                )),
            );
        }
    };

    let pipeline = IngestPipeline::new(state.config.ingest.clone());
    let (leads, report) = match pipeline.run(&csv_text) {
        Ok(result) => result,
        Err(e) => {
            return Custom(Status::BadRequest, Json(ApiResponse::error(e.to_string())));
        }
    };

    for lead in &leads {
        if let Err(e) = upsert_lead(&state.db_pool, lead).await {
            error!("Failed to store lead {}: {}", lead.business_name, e);
            return Custom(
                Status::InternalServerError,
                Json(ApiResponse::error(e.to_string())),
            );
        }
    }

    info!("Ingest stored {} leads", report.imported);
    Custom(Status::Ok, Json(ApiResponse::success(report)))
}
