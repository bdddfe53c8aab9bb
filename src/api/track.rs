// src/api/track.rs
use crate::database::{record_click, record_open};
use crate::server::ServerState;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rocket::http::ContentType;
use rocket::response::Redirect;
use rocket::{get, State};
use tracing::{debug, warn};

// 1x1 transparent GIF served to mail clients that fetch the open pixel
const PIXEL_GIF_B64: &str = "R0lGODlhAQABAIAAAAAAAP///yH5BAEAAAAALAAAAAABAAEAAAIBRAA7";

fn pixel_bytes() -> Vec<u8> {
    STANDARD
        .decode(PIXEL_GIF_B64)
        .unwrap_or_else(|_| Vec::new())
}

/// Always serves the pixel; an unknown record id is logged, not surfaced,
/// so broken tracking never breaks the recipient's mail client.
#[get("/track/open/<record_id>")]
pub async fn track_open(
    state: &State<ServerState>,
    record_id: String,
) -> (ContentType, Vec<u8>) {
    match record_open(&state.db_pool, &record_id).await {
        Ok(true) => debug!("Open recorded for {}", record_id),
        Ok(false) => debug!("Open for unknown record {}", record_id),
        Err(e) => warn!("Failed to record open for {}: {}", record_id, e),
    }
    (ContentType::GIF, pixel_bytes())
}

#[get("/track/click/<record_id>?<url>")]
pub async fn track_click(
    state: &State<ServerState>,
    record_id: String,
    url: String,
) -> Redirect {
    match record_click(&state.db_pool, &record_id).await {
        Ok(true) => debug!("Click recorded for {}", record_id),
        Ok(false) => debug!("Click for unknown record {}", record_id),
        Err(e) => warn!("Failed to record click for {}: {}", record_id, e),
    }
    Redirect::to(url)
}
