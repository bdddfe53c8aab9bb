// src/server/mod.rs
use crate::api::*;
use crate::config::Config;
use crate::database::DbPool;
use rocket::{routes, Build, Rocket};

pub mod routes;

pub struct ServerState {
    pub config: Config,
    pub db_pool: DbPool,
}

pub fn build_rocket(config: Config, db_pool: DbPool) -> Rocket<Build> {
    let state = ServerState { config, db_pool };

    rocket::build().manage(state).mount(
        "/api",
        routes![
            // Health and info endpoints
            routes::health::health_check,
            routes::health::index,
            // Stats
            get_stats,
            // Ingest
            ingest_csv,
            // Leads
            list_leads,
            // Campaigns
            send_campaign,
            run_followups,
            followup_candidates,
            check_replies,
            purge_closed,
            // Tracking
            track_open,
            track_click,
        ],
    )
}
