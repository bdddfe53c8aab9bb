// src/outreach/scheduler.rs
use std::collections::HashMap;

use chrono::{Duration, Utc};
use serde::Deserialize;
use tracing::{debug, error, info, warn};

use crate::config::OutreachConfig;
use crate::database::{self, DbPool, SentEmailRecord};
use crate::email_sender::MailgunSender;
use crate::models::{CampaignReport, Lead};
use crate::outreach::quota::{DailyQuota, QuotaExceeded};
use crate::outreach::state::{OutreachState, TransitionError};
use crate::template::TemplateRenderer;

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

#[derive(Debug, Clone, Deserialize)]
pub struct CampaignRequest {
    pub user_id: String,
    pub sender_name: String,
    pub subject_template: String,
    pub body_template: String,
    /// variable name -> source column
    pub field_mapping: HashMap<String, String>,
    /// recipient lead emails
    pub recipients: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FollowUpRequest {
    pub user_id: String,
    pub sender_name: String,
    pub body_template: String,
    pub field_mapping: HashMap<String, String>,
}

/// Drives the per-recipient state machine: initial sends, follow-ups,
/// reply application, retention purge. Batches run sequentially with a
/// delay between emails purely for provider rate-limit etiquette.
pub struct OutreachScheduler {
    pool: DbPool,
    config: OutreachConfig,
    quota: DailyQuota,
    renderer: TemplateRenderer,
}

impl OutreachScheduler {
    pub fn new(pool: DbPool, config: OutreachConfig) -> Self {
        let quota = DailyQuota::new(pool.clone(), config.daily_quota);
        Self {
            pool,
            config,
            quota,
            renderer: TemplateRenderer::new(),
        }
    }

    pub fn quota(&self) -> &DailyQuota {
        &self.quota
    }

    fn follow_up_interval(&self) -> Duration {
        Duration::hours(self.config.follow_up_interval_hours)
    }

    /// Delay between two sends in a batch, with a little jitter so the
    /// cadence is not perfectly mechanical.
    fn inter_send_delay_ms(&self) -> u64 {
        self.config.delay_between_emails_ms + fastrand::u64(0..=1000)
    }

    /// Send the initial campaign email to each recipient.
    ///
    /// A batch starting with no remaining budget is rejected outright with
    /// a quota error; a batch that exhausts the budget mid-way reports the
    /// remainder as skipped. One recipient failing never aborts the batch.
    pub async fn send_campaign(
        &self,
        sender: &MailgunSender,
        request: &CampaignRequest,
    ) -> Result<CampaignReport> {
        let now = Utc::now();
        let mut report = CampaignReport {
            campaign_id: uuid::Uuid::new_v4().to_string(),
            requested: request.recipients.len(),
            ..Default::default()
        };

        let status = self.quota.status(&request.user_id, now).await?;
        if status.remaining_today <= 0 {
            return Err(Box::new(QuotaExceeded {
                user_id: request.user_id.clone(),
                day: status.day,
                quota: status.quota,
            }));
        }

        let leads = database::get_leads_by_emails(&self.pool, &request.recipients).await?;
        let leads_by_email: HashMap<String, &Lead> = leads
            .iter()
            .filter_map(|l| l.email.clone().map(|e| (e.to_lowercase(), l)))
            .collect();

        info!(
            "Starting campaign {} for {}: {} recipients, {} remaining today",
            report.campaign_id,
            request.user_id,
            request.recipients.len(),
            status.remaining_today
        );

        let total = request.recipients.len();
        for (i, recipient) in request.recipients.iter().enumerate() {
            let email = recipient.to_lowercase();

            let lead = match leads_by_email.get(&email) {
                Some(lead) => *lead,
                None => {
                    report.failed += 1;
                    report.errors.push(format!("{}: no lead on file", email));
                    continue;
                }
            };

            if database::get_sent_record(&self.pool, &request.user_id, &email)
                .await?
                .is_some()
            {
                debug!("{} already has an outreach record, skipping", email);
                report.skipped += 1;
                continue;
            }

            // Reserve before sending; a send attempt consumes the slot
            // whether or not the provider accepts it.
            if !self.quota.try_reserve(&request.user_id, Utc::now()).await? {
                let remaining = total - i;
                report.skipped += remaining;
                report.errors.push(format!(
                    "daily quota reached after {} sends; {} recipients skipped",
                    report.sent, remaining
                ));
                warn!("Quota exhausted mid-batch for {}", request.user_id);
                break;
            }

            let row = lead.field_map();
            let subject = self.renderer.render(
                &request.subject_template,
                &request.field_mapping,
                &row,
                &request.sender_name,
            );
            let body = self.renderer.render(
                &request.body_template,
                &request.field_mapping,
                &row,
                &request.sender_name,
            );

            let record_id = database::record_id(&request.user_id, &email);
            let to_name = lead
                .contact_name
                .as_deref()
                .unwrap_or(&lead.business_name);

            match sender
                .send_email(&email, to_name, &subject, &body, &record_id)
                .await
            {
                Ok(response) => {
                    let sent_now = Utc::now();
                    let state = OutreachState::New
                        .send(sent_now, self.follow_up_interval())
                        .map_err(|e| format!("state error for {}: {}", email, e))?;

                    let record = SentEmailRecord {
                        id: record_id,
                        user_id: request.user_id.clone(),
                        email: email.clone(),
                        thread_id: response.id.clone(),
                        subject: subject.clone(),
                        state,
                        follow_up_count: 0,
                        opened_count: 0,
                        clicked_count: 0,
                        interest_score: 0,
                    };
                    database::insert_sent_record(&self.pool, &record).await?;
                    database::mark_lead_contacted(&self.pool, &email, sent_now).await?;

                    report.sent += 1;
                    info!("✅ Sent to {} ({}/{})", email, i + 1, total);
                }
                Err(e) => {
                    report.failed += 1;
                    report.errors.push(format!("{}: {}", email, e));
                    error!("❌ Failed to send to {}: {}", email, e);
                }
            }

            if i + 1 < total {
                tokio::time::sleep(tokio::time::Duration::from_millis(
                    self.inter_send_delay_ms(),
                ))
                .await;
            }
        }

        info!(
            "Campaign complete: {} sent, {} failed, {} skipped",
            report.sent, report.failed, report.skipped
        );
        Ok(report)
    }

    /// Send a follow-up to every record whose timer has elapsed, most
    /// interested recipients first. Each follow-up re-arms the timer; the
    /// one that reaches the cap closes the record.
    pub async fn run_follow_ups(
        &self,
        sender: &MailgunSender,
        request: &FollowUpRequest,
    ) -> Result<CampaignReport> {
        let now = Utc::now();
        let candidates =
            database::get_followup_candidates(&self.pool, &request.user_id, now).await?;
        let mut report = CampaignReport {
            campaign_id: uuid::Uuid::new_v4().to_string(),
            requested: candidates.len(),
            ..Default::default()
        };

        if candidates.is_empty() {
            info!("No follow-ups due for {}", request.user_id);
            return Ok(report);
        }

        let status = self.quota.status(&request.user_id, now).await?;
        if status.remaining_today <= 0 {
            return Err(Box::new(QuotaExceeded {
                user_id: request.user_id.clone(),
                day: status.day,
                quota: status.quota,
            }));
        }

        info!(
            "Running follow-ups for {}: {} due",
            request.user_id,
            candidates.len()
        );

        let total = candidates.len();
        for (i, record) in candidates.iter().enumerate() {
            if !self.quota.try_reserve(&request.user_id, Utc::now()).await? {
                let remaining = total - i;
                report.skipped += remaining;
                report.errors.push(format!(
                    "daily quota reached after {} follow-ups; {} skipped",
                    report.sent, remaining
                ));
                break;
            }

            match self.send_one_follow_up(sender, request, record).await {
                Ok(()) => report.sent += 1,
                Err(e) => {
                    report.failed += 1;
                    report.errors.push(format!("{}: {}", record.email, e));
                    error!("❌ Follow-up to {} failed: {}", record.email, e);
                }
            }

            if i + 1 < total {
                tokio::time::sleep(tokio::time::Duration::from_millis(
                    self.inter_send_delay_ms(),
                ))
                .await;
            }
        }

        info!(
            "Follow-up run complete: {} sent, {} failed, {} skipped",
            report.sent, report.failed, report.skipped
        );
        Ok(report)
    }

    async fn send_one_follow_up(
        &self,
        sender: &MailgunSender,
        request: &FollowUpRequest,
        record: &SentEmailRecord,
    ) -> Result<()> {
        let leads = database::get_leads_by_emails(&self.pool, &[record.email.clone()]).await?;
        let row = leads
            .first()
            .map(|l| l.field_map())
            .unwrap_or_default();
        let to_name = leads
            .first()
            .and_then(|l| l.contact_name.clone())
            .or_else(|| leads.first().map(|l| l.business_name.clone()))
            .unwrap_or_else(|| record.email.clone());

        let body = self.renderer.render(
            &request.body_template,
            &request.field_mapping,
            &row,
            &request.sender_name,
        );
        let subject = format!("Re: {}", record.subject);

        sender
            .send_email(&record.email, &to_name, &subject, &body, &record.id)
            .await?;

        let next = match record.state.follow_up(
            Utc::now(),
            self.follow_up_interval(),
            self.config.max_follow_ups,
        ) {
            Ok(next) => next,
            // The candidate query already filtered on due time and state;
            // a race here just means someone else advanced the record.
            Err(TransitionError::FollowUpNotDue { due }) => {
                return Err(format!("not due until {}", due.to_rfc3339()).into())
            }
            Err(e) => return Err(Box::new(e)),
        };

        let closes = matches!(next, OutreachState::Closed { .. });
        database::update_record_state(&self.pool, &record.id, &next).await?;
        if closes {
            database::increment_follow_up_count(&self.pool, &record.id).await?;
            info!("Record {} closed after final follow-up", record.id);
        }
        Ok(())
    }

    /// Poll the provider inbox and mark replied records. Returns how many
    /// records transitioned.
    pub async fn check_replies(&self, sender: &MailgunSender, user_id: &str) -> Result<usize> {
        let open = database::get_open_records(&self.pool, user_id).await?;
        if open.is_empty() {
            debug!("No open records to poll replies for");
            return Ok(0);
        }

        let thread_ids: Vec<String> = open.iter().map(|r| r.thread_id.clone()).collect();
        let replies = sender.fetch_replies(&thread_ids).await?;

        let by_thread: HashMap<&str, &SentEmailRecord> =
            open.iter().map(|r| (r.thread_id.as_str(), r)).collect();

        let mut transitioned = 0;
        for reply in &replies {
            let record = match by_thread.get(reply.thread_id.as_str()) {
                Some(record) => *record,
                None => continue,
            };
            match record.state.reply(reply.received_at) {
                Ok(next) => {
                    database::update_record_state(&self.pool, &record.id, &next).await?;
                    database::bump_interest_for_reply(&self.pool, &record.id).await?;
                    info!("📨 Reply from {} on {}", reply.from, record.email);
                    transitioned += 1;
                }
                Err(TransitionError::RecordClosed) => {
                    debug!("Reply on already-terminal record {}", record.id);
                }
                Err(e) => {
                    warn!("Reply transition failed for {}: {}", record.id, e);
                }
            }
        }

        Ok(transitioned)
    }

    /// Delete terminal records past the retention window.
    pub async fn purge_closed(&self) -> Result<usize> {
        database::purge_closed_records(
            &self.pool,
            Utc::now(),
            Duration::days(self.config.retention_days),
        )
        .await
    }
}
