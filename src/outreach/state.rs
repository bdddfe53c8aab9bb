// src/outreach/state.rs
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Per-recipient outreach lifecycle:
/// New -> Sent -> { Replied | FollowedUp(1..max) | Closed }.
///
/// Every transition is checked; illegal ones return an error instead of
/// silently rewriting fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OutreachState {
    New,
    Sent {
        sent_at: DateTime<Utc>,
        follow_up_at: DateTime<Utc>,
    },
    FollowedUp {
        sent_at: DateTime<Utc>,
        count: u8,
        last_follow_up_at: DateTime<Utc>,
        follow_up_at: DateTime<Utc>,
    },
    Replied {
        sent_at: DateTime<Utc>,
        replied_at: DateTime<Utc>,
    },
    Closed {
        closed_at: DateTime<Utc>,
        reason: CloseReason,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CloseReason {
    #[serde(rename = "replied")]
    Replied,
    #[serde(rename = "max_follow_ups")]
    MaxFollowUps,
}

impl CloseReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            CloseReason::Replied => "replied",
            CloseReason::MaxFollowUps => "max_follow_ups",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "replied" => Some(CloseReason::Replied),
            "max_follow_ups" => Some(CloseReason::MaxFollowUps),
            _ => None,
        }
    }
}

#[derive(Debug, PartialEq)]
pub enum TransitionError {
    AlreadySent,
    NotYetSent,
    FollowUpNotDue { due: DateTime<Utc> },
    MaxFollowUpsReached,
    RecordClosed,
}

impl std::fmt::Display for TransitionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransitionError::AlreadySent => write!(f, "record was already sent"),
            TransitionError::NotYetSent => write!(f, "record has not been sent yet"),
            TransitionError::FollowUpNotDue { due } => {
                write!(f, "follow-up not due until {}", due.to_rfc3339())
            }
            TransitionError::MaxFollowUpsReached => write!(f, "maximum follow-ups reached"),
            TransitionError::RecordClosed => write!(f, "record is closed"),
        }
    }
}

impl std::error::Error for TransitionError {}

impl OutreachState {
    pub fn tag(&self) -> &'static str {
        match self {
            OutreachState::New => "new",
            OutreachState::Sent { .. } => "sent",
            OutreachState::FollowedUp { .. } => "followed_up",
            OutreachState::Replied { .. } => "replied",
            OutreachState::Closed { .. } => "closed",
        }
    }

    /// New -> Sent. Arms the first follow-up at sent_at + interval.
    pub fn send(
        &self,
        now: DateTime<Utc>,
        interval: Duration,
    ) -> Result<OutreachState, TransitionError> {
        match self {
            OutreachState::New => Ok(OutreachState::Sent {
                sent_at: now,
                follow_up_at: now + interval,
            }),
            OutreachState::Replied { .. } | OutreachState::Closed { .. } => {
                Err(TransitionError::RecordClosed)
            }
            _ => Err(TransitionError::AlreadySent),
        }
    }

    /// Sent/FollowedUp -> Replied. Reply detection is terminal; the purge
    /// treats replied_at as the closure timestamp.
    pub fn reply(&self, replied_at: DateTime<Utc>) -> Result<OutreachState, TransitionError> {
        match self {
            OutreachState::Sent { sent_at, .. }
            | OutreachState::FollowedUp { sent_at, .. } => Ok(OutreachState::Replied {
                sent_at: *sent_at,
                replied_at,
            }),
            OutreachState::New => Err(TransitionError::NotYetSent),
            OutreachState::Replied { .. } | OutreachState::Closed { .. } => {
                Err(TransitionError::RecordClosed)
            }
        }
    }

    /// Sent/FollowedUp(n) -> FollowedUp(n+1), only once follow_up_at has
    /// passed. The follow-up that reaches max_follow_ups closes the record.
    pub fn follow_up(
        &self,
        now: DateTime<Utc>,
        interval: Duration,
        max_follow_ups: u8,
    ) -> Result<OutreachState, TransitionError> {
        let (sent_at, count, follow_up_at) = match self {
            OutreachState::Sent {
                sent_at,
                follow_up_at,
            } => (*sent_at, 0u8, *follow_up_at),
            OutreachState::FollowedUp {
                sent_at,
                count,
                follow_up_at,
                ..
            } => (*sent_at, *count, *follow_up_at),
            OutreachState::New => return Err(TransitionError::NotYetSent),
            OutreachState::Replied { .. } | OutreachState::Closed { .. } => {
                return Err(TransitionError::RecordClosed)
            }
        };

        if count >= max_follow_ups {
            return Err(TransitionError::MaxFollowUpsReached);
        }
        if now < follow_up_at {
            return Err(TransitionError::FollowUpNotDue { due: follow_up_at });
        }

        let new_count = count + 1;
        if new_count >= max_follow_ups {
            Ok(OutreachState::Closed {
                closed_at: now,
                reason: CloseReason::MaxFollowUps,
            })
        } else {
            Ok(OutreachState::FollowedUp {
                sent_at,
                count: new_count,
                last_follow_up_at: now,
                follow_up_at: now + interval,
            })
        }
    }

    /// When the next follow-up becomes due, if one is still possible.
    pub fn follow_up_due(&self) -> Option<DateTime<Utc>> {
        match self {
            OutreachState::Sent { follow_up_at, .. } => Some(*follow_up_at),
            OutreachState::FollowedUp { follow_up_at, .. } => Some(*follow_up_at),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OutreachState::Replied { .. } | OutreachState::Closed { .. }
        )
    }

    /// Closure timestamp used for retention: replied_at for replies,
    /// closed_at for exhausted follow-ups.
    pub fn closed_since(&self) -> Option<DateTime<Utc>> {
        match self {
            OutreachState::Replied { replied_at, .. } => Some(*replied_at),
            OutreachState::Closed { closed_at, .. } => Some(*closed_at),
            _ => None,
        }
    }

    pub fn purge_eligible(&self, now: DateTime<Utc>, retention: Duration) -> bool {
        self.closed_since()
            .map(|closed| now - closed >= retention)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap()
    }

    fn interval() -> Duration {
        Duration::hours(48)
    }

    #[test]
    fn send_arms_follow_up_48h_out() {
        let state = OutreachState::New.send(t0(), interval()).unwrap();
        match state {
            OutreachState::Sent {
                sent_at,
                follow_up_at,
            } => {
                assert_eq!(sent_at, t0());
                assert_eq!(follow_up_at, t0() + Duration::hours(48));
            }
            other => panic!("expected Sent, got {:?}", other),
        }
    }

    #[test]
    fn double_send_is_rejected() {
        let sent = OutreachState::New.send(t0(), interval()).unwrap();
        assert_eq!(sent.send(t0(), interval()).unwrap_err(), TransitionError::AlreadySent);
    }

    #[test]
    fn follow_up_before_due_time_is_rejected() {
        let sent = OutreachState::New.send(t0(), interval()).unwrap();
        let early = t0() + Duration::hours(1);
        match sent.follow_up(early, interval(), 3).unwrap_err() {
            TransitionError::FollowUpNotDue { due } => {
                assert_eq!(due, t0() + Duration::hours(48))
            }
            other => panic!("expected FollowUpNotDue, got {:?}", other),
        }
    }

    #[test]
    fn each_follow_up_rearms_the_timer() {
        let sent = OutreachState::New.send(t0(), interval()).unwrap();
        let first_due = t0() + Duration::hours(48);
        let fu1 = sent.follow_up(first_due, interval(), 3).unwrap();
        match &fu1 {
            OutreachState::FollowedUp {
                count, follow_up_at, ..
            } => {
                assert_eq!(*count, 1);
                assert_eq!(*follow_up_at, first_due + Duration::hours(48));
            }
            other => panic!("expected FollowedUp, got {:?}", other),
        }
    }

    #[test]
    fn third_follow_up_closes_the_record() {
        let mut state = OutreachState::New.send(t0(), interval()).unwrap();
        let mut now = t0();
        for _ in 0..2 {
            now = state.follow_up_due().unwrap();
            state = state.follow_up(now, interval(), 3).unwrap();
        }
        // count == 2 here; the third exhausts the budget
        now = state.follow_up_due().unwrap();
        let closed = state.follow_up(now, interval(), 3).unwrap();
        match closed {
            OutreachState::Closed { reason, closed_at } => {
                assert_eq!(reason, CloseReason::MaxFollowUps);
                assert_eq!(closed_at, now);
            }
            other => panic!("expected Closed, got {:?}", other),
        }
        // and nothing further is schedulable
        assert_eq!(
            closed.follow_up(now + interval(), interval(), 3).unwrap_err(),
            TransitionError::RecordClosed
        );
        assert!(closed.follow_up_due().is_none());
    }

    #[test]
    fn record_at_the_cap_schedules_nothing_further() {
        // e.g. a stored record from before the cap was lowered
        let state = OutreachState::FollowedUp {
            sent_at: t0(),
            count: 3,
            last_follow_up_at: t0() + Duration::days(6),
            follow_up_at: t0() + Duration::days(8),
        };
        assert_eq!(
            state
                .follow_up(t0() + Duration::days(9), interval(), 3)
                .unwrap_err(),
            TransitionError::MaxFollowUpsReached
        );
    }

    #[test]
    fn reply_is_terminal() {
        let sent = OutreachState::New.send(t0(), interval()).unwrap();
        let replied = sent.reply(t0() + Duration::hours(5)).unwrap();
        assert!(replied.is_terminal());
        assert_eq!(
            replied.follow_up(t0() + interval(), interval(), 3).unwrap_err(),
            TransitionError::RecordClosed
        );
        assert_eq!(
            replied.reply(t0() + Duration::hours(6)).unwrap_err(),
            TransitionError::RecordClosed
        );
    }

    #[test]
    fn reply_on_unsent_record_is_rejected() {
        assert_eq!(
            OutreachState::New.reply(t0()).unwrap_err(),
            TransitionError::NotYetSent
        );
    }

    #[test]
    fn purge_honors_retention_window() {
        let replied = OutreachState::New
            .send(t0(), interval())
            .unwrap()
            .reply(t0() + Duration::hours(5))
            .unwrap();
        let retention = Duration::days(30);
        assert!(!replied.purge_eligible(t0() + Duration::days(29), retention));
        assert!(replied.purge_eligible(t0() + Duration::days(31), retention));

        let open = OutreachState::New.send(t0(), interval()).unwrap();
        assert!(!open.purge_eligible(t0() + Duration::days(365), retention));
    }
}
