use serde::Serialize;

use crate::core::time::format_primitive;
use crate::db::models::PrizeAward;
use crate::db::types::AttemptStatus;
use crate::services::exams::PrizePayout;
use crate::services::leaderboard::{LeaderboardData, LeaderboardEntry};

#[derive(Debug, Serialize)]
pub(crate) struct LeaderboardEntryResponse {
    pub(crate) position: u32,
    pub(crate) attempt_id: String,
    pub(crate) student_id: String,
    pub(crate) score: f64,
    pub(crate) total_score: f64,
    pub(crate) percentage: f64,
    pub(crate) prize_cents: i64,
    pub(crate) status: AttemptStatus,
    pub(crate) submitted_at: String,
}

impl From<LeaderboardEntry> for LeaderboardEntryResponse {
    fn from(entry: LeaderboardEntry) -> Self {
        LeaderboardEntryResponse {
            position: entry.position,
            attempt_id: entry.attempt_id,
            student_id: entry.student_id,
            score: entry.score,
            total_score: entry.total_score,
            percentage: entry.percentage,
            prize_cents: entry.prize_cents,
            status: entry.status,
            submitted_at: format_primitive(entry.submitted_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct LeaderboardResponse {
    pub(crate) exam_id: String,
    pub(crate) prize_pool_cents: i64,
    pub(crate) entries: Vec<LeaderboardEntryResponse>,
    pub(crate) current_user_position: Option<u32>,
}

impl From<LeaderboardData> for LeaderboardResponse {
    fn from(data: LeaderboardData) -> Self {
        LeaderboardResponse {
            exam_id: data.exam_id,
            prize_pool_cents: data.prize_pool_cents,
            entries: data.entries.into_iter().map(Into::into).collect(),
            current_user_position: data.current_user_position,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct PrizeAwardResponse {
    pub(crate) position: i32,
    pub(crate) attempt_id: String,
    pub(crate) student_id: String,
    pub(crate) amount_cents: i64,
    pub(crate) transaction_id: Option<String>,
    pub(crate) paid_at: Option<String>,
}

impl From<PrizeAward> for PrizeAwardResponse {
    fn from(award: PrizeAward) -> Self {
        PrizeAwardResponse {
            position: award.position,
            attempt_id: award.attempt_id,
            student_id: award.student_id,
            amount_cents: award.amount_cents,
            transaction_id: award.transaction_id,
            paid_at: award.paid_at.map(format_primitive),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct PrizePayoutResponse {
    pub(crate) credited: usize,
    pub(crate) awards: Vec<PrizeAwardResponse>,
}

impl From<PrizePayout> for PrizePayoutResponse {
    fn from(payout: PrizePayout) -> Self {
        PrizePayoutResponse {
            credited: payout.credited,
            awards: payout.awards.into_iter().map(Into::into).collect(),
        }
    }
}
