use std::cmp::Ordering;
use std::collections::HashSet;

use time::PrimitiveDateTime;

use crate::db::models::{Attempt, Exam};
use crate::db::types::AttemptStatus;

const BPS_DENOMINATOR: i128 = 10_000;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct LeaderboardEntry {
    pub(crate) position: u32,
    pub(crate) attempt_id: String,
    pub(crate) student_id: String,
    pub(crate) score: f64,
    pub(crate) total_score: f64,
    pub(crate) percentage: f64,
    pub(crate) prize_cents: i64,
    pub(crate) status: AttemptStatus,
    pub(crate) submitted_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct LeaderboardData {
    pub(crate) exam_id: String,
    pub(crate) prize_pool_cents: i64,
    pub(crate) entries: Vec<LeaderboardEntry>,
    pub(crate) current_user_position: Option<u32>,
}

/// Prize pool split by position, in basis points of the pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PrizeSchedule {
    pub(crate) pool_cents: i64,
    pub(crate) shares_bps: Vec<u32>,
}

impl PrizeSchedule {
    pub(crate) fn from_exam(exam: &Exam) -> Self {
        Self { pool_cents: exam.prize_pool_cents, shares_bps: exam.prize_shares_bps.0.clone() }
    }

    /// Floor of `pool * share / 10000`; positions past the schedule get nothing.
    pub(crate) fn prize_for(&self, position: u32) -> i64 {
        let Some(index) = (position as usize).checked_sub(1) else {
            return 0;
        };
        let Some(share) = self.shares_bps.get(index) else {
            return 0;
        };

        let amount = i128::from(self.pool_cents.max(0)) * i128::from(*share) / BPS_DENOMINATOR;
        i64::try_from(amount).unwrap_or(i64::MAX)
    }
}

pub(crate) fn is_ranked(exam: &Exam, status: AttemptStatus) -> bool {
    match status {
        AttemptStatus::Completed => true,
        AttemptStatus::TimedOut => exam.rank_timed_out,
        AttemptStatus::InProgress => false,
    }
}

/// Ranks finished attempts: score desc, earlier submission first, then attempt id.
/// Each student appears once, with their best attempt.
pub(crate) fn build(exam: &Exam, attempts: &[Attempt], requesting_student: Option<&str>) -> LeaderboardData {
    let mut ranked: Vec<&Attempt> =
        attempts.iter().filter(|attempt| is_ranked(exam, attempt.status)).collect();
    ranked.sort_by(|left, right| compare(left, right));

    let schedule = PrizeSchedule::from_exam(exam);
    let mut seen = HashSet::new();
    let mut entries = Vec::new();

    for attempt in ranked {
        if !seen.insert(attempt.student_id.as_str()) {
            continue;
        }

        let position = entries.len() as u32 + 1;
        let score = attempt.score.unwrap_or(0.0);
        entries.push(LeaderboardEntry {
            position,
            attempt_id: attempt.id.clone(),
            student_id: attempt.student_id.clone(),
            score,
            total_score: attempt.total_score,
            percentage: percentage(score, attempt.total_score),
            prize_cents: schedule.prize_for(position),
            status: attempt.status,
            submitted_at: finished_at(attempt),
        });
    }

    let current_user_position = requesting_student.and_then(|student_id| {
        entries.iter().find(|entry| entry.student_id == student_id).map(|entry| entry.position)
    });

    LeaderboardData {
        exam_id: exam.id.clone(),
        prize_pool_cents: exam.prize_pool_cents,
        entries,
        current_user_position,
    }
}

pub(crate) fn percentage(score: f64, total: f64) -> f64 {
    if total <= 0.0 {
        return 0.0;
    }
    (score / total * 10_000.0).round() / 100.0
}

fn compare(left: &Attempt, right: &Attempt) -> Ordering {
    right
        .score
        .unwrap_or(0.0)
        .total_cmp(&left.score.unwrap_or(0.0))
        .then_with(|| finished_at(left).cmp(&finished_at(right)))
        .then_with(|| left.id.cmp(&right.id))
}

fn finished_at(attempt: &Attempt) -> PrimitiveDateTime {
    attempt.submitted_at.unwrap_or(attempt.expires_at)
}
