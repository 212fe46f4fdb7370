// models/dealmodel.rs
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "deal_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DealStatus {
    ContractPending,
    ContractSigned,
    PendingPayment,
    InProgress,
    WorkSubmitted,
    Completed,
    Disputed,
}

impl DealStatus {
    pub fn to_str(&self) -> &str {
        match self {
            DealStatus::ContractPending => "contract_pending",
            DealStatus::ContractSigned => "contract_signed",
            DealStatus::PendingPayment => "pending_payment",
            DealStatus::InProgress => "in_progress",
            DealStatus::WorkSubmitted => "work_submitted",
            DealStatus::Completed => "completed",
            DealStatus::Disputed => "disputed",
        }
    }

    /// The contract can only be signed before payment is admitted.
    pub fn is_signable(&self) -> bool {
        matches!(self, DealStatus::ContractPending | DealStatus::ContractSigned)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, DealStatus::Completed | DealStatus::Disputed)
    }

    /// Legal transition table. The service consults it before every
    /// mutation; the store re-checks with a status-guarded UPDATE so a
    /// concurrent transition still affects zero rows.
    pub fn can_transition_to(&self, to: DealStatus) -> bool {
        match (self, to) {
            (DealStatus::ContractPending, DealStatus::ContractSigned) => true,
            (DealStatus::ContractPending, DealStatus::PendingPayment) => true,
            (DealStatus::ContractSigned, DealStatus::PendingPayment) => true,
            (DealStatus::PendingPayment, DealStatus::InProgress) => true,
            (DealStatus::InProgress, DealStatus::WorkSubmitted) => true,
            (DealStatus::WorkSubmitted, DealStatus::Completed) => true,
            (DealStatus::WorkSubmitted, DealStatus::Disputed) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "signature_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SignatureStatus {
    Pending,
    Signed,
}

#[derive(Debug, Serialize, Deserialize, Clone, sqlx::FromRow)]
pub struct Deal {
    pub id: Uuid,
    pub order_id: Uuid,
    pub offer_id: Uuid,
    pub creator_id: Uuid,
    pub advertiser_id: Uuid,
    pub budget: i64,
    pub currency: String,
    pub deadline: NaiveDate,
    pub conditions: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub video_count: Option<i32>,
    pub status: DealStatus,
    pub escrow_amount: i64,
    pub platform_fee: i64,
    pub creator_payout: i64,
    pub payment_method: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub work_submitted_at: Option<DateTime<Utc>>,
    pub dispute_reason: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// One row per (deal, party); at most two per deal. The sms_code column is
/// a consumed secret: it is cleared inside the signing transaction and must
/// never be readable after a successful verification.
#[derive(Debug, Serialize, Deserialize, Clone, sqlx::FromRow)]
pub struct DealSignature {
    pub id: Uuid,
    pub deal_id: Uuid,
    pub user_id: Uuid,
    pub status: SignatureStatus,
    #[serde(skip_serializing)]
    pub sms_code: Option<String>,
    pub sms_sent_at: Option<DateTime<Utc>>,
    pub signed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, Clone, sqlx::FromRow)]
pub struct WorkRequirement {
    pub id: Uuid,
    pub deal_id: Uuid,
    pub label: String,
    pub is_completed: bool,
    pub sort_order: i32,
}

#[derive(Debug, Serialize, Deserialize, Clone, sqlx::FromRow)]
pub struct SubmittedWork {
    pub id: Uuid,
    pub deal_id: Uuid,
    pub title: String,
    pub file_url: String,
    pub duration: Option<String>,
    pub format: Option<String>,
    pub uploaded_at: Option<DateTime<Utc>>,
}

/// Orders are owned by the listing subsystem; the core only reads a brief
/// projection of them for deal and offer views.
#[derive(Debug, Serialize, Deserialize, Clone, sqlx::FromRow)]
pub struct OrderSummary {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
}

/// Commission split for a completed deal. Integer minor-currency units,
/// truncation toward zero, so fee + payout always reconstructs the budget.
pub fn compute_payout(budget: i64, commission_percent: i64) -> (i64, i64) {
    let platform_fee = budget * commission_percent / 100;
    let creator_payout = budget - platform_fee;
    (platform_fee, creator_payout)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payout_splits_sum_to_budget() {
        for budget in [0i64, 1, 99, 100, 101, 4999, 100_000, 7_777_777] {
            for pct in [0i64, 1, 10, 15, 33, 100] {
                let (fee, payout) = compute_payout(budget, pct);
                assert_eq!(fee + payout, budget, "budget={budget} pct={pct}");
                assert_eq!(fee, budget * pct / 100);
            }
        }
    }

    #[test]
    fn payout_default_commission_scenario() {
        let (fee, payout) = compute_payout(100_000, 10);
        assert_eq!(fee, 10_000);
        assert_eq!(payout, 90_000);
    }

    #[test]
    fn payout_truncates_fractional_fee() {
        // 10% of 1005 is 100.5; the half unit stays with the creator.
        let (fee, payout) = compute_payout(1005, 10);
        assert_eq!(fee, 100);
        assert_eq!(payout, 905);
    }

    #[test]
    fn happy_path_transitions_are_legal() {
        use DealStatus::*;
        assert!(ContractPending.can_transition_to(ContractSigned));
        assert!(ContractSigned.can_transition_to(PendingPayment));
        // Single-roundtrip signing: both parties signed in one call chain.
        assert!(ContractPending.can_transition_to(PendingPayment));
        assert!(PendingPayment.can_transition_to(InProgress));
        assert!(InProgress.can_transition_to(WorkSubmitted));
        assert!(WorkSubmitted.can_transition_to(Completed));
        assert!(WorkSubmitted.can_transition_to(Disputed));
    }

    #[test]
    fn skipping_states_is_illegal() {
        use DealStatus::*;
        assert!(!ContractPending.can_transition_to(InProgress));
        assert!(!ContractPending.can_transition_to(Completed));
        assert!(!PendingPayment.can_transition_to(WorkSubmitted));
        assert!(!InProgress.can_transition_to(Completed));
        assert!(!InProgress.can_transition_to(Disputed));
    }

    #[test]
    fn terminal_states_admit_nothing() {
        use DealStatus::*;
        for to in [
            ContractPending,
            ContractSigned,
            PendingPayment,
            InProgress,
            WorkSubmitted,
            Completed,
            Disputed,
        ] {
            assert!(!Completed.can_transition_to(to));
            assert!(!Disputed.can_transition_to(to));
        }
        assert!(Completed.is_terminal());
        assert!(Disputed.is_terminal());
        assert!(!WorkSubmitted.is_terminal());
    }

    #[test]
    fn mutation_targets_have_a_single_admitting_state() {
        use DealStatus::*;
        let all = [
            ContractPending,
            ContractSigned,
            PendingPayment,
            InProgress,
            WorkSubmitted,
            Completed,
            Disputed,
        ];
        let admitting = |to: DealStatus| {
            all.iter()
                .copied()
                .filter(|from| from.can_transition_to(to))
                .collect::<Vec<_>>()
        };
        // pay, submit_work, confirm_work, dispute each admit one state only.
        assert_eq!(admitting(InProgress), vec![PendingPayment]);
        assert_eq!(admitting(WorkSubmitted), vec![InProgress]);
        assert_eq!(admitting(Completed), vec![WorkSubmitted]);
        assert_eq!(admitting(Disputed), vec![WorkSubmitted]);
    }

    #[test]
    fn signable_only_during_contract_phase() {
        use DealStatus::*;
        assert!(ContractPending.is_signable());
        assert!(ContractSigned.is_signable());
        assert!(!PendingPayment.is_signable());
        assert!(!InProgress.is_signable());
        assert!(!Completed.is_signable());
    }
}
