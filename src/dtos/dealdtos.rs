// dtos/dealdtos.rs
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::dealmodel::{Deal, DealStatus, SubmittedWork, WorkRequirement};
use crate::models::usermodel::UserRole;

#[derive(Debug, Deserialize)]
pub struct DealFilterQuery {
    pub status: Option<DealStatus>,
}

#[derive(Debug, Serialize, Clone)]
pub struct DealOrderBrief {
    pub id: Uuid,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_description: Option<String>,
}

#[derive(Debug, Serialize, Clone)]
pub struct DealCreatorBrief {
    pub id: Uuid,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Serialize, Clone)]
pub struct DealAdvertiserBrief {
    pub id: Uuid,
    pub company_name: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SignatureItem {
    pub user_id: Uuid,
    pub name: Option<String>,
    pub role: Option<UserRole>,
    pub status: crate::models::dealmodel::SignatureStatus,
    pub signed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct WorkRequirementItem {
    pub id: Uuid,
    pub label: String,
    pub is_completed: bool,
}

impl From<WorkRequirement> for WorkRequirementItem {
    fn from(r: WorkRequirement) -> Self {
        WorkRequirementItem {
            id: r.id,
            label: r.label,
            is_completed: r.is_completed,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SubmittedWorkItem {
    pub id: Uuid,
    pub title: String,
    pub file_url: String,
    pub duration: Option<String>,
    pub format: Option<String>,
    pub uploaded_at: Option<DateTime<Utc>>,
}

impl From<SubmittedWork> for SubmittedWorkItem {
    fn from(w: SubmittedWork) -> Self {
        SubmittedWorkItem {
            id: w.id,
            title: w.title,
            file_url: w.file_url,
            duration: w.duration,
            format: w.format,
            uploaded_at: w.uploaded_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DealListItem {
    pub id: Uuid,
    pub order: DealOrderBrief,
    pub creator: DealCreatorBrief,
    pub advertiser: DealAdvertiserBrief,
    pub budget: i64,
    pub currency: String,
    pub deadline: NaiveDate,
    pub conditions: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub video_count: Option<i32>,
    pub status: DealStatus,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct ContractInfo {
    pub signatures: Vec<SignatureItem>,
}

#[derive(Debug, Serialize)]
pub struct DealDetail {
    #[serde(flatten)]
    pub summary: DealListItem,
    pub contract: ContractInfo,
    pub work_requirements: Vec<WorkRequirementItem>,
    pub submitted_work: Vec<SubmittedWorkItem>,
    pub escrow_amount: i64,
    pub platform_fee: i64,
    pub creator_payout: i64,
    pub payment_status: &'static str,
    pub work_submitted_at: Option<DateTime<Utc>>,
    pub dispute_reason: Option<String>,
}

/// "paid" once the advertiser has paid, "held" while escrow is funded but
/// not yet paid out, "pending" before any money moved.
pub fn payment_status(deal: &Deal) -> &'static str {
    if deal.paid_at.is_some() {
        "paid"
    } else if deal.escrow_amount > 0 {
        "held"
    } else {
        "pending"
    }
}

#[derive(Debug, Serialize)]
pub struct RequestSignResponse {
    pub deal_id: Uuid,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SignDealDto {
    #[validate(length(min = 6, max = 6, message = "code must be 6 digits"))]
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct SignDealResponse {
    pub deal_id: Uuid,
    pub signature_status: &'static str,
    pub deal_status: DealStatus,
}

#[derive(Debug, Deserialize, Validate)]
pub struct PayDealDto {
    #[validate(length(min = 1, max = 50))]
    pub payment_method: String,
}

#[derive(Debug, Serialize)]
pub struct PaymentInfo {
    pub amount: i64,
    pub currency: String,
    pub method: String,
    pub paid_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct PayDealResponse {
    pub deal_id: Uuid,
    pub status: DealStatus,
    pub escrow_amount: i64,
    pub payment: PaymentInfo,
}

#[derive(Debug, Serialize)]
pub struct SubmitWorkResponse {
    pub deal_id: Uuid,
    pub status: DealStatus,
    pub work_submitted_at: Option<DateTime<Utc>>,
    pub submitted_work: Vec<SubmittedWorkItem>,
}

#[derive(Debug, Serialize)]
pub struct PayoutInfo {
    pub budget: i64,
    pub platform_fee: i64,
    pub creator_payout: i64,
    pub currency: String,
}

#[derive(Debug, Serialize)]
pub struct ConfirmWorkResponse {
    pub deal_id: Uuid,
    pub status: DealStatus,
    pub payout: PayoutInfo,
}

#[derive(Debug, Deserialize, Validate)]
pub struct DisputeDealDto {
    #[validate(length(min = 1, max = 5000))]
    pub reason: String,
}

#[derive(Debug, Serialize)]
pub struct DisputeDealResponse {
    pub deal_id: Uuid,
    pub status: DealStatus,
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deal_with(escrow: i64, paid: bool) -> Deal {
        Deal {
            id: Uuid::new_v4(),
            order_id: Uuid::new_v4(),
            offer_id: Uuid::new_v4(),
            creator_id: Uuid::new_v4(),
            advertiser_id: Uuid::new_v4(),
            budget: 1000,
            currency: "KZT".to_string(),
            deadline: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            conditions: None,
            start_date: None,
            end_date: None,
            video_count: None,
            status: DealStatus::ContractPending,
            escrow_amount: escrow,
            platform_fee: 0,
            creator_payout: 0,
            payment_method: None,
            paid_at: paid.then(Utc::now),
            work_submitted_at: None,
            dispute_reason: None,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn payment_status_derivation() {
        assert_eq!(payment_status(&deal_with(0, false)), "pending");
        assert_eq!(payment_status(&deal_with(1000, false)), "held");
        assert_eq!(payment_status(&deal_with(1000, true)), "paid");
    }
}
