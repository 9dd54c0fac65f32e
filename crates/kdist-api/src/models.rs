// Wire types for the distributor backend.
//
// Field names follow the backend's camelCase JSON. Timestamps are Unix
// seconds; prices and amounts are integer cents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Envelope ────────────────────────────────────────────────────────

/// The `{code, message, data}` wrapper around every response body.
///
/// `code == 0` means success regardless of the HTTP status.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiEnvelope<T> {
    pub code: i64,
    #[serde(default)]
    pub message: String,
    pub data: Option<T>,
}

// ── Pagination ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    /// Zero-based page index.
    pub page: u32,
    pub page_size: u32,
    pub total: u64,
}

/// A page of items plus its position in the full collection.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Paginated<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    pub pagination: Pagination,
}

impl<T> Paginated<T> {
    /// Number of pages implied by `total` and `page_size`.
    pub fn page_count(&self) -> u64 {
        let size = u64::from(self.pagination.page_size);
        if size == 0 {
            return 0;
        }
        self.pagination.total.div_ceil(size)
    }

    /// Whether a page after this one exists.
    pub fn has_next(&self) -> bool {
        u64::from(self.pagination.page) + 1 < self.page_count()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
}

impl PaginationParams {
    pub fn new(page: u32, page_size: u32) -> Self {
        Self {
            page: Some(page),
            page_size: Some(page_size),
        }
    }
}

// ── Plans ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanDiscount {
    pub percentage: f64,
    pub valid_until: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub pid: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Price in cents.
    pub price: i64,
    pub origin_price: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    pub month: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features: Option<Vec<String>>,
    #[serde(default)]
    pub highlight: bool,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount: Option<PlanDiscount>,
}

impl Plan {
    /// `name` when the backend provides it, otherwise `label`.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.label)
    }
}

// ── Invite codes ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InviteCodeConfig {
    pub download_reward_days: u32,
    pub purchase_reward_days: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InviteCode {
    pub code: String,
    pub created_at: i64,
    #[serde(default)]
    pub remark: String,
    #[serde(default)]
    pub link: String,
    pub config: InviteCodeConfig,
    #[serde(default)]
    pub download_count: u64,
    #[serde(default)]
    pub download_reward: u64,
    #[serde(default)]
    pub purchase_count: u64,
    #[serde(default)]
    pub purchase_reward: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InviteCodeBasic {
    pub code: String,
    pub created_at: i64,
    #[serde(default)]
    pub remark: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateInviteCodeRemarkRequest {
    pub remark: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InviteUsersParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invite_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct InviteCodeInfoParams {
    pub code: String,
}

// ── Users ───────────────────────────────────────────────────────────

/// A user who signed up through one of the distributor's invite codes.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvitedUser {
    pub uuid: String,
    pub expired_at: i64,
    #[serde(default)]
    pub is_first_order_done: bool,
    pub invite_code: InviteCodeBasic,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_count: Option<u32>,
}

impl InvitedUser {
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.expired_at > now.timestamp()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetailUser {
    pub uuid: String,
    pub email: String,
    pub expired_at: i64,
    #[serde(default)]
    pub grant_count: u32,
    #[serde(default)]
    pub order_count: u32,
    pub created_at: i64,
}

impl RetailUser {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expired_at < now.timestamp()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantRecord {
    pub uuid: String,
    pub plan_pid: String,
    pub quantity: u32,
    pub amount: i64,
    pub granted_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOrder {
    pub uuid: String,
    pub title: String,
    pub origin_amount: i64,
    pub pay_amount: i64,
    #[serde(default)]
    pub is_paid: bool,
    #[serde(default)]
    pub paid_at: Option<i64>,
    pub created_at: i64,
}

/// `GET /api/retail/users/{uuid}` payload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RetailUserDetail {
    pub user: RetailUser,
    #[serde(default)]
    pub grants: Vec<GrantRecord>,
    #[serde(default)]
    pub orders: Vec<UserOrder>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetailUsersParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

// ── Grants ──────────────────────────────────────────────────────────

pub type Grant = GrantRecord;

/// The user record returned alongside a grant.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantedUser {
    pub uuid: String,
    pub expired_at: i64,
    #[serde(default)]
    pub is_first_order_done: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invite_code: Option<InviteCodeBasic>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct GrantSubscriptionData {
    pub user: GrantedUser,
    pub grant: Grant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantSubscriptionRequest {
    pub email: String,
    pub plan_pid: String,
    pub quantity: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invite_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dry_run: Option<bool>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn envelope_tolerates_null_data() {
        let env: ApiEnvelope<Plan> =
            serde_json::from_value(json!({"code": 401, "message": "expired", "data": null}))
                .unwrap();
        assert_eq!(env.code, 401);
        assert!(env.data.is_none());
    }

    #[test]
    fn plan_decodes_camel_case_with_optionals_missing() {
        let plan: Plan = serde_json::from_value(json!({
            "pid": "p1", "label": "Monthly", "price": 999, "originPrice": 1299,
            "month": 1, "highlight": true, "isActive": true
        }))
        .unwrap();
        assert_eq!(plan.origin_price, 1299);
        assert_eq!(plan.display_name(), "Monthly");
        assert!(plan.discount.is_none());
    }

    #[test]
    fn pagination_helpers() {
        let page: Paginated<u8> = Paginated {
            items: vec![1, 2],
            pagination: Pagination {
                page: 0,
                page_size: 2,
                total: 5,
            },
        };
        assert_eq!(page.page_count(), 3);
        assert!(page.has_next());
    }

    #[test]
    fn grant_request_omits_unset_optionals() {
        let req = GrantSubscriptionRequest {
            email: "a@b.co".into(),
            plan_pid: "p1".into(),
            quantity: 2,
            invite_code: None,
            dry_run: Some(true),
        };
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({"email": "a@b.co", "planPid": "p1", "quantity": 2, "dryRun": true})
        );
    }

    #[test]
    fn query_params_use_camel_case() {
        let params = InviteUsersParams {
            page: Some(0),
            page_size: Some(100),
            invite_code: None,
        };
        assert_eq!(
            serde_json::to_value(&params).unwrap(),
            json!({"page": 0, "pageSize": 100})
        );
    }
}
