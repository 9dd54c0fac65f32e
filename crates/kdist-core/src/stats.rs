// ── Dashboard statistics ──
//
// Headline numbers for the distributor dashboard, derived from three reads
// that run concurrently through the console cache.

use chrono::{DateTime, Utc};
use serde::Serialize;

use kdist_api::models::{InviteCode, InviteUsersParams, InvitedUser, Paginated, Plan};

use crate::console::Console;
use crate::error::CoreError;

/// Page size used to sample invited users for the activity count.
pub const USER_SAMPLE_SIZE: u32 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    /// Users who signed up through any of the distributor's codes.
    pub total_users: u64,
    /// Of the sampled users, those whose subscription has not expired.
    pub active_users: u64,
    pub total_downloads: u64,
    pub total_purchases: u64,
    pub active_plans: u64,
    pub total_plans: u64,
    /// The most recent invite code, if the distributor has one.
    pub latest_code: Option<String>,
}

impl DashboardStats {
    /// Fetch the three inputs concurrently and summarise them.
    ///
    /// A missing latest invite code (404) counts as zero downloads and
    /// purchases; any other failure is returned.
    pub async fn load(console: &Console) -> Result<Self, CoreError> {
        let users_params = InviteUsersParams {
            page: None,
            page_size: Some(USER_SAMPLE_SIZE),
            invite_code: None,
        };
        let (latest, users, plans) = tokio::join!(
            console.latest_invite_code(),
            console.invited_users(&users_params),
            console.plans(),
        );

        let latest = match latest {
            Ok(code) => Some(code),
            Err(CoreError::NotFound { .. }) => None,
            Err(e) => return Err(e),
        };
        let users = users?;
        let plans = plans?;

        Ok(Self::from_parts(
            latest.as_deref(),
            &users,
            &plans,
            Utc::now(),
        ))
    }

    /// Pure summary of already-fetched data.
    pub fn from_parts(
        latest: Option<&InviteCode>,
        users: &Paginated<InvitedUser>,
        plans: &Paginated<Plan>,
        now: DateTime<Utc>,
    ) -> Self {
        let sampled = users.items.len() as u64;
        Self {
            total_users: users.pagination.total.max(sampled),
            active_users: users.items.iter().filter(|u| u.is_active_at(now)).count() as u64,
            total_downloads: latest.map_or(0, |c| c.download_count),
            total_purchases: latest.map_or(0, |c| c.purchase_count),
            active_plans: plans.items.iter().filter(|p| p.is_active).count() as u64,
            total_plans: plans.items.len() as u64,
            latest_code: latest.map(|c| c.code.clone()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    fn users() -> Paginated<InvitedUser> {
        serde_json::from_value(json!({
            "items": [
                {"uuid": "a", "expiredAt": 1_800_000_000, "isFirstOrderDone": true,
                 "inviteCode": {"code": "X", "createdAt": 0, "remark": ""}},
                {"uuid": "b", "expiredAt": 1_600_000_000, "isFirstOrderDone": false,
                 "inviteCode": {"code": "X", "createdAt": 0, "remark": ""}},
                {"uuid": "c", "expiredAt": 1_700_000_000, "isFirstOrderDone": false,
                 "inviteCode": {"code": "X", "createdAt": 0, "remark": ""}}
            ],
            "pagination": {"page": 0, "pageSize": 100, "total": 250}
        }))
        .unwrap()
    }

    fn plans() -> Paginated<Plan> {
        serde_json::from_value(json!({
            "items": [
                {"pid": "m", "label": "M", "price": 100, "originPrice": 100, "month": 1, "isActive": true},
                {"pid": "y", "label": "Y", "price": 900, "originPrice": 1200, "month": 12, "isActive": false}
            ],
            "pagination": {"page": 0, "pageSize": 10, "total": 2}
        }))
        .unwrap()
    }

    #[test]
    fn summarises_users_plans_and_counters() {
        let latest: InviteCode = serde_json::from_value(json!({
            "code": "X", "createdAt": 0, "remark": "", "link": "",
            "config": {"downloadRewardDays": 1, "purchaseRewardDays": 2},
            "downloadCount": 40, "downloadReward": 0, "purchaseCount": 6, "purchaseReward": 0
        }))
        .unwrap();

        let stats = DashboardStats::from_parts(Some(&latest), &users(), &plans(), now());
        assert_eq!(stats.total_users, 250);
        // Expiry exactly at `now` is no longer active.
        assert_eq!(stats.active_users, 1);
        assert_eq!(stats.total_downloads, 40);
        assert_eq!(stats.total_purchases, 6);
        assert_eq!(stats.active_plans, 1);
        assert_eq!(stats.total_plans, 2);
        assert_eq!(stats.latest_code.as_deref(), Some("X"));
    }

    #[test]
    fn no_latest_code_means_zero_counters() {
        let stats = DashboardStats::from_parts(None, &users(), &plans(), now());
        assert_eq!(stats.total_downloads, 0);
        assert_eq!(stats.total_purchases, 0);
        assert!(stats.latest_code.is_none());
    }
}
