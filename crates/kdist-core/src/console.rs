// ── Distributor console ──
//
// Typed reads and writes over the session's API client, each bound to the
// query cache with its own freshness window. Writes name the reads they
// make stale.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::info;

use kdist_api::models::{
    GrantSubscriptionData, GrantSubscriptionRequest, InviteCode, InviteCodeInfoParams,
    InviteUsersParams, InvitedUser, Paginated, PaginationParams, Plan, RetailUser,
    RetailUserDetail, RetailUsersParams, UpdateInviteCodeRemarkRequest,
};

use crate::error::CoreError;
use crate::query::{Mutation, QueryClient, QueryOptions};
use crate::session::Session;

// ── Keys and freshness ───────────────────────────────────────────────

/// Cache keys for every read.
pub mod keys {
    use serde::Serialize;

    use crate::error::CoreError;
    use crate::query::QueryKey;

    pub const PLANS: &str = "plans";
    pub const INVITE_CODES: &str = "inviteCodes";
    pub const INVITE_USERS: &str = "inviteUsers";
    pub const INVITE_CODE_INFO: &str = "inviteCodeInfo";
    pub const RETAIL_USERS: &str = "retailUsers";
    pub const RETAIL_USER_DETAIL: &str = "retailUserDetail";

    pub fn plans() -> QueryKey {
        QueryKey::new(PLANS)
    }

    pub fn invite_codes() -> QueryKey {
        QueryKey::new(INVITE_CODES)
    }

    pub fn latest_invite_code() -> QueryKey {
        invite_codes().with("latest")
    }

    pub fn invite_code_page(params: &impl Serialize) -> Result<QueryKey, CoreError> {
        invite_codes().with_params(params)
    }

    pub fn invite_users() -> QueryKey {
        QueryKey::new(INVITE_USERS)
    }

    pub fn invite_code_info(code: &str) -> QueryKey {
        QueryKey::new(INVITE_CODE_INFO).with(code)
    }

    pub fn retail_users() -> QueryKey {
        QueryKey::new(RETAIL_USERS)
    }

    pub fn retail_user_detail(uuid: &str) -> QueryKey {
        QueryKey::new(RETAIL_USER_DETAIL).with(uuid)
    }
}

const MINUTE: Duration = Duration::from_secs(60);

pub const PLANS_STALE: Duration = Duration::from_secs(5 * 60);
pub const LATEST_INVITE_CODE_STALE: Duration = Duration::from_secs(2 * 60);
pub const INVITE_CODES_STALE: Duration = Duration::from_secs(2 * 60);
pub const INVITE_USERS_STALE: Duration = MINUTE;
pub const INVITE_CODE_INFO_STALE: Duration = Duration::from_secs(5 * 60);
pub const RETAIL_USERS_STALE: Duration = Duration::from_secs(30);

// ── Console ──────────────────────────────────────────────────────────

/// Entry point for everything a logged-in distributor can do.
///
/// Every operation requires an authenticated session and fails with
/// [`CoreError::NotAuthenticated`] otherwise.
pub struct Console {
    session: Session,
    queries: Arc<QueryClient>,
    create_invite_code: Mutation,
    update_invite_code_remark: Mutation,
    grant_subscription: Mutation,
}

impl Console {
    pub fn new(session: Session) -> Self {
        Self::with_queries(session, Arc::new(QueryClient::new()))
    }

    /// Share an existing cache, e.g. across several consoles in tests.
    pub fn with_queries(session: Session, queries: Arc<QueryClient>) -> Self {
        Self {
            session,
            queries,
            create_invite_code: Mutation::new("createInviteCode", vec![keys::invite_codes()]),
            update_invite_code_remark: Mutation::new(
                "updateInviteCodeRemark",
                vec![keys::invite_codes()],
            ),
            grant_subscription: Mutation::new(
                "grantSubscription",
                vec![keys::invite_users(), keys::retail_users()],
            ),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn queries(&self) -> &QueryClient {
        &self.queries
    }

    pub fn create_invite_code_mutation(&self) -> &Mutation {
        &self.create_invite_code
    }

    pub fn update_invite_code_remark_mutation(&self) -> &Mutation {
        &self.update_invite_code_remark
    }

    pub fn grant_subscription_mutation(&self) -> &Mutation {
        &self.grant_subscription
    }

    // ── Reads ────────────────────────────────────────────────────────

    pub async fn plans(&self) -> Result<Arc<Paginated<Plan>>, CoreError> {
        let api = self.session.authenticated_api()?;
        self.queries
            .fetch(
                &keys::plans(),
                &QueryOptions::fresh_for(PLANS_STALE),
                || async move { Ok::<_, CoreError>(api.list_plans().await?) },
            )
            .await
    }

    pub async fn latest_invite_code(&self) -> Result<Arc<InviteCode>, CoreError> {
        let api = self.session.authenticated_api()?;
        self.queries
            .fetch(
                &keys::latest_invite_code(),
                &QueryOptions::fresh_for(LATEST_INVITE_CODE_STALE),
                || async move { Ok::<_, CoreError>(api.latest_invite_code().await?) },
            )
            .await
    }

    pub async fn invite_codes(
        &self,
        params: &PaginationParams,
    ) -> Result<Arc<Paginated<InviteCode>>, CoreError> {
        let api = self.session.authenticated_api()?;
        self.queries
            .fetch(
                &keys::invite_code_page(params)?,
                &QueryOptions::fresh_for(INVITE_CODES_STALE),
                || async move { Ok::<_, CoreError>(api.list_invite_codes(params).await?) },
            )
            .await
    }

    pub async fn invited_users(
        &self,
        params: &InviteUsersParams,
    ) -> Result<Arc<Paginated<InvitedUser>>, CoreError> {
        let api = self.session.authenticated_api()?;
        self.queries
            .fetch(
                &keys::invite_users().with_params(params)?,
                &QueryOptions::fresh_for(INVITE_USERS_STALE),
                || async move { Ok::<_, CoreError>(api.list_invited_users(params).await?) },
            )
            .await
    }

    /// Public info for `code`. Disabled for an empty code: returns
    /// `Ok(None)` without any I/O.
    pub async fn invite_code_info(
        &self,
        code: &str,
    ) -> Result<Option<Arc<InviteCode>>, CoreError> {
        let api = self.session.authenticated_api()?;
        let code = code.trim();
        let params = InviteCodeInfoParams {
            code: code.to_owned(),
        };
        let params = &params;
        let opts = QueryOptions::fresh_for(INVITE_CODE_INFO_STALE).enabled(!code.is_empty());
        let state = self
            .queries
            .query(&keys::invite_code_info(code), &opts, || async move {
                Ok::<_, CoreError>(api.invite_code_info(params).await?)
            })
            .await;
        state.into_result().transpose()
    }

    pub async fn retail_users(
        &self,
        params: &RetailUsersParams,
    ) -> Result<Arc<Paginated<RetailUser>>, CoreError> {
        let api = self.session.authenticated_api()?;
        self.queries
            .fetch(
                &keys::retail_users().with_params(params)?,
                &QueryOptions::fresh_for(RETAIL_USERS_STALE),
                || async move { Ok::<_, CoreError>(api.list_retail_users(params).await?) },
            )
            .await
    }

    pub async fn retail_user_detail(&self, uuid: &str) -> Result<Arc<RetailUserDetail>, CoreError> {
        let api = self.session.authenticated_api()?;
        self.queries
            .fetch(
                &keys::retail_user_detail(uuid),
                &QueryOptions::fresh_for(RETAIL_USERS_STALE),
                || async move { Ok::<_, CoreError>(api.retail_user_detail(uuid).await?) },
            )
            .await
    }

    // ── Writes ───────────────────────────────────────────────────────

    /// Create a fresh invite code. Invalidates every invite-code read,
    /// including "latest".
    pub async fn create_invite_code(&self) -> Result<InviteCode, CoreError> {
        let api = self.session.authenticated_api()?;
        self.queries
            .mutate(
                &self.create_invite_code,
                async { Ok::<_, CoreError>(api.create_invite_code().await?) },
                |code: &InviteCode| info!(code = %code.code, "invite code created"),
            )
            .await
    }

    pub async fn update_invite_code_remark(
        &self,
        code: &str,
        remark: &str,
    ) -> Result<Value, CoreError> {
        let api = self.session.authenticated_api()?;
        let req = UpdateInviteCodeRemarkRequest {
            remark: remark.to_owned(),
        };
        self.queries
            .mutate(
                &self.update_invite_code_remark,
                async { Ok::<_, CoreError>(api.update_invite_code_remark(code, &req).await?) },
                |_| info!(code, "invite code remark updated"),
            )
            .await
    }

    /// Grant a subscription. A dry run is validated and priced by the
    /// backend but changes nothing, so it leaves the cache alone.
    pub async fn grant_subscription(
        &self,
        req: &GrantSubscriptionRequest,
    ) -> Result<GrantSubscriptionData, CoreError> {
        let api = self.session.authenticated_api()?;
        if req.dry_run == Some(true) {
            return Ok(api.grant_subscription(req).await?);
        }
        self.queries
            .mutate(
                &self.grant_subscription,
                async { Ok::<_, CoreError>(api.grant_subscription(req).await?) },
                |data: &GrantSubscriptionData| {
                    info!(user = %data.user.uuid, plan = %data.grant.plan_pid, "subscription granted");
                },
            )
            .await
    }
}
