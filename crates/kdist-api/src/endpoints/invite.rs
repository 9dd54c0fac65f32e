// Invite code endpoints

use serde_json::Value;
use tracing::debug;

use super::paths;
use crate::client::{ApiClient, RequestOptions};
use crate::error::Error;
use crate::method::HttpMethod;
use crate::models::{
    InviteCode, InviteCodeInfoParams, InviteUsersParams, InvitedUser, Paginated,
    PaginationParams, UpdateInviteCodeRemarkRequest,
};

impl ApiClient {
    /// The distributor's most recently created invite code.
    ///
    /// `GET /api/invite/my-codes/latest`
    pub async fn latest_invite_code(&self) -> Result<InviteCode, Error> {
        debug!("fetching latest invite code");
        self.request(
            HttpMethod::Get,
            paths::INVITE_CODES_LATEST,
            RequestOptions::new(),
        )
        .await
    }

    /// One page of the distributor's invite codes.
    ///
    /// `GET /api/invite/my-codes`
    pub async fn list_invite_codes(
        &self,
        params: &PaginationParams,
    ) -> Result<Paginated<InviteCode>, Error> {
        debug!(?params, "listing invite codes");
        let opts = RequestOptions::new().query(params)?;
        self.request(HttpMethod::Get, paths::INVITE_CODES, opts)
            .await
    }

    /// Create a fresh invite code.
    ///
    /// `POST /api/invite/my-codes` (no body)
    pub async fn create_invite_code(&self) -> Result<InviteCode, Error> {
        debug!("creating invite code");
        self.request(HttpMethod::Post, paths::INVITE_CODES, RequestOptions::new())
            .await
    }

    /// Replace an invite code's remark. Returns whatever `data` the backend
    /// sends back, usually `null`.
    ///
    /// `PUT /api/invite/my-codes/{code}/remark`
    pub async fn update_invite_code_remark(
        &self,
        code: &str,
        req: &UpdateInviteCodeRemarkRequest,
    ) -> Result<Value, Error> {
        debug!(code, "updating invite code remark");
        let opts = RequestOptions::new().json(req)?;
        self.request(HttpMethod::Put, &paths::invite_code_remark(code), opts)
            .await
    }

    /// One page of users who signed up through the distributor's codes,
    /// optionally filtered to a single code.
    ///
    /// `GET /api/invite/my-users`
    pub async fn list_invited_users(
        &self,
        params: &InviteUsersParams,
    ) -> Result<Paginated<InvitedUser>, Error> {
        debug!(?params, "listing invited users");
        let opts = RequestOptions::new().query(params)?;
        self.request(HttpMethod::Get, paths::INVITE_USERS, opts)
            .await
    }

    /// Public information about any invite code.
    ///
    /// `GET /api/invite/code?code=...`
    pub async fn invite_code_info(
        &self,
        params: &InviteCodeInfoParams,
    ) -> Result<InviteCode, Error> {
        debug!(code = %params.code, "fetching invite code info");
        let opts = RequestOptions::new().query(params)?;
        self.request(HttpMethod::Get, paths::INVITE_CODE_INFO, opts)
            .await
    }
}
