// Plan catalogue endpoints

use tracing::debug;

use super::paths;
use crate::client::{ApiClient, RequestOptions};
use crate::error::Error;
use crate::method::HttpMethod;
use crate::models::{GrantSubscriptionData, GrantSubscriptionRequest, Paginated, Plan};

impl ApiClient {
    /// List the plans this distributor may sell or grant.
    ///
    /// `GET /api/plans`
    pub async fn list_plans(&self) -> Result<Paginated<Plan>, Error> {
        debug!("listing plans");
        self.request(HttpMethod::Get, paths::PLANS, RequestOptions::new())
            .await
    }

    /// Grant a subscription to a user, creating the user if needed.
    ///
    /// With `dry_run` set the backend validates and prices the grant without
    /// applying it.
    ///
    /// `POST /api/retail/grant-subscription`
    pub async fn grant_subscription(
        &self,
        req: &GrantSubscriptionRequest,
    ) -> Result<GrantSubscriptionData, Error> {
        debug!(
            plan = %req.plan_pid,
            quantity = req.quantity,
            dry_run = req.dry_run.unwrap_or(false),
            "granting subscription"
        );
        let opts = RequestOptions::new().json(req)?;
        self.request(HttpMethod::Post, paths::GRANT_SUBSCRIPTION, opts)
            .await
    }
}
