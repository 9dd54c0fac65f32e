// Retail user endpoints

use tracing::debug;

use super::paths;
use crate::client::{ApiClient, RequestOptions};
use crate::error::Error;
use crate::method::HttpMethod;
use crate::models::{Paginated, RetailUser, RetailUserDetail, RetailUsersParams};

impl ApiClient {
    /// One page of users the distributor has granted subscriptions to.
    ///
    /// `GET /api/retail/users`
    pub async fn list_retail_users(
        &self,
        params: &RetailUsersParams,
    ) -> Result<Paginated<RetailUser>, Error> {
        debug!(?params, "listing retail users");
        let opts = RequestOptions::new().query(params)?;
        self.request(HttpMethod::Get, paths::RETAIL_USERS, opts)
            .await
    }

    /// A retail user with their grant and order history.
    ///
    /// `GET /api/retail/users/{uuid}`
    pub async fn retail_user_detail(&self, uuid: &str) -> Result<RetailUserDetail, Error> {
        debug!(uuid, "fetching retail user detail");
        self.request(
            HttpMethod::Get,
            &paths::retail_user(uuid),
            RequestOptions::new(),
        )
        .await
    }
}
