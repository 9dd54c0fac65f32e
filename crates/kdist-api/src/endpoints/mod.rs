// Typed backend endpoints
//
// Thin, fixed-shape wrappers over `ApiClient::request`, grouped by backend
// area. Every endpoint requires an access key.

pub mod invite;
pub mod plans;
pub mod retail;

/// Backend paths, relative to the base URL.
pub mod paths {
    pub const PLANS: &str = "/api/plans";
    pub const GRANT_SUBSCRIPTION: &str = "/api/retail/grant-subscription";
    pub const INVITE_CODES: &str = "/api/invite/my-codes";
    pub const INVITE_CODES_LATEST: &str = "/api/invite/my-codes/latest";
    pub const INVITE_USERS: &str = "/api/invite/my-users";
    pub const INVITE_CODE_INFO: &str = "/api/invite/code";
    pub const RETAIL_USERS: &str = "/api/retail/users";

    /// `PUT` target for an invite code's remark.
    pub fn invite_code_remark(code: &str) -> String {
        format!("{INVITE_CODES}/{}/remark", urlencoding::encode(code))
    }

    /// `GET` target for one retail user.
    pub fn retail_user(uuid: &str) -> String {
        format!("{RETAIL_USERS}/{}", urlencoding::encode(uuid))
    }
}

#[cfg(test)]
mod tests {
    use super::paths;

    #[test]
    fn path_segments_are_percent_encoded() {
        assert_eq!(
            paths::invite_code_remark("ABC123"),
            "/api/invite/my-codes/ABC123/remark"
        );
        assert_eq!(
            paths::invite_code_remark("a b/c"),
            "/api/invite/my-codes/a%20b%2Fc/remark"
        );
        assert_eq!(paths::retail_user("é"), "/api/retail/users/%C3%A9");
    }
}
