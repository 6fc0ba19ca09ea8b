//! Sign-in and server-info payloads.

use serde::{Deserialize, Serialize};

/// Site selector inside a sign-in request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SiteSelector {
    /// Site content URL. Empty selects the default site.
    pub content_url: String,
}

/// Credentials variants accepted by `POST /auth/signin`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum SignInCredentials {
    /// Username and password.
    #[serde(rename_all = "camelCase")]
    Password {
        name: String,
        password: String,
        site: SiteSelector,
    },
    /// Personal access token.
    #[serde(rename_all = "camelCase")]
    AccessToken {
        personal_access_token_name: String,
        personal_access_token_secret: String,
        site: SiteSelector,
    },
}

/// Sign-in request body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SignInRequest {
    pub credentials: SignInCredentials,
}

impl SignInRequest {
    /// Username/password sign-in.
    pub fn password(
        name: impl Into<String>,
        password: impl Into<String>,
        site: impl Into<String>,
    ) -> Self {
        Self {
            credentials: SignInCredentials::Password {
                name: name.into(),
                password: password.into(),
                site: SiteSelector {
                    content_url: site.into(),
                },
            },
        }
    }

    /// Personal access token sign-in.
    pub fn access_token(
        token_name: impl Into<String>,
        token_secret: impl Into<String>,
        site: impl Into<String>,
    ) -> Self {
        Self {
            credentials: SignInCredentials::AccessToken {
                personal_access_token_name: token_name.into(),
                personal_access_token_secret: token_secret.into(),
                site: SiteSelector {
                    content_url: site.into(),
                },
            },
        }
    }
}

/// Site returned by a successful sign-in.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SignedInSite {
    pub id: String,
    #[serde(default)]
    pub content_url: String,
}

/// User returned by a successful sign-in.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SignedInUser {
    pub id: String,
}

/// `credentials` element of the sign-in response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SignedInCredentials {
    pub token: String,
    pub site: SignedInSite,
    #[serde(default)]
    pub user: Option<SignedInUser>,
}

/// Sign-in response body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SignInResponse {
    pub credentials: SignedInCredentials,
}

/// `serverInfo` element of `GET /serverinfo`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ServerInfo {
    pub rest_api_version: String,
    #[serde(default)]
    pub product_version: Option<ProductVersion>,
}

/// Product version reported by the server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProductVersion {
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub build: String,
}

/// Server-info response body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ServerInfoResponse {
    pub server_info: ServerInfo,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_password_request_shape() {
        let req = SignInRequest::password("analyst", "hunter2", "marketing");
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(
            value,
            json!({
                "credentials": {
                    "name": "analyst",
                    "password": "hunter2",
                    "site": {"contentUrl": "marketing"}
                }
            })
        );
    }

    #[test]
    fn test_access_token_request_shape() {
        let req = SignInRequest::access_token("ci-token", "s3cr3t", "");
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["credentials"]["personalAccessTokenName"], "ci-token");
        assert_eq!(value["credentials"]["personalAccessTokenSecret"], "s3cr3t");
        assert_eq!(value["credentials"]["site"]["contentUrl"], "");
        assert!(value["credentials"].get("password").is_none());
    }

    #[test]
    fn test_sign_in_response() {
        let body = json!({
            "credentials": {
                "token": "tok-123",
                "site": {"id": "site-1", "contentUrl": "marketing"},
                "user": {"id": "user-9"}
            }
        });
        let parsed: SignInResponse = serde_json::from_value(body).unwrap();
        assert_eq!(parsed.credentials.token, "tok-123");
        assert_eq!(parsed.credentials.site.id, "site-1");
        assert_eq!(parsed.credentials.user.unwrap().id, "user-9");
    }

    #[test]
    fn test_server_info_response() {
        let body = json!({
            "serverInfo": {
                "productVersion": {"value": "2023.1.0", "build": "20231.23.0324.0830"},
                "restApiVersion": "3.19"
            }
        });
        let parsed: ServerInfoResponse = serde_json::from_value(body).unwrap();
        assert_eq!(parsed.server_info.rest_api_version, "3.19");
    }
}
