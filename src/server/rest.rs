//! Tableau REST API implementation of `Server`
//!
//! Blocking HTTP via `reqwest::blocking`. All requests ask for JSON; the
//! session token travels in the `X-Tableau-Auth` header. When no API
//! version is configured the server is asked for its own via `serverinfo`
//! on first use.

use std::sync::OnceLock;
use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use tableau_protocol::catalog::{DatasourceList, ViewList, WorkbookList};
use tableau_protocol::job::{JobEnvelope, RefreshRequest};
use tableau_protocol::{
    name_filter, ApiError, Pagination, ServerInfoResponse, SignInRequest, SignInResponse,
    AUTH_HEADER, SERVER_INFO_API_VERSION,
};

use super::{
    Credentials, JobHandleRaw, JobStatusRaw, Server, ServerError, ServerResult, Session,
    SignInMethod,
};
use crate::model::{JobId, ResourceId, ResourceKind, ResourceMatch};

/// REST client configuration
#[derive(Debug, Clone)]
pub struct RestConfig {
    /// Server root, e.g. `https://tableau.example.com`
    pub base_url: String,
    /// REST API version; discovered from the server when `None`
    pub api_version: Option<String>,
    /// Per-request timeout
    pub request_timeout: Duration,
    /// Page size for list queries
    pub page_size: u32,
}

impl RestConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_version: None,
            request_timeout: Duration::from_secs(60),
            page_size: 100,
        }
    }
}

/// Tableau REST API client
pub struct RestServer {
    config: RestConfig,
    client: Client,
    discovered_version: OnceLock<String>,
}

impl RestServer {
    pub fn new(config: RestConfig) -> ServerResult<Self> {
        let client = Client::builder()
            .user_agent(concat!("tableau-refresh/", env!("CARGO_PKG_VERSION")))
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ServerError::Transport(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            config,
            client,
            discovered_version: OnceLock::new(),
        })
    }

    fn base(&self) -> &str {
        self.config.base_url.trim_end_matches('/')
    }

    /// API version to use, asking the server once if not configured
    fn api_version(&self) -> ServerResult<String> {
        if let Some(ref v) = self.config.api_version {
            return Ok(v.clone());
        }
        if let Some(v) = self.discovered_version.get() {
            return Ok(v.clone());
        }

        let url = format!("{}/api/{}/serverinfo", self.base(), SERVER_INFO_API_VERSION);
        tracing::debug!("GET {}", url);
        let body = self.send(self.client.get(&url))?;
        let info: ServerInfoResponse = parse(&body, "serverinfo")?;
        let version = info.server_info.rest_api_version;
        tracing::info!(api_version = %version, "discovered REST API version");

        let _ = self.discovered_version.set(version.clone());
        Ok(version)
    }

    fn url(&self, path: &str) -> ServerResult<String> {
        Ok(format!("{}/api/{}/{}", self.base(), self.api_version()?, path))
    }

    fn site_url(&self, session: &Session, path: &str) -> ServerResult<String> {
        self.url(&format!("sites/{}/{}", session.site_id, path))
    }

    /// Send a request and return the body of a 2xx response
    fn send(&self, request: RequestBuilder) -> ServerResult<String> {
        let response = request
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .map_err(|e| ServerError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|e| ServerError::Transport(format!("failed to read response body: {}", e)))?;

        if !status.is_success() {
            let err = ApiError::from_response(status.as_u16(), &body);
            tracing::debug!(status = status.as_u16(), kind = %err.kind(), "request failed");
            return Err(err.into());
        }
        Ok(body)
    }

    fn fetch_page(
        &self,
        session: &Session,
        kind: ResourceKind,
        name: &str,
        page: i64,
    ) -> ServerResult<(Pagination, Vec<ResourceMatch>)> {
        let collection = match kind {
            ResourceKind::Datasource => "datasources",
            ResourceKind::Workbook => "workbooks",
            ResourceKind::View => "views",
        };
        let url = self.site_url(session, collection)?;
        tracing::debug!("GET {} (name={}, page={})", url, name, page);

        let request = self
            .client
            .get(&url)
            .header(AUTH_HEADER, &session.token)
            .query(&[
                ("filter", name_filter(name)),
                ("pageSize", self.config.page_size.to_string()),
                ("pageNumber", page.to_string()),
            ]);
        let body = self.send(request)?;

        let result = match kind {
            ResourceKind::Datasource => {
                let list: DatasourceList = parse(&body, collection)?;
                let items = list
                    .datasources
                    .datasource
                    .into_iter()
                    .map(|d| ResourceMatch {
                        id: ResourceId::new(d.id),
                        name: d.name,
                        project_id: d.project.id,
                        project_name: d.project.name,
                        workbook_id: None,
                    })
                    .collect();
                (list.pagination, items)
            }
            ResourceKind::Workbook => {
                let list: WorkbookList = parse(&body, collection)?;
                let items = list
                    .workbooks
                    .workbook
                    .into_iter()
                    .map(|w| ResourceMatch {
                        id: ResourceId::new(w.id),
                        name: w.name,
                        project_id: w.project.id,
                        project_name: w.project.name,
                        workbook_id: None,
                    })
                    .collect();
                (list.pagination, items)
            }
            ResourceKind::View => {
                let list: ViewList = parse(&body, collection)?;
                let items = list
                    .views
                    .view
                    .into_iter()
                    .map(|v| ResourceMatch {
                        id: ResourceId::new(v.id),
                        name: v.name,
                        project_id: v.project.id,
                        project_name: v.project.name,
                        workbook_id: Some(v.workbook.id).filter(|id| !id.is_empty()),
                    })
                    .collect();
                (list.pagination, items)
            }
        };
        Ok(result)
    }
}

fn parse<T: DeserializeOwned>(body: &str, what: &str) -> ServerResult<T> {
    serde_json::from_str(body)
        .map_err(|e| ServerError::Protocol(format!("invalid {} response: {}", what, e)))
}

impl Server for RestServer {
    fn connect(&self, credentials: &Credentials) -> ServerResult<Session> {
        let request = match credentials.method {
            SignInMethod::UsernamePassword => {
                SignInRequest::password(&credentials.name, &credentials.secret, &credentials.site)
            }
            SignInMethod::AccessToken => SignInRequest::access_token(
                &credentials.name,
                &credentials.secret,
                &credentials.site,
            ),
        };

        let url = self.url("auth/signin")?;
        tracing::debug!("POST {}", url);
        let body = self.send(self.client.post(&url).json(&request))?;
        let response: SignInResponse = parse(&body, "signin")?;

        Ok(Session {
            token: response.credentials.token,
            site_id: response.credentials.site.id,
            user_id: response.credentials.user.map(|u| u.id),
        })
    }

    fn disconnect(&self, session: &Session) -> ServerResult<()> {
        let url = self.url("auth/signout")?;
        tracing::debug!("POST {}", url);
        self.send(self.client.post(&url).header(AUTH_HEADER, &session.token))?;
        Ok(())
    }

    fn query(
        &self,
        session: &Session,
        kind: ResourceKind,
        name: &str,
    ) -> ServerResult<Vec<ResourceMatch>> {
        let mut matches = Vec::new();
        let mut page = 1;
        loop {
            let (pagination, items) = self.fetch_page(session, kind, name, page)?;
            let received = items.len();
            matches.extend(items);
            if received == 0 || !pagination.has_more(matches.len()) {
                break;
            }
            page += 1;
        }
        Ok(matches)
    }

    fn trigger_refresh(
        &self,
        session: &Session,
        kind: ResourceKind,
        id: &ResourceId,
    ) -> ServerResult<JobHandleRaw> {
        let collection = match kind {
            ResourceKind::Datasource => "datasources",
            ResourceKind::Workbook => "workbooks",
            ResourceKind::View => {
                return Err(ServerError::NotAllowed(format!(
                    "extract refresh is not allowed on views ({})",
                    id
                )))
            }
        };

        let url = self.site_url(session, &format!("{}/{}/refresh", collection, id))?;
        tracing::debug!("POST {}", url);
        let body = self.send(
            self.client
                .post(&url)
                .header(AUTH_HEADER, &session.token)
                .json(&RefreshRequest::default()),
        )?;
        let envelope: JobEnvelope = parse(&body, "refresh")?;

        Ok(JobHandleRaw {
            id: JobId::new(envelope.job.id),
        })
    }

    fn get_job_status(&self, session: &Session, job_id: &JobId) -> ServerResult<JobStatusRaw> {
        let url = self.site_url(session, &format!("jobs/{}", job_id))?;
        tracing::debug!("GET {}", url);
        let body = self.send(self.client.get(&url).header(AUTH_HEADER, &session.token))?;
        let envelope: JobEnvelope = parse(&body, "job")?;

        Ok(JobStatusRaw {
            id: JobId::new(envelope.job.id),
            finish_code: envelope.job.finish_code,
            progress: envelope.job.progress,
            started_at: envelope.job.started_at,
        })
    }
}
