//! Resource coordinates and identifiers
//!
//! A resource is addressed by human-readable coordinates (`ResourceRef`)
//! and, once resolved, by an opaque server-assigned `ResourceId`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of server-managed content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Datasource,
    Workbook,
    View,
}

impl ResourceKind {
    /// Lowercase singular name
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Datasource => "datasource",
            ResourceKind::Workbook => "workbook",
            ResourceKind::View => "view",
        }
    }

    /// Whether the server can run an extract refresh for this kind
    pub fn is_refreshable(&self) -> bool {
        matches!(self, ResourceKind::Datasource | ResourceKind::Workbook)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Server-assigned resource identifier
///
/// Only produced by `Server` implementations; the controller never
/// fabricates one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(String);

impl ResourceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Server-assigned job identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Human-readable coordinates of a resource
///
/// Names are only unique within a scope: a project for datasources and
/// workbooks, a project plus workbook for views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRef {
    pub kind: ResourceKind,
    pub project_name: String,
    /// Owning workbook name (views only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container_name: Option<String>,
    pub name: String,
}

impl ResourceRef {
    pub fn datasource(project: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: ResourceKind::Datasource,
            project_name: project.into(),
            container_name: None,
            name: name.into(),
        }
    }

    pub fn workbook(project: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: ResourceKind::Workbook,
            project_name: project.into(),
            container_name: None,
            name: name.into(),
        }
    }

    pub fn view(
        project: impl Into<String>,
        workbook: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            kind: ResourceKind::View,
            project_name: project.into(),
            container_name: Some(workbook.into()),
            name: name.into(),
        }
    }

    /// Scope description used in diagnostics, e.g. `project 'Sales', workbook 'Q1'`
    pub fn scope(&self) -> String {
        match &self.container_name {
            Some(workbook) => format!("project '{}', workbook '{}'", self.project_name, workbook),
            None => format!("project '{}'", self.project_name),
        }
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}' in {}", self.kind, self.name, self.scope())
    }
}

/// One catalog entry returned by a name-filtered query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceMatch {
    pub id: ResourceId,
    pub name: String,
    pub project_id: String,
    /// Not every endpoint reports the project name (views do not)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
    /// Owning workbook (views only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workbook_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ref_display() {
        let r = ResourceRef::view("Sales", "Q1", "Summary");
        assert_eq!(r.to_string(), "view 'Summary' in project 'Sales', workbook 'Q1'");

        let r = ResourceRef::datasource("Sales", "Orders");
        assert_eq!(r.to_string(), "datasource 'Orders' in project 'Sales'");
    }

    #[test]
    fn test_refreshable_kinds() {
        assert!(ResourceKind::Datasource.is_refreshable());
        assert!(ResourceKind::Workbook.is_refreshable());
        assert!(!ResourceKind::View.is_refreshable());
    }

    #[test]
    fn test_ids_serialize_transparently() {
        let id = JobId::new("job-1");
        assert_eq!(serde_json::to_string(&id).unwrap(), r#""job-1""#);
        let id: ResourceId = serde_json::from_str(r#""ds-9""#).unwrap();
        assert_eq!(id.as_str(), "ds-9");
    }
}
