//! Content listing payloads (datasources, workbooks, views).
//!
//! All three list endpoints share the same envelope: a `pagination` block
//! and a wrapper object holding a (possibly absent) array of items.

use serde::{Deserialize, Serialize};

use crate::lenient;

/// Pagination block returned by list endpoints.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    #[serde(deserialize_with = "lenient::i64_or_string")]
    pub page_number: i64,
    #[serde(deserialize_with = "lenient::i64_or_string")]
    pub page_size: i64,
    #[serde(deserialize_with = "lenient::i64_or_string")]
    pub total_available: i64,
}

impl Pagination {
    /// Whether more pages exist after this one.
    pub fn has_more(&self, collected: usize) -> bool {
        (collected as i64) < self.total_available && self.page_size > 0
    }
}

/// Reference to an owning project.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ProjectRef {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Reference to an owning workbook.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct WorkbookRef {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// A published datasource.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Datasource {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub project: ProjectRef,
}

/// A workbook.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Workbook {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub project: ProjectRef,
}

/// A view (sheet or dashboard) inside a workbook.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct View {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub project: ProjectRef,
    #[serde(default)]
    pub workbook: WorkbookRef,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct DatasourceItems {
    #[serde(default)]
    pub datasource: Vec<Datasource>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct WorkbookItems {
    #[serde(default)]
    pub workbook: Vec<Workbook>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ViewItems {
    #[serde(default)]
    pub view: Vec<View>,
}

/// `GET /sites/{site}/datasources` response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DatasourceList {
    pub pagination: Pagination,
    #[serde(default)]
    pub datasources: DatasourceItems,
}

/// `GET /sites/{site}/workbooks` response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkbookList {
    pub pagination: Pagination,
    #[serde(default)]
    pub workbooks: WorkbookItems,
}

/// `GET /sites/{site}/views` response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ViewList {
    pub pagination: Pagination,
    #[serde(default)]
    pub views: ViewItems,
}
