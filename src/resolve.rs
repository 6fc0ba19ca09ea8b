//! Resource resolution
//!
//! Turns human-readable coordinates into a server-assigned id. The server's
//! name filter only narrows the candidate list; the exact, case-sensitive
//! name and the project (and, for views, workbook) scope are checked here.
//! Anything other than exactly one survivor is an error.

use crate::model::{ResourceId, ResourceKind, ResourceMatch, ResourceRef};
use crate::outcome::ExitOutcome;
use crate::server::{Connection, ServerError};

/// Resolution errors
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("{kind} '{name}' not found in {scope}{}", ambiguity(.matches))]
    NotFound {
        kind: ResourceKind,
        name: String,
        scope: String,
        /// Candidates that survived scoping (0 or more than 1)
        matches: usize,
    },

    #[error("view '{name}' cannot be resolved without its workbook name")]
    MissingContainer { name: String },

    #[error("lookup of {kind} '{name}' failed: {source}")]
    Server {
        kind: ResourceKind,
        name: String,
        #[source]
        source: ServerError,
    },
}

fn ambiguity(matches: &usize) -> String {
    if *matches > 1 {
        format!(" ({} matches, expected exactly one)", matches)
    } else {
        String::new()
    }
}

impl ResolveError {
    pub fn outcome(&self) -> ExitOutcome {
        match self {
            ResolveError::NotFound { .. } | ResolveError::MissingContainer { .. } => {
                ExitOutcome::NotFound
            }
            ResolveError::Server { source, .. } if source.is_authentication() => {
                ExitOutcome::AuthenticationFailed
            }
            ResolveError::Server { .. } => ExitOutcome::UnknownError,
        }
    }
}

/// Resolve `target` to its id
pub fn resolve(conn: &Connection<'_>, target: &ResourceRef) -> Result<ResourceId, ResolveError> {
    resolve_match(conn, target).map(|m| m.id)
}

/// Resolve `target` to its catalog entry
pub fn resolve_match(
    conn: &Connection<'_>,
    target: &ResourceRef,
) -> Result<ResourceMatch, ResolveError> {
    let found = match target.kind {
        ResourceKind::Datasource | ResourceKind::Workbook => {
            resolve_in_project(conn, target.kind, &target.project_name, &target.name)?
        }
        ResourceKind::View => {
            let workbook_name =
                target
                    .container_name
                    .as_deref()
                    .ok_or_else(|| ResolveError::MissingContainer {
                        name: target.name.clone(),
                    })?;
            let workbook = resolve_in_project(
                conn,
                ResourceKind::Workbook,
                &target.project_name,
                workbook_name,
            )?;

            let candidates = query(conn, ResourceKind::View, &target.name)?;
            let scoped: Vec<ResourceMatch> = candidates
                .into_iter()
                .filter(|v| {
                    v.name == target.name
                        && v.project_id == workbook.project_id
                        && v.workbook_id.as_deref() == Some(workbook.id.as_str())
                })
                .collect();
            exactly_one(scoped, ResourceKind::View, &target.name, target.scope())?
        }
    };

    tracing::info!(resource = %target, resource_id = %found.id, "resolved");
    Ok(found)
}

fn resolve_in_project(
    conn: &Connection<'_>,
    kind: ResourceKind,
    project_name: &str,
    name: &str,
) -> Result<ResourceMatch, ResolveError> {
    let candidates = query(conn, kind, name)?;
    let scoped: Vec<ResourceMatch> = candidates
        .into_iter()
        .filter(|m| m.name == name && m.project_name.as_deref() == Some(project_name))
        .collect();
    exactly_one(scoped, kind, name, format!("project '{}'", project_name))
}

fn query(
    conn: &Connection<'_>,
    kind: ResourceKind,
    name: &str,
) -> Result<Vec<ResourceMatch>, ResolveError> {
    let candidates = conn
        .server()
        .query(conn.session(), kind, name)
        .map_err(|source| ResolveError::Server {
            kind,
            name: name.to_string(),
            source,
        })?;
    tracing::debug!(kind = %kind, name = %name, candidates = candidates.len(), "catalog query");
    Ok(candidates)
}

fn exactly_one(
    mut scoped: Vec<ResourceMatch>,
    kind: ResourceKind,
    name: &str,
    scope: String,
) -> Result<ResourceMatch, ResolveError> {
    if scoped.len() == 1 {
        if let Some(only) = scoped.pop() {
            return Ok(only);
        }
    }
    Err(ResolveError::NotFound {
        kind,
        name: name.to_string(),
        scope,
        matches: scoped.len(),
    })
}
