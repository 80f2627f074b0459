//! Workspace-wide search across clients, projects, invoices, files, and
//! approvals. Substring matching via LIKE, each entity type capped and
//! fetched independently so one bad query degrades rather than fails the
//! whole response.

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::access::AccessResolver;
use crate::error::CoreResult;
use crate::money;

const PER_KIND_LIMIT: i64 = 10;
const MIN_QUERY_CHARS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchKind {
    Client,
    Project,
    Invoice,
    File,
    Approval,
}

impl SearchKind {
    /// Query-string values, singular or plural.
    fn from_param(value: &str) -> Option<Self> {
        match value {
            "client" | "clients" => Some(Self::Client),
            "project" | "projects" => Some(Self::Project),
            "invoice" | "invoices" => Some(Self::Invoice),
            "file" | "files" => Some(Self::File),
            "approval" | "approvals" => Some(Self::Approval),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchFilter {
    #[serde(default)]
    pub q: String,
    /// Restrict to one entity type; absent or `all` searches everything.
    #[serde(rename = "type", default, deserialize_with = "kind_filter")]
    pub kind: Option<SearchKind>,
}

fn kind_filter<'de, D>(deserializer: D) -> Result<Option<SearchKind>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref() {
        None | Some("all") => Ok(None),
        Some(value) => SearchKind::from_param(value)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown search type {value:?}"))),
    }
}

/// One uniform shape for every hit regardless of entity type, so the
/// consumer renders a single result list.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    pub id: Uuid,
    pub kind: SearchKind,
    pub title: String,
    pub subtitle: String,
    pub description: String,
    pub meta: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResults {
    pub clients: Vec<SearchHit>,
    pub projects: Vec<SearchHit>,
    pub invoices: Vec<SearchHit>,
    pub files: Vec<SearchHit>,
    pub approvals: Vec<SearchHit>,
    pub total: usize,
}

impl SearchResults {
    fn empty() -> Self {
        Self {
            clients: Vec::new(),
            projects: Vec::new(),
            invoices: Vec::new(),
            files: Vec::new(),
            approvals: Vec::new(),
            total: 0,
        }
    }
}

#[derive(Clone)]
pub struct SearchService {
    pool: SqlitePool,
    resolver: AccessResolver,
}

impl SearchService {
    pub fn new(pool: SqlitePool) -> Self {
        let resolver = AccessResolver::new(pool.clone());
        Self { pool, resolver }
    }

    /// Agency-side only. Queries under two characters return the empty
    /// envelope without touching the database.
    pub async fn search(&self, user_id: Uuid, filter: SearchFilter) -> CoreResult<SearchResults> {
        let membership = self.resolver.require_membership(user_id).await?;

        let query = filter.q.trim();
        if query.chars().count() < MIN_QUERY_CHARS {
            return Ok(SearchResults::empty());
        }
        let pattern = like_pattern(query);

        let mut results = SearchResults::empty();
        let wants = |kind| filter.kind.is_none() || filter.kind == Some(kind);

        if wants(SearchKind::Client) {
            results.clients = self.clients(membership.workspace_id, &pattern).await;
        }
        if wants(SearchKind::Project) {
            results.projects = self.projects(membership.workspace_id, &pattern).await;
        }
        if wants(SearchKind::Invoice) {
            results.invoices = self.invoices(membership.workspace_id, &pattern).await;
        }
        if wants(SearchKind::File) {
            results.files = self.files(membership.workspace_id, &pattern).await;
        }
        if wants(SearchKind::Approval) {
            results.approvals = self.approvals(membership.workspace_id, &pattern).await;
        }

        results.total = results.clients.len()
            + results.projects.len()
            + results.invoices.len()
            + results.files.len()
            + results.approvals.len();
        Ok(results)
    }

    async fn clients(&self, workspace_id: Uuid, pattern: &str) -> Vec<SearchHit> {
        let rows: Result<Vec<(Uuid, String, String, String, i64)>, _> = sqlx::query_as(
            "SELECT c.id, c.name, COALESCE(c.notes, ''),
                    COALESCE((SELECT u.email FROM client_contacts cc
                              JOIN users u ON u.id = cc.user_id
                              WHERE cc.client_id = c.id AND cc.is_primary = 1), ''),
                    (SELECT COUNT(*) FROM projects p WHERE p.client_id = c.id)
             FROM clients c
             WHERE c.workspace_id = ?
               AND (LOWER(c.name) LIKE ? ESCAPE '\\' OR LOWER(COALESCE(c.notes, '')) LIKE ? ESCAPE '\\')
             ORDER BY c.updated_at DESC LIMIT ?",
        )
        .bind(workspace_id)
        .bind(pattern)
        .bind(pattern)
        .bind(PER_KIND_LIMIT)
        .fetch_all(&self.pool)
        .await;

        collect(rows, "clients", |(id, name, notes, contact_email, project_count)| SearchHit {
            id,
            kind: SearchKind::Client,
            title: name,
            subtitle: contact_email,
            description: notes,
            meta: format!(
                "{project_count} project{}",
                if project_count == 1 { "" } else { "s" }
            ),
            url: format!("/dashboard/clients/{id}"),
        })
    }

    async fn projects(&self, workspace_id: Uuid, pattern: &str) -> Vec<SearchHit> {
        let rows: Result<Vec<(Uuid, String, String, String, String)>, _> = sqlx::query_as(
            "SELECT p.id, p.name, COALESCE(p.description, ''), p.status, c.name
             FROM projects p
             JOIN clients c ON c.id = p.client_id
             WHERE c.workspace_id = ?
               AND (LOWER(p.name) LIKE ? ESCAPE '\\' OR LOWER(COALESCE(p.description, '')) LIKE ? ESCAPE '\\')
             ORDER BY p.updated_at DESC LIMIT ?",
        )
        .bind(workspace_id)
        .bind(pattern)
        .bind(pattern)
        .bind(PER_KIND_LIMIT)
        .fetch_all(&self.pool)
        .await;

        collect(rows, "projects", |(id, name, description, status, client_name)| SearchHit {
            id,
            kind: SearchKind::Project,
            title: name,
            subtitle: client_name,
            description,
            meta: status,
            url: format!("/dashboard/projects/{id}"),
        })
    }

    async fn invoices(&self, workspace_id: Uuid, pattern: &str) -> Vec<SearchHit> {
        let rows: Result<Vec<(Uuid, String, String, i64, String, String)>, _> = sqlx::query_as(
            "SELECT i.id, i.number, i.currency, i.total, i.status, c.name
             FROM invoices i
             JOIN clients c ON c.id = i.client_id
             WHERE c.workspace_id = ?
               AND (LOWER(i.number) LIKE ? ESCAPE '\\' OR LOWER(c.name) LIKE ? ESCAPE '\\')
             ORDER BY i.created_at DESC LIMIT ?",
        )
        .bind(workspace_id)
        .bind(pattern)
        .bind(pattern)
        .bind(PER_KIND_LIMIT)
        .fetch_all(&self.pool)
        .await;

        collect(rows, "invoices", |(id, number, currency, total, status, client_name)| SearchHit {
            id,
            kind: SearchKind::Invoice,
            title: number,
            subtitle: client_name,
            description: money::format_minor(total, &currency),
            meta: status,
            url: format!("/dashboard/invoices/{id}"),
        })
    }

    async fn files(&self, workspace_id: Uuid, pattern: &str) -> Vec<SearchHit> {
        let rows: Result<Vec<(Uuid, Uuid, String, i64, String, String)>, _> = sqlx::query_as(
            "SELECT f.id, f.project_id, f.name, f.size, p.name,
                    COALESCE(u.name, u.email)
             FROM files f
             JOIN projects p ON p.id = f.project_id
             JOIN clients c ON c.id = p.client_id
             JOIN users u ON u.id = f.uploaded_by_id
             WHERE c.workspace_id = ? AND LOWER(f.name) LIKE ? ESCAPE '\\'
             ORDER BY f.created_at DESC LIMIT ?",
        )
        .bind(workspace_id)
        .bind(pattern)
        .bind(PER_KIND_LIMIT)
        .fetch_all(&self.pool)
        .await;

        collect(rows, "files", |(id, project_id, name, size, project_name, uploader)| SearchHit {
            id,
            kind: SearchKind::File,
            title: name,
            subtitle: project_name,
            description: format!("Uploaded by {uploader}"),
            meta: format_size(size),
            url: format!("/dashboard/projects/{project_id}/files"),
        })
    }

    async fn approvals(&self, workspace_id: Uuid, pattern: &str) -> Vec<SearchHit> {
        let rows: Result<Vec<(Uuid, Uuid, String, String, String, String)>, _> = sqlx::query_as(
            "SELECT a.id, a.project_id, a.title, COALESCE(a.description, ''), a.status, p.name
             FROM approval_requests a
             JOIN projects p ON p.id = a.project_id
             JOIN clients c ON c.id = p.client_id
             WHERE c.workspace_id = ? AND LOWER(a.title) LIKE ? ESCAPE '\\'
             ORDER BY a.created_at DESC LIMIT ?",
        )
        .bind(workspace_id)
        .bind(pattern)
        .bind(PER_KIND_LIMIT)
        .fetch_all(&self.pool)
        .await;

        collect(rows, "approvals", |(id, project_id, title, description, status, project_name)| {
            SearchHit {
                id,
                kind: SearchKind::Approval,
                title,
                subtitle: project_name,
                description,
                meta: status,
                url: format!("/dashboard/projects/{project_id}/approvals"),
            }
        })
    }
}

/// One failed sub-query must not sink the whole search response.
fn collect<R>(
    rows: Result<Vec<R>, sqlx::Error>,
    kind: &str,
    to_hit: impl Fn(R) -> SearchHit,
) -> Vec<SearchHit> {
    match rows {
        Ok(rows) => rows.into_iter().map(to_hit).collect(),
        Err(error) => {
            tracing::warn!(%kind, %error, "search sub-query failed");
            Vec::new()
        }
    }
}

/// Lowercase the query and escape LIKE metacharacters so user input is
/// matched literally.
fn like_pattern(query: &str) -> String {
    let escaped = query
        .to_lowercase()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

fn format_size(bytes: i64) -> String {
    const KIB: i64 = 1024;
    const MIB: i64 = KIB * 1024;
    const GIB: i64 = MIB * 1024;
    match bytes {
        b if b >= GIB => format!("{:.1} GB", b as f64 / GIB as f64),
        b if b >= MIB => format!("{:.1} MB", b as f64 / MIB as f64),
        b if b >= KIB => format!("{:.1} KB", b as f64 / KIB as f64),
        b => format!("{b} B"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_escapes_metacharacters() {
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
        assert_eq!(like_pattern("Back\\slash"), "%back\\\\slash%");
    }

    #[test]
    fn sizes_render_in_the_nearest_unit() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0 MB");
    }

    #[test]
    fn kind_params_accept_singular_and_plural() {
        assert_eq!(SearchKind::from_param("client"), Some(SearchKind::Client));
        assert_eq!(SearchKind::from_param("clients"), Some(SearchKind::Client));
        assert_eq!(SearchKind::from_param("invoices"), Some(SearchKind::Invoice));
        assert_eq!(SearchKind::from_param("everything"), None);
    }

    #[test]
    fn filter_treats_all_as_no_restriction() {
        let filter: SearchFilter =
            serde_json::from_value(serde_json::json!({ "q": "acme", "type": "all" })).unwrap();
        assert_eq!(filter.kind, None);

        let filter: SearchFilter =
            serde_json::from_value(serde_json::json!({ "q": "acme", "type": "projects" })).unwrap();
        assert_eq!(filter.kind, Some(SearchKind::Project));

        let err = serde_json::from_value::<SearchFilter>(
            serde_json::json!({ "q": "acme", "type": "nope" }),
        );
        assert!(err.is_err());
    }
}
