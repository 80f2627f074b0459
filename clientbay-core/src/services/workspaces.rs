//! Workspace lifecycle and team membership.

use chrono::{Duration, Utc};
use garde::Validate;
use rand::distributions::Alphanumeric;
use rand::Rng;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db;
use crate::error::{CoreError, CoreResult};
use crate::models::{
    ActivityAction, CreateWorkspaceRequest, InviteMemberRequest, MemberView, Plan,
    UpdateWorkspaceRequest, User, Workspace, WorkspaceMember, WorkspaceRole,
};
use crate::services::activity::{ActivityLog, NewActivity};

const TRIAL_DAYS: i64 = 14;

#[derive(Clone)]
pub struct WorkspaceService {
    pool: SqlitePool,
    log: ActivityLog,
}

impl WorkspaceService {
    pub fn new(pool: SqlitePool, log: ActivityLog) -> Self {
        Self { pool, log }
    }

    /// Create a workspace and its owner membership in one transaction: a
    /// workspace is never observable without an owner.
    ///
    /// The one-workspace-per-user rule rides on the UNIQUE constraint over
    /// `workspace_members.user_id`; a violation surfaces as `Conflict`
    /// instead of racing a check-then-create.
    pub async fn create(&self, user_id: Uuid, req: CreateWorkspaceRequest) -> CoreResult<Workspace> {
        req.validate()?;

        let slug = self.dedupe_slug(&req.slug).await?;
        let now = Utc::now();
        let workspace = Workspace {
            id: Uuid::new_v4(),
            name: req.name,
            slug,
            brand_color: req.brand_color.unwrap_or_else(|| "#0066FF".to_owned()),
            plan: Plan::Trial,
            trial_ends_at: Some(now + Duration::days(TRIAL_DAYS)),
            created_at: now,
            updated_at: now,
        };

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO workspaces
                 (id, name, slug, brand_color, plan, trial_ends_at, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(workspace.id)
        .bind(&workspace.name)
        .bind(&workspace.slug)
        .bind(&workspace.brand_color)
        .bind(workspace.plan)
        .bind(workspace.trial_ends_at)
        .bind(workspace.created_at)
        .bind(workspace.updated_at)
        .execute(&mut *tx)
        .await?;

        let owner = sqlx::query(
            "INSERT INTO workspace_members (id, workspace_id, user_id, role, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(Uuid::new_v4())
        .bind(workspace.id)
        .bind(user_id)
        .bind(WorkspaceRole::Owner)
        .bind(now)
        .execute(&mut *tx)
        .await;

        if let Err(err) = owner {
            if db::is_unique_violation(&err, "workspace_members.user_id") {
                return Err(CoreError::Conflict("you already have a workspace".into()));
            }
            return Err(err.into());
        }

        tx.commit().await?;
        Ok(workspace)
    }

    /// The caller's workspace.
    pub async fn get_mine(&self, user_id: Uuid) -> CoreResult<Workspace> {
        let workspace = sqlx::query_as::<_, Workspace>(
            "SELECT w.id, w.name, w.slug, w.brand_color, w.plan, w.trial_ends_at,
                    w.created_at, w.updated_at
             FROM workspaces w
             JOIN workspace_members m ON m.workspace_id = w.id
             WHERE m.user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| CoreError::not_found("workspace"))?;
        Ok(workspace)
    }

    pub async fn update(
        &self,
        user_id: Uuid,
        workspace_id: Uuid,
        req: UpdateWorkspaceRequest,
    ) -> CoreResult<Workspace> {
        req.validate()?;
        self.require_admin(user_id, workspace_id).await?;

        sqlx::query(
            "UPDATE workspaces
             SET name = COALESCE(?, name),
                 brand_color = COALESCE(?, brand_color),
                 updated_at = ?
             WHERE id = ?",
        )
        .bind(req.name)
        .bind(req.brand_color)
        .bind(Utc::now())
        .bind(workspace_id)
        .execute(&self.pool)
        .await?;

        self.get_mine(user_id).await
    }

    pub async fn members(&self, user_id: Uuid, workspace_id: Uuid) -> CoreResult<Vec<MemberView>> {
        self.require_member(user_id, workspace_id).await?;

        let rows: Vec<(Uuid, Uuid, Uuid, WorkspaceRole, chrono::DateTime<Utc>, Uuid, String, Option<String>, Option<String>, chrono::DateTime<Utc>)> =
            sqlx::query_as(
                "SELECT m.id, m.workspace_id, m.user_id, m.role, m.created_at,
                        u.id, u.email, u.name, u.avatar_url, u.created_at
                 FROM workspace_members m
                 JOIN users u ON u.id = m.user_id
                 WHERE m.workspace_id = ?
                 ORDER BY m.created_at ASC",
            )
            .bind(workspace_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(id, ws, uid, role, created, u_id, email, name, avatar, u_created)| MemberView {
                member: WorkspaceMember {
                    id,
                    workspace_id: ws,
                    user_id: uid,
                    role,
                    created_at: created,
                },
                user: User {
                    id: u_id,
                    email,
                    name,
                    avatar_url: avatar,
                    created_at: u_created,
                },
            })
            .collect())
    }

    /// Invite a user (created on the spot if unknown) into the workspace.
    pub async fn invite(
        &self,
        user_id: Uuid,
        workspace_id: Uuid,
        req: InviteMemberRequest,
    ) -> CoreResult<WorkspaceMember> {
        req.validate()?;
        let workspace = self.require_admin(user_id, workspace_id).await?;

        let member_count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM workspace_members WHERE workspace_id = ?")
                .bind(workspace_id)
                .fetch_one(&self.pool)
                .await?;
        if member_count as u64 >= u64::from(workspace.plan.limits().members) {
            return Err(CoreError::Conflict(
                "member limit reached for this plan".into(),
            ));
        }

        let invited_id = super::upsert_user_by_email(&self.pool, &req.email).await?;
        let member = WorkspaceMember {
            id: Uuid::new_v4(),
            workspace_id,
            user_id: invited_id,
            role: req.role.into(),
            created_at: Utc::now(),
        };

        let inserted = sqlx::query(
            "INSERT INTO workspace_members (id, workspace_id, user_id, role, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(member.id)
        .bind(member.workspace_id)
        .bind(member.user_id)
        .bind(member.role)
        .bind(member.created_at)
        .execute(&self.pool)
        .await;

        if let Err(err) = inserted {
            if db::is_unique_violation(&err, "workspace_members.user_id") {
                return Err(CoreError::Conflict(
                    "this user already belongs to a workspace".into(),
                ));
            }
            return Err(err.into());
        }

        self.log
            .record(NewActivity {
                workspace_id,
                user_id,
                action: ActivityAction::MemberInvited,
                description: format!("Invited {} to the team", req.email),
                entity_id: Some(member.id),
                project_id: None,
                client_id: None,
                metadata: Some(serde_json::json!({ "email": req.email, "role": req.role })),
            })
            .await;

        Ok(member)
    }

    /// Remove a member. Owners cannot be removed by admins, and a workspace
    /// must always retain at least one owner.
    pub async fn remove_member(&self, user_id: Uuid, member_id: Uuid) -> CoreResult<()> {
        let actor = sqlx::query_as::<_, WorkspaceMember>(
            "SELECT id, workspace_id, user_id, role, created_at
             FROM workspace_members WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| CoreError::not_found("workspace"))?;

        if !actor.role.is_admin() {
            return Err(CoreError::Forbidden(
                "only owners and admins can remove members".into(),
            ));
        }

        let target = sqlx::query_as::<_, WorkspaceMember>(
            "SELECT id, workspace_id, user_id, role, created_at
             FROM workspace_members WHERE id = ? AND workspace_id = ?",
        )
        .bind(member_id)
        .bind(actor.workspace_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| CoreError::not_found("member"))?;

        if target.role == WorkspaceRole::Owner {
            if actor.role != WorkspaceRole::Owner {
                return Err(CoreError::Forbidden("only an owner can remove an owner".into()));
            }
            let owners: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM workspace_members WHERE workspace_id = ? AND role = 'owner'",
            )
            .bind(actor.workspace_id)
            .fetch_one(&self.pool)
            .await?;
            if owners <= 1 {
                return Err(CoreError::Conflict("cannot remove the last owner".into()));
            }
        }

        let email: Option<String> = sqlx::query_scalar("SELECT email FROM users WHERE id = ?")
            .bind(target.user_id)
            .fetch_optional(&self.pool)
            .await?;

        sqlx::query("DELETE FROM workspace_members WHERE id = ?")
            .bind(member_id)
            .execute(&self.pool)
            .await?;

        self.log
            .record(NewActivity {
                workspace_id: actor.workspace_id,
                user_id,
                action: ActivityAction::MemberRemoved,
                description: format!(
                    "Removed {} from the team",
                    email.as_deref().unwrap_or("a member")
                ),
                entity_id: Some(member_id),
                project_id: None,
                client_id: None,
                metadata: None,
            })
            .await;

        Ok(())
    }

    async fn dedupe_slug(&self, slug: &str) -> CoreResult<String> {
        let taken: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM workspaces WHERE slug = ?")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;
        if taken.is_none() {
            return Ok(slug.to_owned());
        }
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(4)
            .map(char::from)
            .collect::<String>()
            .to_lowercase();
        Ok(format!("{slug}-{suffix}"))
    }

    async fn require_member(&self, user_id: Uuid, workspace_id: Uuid) -> CoreResult<WorkspaceMember> {
        sqlx::query_as::<_, WorkspaceMember>(
            "SELECT id, workspace_id, user_id, role, created_at
             FROM workspace_members WHERE user_id = ? AND workspace_id = ?",
        )
        .bind(user_id)
        .bind(workspace_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| CoreError::not_found("workspace"))
    }

    async fn require_admin(&self, user_id: Uuid, workspace_id: Uuid) -> CoreResult<Workspace> {
        let member = self.require_member(user_id, workspace_id).await?;
        if !member.role.is_admin() {
            return Err(CoreError::Forbidden(
                "this operation requires an owner or admin role".into(),
            ));
        }
        let workspace = sqlx::query_as::<_, Workspace>(
            "SELECT id, name, slug, brand_color, plan, trial_ends_at, created_at, updated_at
             FROM workspaces WHERE id = ?",
        )
        .bind(workspace_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(workspace)
    }
}
