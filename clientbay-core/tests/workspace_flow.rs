mod common;

use clientbay_core::error::CoreError;
use clientbay_core::models::{
    CreateWorkspaceRequest, InviteMemberRequest, InviteRole, UpdateWorkspaceRequest, WorkspaceRole,
};
use common::TestCtx;

#[tokio::test]
async fn creating_a_workspace_makes_the_creator_its_owner() {
    let ctx = TestCtx::new().await;
    let (owner, workspace) = ctx.agency("ana@studio.test", "Ana Studio").await;

    let mine = ctx.workspaces.get_mine(owner).await.unwrap();
    assert_eq!(mine.id, workspace.id);

    let members = ctx.workspaces.members(owner, workspace.id).await.unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].member.role, WorkspaceRole::Owner);
    assert_eq!(members[0].member.user_id, owner);
}

#[tokio::test]
async fn a_user_cannot_own_two_workspaces() {
    let ctx = TestCtx::new().await;
    let (owner, _) = ctx.agency("solo@studio.test", "First").await;

    let err = ctx
        .workspaces
        .create(
            owner,
            CreateWorkspaceRequest {
                name: "Second".into(),
                slug: "second".into(),
                brand_color: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Conflict(_)), "got {err:?}");
}

#[tokio::test]
async fn colliding_slugs_are_deduplicated() {
    let ctx = TestCtx::new().await;
    let (_, first) = ctx.agency("a@one.test", "Studio").await;
    let (_, second) = ctx.agency("b@two.test", "Studio").await;

    assert_eq!(first.slug, "studio");
    assert_ne!(second.slug, first.slug);
    assert!(second.slug.starts_with("studio-"), "got {}", second.slug);
}

#[tokio::test]
async fn invited_members_appear_and_plain_members_cannot_invite() {
    let ctx = TestCtx::new().await;
    let (owner, workspace) = ctx.agency("boss@studio.test", "Studio").await;

    let member = ctx
        .workspaces
        .invite(
            owner,
            workspace.id,
            InviteMemberRequest { email: "dev@studio.test".into(), role: InviteRole::Member },
        )
        .await
        .unwrap();
    assert_eq!(member.role, WorkspaceRole::Member);

    let members = ctx.workspaces.members(owner, workspace.id).await.unwrap();
    assert_eq!(members.len(), 2);

    let err = ctx
        .workspaces
        .invite(
            member.user_id,
            workspace.id,
            InviteMemberRequest { email: "more@studio.test".into(), role: InviteRole::Member },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Forbidden(_)), "got {err:?}");
}

#[tokio::test]
async fn a_user_already_in_a_workspace_cannot_be_invited_elsewhere() {
    let ctx = TestCtx::new().await;
    let (owner_a, ws_a) = ctx.agency("a@alpha.test", "Alpha").await;
    let (_owner_b, _ws_b) = ctx.agency("b@beta.test", "Beta").await;

    let err = ctx
        .workspaces
        .invite(
            owner_a,
            ws_a.id,
            InviteMemberRequest { email: "b@beta.test".into(), role: InviteRole::Admin },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Conflict(_)), "got {err:?}");
}

#[tokio::test]
async fn the_last_owner_cannot_be_removed() {
    let ctx = TestCtx::new().await;
    let (owner, workspace) = ctx.agency("only@studio.test", "Studio").await;

    let members = ctx.workspaces.members(owner, workspace.id).await.unwrap();
    let err = ctx
        .workspaces
        .remove_member(owner, members[0].member.id)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Conflict(_)), "got {err:?}");
}

#[tokio::test]
async fn admins_can_remove_members_but_not_owners() {
    let ctx = TestCtx::new().await;
    let (owner, workspace) = ctx.agency("owner@studio.test", "Studio").await;

    let admin = ctx
        .workspaces
        .invite(
            owner,
            workspace.id,
            InviteMemberRequest { email: "admin@studio.test".into(), role: InviteRole::Admin },
        )
        .await
        .unwrap();
    let member = ctx
        .workspaces
        .invite(
            owner,
            workspace.id,
            InviteMemberRequest { email: "member@studio.test".into(), role: InviteRole::Member },
        )
        .await
        .unwrap();

    ctx.workspaces.remove_member(admin.user_id, member.id).await.unwrap();

    let owner_row = ctx
        .workspaces
        .members(owner, workspace.id)
        .await
        .unwrap()
        .into_iter()
        .find(|m| m.member.role == WorkspaceRole::Owner)
        .unwrap();
    let err = ctx
        .workspaces
        .remove_member(admin.user_id, owner_row.member.id)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Forbidden(_)), "got {err:?}");
}

#[tokio::test]
async fn workspace_updates_only_touch_provided_fields() {
    let ctx = TestCtx::new().await;
    let (owner, workspace) = ctx.agency("brand@studio.test", "Studio").await;

    let updated = ctx
        .workspaces
        .update(
            owner,
            workspace.id,
            UpdateWorkspaceRequest { name: None, brand_color: Some("#ff8800".into()) },
        )
        .await
        .unwrap();
    assert_eq!(updated.name, "Studio");
    assert_eq!(updated.brand_color, "#ff8800");

    let err = ctx
        .workspaces
        .update(
            owner,
            workspace.id,
            UpdateWorkspaceRequest { name: None, brand_color: Some("orange".into()) },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Validation(_)), "got {err:?}");
}
