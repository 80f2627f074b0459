mod common;

use clientbay_core::access::{Access, AccessResolver, ResourceRef};
use clientbay_core::error::CoreError;
use clientbay_core::models::{InviteMemberRequest, InviteRole, PostUpdateRequest};
use common::TestCtx;

#[tokio::test]
async fn resources_in_another_workspace_read_as_absent() {
    let ctx = TestCtx::new().await;
    let (owner_a, _) = ctx.agency("a@alpha.test", "Alpha").await;
    let (owner_b, _) = ctx.agency("b@beta.test", "Beta").await;

    let (client_id, _) = ctx.client_with_contact(owner_a, "Acme", "carol@acme.test").await;
    let project_id = ctx.project(owner_a, client_id, "Website").await;

    let err = ctx.clients.get(owner_b, client_id).await.unwrap_err();
    assert!(matches!(err, CoreError::NotFound(_)), "got {err:?}");

    let err = ctx.projects.get(owner_b, project_id).await.unwrap_err();
    assert!(matches!(err, CoreError::NotFound(_)), "got {err:?}");
}

#[tokio::test]
async fn contacts_see_their_projects_but_not_the_agency_surface() {
    let ctx = TestCtx::new().await;
    let (owner, _) = ctx.agency("a@alpha.test", "Alpha").await;
    let (client_id, contact) = ctx.client_with_contact(owner, "Acme", "carol@acme.test").await;
    let project_id = ctx.project(owner, client_id, "Website").await;

    let project = ctx.projects.get(contact, project_id).await.unwrap();
    assert_eq!(project.id, project_id);

    let portal = ctx.projects.list_for_contact(contact).await.unwrap();
    assert_eq!(portal.len(), 1);

    // Client detail is agency-only.
    let err = ctx.clients.get(contact, client_id).await.unwrap_err();
    assert!(matches!(err, CoreError::NotFound(_)), "got {err:?}");

    // So is posting project updates.
    let err = ctx
        .content
        .post_update(contact, project_id, PostUpdateRequest { content: "hi".into() })
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Forbidden(_)), "got {err:?}");
}

#[tokio::test]
async fn one_user_can_hold_both_identities_across_tenants() {
    let ctx = TestCtx::new().await;
    let (owner_a, _) = ctx.agency("a@alpha.test", "Alpha").await;
    let (owner_b, ws_b) = ctx.agency("b@beta.test", "Beta").await;

    // Carol is a contact of Alpha's client...
    let (client_a, carol) = ctx.client_with_contact(owner_a, "Acme", "carol@dual.test").await;
    let project_a = ctx.project(owner_a, client_a, "Alpha Site").await;

    // ...and then gets hired into Beta's team under the same account.
    ctx.workspaces
        .invite(
            owner_b,
            ws_b.id,
            InviteMemberRequest { email: "carol@dual.test".into(), role: InviteRole::Member },
        )
        .await
        .unwrap();

    let resolver = AccessResolver::new(ctx.pool.clone());

    // On Alpha's project she acts client-side despite her Beta membership.
    let access = resolver.resolve(carol, ResourceRef::Project(project_a)).await.unwrap();
    assert!(
        matches!(access, Access::ClientSide { client_id, .. } if client_id == client_a),
        "got {access:?}"
    );

    // Her agency-side listings are scoped to Beta, which has no clients yet.
    assert_eq!(ctx.clients.list(carol).await.unwrap().len(), 0);

    // Her portal listing still shows Alpha's project.
    assert_eq!(ctx.projects.list_for_contact(carol).await.unwrap().len(), 1);
}

#[tokio::test]
async fn agency_membership_wins_over_contact_for_the_same_tenant() {
    let ctx = TestCtx::new().await;
    let (owner, ws) = ctx.agency("a@alpha.test", "Alpha").await;
    let (client_id, contact) = ctx.client_with_contact(owner, "Acme", "dana@acme.test").await;
    let project_id = ctx.project(owner, client_id, "Website").await;

    // Dana joins the very agency she contracted.
    ctx.workspaces
        .invite(
            owner,
            ws.id,
            InviteMemberRequest { email: "dana@acme.test".into(), role: InviteRole::Member },
        )
        .await
        .unwrap();

    let resolver = AccessResolver::new(ctx.pool.clone());
    let access = resolver.resolve(contact, ResourceRef::Project(project_id)).await.unwrap();
    assert!(access.is_agency(), "got {access:?}");
}

#[tokio::test]
async fn destructive_operations_require_owner_or_admin() {
    let ctx = TestCtx::new().await;
    let (owner, ws) = ctx.agency("a@alpha.test", "Alpha").await;
    let (client_id, _) = ctx.client_with_contact(owner, "Acme", "c@acme.test").await;

    let member = ctx
        .workspaces
        .invite(
            owner,
            ws.id,
            InviteMemberRequest { email: "junior@alpha.test".into(), role: InviteRole::Member },
        )
        .await
        .unwrap();

    let err = ctx.clients.delete(member.user_id, client_id).await.unwrap_err();
    assert!(matches!(err, CoreError::Forbidden(_)), "got {err:?}");

    ctx.clients.delete(owner, client_id).await.unwrap();
    let err = ctx.clients.get(owner, client_id).await.unwrap_err();
    assert!(matches!(err, CoreError::NotFound(_)), "got {err:?}");
}
