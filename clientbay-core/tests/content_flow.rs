mod common;

use clientbay_core::error::CoreError;
use clientbay_core::models::{
    FileUpload, InviteMemberRequest, InviteRole, PostMessageRequest, PostUpdateRequest,
};
use clientbay_core::notify::Notification;
use common::TestCtx;

#[tokio::test]
async fn both_parties_converse_in_one_thread() {
    let ctx = TestCtx::new().await;
    let (owner, _) = ctx.agency("a@alpha.test", "Alpha").await;
    let (client_id, contact) = ctx.client_with_contact(owner, "Acme", "carol@acme.test").await;
    let project_id = ctx.project(owner, client_id, "Website").await;

    ctx.content
        .post_message(owner, project_id, PostMessageRequest { content: "Kickoff done".into() })
        .await
        .unwrap();
    ctx.content
        .post_message(contact, project_id, PostMessageRequest { content: "Thanks!".into() })
        .await
        .unwrap();

    let thread = ctx.content.list_messages(contact, project_id).await.unwrap();
    assert_eq!(thread.len(), 2);
    assert_eq!(thread[0].message.content, "Kickoff done");
    assert_eq!(thread[1].author.email, "carol@acme.test");
}

#[tokio::test]
async fn empty_messages_are_rejected() {
    let ctx = TestCtx::new().await;
    let (owner, _) = ctx.agency("a@alpha.test", "Alpha").await;
    let (client_id, _) = ctx.client_with_contact(owner, "Acme", "c@acme.test").await;
    let project_id = ctx.project(owner, client_id, "Website").await;

    let err = ctx
        .content
        .post_message(owner, project_id, PostMessageRequest { content: String::new() })
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Validation(_)), "got {err:?}");
}

#[tokio::test]
async fn updates_notify_every_contact() {
    let ctx = TestCtx::new().await;
    let (owner, _) = ctx.agency("a@alpha.test", "Alpha").await;
    let (client_id, contact) = ctx.client_with_contact(owner, "Acme", "carol@acme.test").await;
    let project_id = ctx.project(owner, client_id, "Website").await;

    ctx.content
        .post_update(
            owner,
            project_id,
            PostUpdateRequest { content: "Staging is live, please take a look.".into() },
        )
        .await
        .unwrap();

    let feed = ctx.content.list_updates(contact, project_id).await.unwrap();
    assert_eq!(feed.len(), 1);

    let delivered = ctx.wait_for_notifications(1).await;
    assert!(
        matches!(
            &delivered[0],
            Notification::UpdatePosted { recipient, project_name, .. }
                if recipient == "carol@acme.test" && project_name == "Website"
        ),
        "got {delivered:?}"
    );
}

#[tokio::test]
async fn uploads_land_in_blob_storage_with_metadata_in_the_row() {
    let ctx = TestCtx::new().await;
    let (owner, _) = ctx.agency("a@alpha.test", "Alpha").await;
    let (client_id, contact) = ctx.client_with_contact(owner, "Acme", "c@acme.test").await;
    let project_id = ctx.project(owner, client_id, "Website").await;

    let file = ctx
        .content
        .upload(
            owner,
            FileUpload {
                project_id,
                name: "brief.pdf".into(),
                content_type: "application/pdf".into(),
                bytes: vec![0x25, 0x50, 0x44, 0x46],
            },
        )
        .await
        .unwrap();

    assert_eq!(file.size, 4);
    assert!(file.key.starts_with(&project_id.to_string()), "got {}", file.key);
    assert!(ctx.blobs.contains(&file.key));
    let (content_type, bytes) = ctx.blobs.get(&file.key).unwrap();
    assert_eq!(content_type, "application/pdf");
    assert_eq!(bytes.len(), 4);

    // Contacts see the file too.
    let listed = ctx.content.list_files(contact, project_id).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].name, "brief.pdf");
}

#[tokio::test]
async fn only_the_uploader_or_an_admin_deletes_a_file() {
    let ctx = TestCtx::new().await;
    let (owner, ws) = ctx.agency("a@alpha.test", "Alpha").await;
    let (client_id, contact) = ctx.client_with_contact(owner, "Acme", "c@acme.test").await;
    let project_id = ctx.project(owner, client_id, "Website").await;

    let file = ctx
        .content
        .upload(
            contact,
            FileUpload {
                project_id,
                name: "feedback.txt".into(),
                content_type: "text/plain".into(),
                bytes: b"notes".to_vec(),
            },
        )
        .await
        .unwrap();

    let member = ctx
        .workspaces
        .invite(
            owner,
            ws.id,
            InviteMemberRequest { email: "junior@alpha.test".into(), role: InviteRole::Member },
        )
        .await
        .unwrap();
    let err = ctx.content.delete_file(member.user_id, file.id).await.unwrap_err();
    assert!(matches!(err, CoreError::Forbidden(_)), "got {err:?}");

    // The owner may remove it even though the contact uploaded it.
    ctx.content.delete_file(owner, file.id).await.unwrap();
    assert!(!ctx.blobs.contains(&file.key));
    assert!(ctx.content.list_files(owner, project_id).await.unwrap().is_empty());
}
