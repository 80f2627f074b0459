pub mod activity;
pub mod approval;
pub mod client;
pub mod content;
pub mod invoice;
pub mod project;
pub mod user;
pub mod workspace;

pub use activity::{ActivityAction, ActivityEntry, EntityKind};
pub use approval::{ApprovalDecision, ApprovalRequest, ApprovalStatus, CreateApprovalRequest, RespondRequest};
pub use client::{Client, ClientContact, ClientDetail, ContactView, CreateClientRequest, UpdateClientRequest};
pub use content::{FileUpload, Message, MessageView, PostMessageRequest, PostUpdateRequest, ProjectUpdate, StoredFile};
pub use invoice::{
    CreateInvoiceRequest, Invoice, InvoiceDetail, InvoiceItem, InvoiceStatus, ItemInput, UpdateInvoiceRequest,
};
pub use project::{CreateProjectRequest, Project, ProjectStatus, UpdateProjectRequest};
pub use user::{UpdateProfileRequest, User};
pub use workspace::{
    CreateWorkspaceRequest, InviteMemberRequest, InviteRole, MemberView, Plan, PlanLimits, UpdateWorkspaceRequest,
    Workspace, WorkspaceMember, WorkspaceRole,
};
