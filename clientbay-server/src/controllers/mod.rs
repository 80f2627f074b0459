pub mod activity;
pub mod approvals;
pub mod clients;
pub mod dashboard;
pub mod invoices;
pub mod portal;
pub mod projects;
pub mod reports;
pub mod search;
pub mod users;
pub mod workspaces;
