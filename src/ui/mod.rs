pub mod components;
pub mod popup;
pub mod project_dialog;
pub mod projects;
