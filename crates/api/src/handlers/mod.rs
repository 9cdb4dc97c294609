pub mod admin;
pub mod auth;
pub mod brands;
pub mod editor;
pub mod plans;
pub mod visits;
