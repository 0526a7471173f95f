pub mod analytics;
pub mod cache;
pub mod filter_context;
pub mod filter_views;
pub mod insights;
pub mod keyed;
pub mod layout;
pub mod lifecycle;
pub mod render;
pub mod ui;
