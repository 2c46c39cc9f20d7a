//! Pure filtering over loaded views

pub mod filter;

pub use filter::{filter_views, StatusFilter, WaitingFilter};
