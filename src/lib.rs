pub mod channel;
pub mod config;
pub mod error;
pub mod event;
pub mod feed;
pub mod fxopen;
pub mod input;
pub mod model;
pub mod session_filter;
pub mod ui;
