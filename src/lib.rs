pub mod app;
pub mod collector;
pub mod config;
pub mod domain;
pub mod error;
pub mod evidence;
pub mod fs_util;
pub mod opentargets;
pub mod output;
pub mod retry;
pub mod summary;
