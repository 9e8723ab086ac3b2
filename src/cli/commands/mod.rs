//! CLI command modules

pub mod details;
pub mod info;
pub mod init;
pub mod installed;
pub mod lifecycle;
pub mod list;
pub mod uninstall;
pub mod upload;
pub mod validate;
