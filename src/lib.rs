pub mod app;
pub mod backups;
pub mod commands;
pub mod config_store;
pub mod credentials;
pub mod doctor;
pub mod error;
pub mod extensions;
pub mod fs_utils;
pub mod paths;
pub mod profiles;
pub mod protected;
pub mod share_code;
pub mod sharing;
pub mod state;
pub mod switch;
pub mod themes;
pub mod ui;

#[cfg(test)]
pub mod test_utils;
