pub mod cmd;
pub mod cni;
pub mod config;
pub mod error;
pub mod features;
pub mod files;
pub mod hns;
pub mod host;
pub mod ipam;
pub mod logging;
pub mod process;
pub mod windows;
