use std::{ffi::OsString, path::Path};

use anyhow::{Context as _, Result};
use log::info;

use crate::{config::FlannelRunConfig, files, process};

const SERVICE_ACCOUNT_FILES: [&str; 2] = ["ca.crt", "token"];

/// Starts flanneld in kube subnet manager mode.
pub fn run(config: &FlannelRunConfig) -> Result<()> {
    copy_service_account(
        &config.service_account_dir,
        &config.sandbox_service_account_dir,
    )
    .context("failed to copy service account files")?;

    info!(
        "starting flanneld for pod {}/{}",
        config.pod_namespace.as_deref().unwrap_or_default(),
        config.pod_name.as_deref().unwrap_or_default()
    );

    process::run_daemon(&config.flanneld_bin, flanneld_args(config))
}

pub fn flanneld_args(config: &FlannelRunConfig) -> Vec<OsString> {
    vec![
        "--kube-subnet-mgr".into(),
        "--ip-masq".into(),
        "--net-config-path".into(),
        config.net_conf.clone().into_os_string(),
        "--iface".into(),
        config.iface.clone().into(),
    ]
}

/// flanneld resolves the in-cluster service account under the host path, so the
/// projected files are mirrored there unless already present.
fn copy_service_account(dest_dir: &Path, src_dir: &Path) -> Result<()> {
    let missing: Vec<_> = SERVICE_ACCOUNT_FILES
        .iter()
        .filter(|name| !dest_dir.join(name).exists())
        .collect();

    if missing.is_empty() {
        return Ok(());
    }

    files::create_dir(dest_dir)?;

    for name in missing {
        files::copy_file(&src_dir.join(name), &dest_dir.join(name))?;
    }

    Ok(())
}
