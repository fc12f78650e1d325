use anyhow::{Context as _, Result};
use log::info;

use crate::{config::KubeProxyRunConfig, files, process};

use super::kubeconfig;

/// Starts kube-proxy with the Windows config created by `kube-proxy init`.
pub fn run(config: &KubeProxyRunConfig, fix_kubeconfig: bool) -> Result<()> {
    prepare(config, fix_kubeconfig)?;

    process::run_daemon(&config.kube_proxy_bin, kube_proxy_args(config))
}

fn prepare(config: &KubeProxyRunConfig, fix_kubeconfig: bool) -> Result<()> {
    if config.build_binary.is_file() {
        info!(
            "kube-proxy build binary found ({}), using it",
            config.build_binary.display()
        );

        files::copy_file(&config.build_binary, &config.kube_proxy_bin)?;
    }

    if fix_kubeconfig {
        kubeconfig::rebase_var_dir(
            &config.sandbox_kubeconfig,
            &config.kubeconfig,
            &config.sandbox_var_dir,
        )
        .context("error fixing kube-proxy kubeconfig")?;
    }

    Ok(())
}

pub fn kube_proxy_args(config: &KubeProxyRunConfig) -> Vec<String> {
    vec![
        format!("--hostname-override={}", config.node_name),
        format!("--enable-dsr={}", config.enable_dsr),
        format!("--config={}", config.windows_conf.display()),
        format!("--v={}", config.verbosity),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::{fs, path::Path};

    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn config(dir: &Path) -> KubeProxyRunConfig {
        let sandbox = dir.join("sandbox");

        KubeProxyRunConfig {
            kube_proxy_bin: sandbox.join("kube-proxy").join("kube-proxy.exe"),
            build_binary: dir.join("build").join("kube-proxy.exe"),
            windows_conf: dir.join("k").join("kube-proxy").join("config.conf"),
            node_name: "win-node-1".into(),
            enable_dsr: false,
            verbosity: "4".into(),
            sandbox_kubeconfig: sandbox.join("var").join("lib").join("kube-proxy").join("kubeconfig.conf"),
            kubeconfig: dir.join("var").join("lib").join("kube-proxy").join("kubeconfig.conf"),
            sandbox_var_dir: sandbox.join("var").to_string_lossy().into_owned(),
        }
    }

    #[test]
    fn kube_proxy_arguments() {
        let dir = TempDir::new().unwrap();
        let config = config(dir.path());

        assert_eq!(
            kube_proxy_args(&config),
            vec![
                "--hostname-override=win-node-1".to_string(),
                "--enable-dsr=false".to_string(),
                format!("--config={}", config.windows_conf.display()),
                "--v=4".to_string(),
            ]
        );
    }

    #[test]
    fn build_binary_replaces_kube_proxy() {
        let dir = TempDir::new().unwrap();
        let config = config(dir.path());

        fs::create_dir_all(config.build_binary.parent().unwrap()).unwrap();
        fs::write(&config.build_binary, "ci build").unwrap();
        fs::create_dir_all(config.kube_proxy_bin.parent().unwrap()).unwrap();
        fs::write(&config.kube_proxy_bin, "release").unwrap();

        prepare(&config, false).unwrap();

        assert_eq!(fs::read_to_string(&config.kube_proxy_bin).unwrap(), "ci build");
        assert!(!config.kubeconfig.exists());
    }

    #[test]
    fn kubeconfig_is_rebased_on_request() {
        let dir = TempDir::new().unwrap();
        let config = config(dir.path());

        fs::create_dir_all(config.sandbox_kubeconfig.parent().unwrap()).unwrap();
        fs::write(
            &config.sandbox_kubeconfig,
            "tokenFile: /var/run/secrets/kubernetes.io/serviceaccount/token\n",
        )
        .unwrap();

        prepare(&config, true).unwrap();

        assert_eq!(
            fs::read_to_string(&config.kubeconfig).unwrap(),
            format!(
                "tokenFile: {}/run/secrets/kubernetes.io/serviceaccount/token\n",
                config.sandbox_var_dir
            )
        );
    }

    #[test]
    fn missing_sandbox_kubeconfig_is_an_error() {
        let dir = TempDir::new().unwrap();
        let config = config(dir.path());

        let err = run(&config, true).unwrap_err();

        assert!(err.to_string().contains("error fixing kube-proxy kubeconfig"));
    }
}
