use anyhow::{Context as _, Result};
use log::info;

use crate::{
    cni::{additional_args, merge_template, ClusterSubnets, FlannelNetConf, KubeadmConfig, NetConf},
    config::FlannelConfig,
    error::Error,
    files,
    host::HostNetwork,
};

/// Installs the CNI binaries and writes the flannel CNI config on the host.
pub fn install_cni(config: &FlannelConfig, host: &impl HostNetwork) -> Result<()> {
    copy_cni_binaries(config).context("failed to copy CNI binaries")?;

    if let Some(dest) = &config.net_conf_dest {
        if let Some(dir) = dest.parent() {
            files::create_dir(dir)?;
        }

        files::copy_file(&config.net_conf, dest).context("failed to copy flannel net-conf")?;
    }

    create_cni_conf(config, host).context("failed to create CNI config file")
}

fn copy_cni_binaries(config: &FlannelConfig) -> Result<()> {
    files::create_dir(&config.containerd_cni_bin_dir)?;

    files::copy_files(&config.cni_bin_dir, &config.containerd_cni_bin_dir)
        .context("failed to copy cni binaries")?;

    if config.build_cni_bin_dir.is_dir() {
        files::copy_files(&config.build_cni_bin_dir, &config.containerd_cni_bin_dir)
            .context("failed to copy cni CI/CD binaries")?;
    } else {
        info!(
            "no CI/CD cni binaries at {}",
            config.build_cni_bin_dir.display()
        );
    }

    Ok(())
}

fn cluster_subnets(config: &FlannelConfig) -> Result<ClusterSubnets> {
    let (pod_subnet, service_subnet) = match (&config.pod_subnet, &config.service_subnet) {
        (Some(pod), Some(service)) => (pod.clone(), service.clone()),
        (pod, service) => {
            let kubeadm = KubeadmConfig::read(&config.kubeadm_config)?;

            let pod = pod
                .clone()
                .or(kubeadm.networking.pod_subnet)
                .ok_or(Error::MissingEnv("POD_SUBNET"))?;
            let service = service
                .clone()
                .or(kubeadm.networking.service_subnet)
                .ok_or(Error::MissingEnv("SERVICE_SUBNET"))?;

            (pod, service)
        }
    };

    Ok(ClusterSubnets {
        pod_subnet,
        service_subnet,
        control_plane_cidr: config.control_plane_cidr.clone(),
        node_cidr: config.node_cidr.clone(),
    })
}

fn create_cni_conf(config: &FlannelConfig, host: &impl HostNetwork) -> Result<()> {
    if config.cni_conf.exists() {
        info!("CNI config {} already exists", config.cni_conf.display());
        return Ok(());
    }

    let net_conf = FlannelNetConf::read(&config.net_conf)?;
    let backend = net_conf.backend()?;

    let subnets = cluster_subnets(config)?;
    let args = additional_args(backend, &subnets, host)?;

    let bytes = if let Some(template) = &config.cni_template {
        let template = serde_json::from_slice(&files::read_file(template)?)
            .with_context(|| format!("failed to parse CNI template {}", template.display()))?;

        serde_json::to_vec_pretty(&merge_template(template, args)?)?
    } else {
        serde_json::to_vec_pretty(&NetConf::new(backend, net_conf.vni(), args))?
    };

    info!("creating CNI config {}", config.cni_conf.display());

    files::write_file(&config.cni_conf, bytes)
}
