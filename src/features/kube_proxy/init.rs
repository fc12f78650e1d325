use std::path::Path;

use anyhow::{anyhow, Context as _, Result};
use log::info;
use serde_yaml::{Mapping, Value};

use crate::{
    config::KubeProxyConfig,
    files,
    hns::{self, HnsClient},
    ipam::{self, SourceVipRequest},
};

use super::kubeconfig;

/// Windows specific overrides applied to the kube-proxy configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WindowsSettings {
    pub network_name: String,
    pub enable_dsr: bool,
    pub source_vip: Option<String>,
    pub kubeconfig: Option<String>,
}

/// Creates the Windows kube-proxy config from the cluster's kube-proxy config.
pub fn init(config: &KubeProxyConfig, hns: &impl HnsClient) -> Result<()> {
    info!("creating kube-proxy config {}", config.windows_conf.display());

    let mut kube_proxy: Value = serde_yaml::from_slice(&files::read_file(&config.conf)?)
        .with_context(|| format!("failed to parse kube-proxy config {}", config.conf.display()))?;

    let wanted = wanted_network(config)?;
    let network = hns::select_network(hns, wanted.as_deref())?;

    info!("using HNS network {} ({})", network.name, network.network_type);

    let source_vip = if network.is_overlay() {
        let request = SourceVipRequest {
            source_vip_file: &config.source_vip_file,
            cni_bin_dir: &config.cni_bin_dir,
            cni_version: &config.cni_version,
        };

        Some(ipam::source_vip(&request, &network)?)
    } else {
        None
    };

    let kubeconfig = match client_kubeconfig(&kube_proxy) {
        Some(path) => {
            kubeconfig::write_windows_kubeconfig(
                Path::new(&path),
                &config.windows_kubeconfig,
                &config.system_drive,
            )
            .context("failed to fix kube-proxy kubeconfig")?;

            Some(config.windows_kubeconfig.to_string_lossy().into_owned())
        }
        None => None,
    };

    let settings = WindowsSettings {
        network_name: network.name,
        enable_dsr: config.enable_dsr,
        source_vip,
        kubeconfig,
    };

    apply(&mut kube_proxy, &settings)?;

    files::write_file(&config.windows_conf, serde_yaml::to_string(&kube_proxy)?)
}

/// `HNS_NETWORK_NAME`, else the name of the installed CNI config.
fn wanted_network(config: &KubeProxyConfig) -> Result<Option<String>> {
    if let Some(name) = &config.hns_network_name {
        return Ok(Some(name.clone()));
    }

    if !config.cni_conf.is_file() {
        return Ok(None);
    }

    let cni_conf: serde_json::Value = serde_json::from_slice(&files::read_file(&config.cni_conf)?)
        .with_context(|| format!("failed to parse CNI config {}", config.cni_conf.display()))?;

    Ok(cni_conf["name"].as_str().map(ToString::to_string))
}

fn client_kubeconfig(kube_proxy: &Value) -> Option<String> {
    kube_proxy["clientConnection"]["kubeconfig"]
        .as_str()
        .filter(|path| !path.is_empty())
        .map(ToString::to_string)
}

fn section<'a>(parent: &'a mut Mapping, key: &str) -> Result<&'a mut Mapping> {
    let value = parent
        .entry(Value::String(key.to_string()))
        .or_insert(Value::Mapping(Mapping::new()));

    if value.is_null() {
        *value = Value::Mapping(Mapping::new());
    }

    value
        .as_mapping_mut()
        .ok_or_else(|| anyhow!("kube-proxy config field {key} is not a mapping"))
}

fn set(mapping: &mut Mapping, key: &str, value: impl Into<Value>) {
    mapping.insert(Value::String(key.to_string()), value.into());
}

/// Switches the configuration to the Windows kernel proxier. Fields not touched
/// here are kept as they are.
pub fn apply(kube_proxy: &mut Value, settings: &WindowsSettings) -> Result<()> {
    if kube_proxy.is_null() {
        *kube_proxy = Value::Mapping(Mapping::new());
    }

    let root = kube_proxy
        .as_mapping_mut()
        .ok_or_else(|| anyhow!("kube-proxy config is not a mapping"))?;

    set(root, "mode", "kernelspace");

    let winkernel = section(root, "winkernel")?;
    set(winkernel, "networkName", settings.network_name.as_str());
    set(winkernel, "enableDSR", settings.enable_dsr);

    if let Some(source_vip) = &settings.source_vip {
        set(winkernel, "sourceVip", source_vip.as_str());
    }

    let mut feature_gates = Mapping::new();
    set(&mut feature_gates, "WinDSR", settings.enable_dsr);

    if settings.source_vip.is_some() {
        set(&mut feature_gates, "WinOverlay", true);
    }

    set(root, "featureGates", feature_gates);

    if let Some(path) = &settings.kubeconfig {
        set(section(root, "clientConnection")?, "kubeconfig", path.as_str());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::{fs, path::PathBuf};

    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use crate::{
        error::Error,
        hns::mock::{network, MockTestHnsClient},
    };

    const KUBE_PROXY_CONF: &str = indoc! {"
        apiVersion: kubeproxy.config.k8s.io/v1alpha1
        kind: KubeProxyConfiguration
        bindAddress: 0.0.0.0
        clusterCIDR: 10.244.0.0/16
        featureGates:
          SomeGate: true
        mode: iptables
        winkernel:
          rootHnsEndpointName: ''
    "};

    fn config(dir: &Path) -> KubeProxyConfig {
        let conf = dir.join("sandbox").join("config.conf");
        fs::create_dir_all(conf.parent().unwrap()).unwrap();
        fs::write(&conf, KUBE_PROXY_CONF).unwrap();

        let windows_dir = dir.join("k").join("kube-proxy");

        KubeProxyConfig {
            conf,
            windows_conf: windows_dir.join("config.conf"),
            windows_kubeconfig: windows_dir.join("kubeconfig.conf"),
            source_vip_file: windows_dir.join("sourceVip.json"),
            cni_bin_dir: dir.join("sandbox").join("cni").join("bin"),
            cni_conf: dir.join("etc").join("cni").join("net.d").join("10-flannel.conf"),
            hns_network_name: None,
            cni_version: "0.2.0".into(),
            enable_dsr: true,
            system_drive: "C:".into(),
        }
    }

    fn hns_client(networks: Vec<crate::hns::HnsNetwork>) -> MockTestHnsClient {
        let mut client = MockTestHnsClient::new();
        client
            .expect_list_networks()
            .returning(move || Ok(networks.clone()));
        client
    }

    fn read_yaml(path: &Path) -> Value {
        serde_yaml::from_str(&fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn apply_to_empty_config() {
        let mut value = Value::Null;

        apply(
            &mut value,
            &WindowsSettings {
                network_name: "cbr0".into(),
                enable_dsr: false,
                ..Default::default()
            },
        )
        .unwrap();

        let expected: Value = serde_yaml::from_str(indoc! {"
            mode: kernelspace
            winkernel:
              networkName: cbr0
              enableDSR: false
            featureGates:
              WinDSR: false
        "})
        .unwrap();

        assert_eq!(value, expected);
    }

    #[test]
    fn apply_keeps_unknown_fields_and_replaces_feature_gates() {
        let mut value: Value = serde_yaml::from_str(KUBE_PROXY_CONF).unwrap();

        apply(
            &mut value,
            &WindowsSettings {
                network_name: "flannel.4096".into(),
                enable_dsr: true,
                source_vip: Some("10.244.1.2".into()),
                kubeconfig: Some("/k/kube-proxy/kubeconfig.conf".into()),
            },
        )
        .unwrap();

        let expected: Value = serde_yaml::from_str(indoc! {"
            apiVersion: kubeproxy.config.k8s.io/v1alpha1
            kind: KubeProxyConfiguration
            bindAddress: 0.0.0.0
            clusterCIDR: 10.244.0.0/16
            featureGates:
              WinDSR: true
              WinOverlay: true
            mode: kernelspace
            winkernel:
              rootHnsEndpointName: ''
              networkName: flannel.4096
              enableDSR: true
              sourceVip: 10.244.1.2
            clientConnection:
              kubeconfig: /k/kube-proxy/kubeconfig.conf
        "})
        .unwrap();

        assert_eq!(value, expected);
    }

    #[test]
    fn apply_rejects_non_mapping_section() {
        let mut value: Value = serde_yaml::from_str("winkernel: [1, 2]").unwrap();

        assert!(apply(&mut value, &WindowsSettings::default()).is_err());
    }

    #[test]
    fn l2bridge_network_config() {
        let dir = TempDir::new().unwrap();
        let config = config(dir.path());

        let hns = hns_client(vec![network("cbr0", "L2Bridge", "10.244.1.0/24")]);

        init(&config, &hns).unwrap();

        let written = read_yaml(&config.windows_conf);

        assert_eq!(written["mode"], Value::from("kernelspace"));
        assert_eq!(written["winkernel"]["networkName"], Value::from("cbr0"));
        assert_eq!(written["winkernel"]["enableDSR"], Value::from(true));
        assert_eq!(written["winkernel"]["sourceVip"], Value::Null);
        assert_eq!(written["featureGates"]["WinDSR"], Value::from(true));
        assert_eq!(written["featureGates"]["SomeGate"], Value::Null);
        assert_eq!(written["clusterCIDR"], Value::from("10.244.0.0/16"));
        assert!(!config.source_vip_file.exists());
    }

    #[test]
    fn overlay_network_uses_existing_source_vip() {
        let dir = TempDir::new().unwrap();
        let config = config(dir.path());

        fs::create_dir_all(config.source_vip_file.parent().unwrap()).unwrap();
        fs::write(
            &config.source_vip_file,
            r#"{"ip4": {"ip": "10.244.1.2/24", "gateway": "10.244.1.1"}}"#,
        )
        .unwrap();

        let hns = hns_client(vec![network("flannel.4096", "Overlay", "10.244.1.0/24")]);

        init(&config, &hns).unwrap();

        let written = read_yaml(&config.windows_conf);

        assert_eq!(written["winkernel"]["sourceVip"], Value::from("10.244.1.2"));
        assert_eq!(written["featureGates"]["WinOverlay"], Value::from(true));
    }

    #[test]
    fn network_name_from_cni_config() {
        let dir = TempDir::new().unwrap();
        let config = config(dir.path());

        fs::create_dir_all(config.cni_conf.parent().unwrap()).unwrap();
        fs::write(&config.cni_conf, r#"{"name": "cbr0", "type": "flannel"}"#).unwrap();

        let hns = hns_client(vec![
            network("nat", "NAT", "172.20.0.0/16"),
            network("cbr0", "L2Bridge", "10.244.1.0/24"),
        ]);

        init(&config, &hns).unwrap();

        let written = read_yaml(&config.windows_conf);

        assert_eq!(written["winkernel"]["networkName"], Value::from("cbr0"));
    }

    #[test]
    fn configured_network_must_exist() {
        let dir = TempDir::new().unwrap();
        let config = KubeProxyConfig {
            hns_network_name: Some("flannel.4096".into()),
            ..config(dir.path())
        };

        let hns = hns_client(vec![network("cbr0", "L2Bridge", "10.244.1.0/24")]);

        let err = init(&config, &hns).unwrap_err();

        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::HnsNetworkNotFound(name)) if name == "flannel.4096"
        ));
        assert!(!config.windows_conf.exists());
    }

    #[test]
    fn client_kubeconfig_is_fixed() {
        let dir = TempDir::new().unwrap();
        let base = config(dir.path());

        let kubeconfig = dir.path().join("sandbox").join("kubeconfig.conf");
        fs::write(
            &kubeconfig,
            indoc! {"
                apiVersion: v1
                kind: Config
                clusters:
                - cluster:
                    certificate-authority: /var/run/secrets/kubernetes.io/serviceaccount/ca.crt
                    server: https://10.0.0.4:6443
                  name: default
                users:
                - name: default
                  user:
                    tokenFile: /var/run/secrets/kubernetes.io/serviceaccount/token
            "},
        )
        .unwrap();

        fs::write(
            &base.conf,
            format!(
                "{KUBE_PROXY_CONF}clientConnection:\n  kubeconfig: {}\n",
                kubeconfig.display()
            ),
        )
        .unwrap();

        let hns = hns_client(vec![network("cbr0", "L2Bridge", "10.244.1.0/24")]);

        init(&base, &hns).unwrap();

        let written = read_yaml(&base.windows_conf);

        assert_eq!(
            written["clientConnection"]["kubeconfig"].as_str().map(PathBuf::from),
            Some(base.windows_kubeconfig.clone())
        );

        let fixed = fs::read_to_string(&base.windows_kubeconfig).unwrap();

        assert!(fixed.contains("C:\\var\\run\\secrets\\kubernetes.io\\serviceaccount\\token"));
    }
}
