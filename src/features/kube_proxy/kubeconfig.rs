use std::path::Path;

use anyhow::{Context as _, Result};
use kube::config::Kubeconfig;
use log::info;

use crate::files;

/// Prefixes `path` with the system drive, using Windows separators.
fn windows_path(system_drive: &str, path: &str) -> String {
    let path = path.trim_start_matches(['/', '\\']).replace('/', "\\");

    format!("{system_drive}\\{path}")
}

/// Rebases cluster CA files and user token files onto the system drive.
pub fn fix_windows_paths(kubeconfig: &mut Kubeconfig, system_drive: &str) {
    let clusters = kubeconfig
        .clusters
        .iter_mut()
        .filter_map(|named| named.cluster.as_mut());

    for cluster in clusters {
        if let Some(ca) = cluster.certificate_authority.as_mut().filter(|ca| !ca.is_empty()) {
            *ca = windows_path(system_drive, ca);
        }
    }

    let auth_infos = kubeconfig
        .auth_infos
        .iter_mut()
        .filter_map(|named| named.auth_info.as_mut());

    for auth_info in auth_infos {
        if let Some(token_file) = auth_info.token_file.as_mut().filter(|f| !f.is_empty()) {
            *token_file = windows_path(system_drive, token_file);
        }
    }
}

/// Writes a copy of `src` usable by a kube-proxy running on the Windows host.
pub fn write_windows_kubeconfig(src: &Path, dest: &Path, system_drive: &str) -> Result<()> {
    info!("creating Windows kubeconfig {}", dest.display());

    // Kubeconfig::read_from rebases relative paths on the file's directory
    let yaml = String::from_utf8(files::read_file(src)?)
        .with_context(|| format!("kubeconfig {} is not valid UTF-8", src.display()))?;

    let mut kubeconfig = Kubeconfig::from_yaml(&yaml)
        .with_context(|| format!("failed to parse kubeconfig {}", src.display()))?;

    fix_windows_paths(&mut kubeconfig, system_drive);

    files::write_file(dest, serde_yaml::to_string(&kubeconfig)?)
}

/// Copies the sandboxed kubeconfig to `dest`, pointing `/var` paths into the sandbox.
pub fn rebase_var_dir(src: &Path, dest: &Path, sandbox_var_dir: &str) -> Result<()> {
    info!("fix kube-proxy kubeconfig {}", dest.display());

    let kubeconfig = String::from_utf8(files::read_file(src)?)
        .with_context(|| format!("kubeconfig {} is not valid UTF-8", src.display()))?;

    files::write_file(dest, kubeconfig.replace("/var", sandbox_var_dir))
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs;

    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use tempfile::TempDir;

    const KUBECONFIG: &str = indoc! {"
        apiVersion: v1
        kind: Config
        clusters:
        - cluster:
            certificate-authority: /var/run/secrets/kubernetes.io/serviceaccount/ca.crt
            server: https://10.0.0.4:6443
          name: default
        contexts:
        - context:
            cluster: default
            namespace: default
            user: default
          name: default
        current-context: default
        users:
        - name: default
          user:
            tokenFile: /var/run/secrets/kubernetes.io/serviceaccount/token
    "};

    #[rstest]
    #[case::unix_path("/var/lib/ca.crt", "C:\\var\\lib\\ca.crt")]
    #[case::relative_path("var/lib/ca.crt", "C:\\var\\lib\\ca.crt")]
    #[case::windows_separators("\\var\\lib\\ca.crt", "C:\\var\\lib\\ca.crt")]
    fn prefix_system_drive(#[case] path: &str, #[case] expected: &str) {
        assert_eq!(windows_path("C:", path), expected);
    }

    #[test]
    fn paths_are_rebased_on_system_drive() {
        let mut kubeconfig = Kubeconfig::from_yaml(KUBECONFIG).unwrap();

        fix_windows_paths(&mut kubeconfig, "D:");

        let cluster = kubeconfig.clusters[0].cluster.as_ref().unwrap();
        let auth_info = kubeconfig.auth_infos[0].auth_info.as_ref().unwrap();

        assert_eq!(
            cluster.certificate_authority.as_deref(),
            Some("D:\\var\\run\\secrets\\kubernetes.io\\serviceaccount\\ca.crt")
        );
        assert_eq!(
            auth_info.token_file.as_deref(),
            Some("D:\\var\\run\\secrets\\kubernetes.io\\serviceaccount\\token")
        );
        assert_eq!(cluster.server.as_deref(), Some("https://10.0.0.4:6443"));
    }

    fn read_back(path: &Path) -> Kubeconfig {
        Kubeconfig::from_yaml(&fs::read_to_string(path).unwrap()).unwrap()
    }

    #[rstest]
    #[case::next_to_destination(&["kubeconfig.conf"])]
    #[case::nested_directory(&["var", "lib", "kube-proxy", "kubeconfig.conf"])]
    fn windows_kubeconfig_is_written(#[case] src: &[&str]) {
        let dir = TempDir::new().unwrap();
        let src = src.iter().fold(dir.path().to_path_buf(), |path, part| path.join(part));
        let dest = dir.path().join("k").join("kube-proxy").join("kubeconfig.conf");

        fs::create_dir_all(src.parent().unwrap()).unwrap();
        fs::write(&src, KUBECONFIG).unwrap();

        write_windows_kubeconfig(&src, &dest, "C:").unwrap();

        let written = read_back(&dest);

        assert_eq!(written.current_context.as_deref(), Some("default"));
        assert_eq!(
            written.clusters[0]
                .cluster
                .as_ref()
                .and_then(|cluster| cluster.certificate_authority.as_deref()),
            Some("C:\\var\\run\\secrets\\kubernetes.io\\serviceaccount\\ca.crt")
        );
        assert_eq!(
            written.auth_infos[0]
                .auth_info
                .as_ref()
                .and_then(|auth_info| auth_info.token_file.as_deref()),
            Some("C:\\var\\run\\secrets\\kubernetes.io\\serviceaccount\\token")
        );
    }

    #[test]
    fn var_dir_is_rebased_into_sandbox() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("sandbox-kubeconfig.conf");
        let dest = dir.path().join("var").join("lib").join("kube-proxy").join("kubeconfig.conf");

        fs::write(&src, KUBECONFIG).unwrap();

        rebase_var_dir(&src, &dest, "C:\\sandbox/var").unwrap();

        let written = fs::read_to_string(dest).unwrap();

        assert!(written.contains(
            "certificate-authority: C:\\sandbox/var/run/secrets/kubernetes.io/serviceaccount/ca.crt"
        ));
        assert!(written.contains(
            "tokenFile: C:\\sandbox/var/run/secrets/kubernetes.io/serviceaccount/token"
        ));
    }
}
