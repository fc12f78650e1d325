mod init;
mod kubeconfig;
mod run;

pub use init::{apply, init, WindowsSettings};
pub use kubeconfig::{fix_windows_paths, rebase_var_dir, write_windows_kubeconfig};
pub use run::{kube_proxy_args, run};
