pub mod exec_ps;
pub mod flannel;
pub mod kube_proxy;
