mod conf;
mod kubeadm;
mod net_conf;
mod policy;

pub use conf::{additional_args, merge_template, ClusterSubnets, Delegate, NetConf};
pub use kubeadm::{KubeadmConfig, KubeadmNetworking};
pub use net_conf::{Backend, BackendConf, FlannelNetConf, DEFAULT_VNI};
pub use policy::{EndpointPolicy, Kvp};
