mod install_cni;
mod run;

pub use install_cni::install_cni;
pub use run::{flanneld_args, run};
