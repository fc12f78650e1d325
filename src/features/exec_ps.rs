use std::path::Path;

use anyhow::Result;

use crate::process::PowerShell;

pub fn run(file: &Path) -> Result<()> {
    PowerShell::detect().run_file(file)
}
