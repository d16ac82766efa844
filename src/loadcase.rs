use std::path::Path;

use crate::error::{Error, Result};
use crate::network::Network;

/// Reads a network from a file in some external format.
pub trait Importer {
    fn import(&self, path: &Path) -> anyhow::Result<Network>;
}

/// Loads a network with the given importer.
pub fn load_network(path: &Path, importer: &dyn Importer) -> Result<Network> {
    if !path.exists() {
        return Err(Error::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{} does not exist", path.display()),
        )));
    }
    let network = importer
        .import(path)
        .map_err(|err| Error::Import(format!("{}: {:#}", path.display(), err)))?;
    log::info!(
        "loaded network {} from {}: {} buses, {} branches",
        network.name(),
        path.display(),
        network.buses().len(),
        network.branches().len()
    );
    Ok(network)
}
