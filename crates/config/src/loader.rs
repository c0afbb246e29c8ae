use std::{fs, path::Path};

use crate::{Config, error::Error};

pub(crate) fn load<P: AsRef<Path>>(path: P) -> crate::Result<Config> {
    let path = path.as_ref();

    let contents = fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(toml::from_str(&contents)?)
}
