use anyhow::{anyhow, Context, Result};
use std::{
    fmt::Debug,
    fs, io,
    path::{Path, PathBuf},
};

use crate::{
    config::Config,
    model::descriptor::{ConnectionDescriptor, DescriptorId},
};

const APP_DIR_NAME: &str = "connsync";
const CONNECTIONS_FILE_NAME: &str = "connections.json";
const CONFIG_FILE_NAME: &str = "config.toml";

// NOTE: stole this from `gitui`
pub fn get_app_config_path() -> Result<PathBuf> {
    let mut path = if cfg!(target_os = "macos") {
        dirs::home_dir().map(|h| h.join(".config"))
    } else {
        dirs::config_dir()
    }
    .ok_or_else(|| anyhow!("failed to find os config dir."))?;

    path.push(APP_DIR_NAME);
    fs::create_dir_all(&path)?;
    Ok(path)
}

pub fn get_app_data_path() -> Result<PathBuf> {
    let mut path = if cfg!(target_os = "macos") {
        dirs::home_dir().map(|h| h.join(".local").join("share"))
    } else {
        dirs::data_local_dir()
    }
    .ok_or_else(|| anyhow!("failed to find os local data dir."))?;

    path.push(APP_DIR_NAME);
    fs::create_dir_all(&path)?;
    Ok(path)
}

/// Where descriptors live. Records come back exactly as stored; migrating
/// legacy fields is up to the caller.
pub trait Storage: Debug {
    fn list_descriptors(&self) -> Result<Vec<ConnectionDescriptor>>;

    fn find_by_id(&self, id: &DescriptorId) -> Result<Option<ConnectionDescriptor>> {
        Ok(self
            .list_descriptors()?
            .into_iter()
            .find(|descriptor| descriptor.id() == id))
    }

    /// Inserts the descriptor, or replaces the stored one with the same id.
    fn persist(&self, descriptor: &ConnectionDescriptor) -> Result<()>;

    fn remove(&self, id: &DescriptorId) -> Result<()>;

    fn read_config(&self) -> Result<Config>;
}

#[derive(Debug, Clone, Default)]
pub struct FileStorage {
    data_dir: PathBuf,
    config_dir: PathBuf,
}

impl Storage for FileStorage {
    fn list_descriptors(&self) -> Result<Vec<ConnectionDescriptor>> {
        let file = match self.read_from_data_dir(CONNECTIONS_FILE_NAME.into()) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(vec![]),
            Err(err) => return Err(err).context("Error while reading `connections.json`"),
        };
        serde_json::from_str(&file).context("Error while parsing `connections.json`")
    }

    fn persist(&self, descriptor: &ConnectionDescriptor) -> Result<()> {
        let mut descriptors = self.list_descriptors()?;

        match descriptors.iter_mut().find(|d| d.id() == descriptor.id()) {
            Some(stored) => *stored = descriptor.clone(),
            None => descriptors.push(descriptor.clone()),
        }

        self.write_descriptors(&descriptors)
    }

    fn remove(&self, id: &DescriptorId) -> Result<()> {
        let mut descriptors = self.list_descriptors()?;
        descriptors.retain(|descriptor| descriptor.id() != id);
        self.write_descriptors(&descriptors)
    }

    fn read_config(&self) -> Result<Config> {
        let config_path = Path::new(&self.config_dir).join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            fs::write(
                &config_path,
                include_str!("../../assets/default-config.toml"),
            )?;
        }

        let file = self.read_from_config_dir(CONFIG_FILE_NAME.into())?;
        Config::read_from_string(&file).context("Error while parsing `config.toml`")
    }
}

impl FileStorage {
    /// # Errors
    /// If the OS config or data directories cannot be found or created.
    pub fn init() -> Result<Self> {
        Ok(Self {
            data_dir: get_app_data_path()?,
            config_dir: get_app_config_path()?,
        })
    }

    #[must_use]
    pub const fn at(data_dir: PathBuf, config_dir: PathBuf) -> Self {
        Self {
            data_dir,
            config_dir,
        }
    }

    fn write_descriptors(&self, descriptors: &[ConnectionDescriptor]) -> Result<()> {
        self.write_to_data_dir(
            CONNECTIONS_FILE_NAME.into(),
            &serde_json::to_string_pretty(descriptors)?,
        )
    }

    fn read_from_config_dir(&self, path_from_config_dir: PathBuf) -> io::Result<String> {
        let file_path = Path::new(&self.config_dir).join(path_from_config_dir);
        fs::read_to_string(file_path)
    }

    fn read_from_data_dir(&self, path_from_data_dir: PathBuf) -> io::Result<String> {
        let file_path = Path::new(&self.data_dir).join(path_from_data_dir);
        fs::read_to_string(file_path)
    }

    fn write_to_data_dir(&self, path_from_data_dir: PathBuf, data: &str) -> Result<()> {
        let file_path = Path::new(&self.data_dir).join(path_from_data_dir);
        fs::write(file_path, data)?;
        Ok(())
    }
}
