use crate::{
    config::Config,
    model::descriptor::{ConnectionDescriptor, DescriptorId},
    utils::storage::Storage,
};
use anyhow::{bail, Result};
use std::cell::{Cell, RefCell};

#[derive(Debug, Default)]
pub struct MockStorage {
    descriptors: RefCell<Vec<ConnectionDescriptor>>,
    failing: Cell<bool>,
    pub config: Config,
}

impl MockStorage {
    pub fn with_descriptors(descriptors: Vec<ConnectionDescriptor>) -> Self {
        Self {
            descriptors: RefCell::new(descriptors),
            ..Default::default()
        }
    }

    /// What a later session would load.
    pub fn stored(&self) -> Vec<ConnectionDescriptor> {
        self.descriptors.borrow().clone()
    }

    pub fn fail_writes(&self, failing: bool) {
        self.failing.set(failing);
    }
}

impl Storage for MockStorage {
    fn list_descriptors(&self) -> Result<Vec<ConnectionDescriptor>> {
        Ok(self.stored())
    }

    fn persist(&self, descriptor: &ConnectionDescriptor) -> Result<()> {
        if self.failing.get() {
            bail!("disk full");
        }
        let mut descriptors = self.descriptors.borrow_mut();
        match descriptors.iter_mut().find(|d| d.id() == descriptor.id()) {
            Some(stored) => *stored = descriptor.clone(),
            None => descriptors.push(descriptor.clone()),
        }
        Ok(())
    }

    fn remove(&self, id: &DescriptorId) -> Result<()> {
        if self.failing.get() {
            bail!("disk full");
        }
        self.descriptors
            .borrow_mut()
            .retain(|descriptor| descriptor.id() != id);
        Ok(())
    }

    fn read_config(&self) -> Result<Config> {
        Ok(self.config.clone())
    }
}
