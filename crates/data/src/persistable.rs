// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::Repository;
use anyhow::*;
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};

pub trait PersistableData: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {}
impl<T> PersistableData for T where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static
{
}

/// AutoPersist enables a repository to generate a persistable container
#[async_trait]
pub trait AutoPersist<T>
where
    T: PersistableData,
{
    /// Load the data from the repository into an auto persist container
    async fn load(&self) -> Result<Persistable<T>>;
    /// Create a new auto persist container and set some data on it to send back to the repository
    fn send(&self, data: Option<T>) -> Persistable<T>;
    /// Load the data from the repository. If nothing is persisted yet persist the given default
    async fn load_or_default(&self, default: T) -> Result<Persistable<T>>;
}

#[async_trait]
impl<T> AutoPersist<T> for Repository<T>
where
    T: PersistableData,
{
    async fn load(&self) -> Result<Persistable<T>> {
        Persistable::load(self).await
    }

    fn send(&self, data: Option<T>) -> Persistable<T> {
        Persistable::new(data, self).save()
    }

    async fn load_or_default(&self, default: T) -> Result<Persistable<T>> {
        Persistable::load_or_default(self, default).await
    }
}

/// A container that writes its content back to the repository every time it changes.
///
/// The in memory copy is authoritative for the owning actor. Writes are fire and forget so a
/// handler can mutate several containers without yielding and commit them as one batch.
#[derive(Debug)]
pub struct Persistable<T> {
    data: Option<T>,
    repo: Repository<T>,
}

impl<T> Persistable<T>
where
    T: PersistableData,
{
    pub fn new(data: Option<T>, repo: &Repository<T>) -> Self {
        Self {
            data,
            repo: repo.clone(),
        }
    }

    pub async fn load(repo: &Repository<T>) -> Result<Self> {
        let data = repo.read().await?;
        Ok(Self::new(data, repo))
    }

    pub async fn load_or_default(repo: &Repository<T>, default: T) -> Result<Self> {
        let instance = Self::new(Some(repo.read().await?.unwrap_or(default)), repo);
        Ok(instance.save())
    }

    /// Save the data in the container to the database
    pub fn save(self) -> Self {
        self.checkpoint();
        self
    }

    /// Mutate the content if it is available. Errors when the mutator fails or the data has not
    /// been set, in which case the content is left untouched.
    pub fn try_mutate<F>(&mut self, mutator: F) -> Result<()>
    where
        F: FnOnce(T) -> Result<T>,
    {
        let content = self.data.clone().ok_or(anyhow!("Data has not been set"))?;
        self.data = Some(mutator(content)?);
        self.checkpoint();
        Ok(())
    }

    /// Mutate the content in place and hand back a value computed along the way. Nothing is
    /// written unless the mutator succeeds.
    pub fn try_mutate_with<F, R>(&mut self, mutator: F) -> Result<R>
    where
        F: FnOnce(&mut T) -> Result<R>,
    {
        let mut content = self.data.clone().ok_or(anyhow!("Data has not been set"))?;
        let out = mutator(&mut content)?;
        self.data = Some(content);
        self.checkpoint();
        Ok(out)
    }

    pub fn set(&mut self, data: T) {
        self.data = Some(data);
        self.checkpoint();
    }

    pub fn clear(&mut self) {
        self.data = None;
        self.repo.clear();
    }

    pub fn get(&self) -> Option<T> {
        self.data.clone()
    }

    pub fn try_get(&self) -> Result<T> {
        self.data
            .clone()
            .ok_or(anyhow!("Data was not set on container."))
    }

    pub fn has(&self) -> bool {
        self.data.is_some()
    }

    /// Borrow the content. Errors when the data is not set.
    pub fn try_with<F, U>(&self, f: F) -> Result<U>
    where
        F: FnOnce(&T) -> Result<U>,
    {
        match &self.data {
            Some(data) => f(data),
            None => Err(anyhow!("Data was not set on container.")),
        }
    }

    fn checkpoint(&self) {
        if let Some(ref data) = self.data {
            self.repo.write(data);
        }
    }
}
