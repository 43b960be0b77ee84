//! # Profile Store Module
//!
//! Owns the durable collection of named profiles and the `current`
//! selection, and keeps what is pushed to the wheel consistent with it.
//! Activation is delegated to the [`ParameterChannel`].
//!
//! ## Persistence
//! Every successful mutation rewrites the whole document exactly once.
//! Rejected operations neither mutate nor write. A failed write is logged
//! and the in-memory store carries on, so memory and disk may diverge until
//! the next successful write.

use anyhow::{anyhow, Result};
use log::{error, info, warn};
use std::path::{Path, PathBuf};

use crate::channel::ParameterChannel;
use crate::error::PaddockError;
use crate::parameter::ParameterValues;
use crate::persist;
use crate::profile::{Profile, ProfileDocument, DEFAULT_PROFILE_NAME};

#[derive(Debug)]
pub struct ProfileStore {
    path: PathBuf,
    document: ProfileDocument,
}

impl ProfileStore {
    /// Loads the store at `path` and activates the current profile.
    ///
    /// - No document: the default store is created, written and activated.
    /// - Invalid document: the default store is used in memory and the file
    ///   is left untouched.
    pub fn open(path: impl Into<PathBuf>, channel: &mut ParameterChannel) -> Self {
        let path = path.into();
        let store = if !path.exists() {
            info!("[STORE] No profiles at {}, creating defaults", path.display());
            let store = Self {
                path,
                document: ProfileDocument::default(),
            };
            store.persist();
            store
        } else {
            let document = match Self::read(&path) {
                Ok(document) => document,
                Err(e) => {
                    warn!("[STORE] Ignoring stored profiles: {:#}", e);
                    ProfileDocument::default()
                }
            };
            Self { path, document }
        };

        store.activate_current(channel);
        store
    }

    /// Reads and validates the document at `path` without activating it.
    pub fn read(path: &Path) -> Result<ProfileDocument> {
        let document: ProfileDocument = persist::read_json(path)?;
        document
            .validate()
            .map_err(|reason| anyhow!("invalid profile document: {}", reason))?;
        Ok(document)
    }

    /// Writes the whole document to disk.
    pub fn save(&self) -> Result<()> {
        persist::write_json(&self.document, &self.path)
    }

    fn persist(&self) {
        if let Err(e) = self.save() {
            error!("[STORE] Failed to save profiles: {:#}", e);
        }
    }

    fn activate_current(&self, channel: &mut ParameterChannel) {
        match self.current_profile() {
            Some(profile) => channel.apply_profile(profile),
            None => warn!("[STORE] Current profile \"{}\" not found", self.document.current),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn document(&self) -> &ProfileDocument {
        &self.document
    }

    pub fn current_name(&self) -> &str {
        &self.document.current
    }

    pub fn current_profile(&self) -> Option<&Profile> {
        self.document.find(&self.document.current)
    }

    pub fn profile_names(&self) -> Vec<String> {
        self.document.names()
    }

    /// Makes `name` current, pushes all of its values and persists.
    pub fn select_profile(
        &mut self,
        name: &str,
        channel: &mut ParameterChannel,
    ) -> Result<(), PaddockError> {
        if !self.document.contains(name) {
            return Err(PaddockError::ProfileNotFound(name.to_string()));
        }
        self.document.current = name.to_string();
        info!("[STORE] Selected profile \"{}\"", name);
        self.activate_current(channel);
        self.persist();
        Ok(())
    }

    /// Appends a copy of `baseline` named `name`, selects and activates it.
    pub fn create_profile(
        &mut self,
        name: &str,
        baseline: &ParameterValues,
        channel: &mut ParameterChannel,
    ) -> Result<(), PaddockError> {
        if self.document.contains(name) {
            return Err(PaddockError::DuplicateProfileName(name.to_string()));
        }
        self.document.profiles.push(Profile::new(name, baseline.clamped()));
        self.document.current = name.to_string();
        info!("[STORE] Created profile \"{}\"", name);
        self.activate_current(channel);
        self.persist();
        Ok(())
    }

    /// Overwrites the current profile's values and persists.
    ///
    /// Values are held to their catalog ranges so the document always
    /// reloads. Nothing is pushed: the values are assumed to be live already.
    pub fn update_current_profile(&mut self, values: &ParameterValues) {
        let current = self.document.current.clone();
        match self.document.find_mut(&current) {
            Some(profile) => {
                profile.values = values.clamped();
                info!("[STORE] Saved profile \"{}\"", current);
                self.persist();
            }
            None => warn!("[STORE] Current profile \"{}\" not found", current),
        }
    }

    /// Removes the current profile, falls back to "Default" and activates it.
    ///
    /// The "Default" profile itself is protected.
    pub fn delete_current_profile(
        &mut self,
        channel: &mut ParameterChannel,
    ) -> Result<(), PaddockError> {
        let current = self.document.current.clone();
        if current == DEFAULT_PROFILE_NAME {
            return Err(PaddockError::DefaultProfileProtected);
        }
        let before = self.document.profiles.len();
        self.document.profiles.retain(|p| p.name != current);
        if self.document.profiles.len() == before {
            return Err(PaddockError::ProfileNotFound(current));
        }
        self.document.current = DEFAULT_PROFILE_NAME.to_string();
        info!("[STORE] Deleted profile \"{}\"", current);
        self.activate_current(channel);
        self.persist();
        Ok(())
    }
}
