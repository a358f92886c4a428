//! In-memory store with JSON snapshots

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, Write};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Serialize, Deserialize};
use serde_json::to_string_pretty;

use crate::model::{Group, GroupId, SubGroup, SubGroupId, User};
use crate::storage::{Store, StoreError};

/// Everything the store holds; also the snapshot file layout
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreState {
    next_group_id: GroupId,
    groups: BTreeMap<GroupId, Group>,
    subgroups: BTreeMap<GroupId, BTreeMap<SubGroupId, SubGroup>>,
    users: BTreeMap<String, User>,
}

impl StoreState {
    fn check_membership(&self, user: &User) -> Result<(), StoreError> {
        match (user.group, user.subgroup) {
            (None, Some(_)) => Err(StoreError::SubGroupWithoutGroup(user.user_id.clone())),
            (Some(group), None) => {
                if !self.groups.contains_key(&group) {
                    return Err(StoreError::UnknownGroup(group));
                }
                Ok(())
            }
            (Some(group), Some(subgroup)) => {
                let exists = self.subgroups.get(&group)
                    .map_or(false, |subgroups| subgroups.contains_key(&subgroup));
                if !exists {
                    return Err(StoreError::UnknownSubGroup { group, subgroup });
                }
                Ok(())
            }
            (None, None) => Ok(()),
        }
    }
}

/// Store keeping all records in memory behind a mutex
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<StoreState>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a store from a JSON snapshot
    pub fn load(path: &Path) -> Result<Self> {
        log::info!("Loading store snapshot: {}", path.display());

        let file = File::open(path)
            .with_context(|| format!("opening {}", path.display()))?;
        let state: StoreState = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("parsing {}", path.display()))?;

        Ok(Self { state: Mutex::new(state) })
    }

    /// Load a snapshot if it exists, otherwise start empty
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            log::info!("No store snapshot at {}, starting empty", path.display());
            Ok(Self::new())
        }
    }

    /// Write the whole store as a JSON snapshot
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let state = self.state();
        let mut file = File::create(path)
            .with_context(|| format!("creating {}", path.display()))?;
        file.write_all(to_string_pretty(&*state)?.as_bytes())?;

        log::info!(
            "Saved {} groups and {} users to {}",
            state.groups.len(),
            state.users.len(),
            path.display()
        );

        Ok(())
    }

    fn state(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Store for MemoryStore {
    fn get_or_create_group(&self, name: &str) -> Result<(Group, bool), StoreError> {
        let mut state = self.state();

        if let Some(group) = state.groups.values().find(|g| g.name == name) {
            return Ok((group.clone(), false));
        }

        state.next_group_id += 1;
        let group = Group {
            id: state.next_group_id,
            name: name.to_string(),
            created_at: Utc::now(),
        };
        state.groups.insert(group.id, group.clone());
        state.subgroups.insert(group.id, BTreeMap::new());

        log::debug!("Created group {} ({})", group.id, group.name);
        Ok((group, true))
    }

    fn group(&self, id: GroupId) -> Result<Group, StoreError> {
        self.state().groups.get(&id)
            .cloned()
            .ok_or(StoreError::UnknownGroup(id))
    }

    fn groups(&self) -> Result<Vec<Group>, StoreError> {
        Ok(self.state().groups.values().cloned().collect())
    }

    fn create_subgroup(
        &self,
        group: GroupId,
        id: SubGroupId,
        name: &str,
    ) -> Result<SubGroup, StoreError> {
        let mut state = self.state();
        let subgroups = state.subgroups.get_mut(&group)
            .ok_or(StoreError::UnknownGroup(group))?;

        if subgroups.contains_key(&id) {
            return Err(StoreError::DuplicateSubGroup { group, subgroup: id });
        }

        let subgroup = SubGroup {
            group_id: group,
            id,
            name: name.to_string(),
            event: None,
            created_at: Utc::now(),
        };
        subgroups.insert(id, subgroup.clone());

        Ok(subgroup)
    }

    fn subgroup(&self, group: GroupId, id: SubGroupId) -> Result<SubGroup, StoreError> {
        let state = self.state();
        let subgroups = state.subgroups.get(&group)
            .ok_or(StoreError::UnknownGroup(group))?;

        subgroups.get(&id)
            .cloned()
            .ok_or(StoreError::UnknownSubGroup { group, subgroup: id })
    }

    fn subgroups_of(&self, group: GroupId) -> Result<Vec<SubGroup>, StoreError> {
        let state = self.state();
        let subgroups = state.subgroups.get(&group)
            .ok_or(StoreError::UnknownGroup(group))?;

        Ok(subgroups.values().cloned().collect())
    }

    fn members_of(&self, group: GroupId, subgroup: SubGroupId) -> Result<Vec<User>, StoreError> {
        let state = self.state();
        let exists = state.subgroups.get(&group)
            .ok_or(StoreError::UnknownGroup(group))?
            .contains_key(&subgroup);
        if !exists {
            return Err(StoreError::UnknownSubGroup { group, subgroup });
        }

        Ok(state.users.values()
            .filter(|u| u.group == Some(group) && u.subgroup == Some(subgroup))
            .cloned()
            .collect())
    }

    fn create_user(&self, user: &User) -> Result<(), StoreError> {
        let mut state = self.state();
        if state.users.contains_key(&user.user_id) {
            return Err(StoreError::DuplicateUser(user.user_id.clone()));
        }
        state.check_membership(user)?;

        state.users.insert(user.user_id.clone(), user.clone());
        Ok(())
    }

    fn update_user(&self, user: &User) -> Result<(), StoreError> {
        let mut state = self.state();
        if !state.users.contains_key(&user.user_id) {
            return Err(StoreError::UnknownUser(user.user_id.clone()));
        }
        state.check_membership(user)?;

        state.users.insert(user.user_id.clone(), user.clone());
        Ok(())
    }

    fn user(&self, user_id: &str) -> Result<User, StoreError> {
        self.state().users.get(user_id)
            .cloned()
            .ok_or_else(|| StoreError::UnknownUser(user_id.to_string()))
    }

    fn delete_user(&self, user_id: &str) -> Result<User, StoreError> {
        self.state()
            .users
            .remove(user_id)
            .ok_or_else(|| StoreError::UnknownUser(user_id.to_string()))
    }

    fn user_exists(&self, user_id: &str) -> Result<bool, StoreError> {
        Ok(self.state().users.contains_key(user_id))
    }
}
