//! Persistence of groups, subgroups and users

pub mod memory;

use crate::model::{Group, GroupId, SubGroup, SubGroupId, User};

pub use memory::MemoryStore;

/// Errors raised by a [`Store`]
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No group with this id
    #[error("group {0} does not exist")]
    UnknownGroup(GroupId),

    /// No subgroup with this id in the group
    #[error("subgroup {subgroup} does not exist in group {group}")]
    UnknownSubGroup {
        /// Group searched
        group: GroupId,
        /// Missing subgroup id
        subgroup: SubGroupId,
    },

    /// No user with this id
    #[error("user {0} does not exist")]
    UnknownUser(String),

    /// A user with this id already exists
    #[error("user {0} already exists")]
    DuplicateUser(String),

    /// A subgroup with this id already exists in the group
    #[error("subgroup {subgroup} already exists in group {group}")]
    DuplicateSubGroup {
        /// Owning group
        group: GroupId,
        /// Clashing subgroup id
        subgroup: SubGroupId,
    },

    /// A user references a subgroup without a group
    #[error("user {0} has a subgroup but no group")]
    SubGroupWithoutGroup(String),
}

/// Record storage used by the placement and registration flows.
///
/// Implementations use interior mutability so one store can be shared
/// between concurrent requests.
pub trait Store: Send + Sync {
    /// Fetch the group with the given name, creating it if missing.
    /// The flag is true when the group was created by this call.
    fn get_or_create_group(&self, name: &str) -> Result<(Group, bool), StoreError>;

    /// Fetch a group by id
    fn group(&self, id: GroupId) -> Result<Group, StoreError>;

    /// All groups, by ascending id
    fn groups(&self) -> Result<Vec<Group>, StoreError>;

    /// Create a subgroup with an explicit id
    fn create_subgroup(
        &self,
        group: GroupId,
        id: SubGroupId,
        name: &str,
    ) -> Result<SubGroup, StoreError>;

    /// Fetch one subgroup
    fn subgroup(&self, group: GroupId, id: SubGroupId) -> Result<SubGroup, StoreError>;

    /// Subgroups of a group, by ascending id
    fn subgroups_of(&self, group: GroupId) -> Result<Vec<SubGroup>, StoreError>;

    /// Users currently in a subgroup
    fn members_of(&self, group: GroupId, subgroup: SubGroupId) -> Result<Vec<User>, StoreError>;

    /// Insert a new user
    fn create_user(&self, user: &User) -> Result<(), StoreError>;

    /// Overwrite an existing user
    fn update_user(&self, user: &User) -> Result<(), StoreError>;

    /// Remove a user, returning the removed record
    fn delete_user(&self, user_id: &str) -> Result<User, StoreError>;

    /// Fetch a user by id
    fn user(&self, user_id: &str) -> Result<User, StoreError>;

    /// Whether a user id is taken
    fn user_exists(&self, user_id: &str) -> Result<bool, StoreError>;
}
