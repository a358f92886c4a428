//! Registration flow: cluster assignment followed by subgroup placement

use std::sync::{Mutex, PoisonError};

use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::cluster::{assign_cluster, AssignError, ClusterAssignment};
use crate::config::Config;
use crate::data::{ArtifactHandle, Artifacts};
use crate::model::{Group, NewUser, SubGroup, User};
use crate::placement::SubgroupPlacer;
use crate::storage::{Store, StoreError};

/// How many random ids are tried before giving up
pub const MAX_ID_ATTEMPTS: usize = 64;

/// Errors raised by the registration flow
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Cluster assignment failed
    #[error(transparent)]
    Assign(#[from] AssignError),

    /// The record store rejected an operation
    #[error(transparent)]
    Store(#[from] StoreError),

    /// No unused user id was found
    #[error("no free user id after {0} attempts")]
    IdSpaceExhausted(usize),
}

/// Outcome of registering a user
#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    /// Stored user record, including group and subgroup ids
    pub user: User,

    /// Cluster the user was assigned to
    pub assignment: ClusterAssignment,

    /// Group joined, `None` when unassigned without a fallback group
    pub group: Option<Group>,

    /// Subgroup joined inside `group`
    pub subgroup: Option<SubGroup>,
}

/// A user together with the people they were matched with
#[derive(Debug, Clone, Serialize)]
pub struct UserDetail {
    /// Stored user record
    pub user: User,

    /// Group the user belongs to
    pub group: Option<Group>,

    /// Subgroup the user belongs to
    pub subgroup: Option<SubGroup>,

    /// Other members of the user's subgroup
    pub subgroup_members: Vec<User>,
}

/// Ties the static artifacts, the record store and the placer together
pub struct MatchService<S> {
    artifacts: ArtifactHandle,
    store: S,
    placer: SubgroupPlacer,
    top_n: usize,
    fallback_group: Option<String>,
    id_rng: Mutex<StdRng>,
}

impl<S: Store> MatchService<S> {
    /// Build a service from loaded artifacts and a store
    pub fn new(config: &Config, artifacts: Artifacts, store: S) -> Self {
        let rules = config.placement_rules();
        let (placer, id_rng) = match config.seed {
            Some(seed) => (
                SubgroupPlacer::seeded(rules, seed),
                StdRng::seed_from_u64(seed.wrapping_add(1)),
            ),
            None => (SubgroupPlacer::new(rules), StdRng::from_entropy()),
        };

        Self {
            artifacts: ArtifactHandle::new(artifacts),
            store,
            placer,
            top_n: config.top_n,
            fallback_group: config.fallback_group.clone(),
            id_rng: Mutex::new(id_rng),
        }
    }

    /// Handle to the artifacts, for reloading
    pub fn artifacts(&self) -> &ArtifactHandle {
        &self.artifacts
    }

    /// The record store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The subgroup placer
    pub fn placer(&self) -> &SubgroupPlacer {
        &self.placer
    }

    /// Assign a candidate to a cluster against the current artifacts
    pub fn assign<T: AsRef<str>>(
        &self,
        candidate_id: &str,
        interests: &[T],
    ) -> Result<ClusterAssignment, ServiceError> {
        let artifacts = self.artifacts.current();
        Ok(assign_cluster(&artifacts, candidate_id, interests, self.top_n)?)
    }

    /// Register a new user: pick a fresh id, assign a cluster, then place
    /// the user into a subgroup of the cluster's group.
    ///
    /// Unassigned users go to the fallback group when one is configured and
    /// stay ungrouped otherwise. When placement fails the user record is
    /// removed again, so a failed registration leaves no user behind.
    pub fn register_user(
        &self,
        profile: NewUser,
        today: NaiveDate,
    ) -> Result<Registration, ServiceError> {
        let artifacts = self.artifacts.current();
        let user_id = self.generate_user_id(&artifacts)?;

        let assignment = assign_cluster(&artifacts, &user_id, &profile.interests, self.top_n)?;
        log::info!("Assigned {} to cluster {:?} ({})", user_id, assignment.cluster, assignment.tag);

        let group_name = match assignment.cluster {
            Some(cluster) => Some(Group::name_for_cluster(cluster)),
            None => self.fallback_group.clone(),
        };

        let group = match group_name {
            Some(name) => {
                let (group, created) = self.store.get_or_create_group(&name)?;
                if created {
                    log::info!("Created group {} ({})", group.id, group.name);
                }
                Some(group)
            }
            None => None,
        };

        let mut user = profile.into_user(user_id, today);
        self.store.create_user(&user)?;

        let subgroup = match &group {
            Some(group) => match self.placer.place_user(&self.store, &mut user, group) {
                Ok(subgroup) => Some(subgroup),
                Err(err) => {
                    // Registration is all or nothing
                    log::warn!("Placing {} failed, removing the record: {}", user.user_id, err);
                    if let Err(cleanup) = self.store.delete_user(&user.user_id) {
                        log::error!("Could not remove {}: {}", user.user_id, cleanup);
                    }
                    return Err(err.into());
                }
            },
            None => {
                log::warn!("{} could not be classified and stays ungrouped", user.user_id);
                None
            }
        };

        Ok(Registration { user, assignment, group, subgroup })
    }

    /// Look up a user with their group, subgroup and subgroup mates
    pub fn user_detail(&self, user_id: &str) -> Result<UserDetail, ServiceError> {
        let user = self.store.user(user_id)?;

        let group = user.group.map(|id| self.store.group(id)).transpose()?;

        let (subgroup, subgroup_members) = match (user.group, user.subgroup) {
            (Some(group_id), Some(subgroup_id)) => {
                let subgroup = self.store.subgroup(group_id, subgroup_id)?;
                let members = self.store.members_of(group_id, subgroup_id)?
                    .into_iter()
                    .filter(|member| member.user_id != user.user_id)
                    .collect();
                (Some(subgroup), members)
            }
            _ => (None, Vec::new()),
        };

        Ok(UserDetail { user, group, subgroup, subgroup_members })
    }

    /// Draw `M<4 digits>` ids until one is unused by both the store and the graph
    fn generate_user_id(&self, artifacts: &Artifacts) -> Result<String, ServiceError> {
        let mut rng = self.id_rng.lock().unwrap_or_else(PoisonError::into_inner);

        for _ in 0..MAX_ID_ATTEMPTS {
            let candidate = format!("M{}", rng.gen_range(1000..=9999));
            if !artifacts.graph().contains(&candidate) && !self.store.user_exists(&candidate)? {
                return Ok(candidate);
            }
        }

        Err(ServiceError::IdSpaceExhausted(MAX_ID_ATTEMPTS))
    }
}
