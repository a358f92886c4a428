//! Subgroup placement within an assigned group

pub mod naming;

use std::sync::{Arc, Mutex, PoisonError};

use dashmap::DashMap;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Serialize, Deserialize};

use crate::model::{Group, GroupId, SubGroup, User};
use crate::storage::{Store, StoreError};

/// Compatibility limits for sharing a subgroup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacementRules {
    /// Maximum members per subgroup
    pub max_members: usize,

    /// Largest allowed age difference to any member
    pub max_age_gap: u32,

    /// Largest allowed budget difference to any member
    pub max_budget_gap: f64,
}

impl Default for PlacementRules {
    fn default() -> Self {
        Self {
            max_members: 5,
            max_age_gap: 5,
            max_budget_gap: 500.0,
        }
    }
}

impl PlacementRules {
    /// Whether `user` may share a subgroup with `member`
    pub fn compatible(&self, user: &User, member: &User) -> bool {
        user.age.abs_diff(member.age) <= self.max_age_gap
            && (user.budget - member.budget).abs() <= self.max_budget_gap
    }
}

/// First-fit placement of users into subgroups.
///
/// Placements into the same group are serialized, so the member limit
/// and subgroup id uniqueness hold under concurrent use.
#[derive(Debug)]
pub struct SubgroupPlacer {
    rules: PlacementRules,
    group_locks: DashMap<GroupId, Arc<Mutex<()>>>,
    rng: Mutex<StdRng>,
}

impl SubgroupPlacer {
    /// Create a placer with entropy-seeded naming
    pub fn new(rules: PlacementRules) -> Self {
        Self::with_rng(rules, StdRng::from_entropy())
    }

    /// Create a placer with reproducible naming
    pub fn seeded(rules: PlacementRules, seed: u64) -> Self {
        Self::with_rng(rules, StdRng::seed_from_u64(seed))
    }

    fn with_rng(rules: PlacementRules, rng: StdRng) -> Self {
        Self {
            rules,
            group_locks: DashMap::new(),
            rng: Mutex::new(rng),
        }
    }

    /// Rules in effect
    pub fn rules(&self) -> &PlacementRules {
        &self.rules
    }

    /// Place `user` into the first compatible subgroup of `group`, or a new one.
    ///
    /// Subgroups are scanned by ascending id; a subgroup fits when it has room
    /// and the user is compatible with every current member. The user's own
    /// record is not counted against itself. When nothing fits a subgroup with
    /// the next free id is created. The user must already be stored; `user`
    /// is only updated once the store has accepted the new membership.
    pub fn place_user<S: Store + ?Sized>(
        &self,
        store: &S,
        user: &mut User,
        group: &Group,
    ) -> Result<SubGroup, StoreError> {
        let lock = self.group_locks.entry(group.id).or_default().value().clone();
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        // Fail before touching any subgroup
        store.user(&user.user_id)?;

        let subgroups = store.subgroups_of(group.id)?;

        let mut chosen = None;
        for subgroup in &subgroups {
            let members: Vec<User> = store.members_of(group.id, subgroup.id)?
                .into_iter()
                .filter(|member| member.user_id != user.user_id)
                .collect();

            if members.len() >= self.rules.max_members {
                log::debug!("Subgroup {}/{} is full", group.id, subgroup.id);
                continue;
            }

            if members.iter().all(|member| self.rules.compatible(user, member)) {
                chosen = Some(subgroup.clone());
                break;
            }
        }

        let subgroup = match chosen {
            Some(subgroup) => subgroup,
            None => {
                let next_id = subgroups.iter().map(|s| s.id).max().unwrap_or(0) + 1;
                let name = {
                    let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
                    naming::subgroup_name(&mut *rng, group.id, next_id)
                };
                log::info!("Creating subgroup {} ({}) in group {}", next_id, name, group.name);
                store.create_subgroup(group.id, next_id, &name)?
            }
        };

        let mut placed = user.clone();
        placed.group = Some(group.id);
        placed.subgroup = Some(subgroup.id);
        store.update_user(&placed)?;
        *user = placed;

        log::debug!("Placed {} in subgroup {}/{}", user.user_id, group.id, subgroup.id);
        Ok(subgroup)
    }
}
