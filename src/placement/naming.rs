//! Display names for new subgroups

use rand::seq::SliceRandom;
use rand::Rng;
use crate::model::{GroupId, SubGroupId};

/// Words new subgroup names are drawn from
pub const ADJECTIVES: &[&str] = &[
    "Brave", "Bright", "Calm", "Clever", "Cosmic", "Gentle", "Golden", "Happy",
    "Lively", "Lucky", "Mellow", "Quiet", "Sunny", "Swift", "Vivid", "Witty",
];

/// Name a subgroup `<Adjective>-<group id>-<subgroup id>`
pub fn subgroup_name<R: Rng + ?Sized>(rng: &mut R, group: GroupId, subgroup: SubGroupId) -> String {
    let adjective = ADJECTIVES.choose(rng).copied().unwrap_or("Mutual");
    format!("{}-{}-{}", adjective, group, subgroup)
}
