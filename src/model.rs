//! Persistent records: groups, subgroups and users

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Serialize, Deserialize};

use crate::cluster::ClusterId;

/// Identifier of a group
pub type GroupId = u32;

/// Identifier of a subgroup, unique within its group
pub type SubGroupId = u32;

/// A community group, one per assigned cluster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    /// Unique identifier
    pub id: GroupId,

    /// Unique display name
    pub name: String,

    /// Creation time
    pub created_at: DateTime<Utc>,
}

impl Group {
    /// Natural key of the group backing a cluster
    pub fn name_for_cluster(cluster: ClusterId) -> String {
        format!("Group-{}", cluster)
    }
}

/// A small, size-bounded circle of users inside a group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubGroup {
    /// Owning group
    pub group_id: GroupId,

    /// Identifier within the group
    pub id: SubGroupId,

    /// Display name
    pub name: String,

    /// Event the subgroup is attending, if any
    pub event: Option<String>,

    /// Creation time
    pub created_at: DateTime<Utc>,
}

/// A registered user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Public identifier
    pub user_id: String,
    pub name: String,
    pub dob: NaiveDate,
    pub gender: String,
    pub city: String,
    pub occupation: String,

    /// Spending budget
    pub budget: f64,

    /// Age in whole years
    pub age: u32,

    /// Age bucket label, see [`age_range`]
    pub age_range: String,

    /// Declared interest names
    #[serde(default)]
    pub interests: Vec<String>,

    /// Group the user belongs to
    pub group: Option<GroupId>,

    /// Subgroup within `group`
    pub subgroup: Option<SubGroupId>,
}

/// Profile submitted when registering a new user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub dob: NaiveDate,
    #[serde(default)]
    pub gender: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub occupation: String,
    pub budget: f64,
    #[serde(default)]
    pub interests: Vec<String>,
}

impl NewUser {
    /// Turn the profile into an ungrouped user record
    pub fn into_user(self, user_id: String, today: NaiveDate) -> User {
        let age = age_from_dob(self.dob, today);
        User {
            user_id,
            name: self.name,
            dob: self.dob,
            gender: self.gender,
            city: self.city,
            occupation: self.occupation,
            budget: self.budget,
            age,
            age_range: age_range(age).to_string(),
            interests: self.interests,
            group: None,
            subgroup: None,
        }
    }
}

/// Age in whole years on `today`
pub fn age_from_dob(dob: NaiveDate, today: NaiveDate) -> u32 {
    let mut years = today.year() - dob.year();
    if (today.month(), today.day()) < (dob.month(), dob.day()) {
        years -= 1;
    }
    years.max(0) as u32
}

/// Age bucket label
pub fn age_range(age: u32) -> &'static str {
    match age {
        0..=17 => "Under 18",
        18..=25 => "18-25",
        26..=35 => "26-35",
        36..=45 => "36-45",
        46..=55 => "46-55",
        56..=65 => "56-65",
        _ => "66+",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn age_counts_completed_years() {
        let dob = date(1990, 6, 15);
        assert_eq!(age_from_dob(dob, date(2024, 6, 14)), 33);
        assert_eq!(age_from_dob(dob, date(2024, 6, 15)), 34);
        assert_eq!(age_from_dob(dob, date(1990, 1, 1)), 0);
    }

    #[test]
    fn age_buckets() {
        assert_eq!(age_range(17), "Under 18");
        assert_eq!(age_range(18), "18-25");
        assert_eq!(age_range(35), "26-35");
        assert_eq!(age_range(46), "46-55");
        assert_eq!(age_range(65), "56-65");
        assert_eq!(age_range(66), "66+");
    }

    #[test]
    fn profile_becomes_ungrouped_user() {
        let profile = NewUser {
            name: "Ada".into(),
            dob: date(2000, 2, 29),
            gender: "F".into(),
            city: "Pune".into(),
            occupation: "Engineer".into(),
            budget: 1500.0,
            interests: vec!["Chess".into()],
        };

        let user = profile.into_user("M1234".into(), date(2025, 2, 28));
        assert_eq!(user.age, 24);
        assert_eq!(user.age_range, "18-25");
        assert_eq!(user.group, None);
        assert_eq!(user.subgroup, None);
    }
}
