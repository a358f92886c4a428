use std::fs::{self, File};
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, SystemTime};

use chrono::NaiveDate;
use serde_json::json;

use mutuals_matcher::cluster::{ClusterAssignment, UNASSIGNED_TAG};
use mutuals_matcher::config::Config;
use mutuals_matcher::data::{self, Artifacts, GRAPH_SNAPSHOT};
use mutuals_matcher::model::{Group, GroupId, NewUser, SubGroup, SubGroupId, User};
use mutuals_matcher::placement::{PlacementRules, SubgroupPlacer};
use mutuals_matcher::service::{MatchService, ServiceError};
use mutuals_matcher::storage::{MemoryStore, Store, StoreError};

fn write_artifacts(dir: &Path) {
    let graph = json!({
        "nodes": [{"id": "Opera", "bipartite": 1}],
        "edges": [
            ["U1", "Cooking"], ["U1", "Movies"], ["U1", "Travel"],
            ["U2", "Cooking"],
            ["U3", "Hiking"], ["U3", "Cycling"],
            ["U4", "Hiking"],
        ]
    });
    let partition = json!({"U1": 0, "U2": 0, "U3": 1, "U4": 1});
    let tags = json!({"0": "Foodies", "1": "Outdoors"});

    fs::write(dir.join(data::GRAPH_JSON), graph.to_string()).unwrap();
    fs::write(dir.join(data::PARTITION_JSON), partition.to_string()).unwrap();
    fs::write(dir.join(data::TAGS_JSON), tags.to_string()).unwrap();
}

fn profile(name: &str, dob: (i32, u32, u32), budget: f64, interests: &[&str]) -> NewUser {
    NewUser {
        name: name.to_string(),
        dob: NaiveDate::from_ymd_opt(dob.0, dob.1, dob.2).unwrap(),
        gender: "X".to_string(),
        city: "Lisbon".to_string(),
        occupation: "Tester".to_string(),
        budget,
        interests: interests.iter().map(|s| s.to_string()).collect(),
    }
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
}

fn service(dir: &Path, config: Config) -> MatchService<MemoryStore> {
    let artifacts = Artifacts::load(dir).unwrap();
    MatchService::new(&config, artifacts, MemoryStore::new())
}

fn seeded() -> Config {
    Config { seed: Some(11), ..Config::default() }
}

#[test]
fn artifacts_load_from_json_and_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    write_artifacts(dir.path());

    let artifacts = Artifacts::load(dir.path()).unwrap();
    assert_eq!(artifacts.graph().edge_count(), 7);
    assert_eq!(artifacts.cluster_of("U3"), Some(1));
    assert_eq!(artifacts.tag_for(0), "Foodies");

    artifacts.save_snapshot(&dir.path().join(GRAPH_SNAPSHOT)).unwrap();
    let reloaded = Artifacts::load(dir.path()).unwrap();
    assert_eq!(reloaded.graph().node_ids, artifacts.graph().node_ids);
    assert_eq!(reloaded.graph().edges, artifacts.graph().edges);
}

#[test]
fn stale_snapshot_gives_way_to_newer_json() {
    let dir = tempfile::tempdir().unwrap();
    write_artifacts(dir.path());

    let snapshot = dir.path().join(GRAPH_SNAPSHOT);
    Artifacts::load(dir.path()).unwrap().save_snapshot(&snapshot).unwrap();
    File::options()
        .write(true)
        .open(&snapshot)
        .unwrap()
        .set_modified(SystemTime::now() - Duration::from_secs(3600))
        .unwrap();

    let graph = json!({"edges": [["U1", "Cooking"], ["U5", "Chess"]]});
    fs::write(dir.path().join(data::GRAPH_JSON), graph.to_string()).unwrap();

    let artifacts = Artifacts::load(dir.path()).unwrap();
    assert_eq!(artifacts.graph().edge_count(), 2);
    assert!(artifacts.graph().contains("Chess"));
}

#[test]
fn missing_graph_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let err = Artifacts::load(dir.path()).unwrap_err();
    assert!(err.downcast_ref::<data::ArtifactError>().is_some());
}

#[test]
fn registration_creates_group_and_first_subgroup() {
    let dir = tempfile::tempdir().unwrap();
    write_artifacts(dir.path());
    let service = service(dir.path(), seeded());

    let registration = service
        .register_user(profile("Ana", (1993, 3, 10), 1000.0, &["Hiking", "Cycling"]), today())
        .unwrap();

    assert_eq!(registration.assignment.cluster, Some(1));
    assert_eq!(registration.assignment.tag, "Outdoors");

    let group = registration.group.clone().unwrap();
    assert_eq!(group.name, "Group-1");

    let subgroup = registration.subgroup.clone().unwrap();
    assert_eq!(subgroup.id, 1);

    let user = &registration.user;
    assert!(user.user_id.starts_with('M') && user.user_id.len() == 5);
    assert_eq!(user.age, 32);
    assert_eq!(user.age_range, "26-35");
    assert_eq!(user.group, Some(group.id));
    assert_eq!(user.subgroup, Some(1));
    assert_eq!(service.store().user(&user.user_id).unwrap(), *user);
}

#[test]
fn same_cluster_shares_the_group() {
    let dir = tempfile::tempdir().unwrap();
    write_artifacts(dir.path());
    let service = service(dir.path(), seeded());

    let first = service
        .register_user(profile("Ana", (1993, 3, 10), 1000.0, &["Cooking"]), today())
        .unwrap();
    let second = service
        .register_user(profile("Ben", (1991, 8, 2), 1200.0, &["Movies", "Cooking"]), today())
        .unwrap();
    let far = service
        .register_user(profile("Cy", (1960, 1, 1), 5000.0, &["Travel"]), today())
        .unwrap();

    let group = first.group.unwrap();
    assert_eq!(second.group.as_ref(), Some(&group));
    assert_eq!(far.group.as_ref(), Some(&group));

    assert_eq!(second.subgroup.unwrap().id, 1);
    assert_eq!(far.subgroup.unwrap().id, 2);
    assert_eq!(service.store().groups().unwrap().len(), 1);

    let detail = service.user_detail(&first.user.user_id).unwrap();
    assert_eq!(detail.group.unwrap().name, "Group-0");
    assert_eq!(detail.subgroup.unwrap().id, 1);
    let mates: Vec<&str> = detail.subgroup_members.iter().map(|u| u.name.as_str()).collect();
    assert_eq!(mates, vec!["Ben"]);
}

#[test]
fn unclassified_users_stay_ungrouped_without_fallback() {
    let dir = tempfile::tempdir().unwrap();
    write_artifacts(dir.path());
    let service = service(dir.path(), seeded());

    let registration = service
        .register_user(profile("Dee", (2000, 1, 1), 800.0, &["Opera", "Knitting"]), today())
        .unwrap();

    assert_eq!(registration.assignment, ClusterAssignment::unassigned());
    assert_eq!(registration.assignment.tag, UNASSIGNED_TAG);
    assert!(registration.group.is_none());
    assert!(registration.subgroup.is_none());

    let detail = service.user_detail(&registration.user.user_id).unwrap();
    assert!(detail.group.is_none());
    assert!(detail.subgroup_members.is_empty());
}

#[test]
fn unclassified_users_use_the_fallback_group() {
    let dir = tempfile::tempdir().unwrap();
    write_artifacts(dir.path());
    let config = Config { fallback_group: Some("Newcomers".to_string()), ..seeded() };
    let service = service(dir.path(), config);

    let registration = service
        .register_user(profile("Dee", (2000, 1, 1), 800.0, &[]), today())
        .unwrap();

    assert_eq!(registration.assignment.cluster, None);
    assert_eq!(registration.group.unwrap().name, "Newcomers");
    assert_eq!(registration.subgroup.unwrap().id, 1);
}

/// Store whose subgroup creation always fails
struct NoNewSubgroups(MemoryStore);

impl Store for NoNewSubgroups {
    fn get_or_create_group(&self, name: &str) -> Result<(Group, bool), StoreError> {
        self.0.get_or_create_group(name)
    }

    fn group(&self, id: GroupId) -> Result<Group, StoreError> {
        self.0.group(id)
    }

    fn groups(&self) -> Result<Vec<Group>, StoreError> {
        self.0.groups()
    }

    fn create_subgroup(&self, group: GroupId, id: SubGroupId, _: &str) -> Result<SubGroup, StoreError> {
        Err(StoreError::DuplicateSubGroup { group, subgroup: id })
    }

    fn subgroup(&self, group: GroupId, id: SubGroupId) -> Result<SubGroup, StoreError> {
        self.0.subgroup(group, id)
    }

    fn subgroups_of(&self, group: GroupId) -> Result<Vec<SubGroup>, StoreError> {
        self.0.subgroups_of(group)
    }

    fn members_of(&self, group: GroupId, subgroup: SubGroupId) -> Result<Vec<User>, StoreError> {
        self.0.members_of(group, subgroup)
    }

    fn create_user(&self, user: &User) -> Result<(), StoreError> {
        self.0.create_user(user)
    }

    fn update_user(&self, user: &User) -> Result<(), StoreError> {
        self.0.update_user(user)
    }

    fn delete_user(&self, user_id: &str) -> Result<User, StoreError> {
        self.0.delete_user(user_id)
    }

    fn user(&self, user_id: &str) -> Result<User, StoreError> {
        self.0.user(user_id)
    }

    fn user_exists(&self, user_id: &str) -> Result<bool, StoreError> {
        self.0.user_exists(user_id)
    }
}

#[test]
fn failed_placement_leaves_no_user_behind() {
    let dir = tempfile::tempdir().unwrap();
    write_artifacts(dir.path());
    let artifacts = Artifacts::load(dir.path()).unwrap();
    let service = MatchService::new(&seeded(), artifacts, NoNewSubgroups(MemoryStore::new()));

    let err = service
        .register_user(profile("Ana", (1993, 3, 10), 1000.0, &["Hiking"]), today())
        .unwrap_err();
    assert!(matches!(err, ServiceError::Store(StoreError::DuplicateSubGroup { .. })));

    let group = &service.store().groups().unwrap()[0];
    assert!(service.store().subgroups_of(group.id).unwrap().is_empty());

    let leftovers: Vec<User> = (1000..=9999)
        .map(|n| format!("M{n}"))
        .filter_map(|id| service.store().user(&id).ok())
        .collect();
    assert!(leftovers.is_empty());
}

#[test]
fn unknown_user_detail_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    write_artifacts(dir.path());
    let service = service(dir.path(), seeded());

    let err = service.user_detail("M0000").unwrap_err();
    assert!(matches!(err, ServiceError::Store(StoreError::UnknownUser(_))));
}

#[test]
fn reload_swaps_artifacts_for_later_requests() {
    let dir = tempfile::tempdir().unwrap();
    write_artifacts(dir.path());
    let service = service(dir.path(), seeded());

    let before = service.artifacts().current();
    assert_eq!(service.assign("N1", &["Hiking"]).unwrap().cluster, Some(1));

    fs::write(
        dir.path().join(data::PARTITION_JSON),
        json!({"U1": 0, "U2": 0, "U3": 7, "U4": 7}).to_string(),
    ).unwrap();
    service.artifacts().reload(dir.path()).unwrap();

    assert_eq!(service.assign("N1", &["Hiking"]).unwrap().cluster, Some(7));
    assert_eq!(before.cluster_of("U3"), Some(1));
}

fn member(id: usize) -> User {
    User {
        user_id: format!("T{id}"),
        name: format!("T{id}"),
        dob: NaiveDate::from_ymd_opt(1990, 1, 1).unwrap(),
        gender: String::new(),
        city: String::new(),
        occupation: String::new(),
        budget: 1000.0 + (id % 3) as f64 * 100.0,
        age: 30 + (id % 4) as u32,
        age_range: "26-35".to_string(),
        interests: Vec::new(),
        group: None,
        subgroup: None,
    }
}

#[test]
fn concurrent_placements_respect_capacity() {
    let store = Arc::new(MemoryStore::new());
    let placer = Arc::new(SubgroupPlacer::seeded(PlacementRules::default(), 3));
    let (group, _) = store.get_or_create_group("Group-0").unwrap();

    thread::scope(|scope| {
        for worker in 0..8 {
            let store = Arc::clone(&store);
            let placer = Arc::clone(&placer);
            let group = group.clone();
            scope.spawn(move || {
                for i in 0..5 {
                    let mut user = member(worker * 5 + i);
                    store.create_user(&user).unwrap();
                    placer.place_user(store.as_ref(), &mut user, &group).unwrap();
                }
            });
        }
    });

    let subgroups = store.subgroups_of(group.id).unwrap();
    let ids: Vec<u32> = subgroups.iter().map(|s| s.id).collect();
    let expected: Vec<u32> = (1..=subgroups.len() as u32).collect();
    assert_eq!(ids, expected);

    let mut placed = 0;
    for subgroup in &subgroups {
        let members = store.members_of(group.id, subgroup.id).unwrap();
        assert!(members.len() <= 5);
        placed += members.len();
    }
    assert_eq!(placed, 40);
    assert_eq!(subgroups.len(), 8);
}
