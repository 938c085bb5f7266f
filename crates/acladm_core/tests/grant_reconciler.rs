mod common;

use acladm_core::{
    AclEntry, AclError, GrantOutcome, GrantReconciler, GrantState, MappingStore, MemoryStore, NewMapping,
};
use common::{MemoryAccessor, DOMAIN};
use std::path::Path;

const BASE: &str = "A::OWNER@:rwaDxtTnNcCoy\nA:g:GROUP@:rwaDxtncCy\nA::EVERYONE@:tncy\n";

#[test]
fn add_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let accessor = MemoryAccessor::new();
    accessor.preload(dir.path(), BASE);
    let store = MemoryStore::default();
    let reconciler = GrantReconciler::new(&accessor, &store, DOMAIN);

    assert!(reconciler.should_add("amy", dir.path()).unwrap());
    assert_eq!(reconciler.add_grant("amy", dir.path()).unwrap(), GrantOutcome::Applied);
    assert_eq!(reconciler.add_grant("amy", dir.path()).unwrap(), GrantOutcome::Skipped);

    let acl = accessor.acl_of(dir.path());
    assert_eq!(acl.matches("A::amy@example.org:rx").count(), 1);
    assert!(acl.starts_with(BASE));
    assert_eq!(reconciler.probe("amy", dir.path()), GrantState::Present);
}

#[test]
fn missing_path_is_never_modified() {
    let accessor = MemoryAccessor::new();
    let store = MemoryStore::default();
    let reconciler = GrantReconciler::new(&accessor, &store, DOMAIN);
    let missing = Path::new("/no/such/acladm/dataset");

    assert!(!reconciler.can_modify(missing));
    assert!(!reconciler.should_add("amy", missing).unwrap());
    assert_eq!(reconciler.add_grant("amy", missing).unwrap(), GrantOutcome::Skipped);
    assert_eq!(accessor.writes.get(), 0);
}

#[test]
fn unmodifiable_path_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let accessor = MemoryAccessor::new();
    let store = MemoryStore::default();
    let reconciler = GrantReconciler::new(&accessor, &store, DOMAIN).with_modify_check(|_| false);

    assert_eq!(reconciler.add_grant("amy", dir.path()).unwrap(), GrantOutcome::Skipped);
    assert_eq!(accessor.writes.get(), 0);
}

#[test]
fn failed_probe_is_not_treated_as_absent() {
    let dir = tempfile::tempdir().unwrap();
    let accessor = MemoryAccessor::new();
    accessor.fail_reads_on(dir.path());
    let store = MemoryStore::default();
    let reconciler = GrantReconciler::new(&accessor, &store, DOMAIN);

    assert!(matches!(reconciler.probe("amy", dir.path()), GrantState::ProbeFailed(_)));
    let err = reconciler.add_grant("amy", dir.path()).unwrap_err();
    assert!(matches!(err, AclError::ToolExecutionFailure { .. }));
    assert_eq!(accessor.writes.get(), 0);
}

#[test]
fn add_failure_propagates() {
    let dir = tempfile::tempdir().unwrap();
    let accessor = MemoryAccessor::new();
    accessor.fail_writes_on(dir.path());
    let store = MemoryStore::default();
    let reconciler = GrantReconciler::new(&accessor, &store, DOMAIN);

    let err = reconciler.add_grant("amy", dir.path()).unwrap_err();
    assert!(err.to_string().contains("Operation not permitted"));
}

#[test]
fn remove_only_touches_the_one_entry() {
    let dir = tempfile::tempdir().unwrap();
    let accessor = MemoryAccessor::new();
    accessor.preload(
        dir.path(),
        &format!("A::amy@example.org:rx\nA::bob@example.org:rx\n{BASE}"),
    );
    let mut store = MemoryStore::default();
    store.insert(NewMapping::new("amy", "/apps/viz", dir.path())).unwrap();
    let reconciler = GrantReconciler::new(&accessor, &store, DOMAIN);

    assert!(reconciler.should_remove("amy", dir.path()).unwrap());
    assert_eq!(reconciler.remove_grant("amy", dir.path()).unwrap(), GrantOutcome::Applied);
    assert_eq!(
        accessor.acl_of(dir.path()),
        format!("A::bob@example.org:rx\n{BASE}")
    );
}

#[test]
fn shared_grant_survives_until_last_reference() {
    let dataset = tempfile::tempdir().unwrap();
    let accessor = MemoryAccessor::new();
    let entry = AclEntry::read_execute_grant("amy", DOMAIN);
    accessor.preload(dataset.path(), &format!("{entry}\n{BASE}"));

    let mut store = MemoryStore::default();
    let first = store.insert(NewMapping::new("amy", "/apps/viz", dataset.path())).unwrap();
    store.insert(NewMapping::new("amy", "/apps/stats", dataset.path())).unwrap();

    {
        let reconciler = GrantReconciler::new(&accessor, &store, DOMAIN);
        assert!(!reconciler.should_remove("amy", dataset.path()).unwrap());
        assert_eq!(reconciler.remove_grant("amy", dataset.path()).unwrap(), GrantOutcome::Skipped);
    }
    store.delete(first.id).unwrap();

    let reconciler = GrantReconciler::new(&accessor, &store, DOMAIN);
    assert!(reconciler.should_remove("amy", dataset.path()).unwrap());
    reconciler.remove_grant("amy", dataset.path()).unwrap();
    assert_eq!(reconciler.probe("amy", dataset.path()), GrantState::Absent);
}

#[test]
fn remove_without_grant_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let accessor = MemoryAccessor::new();
    accessor.preload(dir.path(), BASE);
    let store = MemoryStore::default();
    let reconciler = GrantReconciler::new(&accessor, &store, DOMAIN);

    assert!(!reconciler.should_remove("amy", dir.path()).unwrap());
    assert_eq!(reconciler.remove_grant("amy", dir.path()).unwrap(), GrantOutcome::Skipped);
}

#[test]
fn user_with_at_sign_is_added_once_and_removed() {
    let dir = tempfile::tempdir().unwrap();
    let accessor = MemoryAccessor::new();
    accessor.preload(dir.path(), BASE);
    let mut store = MemoryStore::default();
    store.insert(NewMapping::new("amy@lab", "/apps/viz", dir.path())).unwrap();
    let reconciler = GrantReconciler::new(&accessor, &store, DOMAIN);

    assert_eq!(reconciler.add_grant("amy@lab", dir.path()).unwrap(), GrantOutcome::Applied);
    assert_eq!(reconciler.add_grant("amy@lab", dir.path()).unwrap(), GrantOutcome::Skipped);
    assert_eq!(accessor.acl_of(dir.path()).matches("A::amy@lab@example.org:rx").count(), 1);

    assert_eq!(reconciler.remove_grant("amy@lab", dir.path()).unwrap(), GrantOutcome::Applied);
    assert_eq!(accessor.acl_of(dir.path()), BASE);
}
