mod common;

use autonet::abi::TypeKind;
use autonet::error::SessionError;
use autonet::session::Stage;

use common::*;

#[test]
fn populate_registers_every_exported_type() {
    let (_dir, session) = standard_session();
    let registry = session.registry();
    assert_eq!(registry.len(), 4);
    assert_eq!(registry.get("queries::EventFilterQuery").unwrap().kind(), TypeKind::Class);
    assert_eq!(registry.get("queries::TeeTimeSlot").unwrap().kind(), TypeKind::Struct);
    assert_eq!(registry.get("queries::Gender").unwrap().kind(), TypeKind::Enum);
    assert_eq!(session.resident_libraries(), 3);
    assert!(session.active().is_none());
}

#[test]
fn descriptors_remember_their_origin() {
    let (dir, session) = standard_session();
    let descriptor = session.registry().get("queries::TeeTimeSlot").unwrap();
    assert_eq!(descriptor.origin().path(), dir.path().join("tee_times.rs"));
    assert_eq!(descriptor.artifact_path(), descriptor.origin().artifact_path());
    assert_eq!(descriptor.name(), "TeeTimeSlot");
}

#[test]
fn failing_units_do_not_block_the_others() {
    let dir = source_folder(&["broken", "events", "no_manifest", "tee_times"]);
    let loader = InProcessLoader::new()
        .with_unit("events", event_unit)
        .with_unit("tee_times", tee_unit);
    let mut session = session_in(dir.path(), FakeBackend::failing(&["broken"]), loader);

    let report = session.populate(false).unwrap();
    assert_eq!(report.units, 4);
    assert_eq!(report.built, 3);
    assert_eq!(report.loaded, 2);
    assert_eq!(report.failures.len(), 2);
    assert_eq!(report.failures[0].stage, Stage::Build);
    assert_eq!(report.failures[0].unit.stem(), "broken");
    assert_eq!(report.failures[1].stage, Stage::Load);
    assert_eq!(report.failures[1].unit.stem(), "no_manifest");

    assert!(session.registry().contains("queries::EventFilterQuery"));
    assert!(session.registry().contains("queries::TeeTimeSlot"));

    let broken = autonet::source::SourceUnit::new(dir.path().join("broken.rs"));
    let report_text = std::fs::read_to_string(broken.error_report_path()).unwrap();
    assert!(report_text.contains("  ≡ broken.rs:1:1: error: expected item"));
    assert!(!broken.artifact_path().exists());
}

#[test]
fn first_loaded_type_wins() {
    let dir = source_folder(&["a_events", "b_shadow"]);
    let loader = InProcessLoader::new()
        .with_unit("a_events", event_unit)
        .with_unit("b_shadow", shadow_unit);
    let mut session = session_in(dir.path(), FakeBackend::default(), loader);

    let report = session.populate(false).unwrap();
    assert_eq!(report.types_skipped, 1);
    let descriptor = session.registry().get("queries::EventFilterQuery").unwrap();
    assert_eq!(descriptor.origin().stem(), "a_events");
    assert!(descriptor.handle().declared_property("Shadow").is_none());
}

#[test]
fn existing_artifacts_are_not_rebuilt() {
    let dir = source_folder(&["events", "tee_times"]);
    let loader = InProcessLoader::new()
        .with_unit("events", event_unit)
        .with_unit("tee_times", tee_unit);
    let mut session = session_in(dir.path(), FakeBackend::default(), loader);

    session.populate(false).unwrap();
    assert_eq!(session.compiler().backend().calls(), vec!["events", "tee_times"]);

    let report = session.populate(true).unwrap();
    assert_eq!(report.built, 2);
    assert_eq!(session.compiler().backend().calls().len(), 2);
    assert_eq!(session.loader().loads().len(), 4);
    assert_eq!(session.registry().len(), 3);
}

#[test]
fn populate_without_purge_keeps_registered_types() {
    let (_dir, mut session) = standard_session();
    let report = session.populate(false).unwrap();
    assert_eq!(report.types_added, 0);
    assert_eq!(report.types_skipped, 4);
    assert_eq!(session.registry().len(), 4);
}

#[test]
fn select_miss_leaves_state_untouched() {
    let (_dir, mut session) = standard_session();
    session.select("queries::TeeTimeSlot").unwrap();

    let err = session.select("queries::Nope").unwrap_err();
    assert!(matches!(err, SessionError::Lookup(ref name) if name == "queries::Nope"));
    assert_eq!(session.active_type_name(), Some("TeeTimeSlot"));
}

#[test]
fn select_hit_installs_instance_of_that_type() {
    let (_dir, mut session) = standard_session();
    let context = session.select("queries::EventFilterQuery").unwrap();
    assert_eq!(context.descriptor().full_name(), "queries::EventFilterQuery");
    assert_eq!(
        context.instance().type_handle().full_name(),
        "queries::EventFilterQuery"
    );
    assert_eq!(session.active_type_name(), Some("EventFilterQuery"));
    assert!(session.active_instance().is_some());
}

#[test]
fn activation_failure_keeps_previous_context() {
    let (_dir, mut session) = standard_session();
    session.select("queries::EventFilterQuery").unwrap();

    let err = session.select("queries::Refusing").unwrap_err();
    assert!(matches!(err, SessionError::Activation(_)));
    assert_eq!(session.active_type_name(), Some("EventFilterQuery"));
}

#[test]
fn activation_failure_without_context_stays_empty() {
    let (_dir, mut session) = standard_session();
    assert!(session.select("queries::Refusing").is_err());
    assert!(session.active().is_none());
    assert!(session.active_type_name().is_none());
}

#[test]
fn reset_empties_registry_and_context() {
    let (_dir, mut session) = standard_session();
    session.select("queries::TeeTimeSlot").unwrap();

    session.reset();
    assert!(session.registry().is_empty());
    assert!(session.active().is_none());
    assert!(matches!(
        session.select("queries::TeeTimeSlot"),
        Err(SessionError::Lookup(_))
    ));
    // Libraries stay mapped for the life of the process.
    assert_eq!(session.resident_libraries(), 3);

    session.populate(false).unwrap();
    assert!(session.select("queries::TeeTimeSlot").is_ok());
}

#[test]
fn refresh_with_purge_drops_the_active_instance() {
    let (_dir, mut session) = standard_session();
    session.select("queries::TeeTimeSlot").unwrap();
    session.populate(true).unwrap();
    assert!(session.active().is_none());
    assert_eq!(session.registry().len(), 4);
}

#[test]
fn repeated_refreshes_hold_each_library_once() {
    let (_dir, mut session) = standard_session();
    for purge_first in [false, true, false, true] {
        session.populate(purge_first).unwrap();
    }
    assert_eq!(session.loader().loads().len(), 15);
    assert_eq!(session.resident_libraries(), 3);
}

#[test]
fn cancelled_population_stops_between_units() {
    let dir = source_folder(&["events", "tee_times"]);
    let loader = InProcessLoader::new()
        .with_unit("events", event_unit)
        .with_unit("tee_times", tee_unit);
    let mut session = session_in(dir.path(), FakeBackend::default(), loader);

    session.cancellation_token().cancel();
    let report = session.populate(false).unwrap();
    assert!(report.cancelled);
    assert_eq!(report.built, 0);
    assert!(session.registry().is_empty());

    // The next pass gets a fresh token.
    let report = session.populate(false).unwrap();
    assert!(!report.cancelled);
    assert_eq!(session.registry().len(), 3);
}

#[test]
fn missing_source_folder_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("Sources");
    let mut session = session_in(&missing, FakeBackend::default(), InProcessLoader::new());
    assert!(matches!(
        session.populate(false),
        Err(SessionError::SourceFolder { .. })
    ));
}
