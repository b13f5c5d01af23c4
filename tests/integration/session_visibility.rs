//! Writes are visible in the session that made them; other roots see them after refresh

use super::test_utils::Project;
use copick::CopickError;

#[test]
fn test_create_is_visible_without_refresh() {
    let project = Project::new();
    let root = project.open();
    assert!(root.runs().unwrap().is_empty());

    let run = root.new_run("TS_1").unwrap();
    assert_eq!(root.runs().unwrap().len(), 1);

    assert!(run.picks().unwrap().is_empty());
    run.new_picks("ribosome", "alice", "1").unwrap();
    assert_eq!(run.picks().unwrap().len(), 1);
    assert_eq!(root.get_run("TS_1").unwrap().picks().unwrap().len(), 1);
}

#[test]
fn test_other_root_sees_writes_after_refresh() {
    let project = Project::new();
    let writer = project.open();
    let reader = project.open();
    assert!(reader.runs().unwrap().is_empty());

    writer.new_run("TS_1").unwrap();
    assert!(reader.runs().unwrap().is_empty());

    reader.refresh();
    assert_eq!(reader.runs().unwrap().len(), 1);
}

#[test]
fn test_run_refresh_limits_to_subtree() {
    let project = Project::new();
    let writer = project.open();
    let reader = project.open();
    writer.new_run("TS_1").unwrap();
    reader.refresh();
    let run = reader.get_run("TS_1").unwrap();
    assert!(run.picks().unwrap().is_empty());

    writer
        .get_run("TS_1")
        .unwrap()
        .new_picks("ribosome", "alice", "1")
        .unwrap();
    writer.new_run("TS_2").unwrap();

    run.refresh();
    assert_eq!(run.picks().unwrap().len(), 1);
    assert_eq!(reader.runs().unwrap().len(), 1);
}

#[test]
fn test_duplicate_create_collides() {
    let project = Project::new();
    let root = project.open();
    let run = root.new_run("TS_1").unwrap();
    run.new_picks("ribosome", "alice", "1").unwrap();
    assert!(matches!(
        run.new_picks("ribosome", "alice", "1"),
        Err(CopickError::NameCollision(_))
    ));
    assert!(matches!(
        root.new_run("ts_1"),
        Err(CopickError::NameCollision(_))
    ));
}
