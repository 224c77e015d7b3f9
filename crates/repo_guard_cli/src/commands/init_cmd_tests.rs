use super::*;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_init_writes_loadable_default_plan() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let target = temp_dir.path().join("repo-guard.toml");
    let args = InitArgs {
        path: Some(target.clone()),
        force: false,
    };

    let written = execute(&args).unwrap();

    assert_eq!(written, target);
    assert_eq!(PlanFile::load(&target).unwrap(), PlanFile::default());
}

#[test]
fn test_init_refuses_to_overwrite_without_force() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let target = temp_dir.path().join("repo-guard.toml");
    fs::write(&target, "# hand edited").unwrap();
    let args = InitArgs {
        path: Some(target.clone()),
        force: false,
    };

    let result = execute(&args);

    assert!(matches!(result, Err(Error::InvalidArguments(_))));
    assert_eq!(fs::read_to_string(&target).unwrap(), "# hand edited");
}

#[test]
fn test_init_overwrites_with_force() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let target = temp_dir.path().join("repo-guard.toml");
    fs::write(&target, "# hand edited").unwrap();
    let args = InitArgs {
        path: Some(target.clone()),
        force: true,
    };

    execute(&args).unwrap();

    assert!(fs::read_to_string(&target)
        .unwrap()
        .contains("branch_name = \"main\""));
}
