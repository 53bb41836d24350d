//! Instance inspector tests

use std::fs;
use std::path::Path;

use deployctl::deploy::inspector::inspect;
use deployctl::models::instance::StartupTemplate;

use crate::support::st_cmd;

fn write(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

#[tokio::test]
async fn test_inspect_release_tree() {
    let root = tempfile::tempdir().unwrap();
    write(root.path(), "iocBoot/sioc-b34-mp01/st.cmd", &st_cmd("linuxRT-x86_64", "alpha"));
    write(root.path(), "iocBoot/dev1/st.cmd", &st_cmd("linux-x86_64", "alpha"));
    write(root.path(), "sub/iocBoot/ioc-b34-bp01/st.cmd", &st_cmd("RTEMS-beatnik", "alpha"));

    let entries = inspect(root.path()).await.unwrap();
    let found: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(found, vec!["dev1", "ioc-b34-bp01", "sioc-b34-mp01"]);

    let dev1 = &entries[0];
    assert_eq!(dev1.architecture, "linux-x86_64");
    assert_eq!(dev1.binary, "alpha");
    assert_eq!(dev1.startup_template, StartupTemplate::SoftPeripheral);
    assert_eq!(dev1.startup_template.template_name("F2"), "soft-peripheral-f2");

    assert_eq!(entries[1].startup_template, StartupTemplate::Rtems);
    assert_eq!(entries[2].startup_template, StartupTemplate::LinuxRtIoc);
}

#[tokio::test]
async fn test_inspect_skips_missing_descriptor() {
    let root = tempfile::tempdir().unwrap();
    fs::create_dir_all(root.path().join("iocBoot/empty")).unwrap();
    write(root.path(), "iocBoot/dev1/st.cmd", &st_cmd("linux-x86_64", "alpha"));

    let entries = inspect(root.path()).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].name, "dev1");
}

#[tokio::test]
async fn test_inspect_excludes_bad_interpreter_line() {
    let root = tempfile::tempdir().unwrap();
    write(root.path(), "iocBoot/bad/st.cmd", "epicsEnvSet(\"A\", \"B\")\n");
    write(root.path(), "iocBoot/short/st.cmd", "#!../../bin/alpha\n");
    write(root.path(), "iocBoot/dev1/st.cmd", &st_cmd("linux-x86_64", "alpha"));

    let entries = inspect(root.path()).await.unwrap();
    let found: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(found, vec!["dev1"]);
}

#[tokio::test]
async fn test_inspect_ignores_files_outside_boot_dirs() {
    let root = tempfile::tempdir().unwrap();
    write(root.path(), "db/dev1/st.cmd", &st_cmd("linux-x86_64", "alpha"));

    assert!(inspect(root.path()).await.unwrap().is_empty());
}
