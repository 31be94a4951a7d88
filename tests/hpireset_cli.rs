use std::path::Path;
use std::process::{Command, Output};

const DOMAIN: &str = r#"
update_count = 5

[[resource]]
id = 1
tag = "Chassis"
capabilities = ["reset", "control", "rdr"]

[[resource.rdr]]
type = "control"
id_string = "Chassis Reset"
num = 1
control_type = "digital"
"#;

fn hpireset(dir: &Path, args: &[&str]) -> Output {
    let config = dir.join("config.toml");
    std::fs::write(&config, "").expect("write config");

    Command::new(env!("CARGO_BIN_EXE_hpireset"))
        .arg("-c")
        .arg(&config)
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("run hpireset")
}

fn write_domain(dir: &Path, text: &str) -> String {
    let path = dir.join("domain.toml");
    std::fs::write(&path, text).expect("write domain");
    path.to_string_lossy().into_owned()
}

#[test]
fn default_action_is_hard_reset() {
    let dir = tempfile::tempdir().unwrap();
    let domain = write_domain(dir.path(), DOMAIN);

    let output = hpireset(dir.path(), &["--domain", &domain]);
    assert_eq!(output.status.code(), Some(0));

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("UpdateCount = 5"), "{stdout}");
    assert!(stdout.contains("Chassis Reset): hard reset requested"), "{stdout}");
}

#[test]
fn power_down_flag() {
    let dir = tempfile::tempdir().unwrap();
    let domain = write_domain(dir.path(), DOMAIN);

    let output = hpireset(dir.path(), &["-d", "--domain", &domain]);
    assert_eq!(output.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&output.stdout).contains("power down requested"));
}

#[test]
fn unknown_flag_exits_with_one() {
    let dir = tempfile::tempdir().unwrap();
    let output = hpireset(dir.path(), &["-q"]);

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Usage"), "{stderr}");
    assert!(stderr.contains("-d  powers Down the system"), "{stderr}");
}

#[cfg(unix)]
#[test]
fn session_failures_exit_with_minus_one() {
    let dir = tempfile::tempdir().unwrap();

    // No domain configured at all.
    let output = hpireset(dir.path(), &[]);
    assert_eq!(output.status.code(), Some(255));

    let domain = write_domain(dir.path(), "fail_on_open = true\n");
    let output = hpireset(dir.path(), &["--domain", &domain]);
    assert_eq!(output.status.code(), Some(255));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Failed to open management session"));

    let domain = write_domain(dir.path(), "fail_on_discover = true\n");
    let output = hpireset(dir.path(), &["--domain", &domain]);
    assert_eq!(output.status.code(), Some(255));
}

#[test]
fn resource_without_records_does_not_hide_the_reset_control() {
    let dir = tempfile::tempdir().unwrap();
    // The management controller comes first and claims records it does not have.
    let bmc = "[[resource]]\nid = 4\ntag = \"BMC\"\ncapabilities = [\"rdr\"]\n";
    let text = DOMAIN.replacen("[[resource]]", &format!("{bmc}\n[[resource]]"), 1);
    let domain = write_domain(dir.path(), &text);

    let output = hpireset(dir.path(), &["--domain", &domain]);
    assert_eq!(output.status.code(), Some(0));

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Resource 4 records skipped"), "{stdout}");
    assert!(stdout.contains("Chassis Reset): hard reset requested"), "{stdout}");
    assert!(!stdout.contains("Resource walk stopped"), "{stdout}");
}

#[test]
fn rejected_control_set_stops_the_walk() {
    let dir = tempfile::tempdir().unwrap();
    let text = format!("{DOMAIN}fail_set = true\n");
    let domain = write_domain(dir.path(), &text);

    let output = hpireset(dir.path(), &["--domain", &domain]);
    assert_eq!(output.status.code(), Some(0));

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("control rejected the request"), "{stdout}");
    assert!(stdout.contains("Resource walk stopped"), "{stdout}");
}

#[test]
fn control_number_zero_exits_with_one() {
    let dir = tempfile::tempdir().unwrap();
    let domain = write_domain(dir.path(), DOMAIN);

    let output = hpireset(dir.path(), &["-n", "0", "--domain", &domain]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Invalid argument"));
}

#[test]
fn empty_domain_still_completes() {
    let dir = tempfile::tempdir().unwrap();
    let domain = write_domain(dir.path(), "update_count = 1\n");

    let output = hpireset(dir.path(), &["--domain", &domain]);
    assert_eq!(output.status.code(), Some(0));

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("No reset control found in 0 resources"), "{stdout}");
    assert!(stdout.contains("Resource walk stopped"), "{stdout}");
}
