use std::process::Command;

use crate::common::{VistaFixture, assert_contains, init_test_logging};

#[test]
fn test_vmh_help_lists_subcommands() {
    init_test_logging();
    crate::test_log!("TEST START: test_vmh_help_lists_subcommands");

    let output = Command::new(env!("CARGO_BIN_EXE_vmh"))
        .arg("--help")
        .output()
        .expect("Failed to run vmh --help");

    assert!(output.status.success(), "vmh --help failed");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_contains(&stdout, "VistA maintenance helper");
    for sub in ["import", "patch-workdir", "patch-routines", "config"] {
        assert_contains(&stdout, sub);
    }

    crate::test_log!("TEST PASS: test_vmh_help_lists_subcommands");
}

#[test]
fn test_config_reports_env_sources() {
    init_test_logging();
    crate::test_log!("TEST START: test_config_reports_env_sources");

    let fixture = VistaFixture::new();
    let out = fixture.run(&["config"]);

    assert!(out.success(), "vmh config failed: {}", out.stderr);
    assert_contains(&out.stdout, "Config file: (none)");
    assert_contains(
        &out.stdout,
        &format!("{}  [env (VMH_ENV_FILE)]", fixture.env_file.display()),
    );
    assert_contains(&out.stdout, "import.routine");
    assert_contains(&out.stdout, "prdimport  [default]");

    crate::test_log!("TEST PASS: test_config_reports_env_sources");
}

#[test]
fn test_config_json_includes_file_values() {
    init_test_logging();
    crate::test_log!("TEST START: test_config_json_includes_file_values");

    let fixture = VistaFixture::new();
    let config_path = fixture.write(
        "vmh.toml",
        "[import]\nroutine = \"myimport\"\nbatch_timeout_secs = 30\n",
    );
    let out = fixture.run(&["--json", "--config", config_path.to_str().unwrap(), "config"]);

    assert!(out.success(), "vmh config failed: {}", out.stderr);
    let json: serde_json::Value = serde_json::from_str(&out.stdout).expect("config JSON");
    assert_eq!(json["file"], config_path.display().to_string());

    let values = json["values"].as_array().expect("values array");
    let routine = values
        .iter()
        .find(|v| v["key"] == "import.routine")
        .expect("import.routine entry");
    assert_eq!(routine["value"], "myimport");
    assert_eq!(routine["source"]["kind"], "file");

    crate::test_log!("TEST PASS: test_config_json_includes_file_values");
}

#[test]
fn test_missing_explicit_config_reports_catalog_code() {
    init_test_logging();
    crate::test_log!("TEST START: test_missing_explicit_config_reports_catalog_code");

    let fixture = VistaFixture::new();
    let missing = fixture.dir.path().join("absent.toml");
    let out = fixture.run(&["--config", missing.to_str().unwrap(), "config"]);

    assert_eq!(out.code, Some(1));
    assert_contains(&out.stderr, "VMH-E001");
    assert_contains(&out.stderr, "Remediation steps:");

    crate::test_log!("TEST PASS: test_missing_explicit_config_reports_catalog_code");
}

#[test]
fn test_invalid_env_value_is_rejected() {
    init_test_logging();
    crate::test_log!("TEST START: test_invalid_env_value_is_rejected");

    let fixture = VistaFixture::new();
    let out = fixture.run_with(
        fixture
            .command()
            .env("VMH_BATCH_TIMEOUT_SECS", "0")
            .arg("import"),
    );

    assert_eq!(out.code, Some(1));
    assert_contains(&out.stderr, "VMH-E005");
    assert_contains(&out.stderr, "VMH_BATCH_TIMEOUT_SECS");
    assert!(fixture.mumps_calls().is_empty());

    crate::test_log!("TEST PASS: test_invalid_env_value_is_rejected");
}

#[test]
fn test_out_of_range_file_timeout_is_rejected() {
    init_test_logging();
    crate::test_log!("TEST START: test_out_of_range_file_timeout_is_rejected");

    let fixture = VistaFixture::new();
    fixture.write_prd("A.PRD");
    let config_path = fixture.write(
        "vmh.toml",
        "[import]\nbatch_timeout_secs = 0\nfile_timeout_secs = 0\n",
    );

    let out = fixture.run(&["--config", config_path.to_str().unwrap(), "import"]);

    assert_eq!(out.code, Some(1));
    assert_contains(&out.stderr, "VMH-E004");
    assert_contains(&out.stderr, "import.batch_timeout_secs = 0");
    assert!(fixture.mumps_calls().is_empty());

    crate::test_log!("TEST PASS: test_out_of_range_file_timeout_is_rejected");
}
