use crate::common::{VistaFixture, assert_contains, assert_not_contains, init_test_logging};

#[test]
fn test_import_without_files_skips_installer() {
    init_test_logging();
    crate::test_log!("TEST START: test_import_without_files_skips_installer");

    let fixture = VistaFixture::new();
    fixture.write("prd-files/readme.txt", "not an exchange file\n");

    let out = fixture.run(&["import"]);

    assert!(out.success(), "import failed: {}", out.stderr);
    assert_contains(
        &out.stdout,
        &format!("No PRD files found in {}", fixture.prd_dir.display()),
    );
    assert!(fixture.mumps_calls().is_empty());

    crate::test_log!("TEST PASS: test_import_without_files_skips_installer");
}

#[test]
fn test_import_missing_directory_counts_as_empty() {
    init_test_logging();
    crate::test_log!("TEST START: test_import_missing_directory_counts_as_empty");

    let fixture = VistaFixture::new();
    let absent = fixture.dir.path().join("nowhere");
    let out = fixture.run(&["import", "--dir", absent.to_str().unwrap()]);

    assert!(out.success());
    assert_contains(&out.stdout, "No PRD files found in");

    crate::test_log!("TEST PASS: test_import_missing_directory_counts_as_empty");
}

#[cfg(unix)]
#[test]
fn test_import_batch_success() {
    init_test_logging();
    crate::test_log!("TEST START: test_import_batch_success");

    let fixture = VistaFixture::new();
    fixture.write_prd("VA-WH PAP SMEAR.PRD");
    fixture.write_prd("lowercase.prd");

    let out = fixture.run(&["import"]);

    assert!(out.success(), "import failed: {}", out.stderr);
    assert_contains(&out.stdout, "Found 2 PRD file(s):");
    assert_contains(&out.stdout, "  VA-WH PAP SMEAR.PRD (18 bytes)");
    assert_contains(&out.stdout, "STDOUT: batch install");
    assert_contains(&out.stdout, "Return code: 0");
    assert_contains(&out.stdout, "PRD import complete.");
    assert_not_contains(&out.stdout, "Trying individual files");

    let calls = fixture.mumps_calls();
    assert_eq!(
        calls,
        vec![format!(
            "D ALL^prdimport(\"{}/\")",
            fixture.prd_dir.display()
        )]
    );

    crate::test_log!("TEST PASS: test_import_batch_success");
}

#[cfg(unix)]
#[test]
fn test_import_batch_failure_falls_back_per_file() {
    init_test_logging();
    crate::test_log!("TEST START: test_import_batch_failure_falls_back_per_file");

    let fixture = VistaFixture::new();
    fixture.write_prd("A.PRD");
    fixture.write_prd("broken.PRD");

    let out = fixture.run_with(
        fixture
            .command()
            .env("FAKE_MUMPS_BATCH_EXIT", "4")
            .env("FAKE_MUMPS_BATCH_STDERR", "%GTM-E-UNDEF")
            .arg("import"),
    );

    assert!(out.success(), "per-file failures are not fatal");
    assert_contains(&out.stdout, "STDERR: %GTM-E-UNDEF");
    assert_contains(&out.stdout, "Return code: 4");
    assert_contains(
        &out.stdout,
        "Batch import may have had issues. Trying individual files...",
    );
    assert_contains(&out.stdout, "  SUCCESS: A.PRD");
    assert_contains(&out.stdout, "  WARNING: broken.PRD");
    assert_contains(&out.stderr, "VMH-E201");

    let calls = fixture.mumps_calls();
    let dir = format!("{}/", fixture.prd_dir.display());
    assert_eq!(calls.len(), 3);
    assert_eq!(calls[1], format!("D EN^prdimport(\"{dir}\",\"A.PRD\")"));
    assert_eq!(calls[2], format!("D EN^prdimport(\"{dir}\",\"broken.PRD\")"));

    crate::test_log!("TEST PASS: test_import_batch_failure_falls_back_per_file");
}

#[cfg(unix)]
#[test]
fn test_import_per_file_timeout_is_reported() {
    init_test_logging();
    crate::test_log!("TEST START: test_import_per_file_timeout_is_reported");

    let fixture = VistaFixture::new();
    fixture.write_prd("slow.PRD");

    let out = fixture.run_with(
        fixture
            .command()
            .env("FAKE_MUMPS_BATCH_EXIT", "1")
            .env("VMH_FILE_TIMEOUT_SECS", "1")
            .arg("import"),
    );

    assert!(out.success());
    assert_contains(&out.stdout, "  TIMEOUT: slow.PRD");
    assert_contains(&out.stderr, "VMH-E202");

    crate::test_log!("TEST PASS: test_import_per_file_timeout_is_reported");
}

#[cfg(unix)]
#[test]
fn test_import_missing_installer_reports_error() {
    init_test_logging();
    crate::test_log!("TEST START: test_import_missing_installer_reports_error");

    let fixture = VistaFixture::new();
    fixture.write_prd("A.PRD");
    let missing_home = fixture.dir.path().join("no-such-home");

    let out = fixture.run_with(
        fixture
            .command()
            .env("VMH_VISTA_HOME", &missing_home)
            .arg("import"),
    );

    assert!(out.success());
    assert_contains(&out.stdout, "  ERROR: A.PRD: Failed to spawn bash");
    assert_contains(&out.stderr, "VMH-E203");
    assert!(fixture.mumps_calls().is_empty());

    crate::test_log!("TEST PASS: test_import_missing_installer_reports_error");
}

#[test]
fn test_import_dry_run_lists_commands() {
    init_test_logging();
    crate::test_log!("TEST START: test_import_dry_run_lists_commands");

    let fixture = VistaFixture::new();
    fixture.write_prd("A.PRD");

    let out = fixture.run(&["import", "--dry-run"]);

    assert!(out.success());
    assert_contains(&out.stdout, "Dry run, commands not executed:");
    assert_contains(&out.stdout, "D ALL^prdimport(");
    assert_contains(&out.stdout, "D EN^prdimport(");
    assert!(fixture.mumps_calls().is_empty());

    crate::test_log!("TEST PASS: test_import_dry_run_lists_commands");
}

#[test]
fn test_import_json_report() {
    init_test_logging();
    crate::test_log!("TEST START: test_import_json_report");

    let fixture = VistaFixture::new();
    fixture.write_prd("A.PRD");

    let out = fixture.run(&["--json", "import", "--dry-run"]);

    assert!(out.success());
    let json: serde_json::Value = serde_json::from_str(&out.stdout).expect("report JSON");
    assert_eq!(json["files"][0]["name"], "A.PRD");
    assert_eq!(json["dry_run"], true);
    assert_eq!(json["planned"].as_array().unwrap().len(), 2);

    crate::test_log!("TEST PASS: test_import_json_report");
}
