//! Integration tests for the unpyc CLI.
//!
//! The decompiler engine is faked with small shell scripts so the tests
//! exercise the real dispatch, path remapping, and summary plumbing without
//! needing an actual decompiler installed.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

#[test]
fn cli_help() {
    let mut cmd = Command::cargo_bin("unpyc").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Batch Python bytecode decompilation front end",
        ));
}

#[test]
fn cli_version() {
    let mut cmd = Command::cargo_bin("unpyc").unwrap();
    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("unpyc"));
}

#[test]
fn empty_input_set_is_a_usage_error() {
    let mut cmd = Command::cargo_bin("unpyc").unwrap();
    cmd.assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("No files given"));
}

#[test]
fn unknown_flags_keep_the_legacy_exit_status() {
    let mut cmd = Command::cargo_bin("unpyc").unwrap();
    cmd.arg("--definitely-not-a-flag")
        .arg("x.pyc")
        .assert()
        .failure()
        .code(255);
}

#[test]
fn unresolvable_engine_exits_with_setup_code() {
    let mut cmd = Command::cargo_bin("unpyc").unwrap();
    cmd.arg("--engine")
        .arg("no-such-decompiler-xyzzy")
        .arg("x.pyc")
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("cannot resolve decompiler engine"));
}

#[cfg(unix)]
mod with_fake_engine {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};

    /// Drop a shell script into `dir` that stands in for the engine. The
    /// input path is always the engine's last argument.
    fn fake_engine(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(
            &path,
            format!("#!/bin/sh\nfor last in \"$@\"; do :; done\n{body}\n"),
        )
        .unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn okay_engine(dir: &Path) -> PathBuf {
        fake_engine(dir, "okay.sh", "echo \"decompiled $last\"")
    }

    /// Fails for inputs with `bad` in the name, succeeds otherwise.
    fn flaky_engine(dir: &Path) -> PathBuf {
        fake_engine(
            dir,
            "flaky.sh",
            "case \"$last\" in *bad*) echo \"cannot decompile $last\" >&2; exit 1;; esac\n\
             echo \"decompiled $last\"",
        )
    }

    /// Reports a verify mismatch (exit 2) for inputs with `sus` in the name.
    fn verify_engine(dir: &Path) -> PathBuf {
        fake_engine(
            dir,
            "verify.sh",
            "echo \"decompiled $last\"\ncase \"$last\" in *sus*) exit 2;; esac",
        )
    }

    #[test]
    fn batch_preserves_subdirectory_structure_under_the_output_base() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("in/classes")).unwrap();
        fs::create_dir_all(dir.path().join("in/cmds")).unwrap();
        fs::write(dir.path().join("in/classes/a.pyc"), b"\x00").unwrap();
        fs::write(dir.path().join("in/cmds/b.pyc"), b"\x00").unwrap();
        let out = dir.path().join("out");
        fs::create_dir(&out).unwrap();

        let mut cmd = Command::cargo_bin("unpyc").unwrap();
        cmd.arg("--engine")
            .arg(okay_engine(dir.path()))
            .arg("-o")
            .arg(&out)
            .arg("-p")
            .arg("2")
            .arg(dir.path().join("in/classes/a.pyc"))
            .arg(dir.path().join("in/cmds/b.pyc"))
            .assert()
            .success()
            .stdout(predicate::str::contains(
                "# decompiled 2 files: 2 okay, 0 failed, 0 verify failed",
            ));

        // The common prefix `<tmp>/in/c` is cut back to `<tmp>/in/`, so the
        // sibling directories both survive the remapping.
        assert!(out.join("classes/a.pyc_dis").exists());
        assert!(out.join("cmds/b.pyc_dis").exists());
    }

    #[test]
    fn failed_files_are_counted_and_leave_diagnostics() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("good.pyc"), b"\x00").unwrap();
        fs::write(dir.path().join("bad.pyc"), b"\x00").unwrap();
        let out = dir.path().join("out");
        fs::create_dir(&out).unwrap();

        let mut cmd = Command::cargo_bin("unpyc").unwrap();
        cmd.arg("--engine")
            .arg(flaky_engine(dir.path()))
            .arg("-o")
            .arg(&out)
            .arg(dir.path().join("good.pyc"))
            .arg(dir.path().join("bad.pyc"))
            .assert()
            .success()
            .stdout(predicate::str::contains(
                "# decompiled 2 files: 1 okay, 1 failed, 0 verify failed",
            ));

        assert!(out.join("good.pyc_dis").exists());
        let diagnostics = fs::read_to_string(out.join("bad.pyc_dis_failed")).unwrap();
        assert!(diagnostics.contains("cannot decompile"));
    }

    #[test]
    fn serial_mode_surfaces_a_verify_mismatch_loudly() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("sus.pyc"), b"\x00").unwrap();
        let out = dir.path().join("out");
        fs::create_dir(&out).unwrap();

        let mut cmd = Command::cargo_bin("unpyc").unwrap();
        cmd.arg("--engine")
            .arg(verify_engine(dir.path()))
            .arg("--verify")
            .arg("-o")
            .arg(&out)
            .arg(dir.path().join("sus.pyc"))
            .assert()
            .failure()
            .code(1)
            .stderr(predicate::str::contains("verification failed"));

        // The unverified product is still written before the run aborts.
        assert!(out.join("sus.pyc_dis_unverified").exists());
    }

    #[test]
    fn parallel_mode_counts_verify_mismatches_instead_of_aborting() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("ok.pyc"), b"\x00").unwrap();
        fs::write(dir.path().join("sus.pyc"), b"\x00").unwrap();
        let out = dir.path().join("out");
        fs::create_dir(&out).unwrap();

        let mut cmd = Command::cargo_bin("unpyc").unwrap();
        cmd.arg("--engine")
            .arg(verify_engine(dir.path()))
            .arg("--verify")
            .arg("-p")
            .arg("2")
            .arg("-o")
            .arg(&out)
            .arg(dir.path().join("ok.pyc"))
            .arg(dir.path().join("sus.pyc"))
            .assert()
            .success()
            .stdout(predicate::str::contains(
                "# decompiled 2 files: 1 okay, 0 failed, 1 verify failed",
            ));

        assert!(out.join("ok.pyc_dis").exists());
        assert!(out.join("sus.pyc_dis_unverified").exists());
    }

    #[test]
    fn worker_count_does_not_change_the_aggregate() {
        let dir = TempDir::new().unwrap();
        for i in 0..5 {
            fs::write(dir.path().join(format!("m{i}.pyc")), b"\x00").unwrap();
        }
        fs::write(dir.path().join("bad.pyc"), b"\x00").unwrap();
        let out = dir.path().join("out");
        fs::create_dir(&out).unwrap();
        let engine = flaky_engine(dir.path());

        let expected = "# decompiled 6 files: 5 okay, 1 failed, 0 verify failed";
        for procs in ["1", "4"] {
            let mut cmd = Command::cargo_bin("unpyc").unwrap();
            cmd.arg("--engine")
                .arg(&engine)
                .arg("-p")
                .arg(procs)
                .arg("-o")
                .arg(&out)
                .arg("-r")
                .arg(dir.path())
                .assert()
                .success()
                .stdout(predicate::str::contains(expected));
        }
    }

    #[test]
    fn default_destination_is_stdout() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.pyc"), b"\x00").unwrap();
        fs::write(dir.path().join("b.pyc"), b"\x00").unwrap();

        let mut cmd = Command::cargo_bin("unpyc").unwrap();
        cmd.arg("--engine")
            .arg(okay_engine(dir.path()))
            .arg(dir.path().join("a.pyc"))
            .arg(dir.path().join("b.pyc"))
            .assert()
            .success()
            .stdout(predicate::str::contains("decompiled").and(predicate::str::contains(
                "# decompiled 2 files: 2 okay, 0 failed, 0 verify failed",
            )));
    }

    #[test]
    fn recursion_collects_bytecode_files_only() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("tree/pkg")).unwrap();
        fs::write(dir.path().join("tree/top.pyc"), b"\x00").unwrap();
        fs::write(dir.path().join("tree/pkg/deep.pyo"), b"\x00").unwrap();
        fs::write(dir.path().join("tree/pkg/notes.txt"), b"\x00").unwrap();
        let out = dir.path().join("out");
        fs::create_dir(&out).unwrap();

        let mut cmd = Command::cargo_bin("unpyc").unwrap();
        cmd.arg("--engine")
            .arg(okay_engine(dir.path()))
            .arg("-r")
            .arg("-o")
            .arg(&out)
            .arg(dir.path().join("tree"))
            .assert()
            .success()
            .stdout(predicate::str::contains(
                "# decompiled 2 files: 2 okay, 0 failed, 0 verify failed",
            ));

        assert!(out.join("pkg/deep.pyo_dis").exists());
        assert!(out.join("top.pyc_dis").exists());
    }

    #[test]
    fn timestamp_banners_wrap_the_run() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.pyc"), b"\x00").unwrap();

        let mut cmd = Command::cargo_bin("unpyc").unwrap();
        cmd.arg("--engine")
            .arg(okay_engine(dir.path()))
            .arg("-d")
            .arg(dir.path().join("a.pyc"))
            .assert()
            .success()
            .stdout(predicate::str::is_match(r"(?m)^# \d{4}\.\d{2}\.\d{2} ").unwrap());
    }
}
