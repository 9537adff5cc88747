//! Tests for the `blogorm` binary.

#[cfg(test)]
mod cli_tests {
    use assert_cmd::Command;
    use std::fs;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, body: &str) -> String {
        let path = dir.path().join("blogorm.toml");
        fs::write(&path, body).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn test_status_reports_empty_tables() {
        let dir = TempDir::new().unwrap();
        let db = dir.path().join("awesome.db");
        let config = write_config(
            &dir,
            &format!(
                "[database]\nuser = \"www-data\"\npassword = \"www-data\"\ndatabase = \"{}\"\n",
                db.display()
            ),
        );

        let output = Command::cargo_bin("blogorm")
            .unwrap()
            .arg(&config)
            .output()
            .unwrap();
        assert!(output.status.success());
        let stdout = String::from_utf8(output.stdout).unwrap();
        for table in ["users", "blogs", "comments"] {
            let line = stdout
                .lines()
                .find(|l| l.starts_with(table))
                .unwrap_or_else(|| panic!("missing {} in {}", table, stdout));
            assert!(line.trim_end().ends_with(" 0"));
        }
        assert!(db.exists());
    }

    #[test]
    fn test_missing_credentials_fail() {
        let dir = TempDir::new().unwrap();
        let config = write_config(&dir, "[database]\nuser = \"root\"\n");

        Command::cargo_bin("blogorm")
            .unwrap()
            .arg(&config)
            .assert()
            .failure();
    }

    #[test]
    fn test_usage_on_bad_arguments() {
        Command::cargo_bin("blogorm").unwrap().assert().code(2);
    }
}
