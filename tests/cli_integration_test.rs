//! CLI integration tests.
//!
//! Tests cover:
//! - `evaluate` human and JSON output against files on disk
//! - `scan` with and without `--signals-only`
//! - `indicator` over a CSV file
//! - `validate` and `symbols`
//! - Exit codes for config, data, strategy and history failures

mod common;

use common::*;
use std::fs;
use std::path::Path;
use std::process::{Command, Output};

fn rulecraft(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_rulecraft"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn path_arg(path: &Path) -> String {
    path.display().to_string()
}

fn crossover_workspace() -> Workspace {
    Workspace::new(
        "BHP",
        &bars_from_closes("2024-01-01", &[5.0, 4.0, 3.0, 2.0, 6.0]),
        CROSSOVER_STRATEGY,
    )
}

mod evaluate {
    use super::*;

    #[test]
    fn prints_signal_and_action() {
        let ws = crossover_workspace();
        let config = path_arg(&ws.config_path());
        let output = rulecraft(&["evaluate", "--config", &config]);

        assert_eq!(output.status.code(), Some(0));
        let text = stdout(&output);
        assert!(text.contains("Strategy: Close over SMA (BHP, 5 bars"), "{text}");
        assert!(text.contains("Entry: true"), "{text}");
        assert!(text.contains("Exit: false"), "{text}");
        assert!(text.contains("Action: ENTER (exit_first)"), "{text}");
    }

    #[test]
    fn json_output_is_machine_readable() {
        let ws = crossover_workspace();
        let config = path_arg(&ws.config_path());
        let output = rulecraft(&["evaluate", "--config", &config, "--json"]);

        assert_eq!(output.status.code(), Some(0));
        let doc: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(doc["symbol"], "BHP");
        assert_eq!(doc["action"], "enter");
        assert_eq!(doc["entry"], true);
        assert_eq!(doc["entry_groups"][0]["inequalities"][0]["left_value"], 6.0);
    }

    #[test]
    fn symbol_flag_overrides_config() {
        let ws = crossover_workspace();
        write_bars_csv(
            &ws.data_dir().join("CBA.csv"),
            &bars_from_closes("2024-01-01", &[1.0, 2.0, 3.0, 4.0, 1.0]),
        );
        let config = path_arg(&ws.config_path());
        let output = rulecraft(&["evaluate", "--config", &config, "--symbol", "CBA"]);

        assert_eq!(output.status.code(), Some(0));
        let text = stdout(&output);
        assert!(text.contains("(CBA, 5 bars"), "{text}");
        assert!(text.contains("Action: EXIT"), "{text}");
    }

    #[test]
    fn missing_config_exits_2() {
        let output = rulecraft(&["evaluate", "--config", "/nonexistent/rulecraft.ini"]);
        assert_eq!(output.status.code(), Some(2));
    }

    #[test]
    fn unknown_symbol_exits_3() {
        let ws = crossover_workspace();
        let config = path_arg(&ws.config_path());
        let output = rulecraft(&["evaluate", "--config", &config, "--symbol", "XYZ"]);
        assert_eq!(output.status.code(), Some(3));
    }

    #[test]
    fn min_bars_exits_5() {
        let ws = crossover_workspace();
        ws.append_config("\n[evaluation]\nmin_bars = 50\n");
        let config = path_arg(&ws.config_path());
        let output = rulecraft(&["evaluate", "--config", &config]);
        assert_eq!(output.status.code(), Some(5));
    }

    #[test]
    fn short_history_exits_5() {
        let ws = Workspace::new(
            "BHP",
            &bars_from_closes("2024-01-01", &[5.0, 4.0]),
            CROSSOVER_STRATEGY,
        );
        let config = path_arg(&ws.config_path());
        let output = rulecraft(&["evaluate", "--config", &config]);
        assert_eq!(output.status.code(), Some(5));
    }
}

mod scan {
    use super::*;

    #[test]
    fn signals_only_lists_enter_and_exit() {
        let ws = Workspace::new(
            "BHP",
            &bars_from_closes("2024-01-01", &[5.0, 4.0, 3.0, 2.0, 6.0, 1.0]),
            CROSSOVER_STRATEGY,
        );
        let config = path_arg(&ws.config_path());

        let all = rulecraft(&["scan", "--config", &config]);
        assert_eq!(all.status.code(), Some(0));
        assert_eq!(stdout(&all).lines().count(), 6);

        let signals = rulecraft(&["scan", "--config", &config, "--signals-only"]);
        let text = stdout(&signals);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2, "{text}");
        assert!(lines[0].starts_with("4\t2024-01-05") && lines[0].ends_with("ENTER"));
        assert!(lines[1].starts_with("5\t2024-01-06") && lines[1].ends_with("EXIT"));
    }
}

mod indicator {
    use super::*;

    #[test]
    fn prints_trailing_values() {
        let dir = tempfile::TempDir::new().unwrap();
        let file = dir.path().join("bars.csv");
        write_bars_csv(&file, &bars_from_closes("2024-01-01", &[1.0, 2.0, 3.0, 4.0, 5.0]));
        let data = path_arg(&file);

        let output = rulecraft(&[
            "indicator", "--data", &data, "--name", "SMA", "--param", "period=3", "--last", "2",
        ]);
        assert_eq!(output.status.code(), Some(0));
        let text = stdout(&output);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, ["2024-01-04 00:00:00\t3.000000", "2024-01-05 00:00:00\t4.000000"]);
    }

    #[test]
    fn unsupported_indicator_exits_4() {
        let dir = tempfile::TempDir::new().unwrap();
        let file = dir.path().join("bars.csv");
        write_bars_csv(&file, &generate_bars("2024-01-01", 5, 10.0));
        let data = path_arg(&file);

        let output = rulecraft(&["indicator", "--data", &data, "--name", "Ichimoku"]);
        assert_eq!(output.status.code(), Some(4));
    }

    #[test]
    fn volume_indicator_needs_volume_column() {
        let dir = tempfile::TempDir::new().unwrap();
        let file = dir.path().join("closes.csv");
        fs::write(&file, "date,close\n2024-01-01,1\n2024-01-02,2\n").unwrap();
        let data = path_arg(&file);

        let output = rulecraft(&["indicator", "--data", &data, "--name", "OBV"]);
        assert_eq!(output.status.code(), Some(3));
    }
}

mod validate {
    use super::*;

    #[test]
    fn reports_incomplete_inequalities() {
        let dir = tempfile::TempDir::new().unwrap();
        let file = dir.path().join("strategy.json");
        fs::write(
            &file,
            r#"{
                "name": "Half done",
                "entryRules": [{"id": "g1", "inequalities": [
                    {"id": "i1", "left": {"type": "PRICE"}, "condition": "GREATER_THAN",
                     "right": {"type": "VALUE", "value": "abc"}}
                ]}]
            }"#,
        )
        .unwrap();
        let strategy = path_arg(&file);

        let output = rulecraft(&["validate", "--strategy", &strategy]);
        assert_eq!(output.status.code(), Some(0));
        let text = stdout(&output);
        assert!(text.contains("Incomplete inequalities"), "{text}");
        assert!(text.contains("[g1] i1"), "{text}");
    }

    #[test]
    fn invalid_parameter_exits_4() {
        let dir = tempfile::TempDir::new().unwrap();
        let file = dir.path().join("strategy.json");
        fs::write(
            &file,
            r#"{
                "name": "Bad period",
                "entryRules": [{"id": "g1", "inequalities": [
                    {"id": "i1",
                     "left": {"type": "INDICATOR", "indicator": "SMA", "parameters": {"period": -5}},
                     "condition": "GREATER_THAN", "right": {"type": "VALUE", "value": 1}}
                ]}]
            }"#,
        )
        .unwrap();
        let strategy = path_arg(&file);

        let output = rulecraft(&["validate", "--strategy", &strategy]);
        assert_eq!(output.status.code(), Some(4));
    }

    #[test]
    fn unreadable_strategy_exits_4() {
        let output = rulecraft(&["validate", "--strategy", "/nonexistent/strategy.json"]);
        assert_eq!(output.status.code(), Some(4));
    }
}

mod symbols {
    use super::*;

    #[test]
    fn lists_data_directory() {
        let ws = crossover_workspace();
        write_bars_csv(&ws.data_dir().join("ANZ.csv"), &generate_bars("2024-01-01", 3, 1.0));
        let config = path_arg(&ws.config_path());

        let output = rulecraft(&["symbols", "--config", &config]);
        assert_eq!(output.status.code(), Some(0));
        assert_eq!(stdout(&output).lines().collect::<Vec<_>>(), ["ANZ", "BHP"]);
    }
}
