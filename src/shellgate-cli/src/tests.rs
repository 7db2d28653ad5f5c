//! Tests for argument parsing and subcommand output.

use clap::Parser;
use shellgate_pipe::ConfigSession;
use shellgate_pipe::session::{CORE_SECTION, keys};

use super::*;
use crate::args::{CheckArgs, ExamineArgs, ShellMode, SplitArgs};
use crate::commands::{check_cmd, examine_cmd, load_session, split_cmd};

fn output_of(f: impl FnOnce(&mut Vec<u8>)) -> String {
    let mut out = Vec::new();
    f(&mut out);
    String::from_utf8(out).unwrap()
}

fn check_args(line: &str) -> CheckArgs {
    CheckArgs {
        line: line.to_string(),
        restricted: false,
        shell_mode: None,
        lua_only: false,
        admin: false,
        admin_override: false,
        json: false,
    }
}

mod parse_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_examine() {
        let cli = Cli::try_parse_from(["shellgate", "examine", "ls | grep foo", "--json"]).unwrap();
        match cli.command {
            Commands::Examine(args) => {
                assert_eq!(args.line, "ls | grep foo");
                assert!(args.json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_check_shell_mode() {
        let cli = Cli::try_parse_from(["shellgate", "check", "gs in.ps", "--shell-mode", "forbidden"]).unwrap();
        match cli.command {
            Commands::Check(args) => assert_eq!(args.shell_mode, Some(ShellMode::Forbidden)),
            other => panic!("unexpected command: {other:?}"),
        }
        assert!(
            Cli::try_parse_from([
                "shellgate",
                "check",
                "gs in.ps",
                "--restricted",
                "--shell-mode",
                "unrestricted",
            ])
            .is_err()
        );
    }

    #[test]
    fn test_parse_check_flags() {
        let cli = Cli::try_parse_from([
            "shellgate",
            "check",
            "gs in.ps",
            "--restricted",
            "--admin",
            "--log-level",
            "debug",
        ])
        .unwrap();
        assert_eq!(cli.log_level, Some(LogLevel::Debug));
        match cli.command {
            Commands::Check(args) => {
                assert!(args.restricted);
                assert!(args.admin);
                assert!(!args.lua_only);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_run_shell_mode() {
        let cli = Cli::try_parse_from(["shellgate", "run", "kpsewhich x", "--shell-mode", "unrestricted"])
            .unwrap();
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.shell_mode, Some(ShellMode::Unrestricted));
                assert!(!args.write);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_missing_line_is_rejected() {
        assert!(Cli::try_parse_from(["shellgate", "split"]).is_err());
    }

    #[test]
    fn test_log_level_loose_parsing() {
        assert_eq!(LogLevel::from_str_loose("WARNING"), Some(LogLevel::Warn));
        assert_eq!(LogLevel::from_str_loose("loud"), None);
        assert_eq!(LogLevel::default().as_filter_str(), "warn");
    }
}

mod command_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_examine_text() {
        let args = ExamineArgs {
            line: "kpsewhich article.cls".to_string(),
            json: false,
        };
        let text = output_of(|out| examine_cmd(&ConfigSession::new(), &args, out).unwrap());
        assert!(text.contains("verdict:   probably safe (2)"), "{text}");
        assert!(text.contains("safe line: kpsewhich article.cls"), "{text}");
    }

    #[test]
    fn test_examine_json() {
        let args = ExamineArgs {
            line: "rm -rf /".to_string(),
            json: true,
        };
        let text = output_of(|out| examine_cmd(&ConfigSession::new(), &args, out).unwrap());
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["verdict"], "not_safe");
        assert_eq!(value["program_name"], "rm");
    }

    #[test]
    fn test_check_uses_configured_allow_list() {
        let session = ConfigSession::new()
            .with_value(CORE_SECTION, keys::SHELL_COMMAND_MODE, "unrestricted")
            .with_value(CORE_SECTION, keys::ALLOWED_SHELL_COMMANDS, "ls grep");
        let mut args = check_args("ls | grep foo");

        let mut out = Vec::new();
        assert!(check_cmd(&session, &args, &mut out).unwrap());

        args.restricted = true;
        let mut out = Vec::new();
        assert!(!check_cmd(&session, &args, &mut out).unwrap());
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("command not allowed"), "{text}");
    }

    #[test]
    fn test_check_elevated() {
        let session = ConfigSession::new();
        let mut args = check_args("kpsewhich x.sty");
        args.shell_mode = Some(ShellMode::Unrestricted);
        args.admin = true;
        let mut out = Vec::new();
        assert!(!check_cmd(&session, &args, &mut out).unwrap());

        args.admin_override = true;
        let mut out = Vec::new();
        assert!(check_cmd(&session, &args, &mut out).unwrap());
    }

    #[test]
    fn test_check_follows_configured_mode() {
        let session = ConfigSession::new()
            .with_value(CORE_SECTION, keys::SHELL_COMMAND_MODE, "restricted")
            .with_value(CORE_SECTION, keys::ALLOWED_SHELL_COMMANDS, "ls grep");
        let mut args = check_args("ls | grep foo");
        let mut out = Vec::new();
        assert!(!check_cmd(&session, &args, &mut out).unwrap());
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("command not allowed"), "{text}");

        args.shell_mode = Some(ShellMode::Unrestricted);
        assert!(check_cmd(&session, &args, &mut Vec::new()).unwrap());
    }

    #[test]
    fn test_check_forbidden_mode() {
        let session = ConfigSession::new()
            .with_value(CORE_SECTION, keys::SHELL_COMMAND_MODE, "forbidden")
            .with_value(CORE_SECTION, keys::ALLOWED_SHELL_COMMANDS, "kpsewhich");
        let mut out = Vec::new();
        assert!(!check_cmd(&session, &check_args("kpsewhich x.sty"), &mut out).unwrap());
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("shell escape is disabled"), "{text}");

        let bad = ConfigSession::new().with_value(CORE_SECTION, keys::SHELL_COMMAND_MODE, "query");
        assert!(check_cmd(&bad, &check_args("kpsewhich x.sty"), &mut Vec::new()).is_err());
    }

    #[test]
    fn test_check_configured_admin_override() {
        let session = ConfigSession::new()
            .with_value(CORE_SECTION, keys::SHELL_COMMAND_MODE, "unrestricted")
            .with_value(CORE_SECTION, keys::ALLOW_UNRESTRICTED_SUPER_USER, "true");
        let mut args = check_args("kpsewhich x.sty");
        args.admin = true;
        assert!(check_cmd(&session, &args, &mut Vec::new()).unwrap());
    }

    #[test]
    fn test_check_json() {
        let mut args = check_args("kpsewhich x.sty");
        args.json = true;
        args.restricted = true;
        let text = output_of(|out| {
            check_cmd(&ConfigSession::new(), &args, out).unwrap();
        });
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["examination"]["verdict"], "probably_safe");
        assert_eq!(value["authorization"]["allowed"]["mode"], "restricted");
    }

    #[test]
    fn test_split() {
        let args = SplitArgs {
            line: "makeindex -s 'a b.ist' doc.idx | sort".to_string(),
        };
        let text = output_of(|out| split_cmd(&args, out).unwrap());
        assert_eq!(text, "makeindex\n-s\na b.ist\ndoc.idx\n");

        let bad = SplitArgs {
            line: "echo 'open".to_string(),
        };
        assert!(split_cmd(&bad, &mut Vec::new()).is_err());
    }

    #[test]
    fn test_load_session_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[core]\nallowed_shell_commands = [\"gs\"]\n").unwrap();
        let session = load_session(Some(&path)).unwrap();

        let args = ExamineArgs {
            line: "gs -q in.ps".to_string(),
            json: false,
        };
        let text = output_of(|out| examine_cmd(&session, &args, out).unwrap());
        assert!(text.contains("probably safe"), "{text}");

        assert!(load_session(Some(&dir.path().join("missing.toml"))).is_err());
    }
}
