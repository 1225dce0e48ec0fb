//! Process-level wiring: configuration, CLI assembly and error reporting.

use anyhow::Result;
use reticle_core::{load_config, Cli, CliConfig, Status};

use crate::commands;

/// Program name; also selects the config files and env prefix.
pub const APP_NAME: &str = "reticle";

/// Built-in configuration before files and environment are applied.
pub fn default_config() -> CliConfig {
    CliConfig::new(APP_NAME)
        .with_message("Welcome to reticle! Type -h for help, Ctrl-D to leave.")
        .with_package(commands::PACKAGE)
}

/// Assemble the CLI for `config`.
///
/// Without a configured directory, the groups are listed from the source
/// tree when it is present and taken from the compiled-in catalog otherwise.
pub fn build_cli(mut config: CliConfig) -> Result<Cli> {
    if config.directory.is_none() {
        let root = commands::source_root();
        if root.join(config.package.replace('.', "/")).is_dir() {
            config.directory = Some(root);
        }
    }
    tracing::debug!(discovery = ?config.discovery(), "Building CLI");
    Ok(Cli::new(config, &commands::catalog())?)
}

/// Load configuration, build the CLI and run `args` through it.
pub async fn run(args: &[String]) -> Result<Status> {
    let config = load_config(default_config()).await?;
    let mut cli = build_cli(config)?;
    Ok(cli.run(args).await?)
}

/// Process exit code for a failed run.
pub fn exit_code(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<reticle_core::Error>()
        .map_or(1, reticle_core::Error::exit_code)
}

/// Format an error for display, including its direct cause.
pub fn format_error(err: &anyhow::Error) -> String {
    let msg = err.to_string();
    if let Some(source) = err.source() {
        let source_msg = source.to_string();
        if !msg.contains(&source_msg) && !source_msg.is_empty() {
            return format!("{msg}\nCause: {source_msg}");
        }
    }
    msg
}

#[cfg(test)]
mod tests {
    use reticle_core::{Capture, Console, FixedPrivilege};

    use super::*;

    fn args(line: &str) -> Vec<String> {
        line.split_whitespace().map(str::to_string).collect()
    }

    fn demo_cli(elevated: bool) -> (Cli, Capture, Capture) {
        let (console, out, err) = Console::captured();
        let cli = build_cli(default_config())
            .expect("build")
            .with_console(console)
            .with_privilege(FixedPrivilege(elevated));
        (cli, out, err)
    }

    #[test]
    fn test_exit_code_uses_core_error_category() {
        let err = anyhow::Error::new(reticle_core::Error::MissingBase {
            package: "commands".to_string(),
        });
        assert_eq!(exit_code(&err), 1);

        let err = anyhow::anyhow!("something else");
        assert_eq!(exit_code(&err), 1);

        let err = anyhow::Error::new(reticle_core::Error::ModuleNotFound("commands.gone".into()));
        assert_eq!(exit_code(&err), 3);
    }

    #[test]
    fn test_format_error_appends_cause() {
        let err = anyhow::Error::new(reticle_core::Error::Handler {
            command: "greet bye".to_string(),
            source: anyhow::anyhow!("disk full"),
        });
        let formatted = format_error(&err);
        assert!(formatted.starts_with("Command 'greet bye' failed"));
        assert!(!formatted.contains("Cause:"));

        let err = anyhow::Error::new(std::io::Error::other("pipe closed")).context("writing output");
        assert_eq!(format_error(&err), "writing output\nCause: pipe closed");
    }

    #[test]
    fn test_demo_groups_are_attached() {
        let (cli, _out, _err) = demo_cli(false);
        let groups: Vec<&str> = cli.groups().collect();
        assert_eq!(groups, vec!["greet", "system"]);
        assert!(cli.group("base").is_some_and(|g| g.command("hello").is_some()));
    }

    #[test]
    fn test_hello_and_greet_commands() {
        let (mut cli, out, _err) = demo_cli(false);

        assert_eq!(cli.dispatch(&args("hello --name Ann")).expect("hello"), Status::Completed);
        assert_eq!(cli.dispatch(&args("hello")).expect("hello"), Status::Completed);
        assert_eq!(cli.dispatch(&args("greet hi Ann Bob")).expect("hi"), Status::Completed);
        assert_eq!(cli.dispatch(&args("greet bye -t 3 --loud")).expect("bye"), Status::Completed);

        assert_eq!(
            out.contents(),
            "Hello, Ann!\nHello, world!\nHi, Ann and Bob!\nBYE BYE BYE\n"
        );
    }

    #[test]
    fn test_bad_times_is_reported_not_fatal() {
        let (mut cli, out, _err) = demo_cli(false);
        let status = cli.dispatch(&args("greet bye --times 99")).expect("bye");
        assert_eq!(status, Status::Reported);
        assert_eq!(out.contents(), "ERROR: --times must be between 1 and 10\n");
    }

    #[test]
    fn test_flush_needs_super_user() {
        let (mut cli, out, _err) = demo_cli(false);
        let status = cli.dispatch(&args("system flush")).expect("flush");
        assert_eq!(status, Status::Reported);
        assert_eq!(
            out.contents(),
            "ERROR: To perform this command you need super user privileges.\n"
        );

        let (mut cli, out, _err) = demo_cli(true);
        let status = cli.dispatch(&args("system flush --dry-run")).expect("flush");
        assert_eq!(status, Status::Completed);
        assert_eq!(out.contents(), "would flush caches\n");
    }

    #[test]
    fn test_quit_requests_exit() {
        let (mut cli, _out, _err) = demo_cli(false);
        assert_eq!(cli.dispatch(&args("quit")).expect("quit"), Status::Exit(0));
    }
}
