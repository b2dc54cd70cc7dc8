// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod logging;
#[cfg(test)]
mod test_support;

use anyhow::{Context, Result, anyhow};
use civica_app::{AppState, ChatTab, TabId};
use civica_tui::HostOptions;
use config::Config;
use std::env;
use std::path::PathBuf;

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    if options.show_help {
        print_help();
        return Ok(());
    }

    if options.print_config_path {
        println!("{}", options.config_path.display());
        return Ok(());
    }

    if options.print_example {
        print!("{}", Config::example_config(&options.config_path));
        return Ok(());
    }

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `civica --print-example-config` to generate a template",
            options.config_path.display()
        )
    })?;

    let host = HostOptions {
        retry_policy: config.retry_policy()?,
        mount_delay: config.mount_delay()?,
        initial_chat_tab: options.chat_tab.clone(),
    };
    let log_path = config.log_path()?;
    if options.check_only {
        return Ok(());
    }

    logging::init(&log_path, &config.log_level())?;
    tracing::info!(
        config = %options.config_path.display(),
        retry_interval_ms = host.retry_policy.retry_interval.as_millis() as u64,
        max_retries = host.retry_policy.max_retries,
        "starting civica"
    );
    if let Some(tab) = &host.initial_chat_tab
        && ChatTab::parse(tab.as_str()).is_none()
    {
        tracing::warn!(tab = %tab, "startup chat tab is not a known chat topic");
    }

    let mut state = AppState {
        active_page: config.start_page(),
        ..AppState::default()
    };
    civica_tui::run_app(&mut state, host)
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    chat_tab: Option<TabId>,
    print_config_path: bool,
    print_example: bool,
    check_only: bool,
    show_help: bool,
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        chat_tab: None,
        print_config_path: false,
        print_example: false,
        check_only: false,
        show_help: false,
    };

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_ref() {
            "--config" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--config requires a file path"))?;
                options.config_path = PathBuf::from(value.as_ref());
            }
            "--chat-tab" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--chat-tab requires a tab name"))?;
                let tab = TabId::new(value.as_ref());
                if tab.is_empty() {
                    return Err(anyhow!("--chat-tab requires a non-empty tab name"));
                }
                options.chat_tab = Some(tab);
            }
            "--print-config-path" => {
                options.print_config_path = true;
            }
            "--print-example-config" => {
                options.print_example = true;
            }
            "--check" => {
                options.check_only = true;
            }
            "--help" | "-h" => {
                options.show_help = true;
            }
            unknown => {
                return Err(anyhow!(
                    "unknown argument {unknown:?}; run with --help to see supported options"
                ));
            }
        }
    }

    Ok(options)
}

fn print_help() {
    println!("civica");
    println!("  --config <path>          Use a specific config path");
    println!("  --chat-tab <tab>         Open the chat on a topic at startup (chat, agricultura, pesca, paa, sim)");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-example-config   Print a config template");
    println!("  --check                  Validate config and exit");
    println!("  --help                   Show this help");
}

#[cfg(test)]
mod tests {
    use super::{CliOptions, parse_cli_args};
    use anyhow::Result;
    use civica_app::TabId;
    use std::path::PathBuf;

    fn default_options_path() -> PathBuf {
        PathBuf::from("/tmp/civica-config.toml")
    }

    #[test]
    fn parse_cli_args_defaults_to_provided_config_path() -> Result<()> {
        let options = parse_cli_args(Vec::<String>::new(), default_options_path())?;
        assert_eq!(
            options,
            CliOptions {
                config_path: default_options_path(),
                chat_tab: None,
                print_config_path: false,
                print_example: false,
                check_only: false,
                show_help: false,
            }
        );
        Ok(())
    }

    #[test]
    fn parse_cli_args_sets_config_path_override() -> Result<()> {
        let options = parse_cli_args(
            vec!["--config", "/custom/config.toml"],
            default_options_path(),
        )?;
        assert_eq!(options.config_path, PathBuf::from("/custom/config.toml"));
        Ok(())
    }

    #[test]
    fn parse_cli_args_errors_for_missing_config_value() {
        let error = parse_cli_args(vec!["--config"], default_options_path())
            .expect_err("missing config value should fail");
        assert!(error.to_string().contains("--config requires a file path"));
    }

    #[test]
    fn parse_cli_args_reads_chat_tab() -> Result<()> {
        let options = parse_cli_args(vec!["--chat-tab", " paa "], default_options_path())?;
        assert_eq!(options.chat_tab, Some(TabId::new("paa")));
        Ok(())
    }

    #[test]
    fn parse_cli_args_rejects_blank_chat_tab() {
        let missing = parse_cli_args(vec!["--chat-tab"], default_options_path())
            .expect_err("missing tab should fail");
        assert!(missing.to_string().contains("requires a tab name"));

        let blank = parse_cli_args(vec!["--chat-tab", "  "], default_options_path())
            .expect_err("blank tab should fail");
        assert!(blank.to_string().contains("non-empty"));
    }

    #[test]
    fn parse_cli_args_errors_for_unknown_argument() {
        let error = parse_cli_args(vec!["--wat"], default_options_path())
            .expect_err("unknown arg should fail");
        let message = error.to_string();
        assert!(message.contains("unknown argument"));
        assert!(message.contains("--help"));
    }

    #[test]
    fn parse_cli_args_sets_print_and_check_flags() -> Result<()> {
        let options = parse_cli_args(
            vec!["--print-config-path", "--print-example-config", "--check"],
            default_options_path(),
        )?;
        assert!(options.print_config_path);
        assert!(options.print_example);
        assert!(options.check_only);
        assert!(!options.show_help);
        Ok(())
    }

    #[test]
    fn parse_cli_args_sets_help_flag_for_long_and_short_variants() -> Result<()> {
        let long = parse_cli_args(vec!["--help"], default_options_path())?;
        assert!(long.show_help);

        let short = parse_cli_args(vec!["-h"], default_options_path())?;
        assert!(short.show_help);
        Ok(())
    }
}
