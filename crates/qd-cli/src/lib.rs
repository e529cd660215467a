use std::ffi::OsString;
use std::path::PathBuf;

use clap::Parser;
use qd_core::DramaError;

mod cli_args;
mod commands;
mod error_map;
mod line_tui;
mod logging;
mod tui;
mod tui_state;

pub(crate) use cli_args::{
    Cli, Command, CompileArgs, ExtractArgs, PlayMode, ReleaseArgs, RunArgs, SaveArgs,
};
pub(crate) use error_map::{emit_error, map_log_file, map_output_write, map_terminal_io};
pub(crate) use line_tui::{run_auto_mode, run_line_mode, CONTINUE_PROMPT};
pub(crate) use logging::{init_logging, LogTarget, PLAYER_LOG_PATH};
pub(crate) use tui_state::{StyledChunk, TuiUiState};

pub fn run_cli_from_args<I, T>(args: I) -> i32
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(error) => {
            let _ = error.print();
            return error.exit_code();
        }
    };
    if let Err(error) = init_logging(cli.verbose, &log_target(&cli.command)) {
        return emit_error(error);
    }
    match run(cli) {
        Ok(code) => code,
        Err(error) => emit_error(error),
    }
}

/// Interactive players own the terminal, so their logs go to a file.
fn log_target(command: &Command) -> LogTarget {
    match command {
        Command::Run(args) if args.mode != PlayMode::Auto => {
            LogTarget::File(PathBuf::from(PLAYER_LOG_PATH))
        }
        _ => LogTarget::Stderr,
    }
}

fn run(cli: Cli) -> Result<i32, DramaError> {
    match cli.command {
        Command::Compile(args) => commands::run_compile(args),
        Command::Run(args) => commands::run_play(args),
        Command::Save(args) => commands::run_save(args),
        Command::Release(args) => commands::run_release(args),
        Command::Extract(args) => commands::run_extract(args),
    }
}

#[cfg(test)]
mod tests;
