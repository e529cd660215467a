use super::*;

use std::fs;
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use qd_api::{load_path, LoadOptions};
use qd_compiler::compile_directive_source;
use qd_container::{read_header, Algorithm};
use qd_core::{Color, RoleRegistry, Style, TextStyle};
use qd_runtime::{
    AdvanceFlag, InputEvent, InputSource, Interpreter, InterpreterOptions, PlaybackStatus,
    Presenter, RenderDefaults, END_MESSAGE,
};
use tempfile::TempDir;

use crate::line_tui::{map_key, LineInput, TerminalPresenter};
use crate::tui_state::SleepDeadline;

fn write_file(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("parent should be created");
    }
    fs::write(path, content).expect("file should be written");
}

fn interpreter(source: &str, typing_delay: f64) -> Interpreter {
    Interpreter::new(InterpreterOptions {
        script: Arc::new(compile_directive_source(source).script),
        roles: Arc::new(RoleRegistry::new()),
        defaults: RenderDefaults {
            typing_delay,
            ..RenderDefaults::default()
        },
    })
}

fn line_text(line: &[StyledChunk]) -> String {
    line.iter().map(|chunk| chunk.text.as_str()).collect()
}

fn plain_style() -> TextStyle {
    TextStyle {
        foreground: Color::White,
        background: Color::Black,
        style: Style::Normal,
    }
}

fn run_cli(args: &[&str]) -> i32 {
    run_cli_from_args(std::iter::once("qd-cli").chain(args.iter().copied()))
}

fn write_project(root: &Path) {
    write_file(
        &root.join("qd.json"),
        r#"{"title": "Night Train", "author": "Mira", "index": "main.zhif", "roles": "roles.json"}"#,
    );
    write_file(&root.join("roles.json"), r#"{"guard": {"name": "Guard", "color": "yellow"}}"#);
    write_file(&root.join("main.zhif"), "The train stops.\nrole guard;; text Tickets.\n");
}

#[test]
fn run_arguments_parse_mode_and_delay_flags() {
    let cli = Cli::try_parse_from(["qd-cli", "run", "story.zhif", "--mode", "auto", "--instant"])
        .expect("args should parse");
    let Command::Run(args) = cli.command else {
        panic!("expected run command");
    };
    assert_eq!(args.mode, PlayMode::Auto);
    assert!(args.instant);
    assert_eq!(args.delay, None);
    assert_eq!(log_target(&Command::Run(args)), LogTarget::Stderr);

    let cli = Cli::try_parse_from(["qd-cli", "-v", "run", "story.zhif"]).expect("args should parse");
    assert!(cli.verbose);
    assert_eq!(
        log_target(&cli.command),
        LogTarget::File(PLAYER_LOG_PATH.into())
    );
}

#[test]
fn compression_flags_default_to_gzip_level_six() {
    let cli = Cli::try_parse_from(["qd-cli", "save", "story.zhif"]).expect("args should parse");
    let Command::Save(args) = cli.command else {
        panic!("expected save command");
    };
    let options = args.compression.encode_options().expect("defaults are valid");
    assert_eq!(options.algorithm, Algorithm::Gzip);
    assert_eq!(options.level, 6);
}

#[test]
fn unknown_arguments_return_clap_exit_code() {
    assert_eq!(run_cli(&["frobnicate"]), 2);
    assert_eq!(run_cli(&["run"]), 2);
}

#[test]
fn keys_map_to_input_events() {
    let key = |code| KeyEvent::new(code, KeyModifiers::NONE);
    assert_eq!(map_key(key(KeyCode::Char(' '))), InputEvent::Advance);
    assert_eq!(map_key(key(KeyCode::Enter)), InputEvent::Advance);
    assert_eq!(map_key(key(KeyCode::Esc)), InputEvent::Quit);
    assert_eq!(map_key(key(KeyCode::Char('q'))), InputEvent::Quit);
    assert_eq!(map_key(key(KeyCode::Char('x'))), InputEvent::Other);
    assert_eq!(
        map_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
        InputEvent::Quit
    );
}

#[test]
fn line_input_advances_on_lines_and_quits_at_eof() {
    let mut input = LineInput::new(Cursor::new("\nnext\n:quit\n"));
    assert_eq!(input.next_event(Some(Duration::ZERO)).expect("read"), None);
    assert_eq!(input.next_event(None).expect("read"), Some(InputEvent::Advance));
    assert_eq!(input.next_event(None).expect("read"), Some(InputEvent::Advance));
    assert_eq!(input.next_event(None).expect("read"), Some(InputEvent::Quit));
    assert_eq!(input.next_event(None).expect("read"), Some(InputEvent::Quit));
}

#[test]
fn plain_presenter_writes_text_only() {
    let mut presenter = TerminalPresenter::plain(Vec::new());
    presenter.type_text("Hi", plain_style()).expect("write");
    presenter.prompt().expect("write");
    presenter.line_break().expect("write");
    presenter.blank_lines(2).expect("write");
    presenter.end_message("bye").expect("write");
    let text = String::from_utf8(presenter.into_inner()).expect("utf8");
    assert_eq!(text, "Hi\n\n\n\nbye\n");
}

#[test]
fn styled_presenter_emits_escape_codes_and_prompt() {
    let mut presenter = TerminalPresenter::styled(Vec::new());
    presenter
        .type_text(
            "Hi",
            TextStyle {
                foreground: Color::Red,
                background: Color::Black,
                style: Style::Bright,
            },
        )
        .expect("write");
    presenter.prompt().expect("write");
    let text = String::from_utf8(presenter.into_inner()).expect("utf8");
    assert!(text.contains("\u{1b}["));
    assert!(text.contains("Hi"));
    assert!(text.contains(CONTINUE_PROMPT));
}

#[test]
fn auto_mode_prints_every_line() {
    let dir = TempDir::new().expect("tempdir");
    let script = dir.path().join("story.zhif");
    write_file(&script, "Hello\n/color fore red\nWorld\\\n and more\n/frobnicate 1 2\n");
    let project = load_path(
        &script,
        &LoadOptions {
            instant: true,
            ..LoadOptions::default()
        },
    )
    .expect("script should load");

    let mut out = Vec::new();
    let status = run_auto_mode(&project, &mut out).expect("playback");
    assert_eq!(status, PlaybackStatus::Complete);
    assert_eq!(
        String::from_utf8(out).expect("utf8"),
        "Hello\nWorld and more\n"
    );
}

#[test]
fn tui_state_waits_for_the_advance_flag() {
    let mut engine = interpreter("Hello\nWorld\n", 0.0);
    let flag = AdvanceFlag::new();
    let mut ui = TuiUiState::new();
    let now = Instant::now();

    ui.tick(now, &mut engine, &flag).expect("tick");
    assert!(ui.awaiting);
    assert_eq!(line_text(&ui.lines[0]), "Hello");
    assert_eq!(ui.status, "0/2");

    ui.tick(now, &mut engine, &flag).expect("tick");
    assert_eq!(ui.lines.len(), 1);

    flag.request();
    ui.tick(now, &mut engine, &flag).expect("tick");
    assert_eq!(line_text(&ui.lines[1]), "World");
    assert!(!flag.is_requested());

    flag.request();
    ui.tick(now, &mut engine, &flag).expect("tick");
    assert!(ui.finished);
    assert_eq!(ui.end_message, None);
    assert_eq!(engine.status(), PlaybackStatus::Complete);
}

#[test]
fn tui_state_types_one_character_per_delay() {
    let mut engine = interpreter("Hello\n", 0.1);
    let flag = AdvanceFlag::new();
    let mut ui = TuiUiState::new();
    let start = Instant::now();

    ui.tick(start, &mut engine, &flag).expect("tick");
    assert!(ui.typing_in_progress());
    assert_eq!(line_text(&ui.visible_lines()[0]), "H");
    assert!(!ui.awaiting);

    ui.tick(start + Duration::from_millis(250), &mut engine, &flag)
        .expect("tick");
    assert_eq!(line_text(&ui.visible_lines()[0]), "Hel");

    assert!(ui.fast_forward());
    assert!(!ui.fast_forward());
    assert_eq!(line_text(&ui.lines[0]), "Hello");
    ui.tick(start + Duration::from_millis(250), &mut engine, &flag)
        .expect("tick");
    assert!(ui.awaiting);
}

#[test]
fn tui_state_holds_output_during_sleep() {
    let mut engine = interpreter("/sleep 1\nAfter\n", 0.0);
    let flag = AdvanceFlag::new();
    let mut ui = TuiUiState::new();
    let start = Instant::now();

    ui.tick(start, &mut engine, &flag).expect("tick");
    assert!(ui.sleep_until.is_some());
    assert_eq!(line_text(&ui.lines[0]), "");

    ui.tick(start + Duration::from_secs(2), &mut engine, &flag)
        .expect("tick");
    assert!(ui.sleep_until.is_none());
    assert_eq!(line_text(&ui.lines[0]), "After");
}

#[test]
fn tui_state_treats_an_unrepresentable_sleep_as_endless() {
    let mut engine = interpreter("/sleep 1e19\nAfter\n", 0.0);
    let flag = AdvanceFlag::new();
    let mut ui = TuiUiState::new();
    let start = Instant::now();

    ui.tick(start, &mut engine, &flag).expect("tick");
    assert_eq!(ui.sleep_until, Some(SleepDeadline::Never));

    flag.request();
    ui.tick(start + Duration::from_secs(3600), &mut engine, &flag)
        .expect("tick");
    assert_eq!(ui.sleep_until, Some(SleepDeadline::Never));
    assert_eq!(line_text(&ui.lines[0]), "");
    assert!(!ui.finished);
}

#[test]
fn tui_state_shows_end_message() {
    let mut engine = interpreter("Bye\\\n/end\nNever\n", 0.0);
    let flag = AdvanceFlag::new();
    let mut ui = TuiUiState::new();

    ui.tick(Instant::now(), &mut engine, &flag).expect("tick");
    assert!(ui.finished);
    assert_eq!(ui.end_message.as_deref(), Some(END_MESSAGE));
    assert_eq!(ui.status, "finished");
    assert_eq!(engine.status(), PlaybackStatus::Terminated);
    assert!(ui
        .visible_lines()
        .iter()
        .all(|line| !line_text(line).contains("Never")));
}

#[test]
fn compile_command_writes_json_next_to_input() {
    let dir = TempDir::new().expect("tempdir");
    let script = dir.path().join("story.zhif");
    write_file(&script, "Hello\n/delay 0.05\n");

    assert_eq!(run_cli(&["compile", script.to_str().expect("utf8 path")]), 0);
    let json = fs::read_to_string(dir.path().join("story.json")).expect("json output");
    assert!(json.contains("Hello"));
    assert!(json.contains("delay"));
}

#[test]
fn compile_command_refuses_to_overwrite_json_input() {
    let dir = TempDir::new().expect("tempdir");
    let script = dir.path().join("story.json");
    write_file(&script, r#"["Hello"]"#);
    assert_eq!(run_cli(&["compile", script.to_str().expect("utf8 path")]), 1);
    assert_eq!(fs::read_to_string(&script).expect("input"), r#"["Hello"]"#);
}

#[test]
fn save_command_honours_algorithm_and_rejects_bad_levels() {
    let dir = TempDir::new().expect("tempdir");
    let script = dir.path().join("story.zhif");
    write_file(&script, "Hello\n");
    let script_arg = script.to_str().expect("utf8 path");

    assert_eq!(
        run_cli(&["save", script_arg, "--algorithm", "bzip2", "--level", "9"]),
        0
    );
    let blob = fs::read(dir.path().join("story.qdz")).expect("qdz output");
    assert_eq!(read_header(&blob).expect("header").algorithm, Algorithm::Bzip2);

    let bad = dir.path().join("bad.qdz");
    assert_eq!(
        run_cli(&[
            "save",
            script_arg,
            "-o",
            bad.to_str().expect("utf8 path"),
            "--algorithm",
            "bzip2",
            "--level",
            "0"
        ]),
        1
    );
    assert!(!bad.exists());
}

#[test]
fn release_and_extract_commands_round_trip_a_project() {
    let dir = TempDir::new().expect("tempdir");
    let project = dir.path().join("night-train");
    write_project(&project);

    assert_eq!(run_cli(&["release", project.to_str().expect("utf8 path")]), 0);
    let package = dir.path().join("night-train.qdpkg");
    assert!(package.is_file());
    assert_eq!(
        commands::default_package_path(&project).expect("default path"),
        fs::canonicalize(dir.path()).expect("canonical").join("night-train.qdpkg")
    );

    assert_eq!(run_cli(&["extract", package.to_str().expect("utf8 path")]), 0);
    let installed = dir.path().join("games").join("Night Train_Mira");
    assert_eq!(
        fs::read_to_string(installed.join("main.zhif")).expect("extracted script"),
        "The train stops.\nrole guard;; text Tickets.\n"
    );

    let custom = dir.path().join("custom");
    assert_eq!(
        run_cli(&[
            "extract",
            package.to_str().expect("utf8 path"),
            "-d",
            custom.to_str().expect("utf8 path")
        ]),
        0
    );
    assert!(custom.join("qd.json").is_file());
}

#[test]
fn release_without_manifest_fails() {
    let dir = TempDir::new().expect("tempdir");
    let project = dir.path().join("bare");
    write_file(&project.join("main.zhif"), "Hello\n");
    assert_eq!(run_cli(&["release", project.to_str().expect("utf8 path")]), 1);
    assert!(!dir.path().join("bare.qdpkg").exists());
}

#[test]
fn missing_run_target_is_reported() {
    let dir = TempDir::new().expect("tempdir");
    let missing = dir.path().join("nothing.zhif");
    assert_eq!(
        run_cli(&["run", missing.to_str().expect("utf8 path"), "--mode", "auto"]),
        1
    );
}
