use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use qd_api::{
    extract_package, load_path, load_roles_file, release_project, save_script, LoadOptions,
};
use qd_compiler::{compile_file, script_to_json};
use qd_container::{PACKAGE_EXTENSION, SCRIPT_EXTENSION};
use qd_core::{DramaError, ErrorKind, RoleRegistry};

use crate::{
    map_output_write, run_auto_mode, run_line_mode, CompileArgs, ExtractArgs, PlayMode,
    ReleaseArgs, RunArgs, SaveArgs,
};

pub(crate) fn run_compile(args: CompileArgs) -> Result<i32, DramaError> {
    let output_path = args
        .output
        .unwrap_or_else(|| args.input.with_extension("json"));
    refuse_overwriting_input(&args.input, &output_path)?;

    let roles = match &args.roles {
        Some(path) => load_roles_file(path)?,
        None => RoleRegistry::new(),
    };
    let output = compile_file(&args.input, &roles)?;
    let json = script_to_json(&output.script)?;
    fs::write(&output_path, json).map_err(|error| map_output_write(&output_path, error))?;

    println!(
        "compiled {} units to {} ({} diagnostics)",
        output.script.len(),
        output_path.display(),
        output.diagnostics.len()
    );
    Ok(0)
}

pub(crate) fn run_play(args: RunArgs) -> Result<i32, DramaError> {
    let project = load_path(
        &args.path,
        &LoadOptions {
            roles_path: args.roles,
            delay: args.delay,
            instant: args.instant,
        },
    )?;
    if !project.diagnostics.is_empty() {
        tracing::warn!(
            count = project.diagnostics.len(),
            "some lines were dropped while compiling"
        );
    }

    let status = match args.mode {
        PlayMode::Line => run_line_mode(&project)?,
        PlayMode::Tui => crate::tui::run_tui_mode(&project)?,
        PlayMode::Auto => {
            let stdout = io::stdout();
            let mut writer = stdout.lock();
            run_auto_mode(&project, &mut writer)?
        }
    };
    tracing::debug!(?status, title = project.title(), "playback ended");
    Ok(0)
}

pub(crate) fn run_save(args: SaveArgs) -> Result<i32, DramaError> {
    let options = args.compression.encode_options()?;
    let output_path = args
        .output
        .unwrap_or_else(|| args.input.with_extension(SCRIPT_EXTENSION));
    refuse_overwriting_input(&args.input, &output_path)?;
    save_script(&args.input, &output_path, options)?;
    println!("saved {} ({})", output_path.display(), options.algorithm);
    Ok(0)
}

pub(crate) fn run_release(args: ReleaseArgs) -> Result<i32, DramaError> {
    let options = args.compression.encode_options()?;
    let output_path = match args.output {
        Some(output) => output,
        None => default_package_path(&args.dir)?,
    };
    release_project(&args.dir, &output_path, options)?;
    println!("released {}", output_path.display());
    Ok(0)
}

pub(crate) fn run_extract(args: ExtractArgs) -> Result<i32, DramaError> {
    let dest = extract_package(&args.package, args.dest.as_deref())?;
    println!("extracted to {}", dest.display());
    Ok(0)
}

/// `<parent>/<dirname>.qdpkg` for a project directory.
pub(crate) fn default_package_path(dir: &Path) -> Result<PathBuf, DramaError> {
    let absolute = fs::canonicalize(dir).map_err(|error| {
        let kind = if error.kind() == io::ErrorKind::NotFound {
            ErrorKind::NotFound
        } else {
            ErrorKind::Io
        };
        DramaError::new(
            kind,
            format!("Project directory not found: {} ({})", dir.display(), error),
        )
    })?;
    let name = absolute
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "project".to_string());
    let file_name = format!("{}.{}", name, PACKAGE_EXTENSION);
    Ok(match absolute.parent() {
        Some(parent) => parent.join(file_name),
        None => PathBuf::from(file_name),
    })
}

fn refuse_overwriting_input(input: &Path, output: &Path) -> Result<(), DramaError> {
    if input == output {
        return Err(DramaError::new(
            ErrorKind::InvalidArgument,
            format!("Output would overwrite the input \"{}\".", input.display()),
        ));
    }
    Ok(())
}
