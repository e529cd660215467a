use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use qd_compiler::{compile_file, compile_source, SourceSyntax};
use qd_container::{
    decode_package, decode_script, encode_package, encode_script_bytes, EncodeOptions,
    PACKAGE_EXTENSION, SCRIPT_EXTENSION,
};
use qd_core::{DramaError, ErrorKind, Manifest, RoleRegistry, RolesSource, Script, MANIFEST_FILE_NAME};
use qd_runtime::{Interpreter, InterpreterOptions, RenderDefaults};
use tempfile::TempDir;

/// Caller-side settings layered over whatever the project itself configures.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Role registry for stand-alone sources (ignored for projects, which name their own).
    pub roles_path: Option<PathBuf>,
    pub delay: Option<f64>,
    pub instant: bool,
}

/// A compiled script ready for playback, with everything needed to build an interpreter.
#[derive(Debug)]
pub struct LoadedProject {
    pub manifest: Option<Manifest>,
    pub script: Arc<Script>,
    pub roles: Arc<RoleRegistry>,
    pub defaults: RenderDefaults,
    pub diagnostics: Vec<DramaError>,
    _extracted: Option<TempDir>,
}

impl LoadedProject {
    pub fn title(&self) -> &str {
        self.manifest
            .as_ref()
            .map(Manifest::display_title)
            .unwrap_or("untitled")
    }

    pub fn create_interpreter(&self) -> Interpreter {
        Interpreter::new(InterpreterOptions {
            script: Arc::clone(&self.script),
            roles: Arc::clone(&self.roles),
            defaults: self.defaults,
        })
    }
}

/// Loads anything playable: a project directory, a `.qdpkg` package, a `.qdz` script or
/// a plain source file.
pub fn load_path(path: &Path, options: &LoadOptions) -> Result<LoadedProject, DramaError> {
    if path.is_dir() {
        return load_project_dir(path, options);
    }
    match extension_of(path).as_deref() {
        Some(PACKAGE_EXTENSION) => load_package(path, options),
        Some(SCRIPT_EXTENSION) => load_compressed_script(path, options),
        _ => load_script_file(path, options),
    }
}

pub fn load_project_dir(dir: &Path, options: &LoadOptions) -> Result<LoadedProject, DramaError> {
    let manifest = read_manifest(dir)?;
    let roles = match &manifest.roles {
        Some(RolesSource::Path(relative)) => load_roles_file(&project_file(dir, relative)?)?,
        Some(RolesSource::Inline(roles)) => RoleRegistry::from(roles.clone()),
        None => RoleRegistry::new(),
    };

    let index = project_file(dir, &manifest.index)?;
    let output = compile_file(&index, &roles)?;
    let defaults = resolve_defaults(
        RenderDefaults::default().with_default_style(&manifest.default_style)?,
        options,
    )?;

    tracing::info!(
        title = manifest.display_title(),
        index = %index.display(),
        roles = roles.len(),
        "loaded project"
    );
    Ok(LoadedProject {
        manifest: Some(manifest),
        script: Arc::new(output.script),
        roles: Arc::new(roles),
        defaults,
        diagnostics: output.diagnostics,
        _extracted: None,
    })
}

pub fn load_script_file(path: &Path, options: &LoadOptions) -> Result<LoadedProject, DramaError> {
    let roles = optional_roles(options)?;
    let output = compile_file(path, &roles)?;
    loaded_script(output.script, output.diagnostics, roles, options)
}

/// A `.qdz` payload is directive-language text.
pub fn load_compressed_script(
    path: &Path,
    options: &LoadOptions,
) -> Result<LoadedProject, DramaError> {
    let bytes = read_bytes(path)?;
    let source = decode_script(&bytes)?;
    let roles = optional_roles(options)?;
    let output = compile_source(&source, SourceSyntax::Directive, &roles)?;
    loaded_script(output.script, output.diagnostics, roles, options)
}

pub fn load_package(path: &Path, options: &LoadOptions) -> Result<LoadedProject, DramaError> {
    let bytes = read_bytes(path)?;
    let extracted = tempfile::tempdir().map_err(|error| map_io_error(path, error))?;
    decode_package(&bytes, extracted.path())?;
    let mut project = load_project_dir(extracted.path(), options)?;
    project._extracted = Some(extracted);
    Ok(project)
}

pub fn load_roles_file(path: &Path) -> Result<RoleRegistry, DramaError> {
    let text = read_text(path)?;
    RoleRegistry::from_json_str(&text)
}

pub fn read_manifest(dir: &Path) -> Result<Manifest, DramaError> {
    let path = dir.join(MANIFEST_FILE_NAME);
    if !path.is_file() {
        return Err(DramaError::new(
            ErrorKind::NotFound,
            format!("No {} in \"{}\".", MANIFEST_FILE_NAME, dir.display()),
        ));
    }
    Manifest::from_json_str(&read_text(&path)?)
}

/// Compresses one script source into a `.qdz` blob written to `output`.
pub fn save_script(input: &Path, output: &Path, options: EncodeOptions) -> Result<(), DramaError> {
    let blob = encode_script_bytes(&read_bytes(input)?, options)?;
    write_bytes(output, &blob)
}

/// Packs a project directory into a `.qdpkg` written to `output`. The directory must
/// carry a readable manifest.
pub fn release_project(dir: &Path, output: &Path, options: EncodeOptions) -> Result<(), DramaError> {
    if !dir.is_dir() {
        return Err(DramaError::new(
            if dir.exists() {
                ErrorKind::NotADirectory
            } else {
                ErrorKind::NotFound
            },
            format!("Project directory not found: {}", dir.display()),
        ));
    }
    let manifest = read_manifest(dir)?;
    let project = dir.canonicalize().map_err(|error| map_io_error(dir, error))?;
    if resolve_existing_prefix(output)?.starts_with(&project) {
        return Err(DramaError::new(
            ErrorKind::InvalidArgument,
            "Package output must not be inside the project directory.",
        ));
    }
    let blob = encode_package(dir, options)?;
    write_bytes(output, &blob)?;
    tracing::info!(title = manifest.display_title(), output = %output.display(), "released project");
    Ok(())
}

/// Unpacks a package into `dest`, or into `games/<title>[_<author>]` beside the package
/// when no destination is given. Returns the directory written.
pub fn extract_package(package: &Path, dest: Option<&Path>) -> Result<PathBuf, DramaError> {
    let bytes = read_bytes(package)?;
    let dest = match dest {
        Some(dest) => dest.to_path_buf(),
        None => {
            let staging = tempfile::tempdir().map_err(|error| map_io_error(package, error))?;
            decode_package(&bytes, staging.path())?;
            let manifest = read_manifest(staging.path())?;
            let games = package
                .parent()
                .map(|parent| parent.join("games"))
                .unwrap_or_else(|| PathBuf::from("games"));
            games.join(install_folder_name(&manifest))
        }
    };
    decode_package(&bytes, &dest)?;
    Ok(dest)
}

/// Joins a manifest path onto the project directory. Only plain relative paths are
/// accepted, so a manifest cannot point outside its own tree.
fn project_file(dir: &Path, relative: impl AsRef<Path>) -> Result<PathBuf, DramaError> {
    let relative = relative.as_ref();
    let inside = relative.components().all(|component| {
        matches!(component, Component::Normal(_) | Component::CurDir)
    });
    if !inside || relative.as_os_str().is_empty() {
        return Err(DramaError::new(
            ErrorKind::InvalidManifest,
            format!(
                "Manifest path \"{}\" must be relative to the project directory.",
                relative.display()
            ),
        ));
    }
    Ok(dir.join(relative))
}

/// Canonicalises the longest existing ancestor of `path` and re-appends the rest, so
/// paths that do not exist yet can still be compared.
fn resolve_existing_prefix(path: &Path) -> Result<PathBuf, DramaError> {
    let mut missing = Vec::new();
    let mut current = path.to_path_buf();
    loop {
        if current.as_os_str().is_empty() {
            current = PathBuf::from(".");
        }
        match current.canonicalize() {
            Ok(mut resolved) => {
                resolved.extend(missing.iter().rev());
                return Ok(resolved);
            }
            Err(error) => match (current.file_name(), current.parent()) {
                (Some(name), Some(parent)) => {
                    missing.push(name.to_os_string());
                    current = parent.to_path_buf();
                }
                _ => return Err(map_io_error(&current, error)),
            },
        }
    }
}

fn install_folder_name(manifest: &Manifest) -> String {
    let name = match &manifest.author {
        Some(author) if !author.trim().is_empty() => {
            format!("{}_{}", manifest.display_title(), author.trim())
        }
        _ => manifest.display_title().to_string(),
    };
    let sanitized = name
        .trim()
        .chars()
        .map(|ch| match ch {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            ch if ch.is_control() => '_',
            ch => ch,
        })
        .collect::<String>();
    match sanitized.as_str() {
        "" | "." | ".." => "untitled".to_string(),
        _ => sanitized,
    }
}

fn loaded_script(
    script: Script,
    diagnostics: Vec<DramaError>,
    roles: RoleRegistry,
    options: &LoadOptions,
) -> Result<LoadedProject, DramaError> {
    Ok(LoadedProject {
        manifest: None,
        script: Arc::new(script),
        roles: Arc::new(roles),
        defaults: resolve_defaults(RenderDefaults::default(), options)?,
        diagnostics,
        _extracted: None,
    })
}

fn resolve_defaults(
    defaults: RenderDefaults,
    options: &LoadOptions,
) -> Result<RenderDefaults, DramaError> {
    if options.instant {
        return defaults.with_typing_delay(0.0);
    }
    match options.delay {
        Some(delay) => defaults.with_typing_delay(delay),
        None => Ok(defaults),
    }
}

fn optional_roles(options: &LoadOptions) -> Result<RoleRegistry, DramaError> {
    match &options.roles_path {
        Some(path) => load_roles_file(path),
        None => Ok(RoleRegistry::new()),
    }
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
}

fn read_bytes(path: &Path) -> Result<Vec<u8>, DramaError> {
    fs::read(path).map_err(|error| map_io_error(path, error))
}

fn read_text(path: &Path) -> Result<String, DramaError> {
    String::from_utf8(read_bytes(path)?).map_err(|_| {
        DramaError::new(
            ErrorKind::Encoding,
            format!("File is not valid UTF-8: {}", path.display()),
        )
    })
}

fn write_bytes(path: &Path, bytes: &[u8]) -> Result<(), DramaError> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|error| map_io_error(parent, error))?;
    }
    fs::write(path, bytes).map_err(|error| map_io_error(path, error))
}

fn map_io_error(path: &Path, error: io::Error) -> DramaError {
    match error.kind() {
        io::ErrorKind::NotFound => DramaError::new(
            ErrorKind::NotFound,
            format!("File not found: {}", path.display()),
        ),
        _ => DramaError::new(
            ErrorKind::Io,
            format!("I/O error at \"{}\": {}", path.display(), error),
        ),
    }
}
