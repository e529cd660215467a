use std::fs;
use std::io::{self, Cursor};
use std::path::{Component, Path, PathBuf};

use qd_core::{DramaError, ErrorKind};
use tar::{Archive, Builder, EntryType, Header};
use walkdir::WalkDir;

use crate::codec::{compress, corrupt, decompress, EncodeOptions};

/// Archives `dir` (files and directories, relative paths, sorted by name) and compresses
/// the archive. Metadata is normalised so the same tree always encodes to the same bytes.
pub fn encode_package(dir: &Path, options: EncodeOptions) -> Result<Vec<u8>, DramaError> {
    options.validate()?;
    let metadata = fs::metadata(dir).map_err(|error| match error.kind() {
        io::ErrorKind::NotFound => DramaError::new(
            ErrorKind::NotFound,
            format!("Package source not found: {}", dir.display()),
        ),
        _ => map_io_error(dir, error),
    })?;
    if !metadata.is_dir() {
        return Err(DramaError::new(
            ErrorKind::NotADirectory,
            format!("Package source is not a directory: {}", dir.display()),
        ));
    }

    let mut builder = Builder::new(Vec::new());
    let mut entries = 0usize;
    for entry in WalkDir::new(dir).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|error| {
            DramaError::new(
                ErrorKind::Io,
                format!("Failed to walk \"{}\": {}", dir.display(), error),
            )
        })?;
        let relative = entry.path().strip_prefix(dir).map_err(|_| {
            DramaError::new(
                ErrorKind::Io,
                format!("Unexpected path outside package: {}", entry.path().display()),
            )
        })?;
        let file_type = entry.file_type();

        let mut header = Header::new_gnu();
        header.set_mtime(0);
        header.set_uid(0);
        header.set_gid(0);
        if file_type.is_dir() {
            header.set_entry_type(EntryType::Directory);
            header.set_mode(0o755);
            header.set_size(0);
            builder
                .append_data(&mut header, relative, io::empty())
                .map_err(|error| map_io_error(entry.path(), error))?;
        } else if file_type.is_file() {
            let data = fs::read(entry.path()).map_err(|error| map_io_error(entry.path(), error))?;
            header.set_entry_type(EntryType::Regular);
            header.set_mode(0o644);
            header.set_size(data.len() as u64);
            builder
                .append_data(&mut header, relative, data.as_slice())
                .map_err(|error| map_io_error(entry.path(), error))?;
        } else {
            tracing::warn!(path = %entry.path().display(), "skipping non-regular file");
            continue;
        }
        entries += 1;
    }

    let archive = builder
        .into_inner()
        .map_err(|error| map_io_error(dir, error))?;
    let blob = compress(&archive, options)?;
    tracing::info!(
        dir = %dir.display(),
        entries,
        algorithm = %options.algorithm,
        level = options.level,
        bytes = blob.len(),
        "encoded package"
    );
    Ok(blob)
}

/// Unpacks a package into `dest`, creating it if needed. Entries that would land outside
/// `dest` (absolute paths, `..`, a link already present under `dest`) and link entries
/// are refused.
pub fn decode_package(bytes: &[u8], dest: &Path) -> Result<(), DramaError> {
    let archive = decompress(bytes)?;
    fs::create_dir_all(dest).map_err(|error| map_io_error(dest, error))?;

    let mut archive = Archive::new(Cursor::new(archive));
    let entries = archive
        .entries()
        .map_err(|error| corrupt(format!("Failed to read package archive: {}", error)))?;

    let mut count = 0usize;
    for entry in entries {
        let mut entry =
            entry.map_err(|error| corrupt(format!("Failed to read package entry: {}", error)))?;
        let path = entry
            .path()
            .map_err(|error| corrupt(format!("Invalid entry path: {}", error)))?
            .into_owned();
        let relative = checked_relative_path(&path)?;
        refuse_links_under(dest, &relative)?;
        let target = dest.join(&relative);

        let entry_type = entry.header().entry_type();
        if entry_type.is_dir() {
            fs::create_dir_all(&target).map_err(|error| map_io_error(&target, error))?;
        } else if entry_type.is_file() {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(|error| map_io_error(parent, error))?;
            }
            let mut file =
                fs::File::create(&target).map_err(|error| map_io_error(&target, error))?;
            io::copy(&mut entry, &mut file).map_err(|error| {
                corrupt(format!("Failed to unpack \"{}\": {}", path.display(), error))
            })?;
        } else {
            return Err(corrupt(format!(
                "Refusing package entry \"{}\" of type {:?}.",
                path.display(),
                entry_type
            )));
        }
        count += 1;
    }

    tracing::info!(dest = %dest.display(), entries = count, "decoded package");
    Ok(())
}

fn checked_relative_path(path: &Path) -> Result<PathBuf, DramaError> {
    let mut relative = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(corrupt(format!(
                    "Refusing package entry outside the destination: \"{}\".",
                    path.display()
                )))
            }
        }
    }
    if relative.as_os_str().is_empty() {
        return Err(corrupt("Package entry has an empty path."));
    }
    Ok(relative)
}

/// Fails when any existing path between `dest` and `dest/relative` is a symlink, since
/// creating or writing through it could leave `dest`.
fn refuse_links_under(dest: &Path, relative: &Path) -> Result<(), DramaError> {
    let mut current = dest.to_path_buf();
    for component in relative.components() {
        current.push(component);
        match fs::symlink_metadata(&current) {
            Ok(metadata) if metadata.file_type().is_symlink() => {
                return Err(corrupt(format!(
                    "Refusing to write package entry \"{}\" through the link \"{}\".",
                    relative.display(),
                    current.display()
                )))
            }
            Ok(_) => {}
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(error) => return Err(map_io_error(&current, error)),
        }
    }
    Ok(())
}

fn map_io_error(path: &Path, error: io::Error) -> DramaError {
    DramaError::new(
        ErrorKind::Io,
        format!("I/O error at \"{}\": {}", path.display(), error),
    )
}
