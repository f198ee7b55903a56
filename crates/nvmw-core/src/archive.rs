use std::path::Path;

use log::debug;
use nvmw_backend::NvmError;

fn archive_name(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |name| name.to_string_lossy().into_owned())
}

/// Extract a zip archive into `dest`.
///
/// An entry whose path would land outside `dest` aborts the extraction.
///
/// # Errors
/// Returns an error when the archive is unreadable, holds an unsafe path, or
/// a file cannot be written.
pub fn extract_zip(zip_path: &Path, dest: &Path) -> Result<(), NvmError> {
    let name = archive_name(zip_path);
    let file = std::fs::File::open(zip_path)
        .map_err(|error| NvmError::io_with_path("open zip file", zip_path, &error))?;
    let mut archive = zip::ZipArchive::new(file)
        .map_err(|error| NvmError::archive(&name, format!("failed to read zip archive: {error}")))?;

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|error| NvmError::archive(&name, format!("failed to read zip entry: {error}")))?;
        let Some(relative) = entry.enclosed_name() else {
            return Err(NvmError::archive(
                &name,
                format!("illegal file path: {}", entry.name()),
            ));
        };
        let out_path = dest.join(relative);

        if entry.is_dir() {
            std::fs::create_dir_all(&out_path).map_err(|error| {
                NvmError::io_with_path("create extraction directory", &out_path, &error)
            })?;
            continue;
        }

        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent).map_err(|error| {
                NvmError::io_with_path("create extraction parent directory", parent, &error)
            })?;
        }
        let mut outfile = std::fs::File::create(&out_path)
            .map_err(|error| NvmError::io_with_path("create extracted file", &out_path, &error))?;
        std::io::copy(&mut entry, &mut outfile)
            .map_err(|error| NvmError::io_with_path("extract archive entry", &out_path, &error))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Some(mode) = entry.unix_mode() {
                let _ = std::fs::set_permissions(&out_path, std::fs::Permissions::from_mode(mode));
            }
        }
    }

    debug!("Extracted {name} to {}", dest.display());
    Ok(())
}

/// Move everything from `src` into `dest`, merging directories that exist
/// on both sides. Files in `dest` are replaced. `src` is removed afterwards.
///
/// # Errors
/// Returns an error when an entry cannot be moved.
pub fn merge_into(src: &Path, dest: &Path) -> Result<(), NvmError> {
    if !dest.exists() {
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|error| NvmError::io_with_path("create merge target", parent, &error))?;
        }
        return std::fs::rename(src, dest)
            .map_err(|error| NvmError::io_with_path("move directory", src, &error));
    }

    let entries = std::fs::read_dir(src)
        .map_err(|error| NvmError::io_with_path("read directory", src, &error))?;
    for entry in entries {
        let entry = entry.map_err(|error| NvmError::io_with_path("read directory entry", src, &error))?;
        let from = entry.path();
        let to = dest.join(entry.file_name());

        if from.is_dir() && to.is_dir() {
            merge_into(&from, &to)?;
            continue;
        }
        if to.is_dir() {
            std::fs::remove_dir_all(&to)
                .map_err(|error| NvmError::io_with_path("replace directory", &to, &error))?;
        } else if to.exists() {
            std::fs::remove_file(&to)
                .map_err(|error| NvmError::io_with_path("replace file", &to, &error))?;
        }
        std::fs::rename(&from, &to)
            .map_err(|error| NvmError::io_with_path("move file", &from, &error))?;
    }

    std::fs::remove_dir(src).map_err(|error| NvmError::io_with_path("remove merged directory", src, &error))
}

/// Lift the contents of `dir/<folder>` into `dir`.
///
/// # Errors
/// Returns an error when the folder is missing or cannot be merged.
pub fn flatten(dir: &Path, folder: &str) -> Result<(), NvmError> {
    let nested = dir.join(folder);
    if !nested.is_dir() {
        return Err(NvmError::archive(
            folder,
            format!("expected folder {} after extraction", nested.display()),
        ));
    }
    merge_into(&nested, dir)
}

#[cfg(test)]
pub(crate) fn write_zip(path: &Path, files: &[(&str, &[u8])]) {
    use std::io::Write as _;

    let zip_file = std::fs::File::create(path).expect("zip file should be created");
    let mut writer = zip::ZipWriter::new(zip_file);
    let options = zip::write::SimpleFileOptions::default().unix_permissions(0o644);
    for (name, contents) in files {
        writer
            .start_file(*name, options)
            .expect("file entry should be started");
        writer
            .write_all(contents)
            .expect("file entry should be written");
    }
    writer.finish().expect("zip archive should be finalized");
}
