//! Zip archive packaging.
//!
//! Images rasterized from PDF pages carry [`PAGE_MARKER`] in their names
//! (`<pdf>_страница_<n>.png`). They are grouped into a `<pdf>/` folder
//! and renamed `страница_<n>.png`. Everything else goes to the archive
//! root. Root files come first in input order, then each folder in order
//! of first appearance.

use std::collections::HashSet;
use std::io::{Cursor, Write};

use dotgrid_core::PAGE_MARKER;
use zip::CompressionMethod;
use zip::write::SimpleFileOptions;

use crate::error::ArchiveError;

/// Default archive file name.
pub const DEFAULT_ARCHIVE_NAME: &str = "Результат.zip";

/// Where each input lands inside the archive.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ArchiveLayout {
    /// `(input index, entry name)` for root-level files.
    pub root: Vec<(usize, String)>,
    /// Folder name with `(input index, entry name)` for each member.
    pub folders: Vec<(String, Vec<(usize, String)>)>,
}

/// Group output names into root files and per-document folders.
///
/// Entry names never collide. A repeated root name gets a ` (2)`, ` (3)`,
/// ... suffix before its extension. A page that already exists in its
/// document's folder (the same PDF uploaded twice) starts a new folder
/// named the same way. Root files and folders share one namespace.
#[must_use]
pub fn archive_layout<S: AsRef<str>>(names: &[S]) -> ArchiveLayout {
    let mut layout = ArchiveLayout::default();
    let mut taken = HashSet::new();
    let mut sources: Vec<&str> = Vec::new();
    for (index, name) in names.iter().enumerate() {
        let name = name.as_ref();
        match name.split_once(PAGE_MARKER) {
            Some((folder, page)) => {
                let entry = format!("{}{page}", PAGE_MARKER.trim_start_matches('_'));
                let open = (0..layout.folders.len())
                    .rev()
                    .find(|&i| sources[i] == folder)
                    .filter(|&i| layout.folders[i].1.iter().all(|(_, e)| *e != entry));
                if let Some(i) = open {
                    layout.folders[i].1.push((index, entry));
                } else {
                    let unique = unique_name(&mut taken, folder, "");
                    sources.push(folder);
                    layout.folders.push((unique, vec![(index, entry)]));
                }
            }
            None => {
                let (stem, ext) = match name.rfind('.') {
                    Some(dot) if dot > 0 => name.split_at(dot),
                    _ => (name, ""),
                };
                layout.root.push((index, unique_name(&mut taken, stem, ext)));
            }
        }
    }
    layout
}

fn unique_name(taken: &mut HashSet<String>, stem: &str, ext: &str) -> String {
    let plain = format!("{stem}{ext}");
    if taken.insert(plain.clone()) {
        return plain;
    }
    let mut n = 2;
    loop {
        let candidate = format!("{stem} ({n}){ext}");
        if taken.insert(candidate.clone()) {
            log::warn!("archive: {plain} already present, writing {candidate}");
            return candidate;
        }
        n += 1;
    }
}

/// Write `(name, bytes)` pairs into a deflated zip following
/// [`archive_layout`].
///
/// # Errors
///
/// Propagates zip writer errors.
pub fn create_archive(files: &[(String, Vec<u8>)]) -> Result<Vec<u8>, ArchiveError> {
    let names: Vec<&str> = files.iter().map(|(n, _)| n.as_str()).collect();
    let layout = archive_layout(&names);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (index, entry) in &layout.root {
        zip.start_file(entry.as_str(), options)?;
        zip.write_all(&files[*index].1)?;
    }
    for (folder, members) in &layout.folders {
        zip.add_directory(format!("{folder}/"), options)?;
        for (index, entry) in members {
            zip.start_file(format!("{folder}/{entry}"), options)?;
            zip.write_all(&files[*index].1)?;
        }
    }
    let cursor = zip.finish()?;
    log::info!(
        "archive: {} root files, {} folders",
        layout.root.len(),
        layout.folders.len()
    );
    Ok(cursor.into_inner())
}
