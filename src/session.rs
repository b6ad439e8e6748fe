use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::report::aggregate::TrackSource;

/// Track list of a mix session, as written in a TOML manifest:
///
/// ```toml
/// [[tracks]]
/// name = "Bass"
/// items = ["audio/bass_verse.wav", "audio/bass_chorus.wav"]
/// ```
#[derive(Debug, Default, Deserialize)]
pub struct Session {
    #[serde(default)]
    pub tracks: Vec<TrackSource>,
}

/// Reads a manifest; relative item paths resolve against its directory.
pub fn load_session(path: &Path) -> Result<Session> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read session manifest: {}", path.display()))?;
    let mut session: Session = toml::from_str(&content)
        .with_context(|| format!("Invalid session manifest: {}", path.display()))?;

    let base = path.parent().unwrap_or_else(|| Path::new("."));
    for track in &mut session.tracks {
        for item in &mut track.items {
            if item.is_relative() {
                *item = base.join(&*item);
            }
        }
    }
    Ok(session)
}

/// One track per file, named by the file stem.
pub fn tracks_from_files(files: &[PathBuf]) -> Vec<TrackSource> {
    files
        .iter()
        .map(|file| {
            let name = file
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| file.display().to_string());
            TrackSource::new(name, [file.clone()])
        })
        .collect()
}
