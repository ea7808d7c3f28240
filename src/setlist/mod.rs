// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Setlists.
//!
//! A setlist is an ordered list of songs curated by one user, independent of
//! the service plans in Planning Center. All setlists live in one YAML file
//! keyed by user id, rewritten after every change.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifier of a setlist, unique within the store file
pub type SetlistId = u64;

/// A song as it will be provisioned
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Song {
    /// Song title
    pub title: String,
    /// Musical key (e.g., "G", "Eb")
    pub key: String,
    /// Tempo in BPM
    pub tempo: u16,
}

impl Song {
    pub fn new(title: impl Into<String>, key: impl Into<String>, tempo: u16) -> Self {
        Self {
            title: title.into(),
            key: key.into(),
            tempo,
        }
    }
}

/// A named, ordered collection of songs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Setlist {
    pub id: SetlistId,
    pub name: String,
    #[serde(default)]
    pub songs: Vec<Song>,
}

/// On-disk layout of the store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetlistFile {
    #[serde(default)]
    pub next_id: SetlistId,
    #[serde(default)]
    pub users: BTreeMap<String, Vec<Setlist>>,
}

impl SetlistFile {
    /// Parse a store from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self, SetlistError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Serialize to YAML string
    pub fn to_yaml(&self) -> Result<String, SetlistError> {
        Ok(serde_yaml::to_string(self)?)
    }
}

/// Setlist store errors
#[derive(Debug, Error)]
pub enum SetlistError {
    #[error("Setlist {id} not found for user '{user}'")]
    NotFound { user: String, id: SetlistId },

    #[error("Setlist {id} has no song at position {index} (it has {len})")]
    SongIndex {
        id: SetlistId,
        index: usize,
        len: usize,
    },

    #[error("Failed to access setlist file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid setlist YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// File-backed setlist store
#[derive(Debug)]
pub struct SetlistStore {
    path: PathBuf,
    file: SetlistFile,
}

impl SetlistStore {
    /// Open the store at `path`, starting empty if the file does not exist
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SetlistError> {
        let path = path.as_ref().to_path_buf();
        let file = if path.exists() {
            let contents = fs::read_to_string(&path).map_err(|source| SetlistError::Io {
                path: path.clone(),
                source,
            })?;
            SetlistFile::from_yaml(&contents)?
        } else {
            tracing::debug!(?path, "Setlist file not found, starting empty");
            SetlistFile::default()
        };
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All setlists of a user, in creation order
    pub fn list_setlists(&self, user: &str) -> &[Setlist] {
        self.file.users.get(user).map_or(&[], Vec::as_slice)
    }

    /// One setlist of a user
    pub fn setlist(&self, user: &str, id: SetlistId) -> Result<&Setlist, SetlistError> {
        self.list_setlists(user)
            .iter()
            .find(|setlist| setlist.id == id)
            .ok_or_else(|| SetlistError::NotFound {
                user: user.to_string(),
                id,
            })
    }

    /// Create an empty setlist and return its id
    pub fn create_setlist(&mut self, user: &str, name: &str) -> Result<SetlistId, SetlistError> {
        self.file.next_id += 1;
        let id = self.file.next_id;
        self.file
            .users
            .entry(user.to_string())
            .or_default()
            .push(Setlist {
                id,
                name: name.to_string(),
                songs: Vec::new(),
            });
        self.save()?;
        tracing::info!(user, id, name, "Created setlist");
        Ok(id)
    }

    /// Append a song
    pub fn add_song(&mut self, user: &str, id: SetlistId, song: Song) -> Result<(), SetlistError> {
        self.setlist_mut(user, id)?.songs.push(song);
        self.save()
    }

    /// Remove the song at `index`, returning it
    pub fn remove_song(
        &mut self,
        user: &str,
        id: SetlistId,
        index: usize,
    ) -> Result<Song, SetlistError> {
        let setlist = self.setlist_mut(user, id)?;
        check_index(setlist, index)?;
        let song = setlist.songs.remove(index);
        self.save()?;
        Ok(song)
    }

    /// Replace the song at `index`
    pub fn update_song(
        &mut self,
        user: &str,
        id: SetlistId,
        index: usize,
        song: Song,
    ) -> Result<(), SetlistError> {
        let setlist = self.setlist_mut(user, id)?;
        check_index(setlist, index)?;
        setlist.songs[index] = song;
        self.save()
    }

    /// Delete a whole setlist
    pub fn remove_setlist(&mut self, user: &str, id: SetlistId) -> Result<Setlist, SetlistError> {
        let not_found = || SetlistError::NotFound {
            user: user.to_string(),
            id,
        };
        let setlists = self.file.users.get_mut(user).ok_or_else(not_found)?;
        let position = setlists
            .iter()
            .position(|setlist| setlist.id == id)
            .ok_or_else(not_found)?;
        let removed = setlists.remove(position);
        if setlists.is_empty() {
            self.file.users.remove(user);
        }
        self.save()?;
        tracing::info!(user, id, "Removed setlist");
        Ok(removed)
    }

    fn setlist_mut(&mut self, user: &str, id: SetlistId) -> Result<&mut Setlist, SetlistError> {
        self.file
            .users
            .get_mut(user)
            .and_then(|setlists| setlists.iter_mut().find(|setlist| setlist.id == id))
            .ok_or_else(|| SetlistError::NotFound {
                user: user.to_string(),
                id,
            })
    }

    fn save(&self) -> Result<(), SetlistError> {
        let yaml = self.file.to_yaml()?;
        fs::write(&self.path, yaml).map_err(|source| SetlistError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

fn check_index(setlist: &Setlist, index: usize) -> Result<(), SetlistError> {
    if index >= setlist.songs.len() {
        return Err(SetlistError::SongIndex {
            id: setlist.id,
            index,
            len: setlist.songs.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (TempDir, SetlistStore) {
        let dir = TempDir::new().unwrap();
        let store = SetlistStore::open(dir.path().join("setlists.yaml")).unwrap();
        (dir, store)
    }

    #[test]
    fn test_create_and_list() {
        let (_dir, mut store) = store();
        let first = store.create_setlist("alice", "Sunday AM").unwrap();
        let second = store.create_setlist("alice", "Sunday PM").unwrap();
        store.create_setlist("bob", "Youth").unwrap();

        let names: Vec<&str> = store
            .list_setlists("alice")
            .iter()
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(names, vec!["Sunday AM", "Sunday PM"]);
        assert_ne!(first, second);
        assert!(store.list_setlists("carol").is_empty());
    }

    #[test]
    fn test_song_operations() {
        let (_dir, mut store) = store();
        let id = store.create_setlist("alice", "Sunday AM").unwrap();

        store.add_song("alice", id, Song::new("Amazing Grace", "G", 80)).unwrap();
        store.add_song("alice", id, Song::new("Great Are You Lord", "D", 140)).unwrap();
        store.add_song("alice", id, Song::new("Oceans", "D", 67)).unwrap();

        store
            .update_song("alice", id, 2, Song::new("Oceans", "Bb", 67))
            .unwrap();
        let removed = store.remove_song("alice", id, 0).unwrap();
        assert_eq!(removed.title, "Amazing Grace");

        let setlist = store.setlist("alice", id).unwrap();
        assert_eq!(
            setlist.songs,
            vec![
                Song::new("Great Are You Lord", "D", 140),
                Song::new("Oceans", "Bb", 67)
            ]
        );
    }

    #[test]
    fn test_other_users_cannot_touch_setlist() {
        let (_dir, mut store) = store();
        let id = store.create_setlist("alice", "Sunday AM").unwrap();

        let err = store
            .add_song("bob", id, Song::new("Oceans", "D", 67))
            .unwrap_err();
        assert!(matches!(err, SetlistError::NotFound { .. }));
        assert!(store.remove_setlist("bob", id).is_err());
    }

    #[test]
    fn test_bad_song_index() {
        let (_dir, mut store) = store();
        let id = store.create_setlist("alice", "Sunday AM").unwrap();
        let err = store.remove_song("alice", id, 0).unwrap_err();
        assert!(matches!(err, SetlistError::SongIndex { index: 0, len: 0, .. }));
    }

    #[test]
    fn test_changes_persist() {
        let (dir, mut store) = store();
        let keep = store.create_setlist("alice", "Keep").unwrap();
        let drop_me = store.create_setlist("alice", "Drop").unwrap();
        store.add_song("alice", keep, Song::new("Oceans", "D", 67)).unwrap();
        store.remove_setlist("alice", drop_me).unwrap();

        let reopened = SetlistStore::open(dir.path().join("setlists.yaml")).unwrap();
        assert_eq!(reopened.list_setlists("alice").len(), 1);
        assert_eq!(reopened.setlist("alice", keep).unwrap().songs.len(), 1);

        // Ids are never reused
        let mut reopened = reopened;
        let next = reopened.create_setlist("alice", "New").unwrap();
        assert!(next > drop_me);
    }

    #[test]
    fn test_parse_hand_written_file() {
        let yaml = r#"
users:
  alice:
    - id: 4
      name: "Easter"
      songs:
        - title: "Christ Is Risen"
          key: "Eb"
          tempo: 72
"#;
        let file = SetlistFile::from_yaml(yaml).unwrap();
        assert_eq!(file.next_id, 0);
        let easter = &file.users["alice"][0];
        assert_eq!(easter.songs[0], Song::new("Christ Is Risen", "Eb", 72));
    }
}
