use super::model::{ChatState, Session};
use crate::shared::fs_atomic::atomic_write_json;
use crate::shared::{ChatId, EventLog, StateError};
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// Per-chat session storage with copy-in/copy-out semantics: `get` hands
/// out an independent copy and nothing changes until `put`.
pub trait SessionStore: Send + Sync {
    /// Returns the stored session, or a fresh one when it is absent or
    /// unreadable.
    fn get(&self, chat: ChatId) -> Session;
    fn put(&self, chat: ChatId, session: &Session) -> Result<(), StateError>;
    fn clear(&self, chat: ChatId) -> Result<(), StateError>;

    fn push_state(&self, chat: ChatId, state: ChatState) -> Result<(), StateError> {
        let mut session = self.get(chat);
        session.push_state(state);
        self.put(chat, &session)
    }

    fn pop_state(&self, chat: ChatId) -> Result<ChatState, StateError> {
        let mut session = self.get(chat);
        let previous = session.pop_state();
        self.put(chat, &session)?;
        Ok(previous)
    }
}

#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: Mutex<HashMap<ChatId, Session>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<ChatId, Session>> {
        match self.sessions.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, chat: ChatId) -> Session {
        self.sessions().get(&chat).cloned().unwrap_or_default()
    }

    fn put(&self, chat: ChatId, session: &Session) -> Result<(), StateError> {
        self.sessions().insert(chat, session.clone());
        Ok(())
    }

    fn clear(&self, chat: ChatId) -> Result<(), StateError> {
        self.sessions().remove(&chat);
        Ok(())
    }
}

/// One JSON document per chat under the sessions directory, replaced
/// atomically on every write so a restart resumes mid-flow.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    dir: PathBuf,
    log: EventLog,
}

impl FileSessionStore {
    pub fn new(dir: impl Into<PathBuf>, log: EventLog) -> Self {
        Self {
            dir: dir.into(),
            log,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn session_path(&self, chat: ChatId) -> PathBuf {
        self.dir.join(format!("{chat}.json"))
    }

    fn read(&self, path: &Path) -> Result<Option<Session>, StateError> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(source) if source.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(StateError::ReadState {
                    path: path.display().to_string(),
                    source,
                })
            }
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| StateError::ParseState {
                path: path.display().to_string(),
                source,
            })
    }
}

impl SessionStore for FileSessionStore {
    fn get(&self, chat: ChatId) -> Session {
        let path = self.session_path(chat);
        match self.read(&path) {
            Ok(Some(session)) => session,
            Ok(None) => Session::default(),
            Err(err) => {
                self.log
                    .warn("session.corrupt", &format!("chat={chat} starting over: {err}"));
                Session::default()
            }
        }
    }

    fn put(&self, chat: ChatId, session: &Session) -> Result<(), StateError> {
        atomic_write_json(&self.session_path(chat), session)
    }

    fn clear(&self, chat: ChatId) -> Result<(), StateError> {
        let path = self.session_path(chat);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(source) if source.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StateError::RemoveState {
                path: path.display().to_string(),
                source,
            }),
        }
    }
}
