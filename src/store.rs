use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use rusqlite::{params, Connection};
use tokio::sync::{mpsc, oneshot};

use crate::dispatch::ChangeNotifier;
use crate::logger;

/// Upper bound on waiting for another process holding the database lock.
const LOCK_WAIT: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    pub path: String,
    pub text: String,
}

enum StoreRequest {
    Get {
        path: String,
        reply: oneshot::Sender<Result<Option<String>>>,
    },
    Set {
        path: String,
        text: String,
        reply: oneshot::Sender<Result<()>>,
    },
    Delete {
        path: String,
        reply: oneshot::Sender<Result<()>>,
    },
    ListAll {
        reply: oneshot::Sender<Result<Vec<Note>>>,
    },
    AttachNotifier {
        notifier: ChangeNotifier,
    },
}

/// Handle to the note database. The connection lives on its own thread;
/// every operation is a message with a oneshot reply, so the async side
/// never blocks on SQLite.
#[derive(Clone)]
pub struct NoteStore {
    tx: mpsc::UnboundedSender<StoreRequest>,
}

impl NoteStore {
    /// Opens (creating if needed) the database at `db_path` and spawns the
    /// store thread. Fails early if the file or schema cannot be set up.
    pub fn open_at(db_path: &Path) -> Result<Self> {
        let mut inner = StoreInner::open(db_path).context("failed to initialize the note store")?;

        let (tx, rx) = mpsc::unbounded_channel();

        std::thread::spawn(move || {
            inner.run(rx);
        });

        Ok(Self { tx })
    }

    /// The note for `path`, or an empty string when there is none. Read
    /// failures are logged and degrade to "no note".
    pub async fn get(&self, path: &str) -> String {
        let (reply, rx) = oneshot::channel();
        if self
            .tx
            .send(StoreRequest::Get {
                path: path.to_string(),
                reply,
            })
            .is_err()
        {
            logger::log("Store: note store shut down, treating read as empty");
            return String::new();
        }
        match rx.await {
            Ok(Ok(text)) => text.unwrap_or_default(),
            Ok(Err(err)) => {
                logger::log(&format!("Store: read failed for '{path}': {err:#}"));
                String::new()
            }
            Err(_) => {
                logger::log("Store: note store dropped the reply, treating read as empty");
                String::new()
            }
        }
    }

    /// Writes the note for `path`. An empty `text` deletes the row instead;
    /// empty notes are never stored.
    pub async fn set(&self, path: &str, text: &str) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(StoreRequest::Set {
                path: path.to_string(),
                text: text.to_string(),
                reply,
            })
            .map_err(|_| anyhow::anyhow!("note store shut down"))?;
        rx.await.context("note store dropped reply")?
    }

    /// Removes the note for `path`. Succeeds whether or not a row existed.
    pub async fn delete(&self, path: &str) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(StoreRequest::Delete {
                path: path.to_string(),
                reply,
            })
            .map_err(|_| anyhow::anyhow!("note store shut down"))?;
        rx.await.context("note store dropped reply")?
    }

    /// Every stored note, ordered case-insensitively by path.
    pub async fn list_all(&self) -> Result<Vec<Note>> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(StoreRequest::ListAll { reply })
            .map_err(|_| anyhow::anyhow!("note store shut down"))?;
        rx.await.context("note store dropped reply")?
    }

    /// Installs the notifier fired after every successful mutation. Only
    /// the server role attaches one; forwarding clients never mutate state
    /// that anyone is watching.
    pub fn attach_notifier(&self, notifier: ChangeNotifier) {
        let _ = self.tx.send(StoreRequest::AttachNotifier { notifier });
    }
}

struct StoreInner {
    conn: Connection,
    notifier: Option<ChangeNotifier>,
}

impl StoreInner {
    fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).context("failed to create the data directory")?;
        }

        let conn = Connection::open(db_path).context("failed to open database")?;
        conn.busy_timeout(LOCK_WAIT)
            .context("failed to set the lock wait")?;

        let inner = Self {
            conn,
            notifier: None,
        };
        inner.create_tables().context("failed to create tables")?;
        Ok(inner)
    }

    fn create_tables(&self) -> Result<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS notes (
                file_path TEXT PRIMARY KEY,
                note_text TEXT
            );",
            [],
        )?;
        Ok(())
    }

    fn run(&mut self, mut rx: mpsc::UnboundedReceiver<StoreRequest>) {
        while let Some(req) = rx.blocking_recv() {
            match req {
                StoreRequest::Get { path, reply } => {
                    let _ = reply.send(self.get(&path));
                }
                StoreRequest::Set { path, text, reply } => {
                    let result = self.set(&path, &text);
                    if result.is_ok() {
                        self.notify();
                    }
                    let _ = reply.send(result);
                }
                StoreRequest::Delete { path, reply } => {
                    let result = self.delete(&path);
                    if result.is_ok() {
                        self.notify();
                    }
                    let _ = reply.send(result);
                }
                StoreRequest::ListAll { reply } => {
                    let _ = reply.send(self.list_all());
                }
                StoreRequest::AttachNotifier { notifier } => {
                    self.notifier = Some(notifier);
                }
            }
        }
    }

    fn notify(&self) {
        if let Some(notifier) = &self.notifier {
            notifier.notify();
        }
    }

    fn get(&self, path: &str) -> Result<Option<String>> {
        let res: Result<String, rusqlite::Error> = self.conn.query_row(
            "SELECT note_text FROM notes WHERE file_path = ?1",
            params![path],
            |row| row.get(0),
        );

        match res {
            Ok(text) => Ok(Some(text)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, path: &str, text: &str) -> Result<()> {
        if text.is_empty() {
            self.conn
                .execute("DELETE FROM notes WHERE file_path = ?1", params![path])?;
        } else {
            self.conn.execute(
                "INSERT OR REPLACE INTO notes (file_path, note_text) VALUES (?1, ?2)",
                params![path, text],
            )?;
        }
        Ok(())
    }

    fn delete(&self, path: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM notes WHERE file_path = ?1", params![path])?;
        Ok(())
    }

    fn list_all(&self) -> Result<Vec<Note>> {
        let mut stmt = self.conn.prepare(
            "SELECT file_path, note_text FROM notes
             ORDER BY file_path COLLATE NOCASE, file_path",
        )?;

        let note_iter = stmt.query_map([], |row| {
            Ok(Note {
                path: row.get(0)?,
                text: row.get(1)?,
            })
        })?;

        let mut notes = Vec::new();
        for note in note_iter {
            notes.push(note?);
        }

        Ok(notes)
    }
}
