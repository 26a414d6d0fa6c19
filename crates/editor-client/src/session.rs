//! Editor session: connection state, the file list and the open buffer.
//!
//! The file list is a client-side projection of the server. It is fetched
//! on connect and then only patched locally after each successful mutation;
//! changes made by other clients sharing the token are not seen until the
//! next [`Session::refresh_files`].

use std::path::{Path, PathBuf};

use crate::api::{Download, EditorApi};
use crate::buffer::{EditBuffer, Match};
use crate::error::{ClientError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    /// Holds the validated token for the rest of the session
    Connected { token: String },
}

pub struct Session<A: EditorApi> {
    api: A,
    state: ConnectionState,
    files: Vec<String>,
    buffer: EditBuffer,
}

impl<A: EditorApi> Session<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            state: ConnectionState::Disconnected,
            files: Vec::new(),
            buffer: EditBuffer::new(),
        }
    }

    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    pub fn is_connected(&self) -> bool {
        matches!(self.state, ConnectionState::Connected { .. })
    }

    pub fn files(&self) -> &[String] {
        &self.files
    }

    pub fn current_file(&self) -> Option<&str> {
        self.buffer.file()
    }

    pub fn text(&self) -> &str {
        self.buffer.text()
    }

    /// Local edit; nothing is sent until [`Session::save_to_cloud`].
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.buffer.set_text(text);
    }

    fn token(&self) -> Result<String> {
        match &self.state {
            ConnectionState::Connected { token } => Ok(token.clone()),
            ConnectionState::Disconnected => Err(ClientError::NotConnected),
        }
    }

    /// Validate `token` and, on success, connect and fetch the file list.
    ///
    /// A rejected token leaves the state as it was. If the list fetch fails
    /// the session stays connected and the error is returned.
    pub async fn connect(&mut self, token: &str) -> Result<()> {
        if !self.api.validate_token(token).await? {
            return Err(ClientError::InvalidToken);
        }

        self.state = ConnectionState::Connected {
            token: token.to_string(),
        };
        tracing::debug!("Connected");
        self.refresh_files().await
    }

    /// Replace the local file list with the server's.
    pub async fn refresh_files(&mut self) -> Result<()> {
        let token = self.token()?;
        self.files = self.api.list_files(&token).await?;
        Ok(())
    }

    /// Open `file` into the buffer.
    pub async fn load(&mut self, file: &str) -> Result<()> {
        let token = self.token()?;
        let content = self.api.read_file(&token, file).await?;
        self.buffer.open(file, content);
        Ok(())
    }

    /// Write the buffer to the open file on the server.
    pub async fn save_to_cloud(&mut self) -> Result<()> {
        let token = self.token()?;
        let file = self.buffer.file().ok_or(ClientError::NoOpenFile)?;
        self.api
            .write_file(&token, file, self.buffer.text())
            .await
    }

    /// Write the buffer to the server as `file` and make it the open file.
    pub async fn save_as(&mut self, file: &str) -> Result<()> {
        let token = self.token()?;
        if file.is_empty() {
            return Err(ClientError::EmptyFileName);
        }

        self.api.write_file(&token, file, self.buffer.text()).await?;

        if !self.files.iter().any(|f| f == file) {
            self.files.push(file.to_string());
        }
        self.buffer.retarget(file);
        Ok(())
    }

    /// Write the buffer to `<dir>/<file name>` on the local disk.
    ///
    /// Needs no connection. Path separators in the key become `_`.
    pub async fn save_locally(&self, dir: &Path) -> Result<PathBuf> {
        let file = self.buffer.file().ok_or(ClientError::NoOpenFile)?;
        let path = dir.join(local_file_name(file));
        tokio::fs::write(&path, self.buffer.text()).await?;
        Ok(path)
    }

    /// Create an empty file and open it.
    pub async fn create(&mut self, name: &str) -> Result<()> {
        let token = self.token()?;
        if name.is_empty() {
            return Err(ClientError::EmptyFileName);
        }

        self.api.write_file(&token, name, "").await?;

        if !self.files.iter().any(|f| f == name) {
            self.files.push(name.to_string());
        }
        self.buffer.open(name, "");
        Ok(())
    }

    /// Delete `file`; closes the buffer if it was open.
    pub async fn delete(&mut self, file: &str) -> Result<()> {
        let token = self.token()?;
        self.api.delete_file(&token, file).await?;

        self.files.retain(|f| f != file);
        if self.buffer.file() == Some(file) {
            self.buffer.close();
        }
        Ok(())
    }

    /// Rename `old` to `new`; the open buffer follows the rename.
    pub async fn rename(&mut self, old: &str, new: &str) -> Result<()> {
        let token = self.token()?;
        if new.is_empty() {
            return Err(ClientError::EmptyFileName);
        }

        self.api.rename_file(&token, old, new).await?;

        // The server overwrote any existing `new`, so drop it before renaming
        if old != new {
            self.files.retain(|f| f != new);
        }
        for f in self.files.iter_mut() {
            if f == old {
                *f = new.to_string();
            }
        }
        if self.buffer.file() == Some(old) {
            self.buffer.retarget(new);
        }
        Ok(())
    }

    /// Fetch `file` through the download route.
    pub async fn download(&self, file: &str) -> Result<Download> {
        let token = self.token()?;
        self.api.download(&token, file).await
    }

    /// Every match of `pattern` in the buffer; the first is the one to reveal.
    pub fn find(&self, pattern: &str) -> Result<Vec<Match>> {
        self.buffer.find(pattern)
    }

    /// Replace every match of `search` in the buffer with `replacement`.
    pub fn replace(&mut self, search: &str, replacement: &str) -> Result<usize> {
        if search.is_empty() || replacement.is_empty() {
            return Err(ClientError::MissingSearchOrReplace);
        }
        self.buffer.replace_all(search, replacement)
    }
}

fn local_file_name(key: &str) -> String {
    key.replace(['/', '\\'], "_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::BTreeMap;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// In-process stand-in for the server.
    #[derive(Default)]
    struct FakeApi {
        token: String,
        files: Mutex<BTreeMap<String, String>>,
        fail: Mutex<bool>,
    }

    impl FakeApi {
        fn new(token: &str) -> Self {
            Self {
                token: token.to_string(),
                ..Default::default()
            }
        }

        fn with_file(self, key: &str, content: &str) -> Self {
            self.files
                .lock()
                .unwrap()
                .insert(key.to_string(), content.to_string());
            self
        }

        fn check(&self, token: &str, action: &'static str) -> Result<()> {
            if *self.fail.lock().unwrap() || token != self.token {
                return Err(ClientError::Request {
                    action,
                    detail: "401 Unauthorized".to_string(),
                });
            }
            Ok(())
        }

        fn stored(&self, key: &str) -> Option<String> {
            self.files.lock().unwrap().get(key).cloned()
        }
    }

    #[async_trait]
    impl EditorApi for FakeApi {
        async fn validate_token(&self, token: &str) -> Result<bool> {
            Ok(token == self.token)
        }

        async fn list_files(&self, token: &str) -> Result<Vec<String>> {
            self.check(token, "fetch files")?;
            Ok(self.files.lock().unwrap().keys().cloned().collect())
        }

        async fn read_file(&self, token: &str, key: &str) -> Result<String> {
            self.check(token, "load file")?;
            self.stored(key).ok_or(ClientError::Request {
                action: "load file",
                detail: "404 File not found".to_string(),
            })
        }

        async fn write_file(&self, token: &str, key: &str, content: &str) -> Result<()> {
            self.check(token, "save file")?;
            self.files
                .lock()
                .unwrap()
                .insert(key.to_string(), content.to_string());
            Ok(())
        }

        async fn delete_file(&self, token: &str, key: &str) -> Result<()> {
            self.check(token, "delete file")?;
            self.files.lock().unwrap().remove(key);
            Ok(())
        }

        async fn rename_file(&self, token: &str, old_key: &str, new_key: &str) -> Result<()> {
            self.check(token, "rename file")?;
            let mut files = self.files.lock().unwrap();
            let content = files.remove(old_key).ok_or(ClientError::Request {
                action: "rename file",
                detail: "404 File not found".to_string(),
            })?;
            files.insert(new_key.to_string(), content);
            Ok(())
        }

        async fn download(&self, token: &str, key: &str) -> Result<Download> {
            let content = self.read_file(token, key).await?;
            Ok(Download {
                filename: key.to_string(),
                content,
            })
        }
    }

    async fn connected_session(api: FakeApi) -> Session<FakeApi> {
        let mut session = Session::new(api);
        session.connect("secret123").await.unwrap();
        session
    }

    #[tokio::test]
    async fn test_starts_disconnected() {
        let session = Session::new(FakeApi::new("secret123"));
        assert_eq!(session.state(), &ConnectionState::Disconnected);
        assert!(session.files().is_empty());
        assert!(session.current_file().is_none());
    }

    #[tokio::test]
    async fn test_connect_fetches_file_list() {
        let api = FakeApi::new("secret123")
            .with_file("a.yaml", "")
            .with_file("b.yaml", "");
        let session = connected_session(api).await;

        assert!(session.is_connected());
        assert_eq!(session.files(), ["a.yaml", "b.yaml"]);
    }

    #[tokio::test]
    async fn test_invalid_token_stays_disconnected() {
        let mut session = Session::new(FakeApi::new("secret123"));

        let result = session.connect("wrong").await;

        assert!(matches!(result, Err(ClientError::InvalidToken)));
        assert_eq!(session.state(), &ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_operations_require_connection() {
        let mut session = Session::new(FakeApi::new("secret123").with_file("a", "x"));

        assert!(matches!(session.load("a").await, Err(ClientError::NotConnected)));
        assert!(matches!(session.delete("a").await, Err(ClientError::NotConnected)));
        assert!(matches!(
            session.rename("a", "b").await,
            Err(ClientError::NotConnected)
        ));
        assert!(matches!(session.create("n").await, Err(ClientError::NotConnected)));
        assert!(matches!(
            session.save_to_cloud().await,
            Err(ClientError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_load_edit_and_save_to_cloud() {
        let api = FakeApi::new("secret123").with_file("app.yaml", "port: 80");
        let mut session = connected_session(api).await;

        session.load("app.yaml").await.unwrap();
        assert_eq!(session.current_file(), Some("app.yaml"));
        assert_eq!(session.text(), "port: 80");

        session.set_text("port: 8080");
        // Local until saved
        assert_eq!(session.api.stored("app.yaml").as_deref(), Some("port: 80"));

        session.save_to_cloud().await.unwrap();
        assert_eq!(session.api.stored("app.yaml").as_deref(), Some("port: 8080"));
    }

    #[tokio::test]
    async fn test_load_empty_file() {
        let api = FakeApi::new("secret123").with_file("empty", "");
        let mut session = connected_session(api).await;

        session.load("empty").await.unwrap();
        assert_eq!(session.current_file(), Some("empty"));
        assert_eq!(session.text(), "");
    }

    #[tokio::test]
    async fn test_save_as_writes_and_lists() {
        let api = FakeApi::new("secret123").with_file("a", "old");
        let mut session = connected_session(api).await;
        session.set_text("fresh");

        session.save_as("b").await.unwrap();
        session.save_as("a").await.unwrap();

        assert_eq!(session.files(), ["a", "b"]);
        assert_eq!(session.current_file(), Some("a"));
        assert_eq!(session.api.stored("a").as_deref(), Some("fresh"));
        assert_eq!(session.api.stored("b").as_deref(), Some("fresh"));
    }

    #[tokio::test]
    async fn test_save_without_open_file() {
        let mut session = connected_session(FakeApi::new("secret123")).await;
        assert!(matches!(
            session.save_to_cloud().await,
            Err(ClientError::NoOpenFile)
        ));
    }

    #[tokio::test]
    async fn test_save_locally_works_while_disconnected() {
        let temp_dir = TempDir::new().unwrap();
        let api = FakeApi::new("secret123").with_file("conf/app.yaml", "a: 1");
        let mut session = connected_session(api).await;
        session.load("conf/app.yaml").await.unwrap();

        // Simulate a session that lost its connection
        session.state = ConnectionState::Disconnected;

        let path = session.save_locally(temp_dir.path()).await.unwrap();
        assert_eq!(path, temp_dir.path().join("conf_app.yaml"));
        assert_eq!(tokio::fs::read_to_string(&path).await.unwrap(), "a: 1");
    }

    #[tokio::test]
    async fn test_create_adds_and_opens() {
        let mut session = connected_session(FakeApi::new("secret123")).await;

        session.create("new.txt").await.unwrap();

        assert_eq!(session.files(), ["new.txt"]);
        assert_eq!(session.current_file(), Some("new.txt"));
        assert_eq!(session.text(), "");
        assert_eq!(session.api.stored("new.txt").as_deref(), Some(""));

        assert!(matches!(
            session.create("").await,
            Err(ClientError::EmptyFileName)
        ));
    }

    #[tokio::test]
    async fn test_delete_open_file_clears_buffer() {
        let api = FakeApi::new("secret123")
            .with_file("a", "x")
            .with_file("b", "y");
        let mut session = connected_session(api).await;
        session.load("a").await.unwrap();

        session.delete("a").await.unwrap();

        assert_eq!(session.files(), ["b"]);
        assert!(session.current_file().is_none());
        assert_eq!(session.text(), "");
    }

    #[tokio::test]
    async fn test_rename_updates_list_and_open_file() {
        let api = FakeApi::new("secret123")
            .with_file("a.txt", "A")
            .with_file("b.txt", "B")
            .with_file("c.txt", "C");
        let mut session = connected_session(api).await;
        session.load("a.txt").await.unwrap();

        session.rename("a.txt", "b.txt").await.unwrap();

        assert_eq!(session.files(), ["b.txt", "c.txt"]);
        assert_eq!(session.current_file(), Some("b.txt"));
        assert_eq!(session.text(), "A");
    }

    #[tokio::test]
    async fn test_failed_mutation_leaves_local_state() {
        let api = FakeApi::new("secret123").with_file("a", "x");
        let mut session = connected_session(api).await;
        *session.api.fail.lock().unwrap() = true;

        let result = session.delete("a").await;

        assert!(matches!(result, Err(ClientError::Request { .. })));
        assert_eq!(session.files(), ["a"]);
        // A server-side failure does not disconnect
        assert!(session.is_connected());
    }

    #[tokio::test]
    async fn test_replace_and_find() {
        let api = FakeApi::new("secret123").with_file("f", "foofoobaz");
        let mut session = connected_session(api).await;
        session.load("f").await.unwrap();

        let matches = session.find("foo").unwrap();
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].start, 0);

        assert_eq!(session.replace("foo", "bar").unwrap(), 2);
        assert_eq!(session.text(), "barbarbaz");
    }

    #[tokio::test]
    async fn test_replace_requires_both_values() {
        let mut session = Session::new(FakeApi::new("secret123"));
        session.set_text("abc");

        assert!(matches!(
            session.replace("", "x"),
            Err(ClientError::MissingSearchOrReplace)
        ));
        assert!(matches!(
            session.replace("a", ""),
            Err(ClientError::MissingSearchOrReplace)
        ));
        assert_eq!(session.text(), "abc");
    }

    #[tokio::test]
    async fn test_download() {
        let api = FakeApi::new("secret123").with_file("d.txt", "data");
        let session = connected_session(api).await;

        let download = session.download("d.txt").await.unwrap();
        assert_eq!(download.filename, "d.txt");
        assert_eq!(download.content, "data");
    }
}
