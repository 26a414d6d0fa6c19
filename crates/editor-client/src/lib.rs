//! editor-client: talks to editor-service and edits one file at a time.
//!
//! [`Session`] holds the connection state, the file list and the open
//! buffer; [`HttpEditorApi`] is its transport.

pub mod api;
pub mod buffer;
pub mod error;
pub mod session;

pub use api::{Download, EditorApi, HttpEditorApi};
pub use buffer::{EditBuffer, Match};
pub use error::{ClientError, Result};
pub use session::{ConnectionState, Session};
