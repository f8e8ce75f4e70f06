//! doc-chat: rich-text documents with an AI writing collaborator.
//!
//! This crate provides the core of a collaborative document editor where a
//! user chats with a text-generation service about the document. It includes:
//!
//! - **Markup** - HTML5 fragment parsing into an abstract node tree
//! - **Document model** - Block/inline tree with a markup parser and serializer
//! - **Editor** - Selections, user edits, and atomic whole-document replacement
//! - **Suggestions** - Tolerant extraction of structured edit proposals
//! - **Chat** - Conversation state, prompts, and collaborator wire types
//! - **Session** - Time-limited authentication gate over an injected store
//!
//! # Quick Start
//!
//! ```rust
//! use doc_chat::{Document, Editor};
//!
//! // Parse markup into a document tree
//! let doc = Document::parse("<p><strong>Hello</strong> <em>world</em></p>");
//! assert_eq!(doc.serialize(), "<p><strong>Hello</strong> <em>world</em></p>");
//!
//! // Replace the content of an editor in one step
//! let mut editor = Editor::new("<p>draft</p>");
//! let event = editor.replace("<h1>Final</h1>");
//! assert_eq!(event.version, 1);
//! ```
//!
//! # Features
//!
//! - `cli` - Builds the `doc-chat` command-line tool

// Abstract markup node tree
pub mod markup;

// Document model, parser, and serializer
pub mod doc;

// Editing runtime and selection tracking
pub mod editor;

// Suggested-change extraction
pub mod suggestion;

// Conversation controller and collaborator protocol
pub mod chat;

// Authentication session gate
pub mod session;

pub mod config;

// Re-export doc types
pub use doc::{
    Alignment, Block, BlockKind, Children, Document, HeadingLevel, InlineText, MarkKind, Marks,
    Parser, serialize, serialize_block, serialize_inline,
};

// Re-export editor types
pub use editor::{
    BlockFormat, ChangeEvent, DocumentSelection, EditError, EditOrigin, Editor, Point, Range,
    SelectionInfo, SelectionTracker,
};

pub use chat::{
    ApplyOutcome, ChatError, ChatMessage, Collaborator, CollaboratorRequest, Conversation, Role,
    SendOutcome,
};
pub use config::{CollaboratorConfig, Config, ConfigError, SessionConfig};
pub use markup::{MarkupNode, extract_plain_text, parse_fragment};
pub use session::{AuthSession, FileStore, MemoryStore, SessionError, SessionStore};
pub use suggestion::{SuggestedChange, extract_suggested_change};
