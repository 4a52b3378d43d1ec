//! Inkboard Core Library
//!
//! Event-log replay, geometry and reconciliation for the Inkboard
//! collaborative whiteboard. The board state is never stored directly: it is
//! recomputed by replaying an ordered log of draw events.

pub mod board;
pub mod config;
pub mod event;
pub mod geometry;
pub mod history;
pub mod reconcile;
pub mod render;
pub mod replay;
pub mod selection;
pub mod shapes;
pub mod sync;
pub mod tools;

pub use board::Board;
pub use config::BoardConfig;
pub use event::{DrawEvent, DrawPayload, Fingerprint};
pub use history::{EventLog, HistoryError, Origin, RemoteOutcome, parse_history};
pub use replay::{Replayer, replay};
pub use selection::{DragMove, Pick, Selection};
pub use shapes::{ApproxTextMeasure, TextMeasure, VisibleShape};
pub use sync::{ClientMessage, ConnectionState, Publisher, Scope, ServerMessage, SyncError, SyncEvent};
#[cfg(not(target_arch = "wasm32"))]
pub use sync::NativeWebSocket;
pub use tools::{ToolKind, ToolManager};
