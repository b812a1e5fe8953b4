//! Data models
//!
//! This module contains the data structures used throughout the Inventrack client.
//! Models represent:
//! - Backend entities as the client sees them (InventoryItem, User, ActivityLog)
//! - API request/response types
//! - Client-side session and scan state

mod item;
mod preferences;
mod scan;
mod session;
mod user;

pub use item::{
    ActivityLog, ActivityLogPage, FailedImportItem, Health, HistoryEntry, ImportReport,
    InventoryItem, ItemStatus, ItemUpdate, NewItem, QrCode, Statistics, StatusChange,
};
pub use preferences::Language;
pub use scan::{ParsedEquipment, ScanEvent, ScanSource, TagFormat};
pub use session::{ActivityKind, LogoutReason, MonitorState, SessionSnapshot, ViewScope};
pub use user::{
    CreatedUser, Dashboard, EmailDelivery, LoginRequest, LoginResponse, NewUser, StoredUser,
    User, UserRole, UserUpdate,
};
