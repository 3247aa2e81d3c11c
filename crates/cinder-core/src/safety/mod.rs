//! Validation, backups, execution, and undo
//!
//! Every mutating action flows through here: validated against the
//! workspace boundary, gated on confirmation when risky, backed up before
//! it touches an existing file, and recorded on a bounded undo stack.

pub mod backup;
pub mod manager;
pub mod undo;

pub use backup::BackupStore;
pub use manager::{
    ActionResult, ActionValidation, AutoApprove, BatchValidation, ConfirmationGate, LineDiff,
    SafetyManager,
};
pub use undo::{UndoDetail, UndoStack};
