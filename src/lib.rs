//! dirsort - sort the files of a directory into category folders
//!
//! Files are assigned a category by extension and moved into a subfolder of
//! that name. Every run is recorded in an operation log next to the files so
//! it can be undone, and a preview mode shows the plan without touching
//! anything.

pub mod cli;
pub mod config;
pub mod events;
pub mod file_category;
pub mod file_organizer;
pub mod ignore;
pub mod logging;
pub mod mover;
pub mod naming;
pub mod operation_log;
pub mod output;
pub mod scanner;
pub mod undo;

pub use config::{ConfigError, DuplicateStrategy, OrganizerConfig};
pub use events::{Event, EventSink, MemorySink, Severity, Stage, TracingSink};
pub use file_category::{CATCH_ALL, Category, CategoryTable};
pub use file_organizer::{FileOutcome, OrganizeError, Organizer, Statistics};
pub use operation_log::{Operation, OperationLog};
pub use undo::{UndoManager, UndoOutcome, UndoReport};

pub use cli::{OrganizeCommand, RunOptions, RunStatus, run_cli_with_config};
