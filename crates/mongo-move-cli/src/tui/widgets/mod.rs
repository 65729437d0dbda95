//! Custom widgets for the TUI.

mod table;

pub use table::{SelectableTable, TableRow};
