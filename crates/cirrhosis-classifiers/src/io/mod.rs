//! IO utilities for loading tabular patient data.

pub mod table;

pub use table::{is_missing, read_table, read_table_from_reader, ColumnKind, RawTable};
