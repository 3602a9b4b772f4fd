// Adapters layer: concrete reference-table providers (remote sheet, local CSV).

pub mod csv_tables;
pub mod gviz;
#[cfg(test)]
pub(crate) mod memory;

pub use csv_tables::CsvDirectoryProvider;
pub use gviz::GvizSheetProvider;
