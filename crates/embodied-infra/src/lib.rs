//! Infrastructure layer - reference data loaders

pub mod csv_loader;

pub use csv_loader::{
    load_factor_rows, load_factor_rows_from_reader, load_intensity_rows,
    load_intensity_rows_from_reader, CsvLoaderError,
};
