//! Export of saved projects

mod excel;

pub use excel::export_to_excel;
