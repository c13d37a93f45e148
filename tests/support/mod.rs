#![allow(dead_code)]

pub mod builders;

pub use builders::{CellVal, header, num, sheet_from, text, workbook};
