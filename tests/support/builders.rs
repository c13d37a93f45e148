#![allow(dead_code)]
use sheetplan::{Cell, Row, Sheet, TableModel};

#[derive(Clone, Debug)]
pub enum CellVal {
    Text(String),
    Num(f64),
    Date(f64),
    Empty,
}

impl From<&str> for CellVal {
    fn from(s: &str) -> Self {
        CellVal::Text(s.to_string())
    }
}

impl From<f64> for CellVal {
    fn from(n: f64) -> Self {
        CellVal::Num(n)
    }
}

impl From<i32> for CellVal {
    fn from(n: i32) -> Self {
        CellVal::Num(n as f64)
    }
}

impl From<CellVal> for Cell {
    fn from(val: CellVal) -> Self {
        match val {
            CellVal::Text(s) => Cell::Text(s),
            CellVal::Num(n) => Cell::Number(n),
            CellVal::Date(serial) => Cell::DateSerial(serial),
            CellVal::Empty => Cell::Empty,
        }
    }
}

pub fn text(s: &str) -> Cell {
    Cell::text(s)
}

pub fn num(n: f64) -> Cell {
    Cell::Number(n)
}

pub fn header<H: AsRef<str>>(names: &[H]) -> Row {
    names.iter().map(|h| Cell::text(h.as_ref())).collect()
}

/// Header row plus data rows built from anything convertible to [`CellVal`].
pub fn sheet_from<H, R, V>(headers: &[H], rows: &[R]) -> Sheet
where
    H: AsRef<str>,
    R: AsRef<[V]>,
    V: Into<CellVal> + Clone,
{
    let data = rows
        .iter()
        .map(|row| {
            row.as_ref()
                .iter()
                .cloned()
                .map(|v| Cell::from(v.into()))
                .collect()
        })
        .collect();
    Sheet::from_parts(header(headers), data)
}

pub fn workbook(sheets: Vec<(&str, Sheet)>) -> TableModel {
    let mut model = TableModel::new().with_file_name("orders.xlsx");
    for (name, sheet) in sheets {
        model.push_sheet(name, sheet).expect("unique sheet name");
    }
    model
}
