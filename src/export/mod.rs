//! 表格导出：单元格平铺 + 表格组装 + 文件写出

pub mod cell;
pub mod table;

pub use cell::{quote, render_cell, NO_BIASES};
pub use table::{
    build_table, export_file_name, write_export, ExportRow, ExportTable, ERROR_COLUMN,
    FETCH_FAILED_MARKER,
};
