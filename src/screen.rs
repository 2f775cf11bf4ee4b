//! テキスト画面ライタ
//!
//! 端末ファームウェアの代わりにビデオRAMへ文字を書き込む。
//! 行の位置は常に行ポインタテーブル経由で解決するので、
//! スクロールはポインタの付け替えだけで済む。

use crate::attribute::Attribute;
use crate::rowtable::{RowTable, VISIBLE_ROWS};
use crate::video::{CELL_BYTES, COLUMNS, ROW_BYTES};
use crate::videoram::VideoRam;

/// ビデオRAMに文字を書き込むライタ
pub struct ScreenWriter<'a> {
    ram: &'a mut VideoRam,
    table: RowTable,
    row: usize,
    col: usize,
    attr: Attribute,
}

impl<'a> ScreenWriter<'a> {
    /// テーブルを使う既存の画面に対してライタを作る
    pub fn new(ram: &'a mut VideoRam, table: RowTable) -> Self {
        ScreenWriter {
            ram,
            table,
            row: 0,
            col: 0,
            attr: Attribute::empty(),
        }
    }

    /// 27行を `text_base` から160バイト間隔で並べ、画面を消去する
    pub fn install(ram: &'a mut VideoRam, table: RowTable, text_base: usize) -> Self {
        for row in 0..VISIBLE_ROWS {
            table.set_pointer(ram, row, text_base + row * ROW_BYTES);
        }
        let mut writer = Self::new(ram, table);
        writer.clear();
        writer
    }

    /// 全行を空白にする
    pub fn clear(&mut self) {
        for row in 0..VISIBLE_ROWS {
            self.clear_row(row);
        }
        self.row = 0;
        self.col = 0;
    }

    fn clear_row(&mut self, row: usize) {
        for col in 0..COLUMNS {
            self.write_cell(row, col, 0x00, b' ');
        }
    }

    /// 範囲外の値は無視する
    pub fn move_to(&mut self, row: usize, col: usize) {
        if row < VISIBLE_ROWS {
            self.row = row;
        }
        if col < COLUMNS {
            self.col = col;
        }
    }

    pub fn set_attribute(&mut self, attr: Attribute) {
        self.attr = attr;
    }

    pub fn position(&self) -> (usize, usize) {
        (self.row, self.col)
    }

    /// 1セル書き込む
    pub fn write_cell(&mut self, row: usize, col: usize, attr: u8, code: u8) {
        let offset = self.table.resolve(self.ram, row).wrapping_add(col.wrapping_mul(CELL_BYTES));
        self.ram.write(offset, attr);
        self.ram.write(offset.wrapping_add(1), code);
    }

    /// 1セル読み出す (属性, 文字コード)
    pub fn read_cell(&self, row: usize, col: usize) -> (u8, u8) {
        let offset = self.table.resolve(self.ram, row).wrapping_add(col.wrapping_mul(CELL_BYTES));
        (self.ram.read(offset), self.ram.read(offset.wrapping_add(1)))
    }

    /// 1行上にスクロール（先頭行のメモリを最下行として再利用）
    pub fn scroll_up(&mut self) {
        let first = self.table.resolve(self.ram, 0);
        for row in 1..VISIBLE_ROWS {
            let start = self.table.resolve(self.ram, row);
            self.table.set_pointer(self.ram, row - 1, start);
        }
        self.table.set_pointer(self.ram, VISIBLE_ROWS - 1, first);
        self.clear_row(VISIBLE_ROWS - 1);
    }

    fn put_char(&mut self, ch: char) {
        match ch {
            '\n' => {
                self.row += 1;
                self.col = 0;
            }
            '\r' => self.col = 0,
            _ => {
                // 7ビットASCIIのみ
                let code = if ch.is_ascii() { ch as u8 } else { b'?' };
                let attr = self.attr.bits();
                self.write_cell(self.row, self.col, attr, code);
                self.col += 1;
            }
        }
        if self.col == COLUMNS {
            self.col = 0;
            self.row += 1;
        }
        if self.row == VISIBLE_ROWS {
            self.row = VISIBLE_ROWS - 1;
            self.scroll_up();
        }
    }
}

impl std::fmt::Write for ScreenWriter<'_> {
    fn write_str(&mut self, s: &str) -> std::fmt::Result {
        for ch in s.chars() {
            self.put_char(ch);
        }
        Ok(())
    }
}

/// 起動時のデモ画面
pub fn draw_demo_screen(ram: &mut VideoRam, table: RowTable) -> std::fmt::Result {
    use std::fmt::Write;

    let mut writer = ScreenWriter::install(ram, table, 0x0000);
    let samples = [
        (Attribute::empty(), "Normal text  0123456789 !\"#$%&'()*+,-./"),
        (Attribute::DIM, "Dim text"),
        (Attribute::UNDERLINE, "Underlined text"),
        (Attribute::REVERSE, "Reverse video"),
        (Attribute::REVERSE | Attribute::UNDERLINE, "Reverse + underline"),
        (Attribute::CONCEAL, "Concealed text (invisible)"),
        (Attribute::DIM | Attribute::REVERSE, "Dim reverse"),
    ];

    writer.move_to(1, 2);
    writer.set_attribute(Attribute::REVERSE);
    write!(writer, " AT&T Teletype 4425 ")?;

    for (i, (attr, text)) in samples.iter().enumerate() {
        writer.move_to(3 + i, 2);
        writer.set_attribute(*attr);
        write!(writer, "{}", text)?;
    }

    // 第2フォント（モザイク）の全パターン
    writer.move_to(12, 2);
    writer.set_attribute(Attribute::empty());
    write!(writer, "Mosaic:")?;
    for code in 0..0x40u8 {
        writer.write_cell(13, 2 + code as usize, Attribute::ALT_FONT.bits(), code);
    }

    writer.move_to(VISIBLE_ROWS - 1, 0);
    writer.set_attribute(Attribute::DIM);
    write!(writer, "ESC: quit  F5: save  F9: load  F12: screenshot")
}
