//! 行ポインタテーブル
//!
//! 表示行ごとの先頭アドレスはビデオRAM内のテーブルに格納されている。
//! テーブルは81スロット x 4バイトで、表示される27行は末尾の27スロット。
//! 各エントリの先頭2バイトがビッグエンディアンの論理アドレス。
//!
//! 解決は2段階: 行番号 → 生ポインタ → マスク済みRAMオフセット

use crate::videoram::{VideoRam, VIDEO_RAM_BASE, VIDEO_RAM_MASK};

/// 実機ファームウェアが使うテーブルのベースオフセット（論理 $FE9C）
pub const ROW_TABLE_BASE: usize = 0x7E9C;
/// テーブル全体のスロット数
pub const TOTAL_ROW_SLOTS: usize = 81;
/// 表示行数
pub const VISIBLE_ROWS: usize = 27;
/// 1エントリのバイト数
pub const ROW_ENTRY_SIZE: usize = 4;

/// 行ポインタテーブル
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowTable {
    base: usize,
}

impl Default for RowTable {
    fn default() -> Self {
        RowTable::new(ROW_TABLE_BASE)
    }
}

impl RowTable {
    pub fn new(base: usize) -> Self {
        RowTable {
            base: base & VIDEO_RAM_MASK,
        }
    }

    pub fn base(&self) -> usize {
        self.base
    }

    /// 表示行 `row` のエントリが置かれるRAMオフセット
    pub fn entry_offset(&self, row: usize) -> usize {
        (self.base + ROW_ENTRY_SIZE * (TOTAL_ROW_SLOTS - VISIBLE_ROWS + row)) & VIDEO_RAM_MASK
    }

    /// エントリから生の16ビットポインタを読む
    pub fn raw_pointer(&self, ram: &VideoRam, row: usize) -> u16 {
        let entry = self.entry_offset(row);
        u16::from_be_bytes([ram.read(entry), ram.read(entry + 1)])
    }

    /// 行の先頭セル（属性バイト）のRAMオフセット
    ///
    /// ポインタの検証はしない。範囲外のポインタはラップされ、ゴミが表示される。
    pub fn resolve(&self, ram: &VideoRam, row: usize) -> usize {
        self.raw_pointer(ram, row).wrapping_sub(VIDEO_RAM_BASE) as usize & VIDEO_RAM_MASK
    }

    /// 行ポインタを設定（ファームウェア側の書き込みを模擬）
    pub fn set_pointer(&self, ram: &mut VideoRam, row: usize, offset: usize) {
        let pointer = VIDEO_RAM_BASE.wrapping_add((offset & VIDEO_RAM_MASK) as u16);
        let entry = self.entry_offset(row);
        let [hi, lo] = pointer.to_be_bytes();
        ram.write(entry, hi);
        ram.write(entry + 1, lo);
    }

    /// 全表示行の先頭オフセット
    pub fn resolve_all(&self, ram: &VideoRam) -> [usize; VISIBLE_ROWS] {
        std::array::from_fn(|row| self.resolve(ram, row))
    }
}
