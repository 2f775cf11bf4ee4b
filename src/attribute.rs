//! 文字属性
//!
//! 各セルは [属性バイト, 文字コード] の2バイト。
//! 属性の判定はセルごとに独立で、状態を持たない。

use serde::{Deserialize, Serialize};

bitflags::bitflags! {
    /// 属性バイトのビット（ビット3,6,7は未使用で無視する）
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct Attribute: u8 {
        /// 第2フォント（文字ROM +$0800）
        const ALT_FONT  = 0x01;
        /// 減光
        const DIM       = 0x02;
        /// 非表示
        const CONCEAL   = 0x04;
        /// 下線（セル最終スキャンラインを全点灯）
        const UNDERLINE = 0x10;
        /// 反転
        const REVERSE   = 0x20;
    }
}

impl Attribute {
    /// 属性バイトを解釈（予約ビットは捨てる）
    #[inline]
    pub fn from_byte(byte: u8) -> Self {
        Attribute::from_bits_truncate(byte)
    }
}

/// 出力ピクセルの輝度（モノクロハイライトパレットのインデックス）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum Pen {
    /// 背景（消灯）
    #[default]
    Off = 0,
    /// 減光
    Dim = 1,
    /// 通常輝度
    Bright = 2,
}

/// 背景色は常に消灯
pub const BACKGROUND: Pen = Pen::Off;

/// 1セル1スキャンライン分の描画指示
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellStyle {
    /// 表示パターン（ビット1 = 前景、MSBが左端）
    pub pattern: u8,
    pub fg: Pen,
    pub bg: Pen,
}

/// 属性バイトと文字ROMパターンから描画指示を決める
///
/// `glyph` は文字ROMの生データ（ビット1 = 消灯）。
/// 判定順序:
/// 1. 下線かつ最終スキャンライン → 全点灯 ($FF)、ROMは見ない
/// 2. それ以外 → ROMデータを反転
/// 3. 減光 → 前景を Dim
/// 4. 非表示 → 前景を背景と同じにする（減光より優先）
/// 5. 反転 → パターンを再反転
pub fn decode_cell(attr: u8, glyph: u8, last_scanline: bool) -> CellStyle {
    let attr = Attribute::from_byte(attr);

    let mut pattern = if attr.contains(Attribute::UNDERLINE) && last_scanline {
        0xFF
    } else {
        !glyph
    };

    let fg = if attr.contains(Attribute::CONCEAL) {
        BACKGROUND
    } else if attr.contains(Attribute::DIM) {
        Pen::Dim
    } else {
        Pen::Bright
    };

    if attr.contains(Attribute::REVERSE) {
        pattern = !pattern;
    }

    CellStyle {
        pattern,
        fg,
        bg: BACKGROUND,
    }
}
