//! 文字ジェネレータROM
//!
//! 1グリフ = 8x13 ドット、16バイト間隔（13-15バイト目は未使用）。
//! バンク0が通常フォント、バンク1 (+$0800) が第2フォント（モザイク）。
//! ROMのビット1は「消灯」を意味する。

use std::fs;
use std::path::Path;

/// 文字ROMのサイズ (8KB)
pub const CHARGEN_SIZE: usize = 0x2000;
/// 第2フォントのオフセット
pub const ALT_BANK_OFFSET: usize = 0x0800;
/// 1グリフのバイト数
pub const GLYPH_STRIDE: usize = 16;
/// 1セルのスキャンライン数
pub const GLYPH_HEIGHT: usize = 13;
/// 1バンクあたりのグリフ数（アドレスは7ビットでマスクされる）
pub const GLYPHS_PER_BANK: usize = 128;

/// 内蔵フォントの先頭スキャンライン
const BUILTIN_TOP: usize = 2;

/// 内蔵フォント（ASCII $20-$7E、MSBが左端、ビット1 = 点灯）
#[rustfmt::skip]
const BUILTIN_ASCII: [[u8; 8]; 95] = [
    [0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00], // SP
    [0x10, 0x10, 0x10, 0x10, 0x10, 0x00, 0x10, 0x00], // !
    [0x28, 0x28, 0x28, 0x00, 0x00, 0x00, 0x00, 0x00], // "
    [0x28, 0x28, 0x7C, 0x28, 0x7C, 0x28, 0x28, 0x00], // #
    [0x10, 0x3C, 0x50, 0x38, 0x14, 0x78, 0x10, 0x00], // $
    [0x60, 0x64, 0x08, 0x10, 0x20, 0x4C, 0x0C, 0x00], // %
    [0x20, 0x50, 0x50, 0x20, 0x54, 0x48, 0x34, 0x00], // &
    [0x10, 0x10, 0x20, 0x00, 0x00, 0x00, 0x00, 0x00], // '
    [0x08, 0x10, 0x20, 0x20, 0x20, 0x10, 0x08, 0x00], // (
    [0x20, 0x10, 0x08, 0x08, 0x08, 0x10, 0x20, 0x00], // )
    [0x00, 0x10, 0x54, 0x38, 0x54, 0x10, 0x00, 0x00], // *
    [0x00, 0x10, 0x10, 0x7C, 0x10, 0x10, 0x00, 0x00], // +
    [0x00, 0x00, 0x00, 0x00, 0x00, 0x10, 0x10, 0x20], // ,
    [0x00, 0x00, 0x00, 0x7C, 0x00, 0x00, 0x00, 0x00], // -
    [0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x10, 0x00], // .
    [0x00, 0x04, 0x08, 0x10, 0x20, 0x40, 0x00, 0x00], // /
    [0x38, 0x44, 0x4C, 0x54, 0x64, 0x44, 0x38, 0x00], // 0
    [0x10, 0x30, 0x10, 0x10, 0x10, 0x10, 0x38, 0x00], // 1
    [0x38, 0x44, 0x04, 0x18, 0x20, 0x40, 0x7C, 0x00], // 2
    [0x38, 0x44, 0x04, 0x18, 0x04, 0x44, 0x38, 0x00], // 3
    [0x08, 0x18, 0x28, 0x48, 0x7C, 0x08, 0x08, 0x00], // 4
    [0x7C, 0x40, 0x78, 0x04, 0x04, 0x44, 0x38, 0x00], // 5
    [0x1C, 0x20, 0x40, 0x78, 0x44, 0x44, 0x38, 0x00], // 6
    [0x7C, 0x04, 0x08, 0x10, 0x20, 0x20, 0x20, 0x00], // 7
    [0x38, 0x44, 0x44, 0x38, 0x44, 0x44, 0x38, 0x00], // 8
    [0x38, 0x44, 0x44, 0x3C, 0x04, 0x08, 0x70, 0x00], // 9
    [0x00, 0x00, 0x10, 0x00, 0x00, 0x10, 0x00, 0x00], // :
    [0x00, 0x00, 0x10, 0x00, 0x00, 0x10, 0x10, 0x20], // ;
    [0x08, 0x10, 0x20, 0x40, 0x20, 0x10, 0x08, 0x00], // <
    [0x00, 0x00, 0x7C, 0x00, 0x7C, 0x00, 0x00, 0x00], // =
    [0x20, 0x10, 0x08, 0x04, 0x08, 0x10, 0x20, 0x00], // >
    [0x38, 0x44, 0x04, 0x08, 0x10, 0x00, 0x10, 0x00], // ?
    [0x38, 0x44, 0x54, 0x5C, 0x58, 0x40, 0x3C, 0x00], // @
    [0x10, 0x28, 0x44, 0x44, 0x7C, 0x44, 0x44, 0x00], // A
    [0x78, 0x44, 0x44, 0x78, 0x44, 0x44, 0x78, 0x00], // B
    [0x38, 0x44, 0x40, 0x40, 0x40, 0x44, 0x38, 0x00], // C
    [0x78, 0x44, 0x44, 0x44, 0x44, 0x44, 0x78, 0x00], // D
    [0x7C, 0x40, 0x40, 0x78, 0x40, 0x40, 0x7C, 0x00], // E
    [0x7C, 0x40, 0x40, 0x78, 0x40, 0x40, 0x40, 0x00], // F
    [0x3C, 0x40, 0x40, 0x5C, 0x44, 0x44, 0x3C, 0x00], // G
    [0x44, 0x44, 0x44, 0x7C, 0x44, 0x44, 0x44, 0x00], // H
    [0x38, 0x10, 0x10, 0x10, 0x10, 0x10, 0x38, 0x00], // I
    [0x04, 0x04, 0x04, 0x04, 0x04, 0x44, 0x38, 0x00], // J
    [0x44, 0x48, 0x50, 0x60, 0x50, 0x48, 0x44, 0x00], // K
    [0x40, 0x40, 0x40, 0x40, 0x40, 0x40, 0x7C, 0x00], // L
    [0x44, 0x6C, 0x54, 0x54, 0x44, 0x44, 0x44, 0x00], // M
    [0x44, 0x64, 0x54, 0x4C, 0x44, 0x44, 0x44, 0x00], // N
    [0x38, 0x44, 0x44, 0x44, 0x44, 0x44, 0x38, 0x00], // O
    [0x78, 0x44, 0x44, 0x78, 0x40, 0x40, 0x40, 0x00], // P
    [0x38, 0x44, 0x44, 0x44, 0x54, 0x48, 0x34, 0x00], // Q
    [0x78, 0x44, 0x44, 0x78, 0x50, 0x48, 0x44, 0x00], // R
    [0x38, 0x44, 0x40, 0x38, 0x04, 0x44, 0x38, 0x00], // S
    [0x7C, 0x10, 0x10, 0x10, 0x10, 0x10, 0x10, 0x00], // T
    [0x44, 0x44, 0x44, 0x44, 0x44, 0x44, 0x38, 0x00], // U
    [0x44, 0x44, 0x44, 0x44, 0x28, 0x28, 0x10, 0x00], // V
    [0x44, 0x44, 0x44, 0x54, 0x54, 0x6C, 0x44, 0x00], // W
    [0x44, 0x44, 0x28, 0x10, 0x28, 0x44, 0x44, 0x00], // X
    [0x44, 0x44, 0x28, 0x10, 0x10, 0x10, 0x10, 0x00], // Y
    [0x7C, 0x04, 0x08, 0x10, 0x20, 0x40, 0x7C, 0x00], // Z
    [0x3C, 0x20, 0x20, 0x20, 0x20, 0x20, 0x3C, 0x00], // [
    [0x00, 0x40, 0x20, 0x10, 0x08, 0x04, 0x00, 0x00], // \
    [0x3C, 0x04, 0x04, 0x04, 0x04, 0x04, 0x3C, 0x00], // ]
    [0x10, 0x28, 0x44, 0x00, 0x00, 0x00, 0x00, 0x00], // ^
    [0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x7E, 0x00], // _
    [0x20, 0x10, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00], // `
    [0x00, 0x00, 0x38, 0x04, 0x3C, 0x44, 0x3C, 0x00], // a
    [0x40, 0x40, 0x78, 0x44, 0x44, 0x44, 0x78, 0x00], // b
    [0x00, 0x00, 0x38, 0x40, 0x40, 0x40, 0x38, 0x00], // c
    [0x04, 0x04, 0x3C, 0x44, 0x44, 0x44, 0x3C, 0x00], // d
    [0x00, 0x00, 0x38, 0x44, 0x7C, 0x40, 0x38, 0x00], // e
    [0x18, 0x20, 0x20, 0x78, 0x20, 0x20, 0x20, 0x00], // f
    [0x00, 0x00, 0x3C, 0x44, 0x44, 0x3C, 0x04, 0x38], // g
    [0x40, 0x40, 0x78, 0x44, 0x44, 0x44, 0x44, 0x00], // h
    [0x10, 0x00, 0x30, 0x10, 0x10, 0x10, 0x38, 0x00], // i
    [0x08, 0x00, 0x08, 0x08, 0x08, 0x08, 0x48, 0x30], // j
    [0x40, 0x40, 0x48, 0x50, 0x60, 0x50, 0x48, 0x00], // k
    [0x30, 0x10, 0x10, 0x10, 0x10, 0x10, 0x38, 0x00], // l
    [0x00, 0x00, 0x6C, 0x54, 0x54, 0x54, 0x44, 0x00], // m
    [0x00, 0x00, 0x78, 0x44, 0x44, 0x44, 0x44, 0x00], // n
    [0x00, 0x00, 0x38, 0x44, 0x44, 0x44, 0x38, 0x00], // o
    [0x00, 0x00, 0x78, 0x44, 0x44, 0x78, 0x40, 0x40], // p
    [0x00, 0x00, 0x3C, 0x44, 0x44, 0x3C, 0x04, 0x04], // q
    [0x00, 0x00, 0x58, 0x64, 0x40, 0x40, 0x40, 0x00], // r
    [0x00, 0x00, 0x3C, 0x40, 0x38, 0x04, 0x78, 0x00], // s
    [0x20, 0x20, 0x78, 0x20, 0x20, 0x20, 0x18, 0x00], // t
    [0x00, 0x00, 0x44, 0x44, 0x44, 0x44, 0x3C, 0x00], // u
    [0x00, 0x00, 0x44, 0x44, 0x44, 0x28, 0x10, 0x00], // v
    [0x00, 0x00, 0x44, 0x54, 0x54, 0x54, 0x28, 0x00], // w
    [0x00, 0x00, 0x44, 0x28, 0x10, 0x28, 0x44, 0x00], // x
    [0x00, 0x00, 0x44, 0x44, 0x44, 0x3C, 0x04, 0x38], // y
    [0x00, 0x00, 0x7C, 0x08, 0x10, 0x20, 0x7C, 0x00], // z
    [0x08, 0x10, 0x10, 0x20, 0x10, 0x10, 0x08, 0x00], // {
    [0x10, 0x10, 0x10, 0x10, 0x10, 0x10, 0x10, 0x00], // |
    [0x20, 0x10, 0x10, 0x08, 0x10, 0x10, 0x20, 0x00], // }
    [0x00, 0x00, 0x20, 0x54, 0x08, 0x00, 0x00, 0x00], // ~
];

/// 文字ジェネレータROM
#[derive(Clone)]
pub struct CharRom {
    data: Box<[u8; CHARGEN_SIZE]>,
}

impl Default for CharRom {
    fn default() -> Self {
        Self::builtin()
    }
}

impl std::fmt::Debug for CharRom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CharRom").field("size", &CHARGEN_SIZE).finish()
    }
}

/// ROMアドレスを計算
///
/// `((code << 4) & $7F0) | bank | scanline` をROMサイズでマスクする。
/// 文字コード $80-$FF は $00-$7F と同じグリフを指す。
#[inline]
pub fn glyph_address(code: u8, alt_font: bool, scanline: usize) -> usize {
    let bank = if alt_font { ALT_BANK_OFFSET } else { 0 };
    ((((code as usize) << 4) & 0x7F0) | bank | scanline) & (CHARGEN_SIZE - 1)
}

impl CharRom {
    /// 内蔵フォントで初期化
    pub fn builtin() -> Self {
        // 未定義グリフは空白（ROM上は全ビット1）
        let mut rom = CharRom {
            data: Box::new([0xFF; CHARGEN_SIZE]),
        };

        // バンク0: ASCII
        for (idx, glyph) in BUILTIN_ASCII.iter().enumerate() {
            let code = 0x20 + idx as u8;
            for (row, &bits) in glyph.iter().enumerate() {
                rom.data[glyph_address(code, false, BUILTIN_TOP + row)] = !bits;
            }
        }
        // DEL はブロック
        for scanline in 0..GLYPH_HEIGHT {
            rom.data[glyph_address(0x7F, false, scanline)] = 0x00;
        }

        // バンク1: 2x3 モザイク
        for code in 0..GLYPHS_PER_BANK as u8 {
            for scanline in 0..GLYPH_HEIGHT {
                rom.data[glyph_address(code, true, scanline)] = !mosaic_row(code, scanline);
            }
        }

        rom
    }

    /// ROMイメージから作成（$2000バイト以上必要、超過分は無視）
    pub fn from_bytes(data: &[u8]) -> Result<Self, String> {
        if data.len() < CHARGEN_SIZE {
            return Err(format!(
                "Character ROM too small: {} bytes (expected {})",
                data.len(),
                CHARGEN_SIZE
            ));
        }
        let mut rom = Box::new([0; CHARGEN_SIZE]);
        rom.copy_from_slice(&data[..CHARGEN_SIZE]);
        if data.len() > CHARGEN_SIZE {
            log::warn!("Character ROM has {} extra bytes, ignored", data.len() - CHARGEN_SIZE);
        }
        Ok(CharRom { data: rom })
    }

    /// ファイルから読み込む (char.bin)
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let data = fs::read(&path)
            .map_err(|e| format!("Failed to read character ROM {:?}: {}", path.as_ref(), e))?;
        let rom = Self::from_bytes(&data)?;
        log::info!("Loaded character ROM: {:?}", path.as_ref());
        Ok(rom)
    }

    /// グリフパターン（ROM生データ、ビット1 = 消灯）
    #[inline]
    pub fn pattern(&self, code: u8, alt_font: bool, scanline: usize) -> u8 {
        self.data[glyph_address(code, alt_font, scanline)]
    }

    /// アドレス指定で読む（マスクされる）
    #[inline]
    pub fn read(&self, address: usize) -> u8 {
        self.data[address & (CHARGEN_SIZE - 1)]
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data[..]
    }
}

/// モザイク文字の1スキャンライン（ビット1 = 点灯）
///
/// ビット0,1 = 上段 左/右、ビット2,3 = 中段、ビット4,5 = 下段。
/// 段の高さは 4/5/4 スキャンライン、左右は4ドットずつ。
fn mosaic_row(code: u8, scanline: usize) -> u8 {
    let band = match scanline {
        0..=3 => 0,
        4..=8 => 1,
        _ => 2,
    };
    let cells = (code >> (band * 2)) & 0x03;
    let mut bits = 0;
    if cells & 0x01 != 0 {
        bits |= 0xF0;
    }
    if cells & 0x02 != 0 {
        bits |= 0x0F;
    }
    bits
}
