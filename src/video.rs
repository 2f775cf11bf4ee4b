//! ATT4425 ビデオ生成
//!
//! 行ポインタで各行の先頭を解決し、スキャンラインごとに80セルを
//! 9ドット幅で展開して 720x351 のフレームを作る。

use crate::attribute::{decode_cell, Attribute, Pen, BACKGROUND};
use crate::chargen::{CharRom, GLYPH_HEIGHT};
use crate::rowtable::{RowTable, VISIBLE_ROWS};
use crate::videoram::VideoRam;

/// 1行の桁数
pub const COLUMNS: usize = 80;
/// 1セルの横ドット数（8ドット + 文字間1ドット）
pub const CELL_WIDTH: usize = 9;
/// 1セルのスキャンライン数
pub const CELL_HEIGHT: usize = GLYPH_HEIGHT;
/// 1セルのバイト数（属性 + 文字コード）
pub const CELL_BYTES: usize = 2;
/// 1行のバイト数
pub const ROW_BYTES: usize = COLUMNS * CELL_BYTES;

/// 画面サイズ
pub const SCREEN_WIDTH: usize = COLUMNS * CELL_WIDTH; // 720
pub const SCREEN_HEIGHT: usize = VISIBLE_ROWS * CELL_HEIGHT; // 351

/// リフレッシュレート (Hz)
pub const REFRESH_RATE: u32 = 50;

/// 緑色蛍光体
pub const PHOSPHOR_GREEN: u32 = 0x00FF00;

/// モノクロハイライトパレット (Pen → 0x00RRGGBB)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    colors: [u32; 3],
}

impl Default for Palette {
    fn default() -> Self {
        Palette::monochrome(PHOSPHOR_GREEN)
    }
}

impl Palette {
    /// 蛍光体の色から作成（減光は3/4の輝度）
    pub fn monochrome(color: u32) -> Self {
        let scale = |shift: u32| (((color >> shift) & 0xFF) * 3 / 4) << shift;
        let dim = scale(16) | scale(8) | scale(0);
        Palette {
            colors: [0x000000, dim, color & 0xFF_FFFF],
        }
    }

    #[inline]
    pub fn color(&self, pen: Pen) -> u32 {
        self.colors[pen as usize]
    }
}

/// 1フレーム分の出力（各ピクセルは Pen）
#[derive(Clone, PartialEq, Eq)]
pub struct Framebuffer {
    pixels: Vec<Pen>,
}

impl Default for Framebuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Framebuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Framebuffer({}x{})", SCREEN_WIDTH, SCREEN_HEIGHT)
    }
}

impl Framebuffer {
    pub fn new() -> Self {
        Framebuffer {
            pixels: vec![BACKGROUND; SCREEN_WIDTH * SCREEN_HEIGHT],
        }
    }

    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> Pen {
        self.pixels[y * SCREEN_WIDTH + x]
    }

    /// 1スキャンライン
    pub fn line(&self, y: usize) -> &[Pen] {
        &self.pixels[y * SCREEN_WIDTH..(y + 1) * SCREEN_WIDTH]
    }

    fn line_mut(&mut self, y: usize) -> &mut [Pen] {
        &mut self.pixels[y * SCREEN_WIDTH..(y + 1) * SCREEN_WIDTH]
    }

    pub fn pixels(&self) -> &[Pen] {
        &self.pixels
    }

    /// ARGB (0x00RRGGBB) に変換
    pub fn to_argb(&self, palette: &Palette, out: &mut [u32]) {
        for (dst, &pen) in out.iter_mut().zip(self.pixels.iter()) {
            *dst = palette.color(pen);
        }
    }
}

/// パターン8ビット（MSBが左）と文字間1ドットを出力
#[inline]
pub fn expand_glyph(pattern: u8, fg: Pen, bg: Pen, out: &mut [Pen]) {
    for (bit, px) in out[..8].iter_mut().enumerate() {
        *px = if pattern & (0x80 >> bit) != 0 { fg } else { bg };
    }
    out[8] = bg;
}

/// フレームを合成（入力のみに依存し、状態を持たない）
pub fn compose_frame(ram: &VideoRam, chargen: &CharRom, table: &RowTable, fb: &mut Framebuffer) {
    let mut sy = 0;

    for row in 0..VISIBLE_ROWS {
        let start = table.resolve(ram, row);

        for scanline in 0..CELL_HEIGHT {
            let last_scanline = scanline == CELL_HEIGHT - 1;
            let line = fb.line_mut(sy);
            sy += 1;

            for (col, cell) in line.chunks_exact_mut(CELL_WIDTH).enumerate() {
                let offset = start + col * CELL_BYTES;
                let attr = ram.read(offset);
                let code = ram.read(offset + 1);

                let alt_font = Attribute::from_byte(attr).contains(Attribute::ALT_FONT);
                let glyph = chargen.pattern(code, alt_font, scanline);
                let style = decode_cell(attr, glyph, last_scanline);

                expand_glyph(style.pattern, style.fg, style.bg, cell);
            }
        }
    }
}

/// 文字セット一覧の画像サイズ（16x16 グリフ x 2バンク、横並び）
/// $80-$FF は $00-$7F と同じグリフとして表示される
pub const CHARSET_CODES: usize = 256;
pub const CHARSET_COLS: usize = 16;
pub const CHARSET_ROWS: usize = CHARSET_CODES / CHARSET_COLS;
pub const CHARSET_WIDTH: usize = CHARSET_COLS * CELL_WIDTH * 2;
pub const CHARSET_HEIGHT: usize = CHARSET_ROWS * CELL_HEIGHT;

/// 文字ROMの内容を一覧画像にする（左: バンク0、右: バンク1）
pub fn render_charset(chargen: &CharRom) -> Vec<Pen> {
    let mut pixels = vec![BACKGROUND; CHARSET_WIDTH * CHARSET_HEIGHT];

    for (bank, alt_font) in [false, true].into_iter().enumerate() {
        for code in 0..CHARSET_CODES {
            let gx = bank * CHARSET_COLS * CELL_WIDTH + (code % CHARSET_COLS) * CELL_WIDTH;
            let gy = (code / CHARSET_COLS) * CELL_HEIGHT;
            for scanline in 0..CELL_HEIGHT {
                let pattern = !chargen.pattern(code as u8, alt_font, scanline);
                let start = (gy + scanline) * CHARSET_WIDTH + gx;
                expand_glyph(pattern, Pen::Bright, BACKGROUND, &mut pixels[start..start + CELL_WIDTH]);
            }
        }
    }

    pixels
}

/// ビデオ回路
pub struct Video {
    /// 最新フレーム
    pub framebuffer: Framebuffer,
    /// ARGB変換済みフレーム
    pub argb: Vec<u32>,
    /// 行ポインタテーブル
    pub row_table: RowTable,
    pub palette: Palette,
}

impl Default for Video {
    fn default() -> Self {
        Self::new()
    }
}

impl Video {
    pub fn new() -> Self {
        Video {
            framebuffer: Framebuffer::new(),
            argb: vec![0; SCREEN_WIDTH * SCREEN_HEIGHT],
            row_table: RowTable::default(),
            palette: Palette::default(),
        }
    }

    /// 画面を更新（フレームバッファは毎回すべて上書き）
    pub fn render(&mut self, ram: &VideoRam, chargen: &CharRom) {
        compose_frame(ram, chargen, &self.row_table, &mut self.framebuffer);
        self.framebuffer.to_argb(&self.palette, &mut self.argb);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chargen::{glyph_address, CHARGEN_SIZE};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// 全表示行を `offset` に向けたRAM
    fn ram_with_rows_at(table: &RowTable, offset: usize) -> VideoRam {
        let mut ram = VideoRam::new();
        for row in 0..VISIBLE_ROWS {
            table.set_pointer(&mut ram, row, offset);
        }
        ram
    }

    /// 指定グリフの指定スキャンラインだけ `value` のROM（他は全消灯）
    fn rom_with(code: u8, alt_font: bool, scanline: usize, value: u8) -> CharRom {
        let mut image = vec![0xFF; CHARGEN_SIZE];
        image[glyph_address(code, alt_font, scanline)] = value;
        CharRom::from_bytes(&image).expect("valid ROM image")
    }

    fn render(ram: &VideoRam, rom: &CharRom) -> Framebuffer {
        let mut fb = Framebuffer::new();
        compose_frame(ram, rom, &RowTable::default(), &mut fb);
        fb
    }

    #[test]
    fn test_screen_dimensions() {
        assert_eq!(SCREEN_WIDTH, 720);
        assert_eq!(SCREEN_HEIGHT, 351);
        assert_eq!(ROW_BYTES, 160);
    }

    #[test]
    fn test_expand_glyph() {
        let mut out = [Pen::Dim; CELL_WIDTH];
        expand_glyph(0b1010_0001, Pen::Bright, Pen::Off, &mut out);
        assert_eq!(
            out,
            [
                Pen::Bright, Pen::Off, Pen::Bright, Pen::Off, Pen::Off,
                Pen::Off, Pen::Off, Pen::Bright, Pen::Off,
            ]
        );
        expand_glyph(0xFF, Pen::Bright, Pen::Off, &mut out);
        assert_eq!(out[8], Pen::Off);
    }

    #[test]
    fn test_blank_row_renders_background() {
        let table = RowTable::default();
        let ram = ram_with_rows_at(&table, 0);
        // ROMの $FF は消灯
        let rom = CharRom::from_bytes(&vec![0xFF; CHARGEN_SIZE]).expect("valid ROM image");
        let fb = render(&ram, &rom);
        for y in 0..CELL_HEIGHT {
            assert!(fb.line(y).iter().all(|&p| p == Pen::Off), "scanline {}", y);
        }
    }

    #[test]
    fn test_plain_and_reverse_polarity() {
        let table = RowTable::default();
        let mut ram = ram_with_rows_at(&table, 0);
        let rom = rom_with(0x41, false, 3, 0b1000_0000);

        // 属性なし: ROMビット1は消灯、残り7ドット点灯
        ram.write(0, 0x00);
        ram.write(1, 0x41);
        let fb = render(&ram, &rom);
        let cell = &fb.line(3)[..CELL_WIDTH];
        assert_eq!(cell[0], Pen::Off);
        assert!(cell[1..8].iter().all(|&p| p == Pen::Bright));
        assert_eq!(cell[8], Pen::Off);

        // 反転: 先頭1ドットのみ点灯、文字間は常に背景
        ram.write(0, 0x20);
        let fb = render(&ram, &rom);
        let cell = &fb.line(3)[..CELL_WIDTH];
        assert_eq!(cell[0], Pen::Bright);
        assert!(cell[1..].iter().all(|&p| p == Pen::Off));
    }

    #[test]
    fn test_underline_on_last_scanline() {
        let table = RowTable::default();
        let mut ram = ram_with_rows_at(&table, 0);
        let rom = CharRom::from_bytes(&vec![0xFF; CHARGEN_SIZE]).expect("valid ROM image");
        ram.write(2, 0x10);
        ram.write(3, 0x5A);
        let fb = render(&ram, &rom);
        let underline = &fb.line(CELL_HEIGHT - 1)[CELL_WIDTH..2 * CELL_WIDTH];
        assert!(underline[..8].iter().all(|&p| p == Pen::Bright));
        assert_eq!(underline[8], Pen::Off);
        // 他のスキャンラインには影響しない
        assert!(fb.line(CELL_HEIGHT - 2).iter().all(|&p| p == Pen::Off));
    }

    #[test]
    fn test_conceal_hides_everything() {
        let table = RowTable::default();
        let mut ram = ram_with_rows_at(&table, 0);
        let rom = CharRom::builtin();
        for attr in 0..=255u8 {
            if attr & 0x04 == 0 {
                continue;
            }
            ram.write(0, attr);
            ram.write(1, b'W');
            let fb = render(&ram, &rom);
            for y in 0..CELL_HEIGHT {
                assert!(fb.line(y)[..CELL_WIDTH].iter().all(|&p| p == Pen::Off));
            }
        }
    }

    #[test]
    fn test_dim_uses_dim_pen() {
        let table = RowTable::default();
        let mut ram = ram_with_rows_at(&table, 0);
        let rom = CharRom::builtin();
        ram.write(0, 0x02);
        ram.write(1, 0x7F);
        let fb = render(&ram, &rom);
        assert!(fb.line(0)[..8].iter().all(|&p| p == Pen::Dim));
    }

    #[test]
    fn test_alt_font_selects_second_bank() {
        let table = RowTable::default();
        let mut ram = ram_with_rows_at(&table, 0);
        let rom = rom_with(0x05, true, 7, 0x00);
        ram.write(1, 0x05);

        ram.write(0, 0x00);
        let fb = render(&ram, &rom);
        assert!(fb.line(7)[..8].iter().all(|&p| p == Pen::Off));

        ram.write(0, 0x01);
        let fb = render(&ram, &rom);
        assert!(fb.line(7)[..8].iter().all(|&p| p == Pen::Bright));
        assert!(fb.line(6)[..8].iter().all(|&p| p == Pen::Off));
    }

    #[test]
    fn test_row_pointers_drive_row_order() {
        let table = RowTable::default();
        let mut ram = VideoRam::new();
        let rom = CharRom::builtin();
        // 行0を $0200、行1を $0000 に向ける（物理順と逆）
        table.set_pointer(&mut ram, 0, 0x0200);
        table.set_pointer(&mut ram, 1, 0x0000);
        for row in 2..VISIBLE_ROWS {
            table.set_pointer(&mut ram, row, 0x1000);
        }
        ram.write(0x0200, 0x00);
        ram.write(0x0201, 0x7F);

        let fb = render(&ram, &rom);
        assert_eq!(fb.pixel(0, 0), Pen::Bright);
        assert_eq!(fb.pixel(0, CELL_HEIGHT), Pen::Off);
    }

    #[test]
    fn test_row_wrapping_past_end_of_ram() {
        let table = RowTable::default();
        let mut ram = ram_with_rows_at(&table, 0x7FFE);
        let rom = CharRom::builtin();
        // 2桁目は RAM先頭にラップする
        ram.write(0x0000, 0x00);
        ram.write(0x0001, 0x7F);
        let fb = render(&ram, &rom);
        assert_eq!(fb.pixel(CELL_WIDTH, 0), Pen::Bright);
    }

    #[test]
    fn test_render_is_idempotent_on_garbage() {
        let mut rng = StdRng::seed_from_u64(0x4425);
        let mut ram = VideoRam::new();
        ram.randomize(&mut rng);
        let rom = CharRom::builtin();

        let first = render(&ram, &rom);
        let mut fb = first.clone();
        compose_frame(&ram, &rom, &RowTable::default(), &mut fb);
        assert_eq!(first, fb);
    }

    #[test]
    fn test_video_render_fills_argb() {
        let table = RowTable::default();
        let mut ram = ram_with_rows_at(&table, 0);
        ram.write(0, 0x00);
        ram.write(1, 0x7F);
        let mut video = Video::new();
        video.render(&ram, &CharRom::builtin());
        assert_eq!(video.argb[0], PHOSPHOR_GREEN);
        assert_eq!(video.argb[8], 0);
    }

    #[test]
    fn test_palette_levels() {
        let palette = Palette::monochrome(0xFFFFFF);
        assert_eq!(palette.color(Pen::Off), 0);
        assert_eq!(palette.color(Pen::Bright), 0xFFFFFF);
        assert_eq!(palette.color(Pen::Dim), 0xBFBFBF);
        assert_eq!(Palette::default().color(Pen::Dim), 0x00BF00);
    }

    #[test]
    fn test_charset_sheet() {
        let pixels = render_charset(&CharRom::builtin());
        assert_eq!(pixels.len(), CHARSET_WIDTH * CHARSET_HEIGHT);
        // バンク1のグリフ $3F（全ブロック）は全点灯
        let code = 0x3F;
        let gx = CHARSET_COLS * CELL_WIDTH + (code % CHARSET_COLS) * CELL_WIDTH;
        let gy = (code / CHARSET_COLS) * CELL_HEIGHT;
        assert_eq!(pixels[gy * CHARSET_WIDTH + gx], Pen::Bright);
    }

    #[test]
    fn test_charset_sheet_is_16_by_16_per_bank() {
        assert_eq!(CHARSET_WIDTH / CELL_WIDTH, 2 * 16);
        assert_eq!(CHARSET_HEIGHT / CELL_HEIGHT, 16);

        // $80-$FF は $00-$7F の繰り返し
        let pixels = render_charset(&CharRom::builtin());
        let half = (CHARSET_ROWS / 2) * CELL_HEIGHT * CHARSET_WIDTH;
        assert_eq!(&pixels[..half], &pixels[half..]);
        assert!(pixels[..half].iter().any(|&p| p == Pen::Bright));
    }
}
