//! ATT4425 - AT&T 4425 端末ビデオエミュレータ
//!
//! AT&T 4425 (Teletype 56D) のビデオ生成回路を再現する:
//! - 27行 x 80桁、1文字 9x13 ドット、720x351 モノクロ出力
//! - ビデオRAM内の行ポインタテーブルによる行アドレス解決
//! - 文字属性（第2フォント、減光、非表示、下線、反転）
//! - 文字ジェネレータROM（外部イメージまたは内蔵フォント）

pub mod attribute;
pub mod chargen;
pub mod config;
pub mod rowtable;
pub mod savestate;
pub mod screen;
pub mod terminal;
pub mod video;
pub mod videoram;
