//! ATT4425 端末
//!
//! ビデオRAM、文字ROM、ビデオ回路を統合する。
//! ビデオRAMは外部（CPU側）と共有するため RwLock で保護し、
//! 描画中は読み取りロックを保持して一貫したスナップショットから描く。

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use crate::chargen::CharRom;
use crate::rowtable::RowTable;
use crate::savestate::VideoRamState;
use crate::video::{Framebuffer, Palette, Video, REFRESH_RATE};
use crate::videoram::VideoRam;

/// 共有ビデオRAM
pub type SharedVideoRam = Arc<RwLock<VideoRam>>;

/// 端末のメイン構造体
pub struct Terminal {
    /// 共有ビデオRAM
    video_ram: SharedVideoRam,
    /// 文字ジェネレータROM
    pub chargen: CharRom,
    /// ビデオ回路
    pub video: Video,
    /// フレームカウンター
    pub frame_count: u64,
    /// 実行中フラグ
    pub running: bool,
}

impl Default for Terminal {
    fn default() -> Self {
        Self::new(CharRom::builtin())
    }
}

impl Terminal {
    pub fn new(chargen: CharRom) -> Self {
        Terminal {
            video_ram: Arc::new(RwLock::new(VideoRam::new())),
            chargen,
            video: Video::new(),
            frame_count: 0,
            running: true,
        }
    }

    /// 1フレームの時間
    pub fn frame_duration() -> Duration {
        Duration::from_micros(1_000_000 / REFRESH_RATE as u64)
    }

    /// 外部の書き込み側に渡すハンドル
    pub fn video_ram_handle(&self) -> SharedVideoRam {
        Arc::clone(&self.video_ram)
    }

    /// 読み取りロック（poisonでも中身を使う）
    pub fn video_ram(&self) -> RwLockReadGuard<'_, VideoRam> {
        self.video_ram.read().unwrap_or_else(|e| e.into_inner())
    }

    /// 書き込みロック
    pub fn video_ram_mut(&self) -> RwLockWriteGuard<'_, VideoRam> {
        self.video_ram.write().unwrap_or_else(|e| e.into_inner())
    }

    pub fn set_row_table(&mut self, table: RowTable) {
        self.video.row_table = table;
    }

    pub fn set_palette(&mut self, palette: Palette) {
        self.video.palette = palette;
    }

    /// 1フレーム描画（50Hzで呼ばれる想定、周期は呼び出し側の責任）
    pub fn render_frame(&mut self) -> &Framebuffer {
        {
            let ram = self.video_ram.read().unwrap_or_else(|e| e.into_inner());
            self.video.render(&ram, &self.chargen);
        }
        self.frame_count += 1;
        if self.frame_count % (REFRESH_RATE as u64 * 60) == 0 {
            log::debug!("Rendered {} frames", self.frame_count);
        }
        &self.video.framebuffer
    }

    /// ARGBフレーム
    pub fn get_framebuffer(&self) -> &[u32] {
        &self.video.argb
    }

    /// 状態を保存
    pub fn save_state(&self) -> VideoRamState {
        VideoRamState::capture(&self.video_ram(), self.frame_count)
    }

    /// 状態を復元
    pub fn load_state(&mut self, state: &VideoRamState) -> Result<(), String> {
        state.restore(&mut self.video_ram_mut())?;
        self.frame_count = state.frame_count;
        log::info!("Restored video RAM state (frame {})", state.frame_count);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::Pen;
    use crate::screen::ScreenWriter;
    use std::thread;

    #[test]
    fn test_frame_duration() {
        assert_eq!(Terminal::frame_duration(), Duration::from_millis(20));
    }

    #[test]
    fn test_render_counts_frames() {
        let mut term = Terminal::default();
        term.render_frame();
        term.render_frame();
        assert_eq!(term.frame_count, 2);
    }

    #[test]
    fn test_external_writer_thread() {
        let mut term = Terminal::default();
        let handle = term.video_ram_handle();
        let table = term.video.row_table;

        thread::spawn(move || {
            let mut ram = handle.write().unwrap_or_else(|e| e.into_inner());
            let mut writer = ScreenWriter::install(&mut ram, table, 0x0000);
            writer.write_cell(0, 0, 0x00, 0x7F);
        })
        .join()
        .expect("writer thread");

        let fb = term.render_frame();
        assert_eq!(fb.pixel(0, 0), Pen::Bright);
        assert_eq!(term.get_framebuffer()[0], crate::video::PHOSPHOR_GREEN);
    }

    #[test]
    fn test_render_survives_poisoned_lock() {
        let mut term = Terminal::default();
        let handle = term.video_ram_handle();

        let result = thread::spawn(move || {
            let mut ram = handle.write().unwrap_or_else(|e| e.into_inner());
            ram.write(0x0001, 0x7F);
            panic!("writer died while holding the lock");
        })
        .join();
        assert!(result.is_err());
        assert!(term.video_ram_handle().is_poisoned());

        // poison後もRAMを読めて、描画もできる
        assert_eq!(term.video_ram().read(0x0001), 0x7F);
        let fb = term.render_frame();
        assert_eq!(fb.pixel(0, 0), Pen::Bright);
        assert_eq!(term.frame_count, 1);
        term.video_ram_mut().write(0x0001, 0x00);
        assert_eq!(term.video_ram().read(0x0001), 0x00);
    }

    #[test]
    fn test_state_round_trip() {
        let mut term = Terminal::default();
        term.video_ram_mut().write(0x1234, 0x56);
        term.render_frame();
        let state = term.save_state();

        let mut other = Terminal::default();
        other.load_state(&state).expect("restore state");
        assert_eq!(other.video_ram().read(0x1234), 0x56);
        assert_eq!(other.frame_count, 1);
    }
}
