//! セーブステート機能
//!
//! ビデオRAMの内容をJSONで保存・復元する

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::videoram::{VideoRam, VIDEO_RAM_SIZE};

/// ビデオRAMの状態（セーブ用）
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct VideoRamState {
    pub version: u32, // セーブフォーマットのバージョン
    pub ram: Vec<u8>, // ビデオRAM (32KB)
    pub frame_count: u64,
}

impl VideoRamState {
    pub const CURRENT_VERSION: u32 = 1;

    pub fn capture(ram: &VideoRam, frame_count: u64) -> Self {
        VideoRamState {
            version: Self::CURRENT_VERSION,
            ram: ram.as_slice().to_vec(),
            frame_count,
        }
    }

    /// RAMに書き戻す
    pub fn restore(&self, ram: &mut VideoRam) -> Result<(), String> {
        if self.version != Self::CURRENT_VERSION {
            return Err(format!("Unsupported state version: {}", self.version));
        }
        if self.ram.len() != VIDEO_RAM_SIZE {
            return Err(format!(
                "Invalid video RAM size in state: {} bytes (expected {})",
                self.ram.len(),
                VIDEO_RAM_SIZE
            ));
        }
        ram.load(&self.ram);
        Ok(())
    }

    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<(), String> {
        let json = serde_json::to_string(self)
            .map_err(|e| format!("Failed to serialize state: {}", e))?;
        fs::write(&path, json)
            .map_err(|e| format!("Failed to write state {:?}: {}", path.as_ref(), e))?;
        Ok(())
    }

    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let json = fs::read_to_string(&path)
            .map_err(|e| format!("Failed to read state {:?}: {}", path.as_ref(), e))?;
        serde_json::from_str(&json).map_err(|e| format!("Failed to parse state: {}", e))
    }
}
