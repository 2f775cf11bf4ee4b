//! 設定ファイル管理モジュール
//!
//! 端末の設定をJSON形式で永続化

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::rowtable::ROW_TABLE_BASE;
use crate::video::PHOSPHOR_GREEN;

/// 設定ファイルのデフォルトファイル名
const CONFIG_FILENAME: &str = "att4425_config.json";

/// 実行ファイルのディレクトリを取得
pub fn get_exe_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|p| p.to_path_buf()))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// 相対パスを指定されたベースディレクトリからの絶対パスに解決
pub fn resolve_path_with_base(base: &str, relative: &str) -> PathBuf {
    let path = Path::new(relative);
    if path.is_absolute() {
        path.to_path_buf()
    } else if base.is_empty() {
        get_exe_dir().join(relative)
    } else {
        let base_path = Path::new(base);
        if base_path.is_absolute() {
            base_path.join(relative)
        } else {
            get_exe_dir().join(base).join(relative)
        }
    }
}

/// 設定ファイルのパスを取得
pub fn get_config_path() -> PathBuf {
    get_exe_dir().join(CONFIG_FILENAME)
}

/// 端末設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// ホームディレクトリ（相対パスの基準）
    /// 空の場合は実行ファイルのディレクトリを使用
    #[serde(default)]
    pub home: String,
    /// 文字ROMイメージのパス（未指定なら内蔵フォント）
    #[serde(default)]
    pub chargen_rom: Option<String>,
    /// 最後に使用したセーブステート
    #[serde(default)]
    pub last_state: Option<String>,
    /// ウィンドウサイズ（幅）
    #[serde(default = "default_window_width")]
    pub window_width: usize,
    /// ウィンドウサイズ（高さ）
    #[serde(default = "default_window_height")]
    pub window_height: usize,
    /// 蛍光体の色 (0xRRGGBB)
    #[serde(default = "default_phosphor_color")]
    pub phosphor_color: u32,
    /// 行ポインタテーブルのRAMオフセット
    #[serde(default = "default_row_table_base")]
    pub row_table_base: u16,
    /// スクリーンショットディレクトリ
    #[serde(default = "default_screenshot_dir")]
    pub screenshot_dir: String,
    /// セーブデータディレクトリ
    #[serde(default = "default_save_dir")]
    pub save_dir: String,
}

fn default_window_width() -> usize { 1440 }
fn default_window_height() -> usize { 702 }
fn default_phosphor_color() -> u32 { PHOSPHOR_GREEN }
fn default_row_table_base() -> u16 { ROW_TABLE_BASE as u16 }
fn default_screenshot_dir() -> String { "screenshots".to_string() }
fn default_save_dir() -> String { "saves".to_string() }

impl Default for Config {
    fn default() -> Self {
        Config {
            home: String::new(),
            chargen_rom: None,
            last_state: None,
            window_width: default_window_width(),
            window_height: default_window_height(),
            phosphor_color: default_phosphor_color(),
            row_table_base: default_row_table_base(),
            screenshot_dir: default_screenshot_dir(),
            save_dir: default_save_dir(),
        }
    }
}

impl Config {
    /// 設定ファイルを読み込む（実行ファイルと同じディレクトリから）
    pub fn load() -> Self {
        Self::load_from(get_config_path())
    }

    /// オプション指定で設定ファイルを読み込む
    /// 優先順位:
    /// 1. config_path が指定されている場合はそれを使用
    /// 2. home_path が指定されている場合は home_path/att4425_config.json を探す
    /// 3. 実行ファイルディレクトリの att4425_config.json
    ///
    /// home_path が指定されている場合、読み込んだ設定の home を上書き
    pub fn load_with_options(config_path: Option<&str>, home_path: Option<&str>) -> (Self, PathBuf) {
        let config_file_path = if let Some(path) = config_path {
            PathBuf::from(path)
        } else if let Some(home) = home_path {
            let home_config = Path::new(home).join(CONFIG_FILENAME);
            if home_config.exists() {
                home_config
            } else {
                get_config_path()
            }
        } else {
            get_config_path()
        };

        let mut config = Self::load_from(&config_file_path);

        if let Some(home) = home_path {
            config.home = home.to_string();
        }

        (config, config_file_path)
    }

    /// 指定したパスから設定を読み込む
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(config) => {
                    log::info!("Loaded config: {:?}", path.as_ref());
                    config
                }
                Err(e) => {
                    log::warn!("Failed to parse config {:?}: {}, using defaults", path.as_ref(), e);
                    Config::default()
                }
            },
            Err(_) => Config::default(),
        }
    }

    /// 設定ファイルを保存する（実行ファイルと同じディレクトリに）
    pub fn save(&self) -> Result<(), String> {
        self.save_to(get_config_path())
    }

    /// 指定したパスに設定を保存する
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<(), String> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize config: {}", e))?;
        fs::write(path, json)
            .map_err(|e| format!("Failed to write config: {}", e))?;
        Ok(())
    }

    /// 相対パスをhomeからの絶対パスに解決
    pub fn resolve_path(&self, relative: &str) -> PathBuf {
        resolve_path_with_base(&self.home, relative)
    }

    /// スクリーンショットディレクトリの絶対パスを取得
    pub fn screenshot_dir_path(&self) -> PathBuf {
        self.resolve_path(&self.screenshot_dir)
    }

    /// セーブディレクトリの絶対パスを取得
    pub fn save_dir_path(&self) -> PathBuf {
        self.resolve_path(&self.save_dir)
    }

    /// クイックセーブのパス
    pub fn quicksave_path(&self) -> PathBuf {
        self.save_dir_path().join("quicksave.json")
    }

    /// ディレクトリが存在しなければ作成
    pub fn ensure_directories(&self) {
        for dir in [self.screenshot_dir_path(), self.save_dir_path()] {
            if !dir.exists() {
                if let Err(e) = fs::create_dir_all(&dir) {
                    log::warn!("Failed to create {:?}: {}", dir, e);
                }
            }
        }
    }
}
