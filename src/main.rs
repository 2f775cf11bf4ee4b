//! ATT4425 - AT&T 4425 Terminal Video Emulator
//!
//! Version 0.1
//!
//! AT&T 4425 (Teletype 56D) のビデオ回路を再現するビューア。
//!
//! # 機能
//! - 27行 x 80桁テキスト、720x351 モノクロ出力 (50Hz)
//! - 行ポインタテーブルによる行アドレス解決
//! - 文字属性（第2フォント、減光、非表示、下線、反転）
//! - 文字ROMイメージ (char.bin) または内蔵フォント
//! - ビデオRAMイメージ/セーブステートの読み込み
//!
//! # 使用方法
//! ```text
//! att4425 --chargen char.bin --vram screen.bin
//! ```

use att4425::chargen::CharRom;
use att4425::config::Config;
use att4425::rowtable::RowTable;
use att4425::savestate::VideoRamState;
use att4425::screen::draw_demo_screen;
use att4425::terminal::Terminal;
use att4425::video::{render_charset, Palette, CHARSET_HEIGHT, CHARSET_WIDTH, SCREEN_HEIGHT, SCREEN_WIDTH};
use att4425::videoram::RamFill;
use clap::Parser;
use minifb::{Key, KeyRepeat, Window, WindowOptions};
use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};

/// ATT4425 - AT&T 4425 Terminal Video Emulator
#[derive(Parser, Debug)]
#[command(name = "att4425")]
#[command(author = "ATT4425 Project")]
#[command(version = "0.1.0")]
#[command(about = "ATT4425 - AT&T 4425 Terminal Video Emulator", long_about = None)]
struct Args {
    /// 文字ROMイメージ (8KB, char.bin)
    #[arg(short, long)]
    chargen: Option<String>,

    /// セーブステート (JSON)
    #[arg(short, long)]
    state: Option<String>,

    /// ビデオRAMイメージ (32KB, $8000-$FFFF)
    #[arg(long)]
    vram: Option<String>,

    /// 起動時のRAM内容 (zero, random, demo)
    #[arg(long, default_value = "demo")]
    fill: String,

    /// ヘッドレスモード（GUIなし）
    #[arg(long)]
    headless: bool,

    /// 描画するフレーム数（ヘッドレスモード用）
    #[arg(long, default_value = "1")]
    frames: u64,

    /// 最終フレームをPNGで保存（ヘッドレスモード用）
    #[arg(long)]
    screenshot: Option<String>,

    /// 文字セット一覧をPNGで保存して終了
    #[arg(long)]
    charset: Option<String>,

    /// ウィンドウサイズ（幅x高さ、例: 1440x702）
    #[arg(long)]
    size: Option<String>,

    /// 設定ファイル
    #[arg(long)]
    config: Option<String>,

    /// ホームディレクトリ
    #[arg(long)]
    home: Option<String>,
}

/// スクリーンショットをPNGで保存
fn save_png(filename: &Path, fb: &[u32], width: usize, height: usize) -> Result<(), Box<dyn std::error::Error>> {
    let file = fs::File::create(filename)?;
    let w = std::io::BufWriter::new(file);
    let mut encoder = png::Encoder::new(w, width as u32, height as u32);
    encoder.set_color(png::ColorType::Rgb);
    encoder.set_depth(png::BitDepth::Eight);

    let mut writer = encoder.write_header()?;

    let mut rgb_data = Vec::with_capacity(width * height * 3);
    for pixel in fb.iter() {
        rgb_data.push(((pixel >> 16) & 0xFF) as u8);
        rgb_data.push(((pixel >> 8) & 0xFF) as u8);
        rgb_data.push((pixel & 0xFF) as u8);
    }

    writer.write_image_data(&rgb_data)?;
    Ok(())
}

/// ニアレストネイバースケーリング（アスペクト比維持）
fn scale_nearest_aspect(src: &[u32], src_w: usize, src_h: usize, dst: &mut [u32], dst_w: usize, dst_h: usize) {
    let (scale_w, scale_h, offset_x, offset_y) = if src_w * dst_h > dst_w * src_h {
        let scale_h = (dst_w * src_h) / src_w;
        (dst_w, scale_h, 0, (dst_h.saturating_sub(scale_h)) / 2)
    } else {
        let scale_w = (dst_h * src_w) / src_h;
        (scale_w, dst_h, (dst_w.saturating_sub(scale_w)) / 2, 0)
    };

    // 固定小数点
    let x_step = (src_w << 16) / scale_w.max(1);
    let y_step = (src_h << 16) / scale_h.max(1);

    dst.fill(0);

    for dst_y in 0..scale_h {
        let src_y = ((dst_y * y_step) >> 16).min(src_h - 1);
        let row = &src[src_y * src_w..(src_y + 1) * src_w];
        let out_row = (dst_y + offset_y) * dst_w + offset_x;
        for dst_x in 0..scale_w {
            let src_x = ((dst_x * x_step) >> 16).min(src_w - 1);
            dst[out_row + dst_x] = row[src_x];
        }
    }
}

fn parse_size(s: &str) -> Option<(usize, usize)> {
    let (w, h) = s.split_once(['x', 'X'])?;
    let w = w.trim().parse().ok()?;
    let h = h.trim().parse().ok()?;
    if w > 0 && h > 0 {
        Some((w, h))
    } else {
        None
    }
}

fn parse_fill(s: &str) -> Option<Option<RamFill>> {
    match s.to_lowercase().as_str() {
        "zero" => Some(Some(RamFill::Zero)),
        "random" => Some(Some(RamFill::Random)),
        "demo" => Some(None),
        _ => None,
    }
}

fn timestamp() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
}

fn main() {
    env_logger::init();

    let args = Args::parse();

    let (config, config_path) = Config::load_with_options(args.config.as_deref(), args.home.as_deref());
    log::debug!("Using config {:?}", config_path);

    // 文字ROM（コマンドライン > 設定ファイル > 内蔵フォント）
    let chargen_path = args
        .chargen
        .as_ref()
        .map(std::path::PathBuf::from)
        .or_else(|| config.chargen_rom.as_ref().map(|p| config.resolve_path(p)));
    let chargen = match chargen_path {
        Some(path) => match CharRom::load(&path) {
            Ok(rom) => rom,
            Err(e) => {
                log::warn!("{}, using built-in font", e);
                CharRom::builtin()
            }
        },
        None => {
            log::info!("No character ROM given, using built-in font");
            CharRom::builtin()
        }
    };

    // 文字セット一覧
    if let Some(out) = args.charset {
        let palette = Palette::monochrome(config.phosphor_color);
        let argb: Vec<u32> = render_charset(&chargen).iter().map(|&p| palette.color(p)).collect();
        match save_png(Path::new(&out), &argb, CHARSET_WIDTH, CHARSET_HEIGHT) {
            Ok(()) => println!("Character set saved: {}", out),
            Err(e) => {
                eprintln!("Failed to save {}: {}", out, e);
                std::process::exit(1);
            }
        }
        return;
    }

    let mut term = Terminal::new(chargen);
    term.set_row_table(RowTable::new(config.row_table_base as usize));
    term.set_palette(Palette::monochrome(config.phosphor_color));

    // ビデオRAMの初期内容
    let fill = match parse_fill(&args.fill) {
        Some(fill) => fill,
        None => {
            eprintln!("Unknown fill mode: {}. Using demo", args.fill);
            None
        }
    };
    {
        let mut ram = term.video_ram_mut();
        match fill {
            Some(fill) => ram.power_on(fill, &mut rand::thread_rng()),
            None => {
                if let Err(e) = draw_demo_screen(&mut ram, term.video.row_table) {
                    log::warn!("Failed to draw demo screen: {}", e);
                }
            }
        }
    }

    if let Some(ref vram_path) = args.vram {
        match fs::read(vram_path) {
            Ok(data) => {
                term.video_ram_mut().load(&data);
                log::info!("Loaded video RAM image: {}", vram_path);
            }
            Err(e) => eprintln!("Failed to load video RAM image {}: {}", vram_path, e),
        }
    }

    let state_path = args.state.clone().or_else(|| config.last_state.clone());
    if let Some(ref path) = state_path {
        match VideoRamState::load_from(path).and_then(|state| term.load_state(&state)) {
            Ok(()) => log::info!("Loaded state: {}", path),
            Err(e) => eprintln!("{}", e),
        }
    }

    println!("ATT4425 - AT&T 4425 Terminal Video Emulator v0.1");

    if args.headless {
        run_headless(&mut term, args.frames, args.screenshot.as_deref());
        return;
    }

    let (width, height) = args
        .size
        .as_deref()
        .and_then(parse_size)
        .unwrap_or((config.window_width, config.window_height));

    config.ensure_directories();
    run_with_window(&mut term, &config, width, height);
}

fn run_headless(term: &mut Terminal, frames: u64, screenshot: Option<&str>) {
    let start = Instant::now();
    for _ in 0..frames {
        term.render_frame();
    }
    log::info!("Rendered {} frames in {:?}", frames, start.elapsed());

    if let Some(out) = screenshot {
        if frames == 0 {
            term.render_frame();
        }
        match save_png(Path::new(out), term.get_framebuffer(), SCREEN_WIDTH, SCREEN_HEIGHT) {
            Ok(()) => println!("Screenshot saved: {}", out),
            Err(e) => {
                eprintln!("Failed to save screenshot {}: {}", out, e);
                std::process::exit(1);
            }
        }
    }
}

fn run_with_window(term: &mut Terminal, config: &Config, init_width: usize, init_height: usize) {
    let mut window = match Window::new(
        "ATT4425 - AT&T Teletype 4425",
        init_width,
        init_height,
        WindowOptions {
            resize: true,
            ..WindowOptions::default()
        },
    ) {
        Ok(window) => window,
        Err(e) => {
            eprintln!("Failed to create window: {}", e);
            return;
        }
    };

    window.set_target_fps(50);

    let mut scaled_buffer = vec![0u32; init_width * init_height];
    let mut last_fps_update = Instant::now();
    let mut frames_since_update = 0u32;

    while window.is_open() && term.running {
        if window.is_key_down(Key::Escape) {
            term.running = false;
            break;
        }

        if window.is_key_pressed(Key::F12, KeyRepeat::No) {
            let filename = config.screenshot_dir_path().join(format!("screenshot_{}.png", timestamp()));
            match save_png(&filename, term.get_framebuffer(), SCREEN_WIDTH, SCREEN_HEIGHT) {
                Ok(()) => println!("Screenshot saved: {}", filename.display()),
                Err(e) => log::error!("Failed to save screenshot: {}", e),
            }
        }

        if window.is_key_pressed(Key::F5, KeyRepeat::No) {
            let path = config.quicksave_path();
            match term.save_state().save_to(&path) {
                Ok(()) => println!("State saved: {}", path.display()),
                Err(e) => log::error!("{}", e),
            }
        }

        if window.is_key_pressed(Key::F9, KeyRepeat::No) {
            let path = config.quicksave_path();
            match VideoRamState::load_from(&path).and_then(|state| term.load_state(&state)) {
                Ok(()) => println!("State loaded: {}", path.display()),
                Err(e) => log::error!("{}", e),
            }
        }

        term.render_frame();

        let (win_w, win_h) = window.get_size();
        let (win_w, win_h) = (win_w.max(1), win_h.max(1));
        if scaled_buffer.len() != win_w * win_h {
            scaled_buffer.resize(win_w * win_h, 0);
        }
        scale_nearest_aspect(term.get_framebuffer(), SCREEN_WIDTH, SCREEN_HEIGHT, &mut scaled_buffer, win_w, win_h);

        if let Err(e) = window.update_with_buffer(&scaled_buffer, win_w, win_h) {
            log::error!("Failed to update window: {}", e);
            break;
        }

        frames_since_update += 1;
        if last_fps_update.elapsed() >= Duration::from_secs(1) {
            window.set_title(&format!("ATT4425 - AT&T Teletype 4425 ({} fps)", frames_since_update));
            frames_since_update = 0;
            last_fps_update = Instant::now();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("1440x702"), Some((1440, 702)));
        assert_eq!(parse_size("800X600"), Some((800, 600)));
        assert_eq!(parse_size("0x600"), None);
        assert_eq!(parse_size("big"), None);
    }

    #[test]
    fn test_parse_fill() {
        assert_eq!(parse_fill("zero"), Some(Some(RamFill::Zero)));
        assert_eq!(parse_fill("Random"), Some(Some(RamFill::Random)));
        assert_eq!(parse_fill("demo"), Some(None));
        assert_eq!(parse_fill("garbage"), None);
    }

    #[test]
    fn test_scale_nearest_doubles_pixels() {
        let src = [1, 2, 3, 4];
        let mut dst = [0u32; 16];
        scale_nearest_aspect(&src, 2, 2, &mut dst, 4, 4);
        assert_eq!(dst, [1, 1, 2, 2, 1, 1, 2, 2, 3, 3, 4, 4, 3, 3, 4, 4]);
    }

    #[test]
    fn test_scale_letterboxes() {
        let src = [7u32; 4];
        let mut dst = [9u32; 8];
        // 2x2 → 4x2 は左右に余白
        scale_nearest_aspect(&src, 2, 2, &mut dst, 4, 2);
        assert_eq!(dst, [0, 7, 7, 0, 0, 7, 7, 0]);
    }
}
