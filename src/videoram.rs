//! ビデオRAM
//!
//! Z80側のアドレス $8000-$FFFF に配置される 32KB の共有RAM。
//! CPU（外部）が書き込み、ビデオ回路はフレームごとに読み出すだけ。
//! 範囲外のアドレスはすべてラップアラウンドさせ、パニックさせない。

use rand::Rng;

/// ビデオRAMの論理ベースアドレス
pub const VIDEO_RAM_BASE: u16 = 0x8000;
/// ビデオRAMのサイズ (32KB)
pub const VIDEO_RAM_SIZE: usize = 0x8000;
/// オフセットのマスク
pub const VIDEO_RAM_MASK: usize = VIDEO_RAM_SIZE - 1;

/// 電源投入時のRAM内容
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RamFill {
    /// すべて0
    Zero,
    /// ランダム（実機の電源投入直後に近い）
    Random,
}

/// 32KB ビデオRAM
#[derive(Clone)]
pub struct VideoRam {
    ram: Box<[u8; VIDEO_RAM_SIZE]>,
}

impl Default for VideoRam {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for VideoRam {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoRam")
            .field("size", &VIDEO_RAM_SIZE)
            .finish()
    }
}

impl VideoRam {
    pub fn new() -> Self {
        VideoRam {
            ram: Box::new([0; VIDEO_RAM_SIZE]),
        }
    }

    /// 論理アドレスをRAMオフセットに変換（$8000未満もラップする）
    #[inline]
    pub fn offset_of(address: u16) -> usize {
        address.wrapping_sub(VIDEO_RAM_BASE) as usize & VIDEO_RAM_MASK
    }

    /// オフセットで1バイト読む（オフセットはマスクされる）
    #[inline]
    pub fn read(&self, offset: usize) -> u8 {
        self.ram[offset & VIDEO_RAM_MASK]
    }

    /// オフセットで1バイト書く
    #[inline]
    pub fn write(&mut self, offset: usize, value: u8) {
        self.ram[offset & VIDEO_RAM_MASK] = value;
    }

    /// CPUから見た論理アドレスで読む
    pub fn read_logical(&self, address: u16) -> u8 {
        self.ram[Self::offset_of(address)]
    }

    /// CPUから見た論理アドレスで書く
    pub fn write_logical(&mut self, address: u16, value: u8) {
        self.ram[Self::offset_of(address)] = value;
    }

    /// RAM全体を同じ値で埋める
    pub fn fill(&mut self, value: u8) {
        self.ram.fill(value);
    }

    /// RAM全体を乱数で埋める
    pub fn randomize<R: Rng>(&mut self, rng: &mut R) {
        rng.fill(&mut self.ram[..]);
    }

    /// 電源投入時の状態にする
    pub fn power_on<R: Rng>(&mut self, fill: RamFill, rng: &mut R) {
        match fill {
            RamFill::Zero => self.fill(0),
            RamFill::Random => self.randomize(rng),
        }
    }

    /// RAMイメージを先頭からコピー（長すぎる分は無視、足りない分はそのまま）
    pub fn load(&mut self, data: &[u8]) {
        let len = data.len().min(VIDEO_RAM_SIZE);
        self.ram[..len].copy_from_slice(&data[..len]);
        if data.len() > VIDEO_RAM_SIZE {
            log::warn!(
                "Video RAM image is {} bytes, ignoring the last {} bytes",
                data.len(),
                data.len() - VIDEO_RAM_SIZE
            );
        }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.ram[..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_logical_address_mapping() {
        assert_eq!(VideoRam::offset_of(0x8000), 0);
        assert_eq!(VideoRam::offset_of(0xFFFF), 0x7FFF);
        // $8000未満はラップ
        assert_eq!(VideoRam::offset_of(0x0000), 0);
        assert_eq!(VideoRam::offset_of(0x7FFF), 0x7FFF);

        let mut ram = VideoRam::new();
        ram.write_logical(0xC123, 0x5A);
        assert_eq!(ram.read(0x4123), 0x5A);
        assert_eq!(ram.read_logical(0xC123), 0x5A);
    }

    #[test]
    fn test_out_of_range_offset_wraps() {
        let mut ram = VideoRam::new();
        ram.write(VIDEO_RAM_SIZE + 3, 0x77);
        assert_eq!(ram.read(3), 0x77);
        assert_eq!(ram.read(usize::MAX), ram.read(VIDEO_RAM_MASK));
    }

    #[test]
    fn test_load_truncates_long_image() {
        let mut ram = VideoRam::new();
        let image = vec![0xAB; VIDEO_RAM_SIZE + 16];
        ram.load(&image);
        assert!(ram.as_slice().iter().all(|&b| b == 0xAB));

        let mut ram = VideoRam::new();
        ram.load(&[1, 2, 3]);
        assert_eq!(&ram.as_slice()[..4], &[1, 2, 3, 0]);
    }

    #[test]
    fn test_power_on_fill() {
        let mut rng = StdRng::seed_from_u64(4425);
        let mut ram = VideoRam::new();
        ram.power_on(RamFill::Random, &mut rng);
        assert!(ram.as_slice().iter().any(|&b| b != 0));
        ram.power_on(RamFill::Zero, &mut rng);
        assert!(ram.as_slice().iter().all(|&b| b == 0));
    }
}
