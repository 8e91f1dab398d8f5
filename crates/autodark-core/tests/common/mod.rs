use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use autodark_core::error::Result;
use autodark_core::io::service::{FitsService, ImageFileService, ImageSink, ImageSource};

const BLOCK: usize = 2880;
const CARD: usize = 80;

/// Builds small synthetic FITS files for tests.
///
/// Pixels default to zero with BITPIX 32. Header cards are emitted in the
/// order they were added, after the mandatory ones.
#[derive(Clone)]
pub struct FitsBuilder {
    width: usize,
    height: usize,
    bitpix: i64,
    data: Vec<u8>,
    cards: Vec<String>,
    declared: Option<(u64, u64)>,
}

impl FitsBuilder {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            bitpix: 32,
            data: vec![0; width * height * 4],
            cards: Vec::new(),
            declared: None,
        }
    }

    /// Row-major BITPIX 32 pixels.
    pub fn pixels_i32(mut self, values: &[i32]) -> Self {
        assert_eq!(values.len(), self.width * self.height);
        self.bitpix = 32;
        self.data = values.iter().flat_map(|v| v.to_be_bytes()).collect();
        self
    }

    /// Unsigned 16-bit pixels stored the usual way: BITPIX 16 with BZERO 32768.
    pub fn pixels_u16(mut self, values: &[u16]) -> Self {
        assert_eq!(values.len(), self.width * self.height);
        self.bitpix = 16;
        self.data = values
            .iter()
            .flat_map(|&v| ((v as i32 - 32768) as i16).to_be_bytes())
            .collect();
        self.number("BZERO", 32768.0).number("BSCALE", 1.0)
    }

    pub fn fill(self, value: i32) -> Self {
        let values = vec![value; self.width * self.height];
        self.pixels_i32(&values)
    }

    pub fn text(mut self, key: &str, value: &str) -> Self {
        self.cards.push(format!("{key:<8}= '{value}'"));
        self
    }

    pub fn number(mut self, key: &str, value: f64) -> Self {
        self.cards.push(format!("{key:<8}= {value:>20}"));
        self
    }

    /// Claim NAXIS1/NAXIS2 values that do not match the stored data.
    pub fn declare_size(mut self, naxis1: u64, naxis2: u64) -> Self {
        self.declared = Some((naxis1, naxis2));
        self
    }

    pub fn date_obs(self, value: &str) -> Self {
        self.text("DATE-OBS", value)
    }

    pub fn exptime(self, seconds: f64) -> Self {
        self.number("EXPTIME", seconds)
    }

    pub fn build(&self) -> Vec<u8> {
        let (naxis1, naxis2) = self
            .declared
            .unwrap_or((self.width as u64, self.height as u64));
        let mut cards = vec![
            format!("{:<8}= {:>20}", "SIMPLE", "T"),
            format!("{:<8}= {:>20}", "BITPIX", self.bitpix),
            format!("{:<8}= {:>20}", "NAXIS", 2),
            format!("{:<8}= {:>20}", "NAXIS1", naxis1),
            format!("{:<8}= {:>20}", "NAXIS2", naxis2),
        ];
        cards.extend(self.cards.iter().cloned());
        cards.push("END".to_string());

        let mut buf = Vec::new();
        for card in &cards {
            buf.extend_from_slice(format!("{card:<CARD$}").as_bytes());
        }
        pad(&mut buf, b' ');
        buf.extend_from_slice(&self.data);
        pad(&mut buf, 0);
        buf
    }

    pub fn write(&self, dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, self.build()).expect("write FITS fixture");
        path
    }
}

fn pad(buf: &mut Vec<u8>, fill: u8) {
    let padding = (BLOCK - buf.len() % BLOCK) % BLOCK;
    buf.extend(std::iter::repeat(fill).take(padding));
}

/// Text of every header card with the given commentary keyword (COMMENT, HISTORY).
pub fn commentary(path: &Path, keyword: &str) -> Vec<String> {
    let bytes = std::fs::read(path).expect("read FITS file");
    let mut found = Vec::new();
    for card in bytes.chunks_exact(CARD) {
        let card = String::from_utf8_lossy(card);
        if card.starts_with("END     ") {
            break;
        }
        if card[..8].trim_end() == keyword {
            found.push(card[8..].trim().to_string());
        }
    }
    found
}

/// A frame with observation time, exposure and a constant pixel value.
pub fn frame(width: usize, height: usize, date_obs: &str, exptime: f64, value: i32) -> FitsBuilder {
    FitsBuilder::new(width, height)
        .date_obs(date_obs)
        .exptime(exptime)
        .fill(value)
}

/// Input, output, dark and bias directories under one temp root.
pub struct Dirs {
    pub root: tempfile::TempDir,
    pub input: PathBuf,
    pub output: PathBuf,
    pub dark: PathBuf,
    pub bias: PathBuf,
}

pub fn dirs() -> Dirs {
    let root = tempfile::TempDir::new().expect("create temp dir");
    let make = |name: &str| {
        let p = root.path().join(name);
        std::fs::create_dir(&p).expect("create subdir");
        p
    };
    let input = make("input");
    let output = make("output");
    let dark = make("dark");
    let bias = make("bias");
    Dirs {
        input,
        output,
        dark,
        bias,
        root,
    }
}

/// FITS service that counts how many files were opened and created.
#[derive(Default)]
pub struct CountingService {
    pub opened: AtomicUsize,
    pub created: AtomicUsize,
}

impl CountingService {
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

impl ImageFileService for CountingService {
    fn name(&self) -> &str {
        "counting FITS"
    }

    fn open(&self, path: &Path) -> Result<Box<dyn ImageSource>> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        FitsService.open(path)
    }

    fn create(&self, path: &Path) -> Result<Box<dyn ImageSink>> {
        self.created.fetch_add(1, Ordering::SeqCst);
        FitsService.create(path)
    }
}
