//! Reading and writing 16-bit image sequences.
//!
//! The pipeline only sees the [`ImageSequence`] trait; the real
//! implementation walks a directory of TIFF files, and tests use the
//! in-memory [`MemorySequence`].

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use image::{DynamicImage, ImageBuffer, Rgb};
use ndarray::Array3;

use crate::error::{Result, SkyscrubError};

/// A sequence of equally sized 16-bit RGB frames.
///
/// Frames are addressed by index in sequence order. Writes refuse to
/// overwrite an existing output frame.
pub trait ImageSequence: Send + Sync {
    fn frame_count(&self) -> usize;

    /// Read one frame as a `height x width x 3` array.
    fn read_frame(&self, index: usize) -> Result<Array3<u16>>;

    /// Write one repaired output frame.
    fn write_frame(&self, index: usize, image: &Array3<u16>) -> Result<()>;

    /// Write one test-paint debug frame.
    fn write_test_frame(&self, index: usize, image: &Array3<u16>) -> Result<()>;
}

/// Compare filenames so that embedded numbers sort numerically, putting
/// `frame_9` before `frame_10`.
fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut a_chars = a.chars().peekable();
    let mut b_chars = b.chars().peekable();

    loop {
        match (a_chars.peek().copied(), b_chars.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(ac), Some(bc)) => {
                if ac.is_ascii_digit() && bc.is_ascii_digit() {
                    let mut a_num = 0u64;
                    while let Some(c) = a_chars.peek().and_then(|c| c.to_digit(10)) {
                        a_num = a_num * 10 + c as u64;
                        a_chars.next();
                    }
                    let mut b_num = 0u64;
                    while let Some(c) = b_chars.peek().and_then(|c| c.to_digit(10)) {
                        b_num = b_num * 10 + c as u64;
                        b_chars.next();
                    }
                    match a_num.cmp(&b_num) {
                        Ordering::Equal => {}
                        unequal => return unequal,
                    }
                } else {
                    match ac.cmp(&bc) {
                        Ordering::Equal => {
                            a_chars.next();
                            b_chars.next();
                        }
                        unequal => return unequal,
                    }
                }
            }
        }
    }
}

fn is_tiff(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("tif") || e.eq_ignore_ascii_case("tiff"))
        .unwrap_or(false)
}

fn buffer_to_array(image: DynamicImage) -> Option<Array3<u16>> {
    let rgb = image.into_rgb16();
    let (width, height) = rgb.dimensions();
    Array3::from_shape_vec((height as usize, width as usize, 3), rgb.into_raw()).ok()
}

fn array_to_image(array: &Array3<u16>, path: &Path) -> Result<DynamicImage> {
    let (height, width, channels) = array.dim();
    if channels != 3 {
        return Err(SkyscrubError::UnsupportedImage {
            path: path.to_path_buf(),
            reason: format!("expected 3 channels, got {channels}"),
        });
    }
    let mut raw: Vec<u16> = Vec::with_capacity(height * width * 3);
    for y in 0..height {
        for x in 0..width {
            for c in 0..3 {
                raw.push(array[[y, x, c]]);
            }
        }
    }
    let buffer = ImageBuffer::<Rgb<u16>, _>::from_raw(width as u32, height as u32, raw).ok_or(
        SkyscrubError::UnsupportedImage {
            path: path.to_path_buf(),
            reason: "buffer dimensions do not match array".into(),
        },
    )?;
    Ok(DynamicImage::ImageRgb16(buffer))
}

fn write_tiff(dir: &Path, filename: &str, array: &Array3<u16>) -> Result<()> {
    let path = dir.join(filename);
    if path.exists() {
        return Err(SkyscrubError::WouldOverwrite(path));
    }
    fs::create_dir_all(dir).map_err(|e| SkyscrubError::io(dir, e))?;
    let image = array_to_image(array, &path)?;
    image
        .save(&path)
        .map_err(|e| SkyscrubError::image(&path, e))?;
    log::info!("wrote {}", path.display());
    Ok(())
}

/// A directory of TIFF frames, ordered by natural filename sort. Output
/// frames keep their input filenames under the output directory.
pub struct TiffSequence {
    input_dir: PathBuf,
    output_dir: PathBuf,
    test_output_dir: Option<PathBuf>,
    filenames: Vec<String>,
}

impl TiffSequence {
    pub fn open(
        input_dir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
        test_output_dir: Option<PathBuf>,
    ) -> Result<Self> {
        let input_dir = input_dir.into();
        let mut filenames: Vec<String> = fs::read_dir(&input_dir)
            .map_err(|e| SkyscrubError::io(&input_dir, e))?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| is_tiff(path))
            .filter_map(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .map(str::to_string)
            })
            .collect();
        filenames.sort_by(|a, b| natural_cmp(a, b));
        log::info!(
            "image sequence at {} has {} frames",
            input_dir.display(),
            filenames.len()
        );
        Ok(TiffSequence {
            input_dir,
            output_dir: output_dir.into(),
            test_output_dir,
            filenames,
        })
    }

    fn filename(&self, index: usize) -> Result<&str> {
        self.filenames
            .get(index)
            .map(String::as_str)
            .ok_or_else(|| {
                SkyscrubError::Config(format!(
                    "frame index {} out of range, sequence has {} frames",
                    index,
                    self.filenames.len()
                ))
            })
    }
}

impl ImageSequence for TiffSequence {
    fn frame_count(&self) -> usize {
        self.filenames.len()
    }

    fn read_frame(&self, index: usize) -> Result<Array3<u16>> {
        let path = self.input_dir.join(self.filename(index)?);
        let image = image::open(&path).map_err(|e| SkyscrubError::image(&path, e))?;
        buffer_to_array(image).ok_or(SkyscrubError::UnsupportedImage {
            path,
            reason: "could not reshape pixel data".into(),
        })
    }

    fn write_frame(&self, index: usize, image: &Array3<u16>) -> Result<()> {
        write_tiff(&self.output_dir, self.filename(index)?, image)
    }

    fn write_test_frame(&self, index: usize, image: &Array3<u16>) -> Result<()> {
        match &self.test_output_dir {
            Some(dir) => write_tiff(dir, self.filename(index)?, image),
            None => Ok(()),
        }
    }
}

/// In-memory sequence for tests and previews. Written frames are captured
/// instead of hitting the filesystem, with the same no-overwrite rule.
pub struct MemorySequence {
    frames: Vec<Array3<u16>>,
    outputs: Mutex<HashMap<usize, Array3<u16>>>,
    test_outputs: Mutex<HashMap<usize, Array3<u16>>>,
}

impl MemorySequence {
    pub fn new(frames: Vec<Array3<u16>>) -> Self {
        MemorySequence {
            frames,
            outputs: Mutex::new(HashMap::new()),
            test_outputs: Mutex::new(HashMap::new()),
        }
    }

    pub fn output(&self, index: usize) -> Option<Array3<u16>> {
        match self.outputs.lock() {
            Ok(outputs) => outputs.get(&index).cloned(),
            Err(_) => None,
        }
    }

    pub fn output_count(&self) -> usize {
        self.outputs.lock().map(|o| o.len()).unwrap_or(0)
    }

    pub fn test_output(&self, index: usize) -> Option<Array3<u16>> {
        match self.test_outputs.lock() {
            Ok(outputs) => outputs.get(&index).cloned(),
            Err(_) => None,
        }
    }
}

impl ImageSequence for MemorySequence {
    fn frame_count(&self) -> usize {
        self.frames.len()
    }

    fn read_frame(&self, index: usize) -> Result<Array3<u16>> {
        self.frames.get(index).cloned().ok_or_else(|| {
            SkyscrubError::Config(format!("frame index {index} out of range"))
        })
    }

    fn write_frame(&self, index: usize, image: &Array3<u16>) -> Result<()> {
        let mut outputs = match self.outputs.lock() {
            Ok(outputs) => outputs,
            Err(poisoned) => poisoned.into_inner(),
        };
        if outputs.contains_key(&index) {
            return Err(SkyscrubError::WouldOverwrite(PathBuf::from(format!(
                "memory frame {index}"
            ))));
        }
        outputs.insert(index, image.clone());
        Ok(())
    }

    fn write_test_frame(&self, index: usize, image: &Array3<u16>) -> Result<()> {
        let mut outputs = match self.test_outputs.lock() {
            Ok(outputs) => outputs,
            Err(poisoned) => poisoned.into_inner(),
        };
        outputs.insert(index, image.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_natural_sort_order() {
        let mut names = vec![
            "frame_10.tif".to_string(),
            "frame_2.tif".to_string(),
            "frame_1.tif".to_string(),
        ];
        names.sort_by(|a, b| natural_cmp(a, b));
        assert_eq!(names, vec!["frame_1.tif", "frame_2.tif", "frame_10.tif"]);
    }

    #[test]
    fn test_natural_sort_mixed() {
        assert_eq!(natural_cmp("a2b", "a10b"), Ordering::Less);
        assert_eq!(natural_cmp("a10b", "a10b"), Ordering::Equal);
        assert_eq!(natural_cmp("b1", "a2"), Ordering::Greater);
    }

    #[test]
    fn test_tiff_roundtrip() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();

        let mut frame = Array3::<u16>::zeros((4, 6, 3));
        frame[[1, 2, 0]] = 40000;
        frame[[3, 5, 2]] = 123;
        array_to_image(&frame, Path::new("x"))
            .unwrap()
            .save(input.path().join("frame_1.tif"))
            .unwrap();

        let seq = TiffSequence::open(input.path(), output.path(), None).unwrap();
        assert_eq!(seq.frame_count(), 1);
        let read = seq.read_frame(0).unwrap();
        assert_eq!(read, frame);

        seq.write_frame(0, &read).unwrap();
        let written = image::open(output.path().join("frame_1.tif")).unwrap();
        assert_eq!(buffer_to_array(written).unwrap(), frame);
    }

    #[test]
    fn test_write_refuses_overwrite() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();

        let frame = Array3::<u16>::zeros((2, 2, 3));
        array_to_image(&frame, Path::new("x"))
            .unwrap()
            .save(input.path().join("a.tif"))
            .unwrap();

        let seq = TiffSequence::open(input.path(), output.path(), None).unwrap();
        seq.write_frame(0, &frame).unwrap();
        match seq.write_frame(0, &frame) {
            Err(SkyscrubError::WouldOverwrite(_)) => {}
            other => panic!("expected WouldOverwrite, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_non_tiff_files_ignored() {
        let input = TempDir::new().unwrap();
        std::fs::write(input.path().join("notes.txt"), "x").unwrap();
        let frame = Array3::<u16>::zeros((2, 2, 3));
        array_to_image(&frame, Path::new("x"))
            .unwrap()
            .save(input.path().join("a.tif"))
            .unwrap();

        let seq = TiffSequence::open(input.path(), input.path(), None).unwrap();
        assert_eq!(seq.frame_count(), 1);
    }

    #[test]
    fn test_memory_sequence_overwrite() {
        let frame = Array3::<u16>::zeros((2, 2, 3));
        let seq = MemorySequence::new(vec![frame.clone()]);
        seq.write_frame(0, &frame).unwrap();
        assert!(seq.write_frame(0, &frame).is_err());
        assert_eq!(seq.output(0).unwrap(), frame);
    }
}
