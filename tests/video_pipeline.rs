//! Video pipeline tests using injected fake collaborators.
//!
//! The fakes stand in for ffprobe/ffmpeg so the full stage sequence --
//! probing, extraction, parallel frame glitching, reassembly, cleanup --
//! runs without external binaries.

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use assert_matches::assert_matches;
use async_trait::async_trait;

use glitch_av::{Prober, Transcoder, VideoInfo};
use glitchart::{CorruptionSpec, Error, Rational, VideoPipeline};

/// Shared observations recorded by the fakes.
#[derive(Default)]
struct Recorded {
    frames_dir: Option<PathBuf>,
    audio_source: Option<Option<PathBuf>>,
    /// Frame bytes as they looked at reassembly time, in index order.
    frame_bytes: Vec<Vec<u8>>,
}

struct FakeProber {
    has_audio: bool,
    reassembled_count: u64,
}

#[async_trait]
impl Prober for FakeProber {
    fn name(&self) -> &'static str {
        "fake-prober"
    }

    async fn probe(&self, _path: &Path) -> glitchart::Result<VideoInfo> {
        Ok(VideoInfo {
            frame_rate: Rational::new(30, 1),
            duration: Some(Duration::from_secs_f64(10.0 / 30.0)),
            has_audio: self.has_audio,
        })
    }

    async fn count_frames(&self, _path: &Path) -> glitchart::Result<u64> {
        Ok(self.reassembled_count)
    }
}

struct FakeTranscoder {
    frame_count: u64,
    /// Index of a frame to write as a zero-byte file, if any.
    empty_frame: Option<u64>,
    recorded: Arc<Mutex<Recorded>>,
}

fn frame_jpeg() -> Vec<u8> {
    let mut img = image::RgbImage::new(24, 24);
    for (x, y, px) in img.enumerate_pixels_mut() {
        *px = image::Rgb([(x * 10) as u8, (y * 10) as u8, 128]);
    }
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Jpeg)
        .unwrap();
    buf
}

#[async_trait]
impl Transcoder for FakeTranscoder {
    fn name(&self) -> &'static str {
        "fake-transcoder"
    }

    async fn extract_frames(
        &self,
        _input: &Path,
        _frame_rate: Rational,
        frames_dir: &Path,
    ) -> glitchart::Result<u64> {
        self.recorded.lock().unwrap().frames_dir = Some(frames_dir.to_path_buf());
        let jpeg = frame_jpeg();
        for index in 0..self.frame_count {
            let path = frames_dir.join(format!("{:08}.jpg", index + 1));
            if self.empty_frame == Some(index) {
                std::fs::write(&path, b"")?;
            } else {
                std::fs::write(&path, &jpeg)?;
            }
        }
        Ok(self.frame_count)
    }

    async fn reassemble(
        &self,
        frames_dir: &Path,
        _frame_rate: Rational,
        audio_source: Option<&Path>,
        output: &Path,
    ) -> glitchart::Result<()> {
        let mut recorded = self.recorded.lock().unwrap();
        recorded.audio_source = Some(audio_source.map(|p| p.to_path_buf()));
        for index in 0..self.frame_count {
            let path = frames_dir.join(format!("{:08}.jpg", index + 1));
            recorded.frame_bytes.push(std::fs::read(&path)?);
        }
        std::fs::write(output, b"muxed")?;
        Ok(())
    }
}

fn pipeline(
    has_audio: bool,
    frame_count: u64,
    reassembled_count: u64,
    empty_frame: Option<u64>,
) -> (VideoPipeline, Arc<Mutex<Recorded>>) {
    let recorded = Arc::new(Mutex::new(Recorded::default()));
    let prober = Arc::new(FakeProber {
        has_audio,
        reassembled_count,
    });
    let transcoder = Arc::new(FakeTranscoder {
        frame_count,
        empty_frame,
        recorded: Arc::clone(&recorded),
    });
    (VideoPipeline::with_collaborators(prober, transcoder), recorded)
}

fn input_file(dir: &Path) -> PathBuf {
    let input = dir.join("clip.mp4");
    std::fs::write(&input, b"container bytes").unwrap();
    input
}

#[tokio::test]
async fn glitches_all_frames_and_reassembles() {
    let dir = tempfile::tempdir().unwrap();
    let input = input_file(dir.path());
    let (pipeline, recorded) = pipeline(true, 10, 10, None);

    let spec = CorruptionSpec::default().with_amount(0.02).with_seed(42);
    let output = pipeline.glitch(&input, &spec, 4).await.unwrap();

    assert_eq!(output, dir.path().join("clip_glitch.mp4"));
    assert!(output.exists());

    let recorded = recorded.lock().unwrap();
    assert_eq!(recorded.frame_bytes.len(), 10);
    // Every frame was rewritten as a still-decodable JPEG.
    let original = frame_jpeg();
    for bytes in &recorded.frame_bytes {
        assert_ne!(bytes, &original);
        assert!(
            image::load_from_memory_with_format(bytes, image::ImageFormat::Jpeg).is_ok()
        );
    }
}

#[tokio::test]
async fn audio_track_carried_when_present() {
    let dir = tempfile::tempdir().unwrap();
    let input = input_file(dir.path());
    let (pipeline, recorded) = pipeline(true, 3, 3, None);

    let spec = CorruptionSpec::default().with_amount(0.02).with_seed(1);
    pipeline.glitch(&input, &spec, 2).await.unwrap();

    let recorded = recorded.lock().unwrap();
    assert_eq!(recorded.audio_source, Some(Some(input)));
}

#[tokio::test]
async fn no_audio_when_input_has_none() {
    let dir = tempfile::tempdir().unwrap();
    let input = input_file(dir.path());
    let (pipeline, recorded) = pipeline(false, 3, 3, None);

    let spec = CorruptionSpec::default().with_amount(0.02).with_seed(1);
    pipeline.glitch(&input, &spec, 2).await.unwrap();

    let recorded = recorded.lock().unwrap();
    assert_eq!(recorded.audio_source, Some(None));
}

#[tokio::test]
async fn fixed_seed_reproduces_every_frame() {
    let dir = tempfile::tempdir().unwrap();
    let input = input_file(dir.path());
    let spec = CorruptionSpec::default().with_amount(0.02).with_seed(42);

    let (first, first_recorded) = pipeline(false, 5, 5, None);
    first.glitch(&input, &spec, 4).await.unwrap();
    std::fs::remove_file(dir.path().join("clip_glitch.mp4")).unwrap();

    let (second, second_recorded) = pipeline(false, 5, 5, None);
    second.glitch(&input, &spec, 4).await.unwrap();

    let a = &first_recorded.lock().unwrap().frame_bytes;
    let b = &second_recorded.lock().unwrap().frame_bytes;
    assert_eq!(a, b);

    // Distinct frames get distinct glitches from the derived seeds.
    assert_ne!(a[0], a[1]);
}

#[tokio::test]
async fn zero_byte_frame_fails_fast_and_cleans_up() {
    let dir = tempfile::tempdir().unwrap();
    let input = input_file(dir.path());
    let (pipeline, recorded) = pipeline(true, 10, 10, Some(3));

    let spec = CorruptionSpec::default().with_amount(0.02).with_seed(42);
    let err = pipeline.glitch(&input, &spec, 4).await.unwrap_err();

    assert_matches!(err, Error::FrameCorruptionFailed { index: 3, .. });
    assert!(!dir.path().join("clip_glitch.mp4").exists());

    // The temporary frame directory is gone.
    let frames_dir = recorded.lock().unwrap().frames_dir.clone().unwrap();
    assert!(!frames_dir.exists());
    // Reassembly never ran.
    assert!(recorded.lock().unwrap().audio_source.is_none());
}

#[tokio::test]
async fn frame_count_mismatch_fails_and_removes_output() {
    let dir = tempfile::tempdir().unwrap();
    let input = input_file(dir.path());
    let (pipeline, recorded) = pipeline(true, 10, 14, None);

    let spec = CorruptionSpec::default().with_amount(0.02).with_seed(42);
    let err = pipeline.glitch(&input, &spec, 4).await.unwrap_err();

    assert_matches!(
        err,
        Error::FrameCountMismatch {
            extracted: 10,
            reassembled: 14,
        }
    );
    assert!(!dir.path().join("clip_glitch.mp4").exists());

    let frames_dir = recorded.lock().unwrap().frames_dir.clone().unwrap();
    assert!(!frames_dir.exists());
}

#[tokio::test]
async fn one_frame_tolerance_on_reassembly() {
    let dir = tempfile::tempdir().unwrap();
    let input = input_file(dir.path());
    let (pipeline, _recorded) = pipeline(false, 10, 9, None);

    let spec = CorruptionSpec::default().with_amount(0.02).with_seed(42);
    assert!(pipeline.glitch(&input, &spec, 4).await.is_ok());
}

#[tokio::test]
async fn invalid_spec_rejected_before_any_work() {
    let dir = tempfile::tempdir().unwrap();
    let input = input_file(dir.path());
    let (pipeline, recorded) = pipeline(true, 10, 10, None);

    let spec = CorruptionSpec::default().with_amount(0.0);
    let err = pipeline.glitch(&input, &spec, 4).await.unwrap_err();

    assert_matches!(err, Error::Validation(_));
    // Probing and extraction never happened.
    assert!(recorded.lock().unwrap().frames_dir.is_none());
}
