use std::path::Path;

use ffmpeg_next::{Rational, frame::Video};

use super::{
    TranscodeOutcome, VideoTask, convert_colors, transcode, transcode_file, transcode_file_with,
};
use crate::{
    encoder::Settings,
    frame::{FrameConverter, swap_red_blue},
    properties::{FALLBACK_FRAME_RATE, frame_rate_or_fallback},
    sample,
};

fn sample_clip(dir: &Path, name: &str, frames: u32) -> anyhow::Result<std::path::PathBuf> {
    crate::init()?;
    let path = dir.join(name);
    sample::write_sample_clip(&path, frames, Rational::new(30, 1), 64, 48)?;
    Ok(path)
}

// ------------------------------------------------------------------------
// VideoTask
// ------------------------------------------------------------------------

#[test]
fn test_output_path_uses_stem_and_mp4() {
    let task = VideoTask::new("/videos/clip.AVI", "/out");
    assert_eq!(task.output_path(), Path::new("/out/clip.mp4"));

    let task = VideoTask::new("/videos/holiday.2024.mkv", "/out");
    assert_eq!(task.output_path(), Path::new("/out/holiday.2024.mp4"));

    let task = VideoTask::new("/videos/already.mp4", "/videos/processed");
    assert_eq!(task.output_path(), Path::new("/videos/processed/already.mp4"));
}

// ------------------------------------------------------------------------
// Pipeline
// ------------------------------------------------------------------------

#[test]
fn test_transcode_writes_every_frame() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let input = sample_clip(dir.path(), "a.mp4", 10)?;
    let out_dir = dir.path().join("processed");

    let outcome = transcode_file(&VideoTask::new(&input, &out_dir));
    assert_eq!(
        outcome,
        TranscodeOutcome::Completed {
            frames_decoded: 10,
            frames_written: 10
        }
    );

    let artifact = out_dir.join("a.mp4");
    assert!(artifact.exists(), "artifact should be created");
    assert_eq!(sample::count_video_frames(&artifact)?, 10);
    let rate = sample::probe_frame_rate(&artifact)?;
    assert!((f64::from(rate) - 30.0).abs() < 0.01, "unexpected rate {:?}", rate);
    Ok(())
}

#[test]
fn test_rejected_frames_are_dropped() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let input = sample_clip(dir.path(), "d.mp4", 10)?;
    let out_dir = dir.path().join("processed");
    let task = VideoTask::new(&input, &out_dir);

    let outcome = transcode(&task, &Settings::default(), |properties| {
        let mut converter = FrameConverter::new(properties.width, properties.height);
        let mut seen = 0u32;
        move |frame: &Video| -> anyhow::Result<Video> {
            seen += 1;
            if seen % 4 == 0 {
                // Decoded frames are planar YUV, which the swap refuses.
                let mut planar = frame.clone();
                swap_red_blue(&mut planar)?;
            }
            convert_colors(&mut converter, frame)
        }
    });

    assert_eq!(
        outcome,
        TranscodeOutcome::Completed {
            frames_decoded: 10,
            frames_written: 8
        }
    );
    assert_eq!(sample::count_video_frames(&task.output_path())?, 8);
    Ok(())
}

#[test]
fn test_invalid_rate_encodes_at_fallback_fps() -> anyhow::Result<()> {
    crate::init()?;
    let dir = tempfile::tempdir()?;

    for (name, reported) in [
        ("zero.mp4", Rational::new(0, 1)),
        ("undefined.mp4", Rational::new(0, 0)),
        ("negative.mp4", Rational::new(-25, 1)),
    ] {
        let path = dir.path().join(name);
        let rate = frame_rate_or_fallback(reported, name);
        assert_eq!(rate, FALLBACK_FRAME_RATE);
        sample::write_sample_clip(&path, 6, rate, 64, 48)?;

        let encoded = sample::probe_frame_rate(&path)?;
        assert!((f64::from(encoded) - 30.0).abs() < 0.01, "{}: rate {:?}", name, encoded);
        assert_eq!(sample::count_video_frames(&path)?, 6);
    }
    Ok(())
}

#[test]
fn test_transcode_overwrites_existing_artifact() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let input = sample_clip(dir.path(), "b.mov", 4)?;
    let out_dir = dir.path().join("processed");
    std::fs::create_dir_all(&out_dir)?;
    std::fs::write(out_dir.join("b.mp4"), b"stale")?;

    let outcome = transcode_file(&VideoTask::new(&input, &out_dir));
    assert!(outcome.is_completed());
    assert_eq!(sample::count_video_frames(&out_dir.join("b.mp4"))?, 4);
    Ok(())
}

#[test]
fn test_missing_source_is_skipped() -> anyhow::Result<()> {
    crate::init()?;
    let dir = tempfile::tempdir()?;
    let out_dir = dir.path().join("processed");

    let outcome = transcode_file(&VideoTask::new(dir.path().join("missing.mp4"), &out_dir));
    assert_eq!(outcome, TranscodeOutcome::SourceUnavailable);
    assert!(!out_dir.join("missing.mp4").exists());
    Ok(())
}

#[test]
fn test_corrupt_source_is_skipped() -> anyhow::Result<()> {
    crate::init()?;
    let dir = tempfile::tempdir()?;
    let input = dir.path().join("b.avi");
    std::fs::write(&input, b"this is definitely not an avi file")?;
    let out_dir = dir.path().join("processed");

    let outcome = transcode_file(&VideoTask::new(&input, &out_dir));
    assert_eq!(outcome, TranscodeOutcome::SourceUnavailable);
    assert!(!out_dir.join("b.mp4").exists());
    Ok(())
}

#[test]
fn test_truncated_source_still_finishes() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let input = sample_clip(dir.path(), "cut.mkv", 30)?;
    let len = std::fs::metadata(&input)?.len();
    std::fs::OpenOptions::new()
        .write(true)
        .open(&input)?
        .set_len(len / 2)?;
    let out_dir = dir.path().join("processed");

    let outcome = transcode_file(&VideoTask::new(&input, &out_dir));
    match outcome {
        TranscodeOutcome::Completed {
            frames_decoded,
            frames_written,
        } => {
            assert!(frames_decoded < 30, "decoded {} frames", frames_decoded);
            assert_eq!(frames_written, frames_decoded);
        }
        TranscodeOutcome::Failed => {}
        other => panic!("unexpected outcome {:?}", other),
    }
    assert!(out_dir.join("cut.mp4").exists());
    Ok(())
}

#[test]
fn test_unwritable_destination_is_skipped() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let input = sample_clip(dir.path(), "a.mp4", 3)?;
    // A regular file where the output directory should be.
    let blocked = dir.path().join("blocked");
    std::fs::write(&blocked, b"")?;

    let outcome = transcode_file(&VideoTask::new(&input, &blocked));
    assert_eq!(outcome, TranscodeOutcome::DestinationUnavailable);
    assert!(!blocked.join("a.mp4").exists());

    // The source is released and still readable.
    assert_eq!(sample::count_video_frames(&input)?, 3);
    Ok(())
}

#[test]
fn test_unknown_codec_is_destination_failure() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let input = sample_clip(dir.path(), "a.mp4", 3)?;
    let settings = Settings {
        codec: "no-such-codec".to_string(),
        ..Settings::default()
    };

    let outcome = transcode_file_with(&VideoTask::new(&input, dir.path().join("out")), &settings);
    assert_eq!(outcome, TranscodeOutcome::DestinationUnavailable);
    Ok(())
}

#[test]
fn test_same_input_twice_is_repeatable() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let input = sample_clip(dir.path(), "c.mkv", 6)?;
    let out_dir = dir.path().join("processed");
    let task = VideoTask::new(&input, &out_dir);

    let first = transcode_file(&task);
    let second = transcode_file(&task);
    assert_eq!(first, second);
    assert_eq!(sample::count_video_frames(&task.output_path())?, 6);
    Ok(())
}

#[test]
fn test_transcode_swaps_red_and_blue() -> anyhow::Result<()> {
    crate::init()?;
    let dir = tempfile::tempdir()?;
    let input = dir.path().join("blue.mp4");
    sample::write_solid_clip(&input, 3, Rational::new(25, 1), 32, 32, [200, 40, 20])?;

    let out_dir = dir.path().join("processed");
    assert!(transcode_file(&VideoTask::new(&input, &out_dir)).is_completed());

    let before = sample::first_frame_mean_bgr(&input)?;
    let after = sample::first_frame_mean_bgr(&out_dir.join("blue.mp4"))?;
    assert!(before[0] > before[2] + 100.0, "source should be blue: {:?}", before);
    assert!(after[2] > after[0] + 100.0, "output should be red: {:?}", after);
    assert!((after[0] - before[2]).abs() < 16.0);
    assert!((after[2] - before[0]).abs() < 16.0);
    Ok(())
}
