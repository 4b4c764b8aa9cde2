//! Export functional tests
//!
//! Run full still and animated exports through the Studio and check the
//! files that come out, plus the state the live texture is left in.

mod common;

use common::{
    TEST_SIZE, TestEnvironment, cpu_studio, decode_gif, delay_ms, failing_studio,
    recording_studio,
};
use phosphor::ExportError;
use phosphor_core::FRAME_RATE;
use phosphor_renderer::{FrameStatus, MockGlyphSource, RenderCall, TextRasterizer};

fn full_text_image(studio_text: &phosphor_core::TextStyle) -> image::RgbaImage {
    TextRasterizer::new(Box::new(MockGlyphSource::new()))
        .rasterize(studio_text, (TEST_SIZE, TEST_SIZE))
        .unwrap()
        .as_image()
        .clone()
}

#[test]
fn test_continuous_gif_frames_and_delay() {
    let env = TestEnvironment::new();
    let mut studio = cpu_studio(&env, "HELLO", false);

    let path = studio.export_animated().unwrap().unwrap();
    assert_eq!(path, env.output_dir.join("phosphor.gif"));

    let frames = decode_gif(&path);
    assert_eq!(frames.len(), 2 * FRAME_RATE as usize);
    for frame in &frames {
        // GIF stores centiseconds, so 42 ms comes back rounded
        let delay = delay_ms(frame) as i64;
        assert!((delay - 42).abs() < 10, "delay {} ms", delay);
        assert_eq!(frame.buffer().dimensions(), (TEST_SIZE, TEST_SIZE));
    }
}

#[test]
fn test_continuous_times_advance_per_frame() {
    let env = TestEnvironment::new();
    let mut studio = recording_studio(&env, "HELLO", false);

    studio.export_animated().unwrap().unwrap();

    let times = studio.renderer().render_times();
    assert_eq!(times.len(), 48);
    for (i, t) in times.iter().enumerate() {
        assert!((t - i as f32 / 24.0).abs() < 1e-5);
    }
    // Fixed text: one upload for the export, one to restore
    assert_eq!(studio.renderer().upload_count(), 2);
}

#[test]
fn test_typing_gif_frame_count() {
    let env = TestEnvironment::new();
    let mut studio = cpu_studio(&env, "A B C", true);

    let path = studio.export_animated().unwrap().unwrap();

    // 12 + 12 frames for the two prefixes, 36 for the final pause
    assert_eq!(decode_gif(&path).len(), 60);
}

#[test]
fn test_typing_uploads_once_per_prefix() {
    let env = TestEnvironment::new();
    let mut studio = recording_studio(&env, "A B C", true);

    studio.export_animated().unwrap().unwrap();

    // Three prefixes, then the restore
    assert_eq!(studio.renderer().upload_count(), 4);

    // Time never resets between prefixes
    let times = studio.renderer().render_times();
    assert!(times.windows(2).all(|w| w[1] > w[0]));
}

#[test]
fn test_still_typing_one_file_per_prefix() {
    let env = TestEnvironment::new();
    let mut studio = recording_studio(&env, "ONE TWO THREE", true);

    let files = studio.export_still().unwrap().unwrap();

    let names: Vec<_> = files
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["phosphor_000.png", "phosphor_001.png", "phosphor_002.png"]);
    assert_eq!(env.output_files(), files);
    assert!(studio.renderer().render_times().iter().all(|&t| t == 0.0));

    // Recorded frames are the uploaded prefixes, so the exported PNGs differ
    let first = image::open(&files[0]).unwrap().to_rgba8();
    let last = image::open(&files[2]).unwrap().to_rgba8();
    assert_ne!(first, last);
}

#[test]
fn test_still_without_typing_captures_current_canvas() {
    let env = TestEnvironment::new();
    let mut studio = recording_studio(&env, "HELLO", false);

    assert_eq!(studio.render_frame(1.25).unwrap(), FrameStatus::Drawn);
    let files = studio.export_still().unwrap().unwrap();

    assert_eq!(files.len(), 1);
    assert_eq!(studio.renderer().render_times(), vec![1.25, 1.25]);
}

#[test]
fn test_cpu_still_is_opaque_png() {
    let env = TestEnvironment::new();
    let mut studio = cpu_studio(&env, "HI", false);

    studio.render_frame(0.0).unwrap();
    let files = studio.export_still().unwrap().unwrap();

    let written = image::open(&files[0]).unwrap().to_rgba8();
    assert_eq!(written.dimensions(), (TEST_SIZE, TEST_SIZE));
    // Barrel distortion leaves the corners on the clear color
    assert_eq!(written.get_pixel(0, 0).0[3], 255);
}

#[test]
fn test_export_rejected_while_in_progress() {
    let env = TestEnvironment::new();
    let mut studio = recording_studio(&env, "HELLO", true);

    let flag = studio.export_flag();
    let ticket = flag.try_acquire().unwrap();

    assert!(studio.export_still().unwrap().is_none());
    assert!(studio.export_animated().unwrap().is_none());
    assert!(env.output_files().is_empty());
    assert_eq!(studio.renderer().calls.len(), 0);

    drop(ticket);
    assert!(studio.export_still().unwrap().is_some());
}

#[test]
fn test_flag_released_after_export() {
    let env = TestEnvironment::new();
    let mut studio = recording_studio(&env, "HELLO", false);

    studio.export_animated().unwrap();
    assert!(!studio.is_exporting());
}

#[test]
fn test_texture_restored_after_typing_export() {
    let env = TestEnvironment::new();
    let mut studio = recording_studio(&env, "A B C", true);

    studio.export_animated().unwrap().unwrap();

    let expected = full_text_image(&studio.params().snapshot().text);
    assert_eq!(studio.renderer().last_upload(), Some(&expected));

    // The next live frame reuses the restored texture
    studio.renderer_mut().clear_calls();
    studio.render_frame(3.0).unwrap();
    assert_eq!(studio.renderer().upload_count(), 0);
}

#[test]
fn test_texture_restored_after_failed_export() {
    let env = TestEnvironment::new();
    let mut studio = recording_studio(&env, "A B C", true);

    // Second PNG cannot be created
    std::fs::create_dir_all(env.output_dir.join("phosphor_001.png")).unwrap();

    let result = studio.export_still();
    assert!(matches!(result, Err(ExportError::Encode { .. })));
    assert!(!studio.is_exporting());

    let expected = full_text_image(&studio.params().snapshot().text);
    assert_eq!(studio.renderer().last_upload(), Some(&expected));
}

#[test]
fn test_glyph_failure_surfaces_and_releases_flag() {
    let env = TestEnvironment::new();
    let mut studio = failing_studio(&env, "A B Z", true, 'Z');

    let result = studio.export_animated();
    assert!(matches!(result, Err(ExportError::Render(_))));
    assert!(!studio.is_exporting());

    // Prefixes before the bad glyph were uploaded and rendered
    let rendered = studio
        .renderer()
        .calls
        .iter()
        .filter(|c| matches!(c, RenderCall::Render { .. }))
        .count();
    assert_eq!(rendered, 24);
}

#[test]
fn test_failed_restore_leaves_blank_texture() {
    let env = TestEnvironment::new();
    let mut studio = failing_studio(&env, "A B Z", true, 'Z');

    assert!(studio.export_animated().is_err());

    // The last good prefix must not stay on screen as the current text
    let blank = phosphor_renderer::TextureBitmap::new(TEST_SIZE, TEST_SIZE);
    assert_eq!(studio.renderer().last_upload(), Some(blank.as_image()));

    // Already marked current, so a live frame does not retry the upload
    let uploads = studio.renderer().upload_count();
    assert_eq!(studio.render_frame(0.0).unwrap(), FrameStatus::Drawn);
    assert_eq!(studio.renderer().upload_count(), uploads);
}

#[test]
fn test_zero_length_typing_still_writes_a_frame() {
    let env = TestEnvironment::new();
    let mut studio = cpu_studio(&env, "A B", true);
    studio.params().update(|_, _, animation| {
        animation.typing_frame_duration_ms = 0;
        animation.typing_end_pause_ms = 0;
    });

    let path = studio.export_animated().unwrap().unwrap();
    assert_eq!(decode_gif(&path).len(), 1);
}

#[test]
fn test_effect_change_during_session_reaches_export() {
    let env = TestEnvironment::new();
    let mut studio = recording_studio(&env, "HELLO", false);

    studio
        .params()
        .update(|effects, _, _| effects.glitch_intensity = 0.75);
    studio.export_animated().unwrap();

    let glitched = studio.renderer().calls.iter().all(|c| match c {
        RenderCall::Render { params, .. } => params.glitch_intensity == 0.75,
        _ => true,
    });
    assert!(glitched);
}
