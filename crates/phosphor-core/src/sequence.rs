//! Frame schedules for exported animations
//!
//! A schedule is an ordered list of [`AnimationFrameSpec`]s. The exporter
//! walks it front to back: re-rasterize when the text snapshot changes,
//! render at the simulated time, capture, hand the capture to the encoder
//! with its delay. Order is the display order of the exported artifact.

/// Export frame rate, frames per second
pub const FRAME_RATE: u32 = 24;

/// Length of a continuous-effect export, seconds
pub const CONTINUOUS_DURATION_SECS: f32 = 2.0;

/// One exported frame: what text to show, when, and for how long
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationFrameSpec {
    pub text_snapshot: String,
    pub simulated_time_seconds: f32,
    pub delay_ms: u32,
}

/// Per-frame delay at `fps`, rounded up to whole milliseconds
///
/// Constant across a whole export, whichever schedule produced it.
pub fn frame_delay_ms(fps: u32) -> u32 {
    let fps = fps.max(1);
    1000_u32.div_ceil(fps)
}

/// Number of frames covering `duration_ms` at `fps`
pub fn frames_for_duration(duration_ms: u32, fps: u32) -> usize {
    ((duration_ms as f64 / 1000.0) * fps as f64).round() as usize
}

/// Cumulative word prefixes of `full_text`
///
/// Words are separated by runs of whitespace. Text without any words yields
/// a single element, the text itself.
///
/// ```
/// use phosphor_core::build_typing_sequence;
///
/// assert_eq!(build_typing_sequence("a b c"), vec!["a", "a b", "a b c"]);
/// assert_eq!(build_typing_sequence(""), vec![""]);
/// ```
pub fn build_typing_sequence(full_text: &str) -> Vec<String> {
    let words: Vec<&str> = full_text.split_whitespace().collect();
    if words.is_empty() {
        return vec![full_text.to_string()];
    }

    let mut prefix = String::with_capacity(full_text.len());
    words
        .iter()
        .map(|word| {
            if !prefix.is_empty() {
                prefix.push(' ');
            }
            prefix.push_str(word);
            prefix.clone()
        })
        .collect()
}

/// Typing-reveal schedule
///
/// Every prefix except the last is held for `frame_duration_ms`, the last for
/// `end_pause_ms`. Simulated time keeps advancing by `1/fps` per frame across
/// prefixes so scanlines and noise never jump back to zero. When every hold
/// rounds to zero frames the full text is shown for a single frame.
pub fn typing_schedule(
    full_text: &str,
    frame_duration_ms: u32,
    end_pause_ms: u32,
    fps: u32,
) -> Vec<AnimationFrameSpec> {
    let fps = fps.max(1);
    let delay_ms = frame_delay_ms(fps);
    let step = 1.0 / fps as f64;
    let prefixes = build_typing_sequence(full_text);
    let last = prefixes.len() - 1;

    let mut frames = Vec::new();
    let mut time = 0.0_f64;

    for (index, prefix) in prefixes.iter().enumerate() {
        let duration_ms = if index == last {
            end_pause_ms
        } else {
            frame_duration_ms
        };

        for _ in 0..frames_for_duration(duration_ms, fps) {
            frames.push(AnimationFrameSpec {
                text_snapshot: prefix.clone(),
                simulated_time_seconds: time as f32,
                delay_ms,
            });
            time += step;
        }
    }

    // Zero durations still yield the finished text once
    if frames.is_empty() {
        frames.push(AnimationFrameSpec {
            text_snapshot: prefixes[last].clone(),
            simulated_time_seconds: 0.0,
            delay_ms,
        });
    }

    frames
}

/// Continuous-effect schedule: fixed text, time `i / fps` for frame `i`
pub fn continuous_schedule(text: &str, fps: u32) -> Vec<AnimationFrameSpec> {
    let fps = fps.max(1);
    let delay_ms = frame_delay_ms(fps);
    let count = (CONTINUOUS_DURATION_SECS as f64 * fps as f64).round() as usize;

    (0..count)
        .map(|i| AnimationFrameSpec {
            text_snapshot: text.to_string(),
            simulated_time_seconds: (i as f64 / fps as f64) as f32,
            delay_ms,
        })
        .collect()
}

/// Still-image schedule: one frame per typing prefix, all at time zero
pub fn still_schedule(full_text: &str, fps: u32) -> Vec<AnimationFrameSpec> {
    let delay_ms = frame_delay_ms(fps);
    build_typing_sequence(full_text)
        .into_iter()
        .map(|prefix| AnimationFrameSpec {
            text_snapshot: prefix,
            simulated_time_seconds: 0.0,
            delay_ms,
        })
        .collect()
}
