/// Minimum pixel count (h*w) to sum channel planes as parallel Rayon jobs.
pub const PARALLEL_PIXEL_THRESHOLD: usize = 65_536;

/// Largest value a single 8-bit channel sample contributes to a sum.
pub const CHANNEL_MAX: u32 = 255;

/// Full circle of the hue wheel, in degrees.
pub const HUE_DEGREES: u16 = 360;

/// Number of channels summed per pixel (R, G, B).
pub const COLOR_CHANNEL_COUNT: usize = 3;

/// Default Savitzky-Golay window length (points).
pub const DEFAULT_SMOOTHING_WINDOW: usize = 5;

/// Default Savitzky-Golay polynomial degree (quadratic).
pub const DEFAULT_POLYNOMIAL_DEGREE: usize = 2;

/// Default power-curve exponent for variability enhancement.
pub const DEFAULT_VARIABILITY_EXPONENT: f64 = 2.0;

/// Never merge fewer than one frame (1x speed cap).
pub const DEFAULT_MIN_MERGE: u32 = 1;

/// Upper bound on frames merged into one output frame.
pub const DEFAULT_MAX_MERGE: u32 = 100;

/// Exponents tried after the configured one when its schedule is too long.
pub const DEFAULT_EXPONENT_SWEEP: [f64; 11] =
    [1.0, 1.25, 1.5, 2.0, 2.5, 3.0, 4.0, 5.0, 6.0, 8.0, 10.0];

/// Output frames per target-length ratio that should stay unmerged.
pub const DEFAULT_SINGLE_SOURCE_FRAMES: usize = 30;

/// Default output frame rate.
pub const DEFAULT_OUTPUT_FPS: f64 = 60.0;

/// Default output length in seconds for adaptive mode.
pub const DEFAULT_OUTPUT_SECONDS: f64 = 30.0;

/// Frame rate assumed for SER files without a timestamp trailer.
pub const DEFAULT_SOURCE_FPS: f64 = 30.0;

/// Capacity of the bounded queue between the frame producer and the merge loop.
pub const DEFAULT_INPUT_QUEUE: usize = 256;

/// Capacity of the bounded queue between the merge loop and the frame sink.
pub const DEFAULT_OUTPUT_QUEUE: usize = 128;

/// Log a progress line every this many input frames while merging.
pub const PROGRESS_LOG_INTERVAL: usize = 5_000;

/// Proxy filter for the scoring pass: center half of the frame, scaled to 32x32.
pub const DEFAULT_PROXY_FILTER: &str = "crop=in_w*.5:in_h*.5:in_w*.25:in_h*.25,scale=32:32";

/// Input frames per chunk when building cumulative ratio plans.
pub const DEFAULT_PLAN_CHUNK_SIZE: usize = 24;

/// SER timestamps count 100 ns ticks.
pub const SER_TICKS_PER_SECOND: f64 = 10_000_000.0;

/// ITU-R BT.601 luminance coefficient for the red channel.
pub const LUMINANCE_R: f32 = 0.299;

/// ITU-R BT.601 luminance coefficient for the green channel.
pub const LUMINANCE_G: f32 = 0.587;

/// ITU-R BT.601 luminance coefficient for the blue channel.
pub const LUMINANCE_B: f32 = 0.114;
