//! Loudness normalization planning.
//!
//! Emits the audio-filter directive that brings a clip to the target
//! integrated loudness. Measurement happens inside the transcoder's
//! own loudnorm filter at render time, so planning is pure string
//! assembly and cannot fail.

/// True-peak ceiling in dBTP.
const TRUE_PEAK: f64 = -1.5;

/// Loudness range target in LU.
const LOUDNESS_RANGE: f64 = 11.0;

/// Build the loudnorm filter directive for a target integrated
/// loudness (LUFS).
pub fn plan(target_lufs: f64) -> String {
    format!(
        "loudnorm=I={}:TP={}:LRA={}",
        trim_float(target_lufs),
        trim_float(TRUE_PEAK),
        trim_float(LOUDNESS_RANGE)
    )
}

/// Format a float without a trailing ".0" for integral values, keeping
/// the filter string readable in logs.
fn trim_float(v: f64) -> String {
    if v.fract() == 0.0 {
        format!("{}", v as i64)
    } else {
        format!("{}", v)
    }
}
