//! Sample-format conversion to the device's native layout.

/// Convert interleaved `f32` samples to 16-bit PCM into `scratch`.
///
/// The scratch buffer grows to the largest block seen and never shrinks,
/// bounding allocation churn on the audio path. Returns the freshly
/// converted prefix.
pub(crate) fn f32_to_i16_into<'a>(src: &[f32], scratch: &'a mut Vec<i16>) -> &'a [i16] {
    if scratch.len() < src.len() {
        scratch.resize(src.len(), 0);
    }
    for (dst, &s) in scratch.iter_mut().zip(src.iter()) {
        *dst = (s.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16;
    }
    &scratch[..src.len()]
}
