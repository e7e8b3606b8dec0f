//! Raw payload to RGBA expansion.
//!
//! Every pixel format expands to opaque R, G, B, A=255. The payload length is
//! checked against the declared dimensions before anything is written, so a
//! rejected frame leaves the destination untouched.

use super::{PixelFormat, RGBA_BYTES};
use crate::error::ViewerError;

/// Expand `src` into `dst` for a `width` x `height` frame.
///
/// `dst` must already be sized `width * height * 4`.
pub fn expand(
    format: PixelFormat,
    width: u32,
    height: u32,
    src: &[u8],
    dst: &mut [u8],
) -> Result<(), ViewerError> {
    let expected = format.payload_len(width, height).unwrap_or(usize::MAX);
    if src.len() != expected {
        return Err(ViewerError::FrameSizeMismatch {
            expected,
            actual: src.len(),
        });
    }
    let pixels = width as usize * height as usize;
    debug_assert_eq!(dst.len(), pixels * RGBA_BYTES);

    match format {
        PixelFormat::Bgr => swizzle_bgr(src, dst),
        PixelFormat::Rgb => swizzle_rgb(src, dst),
        PixelFormat::Raw8 => expand_mono(src, dst),
    }
    Ok(())
}

fn swizzle_bgr(src: &[u8], dst: &mut [u8]) {
    for (bgr, rgba) in src.chunks_exact(3).zip(dst.chunks_exact_mut(RGBA_BYTES)) {
        rgba[0] = bgr[2];
        rgba[1] = bgr[1];
        rgba[2] = bgr[0];
        rgba[3] = 255;
    }
}

fn swizzle_rgb(src: &[u8], dst: &mut [u8]) {
    for (rgb, rgba) in src.chunks_exact(3).zip(dst.chunks_exact_mut(RGBA_BYTES)) {
        rgba[..3].copy_from_slice(rgb);
        rgba[3] = 255;
    }
}

fn expand_mono(src: &[u8], dst: &mut [u8]) {
    for (&v, rgba) in src.iter().zip(dst.chunks_exact_mut(RGBA_BYTES)) {
        rgba.copy_from_slice(&[v, v, v, 255]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn rgba_for(width: u32, height: u32) -> Vec<u8> {
        vec![0u8; width as usize * height as usize * RGBA_BYTES]
    }

    #[test]
    fn test_bgr_pixel() {
        let mut dst = rgba_for(1, 1);
        expand(PixelFormat::Bgr, 1, 1, &[10, 20, 30], &mut dst).unwrap();
        assert_eq!(dst, vec![30, 20, 10, 255]);
    }

    #[test]
    fn test_rgb_pixel() {
        let mut dst = rgba_for(2, 1);
        expand(PixelFormat::Rgb, 2, 1, &[1, 2, 3, 4, 5, 6], &mut dst).unwrap();
        assert_eq!(dst, vec![1, 2, 3, 255, 4, 5, 6, 255]);
    }

    #[test]
    fn test_raw8_pixel() {
        let mut dst = rgba_for(2, 1);
        expand(PixelFormat::Raw8, 2, 1, &[0, 200], &mut dst).unwrap();
        assert_eq!(dst, vec![0, 0, 0, 255, 200, 200, 200, 255]);
    }

    #[test]
    fn test_short_payload_is_rejected_untouched() {
        let mut dst = vec![9u8; 4 * 4];
        let err = expand(PixelFormat::Bgr, 2, 2, &[0u8; 11], &mut dst).unwrap_err();
        assert!(matches!(
            err,
            ViewerError::FrameSizeMismatch { expected: 12, actual: 11 }
        ));
        assert!(dst.iter().all(|&b| b == 9));
    }

    #[test]
    fn test_overflowing_dimensions_are_rejected() {
        let mut dst = Vec::new();
        let err = expand(PixelFormat::Rgb, u32::MAX, u32::MAX, &[1, 2, 3], &mut dst);
        assert!(matches!(err, Err(ViewerError::FrameSizeMismatch { .. })));
    }

    proptest! {
        #[test]
        fn bgr_swaps_red_and_blue_and_is_opaque(
            pixels in proptest::collection::vec(any::<[u8; 3]>(), 1..64),
        ) {
            let width = pixels.len() as u32;
            let src: Vec<u8> = pixels.iter().flatten().copied().collect();
            let mut dst = rgba_for(width, 1);
            expand(PixelFormat::Bgr, width, 1, &src, &mut dst).unwrap();

            for (bgr, rgba) in pixels.iter().zip(dst.chunks_exact(4)) {
                prop_assert_eq!(rgba, &[bgr[2], bgr[1], bgr[0], 255][..]);
            }
        }

        #[test]
        fn raw8_replicates_into_gray(
            src in proptest::collection::vec(any::<u8>(), 1..128),
        ) {
            let width = src.len() as u32;
            let mut dst = rgba_for(width, 1);
            expand(PixelFormat::Raw8, width, 1, &src, &mut dst).unwrap();

            for (&v, rgba) in src.iter().zip(dst.chunks_exact(4)) {
                prop_assert_eq!(rgba, &[v, v, v, 255][..]);
            }
        }

        #[test]
        fn wrong_length_never_writes(
            width in 1u32..16,
            height in 1u32..16,
            delta in 1usize..8,
            grow in any::<bool>(),
            format_idx in 0usize..3,
        ) {
            let format = PixelFormat::ALL[format_idx];
            let expected = format.payload_len(width, height).unwrap();
            let len = if grow { expected + delta } else { expected.saturating_sub(delta) };
            prop_assume!(len != expected);

            let src = vec![0x5a; len];
            let mut dst = vec![0x11; width as usize * height as usize * 4];
            let result = expand(format, width, height, &src, &mut dst);

            prop_assert!(result.is_err());
            prop_assert!(dst.iter().all(|&b| b == 0x11));
        }
    }
}
