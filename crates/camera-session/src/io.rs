use crate::{Error, Frame, PixelFormat, Result};
use image::{DynamicImage, GrayImage, ImageFormat, RgbImage};
use std::io::Cursor;
use std::path::Path;

/// `snapshot_001.jpg`, `snapshot_002.jpg`, ...
pub fn snapshot_name(index: u32) -> String {
    format!("snapshot_{index:03}.jpg")
}

/// Encode a frame to disk; the format follows the file extension.
pub fn write_image(path: impl AsRef<Path>, frame: &Frame) -> Result<()> {
    let path = path.as_ref();
    to_image(frame)?
        .save(path)
        .map_err(|e| Error::Io(format!("writing {}: {e}", path.display())))
}

/// Encode `frame` as JPEG bytes in memory.
pub fn encode_jpeg(frame: &Frame) -> Result<Vec<u8>> {
    let mut out = Cursor::new(Vec::new());
    to_image(frame)?
        .write_to(&mut out, ImageFormat::Jpeg)
        .map_err(|e| Error::Io(format!("jpeg encode: {e}")))?;
    Ok(out.into_inner())
}

fn to_image(frame: &Frame) -> Result<DynamicImage> {
    let len = frame.expected_len();
    if frame.data.len() < len {
        return Err(Error::Io(format!(
            "frame buffer too small: {} bytes for {}x{} {:?}",
            frame.data.len(),
            frame.width,
            frame.height,
            frame.pixel_format
        )));
    }
    let pixels = &frame.data[..len];
    let image = match frame.pixel_format {
        PixelFormat::Gray8 => GrayImage::from_raw(frame.width, frame.height, pixels.to_vec())
            .map(DynamicImage::ImageLuma8),
        PixelFormat::Rgb8 => RgbImage::from_raw(frame.width, frame.height, pixels.to_vec())
            .map(DynamicImage::ImageRgb8),
        PixelFormat::Bgr8 => {
            let rgb = pixels
                .chunks_exact(3)
                .flat_map(|px| [px[2], px[1], px[0]])
                .collect();
            RgbImage::from_raw(frame.width, frame.height, rgb).map(DynamicImage::ImageRgb8)
        }
    };
    image.ok_or_else(|| Error::Io("frame geometry does not match buffer".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bgr_frame(width: u32, height: u32) -> Frame {
        Frame {
            width,
            height,
            pixel_format: PixelFormat::Bgr8,
            data: vec![0, 0, 255].repeat((width * height) as usize),
            ts: None,
        }
    }

    #[test]
    fn test_snapshot_name() {
        assert_eq!(snapshot_name(1), "snapshot_001.jpg");
        assert_eq!(snapshot_name(42), "snapshot_042.jpg");
        assert_eq!(snapshot_name(1234), "snapshot_1234.jpg");
    }

    #[test]
    fn test_write_jpeg_swizzles_bgr() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("red.jpg");
        write_image(&path, &bgr_frame(16, 16)).unwrap();

        let img = image::open(&path).unwrap().to_rgb8();
        assert_eq!(img.dimensions(), (16, 16));
        let px = img.get_pixel(8, 8);
        // JPEG is lossy; red must dominate.
        assert!(px[0] > 200 && px[1] < 60 && px[2] < 60, "{px:?}");
    }

    #[test]
    fn test_short_buffer_rejected() {
        let mut frame = bgr_frame(4, 4);
        frame.data.truncate(10);
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            write_image(dir.path().join("x.jpg"), &frame),
            Err(Error::Io(_))
        ));
        assert!(encode_jpeg(&frame).is_err());
    }

    #[test]
    fn test_encode_jpeg_magic() {
        let bytes = encode_jpeg(&bgr_frame(8, 8)).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
    }
}
