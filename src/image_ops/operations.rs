use crate::geometry::CropPlan;
use crate::image_ops::image_types::OutputFormat;
use fast_image_resize::Resizer;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, GenericImageView, ImageFormat};
use std::io::Cursor;

pub const DEFAULT_COMPRESSION_QUALITY: u8 = 82;

/// Decode source bytes, sniffing the container format first so corrupt or
/// unsupported payloads fail before any pixel work.
pub fn decode(data: &[u8]) -> Result<DynamicImage, image::ImageError> {
    let format = image::guess_format(data)?;
    image::load_from_memory_with_format(data, format)
}

/// Decoded pixel dimensions of uploaded source bytes.
pub fn probe_dimensions(data: &[u8]) -> Result<(u32, u32), image::ImageError> {
    let img = decode(data)?;
    Ok(img.dimensions())
}

/// Extract the plan's source rectangle and scale it to the output size.
pub fn crop_and_resize(img: &DynamicImage, plan: &CropPlan) -> DynamicImage {
    let cropped = img.crop_imm(
        plan.source.x0,
        plan.source.y0,
        plan.source.width(),
        plan.source.height(),
    );
    if cropped.dimensions() == (plan.out_width, plan.out_height) {
        return cropped;
    }

    let mut dst_img = DynamicImage::new(plan.out_width, plan.out_height, cropped.color());
    let mut resizer = Resizer::new();
    let resize_res = resizer.resize(&cropped, &mut dst_img, None);
    if let Err(resize_err) = resize_res {
        panic!("There should be no error on resize, got {}", resize_err)
    };
    dst_img
}

/// Encode to the requested output format. `quality` applies to the lossy
/// encoders and is ignored for PNG.
pub fn encode(
    img: &DynamicImage,
    format: OutputFormat,
    quality: u8,
) -> Result<Vec<u8>, image::ImageError> {
    match format {
        OutputFormat::Jpeg => {
            let mut out = Vec::new();
            let encoder = JpegEncoder::new_with_quality(&mut out, quality);
            img.to_rgb8().write_with_encoder(encoder)?;
            Ok(out)
        }
        OutputFormat::Png => {
            let mut out = Cursor::new(Vec::new());
            img.write_to(&mut out, ImageFormat::Png)?;
            Ok(out.into_inner())
        }
        OutputFormat::Webp => {
            let rgba = img.to_rgba8();
            let encoder =
                webp::Encoder::new(rgba.as_raw(), webp::PixelLayout::Rgba, rgba.width(), rgba.height());
            Ok(encoder.encode(quality as f32).as_ref().to_owned())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{compute_crop_box, Rect};

    fn sample_image(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(image::RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x % 256) as u8, (y % 256) as u8, 0])
        }))
    }

    fn sample_png(width: u32, height: u32) -> Vec<u8> {
        encode(&sample_image(width, height), OutputFormat::Png, 0).unwrap()
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(decode(b"definitely not an image").is_err());
        assert!(decode(&[]).is_err());
    }

    #[test]
    fn probe_reports_decoded_dimensions() {
        let data = sample_png(64, 48);
        assert_eq!(probe_dimensions(&data).unwrap(), (64, 48));
    }

    #[test]
    fn crop_and_resize_honors_plan_dimensions() {
        let img = sample_image(512, 512);
        let rect = Rect {
            x0: 0,
            y0: 112,
            x1: 512,
            y1: 400,
        };
        let out = crop_and_resize(&img, &compute_crop_box(rect, 200));
        assert_eq!(out.dimensions(), (200, 113));
    }

    #[test]
    fn crop_without_scaling_skips_resize() {
        let img = sample_image(100, 100);
        let rect = Rect {
            x0: 10,
            y0: 10,
            x1: 60,
            y1: 60,
        };
        let out = crop_and_resize(&img, &compute_crop_box(rect, 50));
        assert_eq!(out.dimensions(), (50, 50));
        // Top-left pixel of the crop comes from (10, 10) in the source.
        assert_eq!(out.to_rgb8().get_pixel(0, 0), &image::Rgb([10, 10, 0]));
    }

    #[test]
    fn encoders_emit_sniffable_formats() {
        let img = sample_image(32, 32);
        for format in [OutputFormat::Jpeg, OutputFormat::Png, OutputFormat::Webp] {
            let data = encode(&img, format, DEFAULT_COMPRESSION_QUALITY).unwrap();
            let decoded = decode(&data).unwrap();
            assert_eq!(decoded.dimensions(), (32, 32));
        }
    }
}
