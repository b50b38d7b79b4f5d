use std::io::Cursor;

use cutout_normalize::{
    codec, normalize, opaque_bounds, BoundingBox, Error, Mode, NormalizeOptions, Normalizer,
};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};

fn png(img: &RgbaImage) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png).unwrap();
    buf.into_inner()
}

fn decode(bytes: &[u8]) -> RgbaImage {
    image::load_from_memory(bytes).unwrap().to_rgba8()
}

fn bg_only() -> NormalizeOptions {
    NormalizeOptions {
        mode: Mode::BgOnly,
        ..NormalizeOptions::default()
    }
}

#[test]
fn opaque_landscape_is_cropped_at_the_sides() {
    let mut img = RgbaImage::from_pixel(300, 200, Rgba([0, 0, 255, 255]));
    for y in 0..200 {
        img.put_pixel(0, y, Rgba([255, 0, 0, 255]));
        img.put_pixel(299, y, Rgba([255, 0, 0, 255]));
    }
    assert_eq!(opaque_bounds(&img).unwrap(), BoundingBox::full(300, 200));

    let out = decode(&normalize(&png(&img), &NormalizeOptions::default()).unwrap());
    assert_eq!(out.dimensions(), (256, 256));
    // The red edge columns land 64px outside the canvas on each side.
    assert!(out.pixels().all(|px| px[0] == 0 && px[3] == 255));
}

#[test]
fn small_square_product_fills_the_canvas() {
    let mut img = RgbaImage::new(256, 256);
    for y in 100..110 {
        for x in 100..110 {
            img.put_pixel(x, y, Rgba([10, 200, 30, 255]));
        }
    }
    assert_eq!(
        opaque_bounds(&img).unwrap(),
        BoundingBox {
            min_x: 100,
            min_y: 100,
            max_x: 109,
            max_y: 109
        }
    );

    let out = decode(&normalize(&png(&img), &NormalizeOptions::default()).unwrap());
    assert_eq!(out.dimensions(), (256, 256));
    for px in out.pixels() {
        assert_eq!(px[3], 255, "no transparent border expected");
        assert!((i32::from(px[1]) - 200).abs() <= 1);
    }
}

#[test]
fn transparent_image_becomes_transparent_canvas() {
    let img = RgbaImage::new(50, 50);
    let out = decode(&normalize(&png(&img), &NormalizeOptions::default()).unwrap());
    assert_eq!(out.dimensions(), (256, 256));
    assert!(out.pixels().all(|px| px[3] == 0));
}

#[test]
fn fill_output_is_always_target_size() {
    let cases = [(1, 1), (7, 300), (640, 480), (1000, 3), (256, 256)];
    for (w, h) in cases {
        let img = RgbaImage::from_pixel(w, h, Rgba([5, 6, 7, 255]));
        for size in [16, 256, 300] {
            let opts = NormalizeOptions {
                mode: Mode::Fill(size),
                ..NormalizeOptions::default()
            };
            let out = decode(&normalize(&png(&img), &opts).unwrap());
            assert_eq!(out.dimensions(), (size, size), "{w}x{h} -> {size}");
        }
    }
}

#[test]
fn bg_only_preserves_pixels() {
    let mut img = RgbaImage::new(33, 17);
    img.put_pixel(0, 0, Rgba([1, 2, 3, 4]));
    img.put_pixel(32, 16, Rgba([250, 128, 0, 255]));

    let out = normalize(&png(&img), &bg_only()).unwrap();
    assert_eq!(decode(&out), img);
}

#[test]
fn bg_only_reencodes_other_formats_as_png() {
    let rgb = image::RgbImage::from_pixel(12, 9, image::Rgb([90, 60, 30]));
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(rgb.clone())
        .write_to(&mut buf, ImageFormat::Bmp)
        .unwrap();

    let out = normalize(&buf.into_inner(), &bg_only()).unwrap();
    assert_eq!(image::guess_format(&out).unwrap(), ImageFormat::Png);
    assert_eq!(image::load_from_memory(&out).unwrap().to_rgb8(), rgb);
}

#[test]
fn jpeg_without_alpha_is_treated_as_opaque() {
    let rgb = image::RgbImage::from_pixel(40, 20, image::Rgb([128, 128, 128]));
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(rgb)
        .write_to(&mut buf, ImageFormat::Jpeg)
        .unwrap();

    let out = decode(&normalize(&buf.into_inner(), &NormalizeOptions::default()).unwrap());
    assert_eq!(out.dimensions(), (256, 256));
    assert!(out.pixels().all(|px| px[3] == 255));
}

#[test]
fn garbage_input_is_unsupported() {
    let err = normalize(b"<html>not a png</html>", &NormalizeOptions::default()).unwrap_err();
    assert!(matches!(err, Error::UnsupportedFormat(_)));
}

#[test]
fn oversized_input_is_rejected_in_both_modes() {
    let bytes = png(&RgbaImage::new(200, 200));
    for mode in [Mode::BgOnly, Mode::Fill(256)] {
        let opts = NormalizeOptions {
            mode,
            max_pixels: 10_000,
            ..NormalizeOptions::default()
        };
        assert!(matches!(
            normalize(&bytes, &opts),
            Err(Error::TooLarge {
                width: 200,
                height: 200,
                ..
            })
        ));
    }
}

#[test]
fn zero_target_size_is_invalid_geometry() {
    let normalizer = Normalizer::new(NormalizeOptions {
        mode: Mode::Fill(0),
        ..NormalizeOptions::default()
    });
    let err = normalizer
        .normalize(&png(&RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 255]))))
        .unwrap_err();
    assert!(matches!(err, Error::InvalidGeometry { .. }));
}

#[test]
fn data_url_round_trip_through_pipeline() {
    let img = RgbaImage::from_pixel(20, 10, Rgba([1, 1, 1, 255]));
    let url = codec::to_data_url(&png(&img));
    let bytes = codec::from_data_url(&url).unwrap();

    let out = Normalizer::default().normalize(&bytes).unwrap();
    assert!(codec::to_data_url(&out).starts_with("data:image/png;base64,iVBOR"));
    assert_eq!(decode(&out).dimensions(), (256, 256));
}

#[test]
fn normalizer_is_shareable_across_threads() {
    let normalizer = Normalizer::default();
    let bytes = png(&RgbaImage::from_pixel(30, 60, Rgba([9, 9, 9, 255])));

    std::thread::scope(|s| {
        let handles: Vec<_> = (0..4)
            .map(|_| s.spawn(|| normalizer.normalize(&bytes).unwrap()))
            .collect();
        let outputs: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(outputs.windows(2).all(|w| w[0] == w[1]));
    });
}

#[test]
fn process_file_writes_png_next_to_input() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("shoe.png");
    std::fs::write(&input, png(&RgbaImage::from_pixel(80, 40, Rgba([3, 3, 3, 255])))).unwrap();

    let output = cutout_normalize::default_output_path(&input, Mode::Fill(256));
    let result = Normalizer::default().process_file(&input, &output);

    assert!(result.success, "{}", result.message);
    assert_eq!(result.output.as_deref(), Some(dir.path().join("shoe_256.png").as_path()));
    assert_eq!(decode(&std::fs::read(&output).unwrap()).dimensions(), (256, 256));
}

#[test]
fn process_file_reports_failures() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("broken.png");
    std::fs::write(&input, b"nope").unwrap();
    let output = dir.path().join("out").join("broken_256.png");

    let result = Normalizer::default().process_file(&input, &output);
    assert!(!result.success);
    assert!(result.message.contains("unsupported image format"));
    assert!(!output.exists());

    let missing = Normalizer::default().process_file(&dir.path().join("absent.png"), &output);
    assert!(!missing.success);
    assert!(missing.message.starts_with("Failed to read"));
}

#[test]
fn process_directory_handles_each_supported_file() {
    let input_dir = tempfile::tempdir().unwrap();
    let output_dir = tempfile::tempdir().unwrap();
    let out_path = output_dir.path().join("nested");

    std::fs::write(
        input_dir.path().join("a.png"),
        png(&RgbaImage::from_pixel(10, 20, Rgba([1, 2, 3, 255]))),
    )
    .unwrap();
    std::fs::write(input_dir.path().join("b.png"), b"corrupt").unwrap();
    std::fs::write(input_dir.path().join("notes.txt"), b"ignored").unwrap();

    let normalizer = Normalizer::new(NormalizeOptions {
        mode: Mode::Fill(64),
        ..NormalizeOptions::default()
    });
    let results = normalizer.process_directory(input_dir.path(), &out_path);

    assert_eq!(results.len(), 2);
    let ok: Vec<_> = results.iter().filter(|r| r.success).collect();
    assert_eq!(ok.len(), 1);
    assert!(ok[0].path.ends_with("a.png"));
    assert_eq!(
        decode(&std::fs::read(out_path.join("a_64.png")).unwrap()).dimensions(),
        (64, 64)
    );
    assert!(!out_path.join("b_64.png").exists());
}

#[test]
fn process_directory_reports_missing_input() {
    let output_dir = tempfile::tempdir().unwrap();
    let results = Normalizer::default().process_directory(
        &output_dir.path().join("does-not-exist"),
        output_dir.path(),
    );
    assert_eq!(results.len(), 1);
    assert!(!results[0].success);
}

#[test]
fn oversized_fill_target_returns_error_instead_of_panicking() {
    let opts = NormalizeOptions {
        mode: "fill4000000000".parse().unwrap(),
        ..NormalizeOptions::default()
    };
    let bytes = png(&RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 255])));
    assert!(matches!(
        normalize(&bytes, &opts),
        Err(Error::TooLarge {
            width: 4_000_000_000,
            height: 4_000_000_000,
            ..
        })
    ));
}
