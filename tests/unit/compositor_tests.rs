// Compositor unit tests through the public watermark API

use image::{Rgba, RgbaImage};
use image_service::watermark::*;

const GREY: Rgba<u8> = Rgba([128, 128, 128, 255]);
const GREEN: Rgba<u8> = Rgba([0, 200, 0, 255]);

fn checkerboard(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        if (x / 4 + y / 4) % 2 == 0 {
            Rgba([240, 240, 240, 255])
        } else {
            Rgba([20, 20, 20, 255])
        }
    })
}

#[test]
fn test_overlay_plan_for_standard_canvas() {
    let canvas = Rect::from_size(1024, 768);

    let plan = plan_overlay(canvas, Rect::from_size(2048, 1536)).unwrap();
    assert_eq!((plan.width, plan.height), (1024, 768));
    assert_eq!(plan.offset, PlacementPosition::new(0, 0));

    let plan = plan_overlay(canvas, Rect::from_size(2000, 2000)).unwrap();
    assert_eq!((plan.width, plan.height), (768, 768));
    assert_eq!(plan.offset, PlacementPosition::new(128, 0));
}

#[test]
fn test_tile_grid_for_standard_canvas() {
    let grid = tile_grid(Rect::from_size(1024, 768), Rect::from_size(256, 256))
        .unwrap()
        .expect("watermark fits");

    assert_eq!((grid.cols, grid.rows), (4, 3));
    assert_eq!(grid.tile_count(), 12);
    assert_eq!(grid.block_size(), (1024, 768));
    assert_eq!(grid.offset, PlacementPosition::new(0, 0));
}

#[test]
fn test_tile_grid_centres_uneven_block() {
    let grid = tile_grid(Rect::from_size(100, 70), Rect::from_size(30, 20))
        .unwrap()
        .unwrap();

    assert_eq!((grid.cols, grid.rows), (3, 3));
    assert_eq!(grid.block_size(), (90, 60));
    assert_eq!(grid.offset, PlacementPosition::new(5, 5));

    let positions: Vec<_> = grid.positions().collect();
    assert_eq!(positions.first(), Some(&PlacementPosition::new(5, 5)));
    assert_eq!(positions[1], PlacementPosition::new(35, 5));
    assert_eq!(positions.last(), Some(&PlacementPosition::new(65, 45)));
}

#[test]
fn test_tiled_watermark_leaves_border_untouched() {
    let transformer = ImageTransformer::new();
    let mut canvas = RgbaImage::from_pixel(100, 70, GREY);
    let watermark = RgbaImage::from_pixel(30, 20, GREEN);

    transformer.put_watermark(&mut canvas, &watermark).unwrap();

    for (x, y, pixel) in canvas.enumerate_pixels() {
        let inside = (5..95).contains(&x) && (5..65).contains(&y);
        let expected = if inside { GREEN } else { GREY };
        assert_eq!(*pixel, expected, "pixel ({}, {})", x, y);
    }
}

#[test]
fn test_oversized_watermark_matches_overlay() {
    let transformer = ImageTransformer::new();
    let watermark = checkerboard(300, 90);

    let mut via_watermark = RgbaImage::from_pixel(200, 100, GREY);
    transformer
        .put_watermark(&mut via_watermark, &watermark)
        .unwrap();

    let mut via_overlay = RgbaImage::from_pixel(200, 100, GREY);
    transformer.overlay(&mut via_overlay, &watermark).unwrap();

    assert_eq!(via_watermark, via_overlay);
}

#[test]
fn test_full_composition_is_deterministic() {
    let transformer = ImageTransformer::new();
    let background = checkerboard(173, 91);
    let watermark = RgbaImage::from_pixel(12, 9, Rgba([255, 255, 255, 90]));

    let compose = || {
        let mut canvas = RgbaImage::new(120, 80);
        transformer.overlay(&mut canvas, &background).unwrap();
        transformer.put_watermark(&mut canvas, &watermark).unwrap();
        canvas
    };

    assert_eq!(compose(), compose());
}

#[test]
fn test_empty_source_is_degenerate() {
    let transformer = ImageTransformer::new();
    let mut canvas = RgbaImage::new(10, 10);

    let err = transformer
        .overlay(&mut canvas, &RgbaImage::new(0, 5))
        .unwrap_err();
    assert!(matches!(
        err,
        CompositeError::DegenerateRect { role: "source", .. }
    ));
}

#[test]
fn test_blend_over_half_alpha_on_opaque() {
    let out = blend_over(Rgba([0, 0, 0, 255]), Rgba([255, 255, 255, 128]));
    assert_eq!(out[3], 255);
    assert!((127..=129).contains(&out[0]));
}
