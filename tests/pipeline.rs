mod common;

use std::collections::BTreeSet;

use common::synthetic::{mask_with_blobs, mask_with_ring, square_on_white};
use edge_vectorizer_lib::image_io::save_mask;
use edge_vectorizer_lib::{
    build_edge_mask, export_polygons, extract_contours, get_image_files_in_dir, load_image,
    merge_for_export, plan_batch, process_batch_item, process_image, read_polylines, run_pipeline,
    Annotations, CoordinateMapper, OutputOptions, Parameters, PixelPoint, ProcessOutcome,
    ScenePoint, ShapeSpec,
};

fn scenario_params(invert: bool) -> Parameters {
    Parameters {
        invert,
        largest_n: 1,
        gap_threshold: 0.0,
        simplify_pct: 0.0,
        ..Parameters::default()
    }
}

#[test]
fn square_on_white_exports_frame_outline() {
    let image = square_on_white(100, 100, 30, 30, 70, 70);
    let extraction = run_pipeline(&image, &scenario_params(false)).unwrap();
    assert_eq!(extraction.contours.len(), 1);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("square.dxf");
    export_polygons(&extraction.contours, 100, 100, 1.0, &path).unwrap();

    let polylines = read_polylines(&path).unwrap();
    assert_eq!(polylines.len(), 1);
    assert_eq!(polylines[0].len(), 4, "vertices: {:?}", polylines[0]);

    let xs: Vec<f64> = polylines[0].iter().map(|p| p.0).collect();
    let ys: Vec<f64> = polylines[0].iter().map(|p| p.1).collect();
    let min = |v: &[f64]| v.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = |v: &[f64]| v.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    assert!(min(&xs).abs() <= 1.5);
    assert!(min(&ys).abs() <= 1.5);
    assert!((max(&xs) - 100.0).abs() <= 1.5);
    assert!((max(&ys) - 100.0).abs() <= 1.5);
}

#[test]
fn inverted_square_traces_the_square_outline() {
    let image = square_on_white(100, 100, 30, 30, 70, 70);
    // A slightly heavier stroke keeps the corner pixels of the edge band joined
    let params = Parameters { edge_thickness: 5.0, ..scenario_params(true) };
    let extraction = run_pipeline(&image, &params).unwrap();
    assert_eq!(extraction.contours.len(), 1);

    let (min_x, min_y, max_x, max_y) = extraction.contours[0].bounding_box().unwrap();
    for (actual, expected) in [(min_x, 30), (min_y, 30), (max_x, 69), (max_y, 69)] {
        assert!(
            (actual - expected).abs() <= 5,
            "bounding box ({}, {}, {}, {}) too far from square",
            min_x, min_y, max_x, max_y
        );
    }
}

#[test]
fn largest_of_two_blobs_wins() {
    // 25 x 20 = 500 px and 10 x 10 = 100 px
    let mask = mask_with_blobs(100, 100, &[(60, 60, 69, 69), (10, 10, 34, 29)]);
    let contours = extract_contours(&mask, 1, 0.0, 0.0).unwrap();
    assert_eq!(contours.len(), 1);
    assert_eq!(contours[0].bounding_box(), Some((10, 10, 34, 29)));
}

#[test]
fn largest_n_caps_result_count() {
    let blobs = [(5, 5, 14, 14), (25, 5, 39, 19), (50, 5, 69, 24)];
    let mask = mask_with_blobs(80, 40, &blobs);

    for n in 1..=6 {
        let contours = extract_contours(&mask, n, 0.0, 0.0).unwrap();
        assert!(contours.len() <= n);
        if n >= blobs.len() {
            assert_eq!(contours.len(), blobs.len());
        } else {
            assert_eq!(contours.len(), n);
        }
    }
}

#[test]
fn simplified_contours_never_degenerate() {
    let mask = mask_with_blobs(
        120,
        120,
        &[(10, 50, 109, 51), (10, 10, 12, 12), (60, 80, 100, 110)],
    );
    for pct in [0.1, 0.5, 1.0, 2.0] {
        let contours = extract_contours(&mask, 10, pct, 0.0).unwrap();
        assert_eq!(contours.len(), 3);
        assert!(contours.iter().all(|c| c.len() >= 3));
    }
}

#[test]
fn pixel_ring_round_trips_through_dxf() {
    let mask = mask_with_ring(64, 48, 10, 12, 40, 30);
    let contours = extract_contours(&mask, 1, 0.0, 0.0).unwrap();
    assert_eq!(contours.len(), 1);

    let corners: BTreeSet<(i32, i32)> = contours[0].points.iter().map(|p| (p.x, p.y)).collect();
    let expected: BTreeSet<(i32, i32)> = [(10, 12), (40, 12), (40, 30), (10, 30)].into_iter().collect();
    assert_eq!(corners, expected);

    let mm_per_pixel = 0.37;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ring.dxf");
    export_polygons(&contours, 48, 64, mm_per_pixel, &path).unwrap();

    let polylines = read_polylines(&path).unwrap();
    assert_eq!(polylines.len(), 1);
    assert_eq!(polylines[0].len(), contours[0].len());
    for (&(x, y), point) in polylines[0].iter().zip(&contours[0].points) {
        assert!((x - point.x as f64 * mm_per_pixel).abs() < 1e-6);
        assert!((y - (48 - point.y) as f64 * mm_per_pixel).abs() < 1e-6);
    }

    let mapper = CoordinateMapper::new(48, mm_per_pixel).unwrap();
    let (x, y) = polylines[0][0];
    assert_eq!(mapper.unmap(x, y), contours[0].points[0]);
}

#[test]
fn erased_contour_never_reaches_the_document() {
    let mask = mask_with_blobs(100, 60, &[(5, 5, 44, 44), (60, 5, 79, 24)]);
    let extracted = extract_contours(&mask, 5, 0.0, 0.0).unwrap();
    assert_eq!(extracted.len(), 2);

    let erased: BTreeSet<usize> = [0].into_iter().collect();
    let points: BTreeSet<(usize, usize)> = (0..extracted[0].len()).map(|j| (0, j)).collect();
    let merged = merge_for_export(&extracted, &erased, &points, &[]);
    assert_eq!(merged, vec![extracted[1].clone()]);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("erased.dxf");
    export_polygons(&merged, 60, 100, 1.0, &path).unwrap();
    let polylines = read_polylines(&path).unwrap();
    assert_eq!(polylines.len(), 1);
    assert!(polylines[0].iter().all(|&(x, _)| x >= 60.0));
}

#[test]
fn mask_building_is_deterministic() {
    let image = square_on_white(80, 60, 20, 15, 50, 45);
    let params = Parameters { gaussian_kernel_size: 4, ..Parameters::default() };
    assert_eq!(
        build_edge_mask(&image, &params).unwrap(),
        build_edge_mask(&image, &params).unwrap()
    );
}

#[test]
fn processing_writes_scaled_file_name() {
    let dir = tempfile::tempdir().unwrap();
    let input_path = dir.path().join("square.png");
    square_on_white(100, 100, 30, 30, 70, 70).to_rgb8().save(&input_path).unwrap();

    let out_dir = dir.path().join("out");
    std::fs::create_dir_all(&out_dir).unwrap();
    let options = OutputOptions {
        output_dir: out_dir.clone(),
        export_scale: 2.0,
        save_debug_mask: true,
    };
    let params = Parameters { mm_per_pixel: 1.0, ..scenario_params(false) };

    let outcome = process_image(load_image(&input_path).unwrap(), &params, &options, None).unwrap();
    let summary = match outcome {
        ProcessOutcome::Exported(summary) => summary,
        ProcessOutcome::NoContours => panic!("expected an export"),
    };
    assert_eq!(summary.path, out_dir.join("square_200x200.dxf"));
    assert!(out_dir.join("debug").join("square_mask.png").is_file());

    // Export scale 2 halves the millimetres per pixel
    let polylines = read_polylines(&summary.path).unwrap();
    let max_x = polylines[0].iter().map(|p| p.0).fold(0.0, f64::max);
    assert!((max_x - 49.5).abs() <= 1.0, "max x {}", max_x);
}

#[test]
fn empty_result_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let input_path = dir.path().join("blank.png");
    save_mask(&image::GrayImage::from_pixel(40, 40, image::Luma([200])), &input_path).unwrap();

    let out_dir = dir.path().join("out");
    std::fs::create_dir_all(&out_dir).unwrap();
    let options = OutputOptions {
        output_dir: out_dir.clone(),
        export_scale: 1.0,
        save_debug_mask: false,
    };

    // Flat image, inverted mask: every pixel is on, so there is no region to trace
    let outcome = process_image(load_image(&input_path).unwrap(), &Parameters::default(), &options, None).unwrap();
    assert!(matches!(outcome, ProcessOutcome::NoContours));
    assert_eq!(std::fs::read_dir(&out_dir).unwrap().count(), 0);
}

#[test]
fn annotations_replace_extracted_geometry() {
    let dir = tempfile::tempdir().unwrap();
    let input_path = dir.path().join("square.png");
    square_on_white(100, 100, 30, 30, 70, 70).to_rgb8().save(&input_path).unwrap();
    let options = OutputOptions {
        output_dir: dir.path().to_path_buf(),
        export_scale: 1.0,
        save_debug_mask: false,
    };
    let params = scenario_params(false);

    let mut annotations = Annotations::new();
    annotations.erase_contour(0);
    let outcome = process_image(load_image(&input_path).unwrap(), &params, &options, Some(&annotations)).unwrap();
    assert!(matches!(outcome, ProcessOutcome::NoContours));

    annotations.add_shape(ShapeSpec::Rectangle {
        start: ScenePoint::new(10.0, 10.0),
        end: ScenePoint::new(20.0, 30.0),
    });
    let annotations_path = dir.path().join("edits.json");
    annotations.save_to_file(&annotations_path).unwrap();
    let annotations = Annotations::from_file(&annotations_path).unwrap();

    let outcome = process_image(load_image(&input_path).unwrap(), &params, &options, Some(&annotations)).unwrap();
    let ProcessOutcome::Exported(summary) = outcome else {
        panic!("expected an export");
    };
    let polylines = read_polylines(&summary.path).unwrap();
    assert_eq!(polylines.len(), 1);
    let first = polylines[0][0];
    let expected = CoordinateMapper::new(100, params.mm_per_pixel).unwrap().map(PixelPoint::new(10, 10));
    assert!((first.0 - expected.0).abs() < 1e-6 && (first.1 - expected.1).abs() < 1e-6);
}

#[test]
fn bad_export_scale_is_rejected_before_processing() {
    let dir = tempfile::tempdir().unwrap();
    let input_path = dir.path().join("square.png");
    square_on_white(40, 40, 10, 10, 30, 30).to_rgb8().save(&input_path).unwrap();
    let options = OutputOptions {
        output_dir: dir.path().to_path_buf(),
        export_scale: 0.0,
        save_debug_mask: false,
    };
    let err = process_image(load_image(&input_path).unwrap(), &Parameters::default(), &options, None).unwrap_err();
    assert_eq!(err.kind(), edge_vectorizer_lib::ErrorKind::InvalidInput);
}

#[test]
fn same_stem_images_in_a_batch_get_distinct_outputs() {
    let dir = tempfile::tempdir().unwrap();
    let input_dir = dir.path().join("scans");
    std::fs::create_dir_all(input_dir.join("sub")).unwrap();
    let image = square_on_white(40, 40, 10, 10, 30, 30).to_rgb8();
    image.save(input_dir.join("a.png")).unwrap();
    image.save(input_dir.join("a.bmp")).unwrap();
    image.save(input_dir.join("sub").join("a.png")).unwrap();

    let out_dir = dir.path().join("out");
    let options = OutputOptions {
        output_dir: out_dir.clone(),
        export_scale: 1.0,
        save_debug_mask: false,
    };
    let files = get_image_files_in_dir(&input_dir).unwrap();
    let plan = plan_batch(&input_dir, &files, &out_dir);
    assert_eq!(plan.len(), 3);

    let mut written = BTreeSet::new();
    for item in &plan {
        match process_batch_item(item, &scenario_params(false), &options).unwrap() {
            ProcessOutcome::Exported(summary) => {
                assert!(written.insert(summary.path.clone()), "{} written twice", summary.path.display());
            }
            ProcessOutcome::NoContours => panic!("expected an export for {}", item.input.display()),
        }
    }

    let expected: BTreeSet<_> = [
        out_dir.join("a_bmp_40x40.dxf"),
        out_dir.join("a_png_40x40.dxf"),
        out_dir.join("sub").join("a_40x40.dxf"),
    ]
    .into_iter()
    .collect();
    assert_eq!(written, expected);
    assert!(expected.iter().all(|path| path.is_file()));
}
