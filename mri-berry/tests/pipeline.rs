use mri_berry::prelude::*;
use ndarray::Array2;
use std::f64::consts::PI;

fn init_logger() {
    let _ = simple_logger::SimpleLogger::new()
        .with_level(log::LevelFilter::Debug)
        .init();
}

fn circle(cx: f64, cy: f64, r: f64, n: usize) -> Contour {
    (0..n)
        .map(|k| {
            let theta = k as f64 * 2.0 * PI / n as f64;
            Point::new(cx + r * theta.cos(), cy + r * theta.sin())
        })
        .collect()
}

/// 64x64 的合成切片: 半径 15 的圆盘强度为 200, 背景为 20.
fn synthetic_disk() -> DecodedImage {
    let pixels = Array2::from_shape_fn((64, 64), |(h, w)| {
        let (dy, dx) = (h as f64 - 32.0, w as f64 - 32.0);
        if dx * dx + dy * dy <= 15.0 * 15.0 {
            200.0
        } else {
            20.0
        }
    });
    DecodedImage::new(pixels, (1.25, 1.25)).unwrap()
}

#[test]
fn test_end_to_end_disk() {
    init_logger();
    let image = synthetic_disk();
    let inner = circle(32.0, 32.0, 15.0, 90);
    let outer = circle(32.0, 32.0, 25.0, 90);

    let roi = rasterize(&outer, image.width(), image.height()).unwrap();
    let truth = rasterize(&inner, image.width(), image.height()).unwrap();
    let intensities = Intensities::from_masked(&image, &roi).unwrap();
    assert_eq!(intensities.distinct(), 2);

    let mut thresholder = MixtureThresholder::new(ThresholdSpec::default());
    let model = thresholder.fit(&intensities).unwrap();
    assert_eq!(model.k(), 2);
    let threshold = thresholder.derive_threshold().unwrap();
    assert!(threshold > 20.0 && threshold < 200.0);

    let predicted = thresholder.predict_mask(&image, &roi).unwrap();
    assert!(jaccard(&predicted, &truth).unwrap() >= 0.9);
    assert!(dice(&predicted, &truth).unwrap() >= jaccard(&predicted, &truth).unwrap());
}

#[test]
fn test_end_to_end_whole_image_roi() {
    init_logger();
    let image = synthetic_disk();
    let frame: Contour = [(0.0, 0.0), (63.0, 0.0), (63.0, 63.0), (0.0, 63.0)]
        .into_iter()
        .map(Point::from)
        .collect();
    let roi = rasterize(&frame, 64, 64).unwrap();
    assert_eq!(roi.iter().filter(|&&m| m).count(), 64 * 64);
    let truth = rasterize(&circle(32.0, 32.0, 15.0, 90), 64, 64).unwrap();
    let intensities = Intensities::from_masked(&image, &roi).unwrap();

    for seed in 0..5 {
        let spec = ThresholdSpec::default().with_seed(seed);
        let model = fit_mixture(&intensities, &spec).unwrap();
        let threshold = model.threshold().unwrap();
        assert!(threshold > 20.0 && threshold < 200.0);
        let predicted = predict_mask(&image, threshold, &roi).unwrap();
        assert!(jaccard(&predicted, &truth).unwrap() >= 0.9);
    }

    // 分量多于不同强度值个数时, 均值仍取自数据.
    let spec = ThresholdSpec::default().with_components(3);
    let model = fit_mixture(&intensities, &spec).unwrap();
    assert!(model.means().iter().all(|&m| m == 20.0 || m == 200.0));
    let threshold = model.threshold().unwrap();
    let predicted = predict_mask(&image, threshold, &roi).unwrap();
    assert!(jaccard(&predicted, &truth).unwrap() >= 0.9);
}

#[test]
fn test_end_to_end_case() {
    init_logger();
    let mut case = SegmentationCase::new(
        synthetic_disk(),
        circle(32.0, 32.0, 15.0, 90),
        Some(circle(32.0, 32.0, 25.0, 90)),
    )
    .unwrap()
    .with_slice_number(slice_number_from_filename("IM-0001-0048-icontour-manual.txt").unwrap());

    let plain = case.run(&ThresholdSpec::default()).unwrap().jaccard;
    assert!(plain >= 0.9);

    let dilated = case
        .run(&ThresholdSpec::default().with_postprocess(true))
        .unwrap()
        .jaccard;
    assert!(dilated < plain);

    let area = case.inner_area_mm2();
    let expected = PI * 15.0 * 15.0 * 1.25 * 1.25;
    assert!((area - expected).abs() / expected < 0.05);

    let overlay = case.overlay(DEFAULT_OVERLAY_MARGIN).unwrap();
    assert_eq!(overlay.dimensions(), (64, 64));
    assert_eq!(case.slice_number(), Some(48));
}

#[test]
fn test_unfit_thresholder() {
    let image = synthetic_disk();
    let roi = rasterize(&circle(32.0, 32.0, 25.0, 90), 64, 64).unwrap();
    let thresholder = MixtureThresholder::new(ThresholdSpec::default());
    assert!(matches!(
        thresholder.predict_mask(&image, &roi).unwrap_err(),
        BerryError::PreconditionViolation(_)
    ));
}
