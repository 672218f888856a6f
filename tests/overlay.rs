use image::{DynamicImage, GenericImageView, Rgba, RgbaImage};

use voxsight::{
    BoundingBox, CategoryId, CategoryRegistry, Detection, DetectionSet, OverlayStyle, Resolution,
    filter, render, resolve,
};

fn scene() -> DetectionSet {
    vec![
        Detection::new(CategoryId(2), BoundingBox::new(10.0, 20.0, 40.0, 50.0), 0.9),
        Detection::new(CategoryId(2), BoundingBox::new(12.0, 22.0, 30.0, 45.0), 0.6),
        Detection::new(CategoryId(5), BoundingBox::new(45.0, 40.0, 60.0, 60.0), 0.8),
    ]
    .into()
}

fn category(name: &str) -> voxsight::Category {
    match resolve(CategoryRegistry::coco(), name) {
        Resolution::Found(category) => category,
        Resolution::NotFound => panic!("{name} should be a COCO category"),
    }
}

#[test]
fn spoken_name_drives_filter_and_render() {
    let registry = CategoryRegistry::coco();
    let car = category("CAR");
    assert_eq!(car.id, CategoryId(2));
    assert_eq!(registry.get(car.id), Some(car));

    let detections = scene();
    let filtered = filter(&detections, car.id);
    let confidences: Vec<f32> = filtered.iter().map(|d| d.confidence).collect();
    assert_eq!(confidences, vec![0.9, 0.6]);

    let base = DynamicImage::new_rgb8(64, 64);
    let image = render(&base, &filtered, &car, &OverlayStyle::default());
    assert_eq!(image.dimensions(), base.dimensions());
    let edge = image.get_pixel(10, 35);
    assert_eq!(edge.0[0], 0);
    assert!(edge.0[1] > 0);
}

#[test]
fn rendering_leaves_detections_and_base_untouched() {
    let detections = scene();
    let snapshot = detections.clone();
    let base = DynamicImage::new_rgb8(64, 64);
    let base_bytes = base.as_bytes().to_vec();
    let style = OverlayStyle::default();

    let car = category("car");
    let bus = category("bus");
    let first = render(&base, &filter(&detections, car.id), &car, &style);
    let second = render(&base, &filter(&detections, bus.id), &bus, &style);

    assert_eq!(detections, snapshot);
    assert_eq!(base.as_bytes(), base_bytes.as_slice());
    assert_ne!(first.as_bytes(), second.as_bytes());
    assert_eq!(second.get_pixel(10, 35).0[..3], [0, 0, 0]);
}

#[test]
fn missing_category_renders_identical_image() {
    let detections = scene();
    let truck = category("truck");
    let filtered = filter(&detections, truck.id);
    assert!(filtered.is_empty());

    let base = DynamicImage::ImageRgba8(RgbaImage::from_pixel(16, 16, Rgba([30, 60, 90, 128])));
    let image = render(&base, &filtered, &truck, &OverlayStyle::default());
    assert_eq!(image.as_bytes(), base.as_bytes());
}

#[test]
fn alpha_base_keeps_alpha_channel() {
    let detections = scene();
    let car = category("car");
    let base = DynamicImage::ImageRgba8(RgbaImage::from_pixel(64, 64, Rgba([0, 0, 0, 255])));

    let image = render(&base, &filter(&detections, car.id), &car, &OverlayStyle::default());
    assert!(image.color().has_alpha());
    assert_eq!(image.get_pixel(63, 63), Rgba([0, 0, 0, 255]));
}

#[test]
fn translucent_base_is_unchanged_outside_the_overlay() {
    let translucent = Rgba([91, 60, 200, 128]);
    let base = DynamicImage::ImageRgba8(RgbaImage::from_pixel(64, 64, translucent));
    let detections: DetectionSet =
        vec![Detection::new(CategoryId(2), BoundingBox::new(40.0, 40.0, 50.0, 50.0), 0.9)].into();
    let car = category("car");

    let image = render(&base, &filter(&detections, car.id), &car, &OverlayStyle::default());

    assert_eq!(image.get_pixel(2, 62), translucent);
    assert_eq!(image.get_pixel(63, 0), translucent);
    assert_ne!(image.get_pixel(40, 45), translucent);
}
