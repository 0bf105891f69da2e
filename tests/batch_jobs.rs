//! Background jobs over an image folder, and sessions picking up their output.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::DynamicImage;
use vidanno::batch::{self, JobContext};
use vidanno::config::UserPreferences;
use vidanno::export::{self, ImageFolderSink, render_dir_for};
use vidanno::{AnnotationDir, AnnotationSession, FrameSource, ProviderRegistry, open_source, spawn_job};
use vidanno_core::error::DetectError;
use vidanno_core::{
    Annotation, AnnotationKind, Argb, CopyTrackerFactory, DetectOptions, Detection, Detector,
    StyleDefaults,
};

fn clip(frames: usize) -> (tempfile::TempDir, PathBuf) {
    let tmp = tempfile::tempdir().unwrap();
    let folder = tmp.path().join("walk");
    std::fs::create_dir(&folder).unwrap();
    for i in 0..frames {
        image::RgbImage::new(40, 40)
            .save(folder.join(format!("{:02}.png", i)))
            .unwrap();
    }
    (tmp, folder)
}

fn source(folder: &Path) -> Arc<dyn FrameSource> {
    Arc::from(open_source(folder).unwrap())
}

/// Reports one person and one dog on every frame.
struct PeopleAndDogs;

impl Detector for PeopleAndDogs {
    fn name(&self) -> &str {
        "people-and-dogs"
    }

    fn supports(&self, kind: AnnotationKind) -> bool {
        kind != AnnotationKind::Circle
    }

    fn detect(&self, _: &DynamicImage, _: AnnotationKind) -> Result<Vec<Detection>, DetectError> {
        Ok(vec![
            Detection {
                x: 0.5,
                y: 0.5,
                x2: 0.25,
                y2: 0.25,
                label: Some("person".to_string()),
                score: Some(0.8125),
                ..Default::default()
            },
            Detection {
                x: 0.0,
                y: 0.0,
                x2: 0.25,
                y2: 0.25,
                label: Some("dog".to_string()),
                score: Some(0.5),
                color: Some(Argb::rgb(0, 0, 255)),
                ..Default::default()
            },
        ])
    }
}

#[test]
fn test_detect_all_in_background() {
    let (_tmp, folder) = clip(4);
    let frames = source(&folder);
    let dir = AnnotationDir::for_source(&folder);
    let options = DetectOptions {
        kind: AnnotationKind::Text,
        color: Some(Argb::rgb(255, 0, 0)),
        keep_labels: vec!["person".to_string()],
        text_template: Some("{label} {score:.2f}".to_string()),
    };

    let job_dir = dir.clone();
    let handle = spawn_job("detect", move |ctx| {
        batch::detect_all(frames.as_ref(), &PeopleAndDogs, &job_dir, 2, &options, ctx)
    })
    .unwrap();
    let summary = handle.join().unwrap();

    assert_eq!(summary.written, 2);
    assert_eq!(dir.frames().unwrap(), vec![2, 3]);
    let saved = dir.load(3).unwrap();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].kind, AnnotationKind::Text);
    assert_eq!(saved[0].label(), Some("person 0.81"));
    assert_eq!(saved[0].style.color, Some(Argb::rgb(255, 0, 0)));
    assert_eq!((saved[0].x, saved[0].x2), (0.25, 0.5));
}

#[test]
fn test_unsupported_kind_skips_frames() {
    let (_tmp, folder) = clip(2);
    let dir = AnnotationDir::for_source(&folder);
    let summary = batch::detect_all(
        source(&folder).as_ref(),
        &PeopleAndDogs,
        &dir,
        0,
        &DetectOptions::new(AnnotationKind::Circle),
        &JobContext::default(),
    )
    .unwrap();
    assert_eq!(summary.skipped, 2);
    assert!(dir.frames().unwrap().is_empty());
}

#[test]
fn test_session_detector_then_copy_and_reload() {
    let (_tmp, folder) = clip(3);
    let mut providers = ProviderRegistry::new();
    providers.register_detector(Arc::new(PeopleAndDogs));
    let mut session = AnnotationSession::open(&folder, UserPreferences::default(), providers).unwrap();

    session.run_detector("people-and-dogs").unwrap().unwrap();
    assert_eq!(session.annotations().len(), 2);
    assert_eq!(session.annotations()[1].style.color, Some(Argb::rgb(0, 0, 255)));

    let last = session.annotations()[1].clone();
    let dir = session.dir().clone();
    let start = session.frame_index() + 1;
    let end = session.frame_count();
    let summary = spawn_job("copy", move |ctx| batch::copy_to_all(&dir, &last, start..end, ctx))
        .unwrap()
        .join()
        .unwrap();
    assert_eq!(summary.written, 2);

    session.goto(2).unwrap();
    assert_eq!(session.annotations().len(), 1);
    assert_eq!(session.annotations()[0].kind, AnnotationKind::Rectangle);
}

#[test]
fn test_track_all_then_export() {
    let (tmp, folder) = clip(3);
    let frames = source(&folder);
    let dir = AnnotationDir::for_source(&folder);
    dir.create().unwrap();
    dir.save(0, &[Annotation::rectangle(0.25, 0.25, 0.75, 0.75)])
        .unwrap();

    let tracked = batch::track_all(
        frames.as_ref(),
        &CopyTrackerFactory,
        &dir,
        0..3,
        &JobContext::default(),
    )
    .unwrap();
    assert_eq!(tracked.written, 2);
    assert_eq!(dir.load(2).unwrap(), dir.load(0).unwrap());

    let render = render_dir_for(&folder);
    assert_eq!(render, tmp.path().join("walk_render"));
    let mut sink = ImageFolderSink::new(&render);
    let exported = export::export(
        frames.as_ref(),
        &dir,
        0..3,
        &StyleDefaults::default(),
        &mut sink,
        &JobContext::default(),
    )
    .unwrap();
    assert_eq!(exported.written, 3);

    let image = image::open(sink.frame_path(1)).unwrap().to_rgba8();
    assert_eq!(image.get_pixel(10, 20).0, [0, 255, 0, 255]);
    assert_eq!(image.get_pixel(20, 20).0, [0, 0, 0, 255]);
}
