use std::fs;
use std::path::{Path, PathBuf};

use sigmafgm::core::ellipse::{AxisBounds, ConfidenceEllipse};
use sigmafgm::core::stats::{DistributionSample, TimeSeries};
use sigmafgm::core::trajectory::{
    AnimationSettings, FrameError, FrameFailure, RenderSettings, TrajectoryRenderer,
};

fn spiral(len: usize) -> TimeSeries {
    (0..len)
        .map(|i| {
            let t = i as f64 * 0.05;
            let r = 3.0 * (-0.1 * t).exp();
            DistributionSample {
                step: i as u64,
                time: t,
                mean: [r * t.cos(), r * t.sin()],
                spread: [0.2 + 0.01 * t, 0.1],
                theta: t,
            }
        })
        .collect::<Vec<_>>()
        .into()
}

fn plain(stride: usize) -> RenderSettings {
    RenderSettings {
        stride,
        frame_size: 200,
        annotate: false,
        ..RenderSettings::default()
    }
}

fn listing(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn single_sample_yields_frame_zero() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("frames");
    let report = TrajectoryRenderer::new(plain(1000))
        .render(&spiral(1), &out)
        .unwrap();
    assert!(report.is_complete());
    assert_eq!(report.frames, vec![out.join("frame_000.png")]);
    assert_eq!(listing(&out), vec!["frame_000.png"]);
}

#[test]
fn empty_series_is_a_no_op() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("frames");
    let report = TrajectoryRenderer::new(plain(1000))
        .render(&TimeSeries::new(), &out)
        .unwrap();
    assert!(report.frames.is_empty());
    assert!(report.failures.is_empty());
    assert!(listing(&out).is_empty());
}

#[test]
fn frames_follow_stride_and_rerun_is_identical() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("frames");
    let renderer = TrajectoryRenderer::new(plain(25));
    let series = spiral(101);

    let first = renderer.render(&series, &out).unwrap();
    let first_listing = listing(&out);
    fs::write(out.join("stale.png"), b"left over").unwrap();

    let second = renderer.render(&series, &out).unwrap();
    assert_eq!(first.frames, second.frames);
    assert_eq!(listing(&out), first_listing);
    assert_eq!(
        first_listing,
        vec![
            "frame_000.png",
            "frame_025.png",
            "frame_050.png",
            "frame_075.png",
            "frame_100.png",
        ]
    );
    for frame in &second.frames {
        assert!(fs::metadata(frame).unwrap().len() > 0);
    }
}

#[test]
fn bad_sample_fails_only_its_frame() {
    let mut samples: Vec<DistributionSample> = spiral(4).iter().copied().collect();
    samples[2].mean[0] = f64::NAN;
    samples[3].spread[1] = -0.5;
    let series = TimeSeries::from(samples);

    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("frames");
    let report = TrajectoryRenderer::new(plain(1)).render(&series, &out).unwrap();

    let written: Vec<PathBuf> = vec![out.join("frame_000.png"), out.join("frame_001.png")];
    assert_eq!(report.frames, written);
    let failed: Vec<usize> = report.failures.iter().map(|f| f.index).collect();
    assert_eq!(failed, vec![2, 3]);
    assert!(
        report
            .failures
            .iter()
            .all(|f| matches!(f.error, FrameError::InvalidSample(_)))
    );
    assert!(!out.join("frame_002.png").exists());
    assert!(!report.is_complete());
}

#[test]
fn overflowing_spread_is_a_degenerate_ellipse() {
    let mut samples: Vec<DistributionSample> = spiral(2).iter().copied().collect();
    samples[1].spread = [1e308, 1.0];
    let series = TimeSeries::from(samples);

    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("frames");
    let settings = RenderSettings {
        animation: Some(AnimationSettings {
            path: dir.path().join("trajectory.gif"),
            frame_delay_ms: 50,
        }),
        ..plain(1)
    };
    let report = TrajectoryRenderer::new(settings).render(&series, &out).unwrap();

    assert_eq!(report.frames, vec![out.join("frame_000.png")]);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].index, 1);
    match &report.failures[0].error {
        FrameError::DegenerateEllipse((a, b)) => {
            assert!(a.is_infinite());
            assert_eq!(*b, 2.0);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(matches!(
        report.animation_failures[..],
        [FrameFailure {
            index: 1,
            error: FrameError::DegenerateEllipse(_)
        }]
    ));
    assert_eq!(listing(&out), vec!["frame_000.png"]);
}

#[test]
fn mean_far_outside_bounds_still_renders() {
    let series = TimeSeries::from(vec![DistributionSample {
        step: 0,
        time: 0.0,
        mean: [40.0, -40.0],
        spread: [1.0, 1.0],
        theta: 0.0,
    }]);
    let dir = tempfile::tempdir().unwrap();
    let report = TrajectoryRenderer::new(plain(1))
        .render(&series, &dir.path().join("frames"))
        .unwrap();
    assert!(report.is_complete());
    assert_eq!(report.frames.len(), 1);
}

#[test]
fn animation_collects_every_frame() {
    let dir = tempfile::tempdir().unwrap();
    let gif = dir.path().join("trajectory.gif");
    let settings = RenderSettings {
        animation: Some(AnimationSettings {
            path: gif.clone(),
            frame_delay_ms: 50,
        }),
        ..plain(10)
    };
    let report = TrajectoryRenderer::new(settings)
        .render(&spiral(30), &dir.path().join("frames"))
        .unwrap();
    assert!(report.is_complete());
    assert_eq!(report.frames.len(), 3);
    assert_eq!(report.animation, Some(gif.clone()));
    assert!(fs::metadata(&gif).unwrap().len() > 0);
}

#[test]
fn ellipse_matches_sample_for_every_frame() {
    for sample in spiral(50).iter() {
        let ellipse = ConfidenceEllipse::from_sample(sample);
        assert_eq!(ellipse.semi_axes.0, 2.0 * sample.spread[0]);
        assert_eq!(ellipse.semi_axes.1, 2.0 * sample.spread[1]);
        assert_eq!(ellipse.angle_deg, sample.theta.to_degrees());
        assert_eq!(ellipse.center, (sample.mean[0], sample.mean[1]));
    }
    assert_eq!(AxisBounds::default(), AxisBounds::symmetric(4.0));
}
