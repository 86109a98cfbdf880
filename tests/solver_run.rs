#![cfg(unix)]

use std::fs;
use std::path::Path;

use sigmafgm::core::stats::InvalidSamplePolicy;
use sigmafgm::core::trajectory::RenderSettings;
use sigmafgm::pipeline::{render_stats_file, run_solver};
use sigmafgm::solver::{
    PostProcess, SimulationParams, SolverCommand, SolverError, SolverParams, SweepPlan, run_sweep,
};

/// Stand-in solver: writes a small 2D statistics file into its working dir.
fn fake_solver(dir: &Path) -> std::path::PathBuf {
    let script = dir.join("fake_solver.sh");
    fs::write(
        &script,
        "#!/bin/sh\n\
         printf 'step t mu1 mu2 sigma1 sigma2 theta\\n' > 2Dstatistics.txt\n\
         for i in 0 1 2 3 4; do echo \"$i 0.$i 1.$i 0.5 0.2 0.1 0.$i\" >> 2Dstatistics.txt; done\n\
         echo \"$@\" > args.txt\n",
    )
    .unwrap();
    let mut perms = fs::metadata(&script).unwrap().permissions();
    std::os::unix::fs::PermissionsExt::set_mode(&mut perms, 0o755);
    fs::set_permissions(&script, perms).unwrap();
    script
}

#[test]
fn run_then_render() {
    let dir = tempfile::tempdir().unwrap();
    let work = dir.path().join("work");
    fs::create_dir_all(&work).unwrap();
    let params = SolverParams {
        statistics_2d: true,
        seed: 4242,
        ..SolverParams::default()
    };
    let command = SolverCommand::new(fake_solver(dir.path()), params).with_working_dir(&work);
    let post = PostProcess {
        program: "sh".to_string(),
        args: vec!["-c".to_string(), "touch output.png".to_string()],
    };

    let stats = run_solver(&command, Some(&post), "2Dstatistics.txt".as_ref()).unwrap();
    assert_eq!(stats, work.join("2Dstatistics.txt"));
    assert!(work.join("output.png").exists());

    let recorded = fs::read_to_string(work.join("args.txt")).unwrap();
    assert!(recorded.contains("-seed 4242"));
    assert!(recorded.trim_end().ends_with("-statistics -2Dstatistics"));

    let settings = RenderSettings {
        stride: 2,
        frame_size: 200,
        annotate: false,
        ..RenderSettings::default()
    };
    let out = dir.path().join("frames");
    let report = render_stats_file(&stats, InvalidSamplePolicy::Reject, settings, &out).unwrap();
    assert_eq!(report.frames.len(), 3);
}

#[test]
fn failing_solver_skips_post_processing() {
    let dir = tempfile::tempdir().unwrap();
    let command = SolverCommand::new("false", SolverParams::default()).with_working_dir(dir.path());
    let post = PostProcess {
        program: "sh".to_string(),
        args: vec!["-c".to_string(), "touch output.png".to_string()],
    };
    let err = run_solver(&command, Some(&post), "2Dstatistics.txt".as_ref()).unwrap_err();
    assert!(matches!(
        err,
        sigmafgm::Error::Solver(SolverError::NonZeroExit { .. })
    ));
    assert!(!dir.path().join("output.png").exists());
}

#[test]
fn sweep_runs_simulation_from_relative_path() {
    // A path like `./bin/solver.sh`, relative to the directory tests run in.
    let bin = tempfile::Builder::new()
        .prefix("sigmafgm-bin")
        .tempdir_in(".")
        .unwrap();
    let relative_dir = Path::new(".").join(bin.path().file_name().unwrap());
    let script = fake_solver(&relative_dir);
    assert!(script.is_relative());

    let root = tempfile::tempdir().unwrap();
    let base = SolverCommand::new(script, SimulationParams::default());
    let plan = SweepPlan {
        repetitions: 2,
        seed: Some(3),
        root: root.path().to_path_buf(),
    };
    let report = run_sweep(&base, &plan, None);
    assert_eq!(report.failed().count(), 0, "{:?}", report.runs);

    for run in &report.runs {
        let recorded = fs::read_to_string(run.dir.join("args.txt")).unwrap();
        assert!(recorded.starts_with(&format!("-seed {} -g 100000 ", run.seed)));
        assert!(recorded.contains("-alpha 3.125"));
        assert!(recorded.trim_end().ends_with("-noise ISOTROPIC"));
        assert!(run.dir.join("2Dstatistics.txt").exists());
    }
}
