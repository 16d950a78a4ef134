use std::fs;

use approx::assert_relative_eq;
use camino::{Utf8Path, Utf8PathBuf};
use shark_constraints::{
    catalog::{MemoryCatalogReader, MULTIPLE_BATCHES},
    constants::PENALTY,
    evaluate, evaluate_particles,
    evaluation::{evaluate_constraint, format_results_table, ParticleSummary},
    log_results,
    observations::ObservationStore,
    parse,
    plotting::{CsvCurveWriter, CurveRow},
    stat_tests::StatTestKind,
    ConstraintError,
};

mod common;
use common::{data_dir, galaxies, Setup, SNAP_Z0};

/// Fresh, empty directory under the cargo target tmp dir.
fn scratch_dir(name: &str) -> Utf8PathBuf {
    let dir = Utf8PathBuf::from(env!("CARGO_TARGET_TMPDIR")).join(name);
    if dir.exists() {
        fs::remove_dir_all(&dir).unwrap();
    }
    fs::create_dir_all(&dir).unwrap();
    dir
}

/// Copy of the observation fixtures without the HI mass function table.
fn store_without_himf() -> ObservationStore {
    let root = scratch_dir("observations_without_himf");
    let smf = root.join("mf/SMF");
    fs::create_dir_all(&smf).unwrap();
    for file in ["GAMAII_BBD_GSMFs.dat", "Wright18_CombinedSMF.dat"] {
        fs::copy(data_dir().join("mf/SMF").join(file), smf.join(file)).unwrap();
    }
    ObservationStore::new(root)
}

#[test]
fn every_constraint_scores_a_complete_run() {
    let setup = Setup::new();
    let constraints = parse("HIMF,SMF_z0,SMF_z1").unwrap();
    let run = Utf8Path::new("run");

    for test in [StatTestKind::Chi2, StatTestKind::StudentT] {
        let scores = evaluate(&setup.ctx(), &constraints, &test, run, &[0], None);
        assert_eq!(scores.len(), 3);
        for (c, s) in constraints.iter().zip(&scores) {
            assert!(s.is_finite() && *s >= 0.0 && *s < PENALTY, "{c}: {s}");
        }
    }
}

#[test]
fn missing_observation_file_only_penalises_its_constraint() {
    let mut setup = Setup::new();
    setup.store = store_without_himf();
    let constraints = parse("HIMF,SMF_z0,SMF_z1").unwrap();
    let run = Utf8Path::new("run");

    let ctx = setup.ctx();
    let chi2 = StatTestKind::Chi2;

    let err = evaluate_constraint(&ctx, &constraints[0], &chi2, run, &[0], None).unwrap_err();
    assert!(matches!(err, ConstraintError::ObservationIo { .. }));

    let scores = evaluate(&ctx, &constraints, &chi2, run, &[0], None);
    assert_eq!(scores.len(), 3);
    assert_eq!(scores[0], PENALTY);
    assert!(scores[1].is_finite() && scores[1] < PENALTY);
    assert!(scores[2].is_finite() && scores[2] < PENALTY);

    // Same scores as with the complete store for the unaffected constraints.
    let complete = Setup::new();
    let reference = evaluate(&complete.ctx(), &constraints, &chi2, run, &[0], None);
    assert_eq!(scores[1..], reference[1..]);
}

#[test]
fn missing_observation_directory_penalises_everything() {
    let mut setup = Setup::new();
    setup.store = ObservationStore::new(data_dir().join("does_not_exist"));
    let constraints = parse("HIMF,SMF_z0").unwrap();
    let run = Utf8Path::new("run");

    let scores = evaluate(&setup.ctx(), &constraints, &StatTestKind::Chi2, run, &[0], None);
    assert_eq!(scores, vec![PENALTY, PENALTY]);
}

#[test]
fn missing_snapshot_is_penalised() {
    let mut setup = Setup::new();
    setup.table = [(0.0, SNAP_Z0)].into_iter().collect();
    let constraints = parse("SMF_z1,SMF_z0").unwrap();
    let ctx = setup.ctx();
    let run = Utf8Path::new("run");

    let err = evaluate_constraint(&ctx, &constraints[0], &StatTestKind::Chi2, run, &[0], None)
        .unwrap_err();
    assert_eq!(err, ConstraintError::MissingRedshift(1.0));
    assert!(!err.is_validation());

    let scores = evaluate(&ctx, &constraints, &StatTestKind::Chi2, run, &[0], None);
    assert_eq!(scores[0], PENALTY);
    assert!(scores[1] < PENALTY);
}

#[test]
fn merged_batches_match_separate_subvolumes() {
    let mut setup = Setup::new();
    let half = || galaxies(1000, 5.0e3, 7.5, 12.5);
    setup.reader.insert("split", SNAP_Z0, 0, half());
    setup.reader.insert("split", SNAP_Z0, 1, half());
    let mut both = half();
    both.extend(&half()).unwrap();
    setup.reader.insert("split", SNAP_Z0, MULTIPLE_BATCHES, both);

    let ctx = setup.ctx();
    let run = Utf8Path::new("split");
    let merged = parse("SMF_z0").unwrap();
    let separate: Vec<_> = merged
        .iter()
        .map(|c| c.clone().with_multiple_batches(false))
        .collect();

    let chi2 = StatTestKind::Chi2;

    let a = evaluate_constraint(&ctx, &merged[0], &chi2, run, &[0, 1], None).unwrap();
    let b = evaluate_constraint(&ctx, &separate[0], &chi2, run, &[0, 1], None).unwrap();
    assert_relative_eq!(a, b, max_relative = 1e-12);

    // A single subvolume is never redirected to the merged batch.
    setup.reader = MemoryCatalogReader::new();
    setup.reader.insert("split", SNAP_Z0, 0, half());
    let single = evaluate_constraint(&setup.ctx(), &merged[0], &chi2, run, &[0], None);
    assert!(single.is_ok());
}

#[test]
fn plots_are_written_per_constraint() {
    let setup = Setup::new();
    let writer = CsvCurveWriter::new();
    let ctx = setup.ctx().with_plotter(&writer);
    let outdir = scratch_dir("evaluate_constraints_plots");
    let run = Utf8Path::new("run");

    let constraints = parse("HIMF(8-11),SMF_z0").unwrap();
    let scores = evaluate(&ctx, &constraints, &StatTestKind::Chi2, run, &[0], Some(&*outdir));
    assert!(scores.iter().all(|s| *s < PENALTY));

    for name in ["HIMF(8.0-11.0)", "SMF_z0(8.0-13.0)"] {
        let mut reader = csv::Reader::from_path(outdir.join(format!("{name}.csv"))).unwrap();
        let rows: Vec<CurveRow> = reader.deserialize().collect::<Result<_, _>>().unwrap();
        assert!(rows.iter().any(|r| r.series == "observation" && r.in_domain));
        assert!(rows.iter().any(|r| r.series == "model"));
    }
}

#[test]
fn same_kind_constraints_get_distinct_plot_files() {
    let setup = Setup::new();
    let writer = CsvCurveWriter::new();
    let ctx = setup.ctx().with_plotter(&writer);
    let outdir = scratch_dir("same_kind_plots");
    let run = Utf8Path::new("run");

    let constraints = parse("SMF_z0(8-10),SMF_z0(10-13)").unwrap();
    let scores = evaluate(&ctx, &constraints, &StatTestKind::Chi2, run, &[0], Some(&*outdir));
    assert!(scores.iter().all(|s| *s < PENALTY));

    let mut files: Vec<String> = fs::read_dir(&outdir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().into_string().unwrap())
        .collect();
    files.sort();
    assert_eq!(files, ["SMF_z0(10.0-13.0).csv", "SMF_z0(8.0-10.0).csv"]);
}

#[test]
fn plot_request_without_plotter_is_not_an_error() {
    let setup = Setup::new();
    let outdir = scratch_dir("no_plotter");
    let constraints = parse("SMF_z0").unwrap();
    let run = Utf8Path::new("run");

    let plot_dir = Some(outdir.as_path());
    let scores = evaluate(&setup.ctx(), &constraints, &StatTestKind::Chi2, run, &[0], plot_dir);
    assert!(scores[0] < PENALTY);
    assert_eq!(fs::read_dir(&outdir).unwrap().count(), 0);
}

#[test]
fn particle_table_flags_the_best_total() {
    let mut setup = Setup::new();
    setup.reader.insert("sparse", SNAP_Z0, 0, galaxies(300, 1.0e4, 7.5, 12.5));
    let constraints = parse("HIMF,SMF_z0").unwrap();

    let results = evaluate_particles(
        &setup.ctx(),
        &constraints,
        &StatTestKind::Chi2,
        &["run", "sparse"],
        &[0],
        None,
    );
    assert_eq!(results.len(), 2);

    let summary = ParticleSummary::new(&results);
    for (result, total) in results.iter().zip(&summary.totals) {
        assert_relative_eq!(*total, result[0] + result[1]);
    }

    let table = log_results(&constraints, &results);
    assert_eq!(table, format_results_table(&constraints, &results));
    let rows: Vec<&str> = table.lines().skip(3).collect();
    assert_eq!(rows.len(), 2);
    let flagged: Vec<_> = rows.iter().filter(|r| r.ends_with('*')).collect();
    assert_eq!(flagged.len(), 1);
    let best = summary.best_particle.unwrap();
    assert!(rows[best].ends_with('*'));
    assert!(rows[best].starts_with(&format!("{best:>2} ")));
}
