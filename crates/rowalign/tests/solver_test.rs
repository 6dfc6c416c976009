use rowalign::{Error, Graph, NodeDescriptor, SolverOptions, compact_isolated, solve};

const GAP_TOLERANCE: f64 = 1e-6;

fn b() -> NodeDescriptor {
    NodeDescriptor::boxed()
}

fn p() -> NodeDescriptor {
    NodeDescriptor::point()
}

fn chain() -> Graph {
    Graph::new(&[
        vec![b().with_below([0])],
        vec![b().with_above([0]).with_below([0])],
        vec![b().with_above([0])],
    ])
    .unwrap()
}

fn assert_ordered_with_gaps(g: &Graph) {
    for ids in g.rows() {
        for w in ids.windows(2) {
            let (a, c) = (g.node(w[0]), g.node(w[1]));
            let gap = c.position() - a.position();
            assert!(
                gap >= a.buffer() + c.buffer() - GAP_TOLERANCE,
                "gap {gap} between {} and {} is below the minimum",
                a.id(),
                c.id()
            );
        }
        for &id in ids {
            let x = g.position(id);
            assert!(x.is_finite() && x >= 0.0, "bad position {x} for {id}");
        }
    }
}

#[test]
fn solver_keeps_an_unrelated_row_left_justified() {
    let mut g = Graph::new(&[vec![b(), b()]]).unwrap();
    let report = g.solve(&SolverOptions::default()).unwrap();
    assert_eq!(g.positions(), vec![vec![0.0, 5.0]]);
    assert!(report.converged);
    assert_eq!(report.rounds, SolverOptions::default().quiet_rounds);
    assert_eq!(report.compacted, 0);
    assert_eq!(report.residual, 0.0);
}

#[test]
fn solver_aligns_a_vertical_chain() {
    let mut g = chain();
    g.seed_positions(&[vec![0.0], vec![40.0], vec![10.0]]).unwrap();
    let report = g.solve(&SolverOptions::default()).unwrap();
    assert!(report.converged);

    let xs: Vec<f64> = g.positions().into_iter().flatten().collect();
    for x in &xs {
        assert!((x - xs[0]).abs() < 0.01, "chain not aligned: {xs:?}");
    }
    // Internal springs conserve the center of mass.
    let mean = xs.iter().sum::<f64>() / 3.0;
    assert!((mean - 50.0 / 3.0).abs() < 0.01, "center drifted to {mean}");
    assert!(report.residual < 0.01);
}

#[test]
fn solver_aligns_across_a_blocked_row() {
    // a b        b is pulled left toward c but a holds it at its minimum gap.
    //   |
    //   c
    //   |
    //   d
    let mut g = Graph::new(&[
        vec![b(), b().with_below([0])],
        vec![b().with_above([1]).with_below([0])],
        vec![b().with_above([0])],
    ])
    .unwrap();
    g.solve(&SolverOptions::default()).unwrap();
    assert_ordered_with_gaps(&g);

    let bx = g.node_at(0, 1).unwrap().position();
    let cx = g.node_at(1, 0).unwrap().position();
    let dx = g.node_at(2, 0).unwrap().position();
    assert!(bx >= 5.0 - GAP_TOLERANCE);
    assert!((cx - bx).abs() < 0.01 && (dx - bx).abs() < 0.01, "{bx} {cx} {dx}");
}

#[test]
fn solver_packs_partners_against_the_node_between_them() {
    let mut g = Graph::new(&[vec![b().with_partners([2]), p(), b().with_partners([0])]]).unwrap();
    g.seed_positions(&[vec![0.0, 20.0, 40.0]]).unwrap();
    g.solve(&SolverOptions::default()).unwrap();
    assert_ordered_with_gaps(&g);

    let xs = &g.positions()[0];
    assert!((xs[1] - xs[0] - 3.0).abs() < GAP_TOLERANCE, "{xs:?}");
    assert!((xs[2] - xs[1] - 3.0).abs() < GAP_TOLERANCE, "{xs:?}");
}

fn split_row(middle: f64) -> Graph {
    let mut g = Graph::new(&[
        vec![b().with_below([0]), b().with_below([2])],
        vec![b().with_above([0]), p(), b().with_above([1])],
    ])
    .unwrap();
    g.seed_positions(&[vec![0.0, 30.0], vec![0.0, middle, 30.0]])
        .unwrap();
    g
}

#[test]
fn solver_compacts_an_isolated_node_toward_the_nearer_neighbor() {
    let mut g = split_row(10.0);
    let report = g.solve(&SolverOptions::default()).unwrap();
    assert_eq!(report.compacted, 1);
    assert_eq!(g.positions()[1], vec![0.0, 3.0, 30.0]);

    let mut g = split_row(25.0);
    g.solve(&SolverOptions::default()).unwrap();
    assert_eq!(g.positions()[1], vec![0.0, 27.0, 30.0]);
}

#[test]
fn compaction_can_be_disabled() {
    let mut g = split_row(10.0);
    let opts = SolverOptions {
        compact_isolated: false,
        ..Default::default()
    };
    let report = g.solve(&opts).unwrap();
    assert_eq!(report.compacted, 0);
    assert_eq!(g.positions()[1], vec![0.0, 10.0, 30.0]);
}

#[test]
fn compaction_splits_a_run_of_isolated_nodes() {
    let mut g = Graph::new(&[
        vec![b().with_below([0]), b().with_below([3])],
        vec![b().with_above([0]), p(), p(), b().with_above([1])],
    ])
    .unwrap();
    g.seed_positions(&[vec![0.0, 40.0], vec![0.0, 8.0, 35.0, 40.0]])
        .unwrap();
    assert_eq!(compact_isolated(&mut g), 2);
    assert_eq!(g.positions()[1], vec![0.0, 3.0, 37.0, 40.0]);
}

#[test]
fn compaction_leaves_fully_isolated_rows_alone() {
    let mut g = Graph::new(&[vec![p(), p(), b()]]).unwrap();
    g.seed_positions(&[vec![1.0, 9.0, 20.0]]).unwrap();
    assert_eq!(compact_isolated(&mut g), 0);
    assert_eq!(g.positions(), vec![vec![1.0, 9.0, 20.0]]);
}

#[test]
fn solver_reports_the_round_cap() {
    let mut g = chain();
    g.seed_positions(&[vec![0.0], vec![40.0], vec![10.0]]).unwrap();
    let opts = SolverOptions {
        max_rounds: 10,
        ..Default::default()
    };
    let err = g.solve(&opts).unwrap_err();
    assert!(matches!(err, Error::NotConverged { rounds: 10, .. }));
    // The layout is still valid, just not settled.
    g.check_invariants(GAP_TOLERANCE).unwrap();
    assert_ordered_with_gaps(&g);
}

#[test]
fn solver_can_return_an_unconverged_layout() {
    let mut g = chain();
    g.seed_positions(&[vec![0.0], vec![40.0], vec![10.0]]).unwrap();
    let opts = SolverOptions {
        max_rounds: 10,
        allow_unconverged: true,
        ..Default::default()
    };
    let report = g.solve(&opts).unwrap();
    assert!(!report.converged);
    assert_eq!(report.rounds, 10);
    assert_eq!(report.compacted, 0);
}

#[test]
fn solver_rejects_invalid_options_before_moving_anything() {
    let mut g = chain();
    g.seed_positions(&[vec![0.0], vec![40.0], vec![10.0]]).unwrap();
    let opts = SolverOptions {
        stiffness_to_mass: 0.0,
        ..Default::default()
    };
    assert!(matches!(
        solve(&mut g, &opts),
        Err(Error::InvalidOptions { .. })
    ));
    assert_eq!(g.positions(), vec![vec![0.0], vec![40.0], vec![10.0]]);
}

#[test]
fn solver_is_deterministic() {
    let build = || {
        let mut g = Graph::new(&[
            vec![b().with_below([0, 1]), p(), b().with_below([2])],
            vec![
                b().with_above([0]).with_partners([1]),
                b().with_above([0]).with_partners([0]),
                p().with_above([2]),
            ],
        ])
        .unwrap();
        let opts = SolverOptions {
            allow_unconverged: true,
            ..Default::default()
        };
        g.solve(&opts).unwrap();
        g.positions()
    };
    assert_eq!(build(), build());
}

#[test]
fn solver_handles_an_empty_graph() {
    let mut g = Graph::new(&[]).unwrap();
    let report = g.solve(&SolverOptions::default()).unwrap();
    assert_eq!(report.rounds, 0);
    assert!(report.converged);
}

fn two_rows(top: f64, bottom: f64) -> Graph {
    let mut g = Graph::new(&[vec![b().with_below([0])], vec![b().with_above([0])]]).unwrap();
    g.seed_positions(&[vec![top], vec![bottom]]).unwrap();
    g
}

fn rounds(n: usize) -> SolverOptions {
    SolverOptions {
        max_rounds: n,
        allow_unconverged: true,
        ..Default::default()
    }
}

#[test]
fn acceleration_from_rest_is_capped_at_the_floor() {
    // The raw spring acceleration is 1000; from rest the cap is the floor of 10, then damping.
    let mut g = two_rows(0.0, 1_000_000.0);
    g.solve(&rounds(1)).unwrap();
    let xs = g.positions();
    assert!((xs[0][0] - 9.9).abs() < 1e-9, "{xs:?}");
    assert!((xs[1][0] - (1_000_000.0 - 9.9)).abs() < 1e-6, "{xs:?}");
}

#[test]
fn acceleration_cap_grows_with_speed() {
    // Second round: cap is 1.2 * 9.9 = 11.88, so v = (9.9 + 11.88) * 0.99.
    let mut g = two_rows(0.0, 1_000_000.0);
    g.solve(&rounds(2)).unwrap();
    let top = g.positions()[0][0];
    assert!((top - (9.9 + 21.78 * 0.99)).abs() < 1e-9, "{top}");
}

#[test]
fn velocity_cap_limits_every_round() {
    let cap = 0.001;
    let opts = SolverOptions {
        initial_max_velocity: cap,
        ..rounds(1)
    };
    let mut g = chain();
    g.seed_positions(&[vec![0.0], vec![40.0], vec![10.0]]).unwrap();
    let mut before = g.positions();
    for _ in 0..50 {
        let report = g.solve(&opts).unwrap();
        assert_eq!(report.max_velocity, cap);
        let after = g.positions();
        for (x0, x1) in before.iter().flatten().zip(after.iter().flatten()) {
            assert!((x1 - x0).abs() <= cap + 1e-12, "moved {} in one round", x1 - x0);
        }
        before = after;
    }
    // The top node is pulled right hard enough to run at the cap the whole time.
    assert!((before[0][0] - 50.0 * cap).abs() < 1e-9, "{before:?}");
}

#[test]
fn velocity_cap_decays_after_stalled_rounds() {
    let mut g = chain();
    g.seed_positions(&[vec![0.0], vec![40.0], vec![10.0]]).unwrap();
    let opts = SolverOptions {
        stall_rounds: 5,
        ..rounds(20_000)
    };
    let report = g.solve(&opts).unwrap();
    assert!(
        report.max_velocity < opts.initial_max_velocity,
        "cap stayed at {}",
        report.max_velocity
    );
    // Each decay is a factor of `velocity_decay`.
    let steps = (report.max_velocity / opts.initial_max_velocity).ln() / opts.velocity_decay.ln();
    assert!((steps - steps.round()).abs() < 1e-6, "{steps}");
}

#[test]
fn velocity_cap_is_untouched_when_the_run_settles_before_stalling() {
    let mut g = Graph::new(&[vec![b(), b()]]).unwrap();
    let report = g.solve(&SolverOptions::default()).unwrap();
    // A still row never beats its first shift of 0, but 100 quiet rounds end the run first.
    assert_eq!(report.max_velocity, SolverOptions::default().initial_max_velocity);
}

#[test]
fn solved_layouts_warm_start_a_fresh_graph() {
    let rows = vec![
        vec![b().with_below([0, 1]), p(), b().with_below([2])],
        vec![
            b().with_above([0]).with_partners([1]),
            b().with_above([0]).with_partners([0]),
            p().with_above([2]),
        ],
    ];
    let mut g = Graph::new(&rows).unwrap();
    g.solve(&rounds(5_000)).unwrap();

    let mut fresh = Graph::new(&rows).unwrap();
    fresh.seed_positions(&g.positions()).unwrap();
    assert_eq!(fresh.positions(), g.positions());
}
