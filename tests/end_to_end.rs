use qds_battery_lab::{
    analyze, build_noise, run_cell, run_population, simulate_discharge, summarize_population,
    BoxMuller, CellConfig, DischargeConfig, LabConfig, NoiseKind, PopulationConfig,
    ResidualPattern,
};

#[test]
fn noiseless_cell_fails_after_sixty_seven_steps() {
    let config = CellConfig {
        base_drain_per_step: 1.5,
        fail_threshold: 0.0,
        max_steps: 1200,
    };
    let mut noise = build_noise(&NoiseKind::White { amplitude: 0.0 }, BoxMuller::seeded(0));
    let run = run_cell(&config, &mut noise).expect("valid config");

    assert_eq!(run.lifetime, (100.0_f64 / 1.5).ceil() as usize);
    assert_eq!(run.trajectory.len(), run.lifetime + 1);
    for pair in run.trajectory.windows(2) {
        assert!(pair[1] < pair[0]);
    }
}

#[test]
fn noiseless_discharge_is_linear_to_eighty_percent() {
    let config = DischargeConfig {
        duration_hours: 10.0,
        drain_rate_per_hour: 2.0,
        noise_amplitude: 0.0,
        correlation_tau_minutes: 5.0,
        step_resolution_minutes: 30.0,
        seed: 99,
    };
    let trajectory = simulate_discharge(&config).expect("valid config");
    let summary = trajectory.summary();

    assert_eq!(trajectory.len(), 21);
    assert!((summary.duration_hours - 10.0).abs() < 1e-12);
    assert!((summary.start_health - 100.0).abs() < 1e-12);
    assert!((summary.end_health - 80.0).abs() < 1e-9);
    assert!(trajectory.health().iter().all(|&h| h > 0.0));

    let residual = analyze(&trajectory);
    assert_eq!(residual.pattern, ResidualPattern::NoiseLike);
}

#[test]
fn reference_population_summarizes_both_regimes() {
    let config = PopulationConfig {
        unit_count: 60,
        ..PopulationConfig::default()
    };
    let result = run_population(&config).expect("valid config");
    let summary = summarize_population(&result, config.histogram_bins).expect("valid bins");

    assert_eq!(summary.white.histogram.total(), 60);
    assert_eq!(summary.colored.histogram.total(), 60);
    // mean drain of 1.5 per step puts typical lifetimes near 67 steps
    assert!(summary.white.stats.mean > 40.0 && summary.white.stats.mean < 100.0);
    assert!(summary.colored.stats.mean > 30.0 && summary.colored.stats.mean < 120.0);
    assert!(summary.relative_change_pct.is_some());
    assert_eq!(summary.white.censored, 0);
}

#[test]
fn strongly_correlated_noise_widens_lifetime_spread() {
    let config = PopulationConfig {
        rho: 0.95,
        unit_count: 200,
        ..PopulationConfig::default()
    };
    let result = run_population(&config).expect("valid config");
    let summary = summarize_population(&result, config.histogram_bins).expect("valid bins");

    assert!(summary.colored.stats.std_dev > summary.white.stats.std_dev);
}

#[test]
fn json_config_drives_both_pipelines() {
    let config = LabConfig::from_json_str(
        r#"{
            "population": { "unit_count": 4, "noise_amplitude": 0.0 },
            "discharge": { "duration_hours": 2.0, "noise_amplitude": 0.0 }
        }"#,
    )
    .expect("valid json");
    config.validate().expect("valid config");

    let result = run_population(&config.population).expect("valid config");
    assert_eq!(result.white.lifetimes, vec![67; 4]);

    let trajectory = simulate_discharge(&config.discharge).expect("valid config");
    // 2 h at 5 min resolution
    assert_eq!(trajectory.len(), 25);
}
