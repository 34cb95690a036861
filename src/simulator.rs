//! Synthetic orientation feed for driving the client without a physical
//! headset: JSON samples on stdout, one per line, suitable for piping into
//! `nexus-client run`.

use std::io::Write;
use std::time::Duration;

use anyhow::Result;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::head::OrientationSample;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Scenario {
    /// Natural head motion that never crosses the default thresholds.
    Attentive,
    /// Periodic look-down and look-away excursions.
    Distracted,
    /// A perfectly still head; trips the stillness classifier.
    Frozen,
}

#[derive(Debug, Clone, Copy)]
pub struct SimulatorOptions {
    pub scenario: Scenario,
    pub interval_ms: u64,
    pub seed: Option<u64>,
}

pub async fn run(opts: SimulatorOptions) -> Result<()> {
    let mut rng = match opts.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let interval = Duration::from_millis(opts.interval_ms.max(1));
    let mut tick: u64 = 0;

    loop {
        let sample = next_sample(&mut rng, tick, opts.scenario);
        let line = serde_json::to_string(&sample)?;
        println!("{line}");
        // The consumer is usually a pipe; don't let block buffering hold
        // samples back.
        std::io::stdout().flush()?;

        tick += 1;
        tokio::time::sleep(interval).await;
    }
}

fn wrap_alpha(alpha: f64) -> f64 {
    (alpha + 360.0) % 360.0
}

fn next_sample(rng: &mut StdRng, tick: u64, scenario: Scenario) -> OrientationSample {
    match scenario {
        Scenario::Attentive => OrientationSample {
            alpha: wrap_alpha(rng.gen_range(-4.0..4.0)),
            beta: 10.0 + rng.gen_range(-4.0..4.0),
            gamma: rng.gen_range(-4.0..4.0),
        },
        Scenario::Distracted => {
            // A 5-sample excursion at the top of every 30-sample block,
            // alternating between looking down and looking away.
            let in_excursion = tick % 30 < 5;
            if in_excursion && (tick / 30) % 2 == 0 {
                OrientationSample {
                    alpha: wrap_alpha(rng.gen_range(-2.0..2.0)),
                    beta: 50.0 + rng.gen_range(-2.0..2.0),
                    gamma: rng.gen_range(-2.0..2.0),
                }
            } else if in_excursion {
                OrientationSample {
                    alpha: 60.0 + rng.gen_range(-2.0..2.0),
                    beta: 10.0 + rng.gen_range(-2.0..2.0),
                    gamma: rng.gen_range(-2.0..2.0),
                }
            } else {
                OrientationSample {
                    alpha: wrap_alpha(rng.gen_range(-4.0..4.0)),
                    beta: 10.0 + rng.gen_range(-4.0..4.0),
                    gamma: rng.gen_range(-4.0..4.0),
                }
            }
        }
        Scenario::Frozen => OrientationSample {
            alpha: 0.3,
            beta: 10.2,
            gamma: 0.1,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attentive_stream_stays_under_the_default_thresholds() {
        let mut rng = StdRng::seed_from_u64(7);
        for tick in 0..500 {
            let s = next_sample(&mut rng, tick, Scenario::Attentive);
            let yaw_dev = s.alpha.abs().min((s.alpha - 360.0).abs());
            assert!(s.beta < 30.0, "beta {} crossed the down threshold", s.beta);
            assert!(yaw_dev < 35.0, "yaw deviation {yaw_dev} crossed the away threshold");
        }
    }

    #[test]
    fn distracted_stream_produces_both_excursion_kinds() {
        let mut rng = StdRng::seed_from_u64(7);

        // First block looks down.
        for tick in 0..5 {
            let s = next_sample(&mut rng, tick, Scenario::Distracted);
            assert!(s.beta > 30.0);
        }
        // Second block looks away.
        for tick in 30..35 {
            let s = next_sample(&mut rng, tick, Scenario::Distracted);
            let yaw_dev = s.alpha.abs().min((s.alpha - 360.0).abs());
            assert!(yaw_dev > 35.0);
        }
    }

    #[test]
    fn frozen_stream_never_moves() {
        let mut rng = StdRng::seed_from_u64(7);
        let first = next_sample(&mut rng, 0, Scenario::Frozen);
        for tick in 1..100 {
            let s = next_sample(&mut rng, tick, Scenario::Frozen);
            assert_eq!(s.alpha, first.alpha);
            assert_eq!(s.beta, first.beta);
            assert_eq!(s.gamma, first.gamma);
        }
    }
}
