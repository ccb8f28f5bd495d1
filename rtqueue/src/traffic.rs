/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Per-tick packet arrivals.
//!
//! [`TrafficGenerator`] produces one batch per link per tick.  The batch size
//! follows the configured [`ArrivalDistribution`]; each packet is stamped with
//! the current tick as its birth tick and a deadline derived from a delay
//! bound drawn uniformly from the link's `[min_delay_bound, max_delay_bound]`.
//!
//! | Distribution | Batch size | Delay bound draws |
//! |---|---|---|
//! | `uniform` | uniform in `[min_packet, max_packet]` | one per packet |
//! | `binomial` | `Binomial(max_packet, binom_param)` | one per packet |
//! | `bernoulli` | `max_packet` w.p. `bern_param`, else `min_packet` | one per batch |
//! | `bernoulli-fine` | as `bernoulli` | one per packet |

use rand::distributions::Bernoulli;
use rand::Rng;
use rand_distr::{Binomial, Distribution};

use crate::error::QueueingError;
use crate::names::ArrivalDistribution;
use crate::packet::{Packet, Traffic};

/// Arrival parameters of one link.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkTrafficSpec {
    pub min_packet: u64,
    pub max_packet: u64,
    /// Success probability for `binomial` arrivals.
    pub binom_param: f64,
    /// Burst probability for `bernoulli` / `bernoulli-fine` arrivals.
    pub bern_param: f64,
    pub min_delay_bound: i64,
    pub max_delay_bound: i64,
}

/// Sampler for one link, with its distributions built once.
#[derive(Debug, Clone)]
struct LinkSampler {
    spec: LinkTrafficSpec,
    binomial: Binomial,
    burst: Bernoulli,
}

/// Generates one [`Traffic`] batch per tick.
#[derive(Debug, Clone)]
pub struct TrafficGenerator {
    distribution: ArrivalDistribution,
    links: Vec<LinkSampler>,
}

impl TrafficGenerator {
    /// Validate every link's parameters and build the samplers.
    ///
    /// # Errors
    /// [`QueueingError::InvalidTrafficParameter`] for a probability outside
    /// `[0, 1]`, `min_packet > max_packet`, or a delay bound range that is
    /// empty or starts below 1.
    pub fn new(
        distribution: ArrivalDistribution,
        specs: Vec<LinkTrafficSpec>,
    ) -> Result<Self, QueueingError> {
        let links = specs
            .into_iter()
            .enumerate()
            .map(|(link, spec)| LinkSampler::new(link, spec))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            distribution,
            links,
        })
    }

    pub fn network_size(&self) -> usize {
        self.links.len()
    }

    pub fn distribution(&self) -> ArrivalDistribution {
        self.distribution
    }

    /// Draw the batches arriving at tick `clock`.
    pub fn generate<R: Rng + ?Sized>(&self, clock: i64, rng: &mut R) -> Traffic {
        self.links
            .iter()
            .map(|link| link.generate(self.distribution, clock, rng))
            .collect()
    }
}

impl LinkSampler {
    fn new(link: usize, spec: LinkTrafficSpec) -> Result<Self, QueueingError> {
        let invalid = |what, detail: String| QueueingError::InvalidTrafficParameter {
            what,
            link,
            detail,
        };
        if spec.min_packet > spec.max_packet {
            return Err(invalid(
                "packet range",
                format!("min_packet {} > max_packet {}", spec.min_packet, spec.max_packet),
            ));
        }
        if spec.min_delay_bound < 1 || spec.min_delay_bound > spec.max_delay_bound {
            return Err(invalid(
                "delay bound range",
                format!("[{}, {}]", spec.min_delay_bound, spec.max_delay_bound),
            ));
        }
        let binomial = Binomial::new(spec.max_packet, spec.binom_param)
            .map_err(|e| invalid("binom_param", format!("{} ({e})", spec.binom_param)))?;
        let burst = Bernoulli::new(spec.bern_param)
            .map_err(|e| invalid("bern_param", format!("{} ({e})", spec.bern_param)))?;
        Ok(Self {
            spec,
            binomial,
            burst,
        })
    }

    fn delay_bound<R: Rng + ?Sized>(&self, rng: &mut R) -> i64 {
        rng.gen_range(self.spec.min_delay_bound..=self.spec.max_delay_bound)
    }

    fn generate<R: Rng + ?Sized>(
        &self,
        distribution: ArrivalDistribution,
        clock: i64,
        rng: &mut R,
    ) -> Vec<Packet> {
        let spec = &self.spec;
        let count = match distribution {
            ArrivalDistribution::Uniform => rng.gen_range(spec.min_packet..=spec.max_packet),
            ArrivalDistribution::Binomial => self.binomial.sample(rng),
            ArrivalDistribution::Bernoulli | ArrivalDistribution::BernoulliFine => {
                if self.burst.sample(rng) {
                    spec.max_packet
                } else {
                    spec.min_packet
                }
            }
        };

        if distribution == ArrivalDistribution::Bernoulli {
            let delay_bound = self.delay_bound(rng);
            return vec![Packet::with_delay_bound(clock, delay_bound); count as usize];
        }
        (0..count)
            .map(|_| Packet::with_delay_bound(clock, self.delay_bound(rng)))
            .collect()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn spec(min_packet: u64, max_packet: u64) -> LinkTrafficSpec {
        LinkTrafficSpec {
            min_packet,
            max_packet,
            binom_param: 0.5,
            bern_param: 0.5,
            min_delay_bound: 2,
            max_delay_bound: 4,
        }
    }

    #[test]
    fn uniform_batches_stay_in_range() {
        let gen = TrafficGenerator::new(ArrivalDistribution::Uniform, vec![spec(1, 3), spec(0, 0)])
            .unwrap();
        let mut rng = StdRng::seed_from_u64(5);
        for clock in 0..100 {
            let traffic = gen.generate(clock, &mut rng);
            assert_eq!(traffic.len(), 2);
            assert!((1..=3).contains(&traffic[0].len()));
            assert!(traffic[1].is_empty());
        }
    }

    #[test]
    fn packets_are_stamped_with_clock_and_delay_bound() {
        let gen = TrafficGenerator::new(ArrivalDistribution::Uniform, vec![spec(5, 5)]).unwrap();
        let mut rng = StdRng::seed_from_u64(9);
        let traffic = gen.generate(17, &mut rng);
        for p in &traffic[0] {
            assert_eq!(p.birth_tick(), 17);
            assert!((2..=4).contains(&p.delay_bound()));
            assert_eq!(p.deadline(), 17 + p.delay_bound() - 1);
        }
    }

    #[test]
    fn binomial_batches_never_exceed_max_packet() {
        let gen = TrafficGenerator::new(ArrivalDistribution::Binomial, vec![spec(0, 4)]).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let total: usize = (0..500).map(|t| gen.generate(t, &mut rng)[0].len()).sum();
        assert!((0..500).all(|t| gen.generate(t, &mut rng)[0].len() <= 4));
        // mean 2 per tick
        assert!((800..1200).contains(&total), "total = {total}");
    }

    #[test]
    fn bernoulli_is_all_or_minimum() {
        let gen = TrafficGenerator::new(ArrivalDistribution::Bernoulli, vec![spec(1, 3)]).unwrap();
        let mut rng = StdRng::seed_from_u64(2);
        for t in 0..100 {
            let batch = &gen.generate(t, &mut rng)[0];
            assert!(batch.len() == 1 || batch.len() == 3);
            // one shared delay bound per batch
            assert!(batch.iter().all(|p| p.deadline() == batch[0].deadline()));
        }
    }

    #[test]
    fn bernoulli_fine_draws_per_packet_delay_bounds() {
        let mut s = spec(8, 8);
        s.bern_param = 1.0;
        let gen = TrafficGenerator::new(ArrivalDistribution::BernoulliFine, vec![s]).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        let varied = (0..50).any(|t| {
            let batch = &gen.generate(t, &mut rng)[0];
            batch.iter().any(|p| p.deadline() != batch[0].deadline())
        });
        assert!(varied);
    }

    #[test]
    fn same_seed_same_traffic() {
        let gen = TrafficGenerator::new(ArrivalDistribution::Uniform, vec![spec(0, 5); 3]).unwrap();
        let draw = || {
            let mut rng = StdRng::seed_from_u64(77);
            (0..10).map(|t| gen.generate(t, &mut rng)).collect::<Vec<_>>()
        };
        assert_eq!(draw(), draw());
    }

    #[test]
    fn invalid_parameters_are_rejected() {
        let mut s = spec(3, 1);
        assert!(TrafficGenerator::new(ArrivalDistribution::Uniform, vec![s.clone()]).is_err());
        s = spec(0, 1);
        s.binom_param = 1.5;
        let err = TrafficGenerator::new(ArrivalDistribution::Binomial, vec![spec(0, 1), s]).unwrap_err();
        assert!(matches!(
            err,
            QueueingError::InvalidTrafficParameter {
                what: "binom_param",
                link: 1,
                ..
            }
        ));
        s = spec(0, 1);
        s.min_delay_bound = 0;
        assert!(TrafficGenerator::new(ArrivalDistribution::Uniform, vec![s]).is_err());
    }

    #[test]
    fn one_sampler_per_link() {
        let gen = TrafficGenerator::new(ArrivalDistribution::Binomial, vec![spec(0, 1); 3]).unwrap();
        assert_eq!(gen.network_size(), 3);
        assert_eq!(gen.distribution(), ArrivalDistribution::Binomial);
    }
}
