//! # Simulated Network
//!
//! In-memory byte transport between simulated nodes.
//!
//! A message occupies its directed link for `wire_bytes / rate` seconds,
//! where the rate is the sender's upload speed capped by the receiver's
//! download speed. Messages on the same link queue behind each other. The
//! encoded frame is split into chunks that arrive spread over the
//! transmission window, each after the one-way latency, so receivers see
//! partial frames the way a stream socket would hand them over. Latency is
//! sampled per message, but no chunk overtakes one sent earlier on the same
//! link, so each link stays an in-order byte stream.

use std::collections::HashMap;
use std::time::Duration;

use gl_05_gossip_protocol::{InternetSpeed, Transport};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared_types::{PeerId, SimTime};
use tracing::trace;

/// Configuration for the simulated network.
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkConfig {
    /// One-way latency added to every chunk.
    pub latency: Duration,
    /// Jitter as a fraction of the latency (0.0 - 1.0).
    pub jitter_fraction: f64,
    /// Largest chunk a frame is split into, in bytes.
    pub chunk_size: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            latency: Duration::from_millis(50),
            jitter_fraction: 0.1,
            chunk_size: 1024,
        }
    }
}

/// Bytes on their way to a node.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub from: PeerId,
    pub to: PeerId,
    pub at: SimTime,
    pub bytes: Vec<u8>,
}

/// Traffic counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficStats {
    pub messages_sent: u64,
    pub chunks_sent: u64,
    pub wire_bytes: u64,
    pub encoded_bytes: u64,
}

/// Deterministic transport. Deliveries are buffered in an outbox the runner
/// drains into its event queue.
#[derive(Debug)]
pub struct SimulatedNetwork {
    config: NetworkConfig,
    speeds: HashMap<PeerId, InternetSpeed>,
    link_busy_until: HashMap<(PeerId, PeerId), SimTime>,
    link_last_arrival: HashMap<(PeerId, PeerId), SimTime>,
    outbox: Vec<Delivery>,
    rng: StdRng,
    now: SimTime,
    stats: TrafficStats,
}

impl SimulatedNetwork {
    pub fn new(config: NetworkConfig, seed: u64) -> Self {
        Self {
            config,
            speeds: HashMap::new(),
            link_busy_until: HashMap::new(),
            link_last_arrival: HashMap::new(),
            outbox: Vec::new(),
            rng: StdRng::seed_from_u64(seed),
            now: 0.0,
            stats: TrafficStats::default(),
        }
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    pub fn stats(&self) -> TrafficStats {
        self.stats
    }

    pub fn set_speed(&mut self, node: PeerId, speed: InternetSpeed) {
        self.speeds.insert(node, speed);
    }

    pub fn speed(&self, node: PeerId) -> InternetSpeed {
        self.speeds.get(&node).copied().unwrap_or_default()
    }

    pub fn set_time(&mut self, now: SimTime) {
        self.now = now;
    }

    /// Bytes per second available from `from` to `to`.
    pub fn link_rate(&self, from: PeerId, to: PeerId) -> f64 {
        self.speed(from)
            .upload_bytes_per_sec()
            .min(self.speed(to).download_bytes_per_sec())
    }

    /// Take every delivery produced since the last drain.
    pub fn drain(&mut self) -> Vec<Delivery> {
        std::mem::take(&mut self.outbox)
    }

    fn sample_latency(&mut self) -> f64 {
        let base = self.config.latency.as_secs_f64();
        let jitter = base * self.config.jitter_fraction.clamp(0.0, 1.0);
        if jitter > 0.0 {
            base + self.rng.gen_range(-jitter..=jitter)
        } else {
            base
        }
    }
}

impl Transport for SimulatedNetwork {
    fn send(&mut self, from: PeerId, to: PeerId, bytes: Vec<u8>, wire_bytes: u64) {
        let rate = self.link_rate(from, to);
        let transmission = if rate > 0.0 {
            wire_bytes as f64 / rate
        } else {
            0.0
        };
        let busy = self.link_busy_until.entry((from, to)).or_insert(0.0);
        let start = busy.max(self.now);
        *busy = start + transmission;

        let latency = self.sample_latency();
        let chunk_size = self.config.chunk_size.max(1);
        let chunks: Vec<&[u8]> = bytes.chunks(chunk_size).collect();
        let count = chunks.len().max(1) as f64;

        trace!(
            %from,
            %to,
            wire_bytes,
            chunks = chunks.len(),
            transmission,
            "Frame queued on link"
        );

        let last_arrival = self.link_last_arrival.entry((from, to)).or_insert(0.0);
        for (i, chunk) in chunks.into_iter().enumerate() {
            let at = (start + transmission * (i as f64 + 1.0) / count + latency).max(*last_arrival);
            *last_arrival = at;
            self.outbox.push(Delivery {
                from,
                to,
                at,
                bytes: chunk.to_vec(),
            });
            self.stats.chunks_sent += 1;
        }
        self.stats.messages_sent += 1;
        self.stats.wire_bytes += wire_bytes;
        self.stats.encoded_bytes += bytes.len() as u64;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn network(chunk_size: usize) -> SimulatedNetwork {
        let config = NetworkConfig {
            latency: Duration::from_millis(100),
            jitter_fraction: 0.0,
            chunk_size,
        };
        let mut network = SimulatedNetwork::new(config, 7);
        network.set_speed(PeerId(1), InternetSpeed::symmetric(8.0));
        network.set_speed(PeerId(2), InternetSpeed::symmetric(8.0));
        network
    }

    #[test]
    fn test_link_rate_is_bottleneck() {
        let mut network = network(16);
        network.set_speed(
            PeerId(2),
            InternetSpeed {
                download_mbps: 2.0,
                upload_mbps: 100.0,
            },
        );
        assert_eq!(network.link_rate(PeerId(1), PeerId(2)), 250_000.0);
        assert_eq!(network.link_rate(PeerId(2), PeerId(1)), 1_000_000.0);
    }

    #[test]
    fn test_frame_split_into_ordered_chunks() {
        let mut network = network(4);
        network.send(PeerId(1), PeerId(2), b"0123456789#".to_vec(), 1_000_000);
        let deliveries = network.drain();

        assert_eq!(deliveries.len(), 3);
        let joined: Vec<u8> = deliveries.iter().flat_map(|d| d.bytes.clone()).collect();
        assert_eq!(joined, b"0123456789#");
        assert!(deliveries.windows(2).all(|w| w[0].at < w[1].at));
        // One second of transmission plus latency for the last chunk.
        assert!((deliveries[2].at - 1.1).abs() < 1e-9);
    }

    #[test]
    fn test_messages_queue_on_busy_link() {
        let mut network = network(1024);
        network.send(PeerId(1), PeerId(2), b"a#".to_vec(), 500_000);
        network.send(PeerId(1), PeerId(2), b"b#".to_vec(), 500_000);
        let deliveries = network.drain();
        assert!((deliveries[0].at - 0.6).abs() < 1e-9);
        assert!((deliveries[1].at - 1.1).abs() < 1e-9);

        // The reverse direction is a separate link.
        network.send(PeerId(2), PeerId(1), b"c#".to_vec(), 500_000);
        assert!((network.drain()[0].at - 0.6).abs() < 1e-9);
        assert_eq!(network.stats().messages_sent, 3);
    }

    #[test]
    fn test_drain_empties_outbox() {
        let mut network = network(1024);
        network.send(PeerId(1), PeerId(2), b"x#".to_vec(), 10);
        assert_eq!(network.drain().len(), 1);
        assert!(network.drain().is_empty());
    }

    #[test]
    fn test_jitter_never_reorders_a_link() {
        for seed in 0..50 {
            let config = NetworkConfig {
                jitter_fraction: 0.5,
                ..NetworkConfig::default()
            };
            let mut network = SimulatedNetwork::new(config, seed);
            let mut long = vec![b'a'; 3000];
            long.push(b'#');
            network.send(PeerId(1), PeerId(2), long.clone(), long.len() as u64);
            network.send(PeerId(1), PeerId(2), b"bb#".to_vec(), 3);

            let mut deliveries = network.drain();
            deliveries.sort_by(|a, b| a.at.total_cmp(&b.at));
            let stream: Vec<u8> = deliveries.iter().flat_map(|d| d.bytes.clone()).collect();
            let mut expected = long;
            expected.extend_from_slice(b"bb#");
            assert_eq!(stream, expected, "seed {seed}");
        }
    }
}
