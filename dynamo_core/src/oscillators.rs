//! Kuramoto oscillator network with synchrony and cluster detection.
//!
//! ```text
//! dθᵢ/dt = ωᵢ + (K/|Nᵢ|) Σ_{j∈Nᵢ} sin(θⱼ - θᵢ) + ξ
//! R      = |Σₖ e^(iθₖ)| / N
//! ```
//!
//! `Nᵢ` is node i's stored out-neighbour list. Adjacency is built once per
//! topology change and is directed: i -> j does not imply j -> i. Cluster
//! traversal follows the stored direction as well, which shapes the cluster
//! statistics and is kept on purpose.

use crate::event::{DesyncEvent, EngineKind, SimulationEvent, SyncEvent};
use crate::params::{bounded, lookup, sanitize_named, Engine, ParamError, ParamSpec};
use dynamo_env::{RandomSource, SeededSource};
use nalgebra::{Complex, Vector2};
use serde::{Deserialize, Serialize};
use std::f32::consts::{PI, TAU};
use tracing::info;

/// Time units advanced per tick (before `dt_scale`).
pub const STEP_SIZE: f32 = 0.1;

/// Chance of a long-range edge between two nodes outside the radius.
pub const REWIRE_PROBABILITY: f64 = 0.1;

pub const MIN_OSCILLATORS: usize = 10;
pub const MAX_OSCILLATORS: usize = 500;

pub const SYNC_THRESHOLD: f32 = 0.8;
pub const DESYNC_THRESHOLD: f32 = 0.3;
pub const SYNC_COOLDOWN_SECS: f64 = 3.0;
pub const DESYNC_COOLDOWN_SECS: f64 = 2.0;

/// Normalized phase distance (0..1 over the shorter arc) below which two
/// adjacent nodes belong to the same cluster.
pub const CLUSTER_PHASE_TOLERANCE: f32 = 0.2;

const PARAMS: &[ParamSpec] = &[
    ParamSpec::new("count", 10.0, 500.0, 200.0),
    ParamSpec::new("coupling", 0.0, 5.0, 0.5),
    ParamSpec::new("freq_range", 0.0, 2.0, 0.5),
    ParamSpec::new("noise", 0.0, 1.0, 0.1),
    ParamSpec::new("radius", 0.05, 2.0, 0.8),
    ParamSpec::display("wave_amplitude", 0.0, 200.0, 50.0),
];

/// Configuration for the oscillator network.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OscillatorParams {
    /// Number of oscillators, clamped to [10, 500]
    pub count: usize,
    /// Global coupling K
    pub coupling_strength: f32,
    /// Width of the natural frequency distribution, centred on zero
    pub natural_freq_range: f32,
    /// Amplitude of the uniform phase-velocity noise
    pub noise_strength: f32,
    /// Distance below which two nodes are always connected
    pub network_radius: f32,
    /// Display only
    pub wave_amplitude: f32,
}

impl Default for OscillatorParams {
    fn default() -> Self {
        Self {
            count: 200,
            coupling_strength: 0.5,
            natural_freq_range: 0.5,
            noise_strength: 0.1,
            network_radius: 0.8,
            wave_amplitude: 50.0,
        }
    }
}

/// A single phase oscillator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OscillatorNode {
    /// Phase in [0, 2π)
    pub phase: f32,
    pub natural_frequency: f32,
    /// Fixed layout position, used for topology and display
    pub position: Vector2<f32>,
    /// Last computed phase velocity
    pub velocity: f32,
    /// Out-neighbour indices, ascending
    pub neighbors: Vec<usize>,
}

impl OscillatorNode {
    pub fn new(phase: f32, natural_frequency: f32, position: Vector2<f32>) -> Self {
        Self {
            phase: wrap_phase(phase),
            natural_frequency,
            position,
            velocity: 0.0,
            neighbors: Vec::new(),
        }
    }
}

/// Wraps a phase into `[0, 2π)`.
pub fn wrap_phase(phase: f32) -> f32 {
    let wrapped = phase.rem_euclid(TAU);
    // rem_euclid can round up to exactly TAU for tiny negative inputs
    if wrapped >= TAU {
        0.0
    } else {
        wrapped
    }
}

/// Kuramoto order parameter `R = |Σ e^(iθ)| / N`, in [0, 1].
pub fn order_parameter(nodes: &[OscillatorNode]) -> f32 {
    if nodes.is_empty() {
        return 0.0;
    }
    let sum: Complex<f32> = nodes
        .iter()
        .map(|node| Complex::from_polar(1.0, node.phase))
        .sum();
    (sum.norm() / nodes.len() as f32).min(1.0)
}

/// Shorter-arc phase distance normalized to [0, 1].
pub fn phase_distance(a: f32, b: f32) -> f32 {
    let diff = (a - b).abs();
    diff.min(TAU - diff) / PI
}

/// Counts phase-coherent clusters by depth-first traversal.
///
/// Starting from each unvisited node, follows stored out-edges to unvisited
/// neighbours whose phase is within `CLUSTER_PHASE_TOLERANCE`. Each traversal
/// root is one cluster. Uses an explicit stack, so depth is bounded by the
/// heap rather than the call stack.
pub fn count_clusters(nodes: &[OscillatorNode]) -> usize {
    let mut visited = vec![false; nodes.len()];
    let mut stack = Vec::new();
    let mut clusters = 0;

    for root in 0..nodes.len() {
        if visited[root] {
            continue;
        }
        clusters += 1;
        stack.push(root);

        while let Some(current) = stack.pop() {
            if visited[current] {
                continue;
            }
            visited[current] = true;

            let phase = nodes[current].phase;
            for &next in &nodes[current].neighbors {
                if !visited[next]
                    && phase_distance(phase, nodes[next].phase) < CLUSTER_PHASE_TOLERANCE
                {
                    stack.push(next);
                }
            }
        }
    }

    clusters
}

/// The Kuramoto network engine.
pub struct OscillatorEngine<R = SeededSource> {
    params: OscillatorParams,

    /// Node arena; adjacency refers to indices into this vector
    nodes: Vec<OscillatorNode>,

    /// R computed at the start of the last step (pre-update phases)
    order_parameter: f32,

    /// Clusters after the last step
    cluster_count: usize,

    /// Time of the last sync or desync event
    last_event_at: Option<f64>,

    event_count: u64,

    show_network: bool,
    show_waves: bool,

    rng: R,
}

impl OscillatorEngine<SeededSource> {
    /// Creates a randomly laid out network from `seed`.
    pub fn new(params: OscillatorParams, seed: u64) -> Self {
        Self::with_source(params, SeededSource::new(seed))
    }
}

impl<R: RandomSource> OscillatorEngine<R> {
    /// Creates a randomly laid out network drawing from `rng`.
    pub fn with_source(params: OscillatorParams, rng: R) -> Self {
        let mut engine = Self::empty(sanitize(params), rng);
        engine.initialize();
        engine
    }

    /// Creates a network from explicit nodes; topology is built from positions.
    ///
    /// The oscillator-count bound applies to reconfiguration only, so any
    /// non-empty node set is accepted here. An empty set falls back to a
    /// random layout of `MIN_OSCILLATORS` nodes.
    pub fn with_nodes(params: OscillatorParams, nodes: Vec<OscillatorNode>, rng: R) -> Self {
        let mut params = sanitize(params);
        if nodes.is_empty() {
            params.count = MIN_OSCILLATORS;
            return Self::with_source(params, rng);
        }
        params.count = nodes.len();
        let mut engine = Self::empty(params, rng);
        engine.nodes = nodes;
        engine.build_topology();
        engine.refresh_statistics();
        engine
    }

    fn empty(params: OscillatorParams, rng: R) -> Self {
        Self {
            params,
            nodes: Vec::new(),
            order_parameter: 0.0,
            cluster_count: 0,
            last_event_at: None,
            event_count: 0,
            show_network: true,
            show_waves: true,
            rng,
        }
    }

    /// Lays out fresh nodes on a ring with random radius, phase and frequency.
    fn initialize(&mut self) {
        let n = self.params.count;
        let range = self.params.natural_freq_range;

        self.nodes = (0..n)
            .map(|i| {
                let angle = TAU * i as f32 / n as f32;
                let radius = 0.3 + self.rng.next_f64() as f32 * 0.4;
                let phase = self.rng.next_f64() as f32 * TAU;
                let frequency = self.rng.signed_unit() as f32 * range;
                OscillatorNode::new(
                    phase,
                    frequency,
                    Vector2::new(angle.cos() * radius, angle.sin() * radius),
                )
            })
            .collect();

        self.build_topology();
        self.refresh_statistics();
    }

    fn refresh_statistics(&mut self) {
        self.order_parameter = order_parameter(&self.nodes);
        self.cluster_count = count_clusters(&self.nodes);
    }

    /// Rebuilds all adjacency lists from scratch.
    ///
    /// i -> j when the nodes are closer than the network radius, or otherwise
    /// with probability `REWIRE_PROBABILITY`.
    pub fn build_topology(&mut self) {
        let radius = self.params.network_radius;
        let positions: Vec<Vector2<f32>> = self.nodes.iter().map(|n| n.position).collect();

        for (i, node) in self.nodes.iter_mut().enumerate() {
            node.neighbors.clear();
            for (j, other) in positions.iter().enumerate() {
                if i == j {
                    continue;
                }
                let dist = (positions[i] - other).norm();
                if dist < radius || self.rng.chance(REWIRE_PROBABILITY) {
                    node.neighbors.push(j);
                }
            }
        }
    }

    /// Advances every phase by one tick of `STEP_SIZE * dt_scale`.
    ///
    /// R is taken from the pre-step phases. Each node reads only pre-step
    /// phases too, so update order does not matter.
    pub fn step(&mut self, dt_scale: f32) {
        self.order_parameter = order_parameter(&self.nodes);

        let phases: Vec<f32> = self.nodes.iter().map(|n| n.phase).collect();
        let coupling = self.params.coupling_strength;
        let noise = self.params.noise_strength;
        let dt = STEP_SIZE * dt_scale;

        for (i, node) in self.nodes.iter_mut().enumerate() {
            let coupling_term = if node.neighbors.is_empty() {
                0.0
            } else {
                let sum: f32 = node
                    .neighbors
                    .iter()
                    .map(|&j| (phases[j] - phases[i]).sin())
                    .sum();
                coupling / node.neighbors.len() as f32 * sum
            };
            let jitter = self.rng.signed_unit() as f32 * noise;

            let velocity = node.natural_frequency + coupling_term + jitter;
            node.velocity = velocity;
            node.phase = wrap_phase(phases[i] + velocity * dt);
        }

        self.cluster_count = count_clusters(&self.nodes);
    }

    /// Checks the last order parameter against the sync/desync thresholds.
    ///
    /// Both kinds share one cool-down clock: sync needs 3 s since the last
    /// event of either kind, desync 2 s. Sync is checked first.
    pub fn detect_event(&mut self, now: f64) -> Option<SimulationEvent> {
        let r = self.order_parameter;
        let elapsed = |cooldown: f64| self.last_event_at.map_or(true, |t| now - t >= cooldown);

        let event = if r > SYNC_THRESHOLD && elapsed(SYNC_COOLDOWN_SECS) {
            info!(
                "Synchronization Event | Order: {:.3}, Clusters: {}",
                r, self.cluster_count
            );
            SimulationEvent::Sync(SyncEvent {
                order_parameter: r,
                cluster_count: self.cluster_count,
                coupling_strength: self.params.coupling_strength,
                natural_freq_range: self.params.natural_freq_range,
            })
        } else if r < DESYNC_THRESHOLD && elapsed(DESYNC_COOLDOWN_SECS) {
            info!("Desynchronization Event | Order: {:.3}", r);
            SimulationEvent::Desync(DesyncEvent {
                order_parameter: r,
                coupling_strength: self.params.coupling_strength,
                natural_freq_range: self.params.natural_freq_range,
            })
        } else {
            return None;
        };

        self.last_event_at = Some(now);
        self.event_count += 1;
        Some(event)
    }

    /// `step` followed by `detect_event`.
    pub fn tick(&mut self, dt_scale: f32, now: f64) -> Option<SimulationEvent> {
        self.step(dt_scale);
        self.detect_event(now)
    }

    /// Typed setters clamp into the published range and ignore NaN or infinity.
    pub fn set_coupling_strength(&mut self, value: f32) {
        if let Some(value) = bounded(PARAMS, "coupling", f64::from(value)) {
            self.params.coupling_strength = value as f32;
        }
    }

    pub fn set_noise_strength(&mut self, value: f32) {
        if let Some(value) = bounded(PARAMS, "noise", f64::from(value)) {
            self.params.noise_strength = value as f32;
        }
    }

    /// Changes the frequency spread without rebuilding the network.
    ///
    /// Existing frequencies are rescaled; if the old spread was zero they are
    /// redrawn instead.
    pub fn set_natural_freq_range(&mut self, value: f32) {
        let Some(value) = bounded(PARAMS, "freq_range", f64::from(value)) else {
            return;
        };
        let value = value as f32;
        let old = self.params.natural_freq_range;
        self.params.natural_freq_range = value;

        if old > 0.0 {
            let ratio = value / old;
            for node in &mut self.nodes {
                node.natural_frequency *= ratio;
            }
        } else {
            for node in &mut self.nodes {
                node.natural_frequency = self.rng.signed_unit() as f32 * value;
            }
        }
    }

    /// Changes the connection radius and rebuilds the topology.
    pub fn set_network_radius(&mut self, value: f32) {
        let Some(value) = bounded(PARAMS, "radius", f64::from(value)) else {
            return;
        };
        self.params.network_radius = value as f32;
        self.build_topology();
        self.cluster_count = count_clusters(&self.nodes);
    }

    /// Changes N (clamped to [10, 500]) and re-initializes everything.
    pub fn set_count(&mut self, count: usize) {
        self.params.count = count.clamp(MIN_OSCILLATORS, MAX_OSCILLATORS);
        self.initialize();
    }

    pub fn set_wave_amplitude(&mut self, value: f32) {
        if let Some(value) = bounded(PARAMS, "wave_amplitude", f64::from(value)) {
            self.params.wave_amplitude = value as f32;
        }
    }

    pub fn toggle_network(&mut self) {
        self.show_network = !self.show_network;
    }

    pub fn toggle_waves(&mut self) {
        self.show_waves = !self.show_waves;
    }

    pub fn nodes(&self) -> &[OscillatorNode] {
        &self.nodes
    }

    pub fn params(&self) -> &OscillatorParams {
        &self.params
    }

    /// R as computed at the start of the last step.
    pub fn order_parameter(&self) -> f32 {
        self.order_parameter
    }

    /// R of the current phases.
    pub fn current_order_parameter(&self) -> f32 {
        order_parameter(&self.nodes)
    }

    pub fn cluster_count(&self) -> usize {
        self.cluster_count
    }

    /// Arithmetic mean of all phases (drives the wave overlay).
    pub fn mean_phase(&self) -> f32 {
        if self.nodes.is_empty() {
            return 0.0;
        }
        self.nodes.iter().map(|n| n.phase).sum::<f32>() / self.nodes.len() as f32
    }

    /// Total number of directed edges.
    pub fn edge_count(&self) -> usize {
        self.nodes.iter().map(|n| n.neighbors.len()).sum()
    }

    pub fn show_network(&self) -> bool {
        self.show_network
    }

    pub fn show_waves(&self) -> bool {
        self.show_waves
    }
}

impl<R: RandomSource> Engine for OscillatorEngine<R> {
    fn kind(&self) -> EngineKind {
        EngineKind::Oscillators
    }

    fn reset(&mut self) {
        self.initialize();
        self.event_count = 0;
        self.last_event_at = None;
    }

    fn event_count(&self) -> u64 {
        self.event_count
    }

    fn parameters(&self) -> &'static [ParamSpec] {
        PARAMS
    }

    fn parameter(&self, name: &str) -> Result<f64, ParamError> {
        let spec = lookup(PARAMS, name)?;
        Ok(match spec.name {
            "count" => self.params.count as f64,
            "coupling" => f64::from(self.params.coupling_strength),
            "freq_range" => f64::from(self.params.natural_freq_range),
            "noise" => f64::from(self.params.noise_strength),
            "radius" => f64::from(self.params.network_radius),
            _ => f64::from(self.params.wave_amplitude),
        })
    }

    fn set_parameter(&mut self, name: &str, value: f64) -> Result<f64, ParamError> {
        let spec = lookup(PARAMS, name)?;
        let mut applied = spec.apply(value)?;
        match spec.name {
            "count" => {
                applied = applied.round();
                self.set_count(applied as usize);
            }
            "coupling" => self.set_coupling_strength(applied as f32),
            "freq_range" => self.set_natural_freq_range(applied as f32),
            "noise" => self.set_noise_strength(applied as f32),
            "radius" => self.set_network_radius(applied as f32),
            _ => self.set_wave_amplitude(applied as f32),
        }
        Ok(applied)
    }
}

/// Clamps every published parameter; non-finite values take the default.
fn sanitize(mut params: OscillatorParams) -> OscillatorParams {
    let clamp = |name: &str, value: f32| sanitize_named(PARAMS, name, f64::from(value)) as f32;
    params.count = params.count.clamp(MIN_OSCILLATORS, MAX_OSCILLATORS);
    params.coupling_strength = clamp("coupling", params.coupling_strength);
    params.natural_freq_range = clamp("freq_range", params.natural_freq_range);
    params.noise_strength = clamp("noise", params.noise_strength);
    params.network_radius = clamp("radius", params.network_radius);
    params.wave_amplitude = clamp("wave_amplitude", params.wave_amplitude);
    params
}
