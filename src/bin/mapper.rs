//! Minimal CLI demo mapper.
//!
//! Builds a small fixed data-flow graph, maps it onto a square mesh CGRA,
//! and prints the resulting schedule as an ASCII cycle render plus the two
//! JSON artifacts (`config.json`, `schedule.json`).
//!
//! Flags:
//!   --rows N            mesh rows (default 4)
//!   --cols N            mesh cols (default 4)
//!   --exhaustive         use the exhaustive DFS search instead of heuristic
//!   --static-elastic     map without modulo scheduling (single II attempt)
//!   --max-ii-attempts N  cap on II sweep retries
//!   --quiet              suppress the ASCII render, print only JSON

#![forbid(unsafe_code)]

use std::env;

use cgra_mapper::cgra::Cgra;
use cgra_mapper::config::{MapperConfig, SearchMode};
use cgra_mapper::dfg::{Capability, CapabilitySet, Dfg, DfgNodeData, NodeId};
use cgra_mapper::emit::{ascii, json};
use cgra_mapper::iidriver;

fn parse_flag(args: &[String], key: &str) -> Option<String> {
    let mut it = args.iter();
    while let Some(a) = it.next() {
        if a == key {
            return it.next().cloned();
        }
    }
    None
}
fn has_flag(args: &[String], key: &str) -> bool {
    args.iter().any(|a| a == key)
}
fn parse_u32(s: &str) -> Option<u32> {
    s.parse::<u32>().ok()
}

/// A fixed four-node diamond: `a -> b -> d`, `a -> c -> d`, with `d -> a`
/// closing a recurrence so `recMII`/I6 both have something to exercise.
struct DemoDfg {
    nodes: Vec<NodeId>,
    data: Vec<DfgNodeData>,
    cycles: Vec<Vec<NodeId>>,
}

impl DemoDfg {
    fn diamond() -> Self {
        let a = NodeId(0);
        let b = NodeId(1);
        let c = NodeId(2);
        let d = NodeId(3);

        let mk = |id: NodeId, capability: Capability, preds: Vec<NodeId>, succs: Vec<NodeId>, is_critical: bool| DfgNodeData {
            id,
            capability,
            exec_latency: 1,
            is_pipelinable: false,
            preds,
            succs,
            is_critical,
            is_predicater: false,
            is_predicatee: false,
            predicatees: Vec::new(),
        };

        let data = vec![
            mk(a, Capability::Load, vec![d], vec![b, c], true),
            mk(b, Capability::Add, vec![a], vec![d], true),
            mk(c, Capability::Mul, vec![a], vec![d], true),
            mk(d, Capability::Add, vec![b, c], vec![a], true),
        ];

        DemoDfg {
            nodes: vec![a, b, c, d],
            data,
            cycles: vec![vec![a, b, d], vec![a, c, d]],
        }
    }
}

impl Dfg for DemoDfg {
    fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }
    fn node(&self, id: NodeId) -> &DfgNodeData {
        &self.data[id.0 as usize]
    }
    fn cycle_lists(&self) -> &[Vec<NodeId>] {
        &self.cycles
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let rows = parse_flag(&args, "--rows").and_then(|s| parse_u32(&s)).unwrap_or(4) as usize;
    let cols = parse_flag(&args, "--cols").and_then(|s| parse_u32(&s)).unwrap_or(4) as usize;
    let max_ii_attempts = parse_flag(&args, "--max-ii-attempts").and_then(|s| parse_u32(&s));
    let quiet = has_flag(&args, "--quiet");

    let config = MapperConfig {
        search_mode: if has_flag(&args, "--exhaustive") {
            SearchMode::Exhaustive
        } else {
            SearchMode::Heuristic
        },
        static_elastic: has_flag(&args, "--static-elastic"),
        parameterizable_cgra: !has_flag(&args, "--static-elastic"),
        ii_seed: None,
        max_ii_attempts,
    };

    let dfg = DemoDfg::diamond();
    let all_caps = CapabilitySet::LOAD
        | CapabilitySet::STORE
        | CapabilitySet::ADD
        | CapabilitySet::MUL
        | CapabilitySet::LOGIC;
    let fabric = Cgra::mesh(rows, cols, all_caps, 4, 2);

    match iidriver::run(&dfg, fabric, &config) {
        Ok(result) => {
            eprintln!("mapped at II={}", result.ii);
            if !quiet {
                println!("{}", ascii::render(&dfg, &result.session));
            }
            println!("{}", json::schedule_json(&dfg, &result.session));
            println!("{}", json::config_json(&dfg, &result.session));
        }
        Err(e) => {
            eprintln!("mapping failed: {e}");
            std::process::exit(1);
        }
    }
}
