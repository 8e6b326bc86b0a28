//! Node configuration with sensible defaults and the CLI flag surface.

// Layer 1: Standard library imports
use std::env;

// Layer 2: Third-party crate imports
use clap::Parser;
use serde::{Deserialize, Serialize};

// Layer 3: Internal module imports
use super::errors::NodeError;
use crate::message::multiplexer::{DEFAULT_FRAME_CAPACITY, DEFAULT_THRESHOLD};
use crate::util::NodeId;

/// Default worker threads per node.
pub const DEFAULT_WORKER_THREADS: usize = 4;

/// Default slab size of the inbound-message pool.
pub const DEFAULT_INBOUND_BLOCK_SIZE: usize = 1 << 20;

/// Default slab size of the outbound-message pool.
pub const DEFAULT_OUTBOUND_BLOCK_SIZE: usize = 1 << 20;

/// Default slab size of each worker's ephemeral pool.
pub const DEFAULT_EPHEMERAL_BLOCK_SIZE: usize = 1 << 20;

/// Seconds between load reports when `--print-load` is on.
pub const LOAD_REPORT_PERIOD_SECS: u64 = 10;

/// Environment variable forcing deterministic (or random) actor names.
pub const DETERMINISTIC_NAMES_ENV: &str = "THORIUM_DETERMINISTIC_ACTOR_NAMES";

/// Node-wide configuration.
///
/// Defaults suit a single-node run; multi-node runs set the identity via
/// [`NodeConfigBuilder::with_identity`]. Deterministic actor names are the
/// default so runs are reproducible; the environment variable
/// [`DETERMINISTIC_NAMES_ENV`] or the `--random-actor-names` flag flips
/// them off.
///
/// # Examples
///
/// ```rust
/// use thorium::node::NodeConfig;
///
/// let config = NodeConfig::builder()
///     .with_threads(8)
///     .with_print_load(true)
///     .build()
///     .unwrap();
/// assert_eq!(config.threads, 8);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Worker threads on this node.
    pub threads: usize,

    /// This node's identity in `0..nodes`.
    pub node_id: NodeId,

    /// Number of nodes in the cluster.
    pub nodes: i32,

    /// Generate reproducible actor names from `(node, nodes, counter)`.
    pub deterministic_names: bool,

    /// Report per-worker load every [`LOAD_REPORT_PERIOD_SECS`].
    pub print_load: bool,

    /// Report memory-pool usage at shutdown.
    pub print_memory_usage: bool,

    /// Report event counters at shutdown.
    pub print_counters: bool,

    /// Install process signal handlers in `run`.
    pub install_signal_handlers: bool,

    /// Slab size of the inbound-message pool.
    pub inbound_block_size: usize,

    /// Slab size of the outbound-message pool.
    pub outbound_block_size: usize,

    /// Slab size of each worker's ephemeral pool.
    pub ephemeral_block_size: usize,

    /// Messages encoding larger than this bypass the multiplexer.
    pub multiplexer_threshold: usize,

    /// Multiplexer frames flush when they reach this size.
    pub multiplexer_frame_capacity: usize,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            threads: DEFAULT_WORKER_THREADS,
            node_id: NodeId::new(0),
            nodes: 1,
            deterministic_names: true,
            print_load: false,
            print_memory_usage: false,
            print_counters: false,
            install_signal_handlers: true,
            inbound_block_size: DEFAULT_INBOUND_BLOCK_SIZE,
            outbound_block_size: DEFAULT_OUTBOUND_BLOCK_SIZE,
            ephemeral_block_size: DEFAULT_EPHEMERAL_BLOCK_SIZE,
            multiplexer_threshold: DEFAULT_THRESHOLD,
            multiplexer_frame_capacity: DEFAULT_FRAME_CAPACITY,
        }
    }
}

impl NodeConfig {
    /// Create a configuration builder.
    pub fn builder() -> NodeConfigBuilder {
        NodeConfigBuilder::default()
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.threads == 0 {
            return Err("threads must be > 0".to_string());
        }
        if self.nodes <= 0 {
            return Err("nodes must be > 0".to_string());
        }
        if self.node_id.value() < 0 || self.node_id.value() >= self.nodes {
            return Err(format!(
                "node_id {} out of range for {} nodes",
                self.node_id, self.nodes
            ));
        }
        if self.inbound_block_size == 0
            || self.outbound_block_size == 0
            || self.ephemeral_block_size == 0
        {
            return Err("pool block sizes must be > 0".to_string());
        }
        if self.multiplexer_frame_capacity < self.multiplexer_threshold {
            return Err("multiplexer frame capacity must be >= threshold".to_string());
        }
        Ok(())
    }

    /// Build a configuration from an argument vector.
    ///
    /// Recognized flags: `--threads N` (or a colon-separated per-node
    /// list, resolved against this node's identity), `--print-load`,
    /// `--print-memory-usage`, `--print-counters`, `--random-actor-names`.
    /// The first element is the program name, as in `std::env::args()`.
    pub fn from_args<I, S>(args: I, node_id: NodeId, nodes: i32) -> Result<Self, NodeError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let parsed = NodeArgs::try_parse_from(args.into_iter().map(Into::into))
            .map_err(|error| NodeError::Configuration(error.to_string()))?;

        let threads = threads_from_list(&parsed.threads, node_id)
            .map_err(NodeError::Configuration)?;

        let mut deterministic = true;
        if let Ok(value) = env::var(DETERMINISTIC_NAMES_ENV) {
            deterministic = !matches!(value.as_str(), "0" | "false" | "no");
        }
        if parsed.random_actor_names {
            deterministic = false;
        }

        let config = Self {
            threads,
            node_id,
            nodes,
            deterministic_names: deterministic,
            print_load: parsed.print_load,
            print_memory_usage: parsed.print_memory_usage,
            print_counters: parsed.print_counters,
            ..Self::default()
        };
        config.validate().map_err(NodeError::Configuration)?;
        Ok(config)
    }
}

/// Resolve `--threads` against a node identity: either one count for
/// every node or a colon-separated per-node list.
pub fn threads_from_list(list: &str, node_id: NodeId) -> Result<usize, String> {
    let entries: Vec<&str> = list.split(':').collect();
    let entry = if entries.len() == 1 {
        entries[0]
    } else {
        let index = node_id.value();
        if index < 0 || index as usize >= entries.len() {
            return Err(format!(
                "thread list {list:?} has no entry for {node_id}"
            ));
        }
        entries[index as usize]
    };
    entry
        .trim()
        .parse::<usize>()
        .map_err(|_| format!("invalid thread count {entry:?}"))
}

#[derive(Parser, Debug)]
#[command(name = "thorium", disable_version_flag = true)]
struct NodeArgs {
    /// Worker threads, or a colon-separated per-node list.
    #[arg(long, default_value = "4")]
    threads: String,

    /// Periodically report per-worker load.
    #[arg(long)]
    print_load: bool,

    /// Report memory-pool usage at shutdown.
    #[arg(long)]
    print_memory_usage: bool,

    /// Report event counters at shutdown.
    #[arg(long)]
    print_counters: bool,

    /// Draw actor names at random instead of deterministically.
    #[arg(long)]
    random_actor_names: bool,
}

/// Builder for [`NodeConfig`] with a fluent API.
#[derive(Debug, Default)]
pub struct NodeConfigBuilder {
    config: NodeConfig,
}

impl NodeConfigBuilder {
    /// Set the worker thread count.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.config.threads = threads;
        self
    }

    /// Set this node's identity within the cluster.
    pub fn with_identity(mut self, node_id: NodeId, nodes: i32) -> Self {
        self.config.node_id = node_id;
        self.config.nodes = nodes;
        self
    }

    /// Toggle deterministic actor names.
    pub fn with_deterministic_names(mut self, deterministic: bool) -> Self {
        self.config.deterministic_names = deterministic;
        self
    }

    /// Toggle periodic load reports.
    pub fn with_print_load(mut self, enabled: bool) -> Self {
        self.config.print_load = enabled;
        self
    }

    /// Toggle the shutdown memory-usage report.
    pub fn with_print_memory_usage(mut self, enabled: bool) -> Self {
        self.config.print_memory_usage = enabled;
        self
    }

    /// Toggle the shutdown counter report.
    pub fn with_print_counters(mut self, enabled: bool) -> Self {
        self.config.print_counters = enabled;
        self
    }

    /// Toggle process signal handlers (off for embedded or test use).
    pub fn with_signal_handlers(mut self, enabled: bool) -> Self {
        self.config.install_signal_handlers = enabled;
        self
    }

    /// Set the inbound-pool slab size.
    pub fn with_inbound_block_size(mut self, size: usize) -> Self {
        self.config.inbound_block_size = size;
        self
    }

    /// Set the outbound-pool slab size.
    pub fn with_outbound_block_size(mut self, size: usize) -> Self {
        self.config.outbound_block_size = size;
        self
    }

    /// Set the worker ephemeral-pool slab size.
    pub fn with_ephemeral_block_size(mut self, size: usize) -> Self {
        self.config.ephemeral_block_size = size;
        self
    }

    /// Set the multiplexer bypass threshold and frame capacity.
    pub fn with_multiplexer(mut self, threshold: usize, frame_capacity: usize) -> Self {
        self.config.multiplexer_threshold = threshold;
        self.config.multiplexer_frame_capacity = frame_capacity;
        self
    }

    /// Build and validate the configuration.
    pub fn build(self) -> Result<NodeConfig, String> {
        self.config.validate()?;
        Ok(self.config)
    }
}
