//! Application constants
//!
//! Single source of truth for ceilings, timeouts and other fixed limits.

/// Default ceiling on passes through the executor node
pub const DEFAULT_MAX_ITERATIONS: u32 = 10;

/// Default per-call timeout for tool protocol requests, in seconds
pub const DEFAULT_TOOL_TIMEOUT_SECS: u64 = 30;

/// Lifetime of a discovery snapshot, in seconds
pub const DEFAULT_CACHE_TTL_SECS: u64 = 300;

/// Timeout for a single language-model request, in seconds
pub const MODEL_TIMEOUT_SECS: u64 = 120;

/// A run with more errors than this is forced to finish
pub const ERROR_CEILING: usize = 3;

/// Number of trailing errors inspected for validation failures
pub const GUIDANCE_ERROR_WINDOW: usize = 3;

pub const DEFAULT_MAX_TOKENS: u32 = 1000;
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Outputs of non-retrieval tools are cut to this many characters in the
/// final-answer prompt
pub const TOOL_OUTPUT_PREVIEW_CHARS: usize = 1000;

/// Length of the analysis text kept when a plan cannot be parsed
pub const PLAN_PREVIEW_CHARS: usize = 200;

