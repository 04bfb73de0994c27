//! Attaching branch tails to a multiplexer's request ports.

use crate::engine::PortRef;
use crate::error::{NightcoreError, Result};
use crate::pipeline::graph::Pipeline;
use tracing::info;

/// Link the output port of `tail` into a compatible input port of `muxer`.
///
/// Returns the muxer port the branch now feeds.
pub fn attach(pipeline: &mut Pipeline, tail: &str, muxer: &str) -> Result<PortRef> {
    let src = PortRef::src(tail);
    let sink = pipeline
        .session
        .compatible_port(muxer, &src)
        .map_err(|e| NightcoreError::CannotLinkElements {
            upstream: src.to_string(),
            downstream: muxer.to_string(),
            message: e.to_string(),
        })?;

    pipeline.link_ports(&src, &sink)?;
    info!(src = %src, sink = %sink, "attached to multiplexer");
    Ok(sink)
}
