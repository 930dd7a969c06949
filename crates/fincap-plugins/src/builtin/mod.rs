//! Native plugins shipped with fincap.

mod compliance;
mod echo;

pub use compliance::CompliancePlugin;
pub use echo::EchoPlugin;
