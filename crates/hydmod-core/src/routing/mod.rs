//! Lateral flow routing: network construction once per run, single-hop
//! redistribution once per day.
pub mod direction;
pub mod network;
pub mod router;

pub use direction::Direction;
pub use network::FlowNetwork;
pub use router::{route_flow, RoutedFlow};
