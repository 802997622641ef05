//! External collaborators: market data gateways.

pub mod http_gateway;
pub mod market_data;

pub use http_gateway::HttpMarketDataGateway;
pub use market_data::{GatewayError, MarketDataGateway};
