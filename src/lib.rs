pub mod config;
pub mod country;
pub mod error;
pub mod fetch;
pub mod index;
pub mod leaderboard;
pub mod normalize;
pub mod output;
pub mod palette;
pub mod parser;
pub mod pipeline;
pub mod record;
pub mod series;
pub mod stats;
pub mod view;
