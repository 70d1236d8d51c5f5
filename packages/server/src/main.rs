#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Disaster feed API server binary.

#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    disaster_feed_server::run_server().await
}
