pub mod clients;
pub mod handlers;
pub mod net;
pub mod protocol;
pub mod routes;
pub mod state;
