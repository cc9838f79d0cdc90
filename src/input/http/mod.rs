//! HTTP input source for the door service endpoints.

mod poller;

pub use poller::Poller;
