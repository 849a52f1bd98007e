mod request;
mod resolver;
mod tcp;
mod udp;
mod upstream;

pub use resolver::ForwardResolver;
pub use upstream::Limits;
