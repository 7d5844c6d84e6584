mod limiter;

pub use limiter::Limiter;
