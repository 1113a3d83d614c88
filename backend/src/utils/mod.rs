pub mod currency;
pub mod date;
pub mod keyed_lock;
