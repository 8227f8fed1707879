pub mod internal;
pub mod server;

#[cfg(test)]
pub mod testing;
