pub mod data_channel;
pub mod error;
pub mod network;
pub mod pasv;
pub mod port;
pub mod transfer;

#[cfg(test)]
mod test_session;
