pub mod delegate;
pub mod encryptor;
pub mod key_value;
pub mod player;
pub mod processing;
pub mod recorder;
pub mod resolver;
