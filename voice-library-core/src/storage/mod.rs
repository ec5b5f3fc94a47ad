pub mod cipher;
pub mod files;
pub mod key_value;
pub mod resolver;
pub mod secure_store;
