pub mod contact;
pub mod export;
pub mod settings;
