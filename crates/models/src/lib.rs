pub mod errors;
pub mod db;
pub mod user;
pub mod user_credentials;
pub mod visitor;

#[cfg(test)]
mod tests;
