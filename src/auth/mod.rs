// Authentication (JWT bearer tokens)

pub mod jwt;
