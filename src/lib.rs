//! The backend for a gym's front desk: members, payments, attendance and
//! the admin dashboard, served over GraphQL.

pub mod config;
pub mod cron;
pub mod error;
pub mod graphql;
pub mod models;
pub mod store;
pub mod util;
