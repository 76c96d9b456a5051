//! Registration and referral backend for the Carton Caps app.
//!
//! Users register (optionally with someone else's referral code), receive a
//! referral code of their own, and can fetch a share page and the list of
//! users they referred.

pub mod models;
pub mod repositories;
pub mod services;
pub mod settings;
