//! Contracts between the net score engine and the services it reads from.
//!
//! The engine only ever talks to a [`api::RepoApi`] (source hosting) and a
//! [`api::PackageRegistry`] (npm-like registry). Concrete HTTP clients live in
//! the `clients/github` and `clients/npm` crates.

pub mod api;
