//! # iamcore
//!
//! Embedded identity-and-access-management engine: stores principals
//! (users, groups, roles) and authorization policies in an embedded
//! transactional key-value store, and decides whether a given action on a
//! resource is permitted for a given principal.
//!
//! ## Features
//!
//! - **Pattern matching** over literal strings and delimited
//!   regular-expression segments, with a bounded LRU cache for compiled
//!   patterns
//! - **Policy evaluation** with explicit-deny-overrides-allow semantics
//!   and a default-deny baseline
//! - **Bidirectional relationships** (role↔policy, role↔user, role↔group)
//!   maintained atomically in single store transactions
//! - **Audit stamping** of every mutation with the acting principal
//!
//! ## Example
//!
//! ```no_run
//! use iamcore::{AuthEngine, Effect, EngineConfig, Manager, Policy, User};
//!
//! fn main() -> iamcore::Result<()> {
//!     let manager = Manager::open("./data/iam")?;
//!     let system = Manager::system_user();
//!
//!     manager.add_user(&system, User::new("alice"), "hunter2")?;
//!     manager.add_role(&system, "Reader", "Read-only access")?;
//!     manager.add_policy(
//!         &system,
//!         Policy::new("read-orders", Effect::Allow)
//!             .with_resource(r"orders/<\d+>")
//!             .with_action("read"),
//!     )?;
//!     manager.attach_policies_to_role(&system, "Reader", &["read-orders"])?;
//!     manager.attach_role_to_users(&system, "Reader", &["alice"])?;
//!
//!     let engine = AuthEngine::new(manager, EngineConfig::default());
//!     let decision = engine.authorize("alice", "read", "orders/42")?;
//!     assert!(decision.allowed);
//!     Ok(())
//! }
//! ```

pub mod engine;
pub mod error;
pub mod evaluator;
pub mod matcher;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use engine::{AuthEngine, Decision, EngineConfig};
pub use error::{IamError, Result};
pub use evaluator::evaluate;
pub use matcher::{MatcherConfig, RegexMatcher, DEFAULT_CACHE_CAPACITY};
pub use store::{Entity, Manager};
pub use types::{Audit, Effect, Group, Policy, Role, User};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
