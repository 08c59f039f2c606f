//! Self-healing supervisor: initial sync, periodic health checks, and
//! majority-vote hash/data repair (§4.6).

pub mod health;
pub mod sync;
pub mod verify;

pub use health::health_check_loop;
pub use sync::initial_sync;
pub use verify::{
    data_verification_loop, data_verification_pass, hash_verification_loop, hash_verification_pass,
    verify_chain_integrity,
};
