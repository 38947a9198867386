pub mod router;
pub mod types;
pub mod handlers {
    pub mod account;
    pub mod health;
    pub mod publish;
    pub mod topup;
}

pub use router::{create_router, ApiDoc};
pub use types::AppState;
