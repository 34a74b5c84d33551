//! Service layer: one public operation = one database transaction.
//!
//! Services are constructed by the composition root with the pool and the
//! event sink; nothing here reaches for process-wide state.

pub mod markets;
pub mod orders;
pub mod settlement;
pub mod wallets;

pub use markets::MarketService;
pub use orders::OrderService;
pub use settlement::SettlementService;
pub use wallets::WalletService;

use crate::error::{CoreError, CoreResult};
use crate::models::User;
use crate::persistence::{users, Conn};

/// Load the acting user and require an admin role.
pub(crate) async fn require_admin(conn: &mut Conn, acting_user: i64) -> CoreResult<User> {
    let user = users::get(conn, acting_user).await?;
    if !user.role.is_admin() {
        return Err(CoreError::PermissionDenied(format!(
            "user {} may not perform admin operations",
            acting_user
        )));
    }
    Ok(user)
}
