//! OpenAPI document for the gateway.

use utoipa::OpenApi;

use super::handlers;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "betmatch",
        description = "Order-matching and settlement core of a peer-to-peer sports betting exchange"
    ),
    paths(
        handlers::orders::place_order,
        handlers::orders::cancel_order,
        handlers::book::get_orderbook,
        handlers::markets::create_match,
        handlers::markets::transition_match,
        handlers::markets::create_market,
        handlers::markets::transition_market,
        handlers::markets::settle_market,
        handlers::wallets::create_user,
        handlers::wallets::credit_wallet,
        handlers::wallets::debit_wallet,
        handlers::wallets::get_wallet,
    ),
    tags(
        (name = "Orders", description = "Order placement and cancellation"),
        (name = "Market data", description = "Order book and market listings"),
        (name = "Wallets", description = "Balance and ledger queries"),
        (name = "Admin", description = "Match, market, settlement and wallet administration")
    )
)]
pub struct ApiDoc;
