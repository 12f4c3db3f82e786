//! Session carts, priced from the catalog whenever they are shown.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::SellableUnit;
use crate::db;
use crate::domain::aggregates::{Cart, CartItem};
use crate::error::{AppError, AppResult};
use crate::state::AppState;

#[derive(Debug, Clone, Serialize)]
pub struct CartLine {
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
    pub sku: String,
    pub name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
    pub available: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    pub session_id: String,
    pub items: Vec<CartLine>,
    pub subtotal: Decimal,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct QuantityUpdate {
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
    pub quantity: i32,
}

async fn load(state: &AppState, session_id: &str) -> AppResult<Cart> {
    let items = db::cart::load(&state.db, session_id).await?;
    Ok(Cart::from_items(session_id, items)?)
}

pub async fn view(state: &AppState, session_id: &str) -> AppResult<CartView> {
    let cart = load(state, session_id).await?;
    price(state, &cart).await
}

async fn price(state: &AppState, cart: &Cart) -> AppResult<CartView> {
    let mut conn = state.db.acquire().await?;
    let mut items = Vec::with_capacity(cart.item_count());
    for item in cart.items() {
        let unit = match SellableUnit::load(&mut conn, item.product_id, item.variant_id).await {
            Ok(unit) => unit,
            // removed from the catalog since it was added
            Err(AppError::NotFound(_)) => continue,
            Err(e) => return Err(e),
        };
        let unit_price = unit.unit_price();
        items.push(CartLine {
            product_id: item.product_id,
            variant_id: item.variant_id,
            sku: unit.sku().to_string(),
            name: unit.name(),
            quantity: item.quantity,
            unit_price,
            line_total: unit_price * Decimal::from(item.quantity),
            available: if unit.product.is_purchasable() { unit.stock().available() } else { 0 },
        });
    }
    let subtotal = items.iter().map(|l| l.line_total).sum();
    Ok(CartView { session_id: cart.session_id().to_string(), items, subtotal })
}

pub async fn add(state: &AppState, session_id: &str, item: CartItem) -> AppResult<CartView> {
    {
        let mut conn = state.db.acquire().await?;
        let unit = SellableUnit::load(&mut conn, item.product_id, item.variant_id).await?;
        if !unit.product.is_purchasable() {
            return Err(AppError::rule(format!("{} is not available for sale", unit.product.name)));
        }
    }
    let mut cart = load(state, session_id).await?;
    cart.add_item(item)?;
    db::cart::save(&state.db, &cart).await?;
    price(state, &cart).await
}

pub async fn set_quantity(state: &AppState, session_id: &str, update: QuantityUpdate) -> AppResult<CartView> {
    let mut cart = load(state, session_id).await?;
    cart.update_quantity(update.product_id, update.variant_id, update.quantity)?;
    db::cart::save(&state.db, &cart).await?;
    price(state, &cart).await
}

pub async fn remove(state: &AppState, session_id: &str, product_id: Uuid, variant_id: Option<Uuid>) -> AppResult<CartView> {
    let mut cart = load(state, session_id).await?;
    cart.remove_item(product_id, variant_id)?;
    db::cart::save(&state.db, &cart).await?;
    price(state, &cart).await
}

pub async fn clear(state: &AppState, session_id: &str) -> AppResult<()> {
    db::cart::clear(&state.db, session_id).await?;
    Ok(())
}
