//! Household shop purchases.

use thiserror::Error;

use crate::data::ShopItem;
use crate::state::{PlayerState, StatDelta, StatId};

/// Failures a purchase attempt can produce.
#[derive(Debug, Error, PartialEq)]
pub enum ShopError {
    #[error("unknown shop item `{0}`")]
    UnknownItem(String),
    #[error("not enough silver for {item} (price {price}, holding {cash})")]
    InsufficientFunds {
        item: String,
        price: f64,
        cash: f64,
    },
}

/// What a completed purchase did to the player.
#[derive(Debug, Clone, PartialEq)]
pub struct PurchaseReceipt {
    pub item_id: String,
    pub item_name: String,
    pub price: f64,
    /// Combined delta including the cash spent.
    pub delta: StatDelta,
}

/// Buy one item: price is checked against cash, then the item's effects run
/// through the same delta path as option rewards.
///
/// # Errors
///
/// Returns an error for an unknown item id or insufficient cash; nothing is
/// mutated on failure.
pub fn purchase(
    items: &[ShopItem],
    item_id: &str,
    player: &mut PlayerState,
) -> Result<PurchaseReceipt, ShopError> {
    let item = items
        .iter()
        .find(|item| item.id == item_id)
        .ok_or_else(|| ShopError::UnknownItem(item_id.to_string()))?;
    let cash = player.stats.cash;
    if cash < item.price {
        return Err(ShopError::InsufficientFunds {
            item: item.name.clone(),
            price: item.price,
            cash,
        });
    }
    let mut delta = StatDelta::new().with(StatId::Cash.as_str(), -item.price);
    delta.merge(&item.effects);
    player.apply_delta(&delta);
    Ok(PurchaseReceipt {
        item_id: item.id.clone(),
        item_name: item.name.clone(),
        price: item.price,
        delta,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hairpin() -> ShopItem {
        ShopItem {
            id: "hairpin".to_string(),
            name: "Silver Hairpin".to_string(),
            desc: String::new(),
            price: 8.0,
            effects: StatDelta::new()
                .with("item_hairpin", 1.0)
                .with("appearance", 1.0),
        }
    }

    #[test]
    fn purchase_debits_cash_and_applies_effects() {
        let mut player = PlayerState::default();
        player.stats.cash = 10.0;
        let receipt = purchase(&[hairpin()], "hairpin", &mut player).unwrap();
        assert!((player.stats.cash - 2.0).abs() < f64::EPSILON);
        assert_eq!(player.item_count("hairpin"), 1);
        assert!((player.stats.appearance - 61.0).abs() < f64::EPSILON);
        assert!((receipt.delta.get("cash").unwrap() + 8.0).abs() < f64::EPSILON);
    }

    #[test]
    fn purchase_refuses_when_short_on_cash() {
        let mut player = PlayerState::default();
        player.stats.cash = 3.0;
        let before = player.clone();
        let err = purchase(&[hairpin()], "hairpin", &mut player).unwrap_err();
        assert!(matches!(err, ShopError::InsufficientFunds { .. }));
        assert_eq!(player, before);
    }

    #[test]
    fn unknown_item_is_rejected() {
        let mut player = PlayerState::default();
        assert_eq!(
            purchase(&[hairpin()], "ghost", &mut player),
            Err(ShopError::UnknownItem("ghost".to_string()))
        );
    }
}
