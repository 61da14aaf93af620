//! Kitchen display rules
//!
//! Every order line becomes one ticket on one station. Routing is keyword
//! based over the item name and menu category; ticket progress feeds back
//! into the order status.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{AppError, ErrorCode};
use crate::models::{KdsStation, OrderItem};
use crate::order::OrderStatus;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketStatus {
    #[default]
    New,
    InProgress,
    Ready,
    Bumped,
}

impl TicketStatus {
    pub fn as_db(&self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::InProgress => "IN_PROGRESS",
            Self::Ready => "READY",
            Self::Bumped => "BUMPED",
        }
    }

    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "NEW" => Some(Self::New),
            "IN_PROGRESS" => Some(Self::InProgress),
            "READY" => Some(Self::Ready),
            "BUMPED" => Some(Self::Bumped),
            _ => None,
        }
    }

    /// Food is done (ready on the pass or already cleared)
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Ready | Self::Bumped)
    }

    pub fn can_transition_to(&self, next: TicketStatus) -> bool {
        use TicketStatus::*;
        matches!(
            (*self, next),
            (New, InProgress) | (New, Ready) | (InProgress, Ready) | (Ready, InProgress) | (Ready, Bumped)
        )
    }
}

text_codec!(TicketStatus);

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StationType {
    #[default]
    Prep,
    Grill,
    Fryer,
    Barista,
    Cold,
    Expo,
}

impl StationType {
    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Prep => "PREP",
            Self::Grill => "GRILL",
            Self::Fryer => "FRYER",
            Self::Barista => "BARISTA",
            Self::Cold => "COLD",
            Self::Expo => "EXPO",
        }
    }

    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "PREP" => Some(Self::Prep),
            "GRILL" => Some(Self::Grill),
            "FRYER" => Some(Self::Fryer),
            "BARISTA" => Some(Self::Barista),
            "COLD" => Some(Self::Cold),
            "EXPO" => Some(Self::Expo),
            _ => None,
        }
    }
}

text_codec!(StationType);

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum KdsError {
    #[error("Cannot move ticket from {from} to {to}")]
    InvalidTransition { from: TicketStatus, to: TicketStatus },
}

impl From<KdsError> for AppError {
    fn from(err: KdsError) -> Self {
        AppError::with_message(ErrorCode::InvalidTicketTransition, err.to_string())
    }
}

pub fn check_ticket_transition(from: TicketStatus, to: TicketStatus) -> Result<(), KdsError> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(KdsError::InvalidTransition { from, to })
    }
}

/// Keyword table, checked in order. First hit wins.
const ROUTES: &[(StationType, &[&str])] = &[
    (
        StationType::Barista,
        &[
            "coffee", "espresso", "latte", "cappuccino", "americano", "mocha", "macchiato",
            "flat-white", "tea", "chai", "matcha", "smoothie", "juice", "drink", "drinks",
            "beverage", "beverages", "shake", "milkshake",
        ],
    ),
    (
        StationType::Grill,
        &[
            "grill", "grilled", "burger", "steak", "bbq", "kebab", "skewer", "ribs", "chop",
            "sausage",
        ],
    ),
    (
        StationType::Fryer,
        &[
            "fries", "fried", "chips", "tempura", "nuggets", "wings", "calamari", "fritter",
            "schnitzel",
        ],
    ),
    (
        StationType::Cold,
        &[
            "salad", "dessert", "desserts", "icecream", "gelato", "sushi", "sashimi",
            "sandwich", "poke", "cold", "oysters",
        ],
    ),
];

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric() && c != '-')
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

/// Station type suggested by the item's name and category, if any keyword hits
pub fn classify_item(name: &str, category: Option<&str>) -> Option<StationType> {
    let words: Vec<String> = tokens(name).chain(category.into_iter().flat_map(tokens)).collect();
    ROUTES.iter().find_map(|(station, keywords)| {
        words
            .iter()
            .any(|w| keywords.contains(&w.as_str()))
            .then_some(*station)
    })
}

/// Pick the station for one order line.
///
/// Keyword match first, then any PREP station, then the active station with
/// the lowest `display_order`. `None` when the venue has no active station.
pub fn route_item(name: &str, category: Option<&str>, stations: &[KdsStation]) -> Option<i64> {
    let mut active: Vec<&KdsStation> = stations.iter().filter(|s| s.is_active).collect();
    active.sort_by_key(|s| (s.display_order, s.id));

    let of_type = |ty: StationType| active.iter().find(|s| s.station_type == ty).map(|s| s.id);

    classify_item(name, category)
        .and_then(of_type)
        .or_else(|| of_type(StationType::Prep))
        .or_else(|| active.first().map(|s| s.id))
}

/// Ticket to insert for one order line
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TicketDraft {
    pub item_index: i32,
    pub station_id: Option<i64>,
    pub item_name: String,
    pub quantity: i32,
    pub notes: Option<String>,
}

/// One ticket per order line; `item_index` is the line's position.
pub fn tickets_for_order(items: &[OrderItem], stations: &[KdsStation]) -> Vec<TicketDraft> {
    items
        .iter()
        .enumerate()
        .map(|(index, item)| TicketDraft {
            item_index: index as i32,
            station_id: route_item(&item.name, item.category.as_deref(), stations),
            item_name: item.name.clone(),
            quantity: item.quantity,
            notes: item.notes.clone(),
        })
        .collect()
}

/// Order status implied by its tickets after one of them changed.
///
/// Returns `Some(new_status)` only when the order should move forward.
pub fn order_status_after_ticket_change(
    current: OrderStatus,
    tickets: &[TicketStatus],
) -> Option<OrderStatus> {
    if tickets.is_empty() {
        return None;
    }
    let all_done = tickets.iter().all(TicketStatus::is_done);
    let any_started = tickets.iter().any(|t| *t != TicketStatus::New);

    match current {
        OrderStatus::Placed | OrderStatus::Accepted | OrderStatus::InPrep if all_done => {
            Some(OrderStatus::Ready)
        }
        OrderStatus::Placed | OrderStatus::Accepted if any_started => Some(OrderStatus::InPrep),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn station(id: i64, ty: StationType, order: i32, active: bool) -> KdsStation {
        KdsStation {
            id,
            venue_id: 1,
            name: format!("{ty}"),
            station_type: ty,
            display_order: order,
            is_active: active,
            created_at: 0,
        }
    }

    fn item(name: &str, category: Option<&str>) -> OrderItem {
        OrderItem {
            menu_item_id: 1,
            name: name.to_string(),
            quantity: 1,
            unit_price: Decimal::new(500, 2),
            category: category.map(str::to_string),
            notes: None,
        }
    }

    fn kitchen() -> Vec<KdsStation> {
        vec![
            station(10, StationType::Expo, 0, true),
            station(11, StationType::Grill, 1, true),
            station(12, StationType::Prep, 2, true),
            station(13, StationType::Barista, 3, true),
            station(14, StationType::Fryer, 4, false),
        ]
    }

    #[test]
    fn classify_uses_name_and_category() {
        assert_eq!(classify_item("Flat-white", None), Some(StationType::Barista));
        assert_eq!(classify_item("Oat Latte", None), Some(StationType::Barista));
        assert_eq!(classify_item("Wagyu Burger", None), Some(StationType::Grill));
        assert_eq!(classify_item("House Special", Some("Desserts")), Some(StationType::Cold));
        // whole words only
        assert_eq!(classify_item("Steak", None), Some(StationType::Grill));
        assert_eq!(classify_item("Teapot cake", None), None);
    }

    #[test]
    fn routes_to_matching_station() {
        let stations = kitchen();
        assert_eq!(route_item("Ribeye steak", None, &stations), Some(11));
        assert_eq!(route_item("Iced tea", None, &stations), Some(13));
    }

    #[test]
    fn routing_falls_back_to_prep_then_first_station() {
        let stations = kitchen();
        // fryer is inactive
        assert_eq!(route_item("Fries", None, &stations), Some(12));
        assert_eq!(route_item("Soup of the day", None, &stations), Some(12));

        let no_prep = vec![
            station(20, StationType::Grill, 5, true),
            station(21, StationType::Expo, 1, true),
        ];
        assert_eq!(route_item("Soup", None, &no_prep), Some(21));
        assert_eq!(route_item("Soup", None, &[]), None);
    }

    #[test]
    fn one_ticket_per_line_with_stable_index() {
        let items = vec![item("Burger", None), item("Latte", Some("Drinks")), item("Soup", None)];
        let drafts = tickets_for_order(&items, &kitchen());
        assert_eq!(drafts.len(), 3);
        assert_eq!(
            drafts.iter().map(|d| d.item_index).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
        assert_eq!(drafts[0].station_id, Some(11));
        assert_eq!(drafts[1].station_id, Some(13));
        assert_eq!(drafts[2].station_id, Some(12));
    }

    #[test]
    fn ticket_transitions() {
        use TicketStatus::*;
        assert!(check_ticket_transition(New, InProgress).is_ok());
        assert!(check_ticket_transition(New, Ready).is_ok());
        assert!(check_ticket_transition(Ready, InProgress).is_ok());
        assert!(check_ticket_transition(Ready, Bumped).is_ok());
        assert!(check_ticket_transition(New, Bumped).is_err());
        assert!(check_ticket_transition(Bumped, Ready).is_err());
        let err: AppError = check_ticket_transition(Bumped, New).unwrap_err().into();
        assert_eq!(err.code, ErrorCode::InvalidTicketTransition);
    }

    #[test]
    fn order_follows_its_tickets() {
        use TicketStatus::*;
        assert_eq!(
            order_status_after_ticket_change(OrderStatus::Placed, &[InProgress, New]),
            Some(OrderStatus::InPrep)
        );
        assert_eq!(
            order_status_after_ticket_change(OrderStatus::InPrep, &[InProgress, New]),
            None
        );
        assert_eq!(
            order_status_after_ticket_change(OrderStatus::InPrep, &[Ready, Bumped]),
            Some(OrderStatus::Ready)
        );
        assert_eq!(
            order_status_after_ticket_change(OrderStatus::Accepted, &[Ready]),
            Some(OrderStatus::Ready)
        );
        assert_eq!(
            order_status_after_ticket_change(OrderStatus::Serving, &[Bumped]),
            None
        );
        assert_eq!(order_status_after_ticket_change(OrderStatus::Placed, &[New]), None);
        assert_eq!(order_status_after_ticket_change(OrderStatus::Placed, &[]), None);
    }
}
